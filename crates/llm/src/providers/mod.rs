pub mod openai;

use finagent_core::config::LlmConfig;
use finagent_tools::LlmError;

use self::openai::OpenAiCompatProvider;

/// Create the chat-completions provider described by `llm_config`.
///
/// Remote endpoints need an API key; local gateways run without one.
pub fn create_provider(llm_config: &LlmConfig) -> Result<OpenAiCompatProvider, LlmError> {
    let api_key = match (&llm_config.api_key, llm_config.is_local()) {
        (Some(key), _) => key.clone(),
        (None, true) => String::new(),
        (None, false) => {
            return Err(LlmError::NotConfigured(format!(
                "LLM_API_KEY not set for {}",
                llm_config.base_url
            )))
        }
    };

    Ok(OpenAiCompatProvider::new(
        api_key,
        llm_config.model.clone(),
        llm_config.base_url.clone(),
    )
    .with_sampling(llm_config.temperature, llm_config.max_tokens))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str, api_key: Option<&str>) -> LlmConfig {
        LlmConfig {
            base_url: base_url.to_string(),
            api_key: api_key.map(String::from),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.1,
            max_tokens: 256,
        }
    }

    #[test]
    fn remote_without_key_is_not_configured() {
        let result = create_provider(&config("https://api.openai.com", None));
        assert!(matches!(result, Err(LlmError::NotConfigured(_))));
    }

    #[test]
    fn local_gateway_needs_no_key() {
        let provider = create_provider(&config("http://localhost:11434", None)).unwrap();
        assert_eq!(provider.model(), "gpt-4o-mini");
    }

    #[test]
    fn remote_with_key_is_created() {
        assert!(create_provider(&config("https://api.openai.com", Some("sk-test"))).is_ok());
    }
}
