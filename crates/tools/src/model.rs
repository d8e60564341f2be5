//! Plain text-completion model used by the document tools.
//!
//! The contract analyzer and regulation search only need "prompt in, text out".
//! Keeping that here as a minimal trait lets `finagent-llm` implement it without
//! the tools crate depending on any particular provider.

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ModelError(pub String);

/// Minimal non-streaming text model.
#[async_trait]
pub trait TextModel: Send + Sync {
    /// Send a single prompt and return the model's response text.
    async fn complete(&self, prompt: &str) -> Result<String, ModelError>;
}

/// Scripted model for tests: records prompts, replays a fixed answer.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    pub struct MockTextModel {
        answer: Result<String, String>,
        prompts: Mutex<Vec<String>>,
    }

    impl MockTextModel {
        pub fn answering(answer: &str) -> Self {
            Self {
                answer: Ok(answer.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(message: &str) -> Self {
            Self {
                answer: Err(message.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        /// Prompts received so far, oldest first.
        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TextModel for MockTextModel {
        async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.answer.clone().map_err(ModelError)
        }
    }
}
