//! Currency conversion via exchangerate-api.com pair endpoint.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::http::{fetch_json, normalize_base_url};
use crate::tool::{number_or, required_str, Tool, ToolContext, ToolDefinition, ToolError, ToolResult};

/// Result of one conversion.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Conversion {
    pub base_currency: String,
    pub target_currency: String,
    pub amount: f64,
    pub conversion_rate: f64,
    pub conversion_result: f64,
}

/// Converts an amount between two currencies at the current rate.
pub struct CurrencyConversionTool {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl CurrencyConversionTool {
    pub const DEFAULT_BASE_URL: &'static str = "https://v6.exchangerate-api.com";

    /// Fails with [`ToolError::NotConfigured`] when the key is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ToolError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ToolError::NotConfigured(
                "exchangerate-api key is required".to_string(),
            ));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = normalize_base_url(url);
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub async fn convert(
        &self,
        base_currency: &str,
        target_currency: &str,
        amount: f64,
    ) -> Result<Conversion, ToolError> {
        let base = currency_code(base_currency)?;
        let target = currency_code(target_currency)?;
        if !amount.is_finite() || amount < 0.0 {
            return Err(ToolError::InvalidInput(format!(
                "amount must be a non-negative number, got {amount}"
            )));
        }

        debug!(base = %base, target = %target, amount, "converting currency");
        let url = format!(
            "{}/v6/{}/pair/{}/{}/{}",
            self.base_url, self.api_key, base, target, amount
        );
        let body = fetch_json(self.client.get(url), "exchangerate-api").await?;

        if body["result"].as_str() != Some("success") {
            let reason = body["error-type"].as_str().unwrap_or("unknown error");
            return Err(ToolError::ExternalService(format!(
                "exchangerate-api: {reason}"
            )));
        }

        let field = |name: &str| {
            body[name].as_f64().ok_or_else(|| {
                ToolError::ExternalService(format!("exchangerate-api: missing '{name}'"))
            })
        };

        Ok(Conversion {
            base_currency: base,
            target_currency: target,
            amount,
            conversion_rate: field("conversion_rate")?,
            conversion_result: field("conversion_result")?,
        })
    }
}

/// Normalize an ISO 4217 code ("usd" → "USD").
fn currency_code(raw: &str) -> Result<String, ToolError> {
    let code = raw.trim().to_uppercase();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code)
    } else {
        Err(ToolError::InvalidInput(format!("invalid currency code '{raw}'")))
    }
}

#[async_trait]
impl Tool for CurrencyConversionTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "currency_converter".to_string(),
            description: "Converts an amount from a base currency to a target currency using current exchange rates.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "base_currency": {
                        "type": "string",
                        "description": "Currency code to convert from (e.g. 'USD')"
                    },
                    "target_currency": {
                        "type": "string",
                        "description": "Currency code to convert to (e.g. 'EUR')"
                    },
                    "amount": {
                        "type": "number",
                        "description": "Amount of the base currency, defaults to 1.0"
                    }
                },
                "required": ["base_currency", "target_currency"]
            }),
        }
    }

    async fn execute(&self, input: Value, _context: &ToolContext) -> Result<ToolResult, ToolError> {
        let base = required_str(&input, "base_currency")?;
        let target = required_str(&input, "target_currency")?;
        let amount = number_or(&input, "amount", 1.0)?;

        let conversion = self.convert(base, target, amount).await?;
        let content = serde_json::to_string(&conversion)
            .map_err(|e| ToolError::ExternalService(format!("encoding conversion: {e}")))?;
        Ok(ToolResult::text(content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ctx() -> ToolContext {
        ToolContext {
            working_directory: std::path::PathBuf::from("/tmp"),
        }
    }

    #[test]
    fn empty_key_is_not_configured() {
        assert!(matches!(
            CurrencyConversionTool::new(""),
            Err(ToolError::NotConfigured(_))
        ));
    }

    #[test]
    fn currency_codes_are_normalized() {
        assert_eq!(currency_code(" usd ").unwrap(), "USD");
        assert!(currency_code("dollar").is_err());
        assert!(currency_code("U$D").is_err());
    }

    #[tokio::test]
    async fn converts_with_default_amount() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v6/key123/pair/USD/EUR/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": "success",
                "base_code": "USD",
                "target_code": "EUR",
                "conversion_rate": 0.92,
                "conversion_result": 0.92
            })))
            .mount(&server)
            .await;

        let tool = CurrencyConversionTool::new("key123")
            .unwrap()
            .with_base_url(&server.uri());
        let result = tool
            .execute(json!({"base_currency": "usd", "target_currency": "eur"}), &ctx())
            .await
            .unwrap();

        let parsed: Value = serde_json::from_str(&result.content).unwrap();
        assert_eq!(parsed["base_currency"], "USD");
        assert_eq!(parsed["conversion_rate"], 0.92);
        assert_eq!(parsed["amount"], 1.0);
    }

    #[tokio::test]
    async fn api_level_error_is_external_service() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": "error",
                "error-type": "unsupported-code"
            })))
            .mount(&server)
            .await;

        let tool = CurrencyConversionTool::new("k").unwrap().with_base_url(&server.uri());
        let err = tool.convert("USD", "XXX", 5.0).await.unwrap_err();
        assert!(matches!(err, ToolError::ExternalService(_)));
        assert!(err.to_string().contains("unsupported-code"));
    }

    #[tokio::test]
    async fn negative_amount_rejected_before_request() {
        let tool = CurrencyConversionTool::new("k")
            .unwrap()
            .with_base_url("http://127.0.0.1:9");
        let err = tool.convert("USD", "EUR", -3.0).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }
}
