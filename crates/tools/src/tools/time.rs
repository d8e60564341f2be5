//! Current date and time for an IANA time zone via timeapi.io.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::http::{fetch_json, normalize_base_url};
use crate::tool::{optional_str, Tool, ToolContext, ToolDefinition, ToolError, ToolResult};

pub const DEFAULT_TIME_ZONE: &str = "Europe/Moscow";

/// Suggested when a lookup fails; the first five are quoted in errors.
pub const COMMON_TIMEZONES: &[&str] = &[
    "Europe/Moscow",
    "Europe/London",
    "Europe/Paris",
    "Europe/Berlin",
    "America/New_York",
    "America/Los_Angeles",
    "America/Chicago",
    "Asia/Tokyo",
    "Asia/Shanghai",
    "Asia/Dubai",
    "Asia/Kolkata",
    "Australia/Sydney",
    "Pacific/Auckland",
];

pub struct TimeTool {
    client: reqwest::Client,
    base_url: String,
}

impl TimeTool {
    pub const DEFAULT_BASE_URL: &'static str = "https://timeapi.io";

    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = normalize_base_url(url);
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Raw timeapi.io payload plus a `summary` line when `dateTime` is present.
    pub async fn current_time(&self, time_zone: &str) -> Result<Value, ToolError> {
        debug!(time_zone, "looking up current time");
        let request = self
            .client
            .get(format!("{}/api/Time/current/zone", self.base_url))
            .query(&[("timeZone", time_zone)]);

        let mut body = fetch_json(request, "timeapi.io")
            .await
            .map_err(|e| with_suggestions(e, time_zone))?;

        if let Some(date_time) = body.get("dateTime").and_then(|v| v.as_str()).map(String::from) {
            if let Some(obj) = body.as_object_mut() {
                obj.insert(
                    "summary".to_string(),
                    Value::String(format!("Current time in {time_zone}: {date_time}")),
                );
            }
        }
        Ok(body)
    }
}

impl Default for TimeTool {
    fn default() -> Self {
        Self::new()
    }
}

fn with_suggestions(err: ToolError, time_zone: &str) -> ToolError {
    let suggestions = COMMON_TIMEZONES[..5].join(", ");
    ToolError::ExternalService(format!(
        "failed to fetch time for '{time_zone}': {err}. Try one of these common time zones: {suggestions}"
    ))
}

#[async_trait]
impl Tool for TimeTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "time_tool".to_string(),
            description: "Gets the current date and time for a location using IANA time zone identifiers.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "time_zone": {
                        "type": "string",
                        "description": "IANA time zone (e.g. 'Europe/Moscow', 'America/New_York', 'Asia/Tokyo'). Defaults to Europe/Moscow."
                    }
                }
            }),
        }
    }

    async fn execute(&self, input: Value, _context: &ToolContext) -> Result<ToolResult, ToolError> {
        let time_zone = optional_str(&input, "time_zone").unwrap_or(DEFAULT_TIME_ZONE);
        let body = self.current_time(time_zone).await?;
        Ok(ToolResult::text(body.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ctx() -> ToolContext {
        ToolContext {
            working_directory: std::path::PathBuf::from("/tmp"),
        }
    }

    #[tokio::test]
    async fn defaults_to_moscow_and_adds_summary() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/Time/current/zone"))
            .and(query_param("timeZone", "Europe/Moscow"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "year": 2025,
                "dateTime": "2025-06-15T12:30:00.0000000",
                "timeZone": "Europe/Moscow"
            })))
            .mount(&server)
            .await;

        let tool = TimeTool::new().with_base_url(&server.uri());
        let result = tool.execute(json!({}), &ctx()).await.unwrap();
        let parsed: Value = serde_json::from_str(&result.content).unwrap();
        assert_eq!(
            parsed["summary"],
            "Current time in Europe/Moscow: 2025-06-15T12:30:00.0000000"
        );
        assert_eq!(parsed["year"], 2025);
    }

    #[tokio::test]
    async fn unknown_zone_error_lists_suggestions() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_string("Invalid Timezone"))
            .mount(&server)
            .await;

        let tool = TimeTool::new().with_base_url(&server.uri());
        let err = tool
            .execute(json!({"time_zone": "Mars/Olympus"}), &ctx())
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, ToolError::ExternalService(_)));
        assert!(msg.contains("Mars/Olympus"));
        assert!(msg.contains("Europe/London"));
        assert!(msg.contains("America/New_York"));
        assert!(!msg.contains("Asia/Tokyo"));
    }

    #[tokio::test]
    async fn payload_without_date_time_has_no_summary() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"timeZone": "UTC"})))
            .mount(&server)
            .await;

        let tool = TimeTool::new().with_base_url(&server.uri());
        let body = tool.current_time("UTC").await.unwrap();
        assert!(body.get("summary").is_none());
    }
}
