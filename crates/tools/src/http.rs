//! Shared request plumbing for the API-backed tools.

use serde_json::Value;
use tracing::debug;

use crate::tool::ToolError;

/// Longest slice of an error body echoed back in messages.
const MAX_ERROR_BODY: usize = 300;

/// Send `request` and decode a JSON body, mapping every failure to
/// [`ToolError::ExternalService`] prefixed with `service`.
pub(crate) async fn fetch_json(
    request: reqwest::RequestBuilder,
    service: &str,
) -> Result<Value, ToolError> {
    let response = request
        .send()
        .await
        .map_err(|e| ToolError::ExternalService(format!("{service}: request failed: {e}")))?;

    let status = response.status();
    debug!(service, status = status.as_u16(), "response received");

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(MAX_ERROR_BODY).collect();
        return Err(ToolError::ExternalService(format!(
            "{service}: HTTP {}: {snippet}",
            status.as_u16()
        )));
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| ToolError::ExternalService(format!("{service}: malformed response: {e}")))
}

/// Strip a trailing slash so `format!("{base}/path")` never doubles it.
pub(crate) fn normalize_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
