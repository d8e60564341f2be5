//! Consumer-advisor review of a contract, policy or service description.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use crate::document::read_document;
use crate::model::TextModel;
use crate::tool::{optional_str, Tool, ToolContext, ToolDefinition, ToolError, ToolResult};

/// Only this many characters of the document reach the model.
pub const MAX_PROMPT_CHARS: usize = 6000;

pub struct ContractAnalyzerTool {
    model: Arc<dyn TextModel>,
}

impl ContractAnalyzerTool {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self { model }
    }

    /// Review `document_text` and return the model's summary of risky terms.
    pub async fn analyze(&self, document_text: &str) -> Result<String, ToolError> {
        let prompt = build_prompt(document_text);
        debug!(prompt_chars = prompt.chars().count(), "sending contract for analysis");
        Ok(self.model.complete(&prompt).await?)
    }
}

fn build_prompt(document_text: &str) -> String {
    let excerpt: String = document_text.chars().take(MAX_PROMPT_CHARS).collect();
    format!(
        "You are acting as a consultant on financial services.\n\n\
         Analyze the following contract or service description. \
         Point out every important condition the client should pay attention to.\n\n\
         Give a short, clear summary of the text below and highlight potentially \
         dangerous or non-obvious terms.\n\n\
         Document text:\n{excerpt}"
    )
}

/// Resolve `raw` against the tool's working directory unless it is absolute.
async fn load_file(raw: &str, context: &ToolContext) -> Result<String, ToolError> {
    let path = context.resolve(raw);

    let document = read_document(&path).await?;
    if document.is_blank() {
        return Err(ToolError::ResourceAccess(format!(
            "could not extract any text from '{}'",
            path.display()
        )));
    }
    info!(file = %document.filename, pages = document.pages.len(), "extracted contract text");
    Ok(document.full_text())
}

#[async_trait]
impl Tool for ContractAnalyzerTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "contract_analyzer".to_string(),
            description: "Analyzes the text of a financial contract, insurance policy or service description and highlights details that matter to the client, including risky or non-obvious conditions.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "text": {
                        "type": "string",
                        "description": "Contract or terms text to analyze"
                    },
                    "file_path": {
                        "type": "string",
                        "description": "Path to an uploaded PDF, DOCX or TXT file (takes precedence over text)"
                    }
                }
            }),
        }
    }

    async fn execute(&self, input: Value, context: &ToolContext) -> Result<ToolResult, ToolError> {
        let document_text = match (optional_str(&input, "file_path"), optional_str(&input, "text")) {
            (Some(file_path), _) => load_file(file_path, context).await?,
            (None, Some(text)) => text.to_string(),
            (None, None) => {
                return Err(ToolError::InvalidInput(
                    "either 'text' or 'file_path' must be provided".to_string(),
                ))
            }
        };

        let answer = self.analyze(&document_text).await?;
        Ok(ToolResult::text(answer))
    }
}
