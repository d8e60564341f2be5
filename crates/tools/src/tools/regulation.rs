//! Fuzzy search over a local corpus of regulations, explained by a text model.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::document::{is_supported, read_document};
use crate::model::TextModel;
use crate::similarity::close_matches;
use crate::splitter::{RecursiveSplitter, SplitterConfig};
use crate::tool::{required_str, Tool, ToolContext, ToolDefinition, ToolError, ToolResult};

/// Chunks shorter than this carry too little text to match against.
const MIN_CHUNK_CHARS: usize = 100;
const MAX_MATCHES: usize = 5;
const MATCH_CUTOFF: f64 = 0.2;

pub const NO_MATCHES_MESSAGE: &str = "No matching regulation fragments were found for your query.";

/// A fragment of a regulation document.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub text: String,
    /// File name the fragment came from.
    pub source: String,
}

pub struct RegulationSearchTool {
    model: Arc<dyn TextModel>,
    chunks: Vec<Chunk>,
}

impl RegulationSearchTool {
    /// Index every supported document in `docs_dir`.
    ///
    /// Unsupported or unreadable files are skipped; a missing directory is an error.
    pub async fn load(model: Arc<dyn TextModel>, docs_dir: &Path) -> Result<Self, ToolError> {
        let mut entries = tokio::fs::read_dir(docs_dir).await.map_err(|e| {
            ToolError::ResourceAccess(format!(
                "cannot read regulations directory '{}': {e}",
                docs_dir.display()
            ))
        })?;

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ToolError::ResourceAccess(e.to_string()))?
        {
            let path = entry.path();
            if path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        let splitter = RecursiveSplitter::new(SplitterConfig::default());
        let mut chunks = Vec::new();
        for path in paths {
            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            if !is_supported(&filename) {
                warn!(file = %filename, "skipping unsupported regulation file");
                continue;
            }
            let document = match read_document(&path).await {
                Ok(doc) => doc,
                Err(e) => {
                    warn!(file = %filename, error = %e, "skipping unreadable regulation file");
                    continue;
                }
            };
            chunks.extend(chunk_document(&splitter, &document.full_text(), &filename));
        }

        info!(dir = %docs_dir.display(), chunks = chunks.len(), "loaded regulation fragments");
        Ok(Self::from_chunks(model, chunks))
    }

    /// Build from pre-split fragments.
    pub fn from_chunks(model: Arc<dyn TextModel>, chunks: Vec<Chunk>) -> Self {
        Self { model, chunks }
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Fragments closest to `query`, best first.
    pub fn find_matches(&self, query: &str) -> Vec<&Chunk> {
        let texts: Vec<&str> = self.chunks.iter().map(|c| c.text.as_str()).collect();
        close_matches(query, &texts, MAX_MATCHES, MATCH_CUTOFF)
            .into_iter()
            .map(|(idx, _)| &self.chunks[idx])
            .collect()
    }

    /// Answer `query` from the matching fragments.
    pub async fn search(&self, query: &str) -> Result<String, ToolError> {
        let matches = self.find_matches(query);
        debug!(query, matches = matches.len(), "regulation search");
        if matches.is_empty() {
            return Ok(NO_MATCHES_MESSAGE.to_string());
        }

        let prompt = build_prompt(query, &matches);
        let answer = self.model.complete(&prompt).await?;
        Ok(answer.trim().to_string())
    }
}

fn chunk_document(splitter: &RecursiveSplitter, text: &str, source: &str) -> Vec<Chunk> {
    splitter
        .split(text)
        .into_iter()
        .map(|piece| piece.trim().to_string())
        .filter(|piece| piece.chars().count() >= MIN_CHUNK_CHARS)
        .map(|text| Chunk {
            text,
            source: source.to_string(),
        })
        .collect()
}

fn build_prompt(query: &str, matches: &[&Chunk]) -> String {
    let context = matches
        .iter()
        .map(|chunk| format!("[{}]:\n{}", chunk.source, chunk.text.replace('\n', " ")))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You are a consultant in financial and consumer law.\n\n\
         The user asked:\n\"{query}\"\n\n\
         The following fragments of regulations were found:\n\n\
         {context}\n\n\
         Based on these fragments, give a clear answer. Explain the requirements \
         and the client's rights, and cite the sources."
    )
}

#[async_trait]
impl Tool for RegulationSearchTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "regulation_search".to_string(),
            description: "Finds relevant fragments of regulations (from .pdf/.txt/.docx files) for a query and explains them in plain language.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Legal or financial question to search the regulations for"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn execute(&self, input: Value, _context: &ToolContext) -> Result<ToolResult, ToolError> {
        let query = required_str(&input, "query")?;
        Ok(ToolResult::text(self.search(query).await?))
    }
}
