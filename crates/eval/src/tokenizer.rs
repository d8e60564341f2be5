//! Token counting used when an agent does not report its own usage.

use tiktoken_rs::CoreBPE;

use crate::error::EvalError;

pub trait Tokenizer: Send + Sync {
    /// Number of tokens in `text`; 0 for empty text.
    fn count_tokens(&self, text: &str) -> usize;
}

/// Absent text counts as zero tokens.
pub fn count_tokens_opt(tokenizer: &dyn Tokenizer, text: Option<&str>) -> usize {
    text.map_or(0, |t| tokenizer.count_tokens(t))
}

/// cl100k_base byte-pair encoding, as used by the gpt-3.5-turbo family.
pub struct BpeTokenizer {
    bpe: CoreBPE,
}

impl BpeTokenizer {
    pub fn cl100k() -> Result<Self, EvalError> {
        let bpe = tiktoken_rs::cl100k_base().map_err(|e| EvalError::Tokenizer(e.to_string()))?;
        Ok(Self { bpe })
    }
}

impl Tokenizer for BpeTokenizer {
    fn count_tokens(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        self.bpe.encode_ordinary(text).len()
    }
}

/// Whitespace-separated word count.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn count_tokens(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}
