//! Recursive character text splitting.
//!
//! Splits on the coarsest separator present (`\n\n`, then `\n`, then ` `, then
//! individual characters), merges adjacent pieces back up to `chunk_size`
//! characters and carries `chunk_overlap` characters of trailing context into
//! the next chunk. Separators stay attached to the start of the piece that
//! follows them. All lengths are counted in characters, not bytes.

// ── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SplitterConfig {
    /// Maximum characters per chunk (default: 1000).
    pub chunk_size: usize,
    /// Characters of overlap between adjacent chunks (default: 100).
    pub chunk_overlap: usize,
    /// Separators from coarsest to finest; `""` means "split every character".
    pub separators: Vec<String>,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 100,
            separators: ["\n\n", "\n", " ", ""].iter().map(|s| s.to_string()).collect(),
        }
    }
}

pub struct RecursiveSplitter {
    config: SplitterConfig,
}

impl RecursiveSplitter {
    pub fn new(config: SplitterConfig) -> Self {
        Self { config }
    }

    /// Split `text` into trimmed, non-empty chunks.
    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_with(text, &self.config.separators)
    }

    fn split_with(&self, text: &str, separators: &[String]) -> Vec<String> {
        // Pick the first separator that occurs; "" always matches.
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut finer: &[String] = &[];
        for (i, s) in separators.iter().enumerate() {
            if s.is_empty() {
                separator = "";
                break;
            }
            if text.contains(s.as_str()) {
                separator = s;
                finer = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut pending: Vec<String> = Vec::new();

        for piece in split_keep_separator(text, separator) {
            if char_len(&piece) < self.config.chunk_size {
                pending.push(piece);
                continue;
            }
            if !pending.is_empty() {
                chunks.extend(self.merge(std::mem::take(&mut pending)));
            }
            if finer.is_empty() {
                if let Some(doc) = join_trimmed(&[piece]) {
                    chunks.push(doc);
                }
            } else {
                chunks.extend(self.split_with(&piece, finer));
            }
        }
        if !pending.is_empty() {
            chunks.extend(self.merge(pending));
        }
        chunks
    }

    /// Greedily pack pieces into chunks no longer than `chunk_size`, keeping
    /// at most `chunk_overlap` characters of the previous chunk's tail.
    fn merge(&self, pieces: Vec<String>) -> Vec<String> {
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;

        let mut docs = Vec::new();
        let mut current: Vec<String> = Vec::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(&piece);
            if total + len > size && !current.is_empty() {
                if let Some(doc) = join_trimmed(&current) {
                    docs.push(doc);
                }
                while total > overlap || (total + len > size && total > 0) {
                    let dropped = current.remove(0);
                    total -= char_len(&dropped);
                }
            }
            total += len;
            current.push(piece);
        }
        if let Some(doc) = join_trimmed(&current) {
            docs.push(doc);
        }
        docs
    }
}

impl Default for RecursiveSplitter {
    fn default() -> Self {
        Self::new(SplitterConfig::default())
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn join_trimmed(pieces: &[String]) -> Option<String> {
    let joined = pieces.concat();
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Split on `separator`, attaching each separator to the start of the piece
/// that follows it. An empty separator yields single characters.
fn split_keep_separator(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.chars().map(String::from).collect();
    }
    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(text[start..idx].to_string());
        }
        start = idx;
    }
    if start < text.len() {
        pieces.push(text[start..].to_string());
    }
    pieces.retain(|p| !p.is_empty());
    pieces
}
