//! Persistent record of every agent invocation.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::EvalError;
use crate::rounding::round2;

pub const MAX_FINAL_ANSWER_CHARS: usize = 5000;
pub const MAX_AGENT_THOUGHT_CHARS: usize = 1000;
pub const MAX_ERROR_CHARS: usize = 1000;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// One agent invocation. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    pub timestamp: String,
    pub user_input: String,
    pub tool_used: String,
    #[serde(rename = "step_duration_sec")]
    pub duration_seconds: f64,
    #[serde(rename = "input_token_count")]
    pub input_tokens: u64,
    #[serde(rename = "output_token_count")]
    pub output_tokens: u64,
    pub final_answer: String,
    pub agent_thought: String,
    pub error: String,
}

impl CallRecord {
    /// Start a record stamped with the current UTC time.
    ///
    /// Every text field goes through the same cleaning: line breaks become
    /// spaces, the result is trimmed, and the long fields are cut to their
    /// character limits.
    pub fn new(user_input: &str, tool_used: &str, duration_seconds: f64) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            user_input: clean(user_input),
            tool_used: clean(tool_used),
            duration_seconds: round2(duration_seconds.max(0.0)),
            input_tokens: 0,
            output_tokens: 0,
            final_answer: String::new(),
            agent_thought: String::new(),
            error: String::new(),
        }
    }

    pub fn with_tokens(mut self, input_tokens: u64, output_tokens: u64) -> Self {
        self.input_tokens = input_tokens;
        self.output_tokens = output_tokens;
        self
    }

    pub fn with_final_answer(mut self, answer: &str) -> Self {
        self.final_answer = truncate_chars(clean(answer), MAX_FINAL_ANSWER_CHARS);
        self
    }

    pub fn with_agent_thought(mut self, thought: &str) -> Self {
        self.agent_thought = truncate_chars(clean(thought), MAX_AGENT_THOUGHT_CHARS);
        self
    }

    pub fn with_error(mut self, error: &str) -> Self {
        self.error = truncate_chars(clean(error), MAX_ERROR_CHARS);
        self
    }

    pub fn is_error(&self) -> bool {
        !self.error.is_empty()
    }
}

fn clean(text: &str) -> String {
    text.replace(['\n', '\r'], " ").trim().to_string()
}

fn truncate_chars(text: String, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text,
    }
}

/// Destination for call records.
pub trait CallSink: Send + Sync {
    fn append(&self, record: &CallRecord) -> Result<(), EvalError>;
}

// ── CSV file ──────────────────────────────────────────────────

/// Append-only CSV call log.
///
/// The file is opened per append. A UTF-8 BOM and the header row are written
/// only when the file is empty, so the header appears exactly once.
pub struct CsvCallLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CsvCallLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record back. A missing file is an empty log.
    pub fn read_all(&self) -> Result<Vec<CallRecord>, EvalError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = std::fs::read(&self.path)?;
        let body = data.strip_prefix(UTF8_BOM).unwrap_or(&data[..]);

        let mut reader = csv::Reader::from_reader(body);
        let mut records = Vec::new();
        for row in reader.deserialize() {
            records.push(row?);
        }
        Ok(records)
    }
}

impl CallSink for CsvCallLog {
    fn append(&self, record: &CallRecord) -> Result<(), EvalError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let fresh = file.metadata()?.len() == 0;
        if fresh {
            file.write_all(UTF8_BOM)?;
            debug!(path = %self.path.display(), "created call log");
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(fresh)
            .from_writer(file);
        writer.serialize(record)?;
        writer.flush()?;
        Ok(())
    }
}

// ── In memory ─────────────────────────────────────────────────

/// Collects records in memory.
#[derive(Default)]
pub struct InMemoryCallLog {
    records: Mutex<Vec<CallRecord>>,
}

impl InMemoryCallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<CallRecord> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl CallSink for InMemoryCallLog {
    fn append(&self, record: &CallRecord) -> Result<(), EvalError> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(record.clone());
        Ok(())
    }
}

// ── Aggregates ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallLogStats {
    pub calls: usize,
    pub errors: usize,
    pub total_duration_secs: f64,
    pub avg_duration_secs: f64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
}

impl CallLogStats {
    pub fn from_records(records: &[CallRecord]) -> Self {
        let calls = records.len();
        let total_duration_secs: f64 = records.iter().map(|r| r.duration_seconds).sum();
        let avg_duration_secs = if calls > 0 {
            total_duration_secs / calls as f64
        } else {
            0.0
        };

        Self {
            calls,
            errors: records.iter().filter(|r| r.is_error()).count(),
            total_duration_secs: round2(total_duration_secs),
            avg_duration_secs: round2(avg_duration_secs),
            total_input_tokens: records.iter().map(|r| r.input_tokens).sum(),
            total_output_tokens: records.iter().map(|r| r.output_tokens).sum(),
        }
    }
}

impl fmt::Display for CallLogStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Calls:          {}", self.calls)?;
        writeln!(f, "Errors:         {}", self.errors)?;
        writeln!(
            f,
            "Duration:       {:.2}s total, {:.2}s avg",
            self.total_duration_secs, self.avg_duration_secs
        )?;
        write!(
            f,
            "Tokens:         {} in, {} out",
            self.total_input_tokens, self.total_output_tokens
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn sanitizes_and_truncates() {
        let answer = format!("line one\nline two\r\n{}", "x".repeat(6000));
        let record = CallRecord::new("  what\nis  ", "Auto", 1.23456)
            .with_final_answer(&answer)
            .with_agent_thought(&"y".repeat(1200))
            .with_error("boom\n");

        assert_eq!(record.user_input, "what is");
        assert_eq!(record.duration_seconds, 1.23);
        assert_eq!(record.final_answer.chars().count(), MAX_FINAL_ANSWER_CHARS);
        assert!(record.final_answer.starts_with("line one line two  x"));
        assert_eq!(record.agent_thought.chars().count(), MAX_AGENT_THOUGHT_CHARS);
        assert_eq!(record.error, "boom");
        assert!(record.is_error());
    }

    #[test]
    fn duration_halves_round_to_even() {
        assert_eq!(CallRecord::new("q", "Auto", 0.125).duration_seconds, 0.12);
        assert_eq!(CallRecord::new("q", "Auto", 2.375).duration_seconds, 2.38);
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let answer = "ё".repeat(6000);
        let record = CallRecord::new("q", "Auto", 0.0).with_final_answer(&answer);
        assert_eq!(record.final_answer.chars().count(), 5000);
    }

    #[test]
    fn header_written_once_with_bom() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("logs").join("agent_calls.csv");
        let log = CsvCallLog::new(&path);

        log.append(&CallRecord::new("first", "Auto", 0.5).with_tokens(3, 4))
            .unwrap();
        log.append(&CallRecord::new("second", "Auto", 1.0).with_error("failed"))
            .unwrap();

        let raw = std::fs::read(&path).unwrap();
        assert!(raw.starts_with(UTF8_BOM));
        let text = String::from_utf8(raw[3..].to_vec()).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "timestamp,user_input,tool_used,step_duration_sec,input_token_count,\
             output_token_count,final_answer,agent_thought,error"
        );
        assert_eq!(text.matches("timestamp,user_input").count(), 1);
        assert_eq!(text.lines().count(), 3);

        let records = log.read_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].user_input, "first");
        assert_eq!(records[0].input_tokens, 3);
        assert_eq!(records[1].error, "failed");
    }

    #[test]
    fn reopening_existing_log_appends_without_header() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("calls.csv");

        CsvCallLog::new(&path)
            .append(&CallRecord::new("a", "Auto", 0.1))
            .unwrap();
        CsvCallLog::new(&path)
            .append(&CallRecord::new("b", "Auto", 0.2))
            .unwrap();

        let records = CsvCallLog::new(&path).read_all().unwrap();
        assert_eq!(records.len(), 2);
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches("step_duration_sec").count(), 1);
    }

    #[test]
    fn missing_log_reads_empty() {
        let tmp = TempDir::new().unwrap();
        let log = CsvCallLog::new(tmp.path().join("nope.csv"));
        assert!(log.read_all().unwrap().is_empty());
    }

    #[test]
    fn stats_aggregate() {
        let records = vec![
            CallRecord::new("a", "Auto", 1.0).with_tokens(10, 5),
            CallRecord::new("b", "Auto", 2.0)
                .with_tokens(20, 0)
                .with_error("timeout"),
        ];
        let stats = CallLogStats::from_records(&records);
        assert_eq!(stats.calls, 2);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.total_duration_secs, 3.0);
        assert_eq!(stats.avg_duration_secs, 1.5);
        assert_eq!(stats.total_input_tokens, 30);
        assert_eq!(stats.total_output_tokens, 5);
        assert!(stats.to_string().contains("Errors:         1"));
    }

    #[test]
    fn in_memory_collects() {
        let log = InMemoryCallLog::new();
        log.append(&CallRecord::new("a", "Auto", 0.0)).unwrap();
        assert_eq!(log.records().len(), 1);
    }
}
