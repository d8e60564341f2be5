//! Newline-delimited JSON task and result files.

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::EvalError;
use crate::harness::EvaluationResult;

/// One evaluation unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub task: String,
    #[serde(default)]
    pub expected_keywords: Vec<String>,
}

impl Task {
    pub fn new(task: &str, expected_keywords: &[&str]) -> Self {
        Self {
            task: task.to_string(),
            expected_keywords: expected_keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Parse tasks from JSONL text. Blank lines are skipped.
pub fn parse_tasks(data: &str) -> Result<Vec<Task>, EvalError> {
    let data = data.strip_prefix('\u{feff}').unwrap_or(data);
    let mut tasks = Vec::new();
    for (i, line) in data.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let task = serde_json::from_str::<Task>(line).map_err(|e| EvalError::TaskParse {
            line: i + 1,
            message: e.to_string(),
        })?;
        tasks.push(task);
    }
    Ok(tasks)
}

pub fn load_tasks(path: &Path) -> Result<Vec<Task>, EvalError> {
    let data = std::fs::read_to_string(path)?;
    let tasks = parse_tasks(&data)?;
    info!(path = %path.display(), count = tasks.len(), "loaded evaluation tasks");
    Ok(tasks)
}

/// Write one JSON object per line, replacing any existing file.
pub fn save_results(results: &[EvaluationResult], path: &Path) -> Result<(), EvalError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
    for result in results {
        serde_json::to_writer(&mut file, result)?;
        file.write_all(b"\n")?;
    }
    file.flush()?;
    info!(path = %path.display(), count = results.len(), "saved evaluation results");
    Ok(())
}
