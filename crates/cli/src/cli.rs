use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tool-using financial assistant with call logging and keyword evaluation.
#[derive(Parser, Debug)]
#[command(name = "finagent", about = "Evaluate and drive a tool-using financial agent")]
pub struct CliArgs {
    /// System prompt for the agent
    #[arg(long, global = true)]
    pub system_prompt: Option<String>,

    /// Maximum agentic loop iterations per task
    #[arg(long, global = true, default_value = "10")]
    pub max_iterations: usize,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run every task in a JSONL file through the agent and score the answers
    Eval {
        /// Newline-delimited JSON tasks ({"task": ..., "expected_keywords": [...]})
        #[arg(long, env = "EVAL_TASKS_FILE")]
        tasks: Option<PathBuf>,

        /// Where to write one JSON result per line
        #[arg(long, env = "EVAL_RESULTS_FILE")]
        output: Option<PathBuf>,

        /// Keyword matching: strict (all) or lenient (any)
        #[arg(long)]
        mode: Option<String>,

        /// Per-call timeout in seconds (0 disables it)
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Stop at the first failing task instead of recording it and continuing
        #[arg(long)]
        fail_fast: bool,

        /// CSV call log to append to
        #[arg(long)]
        log: Option<PathBuf>,
    },

    /// Execute one tool directly
    Tool {
        /// Registered tool name
        name: String,

        /// Tool input as a JSON object
        #[arg(default_value = "{}")]
        input: String,
    },

    /// List the tools available with the current configuration
    Tools,

    /// Summarize the CSV call log
    LogStats {
        /// CSV call log to read
        #[arg(long)]
        log: Option<PathBuf>,
    },
}
