//! Subcommand handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use finagent_core::Config;
use finagent_eval::{
    evaluate_with, load_tasks, print_summary, save_results, BpeTokenizer, CallInstrumentor,
    CallLogStats, CsvCallLog, EvalError, EvalOptions, KeywordMode,
};
use finagent_llm::{create_provider, OpenAiCompatProvider};
use finagent_tools::{AgenticLoop, ToolContext, ToolRegistry};
use tracing::{info, warn};

use crate::agent::ToolCallingAgent;
use crate::registry::build_registry;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a financial assistant. Use the available tools \
to look up news, exchange rates, the current time, contract terms and regulations. \
Answer concisely and state figures exactly as the tools return them.";

pub struct EvalArgs {
    pub tasks: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub mode: Option<String>,
    pub timeout_secs: Option<u64>,
    pub fail_fast: bool,
    pub log: Option<PathBuf>,
    pub system_prompt: Option<String>,
    pub max_iterations: usize,
}

fn tool_context() -> ToolContext {
    ToolContext::new(std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// The LLM client, or `None` when no usable endpoint is configured.
fn llm_client(config: &Config) -> Option<Arc<OpenAiCompatProvider>> {
    match create_provider(&config.llm) {
        Ok(provider) => Some(Arc::new(provider)),
        Err(e) => {
            warn!(error = %e, "LLM client unavailable");
            None
        }
    }
}

async fn registry_for(
    config: &Config,
    llm: Option<&Arc<OpenAiCompatProvider>>,
) -> Result<ToolRegistry> {
    let model = llm.map(|p| p.clone() as Arc<dyn finagent_tools::TextModel>);
    build_registry(&config.tools, model)
        .await
        .context("failed to build tool registry")
}

pub async fn run_eval(config: &Config, args: EvalArgs) -> Result<()> {
    let tasks_path = args.tasks.unwrap_or_else(|| config.eval.tasks_file.clone());
    let results_path = args.output.unwrap_or_else(|| config.eval.results_file.clone());
    let log_path = args.log.unwrap_or_else(|| config.eval.call_log_file.clone());
    let mode: KeywordMode = args
        .mode
        .as_deref()
        .unwrap_or(&config.eval.keyword_mode)
        .parse()
        .context("invalid keyword mode")?;
    let timeout = match args.timeout_secs {
        Some(0) => None,
        Some(secs) => Some(Duration::from_secs(secs)),
        None => config.eval.call_timeout(),
    };

    let tasks = load_tasks(&tasks_path)
        .with_context(|| format!("failed to load tasks from {}", tasks_path.display()))?;
    if tasks.is_empty() {
        return Err(EvalError::EmptyBatch)
            .with_context(|| format!("no tasks in {}", tasks_path.display()));
    }

    let llm = llm_client(config)
        .context("evaluation needs an LLM; set LLM_API_KEY or a local LLM_BASE_URL")?;
    let registry = registry_for(config, Some(&llm)).await?;
    info!(tools = registry.len(), tasks = tasks.len(), %mode, "starting evaluation");

    let agentic_loop = AgenticLoop::new(llm, Arc::new(registry))
        .with_max_iterations(args.max_iterations)
        .with_temperature(config.llm.temperature)
        .with_max_tokens(config.llm.max_tokens);
    let system_prompt = args
        .system_prompt
        .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
    let agent =
        ToolCallingAgent::new(agentic_loop, tool_context()).with_system_prompt(Some(system_prompt));

    let tokenizer = BpeTokenizer::cl100k().context("failed to load tokenizer")?;
    let mut instrumentor = CallInstrumentor::new(
        Arc::new(CsvCallLog::new(&log_path)),
        Arc::new(tokenizer),
    );
    if let Some(limit) = timeout {
        instrumentor = instrumentor.with_timeout(limit);
    }

    let options = EvalOptions {
        mode,
        isolate_failures: !args.fail_fast,
    };
    let results = evaluate_with(&agent, &tasks, &instrumentor, &options)
        .await
        .context("evaluation aborted")?;

    save_results(&results, &results_path)
        .with_context(|| format!("failed to save results to {}", results_path.display()))?;
    print_summary(&results)?;
    println!("Results saved to {}", results_path.display());
    println!("Call log: {}", log_path.display());
    Ok(())
}

pub async fn run_tool(config: &Config, name: &str, input: &str) -> Result<()> {
    let input: serde_json::Value =
        serde_json::from_str(input).context("tool input must be a JSON object")?;
    let llm = llm_client(config);
    let registry = registry_for(config, llm.as_ref()).await?;

    let tool = registry.require(name)?;

    match tool.execute(input, &tool_context()).await {
        Ok(result) => {
            println!("{}", result.content);
            Ok(())
        }
        Err(e) => Err(anyhow::Error::new(e).context(format!("{name} failed"))),
    }
}

pub async fn list_tools(config: &Config) -> Result<()> {
    let llm = llm_client(config);
    let registry = registry_for(config, llm.as_ref()).await?;
    if registry.is_empty() {
        println!("No tools available.");
        return Ok(());
    }
    for def in registry.definitions() {
        println!("{:<20} {}", def.name, def.description);
    }
    Ok(())
}

pub fn log_stats(config: &Config, log: Option<&Path>) -> Result<()> {
    let path = log.unwrap_or(config.eval.call_log_file.as_path());
    let records = CsvCallLog::new(path)
        .read_all()
        .with_context(|| format!("failed to read call log {}", path.display()))?;
    if records.is_empty() {
        println!("No calls logged in {}", path.display());
        return Ok(());
    }
    println!("{}", CallLogStats::from_records(&records));
    Ok(())
}
