//! Builds the tool registry from configuration.

use std::sync::Arc;

use finagent_core::config::ToolsConfig;
use finagent_tools::{
    ContractAnalyzerTool, CurrencyConversionTool, NewsTool, RegulationSearchTool, TextModel,
    TimeTool, ToolRegistry,
};
use tracing::{info, warn};

/// Register every tool the configuration allows.
///
/// Tools missing an API key are left out with a warning. The regulation
/// search is only available when its document directory loads.
pub async fn build_registry(
    tools: &ToolsConfig,
    model: Option<Arc<dyn TextModel>>,
) -> anyhow::Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();

    registry.register(TimeTool::new())?;

    match tools.news_api_key.as_deref().map(NewsTool::new) {
        Some(Ok(news)) => registry.register(
            news.with_language(&tools.news_language)
                .with_from_date(&tools.news_from_date),
        )?,
        Some(Err(e)) => warn!(error = %e, "news_fetcher disabled"),
        None => warn!("NEWS_API_KEY not set, news_fetcher disabled"),
    }

    match tools
        .exchange_rate_api_key
        .as_deref()
        .map(CurrencyConversionTool::new)
    {
        Some(Ok(fx)) => registry.register(fx)?,
        Some(Err(e)) => warn!(error = %e, "currency_converter disabled"),
        None => warn!("EXCHANGE_RATE_API_KEY not set, currency_converter disabled"),
    }

    let Some(model) = model else {
        warn!("no LLM configured, contract_analyzer and regulation_search disabled");
        return Ok(registry);
    };

    registry.register(ContractAnalyzerTool::new(model.clone()))?;

    if tools.regulations_dir.is_dir() {
        match RegulationSearchTool::load(model, &tools.regulations_dir).await {
            Ok(search) => {
                info!(chunks = search.chunks().len(), "regulation_search ready");
                registry.register(search)?;
            }
            Err(e) => warn!(error = %e, "regulation_search disabled"),
        }
    } else {
        warn!(
            dir = %tools.regulations_dir.display(),
            "regulations directory missing, regulation_search disabled"
        );
    }

    Ok(registry)
}
