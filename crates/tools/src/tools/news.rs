//! News search via NewsAPI `/v2/everything`.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::http::{fetch_json, normalize_base_url};
use crate::tool::{optional_str, required_str, Tool, ToolContext, ToolDefinition, ToolError, ToolResult};

const PAGE_SIZE: usize = 5;
const DESCRIPTION_PREVIEW_CHARS: usize = 150;

/// Ordering accepted by NewsAPI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    #[default]
    Relevancy,
    Popularity,
    PublishedAt,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Relevancy => "relevancy",
            SortBy::Popularity => "popularity",
            SortBy::PublishedAt => "publishedAt",
        }
    }
}

impl FromStr for SortBy {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "relevancy" => Ok(SortBy::Relevancy),
            "popularity" => Ok(SortBy::Popularity),
            "publishedAt" => Ok(SortBy::PublishedAt),
            other => Err(ToolError::InvalidInput(format!(
                "unknown sort_by '{other}' (expected relevancy, popularity or publishedAt)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArticleSource {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub published_at: Option<String>,
    pub source: Option<ArticleSource>,
}

/// Searches recent news articles by keyword.
pub struct NewsTool {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    language: String,
    from_date: String,
}

impl NewsTool {
    pub const DEFAULT_BASE_URL: &'static str = "https://newsapi.org";

    /// Fails with [`ToolError::NotConfigured`] when the key is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ToolError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ToolError::NotConfigured("NewsAPI key is required".to_string()));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            language: "ru".to_string(),
            from_date: "2025-06-01".to_string(),
        })
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = normalize_base_url(url);
        self
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }

    /// Earliest publication date (YYYY-MM-DD).
    pub fn with_from_date(mut self, date: &str) -> Self {
        self.from_date = date.to_string();
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Fetch the top articles for `query`, newest page only.
    pub async fn search(&self, query: &str, sort_by: SortBy) -> Result<Vec<Article>, ToolError> {
        let to = Utc::now().format("%Y-%m-%d").to_string();
        let page_size = PAGE_SIZE.to_string();
        debug!(query, sort_by = sort_by.as_str(), "searching news");

        let request = self
            .client
            .get(format!("{}/v2/everything", self.base_url))
            .query(&[
                ("q", query),
                ("from", self.from_date.as_str()),
                ("to", to.as_str()),
                ("language", self.language.as_str()),
                ("sortBy", sort_by.as_str()),
                ("pageSize", page_size.as_str()),
                ("page", "1"),
                ("apiKey", self.api_key.as_str()),
            ]);
        let body = fetch_json(request, "NewsAPI").await?;

        if body["status"].as_str() == Some("error") {
            let message = body["message"].as_str().unwrap_or("unknown error");
            return Err(ToolError::ExternalService(format!("NewsAPI: {message}")));
        }

        let articles: Vec<Article> = serde_json::from_value(body["articles"].clone())
            .map_err(|e| ToolError::ExternalService(format!("NewsAPI: malformed articles: {e}")))?;
        Ok(articles.into_iter().take(PAGE_SIZE).collect())
    }

    /// Render articles as the plain-text digest handed back to the agent.
    pub fn format_articles(&self, query: &str, articles: &[Article], today: NaiveDate) -> String {
        if articles.is_empty() {
            return format!("No news found for query: '{query}'");
        }

        let from = NaiveDate::parse_from_str(&self.from_date, "%Y-%m-%d")
            .map(|d| d.format("%d.%m.%Y").to_string())
            .unwrap_or_else(|_| self.from_date.clone());

        let mut lines = vec![
            format!("Top {} most relevant news:", articles.len().min(PAGE_SIZE)),
            format!("Query: '{query}'"),
            format!("Period: {from} - {}", today.format("%d.%m.%Y")),
            String::new(),
        ];

        for (idx, article) in articles.iter().take(PAGE_SIZE).enumerate() {
            let title = article.title.as_deref().unwrap_or("Untitled");
            let source = article
                .source
                .as_ref()
                .and_then(|s| s.name.as_deref())
                .unwrap_or("Unknown source");
            let description = article
                .description
                .as_deref()
                .filter(|d| !d.is_empty())
                .map(|d| {
                    let preview: String = d.chars().take(DESCRIPTION_PREVIEW_CHARS).collect();
                    format!("{preview}...")
                })
                .unwrap_or_default();

            lines.push(format!("{}. {}", idx + 1, title));
            lines.push(format!("   {description}"));
            lines.push(format!("   {} | {}", published_date(article), source));
            if let Some(url) = article.url.as_deref().filter(|u| !u.is_empty()) {
                lines.push(format!("   Read: {url}"));
            }
            lines.push(String::new());
        }

        lines.join("\n")
    }
}

fn published_date(article: &Article) -> String {
    match article.published_at.as_deref() {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.format("%d.%m.%Y").to_string())
            .unwrap_or_else(|_| raw.to_string()),
        None => "unknown date".to_string(),
    }
}

#[async_trait]
impl Tool for NewsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "news_fetcher".to_string(),
            description: format!(
                "Searches news articles by keywords published since {}. Returns the top {} most relevant articles.",
                self.from_date, PAGE_SIZE
            ),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Keyword or phrase to search for (e.g. 'inflation', 'dollar rate')"
                    },
                    "sort_by": {
                        "type": "string",
                        "enum": ["relevancy", "popularity", "publishedAt"],
                        "description": "Sort order, defaults to relevancy"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn execute(&self, input: Value, _context: &ToolContext) -> Result<ToolResult, ToolError> {
        let query = required_str(&input, "query")?;
        let sort_by = match optional_str(&input, "sort_by") {
            Some(s) => s.parse()?,
            None => SortBy::default(),
        };

        let articles = self.search(query, sort_by).await?;
        let today = Utc::now().date_naive();
        Ok(ToolResult::text(self.format_articles(query, &articles, today)))
    }
}
