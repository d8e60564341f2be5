//! Built-in tool implementations.
//!
//! - **Informational API tools** (`news_fetcher`, `currency_converter`, `time_tool`):
//!   one HTTP request each against a third-party service
//! - **Document tools** (`contract_analyzer`, `regulation_search`): extract text,
//!   build a prompt and delegate the answer to a [`TextModel`](crate::model::TextModel)

pub mod contract;
pub mod currency;
pub mod news;
pub mod regulation;
pub mod time;

pub use contract::ContractAnalyzerTool;
pub use currency::CurrencyConversionTool;
pub use news::{NewsTool, SortBy};
pub use regulation::RegulationSearchTool;
pub use time::TimeTool;
