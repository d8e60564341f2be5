pub mod providers;

pub use finagent_tools::LlmError;
pub use providers::create_provider;
pub use providers::openai::OpenAiCompatProvider;
