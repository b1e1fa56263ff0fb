pub mod anthropic;
pub mod mock;
pub mod openai_compat;
pub mod traits;
mod util;

pub use anthropic::AnthropicProvider;
pub use mock::MockProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use traits::{LlmProvider, ProviderResponse, Usage};
