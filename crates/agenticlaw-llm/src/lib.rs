//! Pluggable, non-streaming LLM adapter contract plus one reference
//! implementation (spec §4.7, §6).

pub mod anthropic;
pub mod mock;
pub mod provider;
pub mod types;

pub use anthropic::AnthropicProvider;
pub use mock::MockLlmProvider;
pub use provider::{LlmError, LlmProvider, LlmResult};
pub use types::{FunctionSchema, LlmMessage, LlmResponse, ToolCall, ToolCallFunction, ToolSchema, Usage};
