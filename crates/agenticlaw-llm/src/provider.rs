//! The pluggable LLM adapter contract (spec §4.7, §6).

use crate::types::{LlmMessage, LlmResponse, ToolSchema};

pub type LlmResult<T> = Result<T, LlmError>;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("rate limited: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

/// One non-streaming model call: full message history in, one reply out.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;
    fn models(&self) -> &[&str];

    fn supports_model(&self, model: &str) -> bool {
        self.models()
            .iter()
            .any(|m| *m == model || model.starts_with(m))
    }

    async fn chat_completion(
        &self,
        model: &str,
        system: Option<&str>,
        messages: &[LlmMessage],
        tool_schemas: &[ToolSchema],
    ) -> LlmResult<LlmResponse>;
}
