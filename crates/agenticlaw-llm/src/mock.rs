//! A scriptable provider for exercising callers without a live API,
//! mirroring the mock-provider pattern used elsewhere in the workspace.

use crate::provider::{LlmProvider, LlmResult};
use crate::types::{LlmMessage, LlmResponse, ToolSchema};
use std::sync::Mutex;

/// Returns one pre-scripted [`LlmResponse`] per call, in order, looping the
/// last entry once exhausted.
pub struct MockLlmProvider {
    responses: Mutex<Vec<LlmResponse>>,
    calls: Mutex<Vec<Vec<LlmMessage>>>,
}

impl MockLlmProvider {
    pub fn new(responses: Vec<LlmResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self::new(vec![LlmResponse {
            content: Some(text.into()),
            ..Default::default()
        }])
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl LlmProvider for MockLlmProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn models(&self) -> &[&str] {
        &["mock-model"]
    }

    async fn chat_completion(
        &self,
        _model: &str,
        _system: Option<&str>,
        messages: &[LlmMessage],
        _tool_schemas: &[ToolSchema],
    ) -> LlmResult<LlmResponse> {
        self.calls.lock().unwrap().push(messages.to_vec());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Ok(LlmResponse::default());
        }
        if responses.len() == 1 {
            Ok(responses[0].clone())
        } else {
            Ok(responses.remove(0))
        }
    }
}
