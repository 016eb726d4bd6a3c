//! Tool exposing a node's bound memory stream to the model (spec §4.3,
//! scenario S5): retrieve past observations by similarity to a query.

use crate::registry::{Tool, ToolResult};
use agenticlaw_core::ObservationContent;
use agenticlaw_memory::MemoryStream;
use serde_json::{json, Value};
use std::sync::Arc;

/// Flattens an observation's tagged payload into plain text for the model,
/// rather than exposing the wire-level `content_kind`/`content_value` shape.
fn content_text(content: &ObservationContent) -> String {
    match content {
        ObservationContent::Message(m) => format!("{}: {}", m.sender, m.content),
        ObservationContent::ToolResult { tool_name, result } => {
            format!("[tool result: {tool_name}] {result}")
        }
        ObservationContent::LlmResponse { content } => content.clone(),
    }
}

pub struct MemoryRetrieveTool {
    stream: Arc<MemoryStream>,
}

impl MemoryRetrieveTool {
    pub fn new(stream: Arc<MemoryStream>) -> Self {
        Self { stream }
    }
}

#[async_trait::async_trait]
impl Tool for MemoryRetrieveTool {
    fn name(&self) -> &str {
        "memory_retrieve"
    }

    fn description(&self) -> &str {
        "Retrieve the k observations from this node's memory stream most relevant to a query, ranked by recency, importance, and similarity."
    }

    fn is_read_only(&self) -> bool {
        true
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string" },
                "k": { "type": "integer", "minimum": 1, "default": 5 }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let Some(query) = args.get("query").and_then(Value::as_str) else {
            return ToolResult::error("missing required field: query");
        };
        let k = args.get("k").and_then(Value::as_u64).unwrap_or(5) as usize;
        match self.stream.retrieve(query, k, None, None).await {
            Ok(observations) => {
                let rendered: Vec<Value> = observations
                    .iter()
                    .map(|o| {
                        json!({
                            "created": o.created.to_rfc3339(),
                            "kind": o.content_kind.to_string(),
                            "content": content_text(&o.content),
                        })
                    })
                    .collect();
                ToolResult::Json(json!({ "observations": rendered }))
            }
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agenticlaw_core::{Message, ObservationContent};
    use agenticlaw_memory::HashEmbedder;

    // Scenario S5: the queried event is present among the retrieved hits.
    #[tokio::test]
    async fn retrieve_surfaces_the_matching_observation() {
        let stream = Arc::new(MemoryStream::new_in_memory(Arc::new(HashEmbedder)));
        for i in 0..10 {
            stream
                .add(
                    ObservationContent::Message(Message::new("user", format!("event-{i}"))),
                    0.5,
                )
                .await
                .unwrap();
        }

        let tool = MemoryRetrieveTool::new(stream);
        assert!(tool.is_read_only());
        let result = tool.execute(json!({"query": "event-7", "k": 3})).await;
        match result {
            ToolResult::Json(v) => {
                let observations = v["observations"].as_array().unwrap();
                assert!(observations.len() <= 3 && !observations.is_empty());
                assert!(observations
                    .iter()
                    .any(|o| o["content"].as_str() == Some("user: event-7")));
            }
            other => panic!("expected json result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_query_is_an_error() {
        let stream = Arc::new(MemoryStream::new_in_memory(Arc::new(HashEmbedder)));
        let tool = MemoryRetrieveTool::new(stream);
        assert!(tool.execute(json!({})).await.is_error());
    }
}
