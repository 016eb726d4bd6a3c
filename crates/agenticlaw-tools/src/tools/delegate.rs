//! The delegate tool synthesized per outgoing edge of kind `agent -> agent`
//! (spec §4.5, §9): lets one deployed agent hand a question to another by
//! name, without holding a strong reference to it.
//!
//! The target is resolved by node id through an [`ExecutableLookup`] at call
//! time rather than captured up front, so the graph's agents never form a
//! reference cycle among themselves; the runtime owns that map.

use crate::registry::{Tool, ToolResult};
use serde_json::{json, Value};
use std::sync::Arc;

/// Anything that can answer a single question and return its final text
/// reply. Implemented by the agent runtime for each deployed agent.
#[async_trait::async_trait]
pub trait AskTarget: Send + Sync {
    async fn ask(&self, question: &str) -> Result<String, String>;
}

/// Resolves a node id to its live [`AskTarget`], if the node is currently
/// deployed.
pub trait ExecutableLookup: Send + Sync {
    fn lookup(&self, node_id: &str) -> Option<Arc<dyn AskTarget>>;
}

pub struct DelegateTool {
    target_node_id: String,
    target_label: String,
    tool_name: String,
    description: String,
    lookup: Arc<dyn ExecutableLookup>,
}

impl DelegateTool {
    /// `target_label` is a human/LLM-facing name for the delegate (usually
    /// the target node's display name); it is slugified into the tool name
    /// `ask_<label>`.
    pub fn new(
        target_node_id: impl Into<String>,
        target_label: impl Into<String>,
        lookup: Arc<dyn ExecutableLookup>,
    ) -> Self {
        let target_label = target_label.into();
        let slug: String = target_label
            .chars()
            .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
            .collect();
        let tool_name = format!("ask_{slug}");
        let description = format!("Ask the agent '{target_label}' a question and wait for its reply.");
        Self {
            target_node_id: target_node_id.into(),
            target_label,
            tool_name,
            description,
            lookup,
        }
    }
}

#[async_trait::async_trait]
impl Tool for DelegateTool {
    fn name(&self) -> &str {
        &self.tool_name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "question": { "type": "string" }
            },
            "required": ["question"]
        })
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let Some(question) = args.get("question").and_then(Value::as_str) else {
            return ToolResult::error("missing required field: question");
        };
        let Some(target) = self.lookup.lookup(&self.target_node_id) else {
            return ToolResult::error(format!(
                "agent '{}' is not currently deployed",
                self.target_label
            ));
        };
        match target.ask(question).await {
            Ok(reply) => ToolResult::text(reply),
            Err(e) => ToolResult::error(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::RwLock;

    struct StubAgent(String);
    #[async_trait::async_trait]
    impl AskTarget for StubAgent {
        async fn ask(&self, _question: &str) -> Result<String, String> {
            Ok(self.0.clone())
        }
    }

    struct StaticLookup(RwLock<HashMap<String, Arc<dyn AskTarget>>>);
    impl ExecutableLookup for StaticLookup {
        fn lookup(&self, node_id: &str) -> Option<Arc<dyn AskTarget>> {
            self.0.read().unwrap().get(node_id).cloned()
        }
    }

    fn lookup_with(id: &str, target: Arc<dyn AskTarget>) -> Arc<dyn ExecutableLookup> {
        let mut map = HashMap::new();
        map.insert(id.to_string(), target);
        Arc::new(StaticLookup(RwLock::new(map)))
    }

    // Scenario S3: forwards the question and returns the target's reply.
    #[tokio::test]
    async fn forwards_question_and_returns_reply() {
        let lookup = lookup_with("node-b", Arc::new(StubAgent("4".to_string())));
        let tool = DelegateTool::new("node-b", "Helper Bee", lookup);
        assert_eq!(tool.name(), "ask_helper_bee");

        let result = tool.execute(json!({"question": "2+2?"})).await;
        match result {
            ToolResult::Text(s) => assert_eq!(s, "4"),
            other => panic!("expected text result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn undeployed_target_is_an_error() {
        let lookup = lookup_with("node-b", Arc::new(StubAgent("4".to_string())));
        let tool = DelegateTool::new("node-c", "Other", lookup);
        assert!(tool.execute(json!({"question": "hi"})).await.is_error());
    }

    #[tokio::test]
    async fn missing_question_is_an_error() {
        let lookup = lookup_with("node-b", Arc::new(StubAgent("4".to_string())));
        let tool = DelegateTool::new("node-b", "Helper", lookup);
        assert!(tool.execute(json!({})).await.is_error());
    }
}
