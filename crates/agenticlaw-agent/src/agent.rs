//! The Agent executor (spec §4.7): one LLM turn, possibly expanding into a
//! tool-call loop, terminating when the model replies with no tool calls.
//! Grounded on this crate's prior turn/tool-loop shape and
//! `beezle_bug/agent_graph/agent.py` for the stateful/stateless split.

use crate::template;
use agenticlaw_core::{AgentIntrospectionEvent, EventBus, EventKind, Message, NodeId};
use agenticlaw_kg::EntitySchemaRegistry;
use agenticlaw_llm::{LlmMessage, LlmProvider, LlmResponse};
use agenticlaw_memory::MemoryStream;
use agenticlaw_tools::{AskTarget, ToolRegistry};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// How many of the most recent memory-stream observations form the context
/// window in stateful mode (spec §4.7 step 2, default N).
const DEFAULT_MEMORY_CONTEXT_SIZE: usize = 25;

pub struct AgentConfig {
    pub name: String,
    pub model: String,
    pub system_prompt_template: String,
    pub max_tool_iterations: usize,
    pub memory_context_size: usize,
}

impl AgentConfig {
    pub fn new(name: impl Into<String>, model: impl Into<String>, system_prompt_template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            system_prompt_template: system_prompt_template.into(),
            max_tool_iterations: 25,
            memory_context_size: DEFAULT_MEMORY_CONTEXT_SIZE,
        }
    }
}

/// A single type covering both stateful and stateless agents (spec §9): the
/// null `memory` case is a first-class execution mode, not a second type.
pub struct Agent {
    pub id: NodeId,
    config: AgentConfig,
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    memory: Option<Arc<MemoryStream>>,
    events: EventBus,
}

impl Agent {
    pub fn new(
        id: NodeId,
        config: AgentConfig,
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        memory: Option<Arc<MemoryStream>>,
        events: EventBus,
    ) -> Self {
        Self {
            id,
            config,
            provider,
            tools,
            memory,
            events,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    fn publish(&self, event: AgentIntrospectionEvent) {
        self.events.publish(event);
    }

    fn render_system_prompt(&self) -> String {
        let mut vars = std::collections::HashMap::new();
        vars.insert("timestamp", chrono::Utc::now().to_rfc3339());
        vars.insert("entity_schema_summary", EntitySchemaRegistry::summarize());
        template::render(&self.config.system_prompt_template, &vars)
    }

    fn message_to_llm(&self, m: &Message) -> LlmMessage {
        if m.sender == self.config.name {
            LlmMessage::new("assistant", m.content.clone())
        } else {
            LlmMessage::new("user", format!("{}: {}", m.sender, m.content))
        }
    }

    fn observation_to_llm(&self, o: &agenticlaw_core::Observation) -> LlmMessage {
        use agenticlaw_core::ObservationContent;
        match &o.content {
            ObservationContent::Message(m) => self.message_to_llm(m),
            ObservationContent::ToolResult { tool_name, result } => {
                LlmMessage::new("user", format!("[tool result: {tool_name}] {result}"))
            }
            ObservationContent::LlmResponse { content } => LlmMessage::new("assistant", content.clone()),
        }
    }

    /// Runs one turn to completion and returns the agent's reply as a
    /// message list (spec §4.7 step 5), or `[]` on adapter failure or an
    /// empty final reply.
    pub async fn execute(&self, messages: &[Message]) -> Vec<Message> {
        self.publish(
            AgentIntrospectionEvent::new(EventKind::MessageReceived, self.name())
                .with("count", messages.len()),
        );

        let system_prompt = self.render_system_prompt();

        let mut context: Vec<LlmMessage> = if let Some(memory) = &self.memory {
            for m in messages {
                if let Err(e) = memory
                    .add(agenticlaw_core::ObservationContent::Message(m.clone()), 0.5)
                    .await
                {
                    warn!(agent = self.name(), error = %e, "failed to persist input observation");
                }
            }
            match memory.get_recent(self.config.memory_context_size).await {
                Ok(recent) => recent.iter().map(|o| self.observation_to_llm(o)).collect(),
                Err(e) => {
                    warn!(agent = self.name(), error = %e, "failed to read memory context");
                    messages.iter().map(|m| self.message_to_llm(m)).collect()
                }
            }
        } else {
            messages.iter().map(|m| self.message_to_llm(m)).collect()
        };

        let tool_schemas = self.tools.get_definitions();
        let mut iterations = 0usize;

        loop {
            iterations += 1;
            if iterations > self.config.max_tool_iterations {
                warn!(agent = self.name(), "max tool iterations exceeded");
                return Vec::new();
            }

            let started = Instant::now();
            self.publish(AgentIntrospectionEvent::new(EventKind::LlmCallStarted, self.name()));

            let response: LlmResponse = match self
                .provider
                .chat_completion(&self.config.model, Some(&system_prompt), &context, &tool_schemas)
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    self.publish(
                        AgentIntrospectionEvent::new(EventKind::ErrorOccurred, self.name())
                            .with("error", e.to_string()),
                    );
                    return Vec::new();
                }
            };

            let duration_ms = started.elapsed().as_millis() as u64;
            self.publish(
                AgentIntrospectionEvent::new(EventKind::LlmCallCompleted, self.name())
                    .with("duration_ms", duration_ms)
                    .with("content_preview", preview(response.content.as_deref().unwrap_or(""))),
            );

            if let Some(memory) = &self.memory {
                let text = response.content.clone().unwrap_or_default();
                if let Err(e) = memory
                    .add(agenticlaw_core::ObservationContent::LlmResponse { content: text }, 0.5)
                    .await
                {
                    warn!(agent = self.name(), error = %e, "failed to persist llm response observation");
                }
            }

            if response.tool_calls.is_empty() {
                return match response.content {
                    Some(content) if !content.is_empty() => {
                        vec![Message::new(self.config.name.clone(), content)]
                    }
                    _ => Vec::new(),
                };
            }

            context.push(LlmMessage::new(
                "assistant",
                response.content.clone().unwrap_or_default(),
            ));

            for call in &response.tool_calls {
                self.publish(
                    AgentIntrospectionEvent::new(EventKind::ToolSelected, self.name())
                        .with("tool", call.function.name.clone()),
                );

                let args = call
                    .parsed_arguments()
                    .unwrap_or_else(|_| serde_json::Value::String(call.function.arguments_json.clone()));

                let result = self.tools.execute(&call.function.name, args).await;
                let is_error = result.is_error();
                let result_str = result.to_content_string();

                self.publish(
                    AgentIntrospectionEvent::new(EventKind::ToolCompleted, self.name())
                        .with("tool", call.function.name.clone())
                        .with("is_error", is_error),
                );

                if let Some(memory) = &self.memory {
                    if let Err(e) = memory
                        .add(
                            agenticlaw_core::ObservationContent::ToolResult {
                                tool_name: call.function.name.clone(),
                                result: result_str.clone(),
                            },
                            0.3,
                        )
                        .await
                    {
                        warn!(agent = self.name(), error = %e, "failed to persist tool result observation");
                    }
                }

                context.push(LlmMessage::new(
                    "user",
                    format!("[tool result: {}] {}", call.function.name, result_str),
                ));
            }

            debug!(agent = self.name(), iteration = iterations, "continuing tool loop");
        }
    }
}

fn preview(content: &str) -> String {
    const MAX: usize = 120;
    if content.len() <= MAX {
        content.to_string()
    } else {
        format!("{}…", &content[..MAX])
    }
}

#[async_trait::async_trait]
impl AskTarget for Agent {
    /// The delegate-tool body (spec §4.5 step 3, §9): calls this agent with
    /// a single synthetic message from the asking agent and returns its
    /// first reply, or `"No response"` if the turn produced none.
    async fn ask(&self, question: &str) -> Result<String, String> {
        let input = vec![Message::new("delegate", question)];
        let output = self.execute(&input).await;
        Ok(output
            .into_iter()
            .next()
            .map(|m| m.content)
            .unwrap_or_else(|| "No response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agenticlaw_llm::{LlmResponse, MockLlmProvider, ToolCall, ToolCallFunction};
    use serde_json::json;

    fn bare_agent(provider: MockLlmProvider, tools: ToolRegistry) -> Agent {
        Agent::new(
            NodeId::generate(),
            AgentConfig::new("A", "mock-model", "You are {{timestamp}}."),
            Arc::new(provider),
            Arc::new(tools),
            None,
            EventBus::new(),
        )
    }

    #[tokio::test]
    async fn stateless_turn_without_tool_calls_returns_single_reply() {
        let agent = bare_agent(MockLlmProvider::with_text("hello"), ToolRegistry::new());
        let out = agent.execute(&[Message::new("Alice", "hi")]).await;
        assert_eq!(out, vec![Message::new("A", "hello")]);
    }

    #[tokio::test]
    async fn adapter_failure_returns_empty_reply() {
        struct FailingProvider;
        #[async_trait::async_trait]
        impl LlmProvider for FailingProvider {
            fn name(&self) -> &str {
                "failing"
            }
            fn models(&self) -> &[&str] {
                &["mock-model"]
            }
            async fn chat_completion(
                &self,
                _model: &str,
                _system: Option<&str>,
                _messages: &[LlmMessage],
                _tool_schemas: &[agenticlaw_llm::ToolSchema],
            ) -> agenticlaw_llm::LlmResult<LlmResponse> {
                Err(agenticlaw_llm::LlmError::RequestFailed("boom".to_string()))
            }
        }
        let agent = Agent::new(
            NodeId::generate(),
            AgentConfig::new("A", "mock-model", "sys"),
            Arc::new(FailingProvider),
            Arc::new(ToolRegistry::new()),
            None,
            EventBus::new(),
        );
        let out = agent.execute(&[Message::new("Alice", "hi")]).await;
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn tool_call_loop_resolves_unknown_tool_as_error_result_and_continues() {
        let provider = MockLlmProvider::new(vec![
            LlmResponse {
                content: None,
                tool_calls: vec![ToolCall {
                    id: "1".to_string(),
                    kind: "function".to_string(),
                    function: ToolCallFunction {
                        name: "no_such_tool".to_string(),
                        arguments_json: json!({}).to_string(),
                    },
                }],
                ..Default::default()
            },
            LlmResponse {
                content: Some("done".to_string()),
                ..Default::default()
            },
        ]);
        let agent = bare_agent(provider, ToolRegistry::new());
        let out = agent.execute(&[Message::new("Alice", "hi")]).await;
        assert_eq!(out, vec![Message::new("A", "done")]);
    }
}
