//! Fire-and-forget introspection event bus (spec §6). Grounded on
//! `agenticlaw-gateway`'s existing `broadcast::Sender<OutputEvent>` pattern:
//! publishing with no subscribers is a no-op, never an error.

use serde::Serialize;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    MessageReceived,
    LlmCallStarted,
    LlmCallCompleted,
    ToolSelected,
    ToolCompleted,
    ErrorOccurred,
}

#[derive(Clone, Debug, Serialize)]
pub struct AgentIntrospectionEvent {
    pub kind: EventKind,
    pub agent_name: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub data: HashMap<String, serde_json::Value>,
}

impl AgentIntrospectionEvent {
    pub fn new(kind: EventKind, agent_name: impl Into<String>) -> Self {
        Self {
            kind,
            agent_name: agent_name.into(),
            timestamp: chrono::Utc::now(),
            data: HashMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.data.insert(key.to_string(), v);
        }
        self
    }
}

/// Thin wrapper over a broadcast channel. Cloning shares the same bus.
#[derive(Clone)]
pub struct EventBus {
    tx: tokio::sync::broadcast::Sender<AgentIntrospectionEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _rx) = tokio::sync::broadcast::channel(1024);
        Self { tx }
    }

    /// Publish an event. A send with no subscribers is swallowed, matching
    /// "failures in subscribers are swallowed" from spec §4.7.
    pub fn publish(&self, event: AgentIntrospectionEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<AgentIntrospectionEvent> {
        self.tx.subscribe()
    }
}
