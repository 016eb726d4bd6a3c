//! Design-time data model: Node, Edge, Project (spec §3 and §6).

use crate::ids::{EdgeId, NodeId, ProjectId};
use crate::types::Message;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Agent,
    KnowledgeGraph,
    MemoryStream,
    Toolbox,
    TextInput,
    VoiceInput,
    TextOutput,
    ScheduledEvent,
    MessageBuffer,
}

/// Ports fixed per node kind (spec §3).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Port {
    MessageIn,
    Answer,
    MessageOut,
    Ask,
    Knowledge,
    Memory,
    Tools,
    Connection,
    Trigger,
}

impl NodeKind {
    /// Port set legal for this node kind, direction-agnostic.
    pub fn ports(self) -> &'static [Port] {
        match self {
            NodeKind::Agent => &[
                Port::MessageIn,
                Port::Answer,
                Port::MessageOut,
                Port::Ask,
                Port::Knowledge,
                Port::Memory,
                Port::Tools,
            ],
            NodeKind::KnowledgeGraph | NodeKind::MemoryStream | NodeKind::Toolbox => {
                &[Port::Connection]
            }
            NodeKind::TextInput | NodeKind::VoiceInput | NodeKind::ScheduledEvent => {
                &[Port::MessageOut]
            }
            NodeKind::TextOutput => &[Port::MessageIn],
            NodeKind::MessageBuffer => &[Port::MessageIn, Port::Trigger, Port::MessageOut],
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Message,
    Resource,
    Delegate,
}

/// Per-kind config payload. Unknown/irrelevant fields for a given kind are
/// simply left at their defaults; the builder only reads what it needs.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub name: Option<String>,
    /// Agent: system prompt template, model, max_tool_iterations.
    #[serde(default)]
    pub system_prompt_template: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub max_tool_iterations: Option<usize>,
    /// Toolbox: tool names this node exposes.
    #[serde(default)]
    pub tools: Vec<String>,
    /// ScheduledEvent.
    #[serde(default)]
    pub interval_seconds: Option<u64>,
    #[serde(default)]
    pub run_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub message_content: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub position: (f64, f64),
    pub config: NodeConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source_node: NodeId,
    pub source_port: Port,
    pub target_node: NodeId,
    pub target_port: Port,
    pub kind: EdgeKind,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub tts_settings: serde_json::Value,
    pub stt_settings: serde_json::Value,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Debug/export format from spec §6.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProjectExport {
    pub id: ProjectId,
    pub name: String,
    pub agent_graph: AgentGraphExport,
    pub tts_settings: serde_json::Value,
    pub stt_settings: serde_json::Value,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentGraphExport {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl From<&Project> for ProjectExport {
    fn from(p: &Project) -> Self {
        Self {
            id: p.id.clone(),
            name: p.name.clone(),
            agent_graph: AgentGraphExport {
                nodes: p.nodes.clone(),
                edges: p.edges.clone(),
            },
            tts_settings: p.tts_settings.clone(),
            stt_settings: p.stt_settings.clone(),
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

/// Runtime-only state for a `message_buffer` node (spec §3 invariant 6:
/// discarded on undeploy, never persisted).
#[derive(Debug, Default)]
pub struct MessageBufferState {
    pub pending: VecDeque<Message>,
}

impl MessageBufferState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer(&mut self, messages: &[Message]) {
        self.pending.extend(messages.iter().cloned());
    }

    /// Empties the pending set and returns it in arrival order.
    pub fn flush(&mut self) -> Vec<Message> {
        self.pending.drain(..).collect()
    }
}

/// Resolved scheduled-event configuration, used by the builder to register
/// callbacks with the scheduler.
#[derive(Clone, Debug)]
pub struct ScheduledEventConfig {
    pub node_id: NodeId,
    pub name: String,
    pub message_content: String,
    pub run_at: Option<chrono::DateTime<chrono::Utc>>,
    pub interval_seconds: Option<u64>,
}

/// A named entity in a knowledge graph. `name` is unique within its KG.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct KgEntity {
    pub name: String,
    pub properties: std::collections::BTreeMap<String, String>,
}

/// A directed, labelled edge between two entities in a knowledge graph.
/// No uniqueness beyond `(from, rel_type, to)` per KG.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct KgRelationship {
    pub from_entity: String,
    pub rel_type: String,
    pub to_entity: String,
    pub properties: std::collections::BTreeMap<String, String>,
}
