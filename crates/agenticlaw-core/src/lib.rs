//! Agenticlaw Core - Shared data model, error taxonomy, and event bus
//! for the agent graph execution engine.

pub mod error;
pub mod event;
pub mod ids;
pub mod model;
pub mod types;

pub use error::{Error, Result};
pub use event::{AgentIntrospectionEvent, EventBus, EventKind};
pub use ids::{EdgeId, NodeId, ProjectId};
pub use model::{
    Edge, EdgeKind, KgEntity, KgRelationship, MessageBufferState, Node, NodeConfig, NodeKind,
    Port, Project, ProjectExport, ScheduledEventConfig,
};
pub use types::{Message, Observation, ObservationContent};
