//! In-memory knowledge-graph façade: traversal queries backed by
//! `petgraph`, mutations delegated straight through to storage (spec §4.2).

pub mod error;
pub mod graph;
pub mod schema;

pub use error::{KgError, Result};
pub use graph::KnowledgeGraph;
pub use schema::{EntitySchema, EntitySchemaRegistry, ENTITY_SCHEMAS};
