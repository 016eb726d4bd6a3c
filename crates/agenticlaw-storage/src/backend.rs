//! The async storage contract (spec §4.1, §6). Any backend — the embedded
//! `SqliteStorage` here, or a hosted SQL / other store — satisfying this
//! trait is pluggable into the rest of the engine.

use crate::error::Result;
use agenticlaw_core::{KgEntity, KgRelationship, NodeId, Observation, Project, ProjectId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub id: ProjectId,
    pub name: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// The full knowledge graph as loaded from storage, used by
/// `agenticlaw-kg`'s in-memory traversal layer.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct KgSnapshot {
    pub entities: Vec<KgEntity>,
    pub relationships: Vec<KgRelationship>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MemoryStreamMetadata {
    pub last_reflection_point: i64,
}

#[async_trait]
pub trait StorageBackend: Send + Sync {
    // === Projects ===
    async fn list_projects(&self) -> Result<Vec<ProjectSummary>>;
    async fn get_project(&self, id: &ProjectId) -> Result<Option<Project>>;
    /// Upsert; replaces nodes/edges atomically and bumps `updated_at`.
    async fn save_project(&self, project: &Project) -> Result<()>;
    /// Cascades to kgs, memory streams, observations, vectors, nodes, edges.
    async fn delete_project(&self, id: &ProjectId) -> Result<()>;
    async fn project_exists(&self, id: &ProjectId) -> Result<bool>;

    // === KnowledgeGraph ===
    /// Idempotent: returns the existing kg id if one is already bound to
    /// `(project_id, node_id)`.
    async fn kg_ensure(&self, project_id: &ProjectId, node_id: &NodeId) -> Result<i64>;
    async fn kg_add_entity(
        &self,
        kg_id: i64,
        name: &str,
        properties: &std::collections::BTreeMap<String, String>,
    ) -> Result<()>;
    async fn kg_update_entity_properties(
        &self,
        kg_id: i64,
        name: &str,
        properties: &std::collections::BTreeMap<String, String>,
    ) -> Result<()>;
    async fn kg_remove_entity(&self, kg_id: i64, name: &str) -> Result<()>;
    async fn kg_add_relationship(
        &self,
        kg_id: i64,
        from_name: &str,
        rel_type: &str,
        to_name: &str,
        properties: &std::collections::BTreeMap<String, String>,
    ) -> Result<()>;
    async fn kg_load_full(
        &self,
        project_id: &ProjectId,
        node_id: &NodeId,
    ) -> Result<Option<KgSnapshot>>;

    // === MemoryStream ===
    async fn ms_ensure(&self, project_id: &ProjectId, node_id: &NodeId) -> Result<i64>;
    /// Writes the observation record and its vector row in a single
    /// transaction. Returns the storage-assigned id.
    async fn ms_add_observation(&self, ms_id: i64, obs: &Observation) -> Result<i64>;
    /// At most `k` nearest neighbours by vector distance, optionally
    /// bounded by `created` time.
    async fn ms_search(
        &self,
        ms_id: i64,
        query_vec: &[f32],
        k: usize,
        from: Option<chrono::DateTime<chrono::Utc>>,
        to: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<Vec<Observation>>;
    /// The `n` most recent observations, oldest-first.
    async fn ms_get_recent(&self, ms_id: i64, n: usize) -> Result<Vec<Observation>>;
    async fn ms_update_accessed(&self, ids: &[i64]) -> Result<()>;
    async fn ms_get_metadata(&self, ms_id: i64) -> Result<MemoryStreamMetadata>;
    async fn ms_update_metadata(&self, ms_id: i64, metadata: &MemoryStreamMetadata) -> Result<()>;
}
