//! Embedded SQLite backend: relational tables for projects/graphs plus a
//! `vec0` virtual table for observation embeddings (dual-table design,
//! grounded on the loom sqlite-vec store).

use crate::backend::{KgSnapshot, MemoryStreamMetadata, ProjectSummary, StorageBackend};
use crate::error::{Result, StorageError};
use crate::schema::{create_vec_table_sql, EMBEDDING_DIM, SCHEMA_SQL};
use agenticlaw_core::{
    Edge, KgEntity, KgRelationship, Node, NodeId, Observation, ObservationContent,
    ObservationContentKind, Project, ProjectId,
};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Once;

static SQLITE_VEC_INIT: Once = Once::new();

fn vector_to_json(v: &[f32]) -> String {
    let parts: Vec<String> = v.iter().map(|f| f.to_string()).collect();
    format!("[{}]", parts.join(","))
}

fn millis(dt: chrono::DateTime<chrono::Utc>) -> i64 {
    dt.timestamp_millis()
}

fn from_millis(ms: i64) -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

fn properties_to_json(props: &BTreeMap<String, String>) -> Result<String> {
    Ok(serde_json::to_string(props)?)
}

fn properties_from_json(s: &str) -> Result<BTreeMap<String, String>> {
    Ok(serde_json::from_str(s)?)
}

/// Embedded, file-backed store for one agenticlaw instance.
pub struct SqliteStorage {
    db_path: PathBuf,
    /// Held open for the life of the store. For `file::memory:` URIs this is
    /// what keeps the shared-cache database alive between the short-lived
    /// connections each `spawn_blocking` call opens.
    _keepalive: std::sync::Mutex<Connection>,
}

impl SqliteStorage {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        SQLITE_VEC_INIT.call_once(|| unsafe {
            rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
                sqlite_vec::sqlite3_vec_init as *const (),
            )));
        });

        let db_path = path.as_ref().to_path_buf();
        let conn = Connection::open(&db_path)?;
        conn.execute_batch(SCHEMA_SQL)?;
        conn.execute(&create_vec_table_sql(EMBEDDING_DIM), [])?;
        Ok(Self {
            db_path,
            _keepalive: std::sync::Mutex::new(conn),
        })
    }

    /// In-memory instance, used by tests. Uses a named shared-cache memory
    /// database so the separate connections opened per `spawn_blocking`
    /// call all see the same data.
    pub fn open_in_memory() -> Result<Self> {
        static COUNTER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);
        let n = COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Self::open(format!("file:agenticlaw_test_{n}?mode=memory&cache=shared"))
    }
}

#[async_trait]
impl StorageBackend for SqliteStorage {
    async fn list_projects(&self) -> Result<Vec<ProjectSummary>> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            let mut stmt = conn.prepare(
                "SELECT id, name, created_at, updated_at FROM projects ORDER BY updated_at DESC",
            )?;
            let rows = stmt.query_map([], |row| {
                let id: String = row.get(0)?;
                let created_at: i64 = row.get(2)?;
                let updated_at: i64 = row.get(3)?;
                Ok(ProjectSummary {
                    id: ProjectId::new(id),
                    name: row.get(1)?,
                    created_at: from_millis(created_at),
                    updated_at: from_millis(updated_at),
                })
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(StorageError::from)
        })
        .await?
    }

    async fn get_project(&self, id: &ProjectId) -> Result<Option<Project>> {
        let db_path = self.db_path.clone();
        let id = id.clone();
        tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            let project_row: Option<(String, String, String, i64, i64)> = conn
                .query_row(
                    "SELECT name, tts_settings, stt_settings, created_at, updated_at FROM projects WHERE id = ?1",
                    params![id.as_str()],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
                )
                .ok();

            let Some((name, tts_settings, stt_settings, created_at, updated_at)) = project_row else {
                return Ok(None);
            };

            let mut node_stmt = conn.prepare(
                "SELECT id, kind, position_x, position_y, config FROM nodes WHERE project_id = ?1",
            )?;
            let nodes: Vec<Node> = node_stmt
                .query_map(params![id.as_str()], |row| {
                    let node_id: String = row.get(0)?;
                    let kind_str: String = row.get(1)?;
                    let config_str: String = row.get(4)?;
                    Ok((node_id, kind_str, row.get::<_, f64>(2)?, row.get::<_, f64>(3)?, config_str))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?
                .into_iter()
                .map(|(node_id, kind_str, x, y, config_str)| {
                    Ok(Node {
                        id: NodeId::new(node_id),
                        kind: serde_json::from_str(&format!("\"{kind_str}\""))?,
                        position: (x, y),
                        config: serde_json::from_str(&config_str)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            let mut edge_stmt = conn.prepare(
                "SELECT id, source_node, source_port, target_node, target_port, kind FROM edges WHERE project_id = ?1",
            )?;
            let edges: Vec<Edge> = edge_stmt
                .query_map(params![id.as_str()], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?
                .into_iter()
                .map(|(eid, src_node, src_port, tgt_node, tgt_port, kind)| {
                    Ok(Edge {
                        id: eid.into(),
                        source_node: src_node.into(),
                        source_port: serde_json::from_str(&format!("\"{src_port}\""))?,
                        target_node: tgt_node.into(),
                        target_port: serde_json::from_str(&format!("\"{tgt_port}\""))?,
                        kind: serde_json::from_str(&format!("\"{kind}\""))?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            Ok(Some(Project {
                id,
                name,
                tts_settings: serde_json::from_str(&tts_settings)?,
                stt_settings: serde_json::from_str(&stt_settings)?,
                nodes,
                edges,
                created_at: from_millis(created_at),
                updated_at: from_millis(updated_at),
            }))
        })
        .await?
    }

    async fn save_project(&self, project: &Project) -> Result<()> {
        let db_path = self.db_path.clone();
        let project = project.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = Connection::open(&db_path)?;
            let tx = conn.transaction()?;
            let now = millis(chrono::Utc::now());
            tx.execute(
                "INSERT INTO projects (id, name, tts_settings, stt_settings, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET name = ?2, tts_settings = ?3, stt_settings = ?4, updated_at = ?6",
                params![
                    project.id.as_str(),
                    project.name,
                    serde_json::to_string(&project.tts_settings)?,
                    serde_json::to_string(&project.stt_settings)?,
                    millis(project.created_at),
                    now,
                ],
            )?;

            tx.execute("DELETE FROM nodes WHERE project_id = ?1", params![project.id.as_str()])?;
            tx.execute("DELETE FROM edges WHERE project_id = ?1", params![project.id.as_str()])?;

            for node in &project.nodes {
                let kind_str = serde_json::to_string(&node.kind)?;
                tx.execute(
                    "INSERT INTO nodes (id, project_id, kind, position_x, position_y, config) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        node.id.as_str(),
                        project.id.as_str(),
                        kind_str.trim_matches('"'),
                        node.position.0,
                        node.position.1,
                        serde_json::to_string(&node.config)?,
                    ],
                )?;
            }
            for edge in &project.edges {
                tx.execute(
                    "INSERT INTO edges (id, project_id, source_node, source_port, target_node, target_port, kind) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        edge.id.as_str(),
                        project.id.as_str(),
                        edge.source_node.as_str(),
                        serde_json::to_string(&edge.source_port)?.trim_matches('"'),
                        edge.target_node.as_str(),
                        serde_json::to_string(&edge.target_port)?.trim_matches('"'),
                        serde_json::to_string(&edge.kind)?.trim_matches('"'),
                    ],
                )?;
            }
            tx.commit()?;
            Ok::<(), StorageError>(())
        })
        .await?
    }

    async fn delete_project(&self, id: &ProjectId) -> Result<()> {
        let db_path = self.db_path.clone();
        let id = id.clone();
        tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            let kg_ids: Vec<i64> = conn
                .prepare("SELECT id FROM knowledge_graphs WHERE project_id = ?1")?
                .query_map(params![id.as_str()], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            for kg_id in kg_ids {
                conn.execute("DELETE FROM kg_entities WHERE kg_id = ?1", params![kg_id])?;
                conn.execute("DELETE FROM kg_relationships WHERE kg_id = ?1", params![kg_id])?;
            }
            conn.execute(
                "DELETE FROM knowledge_graphs WHERE project_id = ?1",
                params![id.as_str()],
            )?;

            let ms_ids: Vec<i64> = conn
                .prepare("SELECT id FROM memory_streams WHERE project_id = ?1")?
                .query_map(params![id.as_str()], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            for ms_id in ms_ids {
                let obs_ids: Vec<i64> = conn
                    .prepare("SELECT id FROM observations WHERE ms_id = ?1")?
                    .query_map(params![ms_id], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                for obs_id in obs_ids {
                    conn.execute(
                        "DELETE FROM observations_vec WHERE rowid = ?1",
                        params![obs_id],
                    )?;
                }
                conn.execute("DELETE FROM observations WHERE ms_id = ?1", params![ms_id])?;
            }
            conn.execute(
                "DELETE FROM memory_streams WHERE project_id = ?1",
                params![id.as_str()],
            )?;

            conn.execute("DELETE FROM nodes WHERE project_id = ?1", params![id.as_str()])?;
            conn.execute("DELETE FROM edges WHERE project_id = ?1", params![id.as_str()])?;
            conn.execute("DELETE FROM projects WHERE id = ?1", params![id.as_str()])?;
            Ok::<(), StorageError>(())
        })
        .await?
    }

    async fn project_exists(&self, id: &ProjectId) -> Result<bool> {
        let db_path = self.db_path.clone();
        let id = id.clone();
        tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM projects WHERE id = ?1)",
                params![id.as_str()],
                |row| row.get(0),
            )?;
            Ok::<bool, StorageError>(exists)
        })
        .await?
    }

    async fn kg_ensure(&self, project_id: &ProjectId, node_id: &NodeId) -> Result<i64> {
        let db_path = self.db_path.clone();
        let (project_id, node_id) = (project_id.clone(), node_id.clone());
        tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            conn.execute(
                "INSERT OR IGNORE INTO knowledge_graphs (project_id, node_id) VALUES (?1, ?2)",
                params![project_id.as_str(), node_id.as_str()],
            )?;
            let id: i64 = conn.query_row(
                "SELECT id FROM knowledge_graphs WHERE project_id = ?1 AND node_id = ?2",
                params![project_id.as_str(), node_id.as_str()],
                |row| row.get(0),
            )?;
            Ok::<i64, StorageError>(id)
        })
        .await?
    }

    async fn kg_add_entity(
        &self,
        kg_id: i64,
        name: &str,
        properties: &BTreeMap<String, String>,
    ) -> Result<()> {
        let db_path = self.db_path.clone();
        let name = name.to_string();
        let props_json = properties_to_json(properties)?;
        tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO kg_entities (kg_id, name, properties) VALUES (?1, ?2, ?3)",
                params![kg_id, name, props_json],
            )?;
            if inserted == 0 {
                return Err(StorageError::DuplicateEntity);
            }
            Ok(())
        })
        .await?
    }

    async fn kg_update_entity_properties(
        &self,
        kg_id: i64,
        name: &str,
        properties: &BTreeMap<String, String>,
    ) -> Result<()> {
        let db_path = self.db_path.clone();
        let name = name.to_string();
        let new_props = properties.clone();
        tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            let existing: Option<String> = conn
                .query_row(
                    "SELECT properties FROM kg_entities WHERE kg_id = ?1 AND name = ?2",
                    params![kg_id, name],
                    |row| row.get(0),
                )
                .ok();
            let Some(existing) = existing else {
                return Err(StorageError::EntityNotFound);
            };
            let mut merged: BTreeMap<String, String> = serde_json::from_str(&existing)?;
            merged.extend(new_props);
            let merged_json = serde_json::to_string(&merged)?;
            conn.execute(
                "UPDATE kg_entities SET properties = ?1 WHERE kg_id = ?2 AND name = ?3",
                params![merged_json, kg_id, name],
            )?;
            Ok(())
        })
        .await?
    }

    async fn kg_remove_entity(&self, kg_id: i64, name: &str) -> Result<()> {
        let db_path = self.db_path.clone();
        let name = name.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            conn.execute(
                "DELETE FROM kg_relationships WHERE kg_id = ?1 AND (from_entity = ?2 OR to_entity = ?2)",
                params![kg_id, name],
            )?;
            let deleted = conn.execute(
                "DELETE FROM kg_entities WHERE kg_id = ?1 AND name = ?2",
                params![kg_id, name],
            )?;
            if deleted == 0 {
                return Err(StorageError::EntityNotFound);
            }
            Ok(())
        })
        .await?
    }

    async fn kg_add_relationship(
        &self,
        kg_id: i64,
        from_name: &str,
        rel_type: &str,
        to_name: &str,
        properties: &BTreeMap<String, String>,
    ) -> Result<()> {
        let db_path = self.db_path.clone();
        let (from_name, rel_type, to_name) =
            (from_name.to_string(), rel_type.to_string(), to_name.to_string());
        let props_json = properties_to_json(properties)?;
        tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            for entity in [&from_name, &to_name] {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM kg_entities WHERE kg_id = ?1 AND name = ?2)",
                    params![kg_id, entity],
                    |row| row.get(0),
                )?;
                if !exists {
                    return Err(StorageError::EntityNotFound);
                }
            }
            let duplicate: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM kg_relationships WHERE kg_id = ?1 AND from_entity = ?2 AND rel_type = ?3 AND to_entity = ?4)",
                params![kg_id, from_name, rel_type, to_name],
                |row| row.get(0),
            )?;
            if duplicate {
                return Err(StorageError::DuplicateRelationship);
            }
            conn.execute(
                "INSERT INTO kg_relationships (kg_id, from_entity, rel_type, to_entity, properties) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![kg_id, from_name, rel_type, to_name, props_json],
            )?;
            Ok(())
        })
        .await?
    }

    async fn kg_load_full(
        &self,
        project_id: &ProjectId,
        node_id: &NodeId,
    ) -> Result<Option<KgSnapshot>> {
        let db_path = self.db_path.clone();
        let (project_id, node_id) = (project_id.clone(), node_id.clone());
        tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            let kg_id: Option<i64> = conn
                .query_row(
                    "SELECT id FROM knowledge_graphs WHERE project_id = ?1 AND node_id = ?2",
                    params![project_id.as_str(), node_id.as_str()],
                    |row| row.get(0),
                )
                .ok();
            let Some(kg_id) = kg_id else {
                return Ok(None);
            };

            let entities: Vec<KgEntity> = conn
                .prepare("SELECT name, properties FROM kg_entities WHERE kg_id = ?1")?
                .query_map(params![kg_id], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?
                .into_iter()
                .map(|(name, props)| {
                    Ok(KgEntity {
                        name,
                        properties: properties_from_json(&props)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            let relationships: Vec<KgRelationship> = conn
                .prepare(
                    "SELECT from_entity, rel_type, to_entity, properties FROM kg_relationships WHERE kg_id = ?1",
                )?
                .query_map(params![kg_id], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?
                .into_iter()
                .map(|(from_entity, rel_type, to_entity, props)| {
                    Ok(KgRelationship {
                        from_entity,
                        rel_type,
                        to_entity,
                        properties: properties_from_json(&props)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            Ok(Some(KgSnapshot { entities, relationships }))
        })
        .await?
    }

    async fn ms_ensure(&self, project_id: &ProjectId, node_id: &NodeId) -> Result<i64> {
        let db_path = self.db_path.clone();
        let (project_id, node_id) = (project_id.clone(), node_id.clone());
        tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            conn.execute(
                "INSERT OR IGNORE INTO memory_streams (project_id, node_id) VALUES (?1, ?2)",
                params![project_id.as_str(), node_id.as_str()],
            )?;
            let id: i64 = conn.query_row(
                "SELECT id FROM memory_streams WHERE project_id = ?1 AND node_id = ?2",
                params![project_id.as_str(), node_id.as_str()],
                |row| row.get(0),
            )?;
            Ok::<i64, StorageError>(id)
        })
        .await?
    }

    async fn ms_add_observation(&self, ms_id: i64, obs: &Observation) -> Result<i64> {
        let db_path = self.db_path.clone();
        let obs = obs.clone();
        let vec_json = vector_to_json(&obs.embedding);
        tokio::task::spawn_blocking(move || {
            let mut conn = Connection::open(&db_path)?;
            let tx = conn.transaction()?;
            let content_json = serde_json::to_string(&obs.content)?;
            tx.execute(
                "INSERT INTO observations (ms_id, created, accessed, importance, content_kind, content)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    ms_id,
                    millis(obs.created),
                    millis(obs.accessed),
                    obs.importance,
                    obs.content_kind.to_string(),
                    content_json,
                ],
            )?;
            let id = tx.last_insert_rowid();
            tx.execute(
                "INSERT INTO observations_vec (rowid, embedding) VALUES (?1, ?2)",
                params![id, vec_json],
            )?;
            tx.commit()?;
            Ok::<i64, StorageError>(id)
        })
        .await?
    }

    async fn ms_search(
        &self,
        ms_id: i64,
        query_vec: &[f32],
        k: usize,
        from: Option<chrono::DateTime<chrono::Utc>>,
        to: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<Vec<Observation>> {
        let db_path = self.db_path.clone();
        let vec_json = vector_to_json(query_vec);
        let knn_limit = (k.max(1) * 5) as i64;
        tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            let mut stmt = conn.prepare(
                "SELECT rowid, distance FROM observations_vec WHERE embedding MATCH ?1 AND k = ?2",
            )?;
            let hits: Vec<(i64, f64)> = stmt
                .query_map(params![vec_json, knn_limit], |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut out = Vec::new();
            for (rowid, _distance) in hits {
                let row: Option<(i64, i64, f32, String, String, i64)> = conn
                    .query_row(
                        "SELECT created, accessed, importance, content_kind, content, ms_id FROM observations WHERE id = ?1",
                        params![rowid],
                        |row| {
                            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?))
                        },
                    )
                    .ok();
                let Some((created, accessed, importance, content_kind, content, row_ms_id)) = row else {
                    continue;
                };
                if row_ms_id != ms_id {
                    continue;
                }
                let created_dt = from_millis(created);
                if let Some(f) = from {
                    if created_dt < f {
                        continue;
                    }
                }
                if let Some(t) = to {
                    if created_dt > t {
                        continue;
                    }
                }
                let content: ObservationContent = serde_json::from_str(&content)?;
                let content_kind: ObservationContentKind =
                    serde_json::from_str(&format!("\"{content_kind}\""))?;
                out.push(Observation {
                    id: Some(rowid),
                    created: created_dt,
                    accessed: from_millis(accessed),
                    importance,
                    embedding: Vec::new(),
                    content,
                    content_kind,
                });
                if out.len() >= k {
                    break;
                }
            }
            Ok::<Vec<Observation>, StorageError>(out)
        })
        .await?
    }

    async fn ms_get_recent(&self, ms_id: i64, n: usize) -> Result<Vec<Observation>> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            let mut stmt = conn.prepare(
                "SELECT id, created, accessed, importance, content_kind, content FROM observations
                 WHERE ms_id = ?1 ORDER BY created DESC LIMIT ?2",
            )?;
            let rows: Vec<(i64, i64, i64, f32, String, String)> = stmt
                .query_map(params![ms_id, n as i64], |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut out = rows
                .into_iter()
                .map(|(id, created, accessed, importance, content_kind, content)| {
                    let content: ObservationContent = serde_json::from_str(&content)?;
                    let content_kind: ObservationContentKind =
                        serde_json::from_str(&format!("\"{content_kind}\""))?;
                    Ok(Observation {
                        id: Some(id),
                        created: from_millis(created),
                        accessed: from_millis(accessed),
                        importance,
                        embedding: Vec::new(),
                        content,
                        content_kind,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            out.reverse();
            Ok::<Vec<Observation>, StorageError>(out)
        })
        .await?
    }

    async fn ms_update_accessed(&self, ids: &[i64]) -> Result<()> {
        let db_path = self.db_path.clone();
        let ids = ids.to_vec();
        let now = millis(chrono::Utc::now());
        tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            for id in ids {
                conn.execute(
                    "UPDATE observations SET accessed = ?1 WHERE id = ?2",
                    params![now, id],
                )?;
            }
            Ok::<(), StorageError>(())
        })
        .await?
    }

    async fn ms_get_metadata(&self, ms_id: i64) -> Result<MemoryStreamMetadata> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            let last_reflection_point: i64 = conn.query_row(
                "SELECT last_reflection_point FROM memory_streams WHERE id = ?1",
                params![ms_id],
                |row| row.get(0),
            )?;
            Ok::<MemoryStreamMetadata, StorageError>(MemoryStreamMetadata {
                last_reflection_point,
            })
        })
        .await?
    }

    async fn ms_update_metadata(&self, ms_id: i64, metadata: &MemoryStreamMetadata) -> Result<()> {
        let db_path = self.db_path.clone();
        let last_reflection_point = metadata.last_reflection_point;
        tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            conn.execute(
                "UPDATE memory_streams SET last_reflection_point = ?1 WHERE id = ?2",
                params![last_reflection_point, ms_id],
            )?;
            Ok::<(), StorageError>(())
        })
        .await?
    }
}
