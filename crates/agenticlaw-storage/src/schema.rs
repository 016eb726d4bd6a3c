//! SQL DDL for the embedded backend. Dual-table design for memory streams,
//! mirroring the metadata-table/`vec0`-virtual-table split used for
//! semantic search elsewhere in the corpus.

/// Embedding dimension for observation vectors (spec §4.1).
pub const EMBEDDING_DIM: usize = 384;

pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    tts_settings TEXT NOT NULL DEFAULT '{}',
    stt_settings TEXT NOT NULL DEFAULT '{}',
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS nodes (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    kind TEXT NOT NULL,
    position_x REAL NOT NULL,
    position_y REAL NOT NULL,
    config TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_nodes_project ON nodes(project_id);

CREATE TABLE IF NOT EXISTS edges (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    source_node TEXT NOT NULL,
    source_port TEXT NOT NULL,
    target_node TEXT NOT NULL,
    target_port TEXT NOT NULL,
    kind TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_edges_project ON edges(project_id);

CREATE TABLE IF NOT EXISTS knowledge_graphs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id TEXT NOT NULL,
    node_id TEXT NOT NULL,
    UNIQUE(project_id, node_id)
);

CREATE TABLE IF NOT EXISTS kg_entities (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    kg_id INTEGER NOT NULL REFERENCES knowledge_graphs(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    properties TEXT NOT NULL DEFAULT '{}',
    UNIQUE(kg_id, name)
);

CREATE TABLE IF NOT EXISTS kg_relationships (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    kg_id INTEGER NOT NULL REFERENCES knowledge_graphs(id) ON DELETE CASCADE,
    from_entity TEXT NOT NULL,
    rel_type TEXT NOT NULL,
    to_entity TEXT NOT NULL,
    properties TEXT NOT NULL DEFAULT '{}'
);
CREATE INDEX IF NOT EXISTS idx_kg_rel_kg ON kg_relationships(kg_id);

CREATE TABLE IF NOT EXISTS memory_streams (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id TEXT NOT NULL,
    node_id TEXT NOT NULL,
    last_reflection_point INTEGER NOT NULL DEFAULT 0,
    UNIQUE(project_id, node_id)
);

CREATE TABLE IF NOT EXISTS observations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ms_id INTEGER NOT NULL REFERENCES memory_streams(id) ON DELETE CASCADE,
    created INTEGER NOT NULL,
    accessed INTEGER NOT NULL,
    importance REAL NOT NULL,
    content_kind TEXT NOT NULL,
    content TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_observations_ms ON observations(ms_id, created);
"#;

pub fn create_vec_table_sql(dimension: usize) -> String {
    format!(
        "CREATE VIRTUAL TABLE IF NOT EXISTS observations_vec USING vec0(embedding float[{dimension}])"
    )
}
