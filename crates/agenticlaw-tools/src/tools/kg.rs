//! Tools exposing a node's bound knowledge graph to the model (spec §4.2,
//! scenario S4): add/update/remove entities and relationships, and query
//! shortest paths and neighbourhoods.

use crate::registry::{Tool, ToolResult};
use agenticlaw_kg::KnowledgeGraph;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

fn properties_from_value(v: &Value) -> BTreeMap<String, String> {
    match v.as_object() {
        Some(map) => map
            .iter()
            .map(|(k, v)| (k.clone(), value_to_string(v)))
            .collect(),
        None => BTreeMap::new(),
    }
}

fn value_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub struct KgAddEntityTool {
    kg: Arc<Mutex<KnowledgeGraph>>,
}

impl KgAddEntityTool {
    pub fn new(kg: Arc<Mutex<KnowledgeGraph>>) -> Self {
        Self { kg }
    }
}

#[async_trait::async_trait]
impl Tool for KgAddEntityTool {
    fn name(&self) -> &str {
        "kg_add_entity"
    }

    fn description(&self) -> &str {
        "Add a new entity to this node's knowledge graph. Fails if an entity with the same name already exists."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "description": "Unique entity name" },
                "properties": {
                    "type": "object",
                    "description": "Arbitrary key/value properties",
                    "additionalProperties": { "type": "string" }
                }
            },
            "required": ["name"]
        })
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let Some(name) = args.get("name").and_then(Value::as_str) else {
            return ToolResult::error("missing required field: name");
        };
        let properties = args
            .get("properties")
            .map(properties_from_value)
            .unwrap_or_default();
        match self.kg.lock().await.add_entity(name, properties).await {
            Ok(()) => ToolResult::text(format!("added entity '{name}'")),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

pub struct KgUpdateEntityPropertiesTool {
    kg: Arc<Mutex<KnowledgeGraph>>,
}

impl KgUpdateEntityPropertiesTool {
    pub fn new(kg: Arc<Mutex<KnowledgeGraph>>) -> Self {
        Self { kg }
    }
}

#[async_trait::async_trait]
impl Tool for KgUpdateEntityPropertiesTool {
    fn name(&self) -> &str {
        "kg_update_entity_properties"
    }

    fn description(&self) -> &str {
        "Merge new properties into an existing entity. Later values win on key collisions."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "properties": {
                    "type": "object",
                    "additionalProperties": { "type": "string" }
                }
            },
            "required": ["name", "properties"]
        })
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let Some(name) = args.get("name").and_then(Value::as_str) else {
            return ToolResult::error("missing required field: name");
        };
        let properties = args
            .get("properties")
            .map(properties_from_value)
            .unwrap_or_default();
        match self
            .kg
            .lock()
            .await
            .update_entity_properties(name, properties)
            .await
        {
            Ok(()) => ToolResult::text(format!("updated entity '{name}'")),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

pub struct KgRemoveEntityTool {
    kg: Arc<Mutex<KnowledgeGraph>>,
}

impl KgRemoveEntityTool {
    pub fn new(kg: Arc<Mutex<KnowledgeGraph>>) -> Self {
        Self { kg }
    }
}

#[async_trait::async_trait]
impl Tool for KgRemoveEntityTool {
    fn name(&self) -> &str {
        "kg_remove_entity"
    }

    fn description(&self) -> &str {
        "Remove an entity and every relationship incident on it."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "name": { "type": "string" } },
            "required": ["name"]
        })
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let Some(name) = args.get("name").and_then(Value::as_str) else {
            return ToolResult::error("missing required field: name");
        };
        match self.kg.lock().await.remove_entity(name).await {
            Ok(()) => ToolResult::text(format!("removed entity '{name}'")),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

pub struct KgAddRelationshipTool {
    kg: Arc<Mutex<KnowledgeGraph>>,
}

impl KgAddRelationshipTool {
    pub fn new(kg: Arc<Mutex<KnowledgeGraph>>) -> Self {
        Self { kg }
    }
}

#[async_trait::async_trait]
impl Tool for KgAddRelationshipTool {
    fn name(&self) -> &str {
        "kg_add_relationship"
    }

    fn description(&self) -> &str {
        "Add a directed relationship between two existing entities."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "from": { "type": "string" },
                "relationship": { "type": "string" },
                "to": { "type": "string" },
                "properties": {
                    "type": "object",
                    "additionalProperties": { "type": "string" }
                }
            },
            "required": ["from", "relationship", "to"]
        })
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let (Some(from), Some(rel), Some(to)) = (
            args.get("from").and_then(Value::as_str),
            args.get("relationship").and_then(Value::as_str),
            args.get("to").and_then(Value::as_str),
        ) else {
            return ToolResult::error("missing required field: from, relationship, or to");
        };
        let properties = args
            .get("properties")
            .map(properties_from_value)
            .unwrap_or_default();
        match self
            .kg
            .lock()
            .await
            .add_relationship(from, rel, to, properties)
            .await
        {
            Ok(()) => ToolResult::text(format!("added relationship '{from}' -{rel}-> '{to}'")),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

pub struct KgFindPathTool {
    kg: Arc<Mutex<KnowledgeGraph>>,
}

impl KgFindPathTool {
    pub fn new(kg: Arc<Mutex<KnowledgeGraph>>) -> Self {
        Self { kg }
    }
}

#[async_trait::async_trait]
impl Tool for KgFindPathTool {
    fn name(&self) -> &str {
        "kg_find_path"
    }

    fn description(&self) -> &str {
        "Find the shortest directed path between two entities, if one exists."
    }

    fn is_read_only(&self) -> bool {
        true
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "from": { "type": "string" },
                "to": { "type": "string" }
            },
            "required": ["from", "to"]
        })
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let (Some(from), Some(to)) = (
            args.get("from").and_then(Value::as_str),
            args.get("to").and_then(Value::as_str),
        ) else {
            return ToolResult::error("missing required field: from or to");
        };
        match self.kg.lock().await.find_path(from, to) {
            Ok(path) => ToolResult::Json(json!({ "path": path })),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

pub struct KgNeighboursTool {
    kg: Arc<Mutex<KnowledgeGraph>>,
}

impl KgNeighboursTool {
    pub fn new(kg: Arc<Mutex<KnowledgeGraph>>) -> Self {
        Self { kg }
    }
}

#[async_trait::async_trait]
impl Tool for KgNeighboursTool {
    fn name(&self) -> &str {
        "kg_neighbours"
    }

    fn description(&self) -> &str {
        "List entities directly connected to an entity, in either direction."
    }

    fn is_read_only(&self) -> bool {
        true
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "name": { "type": "string" } },
            "required": ["name"]
        })
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let Some(name) = args.get("name").and_then(Value::as_str) else {
            return ToolResult::error("missing required field: name");
        };
        match self.kg.lock().await.neighbours(name) {
            Ok(names) => ToolResult::Json(json!({ "neighbours": names })),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agenticlaw_core::{NodeId, ProjectId};
    use agenticlaw_storage::{SqliteStorage, StorageBackend};

    async fn bound_kg() -> Arc<Mutex<KnowledgeGraph>> {
        let storage: Arc<dyn StorageBackend> = Arc::new(SqliteStorage::open_in_memory().unwrap());
        let kg = KnowledgeGraph::load(storage, &ProjectId::generate(), &NodeId::generate())
            .await
            .unwrap();
        Arc::new(Mutex::new(kg))
    }

    // Scenario S4: add two entities, relate them, then confirm the path.
    #[tokio::test]
    async fn add_entity_relate_and_find_path() {
        let kg = bound_kg().await;
        let add = KgAddEntityTool::new(kg.clone());
        let rel = KgAddRelationshipTool::new(kg.clone());
        let path = KgFindPathTool::new(kg.clone());

        let r1 = add.execute(json!({"name": "Alice", "properties": {"type": "person"}})).await;
        assert!(!r1.is_error());
        let r2 = add.execute(json!({"name": "Paris", "properties": {"type": "city"}})).await;
        assert!(!r2.is_error());
        let r3 = rel
            .execute(json!({"from": "Alice", "relationship": "lives_in", "to": "Paris"}))
            .await;
        assert!(!r3.is_error());

        let found = path.execute(json!({"from": "Alice", "to": "Paris"})).await;
        match found {
            ToolResult::Json(v) => {
                assert_eq!(v["path"], json!(["Alice", "Paris"]));
            }
            other => panic!("expected json result, got {other:?}"),
        }
        assert_eq!(kg.lock().await.entity_count(), 2);
        assert_eq!(kg.lock().await.relationship_count(), 1);
    }

    #[tokio::test]
    async fn add_entity_rejects_missing_name() {
        let kg = bound_kg().await;
        let add = KgAddEntityTool::new(kg);
        let result = add.execute(json!({})).await;
        assert!(result.is_error());
    }

    #[tokio::test]
    async fn neighbours_reports_both_directions() {
        let kg = bound_kg().await;
        let add = KgAddEntityTool::new(kg.clone());
        let rel = KgAddRelationshipTool::new(kg.clone());
        let neighbours = KgNeighboursTool::new(kg.clone());
        assert!(neighbours.is_read_only());

        add.execute(json!({"name": "A"})).await;
        add.execute(json!({"name": "B"})).await;
        rel.execute(json!({"from": "A", "relationship": "knows", "to": "B"})).await;

        let result = neighbours.execute(json!({"name": "B"})).await;
        match result {
            ToolResult::Json(v) => assert_eq!(v["neighbours"], json!(["A"])),
            other => panic!("expected json result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn remove_entity_then_update_fails() {
        let kg = bound_kg().await;
        let add = KgAddEntityTool::new(kg.clone());
        let remove = KgRemoveEntityTool::new(kg.clone());
        let update = KgUpdateEntityPropertiesTool::new(kg.clone());

        add.execute(json!({"name": "A"})).await;
        let removed = remove.execute(json!({"name": "A"})).await;
        assert!(!removed.is_error());

        let updated = update.execute(json!({"name": "A", "properties": {"k": "v"}})).await;
        assert!(updated.is_error());
    }
}
