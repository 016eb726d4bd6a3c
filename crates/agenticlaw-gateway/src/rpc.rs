//! RPC router (spec §6): dispatches the engine's external entry points to
//! handlers over the shared [`RpcContext`]. Wire framing (HTTP, WebSocket,
//! stdio) is left to the embedder — this module only does method dispatch
//! and JSON marshalling.

use crate::context::RpcContext;
use agenticlaw_core::{Edge, EdgeId, Error, Node, NodeConfig, NodeId, Project, ProjectId};
use serde_json::{json, Value};
use tracing::info;

/// `(code, message)`, loosely JSON-RPC shaped.
pub type RpcError = (i32, String);
pub type RpcResult = Result<Value, RpcError>;

const INVALID_PARAMS: i32 = -32602;
const METHOD_NOT_FOUND: i32 = -32601;
const NOT_FOUND: i32 = -32001;
const ENGINE_ERROR: i32 = -32000;

fn missing(field: &str) -> RpcError {
    (INVALID_PARAMS, format!("missing required param: {field}"))
}

fn require_str<'a>(params: &'a Value, field: &str) -> Result<&'a str, RpcError> {
    params.get(field).and_then(Value::as_str).ok_or_else(|| missing(field))
}

impl From<Error> for RpcError {
    fn from(e: Error) -> Self {
        match &e {
            Error::Validation(_) => (INVALID_PARAMS, e.to_string()),
            _ => (ENGINE_ERROR, e.to_string()),
        }
    }
}

impl From<agenticlaw_storage::StorageError> for RpcError {
    fn from(e: agenticlaw_storage::StorageError) -> Self {
        (ENGINE_ERROR, e.to_string())
    }
}

/// Route a single RPC method call to its handler.
pub async fn route_rpc(method: &str, params: Value, ctx: &RpcContext) -> RpcResult {
    match method {
        "list_projects" => handle_list_projects(ctx).await,
        "create_project" => handle_create_project(params, ctx).await,
        "load_project" => handle_load_project(params, ctx).await,
        "save_project" => handle_save_project(params, ctx).await,
        "delete_project" => handle_delete_project(params, ctx).await,
        "deploy_project" => handle_deploy_project(params, ctx).await,
        "undeploy_project" => handle_undeploy_project(ctx).await,
        "add_node" => handle_add_node(params, ctx).await,
        "remove_node" => handle_remove_node(params, ctx).await,
        "update_node_position" => handle_update_node_position(params, ctx).await,
        "update_node_config" => handle_update_node_config(params, ctx).await,
        "add_edge" => handle_add_edge(params, ctx).await,
        "remove_edge" => handle_remove_edge(params, ctx).await,
        "send_text_message" => handle_send_text_message(params, ctx).await,
        "send_voice_message" => handle_send_voice_message(params, ctx).await,
        "get_agent_graph_state" => handle_get_agent_graph_state(ctx).await,
        "get_node_kg_data" => handle_get_node_kg_data(params, ctx).await,
        "scheduler_tasks_for_agent" => handle_scheduler_tasks_for_agent(params, ctx).await,
        "health" => handle_health(ctx).await,
        _ => Err((METHOD_NOT_FOUND, format!("method not found: {method}"))),
    }
}

/// Converts an `RpcResult` into a `(ok, value_or_error)` pair suitable for
/// framing onto whatever transport the embedder chose.
pub fn to_response(result: RpcResult) -> Value {
    match result {
        Ok(value) => json!({ "ok": true, "result": value }),
        Err((code, message)) => json!({ "ok": false, "error": { "code": code, "message": message } }),
    }
}

// ---------------------------------------------------------------------------
// Project lifecycle
// ---------------------------------------------------------------------------

async fn handle_list_projects(ctx: &RpcContext) -> RpcResult {
    let projects = ctx.storage.list_projects().await?;
    Ok(serde_json::to_value(projects).map_err(Error::from)?)
}

async fn handle_create_project(params: Value, ctx: &RpcContext) -> RpcResult {
    let name = params.get("name").and_then(Value::as_str).unwrap_or("untitled").to_string();
    let now = chrono::Utc::now();
    let project = Project {
        id: ProjectId::generate(),
        name,
        created_at: now,
        updated_at: now,
        ..Default::default()
    };
    ctx.storage.save_project(&project).await?;
    info!(project_id = %project.id, "created project");
    Ok(serde_json::to_value(&project).map_err(Error::from)?)
}

async fn load_project(params: &Value, ctx: &RpcContext) -> Result<Project, RpcError> {
    let id = ProjectId::from(require_str(params, "project_id")?);
    ctx.storage
        .get_project(&id)
        .await?
        .ok_or_else(|| (NOT_FOUND, format!("project not found: {id}")))
}

async fn handle_load_project(params: Value, ctx: &RpcContext) -> RpcResult {
    let project = load_project(&params, ctx).await?;
    Ok(serde_json::to_value(&project).map_err(Error::from)?)
}

async fn handle_save_project(params: Value, ctx: &RpcContext) -> RpcResult {
    let project: Project = serde_json::from_value(
        params.get("project").cloned().ok_or_else(|| missing("project"))?,
    )
    .map_err(|e| (INVALID_PARAMS, format!("invalid project: {e}")))?;
    ctx.storage.save_project(&project).await?;
    Ok(json!({ "project_id": project.id.to_string() }))
}

async fn handle_delete_project(params: Value, ctx: &RpcContext) -> RpcResult {
    let id = ProjectId::from(require_str(&params, "project_id")?);
    ctx.storage.delete_project(&id).await?;
    Ok(json!({ "ok": true }))
}

async fn handle_deploy_project(params: Value, ctx: &RpcContext) -> RpcResult {
    let project = load_project(&params, ctx).await?;
    ctx.runtime.deploy(&project).await?;
    info!(project_id = %project.id, "deployed project");
    Ok(json!({ "running_agents": ctx.runtime.running_agents().await }))
}

async fn handle_undeploy_project(ctx: &RpcContext) -> RpcResult {
    ctx.runtime.undeploy().await;
    Ok(json!({ "ok": true }))
}

// ---------------------------------------------------------------------------
// Graph CRUD — mutate the stored design; deployed state is untouched until
// the next `deploy_project`.
// ---------------------------------------------------------------------------

async fn handle_add_node(params: Value, ctx: &RpcContext) -> RpcResult {
    let mut project = load_project(&params, ctx).await?;
    let node: Node = serde_json::from_value(params.get("node").cloned().ok_or_else(|| missing("node"))?)
        .map_err(|e| (INVALID_PARAMS, format!("invalid node: {e}")))?;
    let node_id = node.id.clone();
    project.nodes.push(node);
    ctx.storage.save_project(&project).await?;
    Ok(json!({ "node_id": node_id.to_string() }))
}

async fn handle_remove_node(params: Value, ctx: &RpcContext) -> RpcResult {
    let mut project = load_project(&params, ctx).await?;
    let node_id = NodeId::from(require_str(&params, "node_id")?);
    project.nodes.retain(|n| n.id != node_id);
    project
        .edges
        .retain(|e| e.source_node != node_id && e.target_node != node_id);
    ctx.storage.save_project(&project).await?;
    Ok(json!({ "ok": true }))
}

async fn handle_update_node_position(params: Value, ctx: &RpcContext) -> RpcResult {
    let mut project = load_project(&params, ctx).await?;
    let node_id = NodeId::from(require_str(&params, "node_id")?);
    let x = params.get("x").and_then(Value::as_f64).ok_or_else(|| missing("x"))?;
    let y = params.get("y").and_then(Value::as_f64).ok_or_else(|| missing("y"))?;
    let node = project
        .nodes
        .iter_mut()
        .find(|n| n.id == node_id)
        .ok_or_else(|| (NOT_FOUND, format!("node not found: {node_id}")))?;
    node.position = (x, y);
    ctx.storage.save_project(&project).await?;
    Ok(json!({ "ok": true }))
}

async fn handle_update_node_config(params: Value, ctx: &RpcContext) -> RpcResult {
    let mut project = load_project(&params, ctx).await?;
    let node_id = NodeId::from(require_str(&params, "node_id")?);
    let config: NodeConfig = serde_json::from_value(
        params.get("config").cloned().ok_or_else(|| missing("config"))?,
    )
    .map_err(|e| (INVALID_PARAMS, format!("invalid config: {e}")))?;
    let node = project
        .nodes
        .iter_mut()
        .find(|n| n.id == node_id)
        .ok_or_else(|| (NOT_FOUND, format!("node not found: {node_id}")))?;
    node.config = config;
    ctx.storage.save_project(&project).await?;
    Ok(json!({ "ok": true }))
}

async fn handle_add_edge(params: Value, ctx: &RpcContext) -> RpcResult {
    let mut project = load_project(&params, ctx).await?;
    let edge: Edge = serde_json::from_value(params.get("edge").cloned().ok_or_else(|| missing("edge"))?)
        .map_err(|e| (INVALID_PARAMS, format!("invalid edge: {e}")))?;
    let edge_id = edge.id.clone();
    project.edges.push(edge);
    ctx.storage.save_project(&project).await?;
    Ok(json!({ "edge_id": edge_id.to_string() }))
}

async fn handle_remove_edge(params: Value, ctx: &RpcContext) -> RpcResult {
    let mut project = load_project(&params, ctx).await?;
    let edge_id = EdgeId::from(require_str(&params, "edge_id")?);
    project.edges.retain(|e| e.id != edge_id);
    ctx.storage.save_project(&project).await?;
    Ok(json!({ "ok": true }))
}

// ---------------------------------------------------------------------------
// Message delivery
// ---------------------------------------------------------------------------

async fn handle_send_text_message(params: Value, ctx: &RpcContext) -> RpcResult {
    let user = require_str(&params, "user")?;
    let content = require_str(&params, "content")?;
    let replies = ctx.runtime.send_text_message(user, content).await;
    Ok(json!({
        "replies": replies.iter().map(|r| json!({
            "agent_id": r.agent_id.to_string(),
            "sender": r.sender,
            "content": r.content,
        })).collect::<Vec<_>>()
    }))
}

async fn handle_send_voice_message(params: Value, ctx: &RpcContext) -> RpcResult {
    let user = require_str(&params, "user")?;
    let content = require_str(&params, "content")?;
    let replies = ctx.runtime.send_voice_message(user, content).await;
    Ok(json!({
        "replies": replies.iter().map(|r| json!({
            "agent_id": r.agent_id.to_string(),
            "sender": r.sender,
            "content": r.content,
        })).collect::<Vec<_>>()
    }))
}

// ---------------------------------------------------------------------------
// Introspection
// ---------------------------------------------------------------------------

async fn handle_get_agent_graph_state(ctx: &RpcContext) -> RpcResult {
    let running = ctx.runtime.running_agents().await;
    Ok(json!({
        "deployed": !running.is_empty(),
        "running_agents": running.iter().map(NodeId::to_string).collect::<Vec<_>>(),
    }))
}

async fn handle_get_node_kg_data(params: Value, ctx: &RpcContext) -> RpcResult {
    let project_id = ProjectId::from(require_str(&params, "project_id")?);
    let node_id = NodeId::from(require_str(&params, "node_id")?);
    match ctx.storage.kg_load_full(&project_id, &node_id).await? {
        Some(snapshot) => Ok(serde_json::to_value(snapshot).map_err(Error::from)?),
        None => Ok(Value::Null),
    }
}

async fn handle_scheduler_tasks_for_agent(params: Value, ctx: &RpcContext) -> RpcResult {
    let agent_id = require_str(&params, "agent_id")?;
    let tasks = ctx.scheduler.tasks_for_agent(agent_id).await;
    Ok(json!({
        "tasks": tasks.iter().map(|t| json!({
            "id": t.id.to_string(),
            "agent_id": t.agent_id,
            "enabled": t.enabled,
            "run_count": t.run_count,
            "kind": match t.kind {
                agenticlaw_scheduler::TaskKind::Once { run_at } => json!({ "once": { "run_at": run_at } }),
                agenticlaw_scheduler::TaskKind::Interval { interval_seconds } => {
                    json!({ "interval": { "interval_seconds": interval_seconds } })
                }
            },
        })).collect::<Vec<_>>()
    }))
}

async fn handle_health(ctx: &RpcContext) -> RpcResult {
    Ok(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "running_agents": ctx.runtime.running_agents().await.len(),
    }))
}
