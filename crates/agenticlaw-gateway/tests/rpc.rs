//! Exercises `route_rpc` over a real (in-memory) storage + runtime stack.

use agenticlaw_core::{Edge, EdgeId, EdgeKind, EventBus, Node, NodeConfig, NodeId, NodeKind, Port, Project};
use agenticlaw_gateway::{route_rpc, RpcContext};
use agenticlaw_llm::{LlmProvider, MockLlmProvider};
use agenticlaw_memory::{Embedder, HashEmbedder};
use agenticlaw_runtime::{ExecutionGraphBuilder, Runtime};
use agenticlaw_scheduler::Scheduler;
use agenticlaw_storage::{SqliteStorage, StorageBackend};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn context() -> RpcContext {
    let storage: Arc<dyn StorageBackend> = Arc::new(SqliteStorage::open_in_memory().unwrap());
    let provider: Arc<dyn LlmProvider> = Arc::new(MockLlmProvider::with_text("hello"));
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder);
    let builder = ExecutionGraphBuilder::new(storage.clone(), provider, embedder, EventBus::new(), "mock-model");
    let scheduler = Arc::new(Scheduler::new(Duration::from_millis(50)));
    let runtime = Runtime::new(builder, scheduler.clone());
    RpcContext::new(storage, runtime, scheduler)
}

#[tokio::test]
async fn create_load_and_list_round_trip() {
    let ctx = context();

    let created = route_rpc("create_project", json!({"name": "demo"}), &ctx).await.unwrap();
    let project_id = created["id"].as_str().unwrap().to_string();

    let listed = route_rpc("list_projects", json!({}), &ctx).await.unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let loaded = route_rpc("load_project", json!({"project_id": project_id}), &ctx)
        .await
        .unwrap();
    assert_eq!(loaded["name"], json!("demo"));

    let deleted = route_rpc("delete_project", json!({"project_id": project_id.clone()}), &ctx)
        .await
        .unwrap();
    assert_eq!(deleted, json!({ "ok": true }));

    let err = route_rpc("load_project", json!({"project_id": project_id}), &ctx)
        .await
        .unwrap_err();
    assert_eq!(err.0, -32001);
}

#[tokio::test]
async fn graph_crud_then_deploy_and_send() {
    let ctx = context();
    let created = route_rpc("create_project", json!({"name": "graph"}), &ctx).await.unwrap();
    let project_id = created["id"].as_str().unwrap().to_string();

    let text_input = Node {
        id: NodeId::generate(),
        kind: NodeKind::TextInput,
        position: (0.0, 0.0),
        config: NodeConfig::default(),
    };
    let agent = Node {
        id: NodeId::generate(),
        kind: NodeKind::Agent,
        position: (1.0, 0.0),
        config: NodeConfig {
            name: Some("A".to_string()),
            system_prompt_template: Some("You are A.".to_string()),
            ..Default::default()
        },
    };
    let output = Node {
        id: NodeId::generate(),
        kind: NodeKind::TextOutput,
        position: (2.0, 0.0),
        config: NodeConfig::default(),
    };

    for node in [&text_input, &agent, &output] {
        route_rpc(
            "add_node",
            json!({"project_id": project_id, "node": node}),
            &ctx,
        )
        .await
        .unwrap();
    }

    let e1 = Edge {
        id: EdgeId::generate(),
        source_node: text_input.id.clone(),
        source_port: Port::MessageOut,
        target_node: agent.id.clone(),
        target_port: Port::MessageIn,
        kind: EdgeKind::Message,
    };
    let e2 = Edge {
        id: EdgeId::generate(),
        source_node: agent.id.clone(),
        source_port: Port::MessageOut,
        target_node: output.id.clone(),
        target_port: Port::MessageIn,
        kind: EdgeKind::Message,
    };
    for edge in [&e1, &e2] {
        route_rpc("add_edge", json!({"project_id": project_id, "edge": edge}), &ctx)
            .await
            .unwrap();
    }

    let deployed = route_rpc("deploy_project", json!({"project_id": project_id}), &ctx)
        .await
        .unwrap();
    assert_eq!(deployed["running_agents"].as_array().unwrap().len(), 1);

    let sent = route_rpc(
        "send_text_message",
        json!({"user": "Alice", "content": "hi"}),
        &ctx,
    )
    .await
    .unwrap();
    let replies = sent["replies"].as_array().unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["content"], json!("hello"));

    let state = route_rpc("get_agent_graph_state", json!({}), &ctx).await.unwrap();
    assert_eq!(state["deployed"], json!(true));

    route_rpc("undeploy_project", json!({}), &ctx).await.unwrap();
    let state_after = route_rpc("get_agent_graph_state", json!({}), &ctx).await.unwrap();
    assert_eq!(state_after["deployed"], json!(false));
}

#[tokio::test]
async fn unknown_method_is_method_not_found() {
    let ctx = context();
    let err = route_rpc("not_a_real_method", json!({}), &ctx).await.unwrap_err();
    assert_eq!(err.0, -32601);
}

#[tokio::test]
async fn missing_param_is_invalid_params() {
    let ctx = context();
    let err = route_rpc("load_project", json!({}), &ctx).await.unwrap_err();
    assert_eq!(err.0, -32602);
}
