//! End-to-end tests wiring `ExecutionGraphBuilder` + `Runtime` together
//! against the scenarios this runtime was designed against.

use agenticlaw_core::{Edge, EdgeId, EdgeKind, EventBus, Node, NodeConfig, NodeId, NodeKind, Port, Project};
use agenticlaw_llm::{LlmMessage, LlmProvider, LlmResponse, LlmResult, MockLlmProvider, ToolCall, ToolCallFunction, ToolSchema};
use agenticlaw_memory::{Embedder, HashEmbedder};
use agenticlaw_runtime::{ExecutionGraphBuilder, Runtime};
use agenticlaw_scheduler::Scheduler;
use agenticlaw_storage::{SqliteStorage, StorageBackend};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn node(kind: NodeKind, config: NodeConfig) -> Node {
    Node {
        id: NodeId::generate(),
        kind,
        position: (0.0, 0.0),
        config,
    }
}

fn agent_node(name: &str) -> Node {
    node(
        NodeKind::Agent,
        NodeConfig {
            name: Some(name.to_string()),
            system_prompt_template: Some(format!("You are {name}.")),
            ..Default::default()
        },
    )
}

fn message_edge(source: &NodeId, source_port: Port, target: &NodeId, target_port: Port) -> Edge {
    Edge {
        id: EdgeId::generate(),
        source_node: source.clone(),
        source_port,
        target_node: target.clone(),
        target_port,
        kind: EdgeKind::Message,
    }
}

fn delegate_edge(source: &NodeId, target: &NodeId) -> Edge {
    Edge {
        id: EdgeId::generate(),
        source_node: source.clone(),
        source_port: Port::Ask,
        target_node: target.clone(),
        target_port: Port::Ask,
        kind: EdgeKind::Delegate,
    }
}

fn project(nodes: Vec<Node>, edges: Vec<Edge>) -> Project {
    Project {
        nodes,
        edges,
        ..Default::default()
    }
}

fn builder_with(provider: Arc<dyn LlmProvider>) -> ExecutionGraphBuilder {
    let storage: Arc<dyn StorageBackend> = Arc::new(SqliteStorage::open_in_memory().unwrap());
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder);
    ExecutionGraphBuilder::new(storage, provider, embedder, EventBus::new(), "mock-model")
}

type ExitLog = Arc<Mutex<Vec<(NodeId, String, String)>>>;

/// S1: TextInput -> Agent -> TextOutput, single reply delivered as an exit.
#[tokio::test]
async fn s1_simple_ping_delivers_single_exit_reply() {
    let t = node(NodeKind::TextInput, NodeConfig::default());
    let a = agent_node("A");
    let o = node(NodeKind::TextOutput, NodeConfig::default());
    let a_id = a.id.clone();

    let edges = vec![
        message_edge(&t.id, Port::MessageOut, &a.id, Port::MessageIn),
        message_edge(&a.id, Port::MessageOut, &o.id, Port::MessageIn),
    ];
    let project = project(vec![t, a, o], edges);

    let provider: Arc<dyn LlmProvider> = Arc::new(MockLlmProvider::with_text("hello"));
    let scheduler = Arc::new(Scheduler::new(Duration::from_millis(50)));
    let runtime = Runtime::new(builder_with(provider), scheduler);

    let exits: ExitLog = Arc::new(Mutex::new(Vec::new()));
    let exits2 = exits.clone();
    runtime
        .set_exit_callback(Arc::new(move |agent_id, sender, content| {
            exits2.lock().unwrap().push((agent_id, sender, content));
        }))
        .await;

    runtime.deploy(&project).await.unwrap();
    let replies = runtime.send_text_message("Alice", "hi").await;

    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].agent_id, a_id);
    assert_eq!(replies[0].sender, "A");
    assert_eq!(replies[0].content, "hello");

    let recorded = exits.lock().unwrap().clone();
    assert_eq!(recorded, vec![(a_id, "A".to_string(), "hello".to_string())]);
}

/// A provider that records every context it was asked to complete over,
/// so buffer-gated delivery can be asserted against the actual arrival.
struct RecordingProvider {
    calls: Mutex<Vec<Vec<LlmMessage>>>,
    reply: String,
}

impl RecordingProvider {
    fn new(reply: impl Into<String>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            reply: reply.into(),
        }
    }
}

#[async_trait::async_trait]
impl LlmProvider for RecordingProvider {
    fn name(&self) -> &str {
        "recording"
    }

    fn models(&self) -> &[&str] {
        &["mock-model"]
    }

    async fn chat_completion(
        &self,
        _model: &str,
        _system: Option<&str>,
        messages: &[LlmMessage],
        _tool_schemas: &[ToolSchema],
    ) -> LlmResult<LlmResponse> {
        self.calls.lock().unwrap().push(messages.to_vec());
        Ok(LlmResponse {
            content: Some(self.reply.clone()),
            ..Default::default()
        })
    }
}

/// S2: messages queue in a buffer until its trigger fires, then deliver as
/// one list, in arrival order, to the downstream agent exactly once.
#[tokio::test(start_paused = true)]
async fn s2_buffer_gates_on_trigger() {
    let t = node(NodeKind::TextInput, NodeConfig::default());
    let b = node(NodeKind::MessageBuffer, NodeConfig::default());
    let s = node(
        NodeKind::ScheduledEvent,
        NodeConfig {
            name: Some("ticker".to_string()),
            interval_seconds: Some(1),
            message_content: Some("go".to_string()),
            ..Default::default()
        },
    );
    let a = agent_node("A");
    let o = node(NodeKind::TextOutput, NodeConfig::default());

    let edges = vec![
        message_edge(&t.id, Port::MessageOut, &b.id, Port::MessageIn),
        message_edge(&s.id, Port::MessageOut, &b.id, Port::Trigger),
        message_edge(&b.id, Port::MessageOut, &a.id, Port::MessageIn),
        message_edge(&a.id, Port::MessageOut, &o.id, Port::MessageIn),
    ];
    let project = project(vec![t, b, s, a, o], edges);

    let provider = Arc::new(RecordingProvider::new("ack"));
    let scheduler = Arc::new(Scheduler::new(Duration::from_millis(10)));
    scheduler.start().await;
    let runtime = Runtime::new(builder_with(provider.clone()), scheduler);
    runtime.deploy(&project).await.unwrap();

    runtime.send_text_message("User", "a").await;
    runtime.send_text_message("User", "b").await;
    runtime.send_text_message("User", "c").await;

    assert_eq!(provider.calls.lock().unwrap().len(), 0);

    for _ in 0..4 {
        tokio::time::advance(Duration::from_millis(400)).await;
        tokio::task::yield_now().await;
    }

    let calls = provider.calls.lock().unwrap();
    assert_eq!(calls.len(), 1, "agent should run exactly once after the trigger fires");
    let contents: Vec<&str> = calls[0].iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["User: a", "User: b", "User: c"]);
}

/// S3: a delegate tool forwards a question to another deployed agent and
/// surfaces its reply back into the asking agent's turn.
#[tokio::test]
async fn s3_delegate_tool_relays_answer() {
    let t = node(NodeKind::TextInput, NodeConfig::default());
    let a = agent_node("Asker");
    let b = agent_node("Helper");
    let o = node(NodeKind::TextOutput, NodeConfig::default());
    let a_id = a.id.clone();

    let edges = vec![
        message_edge(&t.id, Port::MessageOut, &a.id, Port::MessageIn),
        message_edge(&a.id, Port::MessageOut, &o.id, Port::MessageIn),
        delegate_edge(&a.id, &b.id),
    ];
    let project = project(vec![t, a, b, o], edges);

    let ask_tool_call = LlmResponse {
        content: None,
        tool_calls: vec![ToolCall {
            id: "1".to_string(),
            kind: "function".to_string(),
            function: ToolCallFunction {
                name: "ask_helper".to_string(),
                arguments_json: json!({ "question": "2+2?" }).to_string(),
            },
        }],
        ..Default::default()
    };
    // Shared provider: Asker's first call returns the tool call, Helper's
    // turn consumes the second response, Asker's follow-up call the third.
    let provider: Arc<dyn LlmProvider> = Arc::new(MockLlmProvider::new(vec![
        ask_tool_call,
        LlmResponse {
            content: Some("4".to_string()),
            ..Default::default()
        },
        LlmResponse {
            content: Some("the answer is 4".to_string()),
            ..Default::default()
        },
    ]));

    let scheduler = Arc::new(Scheduler::new(Duration::from_millis(50)));
    let runtime = Runtime::new(builder_with(provider), scheduler);
    runtime.deploy(&project).await.unwrap();

    let replies = runtime.send_text_message("user", "2+2?").await;

    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].agent_id, a_id);
    assert_eq!(replies[0].content, "the answer is 4");
}

/// S6: undeploying cancels every scheduled task; no further invocations
/// occur after undeploy.
#[tokio::test(start_paused = true)]
async fn s6_undeploy_cancels_timers() {
    let s = node(
        NodeKind::ScheduledEvent,
        NodeConfig {
            name: Some("ticker".to_string()),
            interval_seconds: Some(1),
            message_content: Some("tick".to_string()),
            ..Default::default()
        },
    );
    let a = agent_node("A");
    let edges = vec![message_edge(&s.id, Port::MessageOut, &a.id, Port::MessageIn)];
    let project = project(vec![s, a], edges);

    let provider = Arc::new(RecordingProvider::new("ok"));
    let scheduler = Arc::new(Scheduler::new(Duration::from_millis(10)));
    scheduler.start().await;
    let runtime = Runtime::new(builder_with(provider.clone()), scheduler);
    runtime.deploy(&project).await.unwrap();

    for _ in 0..6 {
        tokio::time::advance(Duration::from_millis(400)).await;
        tokio::task::yield_now().await;
    }
    let before = provider.calls.lock().unwrap().len();
    assert!(before >= 2, "expected at least two invocations, got {before}");

    runtime.undeploy().await;

    for _ in 0..4 {
        tokio::time::advance(Duration::from_millis(400)).await;
        tokio::task::yield_now().await;
    }
    let after = provider.calls.lock().unwrap().len();
    assert_eq!(after, before, "no further invocations should occur after undeploy");
}
