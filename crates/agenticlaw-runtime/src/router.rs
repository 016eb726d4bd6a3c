//! Runtime (router) (spec §4.6): graph-walk message delivery, buffer
//! gating, entry-point dispatch, scheduled-event wiring. Grounded on
//! `beezle_bug/agent_graph/runtime.py`.

use crate::builder::{ExecutionGraph, ExecutionGraphBuilder, TargetKind};
use agenticlaw_core::{Message, NodeId, Project, Result};
use agenticlaw_scheduler::{Scheduler, TaskId};
use std::sync::{Arc, OnceLock, Weak};
use tokio::sync::{Mutex, RwLock};
use tracing::warn;

/// One agent's reply delivered to the external text/voice output sink.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentReply {
    pub agent_id: NodeId,
    pub sender: String,
    pub content: String,
}

/// Invoked once per exit message (spec §4.7 open question (b): per-message,
/// not coalesced).
pub type ExitCallback = Arc<dyn Fn(NodeId, String, String) + Send + Sync>;

/// A single runtime instance owns at most one deployed execution graph
/// (spec §4.6). Always held behind `Arc` so scheduled-event callbacks can
/// hold a `'static` handle back into `walk_from`.
pub struct Runtime {
    builder: ExecutionGraphBuilder,
    scheduler: Arc<Scheduler>,
    graph: RwLock<Option<ExecutionGraph>>,
    scheduled_task_ids: Mutex<Vec<TaskId>>,
    on_exit: RwLock<Option<ExitCallback>>,
    /// Set once in `new`, so `deploy` can hand scheduled-event callbacks a
    /// `'static` handle back into `walk_from` without requiring callers to
    /// pass `Arc<Self>` at every call site.
    self_ref: OnceLock<Weak<Runtime>>,
}

impl Runtime {
    pub fn new(builder: ExecutionGraphBuilder, scheduler: Arc<Scheduler>) -> Arc<Self> {
        let runtime = Arc::new(Self {
            builder,
            scheduler,
            graph: RwLock::new(None),
            scheduled_task_ids: Mutex::new(Vec::new()),
            on_exit: RwLock::new(None),
            self_ref: OnceLock::new(),
        });
        let _ = runtime.self_ref.set(Arc::downgrade(&runtime));
        runtime
    }

    fn handle(&self) -> Arc<Runtime> {
        self.self_ref
            .get()
            .and_then(Weak::upgrade)
            .expect("Runtime is always constructed via Runtime::new")
    }

    /// Registers the callback invoked once per exit message (spec §4.6
    /// "Exit delivery").
    pub async fn set_exit_callback(&self, callback: ExitCallback) {
        *self.on_exit.write().await = Some(callback);
    }

    /// Builds and installs a fresh execution graph for `project`, starting
    /// its scheduled events. Undeploys any prior deployment first (spec
    /// §4.6 "deploy" — atomic: either fully built or not installed at all,
    /// per spec §3 invariant 4).
    pub async fn deploy(&self, project: &Project) -> Result<()> {
        self.undeploy().await;

        let new_graph = self.builder.build(project).await?;
        let events = new_graph.scheduled_events.clone();
        *self.graph.write().await = Some(new_graph);

        let mut task_ids = Vec::with_capacity(events.len());
        for event in events {
            let node_id = event.node_id.clone();
            let message = Message::new(event.name.clone(), event.message_content.clone());
            let this = self.handle();
            let callback: Arc<dyn agenticlaw_scheduler::ScheduledCallback> = Arc::new(move || {
                let this = this.clone();
                let node_id = node_id.clone();
                let message = message.clone();
                Box::pin(async move {
                    this.walk_from(&node_id, vec![message]).await;
                }) as futures::future::BoxFuture<'static, ()>
            });

            let task_id = match (event.interval_seconds, event.run_at) {
                (Some(secs), _) => {
                    self.scheduler
                        .schedule_interval(event.node_id.to_string(), callback, secs, true)
                        .await
                }
                (None, Some(run_at)) => {
                    self.scheduler
                        .schedule_once(event.node_id.to_string(), callback, run_at)
                        .await
                }
                (None, None) => continue,
            };
            task_ids.push(task_id);
        }

        *self.scheduled_task_ids.lock().await = task_ids;
        Ok(())
    }

    /// Cancels every scheduled task registered for the current deployment
    /// and drops the execution graph. Buffered messages are lost (spec §3
    /// invariant 6). Idempotent.
    pub async fn undeploy(&self) {
        let ids = std::mem::take(&mut *self.scheduled_task_ids.lock().await);
        for id in ids {
            self.scheduler.cancel(id).await;
        }
        *self.graph.write().await = None;
    }

    pub async fn running_agents(&self) -> Vec<NodeId> {
        match self.graph.read().await.as_ref() {
            Some(graph) => graph.executables.keys().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// `send_text_message` (spec §4.6): if text-input event nodes exist,
    /// route through each; otherwise fall back to walking directly into
    /// every executable (developer-testing fallback).
    pub async fn send_text_message(&self, user: &str, content: &str) -> Vec<AgentReply> {
        let message = Message::new(user, content);
        let entry_ids = match self.graph.read().await.as_ref() {
            Some(graph) if !graph.text_input_ids.is_empty() => graph.text_input_ids.clone(),
            Some(graph) => graph.executables.keys().cloned().collect(),
            None => return Vec::new(),
        };
        self.dispatch_entry(entry_ids, vec![message]).await
    }

    /// Symmetric to `send_text_message`; falls through to the text path if
    /// no voice-input node is defined.
    pub async fn send_voice_message(&self, user: &str, content: &str) -> Vec<AgentReply> {
        let message = Message::new(user, content);
        let entry_ids = match self.graph.read().await.as_ref() {
            Some(graph) if !graph.voice_input_ids.is_empty() => graph.voice_input_ids.clone(),
            Some(graph) if !graph.text_input_ids.is_empty() => graph.text_input_ids.clone(),
            Some(graph) => graph.executables.keys().cloned().collect(),
            None => return Vec::new(),
        };
        self.dispatch_entry(entry_ids, vec![message]).await
    }

    async fn dispatch_entry(&self, entry_ids: Vec<NodeId>, messages: Vec<Message>) -> Vec<AgentReply> {
        let mut replies = Vec::new();
        for entry_id in entry_ids {
            replies.extend(self.walk_from(&entry_id, messages.clone()).await);
        }
        replies
    }

    /// The single routing primitive (spec §4.6): depth-first, siblings in
    /// edge-declaration order. Returns the replies produced by exit agents
    /// reached transitively from `source_id`, and invokes the exit callback
    /// once per exit message as a side effect.
    pub async fn walk_from(&self, source_id: &NodeId, messages: Vec<Message>) -> Vec<AgentReply> {
        let routing_entries = {
            let guard = self.graph.read().await;
            match guard.as_ref() {
                Some(graph) => graph.routing.get(source_id).cloned().unwrap_or_default(),
                None => return Vec::new(),
            }
        };

        let mut replies = Vec::new();

        for (kind, target_id) in routing_entries {
            match kind {
                TargetKind::Executable => {
                    let executable = {
                        let guard = self.graph.read().await;
                        guard
                            .as_ref()
                            .and_then(|g| g.executables.get(&target_id).cloned())
                    };
                    let Some(executable) = executable else {
                        warn!(target = %target_id, "routing references missing executable");
                        continue;
                    };
                    let outputs = executable.execute(&messages).await;
                    if outputs.is_empty() {
                        continue;
                    }
                    let is_exit = {
                        let guard = self.graph.read().await;
                        guard
                            .as_ref()
                            .map(|g| g.exit_ids.contains(&target_id))
                            .unwrap_or(false)
                    };
                    if is_exit {
                        for out in &outputs {
                            replies.push(AgentReply {
                                agent_id: target_id.clone(),
                                sender: out.sender.clone(),
                                content: out.content.clone(),
                            });
                            if let Some(cb) = self.on_exit.read().await.as_ref() {
                                cb(target_id.clone(), out.sender.clone(), out.content.clone());
                            }
                        }
                    }
                    let nested = Box::pin(self.walk_from(&target_id, outputs)).await;
                    replies.extend(nested);
                }
                TargetKind::BufferIn => {
                    let guard = self.graph.read().await;
                    if let Some(graph) = guard.as_ref() {
                        if let Some(buffer) = graph.buffers.get(&target_id) {
                            buffer.lock().await.buffer(&messages);
                        }
                    }
                }
                TargetKind::BufferTrigger => {
                    let flushed = {
                        let guard = self.graph.read().await;
                        match guard.as_ref().and_then(|g| g.buffers.get(&target_id)) {
                            Some(buffer) => buffer.lock().await.flush(),
                            None => Vec::new(),
                        }
                    };
                    if !flushed.is_empty() {
                        let nested = Box::pin(self.walk_from(&target_id, flushed)).await;
                        replies.extend(nested);
                    }
                }
            }
        }

        replies
    }
}
