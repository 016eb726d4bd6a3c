//! Cooperative tick loop driving one-shot and interval tasks (spec §4.4),
//! translated from `beezle_bug/scheduler.py`'s greenlet/thread loop into a
//! single Tokio task.

use crate::task::{ScheduledCallback, ScheduledTask, TaskId, TaskKind, TaskSummary};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

pub struct Scheduler {
    tasks: Arc<Mutex<HashMap<TaskId, ScheduledTask>>>,
    next_id: AtomicU64,
    tick: Duration,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(tick: Duration) -> Self {
        Self {
            tasks: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
            tick,
            handle: Mutex::new(None),
        }
    }

    /// Starts the background tick loop. Idempotent — calling twice while
    /// already running is a no-op. The tick loop only needs the task map
    /// and interval, not `self`, so this takes a plain `&self`.
    pub async fn start(&self) {
        let mut handle_guard = self.handle.lock().await;
        if handle_guard.is_some() {
            return;
        }
        let tasks = self.tasks.clone();
        let tick = self.tick;
        let join = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            loop {
                interval.tick().await;
                let now = Utc::now();
                // Snapshot so a callback mutating the map doesn't deadlock
                // or skip/duplicate entries mid-iteration.
                let snapshot: Vec<(TaskId, Arc<dyn ScheduledCallback>)> = {
                    let guard = tasks.lock().await;
                    guard
                        .iter()
                        .filter(|(_, t)| t.should_run(now))
                        .map(|(id, t)| (*id, t.callback.clone()))
                        .collect()
                };

                for (id, callback) in snapshot {
                    tracing::debug!(task_id = %id, "running scheduled task");
                    callback.call().await;

                    let mut guard = tasks.lock().await;
                    if let Some(task) = guard.get_mut(&id) {
                        task.run_count += 1;
                        task.last_run = Some(now);
                        if matches!(task.kind, TaskKind::Once { .. }) {
                            task.enabled = false;
                        }
                    }
                }
            }
        });
        *handle_guard = Some(join);
    }

    pub async fn stop(&self) {
        if let Some(handle) = self.handle.lock().await.take() {
            handle.abort();
        }
    }

    fn allocate_id(&self) -> TaskId {
        TaskId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub async fn schedule_once(
        &self,
        agent_id: impl Into<String>,
        callback: Arc<dyn ScheduledCallback>,
        run_at: chrono::DateTime<Utc>,
    ) -> TaskId {
        let id = self.allocate_id();
        let task = ScheduledTask {
            id,
            agent_id: agent_id.into(),
            kind: TaskKind::Once { run_at },
            callback,
            last_run: None,
            enabled: true,
            run_count: 0,
        };
        self.tasks.lock().await.insert(id, task);
        id
    }

    pub async fn schedule_interval(
        &self,
        agent_id: impl Into<String>,
        callback: Arc<dyn ScheduledCallback>,
        interval_seconds: u64,
        start_immediately: bool,
    ) -> TaskId {
        let id = self.allocate_id();
        let task = ScheduledTask {
            id,
            agent_id: agent_id.into(),
            kind: TaskKind::Interval { interval_seconds },
            callback,
            last_run: if start_immediately { None } else { Some(Utc::now()) },
            enabled: true,
            run_count: 0,
        };
        self.tasks.lock().await.insert(id, task);
        id
    }

    pub async fn cancel(&self, task_id: TaskId) -> bool {
        self.tasks.lock().await.remove(&task_id).is_some()
    }

    pub async fn pause(&self, task_id: TaskId) -> bool {
        if let Some(task) = self.tasks.lock().await.get_mut(&task_id) {
            task.enabled = false;
            true
        } else {
            false
        }
    }

    pub async fn resume(&self, task_id: TaskId) -> bool {
        if let Some(task) = self.tasks.lock().await.get_mut(&task_id) {
            task.enabled = true;
            true
        } else {
            false
        }
    }

    pub async fn tasks_for_agent(&self, agent_id: &str) -> Vec<TaskSummary> {
        self.tasks
            .lock()
            .await
            .values()
            .filter(|t| t.agent_id == agent_id)
            .map(TaskSummary::from)
            .collect()
    }

    pub async fn clear_agent_tasks(&self, agent_id: &str) -> usize {
        let mut guard = self.tasks.lock().await;
        let before = guard.len();
        guard.retain(|_, t| t.agent_id != agent_id);
        before - guard.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct CountingCallback(Arc<AtomicUsize>);
    #[async_trait::async_trait]
    impl ScheduledCallback for CountingCallback {
        async fn call(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn once_task_fires_exactly_once() {
        let scheduler = Arc::new(Scheduler::new(Duration::from_millis(10)));
        scheduler.start().await;
        let count = Arc::new(AtomicUsize::new(0));
        scheduler
            .schedule_once(
                "agent-1",
                Arc::new(CountingCallback(count.clone())),
                Utc::now(),
            )
            .await;

        tokio::time::advance(Duration::from_millis(50)).await;
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_millis(50)).await;
        tokio::task::yield_now().await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
        scheduler.stop().await;
    }

    #[tokio::test]
    async fn cancel_pause_resume_and_agent_queries() {
        let scheduler = Arc::new(Scheduler::new(Duration::from_secs(1)));
        let count = Arc::new(AtomicUsize::new(0));
        let id = scheduler
            .schedule_interval(
                "agent-1",
                Arc::new(CountingCallback(count.clone())),
                60,
                true,
            )
            .await;

        assert_eq!(scheduler.tasks_for_agent("agent-1").await.len(), 1);
        assert!(scheduler.pause(id).await);
        assert!(!scheduler.tasks_for_agent("agent-1").await[0].enabled);
        assert!(scheduler.resume(id).await);
        assert!(scheduler.cancel(id).await);
        assert!(!scheduler.cancel(id).await);

        scheduler
            .schedule_interval("agent-2", Arc::new(CountingCallback(count)), 60, true)
            .await;
        assert_eq!(scheduler.clear_agent_tasks("agent-2").await, 1);
        assert_eq!(scheduler.tasks_for_agent("agent-2").await.len(), 0);
    }
}
