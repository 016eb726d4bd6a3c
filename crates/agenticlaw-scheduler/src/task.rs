//! `ScheduledTask` and its `should_run` predicate (spec §4.4), ported from
//! `beezle_bug/scheduler.py`'s `ScheduledTask.should_run`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

impl TaskId {
    pub(crate) fn new(n: u64) -> Self {
        Self(n)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskKind {
    Once { run_at: DateTime<Utc> },
    Interval { interval_seconds: u64 },
}

/// The unit of scheduled work invoked by the scheduler's tick loop.
#[async_trait]
pub trait ScheduledCallback: Send + Sync {
    async fn call(&self);
}

#[async_trait]
impl<F> ScheduledCallback for F
where
    F: Fn() -> futures::future::BoxFuture<'static, ()> + Send + Sync,
{
    async fn call(&self) {
        (self)().await
    }
}

pub struct ScheduledTask {
    pub id: TaskId,
    pub agent_id: String,
    pub kind: TaskKind,
    pub callback: Arc<dyn ScheduledCallback>,
    pub last_run: Option<DateTime<Utc>>,
    pub enabled: bool,
    pub run_count: u64,
}

/// Callback-free view of a task, returned by enumeration queries.
#[derive(Clone, Debug)]
pub struct TaskSummary {
    pub id: TaskId,
    pub agent_id: String,
    pub kind: TaskKind,
    pub enabled: bool,
    pub run_count: u64,
}

impl From<&ScheduledTask> for TaskSummary {
    fn from(t: &ScheduledTask) -> Self {
        Self {
            id: t.id,
            agent_id: t.agent_id.clone(),
            kind: t.kind,
            enabled: t.enabled,
            run_count: t.run_count,
        }
    }
}

impl ScheduledTask {
    pub fn should_run(&self, now: DateTime<Utc>) -> bool {
        if !self.enabled {
            return false;
        }
        match self.kind {
            TaskKind::Once { run_at } => now >= run_at && self.run_count == 0,
            TaskKind::Interval { interval_seconds } => match self.last_run {
                None => true,
                Some(last_run) => (now - last_run).num_seconds() >= interval_seconds as i64,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopCallback;
    #[async_trait]
    impl ScheduledCallback for NoopCallback {
        async fn call(&self) {}
    }

    fn task(kind: TaskKind) -> ScheduledTask {
        ScheduledTask {
            id: TaskId::new(1),
            agent_id: "agent-1".to_string(),
            kind,
            callback: Arc::new(NoopCallback),
            last_run: None,
            enabled: true,
            run_count: 0,
        }
    }

    #[test]
    fn once_task_runs_only_at_or_after_run_at_and_only_once() {
        let now = Utc::now();
        let mut t = task(TaskKind::Once { run_at: now });
        assert!(!t.should_run(now - chrono::Duration::seconds(1)));
        assert!(t.should_run(now));
        t.run_count = 1;
        assert!(!t.should_run(now + chrono::Duration::seconds(10)));
    }

    #[test]
    fn interval_task_fires_on_first_tick_when_last_run_is_none() {
        let t = task(TaskKind::Interval { interval_seconds: 60 });
        assert!(t.should_run(Utc::now()));
    }

    #[test]
    fn interval_task_waits_for_elapsed_interval() {
        let now = Utc::now();
        let mut t = task(TaskKind::Interval { interval_seconds: 60 });
        t.last_run = Some(now);
        assert!(!t.should_run(now + chrono::Duration::seconds(30)));
        assert!(t.should_run(now + chrono::Duration::seconds(61)));
    }

    #[test]
    fn disabled_task_never_runs() {
        let now = Utc::now();
        let mut t = task(TaskKind::Once { run_at: now });
        t.enabled = false;
        assert!(!t.should_run(now));
    }
}
