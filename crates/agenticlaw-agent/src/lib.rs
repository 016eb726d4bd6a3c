//! Agenticlaw Agent — the executable agent type (spec §4.7): one LLM turn,
//! possibly expanding into a tool-call loop.

pub mod agent;
pub mod error;
pub mod template;

pub use agent::{Agent, AgentConfig};
pub use error::{AgentError, Result};

/// The routing polymorphism point (spec §6): any node participating in
/// routing exposes `execute(messages) -> messages`. Agent is the only
/// implementer today; future logic nodes would implement the same trait.
#[async_trait::async_trait]
pub trait Executable: Send + Sync {
    async fn execute(&self, messages: &[agenticlaw_core::Message]) -> Vec<agenticlaw_core::Message>;
}

#[async_trait::async_trait]
impl Executable for Agent {
    async fn execute(&self, messages: &[agenticlaw_core::Message]) -> Vec<agenticlaw_core::Message> {
        Agent::execute(self, messages).await
    }
}
