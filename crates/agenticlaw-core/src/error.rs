//! The engine's domain-level error taxonomy (spec §7).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed node/edge, unknown node kind, invalid port, deploy on an
    /// empty graph. Surfaced to the caller; engine state unchanged.
    #[error("validation error: {0}")]
    Validation(String),

    /// The builder failed (template missing, storage unavailable). Partial
    /// work is rolled back — the engine remains undeployed.
    #[error("deployment error: {0}")]
    Deployment(String),

    /// Routing table references a missing executable — indicates a builder
    /// bug. Logged; the specific walk branch aborts, siblings proceed.
    #[error("routing error: {0}")]
    Routing(String),

    /// An agent turn failed. Caught at the call site; the turn returns `[]`.
    #[error("executable error: {0}")]
    Executable(String),

    /// A tool body threw or its arguments failed to parse.
    #[error("tool error: {name} - {message}")]
    Tool { name: String, message: String },

    /// The underlying store is unreachable or a constraint was violated.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("llm error: {provider} - {message}")]
    Llm { provider: String, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn tool(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Tool {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn llm(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Llm {
            provider: provider.into(),
            message: message.into(),
        }
    }
}
