//! Agenticlaw Runtime — builds a deployable execution graph from a design
//! `Project` (spec §4.5) and routes messages through it (spec §4.6).

pub mod builder;
pub mod router;

pub use builder::{ExecutionGraph, ExecutionGraphBuilder, TargetKind};
pub use router::{AgentReply, ExitCallback, Runtime};
