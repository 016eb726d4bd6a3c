//! Agenticlaw Tools — the built-in tool set available to a deployed agent
//! (spec §4.2, §4.3, §4.5).
//!
//! Each agent's registry is assembled at deploy time from whatever it is
//! actually bound to: a knowledge-graph node contributes the `kg_*` tools,
//! a memory node contributes `memory_retrieve`, and each outgoing
//! `agent -> agent` edge contributes one `ask_<name>` delegate tool. An
//! agent bound to nothing gets an empty registry and answers from its
//! system prompt and message history alone.

pub mod registry;
pub mod tools;

pub use registry::{Tool, ToolRegistry, ToolResult};
pub use tools::delegate::{AskTarget, DelegateTool, ExecutableLookup};
pub use tools::kg::{
    KgAddEntityTool, KgAddRelationshipTool, KgFindPathTool, KgNeighboursTool, KgRemoveEntityTool,
    KgUpdateEntityPropertiesTool,
};
pub use tools::memory::MemoryRetrieveTool;
pub use tools::toolbox::{GetDateTimeTool, ThinkTool};

use agenticlaw_kg::KnowledgeGraph;
use agenticlaw_memory::MemoryStream;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Registers the full `kg_*` tool set against a single bound knowledge
/// graph.
pub fn register_kg_tools(registry: &mut ToolRegistry, kg: Arc<Mutex<KnowledgeGraph>>) {
    registry.register(KgAddEntityTool::new(kg.clone()));
    registry.register(KgUpdateEntityPropertiesTool::new(kg.clone()));
    registry.register(KgRemoveEntityTool::new(kg.clone()));
    registry.register(KgAddRelationshipTool::new(kg.clone()));
    registry.register(KgFindPathTool::new(kg.clone()));
    registry.register(KgNeighboursTool::new(kg));
}

/// Registers `memory_retrieve` against a single bound memory stream.
pub fn register_memory_tool(registry: &mut ToolRegistry, stream: Arc<MemoryStream>) {
    registry.register(MemoryRetrieveTool::new(stream));
}

/// Registers the named standalone tools contributed by an agent's bound
/// `toolbox` node(s) (spec §3 invariant 2: "multiple toolbox bindings are
/// unioned"). Unrecognised names are logged and skipped rather than
/// rejected, matching the policy-registry pattern this is grounded on.
pub fn register_toolbox_tools(registry: &mut ToolRegistry, tool_names: &std::collections::HashSet<String>) {
    for name in tool_names {
        match name.as_str() {
            "think" => registry.register(ThinkTool),
            "get_date_time" => registry.register(GetDateTimeTool),
            _ => tracing::warn!(tool = %name, "unknown toolbox tool name, skipping"),
        }
    }
}

/// Registers one `ask_<name>` delegate tool per outgoing agent edge. The
/// caller resolves each target's display name and shared [`ExecutableLookup`]
/// ahead of time; this crate only knows how to wrap them into a [`Tool`].
pub fn register_delegate_tools(
    registry: &mut ToolRegistry,
    delegates: impl IntoIterator<Item = (String, String, Arc<dyn ExecutableLookup>)>,
) {
    for (target_node_id, target_label, lookup) in delegates {
        registry.register(DelegateTool::new(target_node_id, target_label, lookup));
    }
}
