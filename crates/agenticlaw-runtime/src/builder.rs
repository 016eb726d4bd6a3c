//! ExecutionGraphBuilder (spec §4.5): pure transformation from a design-time
//! `Project` into a runtime `ExecutionGraph`. Grounded on
//! `beezle_bug/agent_graph/execution_graph_builder.py`.

use agenticlaw_agent::{Agent, AgentConfig, Executable};
use agenticlaw_core::{Edge, EdgeKind, Error, Node, NodeConfig, NodeId, NodeKind, Port, Project, Result, ScheduledEventConfig};
use agenticlaw_kg::KnowledgeGraph;
use agenticlaw_llm::LlmProvider;
use agenticlaw_memory::{Embedder, MemoryStream};
use agenticlaw_storage::StorageBackend;
use agenticlaw_tools::{AskTarget, ExecutableLookup, ToolRegistry};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock as StdRwLock};
use tokio::sync::Mutex;

/// Where a routing-table entry's target leads (spec §3's `ExecutionGraph`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetKind {
    Executable,
    BufferIn,
    BufferTrigger,
}

/// Runtime-only projection of a design graph (spec §3). Rebuilt on every
/// deploy; torn down on undeploy.
pub struct ExecutionGraph {
    pub executables: HashMap<NodeId, Arc<dyn Executable>>,
    pub buffers: HashMap<NodeId, Mutex<agenticlaw_core::MessageBufferState>>,
    pub routing: HashMap<NodeId, Vec<(TargetKind, NodeId)>>,
    pub text_input_ids: Vec<NodeId>,
    pub voice_input_ids: Vec<NodeId>,
    pub scheduled_events: Vec<ScheduledEventConfig>,
    pub exit_ids: HashSet<NodeId>,
    pub kgs: HashMap<NodeId, Arc<Mutex<KnowledgeGraph>>>,
}

/// Resolves a node id to its live [`AskTarget`] (agent) for delegate tools
/// (spec §9: looked up at call time, never an embedded strong reference).
struct SharedExecutableLookup {
    agents: StdRwLock<HashMap<String, Arc<dyn AskTarget>>>,
}

impl ExecutableLookup for SharedExecutableLookup {
    fn lookup(&self, node_id: &str) -> Option<Arc<dyn AskTarget>> {
        self.agents.read().unwrap().get(node_id).cloned()
    }
}

fn display_name(id: &NodeId, config: &NodeConfig) -> String {
    config.name.clone().unwrap_or_else(|| id.to_string())
}

fn other_end<'a>(edge: &'a Edge, node_id: &NodeId) -> Option<&'a NodeId> {
    if &edge.source_node == node_id {
        Some(&edge.target_node)
    } else if &edge.target_node == node_id {
        Some(&edge.source_node)
    } else {
        None
    }
}

pub struct ExecutionGraphBuilder {
    storage: Arc<dyn StorageBackend>,
    provider: Arc<dyn LlmProvider>,
    embedder: Arc<dyn Embedder>,
    events: agenticlaw_core::EventBus,
    default_model: String,
}

impl ExecutionGraphBuilder {
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        provider: Arc<dyn LlmProvider>,
        embedder: Arc<dyn Embedder>,
        events: agenticlaw_core::EventBus,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            provider,
            embedder,
            events,
            default_model: default_model.into(),
        }
    }

    pub async fn build(&self, project: &Project) -> Result<ExecutionGraph> {
        if project.nodes.is_empty() {
            return Err(Error::validation("cannot deploy an empty graph"));
        }

        let nodes_by_id: HashMap<NodeId, &Node> =
            project.nodes.iter().map(|n| (n.id.clone(), n)).collect();

        // Step 1: resources.
        let mut kgs: HashMap<NodeId, Arc<Mutex<KnowledgeGraph>>> = HashMap::new();
        let mut memories: HashMap<NodeId, Arc<MemoryStream>> = HashMap::new();
        let mut toolboxes: HashMap<NodeId, Vec<String>> = HashMap::new();

        for node in &project.nodes {
            match node.kind {
                NodeKind::KnowledgeGraph => {
                    let kg = KnowledgeGraph::load(self.storage.clone(), &project.id, &node.id)
                        .await
                        .map_err(|e| Error::Deployment(e.to_string()))?;
                    kgs.insert(node.id.clone(), Arc::new(Mutex::new(kg)));
                }
                NodeKind::MemoryStream => {
                    let ms = MemoryStream::bind(
                        self.storage.clone(),
                        &project.id,
                        &node.id,
                        self.embedder.clone(),
                    )
                    .await
                    .map_err(|e| Error::Deployment(e.to_string()))?;
                    memories.insert(node.id.clone(), Arc::new(ms));
                }
                NodeKind::Toolbox => {
                    toolboxes.insert(node.id.clone(), node.config.tools.clone());
                }
                _ => {}
            }
        }

        // Step 2: agents — bind resources, build registries (delegate tools
        // added in step 3, once every agent id is known).
        let lookup = Arc::new(SharedExecutableLookup {
            agents: StdRwLock::new(HashMap::new()),
        });
        let mut registries: HashMap<NodeId, ToolRegistry> = HashMap::new();
        let mut agent_memory: HashMap<NodeId, Option<Arc<MemoryStream>>> = HashMap::new();

        for node in &project.nodes {
            if node.kind != NodeKind::Agent {
                continue;
            }
            let mut registry = ToolRegistry::new();
            let mut bound_kg = None;
            let mut bound_memory = None;
            let mut bound_tool_names: HashSet<String> = HashSet::new();

            for edge in &project.edges {
                if edge.kind != EdgeKind::Resource {
                    continue;
                }
                let Some(other_id) = other_end(edge, &node.id) else {
                    continue;
                };
                if let Some(kg) = kgs.get(other_id) {
                    if bound_kg.is_some() {
                        return Err(Error::validation(format!(
                            "agent {} has more than one bound knowledge graph",
                            node.id
                        )));
                    }
                    bound_kg = Some(kg.clone());
                }
                if let Some(ms) = memories.get(other_id) {
                    if bound_memory.is_some() {
                        return Err(Error::validation(format!(
                            "agent {} has more than one bound memory stream",
                            node.id
                        )));
                    }
                    bound_memory = Some(ms.clone());
                }
                if let Some(tool_names) = toolboxes.get(other_id) {
                    bound_tool_names.extend(tool_names.iter().cloned());
                }
            }

            if let Some(kg) = &bound_kg {
                agenticlaw_tools::register_kg_tools(&mut registry, kg.clone());
            }
            if let Some(ms) = &bound_memory {
                agenticlaw_tools::register_memory_tool(&mut registry, ms.clone());
            }
            if !bound_tool_names.is_empty() {
                agenticlaw_tools::register_toolbox_tools(&mut registry, &bound_tool_names);
            }

            agent_memory.insert(node.id.clone(), bound_memory);
            registries.insert(node.id.clone(), registry);
        }

        // Step 3: delegate tools.
        for edge in &project.edges {
            if edge.kind != EdgeKind::Delegate {
                continue;
            }
            let Some(target_node) = nodes_by_id.get(&edge.target_node) else {
                continue;
            };
            let Some(registry) = registries.get_mut(&edge.source_node) else {
                continue;
            };
            let target_label = display_name(&target_node.id, &target_node.config);
            agenticlaw_tools::register_delegate_tools(
                registry,
                std::iter::once((
                    edge.target_node.to_string(),
                    target_label,
                    Arc::clone(&lookup) as Arc<dyn ExecutableLookup>,
                )),
            );
        }

        let mut executables: HashMap<NodeId, Arc<dyn Executable>> = HashMap::new();
        let mut ask_targets: HashMap<NodeId, Arc<Agent>> = HashMap::new();

        for node in &project.nodes {
            if node.kind != NodeKind::Agent {
                continue;
            }
            let registry = registries
                .remove(&node.id)
                .unwrap_or_else(ToolRegistry::new);
            let memory = agent_memory.remove(&node.id).flatten();
            let config = AgentConfig {
                name: display_name(&node.id, &node.config),
                model: node
                    .config
                    .model
                    .clone()
                    .unwrap_or_else(|| self.default_model.clone()),
                system_prompt_template: node
                    .config
                    .system_prompt_template
                    .clone()
                    .unwrap_or_default(),
                max_tool_iterations: node.config.max_tool_iterations.unwrap_or(25),
                memory_context_size: 25,
            };
            let agent = Arc::new(Agent::new(
                node.id.clone(),
                config,
                self.provider.clone(),
                Arc::new(registry),
                memory,
                self.events.clone(),
            ));
            ask_targets.insert(node.id.clone(), agent.clone());
            executables.insert(node.id.clone(), agent as Arc<dyn Executable>);
        }

        {
            let mut map = lookup.agents.write().unwrap();
            for (id, agent) in &ask_targets {
                map.insert(id.to_string(), agent.clone() as Arc<dyn AskTarget>);
            }
        }

        // Step 4: buffers.
        let mut buffers = HashMap::new();
        for node in &project.nodes {
            if node.kind == NodeKind::MessageBuffer {
                buffers.insert(node.id.clone(), Mutex::new(agenticlaw_core::MessageBufferState::new()));
            }
        }

        // Step 5: entry points.
        let text_input_ids: Vec<NodeId> = project
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::TextInput)
            .map(|n| n.id.clone())
            .collect();
        let voice_input_ids: Vec<NodeId> = project
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::VoiceInput)
            .map(|n| n.id.clone())
            .collect();
        let scheduled_events: Vec<ScheduledEventConfig> = project
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::ScheduledEvent)
            .map(|n| ScheduledEventConfig {
                node_id: n.id.clone(),
                name: display_name(&n.id, &n.config),
                message_content: n.config.message_content.clone().unwrap_or_default(),
                run_at: n.config.run_at,
                interval_seconds: n.config.interval_seconds,
            })
            .collect();

        // Step 6 + 7: routing table and exit set.
        let mut routing: HashMap<NodeId, Vec<(TargetKind, NodeId)>> = HashMap::new();
        let mut exit_ids = HashSet::new();

        for edge in &project.edges {
            if edge.kind != EdgeKind::Message || edge.source_port != Port::MessageOut {
                continue;
            }
            let Some(target) = nodes_by_id.get(&edge.target_node) else {
                continue;
            };
            let entry = match (target.kind, edge.target_port) {
                (NodeKind::Agent, Port::MessageIn) => (TargetKind::Executable, target.id.clone()),
                (NodeKind::MessageBuffer, Port::MessageIn) => {
                    (TargetKind::BufferIn, target.id.clone())
                }
                (NodeKind::MessageBuffer, Port::Trigger) => {
                    (TargetKind::BufferTrigger, target.id.clone())
                }
                (NodeKind::TextOutput, Port::MessageIn) => {
                    // A text_output node is never invoked as an executable;
                    // it marks its upstream agent as an exit (spec §4.5 step
                    // 6, §4.6's walk_from `target_id ∈ exit_ids` check).
                    exit_ids.insert(edge.source_node.clone());
                    continue;
                }
                _ => continue,
            };
            routing.entry(edge.source_node.clone()).or_default().push(entry);
        }

        Ok(ExecutionGraph {
            executables,
            buffers,
            routing,
            text_input_ids,
            voice_input_ids,
            scheduled_events,
            exit_ids,
            kgs,
        })
    }
}
