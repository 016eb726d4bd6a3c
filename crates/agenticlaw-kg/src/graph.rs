//! In-memory façade over a single project/node knowledge graph: storage owns
//! durability, `petgraph::DiGraph` backs traversal queries (spec §4.2).

use crate::error::{KgError, Result};
use agenticlaw_core::{KgEntity, KgRelationship, NodeId, ProjectId};
use agenticlaw_storage::StorageBackend;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;

pub struct KnowledgeGraph {
    storage: Arc<dyn StorageBackend>,
    kg_id: i64,
    // Stable over removal: `remove_node` on a plain `DiGraph` swaps the
    // last node into the freed slot and invalidates its `NodeIndex`, which
    // would silently desync `index_of`.
    graph: StableDiGraph<String, String>,
    index_of: HashMap<String, NodeIndex>,
    properties_of: HashMap<String, BTreeMap<String, String>>,
}

impl KnowledgeGraph {
    /// Binds to (or creates) the knowledge graph for `(project_id,
    /// node_id)` and loads its current contents into memory.
    pub async fn load(
        storage: Arc<dyn StorageBackend>,
        project_id: &ProjectId,
        node_id: &NodeId,
    ) -> Result<Self> {
        let kg_id = storage.kg_ensure(project_id, node_id).await?;
        let snapshot = storage.kg_load_full(project_id, node_id).await?;
        let mut kg = Self {
            storage,
            kg_id,
            graph: StableDiGraph::new(),
            index_of: HashMap::new(),
            properties_of: HashMap::new(),
        };
        if let Some(snapshot) = snapshot {
            for entity in snapshot.entities {
                kg.insert_entity_local(entity);
            }
            for rel in snapshot.relationships {
                kg.insert_relationship_local(rel);
            }
        }
        Ok(kg)
    }

    fn insert_entity_local(&mut self, entity: KgEntity) {
        let idx = self.graph.add_node(entity.name.clone());
        self.index_of.insert(entity.name.clone(), idx);
        self.properties_of.insert(entity.name, entity.properties);
    }

    fn insert_relationship_local(&mut self, rel: KgRelationship) {
        if let (Some(&from), Some(&to)) =
            (self.index_of.get(&rel.from_entity), self.index_of.get(&rel.to_entity))
        {
            self.graph.add_edge(from, to, rel.rel_type);
        }
    }

    pub async fn add_entity(
        &mut self,
        name: &str,
        properties: BTreeMap<String, String>,
    ) -> Result<()> {
        self.storage
            .kg_add_entity(self.kg_id, name, &properties)
            .await?;
        self.insert_entity_local(KgEntity {
            name: name.to_string(),
            properties,
        });
        Ok(())
    }

    pub async fn update_entity_properties(
        &mut self,
        name: &str,
        properties: BTreeMap<String, String>,
    ) -> Result<()> {
        self.storage
            .kg_update_entity_properties(self.kg_id, name, &properties)
            .await?;
        self.properties_of
            .entry(name.to_string())
            .or_default()
            .extend(properties);
        Ok(())
    }

    pub async fn remove_entity(&mut self, name: &str) -> Result<()> {
        self.storage.kg_remove_entity(self.kg_id, name).await?;
        if let Some(idx) = self.index_of.remove(name) {
            self.graph.remove_node(idx);
        }
        self.properties_of.remove(name);
        Ok(())
    }

    pub async fn add_relationship(
        &mut self,
        from_name: &str,
        rel_type: &str,
        to_name: &str,
        properties: BTreeMap<String, String>,
    ) -> Result<()> {
        self.storage
            .kg_add_relationship(self.kg_id, from_name, rel_type, to_name, &properties)
            .await?;
        let from = *self
            .index_of
            .get(from_name)
            .ok_or_else(|| KgError::EntityNotFound(from_name.to_string()))?;
        let to = *self
            .index_of
            .get(to_name)
            .ok_or_else(|| KgError::EntityNotFound(to_name.to_string()))?;
        self.graph.add_edge(from, to, rel_type.to_string());
        Ok(())
    }

    pub fn entity_properties(&self, name: &str) -> Option<&BTreeMap<String, String>> {
        self.properties_of.get(name)
    }

    pub fn entity_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn relationship_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Shortest directed path between two named entities (BFS — edges are
    /// unweighted).
    pub fn find_path(&self, from: &str, to: &str) -> Result<Vec<String>> {
        let start = *self
            .index_of
            .get(from)
            .ok_or_else(|| KgError::EntityNotFound(from.to_string()))?;
        let goal = *self
            .index_of
            .get(to)
            .ok_or_else(|| KgError::EntityNotFound(to.to_string()))?;

        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        let mut predecessor: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        queue.push_back(start);
        visited.insert(start);

        while let Some(current) = queue.pop_front() {
            if current == goal {
                let mut path = vec![current];
                let mut cur = current;
                while let Some(&prev) = predecessor.get(&cur) {
                    path.push(prev);
                    cur = prev;
                }
                path.reverse();
                return Ok(path
                    .into_iter()
                    .map(|idx| self.graph[idx].clone())
                    .collect());
            }
            for edge in self.graph.edges(current) {
                let next = edge.target();
                if visited.insert(next) {
                    predecessor.insert(next, current);
                    queue.push_back(next);
                }
            }
        }

        Err(KgError::NoPath {
            from: from.to_string(),
            to: to.to_string(),
        })
    }

    /// Direct neighbours in either direction.
    pub fn neighbours(&self, name: &str) -> Result<Vec<String>> {
        let idx = *self
            .index_of
            .get(name)
            .ok_or_else(|| KgError::EntityNotFound(name.to_string()))?;
        let mut names: Vec<String> = self
            .graph
            .neighbors_undirected(idx)
            .map(|n| self.graph[n].clone())
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// All entities reachable within `k` undirected hops (excludes `name`
    /// itself).
    pub fn connected_within_k(&self, name: &str, k: usize) -> Result<Vec<String>> {
        let start = *self
            .index_of
            .get(name)
            .ok_or_else(|| KgError::EntityNotFound(name.to_string()))?;
        let mut visited = HashSet::new();
        visited.insert(start);
        let mut frontier = vec![start];
        let mut found = Vec::new();
        for _ in 0..k {
            let mut next_frontier = Vec::new();
            for node in frontier {
                for neighbour in self.graph.neighbors_undirected(node) {
                    if visited.insert(neighbour) {
                        found.push(self.graph[neighbour].clone());
                        next_frontier.push(neighbour);
                    }
                }
            }
            frontier = next_frontier;
            if frontier.is_empty() {
                break;
            }
        }
        found.sort();
        Ok(found)
    }

    /// The `n` entities with the highest undirected degree, highest first.
    pub fn most_connected(&self, n: usize) -> Vec<(String, usize)> {
        let mut degrees: Vec<(String, usize)> = self
            .graph
            .node_indices()
            .map(|idx| (self.graph[idx].clone(), self.graph.neighbors_undirected(idx).count()))
            .collect();
        degrees.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        degrees.truncate(n);
        degrees
    }

    /// Weakly-connected components, each a sorted list of entity names.
    pub fn connected_components(&self) -> Vec<Vec<String>> {
        let mut seen = HashSet::new();
        let mut components = Vec::new();
        for start in self.graph.node_indices() {
            if !seen.insert(start) {
                continue;
            }
            let mut component = vec![self.graph[start].clone()];
            let mut queue = VecDeque::new();
            queue.push_back(start);
            while let Some(node) = queue.pop_front() {
                for neighbour in self.graph.neighbors_undirected(node) {
                    if seen.insert(neighbour) {
                        component.push(self.graph[neighbour].clone());
                        queue.push_back(neighbour);
                    }
                }
            }
            component.sort();
            components.push(component);
        }
        components
    }

    /// Whether the whole graph forms a single weakly-connected component
    /// (an empty graph counts as connected).
    pub fn is_connected(&self) -> bool {
        self.connected_components().len() <= 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agenticlaw_storage::SqliteStorage;

    async fn kg() -> (KnowledgeGraph, ProjectId, NodeId) {
        let storage: Arc<dyn StorageBackend> =
            Arc::new(SqliteStorage::open_in_memory().unwrap());
        let project_id = ProjectId::generate();
        let node_id = NodeId::generate();
        let kg = KnowledgeGraph::load(storage, &project_id, &node_id)
            .await
            .unwrap();
        (kg, project_id, node_id)
    }

    #[tokio::test]
    async fn find_path_two_hop() {
        let (mut kg, _p, _n) = kg().await;
        kg.add_entity("Alice", BTreeMap::new()).await.unwrap();
        kg.add_entity("Paris", BTreeMap::new()).await.unwrap();
        kg.add_entity("France", BTreeMap::new()).await.unwrap();
        kg.add_relationship("Alice", "lives_in", "Paris", BTreeMap::new())
            .await
            .unwrap();
        kg.add_relationship("Paris", "located_in", "France", BTreeMap::new())
            .await
            .unwrap();

        let path = kg.find_path("Alice", "France").unwrap();
        assert_eq!(path, vec!["Alice", "Paris", "France"]);
    }

    #[tokio::test]
    async fn most_connected_ranks_by_degree() {
        let (mut kg, _p, _n) = kg().await;
        for name in ["Hub", "A", "B", "C"] {
            kg.add_entity(name, BTreeMap::new()).await.unwrap();
        }
        for leaf in ["A", "B", "C"] {
            kg.add_relationship("Hub", "connected_to", leaf, BTreeMap::new())
                .await
                .unwrap();
        }
        let ranked = kg.most_connected(1);
        assert_eq!(ranked[0].0, "Hub");
        assert_eq!(ranked[0].1, 3);
    }

    #[tokio::test]
    async fn remove_entity_cascades_locally() {
        let (mut kg, _p, _n) = kg().await;
        kg.add_entity("A", BTreeMap::new()).await.unwrap();
        kg.add_entity("B", BTreeMap::new()).await.unwrap();
        kg.add_relationship("A", "knows", "B", BTreeMap::new())
            .await
            .unwrap();
        kg.remove_entity("A").await.unwrap();
        assert_eq!(kg.entity_count(), 1);
        assert_eq!(kg.relationship_count(), 0);
    }

    /// Removing a node from a plain `petgraph::DiGraph` swaps the
    /// last-indexed node into the freed slot, reusing its `NodeIndex` for a
    /// different entity. `C` is added last, so it's the one that would be
    /// silently reindexed onto `A`'s old slot if `index_of` ever drifted.
    #[tokio::test]
    async fn remove_entity_keeps_surviving_indices_correct() {
        let (mut kg, _p, _n) = kg().await;
        kg.add_entity("A", BTreeMap::new()).await.unwrap();
        kg.add_entity("B", BTreeMap::new()).await.unwrap();
        kg.add_entity("C", BTreeMap::new()).await.unwrap();
        kg.add_relationship("B", "knows", "C", BTreeMap::new())
            .await
            .unwrap();

        kg.remove_entity("A").await.unwrap();

        assert_eq!(kg.neighbours("B").unwrap(), vec!["C".to_string()]);
        assert_eq!(kg.neighbours("C").unwrap(), vec!["B".to_string()]);
        assert_eq!(kg.find_path("B", "C").unwrap(), vec!["B", "C"]);
    }

    #[tokio::test]
    async fn disconnected_entities_are_separate_components() {
        let (mut kg, _p, _n) = kg().await;
        kg.add_entity("Island", BTreeMap::new()).await.unwrap();
        kg.add_entity("Mainland", BTreeMap::new()).await.unwrap();
        assert!(!kg.is_connected());
        assert_eq!(kg.connected_components().len(), 2);
    }
}
