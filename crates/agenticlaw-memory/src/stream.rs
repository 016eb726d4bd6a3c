//! MemoryStream: append observations with embeddings, retrieve by vector
//! similarity (spec §4.3), grounded on `beezle_bug/memory/memory_stream.py`.

use crate::embedder::Embedder;
use agenticlaw_core::{NodeId, Observation, ObservationContent, ProjectId};
use agenticlaw_storage::{MemoryStreamMetadata, StorageBackend};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(thiserror::Error, Debug)]
pub enum MemoryStreamError {
    #[error(transparent)]
    Storage(#[from] agenticlaw_storage::StorageError),

    #[error(transparent)]
    Embedder(#[from] crate::embedder::EmbedderError),
}

pub type Result<T> = std::result::Result<T, MemoryStreamError>;

/// Backs an agent's bound `memory` node. With a storage backend, retrieval
/// delegates to the vector index; without one (the unit-test path) it falls
/// back to an in-process list scored by the three-signal formula.
pub struct MemoryStream {
    embedder: Arc<dyn Embedder>,
    backing: Backing,
}

enum Backing {
    Storage {
        storage: Arc<dyn StorageBackend>,
        ms_id: i64,
    },
    InMemory(Mutex<Vec<Observation>>),
}

impl MemoryStream {
    pub async fn bind(
        storage: Arc<dyn StorageBackend>,
        project_id: &ProjectId,
        node_id: &NodeId,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        let ms_id = storage.ms_ensure(project_id, node_id).await?;
        Ok(Self {
            embedder,
            backing: Backing::Storage { storage, ms_id },
        })
    }

    pub fn new_in_memory(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            backing: Backing::InMemory(Mutex::new(Vec::new())),
        }
    }

    /// Embeds `content` and appends a new observation.
    pub async fn add(&self, content: ObservationContent, importance: f32) -> Result<Observation> {
        let text = content.to_embeddable_text();
        let embedding = self.embedder.embed(&text).await?;
        let mut observation = Observation::new(content, embedding, importance);

        match &self.backing {
            Backing::Storage { storage, ms_id } => {
                let id = storage.ms_add_observation(*ms_id, &observation).await?;
                observation.id = Some(id);
            }
            Backing::InMemory(list) => {
                observation.id = Some(list.lock().await.len() as i64);
                list.lock().await.push(observation.clone());
            }
        }
        Ok(observation)
    }

    /// Embeds `text` and returns up to `k` observations, refreshing their
    /// `accessed` timestamps.
    pub async fn retrieve(
        &self,
        text: &str,
        k: usize,
        from: Option<chrono::DateTime<chrono::Utc>>,
        to: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<Vec<Observation>> {
        let query_embedding = self.embedder.embed(text).await?;

        match &self.backing {
            Backing::Storage { storage, ms_id } => {
                let mut hits = storage.ms_search(*ms_id, &query_embedding, k, from, to).await?;
                let ids: Vec<i64> = hits.iter().filter_map(|o| o.id).collect();
                if !ids.is_empty() {
                    storage.ms_update_accessed(&ids).await?;
                }
                hits.sort_by_key(|o| o.created);
                Ok(hits)
            }
            Backing::InMemory(list) => {
                let now = chrono::Utc::now();
                let mut guard = list.lock().await;
                let mut scored: Vec<(f32, usize)> = guard
                    .iter()
                    .enumerate()
                    .filter(|(_, o)| from.map(|f| o.created >= f).unwrap_or(true))
                    .filter(|(_, o)| to.map(|t| o.created <= t).unwrap_or(true))
                    .map(|(i, o)| (o.score(&query_embedding, now), i))
                    .collect();
                scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
                scored.truncate(k);
                let indices: Vec<usize> = scored.iter().map(|(_, i)| *i).collect();
                for &idx in &indices {
                    guard[idx].accessed = now;
                }
                let mut out: Vec<Observation> = indices.into_iter().map(|i| guard[i].clone()).collect();
                out.sort_by_key(|o| o.created);
                Ok(out)
            }
        }
    }

    /// The `n` most recent observations, oldest-first, without a vector
    /// lookup.
    pub async fn get_recent(&self, n: usize) -> Result<Vec<Observation>> {
        match &self.backing {
            Backing::Storage { storage, ms_id } => Ok(storage.ms_get_recent(*ms_id, n).await?),
            Backing::InMemory(list) => {
                let guard = list.lock().await;
                let start = guard.len().saturating_sub(n);
                Ok(guard[start..].to_vec())
            }
        }
    }

    pub async fn get_metadata(&self) -> Result<MemoryStreamMetadata> {
        match &self.backing {
            Backing::Storage { storage, ms_id } => Ok(storage.ms_get_metadata(*ms_id).await?),
            Backing::InMemory(_) => Ok(MemoryStreamMetadata::default()),
        }
    }

    pub async fn update_metadata(&self, metadata: &MemoryStreamMetadata) -> Result<()> {
        match &self.backing {
            Backing::Storage { storage, ms_id } => {
                storage.ms_update_metadata(*ms_id, metadata).await?;
            }
            Backing::InMemory(_) => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::HashEmbedder;
    use agenticlaw_core::Message;

    #[tokio::test]
    async fn in_memory_retrieve_ranks_by_similarity() {
        let stream = MemoryStream::new_in_memory(Arc::new(HashEmbedder));
        stream
            .add(
                ObservationContent::Message(Message::new("user", "the cat sat on the mat")),
                0.5,
            )
            .await
            .unwrap();
        stream
            .add(
                ObservationContent::Message(Message::new("user", "quarterly revenue report")),
                0.5,
            )
            .await
            .unwrap();

        let hits = stream.retrieve("the cat sat on the mat", 1, None, None).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn get_recent_returns_chronological_order() {
        let stream = MemoryStream::new_in_memory(Arc::new(HashEmbedder));
        for i in 0..3 {
            stream
                .add(
                    ObservationContent::Message(Message::new("user", format!("message {i}"))),
                    0.0,
                )
                .await
                .unwrap();
        }
        let recent = stream.get_recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
    }
}
