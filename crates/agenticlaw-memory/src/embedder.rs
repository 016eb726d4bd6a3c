//! The embedding seam (spec §4.3), grounded on the `Embedder` trait in
//! `hi-youichi-loom`'s memory module.

use async_trait::async_trait;

pub const EMBEDDING_DIM: usize = 384;

#[derive(thiserror::Error, Debug)]
pub enum EmbedderError {
    #[error("embedder error: {0}")]
    Other(String),
}

/// Produces fixed-size (384-dim) embeddings from text. All observations
/// within one memory stream must share a single implementation.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError>;

    fn dimension(&self) -> usize {
        EMBEDDING_DIM
    }
}

/// Deterministic embedder for tests: a stable hash of the text seeds a
/// pseudo-random unit vector, so the same text always embeds identically
/// and unrelated texts are (with overwhelming probability) near-orthogonal.
pub struct HashEmbedder;

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut state = DefaultHasher::new();
        text.hash(&mut state);
        let mut seed = state.finish();

        let mut vector = Vec::with_capacity(EMBEDDING_DIM);
        for _ in 0..EMBEDDING_DIM {
            // xorshift64*, cheap and deterministic
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            let unit = (seed as f64 / u64::MAX as f64) as f32 * 2.0 - 1.0;
            vector.push(unit);
        }
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }
}
