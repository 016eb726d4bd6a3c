//! Graph-level message and memory-stream types.

use serde::{Deserialize, Serialize};

/// A single message flowing along a `message` edge. A "message list" is an
/// ordered `Vec<Message>` passed by value along one edge traversal.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub sender: String,
    pub content: String,
}

impl Message {
    pub fn new(sender: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            content: content.into(),
        }
    }
}

/// The unit of a memory stream. `created` is immutable; `accessed` is
/// refreshed on retrieval.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Observation {
    pub id: Option<i64>,
    pub created: chrono::DateTime<chrono::Utc>,
    pub accessed: chrono::DateTime<chrono::Utc>,
    pub importance: f32,
    pub embedding: Vec<f32>,
    pub content: ObservationContent,
    pub content_kind: ObservationContentKind,
}

impl Observation {
    pub fn new(content: ObservationContent, embedding: Vec<f32>, importance: f32) -> Self {
        let now = chrono::Utc::now();
        let content_kind = content.kind();
        Self {
            id: None,
            created: now,
            accessed: now,
            importance,
            embedding,
            content,
            content_kind,
        }
    }

    /// Combined recency/relevance/importance score, used only by the
    /// in-memory fallback path when no storage backend is configured.
    pub fn score(&self, query_embedding: &[f32], now: chrono::DateTime<chrono::Utc>) -> f32 {
        const LAMBDA: f64 = 0.999;
        let hours_since_accessed = (now - self.accessed).num_seconds() as f64 / 3600.0;
        let recency = LAMBDA.powf(hours_since_accessed.max(0.0)) as f32;
        let relevance = cosine_similarity(&self.embedding, query_embedding);
        (recency + self.importance + relevance) / 3.0
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// The payload carried by an [`Observation`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "content_kind", content = "content_value", rename_all = "snake_case")]
pub enum ObservationContent {
    Message(Message),
    ToolResult { tool_name: String, result: String },
    LlmResponse { content: String },
}

impl ObservationContent {
    pub fn kind(&self) -> ObservationContentKind {
        match self {
            ObservationContent::Message(_) => ObservationContentKind::Message,
            ObservationContent::ToolResult { .. } => ObservationContentKind::ToolResult,
            ObservationContent::LlmResponse { .. } => ObservationContentKind::LlmResponse,
        }
    }

    /// JSON-serialised form, used as the embedding model's input text.
    pub fn to_embeddable_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ObservationContentKind {
    Message,
    ToolResult,
    LlmResponse,
}

impl std::fmt::Display for ObservationContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Message => "message",
            Self::ToolResult => "tool_result",
            Self::LlmResponse => "llm_response",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_blends_three_signals() {
        let obs = Observation::new(
            ObservationContent::Message(Message::new("User", "hi")),
            vec![1.0, 0.0],
            0.5,
        );
        let now = obs.created;
        let score = obs.score(&[1.0, 0.0], now);
        // recency ~1.0, importance 0.5, relevance 1.0 => (1+0.5+1)/3
        assert!((score - 0.8333).abs() < 0.01);
    }
}
