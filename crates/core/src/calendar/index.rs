//! In-memory vector index over event subjects

use std::collections::HashMap;

/// Cosine similarity; zero when either vector has no magnitude or the
/// dimensions differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[derive(Debug, Default)]
pub struct EmbeddingIndex {
    vectors: HashMap<String, Vec<f32>>,
}

impl EmbeddingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, id: impl Into<String>, vector: Vec<f32>) {
        self.vectors.insert(id.into(), vector);
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.vectors.remove(id).is_some()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.vectors.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Top `k` ids by cosine similarity, highest first. Equal scores are
    /// ordered by id so results are stable.
    pub fn nearest(&self, query: &[f32], k: usize) -> Vec<(String, f32)> {
        let mut scored: Vec<(String, f32)> = self
            .vectors
            .iter()
            .map(|(id, v)| (id.clone(), cosine_similarity(query, v)))
            .collect();
        scored.sort_by(|(ia, a), (ib, b)| b.total_cmp(a).then_with(|| ia.cmp(ib)));
        scored.truncate(k);
        scored
    }
}
