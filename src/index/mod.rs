// In-memory vector index
// Exhaustive nearest-neighbour search over the chunks of one document


use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chunking::Chunk;
use crate::{AppError, Result};

/// Distance function used to rank chunks against a query vector
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Distance {
    /// Squared L2 distance
    #[default]
    Euclidean,
    /// One minus cosine similarity
    Cosine,
}

impl Distance {
    #[inline]
    pub fn between(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::Euclidean => a
                .iter()
                .zip(b)
                .map(|(x, y)| {
                    let d = x - y;
                    d * d
                })
                .sum(),
            Self::Cosine => 1.0 - cosine_similarity(a, b),
        }
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;

    for (x, y) in a.iter().zip(b) {
        dot = x.mul_add(*y, dot);
        norm_a = x.mul_add(*x, norm_a);
        norm_b = y.mul_add(*y, norm_b);
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// A chunk returned by a similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub chunk: Chunk,
    /// Smaller is closer
    pub distance: f32,
}

/// Vectors and the chunks they were computed from. Rebuilt for every uploaded document.
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    entries: Vec<(Chunk, Vec<f32>)>,
    dimension: Option<usize>,
    distance: Distance,
}

impl VectorIndex {
    /// Build an index from chunk/vector pairs. All vectors must share one non-zero dimension.
    #[inline]
    pub fn build(entries: Vec<(Chunk, Vec<f32>)>, distance: Distance) -> Result<Self> {
        let dimension = match entries.first() {
            Some((_, vector)) if vector.is_empty() => {
                return Err(AppError::Index("Embedding vectors cannot be empty".to_string()));
            }
            Some((_, vector)) => Some(vector.len()),
            None => None,
        };

        if let Some(expected) = dimension {
            if let Some((chunk, vector)) = entries.iter().find(|(_, v)| v.len() != expected) {
                return Err(AppError::Index(format!(
                    "Dimension mismatch for chunk {}: expected {}, got {}",
                    chunk.chunk_index,
                    expected,
                    vector.len()
                )));
            }
        }

        debug!(
            "Built vector index with {} entries (dimension {:?}, {:?} distance)",
            entries.len(),
            dimension,
            distance
        );

        Ok(Self {
            entries,
            dimension,
            distance,
        })
    }

    /// Return at most `k` chunks ordered from closest to farthest
    #[inline]
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        let Some(dimension) = self.dimension else {
            return Ok(Vec::new());
        };

        if query.len() != dimension {
            return Err(AppError::Index(format!(
                "Query dimension mismatch: expected {}, got {}",
                dimension,
                query.len()
            )));
        }

        let mut results: Vec<SearchResult> = self
            .entries
            .iter()
            .map(|(chunk, vector)| SearchResult {
                chunk: chunk.clone(),
                distance: self.distance.between(query, vector),
            })
            .collect();

        results.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.chunk.chunk_index.cmp(&b.chunk.chunk_index))
        });
        results.truncate(k);

        Ok(results)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub const fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    #[inline]
    pub const fn distance(&self) -> Distance {
        self.distance
    }

    #[inline]
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|(chunk, _)| chunk)
    }
}
