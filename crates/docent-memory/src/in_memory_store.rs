use std::collections::HashMap;
use std::sync::RwLock;

use crate::vector_store::{
    BoxFuture, CollectionSpec, DistanceMetric, ScoredVectorPoint, VectorPoint, VectorStore,
    VectorStoreError,
};

struct StoredPoint {
    id: String,
    vector: Vec<f32>,
    payload: HashMap<String, serde_json::Value>,
}

struct InMemoryCollection {
    spec: CollectionSpec,
    /// Insertion order; ties in score keep this order.
    points: Vec<StoredPoint>,
    /// Point id to its slot in `points`.
    slots: HashMap<String, usize>,
}

impl InMemoryCollection {
    fn new(spec: CollectionSpec) -> Self {
        Self {
            spec,
            points: Vec::new(),
            slots: HashMap::new(),
        }
    }

    fn put(&mut self, point: StoredPoint) {
        if let Some(&slot) = self.slots.get(&point.id) {
            self.points[slot] = point;
        } else {
            self.slots.insert(point.id.clone(), self.points.len());
            self.points.push(point);
        }
    }
}

/// Process-local [`VectorStore`]. Every search is an exact scan.
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, InMemoryCollection>>,
}

impl InMemoryVectorStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryVectorStore")
            .finish_non_exhaustive()
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot(a, b) / (norm_a * norm_b)
}

fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

fn score(metric: DistanceMetric, a: &[f32], b: &[f32]) -> f32 {
    match metric {
        DistanceMetric::Cosine => cosine_similarity(a, b),
        DistanceMetric::Euclidean => euclidean_distance(a, b),
        DistanceMetric::Dot => dot(a, b),
    }
}

impl VectorStore for InMemoryVectorStore {
    fn ensure_collection(
        &self,
        collection: &str,
        spec: CollectionSpec,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let mut cols = self
                .collections
                .write()
                .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
            cols.entry(collection)
                .or_insert_with(|| InMemoryCollection::new(spec));
            Ok(())
        })
    }

    fn collection_exists(&self, collection: &str) -> BoxFuture<'_, Result<bool, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let cols = self
                .collections
                .read()
                .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
            Ok(cols.contains_key(&collection))
        })
    }

    fn delete_collection(&self, collection: &str) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let mut cols = self
                .collections
                .write()
                .map_err(|e| VectorStoreError::Delete(e.to_string()))?;
            cols.remove(&collection);
            Ok(())
        })
    }

    fn upsert(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let mut cols = self
                .collections
                .write()
                .map_err(|e| VectorStoreError::Upsert(e.to_string()))?;
            let col = cols.get_mut(&collection).ok_or_else(|| {
                VectorStoreError::Upsert(format!("collection {collection} not found"))
            })?;

            let expected = usize::try_from(col.spec.vector_size).unwrap_or(usize::MAX);
            if let Some(bad) = points.iter().find(|p| p.vector.len() != expected) {
                return Err(VectorStoreError::Upsert(format!(
                    "point {} has dimension {}, collection {collection} expects {expected}",
                    bad.id,
                    bad.vector.len()
                )));
            }

            col.points.reserve(points.len());
            for p in points {
                col.put(StoredPoint {
                    id: p.id,
                    vector: p.vector,
                    payload: p.payload,
                });
            }
            Ok(())
        })
    }

    fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
        _exact: bool,
    ) -> BoxFuture<'_, Result<Vec<ScoredVectorPoint>, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let cols = self
                .collections
                .read()
                .map_err(|e| VectorStoreError::Search(e.to_string()))?;
            let col = cols.get(&collection).ok_or_else(|| {
                VectorStoreError::Search(format!("collection {collection} not found"))
            })?;

            let metric = col.spec.metric;
            let mut scored: Vec<ScoredVectorPoint> = col
                .points
                .iter()
                .map(|sp| ScoredVectorPoint {
                    id: sp.id.clone(),
                    score: score(metric, &vector, &sp.vector),
                    payload: sp.payload.clone(),
                })
                .collect();

            if metric.higher_is_closer() {
                scored.sort_by(|a, b| b.score.total_cmp(&a.score));
            } else {
                scored.sort_by(|a, b| a.score.total_cmp(&b.score));
            }
            scored.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
            Ok(scored)
        })
    }

    fn count(&self, collection: &str) -> BoxFuture<'_, Result<u64, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let cols = self
                .collections
                .read()
                .map_err(|e| VectorStoreError::Search(e.to_string()))?;
            Ok(cols
                .get(&collection)
                .map_or(0, |c| c.points.len() as u64))
        })
    }
}
