use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum VectorStoreError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("collection error: {0}")]
    Collection(String),
    #[error("upsert error: {0}")]
    Upsert(String),
    #[error("search error: {0}")]
    Search(String),
    #[error("delete error: {0}")]
    Delete(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Distance used to rank neighbours, fixed when a collection is created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DistanceMetric {
    #[default]
    Cosine,
    Euclidean,
    /// Inner product.
    Dot,
}

impl DistanceMetric {
    /// Whether a larger score means a closer match.
    #[must_use]
    pub fn higher_is_closer(self) -> bool {
        !matches!(self, Self::Euclidean)
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cosine => "COSINE",
            Self::Euclidean => "L2",
            Self::Dot => "IP",
        })
    }
}

impl FromStr for DistanceMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "COSINE" => Ok(Self::Cosine),
            "L2" | "EUCLID" | "EUCLIDEAN" => Ok(Self::Euclidean),
            "IP" | "DOT" => Ok(Self::Dot),
            other => Err(format!("unknown metric type: {other}")),
        }
    }
}

/// `Flat` searches exhaustively; `Hnsw` uses the store's approximate graph index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IndexKind {
    #[default]
    Flat,
    Hnsw,
}

impl IndexKind {
    #[must_use]
    pub fn is_exact(self) -> bool {
        matches!(self, Self::Flat)
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Flat => "FLAT",
            Self::Hnsw => "HNSW",
        })
    }
}

impl FromStr for IndexKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "FLAT" => Ok(Self::Flat),
            "HNSW" => Ok(Self::Hnsw),
            other => Err(format!("unknown index type: {other}")),
        }
    }
}

/// Serialize through `Display` and deserialize through `FromStr`, so option
/// names are accepted in any case.
macro_rules! serde_via_str {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

serde_via_str!(DistanceMetric);
serde_via_str!(IndexKind);

/// Shape of a collection, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionSpec {
    pub vector_size: u64,
    pub metric: DistanceMetric,
    pub index: IndexKind,
}

#[derive(Debug, Clone)]
pub struct VectorPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: HashMap<String, serde_json::Value>,
}

/// A search hit. For [`DistanceMetric::Euclidean`] `score` is a distance
/// (lower is closer); otherwise it is a similarity (higher is closer).
#[derive(Debug, Clone)]
pub struct ScoredVectorPoint {
    pub id: String,
    pub score: f32,
    pub payload: HashMap<String, serde_json::Value>,
}

pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait VectorStore: Send + Sync {
    /// Create the collection if it does not exist. No-op otherwise.
    fn ensure_collection(
        &self,
        collection: &str,
        spec: CollectionSpec,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>>;

    fn collection_exists(&self, collection: &str) -> BoxFuture<'_, Result<bool, VectorStoreError>>;

    fn delete_collection(&self, collection: &str) -> BoxFuture<'_, Result<(), VectorStoreError>>;

    fn upsert(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>>;

    /// Nearest `limit` points, nearest first. `exact` forces an exhaustive scan.
    fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
        exact: bool,
    ) -> BoxFuture<'_, Result<Vec<ScoredVectorPoint>, VectorStoreError>>;

    fn count(&self, collection: &str) -> BoxFuture<'_, Result<u64, VectorStoreError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_parses_case_insensitively() {
        assert_eq!("cosine".parse(), Ok(DistanceMetric::Cosine));
        assert_eq!("L2".parse(), Ok(DistanceMetric::Euclidean));
        assert_eq!("ip".parse(), Ok(DistanceMetric::Dot));
        assert!("manhattan".parse::<DistanceMetric>().is_err());
    }

    #[test]
    fn index_parses_case_insensitively() {
        assert_eq!("flat".parse(), Ok(IndexKind::Flat));
        assert_eq!("HNSW".parse(), Ok(IndexKind::Hnsw));
        assert!("ivf".parse::<IndexKind>().is_err());
    }

    #[test]
    fn serde_uses_store_option_names() {
        #[derive(Deserialize)]
        struct Opts {
            index_type: IndexKind,
            metric_type: DistanceMetric,
        }
        let opts: Opts =
            serde_json::from_str(r#"{"index_type": "FLAT", "metric_type": "IP"}"#).unwrap();
        assert_eq!(opts.index_type, IndexKind::Flat);
        assert_eq!(opts.metric_type, DistanceMetric::Dot);

        let opts: Opts =
            serde_json::from_str(r#"{"index_type": "Hnsw", "metric_type": "l2"}"#).unwrap();
        assert_eq!(opts.index_type, IndexKind::Hnsw);
        assert_eq!(opts.metric_type, DistanceMetric::Euclidean);

        assert!(
            serde_json::from_str::<Opts>(r#"{"index_type": "IVF", "metric_type": "L2"}"#).is_err()
        );
        assert_eq!(
            serde_json::to_string(&DistanceMetric::Euclidean).unwrap(),
            r#""L2""#
        );
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for metric in [
            DistanceMetric::Cosine,
            DistanceMetric::Euclidean,
            DistanceMetric::Dot,
        ] {
            assert_eq!(metric.to_string().parse(), Ok(metric));
        }
        assert_eq!(IndexKind::Hnsw.to_string(), "HNSW");
    }

    #[test]
    fn defaults_are_exact_cosine() {
        assert_eq!(DistanceMetric::default(), DistanceMetric::Cosine);
        assert!(IndexKind::default().is_exact());
        assert!(!DistanceMetric::Euclidean.higher_is_closer());
    }
}
