//! Document ingestion and vector retrieval for docent.
//!
//! Sources flow through four stages before they become searchable:
//! loaders produce [`document::Document`]s, the normalizer reconciles their
//! metadata schemas, the splitter cuts them into [`document::Chunk`]s, and
//! [`index::DocumentIndex`] embeds and stores the chunks in a
//! [`vector_store::VectorStore`] backend (Qdrant or in-memory).

pub mod document;
pub mod in_memory_store;
pub mod index;
pub mod qdrant_ops;
pub mod vector_store;

pub use in_memory_store::InMemoryVectorStore;
pub use index::{CONTENT_FIELD, DocumentIndex, EmbedFn, IndexConfig, ScoredChunk};
pub use qdrant_ops::QdrantOps;
pub use vector_store::{
    CollectionSpec, DistanceMetric, IndexKind, ScoredVectorPoint, VectorPoint, VectorStore,
    VectorStoreError,
};
