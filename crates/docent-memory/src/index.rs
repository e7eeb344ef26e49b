//! Named document collection over a [`VectorStore`].

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use uuid::Uuid;

use crate::document::{Chunk, DocumentError, Metadata, MetadataValue};
use crate::vector_store::{CollectionSpec, DistanceMetric, IndexKind, VectorPoint, VectorStore};

/// Payload field holding chunk text; metadata may not use it.
pub const CONTENT_FIELD: &str = "text";

pub type EmbedFn = Box<dyn Fn(&str) -> docent_llm::EmbedFuture + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexConfig {
    /// Namespace prefix; empty means none.
    pub database: String,
    pub collection: String,
    pub index_type: IndexKind,
    pub metric: DistanceMetric,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            database: "default".into(),
            collection: "research_papers".into(),
            index_type: IndexKind::Flat,
            metric: DistanceMetric::Cosine,
        }
    }
}

impl IndexConfig {
    /// Store-level collection name: `{database}_{collection}`.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        if self.database.is_empty() {
            self.collection.clone()
        } else {
            format!("{}_{}", self.database, self.collection)
        }
    }
}

/// A search hit decoded back into chunk form.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub id: String,
    pub score: f32,
    pub content: String,
    pub metadata: Metadata,
}

impl ScoredChunk {
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.metadata.get("source").and_then(MetadataValue::as_str)
    }
}

/// One named collection: drop, bulk insert, similarity search.
///
/// The embedding function is fixed for the lifetime of the index so that
/// queries and stored chunks are always embedded the same way.
pub struct DocumentIndex {
    store: Arc<dyn VectorStore>,
    embed_fn: EmbedFn,
    config: IndexConfig,
    collection: String,
    /// Metadata field names fixed by the first inserted batch.
    schema: Mutex<Option<BTreeSet<String>>>,
}

impl std::fmt::Debug for DocumentIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentIndex")
            .field("collection", &self.collection)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn field_names(metadata: &Metadata) -> BTreeSet<String> {
    metadata.keys().cloned().collect()
}

impl DocumentIndex {
    /// Bind an index to a store and verify the store is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Storage`] if the store cannot be reached.
    pub async fn open(
        store: Arc<dyn VectorStore>,
        embed_fn: EmbedFn,
        config: IndexConfig,
    ) -> Result<Self, DocumentError> {
        let collection = config.qualified_name();
        let exists = store.collection_exists(&collection).await?;
        tracing::debug!(collection = %collection, exists, "document index opened");
        Ok(Self {
            store,
            embed_fn,
            config,
            collection,
            schema: Mutex::new(None),
        })
    }

    #[must_use]
    pub fn collection_name(&self) -> &str {
        &self.collection
    }

    #[must_use]
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Delete the collection if it exists. Returns whether anything was deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached.
    pub async fn drop_collection(&self) -> Result<bool, DocumentError> {
        let existed = self.store.collection_exists(&self.collection).await?;
        if existed {
            self.store.delete_collection(&self.collection).await?;
            tracing::info!(collection = %self.collection, "collection dropped");
        }
        *self.schema.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(existed)
    }

    fn check_schema(&self, chunks: &[Chunk]) -> Result<(), DocumentError> {
        let Some(first) = chunks.first() else {
            return Ok(());
        };
        let batch = field_names(&first.metadata);
        if batch.contains(CONTENT_FIELD) {
            return Err(DocumentError::ReservedField(CONTENT_FIELD.into()));
        }
        if let Some(odd) = chunks
            .iter()
            .map(|c| field_names(&c.metadata))
            .find(|names| *names != batch)
        {
            return Err(DocumentError::SchemaMismatch {
                expected: batch.into_iter().collect(),
                found: odd.into_iter().collect(),
            });
        }

        let schema = self.schema.lock().unwrap_or_else(PoisonError::into_inner);
        match schema.as_ref() {
            Some(fixed) if *fixed != batch => Err(DocumentError::SchemaMismatch {
                expected: fixed.iter().cloned().collect(),
                found: batch.into_iter().collect(),
            }),
            _ => Ok(()),
        }
    }

    /// Embed and insert chunks, creating the collection on first use.
    /// Returns the generated point ids in chunk order.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::SchemaMismatch`] if the chunks do not share one
    /// set of metadata field names (or differ from the collection's),
    /// [`DocumentError::ReservedField`] if metadata uses the content field, and
    /// embedding or storage errors otherwise. Nothing is inserted on error.
    pub async fn add_documents(&self, chunks: &[Chunk]) -> Result<Vec<String>, DocumentError> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }
        self.check_schema(chunks)?;

        let mut points = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let vector = (self.embed_fn)(&chunk.content).await?;
            let mut payload: HashMap<String, serde_json::Value> = chunk
                .metadata
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect();
            payload.insert(
                CONTENT_FIELD.to_owned(),
                serde_json::Value::String(chunk.content.clone()),
            );
            points.push(VectorPoint {
                id: Uuid::new_v4().to_string(),
                vector,
                payload,
            });
        }

        let spec = CollectionSpec {
            vector_size: points[0].vector.len() as u64,
            metric: self.config.metric,
            index: self.config.index_type,
        };
        self.store.ensure_collection(&self.collection, spec).await?;

        let ids: Vec<String> = points.iter().map(|p| p.id.clone()).collect();
        self.store.upsert(&self.collection, points).await?;

        self.schema
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_or_insert_with(|| field_names(&chunks[0].metadata));

        tracing::debug!(collection = %self.collection, inserted = ids.len(), "chunks stored");
        Ok(ids)
    }

    /// The `k` stored chunks nearest to `query`, nearest first.
    ///
    /// Returns an empty list if `k` is zero or the collection does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding the query or searching fails.
    pub async fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredChunk>, DocumentError> {
        if k == 0 || !self.store.collection_exists(&self.collection).await? {
            return Ok(Vec::new());
        }
        let vector = (self.embed_fn)(query).await?;
        let hits = self
            .store
            .search(
                &self.collection,
                vector,
                k as u64,
                self.config.index_type.is_exact(),
            )
            .await?;

        Ok(hits
            .into_iter()
            .map(|hit| {
                let mut payload = hit.payload;
                let content = match payload.remove(CONTENT_FIELD) {
                    Some(serde_json::Value::String(s)) => s,
                    _ => String::new(),
                };
                let metadata = payload
                    .iter()
                    .map(|(k, v)| (k.clone(), MetadataValue::from_json(v)))
                    .collect();
                ScoredChunk {
                    id: hit.id,
                    score: hit.score,
                    content,
                    metadata,
                }
            })
            .collect())
    }

    /// Number of stored chunks; zero if the collection does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached.
    pub async fn count(&self) -> Result<u64, DocumentError> {
        if !self.store.collection_exists(&self.collection).await? {
            return Ok(0);
        }
        Ok(self.store.count(&self.collection).await?)
    }

    /// End the index's lifetime. The underlying store stays usable by other holders.
    pub fn close(self) {
        tracing::debug!(collection = %self.collection, "document index closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory_store::InMemoryVectorStore;

    fn letter_embed() -> EmbedFn {
        Box::new(docent_llm::mock::letter_embed_fn())
    }

    fn failing_embed() -> EmbedFn {
        Box::new(|_text: &str| {
            Box::pin(async move { Err(docent_llm::LlmError::Other("embed down".into())) })
        })
    }

    fn chunk(content: &str, source: &str, page: i64) -> Chunk {
        Chunk {
            content: content.into(),
            metadata: Metadata::from([
                ("source".to_owned(), source.into()),
                ("page".to_owned(), page.into()),
            ]),
            chunk_index: 0,
        }
    }

    async fn open(store: Arc<InMemoryVectorStore>, embed: EmbedFn) -> DocumentIndex {
        DocumentIndex::open(store, embed, IndexConfig::default())
            .await
            .unwrap()
    }

    #[test]
    fn qualified_name_uses_database_prefix() {
        let config = IndexConfig::default();
        assert_eq!(config.qualified_name(), "default_research_papers");
        let bare = IndexConfig {
            database: String::new(),
            ..IndexConfig::default()
        };
        assert_eq!(bare.qualified_name(), "research_papers");
    }

    #[tokio::test]
    async fn drop_is_idempotent() {
        let index = open(Arc::new(InMemoryVectorStore::new()), letter_embed()).await;
        assert!(!index.drop_collection().await.unwrap());
        assert!(!index.drop_collection().await.unwrap());

        index.add_documents(&[chunk("abc", "a.pdf", 0)]).await.unwrap();
        assert!(index.drop_collection().await.unwrap());
        assert!(!index.drop_collection().await.unwrap());
        assert_eq!(index.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn search_without_collection_is_empty() {
        let index = open(Arc::new(InMemoryVectorStore::new()), letter_embed()).await;
        assert!(index.similarity_search("anything", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn k_larger_than_collection_returns_all_in_order() {
        let index = open(Arc::new(InMemoryVectorStore::new()), letter_embed()).await;
        index
            .add_documents(&[chunk("zzzz", "z.pdf", 0), chunk("aaab", "a.pdf", 1)])
            .await
            .unwrap();

        let hits = index.similarity_search("aaaa", 5).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].content, "aaab");
        assert_eq!(hits[0].source(), Some("a.pdf"));
        assert_eq!(hits[0].metadata["page"], MetadataValue::Integer(1));
        assert!(!hits[0].metadata.contains_key(CONTENT_FIELD));
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn k_zero_returns_nothing() {
        let index = open(Arc::new(InMemoryVectorStore::new()), letter_embed()).await;
        index.add_documents(&[chunk("abc", "a.pdf", 0)]).await.unwrap();
        assert!(index.similarity_search("abc", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn ids_are_generated_and_unique() {
        let index = open(Arc::new(InMemoryVectorStore::new()), letter_embed()).await;
        let ids = index
            .add_documents(&[chunk("abc", "a.pdf", 0), chunk("abc", "a.pdf", 0)])
            .await
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
        assert_eq!(index.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn empty_batch_creates_nothing() {
        let store = Arc::new(InMemoryVectorStore::new());
        let index = open(store.clone(), letter_embed()).await;
        assert!(index.add_documents(&[]).await.unwrap().is_empty());
        assert!(!store.collection_exists(index.collection_name()).await.unwrap());
    }

    #[tokio::test]
    async fn mixed_field_sets_in_one_batch_rejected() {
        let index = open(Arc::new(InMemoryVectorStore::new()), letter_embed()).await;
        let mut odd = chunk("b", "http://x", 0);
        odd.metadata.remove("page");
        let err = index
            .add_documents(&[chunk("a", "a.pdf", 0), odd])
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::SchemaMismatch { .. }));
        assert_eq!(index.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn later_batch_must_match_collection_schema() {
        let index = open(Arc::new(InMemoryVectorStore::new()), letter_embed()).await;
        index.add_documents(&[chunk("a", "a.pdf", 0)]).await.unwrap();

        let mut other = chunk("b", "b.pdf", 0);
        other.metadata.insert("title".into(), "T".into());
        let err = index.add_documents(&[other.clone()]).await.unwrap_err();
        assert!(matches!(err, DocumentError::SchemaMismatch { .. }));

        index.drop_collection().await.unwrap();
        index.add_documents(&[other]).await.unwrap();
    }

    #[tokio::test]
    async fn content_field_is_reserved() {
        let index = open(Arc::new(InMemoryVectorStore::new()), letter_embed()).await;
        let mut bad = chunk("a", "a.pdf", 0);
        bad.metadata.insert(CONTENT_FIELD.into(), "oops".into());
        let err = index.add_documents(&[bad]).await.unwrap_err();
        assert!(matches!(err, DocumentError::ReservedField(_)));
    }

    #[tokio::test]
    async fn embedding_failure_propagates() {
        let index = open(Arc::new(InMemoryVectorStore::new()), failing_embed()).await;
        let err = index
            .add_documents(&[chunk("a", "a.pdf", 0)])
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::Embedding(_)));
        assert_eq!(index.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn two_indexes_share_one_store() {
        let store = Arc::new(InMemoryVectorStore::new());
        let writer = open(store.clone(), letter_embed()).await;
        writer.add_documents(&[chunk("abc", "a.pdf", 0)]).await.unwrap();
        writer.close();

        let reader = open(store, letter_embed()).await;
        assert_eq!(reader.similarity_search("abc", 5).await.unwrap().len(), 1);
    }
}
