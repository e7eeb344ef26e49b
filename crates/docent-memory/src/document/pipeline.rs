use std::path::Path;

use super::loader::{LoadReport, SourceLoader};
use super::{DocumentError, TextSplitter, normalize};
use crate::index::DocumentIndex;

/// Counts from one ingestion run.
#[derive(Debug)]
pub struct IngestReport {
    pub load: LoadReport,
    pub chunks: usize,
    /// Whether a previous collection was dropped before rebuilding.
    pub replaced: bool,
}

impl IngestReport {
    #[must_use]
    pub fn documents(&self) -> usize {
        self.load.documents.len()
    }
}

/// Full rebuild of a collection from the configured sources:
/// load, normalize, split, drop, insert.
pub struct IngestionPipeline<'a> {
    loader: &'a SourceLoader,
    splitter: &'a TextSplitter,
    index: &'a DocumentIndex,
}

impl<'a> IngestionPipeline<'a> {
    #[must_use]
    pub fn new(
        loader: &'a SourceLoader,
        splitter: &'a TextSplitter,
        index: &'a DocumentIndex,
    ) -> Self {
        Self {
            loader,
            splitter,
            index,
        }
    }

    /// Rebuild the collection from PDFs matching `pdf_glob` and URLs listed in
    /// `manifest`. Source failures are recorded in the report, not returned.
    ///
    /// The collection is always dropped, even when no documents were loaded.
    ///
    /// # Errors
    ///
    /// Returns an error if metadata normalization, embedding, or the store fails.
    pub async fn run(
        &self,
        pdf_glob: &str,
        manifest: Option<&Path>,
    ) -> Result<IngestReport, DocumentError> {
        let mut load = self.loader.load_all(pdf_glob, manifest).await;

        let documents = normalize(&load.documents)?;
        let chunks = self.splitter.split_documents(&documents);
        tracing::info!(
            documents = documents.len(),
            chunks = chunks.len(),
            "documents split"
        );
        load.documents = documents;

        let replaced = self.index.drop_collection().await?;
        let ids = self.index.add_documents(&chunks).await?;
        tracing::info!(
            collection = %self.index.collection_name(),
            chunks = ids.len(),
            "collection rebuilt"
        );

        Ok(IngestReport {
            load,
            chunks: ids.len(),
            replaced,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::document::{PdfLoader, SplitterConfig, WebLoader};
    use crate::in_memory_store::InMemoryVectorStore;
    use crate::index::{EmbedFn, IndexConfig};

    fn noop_embed() -> EmbedFn {
        Box::new(|_text: &str| Box::pin(async move { Ok(vec![0.0f32; 4]) }))
    }

    fn error_embed() -> EmbedFn {
        Box::new(|_text: &str| {
            Box::pin(async move { Err(docent_llm::LlmError::Other("mock embed error".into())) })
        })
    }

    fn source_loader() -> SourceLoader {
        SourceLoader::new(PdfLoader::default(), WebLoader::default())
    }

    fn splitter() -> TextSplitter {
        TextSplitter::new(SplitterConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn no_sources_still_clears_previous_collection() {
        let store = Arc::new(InMemoryVectorStore::new());
        let index = DocumentIndex::open(store, noop_embed(), IndexConfig::default())
            .await
            .unwrap();
        let seed = crate::document::Chunk {
            content: "stale".into(),
            metadata: crate::document::Metadata::new(),
            chunk_index: 0,
        };
        index.add_documents(&[seed]).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/*.pdf", dir.path().display());
        let (loader, splitter) = (source_loader(), splitter());
        let report = IngestionPipeline::new(&loader, &splitter, &index)
            .run(&pattern, None)
            .await
            .unwrap();

        assert!(report.replaced);
        assert_eq!(report.documents(), 0);
        assert_eq!(report.chunks, 0);
        assert_eq!(index.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn embedding_error_propagates() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_string("<html><body>some page text</body></html>"),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("urls.txt");
        std::fs::write(&manifest, server.uri()).unwrap();
        let pattern = format!("{}/*.pdf", dir.path().display());

        let index = DocumentIndex::open(
            Arc::new(InMemoryVectorStore::new()),
            error_embed(),
            IndexConfig::default(),
        )
        .await
        .unwrap();
        let (loader, splitter) = (source_loader(), splitter());
        let result = IngestionPipeline::new(&loader, &splitter, &index)
            .run(&pattern, Some(&manifest))
            .await;
        assert!(matches!(result, Err(DocumentError::Embedding(_))));
    }
}
