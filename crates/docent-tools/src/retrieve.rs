//! Retrieval tool: similarity search over the document index, formatted for the model.

use std::sync::Arc;

use docent_memory::{DocumentIndex, ScoredChunk};
use schemars::JsonSchema;
use serde::Deserialize;

use crate::executor::{ToolCall, ToolError, ToolExecutor, ToolOutput, deserialize_params};
use crate::registry::ToolDef;

/// Returned instead of an empty string when a search has no hits.
pub const NO_RESULTS_MESSAGE: &str = "No relevant documents found for your question.";

pub const DEFAULT_TOP_K: usize = 5;

const TOOL_ID: &str = "retrieve";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RetrieveParams {
    /// Natural-language search query
    pub query: String,
}

/// Searches the shared [`DocumentIndex`] for chunks relevant to a query.
///
/// Detects ` ```retrieve ` blocks in LLM responses whose body is the query text,
/// and also accepts structured calls with a `query` parameter.
#[derive(Debug, Clone)]
pub struct RetrievalExecutor {
    index: Arc<DocumentIndex>,
    top_k: usize,
}

impl RetrievalExecutor {
    #[must_use]
    pub fn new(index: Arc<DocumentIndex>) -> Self {
        Self {
            index,
            top_k: DEFAULT_TOP_K,
        }
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    #[must_use]
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Run a similarity search and render the hits nearest-first, each under a
    /// `## Source:` header. Zero hits yield [`NO_RESULTS_MESSAGE`].
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidParams`] for a blank query and
    /// [`ToolError::Retrieval`] if embedding or the store fails.
    pub async fn retrieve(&self, query: &str) -> Result<String, ToolError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ToolError::InvalidParams {
                message: "query must not be empty".into(),
            });
        }
        let hits = self.index.similarity_search(query, self.top_k).await?;
        tracing::debug!(query, hits = hits.len(), "retrieval");
        if hits.is_empty() {
            return Ok(NO_RESULTS_MESSAGE.to_owned());
        }
        Ok(format_hits(&hits))
    }
}

fn format_hits(hits: &[ScoredChunk]) -> String {
    hits.iter()
        .map(|hit| {
            let source = hit.source().unwrap_or("unknown");
            format!("## Source: {source}\n{}", hit.content)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

impl ToolExecutor for RetrievalExecutor {
    fn tool_definitions(&self) -> Vec<ToolDef> {
        vec![ToolDef {
            id: TOOL_ID,
            description: "Search the indexed research papers and web pages for passages \
                          relevant to a question",
            schema: schemars::schema_for!(RetrieveParams),
        }]
    }

    async fn execute(&self, response: &str) -> Result<Option<ToolOutput>, ToolError> {
        let blocks = crate::executor::extract_fenced_blocks(response, TOOL_ID);
        if blocks.is_empty() {
            return Ok(None);
        }

        let mut outputs = Vec::with_capacity(blocks.len());
        #[allow(clippy::cast_possible_truncation)]
        let blocks_executed = blocks.len() as u32;

        for block in &blocks {
            outputs.push(self.retrieve(block).await?);
        }

        Ok(Some(ToolOutput {
            tool_name: TOOL_ID.to_owned(),
            summary: outputs.join("\n\n"),
            blocks_executed,
        }))
    }

    async fn execute_tool_call(&self, call: &ToolCall) -> Result<Option<ToolOutput>, ToolError> {
        if call.tool_id != TOOL_ID {
            return Ok(None);
        }
        let params: RetrieveParams = deserialize_params(&call.params)?;
        let summary = self.retrieve(&params.query).await?;
        Ok(Some(ToolOutput {
            tool_name: TOOL_ID.to_owned(),
            summary,
            blocks_executed: 1,
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use docent_llm::mock::letter_embed_fn;
    use docent_memory::document::{Chunk, DocumentError, Metadata, MetadataValue};
    use docent_memory::{EmbedFn, InMemoryVectorStore, IndexConfig};

    use super::*;

    fn failing_embed() -> EmbedFn {
        Box::new(|_text: &str| {
            Box::pin(async move { Err(docent_llm::LlmError::Other("embed down".into())) })
        })
    }

    fn chunk(content: &str, source: Option<&str>) -> Chunk {
        let mut metadata = Metadata::new();
        metadata.insert(
            "source".into(),
            source.map_or(MetadataValue::Null, MetadataValue::from),
        );
        Chunk {
            content: content.into(),
            metadata,
            chunk_index: 0,
        }
    }

    async fn index_with(chunks: &[Chunk]) -> Arc<DocumentIndex> {
        let index = DocumentIndex::open(
            Arc::new(InMemoryVectorStore::new()),
            Box::new(letter_embed_fn()),
            IndexConfig::default(),
        )
        .await
        .unwrap();
        index.add_documents(chunks).await.unwrap();
        Arc::new(index)
    }

    #[tokio::test]
    async fn empty_index_returns_sentinel() {
        let exec = RetrievalExecutor::new(index_with(&[]).await);
        let out = exec.retrieve("what is attention").await.unwrap();
        assert_eq!(out, NO_RESULTS_MESSAGE);
        assert!(!out.is_empty());
    }

    #[tokio::test]
    async fn hits_are_prefixed_with_source_nearest_first() {
        let index = index_with(&[
            chunk("zzzz qqqq", Some("far.pdf")),
            chunk("attention heads", Some("near.pdf")),
        ])
        .await;
        let out = RetrievalExecutor::new(index)
            .retrieve("attention head")
            .await
            .unwrap();
        assert_eq!(
            out,
            "## Source: near.pdf\nattention heads\n\n## Source: far.pdf\nzzzz qqqq"
        );
    }

    #[tokio::test]
    async fn missing_source_renders_unknown() {
        let index = index_with(&[chunk("orphan text", None)]).await;
        let out = RetrievalExecutor::new(index)
            .retrieve("orphan")
            .await
            .unwrap();
        assert_eq!(out, "## Source: unknown\norphan text");
    }

    #[tokio::test]
    async fn top_k_limits_hits() {
        let chunks: Vec<Chunk> = (0..8)
            .map(|i| chunk(&format!("chunk number {i}"), Some("a.pdf")))
            .collect();
        let exec = RetrievalExecutor::new(index_with(&chunks).await);
        assert_eq!(exec.top_k(), DEFAULT_TOP_K);
        let out = exec.retrieve("chunk").await.unwrap();
        assert_eq!(out.matches("## Source:").count(), 5);

        let out = exec.with_top_k(2).retrieve("chunk").await.unwrap();
        assert_eq!(out.matches("## Source:").count(), 2);
    }

    #[tokio::test]
    async fn blank_query_is_invalid() {
        let exec = RetrievalExecutor::new(index_with(&[]).await);
        let err = exec.retrieve("   ").await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidParams { .. }));
    }

    #[tokio::test]
    async fn embedding_failure_propagates() {
        let index = DocumentIndex::open(
            Arc::new(InMemoryVectorStore::new()),
            failing_embed(),
            IndexConfig::default(),
        )
        .await
        .unwrap();
        let exec = RetrievalExecutor::new(Arc::new(index));
        let err = exec.retrieve("anything").await.unwrap_err();
        assert!(matches!(
            err,
            ToolError::Retrieval(DocumentError::Embedding(_))
        ));
    }

    #[tokio::test]
    async fn execute_runs_fenced_block() {
        let index = index_with(&[chunk("attention heads", Some("a.pdf"))]).await;
        let exec = RetrievalExecutor::new(index);
        let out = exec
            .execute("I will search.\n```retrieve\nattention\n```")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(out.tool_name, "retrieve");
        assert_eq!(out.blocks_executed, 1);
        assert!(out.summary.contains("## Source: a.pdf"));
    }

    #[tokio::test]
    async fn execute_without_block_returns_none() {
        let exec = RetrievalExecutor::new(index_with(&[]).await);
        assert!(exec.execute("plain answer").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn structured_call_with_query() {
        let index = index_with(&[chunk("attention heads", Some("a.pdf"))]).await;
        let exec = RetrievalExecutor::new(index);
        let mut params = HashMap::new();
        params.insert("query".to_owned(), serde_json::json!("attention"));
        let call = ToolCall {
            tool_id: "retrieve".into(),
            params,
        };
        let out = exec.execute_tool_call(&call).await.unwrap().unwrap();
        assert!(out.summary.starts_with("## Source: a.pdf"));

        let other = ToolCall {
            tool_id: "web_scrape".into(),
            params: HashMap::new(),
        };
        assert!(exec.execute_tool_call(&other).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn definition_matches_fence_tag() {
        let exec = RetrievalExecutor::new(index_with(&[]).await);
        let defs = exec.tool_definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].id, TOOL_ID);

        let prompt = crate::ToolRegistry::from_definitions(defs).format_for_prompt();
        assert!(prompt.contains("```retrieve block"));
        assert!(prompt.contains("```tool_call block"));
    }
}
