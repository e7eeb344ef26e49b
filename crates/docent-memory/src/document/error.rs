use crate::vector_store::VectorStoreError;

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file too large: {0} bytes")]
    FileTooLarge(u64),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("invalid glob pattern: {0}")]
    Glob(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("invalid splitter config: {0}")]
    InvalidSplitter(String),

    #[error("metadata field `{0}` is reserved for chunk content")]
    ReservedField(String),

    #[error("chunk metadata fields {found:?} do not match collection schema {expected:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("normalization failed: {0}")]
    Normalize(#[from] NormalizeError),

    #[error("embedding failed: {0}")]
    Embedding(#[from] docent_llm::LlmError),

    #[error("storage error: {0}")]
    Storage(#[from] VectorStoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("metadata fields `{first}` and `{second}` both sanitize to `{sanitized}`")]
    FieldCollision {
        first: String,
        second: String,
        sanitized: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collision_display_names_both_fields() {
        let err = NormalizeError::FieldCollision {
            first: "a b".into(),
            second: "a-b".into(),
            sanitized: "a_b".into(),
        };
        assert_eq!(
            err.to_string(),
            "metadata fields `a b` and `a-b` both sanitize to `a_b`"
        );
    }

    #[test]
    fn fetch_display() {
        let err = DocumentError::Fetch {
            url: "https://x.test".into(),
            reason: "HTTP 404".into(),
        };
        assert_eq!(err.to_string(), "fetch failed for https://x.test: HTTP 404");
    }
}
