pub mod error;
pub mod loader;
pub mod normalize;
pub mod pipeline;
pub mod splitter;
pub mod types;

pub use error::{DocumentError, NormalizeError};
pub use loader::{
    LoadReport, PdfLoader, SourceKind, SourceLoader, SourceOutcome, WebLoader, WebLoaderConfig,
    parse_manifest, read_manifest,
};
pub use normalize::{normalize, pad_fields, rename_fields, sanitize_field_name};
pub use pipeline::{IngestReport, IngestionPipeline};
pub use splitter::{SplitterConfig, TextSplitter};
pub use types::{Chunk, Document, Metadata, MetadataKind, MetadataValue};

/// Default maximum file size: 50 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

pub trait DocumentLoader: Send + Sync {
    fn load(
        &self,
        path: &std::path::Path,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Vec<Document>, DocumentError>> + Send + '_>,
    >;
}
