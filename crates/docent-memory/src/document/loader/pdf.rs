use std::path::Path;
use std::pin::Pin;

use super::super::{DEFAULT_MAX_FILE_SIZE, Document, DocumentError, DocumentLoader, Metadata};

/// Loads a PDF as one [`Document`] per page.
///
/// Page metadata: `source` (the path as given), `page` (0-based),
/// `total_pages`, and `page_label` (1-based, as printed).
pub struct PdfLoader {
    pub max_file_size: u64,
}

impl Default for PdfLoader {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl PdfLoader {
    #[must_use]
    pub fn new(max_file_size: u64) -> Self {
        Self { max_file_size }
    }
}

fn page_documents(source: &str, pages: Vec<String>) -> Vec<Document> {
    let total = i64::try_from(pages.len()).unwrap_or(i64::MAX);
    pages
        .into_iter()
        .zip(0i64..)
        .map(|(content, page)| {
            let metadata = Metadata::from([
                ("source".to_owned(), source.into()),
                ("page".to_owned(), page.into()),
                ("total_pages".to_owned(), total.into()),
                ("page_label".to_owned(), (page + 1).to_string().into()),
            ]);
            Document { content, metadata }
        })
        .collect()
}

impl DocumentLoader for PdfLoader {
    fn load(
        &self,
        path: &Path,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Vec<Document>, DocumentError>> + Send + '_>>
    {
        let path = path.to_path_buf();
        let max_size = self.max_file_size;
        Box::pin(async move {
            let canonical = tokio::fs::canonicalize(&path).await?;

            let meta = tokio::fs::metadata(&canonical).await?;
            if meta.len() > max_size {
                return Err(DocumentError::FileTooLarge(meta.len()));
            }

            let bytes = tokio::fs::read(&canonical).await?;
            let pages = tokio::task::spawn_blocking(move || {
                pdf_extract::extract_text_from_mem_by_pages(&bytes)
                    .map_err(|e| DocumentError::Pdf(e.to_string()))
            })
            .await
            .map_err(|e| DocumentError::Pdf(format!("extraction aborted: {e}")))??;

            let source = path.display().to_string();
            tracing::debug!(source = %source, pages = pages.len(), "pdf extracted");
            Ok(page_documents(&source, pages))
        })
    }
}
