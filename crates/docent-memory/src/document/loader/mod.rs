mod pdf;
mod web;

use std::fmt;
use std::path::Path;

pub use pdf::PdfLoader;
pub use web::{WebLoader, WebLoaderConfig, parse_manifest, read_manifest};

use super::{Document, DocumentLoader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Pdf,
    Web,
    /// The URL manifest itself, when it cannot be read.
    Manifest,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pdf => "pdf",
            Self::Web => "web",
            Self::Manifest => "manifest",
        })
    }
}

/// Result of loading one source: number of documents produced, or the error text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOutcome {
    pub kind: SourceKind,
    pub location: String,
    pub result: Result<usize, String>,
}

impl SourceOutcome {
    fn loaded(kind: SourceKind, location: impl Into<String>, documents: usize) -> Self {
        Self {
            kind,
            location: location.into(),
            result: Ok(documents),
        }
    }

    fn failed(kind: SourceKind, location: impl Into<String>, error: impl fmt::Display) -> Self {
        let outcome = Self {
            kind,
            location: location.into(),
            result: Err(error.to_string()),
        };
        tracing::warn!(
            kind = %outcome.kind,
            location = %outcome.location,
            error = %error,
            "source skipped"
        );
        outcome
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Everything a load run produced: PDF documents first, then web documents,
/// plus one outcome per attempted source.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub documents: Vec<Document>,
    pub outcomes: Vec<SourceOutcome>,
}

impl LoadReport {
    fn count_of(&self, kind: SourceKind) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.kind == kind)
            .filter_map(|o| o.result.as_ref().ok())
            .sum()
    }

    #[must_use]
    pub fn pdf_documents(&self) -> usize {
        self.count_of(SourceKind::Pdf)
    }

    #[must_use]
    pub fn web_documents(&self) -> usize {
        self.count_of(SourceKind::Web)
    }

    pub fn failures(&self) -> impl Iterator<Item = &SourceOutcome> {
        self.outcomes.iter().filter(|o| !o.is_ok())
    }
}

/// Loads every configured source, isolating failures per file and per URL.
pub struct SourceLoader {
    pdf: PdfLoader,
    web: WebLoader,
}

impl SourceLoader {
    #[must_use]
    pub fn new(pdf: PdfLoader, web: WebLoader) -> Self {
        Self { pdf, web }
    }

    /// Load PDFs matching `pdf_glob`, then the URLs listed in `manifest`.
    ///
    /// Never fails: unreadable files, bad URLs, and a missing manifest are
    /// recorded as failed outcomes and loading continues.
    pub async fn load_all(&self, pdf_glob: &str, manifest: Option<&Path>) -> LoadReport {
        let mut report = LoadReport::default();
        self.load_pdfs(pdf_glob, &mut report).await;
        if let Some(manifest) = manifest {
            self.load_manifest(manifest, &mut report).await;
        }

        tracing::info!(
            pdf = report.pdf_documents(),
            web = report.web_documents(),
            total = report.documents.len(),
            failed = report.failures().count(),
            "documents loaded"
        );
        report
    }

    async fn load_pdfs(&self, pattern: &str, report: &mut LoadReport) {
        let paths = match glob::glob(pattern) {
            Ok(paths) => paths,
            Err(e) => {
                report
                    .outcomes
                    .push(SourceOutcome::failed(SourceKind::Pdf, pattern, e));
                return;
            }
        };

        for entry in paths {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    let location = e.path().display().to_string();
                    report
                        .outcomes
                        .push(SourceOutcome::failed(SourceKind::Pdf, location, e));
                    continue;
                }
            };
            if !path.is_file() {
                continue;
            }
            let location = path.display().to_string();
            match self.pdf.load(&path).await {
                Ok(docs) => {
                    report.outcomes.push(SourceOutcome::loaded(
                        SourceKind::Pdf,
                        location,
                        docs.len(),
                    ));
                    report.documents.extend(docs);
                }
                Err(e) => report
                    .outcomes
                    .push(SourceOutcome::failed(SourceKind::Pdf, location, e)),
            }
        }
    }

    async fn load_manifest(&self, manifest: &Path, report: &mut LoadReport) {
        let urls = match read_manifest(manifest).await {
            Ok(urls) => urls,
            Err(e) => {
                report.outcomes.push(SourceOutcome::failed(
                    SourceKind::Manifest,
                    manifest.display().to_string(),
                    e,
                ));
                return;
            }
        };

        for (url, result) in self.web.load_urls(&urls).await {
            match result {
                Ok(doc) => {
                    report
                        .outcomes
                        .push(SourceOutcome::loaded(SourceKind::Web, url, 1));
                    report.documents.push(doc);
                }
                Err(e) => report
                    .outcomes
                    .push(SourceOutcome::failed(SourceKind::Web, url, e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn loader() -> SourceLoader {
        SourceLoader::new(PdfLoader::default(), WebLoader::default())
    }

    #[tokio::test]
    async fn no_sources_yields_empty_report() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/*.pdf", dir.path().display());
        let report = loader().load_all(&pattern, None).await;
        assert!(report.documents.is_empty());
        assert!(report.outcomes.is_empty());
    }

    #[tokio::test]
    async fn broken_pdf_is_recorded_and_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.pdf"), b"garbage").unwrap();
        let pattern = format!("{}/*.pdf", dir.path().display());

        let report = loader().load_all(&pattern, None).await;
        assert!(report.documents.is_empty());
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].kind, SourceKind::Pdf);
        assert!(report.outcomes[0].location.ends_with("broken.pdf"));
        assert!(!report.outcomes[0].is_ok());
    }

    #[tokio::test]
    async fn invalid_glob_is_a_failed_outcome() {
        let report = loader().load_all("data/[*.pdf", None).await;
        assert_eq!(report.failures().count(), 1);
    }

    #[tokio::test]
    async fn missing_manifest_yields_zero_web_documents() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/*.pdf", dir.path().display());
        let manifest = dir.path().join("missing.txt");

        let report = loader().load_all(&pattern, Some(&manifest)).await;
        assert!(report.documents.is_empty());
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].kind, SourceKind::Manifest);
    }

    #[tokio::test]
    async fn web_failures_do_not_drop_other_urls() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("<html><body>ok</body></html>"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("web_urls.txt");
        std::fs::write(
            &manifest,
            format!("mailto:someone@example.com\n{}/page\n", server.uri()),
        )
        .unwrap();
        let pattern = format!("{}/*.pdf", dir.path().display());

        let report = loader().load_all(&pattern, Some(&manifest)).await;
        assert_eq!(report.documents.len(), 1);
        assert_eq!(report.web_documents(), 1);
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.outcomes[1].result, Ok(1));
    }

    #[test]
    fn source_kind_display() {
        assert_eq!(SourceKind::Pdf.to_string(), "pdf");
        assert_eq!(SourceKind::Manifest.to_string(), "manifest");
    }
}
