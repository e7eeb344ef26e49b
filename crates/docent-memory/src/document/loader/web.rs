use std::path::Path;
use std::time::Duration;

use futures::StreamExt;
use url::Url;

use super::super::{Document, DocumentError, Metadata};

const NO_DESCRIPTION: &str = "No description found.";
const NO_LANGUAGE: &str = "No language found.";

#[derive(Debug, Clone)]
pub struct WebLoaderConfig {
    /// Per-request timeout in seconds.
    pub timeout: u64,
    pub max_body_bytes: usize,
    /// Maximum in-flight fetches in [`WebLoader::load_urls`].
    pub concurrency: usize,
}

impl Default for WebLoaderConfig {
    fn default() -> Self {
        Self {
            timeout: 30,
            max_body_bytes: 10 * 1024 * 1024,
            concurrency: 4,
        }
    }
}

/// Fetches web pages and turns each into one [`Document`].
#[derive(Debug, Clone)]
pub struct WebLoader {
    client: reqwest::Client,
    max_body_bytes: usize,
    concurrency: usize,
}

impl Default for WebLoader {
    fn default() -> Self {
        Self::new(&WebLoaderConfig::default())
    }
}

impl WebLoader {
    #[must_use]
    pub fn new(config: &WebLoaderConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .redirect(reqwest::redirect::Policy::limited(3))
            .user_agent(concat!("docent/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            client,
            max_body_bytes: config.max_body_bytes,
            concurrency: config.concurrency.max(1),
        }
    }

    /// Fetch one page.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::InvalidUrl`] for unparsable or non-HTTP URLs and
    /// [`DocumentError::Fetch`] for transport errors, non-success statuses, and
    /// bodies above the size limit.
    pub async fn load_url(&self, raw: &str) -> Result<Document, DocumentError> {
        let url = validate_url(raw)?;
        let html = self.fetch_html(&url).await?;
        let source = raw.to_owned();
        tokio::task::spawn_blocking(move || parse_page(&source, &html))
            .await
            .map_err(|e| fetch_error(raw, format!("parse aborted: {e}")))
    }

    /// Fetch every URL with bounded concurrency. Results are in input order.
    pub async fn load_urls(
        &self,
        urls: &[String],
    ) -> Vec<(String, Result<Document, DocumentError>)> {
        futures::stream::iter(urls.iter().map(|url| async move {
            let result = self.load_url(url).await;
            (url.clone(), result)
        }))
        .buffered(self.concurrency)
        .collect()
        .await
    }

    async fn fetch_html(&self, url: &Url) -> Result<String, DocumentError> {
        let mut resp = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| fetch_error(url.as_str(), e.to_string()))?;

        if !resp.status().is_success() {
            return Err(fetch_error(url.as_str(), format!("HTTP {}", resp.status())));
        }

        if let Some(len) = resp.content_length()
            && usize::try_from(len).unwrap_or(usize::MAX) > self.max_body_bytes
        {
            return Err(self.too_large(url, len));
        }

        // Chunked responses carry no length; stop reading once over the cap.
        let mut body = Vec::new();
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| fetch_error(url.as_str(), e.to_string()))?
        {
            if body.len() + chunk.len() > self.max_body_bytes {
                return Err(self.too_large(url, (body.len() + chunk.len()) as u64));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    fn too_large(&self, url: &Url, len: u64) -> DocumentError {
        fetch_error(
            url.as_str(),
            format!(
                "response too large: {len} bytes (max: {})",
                self.max_body_bytes
            ),
        )
    }
}

fn fetch_error(url: &str, reason: String) -> DocumentError {
    DocumentError::Fetch {
        url: url.to_owned(),
        reason,
    }
}

fn validate_url(raw: &str) -> Result<Url, DocumentError> {
    let parsed = Url::parse(raw).map_err(|e| DocumentError::InvalidUrl(format!("{raw}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(DocumentError::InvalidUrl(format!(
            "{raw}: scheme not allowed: {other}"
        ))),
    }
}

fn first_text(soup: &scrape_core::Soup, selector: &str) -> Option<String> {
    soup.find_all(selector)
        .ok()?
        .into_iter()
        .next()
        .map(|tag| tag.text())
}

fn first_attr(
    soup: &scrape_core::Soup,
    selector: &str,
    attr: &str,
    default: &str,
) -> Option<String> {
    soup.find_all(selector)
        .ok()?
        .into_iter()
        .next()
        .map(|tag| tag.get(attr).map_or_else(|| default.to_owned(), ToOwned::to_owned))
}

/// Build a document from page HTML.
///
/// `title`, `description`, and `language` are only present when the page has
/// the corresponding element; a `<meta name="description">` without `content`
/// or an `<html>` without `lang` gets a placeholder value.
fn parse_page(source: &str, html: &str) -> Document {
    let soup = scrape_core::Soup::parse(html);

    let mut metadata = Metadata::from([("source".to_owned(), source.into())]);
    if let Some(title) = first_text(&soup, "title") {
        metadata.insert("title".to_owned(), title.trim().into());
    }
    if let Some(description) = first_attr(
        &soup,
        r#"meta[name="description"]"#,
        "content",
        NO_DESCRIPTION,
    ) {
        metadata.insert("description".to_owned(), description.into());
    }
    if let Some(language) = first_attr(&soup, "html", "lang", NO_LANGUAGE) {
        metadata.insert("language".to_owned(), language.into());
    }

    let content = first_text(&soup, "body")
        .or_else(|| first_text(&soup, "html"))
        .unwrap_or_else(|| html.to_owned());

    Document {
        content: content.trim().to_owned(),
        metadata,
    }
}

/// Parse manifest text: one URL per line, trimmed. Blank lines and lines
/// starting with `#` are skipped.
#[must_use]
pub fn parse_manifest(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(ToOwned::to_owned)
        .collect()
}

/// Read and parse a URL manifest file.
///
/// # Errors
///
/// Returns [`DocumentError::Io`] if the file cannot be read.
pub async fn read_manifest(path: &Path) -> Result<Vec<String>, DocumentError> {
    let text = tokio::fs::read_to_string(path).await?;
    Ok(parse_manifest(&text))
}
