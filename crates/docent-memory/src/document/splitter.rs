use std::collections::VecDeque;

use super::error::DocumentError;
use super::types::{Chunk, Document};

/// Paragraph, line, word, character.
pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

#[derive(Debug, Clone)]
pub struct SplitterConfig {
    /// Maximum chunk length in chars.
    pub chunk_size: usize,
    /// Upper bound on the chars shared by consecutive chunks.
    pub chunk_overlap: usize,
    /// Boundaries tried in order, coarsest first. The empty separator
    /// (split into chars) is always tried last.
    pub separators: Vec<String>,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            separators: DEFAULT_SEPARATORS.iter().map(|s| (*s).to_owned()).collect(),
        }
    }
}

/// Recursive boundary-aware splitter.
///
/// Text is cut at the coarsest separator it contains. Pieces shorter than
/// `chunk_size` are greedily merged into windows with up to `chunk_overlap`
/// chars carried over from the previous window; longer pieces are cut again
/// with the next separator. Each separator stays attached to the start of the
/// piece that follows it, and every emitted chunk is whitespace-trimmed.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    config: SplitterConfig,
}

impl TextSplitter {
    /// # Errors
    ///
    /// Returns [`DocumentError::InvalidSplitter`] if `chunk_size` is zero or
    /// `chunk_overlap` exceeds `chunk_size`.
    pub fn new(mut config: SplitterConfig) -> Result<Self, DocumentError> {
        if config.chunk_size == 0 {
            return Err(DocumentError::InvalidSplitter(
                "chunk_size must be greater than zero".into(),
            ));
        }
        if config.chunk_overlap > config.chunk_size {
            return Err(DocumentError::InvalidSplitter(format!(
                "chunk_overlap ({}) is larger than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        if config.separators.last().is_none_or(|s| !s.is_empty()) {
            config.separators.push(String::new());
        }
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    /// Split one document; every chunk inherits the document's metadata.
    #[must_use]
    pub fn split(&self, document: &Document) -> Vec<Chunk> {
        self.split_text(&document.content)
            .into_iter()
            .enumerate()
            .map(|(i, content)| Chunk {
                content,
                metadata: document.metadata.clone(),
                chunk_index: i,
            })
            .collect()
    }

    /// Split every document, preserving document order.
    #[must_use]
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        documents.iter().flat_map(|d| self.split(d)).collect()
    }

    #[must_use]
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let mut out = Vec::new();
        if !text.trim().is_empty() {
            self.split_recursive(text, &self.config.separators, &mut out);
        }
        out
    }

    fn split_recursive(&self, text: &str, separators: &[String], out: &mut Vec<String>) {
        let (separator, finer) = select_separator(text, separators);

        let mut short: Vec<&str> = Vec::new();
        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.config.chunk_size {
                short.push(piece);
                continue;
            }
            if !short.is_empty() {
                self.merge(&short, out);
                short.clear();
            }
            if finer.is_empty() {
                push_trimmed(piece, out);
            } else {
                self.split_recursive(piece, finer, out);
            }
        }
        if !short.is_empty() {
            self.merge(&short, out);
        }
    }

    /// Greedy window merge of pieces that each fit in a chunk.
    fn merge(&self, pieces: &[&str], out: &mut Vec<String>) {
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;

        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            if total + len > size && !window.is_empty() {
                emit(&window, out);
                while total > overlap || (total + len > size && total > 0) {
                    let Some((_, dropped)) = window.pop_front() else {
                        break;
                    };
                    total -= dropped;
                }
            }
            window.push_back((piece, len));
            total += len;
        }
        emit(&window, out);
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn push_trimmed(text: &str, out: &mut Vec<String>) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_owned());
    }
}

fn emit(window: &VecDeque<(&str, usize)>, out: &mut Vec<String>) {
    let joined: String = window.iter().map(|(p, _)| *p).collect();
    push_trimmed(&joined, out);
}

/// First separator present in `text`, plus the finer separators after it.
fn select_separator<'a>(text: &str, separators: &'a [String]) -> (&'a str, &'a [String]) {
    for (i, sep) in separators.iter().enumerate() {
        if sep.is_empty() {
            return ("", &[]);
        }
        if text.contains(sep.as_str()) {
            return (sep, &separators[i + 1..]);
        }
    }
    ("", &[])
}

/// Split at every occurrence of `separator`, which stays at the start of the
/// following piece. The empty separator splits into chars.
fn split_keeping_separator<'t>(text: &'t str, separator: &str) -> Vec<&'t str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }
    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(&text[start..idx]);
        }
        start = idx;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}
