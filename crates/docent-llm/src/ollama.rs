//! Local Ollama backend for chat and embeddings.

use ollama_rs::Ollama;
use ollama_rs::generation::chat::ChatMessage;
use ollama_rs::generation::chat::request::ChatMessageRequest;
use ollama_rs::generation::embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest};
use reqwest::Url;

use crate::error::LlmError;
use crate::provider::{LlmProvider, Message, Role};

const PROVIDER: &str = "ollama";
const DEFAULT_PORT: u16 = 11434;

/// Chats with `model` and embeds with `embedding_model` on one Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Ollama,
    model: String,
    embedding_model: String,
}

impl OllamaProvider {
    /// # Errors
    ///
    /// Returns [`LlmError::Other`] when `base_url` is not an absolute URL.
    pub fn new(base_url: &str, model: String, embedding_model: String) -> Result<Self, LlmError> {
        let url = endpoint_url(base_url)?;
        Ok(Self {
            client: Ollama::from_url(url),
            model,
            embedding_model,
        })
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    /// List local models to confirm the server answers.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Other`] when the server cannot be reached.
    pub async fn health_check(&self) -> Result<(), LlmError> {
        let models = self
            .client
            .list_local_models()
            .await
            .map_err(|e| backend_error("server unreachable", &e))?;
        tracing::debug!(models = models.len(), "ollama server reachable");
        Ok(())
    }
}

fn backend_error(what: &str, err: &dyn std::fmt::Display) -> LlmError {
    LlmError::Other(format!("{PROVIDER} {what}: {err}"))
}

impl LlmProvider for OllamaProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        let history = messages.iter().map(to_chat_message).collect();
        let request = ChatMessageRequest::new(self.model.clone(), history);

        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| backend_error("chat failed", &e))?;
        Ok(response.message.content)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let request = GenerateEmbeddingsRequest::new(
            self.embedding_model.clone(),
            EmbeddingsInput::from(text),
        );

        let mut response = self
            .client
            .generate_embeddings(request)
            .await
            .map_err(|e| backend_error("embedding failed", &e))?;

        if response.embeddings.is_empty() {
            return Err(LlmError::EmptyResponse {
                provider: PROVIDER.into(),
            });
        }
        Ok(response.embeddings.swap_remove(0))
    }

    fn supports_embeddings(&self) -> bool {
        true
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        PROVIDER
    }
}

fn to_chat_message(msg: &Message) -> ChatMessage {
    let content = msg.content.clone();
    match msg.role {
        Role::System => ChatMessage::system(content),
        Role::User => ChatMessage::user(content),
        Role::Assistant => ChatMessage::assistant(content),
    }
}

/// Normalise `base_url` for `ollama-rs`, which appends `api/...` to it.
///
/// A plain `http` URL without a written port gets Ollama's 11434; anything
/// else keeps its own port and path prefix.
fn endpoint_url(base_url: &str) -> Result<Url, LlmError> {
    let raw = base_url.trim();
    let mut url = Url::parse(raw).map_err(|e| backend_error(&format!("bad url {raw:?}"), &e))?;
    if url.host_str().is_none() {
        return Err(LlmError::Other(format!("{PROVIDER} url {raw:?} has no host")));
    }
    if url.scheme() == "http" && url.port().is_none() && !has_explicit_port(raw) {
        url.set_port(Some(DEFAULT_PORT))
            .map_err(|()| LlmError::Other(format!("{PROVIDER} url {raw:?} cannot take a port")))?;
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// `Url` drops a port equal to the scheme default, so look at the input.
fn has_explicit_port(raw: &str) -> bool {
    let rest = raw.split_once("://").map_or(raw, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);
    host_port
        .rsplit_once(':')
        .is_some_and(|(_, port)| !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()))
}
