use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::provider::{LlmProvider, Message, Role};

const PROVIDER: &str = "openai";

/// Provider for OpenAI and any server speaking the same `/chat/completions`
/// and `/embeddings` protocol.
#[derive(Clone)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    embedding_model: Option<String>,
}

impl fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("embedding_model", &self.embedding_model)
            .finish()
    }
}

impl OpenAiProvider {
    #[must_use]
    pub fn new(
        api_key: String,
        mut base_url: String,
        model: String,
        max_tokens: u32,
        embedding_model: Option<String>,
    ) -> Self {
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: crate::http::default_client(),
            api_key,
            base_url,
            model,
            max_tokens,
            embedding_model,
        }
    }

    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// POST `body` to `{base_url}/{endpoint}` and decode the JSON reply.
    async fn post<B, R>(&self, endpoint: &str, body: &B) -> Result<R, LlmError>
    where
        B: Serialize + Sync,
        R: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .post(format!("{}/{endpoint}", self.base_url))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let raw = response.text().await?;
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited);
        }
        if !status.is_success() {
            tracing::error!(endpoint, %status, body = %raw, "openai request rejected");
            return Err(LlmError::Other(format!(
                "{PROVIDER} /{endpoint} failed (status {status})"
            )));
        }
        Ok(serde_json::from_str(&raw)?)
    }
}

fn empty_response() -> LlmError {
    LlmError::EmptyResponse {
        provider: PROVIDER.into(),
    }
}

impl LlmProvider for OpenAiProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        let messages: Vec<ApiMessage<'_>> = messages.iter().map(ApiMessage::from).collect();
        let request = ChatRequest {
            model: &self.model,
            messages: &messages,
            max_tokens: self.max_tokens,
        };
        let reply: ChatResponse = self.post("chat/completions", &request).await?;
        reply
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .ok_or_else(empty_response)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let Some(model) = self.embedding_model.as_deref() else {
            return Err(LlmError::EmbedUnsupported {
                provider: PROVIDER.into(),
            });
        };
        let request = EmbeddingRequest { input: text, model };
        let reply: EmbeddingResponse = self.post("embeddings", &request).await?;
        reply
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(empty_response)
    }

    fn supports_embeddings(&self) -> bool {
        self.embedding_model.is_some()
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        PROVIDER
    }
}

impl<'a> From<&'a Message> for ApiMessage<'a> {
    fn from(msg: &'a Message) -> Self {
        let role = match msg.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        Self {
            role,
            content: &msg.content,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ApiMessage<'a>],
    max_tokens: u32,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}
