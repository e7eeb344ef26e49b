use std::sync::Arc;

#[cfg(feature = "mock")]
use crate::mock::MockProvider;
use crate::ollama::OllamaProvider;
use crate::openai::OpenAiProvider;
use crate::provider::{EmbedFuture, LlmProvider, Message};

/// Expands to a match that binds the wrapped provider of every variant.
macro_rules! each_backend {
    ($self:expr, $p:ident => $body:expr) => {
        match $self {
            AnyProvider::Ollama($p) => $body,
            AnyProvider::OpenAi($p) => $body,
            #[cfg(feature = "mock")]
            AnyProvider::Mock($p) => $body,
        }
    };
}

/// Backend chosen at startup from configuration.
#[derive(Debug, Clone)]
pub enum AnyProvider {
    Ollama(OllamaProvider),
    OpenAi(OpenAiProvider),
    #[cfg(feature = "mock")]
    Mock(MockProvider),
}

impl AnyProvider {
    /// Embedding closure sharing this provider, for stores that only know
    /// `Fn(&str) -> EmbedFuture`.
    pub fn embed_fn(&self) -> impl Fn(&str) -> EmbedFuture + Send + Sync + use<> {
        let shared = Arc::new(self.clone());
        move |text: &str| -> EmbedFuture {
            let provider = Arc::clone(&shared);
            let text = text.to_owned();
            Box::pin(async move { provider.embed(&text).await })
        }
    }
}

impl LlmProvider for AnyProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, crate::LlmError> {
        each_backend!(self, p => p.chat(messages).await)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, crate::LlmError> {
        each_backend!(self, p => p.embed(text).await)
    }

    fn supports_embeddings(&self) -> bool {
        each_backend!(self, p => p.supports_embeddings())
    }

    fn name(&self) -> &str {
        each_backend!(self, p => p.name())
    }
}
