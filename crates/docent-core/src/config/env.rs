use std::str::FromStr;

use super::Config;

/// Parse a numeric/bool override, keeping the current value when it does not parse.
fn parsed<T: FromStr>(key: &str, current: &mut T) {
    if let Ok(v) = std::env::var(key) {
        match v.trim().parse::<T>() {
            Ok(parsed) => *current = parsed,
            Err(_) => tracing::warn!("ignoring invalid {key} value: {v}"),
        }
    }
}

fn text(key: &str, current: &mut String) {
    if let Ok(v) = std::env::var(key) {
        *current = v;
    }
}

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_llm();
        self.apply_env_overrides_store();
        self.apply_env_overrides_pipeline();
    }

    fn apply_env_overrides_llm(&mut self) {
        if let Ok(v) = std::env::var("DOCENT_LLM_PROVIDER") {
            if let Ok(kind) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.llm.provider = kind;
            } else {
                tracing::warn!("ignoring invalid DOCENT_LLM_PROVIDER value: {v}");
            }
        }
        text("DOCENT_LLM_BASE_URL", &mut self.llm.base_url);
        text("DOCENT_LLM_MODEL", &mut self.llm.model);
        text("DOCENT_LLM_EMBEDDING_MODEL", &mut self.llm.embedding_model);
        if let Ok(v) = std::env::var("DOCENT_LLM_API_KEY")
            && !v.is_empty()
        {
            self.llm.api_key = Some(v);
        }
    }

    fn apply_env_overrides_store(&mut self) {
        text("DOCENT_STORE_URL", &mut self.store.url);
        text("DOCENT_STORE_DATABASE", &mut self.store.database);
        text("DOCENT_STORE_COLLECTION", &mut self.store.collection);
        parsed("DOCENT_STORE_IN_MEMORY", &mut self.store.in_memory);
    }

    fn apply_env_overrides_pipeline(&mut self) {
        text("DOCENT_PDF_GLOB", &mut self.sources.pdf_glob);
        text("DOCENT_URL_MANIFEST", &mut self.sources.url_manifest);
        parsed("DOCENT_CHUNK_SIZE", &mut self.splitter.chunk_size);
        parsed("DOCENT_CHUNK_OVERLAP", &mut self.splitter.chunk_overlap);
        parsed("DOCENT_RETRIEVAL_TOP_K", &mut self.retrieval.top_k);
    }
}
