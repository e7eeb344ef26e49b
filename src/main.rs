mod cli;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use docent_channels::CliChannel;
use docent_core::agent::Agent;
use docent_core::config::{Config, ProviderKind};
use docent_llm::any::AnyProvider;
use docent_llm::ollama::OllamaProvider;
use docent_llm::openai::OpenAiProvider;
use docent_llm::provider::LlmProvider;
use docent_memory::document::{
    IngestReport, IngestionPipeline, PdfLoader, SourceLoader, TextSplitter, WebLoader,
};
use docent_memory::{DocumentIndex, InMemoryVectorStore, QdrantOps, VectorStore};
use docent_tools::RetrievalExecutor;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_subscriber(cli.log_file.as_deref())?;

    let config_path = cli.config_path();
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    let index_first = cli.should_index(config.store.in_memory)?;

    let provider = create_provider(&config)?;
    if !provider.supports_embeddings() {
        tracing::warn!(provider = provider.name(), "provider reports no embedding support");
    }
    if let AnyProvider::Ollama(ollama) = &provider
        && let Err(e) = ollama.health_check().await
    {
        tracing::warn!("{e}");
    }
    let store = create_store(&config)?;
    let index = DocumentIndex::open(
        store,
        Box::new(provider.embed_fn()),
        config.store.index_config(),
    )
    .await
    .context("failed to open document index")?;
    let index = Arc::new(index);
    tracing::info!(collection = %index.collection_name(), "vector store ready");

    if index_first {
        let report = run_ingestion(&config, &index).await?;
        print_report(&report, index.collection_name());
    }

    match cli.subcommand() {
        Command::Index => {}
        Command::Ask { question } => {
            let agent = build_agent(&config, provider, CliChannel::stdio(), &index);
            println!("{}", agent.answer(&question).await);
        }
        Command::Chat => {
            let mut agent = build_agent(&config, provider, CliChannel::stdio(), &index);
            tokio::select! {
                result = agent.run() => result?,
                _ = tokio::signal::ctrl_c() => tracing::info!("interrupted"),
            }
        }
    }

    match Arc::try_unwrap(index) {
        Ok(index) => index.close(),
        Err(_) => tracing::debug!("document index still shared at shutdown"),
    }
    Ok(())
}

fn init_subscriber(log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if let Some(path) = log_file {
        let file = std::fs::File::create(path)
            .with_context(|| format!("failed to create log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(file)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

fn create_provider(config: &Config) -> anyhow::Result<AnyProvider> {
    let llm = &config.llm;
    match llm.provider {
        ProviderKind::Ollama => {
            let ollama = OllamaProvider::new(
                &llm.base_url,
                llm.model.clone(),
                llm.embedding_model.clone(),
            )
            .with_context(|| format!("invalid ollama base url {}", llm.base_url))?;
            Ok(AnyProvider::Ollama(ollama))
        }
        ProviderKind::OpenAi => {
            let api_key = llm
                .api_key
                .clone()
                .context("DOCENT_LLM_API_KEY must be set for the openai provider")?;
            Ok(AnyProvider::OpenAi(OpenAiProvider::new(
                api_key,
                llm.base_url.clone(),
                llm.model.clone(),
                llm.max_tokens,
                Some(llm.embedding_model.clone()),
            )))
        }
    }
}

fn create_store(config: &Config) -> anyhow::Result<Arc<dyn VectorStore>> {
    if config.store.in_memory {
        tracing::info!("using in-memory vector store");
        return Ok(Arc::new(InMemoryVectorStore::new()));
    }
    let qdrant = QdrantOps::new(&config.store.url)
        .with_context(|| format!("invalid vector store url {}", config.store.url))?;
    Ok(Arc::new(qdrant))
}

async fn run_ingestion(config: &Config, index: &DocumentIndex) -> anyhow::Result<IngestReport> {
    let loader = SourceLoader::new(
        PdfLoader::new(config.sources.max_file_size),
        WebLoader::new(&config.sources.web_loader_config()),
    );
    let splitter = TextSplitter::new(config.splitter.splitter_config())?;
    IngestionPipeline::new(&loader, &splitter, index)
        .run(&config.sources.pdf_glob, config.sources.manifest_path())
        .await
        .context("indexing failed")
}

fn print_report(report: &IngestReport, collection: &str) {
    println!("Loaded {} PDF documents", report.load.pdf_documents());
    println!("Loaded {} web documents", report.load.web_documents());
    println!("Total loaded: {} documents", report.documents());
    for failure in report.load.failures() {
        if let Err(reason) = &failure.result {
            println!("  skipped {} {}: {reason}", failure.kind, failure.location);
        }
    }
    println!("Indexed {} chunks into {collection}", report.chunks);
}

fn build_agent<C: docent_core::channel::Channel>(
    config: &Config,
    provider: AnyProvider,
    channel: C,
    index: &Arc<DocumentIndex>,
) -> Agent<AnyProvider, C, RetrievalExecutor> {
    let retrieval = RetrievalExecutor::new(Arc::clone(index)).with_top_k(config.retrieval.top_k);
    Agent::new(provider, channel, retrieval, &config.agent.system_prompt)
        .with_max_tool_iterations(config.agent.max_tool_iterations)
}
