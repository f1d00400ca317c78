//! # Medical Retrieval Server Main Driver
//!
//! ## Purpose
//! Main entry point for the retrieval engine server. Constructs all system
//! components once at startup and runs the web server for handling
//! ingestion and search requests.
//!
//! ## Input/Output Specification
//! - **Input**: Configuration file, command line arguments, environment
//! - **Output**: Running web server with retrieval API endpoints
//! - **Initialization**: Index bootstrap, component wiring, health checks
//!
//! ## Architecture Flow
//! 1. Parse command line arguments and load configuration
//! 2. Initialize logging and tracing
//! 3. Construct segmenter, clients, indexes and caches
//! 4. Bootstrap the vector index (idempotent create-if-absent)
//! 5. Start web API server
//! 6. Handle shutdown signals gracefully

use clap::{Arg, Command};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use hybrid_med_retrieval::{
    api::ApiServer,
    cache::ResultCache,
    config::Config,
    embedding::HttpEmbeddingClient,
    errors::{Result, RetrievalError},
    ingestion::IngestionPipeline,
    keyword::KeywordIndex,
    search::SearchEngine,
    segmenter::{analyzer_from_config, MedicalVocabulary, TextSegmenter},
    vector_index::RemoteVectorIndex,
    AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("med-retrieval-server")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Medical Retrieval Team")
        .about("Hybrid vector/keyword retrieval engine for medical reference documents")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("Server port")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("check-health")
                .long("check-health")
                .help("Validate configuration and collaborator reachability, then exit")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config").expect("has default");
    let mut config = Config::from_file(config_path)?;

    if let Some(port) = matches.get_one::<u16>("port") {
        config.server.port = *port;
    }

    let config = Arc::new(config);

    init_logging(&config)?;

    info!("Starting Medical Retrieval Server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from: {}", config_path);

    let app_state = initialize_components(config.clone()).await?;

    if matches.get_flag("check-health") {
        app_state.search_engine.index_statistics().await?;
        info!("All health checks passed");
        return Ok(());
    }

    let server = ApiServer::new(app_state.clone());
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            error!("Server error: {}", e);
        }
    });

    info!(
        "Medical Retrieval Server started on {}:{}",
        config.server.host, config.server.port
    );

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Received SIGINT, shutting down gracefully...");
        }
        _ = server_handle => {
            warn!("Server stopped unexpectedly");
        }
    }

    info!("Medical Retrieval Server shut down");
    Ok(())
}

/// Initialize logging and tracing
fn init_logging(config: &Config) -> Result<()> {
    let log_level: tracing::Level =
        config
            .logging
            .level
            .parse()
            .map_err(|_| RetrievalError::Config {
                message: format!("Invalid log level: {}", config.logging.level),
            })?;
    let filter = tracing_subscriber::filter::LevelFilter::from_level(log_level);

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_level(true);

    if config.logging.json_format {
        tracing_subscriber::registry()
            .with(fmt_layer.json().with_filter(filter))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt_layer.with_filter(filter))
            .init();
    }

    info!("Logging initialized with level: {}", config.logging.level);
    Ok(())
}

/// Construct all components at the composition root. Lifecycle is owned
/// here; nothing is created lazily on first use.
async fn initialize_components(config: Arc<Config>) -> Result<AppState> {
    info!("Initializing application components...");

    let vocabulary = Arc::new(MedicalVocabulary::new());
    let analyzer = analyzer_from_config(&config.chunking);
    let segmenter = Arc::new(TextSegmenter::new(
        config.chunking.clone(),
        vocabulary.clone(),
        analyzer,
    ));

    let embedder = Arc::new(HttpEmbeddingClient::new(&config.embedding)?);

    let vector_index = Arc::new(RemoteVectorIndex::new(&config.vector_index)?);
    info!("Bootstrapping vector index '{}'", config.vector_index.index_name);
    vector_index
        .ensure_index(config.embedding.dimension, &config.vector_index.metric)
        .await?;

    let keyword_index = Arc::new(KeywordIndex::new());
    let cache = Arc::new(ResultCache::new(
        config.search.query_cache_size,
        Duration::from_secs(config.search.cache_ttl_seconds),
    ));

    let search_engine = Arc::new(SearchEngine::new(
        config.search.clone(),
        embedder.clone(),
        vector_index.clone(),
        keyword_index.clone(),
        vocabulary,
        cache.clone(),
    ));

    let pipeline = Arc::new(IngestionPipeline::new(
        config.ingestion.clone(),
        config.embedding.max_concurrent_requests,
        segmenter,
        embedder,
        vector_index,
        keyword_index,
        cache,
    ));

    info!("All components initialized successfully");
    Ok(AppState {
        config,
        search_engine,
        pipeline,
    })
}
