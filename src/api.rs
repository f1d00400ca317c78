//! # API Server Module
//!
//! ## Purpose
//! REST API server exposing the retrieval engine contract: document
//! ingestion, search, source deletion, metadata patching and statistics.
//!
//! ## Input/Output Specification
//! - **Input**: HTTP requests with documents, search queries, patches
//! - **Output**: JSON responses with reports, results, system status
//! - **Endpoints**: Documents, search, stats, health
//!
//! ## Key Features
//! - Request validation mapped to structured error responses
//! - CORS support for web frontends
//! - Bounded error detail exposure (no internal chains to clients)

use crate::errors::RetrievalError;
use crate::ingestion::MetadataPatch;
use crate::search::SearchQuery;
use crate::Document;
use actix_cors::Cors;
use actix_web::{web, App, HttpResponse, HttpServer, Result as ActixResult};
use serde::{Deserialize, Serialize};

/// API server over the shared application state
pub struct ApiServer {
    app_state: crate::AppState,
}

/// Document ingestion request payload
#[derive(Debug, Deserialize)]
pub struct AddDocumentsRequest {
    pub documents: Vec<Document>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub components: HealthComponents,
}

/// Component health status
#[derive(Debug, Serialize)]
pub struct HealthComponents {
    pub search_engine: String,
    pub vector_index: String,
}

impl ApiServer {
    /// Create new API server
    pub fn new(app_state: crate::AppState) -> Self {
        Self { app_state }
    }

    /// Run the API server
    pub async fn run(self) -> crate::errors::Result<()> {
        let bind_addr = format!(
            "{}:{}",
            self.app_state.config.server.host, self.app_state.config.server.port
        );
        let enable_cors = self.app_state.config.server.enable_cors;
        let payload_limit =
            self.app_state.config.server.max_payload_size_mb as usize * 1024 * 1024;
        let app_state = self.app_state.clone();

        tracing::info!("Starting API server on {}", bind_addr);

        let server = HttpServer::new(move || {
            let cors = if enable_cors {
                Cors::permissive()
            } else {
                Cors::default()
            };
            App::new()
                .wrap(cors)
                .app_data(web::Data::new(app_state.clone()))
                .app_data(web::JsonConfig::default().limit(payload_limit))
                .route("/documents", web::post().to(add_documents_handler))
                .route("/documents/{source}", web::delete().to(delete_source_handler))
                .route(
                    "/documents/{source}/metadata",
                    web::patch().to(update_metadata_handler),
                )
                .route("/search", web::post().to(search_handler))
                .route("/stats", web::get().to(stats_handler))
                .route("/health", web::get().to(health_handler))
                .route("/", web::get().to(index_handler))
        })
        .bind(&bind_addr)
        .map_err(|e| RetrievalError::Internal {
            message: format!("Failed to bind server to {}: {}", bind_addr, e),
        })?
        .run();

        server.await.map_err(|e| RetrievalError::Internal {
            message: format!("Server error: {}", e),
        })?;

        Ok(())
    }
}

/// Map engine errors onto HTTP responses without leaking internal detail
fn error_response(error: &RetrievalError) -> HttpResponse {
    let body = serde_json::json!({
        "error": error.category(),
        "message": error.to_string(),
    });
    match error {
        RetrievalError::ValidationFailed { .. } | RetrievalError::InvalidApiRequest { .. } => {
            HttpResponse::BadRequest().json(body)
        }
        _ => HttpResponse::InternalServerError().json(body),
    }
}

/// Document ingestion endpoint handler
async fn add_documents_handler(
    app_state: web::Data<crate::AppState>,
    request: web::Json<AddDocumentsRequest>,
) -> ActixResult<HttpResponse> {
    let report = app_state
        .pipeline
        .add_documents(request.into_inner().documents)
        .await;
    Ok(HttpResponse::Ok().json(report))
}

/// Search endpoint handler
async fn search_handler(
    app_state: web::Data<crate::AppState>,
    request: web::Json<SearchQuery>,
) -> ActixResult<HttpResponse> {
    match app_state.search_engine.search(request.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(e) => {
            tracing::error!(category = e.category(), error = %e, "search failed");
            Ok(error_response(&e))
        }
    }
}

/// Delete-by-source endpoint handler
async fn delete_source_handler(
    app_state: web::Data<crate::AppState>,
    source: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let report = app_state.pipeline.delete_by_source(&source).await;
    Ok(HttpResponse::Ok().json(report))
}

/// Metadata patch endpoint handler
async fn update_metadata_handler(
    app_state: web::Data<crate::AppState>,
    source: web::Path<String>,
    patch: web::Json<MetadataPatch>,
) -> ActixResult<HttpResponse> {
    let report = app_state
        .pipeline
        .update_metadata(&source, patch.into_inner())
        .await;
    Ok(HttpResponse::Ok().json(report))
}

/// Statistics endpoint handler
async fn stats_handler(app_state: web::Data<crate::AppState>) -> ActixResult<HttpResponse> {
    match app_state.search_engine.get_stats().await {
        Ok(stats) => Ok(HttpResponse::Ok().json(stats)),
        Err(e) => {
            tracing::error!(error = %e, "stats collection failed");
            Ok(error_response(&e))
        }
    }
}

/// Health check endpoint handler
async fn health_handler(app_state: web::Data<crate::AppState>) -> ActixResult<HttpResponse> {
    let index_status = match app_state.search_engine.index_statistics().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let response = HealthResponse {
        status: index_status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        components: HealthComponents {
            search_engine: "healthy".to_string(),
            vector_index: index_status.to_string(),
        },
    };

    Ok(HttpResponse::Ok().json(response))
}

/// Index page handler
async fn index_handler() -> ActixResult<HttpResponse> {
    let html = r#"
    <!DOCTYPE html>
    <html>
    <head>
        <title>Medical Document Retrieval</title>
        <style>
            body { font-family: Arial, sans-serif; margin: 40px; }
            .header { color: #2c3e50; }
            .endpoint { margin: 20px 0; padding: 15px; background: #f8f9fa; border-radius: 5px; }
            .method { font-weight: bold; color: #27ae60; }
        </style>
    </head>
    <body>
        <h1 class="header">Medical Document Retrieval API</h1>
        <p>Hybrid vector and keyword retrieval over medical reference documents.</p>

        <h2>Available Endpoints</h2>

        <div class="endpoint">
            <span class="method">POST</span> /documents
            <p>Ingest a batch of documents for indexing.</p>
        </div>

        <div class="endpoint">
            <span class="method">POST</span> /search
            <p>Search indexed documents with vector, keyword, hybrid or semantic strategies.</p>
        </div>

        <div class="endpoint">
            <span class="method">DELETE</span> /documents/{source}
            <p>Remove all indexed chunks for a source.</p>
        </div>

        <div class="endpoint">
            <span class="method">PATCH</span> /documents/{source}/metadata
            <p>Update document metadata across all chunks of a source.</p>
        </div>

        <div class="endpoint">
            <span class="method">GET</span> /stats
            <p>Engine and index statistics.</p>
        </div>

        <div class="endpoint">
            <span class="method">GET</span> /health
            <p>Component health status.</p>
        </div>

        <h2>Example Search Request</h2>
        <pre>{
  "query": "diabetes symptoms",
  "search_type": "hybrid",
  "max_results": 5,
  "min_score": 0.5
}</pre>
    </body>
    </html>
    "#;

    Ok(HttpResponse::Ok().content_type("text/html").body(html))
}
