//! HTTP surface.
//!
//! | Route | Input | Output |
//! |---|---|---|
//! | `GET /health` | | `{"ok": true}` |
//! | `POST /merge` | `pdfs` files (two or more) | merged PDF |
//! | `POST /split` | one `pdf` file | streamed zip of single pages |
//! | `POST /compress` | one `pdf` file, optional `quality` | compressed PDF |
//!
//! Failures are returned as `{"error": "...", "code": "..."}`.

mod error;
mod handlers;
mod upload;

pub use handlers::{DOCUMENT_FIELD, MERGE_FIELD, QUALITY_FIELD};
pub use upload::UploadForm;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::compress::Compressor;
use crate::config::Config;
use crate::error::{PdfForgeError, Result};
use crate::storage::TempStore;

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Temporary artifact store.
    pub store: TempStore,
    /// Ghostscript runner.
    pub compressor: Compressor,
}

impl AppState {
    /// Open the temp store and build the compressor described by `config`.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let store = TempStore::new(&config.temp_dir).await?;
        let compressor = Compressor::new(
            &config.gs_path,
            config.compress_timeout,
            config.max_concurrent_jobs,
        );
        Ok(Self { store, compressor })
    }
}

/// Build the application router.
///
/// # Errors
///
/// Returns [`PdfForgeError::InvalidConfig`] if an allowed origin is not a
/// valid header value.
pub fn router(state: AppState, config: &Config) -> Result<Router> {
    let origins = config
        .allowed_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).map_err(|_| {
                PdfForgeError::invalid_config(format!("Invalid allowed origin: '{origin}'"))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .expose_headers([header::CONTENT_DISPOSITION]);

    Ok(Router::new()
        .route("/health", get(handlers::health))
        .route("/merge", post(handlers::merge))
        .route("/split", post(handlers::split))
        .route("/compress", post(handlers::compress))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// Run the server until Ctrl-C.
pub async fn serve(config: Config) -> Result<()> {
    let state = AppState::from_config(&config).await?;
    state.store.sweep().await?;

    let app = router(state.clone(), &config)?;
    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .map_err(|e| {
            PdfForgeError::invalid_config(format!("cannot bind {}: {e}", config.bind_addr()))
        })?;

    info!("Listening on http://{}", listener.local_addr()?);
    info!("Temp directory: {}", state.store.root().display());
    info!(
        "Compression: '{}', {}s deadline, {} concurrent job(s)",
        config.gs_path.display(),
        config.compress_timeout.as_secs(),
        config.max_concurrent_jobs
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested, finishing in-flight requests");
}
