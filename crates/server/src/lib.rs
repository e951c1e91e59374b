//! HTTP surface around the menu scanner: upload a scan, get products back,
//! post corrected products, get a workbook back.

pub mod config;
pub mod error;
pub mod intake;
pub mod routes;
pub mod telemetry;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use menuscan_export::ExportFormat;
use menuscan_ocr::{MenuPipeline, OcrBackend};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

pub use config::ServerConfig;

pub type SharedPipeline = Arc<MenuPipeline<Box<dyn OcrBackend>>>;

/// Application state shared across routes.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: SharedPipeline,
    /// Used by `/api/export` when the request names no format.
    pub export_format: ExportFormat,
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/api/health", get(routes::health))
        .route("/api/upload", post(routes::upload))
        .route("/api/extract", post(routes::extract))
        .route("/api/export", post(routes::export))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
