use std::sync::Arc;

use anyhow::Context;
use menuscan_ocr::{build_backend, MenuPipeline, UploadStore};
use menuscan_server::{intake, router, telemetry, AppState, ServerConfig};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::load().context("Failed to load configuration")?;
    telemetry::init(&config.log)?;

    let backend = build_backend(
        config.ocr.engine,
        &config.ocr.language,
        config.ocr.tesseract_bin.clone(),
    )
    .context("Failed to set up OCR backend")?;
    tracing::info!(engine = %config.ocr.engine, language = %config.ocr.language, "OCR backend ready");

    let pipeline = Arc::new(
        MenuPipeline::new(backend, UploadStore::new(&config.upload_dir))
            .with_preprocess(config.ocr.preprocess),
    );

    // ── Intake folder ─────────────────────────────────────────────────────────
    let _watcher = match &config.intake_dir {
        Some(dir) => Some(
            intake::start(dir, pipeline.clone(), config.export_dir.clone(), config.export_format)
                .context("Failed to start intake folder watcher")?,
        ),
        None => None,
    };

    // ── HTTP ──────────────────────────────────────────────────────────────────
    let state = AppState { pipeline, export_format: config.export_format };
    let app = router(state, config.max_upload_bytes);

    let addr = config.socket_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Server running on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
