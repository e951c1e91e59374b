use std::path::{Path, PathBuf};
use std::sync::Arc;

use menuscan_export::{writer_for, ExportError, ExportFormat, SheetWriter, DEFAULT_FILE_STEM};
use menuscan_ocr::{spawn_intake_watcher, MenuPipeline, OcrBackend, PipelineError};
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Watcher error: {0}")]
    Watch(#[from] notify::Error),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Watch `intake_dir`; every scan dropped there is exported to `export_dir`.
///
/// The returned watcher must be kept alive for the folder to stay watched.
pub fn start<R>(
    intake_dir: &Path,
    pipeline: Arc<MenuPipeline<R>>,
    export_dir: PathBuf,
    format: ExportFormat,
) -> Result<impl notify::Watcher, IntakeError>
where
    R: OcrBackend + 'static,
{
    std::fs::create_dir_all(intake_dir)?;
    let writer = writer_for(format)?;

    let (tx, mut rx) = mpsc::channel::<PathBuf>(64);
    tokio::spawn(async move {
        while let Some(path) = rx.recv().await {
            tracing::info!("Processing menu scan: {}", path.display());
            match export_scan(&pipeline, &path, &export_dir, writer.as_ref()).await {
                Ok(out) => tracing::info!("Workbook written: {}", out.display()),
                Err(e) => tracing::warn!("Intake error for {}: {e}", path.display()),
            }
        }
    });

    let watcher = spawn_intake_watcher(intake_dir, tx)?;
    tracing::info!("Watching intake folder: {}", intake_dir.display());
    Ok(watcher)
}

/// Scan one file and write its sheet as `<export_dir>/<file stem>.<ext>`.
pub async fn export_scan<R: OcrBackend + 'static>(
    pipeline: &MenuPipeline<R>,
    path: &Path,
    export_dir: &Path,
    writer: &dyn SheetWriter,
) -> Result<PathBuf, IntakeError> {
    let scan = pipeline.process_file(path).await?;
    let bytes = writer.write(&scan.products)?;

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(DEFAULT_FILE_STEM);
    let out = export_dir.join(format!("{stem}.{}", writer.file_extension()));
    tokio::fs::create_dir_all(export_dir).await?;
    tokio::fs::write(&out, bytes).await?;
    Ok(out)
}
