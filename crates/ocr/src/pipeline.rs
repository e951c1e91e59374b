use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

use menuscan_core::{Extractor, Product};

use crate::preprocess::{Preprocess, PreprocessError};
use crate::recognizer::{OcrBackend, OcrError};
use crate::store::UploadStore;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image preprocessing failed: {0}")]
    Preprocess(#[from] PreprocessError),
    #[error("OCR recognition failed: {0}")]
    Ocr(#[from] OcrError),
    #[error("OCR task aborted: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// The result of scanning one menu image.
#[derive(Debug)]
pub struct ScanResult {
    /// SHA-256 hex digest of the uploaded file.
    pub hash_hex: String,
    /// Where the upload was stored.
    pub upload_path: PathBuf,
    /// Raw OCR text output.
    pub ocr_text: String,
    pub products: Vec<Product>,
}

/// Orchestrates: store → preprocess → OCR → extract.
///
/// Preprocessing and recognition run on the blocking thread pool.
pub struct MenuPipeline<R: OcrBackend> {
    recognizer: Arc<R>,
    store: UploadStore,
    preprocess: Preprocess,
}

impl<R: OcrBackend + 'static> MenuPipeline<R> {
    pub fn new(recognizer: R, store: UploadStore) -> Self {
        Self { recognizer: Arc::new(recognizer), store, preprocess: Preprocess::default() }
    }

    pub fn with_preprocess(mut self, preprocess: Preprocess) -> Self {
        self.preprocess = preprocess;
        self
    }

    pub fn store(&self) -> &UploadStore {
        &self.store
    }

    /// Process a file on disk.
    pub async fn process_file(&self, path: &Path) -> Result<ScanResult, PipelineError> {
        let bytes = tokio::fs::read(path).await?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("bin");
        self.process_bytes(&bytes, ext).await
    }

    /// Process an upload held in memory.
    pub async fn process_bytes(&self, data: &[u8], ext: &str) -> Result<ScanResult, PipelineError> {
        let (hash_hex, upload_path) = self.store.put(data, ext).await?;
        tracing::debug!(hash = %hash_hex, bytes = data.len(), "stored upload");

        let recognizer = Arc::clone(&self.recognizer);
        let preprocess = self.preprocess;
        let data = data.to_vec();
        let ocr_text = tokio::task::spawn_blocking(move || -> Result<String, PipelineError> {
            let image_bytes = preprocess.run(&data)?;
            Ok(recognizer.recognize(&image_bytes)?)
        })
        .await??;
        let products = Extractor::extract(&ocr_text);

        tracing::info!(
            hash = %hash_hex,
            products = products.len(),
            "menu scanned"
        );

        Ok(ScanResult { hash_hex, upload_path, ocr_text, products })
    }
}

// ── Watch-folder integration ──────────────────────────────────────────────────

/// The path a watcher event hands over once the file is complete: the writer
/// closed it, or it was renamed into the folder. Creation alone does not
/// count, since the file may still be empty.
fn finished_file(event: notify::Event) -> Option<PathBuf> {
    use notify::event::{AccessKind, AccessMode, ModifyKind, RenameMode};
    use notify::EventKind;

    match event.kind {
        EventKind::Access(AccessKind::Close(AccessMode::Write))
        | EventKind::Modify(ModifyKind::Name(RenameMode::To | RenameMode::Both)) => {
            // `Both` carries `[from, to]`.
            event.paths.into_iter().last()
        }
        _ => None,
    }
}

/// Watch `watch_dir` and send every finished file to `tx`.
/// The returned watcher must be kept alive for watching to continue.
pub fn spawn_intake_watcher(
    watch_dir: &Path,
    tx: mpsc::Sender<PathBuf>,
) -> notify::Result<impl notify::Watcher> {
    use notify::{RecursiveMode, Watcher};

    let mut watcher = notify::recommended_watcher(move |event: notify::Result<notify::Event>| {
        let path = match event {
            Ok(ev) => finished_file(ev),
            Err(e) => {
                tracing::warn!(error = %e, "intake watcher error");
                None
            }
        };
        if let Some(path) = path {
            if let Err(e) = tx.try_send(path) {
                tracing::warn!(error = %e, "intake queue rejected file");
            }
        }
    })?;

    watcher.watch(watch_dir, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognizer::MockRecognizer;
    use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
    use notify::event::{AccessKind, AccessMode, CreateKind, ModifyKind, RenameMode};
    use notify::{Event, EventKind};
    use std::io::{Cursor, Write};
    use std::time::{Duration, Instant};

    fn tiny_png() -> Vec<u8> {
        let img: GrayImage = ImageBuffer::from_fn(4, 4, |_, _| Luma([200u8]));
        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    struct FailingRecognizer;

    impl OcrBackend for FailingRecognizer {
        fn recognize(&self, _image_bytes: &[u8]) -> Result<String, OcrError> {
            Err(OcrError::Engine("boom".into()))
        }
    }

    struct SlowRecognizer(Duration);

    impl OcrBackend for SlowRecognizer {
        fn recognize(&self, _image_bytes: &[u8]) -> Result<String, OcrError> {
            std::thread::sleep(self.0);
            Ok("Thé 3,00€".into())
        }
    }

    #[tokio::test]
    async fn slow_ocr_leaves_runtime_responsive() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = MenuPipeline::new(
            SlowRecognizer(Duration::from_millis(600)),
            UploadStore::new(dir.path()),
        );
        let png = tiny_png();
        let timer = async {
            let start = Instant::now();
            tokio::time::sleep(Duration::from_millis(20)).await;
            start.elapsed()
        };

        let (scan, waited) = tokio::join!(pipeline.process_bytes(&png, "png"), timer);

        assert_eq!(scan.unwrap().products, vec![Product::new("", "Thé", "3,00€")]);
        assert!(waited < Duration::from_millis(400), "timer fired after {waited:?}");
    }

    /// Reports the dimensions of the image it was handed.
    struct SizeRecognizer;

    impl OcrBackend for SizeRecognizer {
        fn recognize(&self, image_bytes: &[u8]) -> Result<String, OcrError> {
            let img = image::load_from_memory(image_bytes)
                .map_err(|e| OcrError::ImageDecode(e.to_string()))?;
            Ok(format!("{}x{}", img.width(), img.height()))
        }
    }

    #[tokio::test]
    async fn preprocess_settings_reach_the_recognizer() {
        let dir = tempfile::tempdir().unwrap();
        let mut png = Vec::new();
        DynamicImage::new_luma8(40, 10)
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        let pipeline = MenuPipeline::new(SizeRecognizer, UploadStore::new(dir.path()))
            .with_preprocess(Preprocess { max_side_px: 20, binarize: true });

        let result = pipeline.process_bytes(&png, "png").await.unwrap();
        assert_eq!(result.ocr_text, "20x5");
    }

    #[tokio::test]
    async fn process_bytes_extracts_products() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = MenuPipeline::new(
            MockRecognizer::new("Desserts\nTarte Tatin 6,50€\nCafé gourmand 8.00"),
            UploadStore::new(dir.path()),
        );

        let result = pipeline.process_bytes(&tiny_png(), "png").await.unwrap();

        assert_eq!(result.hash_hex.len(), 64);
        assert!(result.upload_path.exists());
        assert_eq!(result.products.len(), 2);
        assert_eq!(result.products[0], Product::new("Desserts", "Tarte Tatin", "6,50€"));
        assert_eq!(result.products[1].price, "8.00");
    }

    #[tokio::test]
    async fn process_file_uses_extension() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("carte.PNG");
        std::fs::write(&src, tiny_png()).unwrap();
        let pipeline = MenuPipeline::new(
            MockRecognizer::new("Thé 3,00€"),
            UploadStore::new(dir.path().join("uploads")),
        );

        let result = pipeline.process_file(&src).await.unwrap();

        assert_eq!(result.upload_path.extension().unwrap(), "png");
        assert_eq!(result.products, vec![Product::new("", "Thé", "3,00€")]);
    }

    #[tokio::test]
    async fn ocr_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = MenuPipeline::new(FailingRecognizer, UploadStore::new(dir.path()));
        let err = pipeline.process_bytes(&tiny_png(), "png").await.unwrap_err();
        assert!(matches!(err, PipelineError::Ocr(OcrError::Engine(_))));
    }

    #[tokio::test]
    async fn non_image_upload_fails_preprocessing() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = MenuPipeline::new(MockRecognizer::new("x 1,00"), UploadStore::new(dir.path()));
        let err = pipeline.process_bytes(b"%PDF-1.4", "pdf").await.unwrap_err();
        assert!(matches!(err, PipelineError::Preprocess(_)));
    }

    #[tokio::test]
    async fn same_upload_same_path() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = MenuPipeline::new(MockRecognizer::new(""), UploadStore::new(dir.path()));
        let data = tiny_png();

        let r1 = pipeline.process_bytes(&data, "png").await.unwrap();
        let r2 = pipeline.process_bytes(&data, "png").await.unwrap();

        assert_eq!(r1.hash_hex, r2.hash_hex);
        assert_eq!(r1.upload_path, r2.upload_path);
        assert!(r1.products.is_empty());
    }

    // ── Watcher ──

    #[test]
    fn creation_alone_is_not_finished() {
        let ev = Event::new(EventKind::Create(CreateKind::File)).add_path("/in/carte.png".into());
        assert_eq!(finished_file(ev), None);
    }

    #[test]
    fn close_after_write_is_finished() {
        let ev = Event::new(EventKind::Access(AccessKind::Close(AccessMode::Write)))
            .add_path("/in/carte.png".into());
        assert_eq!(finished_file(ev), Some(PathBuf::from("/in/carte.png")));
    }

    #[test]
    fn rename_into_folder_uses_target() {
        let ev = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path("/tmp/partial".into())
            .add_path("/in/carte.png".into());
        assert_eq!(finished_file(ev), Some(PathBuf::from("/in/carte.png")));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn watcher_waits_for_writer_to_close() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, mut rx) = mpsc::channel(8);
        let _watcher = spawn_intake_watcher(dir.path(), tx).unwrap();

        let path = dir.path().join("carte.png");
        let mut file = std::fs::File::create(&path).unwrap();
        // Empty file exists, nothing is handed over yet.
        assert!(tokio::time::timeout(Duration::from_millis(200), rx.recv()).await.is_err());

        file.write_all(&tiny_png()).unwrap();
        drop(file);
        let got = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got, path);
        assert_eq!(std::fs::read(&got).unwrap(), tiny_png());
    }
}
