pub mod pipeline;
pub mod preprocess;
pub mod recognizer;
pub mod store;

pub use pipeline::{spawn_intake_watcher, MenuPipeline, PipelineError, ScanResult};
pub use preprocess::{prepare_for_ocr_from_bytes, Preprocess, PreprocessError, DEFAULT_MAX_SIDE_PX};
pub use recognizer::{
    build_backend, MockRecognizer, OcrBackend, OcrEngine, OcrError, TesseractCli, DEFAULT_LANGUAGE,
};
pub use store::UploadStore;
