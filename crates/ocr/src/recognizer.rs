use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use thiserror::Error;

/// Tesseract language used when nothing else is configured. Menus are French.
pub const DEFAULT_LANGUAGE: &str = "fra";

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Image decode error: {0}")]
    ImageDecode(String),
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error("OCR engine not available: {0}")]
    NotAvailable(String),
}

/// Abstraction over an OCR backend.
/// Implementations accept raw PNG/JPEG image bytes and return the recognized text.
pub trait OcrBackend: Send + Sync {
    fn recognize(&self, image_bytes: &[u8]) -> Result<String, OcrError>;
}

impl<T: OcrBackend + ?Sized> OcrBackend for Box<T> {
    fn recognize(&self, image_bytes: &[u8]) -> Result<String, OcrError> {
        (**self).recognize(image_bytes)
    }
}

/// Which backend to build from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OcrEngine {
    /// The `tesseract` executable found on `PATH` (or a configured binary).
    #[default]
    TesseractCli,
    /// libtesseract linked in-process; needs the `tesseract` feature.
    Tesseract,
    /// Returns empty text. Useful for exercising the HTTP surface without OCR.
    Mock,
}

impl std::fmt::Display for OcrEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OcrEngine::TesseractCli => write!(f, "tesseract-cli"),
            OcrEngine::Tesseract => write!(f, "tesseract"),
            OcrEngine::Mock => write!(f, "mock"),
        }
    }
}

impl std::str::FromStr for OcrEngine {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tesseract-cli" => Ok(OcrEngine::TesseractCli),
            "tesseract" => Ok(OcrEngine::Tesseract),
            "mock" => Ok(OcrEngine::Mock),
            other => Err(format!("Unknown OCR engine: '{other}'")),
        }
    }
}

/// Build the configured backend. All engines share the same `language`.
pub fn build_backend(
    engine: OcrEngine,
    language: &str,
    tesseract_bin: Option<PathBuf>,
) -> Result<Box<dyn OcrBackend>, OcrError> {
    match engine {
        OcrEngine::TesseractCli => {
            let mut cli = TesseractCli::new(language);
            if let Some(bin) = tesseract_bin {
                cli = cli.with_binary(bin);
            }
            Ok(Box::new(cli))
        }
        #[cfg(feature = "tesseract")]
        OcrEngine::Tesseract => Ok(Box::new(tesseract_backend::TesseractRecognizer::new(
            None, language,
        ))),
        #[cfg(not(feature = "tesseract"))]
        OcrEngine::Tesseract => Err(OcrError::NotAvailable(
            "build with the `tesseract` feature".into(),
        )),
        OcrEngine::Mock => Ok(Box::new(MockRecognizer::new(""))),
    }
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns a pre-set string — useful for unit testing the extraction pipeline
/// without requiring Tesseract to be installed.
pub struct MockRecognizer {
    pub text: String,
}

impl MockRecognizer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl OcrBackend for MockRecognizer {
    fn recognize(&self, _image_bytes: &[u8]) -> Result<String, OcrError> {
        Ok(self.text.clone())
    }
}

// ── Tesseract executable ──────────────────────────────────────────────────────

/// Runs `tesseract stdin stdout -l <lang>`, piping the image through stdin.
pub struct TesseractCli {
    binary: PathBuf,
    language: String,
}

impl TesseractCli {
    pub fn new(language: &str) -> Self {
        Self { binary: PathBuf::from("tesseract"), language: language.to_string() }
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn language(&self) -> &str {
        &self.language
    }
}

impl OcrBackend for TesseractCli {
    fn recognize(&self, image_bytes: &[u8]) -> Result<String, OcrError> {
        let mut child = Command::new(&self.binary)
            .args(["stdin", "stdout", "-l", &self.language])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| OcrError::NotAvailable(format!("{}: {e}", self.binary.display())))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(image_bytes)
                .map_err(|e| OcrError::Engine(format!("failed to feed image: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| OcrError::Engine(e.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Engine(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

// ── Tesseract backend (optional, gated behind `tesseract` feature) ─────────────

#[cfg(feature = "tesseract")]
pub mod tesseract_backend {
    use super::{OcrBackend, OcrError};
    use leptess::LepTess;

    pub struct TesseractRecognizer {
        data_path: Option<String>,
        lang: String,
    }

    impl TesseractRecognizer {
        pub fn new(data_path: Option<String>, lang: &str) -> Self {
            Self { data_path, lang: lang.to_string() }
        }
    }

    impl OcrBackend for TesseractRecognizer {
        fn recognize(&self, image_bytes: &[u8]) -> Result<String, OcrError> {
            let mut lt = LepTess::new(self.data_path.as_deref(), &self.lang)
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            lt.set_image_from_mem(image_bytes)
                .map_err(|e| OcrError::ImageDecode(e.to_string()))?;
            lt.get_utf8_text().map_err(|e| OcrError::Engine(e.to_string()))
        }
    }
}
