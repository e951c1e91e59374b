use menuscan_export::ExportFormat;
use menuscan_ocr::{OcrEngine, Preprocess, DEFAULT_LANGUAGE};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file read when `MENUSCAN_CONFIG` is not set.
pub const DEFAULT_CONFIG_FILE: &str = "menuscan.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid value for {var}: {message}")]
    InvalidEnv { var: &'static str, message: String },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Bunyan,
}

impl std::str::FromStr for LogFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "bunyan" | "json" => Ok(LogFormat::Bunyan),
            other => Err(format!("Unknown log format: '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Filter used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { format: LogFormat::Pretty, level: "info".to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub engine: OcrEngine,
    /// Tesseract language code shared by every engine.
    pub language: String,
    pub tesseract_bin: Option<PathBuf>,
    pub preprocess: Preprocess,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            engine: OcrEngine::default(),
            language: DEFAULT_LANGUAGE.to_string(),
            tesseract_bin: None,
            preprocess: Preprocess::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: IpAddr,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    /// Folder watched for dropped scans; disabled when unset.
    pub intake_dir: Option<PathBuf>,
    /// Where intake workbooks are written.
    pub export_dir: PathBuf,
    pub export_format: ExportFormat,
    pub ocr: OcrConfig,
    pub log: LogConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3001,
            upload_dir: PathBuf::from("uploads"),
            max_upload_bytes: 20 * 1024 * 1024,
            intake_dir: None,
            export_dir: PathBuf::from("exports"),
            export_format: ExportFormat::Xlsx,
            ocr: OcrConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl ServerConfig {
    /// File (if any) plus process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let (path, required) = match std::env::var("MENUSCAN_CONFIG") {
            Ok(p) => (PathBuf::from(p), true),
            Err(_) => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        let mut config = if path.exists() || required {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Override fields from environment variables resolved through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("PORT") {
            self.port = v
                .trim()
                .parse()
                .map_err(|e| ConfigError::InvalidEnv { var: "PORT", message: format!("{e}") })?;
        }
        if let Some(v) = lookup("MENUSCAN_BIND") {
            self.bind = v.trim().parse().map_err(|e| ConfigError::InvalidEnv {
                var: "MENUSCAN_BIND",
                message: format!("{e}"),
            })?;
        }
        if let Some(v) = lookup("MENUSCAN_OCR_LANG") {
            self.ocr.language = v;
        }
        if let Some(v) = lookup("MENUSCAN_OCR_ENGINE") {
            self.ocr.engine = v
                .parse()
                .map_err(|message| ConfigError::InvalidEnv { var: "MENUSCAN_OCR_ENGINE", message })?;
        }
        if let Some(v) = lookup("MENUSCAN_OCR_MAX_SIDE") {
            self.ocr.preprocess.max_side_px = v.trim().parse().map_err(|e| {
                ConfigError::InvalidEnv { var: "MENUSCAN_OCR_MAX_SIDE", message: format!("{e}") }
            })?;
        }
        if let Some(v) = lookup("MENUSCAN_OCR_BINARIZE") {
            self.ocr.preprocess.binarize = v.trim().parse().map_err(|e| {
                ConfigError::InvalidEnv { var: "MENUSCAN_OCR_BINARIZE", message: format!("{e}") }
            })?;
        }
        if let Some(v) = lookup("MENUSCAN_UPLOAD_DIR") {
            self.upload_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("MENUSCAN_INTAKE_DIR") {
            self.intake_dir = Some(PathBuf::from(v)).filter(|p| !p.as_os_str().is_empty());
        }
        if let Some(v) = lookup("MENUSCAN_EXPORT_DIR") {
            self.export_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("MENUSCAN_EXPORT_FORMAT") {
            self.export_format = v
                .parse()
                .map_err(|message| ConfigError::InvalidEnv { var: "MENUSCAN_EXPORT_FORMAT", message })?;
        }
        if let Some(v) = lookup("MENUSCAN_LOG_FORMAT") {
            self.log.format = v
                .parse()
                .map_err(|message| ConfigError::InvalidEnv { var: "MENUSCAN_LOG_FORMAT", message })?;
        }
        if let Some(v) = lookup("MENUSCAN_LOG_LEVEL") {
            self.log.level = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ocr.language.trim().is_empty() {
            return Err(ConfigError::Invalid("ocr.language must not be empty".into()));
        }
        if self.ocr.preprocess.max_side_px == 0 {
            return Err(ConfigError::Invalid("ocr.preprocess.max_side_px must be positive".into()));
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid("max_upload_bytes must be positive".into()));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn defaults() {
        let c = ServerConfig::default();
        assert_eq!(c.port, 3001);
        assert_eq!(c.upload_dir, PathBuf::from("uploads"));
        assert_eq!(c.ocr.language, "fra");
        assert_eq!(c.export_format, ExportFormat::Xlsx);
        assert!(c.intake_dir.is_none());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = ServerConfig::from_toml(
            r#"
            port = 8080
            intake_dir = "/var/menus/in"

            [ocr]
            language = "eng"
            engine = "mock"
            "#,
        )
        .unwrap();
        assert_eq!(c.port, 8080);
        assert_eq!(c.intake_dir, Some(PathBuf::from("/var/menus/in")));
        assert_eq!(c.ocr.language, "eng");
        assert_eq!(c.ocr.engine, OcrEngine::Mock);
        assert_eq!(c.max_upload_bytes, 20 * 1024 * 1024);
        assert_eq!(c.log, LogConfig::default());
    }

    #[test]
    fn preprocess_table_and_env() {
        let mut c = ServerConfig::from_toml(
            r#"
            [ocr.preprocess]
            binarize = true
            "#,
        )
        .unwrap();
        assert!(c.ocr.preprocess.binarize);
        assert_eq!(c.ocr.preprocess.max_side_px, menuscan_ocr::DEFAULT_MAX_SIDE_PX);

        c.apply_env(env(&[("MENUSCAN_OCR_MAX_SIDE", "1600"), ("MENUSCAN_OCR_BINARIZE", "false")]))
            .unwrap();
        assert_eq!(c.ocr.preprocess, Preprocess { max_side_px: 1600, binarize: false });

        c.ocr.preprocess.max_side_px = 0;
        assert!(matches!(c.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn bad_toml_is_parse_error() {
        assert!(matches!(
            ServerConfig::from_toml("port = \"not a number\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn env_overrides_file() {
        let mut c = ServerConfig::default();
        c.apply_env(env(&[
            ("PORT", "4000"),
            ("MENUSCAN_OCR_LANG", "eng"),
            ("MENUSCAN_EXPORT_FORMAT", "CSV"),
            ("MENUSCAN_LOG_FORMAT", "bunyan"),
        ]))
        .unwrap();
        assert_eq!(c.port, 4000);
        assert_eq!(c.ocr.language, "eng");
        assert_eq!(c.export_format, ExportFormat::Csv);
        assert_eq!(c.log.format, LogFormat::Bunyan);
    }

    #[test]
    fn invalid_port_rejected() {
        let mut c = ServerConfig::default();
        let err = c.apply_env(env(&[("PORT", "http")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var: "PORT", .. }));
    }

    #[test]
    fn empty_intake_dir_disables_watcher() {
        let mut c = ServerConfig { intake_dir: Some(PathBuf::from("in")), ..Default::default() };
        c.apply_env(env(&[("MENUSCAN_INTAKE_DIR", "")])).unwrap();
        assert!(c.intake_dir.is_none());
    }

    #[test]
    fn empty_language_fails_validation() {
        let mut c = ServerConfig::default();
        c.ocr.language = "  ".into();
        assert!(matches!(c.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ServerConfig::from_file(Path::new("/nonexistent/menuscan.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn socket_addr_combines_bind_and_port() {
        let c = ServerConfig { port: 9000, ..Default::default() };
        assert_eq!(c.socket_addr().to_string(), "0.0.0.0:9000");
    }
}
