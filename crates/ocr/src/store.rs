use sha2::{Digest, Sha256};
use std::io;
use std::path::{Path, PathBuf};

/// SHA-256 of an in-memory upload.
pub fn sha256_bytes(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Lowercase hex encoding (64 chars for a SHA-256 digest).
pub fn to_hex(hash: &[u8; 32]) -> String {
    hash.iter().map(|b| format!("{b:02x}")).collect()
}

/// Content-addressed store for uploaded scans.
///
/// Layout: `<root>/<first 2 hex chars>/<full hex>.<ext>`. Storing the same
/// bytes twice lands on the same path.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, hash_hex: &str, ext: &str) -> PathBuf {
        let shard = hash_hex.get(..2).unwrap_or(hash_hex);
        self.root.join(shard).join(format!("{hash_hex}.{ext}"))
    }

    /// Write `data` under its digest; returns `(hash_hex, path)`.
    pub async fn put(&self, data: &[u8], ext: &str) -> io::Result<(String, PathBuf)> {
        let hash_hex = to_hex(&sha256_bytes(data));
        let dest = self.path_for(&hash_hex, &normalize_ext(ext));
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&dest, data).await?;
        Ok((hash_hex, dest))
    }
}

/// Lowercased extension limited to ASCII alphanumerics; `bin` when nothing is left.
pub fn normalize_ext(ext: &str) -> String {
    let clean: String = ext
        .trim_start_matches('.')
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase();
    if clean.is_empty() {
        "bin".to_string()
    } else {
        clean
    }
}
