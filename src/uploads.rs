//! Upload directory.
//!
//! Uploaded PDFs are kept under one directory keyed by their original file
//! name. Saving a name that already exists overwrites the previous file.

use std::path::{Path, PathBuf};

use crate::error::UploadError;
use crate::extract::{content_type_for_path, MIME_PDF};

#[derive(Debug, Clone)]
pub struct UploadDir {
    dir: PathBuf,
    max_bytes: usize,
}

impl UploadDir {
    pub fn new(dir: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Write `bytes` to `<dir>/<filename>` and return the saved path.
    pub async fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, UploadError> {
        let name = sanitize_filename(filename)?;
        if content_type_for_path(Path::new(&name)) != Some(MIME_PDF) {
            return Err(UploadError::UnsupportedType(name));
        }
        if bytes.len() > self.max_bytes {
            return Err(UploadError::TooLarge {
                size: bytes.len(),
                max: self.max_bytes,
            });
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(&name);
        tokio::fs::write(&path, bytes).await?;
        tracing::info!(path = %path.display(), bytes = bytes.len(), "saved upload");
        Ok(path)
    }
}

/// Keep only the final path component so an upload cannot escape the
/// upload directory.
fn sanitize_filename(filename: &str) -> Result<String, UploadError> {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() || name == "." || name == ".." || name.contains('\0') {
        return Err(UploadError::InvalidFilename(filename.to_string()));
    }
    Ok(name.to_string())
}
