//! Thumbnail persistence.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

/// Directory holding thumbnails received with notifications.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Write `data` under a fresh unique name and return its path.
    pub async fn save(&self, content_type: Option<&str>, data: &[u8]) -> io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self
            .dir
            .join(format!("{}.{}", Uuid::new_v4(), extension_for(content_type)));
        tokio::fs::write(&path, data).await?;

        debug!(path = %path.display(), bytes = data.len(), "Saved thumbnail");
        Ok(path)
    }

    /// Delete a stored thumbnail. Missing files are ignored.
    pub async fn remove(&self, path: &Path) {
        remove_image(path).await;
    }
}

/// Delete an image file, logging anything other than "not found".
pub async fn remove_image(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed thumbnail"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove thumbnail"),
    }
}

fn extension_for(content_type: Option<&str>) -> &'static str {
    let essence = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase());

    match essence.as_deref() {
        None | Some("image/jpeg") | Some("image/jpg") | Some("image/pjpeg") => "jpg",
        Some("image/png") => "png",
        Some("image/gif") => "gif",
        Some("image/webp") => "webp",
        Some(other) => mime_guess::get_mime_extensions_str(other)
            .and_then(|exts| exts.first().copied())
            .unwrap_or("bin"),
    }
}
