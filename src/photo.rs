use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};

/// A photo found on disk, plus the thumbnail generated for it.
#[derive(Debug, Clone)]
pub struct Photo {
    pub path: PathBuf,
    pub file_name: String,
    pub created: Option<SystemTime>,
    pub thumbnail_path: Option<PathBuf>,
}

impl Photo {
    pub fn new(path: &Path) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let created = match std::fs::metadata(path) {
            // Not every filesystem records a birth time.
            Ok(meta) => meta.created().or_else(|_| meta.modified()).ok(),
            Err(e) => {
                log::warn!("Failed to read metadata for {}: {}", path.display(), e);
                None
            }
        };

        Photo {
            path: path.to_path_buf(),
            file_name,
            created,
            thumbnail_path: None,
        }
    }

    /// Creation date as `YYYY-MM-DD` (UTC), or an empty string if unknown.
    pub fn created_label(&self) -> String {
        self.created.map(format_date).unwrap_or_default()
    }
}

fn format_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).format("%Y-%m-%d").to_string()
}
