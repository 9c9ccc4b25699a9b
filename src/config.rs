//! User settings for thumbnail generation, read from
//! `~/.photo-manager/settings.toml`.
//!
//! The scanned folder is not a setting: the gallery always shows the
//! platform pictures directory (see [`gallery_dir`]).

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

const SETTINGS_FILE: &str = "settings.toml";

pub const DEFAULT_THUMBNAIL_WIDTH: u32 = 200;
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

const MIN_THUMBNAIL_WIDTH: u32 = 16;
const MAX_THUMBNAIL_WIDTH: u32 = 1024;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Width in pixels of every generated thumbnail.
    pub thumbnail_width: u32,
    pub jpeg_quality: u8,
    /// Where thumbnails are written. `None` means the OS temp directory.
    pub thumbnail_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            thumbnail_width: DEFAULT_THUMBNAIL_WIDTH,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            thumbnail_dir: None,
        }
    }
}

impl Settings {
    /// Clamp values into the ranges the encoder accepts.
    pub fn normalized(mut self) -> Self {
        self.thumbnail_width = self
            .thumbnail_width
            .clamp(MIN_THUMBNAIL_WIDTH, MAX_THUMBNAIL_WIDTH);
        self.jpeg_quality = self.jpeg_quality.clamp(1, 100);
        self
    }

    pub fn output_dir(&self) -> PathBuf {
        self.thumbnail_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

pub fn config_dir() -> Option<PathBuf> {
    dirs_next::home_dir().map(|d| d.join(".photo-manager"))
}

/// The folder the gallery scans. Fixed per machine, never configurable.
pub fn gallery_dir() -> PathBuf {
    dirs_next::picture_dir()
        .or_else(|| dirs_next::home_dir().map(|d| d.join("Pictures")))
        .unwrap_or_else(|| PathBuf::from("Pictures"))
}

/// Load settings from the default location. A missing or broken file
/// yields the defaults.
pub fn load() -> Settings {
    let Some(path) = config_dir().map(|d| d.join(SETTINGS_FILE)) else {
        return Settings::default();
    };
    if !path.exists() {
        return Settings::default();
    }
    match load_from_path(&path) {
        Ok(settings) => settings,
        Err(e) => {
            log::warn!("Using default settings: {}", e);
            Settings::default()
        }
    }
}

pub fn load_from_path(path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let settings: Settings = toml::from_str(&content)?;
    Ok(settings.normalized())
}
