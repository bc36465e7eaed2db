//! Loader configuration.
//!
//! Stored as JSON in `<config dir>/avbridge/loader.json`. Every field is optional in the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::diagnostics::NativeLogLevel;
use crate::error::{AvError, Result};
use crate::version::{Library, LibraryVersion, VersionCatalog};

/// Four explicit library files, loaded as given instead of searching directories.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LibraryFiles {
    pub avformat: Option<PathBuf>,
    pub avcodec: Option<PathBuf>,
    pub avutil: Option<PathBuf>,
    pub swresample: Option<PathBuf>,
}

impl LibraryFiles {
    pub fn get(&self, library: Library) -> Option<&Path> {
        match library {
            Library::AvFormat => self.avformat.as_deref(),
            Library::AvCodec => self.avcodec.as_deref(),
            Library::AvUtil => self.avutil.as_deref(),
            Library::SwResample => self.swresample.as_deref(),
        }
    }

    /// Explicit files are only used when all four are given.
    pub fn is_complete(&self) -> bool {
        Library::LOAD_ORDER.iter().all(|lib| self.get(*lib).is_some())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Directory tried before every other search location.
    pub search_path: Option<PathBuf>,
    pub library_files: Option<LibraryFiles>,
    /// Subdirectory of the working and application directories that may hold the libraries.
    pub subdirectory: String,
    pub native_log_level: NativeLogLevel,
    /// Passed to the codec open call as its options dictionary.
    pub decoder_options: Vec<(String, String)>,
    /// Replaces the built-in version catalog.
    pub catalog: Option<Vec<LibraryVersion>>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            search_path: None,
            library_files: None,
            subdirectory: "ffmpeg".to_string(),
            native_log_level: NativeLogLevel::Warning,
            decoder_options: vec![("flags2".to_string(), "+export_mvs".to_string())],
            catalog: None,
        }
    }
}

impl LoaderConfig {
    pub fn with_search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_path = Some(path.into());
        self
    }

    pub fn with_library_files(mut self, files: LibraryFiles) -> Self {
        self.library_files = Some(files);
        self
    }

    pub fn catalog(&self) -> VersionCatalog {
        match &self.catalog {
            Some(entries) => VersionCatalog::new(entries.clone()),
            None => VersionCatalog::default(),
        }
    }

    /// Explicit files when all four are configured.
    pub fn explicit_files(&self) -> Option<&LibraryFiles> {
        self.library_files.as_ref().filter(|f| f.is_complete())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| AvError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        serde_json::from_str(&text)
            .map_err(|e| AvError::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AvError::Config(format!("Failed to create {}: {}", parent.display(), e)))?;
        }
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| AvError::Config(e.to_string()))?;
        std::fs::write(path, text)
            .map_err(|e| AvError::Config(format!("Failed to write {}: {}", path.display(), e)))
    }

    /// Reads the default config file if there is one, otherwise returns defaults.
    pub fn load_default() -> Result<Self> {
        match default_config_path() {
            Some(path) if path.exists() => {
                tracing::debug!("Reading loader config from {}", path.display());
                Self::from_file(&path)
            }
            _ => Ok(Self::default()),
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("avbridge").join("loader.json"))
}
