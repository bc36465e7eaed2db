//! Library Loader
//!
//! Finds the FFmpeg shared libraries for one major version on disk and opens them. File names
//! follow each platform's convention; directories are searched in a fixed order, ending with the
//! OS default search path.

use std::env;
use std::path::{Path, PathBuf};

use crate::config::LoaderConfig;
use crate::diagnostics::DiagnosticLog;
use crate::error::LoadError;
use crate::symbols::{DynamicLibrary, SymbolSource};
use crate::version::Library;

// ============================================================================
// Platform Naming
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Linux,
    MacOs,
}

impl Platform {
    #[cfg(target_os = "windows")]
    pub fn current() -> Self {
        Platform::Windows
    }

    #[cfg(target_os = "macos")]
    pub fn current() -> Self {
        Platform::MacOs
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    pub fn current() -> Self {
        Platform::Linux
    }
}

/// Candidate file names for one library, in the order they are tried.
///
/// Debian-style packages ship `libavcodec-ffmpeg.so.N`, so Linux tries that before the plain name.
pub fn library_file_names(platform: Platform, library: Library, major: u32) -> Vec<String> {
    let name = library.name();
    match platform {
        Platform::Windows => vec![format!("{}-{}.dll", name, major)],
        Platform::Linux => vec![
            format!("lib{}-ffmpeg.so.{}", name, major),
            format!("lib{}.so.{}", name, major),
        ],
        Platform::MacOs => vec![format!("lib{}.{}.dylib", name, major)],
    }
}

// ============================================================================
// Search Locations
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SearchLocation {
    Directory(PathBuf),
    /// Bare file names handed to the OS loader.
    System,
}

impl SearchLocation {
    pub fn describe(&self) -> String {
        match self {
            SearchLocation::Directory(dir) => format!("the path {}", dir.display()),
            SearchLocation::System => "the system path".to_string(),
        }
    }
}

/// Working directory and executable directory used to build the search list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchEnvironment {
    pub current_dir: Option<PathBuf>,
    pub app_dir: Option<PathBuf>,
}

impl SearchEnvironment {
    pub fn detect() -> Self {
        Self {
            current_dir: env::current_dir().ok(),
            app_dir: env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(Path::to_path_buf)),
        }
    }
}

/// Configured path, working directory, its subdirectory, application directory, its
/// subdirectory, then the system path. Duplicates keep their first position.
pub fn search_locations(config: &LoaderConfig, env: &SearchEnvironment) -> Vec<SearchLocation> {
    let mut dirs: Vec<PathBuf> = Vec::new();
    if let Some(path) = &config.search_path {
        dirs.push(path.clone());
    }
    for base in [&env.current_dir, &env.app_dir].into_iter().flatten() {
        dirs.push(base.clone());
        if !config.subdirectory.is_empty() {
            dirs.push(base.join(&config.subdirectory));
        }
    }

    let mut locations: Vec<SearchLocation> = Vec::with_capacity(dirs.len() + 1);
    for dir in dirs {
        let location = SearchLocation::Directory(dir);
        if !locations.contains(&location) {
            locations.push(location);
        }
    }
    locations.push(SearchLocation::System);
    locations
}

// ============================================================================
// Opening
// ============================================================================

/// Opens one shared library file. Implemented over `libloading` for real use.
pub trait LibraryOpener: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn SymbolSource>, String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemOpener;

impl LibraryOpener for SystemOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn SymbolSource>, String> {
        DynamicLibrary::open(path).map(|lib| Box::new(lib) as Box<dyn SymbolSource>)
    }
}

/// One opened library. Dropping it unloads the library.
pub struct LoadedLibrary {
    pub library: Library,
    pub path: PathBuf,
    pub source: Box<dyn SymbolSource>,
}

impl std::fmt::Debug for LoadedLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedLibrary")
            .field("library", &self.library)
            .field("path", &self.path)
            .finish()
    }
}

pub struct LibraryLoader<'a> {
    opener: &'a dyn LibraryOpener,
    platform: Platform,
    log: &'a DiagnosticLog,
}

impl<'a> LibraryLoader<'a> {
    pub fn new(opener: &'a dyn LibraryOpener, platform: Platform, log: &'a DiagnosticLog) -> Self {
        Self {
            opener,
            platform,
            log,
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Rejects directory locations that do not exist.
    pub fn check_location(&self, location: &SearchLocation) -> Result<(), LoadError> {
        match location {
            SearchLocation::Directory(dir) if !dir.is_dir() => {
                self.log
                    .push(format!("Search path {} does not exist. Skipping it.", dir.display()));
                Err(LoadError::PathInvalid { path: dir.clone() })
            }
            _ => Ok(()),
        }
    }

    /// Loads `library` with the given major from one location, trying every platform name.
    pub fn load(
        &self,
        location: &SearchLocation,
        library: Library,
        major: u32,
    ) -> Result<LoadedLibrary, LoadError> {
        let mut last_error: Option<LoadError> = None;

        for file_name in library_file_names(self.platform, library, major) {
            let path = match location {
                SearchLocation::Directory(dir) => {
                    let path = dir.join(&file_name);
                    if !path.exists() {
                        self.log.push(format!("Can not find file {}", path.display()));
                        last_error = Some(LoadError::LibraryLoadFailed {
                            library,
                            path,
                            reason: "file not found".to_string(),
                        });
                        continue;
                    }
                    path
                }
                SearchLocation::System => PathBuf::from(&file_name),
            };

            match self.open(library, &path) {
                Ok(loaded) => return Ok(loaded),
                Err(e) => last_error = Some(e),
            }
        }

        Err(last_error.unwrap_or_else(|| LoadError::LibraryLoadFailed {
            library,
            path: PathBuf::new(),
            reason: "no candidate file names".to_string(),
        }))
    }

    /// Loads one explicitly named file.
    pub fn load_file(&self, library: Library, path: &Path) -> Result<LoadedLibrary, LoadError> {
        if !path.exists() {
            self.log.push(format!("Can not find file {}", path.display()));
            return Err(LoadError::LibraryLoadFailed {
                library,
                path: path.to_path_buf(),
                reason: "file not found".to_string(),
            });
        }
        self.open(library, path)
    }

    fn open(&self, library: Library, path: &Path) -> Result<LoadedLibrary, LoadError> {
        match self.opener.open(path) {
            Ok(source) => {
                let resolved = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
                self.log
                    .push(format!("Loaded library {} from {}", library, resolved.display()));
                Ok(LoadedLibrary {
                    library,
                    path: resolved,
                    source,
                })
            }
            Err(reason) => {
                self.log.push(format!(
                    "Loading library {} failed: {}",
                    path.display(),
                    reason
                ));
                Err(LoadError::LibraryLoadFailed {
                    library,
                    path: path.to_path_buf(),
                    reason,
                })
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
