//! Session
//!
//! The loaded state of one set of FFmpeg libraries: open handles, the bound function table
//! and the frozen versions. A session is shared read-only (`Clone` is an `Arc` clone); the
//! libraries stay loaded until the last clone, including every facade and dispatcher made
//! from it, is dropped.
//!
//! Loading is process-wide through [`SessionRegistry`]: one load at a time, a repeated request
//! for the same paths returns the current session, a different request replaces it.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::ffi::{c_int, CStr, CString};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{LibraryFiles, LoaderConfig};
use crate::diagnostics::{self, DiagnosticLog};
use crate::error::{AvError, LoadError, Result};
use crate::ffi::AV_CODEC_ID_NONE;
use crate::functions::{FunctionTable, FunctionTableBuilder};
use crate::loader::{
    search_locations, LibraryLoader, LibraryOpener, LoadedLibrary, Platform, SearchEnvironment,
    SearchLocation, SystemOpener,
};
use crate::version::{Library, LibraryVersion, VersionCatalog};

/// avcodec_get_name's answer for ids it does not know.
const UNKNOWN_CODEC: &str = "unknown_codec";

// ============================================================================
// Load Request
// ============================================================================

/// Everything that decides which files a load may pick. Two loads with equal requests load
/// the same libraries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub explicit_files: Option<LibraryFiles>,
    pub locations: Vec<SearchLocation>,
    pub catalog: VersionCatalog,
}

impl LoadRequest {
    pub fn from_config(config: &LoaderConfig, env: &SearchEnvironment) -> Self {
        Self {
            explicit_files: config.explicit_files().cloned(),
            locations: search_locations(config, env),
            catalog: config.catalog(),
        }
    }
}

// ============================================================================
// Library Status
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryStatus {
    pub library: Library,
    pub path: Option<PathBuf>,
    pub version: String,
}

// ============================================================================
// Session
// ============================================================================

/// Loaded libraries in load order. Dropped newest first, since later libraries link against
/// earlier ones.
#[derive(Debug, Default)]
struct Bindings {
    libraries: Vec<LoadedLibrary>,
}

impl Bindings {
    fn path(&self, library: Library) -> Option<&PathBuf> {
        self.libraries
            .iter()
            .find(|l| l.library == library)
            .map(|l| &l.path)
    }
}

impl Drop for Bindings {
    fn drop(&mut self) {
        while let Some(library) = self.libraries.pop() {
            debug!("Unloading {} ({})", library.library, library.path.display());
            drop(library);
        }
    }
}

#[derive(Debug)]
struct SessionInner {
    request: LoadRequest,
    functions: FunctionTable,
    versions: LibraryVersion,
    log: DiagnosticLog,
    decoder_options: Vec<(String, String)>,
    // Last field: dropped after everything that may point into the libraries.
    bindings: Bindings,
}

#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Loads through the process-wide registry with the real system loader.
    pub fn load(config: &LoaderConfig) -> Result<Session> {
        SessionRegistry::global().load(
            config,
            &SystemOpener,
            Platform::current(),
            &SearchEnvironment::detect(),
        )
    }

    pub fn functions(&self) -> &FunctionTable {
        &self.inner.functions
    }

    /// Frozen versions, minor and micro as the libraries reported them.
    pub fn versions(&self) -> LibraryVersion {
        self.inner.versions
    }

    pub fn major(&self, library: Library) -> u32 {
        self.inner.versions.get(library).major
    }

    pub fn log(&self) -> &DiagnosticLog {
        &self.inner.log
    }

    pub fn request(&self) -> &LoadRequest {
        &self.inner.request
    }

    pub fn decoder_options(&self) -> &[(String, String)] {
        &self.inner.decoder_options
    }

    pub fn new_decode_api_available(&self) -> bool {
        self.inner.functions.new_decode_api_available()
    }

    /// True when both sessions share the same loaded state.
    pub fn same_as(&self, other: &Session) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn library_status(&self) -> Vec<LibraryStatus> {
        Library::LOAD_ORDER
            .iter()
            .map(|library| LibraryStatus {
                library: *library,
                path: self.inner.bindings.path(*library).cloned(),
                version: self.inner.versions.get(*library).to_string(),
            })
            .collect()
    }

    /// Human-readable summary, one line per library.
    pub fn library_report(&self) -> String {
        let mut report = String::new();
        for status in self.library_status() {
            match &status.path {
                Some(path) => report.push_str(&format!(
                    "[OK] {} {} ({})\n",
                    status.library,
                    status.version,
                    path.display()
                )),
                None => report.push_str(&format!("[MISSING] {}\n", status.library)),
            }
        }
        report.push_str(&format!(
            "Decode API: {}\n",
            self.inner.functions.avcodec.decode.name()
        ));
        report
    }

    /// Name the library gives a codec id.
    pub fn codec_name(&self, codec_id: c_int) -> String {
        let name = unsafe { (self.inner.functions.avcodec.avcodec_get_name)(codec_id) };
        if name.is_null() {
            return UNKNOWN_CODEC.to_string();
        }
        unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned()
    }

    /// Reverse of [`Session::codec_name`]: scans ids upward from 1 until the library stops
    /// knowing them.
    pub fn codec_id_by_name(&self, name: &str) -> c_int {
        let mut id: c_int = 1;
        loop {
            let candidate = self.codec_name(id);
            if candidate == name {
                return id;
            }
            if candidate == UNKNOWN_CODEC {
                return AV_CODEC_ID_NONE;
            }
            id += 1;
        }
    }

    pub(crate) fn c_string(value: &str) -> Result<CString> {
        CString::new(value)
            .map_err(|_| AvError::InvalidArgument(format!("interior NUL in {:?}", value)))
    }
}

// ============================================================================
// Registry
// ============================================================================

static GLOBAL_REGISTRY: Lazy<SessionRegistry> = Lazy::new(SessionRegistry::new);

/// Serialises loading and remembers the current session.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    current: Mutex<Option<Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global() -> &'static SessionRegistry {
        &GLOBAL_REGISTRY
    }

    pub fn current(&self) -> Option<Session> {
        self.current.lock().clone()
    }

    /// Returns the current session if it was loaded for the same request, otherwise unloads it
    /// and loads anew. The lock is held for the whole load.
    pub fn load(
        &self,
        config: &LoaderConfig,
        opener: &dyn LibraryOpener,
        platform: Platform,
        env: &SearchEnvironment,
    ) -> Result<Session> {
        let request = LoadRequest::from_config(config, env);
        let mut current = self.current.lock();

        if let Some(session) = current.as_ref() {
            if session.inner.request == request {
                debug!("Libraries already loaded for this request");
                return Ok(session.clone());
            }
        }
        if current.take().is_some() {
            debug!("Different library request; releasing the current session");
        }

        let session = load_session(request, config, opener, platform)?;
        *current = Some(session.clone());
        Ok(session)
    }

    /// Forgets the current session. The libraries unload once its last clone is gone.
    pub fn unload(&self) -> bool {
        self.current.lock().take().is_some()
    }
}

// ============================================================================
// Loading
// ============================================================================

struct Loaded {
    bindings: Bindings,
    functions: FunctionTable,
    versions: LibraryVersion,
}

fn load_session(
    request: LoadRequest,
    config: &LoaderConfig,
    opener: &dyn LibraryOpener,
    platform: Platform,
) -> Result<Session> {
    let log = DiagnosticLog::new();
    let loader = LibraryLoader::new(opener, platform, &log);

    let loaded = match load_libraries(&request, &loader, &log) {
        Some(loaded) => loaded,
        None => {
            warn!(
                "No compatible FFmpeg libraries found ({} candidates, {} locations)",
                request.catalog.len(),
                request.locations.len()
            );
            return Err(LoadError::NoCompatibleLibrary { log: log.lines() }.into());
        }
    };

    let Loaded {
        bindings,
        functions,
        versions,
    } = loaded;

    if let Some(register_all) = functions.avformat.av_register_all {
        unsafe { register_all() };
        log.push("Called av_register_all");
    }

    diagnostics::set_native_log_threshold(config.native_log_level);
    unsafe {
        (functions.avutil.av_log_set_callback)(Some(diagnostics::native_log_callback));
        (functions.avutil.av_log_set_level)(config.native_log_level.to_raw());
    }

    info!(
        "Loaded FFmpeg libraries: {} ({})",
        versions,
        functions.avcodec.decode.name()
    );

    Ok(Session {
        inner: Arc::new(SessionInner {
            request,
            functions,
            versions,
            log,
            decoder_options: config.decoder_options.clone(),
            bindings,
        }),
    })
}

fn load_libraries(
    request: &LoadRequest,
    loader: &LibraryLoader<'_>,
    log: &DiagnosticLog,
) -> Option<Loaded> {
    match &request.explicit_files {
        Some(files) => {
            log.push("Trying to load the libraries specified in the settings.");
            for candidate in request.catalog.iter() {
                log_candidate(log, candidate);
                let result = try_candidate(candidate, log, |library, _| {
                    let path = files.get(library).ok_or_else(|| LoadError::LibraryLoadFailed {
                        library,
                        path: PathBuf::new(),
                        reason: "no file configured".to_string(),
                    })?;
                    loader.load_file(library, path)
                });
                if let Some(loaded) = accept(result, log) {
                    return Some(loaded);
                }
            }
        }
        None => log.push("No libraries were specified in the settings."),
    }

    for location in &request.locations {
        if loader.check_location(location).is_err() {
            continue;
        }
        log.push(format!("Trying to load the libraries in {}", location.describe()));
        for candidate in request.catalog.iter() {
            log_candidate(log, candidate);
            let result = try_candidate(candidate, log, |library, major| {
                loader.load(location, library, major)
            });
            if let Some(loaded) = accept(result, log) {
                return Some(loaded);
            }
        }
    }
    None
}

fn log_candidate(log: &DiagnosticLog, candidate: &LibraryVersion) {
    log.push(format!(
        "Checking versions avutil {}, swresample {}, avcodec {}, avformat {}",
        candidate.avutil.major,
        candidate.swresample.major,
        candidate.avcodec.major,
        candidate.avformat.major
    ));
}

fn accept(result: std::result::Result<Loaded, LoadError>, log: &DiagnosticLog) -> Option<Loaded> {
    match result {
        Ok(loaded) => {
            log.push("Library version check passed.");
            Some(loaded)
        }
        Err(e) => {
            debug!("Candidate abandoned: {}", e);
            None
        }
    }
}

/// Opens and binds all four libraries for one candidate tuple. Anything already opened is
/// released if a later library fails.
fn try_candidate(
    candidate: &LibraryVersion,
    log: &DiagnosticLog,
    mut open: impl FnMut(Library, u32) -> std::result::Result<LoadedLibrary, LoadError>,
) -> std::result::Result<Loaded, LoadError> {
    let mut bindings = Bindings::default();
    let mut builder = FunctionTableBuilder::default();
    let mut versions = *candidate;

    for library in Library::LOAD_ORDER {
        let expected = candidate.get(library).major;
        let loaded = open(library, expected)?;
        let reported = builder.bind(library, loaded.source.as_ref(), log)?;
        if reported.major != expected {
            let error = LoadError::VersionMismatch {
                library,
                expected,
                found: reported,
            };
            log.push(error.to_string());
            return Err(error);
        }
        versions.set(library, reported);
        bindings.libraries.push(loaded);
    }

    let functions = builder.build().ok_or(LoadError::SymbolMissing {
        library: Library::AvFormat,
        symbols: Vec::new(),
    })?;
    Ok(Loaded {
        bindings,
        functions,
        versions,
    })
}

/// Loads four explicit files against every catalog candidate without touching the registry.
/// Returns the versions found and the attempt log.
pub fn check_library_files(
    files: &LibraryFiles,
    catalog: &VersionCatalog,
    opener: &dyn LibraryOpener,
    platform: Platform,
) -> (std::result::Result<LibraryVersion, LoadError>, DiagnosticLog) {
    let log = DiagnosticLog::new();
    if !files.is_complete() {
        log.push("All four library files must be given.");
        return (Err(LoadError::NoCompatibleLibrary { log: log.lines() }), log);
    }

    let loader = LibraryLoader::new(opener, platform, &log);
    let request = LoadRequest {
        explicit_files: Some(files.clone()),
        locations: Vec::new(),
        catalog: catalog.clone(),
    };
    let result = match load_libraries(&request, &loader, &log) {
        Some(loaded) => Ok(loaded.versions),
        None => Err(LoadError::NoCompatibleLibrary { log: log.lines() }),
    };
    (result, log)
}

// ============================================================================
// Tests
// ============================================================================
