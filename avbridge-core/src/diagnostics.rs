//! Diagnostic logs: the load/bind attempt log and the capture of the native library's own
//! log output.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::ffi::{c_char, c_int, c_void, CStr};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::ffi;

// ============================================================================
// Load Log
// ============================================================================

/// Append-only, ordered list of human-readable lines describing every load and bind attempt.
///
/// Cloning shares the underlying list. Lines are for display only.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticLog {
    lines: Arc<Mutex<Vec<String>>>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, line: impl Into<String>) {
        let line = line.into();
        tracing::debug!(target: "avbridge::load", "{}", line);
        self.lines.lock().push(line);
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.lock().iter().any(|l| l.contains(needle))
    }
}

// ============================================================================
// Native Log Level
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NativeLogLevel {
    Quiet,
    Panic,
    Fatal,
    Error,
    #[default]
    Warning,
    Info,
    Verbose,
    Debug,
    Trace,
}

impl NativeLogLevel {
    pub fn to_raw(self) -> c_int {
        match self {
            Self::Quiet => ffi::AV_LOG_QUIET,
            Self::Panic => ffi::AV_LOG_PANIC,
            Self::Fatal => ffi::AV_LOG_FATAL,
            Self::Error => ffi::AV_LOG_ERROR,
            Self::Warning => ffi::AV_LOG_WARNING,
            Self::Info => ffi::AV_LOG_INFO,
            Self::Verbose => ffi::AV_LOG_VERBOSE,
            Self::Debug => ffi::AV_LOG_DEBUG,
            Self::Trace => ffi::AV_LOG_TRACE,
        }
    }
}

// ============================================================================
// Native Log Capture
// ============================================================================

const NATIVE_LOG_CAPACITY: usize = 2000;
const NATIVE_MESSAGE_MAX: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeLogLine {
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    pub level: i32,
    pub message: String,
}

impl NativeLogLine {
    pub fn display(&self) -> String {
        let ms_of_day = self.timestamp_ms % 86_400_000;
        format!(
            "{:02}:{:02}:{:02}.{:03} - L{} - {}",
            ms_of_day / 3_600_000,
            (ms_of_day / 60_000) % 60,
            (ms_of_day / 1000) % 60,
            ms_of_day % 1000,
            self.level,
            self.message
        )
    }
}

static NATIVE_LOG: Lazy<Mutex<VecDeque<NativeLogLine>>> =
    Lazy::new(|| Mutex::new(VecDeque::with_capacity(64)));

static NATIVE_LOG_THRESHOLD: AtomicI32 = AtomicI32::new(ffi::AV_LOG_WARNING);

pub(crate) fn set_native_log_threshold(level: NativeLogLevel) {
    NATIVE_LOG_THRESHOLD.store(level.to_raw(), Ordering::Relaxed);
}

pub(crate) fn record_native_message(level: c_int, message: &str) {
    let message = message.trim_end().to_string();
    if message.is_empty() {
        return;
    }

    match level {
        l if l <= ffi::AV_LOG_ERROR => tracing::error!(target: "avbridge::native", "{}", message),
        l if l <= ffi::AV_LOG_WARNING => tracing::warn!(target: "avbridge::native", "{}", message),
        l if l <= ffi::AV_LOG_INFO => tracing::info!(target: "avbridge::native", "{}", message),
        _ => tracing::debug!(target: "avbridge::native", "{}", message),
    }

    let timestamp_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);

    let mut log = NATIVE_LOG.lock();
    if log.len() == NATIVE_LOG_CAPACITY {
        log.pop_front();
    }
    log.push_back(NativeLogLine {
        timestamp_ms,
        level,
        message,
    });
}

/// Snapshot of captured native messages, oldest first.
pub fn native_log() -> Vec<NativeLogLine> {
    NATIVE_LOG.lock().iter().cloned().collect()
}

pub fn clear_native_log() {
    NATIVE_LOG.lock().clear();
}

// `va_list` is passed through as the pointer the native caller handed us.
extern "C" {
    fn vsnprintf(
        buf: *mut libc::c_char,
        size: libc::size_t,
        format: *const libc::c_char,
        args: *mut libc::c_void,
    ) -> libc::c_int;
}

/// Registered with `av_log_set_callback` once a session has loaded.
pub(crate) unsafe extern "C" fn native_log_callback(
    _avcl: *mut c_void,
    level: c_int,
    format: *const c_char,
    args: *mut c_void,
) {
    if format.is_null() || level > NATIVE_LOG_THRESHOLD.load(Ordering::Relaxed) {
        return;
    }

    let mut buf = [0 as c_char; NATIVE_MESSAGE_MAX];
    let written = vsnprintf(buf.as_mut_ptr(), buf.len() as libc::size_t, format, args.cast());
    if written < 0 {
        return;
    }

    let message = CStr::from_ptr(buf.as_ptr()).to_string_lossy();
    record_native_message(level, &message);
}

// ============================================================================
// Tests
// ============================================================================
