//! Error types for loading, layout selection, and native calls.

use crate::version::{Library, Version};
use std::path::PathBuf;
use thiserror::Error;

/// Failures while discovering, opening, and binding the native libraries.
///
/// Everything except [`LoadError::NoCompatibleLibrary`] is recoverable: the loader moves on to
/// the next search location or catalog candidate.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Search path does not exist: {}", path.display())]
    PathInvalid { path: PathBuf },

    #[error("Failed to load {library} from {}: {reason}", path.display())]
    LibraryLoadFailed {
        library: Library,
        path: PathBuf,
        reason: String,
    },

    #[error("{library} is missing required symbols: {symbols:?}")]
    SymbolMissing {
        library: Library,
        symbols: Vec<&'static str>,
    },

    #[error("Version of loaded {library} library ({found}) is not the one we are trying to load ({expected})")]
    VersionMismatch {
        library: Library,
        expected: u32,
        found: Version,
    },

    #[error("No compatible FFmpeg libraries found ({} log lines)", log.len())]
    NoCompatibleLibrary { log: Vec<String> },
}

/// A facade was asked to interpret a major version that has no shadow struct.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    #[error("No {entity} layout for {library} major version {major}")]
    UnsupportedAbiFamily {
        entity: &'static str,
        library: Library,
        major: u32,
    },
}

#[derive(Debug, Error)]
pub enum AvError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Abi(#[from] AbiError),

    #[error("{call} failed: {} (code {code})", crate::ffi::describe_error(*code))]
    Native { call: &'static str, code: i32 },

    #[error("{call} returned null")]
    NullResult { call: &'static str },

    #[error("{entity} handle is empty (already freed or never allocated)")]
    EmptyHandle { entity: &'static str },

    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    #[error("No video stream in input")]
    NoVideoStream,

    #[error("Stream index {index} out of range ({count} streams)")]
    StreamIndex { index: usize, count: usize },

    #[error("No decoder for codec {codec_name} (id {codec_id})")]
    DecoderNotFound { codec_id: i32, codec_name: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AvError {
    pub(crate) fn native(call: &'static str, code: i32) -> Self {
        Self::Native { call, code }
    }

    /// Errors after which a session or dispatcher must not keep decoding.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Abi(_) | Self::Load(LoadError::NoCompatibleLibrary { .. }))
    }
}

pub type Result<T> = std::result::Result<T, AvError>;
