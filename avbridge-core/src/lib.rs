//! # avbridge
//!
//! Version-tolerant runtime binding to the FFmpeg libraries (avformat, avcodec, avutil,
//! swresample).
//!
//! The libraries are found and opened at runtime, their self-reported versions checked against
//! a catalog of supported generations, and their functions bound into one table. Native structs
//! are read through per-version shadow layouts behind version-independent facades, and a
//! dispatcher drives open / decode / seek / drain over whichever decode call convention the
//! loaded avcodec offers.
//!
//! ```no_run
//! use avbridge_core::{DecodeDispatcher, LoaderConfig, Session};
//!
//! let session = Session::load(&LoaderConfig::load_default()?)?;
//! let mut dispatcher = DecodeDispatcher::open_video(&session, "movie.mkv")?;
//! while let Some(picture) = dispatcher.next_frame()? {
//!     println!("{} {:?}", picture.frame_number, picture.info.picture_type);
//! }
//! # Ok::<(), avbridge_core::AvError>(())
//! ```

// ============================================================================
// Native surface
// ============================================================================
pub mod ffi;
pub mod symbols;
pub mod version;

// ============================================================================
// Loading and binding
// ============================================================================
pub mod config;
pub mod diagnostics;
pub mod functions;
pub mod loader;
pub mod negotiate;
pub mod session;

// ============================================================================
// Structs and facades
// ============================================================================
pub mod abi;
pub mod facade;

// ============================================================================
// Decoding
// ============================================================================
pub mod bitstream;
pub mod dispatch;
pub mod strategy;

pub mod error;

#[cfg(test)]
pub(crate) mod testing;

pub use bitstream::{Keyframe, KeyframeIndex, PacketDataFormat, PacketType, StreamIndices};
pub use config::{LibraryFiles, LoaderConfig};
pub use diagnostics::{DiagnosticLog, NativeLogLevel};
pub use dispatch::{DecodeDispatcher, DecodedPicture, DispatchState, DispatchStats};
pub use error::{AbiError, AvError, LoadError, Result};
pub use facade::{
    CodecContext, CodecParameters, Dictionary, FormatContext, Frame, Packet, PixFmtDescriptor,
    Stream,
};
pub use loader::Platform;
pub use session::{LibraryStatus, Session, SessionRegistry};
pub use version::{Library, LibraryVersion, Version, VersionCatalog};
