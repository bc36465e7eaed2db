//! ABI shadow layer.
//!
//! For every native struct we touch there is one `#[repr(C)]` shadow struct per major-version
//! family. A shadow struct declares the leading fields of the real struct in the real order and
//! with the real sizes, up to the last field we need; trailing fields are never declared. The
//! shadow structs are the only place where an opaque native pointer is reinterpreted.
//!
//! Family selection is a total function of the frozen major version of the owning library.
//! An unknown major is [`AbiError::UnsupportedAbiFamily`]; no layout is ever guessed.
//!
//! Adding a family means adding one shadow struct, one view type, and one arm in the factory.

pub mod codec_context;
pub mod codec_parameters;
pub mod format_context;
pub mod frame;
pub mod packet;
pub mod pix_fmt;
pub mod side_data;
pub mod stream;

use std::ffi::{c_char, CStr};

pub use codec_context::{codec_context_view, CodecContextFields, CodecContextView};
pub use codec_parameters::{codec_parameters_view, CodecParametersFields, CodecParametersView};
pub use format_context::{format_context_view, FormatContextFields, FormatContextView};
pub use frame::{frame_view, FrameFields, FrameView};
pub use packet::{packet_view, PacketFields, PacketView};
pub use pix_fmt::{pix_fmt_view, ComponentDescriptor, PixFmtFields, PixFmtView};
pub use side_data::{
    motion_vector_view, side_data_view, MotionVectorFields, MotionVectorView, SideDataFields,
    SideDataView,
};
pub use stream::{stream_view, StreamFields, StreamView};

use crate::error::AbiError;
use crate::version::Library;

/// Reads one native struct through the shadow struct of one version family.
pub trait VersionedView: Sync {
    /// The opaque native type the pointer is declared as.
    type Native;
    /// Version-independent snapshot of the fields this layer exposes.
    type Fields;

    /// Name of the family, e.g. `"57_58"`.
    fn family(&self) -> &'static str;

    /// # Safety
    /// `ptr` must be non-null and point to a live native object whose layout belongs to this
    /// family.
    unsafe fn read(&self, ptr: *const Self::Native) -> Self::Fields;
}

/// Views of mutable entities can also write the exposed fields back.
pub trait VersionedWrite: VersionedView {
    /// Writes every writable field of `fields`. Which fields are writable is documented on each
    /// entity's `Fields` type.
    ///
    /// # Safety
    /// Same as [`VersionedView::read`], and the object must not be shared with a running decoder.
    unsafe fn write(&self, ptr: *mut Self::Native, fields: &Self::Fields);
}

/// Views over arrays of fixed-size native records, such as motion vectors.
pub trait VersionedArray: VersionedView {
    /// Size in bytes of one element in this family.
    fn stride(&self) -> usize;
}

pub(crate) fn unsupported(entity: &'static str, library: Library, major: u32) -> AbiError {
    AbiError::UnsupportedAbiFamily {
        entity,
        library,
        major,
    }
}

/// Copies a NUL-terminated native string. Null reads as empty.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string.
pub(crate) unsafe fn c_string(ptr: *const c_char) -> String {
    if ptr.is_null() {
        String::new()
    } else {
        CStr::from_ptr(ptr).to_string_lossy().into_owned()
    }
}

/// Copies a fixed-size `char[N]` field up to its first NUL.
pub(crate) fn c_array_string(bytes: &[c_char]) -> String {
    let bytes: Vec<u8> = bytes
        .iter()
        .take_while(|b| **b != 0)
        .map(|b| *b as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Copies `len` bytes from native memory. Null or non-positive lengths read as empty.
///
/// # Safety
/// `ptr` must be null or valid for `len` bytes.
pub(crate) unsafe fn copy_bytes(ptr: *const u8, len: i64) -> Vec<u8> {
    if ptr.is_null() || len <= 0 {
        Vec::new()
    } else {
        std::slice::from_raw_parts(ptr, len as usize).to_vec()
    }
}
