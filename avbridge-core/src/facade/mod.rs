//! Entity facades.
//!
//! Version-independent views over native objects. Each facade picks its shadow-struct family
//! from the session's frozen versions once, when it is created, so callers never see a raw
//! struct.
//!
//! Objects we allocate are owned by exactly one facade and released through the matching
//! native free call, once, on drop or on an explicit `free()`. Objects owned by the library
//! (streams, a stream's codec context, side data, pixel format descriptors) are borrowed and
//! never freed here. Borrowed facades carry the lifetime of the object they were read from, so
//! closing that object while one is alive does not compile. A freed facade is empty; every
//! access then fails with [`AvError::EmptyHandle`].

pub mod codec_context;
pub mod codec_parameters;
pub mod dictionary;
pub mod format_context;
pub mod frame;
pub mod packet;
pub mod pix_fmt;
pub mod side_data;
pub mod stream;

pub use codec_context::CodecContext;
pub use codec_parameters::CodecParameters;
pub use dictionary::{Dictionary, DictionaryEntry};
pub use format_context::FormatContext;
pub use frame::{Frame, FrameInfo, Plane};
pub use packet::Packet;
pub use pix_fmt::{
    AlphaPosition, PixFmtDescriptor, PixFmtFlags, RgbLayout, Subsampling, YuvLayout,
};
pub use side_data::{MotionVector, SideData};
pub use stream::Stream;

use crate::error::{AvError, Result};

/// Whether a facade releases its object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Allocated through us; freed by the facade.
    Owned,
    /// Owned by the native library or by another object.
    Borrowed,
}

/// Nullable native pointer with the empty-state check shared by all facades.
#[derive(Debug)]
pub(crate) struct Handle<T> {
    ptr: *mut T,
    entity: &'static str,
}

impl<T> Handle<T> {
    pub fn new(ptr: *mut T, entity: &'static str) -> Self {
        Self { ptr, entity }
    }

    pub fn is_empty(&self) -> bool {
        self.ptr.is_null()
    }

    pub fn get(&self) -> Result<*mut T> {
        if self.ptr.is_null() {
            Err(AvError::EmptyHandle {
                entity: self.entity,
            })
        } else {
            Ok(self.ptr)
        }
    }

    /// Raw pointer, possibly null.
    pub fn raw(&self) -> *mut T {
        self.ptr
    }

    /// Slot for native calls that free through a double pointer and null it.
    pub fn slot(&mut self) -> &mut *mut T {
        &mut self.ptr
    }

    /// Empties the handle, failing if it already was.
    pub fn take(&mut self) -> Result<*mut T> {
        let ptr = self.get()?;
        self.ptr = std::ptr::null_mut();
        Ok(ptr)
    }
}

// Facades are moved between threads, never shared; see the owning types.
unsafe impl<T> Send for Handle<T> {}
