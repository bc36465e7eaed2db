//! Frame side data. Side data is owned by its frame and only lives as long as the borrow of
//! the frame it came from.

use std::marker::PhantomData;

use super::{Dictionary, Frame};
use crate::abi::side_data::AVMotionVector;
use crate::abi::{motion_vector_view, SideDataFields};
use crate::error::{AvError, Result};
use crate::ffi::AV_FRAME_DATA_MOTION_VECTORS;
use crate::session::Session;
use crate::version::Library;

pub use crate::abi::MotionVectorFields as MotionVector;

pub struct SideData<'a> {
    session: &'a Session,
    fields: SideDataFields,
    _frame: PhantomData<&'a Frame>,
}

impl<'a> SideData<'a> {
    pub(crate) fn new(session: &'a Session, fields: SideDataFields) -> Self {
        Self {
            session,
            fields,
            _frame: PhantomData,
        }
    }

    /// `enum AVFrameSideDataType` value.
    pub fn kind(&self) -> i32 {
        self.fields.type_
    }

    pub fn data(&self) -> &'a [u8] {
        if self.fields.data.is_null() || self.fields.size == 0 {
            &[]
        } else {
            unsafe { std::slice::from_raw_parts(self.fields.data, self.fields.size) }
        }
    }

    pub fn len(&self) -> usize {
        self.fields.size
    }

    pub fn is_empty(&self) -> bool {
        self.fields.size == 0
    }

    pub fn metadata(&self) -> Dictionary<'a> {
        Dictionary::borrowed(self.session, self.fields.metadata)
    }

    /// Decodes a motion-vector payload. The element size depends on the avutil major.
    pub fn motion_vectors(&self) -> Result<Vec<MotionVector>> {
        if self.fields.type_ != AV_FRAME_DATA_MOTION_VECTORS {
            return Err(AvError::InvalidArgument(format!(
                "side data type {} does not hold motion vectors",
                self.fields.type_
            )));
        }
        let view = motion_vector_view(self.session.major(Library::AvUtil))?;
        let stride = view.stride();
        let data = self.data();
        let count = data.len() / stride;
        Ok((0..count)
            .map(|i| unsafe { view.read(data.as_ptr().add(i * stride) as *const AVMotionVector) })
            .collect())
    }
}

impl std::fmt::Debug for SideData<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SideData")
            .field("kind", &self.fields.type_)
            .field("size", &self.fields.size)
            .finish()
    }
}
