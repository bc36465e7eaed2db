//! `AVDictionary`: string key/value pairs, used for metadata and for options passed to open
//! calls. A null dictionary is a valid, empty one.

use serde::{Deserialize, Serialize};
use std::ffi::{c_int, CStr};
use std::marker::PhantomData;
use std::ptr;

use super::Ownership;
use crate::abi::c_string;
use crate::error::{AvError, Result};
use crate::ffi::{AVDictionary, AVDictionaryEntry, AV_DICT_IGNORE_SUFFIX};
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    pub key: String,
    pub value: String,
}

/// Owned dictionaries are `'static`; borrowed ones live as long as the object holding them.
pub struct Dictionary<'a> {
    session: Session,
    ptr: *mut AVDictionary,
    ownership: Ownership,
    _owner: PhantomData<&'a ()>,
}

// Only moved between threads together with the object it belongs to.
unsafe impl Send for Dictionary<'_> {}

impl Dictionary<'static> {
    /// An empty dictionary we own. Nothing is allocated until the first `set`.
    pub fn new(session: &Session) -> Self {
        Self {
            session: session.clone(),
            ptr: ptr::null_mut(),
            ownership: Ownership::Owned,
            _owner: PhantomData,
        }
    }

    pub fn from_pairs(session: &Session, pairs: &[(String, String)]) -> Result<Self> {
        let mut dict = Self::new(session);
        for (key, value) in pairs {
            dict.set(key, value)?;
        }
        Ok(dict)
    }
}

impl<'a> Dictionary<'a> {
    /// Wraps a dictionary owned by another native object. Borrowed dictionaries are read-only.
    pub(crate) fn borrowed(session: &Session, ptr: *mut AVDictionary) -> Self {
        Self {
            session: session.clone(),
            ptr,
            ownership: Ownership::Borrowed,
            _owner: PhantomData,
        }
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        if self.ownership == Ownership::Borrowed {
            return Err(AvError::InvalidState {
                operation: "set a dictionary entry",
                state: "the dictionary belongs to another object",
            });
        }
        let key = Session::c_string(key)?;
        let value = Session::c_string(value)?;
        let ret = unsafe {
            (self.session.functions().avutil.av_dict_set)(
                &mut self.ptr,
                key.as_ptr(),
                value.as_ptr(),
                0,
            )
        };
        if ret < 0 {
            return Err(AvError::native("av_dict_set", ret));
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        if self.ptr.is_null() {
            return Ok(None);
        }
        let key = Session::c_string(key)?;
        let entry = unsafe {
            (self.session.functions().avutil.av_dict_get)(self.ptr, key.as_ptr(), ptr::null(), 0)
        };
        if entry.is_null() {
            Ok(None)
        } else {
            Ok(Some(unsafe { c_string((*entry).value) }))
        }
    }

    pub fn entries(&self) -> Vec<DictionaryEntry> {
        self.iterate(c"", AV_DICT_IGNORE_SUFFIX)
    }

    /// Entries whose key starts with `prefix`.
    pub fn entries_with_prefix(&self, prefix: &str) -> Result<Vec<DictionaryEntry>> {
        let prefix = Session::c_string(prefix)?;
        Ok(self.iterate(&prefix, AV_DICT_IGNORE_SUFFIX))
    }

    fn iterate(&self, key: &CStr, flags: c_int) -> Vec<DictionaryEntry> {
        let mut entries = Vec::new();
        if self.ptr.is_null() {
            return entries;
        }
        let get = self.session.functions().avutil.av_dict_get;
        let mut prev: *const AVDictionaryEntry = ptr::null();
        loop {
            let entry = unsafe { get(self.ptr, key.as_ptr(), prev, flags) };
            if entry.is_null() {
                break;
            }
            unsafe {
                entries.push(DictionaryEntry {
                    key: c_string((*entry).key),
                    value: c_string((*entry).value),
                });
            }
            prev = entry;
        }
        entries
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ptr.is_null() || self.len() == 0
    }

    /// For native calls that consume options and hand back the unused ones.
    pub(crate) fn slot(&mut self) -> &mut *mut AVDictionary {
        &mut self.ptr
    }
}

impl std::fmt::Debug for Dictionary<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dictionary")
            .field("ownership", &self.ownership)
            .field("entries", &self.entries())
            .finish()
    }
}

impl Drop for Dictionary<'_> {
    fn drop(&mut self) {
        if self.ownership == Ownership::Borrowed || self.ptr.is_null() {
            return;
        }
        match self.session.functions().avutil.av_dict_free {
            Some(free) => unsafe { free(&mut self.ptr) },
            None => tracing::debug!("av_dict_free not exported; leaking an options dictionary"),
        }
    }
}
