//! Per-symbol resolution against a loaded shared library.

use std::ffi::c_void;
use std::path::{Path, PathBuf};

use crate::error::LoadError;
use crate::version::Library;

/// Anything exported symbols can be looked up in.
pub trait SymbolSource: Send + Sync {
    /// File the symbols come from, for diagnostics.
    fn path(&self) -> &Path;

    /// Address of an exported symbol, or `None` if it is not exported.
    fn address(&self, name: &str) -> Option<*const c_void>;
}

// ============================================================================
// Dynamic Library
// ============================================================================

/// A shared library opened with `libloading`.
#[derive(Debug)]
pub struct DynamicLibrary {
    path: PathBuf,
    library: libloading::Library,
}

impl DynamicLibrary {
    pub fn open(path: &Path) -> Result<Self, String> {
        let library = unsafe { libloading::Library::new(path) }.map_err(|e| e.to_string())?;
        Ok(Self {
            path: path.to_path_buf(),
            library,
        })
    }
}

impl SymbolSource for DynamicLibrary {
    fn path(&self) -> &Path {
        &self.path
    }

    fn address(&self, name: &str) -> Option<*const c_void> {
        let symbol = unsafe { self.library.get::<*const c_void>(name.as_bytes()) }.ok()?;
        let address = *symbol;
        if address.is_null() {
            None
        } else {
            Some(address)
        }
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Resolves one library group's symbols and remembers which required ones were missing.
pub struct Resolver<'a> {
    source: &'a dyn SymbolSource,
    library: Library,
    missing: Vec<&'static str>,
}

impl<'a> Resolver<'a> {
    pub fn new(source: &'a dyn SymbolSource, library: Library) -> Self {
        Self {
            source,
            library,
            missing: Vec::new(),
        }
    }

    pub fn address(&self, name: &str) -> Option<*const c_void> {
        self.source.address(name)
    }

    pub fn note_missing(&mut self, name: &'static str) {
        self.missing.push(name);
    }

    pub fn missing(&self) -> &[&'static str] {
        &self.missing
    }

    pub fn library(&self) -> Library {
        self.library
    }

    /// Fails with every missing required symbol at once.
    pub fn finish(&self) -> Result<(), LoadError> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(self.error())
        }
    }

    pub fn error(&self) -> LoadError {
        LoadError::SymbolMissing {
            library: self.library,
            symbols: self.missing.clone(),
        }
    }
}

/// Takes a slot that [`Resolver::finish`] already vouched for.
pub(crate) fn present<T>(slot: Option<T>, library: Library, name: &'static str) -> Result<T, LoadError> {
    slot.ok_or(LoadError::SymbolMissing {
        library,
        symbols: vec![name],
    })
}

/// `resolve!(required r, symbol_name: FnType)` looks up `symbol_name` and casts the address to
/// `FnType`. `required` lookups that fail are recorded on the resolver; `optional` ones are not.
macro_rules! resolve {
    (optional $resolver:expr, $name:ident : $ty:ty) => {
        $resolver
            .address(stringify!($name))
            .map(|address| unsafe { std::mem::transmute::<*const std::ffi::c_void, $ty>(address) })
    };
    (required $resolver:expr, $name:ident : $ty:ty) => {{
        let slot: Option<$ty> = $crate::symbols::resolve!(optional $resolver, $name: $ty);
        if slot.is_none() {
            $resolver.note_missing(stringify!($name));
        }
        slot
    }};
}

pub(crate) use resolve;
