//! libswresample bindings. Only the version is needed; the library is loaded because
//! libavcodec links against it.

use std::ffi::c_uint;

use crate::diagnostics::DiagnosticLog;
use crate::error::LoadError;
use crate::symbols::{resolve, Resolver, SymbolSource};
use crate::version::{Library, Version};

pub type SwresampleVersionFn = unsafe extern "C" fn() -> c_uint;

#[derive(Debug, Clone, Copy)]
pub struct SwResampleFunctions {
    pub swresample_version: SwresampleVersionFn,
}

pub fn bind(
    source: &dyn SymbolSource,
    log: &DiagnosticLog,
) -> Result<(SwResampleFunctions, Version), LoadError> {
    let mut r = Resolver::new(source, Library::SwResample);
    let swresample_version = resolve!(required r, swresample_version: SwresampleVersionFn);
    let Some(swresample_version) = swresample_version else {
        super::log_missing(log, &r);
        return Err(r.error());
    };
    let version = Version::from_packed(unsafe { swresample_version() });
    Ok((SwResampleFunctions { swresample_version }, version))
}
