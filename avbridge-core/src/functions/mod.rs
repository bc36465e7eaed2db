//! Function table: one group of bound entry points per library.
//!
//! Every group is bound the same way: resolve and call the library's own `*_version()` first,
//! then resolve the rest, with version-gated symbols decided by the reported version rather than
//! by the file name the library was found under.

pub mod avcodec;
pub mod avformat;
pub mod avutil;
pub mod swresample;

pub use avcodec::AvCodecFunctions;
pub use avformat::AvFormatFunctions;
pub use avutil::AvUtilFunctions;
pub use swresample::SwResampleFunctions;

use crate::diagnostics::DiagnosticLog;
use crate::error::LoadError;
use crate::symbols::{Resolver, SymbolSource};
use crate::version::{Library, Version};

/// All four bound groups. Slots never change after binding.
#[derive(Debug, Clone, Copy)]
pub struct FunctionTable {
    pub avformat: AvFormatFunctions,
    pub avcodec: AvCodecFunctions,
    pub avutil: AvUtilFunctions,
    pub swresample: SwResampleFunctions,
}

impl FunctionTable {
    /// True when send/receive and parameters-to-context were all bound.
    pub fn new_decode_api_available(&self) -> bool {
        self.avcodec.decode.is_send_receive()
    }
}

/// Collects groups while the libraries are loaded one by one.
#[derive(Debug, Default)]
pub(crate) struct FunctionTableBuilder {
    avformat: Option<AvFormatFunctions>,
    avcodec: Option<AvCodecFunctions>,
    avutil: Option<AvUtilFunctions>,
    swresample: Option<SwResampleFunctions>,
}

impl FunctionTableBuilder {
    /// Binds one library's group and returns the version the library reported.
    pub fn bind(
        &mut self,
        library: Library,
        source: &dyn SymbolSource,
        log: &DiagnosticLog,
    ) -> Result<Version, LoadError> {
        let result = match library {
            Library::AvUtil => avutil::bind(source, log).map(|(f, v)| {
                self.avutil = Some(f);
                v
            }),
            Library::SwResample => swresample::bind(source, log).map(|(f, v)| {
                self.swresample = Some(f);
                v
            }),
            Library::AvCodec => avcodec::bind(source, log).map(|(f, v)| {
                self.avcodec = Some(f);
                v
            }),
            Library::AvFormat => avformat::bind(source, log).map(|(f, v)| {
                self.avformat = Some(f);
                v
            }),
        };
        log.push(format!(
            "Binding functions of {} {}",
            library,
            if result.is_ok() { "successful" } else { "failed" }
        ));
        result
    }

    pub fn build(self) -> Option<FunctionTable> {
        Some(FunctionTable {
            avformat: self.avformat?,
            avcodec: self.avcodec?,
            avutil: self.avutil?,
            swresample: self.swresample?,
        })
    }
}

pub(crate) fn log_missing(log: &DiagnosticLog, r: &Resolver<'_>) {
    for name in r.missing() {
        log.push(format!("Function {} not found.", name));
    }
}
