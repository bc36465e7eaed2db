//! Library versions and the catalog of supported major-version tuples.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The four native libraries, in dependency (and therefore load) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Library {
    AvUtil,
    SwResample,
    AvCodec,
    AvFormat,
}

impl Library {
    /// Later libraries link against earlier ones, so they must be opened in this order.
    pub const LOAD_ORDER: [Library; 4] = [
        Library::AvUtil,
        Library::SwResample,
        Library::AvCodec,
        Library::AvFormat,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::AvUtil => "avutil",
            Self::SwResample => "swresample",
            Self::AvCodec => "avcodec",
            Self::AvFormat => "avformat",
        }
    }
}

impl fmt::Display for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One library's version. Only `major` selects layouts; minor and micro are informational and
/// are known only after the library reported them itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u32,
    #[serde(default)]
    pub minor: Option<u32>,
    #[serde(default)]
    pub micro: Option<u32>,
}

impl Version {
    pub const fn major(major: u32) -> Self {
        Self {
            major,
            minor: None,
            micro: None,
        }
    }

    /// Splits an `AV_VERSION_INT` value as returned by `avutil_version()` and friends.
    pub const fn from_packed(packed: u32) -> Self {
        Self {
            major: packed >> 16,
            minor: Some((packed >> 8) & 0xFF),
            micro: Some(packed & 0xFF),
        }
    }

    pub fn same_major(&self, other: &Version) -> bool {
        self.major == other.major
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.minor, self.micro) {
            (Some(minor), Some(micro)) => write!(f, "{}.{}.{}", self.major, minor, micro),
            (Some(minor), None) => write!(f, "{}.{}.x", self.major, minor),
            _ => write!(f, "{}.x.x", self.major),
        }
    }
}

/// Versions of all four libraries. Frozen once a session has loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LibraryVersion {
    pub avutil: Version,
    pub swresample: Version,
    pub avcodec: Version,
    pub avformat: Version,
}

impl LibraryVersion {
    /// Majors in catalog order: util, resample, codec, format.
    pub const fn new(avutil: u32, swresample: u32, avcodec: u32, avformat: u32) -> Self {
        Self {
            avutil: Version::major(avutil),
            swresample: Version::major(swresample),
            avcodec: Version::major(avcodec),
            avformat: Version::major(avformat),
        }
    }

    pub fn get(&self, library: Library) -> Version {
        match library {
            Library::AvUtil => self.avutil,
            Library::SwResample => self.swresample,
            Library::AvCodec => self.avcodec,
            Library::AvFormat => self.avformat,
        }
    }

    pub fn set(&mut self, library: Library, version: Version) {
        match library {
            Library::AvUtil => self.avutil = version,
            Library::SwResample => self.swresample = version,
            Library::AvCodec => self.avcodec = version,
            Library::AvFormat => self.avformat = version,
        }
    }

    /// True when every library's major matches `other`'s.
    pub fn same_majors(&self, other: &LibraryVersion) -> bool {
        Library::LOAD_ORDER
            .iter()
            .all(|lib| self.get(*lib).same_major(&other.get(*lib)))
    }
}

impl fmt::Display for LibraryVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "avutil {}, swresample {}, avcodec {}, avformat {}",
            self.avutil, self.swresample, self.avcodec, self.avformat
        )
    }
}

// ============================================================================
// Version Catalog
// ============================================================================

/// Known-compatible major tuples (util, resample, codec, format), newest first.
pub const DEFAULT_CATALOG: [LibraryVersion; 5] = [
    LibraryVersion::new(58, 4, 60, 60), // FFmpeg 6
    LibraryVersion::new(57, 4, 59, 59), // FFmpeg 5
    LibraryVersion::new(56, 3, 58, 58), // FFmpeg 4
    LibraryVersion::new(55, 2, 57, 57), // FFmpeg 3
    LibraryVersion::new(54, 1, 56, 56), // FFmpeg 2
];

/// Ordered list of candidate tuples driving the load loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionCatalog {
    entries: Vec<LibraryVersion>,
}

impl Default for VersionCatalog {
    fn default() -> Self {
        Self {
            entries: DEFAULT_CATALOG.to_vec(),
        }
    }
}

impl VersionCatalog {
    /// Builds a catalog, ordering it newest first by avcodec, avformat, avutil, then swresample
    /// major. Every major takes part in the order so equal tuples end up adjacent and `dedup`
    /// drops them.
    pub fn new(mut entries: Vec<LibraryVersion>) -> Self {
        entries.sort_by(|a, b| {
            let key = |v: &LibraryVersion| {
                (v.avcodec.major, v.avformat.major, v.avutil.major, v.swresample.major)
            };
            key(b).cmp(&key(a))
        });
        entries.dedup_by(|a, b| a.same_majors(b));
        Self { entries }
    }

    pub fn iter(&self) -> impl Iterator<Item = &LibraryVersion> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All majors the catalog knows for one library, newest first, without duplicates.
    pub fn majors(&self, library: Library) -> Vec<u32> {
        let mut majors: Vec<u32> = self.entries.iter().map(|v| v.get(library).major).collect();
        majors.dedup();
        majors
    }
}

// ============================================================================
// Tests
// ============================================================================
