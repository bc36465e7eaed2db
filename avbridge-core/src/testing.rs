//! In-process stand-ins for the four FFmpeg libraries.
//!
//! Every export is a generic `extern "C"` item instantiated per major version, so a fake
//! library reports the version it was built for and lays out its structs in that version's
//! family. Native memory comes from `calloc` and goes back through `free`, the same way the
//! fake `av_mallocz` / `av_free` pair hands it out.
//!
//! The fake demuxer understands `fake:` URLs with comma separated options:
//! `frames` (video frames, default 10), `gop` (keyframe interval, default 12), `delay`
//! (decoder reorder delay, default 0) and `audio` (1 adds an audio stream in front).

#![allow(clippy::missing_safety_doc)]

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::ffi::{c_char, c_int, c_uint, c_void, CStr, CString};
use std::mem::size_of;
use std::path::{Path, PathBuf};
use std::ptr;

use crate::abi::codec_context::{
    AVCodecContext56, AVCodecContext57, AVCodecContext58, AVCodecContext59_60,
};
use crate::abi::codec_parameters::AVCodecParameters57_60;
use crate::abi::format_context::{
    AVFormatContext56, AVFormatContext57, AVFormatContext58, AVFormatContext59_60,
};
use crate::abi::frame::{AVFrame54, AVFrame55_56, AVFrame57_58};
use crate::abi::pix_fmt::{
    AVComponentDescriptor54, AVComponentDescriptor55_56, AVComponentDescriptor57_58,
    AVPixFmtDescriptor54, AVPixFmtDescriptor55_56, AVPixFmtDescriptor57_58,
};
use crate::abi::side_data::{
    AVFrameSideData54_56, AVFrameSideData57_58, AVMotionVector54, AVMotionVector55_58,
};
use crate::abi::stream::{AVStream56, AVStream57, AVStream58, AVStream59_60};
use crate::abi::{
    codec_context_view, codec_parameters_view, packet_view, CodecParametersFields,
    ComponentDescriptor, VersionedView, VersionedWrite,
};
use crate::config::LoaderConfig;
use crate::diagnostics::DiagnosticLog;
use crate::facade::Frame;
use crate::ffi::{
    av_version_int, AVCodec, AVCodecContext, AVCodecParameters, AVDictionary, AVDictionaryEntry,
    AVFormatContext, AVFrame, AVFrameSideData, AVInputFormat, AVPacket, AVPixFmtDescriptor,
    AVRational, AVStream, AvLogCallback, MediaType, AVCOL_SPC_UNSPECIFIED, AVERROR_EAGAIN,
    AVERROR_EOF, AV_DICT_IGNORE_SUFFIX, AV_DICT_MATCH_CASE, AV_FRAME_DATA_MOTION_VECTORS,
    AV_INPUT_BUFFER_PADDING_SIZE, AV_NOPTS_VALUE, AV_NUM_DATA_POINTERS, AV_PIX_FMT_NONE,
    AV_PKT_FLAG_KEY,
};
use crate::functions::{FunctionTable, FunctionTableBuilder};
use crate::loader::{LibraryOpener, Platform, SearchEnvironment};
use crate::session::{Session, SessionRegistry};
use crate::symbols::SymbolSource;
use crate::version::{Library, LibraryVersion};

const ENOENT: c_int = -2;
const EINVAL: c_int = -22;

/// Instantiates `$f::<M>()` for a runtime major version.
macro_rules! for_major {
    ($major:expr, $f:ident $(, $arg:expr)*) => {
        match $major {
            1 => $f::<1>($($arg),*),
            2 => $f::<2>($($arg),*),
            3 => $f::<3>($($arg),*),
            4 => $f::<4>($($arg),*),
            54 => $f::<54>($($arg),*),
            55 => $f::<55>($($arg),*),
            56 => $f::<56>($($arg),*),
            57 => $f::<57>($($arg),*),
            58 => $f::<58>($($arg),*),
            59 => $f::<59>($($arg),*),
            60 => $f::<60>($($arg),*),
            61 => $f::<61>($($arg),*),
            other => panic!("no fake library for major version {}", other),
        }
    };
}

type Exports = Vec<(&'static str, usize)>;

// ============================================================================
// Fake Library
// ============================================================================

/// Symbol table of one fake library.
#[derive(Debug, Clone)]
pub struct FakeLibrary {
    path: PathBuf,
    symbols: HashMap<&'static str, usize>,
}

impl FakeLibrary {
    pub fn empty(name: &str) -> Self {
        Self {
            path: PathBuf::from(name),
            symbols: HashMap::new(),
        }
    }

    fn with(name: String, exports: Exports) -> Self {
        Self {
            path: PathBuf::from(name),
            symbols: exports.into_iter().collect(),
        }
    }

    pub fn avutil(major: u32) -> Self {
        Self::with(format!("libavutil.so.{}", major), for_major!(major, avutil_exports))
    }

    pub fn swresample(major: u32) -> Self {
        Self::with(
            format!("libswresample.so.{}", major),
            vec![("swresample_version", for_major!(major, version_export))],
        )
    }

    /// `new_api` exports send/receive and parameters-to-context next to the legacy call.
    pub fn avcodec(major: u32, new_api: bool) -> Self {
        let mut lib = Self::with(format!("libavcodec.so.{}", major), for_major!(major, avcodec_exports));
        if !new_api {
            for name in [
                "avcodec_send_packet",
                "avcodec_receive_frame",
                "avcodec_parameters_to_context",
            ] {
                lib.remove(name);
            }
        }
        lib
    }

    pub fn avformat(major: u32) -> Self {
        Self::with(format!("libavformat.so.{}", major), for_major!(major, avformat_exports))
    }

    pub fn remove(&mut self, name: &str) {
        self.symbols.remove(name);
    }

    pub fn rename_path(&mut self, name: &str) {
        self.path = PathBuf::from(name);
    }
}

impl SymbolSource for FakeLibrary {
    fn path(&self) -> &Path {
        &self.path
    }

    fn address(&self, name: &str) -> Option<*const c_void> {
        self.symbols.get(name).map(|address| *address as *const c_void)
    }
}

fn version_export<const M: u32>() -> usize {
    version::<M> as usize
}

fn avutil_exports<const M: u32>() -> Exports {
    let mut exports: Exports = vec![
        ("avutil_version", version::<M> as usize),
        ("av_frame_alloc", frame_alloc::<M> as usize),
        ("av_frame_free", frame_free as usize),
        ("av_mallocz", mallocz as usize),
        ("av_free", free as usize),
        ("av_dict_set", dict_set as usize),
        ("av_dict_get", dict_get as usize),
        ("av_dict_free", dict_free as usize),
        ("av_frame_get_side_data", frame_get_side_data as usize),
        ("av_log_set_callback", log_set_callback as usize),
        ("av_log_set_level", log_set_level as usize),
        ("av_pix_fmt_desc_get", pix_fmt_desc_get::<M> as usize),
        ("av_pix_fmt_desc_next", pix_fmt_desc_next::<M> as usize),
        ("av_pix_fmt_desc_get_id", pix_fmt_desc_get_id::<M> as usize),
    ];
    if M < 57 {
        exports.push(("av_frame_get_metadata", frame_get_metadata as usize));
    }
    exports
}

fn avcodec_exports<const M: u32>() -> Exports {
    vec![
        ("avcodec_version", version::<M> as usize),
        ("avcodec_find_decoder", find_decoder as usize),
        ("avcodec_alloc_context3", alloc_context3::<M> as usize),
        ("avcodec_open2", open2::<M> as usize),
        ("avcodec_free_context", free_context::<M> as usize),
        ("av_init_packet", init_packet::<M> as usize),
        ("av_packet_alloc", packet_alloc::<M> as usize),
        ("av_packet_free", packet_free as usize),
        ("av_packet_unref", packet_unref::<M> as usize),
        ("avcodec_flush_buffers", flush_buffers as usize),
        ("avcodec_get_name", get_name as usize),
        ("avcodec_parameters_alloc", parameters_alloc::<M> as usize),
        ("avcodec_parameters_free", parameters_free::<M> as usize),
        ("avcodec_send_packet", send_packet::<M> as usize),
        ("avcodec_receive_frame", receive_frame::<M> as usize),
        ("avcodec_parameters_to_context", parameters_to_context::<M> as usize),
        ("avcodec_decode_video2", decode_video2::<M> as usize),
    ]
}

fn avformat_exports<const M: u32>() -> Exports {
    let mut exports: Exports = vec![
        ("avformat_version", version::<M> as usize),
        ("avformat_open_input", open_input::<M> as usize),
        ("avformat_close_input", close_input::<M> as usize),
        ("avformat_find_stream_info", find_stream_info as usize),
        ("av_read_frame", read_frame::<M> as usize),
        ("av_seek_frame", seek_frame as usize),
    ];
    if M < 59 {
        exports.push(("av_register_all", register_all as usize));
    }
    exports
}

unsafe extern "C" fn version<const M: u32>() -> c_uint {
    av_version_int(M, 1, 100)
}

// ============================================================================
// Fake Opener
// ============================================================================

/// Opens fake libraries by file name. Only the `(library, major)` pairs installed through the
/// builders can be opened.
#[derive(Debug, Default)]
pub struct FakeOpener {
    installed: HashSet<(Library, u32)>,
    missing_symbols: Vec<(Library, u32, &'static str)>,
    reported: HashMap<(Library, u32), u32>,
    legacy: bool,
    opened: Mutex<Vec<PathBuf>>,
}

impl FakeOpener {
    pub fn with_versions(avutil: u32, swresample: u32, avcodec: u32, avformat: u32) -> Self {
        Self::default().and_versions(avutil, swresample, avcodec, avformat)
    }

    pub fn and_versions(mut self, avutil: u32, swresample: u32, avcodec: u32, avformat: u32) -> Self {
        self.installed.insert((Library::AvUtil, avutil));
        self.installed.insert((Library::SwResample, swresample));
        self.installed.insert((Library::AvCodec, avcodec));
        self.installed.insert((Library::AvFormat, avformat));
        self
    }

    pub fn without_symbol(mut self, library: Library, file_major: u32, name: &'static str) -> Self {
        self.missing_symbols.push((library, file_major, name));
        self
    }

    /// The file for `file_major` reports `reported` from its version function.
    pub fn misreporting(mut self, library: Library, file_major: u32, reported: u32) -> Self {
        self.reported.insert((library, file_major), reported);
        self
    }

    /// Every libavcodec exports only the legacy decode call.
    pub fn legacy_decode(mut self) -> Self {
        self.legacy = true;
        self
    }

    /// Paths opened successfully, in order.
    pub fn opened(&self) -> Vec<PathBuf> {
        self.opened.lock().clone()
    }
}

fn library_of(file_name: &str) -> Option<Library> {
    [
        Library::AvFormat,
        Library::AvCodec,
        Library::SwResample,
        Library::AvUtil,
    ]
    .into_iter()
    .find(|library| file_name.contains(library.name()))
}

fn major_of(file_name: &str) -> Option<u32> {
    let stem = file_name
        .strip_suffix(".dll")
        .or_else(|| file_name.strip_suffix(".dylib"))
        .unwrap_or(file_name);
    stem.rsplit(['.', '-']).next()?.parse().ok()
}

impl LibraryOpener for FakeOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn SymbolSource>, String> {
        let not_found = || format!("{}: cannot open shared object file: No such file or directory", path.display());
        let file_name = path.file_name().and_then(|n| n.to_str()).ok_or_else(not_found)?;
        let library = library_of(file_name).ok_or_else(not_found)?;
        let major = major_of(file_name).ok_or_else(not_found)?;
        if !self.installed.contains(&(library, major)) {
            return Err(not_found());
        }

        let reported = self.reported.get(&(library, major)).copied().unwrap_or(major);
        let mut lib = match library {
            Library::AvUtil => FakeLibrary::avutil(reported),
            Library::SwResample => FakeLibrary::swresample(reported),
            Library::AvCodec => FakeLibrary::avcodec(reported, !self.legacy && reported >= 57),
            Library::AvFormat => FakeLibrary::avformat(reported),
        };
        for (l, m, name) in &self.missing_symbols {
            if *l == library && *m == major {
                lib.remove(name);
            }
        }
        lib.path = path.to_path_buf();
        self.opened.lock().push(path.to_path_buf());
        Ok(Box::new(lib))
    }
}

/// No working or application directory: only the system path is searched.
pub fn system_only() -> SearchEnvironment {
    SearchEnvironment::default()
}

fn swresample_for(codec_major: u32) -> u32 {
    match codec_major {
        59..=61 => 4,
        58 => 3,
        57 => 2,
        _ => 1,
    }
}

/// Session over a fake library set: avutil two majors below avcodec, avformat equal to it.
pub fn fake_session(codec_major: u32) -> Session {
    load_fake_session(codec_major, false)
}

/// Like [`fake_session`], with a libavcodec that only has the legacy decode call.
pub fn fake_legacy_session(codec_major: u32) -> Session {
    load_fake_session(codec_major, true)
}

fn load_fake_session(codec_major: u32, legacy: bool) -> Session {
    let mut opener = FakeOpener::with_versions(
        codec_major - 2,
        swresample_for(codec_major),
        codec_major,
        codec_major,
    );
    if legacy {
        opener = opener.legacy_decode();
    }
    load_with_opener(
        LibraryVersion::new(codec_major - 2, swresample_for(codec_major), codec_major, codec_major),
        &opener,
    )
}

/// Session over fakes with independent majors, e.g. a supported avformat next to an avcodec
/// whose layouts are unknown.
pub fn fake_session_with(avutil: u32, swresample: u32, avcodec: u32, avformat: u32) -> Session {
    let opener = FakeOpener::with_versions(avutil, swresample, avcodec, avformat);
    load_with_opener(
        LibraryVersion::new(avutil, swresample, avcodec, avformat),
        &opener,
    )
}

fn load_with_opener(versions: LibraryVersion, opener: &FakeOpener) -> Session {
    let config = LoaderConfig {
        catalog: Some(vec![versions]),
        ..LoaderConfig::default()
    };
    SessionRegistry::new()
        .load(&config, opener, Platform::Linux, &system_only())
        .expect("fake libraries load")
}

/// Function table bound straight from fake libraries, without a session.
pub fn fake_table(codec_major: u32, new_api: bool) -> FunctionTable {
    let log = DiagnosticLog::new();
    let mut builder = FunctionTableBuilder::default();
    builder
        .bind(Library::AvUtil, &FakeLibrary::avutil(codec_major - 2), &log)
        .unwrap();
    builder
        .bind(Library::SwResample, &FakeLibrary::swresample(swresample_for(codec_major)), &log)
        .unwrap();
    builder
        .bind(Library::AvCodec, &FakeLibrary::avcodec(codec_major, new_api), &log)
        .unwrap();
    builder
        .bind(Library::AvFormat, &FakeLibrary::avformat(codec_major), &log)
        .unwrap();
    builder.build().unwrap()
}

// ============================================================================
// libavutil: memory, dictionaries, logging
// ============================================================================

unsafe extern "C" fn mallocz(size: usize) -> *mut c_void {
    libc::calloc(1, size.max(1))
}

unsafe extern "C" fn free(ptr: *mut c_void) {
    libc::free(ptr)
}

unsafe extern "C" fn log_set_callback(_callback: Option<AvLogCallback>) {}

unsafe extern "C" fn log_set_level(_level: c_int) {}

#[repr(C)]
struct FakeEntry {
    entry: AVDictionaryEntry,
    key: CString,
    value: CString,
}

impl FakeEntry {
    fn new(key: CString, value: CString) -> Box<Self> {
        let mut e = Box::new(Self {
            entry: AVDictionaryEntry {
                key: ptr::null_mut(),
                value: ptr::null_mut(),
            },
            key,
            value,
        });
        e.entry.key = e.key.as_ptr() as *mut c_char;
        e.entry.value = e.value.as_ptr() as *mut c_char;
        e
    }

    fn set_value(&mut self, value: CString) {
        self.value = value;
        self.entry.value = self.value.as_ptr() as *mut c_char;
    }
}

#[derive(Default)]
struct FakeDict {
    entries: Vec<Box<FakeEntry>>,
}

fn new_dict(pairs: &[(&str, &str)]) -> *mut AVDictionary {
    let mut dict = FakeDict::default();
    for (key, value) in pairs {
        dict.entries.push(FakeEntry::new(
            CString::new(*key).unwrap(),
            CString::new(*value).unwrap(),
        ));
    }
    Box::into_raw(Box::new(dict)) as *mut AVDictionary
}

unsafe fn dict_value(dict: *const AVDictionary, key: &CStr) -> Option<String> {
    let entry = dict_get(dict, key.as_ptr(), ptr::null(), 0);
    (!entry.is_null()).then(|| CStr::from_ptr((*entry).value).to_string_lossy().into_owned())
}

unsafe extern "C" fn dict_set(
    pm: *mut *mut AVDictionary,
    key: *const c_char,
    value: *const c_char,
    _flags: c_int,
) -> c_int {
    if pm.is_null() || key.is_null() {
        return EINVAL;
    }
    let key = CStr::from_ptr(key).to_owned();
    let value = (!value.is_null()).then(|| CStr::from_ptr(value).to_owned());
    if (*pm).is_null() {
        if value.is_none() {
            return 0;
        }
        *pm = Box::into_raw(Box::new(FakeDict::default())) as *mut AVDictionary;
    }

    let dict = &mut *(*pm as *mut FakeDict);
    let position = dict
        .entries
        .iter()
        .position(|e| e.key.as_bytes().eq_ignore_ascii_case(key.as_bytes()));
    match (position, value) {
        (Some(i), Some(value)) => dict.entries[i].set_value(value),
        (Some(i), None) => {
            dict.entries.remove(i);
        }
        (None, Some(value)) => dict.entries.push(FakeEntry::new(key, value)),
        (None, None) => {}
    }
    if dict.entries.is_empty() {
        dict_free(pm);
    }
    0
}

unsafe extern "C" fn dict_get(
    m: *const AVDictionary,
    key: *const c_char,
    prev: *const AVDictionaryEntry,
    flags: c_int,
) -> *mut AVDictionaryEntry {
    if m.is_null() || key.is_null() {
        return ptr::null_mut();
    }
    let dict = &*(m as *const FakeDict);
    let key = CStr::from_ptr(key).to_bytes();
    let start = if prev.is_null() {
        0
    } else {
        match dict.entries.iter().position(|e| ptr::eq(&e.entry, prev)) {
            Some(i) => i + 1,
            None => return ptr::null_mut(),
        }
    };

    let same = |a: &[u8], b: &[u8]| {
        if flags & AV_DICT_MATCH_CASE != 0 {
            a == b
        } else {
            a.eq_ignore_ascii_case(b)
        }
    };
    for e in &dict.entries[start..] {
        let k = e.key.as_bytes();
        let matched = if flags & AV_DICT_IGNORE_SUFFIX != 0 {
            k.len() >= key.len() && same(&k[..key.len()], key)
        } else {
            same(k, key)
        };
        if matched {
            return &e.entry as *const AVDictionaryEntry as *mut AVDictionaryEntry;
        }
    }
    ptr::null_mut()
}

unsafe extern "C" fn dict_free(pm: *mut *mut AVDictionary) {
    if pm.is_null() || (*pm).is_null() {
        return;
    }
    drop(Box::from_raw(*pm as *mut FakeDict));
    *pm = ptr::null_mut();
}

// ============================================================================
// libavutil: frames
// ============================================================================

/// Buffers a painted frame owns, released when it is repainted or freed.
#[derive(Debug, Default)]
struct FrameExtras {
    allocations: Vec<usize>,
    metadata: usize,
    side_data: usize,
}

static FRAME_EXTRAS: Lazy<Mutex<HashMap<usize, FrameExtras>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

unsafe fn release_frame_extras(frame: *mut AVFrame) {
    let Some(extras) = FRAME_EXTRAS.lock().remove(&(frame as usize)) else {
        return;
    };
    for allocation in extras.allocations {
        libc::free(allocation as *mut c_void);
    }
    let mut metadata = extras.metadata as *mut AVDictionary;
    dict_free(&mut metadata);
}

fn frame_size(util_major: u32) -> usize {
    match util_major {
        54 => size_of::<AVFrame54>(),
        55 | 56 => size_of::<AVFrame55_56>(),
        _ => size_of::<AVFrame57_58>(),
    }
}

unsafe extern "C" fn frame_alloc<const M: u32>() -> *mut AVFrame {
    libc::calloc(1, frame_size(M)) as *mut AVFrame
}

unsafe extern "C" fn frame_free(frame: *mut *mut AVFrame) {
    if frame.is_null() || (*frame).is_null() {
        return;
    }
    release_frame_extras(*frame);
    libc::free(*frame as *mut c_void);
    *frame = ptr::null_mut();
}

unsafe extern "C" fn frame_get_side_data(frame: *const AVFrame, kind: c_int) -> *mut AVFrameSideData {
    if kind != AV_FRAME_DATA_MOTION_VECTORS {
        return ptr::null_mut();
    }
    FRAME_EXTRAS
        .lock()
        .get(&(frame as usize))
        .map_or(ptr::null_mut(), |extras| extras.side_data as *mut AVFrameSideData)
}

unsafe extern "C" fn frame_get_metadata(frame: *const AVFrame) -> *mut AVDictionary {
    FRAME_EXTRAS
        .lock()
        .get(&(frame as usize))
        .map_or(ptr::null_mut(), |extras| extras.metadata as *mut AVDictionary)
}

/// One decoded picture of the fake decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Picture {
    /// Also the value every luma sample is painted with.
    pub number: u8,
    pub pts: i64,
    pub key: bool,
}

macro_rules! fill_picture {
    ($f:expr, $picture:expr, $data:expr, $linesize:expr) => {{
        let f = $f;
        let picture: Picture = $picture;
        f.data = $data;
        f.linesize = $linesize;
        f.width = 64;
        f.height = 48;
        f.format = 0;
        f.key_frame = picture.key as c_int;
        f.pict_type = if picture.key { 1 } else { 2 };
        f.sample_aspect_ratio = AVRational::new(1, 1);
        f.pts = picture.pts;
        f.pkt_dts = picture.pts;
        f.coded_picture_number = picture.number as c_int;
        f.display_picture_number = picture.number as c_int;
    }};
}

/// Paints a 64x48 yuv420p picture into `frame`, laid out for `util_major`: luma filled with the
/// picture number, chroma with 128, plus frame metadata and optionally two motion vectors.
pub unsafe fn write_picture(util_major: u32, frame: *mut AVFrame, picture: Picture, motion_vectors: bool) {
    release_frame_extras(frame);
    let mut extras = FrameExtras::default();

    let mut data = [ptr::null_mut::<u8>(); AV_NUM_DATA_POINTERS];
    let mut linesize = [0 as c_int; AV_NUM_DATA_POINTERS];
    for (plane, (width, height, fill)) in [(64, 48, picture.number), (32, 24, 128), (32, 24, 128)]
        .into_iter()
        .enumerate()
    {
        let buffer = libc::calloc(1, width * height) as *mut u8;
        ptr::write_bytes(buffer, fill, width * height);
        extras.allocations.push(buffer as usize);
        data[plane] = buffer;
        linesize[plane] = width as c_int;
    }

    let metadata = new_dict(&[("fake.frame_number", &picture.number.to_string())]);
    extras.metadata = metadata as usize;
    let side_data = if motion_vectors {
        motion_vector_side_data(util_major, &mut extras)
    } else {
        ptr::null_mut()
    };
    extras.side_data = side_data as usize;

    match util_major {
        54 => {
            let f = &mut *(frame as *mut AVFrame54);
            fill_picture!(&mut *f, picture, data, linesize);
            f.pkt_pts = picture.pts;
        }
        55 | 56 => {
            let f = &mut *(frame as *mut AVFrame55_56);
            fill_picture!(&mut *f, picture, data, linesize);
            f.pkt_pts = picture.pts;
        }
        _ => {
            let f = &mut *(frame as *mut AVFrame57_58);
            fill_picture!(&mut *f, picture, data, linesize);
            f.time_base = AVRational::new(1, 25);
            f.best_effort_timestamp = picture.pts;
            f.pkt_duration = 1;
            f.colorspace = AVCOL_SPC_UNSPECIFIED;
            f.metadata = metadata;
            if side_data.is_null() {
                f.side_data = ptr::null_mut();
                f.nb_side_data = 0;
            } else {
                let list = libc::calloc(1, size_of::<*mut AVFrameSideData>()) as *mut *mut AVFrameSideData;
                *list = side_data;
                extras.allocations.push(list as usize);
                f.side_data = list;
                f.nb_side_data = 1;
            }
        }
    }

    FRAME_EXTRAS.lock().insert(frame as usize, extras);
}

unsafe fn motion_vector_side_data(util_major: u32, extras: &mut FrameExtras) -> *mut AVFrameSideData {
    // (source, src_x, src_y, dst_x, dst_y)
    let samples: [(i32, i16, i16, i16, i16); 2] = [(-1, 8, 8, 12, 8), (1, 24, 16, 20, 18)];

    let (data, size) = if util_major == 54 {
        let buffer = libc::calloc(samples.len(), size_of::<AVMotionVector54>()) as *mut AVMotionVector54;
        for (i, (source, src_x, src_y, dst_x, dst_y)) in samples.into_iter().enumerate() {
            ptr::write(
                buffer.add(i),
                AVMotionVector54 {
                    source,
                    w: 16,
                    h: 16,
                    src_x,
                    src_y,
                    dst_x,
                    dst_y,
                    flags: 0,
                },
            );
        }
        (buffer as *mut u8, samples.len() * size_of::<AVMotionVector54>())
    } else {
        let buffer =
            libc::calloc(samples.len(), size_of::<AVMotionVector55_58>()) as *mut AVMotionVector55_58;
        for (i, (source, src_x, src_y, dst_x, dst_y)) in samples.into_iter().enumerate() {
            ptr::write(
                buffer.add(i),
                AVMotionVector55_58 {
                    source,
                    w: 16,
                    h: 16,
                    src_x,
                    src_y,
                    dst_x,
                    dst_y,
                    flags: 0,
                    motion_x: (src_x - dst_x) as i32 * 4,
                    motion_y: (src_y - dst_y) as i32 * 4,
                    motion_scale: 4,
                },
            );
        }
        (buffer as *mut u8, samples.len() * size_of::<AVMotionVector55_58>())
    };
    extras.allocations.push(data as usize);

    let side_data = if util_major <= 56 {
        let sd = libc::calloc(1, size_of::<AVFrameSideData54_56>()) as *mut AVFrameSideData54_56;
        (*sd).type_ = AV_FRAME_DATA_MOTION_VECTORS;
        (*sd).data = data;
        (*sd).size = size as c_int;
        sd as *mut AVFrameSideData
    } else {
        let sd = libc::calloc(1, size_of::<AVFrameSideData57_58>()) as *mut AVFrameSideData57_58;
        (*sd).type_ = AV_FRAME_DATA_MOTION_VECTORS;
        (*sd).data = data;
        (*sd).size = size;
        sd as *mut AVFrameSideData
    };
    extras.allocations.push(side_data as usize);
    side_data
}

/// Paints picture `number` (a P frame with motion vectors) into an allocated frame.
pub fn paint_frame(session: &Session, frame: &Frame, number: u8, pts: i64) {
    let ptr = frame.as_ptr().expect("frame is allocated");
    let picture = Picture {
        number,
        pts,
        key: false,
    };
    unsafe { write_picture(session.major(Library::AvUtil), ptr, picture, true) };
}

// ============================================================================
// libavutil: pixel format descriptors
// ============================================================================

const PIX_PLANAR: u64 = 1 << 4;
const PIX_PAL: u64 = 1 << 1;
const PIX_RGB: u64 = 1 << 5;
const PIX_ALPHA: u64 = 1 << 7;

struct FakePixFmt {
    id: c_int,
    name: &'static CStr,
    nb_components: u8,
    log2_chroma_w: u8,
    log2_chroma_h: u8,
    flags: u64,
    comp: [ComponentDescriptor; 4],
}

fn component(plane: i32, step: i32, offset: i32, depth: i32) -> ComponentDescriptor {
    ComponentDescriptor {
        plane,
        step,
        offset,
        shift: 0,
        depth,
    }
}

fn planar_yuv(
    id: c_int,
    name: &'static CStr,
    nb_components: u8,
    shifts: (u8, u8),
    depth: i32,
) -> FakePixFmt {
    let step = if depth > 8 { 2 } else { 1 };
    let mut comp = [ComponentDescriptor::default(); 4];
    for (i, c) in comp.iter_mut().enumerate().take(nb_components as usize) {
        *c = component(i as i32, step, 0, depth);
    }
    let mut flags = PIX_PLANAR;
    if nb_components == 4 {
        flags |= PIX_ALPHA;
    }
    FakePixFmt {
        id,
        name,
        nb_components,
        log2_chroma_w: shifts.0,
        log2_chroma_h: shifts.1,
        flags,
        comp,
    }
}

/// The formats the fake avutil knows, in table order. There is deliberately no 4:4:0 entry.
fn fake_pix_fmts() -> Vec<FakePixFmt> {
    let none = ComponentDescriptor::default();
    vec![
        planar_yuv(0, c"yuv420p", 3, (1, 1), 8),
        FakePixFmt {
            id: 2,
            name: c"rgb24",
            nb_components: 3,
            log2_chroma_w: 0,
            log2_chroma_h: 0,
            flags: PIX_RGB,
            comp: [component(0, 3, 0, 8), component(0, 3, 1, 8), component(0, 3, 2, 8), none],
        },
        planar_yuv(4, c"yuv422p", 3, (1, 0), 8),
        planar_yuv(5, c"yuv444p", 3, (0, 0), 8),
        planar_yuv(7, c"yuv411p", 3, (2, 0), 8),
        FakePixFmt {
            id: 8,
            name: c"gray",
            nb_components: 1,
            log2_chroma_w: 0,
            log2_chroma_h: 0,
            flags: 0,
            comp: [component(0, 1, 0, 8), none, none, none],
        },
        FakePixFmt {
            id: 11,
            name: c"pal8",
            nb_components: 1,
            log2_chroma_w: 0,
            log2_chroma_h: 0,
            flags: PIX_PAL,
            comp: [component(0, 1, 0, 8), none, none, none],
        },
        planar_yuv(33, c"yuva420p", 4, (1, 1), 8),
        planar_yuv(64, c"yuv420p10le", 3, (1, 1), 10),
        FakePixFmt {
            id: 73,
            name: c"gbrp",
            nb_components: 3,
            log2_chroma_w: 0,
            log2_chroma_h: 0,
            flags: PIX_PLANAR | PIX_RGB,
            comp: [component(2, 1, 0, 8), component(0, 1, 0, 8), component(1, 1, 0, 8), none],
        },
    ]
}

/// Descriptor table of one layout family. Entries never move after construction.
struct PixFmtTable<T>(Vec<(c_int, T)>);

// Read-only after construction; the raw pointers inside point at static strings.
unsafe impl<T> Sync for PixFmtTable<T> {}
unsafe impl<T> Send for PixFmtTable<T> {}

static PIX_FMT_54: Lazy<PixFmtTable<AVPixFmtDescriptor54>> = Lazy::new(|| {
    PixFmtTable(
        fake_pix_fmts()
            .into_iter()
            .map(|f| {
                let mut comp = [AVComponentDescriptor54::default(); 4];
                for (packed, c) in comp.iter_mut().zip(&f.comp).take(f.nb_components as usize) {
                    *packed = AVComponentDescriptor54::pack(c);
                }
                let descriptor = AVPixFmtDescriptor54 {
                    name: f.name.as_ptr(),
                    nb_components: f.nb_components,
                    log2_chroma_w: f.log2_chroma_w,
                    log2_chroma_h: f.log2_chroma_h,
                    flags: f.flags as u8,
                    comp,
                    alias: ptr::null(),
                };
                (f.id, descriptor)
            })
            .collect(),
    )
});

static PIX_FMT_55_56: Lazy<PixFmtTable<AVPixFmtDescriptor55_56>> = Lazy::new(|| {
    PixFmtTable(
        fake_pix_fmts()
            .into_iter()
            .map(|f| {
                let mut comp = [AVComponentDescriptor55_56::default(); 4];
                for (out, c) in comp.iter_mut().zip(&f.comp).take(f.nb_components as usize) {
                    *out = AVComponentDescriptor55_56 {
                        plane: c.plane,
                        step: c.step,
                        offset: c.offset,
                        shift: c.shift,
                        depth: c.depth,
                        step_minus1: c.step - 1,
                        depth_minus1: c.depth - 1,
                        offset_plus1: c.offset + 1,
                    };
                }
                let descriptor = AVPixFmtDescriptor55_56 {
                    name: f.name.as_ptr(),
                    nb_components: f.nb_components,
                    log2_chroma_w: f.log2_chroma_w,
                    log2_chroma_h: f.log2_chroma_h,
                    flags: f.flags,
                    comp,
                    alias: ptr::null(),
                };
                (f.id, descriptor)
            })
            .collect(),
    )
});

static PIX_FMT_57_58: Lazy<PixFmtTable<AVPixFmtDescriptor57_58>> = Lazy::new(|| {
    PixFmtTable(
        fake_pix_fmts()
            .into_iter()
            .map(|f| {
                let mut comp = [AVComponentDescriptor57_58::default(); 4];
                for (out, c) in comp.iter_mut().zip(&f.comp).take(f.nb_components as usize) {
                    *out = AVComponentDescriptor57_58 {
                        plane: c.plane,
                        step: c.step,
                        offset: c.offset,
                        shift: c.shift,
                        depth: c.depth,
                    };
                }
                let descriptor = AVPixFmtDescriptor57_58 {
                    name: f.name.as_ptr(),
                    nb_components: f.nb_components,
                    log2_chroma_w: f.log2_chroma_w,
                    log2_chroma_h: f.log2_chroma_h,
                    flags: f.flags,
                    comp,
                    alias: ptr::null(),
                };
                (f.id, descriptor)
            })
            .collect(),
    )
});

fn entries_of<T>(table: &'static PixFmtTable<T>) -> Vec<(c_int, *const AVPixFmtDescriptor)> {
    table
        .0
        .iter()
        .map(|(id, d)| (*id, d as *const T as *const AVPixFmtDescriptor))
        .collect()
}

fn pix_fmt_entries(util_major: u32) -> Vec<(c_int, *const AVPixFmtDescriptor)> {
    match util_major {
        54 => entries_of(&PIX_FMT_54),
        55 | 56 => entries_of(&PIX_FMT_55_56),
        _ => entries_of(&PIX_FMT_57_58),
    }
}

unsafe extern "C" fn pix_fmt_desc_get<const M: u32>(id: c_int) -> *const AVPixFmtDescriptor {
    pix_fmt_entries(M)
        .into_iter()
        .find(|(entry_id, _)| *entry_id == id)
        .map_or(ptr::null(), |(_, d)| d)
}

unsafe extern "C" fn pix_fmt_desc_next<const M: u32>(
    prev: *const AVPixFmtDescriptor,
) -> *const AVPixFmtDescriptor {
    let entries = pix_fmt_entries(M);
    let next = if prev.is_null() {
        0
    } else {
        match entries.iter().position(|(_, d)| *d == prev) {
            Some(i) => i + 1,
            None => return ptr::null(),
        }
    };
    entries.get(next).map_or(ptr::null(), |(_, d)| *d)
}

unsafe extern "C" fn pix_fmt_desc_get_id<const M: u32>(desc: *const AVPixFmtDescriptor) -> c_int {
    pix_fmt_entries(M)
        .into_iter()
        .find(|(_, d)| *d == desc)
        .map_or(AV_PIX_FMT_NONE, |(id, _)| id)
}

// ============================================================================
// libavcodec
// ============================================================================

/// One byte per known codec id; decoders are addresses into it.
static CODECS: [u8; 28] = [0; 28];

fn codec_id_of(codec: *const AVCodec) -> c_int {
    if codec.is_null() {
        return 0;
    }
    (codec as usize).wrapping_sub(CODECS.as_ptr() as usize) as c_int
}

unsafe extern "C" fn find_decoder(codec_id: c_int) -> *const AVCodec {
    if (1..CODECS.len() as c_int).contains(&codec_id) {
        CODECS.as_ptr().add(codec_id as usize) as *const AVCodec
    } else {
        ptr::null()
    }
}

unsafe extern "C" fn get_name(codec_id: c_int) -> *const c_char {
    let name: &'static CStr = match codec_id {
        1 => c"mpeg1video",
        2 => c"mpeg2video",
        3 => c"h261",
        4 => c"h263",
        5 => c"rv10",
        6 => c"rv20",
        7 => c"mjpeg",
        8 => c"mjpegb",
        9 => c"ljpeg",
        10 => c"sp5x",
        11 => c"jpegls",
        12 => c"mpeg4",
        13 => c"rawvideo",
        14 => c"msmpeg4v1",
        15 => c"msmpeg4v2",
        16 => c"msmpeg4v3",
        17 => c"wmv1",
        18 => c"wmv2",
        19 => c"h263p",
        20 => c"h263i",
        21 => c"flv1",
        22 => c"svq1",
        23 => c"svq3",
        24 => c"dvvideo",
        25 => c"huffyuv",
        26 => c"cyuv",
        27 => c"h264",
        86018 => c"aac",
        94209 => c"dvb_subtitle",
        0x17801 => c"eia_608",
        _ => c"unknown_codec",
    };
    name.as_ptr()
}

fn codec_context_size(codec_major: u32) -> usize {
    match codec_major {
        56 => size_of::<AVCodecContext56>(),
        57 => size_of::<AVCodecContext57>(),
        58 => size_of::<AVCodecContext58>(),
        _ => size_of::<AVCodecContext59_60>(),
    }
}

/// Codec setup the fake demuxer gives its streams.
struct CodecSetup {
    media: MediaType,
    codec_id: c_int,
    width: c_int,
    height: c_int,
    format: c_int,
    delay: c_int,
    extradata: Vec<u8>,
    profile: c_int,
    level: c_int,
}

impl CodecSetup {
    fn video(delay: c_int) -> Self {
        Self {
            media: MediaType::Video,
            codec_id: 27,
            width: 64,
            height: 48,
            format: 0,
            delay,
            extradata: vec![1, 0x64, 0, 0x1f],
            profile: 100,
            level: 31,
        }
    }

    fn audio() -> Self {
        Self {
            media: MediaType::Audio,
            codec_id: 86018,
            width: 0,
            height: 0,
            format: 8,
            delay: 0,
            extradata: Vec::new(),
            profile: 1,
            level: -99,
        }
    }
}

unsafe fn dup_padded(data: *const u8, size: c_int) -> *mut u8 {
    if data.is_null() || size <= 0 {
        return ptr::null_mut();
    }
    let copy = libc::calloc(1, size as usize + AV_INPUT_BUFFER_PADDING_SIZE) as *mut u8;
    ptr::copy_nonoverlapping(data, copy, size as usize);
    copy
}

unsafe fn alloc_codec_context(codec_major: u32, setup: Option<&CodecSetup>) -> *mut AVCodecContext {
    let ctx = libc::calloc(1, codec_context_size(codec_major)) as *mut AVCodecContext;
    if let Ok(view) = codec_context_view(codec_major) {
        let mut f = view.read(ctx);
        f.codec_type = MediaType::Unknown.to_raw();
        f.pix_fmt = AV_PIX_FMT_NONE;
        f.sample_aspect_ratio = AVRational::new(0, 1);
        if let Some(setup) = setup {
            f.codec_type = setup.media.to_raw();
            f.codec_id = setup.codec_id;
            f.width = setup.width;
            f.height = setup.height;
            f.pix_fmt = setup.format;
            f.has_b_frames = setup.delay;
            f.sample_aspect_ratio = AVRational::new(1, 1);
            f.extradata = dup_padded(setup.extradata.as_ptr(), setup.extradata.len() as c_int);
            f.extradata_size = setup.extradata.len() as c_int;
        }
        view.write(ctx, &f);
    }
    ctx
}

unsafe fn free_codec_context(ctx: *mut AVCodecContext, codec_major: u32) {
    if ctx.is_null() {
        return;
    }
    DECODERS.lock().remove(&(ctx as usize));
    if let Ok(view) = codec_context_view(codec_major) {
        libc::free(view.read(ctx).extradata as *mut c_void);
    }
    libc::free(ctx as *mut c_void);
}

unsafe extern "C" fn alloc_context3<const M: u32>(codec: *const AVCodec) -> *mut AVCodecContext {
    let ctx = alloc_codec_context(M, None);
    let codec_id = codec_id_of(codec);
    if codec_id != 0 {
        if let Ok(view) = codec_context_view(M) {
            let mut f = view.read(ctx);
            f.codec_type = MediaType::Video.to_raw();
            f.codec_id = codec_id;
            view.write(ctx, &f);
        }
    }
    ctx
}

unsafe extern "C" fn free_context<const M: u32>(ctx: *mut *mut AVCodecContext) {
    if ctx.is_null() {
        return;
    }
    free_codec_context(*ctx, M);
    *ctx = ptr::null_mut();
}

/// Decoder state of one opened context. Pictures leave in arrival order once more than
/// `delay` are held.
#[derive(Debug, Default)]
struct DecoderState {
    delay: usize,
    export_mvs: bool,
    held: VecDeque<Picture>,
    ready: VecDeque<Picture>,
    flushed: bool,
}

static DECODERS: Lazy<Mutex<HashMap<usize, DecoderState>>> = Lazy::new(|| Mutex::new(HashMap::new()));

unsafe extern "C" fn open2<const M: u32>(
    ctx: *mut AVCodecContext,
    _codec: *const AVCodec,
    options: *mut *mut AVDictionary,
) -> c_int {
    if ctx.is_null() {
        return EINVAL;
    }
    let delay = match codec_context_view(M) {
        Ok(view) => view.read(ctx).has_b_frames.max(0) as usize,
        Err(_) => return EINVAL,
    };
    let mut export_mvs = false;
    if !options.is_null() {
        if let Some(flags2) = dict_value(*options, c"flags2") {
            export_mvs = flags2.contains("export_mvs");
            dict_set(options, c"flags2".as_ptr(), ptr::null(), 0);
        }
    }
    DECODERS.lock().insert(
        ctx as usize,
        DecoderState {
            delay,
            export_mvs,
            ..DecoderState::default()
        },
    );
    0
}

unsafe extern "C" fn flush_buffers(ctx: *mut AVCodecContext) {
    if let Some(state) = DECODERS.lock().get_mut(&(ctx as usize)) {
        state.held.clear();
        state.ready.clear();
        state.flushed = false;
    }
}

/// The picture a packet decodes to, with the packet size. Empty packets give `None`.
unsafe fn picture_of<const M: u32>(packet: *const AVPacket) -> Option<(Picture, c_int)> {
    if packet.is_null() {
        return None;
    }
    let f = packet_view(M).ok()?.read(packet);
    if f.data.is_null() || f.size <= 0 {
        return None;
    }
    let payload = std::slice::from_raw_parts(f.data, f.size as usize);
    let picture = Picture {
        number: payload.get(5).copied().unwrap_or(f.pts as u8),
        pts: f.pts,
        key: f.flags & AV_PKT_FLAG_KEY != 0,
    };
    Some((picture, f.size))
}

unsafe extern "C" fn send_packet<const M: u32>(ctx: *mut AVCodecContext, packet: *const AVPacket) -> c_int {
    let picture = picture_of::<M>(packet);
    let mut decoders = DECODERS.lock();
    let Some(state) = decoders.get_mut(&(ctx as usize)) else {
        return EINVAL;
    };
    if state.flushed {
        return AVERROR_EOF;
    }
    match picture {
        None => {
            state.flushed = true;
            let held = std::mem::take(&mut state.held);
            state.ready.extend(held);
        }
        Some((picture, _)) => {
            if !state.ready.is_empty() {
                return AVERROR_EAGAIN;
            }
            state.held.push_back(picture);
            if state.held.len() > state.delay {
                if let Some(out) = state.held.pop_front() {
                    state.ready.push_back(out);
                }
            }
        }
    }
    0
}

unsafe extern "C" fn receive_frame<const M: u32>(ctx: *mut AVCodecContext, frame: *mut AVFrame) -> c_int {
    let (picture, export_mvs) = {
        let mut decoders = DECODERS.lock();
        let Some(state) = decoders.get_mut(&(ctx as usize)) else {
            return EINVAL;
        };
        match state.ready.pop_front() {
            Some(picture) => (picture, state.export_mvs),
            None if state.flushed => return AVERROR_EOF,
            None => return AVERROR_EAGAIN,
        }
    };
    write_picture(M.saturating_sub(2), frame, picture, export_mvs);
    0
}

unsafe extern "C" fn decode_video2<const M: u32>(
    ctx: *mut AVCodecContext,
    frame: *mut AVFrame,
    got_picture: *mut c_int,
    packet: *const AVPacket,
) -> c_int {
    if !got_picture.is_null() {
        *got_picture = 0;
    }
    let input = picture_of::<M>(packet);
    let (output, export_mvs, consumed) = {
        let mut decoders = DECODERS.lock();
        let Some(state) = decoders.get_mut(&(ctx as usize)) else {
            return EINVAL;
        };
        match input {
            Some((picture, size)) => {
                state.held.push_back(picture);
                let output = if state.held.len() > state.delay {
                    state.held.pop_front()
                } else {
                    None
                };
                (output, state.export_mvs, size)
            }
            None => (state.held.pop_front(), state.export_mvs, 0),
        }
    };
    if let Some(picture) = output {
        write_picture(M.saturating_sub(2), frame, picture, export_mvs);
        if !got_picture.is_null() {
            *got_picture = 1;
        }
    }
    consumed
}

/// Payloads handed out by the fake demuxer, keyed by the packet that points at them.
static PACKET_PAYLOADS: Lazy<Mutex<HashMap<usize, Vec<u8>>>> = Lazy::new(|| Mutex::new(HashMap::new()));

unsafe fn reset_packet<const M: u32>(packet: *mut AVPacket, clear_data: bool) {
    let Ok(view) = packet_view(M) else {
        return;
    };
    let mut f = view.read(packet);
    f.pts = AV_NOPTS_VALUE;
    f.dts = AV_NOPTS_VALUE;
    f.flags = 0;
    f.stream_index = 0;
    f.duration = 0;
    if clear_data {
        f.data = ptr::null_mut();
        f.size = 0;
    }
    view.write(packet, &f);
}

unsafe extern "C" fn packet_alloc<const M: u32>() -> *mut AVPacket {
    let packet = libc::calloc(1, 128) as *mut AVPacket;
    reset_packet::<M>(packet, true);
    packet
}

unsafe extern "C" fn init_packet<const M: u32>(packet: *mut AVPacket) {
    if !packet.is_null() {
        reset_packet::<M>(packet, false);
    }
}

unsafe extern "C" fn packet_unref<const M: u32>(packet: *mut AVPacket) {
    if packet.is_null() {
        return;
    }
    PACKET_PAYLOADS.lock().remove(&(packet as usize));
    reset_packet::<M>(packet, true);
}

unsafe extern "C" fn packet_free(packet: *mut *mut AVPacket) {
    if packet.is_null() || (*packet).is_null() {
        return;
    }
    PACKET_PAYLOADS.lock().remove(&(*packet as usize));
    libc::free(*packet as *mut c_void);
    *packet = ptr::null_mut();
}

unsafe fn alloc_parameters(codec_major: u32, setup: Option<&CodecSetup>) -> *mut AVCodecParameters {
    let par = libc::calloc(1, size_of::<AVCodecParameters57_60>()) as *mut AVCodecParameters;
    if let Ok(view) = codec_parameters_view(codec_major) {
        let mut f = CodecParametersFields::cleared();
        if let Some(setup) = setup {
            f.codec_type = setup.media.to_raw();
            f.codec_id = setup.codec_id;
            f.width = setup.width;
            f.height = setup.height;
            f.format = setup.format;
            f.video_delay = setup.delay;
            f.profile = setup.profile;
            f.level = setup.level;
            f.extradata = dup_padded(setup.extradata.as_ptr(), setup.extradata.len() as c_int);
            f.extradata_size = setup.extradata.len() as c_int;
        }
        view.write(par, &f);
    }
    par
}

unsafe fn free_parameters(par: *mut AVCodecParameters, codec_major: u32) {
    if par.is_null() {
        return;
    }
    if let Ok(view) = codec_parameters_view(codec_major) {
        libc::free(view.read(par).extradata as *mut c_void);
    }
    libc::free(par as *mut c_void);
}

unsafe extern "C" fn parameters_alloc<const M: u32>() -> *mut AVCodecParameters {
    alloc_parameters(M, None)
}

unsafe extern "C" fn parameters_free<const M: u32>(par: *mut *mut AVCodecParameters) {
    if par.is_null() {
        return;
    }
    free_parameters(*par, M);
    *par = ptr::null_mut();
}

unsafe extern "C" fn parameters_to_context<const M: u32>(
    ctx: *mut AVCodecContext,
    par: *const AVCodecParameters,
) -> c_int {
    let (Ok(ctx_view), Ok(par_view)) = (codec_context_view(M), codec_parameters_view(M)) else {
        return EINVAL;
    };
    if ctx.is_null() || par.is_null() {
        return EINVAL;
    }
    let p = par_view.read(par);
    let mut f = ctx_view.read(ctx);
    let old = f.extradata;
    f.codec_type = p.codec_type;
    f.codec_id = p.codec_id;
    f.codec_tag = p.codec_tag;
    f.bit_rate = p.bit_rate;
    f.width = p.width;
    f.height = p.height;
    f.pix_fmt = p.format;
    f.has_b_frames = p.video_delay;
    f.sample_aspect_ratio = p.sample_aspect_ratio;
    f.color_primaries = p.color_primaries;
    f.color_trc = p.color_trc;
    f.colorspace = p.color_space;
    f.color_range = p.color_range;
    f.chroma_sample_location = p.chroma_location;
    f.extradata = dup_padded(p.extradata, p.extradata_size);
    f.extradata_size = if f.extradata.is_null() { 0 } else { p.extradata_size };
    ctx_view.write(ctx, &f);
    libc::free(old as *mut c_void);
    0
}

/// An opened fake decoder with a frame, driven directly through a function table.
pub struct FakeDecoderHandle {
    table: FunctionTable,
    major: u32,
    ctx: *mut AVCodecContext,
    frame: *mut AVFrame,
    packets: RefCell<Vec<*mut AVPacket>>,
    payloads: RefCell<Vec<Vec<u8>>>,
}

impl FakeDecoderHandle {
    /// Opens an h264 decoder of `codec_major` holding `delay` pictures back.
    pub fn open(table: &FunctionTable, codec_major: u32, delay: i32) -> Self {
        unsafe {
            let codec = (table.avcodec.avcodec_find_decoder)(27);
            let ctx = (table.avcodec.avcodec_alloc_context3)(codec);
            let view = codec_context_view(codec_major).unwrap();
            let mut fields = view.read(ctx);
            fields.has_b_frames = delay;
            view.write(ctx, &fields);
            assert_eq!((table.avcodec.avcodec_open2)(ctx, codec, ptr::null_mut()), 0);
            Self {
                table: *table,
                major: codec_major,
                ctx,
                frame: (table.avutil.av_frame_alloc)(),
                packets: RefCell::new(Vec::new()),
                payloads: RefCell::new(Vec::new()),
            }
        }
    }

    pub fn ctx(&self) -> *mut AVCodecContext {
        self.ctx
    }

    pub fn frame(&self) -> *mut AVFrame {
        self.frame
    }

    /// A new packet carrying picture `i`; the first one is a keyframe.
    pub fn packet(&self, i: usize) -> *const AVPacket {
        let key = i == 0;
        let mut payload = vec![0, 0, 0, 1, if key { 0x65 } else { 0x41 }, i as u8, 0x88, 0x84];
        let size = payload.len();
        payload.resize(size + AV_INPUT_BUFFER_PADDING_SIZE, 0);
        unsafe {
            let packet = (self.table.avcodec.av_packet_alloc)();
            let view = packet_view(self.major).unwrap();
            let mut fields = view.read(packet);
            fields.pts = i as i64;
            fields.dts = i as i64;
            fields.data = payload.as_mut_ptr();
            fields.size = size as c_int;
            fields.flags = if key { AV_PKT_FLAG_KEY } else { 0 };
            view.write(packet, &fields);
            self.payloads.borrow_mut().push(payload);
            self.packets.borrow_mut().push(packet);
            packet
        }
    }
}

impl Drop for FakeDecoderHandle {
    fn drop(&mut self) {
        unsafe {
            for mut packet in self.packets.borrow_mut().drain(..) {
                (self.table.avcodec.av_packet_free)(&mut packet);
            }
            (self.table.avutil.av_frame_free)(&mut self.frame);
            (self.table.avcodec.avcodec_free_context)(&mut self.ctx);
        }
    }
}

// ============================================================================
// libavformat
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct FakeInput {
    frames: i64,
    gop: i64,
    delay: c_int,
    audio: bool,
}

fn parse_fake_url(url: &str) -> Result<FakeInput, c_int> {
    let options = url.strip_prefix("fake:").ok_or(ENOENT)?;
    let mut input = FakeInput {
        frames: 10,
        gop: 12,
        delay: 0,
        audio: false,
    };
    for option in options.split(',').filter(|o| !o.is_empty()) {
        let (key, value) = option.split_once('=').ok_or(EINVAL)?;
        let value: i64 = value.parse().map_err(|_| EINVAL)?;
        match key {
            "frames" => input.frames = value.max(0),
            "gop" => input.gop = value.max(1),
            "delay" => input.delay = value as c_int,
            "audio" => input.audio = value != 0,
            _ => return Err(EINVAL),
        }
    }
    Ok(input)
}

/// Everything one opened fake input owns.
#[derive(Debug)]
struct FormatState {
    input: FakeInput,
    video_index: c_int,
    /// `(stream index, frame)` in read order.
    schedule: Vec<(c_int, i64)>,
    position: usize,
    codec_major: u32,
    allocations: Vec<usize>,
    dictionaries: Vec<usize>,
    codec_contexts: Vec<usize>,
    parameters: Vec<usize>,
}

static FORMATS: Lazy<Mutex<HashMap<usize, FormatState>>> = Lazy::new(|| Mutex::new(HashMap::new()));

macro_rules! fill_stream {
    ($s:expr, $index:expr, $frames:expr, $video:expr, $metadata:expr) => {{
        let s = $s;
        s.index = $index;
        s.id = $index + 1;
        s.time_base = AVRational::new(1, 25);
        s.start_time = 0;
        s.duration = $frames;
        s.nb_frames = $frames;
        s.disposition = if $video { 1 } else { 0 };
        s.sample_aspect_ratio = AVRational::new(1, 1);
        s.metadata = $metadata;
        s.avg_frame_rate = if $video {
            AVRational::new(25, 1)
        } else {
            AVRational::new(0, 1)
        };
    }};
}

unsafe fn build_stream<const M: u32>(state: &mut FormatState, index: c_int, video: bool) -> *mut AVStream {
    let setup = if video {
        CodecSetup::video(state.input.delay)
    } else {
        CodecSetup::audio()
    };
    let frames = state.input.frames;
    let metadata = new_dict(&[("language", "und")]);
    state.dictionaries.push(metadata as usize);

    let codec = if M < 59 {
        let ctx = alloc_codec_context(M, Some(&setup));
        state.codec_contexts.push(ctx as usize);
        ctx
    } else {
        ptr::null_mut()
    };
    let codecpar = if M >= 57 {
        let par = alloc_parameters(M, Some(&setup));
        state.parameters.push(par as usize);
        par
    } else {
        ptr::null_mut()
    };
    let r_frame_rate = AVRational::new(25, 1);

    let stream: *mut AVStream = match M {
        56 => {
            let s = libc::calloc(1, size_of::<AVStream56>()) as *mut AVStream56;
            fill_stream!(&mut *s, index, frames, video, metadata);
            (*s).codec = codec;
            s as *mut AVStream
        }
        57 => {
            let s = libc::calloc(1, size_of::<AVStream57>()) as *mut AVStream57;
            fill_stream!(&mut *s, index, frames, video, metadata);
            (*s).codec = codec;
            (*s).codecpar = codecpar;
            (*s).r_frame_rate = r_frame_rate;
            s as *mut AVStream
        }
        58 => {
            let s = libc::calloc(1, size_of::<AVStream58>()) as *mut AVStream58;
            fill_stream!(&mut *s, index, frames, video, metadata);
            (*s).codec = codec;
            (*s).codecpar = codecpar;
            (*s).r_frame_rate = r_frame_rate;
            s as *mut AVStream
        }
        _ => {
            let s = libc::calloc(1, size_of::<AVStream59_60>()) as *mut AVStream59_60;
            fill_stream!(&mut *s, index, frames, video, metadata);
            (*s).codecpar = codecpar;
            (*s).r_frame_rate = r_frame_rate;
            s as *mut AVStream
        }
    };
    state.allocations.push(stream as usize);
    stream
}

macro_rules! fill_format {
    ($c:expr, $streams:expr, $count:expr, $frames:expr, $metadata:expr) => {{
        let c = $c;
        c.nb_streams = $count as c_uint;
        c.streams = $streams;
        c.start_time = 0;
        c.duration = $frames * 40_000;
        c.bit_rate = 1_000_000 as _;
        c.probesize = 5_000_000 as _;
        c.metadata = $metadata;
    }};
}

fn write_filename(target: &mut [c_char; 1024], url: &str) {
    for (t, b) in target.iter_mut().zip(url.bytes().take(1023)) {
        *t = b as c_char;
    }
}

unsafe fn build_format_context<const M: u32>(url: &CStr, input: FakeInput) -> Option<*mut AVFormatContext> {
    if !matches!(M, 56..=60) {
        return None;
    }
    let video_index: c_int = if input.audio { 1 } else { 0 };
    let mut schedule = Vec::new();
    for frame in 0..input.frames {
        if input.audio {
            schedule.push((0, frame));
        }
        schedule.push((video_index, frame));
    }
    let mut state = FormatState {
        input,
        video_index,
        schedule,
        position: 0,
        codec_major: M,
        allocations: Vec::new(),
        dictionaries: Vec::new(),
        codec_contexts: Vec::new(),
        parameters: Vec::new(),
    };

    let count = video_index as usize + 1;
    let streams = libc::calloc(count, size_of::<*mut AVStream>()) as *mut *mut AVStream;
    state.allocations.push(streams as usize);
    if input.audio {
        *streams = build_stream::<M>(&mut state, 0, false);
    }
    *streams.add(video_index as usize) = build_stream::<M>(&mut state, video_index, true);

    let metadata = new_dict(&[("title", "fake input")]);
    state.dictionaries.push(metadata as usize);
    let url_text = url.to_string_lossy();

    let ctx: *mut AVFormatContext = match M {
        56 => {
            let c = libc::calloc(1, size_of::<AVFormatContext56>()) as *mut AVFormatContext56;
            fill_format!(&mut *c, streams, count, input.frames, metadata);
            write_filename(&mut (*c).filename, &url_text);
            c as *mut AVFormatContext
        }
        57 => {
            let c = libc::calloc(1, size_of::<AVFormatContext57>()) as *mut AVFormatContext57;
            fill_format!(&mut *c, streams, count, input.frames, metadata);
            write_filename(&mut (*c).filename, &url_text);
            c as *mut AVFormatContext
        }
        58 => {
            let c = libc::calloc(1, size_of::<AVFormatContext58>()) as *mut AVFormatContext58;
            fill_format!(&mut *c, streams, count, input.frames, metadata);
            write_filename(&mut (*c).filename, &url_text);
            (*c).url = libc::strdup(url.as_ptr());
            state.allocations.push((*c).url as usize);
            c as *mut AVFormatContext
        }
        _ => {
            let c = libc::calloc(1, size_of::<AVFormatContext59_60>()) as *mut AVFormatContext59_60;
            fill_format!(&mut *c, streams, count, input.frames, metadata);
            (*c).url = libc::strdup(url.as_ptr());
            state.allocations.push((*c).url as usize);
            c as *mut AVFormatContext
        }
    };
    FORMATS.lock().insert(ctx as usize, state);
    Some(ctx)
}

unsafe extern "C" fn register_all() {}

unsafe extern "C" fn open_input<const M: u32>(
    ctx: *mut *mut AVFormatContext,
    url: *const c_char,
    _format: *const AVInputFormat,
    _options: *mut *mut AVDictionary,
) -> c_int {
    if ctx.is_null() || url.is_null() {
        return EINVAL;
    }
    let url = CStr::from_ptr(url);
    let input = match parse_fake_url(&url.to_string_lossy()) {
        Ok(input) => input,
        Err(code) => return code,
    };
    match build_format_context::<M>(url, input) {
        Some(opened) => {
            *ctx = opened;
            0
        }
        None => EINVAL,
    }
}

unsafe extern "C" fn close_input<const M: u32>(ctx: *mut *mut AVFormatContext) {
    if ctx.is_null() || (*ctx).is_null() {
        return;
    }
    let state = FORMATS.lock().remove(&(*ctx as usize));
    if let Some(state) = state {
        for dict in state.dictionaries {
            let mut dict = dict as *mut AVDictionary;
            dict_free(&mut dict);
        }
        for codec_ctx in state.codec_contexts {
            free_codec_context(codec_ctx as *mut AVCodecContext, state.codec_major);
        }
        for par in state.parameters {
            free_parameters(par as *mut AVCodecParameters, state.codec_major);
        }
        for allocation in state.allocations {
            libc::free(allocation as *mut c_void);
        }
    }
    libc::free(*ctx as *mut c_void);
    *ctx = ptr::null_mut();
}

unsafe extern "C" fn find_stream_info(ctx: *mut AVFormatContext, _options: *mut *mut AVDictionary) -> c_int {
    if FORMATS.lock().contains_key(&(ctx as usize)) {
        0
    } else {
        EINVAL
    }
}

unsafe extern "C" fn read_frame<const M: u32>(ctx: *mut AVFormatContext, packet: *mut AVPacket) -> c_int {
    let (stream, frame, video, key) = {
        let mut formats = FORMATS.lock();
        let Some(state) = formats.get_mut(&(ctx as usize)) else {
            return EINVAL;
        };
        let Some(&(stream, frame)) = state.schedule.get(state.position) else {
            return AVERROR_EOF;
        };
        state.position += 1;
        let video = stream == state.video_index;
        (stream, frame, video, !video || frame % state.input.gop == 0)
    };

    let mut payload = if video {
        vec![0, 0, 0, 1, if key { 0x65 } else { 0x41 }, frame as u8, 0x88, 0x84]
    } else {
        vec![0xff, 0xf1, 0x50, 0x80]
    };
    let size = payload.len();
    payload.resize(size + AV_INPUT_BUFFER_PADDING_SIZE, 0);

    let Ok(view) = packet_view(M) else {
        return EINVAL;
    };
    let mut f = view.read(packet);
    f.pts = frame;
    f.dts = frame;
    f.data = payload.as_mut_ptr();
    f.size = size as c_int;
    f.stream_index = stream;
    f.flags = if key { AV_PKT_FLAG_KEY } else { 0 };
    f.duration = 1;
    view.write(packet, &f);
    PACKET_PAYLOADS.lock().insert(packet as usize, payload);
    0
}

/// Seeks to the keyframe at or before `ts`: stream time base for a stream index, microseconds
/// for -1.
unsafe extern "C" fn seek_frame(ctx: *mut AVFormatContext, stream_index: c_int, ts: i64, _flags: c_int) -> c_int {
    let mut formats = FORMATS.lock();
    let Some(state) = formats.get_mut(&(ctx as usize)) else {
        return EINVAL;
    };
    let last = (state.input.frames - 1).max(0);
    let target = if stream_index >= 0 {
        ts
    } else {
        ts.saturating_mul(25) / 1_000_000
    };
    let keyframe = target.clamp(0, last) / state.input.gop * state.input.gop;
    state.position = state
        .schedule
        .iter()
        .position(|(_, frame)| *frame == keyframe)
        .unwrap_or(state.schedule.len());
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_parsing() {
        assert_eq!(major_of("libavcodec-ffmpeg.so.60"), Some(60));
        assert_eq!(major_of("avformat-59.dll"), Some(59));
        assert_eq!(major_of("libswresample.4.dylib"), Some(4));
        assert_eq!(library_of("libavutil.so.58"), Some(Library::AvUtil));
        assert_eq!(library_of("libpostproc.so.57"), None);
    }

    #[test]
    fn test_fake_url_options() {
        let input = parse_fake_url("fake:frames=6,gop=3,audio=1").unwrap();
        assert_eq!((input.frames, input.gop, input.audio), (6, 3, true));
        assert_eq!(parse_fake_url("/tmp/movie.mp4").unwrap_err(), ENOENT);
        assert_eq!(parse_fake_url("fake:speed=2").unwrap_err(), EINVAL);
    }
}
