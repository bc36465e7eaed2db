//! # Decode Dispatcher
//!
//! Drives one input from open to close:
//!
//! ```text
//! Closed -> Opened -> StreamSelected -> DecoderConfigured -> Decoding -> Draining -> Closed
//! ```
//!
//! A dispatcher owns its format context, codec context, packet, frame and decode strategy, and
//! must be driven from one thread at a time. Concurrent decoding of the same file uses separate
//! dispatchers over the same [`Session`].
//!
//! "Need more input" from the decoder is never an error; the dispatcher reads the next packet.
//! Any other native failure is returned as is, without retry.

use serde::Serialize;

use crate::bitstream::{Keyframe, KeyframeIndex, PacketType, StreamIndices};
use crate::error::{AvError, Result};
use crate::facade::codec_context::Decoder;
use crate::facade::{
    CodecContext, Dictionary, DictionaryEntry, FormatContext, Frame, FrameInfo, MotionVector,
    Packet, Plane,
};
use crate::ffi::{AVRational, MediaType, AVSEEK_FLAG_BACKWARD, AV_NOPTS_VALUE};
use crate::session::Session;
use crate::strategy::{self, DecodeStrategy, ReceiveOutcome, SendOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DispatchState {
    Closed,
    Opened,
    StreamSelected,
    DecoderConfigured,
    Decoding,
    Draining,
}

impl DispatchState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Opened => "opened",
            Self::StreamSelected => "stream selected",
            Self::DecoderConfigured => "decoder configured",
            Self::Decoding => "decoding",
            Self::Draining => "draining",
        }
    }

    fn can_decode(&self) -> bool {
        matches!(
            self,
            Self::DecoderConfigured | Self::Decoding | Self::Draining
        )
    }
}

/// Counters kept across the dispatcher's lifetime, including after it closed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    pub packets_read: u64,
    pub video_packets: u64,
    pub frames_decoded: u64,
    pub seeks: u64,
    /// Code of the last native call that failed.
    pub last_native_code: Option<i32>,
}

/// One decoded picture, copied out of the dispatcher's frame.
#[derive(Debug, Clone, Serialize)]
pub struct DecodedPicture {
    /// Position in output order since the decoder was configured or last seeked.
    pub frame_number: u64,
    pub info: FrameInfo,
    #[serde(skip)]
    pub planes: Vec<Plane>,
    pub motion_vectors: Vec<MotionVector>,
    pub metadata: Vec<DictionaryEntry>,
}

pub struct DecodeDispatcher {
    session: Session,
    state: DispatchState,
    format: Option<FormatContext>,
    indices: StreamIndices,
    time_base: AVRational,
    codec_name: String,
    codec: Option<CodecContext<'static>>,
    packet: Option<Packet>,
    frame: Option<Frame>,
    strategy: Option<Box<dyn DecodeStrategy>>,
    /// The packet in `packet` was refused with "again" and has to be offered once more.
    pending: bool,
    output_count: u64,
    keyframes: Option<KeyframeIndex>,
    stats: DispatchStats,
}

impl DecodeDispatcher {
    pub fn new(session: &Session) -> Self {
        Self {
            session: session.clone(),
            state: DispatchState::Closed,
            format: None,
            indices: StreamIndices::default(),
            time_base: AVRational::new(0, 1),
            codec_name: String::new(),
            codec: None,
            packet: None,
            frame: None,
            strategy: None,
            pending: false,
            output_count: 0,
            keyframes: None,
            stats: DispatchStats::default(),
        }
    }

    /// Opens `url`, selects its video stream and configures a decoder for it.
    pub fn open_video(session: &Session, url: &str) -> Result<Self> {
        let mut dispatcher = Self::new(session);
        dispatcher.open(url)?;
        dispatcher.select_video_stream()?;
        dispatcher.configure_decoder()?;
        Ok(dispatcher)
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    pub fn stream_indices(&self) -> &StreamIndices {
        &self.indices
    }

    /// Time base of the video stream; timestamps passed to [`DecodeDispatcher::seek`] use it.
    pub fn time_base(&self) -> AVRational {
        self.time_base
    }

    pub fn codec_name(&self) -> &str {
        &self.codec_name
    }

    pub fn strategy_name(&self) -> Option<&'static str> {
        self.strategy.as_ref().map(|s| s.name())
    }

    pub fn format(&self) -> Option<&FormatContext> {
        self.format.as_ref()
    }

    pub fn keyframes(&self) -> Option<&KeyframeIndex> {
        self.keyframes.as_ref()
    }

    fn expect_state(&self, operation: &'static str, allowed: &[DispatchState]) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(AvError::InvalidState {
                operation,
                state: self.state.name(),
            })
        }
    }

    fn not_in(&self, operation: &'static str) -> AvError {
        AvError::InvalidState {
            operation,
            state: self.state.name(),
        }
    }

    fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(AvError::Native { code, .. }) = &result {
            self.stats.last_native_code = Some(*code);
        }
        result
    }

    fn transition(&mut self, next: DispatchState) {
        if self.state != next {
            tracing::trace!("Dispatcher {} -> {}", self.state.name(), next.name());
            self.state = next;
        }
    }

    // ========================================================================
    // Setup
    // ========================================================================

    pub fn open(&mut self, url: &str) -> Result<()> {
        self.expect_state("open an input", &[DispatchState::Closed])?;
        let opened = FormatContext::open(&self.session, url);
        let format = self.track(opened)?;
        self.format = Some(format);
        self.indices = StreamIndices::default();
        self.keyframes = None;
        self.transition(DispatchState::Opened);
        Ok(())
    }

    /// Probes stream info and groups the streams by packet type. Fails with
    /// [`AvError::NoVideoStream`] and stays opened when there is no video.
    pub fn select_video_stream(&mut self) -> Result<usize> {
        self.expect_state("select a stream", &[DispatchState::Opened])?;
        let format = self.format.as_mut().ok_or_else(|| AvError::EmptyHandle {
            entity: "AVFormatContext",
        })?;
        let probed = format.find_stream_info();
        self.track(probed)?;

        let format = self.format.as_ref().ok_or_else(|| AvError::EmptyHandle {
            entity: "AVFormatContext",
        })?;
        let indices = classify_streams(format)?;
        let video = indices.video.ok_or(AvError::NoVideoStream)?;
        let time_base = format.stream(video)?.time_base()?;

        tracing::debug!(
            "Video stream {} (time base {}), {} audio, {} subtitle streams",
            video,
            time_base,
            indices.audio.len(),
            indices.subtitle_dvb.len() + indices.subtitle_608.len() + indices.subtitle_other.len()
        );
        self.indices = indices;
        self.time_base = time_base;
        self.transition(DispatchState::StreamSelected);
        Ok(video)
    }

    /// Finds and opens a decoder for the selected stream, passing the session's decoder options.
    pub fn configure_decoder(&mut self) -> Result<()> {
        self.expect_state("configure a decoder", &[DispatchState::StreamSelected])?;
        let configured = self.build_decoder();
        let (codec, codec_name) = self.track(configured)?;

        let packet = Packet::alloc(&self.session)?;
        let frame = Frame::alloc(&self.session)?;
        let strategy = strategy::for_table(self.session.functions());
        tracing::info!("Decoding {} with {}", codec_name, strategy.name());

        self.codec = Some(codec);
        self.packet = Some(packet);
        self.frame = Some(frame);
        self.strategy = Some(strategy);
        self.codec_name = codec_name;
        self.pending = false;
        self.output_count = 0;
        self.transition(DispatchState::DecoderConfigured);
        Ok(())
    }

    fn build_decoder(&self) -> Result<(CodecContext<'static>, String)> {
        let format = self.format.as_ref().ok_or_else(|| AvError::EmptyHandle {
            entity: "AVFormatContext",
        })?;
        let video = self.indices.video.ok_or(AvError::NoVideoStream)?;
        let stream = format.stream(video)?;
        let codec_id = stream.codec_id()?;
        let codec_name = self.session.codec_name(codec_id);
        let decoder =
            Decoder::find(&self.session, codec_id).ok_or_else(|| AvError::DecoderNotFound {
                codec_id,
                codec_name: codec_name.clone(),
            })?;

        let mut codec = CodecContext::alloc(&self.session, decoder)?;
        if let Some(params) = stream.codec_parameters()? {
            codec.set_parameters(&params)?;
        } else if let Some(source) = stream.codec_context()? {
            codec.copy_from(&source)?;
        } else {
            return Err(AvError::EmptyHandle {
                entity: "AVCodecParameters",
            });
        }

        let mut options = Dictionary::from_pairs(&self.session, self.session.decoder_options())?;
        codec.open(decoder, &mut options)?;
        for unused in options.entries() {
            tracing::debug!("Decoder ignored option {}={}", unused.key, unused.value);
        }
        Ok((codec, codec_name))
    }

    // ========================================================================
    // Decoding
    // ========================================================================

    /// Decodes the next picture of the video stream. Returns `None` once the decoder is drained;
    /// the dispatcher has then released everything and is closed.
    pub fn next_frame(&mut self) -> Result<Option<DecodedPicture>> {
        if !self.state.can_decode() {
            return Err(self.not_in("decode"));
        }
        let result = self.decode_step();
        self.track(result)
    }

    fn decode_step(&mut self) -> Result<Option<DecodedPicture>> {
        loop {
            match self.receive()? {
                ReceiveOutcome::Frame => return self.take_picture().map(Some),
                ReceiveOutcome::EndOfStream => {
                    tracing::debug!("Decoder drained after {} frames", self.stats.frames_decoded);
                    self.close()?;
                    return Ok(None);
                }
                ReceiveOutcome::NeedInput if self.state == DispatchState::Draining => {
                    // A drained legacy decoder has nothing more to give.
                    self.close()?;
                    return Ok(None);
                }
                ReceiveOutcome::NeedInput => {}
            }

            if !self.pending && !self.read_video_packet()? {
                self.flush()?;
                continue;
            }
            match self.send()? {
                SendOutcome::Accepted => {
                    self.pending = false;
                    self.packet_mut()?.unref()?;
                    self.transition(DispatchState::Decoding);
                }
                SendOutcome::Again => self.pending = true,
            }
        }
    }

    /// Signals end of input and returns every picture still buffered in the decoder, then
    /// closes.
    pub fn drain(&mut self) -> Result<Vec<DecodedPicture>> {
        if !self.state.can_decode() {
            return Err(self.not_in("drain"));
        }
        if self.state != DispatchState::Draining {
            let flushed = self.flush();
            self.track(flushed)?;
        }
        let mut pictures = Vec::new();
        while let Some(picture) = self.next_frame()? {
            pictures.push(picture);
        }
        Ok(pictures)
    }

    fn read_video_packet(&mut self) -> Result<bool> {
        let (Some(format), Some(packet)) = (self.format.as_mut(), self.packet.as_mut()) else {
            return Err(AvError::EmptyHandle { entity: "AVPacket" });
        };
        loop {
            packet.unref()?;
            if !format.read_packet(packet)? {
                return Ok(false);
            }
            self.stats.packets_read += 1;
            if self.indices.packet_type(packet.stream_index()?) == PacketType::Video {
                self.stats.video_packets += 1;
                return Ok(true);
            }
        }
    }

    fn flush(&mut self) -> Result<()> {
        let ctx = self.codec_ptr()?;
        let strategy = self.strategy.as_mut().ok_or_else(|| AvError::InvalidState {
            operation: "flush",
            state: "without a decoder",
        })?;
        unsafe { strategy.flush(ctx)? };
        if let Some(packet) = self.packet.as_mut() {
            packet.unref()?;
        }
        self.pending = false;
        self.transition(DispatchState::Draining);
        Ok(())
    }

    fn send(&mut self) -> Result<SendOutcome> {
        let ctx = self.codec_ptr()?;
        let packet = self.packet_mut()?.as_ptr()?;
        let frame = self.frame_ptr()?;
        let strategy = self.strategy_mut()?;
        unsafe { strategy.send(ctx, packet, frame) }
    }

    fn receive(&mut self) -> Result<ReceiveOutcome> {
        let ctx = self.codec_ptr()?;
        let frame = self.frame_ptr()?;
        let strategy = self.strategy_mut()?;
        unsafe { strategy.receive(ctx, frame) }
    }

    fn take_picture(&mut self) -> Result<DecodedPicture> {
        let frame = self.frame.as_ref().ok_or(AvError::EmptyHandle { entity: "AVFrame" })?;
        let picture = DecodedPicture {
            frame_number: self.output_count,
            info: frame.info()?,
            planes: frame.planes()?,
            motion_vectors: frame.motion_vectors()?,
            metadata: frame.metadata()?.entries(),
        };
        self.output_count += 1;
        self.stats.frames_decoded += 1;
        Ok(picture)
    }

    fn codec_ptr(&self) -> Result<*mut crate::ffi::AVCodecContext> {
        self.codec
            .as_ref()
            .ok_or(AvError::EmptyHandle {
                entity: "AVCodecContext",
            })?
            .as_ptr()
    }

    fn frame_ptr(&self) -> Result<*mut crate::ffi::AVFrame> {
        self.frame
            .as_ref()
            .ok_or(AvError::EmptyHandle { entity: "AVFrame" })?
            .as_ptr()
    }

    fn packet_mut(&mut self) -> Result<&mut Packet> {
        self.packet
            .as_mut()
            .ok_or(AvError::EmptyHandle { entity: "AVPacket" })
    }

    fn strategy_mut(&mut self) -> Result<&mut Box<dyn DecodeStrategy>> {
        let state = self.state.name();
        self.strategy.as_mut().ok_or(AvError::InvalidState {
            operation: "decode",
            state,
        })
    }

    // ========================================================================
    // Seeking
    // ========================================================================

    /// Seeks the video stream to the keyframe at or before `ts` (video time base), then flushes
    /// the decoder. Decoding resumes from that keyframe.
    pub fn seek(&mut self, ts: i64) -> Result<()> {
        if !self.state.can_decode() {
            return Err(self.not_in("seek"));
        }
        let video = self.indices.video.ok_or(AvError::NoVideoStream)?;
        let stream_index = i32::try_from(video)
            .map_err(|_| AvError::InvalidArgument(format!("stream index {}", video)))?;
        let format = self.format.as_mut().ok_or(AvError::EmptyHandle {
            entity: "AVFormatContext",
        })?;
        let sought = format.seek(stream_index, ts, AVSEEK_FLAG_BACKWARD);
        self.track(sought)?;
        self.after_seek()
    }

    /// Seeks to the input's start time (default stream, no flags).
    pub fn seek_to_beginning(&mut self) -> Result<()> {
        if !self.state.can_decode() {
            return Err(self.not_in("seek"));
        }
        self.rewind()?;
        self.after_seek()
    }

    /// Seeks to the keyframe at or before video frame `frame_number`, using the index built by
    /// [`DecodeDispatcher::scan_keyframes`].
    pub fn seek_to_frame(&mut self, frame_number: u64) -> Result<Keyframe> {
        let keyframe = self
            .keyframes
            .as_ref()
            .ok_or_else(|| AvError::InvalidArgument("keyframes were not scanned".to_string()))?
            .closest_before(frame_number)
            .ok_or_else(|| AvError::InvalidArgument("input has no keyframes".to_string()))?;
        self.seek(keyframe.dts)?;
        Ok(keyframe)
    }

    fn rewind(&mut self) -> Result<()> {
        let format = self.format.as_mut().ok_or(AvError::EmptyHandle {
            entity: "AVFormatContext",
        })?;
        let start = match format.fields()?.start_time {
            AV_NOPTS_VALUE => 0,
            start => start,
        };
        let sought = format.seek(-1, start, 0);
        self.track(sought)
    }

    fn after_seek(&mut self) -> Result<()> {
        if let Some(codec) = self.codec.as_mut() {
            codec.flush_buffers()?;
        }
        if let Some(strategy) = self.strategy.as_mut() {
            strategy.reset();
        }
        if let Some(packet) = self.packet.as_mut() {
            packet.unref()?;
        }
        self.pending = false;
        self.output_count = 0;
        self.stats.seeks += 1;
        self.transition(DispatchState::DecoderConfigured);
        Ok(())
    }

    /// Reads every packet once and records the video keyframes, then rewinds to the start.
    pub fn scan_keyframes(&mut self) -> Result<KeyframeIndex> {
        self.expect_state(
            "scan keyframes",
            &[
                DispatchState::StreamSelected,
                DispatchState::DecoderConfigured,
                DispatchState::Decoding,
                DispatchState::Draining,
            ],
        )?;
        let mut scratch = Packet::alloc(&self.session)?;
        let format = self.format.as_mut().ok_or(AvError::EmptyHandle {
            entity: "AVFormatContext",
        })?;

        let mut index = KeyframeIndex::default();
        while format.read_packet(&mut scratch)? {
            if self.indices.packet_type(scratch.stream_index()?) == PacketType::Video {
                index.push(scratch.is_key()?, scratch.dts()?);
            }
            scratch.unref()?;
        }
        tracing::debug!(
            "Indexed {} keyframes in {} video frames",
            index.keyframes.len(),
            index.frame_count
        );

        self.rewind()?;
        if self.state != DispatchState::StreamSelected {
            self.after_seek()?;
        }
        self.keyframes = Some(index.clone());
        Ok(index)
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Releases the codec context, then the packet, then the input. Closing a closed
    /// dispatcher does nothing.
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut codec) = self.codec.take() {
            codec.free()?;
        }
        self.strategy = None;
        if let Some(mut packet) = self.packet.take() {
            packet.free()?;
        }
        if let Some(mut frame) = self.frame.take() {
            frame.free()?;
        }
        if let Some(mut format) = self.format.take() {
            format.close()?;
        }
        self.pending = false;
        self.transition(DispatchState::Closed);
        Ok(())
    }
}

impl std::fmt::Debug for DecodeDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodeDispatcher")
            .field("state", &self.state)
            .field("video", &self.indices.video)
            .field("codec", &self.codec_name)
            .field("stats", &self.stats)
            .finish()
    }
}

impl Drop for DecodeDispatcher {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("Closing dispatcher failed: {}", e);
        }
    }
}

/// Groups stream indices by what their packets carry. The first video stream is the one
/// decoded; streams whose codec cannot be read count as "other".
pub fn classify_streams(format: &FormatContext) -> Result<StreamIndices> {
    let mut indices = StreamIndices::default();
    for stream in format.streams()? {
        let index = stream.index();
        let media_type = match stream.media_type() {
            Ok(media_type) => media_type,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::debug!("Stream {} has no codec description: {}", index, e);
                indices.subtitle_other.push(index);
                continue;
            }
        };
        match media_type {
            MediaType::Video if indices.video.is_none() => indices.video = Some(index),
            MediaType::Audio => indices.audio.push(index),
            MediaType::Subtitle | MediaType::Data => match stream.codec_name()?.as_str() {
                "dvb_subtitle" => indices.subtitle_dvb.push(index),
                "eia_608" => indices.subtitle_608.push(index),
                _ => indices.subtitle_other.push(index),
            },
            _ => {}
        }
    }
    Ok(indices)
}
