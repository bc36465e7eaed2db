//! Decode strategies.
//!
//! The call convention is negotiated once when libavcodec is bound ([`DecodeApi`]). Each
//! dispatcher turns it into one strategy object and drives decoding only through
//! [`DecodeStrategy`], so no call site branches on the API generation.

use std::ffi::c_int;
use std::ptr;

use crate::error::{AvError, Result};
use crate::ffi::{self, AVCodecContext, AVFrame, AVPacket};
use crate::functions::avcodec::{AvPacketAllocFn, AvPacketFreeFn};
use crate::functions::FunctionTable;
use crate::negotiate::DecodeApi;

/// Result of offering one packet to the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The decoder took the packet.
    Accepted,
    /// The decoder has output pending; receive frames, then offer the same packet again.
    Again,
}

/// Result of asking the decoder for a picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// The frame now holds a decoded picture.
    Frame,
    /// Nothing buffered; send the next packet.
    NeedInput,
    /// Flushed and fully drained.
    EndOfStream,
}

/// One decode entry point over either call convention.
///
/// A strategy carries the per-decoder state of one codec context, so every dispatcher owns
/// its own.
pub trait DecodeStrategy: Send {
    fn name(&self) -> &'static str;

    /// Offers one packet. For the legacy convention this decodes into `frame` right away.
    ///
    /// # Safety
    /// `ctx` must be an opened decoder context, `packet` a valid packet and `frame` an allocated
    /// frame that stays untouched until the next [`DecodeStrategy::receive`].
    unsafe fn send(
        &mut self,
        ctx: *mut AVCodecContext,
        packet: *const AVPacket,
        frame: *mut AVFrame,
    ) -> Result<SendOutcome>;

    /// Signals end of input. Further receives return the buffered pictures, then
    /// [`ReceiveOutcome::EndOfStream`].
    ///
    /// # Safety
    /// `ctx` must be an opened decoder context.
    unsafe fn flush(&mut self, ctx: *mut AVCodecContext) -> Result<()>;

    /// # Safety
    /// Same as [`DecodeStrategy::send`].
    unsafe fn receive(
        &mut self,
        ctx: *mut AVCodecContext,
        frame: *mut AVFrame,
    ) -> Result<ReceiveOutcome>;

    /// Forgets buffered state after the decoder's buffers were flushed for a seek.
    fn reset(&mut self);
}

/// Builds the strategy for whatever convention the bound library supports.
pub fn for_table(functions: &FunctionTable) -> Box<dyn DecodeStrategy> {
    match functions.avcodec.decode {
        DecodeApi::SendReceive {
            send_packet,
            receive_frame,
            ..
        } => Box::new(SendReceiveStrategy {
            send_packet,
            receive_frame,
            flushed: false,
        }),
        DecodeApi::Legacy { decode_video2 } => Box::new(LegacyStrategy {
            decode_video2,
            av_packet_alloc: functions.avcodec.av_packet_alloc,
            av_packet_free: functions.avcodec.av_packet_free,
            empty_packet: ptr::null_mut(),
            picture_ready: false,
            draining: false,
        }),
    }
}

// ============================================================================
// Send / Receive
// ============================================================================

pub struct SendReceiveStrategy {
    send_packet: crate::functions::avcodec::AvcodecSendPacketFn,
    receive_frame: crate::functions::avcodec::AvcodecReceiveFrameFn,
    flushed: bool,
}

impl DecodeStrategy for SendReceiveStrategy {
    fn name(&self) -> &'static str {
        "send/receive"
    }

    unsafe fn send(
        &mut self,
        ctx: *mut AVCodecContext,
        packet: *const AVPacket,
        _frame: *mut AVFrame,
    ) -> Result<SendOutcome> {
        match (self.send_packet)(ctx, packet) {
            0 => Ok(SendOutcome::Accepted),
            code if ffi::is_again(code) => Ok(SendOutcome::Again),
            code => Err(AvError::native("avcodec_send_packet", code)),
        }
    }

    unsafe fn flush(&mut self, ctx: *mut AVCodecContext) -> Result<()> {
        if self.flushed {
            return Ok(());
        }
        match (self.send_packet)(ctx, ptr::null()) {
            code if code == 0 || ffi::is_eof(code) => {
                self.flushed = true;
                Ok(())
            }
            code => Err(AvError::native("avcodec_send_packet", code)),
        }
    }

    unsafe fn receive(
        &mut self,
        ctx: *mut AVCodecContext,
        frame: *mut AVFrame,
    ) -> Result<ReceiveOutcome> {
        match (self.receive_frame)(ctx, frame) {
            0 => Ok(ReceiveOutcome::Frame),
            code if ffi::is_again(code) => {
                if self.flushed {
                    // A flushed decoder must not ask for more input.
                    Err(AvError::native("avcodec_receive_frame", code))
                } else {
                    Ok(ReceiveOutcome::NeedInput)
                }
            }
            code if ffi::is_eof(code) => Ok(ReceiveOutcome::EndOfStream),
            code => Err(AvError::native("avcodec_receive_frame", code)),
        }
    }

    fn reset(&mut self) {
        self.flushed = false;
    }
}

// ============================================================================
// Legacy
// ============================================================================

/// `avcodec_decode_video2`: at most one picture per call. Draining feeds an empty packet until
/// no picture comes back.
pub struct LegacyStrategy {
    decode_video2: crate::functions::avcodec::AvcodecDecodeVideo2Fn,
    av_packet_alloc: AvPacketAllocFn,
    av_packet_free: AvPacketFreeFn,
    /// Allocated on the first flush, freed on drop.
    empty_packet: *mut AVPacket,
    picture_ready: bool,
    draining: bool,
}

// The packet is only touched through `&mut self`.
unsafe impl Send for LegacyStrategy {}

impl DecodeStrategy for LegacyStrategy {
    fn name(&self) -> &'static str {
        "legacy decode_video2"
    }

    unsafe fn send(
        &mut self,
        ctx: *mut AVCodecContext,
        packet: *const AVPacket,
        frame: *mut AVFrame,
    ) -> Result<SendOutcome> {
        if self.picture_ready {
            return Ok(SendOutcome::Again);
        }
        let mut got_picture: c_int = 0;
        let ret = (self.decode_video2)(ctx, frame, &mut got_picture, packet);
        if ret < 0 {
            return Err(AvError::native("avcodec_decode_video2", ret));
        }
        self.picture_ready = got_picture != 0;
        Ok(SendOutcome::Accepted)
    }

    unsafe fn flush(&mut self, _ctx: *mut AVCodecContext) -> Result<()> {
        if self.empty_packet.is_null() {
            self.empty_packet = (self.av_packet_alloc)();
            if self.empty_packet.is_null() {
                return Err(AvError::NullResult {
                    call: "av_packet_alloc",
                });
            }
        }
        self.draining = true;
        Ok(())
    }

    unsafe fn receive(
        &mut self,
        ctx: *mut AVCodecContext,
        frame: *mut AVFrame,
    ) -> Result<ReceiveOutcome> {
        if self.picture_ready {
            self.picture_ready = false;
            return Ok(ReceiveOutcome::Frame);
        }
        if !self.draining {
            return Ok(ReceiveOutcome::NeedInput);
        }

        let mut got_picture: c_int = 0;
        let ret = (self.decode_video2)(ctx, frame, &mut got_picture, self.empty_packet);
        if ret < 0 {
            tracing::debug!(
                "Legacy drain stopped: {}",
                ffi::describe_error(ret)
            );
            return Ok(ReceiveOutcome::EndOfStream);
        }
        if got_picture != 0 {
            Ok(ReceiveOutcome::Frame)
        } else {
            Ok(ReceiveOutcome::EndOfStream)
        }
    }

    fn reset(&mut self) {
        self.picture_ready = false;
        self.draining = false;
    }
}

impl Drop for LegacyStrategy {
    fn drop(&mut self) {
        if !self.empty_packet.is_null() {
            unsafe { (self.av_packet_free)(&mut self.empty_packet) };
        }
    }
}
