//! Capability negotiation between the send/receive decode API and the legacy single-call one.

use crate::diagnostics::DiagnosticLog;
use crate::functions::avcodec::{
    AvcodecDecodeVideo2Fn, AvcodecParametersToContextFn, AvcodecReceiveFrameFn,
    AvcodecSendPacketFn,
};
use crate::symbols::{resolve, Resolver};

/// The decode call convention a bound libavcodec supports. Decided once per load.
#[derive(Debug, Clone, Copy)]
pub enum DecodeApi {
    /// `avcodec_send_packet` / `avcodec_receive_frame`, with parameters copied by
    /// `avcodec_parameters_to_context`.
    SendReceive {
        send_packet: AvcodecSendPacketFn,
        receive_frame: AvcodecReceiveFrameFn,
        parameters_to_context: AvcodecParametersToContextFn,
    },
    /// `avcodec_decode_video2`: one packet in, at most one picture out.
    Legacy { decode_video2: AvcodecDecodeVideo2Fn },
}

impl DecodeApi {
    pub fn is_send_receive(&self) -> bool {
        matches!(self, DecodeApi::SendReceive { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            DecodeApi::SendReceive { .. } => "send/receive",
            DecodeApi::Legacy { .. } => "legacy decode_video2",
        }
    }
}

/// Tries the three send/receive symbols; if any is missing, `avcodec_decode_video2` becomes
/// required on `r`. Returns `None` only when neither convention is available, in which case the
/// missing legacy symbol is already recorded.
pub(crate) fn negotiate(r: &mut Resolver<'_>, log: &DiagnosticLog) -> Option<DecodeApi> {
    let send_packet = resolve!(optional r, avcodec_send_packet: AvcodecSendPacketFn);
    let receive_frame = resolve!(optional r, avcodec_receive_frame: AvcodecReceiveFrameFn);
    let parameters_to_context =
        resolve!(optional r, avcodec_parameters_to_context: AvcodecParametersToContextFn);

    if let (Some(send_packet), Some(receive_frame), Some(parameters_to_context)) =
        (send_packet, receive_frame, parameters_to_context)
    {
        log.push("New decoding API found. Skipping check for legacy decode function.");
        return Some(DecodeApi::SendReceive {
            send_packet,
            receive_frame,
            parameters_to_context,
        });
    }

    let absent: Vec<&str> = [
        ("avcodec_send_packet", send_packet.is_none()),
        ("avcodec_receive_frame", receive_frame.is_none()),
        ("avcodec_parameters_to_context", parameters_to_context.is_none()),
    ]
    .into_iter()
    .filter(|(_, missing)| *missing)
    .map(|(name, _)| name)
    .collect();
    log.push(format!(
        "New decoding API not available ({} missing). Trying legacy decode function.",
        absent.join(", ")
    ));

    let decode_video2 = resolve!(required r, avcodec_decode_video2: AvcodecDecodeVideo2Fn)?;
    Some(DecodeApi::Legacy { decode_video2 })
}
