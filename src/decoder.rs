//! Video decoding.
//!
//! A decoder is a small state machine bound to one stream:
//!
//! ```text
//! Configured --open--> Ready --submit_eof--> Draining
//!      \                 \                      \
//!       +-----------------+------close-----------+--> Closed
//! ```
//!
//! [`VideoDecoder`] is the trait the extraction loop drives. Implementations
//! are created by a [`DecoderFactory`], looked up by codec id in a
//! [`DecoderRegistry`]. The registry can fall back to any decoder libavcodec
//! was built with, wrapped in [`FfmpegVideoDecoder`].

use std::{fmt, mem, sync::Arc};

use ffmpeg_next::{
    Error as FfmpegError,
    codec::{Id as CodecId, Parameters, context::Context as CodecContext, decoder},
    format::Pixel,
    frame::Video as VideoFrame,
    media::Type as MediaType,
    util::error::EAGAIN,
};
use ffmpeg_sys_next::{AVCodecID, AVMediaType, AVPixelFormat};

use crate::{error::FrameDumpError, metadata::StreamDescriptor, packet::Packet};

/// Result of one [`VideoDecoder::receive`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// A frame was written into the caller's buffer.
    Frame,
    /// The decoder needs another packet before it can produce a frame.
    NeedsMoreInput,
    /// The decoder has been drained and will produce nothing more.
    EndOfStream,
}

/// Lifecycle phase of a decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderPhase {
    /// Bound to codec parameters but not opened.
    Configured,
    /// Accepting packets.
    Ready,
    /// End of input signalled; only buffered frames remain.
    Draining,
    /// Resources released.
    Closed,
}

/// A stateful packet-to-frame decoder.
pub trait VideoDecoder {
    /// Short codec name for logs.
    fn codec_name(&self) -> &str;

    fn phase(&self) -> DecoderPhase;

    /// Initialise the codec. Moves `Configured` to `Ready`.
    fn open(&mut self) -> Result<(), FrameDumpError>;

    /// Hand one compressed packet to the decoder.
    fn submit(&mut self, packet: &Packet) -> Result<(), FrameDumpError>;

    /// Signal that no more packets will arrive. Moves `Ready` to `Draining`.
    fn submit_eof(&mut self) -> Result<(), FrameDumpError>;

    /// Try to take one decoded frame, writing it into `frame`.
    fn receive(&mut self, frame: &mut VideoFrame) -> Result<ReceiveOutcome, FrameDumpError>;

    /// Release the codec. Calling it again is a no-op.
    fn close(&mut self);
}

/// Builds configured decoders for one codec.
pub trait DecoderFactory: Send + Sync {
    /// Name of the decoder implementation.
    fn name(&self) -> &str;

    /// Bind a new decoder to a stream's codec parameters.
    ///
    /// # Errors
    ///
    /// Returns [`FrameDumpError::DecoderAlloc`] when the decoder context
    /// cannot be created from `parameters`.
    fn configure(
        &self,
        stream: &StreamDescriptor,
        parameters: Parameters,
    ) -> Result<Box<dyn VideoDecoder>, FrameDumpError>;
}

/// Codec id to decoder factory lookup.
///
/// Explicit registrations are searched first, newest first. When built with
/// [`with_ffmpeg`](DecoderRegistry::with_ffmpeg) the registry then asks
/// libavcodec for a video decoder.
#[derive(Clone, Default)]
pub struct DecoderRegistry {
    entries: Vec<(CodecId, Arc<dyn DecoderFactory>)>,
    ffmpeg_fallback: bool,
}

impl fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registered: Vec<(CodecId, &str)> = self
            .entries
            .iter()
            .map(|(id, factory)| (*id, factory.name()))
            .collect();
        f.debug_struct("DecoderRegistry")
            .field("registered", &registered)
            .field("ffmpeg_fallback", &self.ffmpeg_fallback)
            .finish()
    }
}

impl DecoderRegistry {
    /// A registry that resolves nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry backed by every video decoder in libavcodec.
    pub fn with_ffmpeg() -> Self {
        Self {
            entries: Vec::new(),
            ffmpeg_fallback: true,
        }
    }

    /// Register a factory for `codec_id`, shadowing earlier entries and the
    /// FFmpeg fallback.
    #[must_use]
    pub fn register(mut self, codec_id: CodecId, factory: Arc<dyn DecoderFactory>) -> Self {
        self.entries.push((codec_id, factory));
        self
    }

    /// Find a factory able to decode `codec_id`.
    pub fn resolve(&self, codec_id: CodecId) -> Option<Arc<dyn DecoderFactory>> {
        if let Some((_, factory)) = self.entries.iter().rev().find(|(id, _)| *id == codec_id) {
            return Some(Arc::clone(factory));
        }
        if !self.ffmpeg_fallback || codec_id == CodecId::None {
            return None;
        }

        let codec = decoder::find(codec_id)?;
        if codec.medium() != MediaType::Video {
            return None;
        }
        Some(Arc::new(FfmpegDecoderFactory {
            name: codec.name().to_string(),
        }))
    }
}

/// Factory for libavcodec decoders.
#[derive(Debug, Clone)]
pub struct FfmpegDecoderFactory {
    name: String,
}

impl DecoderFactory for FfmpegDecoderFactory {
    fn name(&self) -> &str {
        &self.name
    }

    fn configure(
        &self,
        stream: &StreamDescriptor,
        parameters: Parameters,
    ) -> Result<Box<dyn VideoDecoder>, FrameDumpError> {
        let context = CodecContext::from_parameters(parameters).map_err(|error| {
            FrameDumpError::DecoderAlloc(format!(
                "stream {} ({}): {error}",
                stream.index, self.name
            ))
        })?;

        Ok(Box::new(FfmpegVideoDecoder {
            codec_name: self.name.clone(),
            state: DecoderState::Configured(context),
        }))
    }
}

enum DecoderState {
    Configured(CodecContext),
    Ready(decoder::Video),
    Draining(decoder::Video),
    Closed,
}

/// [`VideoDecoder`] backed by a libavcodec context.
pub struct FfmpegVideoDecoder {
    codec_name: String,
    state: DecoderState,
}

impl fmt::Debug for FfmpegVideoDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FfmpegVideoDecoder")
            .field("codec_name", &self.codec_name)
            .field("phase", &self.phase())
            .finish()
    }
}

impl VideoDecoder for FfmpegVideoDecoder {
    fn codec_name(&self) -> &str {
        &self.codec_name
    }

    fn phase(&self) -> DecoderPhase {
        match self.state {
            DecoderState::Configured(_) => DecoderPhase::Configured,
            DecoderState::Ready(_) => DecoderPhase::Ready,
            DecoderState::Draining(_) => DecoderPhase::Draining,
            DecoderState::Closed => DecoderPhase::Closed,
        }
    }

    fn open(&mut self) -> Result<(), FrameDumpError> {
        match mem::replace(&mut self.state, DecoderState::Closed) {
            DecoderState::Configured(context) => {
                let video = context.decoder().video().map_err(|error| {
                    FrameDumpError::DecoderOpen(format!("{}: {error}", self.codec_name))
                })?;
                self.state = DecoderState::Ready(video);
                Ok(())
            }
            other => {
                self.state = other;
                Err(FrameDumpError::DecoderOpen(format!(
                    "{}: decoder is {:?}, expected Configured",
                    self.codec_name,
                    self.phase()
                )))
            }
        }
    }

    fn submit(&mut self, packet: &Packet) -> Result<(), FrameDumpError> {
        match &mut self.state {
            DecoderState::Ready(video) => video
                .send_packet(packet.as_ffmpeg())
                .map_err(|error| FrameDumpError::DecodeRejected(error.to_string())),
            _ => Err(FrameDumpError::DecodeRejected(format!(
                "decoder is {:?}, expected Ready",
                self.phase()
            ))),
        }
    }

    fn submit_eof(&mut self) -> Result<(), FrameDumpError> {
        match mem::replace(&mut self.state, DecoderState::Closed) {
            DecoderState::Ready(mut video) => {
                let sent = video.send_eof();
                self.state = DecoderState::Draining(video);
                sent.map_err(|error| FrameDumpError::DecodeRejected(error.to_string()))
            }
            draining @ DecoderState::Draining(_) => {
                self.state = draining;
                Ok(())
            }
            other => {
                self.state = other;
                Err(FrameDumpError::DecodeRejected(format!(
                    "decoder is {:?}, expected Ready",
                    self.phase()
                )))
            }
        }
    }

    fn receive(&mut self, frame: &mut VideoFrame) -> Result<ReceiveOutcome, FrameDumpError> {
        let video = match &mut self.state {
            DecoderState::Ready(video) | DecoderState::Draining(video) => video,
            _ => {
                return Err(FrameDumpError::VideoDecodeError(format!(
                    "decoder is {:?}",
                    self.phase()
                )));
            }
        };

        match video.receive_frame(frame) {
            Ok(()) => Ok(ReceiveOutcome::Frame),
            Err(FfmpegError::Other { errno }) if errno == EAGAIN => Ok(ReceiveOutcome::NeedsMoreInput),
            Err(FfmpegError::Eof) => Ok(ReceiveOutcome::EndOfStream),
            Err(error) => Err(FrameDumpError::VideoDecodeError(error.to_string())),
        }
    }

    fn close(&mut self) {
        self.state = DecoderState::Closed;
    }
}

/// Build codec parameters for a video stream that was not probed by
/// libavformat, e.g. for a custom [`Demuxer`](crate::Demuxer).
pub fn video_codec_parameters(codec_id: CodecId, width: u32, height: u32, pixel_format: Pixel) -> Parameters {
    let mut parameters = Parameters::new();
    unsafe {
        let raw = parameters.as_mut_ptr();
        (*raw).codec_type = AVMediaType::AVMEDIA_TYPE_VIDEO;
        (*raw).codec_id = AVCodecID::from(codec_id);
        (*raw).width = width as i32;
        (*raw).height = height as i32;
        (*raw).format = AVPixelFormat::from(pixel_format) as i32;
    }
    parameters
}
