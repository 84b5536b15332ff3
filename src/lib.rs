//! # framedump
//!
//! Dump the first frames of a video as PNG images.
//!
//! `framedump` opens a media container, picks the first video stream it can
//! decode, and writes decoded frames as RGB PNG files until a frame limit is
//! passed or the stream ends. Demuxing, decoding and pixel conversion are
//! done by FFmpeg via the [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next)
//! crate; PNG encoding by [`image`](https://crates.io/crates/image).
//!
//! ## Quick Start
//!
//! ```no_run
//! use framedump::{ExtractOptions, FrameExtractor};
//!
//! let options = ExtractOptions::new()
//!     .with_output_directory("output")
//!     .with_frame_limit(10);
//!
//! // Writes output/frame-1.png ... output/frame-11.png for a long enough video.
//! let report = FrameExtractor::new(options).run("input.mp4")?;
//! println!("{} frames from stream {}", report.frames_written, report.video_stream_index);
//! # Ok::<(), framedump::FrameDumpError>(())
//! ```
//!
//! ## Pipeline
//!
//! | Stage | Type |
//! |-------|------|
//! | Demuxing | [`Demuxer`], [`FfmpegDemuxer`] |
//! | Stream selection | [`select_video_stream`] |
//! | Decoding | [`VideoDecoder`], [`DecoderRegistry`] |
//! | Pixel conversion | [`PixelConverter`] |
//! | PNG output | [`write_png`] |
//! | Orchestration | [`FrameExtractor`] |
//!
//! Each stage reports through [`Diagnostics`], which forwards to the
//! [`log`](https://crates.io/crates/log) facade unless another
//! [`DiagnosticSink`] is configured.
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod config;
pub mod conversion;
pub mod decoder;
pub mod demux;
pub mod diagnostics;
pub mod error;
pub mod extractor;
pub mod image_writer;
pub mod metadata;
pub mod packet;
pub mod progress;
pub mod selection;
mod utilities;

pub use config::{DEFAULT_FILE_PREFIX, DEFAULT_FRAME_LIMIT, DEFAULT_OUTPUT_DIRECTORY, ExtractOptions};
pub use conversion::{PixelConverter, is_color_accurate};
pub use decoder::{
    DecoderFactory, DecoderPhase, DecoderRegistry, FfmpegDecoderFactory, FfmpegVideoDecoder, ReceiveOutcome,
    VideoDecoder, video_codec_parameters,
};
pub use demux::{Demuxer, FfmpegDemuxer, ReadStatus};
pub use diagnostics::{
    Diagnostic, DiagnosticSink, Diagnostics, FfmpegLogLevel, LogSink, SilentSink, Stage, set_ffmpeg_log_level,
};
pub use error::FrameDumpError;
pub use extractor::{ExtractionReport, FrameExtractor, StopReason};
pub use image_writer::write_png;
pub use metadata::{ContainerInfo, StreamDescriptor, StreamParameters};
pub use packet::Packet;
pub use progress::{ProgressCallback, ProgressInfo};
pub use selection::{VideoSelection, select_video_stream};
