//! Error types for the `framedump` crate.
//!
//! This module defines [`FrameDumpError`], the single error type returned by
//! every fallible step of the pipeline. Every variant is fatal to an
//! extraction run; the driver still tears down whatever it had acquired
//! before handing the error back.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The unified error type for all `framedump` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FrameDumpError {
    /// The media container could not be opened or its format was not
    /// recognised.
    #[error("Failed to open media file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to [`crate::FfmpegDemuxer::open`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// Stream information could not be read from the container.
    #[error("Failed to read stream information from {path}: {reason}")]
    StreamProbe {
        /// Path of the container being probed.
        path: PathBuf,
        /// Underlying reason the probe failed.
        reason: String,
    },

    /// The demuxer failed while reading the next packet.
    #[error("Failed to read packet: {0}")]
    PacketRead(String),

    /// No stream in the container is both a video stream and decodable.
    #[error("No decodable video stream found in file")]
    NoVideoStream,

    /// The decoder context could not be allocated or configured from the
    /// stream's codec parameters.
    #[error("Failed to allocate decoder context: {0}")]
    DecoderAlloc(String),

    /// The decoder implementation could not be initialised.
    #[error("Failed to open decoder: {0}")]
    DecoderOpen(String),

    /// The decoder refused a compressed packet.
    #[error("Decoder rejected packet: {0}")]
    DecodeRejected(String),

    /// The decoder failed while producing a frame.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// The pixel format conversion could not be set up or run.
    #[error("Failed to convert frame pixel format: {0}")]
    ConversionError(String),

    /// A frame handed to the image encoder does not have the expected layout.
    #[error("Invalid frame for image output: {0}")]
    InvalidFrame(String),

    /// The output image file could not be created or written.
    #[error("Failed to write output image {path}: {source}")]
    OutputFile {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: IoError,
    },

    /// The PNG encoder failed while serialising a frame.
    #[error("Failed to encode image {path}: {source}")]
    ImageEncode {
        /// Destination path.
        path: PathBuf,
        /// Underlying encoder error.
        #[source]
        source: ImageError,
    },

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error that is not tied to a specific output image.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),
}

impl From<FfmpegError> for FrameDumpError {
    fn from(error: FfmpegError) -> Self {
        FrameDumpError::FfmpegError(error.to_string())
    }
}
