//! Container and stream metadata types.
//!
//! [`ContainerInfo`] is filled in when the container header is opened;
//! [`StreamDescriptor`]s are filled in by stream probing and stay unchanged
//! for the rest of the run.

use std::{path::PathBuf, time::Duration};

use ffmpeg_next::{Rational, codec::Id as CodecId, format::Pixel, media::Type as MediaType};

/// Container-level information read from the header.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerInfo {
    /// Path the container was opened from.
    pub path: PathBuf,
    /// Short demuxer name (e.g. `"mov,mp4,m4a,3gp,3g2,mj2"`, `"matroska,webm"`).
    pub format_name: String,
    /// Total duration in microseconds, or a non-positive value when unknown.
    pub duration_microseconds: i64,
    /// Overall bit rate in bits per second, `0` when unknown.
    pub bit_rate: i64,
}

impl ContainerInfo {
    /// Duration as a [`Duration`], `None` when the container does not report
    /// one.
    pub fn duration(&self) -> Option<Duration> {
        if self.duration_microseconds > 0 {
            Some(Duration::from_micros(self.duration_microseconds as u64))
        } else {
            None
        }
    }
}

/// Codec-specific parameters of an elementary stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StreamParameters {
    Video {
        width: u32,
        height: u32,
        /// Pixel format announced by the container, if any.
        pixel_format: Option<Pixel>,
    },
    Audio {
        channels: u16,
        sample_rate: u32,
    },
    Other,
}

/// Description of one elementary stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamDescriptor {
    /// Zero-based stream index within the container.
    pub index: usize,
    /// Media type (video, audio, subtitle, data...).
    pub media_type: MediaType,
    /// Codec identifier used to resolve a decoder.
    pub codec_id: CodecId,
    pub parameters: StreamParameters,
    /// Bit rate in bits per second, `0` when unknown.
    pub bit_rate: i64,
    /// Duration of one timestamp tick.
    pub time_base: Rational,
    /// Average frame rate.
    pub average_frame_rate: Rational,
    /// Lowest frame rate that can represent every timestamp exactly.
    pub real_frame_rate: Rational,
    /// Start time in `time_base` units.
    pub start_time: i64,
    /// Duration in `time_base` units.
    pub duration: i64,
}

impl StreamDescriptor {
    /// `true` when this is a video stream.
    pub fn is_video(&self) -> bool {
        self.media_type == MediaType::Video
    }

    /// `true` when this is an audio stream.
    pub fn is_audio(&self) -> bool {
        self.media_type == MediaType::Audio
    }

    /// Video dimensions, if this is a video stream.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match self.parameters {
            StreamParameters::Video { width, height, .. } => Some((width, height)),
            _ => None,
        }
    }
}
