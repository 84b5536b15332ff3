//! Container demultiplexing.
//!
//! [`Demuxer`] is the seam between the extraction loop and whatever reads
//! the container. [`FfmpegDemuxer`] is the libavformat-backed implementation.
//!
//! Opening and probing are separate steps: [`FfmpegDemuxer::open`] only
//! parses the container header, [`Demuxer::probe_streams`] reads ahead far
//! enough to describe every stream. libavformat keeps the packets it reads
//! while probing and hands them back through `av_read_frame`, so the first
//! [`Demuxer::read_packet`] after probing still returns the first packet of
//! the file.

use std::{
    ffi::{CString, c_int},
    mem,
    path::Path,
    ptr,
};

use ffmpeg_next::{
    Error as FfmpegError,
    codec::Parameters,
    format::{Pixel, context::Input, stream::Stream},
    media::Type as MediaType,
};
use ffmpeg_sys_next::AVPixelFormat;

use crate::{
    diagnostics::{Diagnostics, Stage},
    error::FrameDumpError,
    metadata::{ContainerInfo, StreamDescriptor, StreamParameters},
    packet::Packet,
};

/// Outcome of a successful [`Demuxer::read_packet`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// The packet was filled.
    Packet,
    /// No more data remains. The packet is left released.
    EndOfStream,
}

/// Source of demultiplexed packets.
pub trait Demuxer {
    /// Header-level information about the container.
    fn container(&self) -> &ContainerInfo;

    /// Populate the stream descriptors. Must run before stream selection;
    /// calling it again has no effect.
    fn probe_streams(&mut self) -> Result<(), FrameDumpError>;

    /// Stream descriptors in ascending index order. Empty before probing.
    fn streams(&self) -> &[StreamDescriptor];

    /// Codec parameters for configuring a decoder, `None` for an unknown
    /// stream index.
    fn codec_parameters(&self, stream_index: usize) -> Option<Parameters>;

    /// Fill `packet` with the next packet from any stream.
    ///
    /// Callers release `packet` between reads.
    fn read_packet(&mut self, packet: &mut Packet) -> Result<ReadStatus, FrameDumpError>;

    /// Release the input. Calling it more than once is a no-op.
    fn close(&mut self);
}

/// libavformat-backed demuxer.
pub struct FfmpegDemuxer {
    input: Option<Input>,
    container: ContainerInfo,
    streams: Vec<StreamDescriptor>,
    probed: bool,
    diagnostics: Diagnostics,
}

impl std::fmt::Debug for FfmpegDemuxer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfmpegDemuxer")
            .field("container", &self.container)
            .field("streams", &self.streams)
            .field("probed", &self.probed)
            .field("open", &self.input.is_some())
            .finish_non_exhaustive()
    }
}

impl FfmpegDemuxer {
    /// Open a container and parse its header.
    ///
    /// The container format is detected from the content. Codecs are not
    /// opened and streams are not probed yet.
    ///
    /// # Errors
    ///
    /// Returns [`FrameDumpError::FileOpen`] if the path cannot be read or the
    /// format is not recognised.
    pub fn open<P: AsRef<Path>>(path: P, diagnostics: Diagnostics) -> Result<Self, FrameDumpError> {
        let path = path.as_ref().to_path_buf();
        let open_error = |reason: String| FrameDumpError::FileOpen {
            path: path.clone(),
            reason,
        };

        ffmpeg_next::init().map_err(|error| open_error(format!("FFmpeg initialisation failed: {error}")))?;

        diagnostics.info(
            Stage::Demuxer,
            format_args!(
                "Opening the input file ({}) and loading format (container) header",
                path.display()
            ),
        );

        let c_path = path_to_cstring(&path)
            .ok_or_else(|| open_error("path cannot be passed to FFmpeg".to_string()))?;

        let mut context = ptr::null_mut();
        let status = unsafe {
            ffmpeg_sys_next::avformat_open_input(
                &mut context,
                c_path.as_ptr(),
                ptr::null_mut(),
                ptr::null_mut(),
            )
        };
        if status != 0 {
            return Err(open_error(FfmpegError::from(status).to_string()));
        }

        // Ownership of the context moves into `Input`, which closes it on drop.
        let input = unsafe { Input::wrap(context) };

        let container = ContainerInfo {
            path: path.clone(),
            format_name: input.format().name().to_string(),
            duration_microseconds: input.duration(),
            bit_rate: input.bit_rate(),
        };

        diagnostics.info(
            Stage::Demuxer,
            format_args!(
                "Format: {}, Duration: {} us, Bitrate: {}",
                container.format_name, container.duration_microseconds, container.bit_rate
            ),
        );

        Ok(Self {
            input: Some(input),
            container,
            streams: Vec::new(),
            probed: false,
            diagnostics,
        })
    }

    fn input_mut(&mut self) -> Result<&mut Input, FrameDumpError> {
        self.input
            .as_mut()
            .ok_or_else(|| FrameDumpError::PacketRead("container is closed".to_string()))
    }
}

impl Demuxer for FfmpegDemuxer {
    fn container(&self) -> &ContainerInfo {
        &self.container
    }

    fn probe_streams(&mut self) -> Result<(), FrameDumpError> {
        if self.probed {
            return Ok(());
        }

        let path = self.container.path.clone();
        let probe_error = |reason: String| FrameDumpError::StreamProbe {
            path: path.clone(),
            reason,
        };

        self.diagnostics
            .info(Stage::Demuxer, format_args!("Finding stream info from format..."));

        let input = self
            .input
            .as_mut()
            .ok_or_else(|| probe_error("container is closed".to_string()))?;

        let status =
            unsafe { ffmpeg_sys_next::avformat_find_stream_info(input.as_mut_ptr(), ptr::null_mut()) };
        if status < 0 {
            return Err(probe_error(FfmpegError::from(status).to_string()));
        }

        let mut streams: Vec<StreamDescriptor> = input.streams().map(|stream| describe_stream(&stream)).collect();
        streams.sort_by_key(|descriptor| descriptor.index);

        self.diagnostics.debug(
            Stage::Demuxer,
            format_args!("Container has {} stream(s)", streams.len()),
        );

        self.streams = streams;
        self.probed = true;
        Ok(())
    }

    fn streams(&self) -> &[StreamDescriptor] {
        &self.streams
    }

    fn codec_parameters(&self, stream_index: usize) -> Option<Parameters> {
        self.input
            .as_ref()?
            .stream(stream_index)
            .map(|stream| stream.parameters())
    }

    fn read_packet(&mut self, packet: &mut Packet) -> Result<ReadStatus, FrameDumpError> {
        let input = self.input_mut()?;
        match packet.read_from(input) {
            Ok(()) => Ok(ReadStatus::Packet),
            Err(FfmpegError::Eof) => {
                packet.release();
                Ok(ReadStatus::EndOfStream)
            }
            Err(error) => {
                packet.release();
                Err(FrameDumpError::PacketRead(error.to_string()))
            }
        }
    }

    fn close(&mut self) {
        if self.input.take().is_some() {
            self.diagnostics
                .debug(Stage::Demuxer, format_args!("Closed {}", self.container.path.display()));
        }
    }
}

/// Build a descriptor from a probed libavformat stream.
fn describe_stream(stream: &Stream) -> StreamDescriptor {
    let codec_parameters = stream.parameters();
    let media_type = codec_parameters.medium();
    let codec_id = codec_parameters.id();
    let raw = unsafe { *codec_parameters.as_ptr() };

    let parameters = match media_type {
        MediaType::Video => StreamParameters::Video {
            width: raw.width.max(0) as u32,
            height: raw.height.max(0) as u32,
            pixel_format: announced_pixel_format(raw.format),
        },
        MediaType::Audio => StreamParameters::Audio {
            channels: raw.ch_layout.nb_channels.max(0) as u16,
            sample_rate: raw.sample_rate.max(0) as u32,
        },
        _ => StreamParameters::Other,
    };

    StreamDescriptor {
        index: stream.index(),
        media_type,
        codec_id,
        parameters,
        bit_rate: raw.bit_rate,
        time_base: stream.time_base(),
        average_frame_rate: stream.avg_frame_rate(),
        real_frame_rate: stream.rate(),
        start_time: stream.start_time(),
        duration: stream.duration(),
    }
}

/// The pixel format announced in the stream's codec parameters.
fn announced_pixel_format(raw_format: c_int) -> Option<Pixel> {
    if !(0..AVPixelFormat::AV_PIX_FMT_NB as c_int).contains(&raw_format) {
        return None;
    }
    // In range, so the value names a variant of the C enum.
    let format = Pixel::from(unsafe { mem::transmute::<c_int, AVPixelFormat>(raw_format) });
    if format == Pixel::None { None } else { Some(format) }
}

/// Raw path bytes on unix. Elsewhere the path must be valid UTF-8.
fn path_to_cstring(path: &Path) -> Option<CString> {
    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStrExt;
        CString::new(path.as_os_str().as_bytes()).ok()
    }
    #[cfg(not(unix))]
    {
        CString::new(path.to_str()?).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_nonexistent_file() {
        let result = FfmpegDemuxer::open("this_file_does_not_exist.mp4", Diagnostics::silent());
        let error = result.unwrap_err();
        assert!(matches!(error, FrameDumpError::FileOpen { .. }));
        assert!(error.to_string().contains("Failed to open media file"));
    }

    #[test]
    fn open_garbage_file() {
        let directory = tempfile::tempdir().expect("Failed to create temp dir");
        let path = directory.path().join("garbage.mp4");
        std::fs::write(&path, b"this is not a media file").expect("Failed to write file");

        let result = FfmpegDemuxer::open(&path, Diagnostics::silent()).and_then(|mut demuxer| {
            demuxer.probe_streams()?;
            Ok(demuxer)
        });
        assert!(result.is_err(), "garbage input must not open and probe cleanly");
    }

    #[test]
    fn pixel_format_comes_from_raw_parameters() {
        assert_eq!(
            announced_pixel_format(AVPixelFormat::AV_PIX_FMT_YUV420P as c_int),
            Some(Pixel::YUV420P)
        );
        assert_eq!(announced_pixel_format(AVPixelFormat::AV_PIX_FMT_RGB24 as c_int), Some(Pixel::RGB24));
        assert_eq!(announced_pixel_format(-1), None);
        assert_eq!(announced_pixel_format(c_int::MAX), None);
    }

    #[test]
    fn interior_nul_is_rejected() {
        let path = Path::new("clip\0.mp4");
        assert!(path_to_cstring(path).is_none());
        let result = FfmpegDemuxer::open(path, Diagnostics::silent());
        assert!(matches!(result, Err(FrameDumpError::FileOpen { .. })));
    }
}
