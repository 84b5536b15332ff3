//! The extraction loop.
//!
//! [`FrameExtractor`] wires the pipeline together: probe the container,
//! select a video stream, configure and open its decoder, then read packets
//! until the frame limit is exceeded or the container runs dry. Every decoded
//! frame is converted to RGB24 and written as `<prefix>-<n>.png`, where `n`
//! counts frames in decode order starting at 1.
//!
//! The stop check runs after the counter is incremented and compares with
//! `>`, so a limit of 10 writes frames 1 through 11.
//!
//! Teardown is unconditional: the decoder and the demuxer are closed whether
//! the run succeeds or fails, and the packet buffer is released after every
//! read.
//!
//! # Example
//!
//! ```no_run
//! use framedump::{ExtractOptions, FrameExtractor};
//!
//! let report = FrameExtractor::new(ExtractOptions::new()).run("input.mp4")?;
//! for path in &report.outputs {
//!     println!("{}", path.display());
//! }
//! # Ok::<(), framedump::FrameDumpError>(())
//! ```

use std::path::{Path, PathBuf};

use ffmpeg_next::{Rational, format::Pixel, frame::Video as VideoFrame};

use crate::{
    config::ExtractOptions,
    conversion::{PixelConverter, is_color_accurate},
    decoder::{DecoderRegistry, ReceiveOutcome, VideoDecoder},
    demux::{Demuxer, FfmpegDemuxer, ReadStatus},
    diagnostics::{Diagnostics, Stage},
    error::FrameDumpError,
    image_writer::write_png,
    metadata::ContainerInfo,
    packet::Packet,
    progress::ProgressTracker,
    selection::select_video_stream,
    utilities::pts_to_duration,
};

/// Why the loop stopped reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The frame counter went past the configured limit.
    FrameLimit,
    /// The container had no more packets and the decoder was drained.
    EndOfStream,
}

/// Summary of a finished run.
#[derive(Debug, Clone)]
pub struct ExtractionReport {
    pub container: ContainerInfo,
    /// Index of the decoded video stream.
    pub video_stream_index: usize,
    /// Decoder used for that stream.
    pub codec_name: String,
    pub frames_written: u64,
    /// Packets read from every stream.
    pub packets_read: u64,
    /// Packets that belonged to other streams and were dropped unread.
    pub packets_discarded: u64,
    /// Written files in decode order.
    pub outputs: Vec<PathBuf>,
    pub stop_reason: StopReason,
}

/// Runs one extraction per call.
#[derive(Debug, Clone)]
pub struct FrameExtractor {
    options: ExtractOptions,
    registry: DecoderRegistry,
}

impl FrameExtractor {
    /// An extractor that decodes with any video decoder libavcodec provides.
    pub fn new(options: ExtractOptions) -> Self {
        Self {
            options,
            registry: DecoderRegistry::with_ffmpeg(),
        }
    }

    /// Replace the decoder registry.
    #[must_use]
    pub fn with_registry(mut self, registry: DecoderRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Open `path` and extract frames from it.
    ///
    /// # Errors
    ///
    /// Any [`FrameDumpError`] from opening, probing, stream selection,
    /// decoding, conversion or output. All are fatal.
    pub fn run<P: AsRef<Path>>(&self, path: P) -> Result<ExtractionReport, FrameDumpError> {
        let mut demuxer = FfmpegDemuxer::open(path, self.options.diagnostics.clone())?;
        self.run_with(&mut demuxer)
    }

    /// Extract frames from an already opened demuxer.
    ///
    /// The demuxer is closed before this returns, on success and on error.
    pub fn run_with<D: Demuxer + ?Sized>(&self, demuxer: &mut D) -> Result<ExtractionReport, FrameDumpError> {
        let result = self.extract(demuxer);
        demuxer.close();

        if let Err(error) = &result {
            self.diagnostics().error(Stage::Driver, format_args!("{error}"));
        }
        result
    }

    fn diagnostics(&self) -> &Diagnostics {
        &self.options.diagnostics
    }

    fn extract<D: Demuxer + ?Sized>(&self, demuxer: &mut D) -> Result<ExtractionReport, FrameDumpError> {
        demuxer.probe_streams()?;

        let selection = select_video_stream(demuxer.streams(), &self.registry, self.diagnostics())?;
        let parameters = demuxer.codec_parameters(selection.stream_index).ok_or_else(|| {
            FrameDumpError::DecoderAlloc(format!(
                "no codec parameters for stream {}",
                selection.stream_index
            ))
        })?;

        let mut decoder = selection.factory.configure(&selection.stream, parameters)?;
        let codec_name = decoder.codec_name().to_string();
        self.diagnostics().debug(
            Stage::Decoder,
            format_args!("Opening {codec_name} decoder for stream {}", selection.stream_index),
        );

        let mut session = Session::new(&self.options, selection.stream_index, selection.stream.time_base);
        let outcome = decoder
            .open()
            .and_then(|()| session.decode(demuxer, decoder.as_mut()));
        decoder.close();
        let stop_reason = outcome?;

        self.diagnostics().info(
            Stage::Driver,
            format_args!(
                "Wrote {} frame(s), read {} packet(s), discarded {}",
                session.outputs.len(),
                session.packets_read,
                session.packets_discarded
            ),
        );

        Ok(ExtractionReport {
            container: demuxer.container().clone(),
            video_stream_index: selection.stream_index,
            codec_name,
            frames_written: session.outputs.len() as u64,
            packets_read: session.packets_read,
            packets_discarded: session.packets_discarded,
            outputs: session.outputs,
            stop_reason,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Per-run loop state.
struct Session<'a> {
    options: &'a ExtractOptions,
    stream_index: usize,
    time_base: Rational,
    converter: PixelConverter,
    progress: ProgressTracker,
    decoded_frame: VideoFrame,
    frame_counter: u64,
    packets_read: u64,
    packets_discarded: u64,
    outputs: Vec<PathBuf>,
    warned_format: Option<Pixel>,
}

impl<'a> Session<'a> {
    fn new(options: &'a ExtractOptions, stream_index: usize, time_base: Rational) -> Self {
        Self {
            options,
            stream_index,
            time_base,
            converter: PixelConverter::new(),
            progress: ProgressTracker::new(options.progress.clone(), Some(options.max_frames())),
            decoded_frame: VideoFrame::empty(),
            frame_counter: 0,
            packets_read: 0,
            packets_discarded: 0,
            outputs: Vec::new(),
            warned_format: None,
        }
    }

    fn diagnostics(&self) -> &Diagnostics {
        &self.options.diagnostics
    }

    fn decode<D: Demuxer + ?Sized>(
        &mut self,
        demuxer: &mut D,
        decoder: &mut dyn VideoDecoder,
    ) -> Result<StopReason, FrameDumpError> {
        let mut packet = Packet::empty();

        loop {
            let flow = match demuxer.read_packet(&mut packet) {
                Ok(ReadStatus::Packet) => self.handle_packet(&packet, decoder),
                Ok(ReadStatus::EndOfStream) => {
                    packet.release();
                    break;
                }
                Err(error) => Err(error),
            };
            packet.release();

            if flow? == Flow::Stop {
                return Ok(StopReason::FrameLimit);
            }
        }

        self.diagnostics()
            .debug(Stage::Driver, format_args!("End of stream after {} packet(s)", self.packets_read));

        if self.options.flush_decoder {
            decoder.submit_eof()?;
            if self.drain(decoder)? == Flow::Stop {
                return Ok(StopReason::FrameLimit);
            }
        }

        Ok(StopReason::EndOfStream)
    }

    fn handle_packet(&mut self, packet: &Packet, decoder: &mut dyn VideoDecoder) -> Result<Flow, FrameDumpError> {
        self.packets_read += 1;

        if packet.stream_index() != self.stream_index {
            self.packets_discarded += 1;
            return Ok(Flow::Continue);
        }

        self.diagnostics().debug(
            Stage::Decoder,
            format_args!(
                "Sending packet to decoder (stream {}, pts {:?}, {} bytes, key {})",
                packet.stream_index(),
                packet.pts(),
                packet.size(),
                packet.is_key()
            ),
        );

        decoder.submit(packet)?;
        self.drain(decoder)
    }

    fn drain(&mut self, decoder: &mut dyn VideoDecoder) -> Result<Flow, FrameDumpError> {
        loop {
            match decoder.receive(&mut self.decoded_frame)? {
                ReceiveOutcome::Frame => {
                    if self.write_frame()? == Flow::Stop {
                        return Ok(Flow::Stop);
                    }
                }
                ReceiveOutcome::NeedsMoreInput | ReceiveOutcome::EndOfStream => return Ok(Flow::Continue),
            }
        }
    }

    fn write_frame(&mut self) -> Result<Flow, FrameDumpError> {
        self.frame_counter += 1;
        let frame_number = self.frame_counter;
        let format = self.decoded_frame.format();
        let pts = self.decoded_frame.timestamp().or(self.decoded_frame.pts());

        self.diagnostics().info(
            Stage::Decoder,
            format_args!(
                "Frame {frame_number} (type={:?}, format={format:?}, {}x{}) pts {pts:?} key_frame {}",
                self.decoded_frame.kind(),
                self.decoded_frame.width(),
                self.decoded_frame.height(),
                self.decoded_frame.is_key()
            ),
        );

        if !is_color_accurate(format) && self.warned_format != Some(format) {
            self.diagnostics().warn(
                Stage::Converter,
                format_args!("Source format {format:?} is not YUV420P; colours may be inaccurate"),
            );
            self.warned_format = Some(format);
        }

        let rgb_frame = self.converter.convert(&self.decoded_frame)?;
        let path = self.options.output_path(frame_number);
        write_png(&rgb_frame, &path, self.options.overwrite)?;

        self.diagnostics()
            .debug(Stage::Encoder, format_args!("Wrote {}", path.display()));

        let timestamp = pts.and_then(|pts| pts_to_duration(pts, self.time_base));
        self.progress.advance(frame_number, timestamp, path.clone());
        self.outputs.push(path);

        if frame_number > self.options.frame_limit {
            self.diagnostics().info(
                Stage::Driver,
                format_args!("Frame counter {frame_number} passed limit {}", self.options.frame_limit),
            );
            return Ok(Flow::Stop);
        }
        Ok(Flow::Continue)
    }
}
