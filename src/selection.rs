//! Video stream selection.
//!
//! Streams are inspected in ascending index order. The first video stream
//! whose codec resolves in the [`DecoderRegistry`] is selected; every other
//! stream is logged and left alone.

use std::{fmt, sync::Arc};

use crate::{
    decoder::{DecoderFactory, DecoderRegistry},
    diagnostics::{Diagnostics, Stage},
    error::FrameDumpError,
    metadata::{StreamDescriptor, StreamParameters},
};

/// The stream the extraction loop decodes.
#[derive(Clone)]
pub struct VideoSelection {
    /// Index of the selected stream.
    pub stream_index: usize,
    /// Name of the decoder that will be used.
    pub codec_name: String,
    /// Descriptor of the selected stream.
    pub stream: StreamDescriptor,
    /// Factory that builds the decoder.
    pub factory: Arc<dyn DecoderFactory>,
}

impl fmt::Debug for VideoSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoSelection")
            .field("stream_index", &self.stream_index)
            .field("codec_name", &self.codec_name)
            .field("stream", &self.stream)
            .finish_non_exhaustive()
    }
}

/// Pick the first decodable video stream.
///
/// # Errors
///
/// Returns [`FrameDumpError::NoVideoStream`] when no video stream has a
/// decoder in `registry`.
pub fn select_video_stream(
    streams: &[StreamDescriptor],
    registry: &DecoderRegistry,
    diagnostics: &Diagnostics,
) -> Result<VideoSelection, FrameDumpError> {
    let mut ordered: Vec<&StreamDescriptor> = streams.iter().collect();
    ordered.sort_by_key(|stream| stream.index);

    let mut selection: Option<VideoSelection> = None;

    for stream in ordered {
        diagnostics.info(
            Stage::Selector,
            format_args!(
                "Stream {}: time base {}/{}, real frame rate {}/{}, start {}, duration {}",
                stream.index,
                stream.time_base.numerator(),
                stream.time_base.denominator(),
                stream.real_frame_rate.numerator(),
                stream.real_frame_rate.denominator(),
                stream.start_time,
                stream.duration
            ),
        );

        let (width, height) = match stream.parameters {
            StreamParameters::Video { width, height, .. } => (width, height),
            StreamParameters::Audio { channels, sample_rate } => {
                diagnostics.info(
                    Stage::Selector,
                    format_args!("Audio codec: {channels} channels, sample rate {sample_rate}"),
                );
                continue;
            }
            StreamParameters::Other => continue,
        };

        let Some(factory) = registry.resolve(stream.codec_id) else {
            diagnostics.warn(
                Stage::Selector,
                format_args!("Stream {}: unsupported codec {:?}, skipping", stream.index, stream.codec_id),
            );
            continue;
        };

        diagnostics.info(
            Stage::Selector,
            format_args!(
                "Video codec: resolution {width} x {height}, decoder {}, bit rate {}",
                factory.name(),
                stream.bit_rate
            ),
        );

        if selection.is_none() {
            selection = Some(VideoSelection {
                stream_index: stream.index,
                codec_name: factory.name().to_string(),
                stream: stream.clone(),
                factory,
            });
        }
    }

    let selection = selection.ok_or(FrameDumpError::NoVideoStream)?;
    diagnostics.info(
        Stage::Selector,
        format_args!(
            "Selected video stream {} ({})",
            selection.stream_index, selection.codec_name
        ),
    );
    Ok(selection)
}

#[cfg(test)]
mod tests {
    use ffmpeg_next::{
        Rational,
        codec::{Id as CodecId, Parameters},
        format::Pixel,
        media::Type as MediaType,
    };

    use super::*;
    use crate::decoder::VideoDecoder;

    struct NamedFactory(&'static str);

    impl DecoderFactory for NamedFactory {
        fn name(&self) -> &str {
            self.0
        }

        fn configure(
            &self,
            _stream: &StreamDescriptor,
            _parameters: Parameters,
        ) -> Result<Box<dyn VideoDecoder>, FrameDumpError> {
            Err(FrameDumpError::DecoderAlloc("not used".to_string()))
        }
    }

    fn stream(index: usize, codec_id: CodecId, parameters: StreamParameters) -> StreamDescriptor {
        let media_type = match parameters {
            StreamParameters::Video { .. } => MediaType::Video,
            StreamParameters::Audio { .. } => MediaType::Audio,
            StreamParameters::Other => MediaType::Data,
        };
        StreamDescriptor {
            index,
            media_type,
            codec_id,
            parameters,
            bit_rate: 0,
            time_base: Rational::new(1, 90_000),
            average_frame_rate: Rational::new(30, 1),
            real_frame_rate: Rational::new(30, 1),
            start_time: 0,
            duration: 0,
        }
    }

    fn video(index: usize, codec_id: CodecId) -> StreamDescriptor {
        stream(
            index,
            codec_id,
            StreamParameters::Video {
                width: 320,
                height: 240,
                pixel_format: Some(Pixel::YUV420P),
            },
        )
    }

    fn audio(index: usize) -> StreamDescriptor {
        stream(
            index,
            CodecId::AAC,
            StreamParameters::Audio {
                channels: 2,
                sample_rate: 48_000,
            },
        )
    }

    fn registry() -> DecoderRegistry {
        DecoderRegistry::empty()
            .register(CodecId::H264, Arc::new(NamedFactory("h264")))
            .register(CodecId::VP9, Arc::new(NamedFactory("vp9")))
    }

    #[test]
    fn picks_first_decodable_video_after_audio() {
        let streams = vec![audio(0), video(1, CodecId::H264), video(2, CodecId::VP9)];
        let selection = select_video_stream(&streams, &registry(), &Diagnostics::silent()).unwrap();
        assert_eq!(selection.stream_index, 1);
        assert_eq!(selection.codec_name, "h264");
    }

    #[test]
    fn skips_unsupported_video_codec() {
        let streams = vec![video(0, CodecId::HEVC), video(1, CodecId::VP9)];
        let selection = select_video_stream(&streams, &registry(), &Diagnostics::silent()).unwrap();
        assert_eq!(selection.stream_index, 1);
    }

    #[test]
    fn inspects_in_index_order() {
        let streams = vec![video(3, CodecId::VP9), video(1, CodecId::H264)];
        let selection = select_video_stream(&streams, &registry(), &Diagnostics::silent()).unwrap();
        assert_eq!(selection.stream_index, 1);
    }

    #[test]
    fn audio_only_has_no_video_stream() {
        let streams = vec![audio(0), audio(1)];
        let result = select_video_stream(&streams, &registry(), &Diagnostics::silent());
        assert!(matches!(result, Err(FrameDumpError::NoVideoStream)));
    }

    #[test]
    fn empty_container_has_no_video_stream() {
        let result = select_video_stream(&[], &registry(), &Diagnostics::silent());
        assert!(matches!(result, Err(FrameDumpError::NoVideoStream)));
    }
}
