//! Pixel format conversion to packed RGB24.
//!
//! [`PixelConverter`] wraps a libswscale context. The output always has the
//! same dimensions as the input and is produced with bilinear filtering.
//! The context is built on the first frame and rebuilt only when the source
//! format or size changes mid-stream.

use ffmpeg_next::{
    format::Pixel,
    frame::Video as VideoFrame,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};

use crate::error::FrameDumpError;

/// Bytes per pixel of the converter's output.
pub const RGB24_BYTES_PER_PIXEL: usize = 3;

/// Whether the conversion from `format` is known to produce accurate
/// colours. Only planar YUV 4:2:0 is verified.
pub fn is_color_accurate(format: Pixel) -> bool {
    format == Pixel::YUV420P
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScalerKey {
    format: Pixel,
    width: u32,
    height: u32,
}

/// Converts decoded frames to RGB24 at identical dimensions.
#[derive(Default)]
pub struct PixelConverter {
    scaler: Option<(ScalerKey, ScalingContext)>,
}

impl std::fmt::Debug for PixelConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelConverter")
            .field("source", &self.scaler.as_ref().map(|(key, _)| *key))
            .finish()
    }
}

impl PixelConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert `source` into a freshly allocated RGB24 frame.
    ///
    /// The presentation timestamp is carried over.
    ///
    /// # Errors
    ///
    /// Returns [`FrameDumpError::ConversionError`] for empty frames, for
    /// source formats libswscale cannot read, or when scaling fails.
    pub fn convert(&mut self, source: &VideoFrame) -> Result<VideoFrame, FrameDumpError> {
        let key = ScalerKey {
            format: source.format(),
            width: source.width(),
            height: source.height(),
        };

        if key.width == 0 || key.height == 0 || key.format == Pixel::None {
            return Err(FrameDumpError::ConversionError(format!(
                "cannot convert a {}x{} frame in format {:?}",
                key.width, key.height, key.format
            )));
        }

        let scaler = self.scaler_for(key)?;

        let mut rgb_frame = VideoFrame::new(Pixel::RGB24, key.width, key.height);
        scaler
            .run(source, &mut rgb_frame)
            .map_err(|error| FrameDumpError::ConversionError(error.to_string()))?;
        rgb_frame.set_pts(source.pts());

        Ok(rgb_frame)
    }

    fn scaler_for(&mut self, key: ScalerKey) -> Result<&mut ScalingContext, FrameDumpError> {
        let stale = self
            .scaler
            .as_ref()
            .is_none_or(|(current, _)| *current != key);

        if stale {
            let context = ScalingContext::get(
                key.format,
                key.width,
                key.height,
                Pixel::RGB24,
                key.width,
                key.height,
                ScalingFlags::BILINEAR,
            )
            .map_err(|error| {
                FrameDumpError::ConversionError(format!(
                    "cannot convert from {:?} ({}x{}): {error}",
                    key.format, key.width, key.height
                ))
            })?;
            self.scaler = Some((key, context));
        }

        self.scaler
            .as_mut()
            .map(|(_, context)| context)
            .ok_or_else(|| FrameDumpError::ConversionError("scaler unavailable".to_string()))
    }
}
