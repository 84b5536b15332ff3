//! Internal utility functions.
//!
//! Helpers for pixel-data copying and timestamp conversion shared by the
//! converter, the image writer, and the extraction loop.

use std::time::Duration;

use ffmpeg_next::{Rational, frame::Video as VideoFrame};

/// Copy the first plane of a packed video frame into a tightly-packed buffer.
///
/// FFmpeg frames frequently carry per-row padding (stride > width × bpp).
/// The padding is stripped so the result can go straight to an image encoder.
/// `bytes_per_pixel` is 3 for RGB24.
pub fn frame_to_buffer(
    video_frame: &VideoFrame,
    width: u32,
    height: u32,
    bytes_per_pixel: usize,
) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let expected_stride = (width as usize) * bytes_per_pixel;
    let data = video_frame.data(0);

    if stride == expected_stride {
        data[..expected_stride * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(expected_stride * (height as usize));
        for row in 0..(height as usize) {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + expected_stride]);
        }
        buffer
    }
}

/// Rescale a PTS value from stream time base to seconds.
pub fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    if time_base.denominator() == 0 {
        return 0.0;
    }
    pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
}

/// Rescale a PTS value to a [`Duration`]. Negative timestamps clamp to zero.
///
/// Returns `None` when the result does not fit in a [`Duration`].
pub fn pts_to_duration(pts: i64, time_base: Rational) -> Option<Duration> {
    Duration::try_from_secs_f64(pts_to_seconds(pts, time_base).max(0.0)).ok()
}
