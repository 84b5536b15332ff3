//! PNG output.
//!
//! Frames handed to [`write_png`] must be RGB24. Rows are read at
//! `row * stride`, so padded frames straight out of libswscale are fine.
//! The PNG is 8-bit RGB, not interlaced, with the `image` crate's default
//! compression and adaptive filtering.

use std::{
    fs::{self, File, OpenOptions},
    io::{BufWriter, Write},
    path::Path,
};

use ffmpeg_next::{format::Pixel, frame::Video as VideoFrame};
use image::{RgbImage, codecs::png::PngEncoder};

use crate::{conversion::RGB24_BYTES_PER_PIXEL, error::FrameDumpError, utilities::frame_to_buffer};

/// Encode an RGB24 frame as a PNG file at `path`.
///
/// Without `overwrite` the file is created exclusively and an existing file
/// is an error. If encoding or flushing fails the partially written file is
/// removed.
///
/// # Errors
///
/// - [`FrameDumpError::InvalidFrame`] if the frame is not RGB24 or is empty.
/// - [`FrameDumpError::OutputFile`] if the file cannot be created or flushed.
/// - [`FrameDumpError::ImageEncode`] if PNG encoding fails.
pub fn write_png(frame: &VideoFrame, path: &Path, overwrite: bool) -> Result<(), FrameDumpError> {
    if frame.format() != Pixel::RGB24 {
        return Err(FrameDumpError::InvalidFrame(format!(
            "expected RGB24, got {:?}",
            frame.format()
        )));
    }

    let (width, height) = (frame.width(), frame.height());
    if width == 0 || height == 0 {
        return Err(FrameDumpError::InvalidFrame(format!(
            "frame has no pixels ({width}x{height})"
        )));
    }

    let buffer = frame_to_buffer(frame, width, height, RGB24_BYTES_PER_PIXEL);
    let rgb_image = RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
        FrameDumpError::InvalidFrame("Failed to construct RGB image from frame data".to_string())
    })?;

    let file = open_output(path, overwrite)?;
    encode_or_remove(&rgb_image, file, path)
}

/// Encode into `sink`, removing `path` if encoding or flushing fails.
fn encode_or_remove<W: Write>(rgb_image: &RgbImage, sink: W, path: &Path) -> Result<(), FrameDumpError> {
    let mut writer = BufWriter::new(sink);

    let result = match rgb_image.write_with_encoder(PngEncoder::new(&mut writer)) {
        Ok(()) => writer.flush().map_err(|source| FrameDumpError::OutputFile {
            path: path.to_path_buf(),
            source,
        }),
        Err(source) => Err(FrameDumpError::ImageEncode {
            path: path.to_path_buf(),
            source,
        }),
    };

    if result.is_err() {
        drop(writer);
        let _ = fs::remove_file(path);
    }
    result
}

fn open_output(path: &Path, overwrite: bool) -> Result<File, FrameDumpError> {
    let mut options = OpenOptions::new();
    options.write(true);
    if overwrite {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }

    options.open(path).map_err(|source| FrameDumpError::OutputFile {
        path: path.to_path_buf(),
        source,
    })
}
