//! End-to-end tests against real containers.
//!
//! The YUV4MPEG2 tests write their input on the fly. Tests on MP4/M4A media
//! return early unless the fixtures from `tests/fixtures/generate_fixtures.sh`
//! are present.

use std::path::{Path, PathBuf};

use ffmpeg_next::format::Pixel;

use framedump::{
    Demuxer, Diagnostics, ExtractOptions, FfmpegDemuxer, FrameDumpError, FrameExtractor, Packet, ReadStatus,
    SilentSink, StopReason,
};

fn audio_then_video_path() -> &'static str {
    "tests/fixtures/audio_then_video.mp4"
}

fn sample_video_path() -> &'static str {
    "tests/fixtures/sample_video.mp4"
}

fn audio_only_path() -> &'static str {
    "tests/fixtures/audio_only.m4a"
}

const Y4M_WIDTH: u32 = 32;
const Y4M_HEIGHT: u32 = 24;

/// Write a YUV4MPEG2 stream of `frames` 4:2:0 pictures with rising luma.
fn write_y4m(path: &Path, frames: usize) {
    let luma = (Y4M_WIDTH * Y4M_HEIGHT) as usize;
    let mut bytes = format!("YUV4MPEG2 W{Y4M_WIDTH} H{Y4M_HEIGHT} F25:1 Ip A1:1 C420jpeg\n").into_bytes();
    for frame in 0..frames {
        bytes.extend_from_slice(b"FRAME\n");
        bytes.extend(std::iter::repeat_n(16 + (frame * 8) as u8, luma));
        bytes.extend(std::iter::repeat_n(128, luma / 2));
    }
    std::fs::write(path, bytes).expect("Failed to write y4m input");
}

fn y4m_input(directory: &Path, frames: usize) -> PathBuf {
    let path = directory.join("input.y4m");
    write_y4m(&path, frames);
    path
}

fn quiet_options(output: &Path) -> ExtractOptions {
    ExtractOptions::new()
        .with_output_directory(output)
        .with_diagnostics(std::sync::Arc::new(SilentSink))
}

#[test]
fn open_nonexistent_file() {
    let result = FrameExtractor::new(ExtractOptions::new()).run("does_not_exist.mp4");
    assert!(matches!(result, Err(FrameDumpError::FileOpen { .. })));
}

#[test]
fn open_text_file_fails() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let path = directory.path().join("notes.txt");
    std::fs::write(&path, "plain text, not a container").unwrap();

    let result = FrameExtractor::new(quiet_options(directory.path())).run(&path);
    assert!(result.is_err());
}

#[test]
fn extracts_eleven_frames_from_audio_then_video() {
    let path = audio_then_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let output = tempfile::tempdir().expect("Failed to create temp dir");
    let report = FrameExtractor::new(quiet_options(output.path()))
        .run(path)
        .expect("Failed to extract frames");

    assert_eq!(report.video_stream_index, 1);
    assert_eq!(report.frames_written, 11);
    assert_eq!(report.stop_reason, StopReason::FrameLimit);
    assert!(report.packets_discarded > 0, "audio packets should be discarded");

    for n in 1..=11 {
        let image = image::open(output.path().join(format!("frame-{n}.png")))
            .expect("Failed to open written frame")
            .to_rgb8();
        assert_eq!(image.dimensions(), (160, 120));
    }
    assert!(!output.path().join("frame-12.png").exists());
}

#[test]
fn probing_does_not_lose_leading_packets() {
    let path = audio_then_video_path();
    if !Path::new(path).exists() {
        return;
    }

    // All 15 frames come out when the limit is out of reach.
    let output = tempfile::tempdir().expect("Failed to create temp dir");
    let report = FrameExtractor::new(quiet_options(output.path()).with_frame_limit(100))
        .run(path)
        .expect("Failed to extract frames");

    assert_eq!(report.frames_written, 15);
    assert_eq!(report.stop_reason, StopReason::EndOfStream);
}

#[test]
fn flushing_recovers_delayed_frames() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let flushed_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let flushed = FrameExtractor::new(quiet_options(flushed_dir.path()).with_frame_limit(1000))
        .run(path)
        .unwrap();

    let unflushed_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let unflushed = FrameExtractor::new(
        quiet_options(unflushed_dir.path())
            .with_frame_limit(1000)
            .with_flush_decoder(false),
    )
    .run(path)
    .unwrap();

    assert_eq!(flushed.frames_written, 40);
    assert!(unflushed.frames_written <= flushed.frames_written);
}

#[test]
fn audio_only_file_has_no_video_stream() {
    let path = audio_only_path();
    if !Path::new(path).exists() {
        return;
    }

    let output = tempfile::tempdir().expect("Failed to create temp dir");
    let result = FrameExtractor::new(quiet_options(output.path())).run(path);
    assert!(matches!(result, Err(FrameDumpError::NoVideoStream)));
    assert_eq!(std::fs::read_dir(output.path()).unwrap().count(), 0);
}

#[test]
fn demuxer_describes_streams() {
    let path = audio_then_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let mut demuxer = FfmpegDemuxer::open(path, Diagnostics::silent()).expect("Failed to open");
    assert!(demuxer.streams().is_empty());
    assert!(demuxer.container().duration().is_some());

    demuxer.probe_streams().expect("Failed to probe");
    demuxer.probe_streams().expect("Second probe should be a no-op");

    let streams = demuxer.streams();
    assert_eq!(streams.len(), 2);
    assert!(streams[0].is_audio());
    assert!(streams[1].is_video());
    assert_eq!(streams[1].dimensions(), Some((160, 120)));
    assert!(demuxer.codec_parameters(1).is_some());
    assert!(demuxer.codec_parameters(7).is_none());
}

#[test]
fn demuxer_close_is_idempotent() {
    let path = audio_then_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let mut demuxer = FfmpegDemuxer::open(path, Diagnostics::silent()).expect("Failed to open");
    demuxer.probe_streams().unwrap();

    let mut packet = Packet::empty();
    assert_eq!(demuxer.read_packet(&mut packet).unwrap(), ReadStatus::Packet);
    assert!(!packet.is_released());
    packet.release();

    demuxer.close();
    demuxer.close();

    let result = demuxer.read_packet(&mut packet);
    assert!(matches!(result, Err(FrameDumpError::PacketRead(_))));
}

#[test]
fn demuxer_reaches_end_of_stream() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let mut demuxer = FfmpegDemuxer::open(path, Diagnostics::silent()).expect("Failed to open");
    demuxer.probe_streams().unwrap();

    let mut packet = Packet::empty();
    let mut packets = 0;
    while demuxer.read_packet(&mut packet).unwrap() == ReadStatus::Packet {
        packets += 1;
        packet.release();
    }
    assert!(packets >= 40);
    assert!(packet.is_released());
}

#[test]
fn y4m_limit_of_ten_writes_eleven_frames() {
    let input = tempfile::tempdir().expect("Failed to create temp dir");
    let path = y4m_input(input.path(), 15);

    let output = tempfile::tempdir().expect("Failed to create temp dir");
    let report = FrameExtractor::new(quiet_options(output.path()))
        .run(&path)
        .expect("Failed to extract frames");

    assert_eq!(report.video_stream_index, 0);
    assert_eq!(report.codec_name, "rawvideo");
    assert_eq!(report.frames_written, 11);
    assert_eq!(report.stop_reason, StopReason::FrameLimit);
    assert_eq!(report.packets_discarded, 0);

    for n in 1..=11 {
        let image = image::open(output.path().join(format!("frame-{n}.png")))
            .expect("Failed to open written frame")
            .to_rgb8();
        assert_eq!(image.dimensions(), (Y4M_WIDTH, Y4M_HEIGHT));
    }
    assert!(!output.path().join("frame-12.png").exists());
}

#[test]
fn probing_keeps_every_packet_of_a_y4m_stream() {
    let input = tempfile::tempdir().expect("Failed to create temp dir");
    let path = y4m_input(input.path(), 15);

    let output = tempfile::tempdir().expect("Failed to create temp dir");
    let report = FrameExtractor::new(quiet_options(output.path()).with_frame_limit(100))
        .run(&path)
        .expect("Failed to extract frames");

    assert_eq!(report.frames_written, 15);
    assert_eq!(report.packets_read, 15);
    assert_eq!(report.stop_reason, StopReason::EndOfStream);

    // Luma rises by 8 per picture, so the first PNG must be the darkest one.
    let first = image::open(output.path().join("frame-1.png")).unwrap().to_rgb8();
    let second = image::open(output.path().join("frame-2.png")).unwrap().to_rgb8();
    assert!(first.get_pixel(0, 0).0[0] < second.get_pixel(0, 0).0[0]);
}

#[test]
fn y4m_demuxer_describes_and_reads_its_stream() {
    let input = tempfile::tempdir().expect("Failed to create temp dir");
    let path = y4m_input(input.path(), 6);

    let mut demuxer = FfmpegDemuxer::open(&path, Diagnostics::silent()).expect("Failed to open");
    assert!(demuxer.streams().is_empty());
    demuxer.probe_streams().expect("Failed to probe");
    demuxer.probe_streams().expect("Second probe should be a no-op");

    let streams = demuxer.streams();
    assert_eq!(streams.len(), 1);
    assert!(streams[0].is_video());
    assert_eq!(streams[0].dimensions(), Some((Y4M_WIDTH, Y4M_HEIGHT)));
    assert!(demuxer.codec_parameters(0).is_some());
    assert!(demuxer.codec_parameters(3).is_none());

    let mut packet = Packet::empty();
    let mut packets = 0;
    while demuxer.read_packet(&mut packet).unwrap() == ReadStatus::Packet {
        assert_eq!(packet.stream_index(), 0);
        packets += 1;
        packet.release();
    }
    assert_eq!(packets, 6);
    assert!(packet.is_released());
}

#[test]
fn y4m_announces_yuv420p() {
    let input = tempfile::tempdir().expect("Failed to create temp dir");
    let path = y4m_input(input.path(), 2);

    let mut demuxer = FfmpegDemuxer::open(&path, Diagnostics::silent()).expect("Failed to open");
    demuxer.probe_streams().unwrap();
    match demuxer.streams()[0].parameters {
        framedump::StreamParameters::Video { pixel_format, .. } => {
            assert_eq!(pixel_format, Some(Pixel::YUV420P));
        }
        ref other => panic!("expected video parameters, got {other:?}"),
    }
}

#[test]
fn y4m_demuxer_close_is_idempotent() {
    let input = tempfile::tempdir().expect("Failed to create temp dir");
    let path = y4m_input(input.path(), 3);

    let mut demuxer = FfmpegDemuxer::open(&path, Diagnostics::silent()).expect("Failed to open");
    demuxer.probe_streams().unwrap();

    let mut packet = Packet::empty();
    assert_eq!(demuxer.read_packet(&mut packet).unwrap(), ReadStatus::Packet);
    packet.release();

    demuxer.close();
    demuxer.close();

    let result = demuxer.read_packet(&mut packet);
    assert!(matches!(result, Err(FrameDumpError::PacketRead(_))));
    assert!(demuxer.codec_parameters(0).is_none());
}

#[cfg(unix)]
#[test]
fn non_utf8_path_opens() {
    use std::{ffi::OsStr, os::unix::ffi::OsStrExt};

    let input = tempfile::tempdir().expect("Failed to create temp dir");
    let path = input.path().join(OsStr::from_bytes(b"clip-\xff.y4m"));
    write_y4m(&path, 2);

    let output = tempfile::tempdir().expect("Failed to create temp dir");
    let report = FrameExtractor::new(quiet_options(output.path()))
        .run(&path)
        .expect("a non-UTF-8 path should open");
    assert_eq!(report.frames_written, 2);
}
