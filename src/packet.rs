//! Reusable compressed packet buffer.
//!
//! The extraction loop owns a single [`Packet`] for the whole run. Each
//! iteration the demuxer refills it and the driver releases it again before
//! the next read, whether or not the packet reached the decoder.

use ffmpeg_next::{Error as FfmpegError, Packet as FfmpegPacket, format::context::Input};

/// One compressed, stream-tagged unit of data.
pub struct Packet {
    inner: FfmpegPacket,
    released: bool,
}

impl std::fmt::Debug for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Packet")
            .field("stream_index", &self.stream_index())
            .field("pts", &self.pts())
            .field("size", &self.size())
            .field("released", &self.released)
            .finish()
    }
}

impl Default for Packet {
    fn default() -> Self {
        Self::empty()
    }
}

impl Packet {
    /// An empty, released packet ready to be filled.
    pub fn empty() -> Self {
        Self {
            inner: FfmpegPacket::empty(),
            released: true,
        }
    }

    /// Build a packet from raw bytes.
    ///
    /// Used by demuxers that do not sit on top of libavformat.
    pub fn from_bytes(stream_index: usize, pts: Option<i64>, data: &[u8]) -> Self {
        let mut inner = FfmpegPacket::copy(data);
        inner.set_stream(stream_index);
        inner.set_pts(pts);
        Self {
            inner,
            released: false,
        }
    }

    /// Replace the contents of this packet with another one.
    ///
    /// The previous buffer is released first.
    pub fn fill(&mut self, other: Packet) {
        self.inner = other.inner;
        self.released = other.released;
    }

    /// Read the next packet from an FFmpeg input context.
    pub(crate) fn read_from(&mut self, input: &mut Input) -> Result<(), FfmpegError> {
        if !self.released {
            self.release();
        }
        self.inner.read(input)?;
        self.released = false;
        Ok(())
    }

    /// Drop the compressed buffer. Calling this on a released packet is a
    /// no-op.
    pub fn release(&mut self) {
        if !self.released {
            self.inner = FfmpegPacket::empty();
            self.released = true;
        }
    }

    /// `true` once [`release`](Packet::release) has run and nothing has been
    /// read into the packet since.
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Index of the stream this packet belongs to.
    pub fn stream_index(&self) -> usize {
        self.inner.stream()
    }

    /// Presentation timestamp in the stream's time base.
    pub fn pts(&self) -> Option<i64> {
        self.inner.pts()
    }

    /// Whether the packet starts a key frame.
    pub fn is_key(&self) -> bool {
        self.inner.is_key()
    }

    /// Payload size in bytes.
    pub fn size(&self) -> usize {
        self.inner.size()
    }

    /// Payload bytes, `None` for an empty packet.
    pub fn data(&self) -> Option<&[u8]> {
        self.inner.data()
    }

    pub(crate) fn as_ffmpeg(&self) -> &FfmpegPacket {
        &self.inner
    }
}
