//! Byte-addressed stream cursor over a [`PcmStore`]
//!
//! Positions are kept in frames; the byte interface rounds down to whole
//! frames and clamps to the end of the store.

use std::io;
use std::sync::Arc;

use super::pcm::{PcmStore, BYTES_PER_SAMPLE};

/// Read position into a shared PCM store
///
/// Many cursors may share one store; each cursor is a single reader.
#[derive(Debug, Clone)]
pub struct StreamCursor {
    store: Arc<PcmStore>,
    position: usize,
}

impl StreamCursor {
    pub fn new(store: Arc<PcmStore>) -> Self {
        Self { store, position: 0 }
    }

    pub fn store(&self) -> &Arc<PcmStore> {
        &self.store
    }

    /// Current position in frames
    pub fn position_frames(&self) -> usize {
        self.position
    }

    pub fn total_bytes(&self) -> u64 {
        self.store.total_bytes() as u64
    }

    pub fn position_bytes(&self) -> u64 {
        (self.position * self.store.frame_bytes()) as u64
    }

    /// Bytes left between the position and the end
    pub fn available_bytes(&self) -> u64 {
        ((self.store.frames() - self.position) * self.store.frame_bytes()) as u64
    }

    /// Move to `byte_offset`, rounded down to a frame and clamped to the store
    pub fn seek(&mut self, byte_offset: i64) {
        let frame_bytes = self.store.frame_bytes() as i64;
        let frame = (byte_offset.max(0) / frame_bytes) as u64;
        self.position = frame.min(self.store.frames() as u64) as usize;
    }

    /// Copy whole frames into `dest` in native-endian `f32`
    ///
    /// Returns the number of bytes written; 0 at the end of the store or when
    /// `dest` cannot hold a single frame. Through `std::io::Read` a short
    /// buffer therefore looks like end of stream.
    pub fn read(&mut self, dest: &mut [u8]) -> usize {
        let channels = self.store.channels();
        let remaining = self.store.frames() - self.position;
        let frames = (dest.len() / self.store.frame_bytes()).min(remaining);
        if frames == 0 {
            return 0;
        }

        let start = self.position * channels;
        let samples = &self.store.samples()[start..start + frames * channels];
        for (chunk, sample) in dest.chunks_exact_mut(BYTES_PER_SAMPLE).zip(samples) {
            chunk.copy_from_slice(&sample.to_ne_bytes());
        }

        self.position += frames;
        frames * self.store.frame_bytes()
    }
}

impl io::Read for StreamCursor {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(StreamCursor::read(self, buf))
    }
}

impl io::Seek for StreamCursor {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let target = match pos {
            io::SeekFrom::Start(offset) => i64::try_from(offset).unwrap_or(i64::MAX),
            io::SeekFrom::End(delta) => (self.total_bytes() as i64).saturating_add(delta),
            io::SeekFrom::Current(delta) => (self.position_bytes() as i64).saturating_add(delta),
        };
        StreamCursor::seek(self, target);
        Ok(self.position_bytes())
    }
}
