//! Host-facing decoder instance
//!
//! The host keeps one [`AdapterStatus`] per opened file and calls the
//! streaming methods on it. An invalid instance answers every query with
//! failure, zero or `None`.

use serde::Serialize;

use super::file_info::FileInfo;
use crate::decoder::Rx2Decoder;
use crate::error::{DecodeError, Result};

/// Sample encoding of the decoded stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SampleFormat {
    /// 32-bit IEEE float, native endian, interleaved
    Float32,
}

/// Stream parameters reported to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreamInfo {
    pub sample_rate: u32,
    pub channels: usize,
    pub format: SampleFormat,
}

/// Outcome of decoder creation as the host sees it
#[derive(Debug)]
pub enum AdapterStatus {
    Valid(Box<Rx2Decoder>),
    Invalid(DecodeError),
}

impl From<Result<Rx2Decoder>> for AdapterStatus {
    fn from(result: Result<Rx2Decoder>) -> Self {
        match result {
            Ok(decoder) => AdapterStatus::Valid(Box::new(decoder)),
            Err(e) => AdapterStatus::Invalid(e),
        }
    }
}

impl AdapterStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, AdapterStatus::Valid(_))
    }

    pub fn decoder(&self) -> Option<&Rx2Decoder> {
        match self {
            AdapterStatus::Valid(decoder) => Some(&**decoder),
            AdapterStatus::Invalid(_) => None,
        }
    }

    fn decoder_mut(&mut self) -> Option<&mut Rx2Decoder> {
        match self {
            AdapterStatus::Valid(decoder) => Some(&mut **decoder),
            AdapterStatus::Invalid(_) => None,
        }
    }

    /// Error that made this instance invalid
    pub fn last_error(&self) -> Option<&DecodeError> {
        match self {
            AdapterStatus::Valid(_) => None,
            AdapterStatus::Invalid(e) => Some(e),
        }
    }

    pub fn stream_info(&self) -> Option<StreamInfo> {
        self.decoder().map(|d| StreamInfo {
            sample_rate: d.sample_rate(),
            channels: d.channels(),
            format: SampleFormat::Float32,
        })
    }

    pub fn is_seekable(&self) -> bool {
        self.is_valid()
    }

    /// The whole loop is in memory; never a live stream
    pub fn is_real_time(&self) -> bool {
        false
    }

    pub fn available_data(&self) -> u64 {
        self.decoder().map_or(0, |d| d.cursor().available_bytes())
    }

    pub fn size(&self) -> u64 {
        self.decoder().map_or(0, |d| d.cursor().total_bytes())
    }

    pub fn position(&self) -> u64 {
        self.decoder().map_or(0, |d| d.cursor().position_bytes())
    }

    /// Seek to a byte offset; false on an invalid instance
    pub fn set_position(&mut self, byte_offset: i64) -> bool {
        match self.decoder_mut() {
            Some(d) => {
                d.cursor_mut().seek(byte_offset);
                true
            }
            None => false,
        }
    }

    /// Copy whole frames into `dest`; returns bytes written
    pub fn read(&mut self, dest: &mut [u8]) -> usize {
        self.decoder_mut().map_or(0, |d| d.cursor_mut().read(dest))
    }

    pub fn file_info(&self) -> Option<FileInfo> {
        self.decoder().map(FileInfo::from_decoder)
    }
}
