//! Decoder creation from a host stream
//!
//! Before building a decoder the stream goes through a cheap preflight:
//! obviously foreign data is refused silently, and a bounded prefix of the
//! file is header-checked so broken REX files fail before the expensive
//! construction.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use super::format::{self, SIGNATURE_LEN};
use crate::config::DecoderConfig;
use crate::decoder::{validate_header, Rx2Decoder};
use crate::error::{DecodeError, Result};
use crate::sdk::RexEngine;

/// Creates decoders for REX streams
pub struct DecoderExtension {
    engine: Arc<dyn RexEngine>,
    config: DecoderConfig,
}

impl DecoderExtension {
    pub fn new(engine: Arc<dyn RexEngine>, config: DecoderConfig) -> Self {
        Self { engine, config }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn engine(&self) -> &Arc<dyn RexEngine> {
        &self.engine
    }

    /// Preflight `stream` and decode it
    ///
    /// Empty streams and RIFF/WAVE data are refused with `UnsupportedFormat`.
    pub fn create_decoder<S: Read + Seek>(&self, stream: &mut S) -> Result<Rx2Decoder> {
        let size = stream.seek(SeekFrom::End(0))?;
        stream.rewind()?;
        if size == 0 {
            return Err(DecodeError::UnsupportedFormat {
                reason: "empty stream".to_string(),
            });
        }

        if size >= SIGNATURE_LEN as u64 {
            let mut signature = [0u8; SIGNATURE_LEN];
            stream.read_exact(&mut signature)?;
            stream.rewind()?;
            if format::is_riff_wave(&signature) {
                return Err(DecodeError::UnsupportedFormat {
                    reason: "RIFF/WAVE data".to_string(),
                });
            }
        }

        let file = self.preflight(stream, size)?;
        Rx2Decoder::from_bytes(Arc::clone(&self.engine), file, &self.config)
    }

    /// Open and decode a file on disk
    pub fn decode_file(&self, path: &Path) -> Result<Rx2Decoder> {
        debug!(path = %path.display(), "Opening REX file");
        let mut reader = BufReader::new(File::open(path)?);
        self.create_decoder(&mut reader)
    }

    /// Header-check a bounded prefix and return the whole file
    ///
    /// A truncated prefix may look corrupt to the engine, so a `FileCorrupt`
    /// verdict on a prefix is re-checked once against the full file.
    fn preflight<S: Read + Seek>(&self, stream: &mut S, size: u64) -> Result<Vec<u8>> {
        let limit = size.min(self.config.preflight_bytes as u64);
        let prefix = read_up_to(stream, limit)?;
        if prefix.is_empty() {
            return Err(DecodeError::UnsupportedFormat {
                reason: "stream returned no data".to_string(),
            });
        }

        let truncated = (prefix.len() as u64) < size;
        match validate_header(self.engine.as_ref(), &prefix) {
            Ok(_) if !truncated => return Ok(prefix),
            Ok(_) => {}
            Err(DecodeError::FileCorrupt { reason }) if truncated => {
                debug!(
                    prefix_bytes = prefix.len(),
                    size,
                    %reason,
                    "Header check failed on prefix; retrying with the full file"
                );
                drop(prefix);
                let full = read_up_to(stream, size)?;
                validate_header(self.engine.as_ref(), &full)?;
                return Ok(full);
            }
            Err(e) => return Err(e),
        }

        read_up_to(stream, size)
    }
}

/// Read at most `limit` bytes from the start of `stream`, then rewind
fn read_up_to<S: Read + Seek>(stream: &mut S, limit: u64) -> Result<Vec<u8>> {
    let capacity = usize::try_from(limit)
        .map_err(|_| DecodeError::out_of_memory(format!("{} byte file", limit)))?;
    let mut data = Vec::new();
    data.try_reserve_exact(capacity)
        .map_err(|e| DecodeError::out_of_memory(format!("{} byte read buffer: {}", capacity, e)))?;

    stream.rewind()?;
    stream.by_ref().take(limit).read_to_end(&mut data)?;
    stream.rewind()?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdk::{MockCall, MockEngine, MockLoop};
    use std::io::Cursor;

    fn extension(mock: &Arc<MockEngine>, preflight_bytes: usize) -> DecoderExtension {
        let config = DecoderConfig {
            preflight_bytes,
            ..DecoderConfig::default()
        };
        DecoderExtension::new(mock.clone(), config)
    }

    #[test]
    fn test_empty_stream_is_refused_silently() {
        let mock = Arc::new(MockEngine::new());
        let err = extension(&mock, 1024)
            .create_decoder(&mut Cursor::new(Vec::new()))
            .unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedFormat { .. }));
        assert_eq!(err.host_message(), None);
    }

    #[test]
    fn test_wave_is_refused_before_engine_work() {
        let mock = Arc::new(MockEngine::new());
        let mut wav = b"RIFF\x24\x08\x00\x00WAVEfmt ".to_vec();
        wav.resize(2048, 0);
        let err = extension(&mock, 1024)
            .create_decoder(&mut Cursor::new(wav))
            .unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedFormat { .. }));
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_truncated_prefix_is_retried_with_full_file() {
        let mock = Arc::new(MockEngine::new());
        let file = MockLoop::default().to_file_bytes();
        // The prefix cuts the JSON body short, so the mock reports corruption.
        let ext = extension(&mock, 16);
        let decoder = ext.create_decoder(&mut Cursor::new(file.clone())).unwrap();
        assert_eq!(decoder.file_size(), file.len());

        let header_queries = mock
            .calls()
            .iter()
            .filter(|c| **c == MockCall::InfoFromBuffer)
            .count();
        // Prefix, full-file retry, then the decoder's own check.
        assert_eq!(header_queries, 3);
    }

    #[test]
    fn test_corrupt_file_reports_message() {
        let mock = Arc::new(MockEngine::new());
        let err = extension(&mock, 1024)
            .create_decoder(&mut Cursor::new(b"definitely not a loop file".to_vec()))
            .unwrap_err();
        assert!(matches!(err, DecodeError::FileCorrupt { .. }));
        assert_eq!(
            err.host_message().as_deref(),
            Some("The format of this file is unknown or the file is corrupt.")
        );
        assert_eq!(mock.created(), 0);
    }

    #[test]
    fn test_small_file_is_checked_once_in_preflight() {
        let mock = Arc::new(MockEngine::new());
        let decoder = extension(&mock, 1024 * 1024)
            .create_decoder(&mut Cursor::new(MockLoop::default().to_file_bytes()))
            .unwrap();
        assert_eq!(decoder.channels(), 2);
        assert_eq!(mock.live_handles(), 0);
    }
}
