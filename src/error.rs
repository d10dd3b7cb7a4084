//! Error handling for rx2-decoder
//!
//! Every decoding stage fails fast with one of these. Engine status codes are
//! folded into the named kinds where one exists and passed through otherwise.

use thiserror::Error;

use crate::sdk::{LibraryError, RexErrorCode};

/// Result type alias for decoding operations
pub type Result<T> = std::result::Result<T, DecodeError>;

/// Main error type for decoding operations
#[derive(Error, Debug)]
pub enum DecodeError {
    // File Errors
    #[error("File is corrupt: {reason}")]
    FileCorrupt { reason: String },

    #[error("Loop length is zero: bars/beats were never set")]
    ZeroLoopLength,

    #[error("Render produced only silence: no active slices")]
    NoActiveSlices,

    #[error("Unsupported format: {reason}")]
    UnsupportedFormat { reason: String },

    // Resource Errors
    #[error("Out of memory: {details}")]
    OutOfMemory { details: String },

    // Engine Errors
    #[error("REX engine unavailable: {reason}")]
    EngineUnavailable { reason: String },

    #[error("REX engine error: {0}")]
    Engine(RexErrorCode),

    #[error("REX library error: {0}")]
    Library(#[from] LibraryError),

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<RexErrorCode> for DecodeError {
    fn from(code: RexErrorCode) -> Self {
        match code {
            RexErrorCode::FileCorrupt => DecodeError::FileCorrupt {
                reason: "rejected by the REX engine".to_string(),
            },
            RexErrorCode::FileHasZeroLoopLength => DecodeError::ZeroLoopLength,
            RexErrorCode::OutOfMemory => DecodeError::OutOfMemory {
                details: "reported by the REX engine".to_string(),
            },
            other => DecodeError::Engine(other),
        }
    }
}

impl DecodeError {
    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        DecodeError::FileCorrupt {
            reason: reason.into(),
        }
    }

    pub(crate) fn out_of_memory(details: impl Into<String>) -> Self {
        DecodeError::OutOfMemory {
            details: details.into(),
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            DecodeError::FileCorrupt { .. } => "FILE_CORRUPT",
            DecodeError::ZeroLoopLength => "ZERO_LOOP_LENGTH",
            DecodeError::NoActiveSlices => "NO_ACTIVE_SLICES",
            DecodeError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            DecodeError::OutOfMemory { .. } => "OUT_OF_MEMORY",
            DecodeError::EngineUnavailable { .. } => "ENGINE_UNAVAILABLE",
            DecodeError::Engine(_) => "ENGINE_ERROR",
            DecodeError::Library(_) => "LIBRARY_ERROR",
            DecodeError::Io(_) => "IO_ERROR",
            DecodeError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// The engine status code equivalent to this error, if any
    pub fn rex_code(&self) -> Option<RexErrorCode> {
        match self {
            DecodeError::FileCorrupt { .. } | DecodeError::EngineUnavailable { .. } => {
                Some(RexErrorCode::FileCorrupt)
            }
            DecodeError::ZeroLoopLength => Some(RexErrorCode::FileHasZeroLoopLength),
            DecodeError::OutOfMemory { .. } => Some(RexErrorCode::OutOfMemory),
            DecodeError::Engine(code) => Some(*code),
            DecodeError::Library(e) => Some(e.code()),
            _ => None,
        }
    }

    /// Short message the host shows when it refuses a file
    pub fn friendly_message(&self) -> String {
        match self {
            DecodeError::FileCorrupt { .. } | DecodeError::EngineUnavailable { .. } => {
                "The format of this file is unknown or the file is corrupt.".to_string()
            }
            DecodeError::ZeroLoopLength => {
                "This ReCycle file cannot be used because its 'Bars' and 'Beats' settings \
                 have not been set."
                    .to_string()
            }
            DecodeError::NoActiveSlices => {
                "This ReCycle file does not contain any active slices.".to_string()
            }
            DecodeError::OutOfMemory { .. } => "Not enough memory to load this REX file.".to_string(),
            DecodeError::Engine(RexErrorCode::Other(raw)) => {
                format!("Unable to open this REX file (REX error code {}).", raw)
            }
            DecodeError::Engine(code) => code.to_string(),
            DecodeError::Library(e) => e.code().to_string(),
            DecodeError::UnsupportedFormat { .. }
            | DecodeError::Io(_)
            | DecodeError::Serialization(_) => self.to_string(),
        }
    }

    /// Message for the host's error slot; `None` for silent refusals
    ///
    /// Files that are not REX data at all are refused without a message so
    /// the host can try its other decoders.
    pub fn host_message(&self) -> Option<String> {
        match self {
            DecodeError::UnsupportedFormat { .. } => None,
            _ => Some(self.friendly_message()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_codes_are_promoted() {
        assert!(matches!(
            DecodeError::from(RexErrorCode::FileHasZeroLoopLength),
            DecodeError::ZeroLoopLength
        ));
        assert!(matches!(
            DecodeError::from(RexErrorCode::FileCorrupt),
            DecodeError::FileCorrupt { .. }
        ));
        assert!(matches!(
            DecodeError::from(RexErrorCode::OutOfMemory),
            DecodeError::OutOfMemory { .. }
        ));
        assert!(matches!(
            DecodeError::from(RexErrorCode::Rex2FileTooNew),
            DecodeError::Engine(RexErrorCode::Rex2FileTooNew)
        ));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(DecodeError::NoActiveSlices.error_code(), "NO_ACTIVE_SLICES");
        assert_eq!(
            DecodeError::ZeroLoopLength.rex_code(),
            Some(RexErrorCode::FileHasZeroLoopLength)
        );
        assert_eq!(DecodeError::NoActiveSlices.rex_code(), None);

        let timeout = DecodeError::EngineUnavailable {
            reason: "object construction exceeded 2000 ms".to_string(),
        };
        assert_eq!(timeout.rex_code(), Some(RexErrorCode::FileCorrupt));
    }

    #[test]
    fn test_friendly_messages() {
        assert!(DecodeError::NoActiveSlices
            .friendly_message()
            .contains("active slices"));
        assert!(DecodeError::ZeroLoopLength
            .friendly_message()
            .contains("'Bars' and 'Beats'"));
        assert_eq!(
            DecodeError::Engine(RexErrorCode::Other(321)).friendly_message(),
            "Unable to open this REX file (REX error code 321)."
        );
    }

    #[test]
    fn test_unsupported_format_is_silent() {
        let err = DecodeError::UnsupportedFormat {
            reason: "RIFF/WAVE data".to_string(),
        };
        assert_eq!(err.host_message(), None);
        assert!(DecodeError::NoActiveSlices.host_message().is_some());
    }
}
