//! Engine-level value types
//!
//! Plain Rust mirrors of what the vendor engine reports: status codes,
//! loop metadata, creator attribution and the opaque object handle.

use std::fmt;
use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Constants
// ============================================================================

/// Pulses per quarter note used by the engine's loop-length field
pub const REX_PPQ: i32 = 15360;

/// Maximum length of a creator string, excluding the terminating NUL
pub const REX_STRING_SIZE: usize = 255;

/// Raw status value the engine returns on success
pub const REX_NO_ERROR: i32 = 1;

// ============================================================================
// Status Codes
// ============================================================================

/// Typed engine status code
///
/// Every engine call reports one of these on failure. Values outside the
/// documented set are preserved in [`RexErrorCode::Other`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RexErrorCode {
    #[error("Operation aborted by user.")]
    OperationAbortedByUser,

    #[error("No creator info is available in this REX file.")]
    NoCreatorInfoAvailable,

    #[error("Not enough memory to load the REX Shared Library.")]
    NotEnoughMemoryForDll,

    #[error("Unable to load the REX Shared Library.")]
    UnableToLoadDll,

    #[error("The installed REX Shared Library is too old.")]
    DllTooOld,

    #[error("The REX Shared Library was not found.")]
    DllNotFound,

    #[error("The installed REX Shared Library is newer than this API.")]
    ApiTooOld,

    #[error("Not enough memory to load this REX file.")]
    OutOfMemory,

    #[error("The format of this file is unknown or the file is corrupt.")]
    FileCorrupt,

    #[error("This REX2 file was created by a later version of ReCycle.")]
    Rex2FileTooNew,

    #[error("This ReCycle file's 'Bars' and 'Beats' settings have not been set.")]
    FileHasZeroLoopLength,

    #[error("The operating system version is not supported by the REX library.")]
    OsVersionNotSupported,

    #[error("The REX library is not initialized.")]
    DllNotInitialized,

    #[error("The REX library is already initialized.")]
    DllAlreadyInitialized,

    #[error("Invalid handle supplied to the REX library.")]
    InvalidHandle,

    #[error("Invalid size specified for a REX info structure.")]
    InvalidSize,

    #[error("One of the arguments supplied to the REX library is out of range.")]
    InvalidArgument,

    #[error("The requested slice index is out of range.")]
    InvalidSlice,

    #[error("Invalid sample rate requested from the REX library.")]
    InvalidSampleRate,

    #[error("Internal buffer too small in the REX library.")]
    BufferTooSmall,

    #[error("REX object is already being previewed.")]
    IsBeingPreviewed,

    #[error("REX object is not being previewed.")]
    NotBeingPreviewed,

    #[error("Invalid tempo requested from the REX library.")]
    InvalidTempo,

    #[error("Undefined REX error.")]
    Undefined,

    #[error("REX error code {0}")]
    Other(i32),
}

impl RexErrorCode {
    /// Convert a raw engine status into `Ok(())` or a typed code
    pub fn check(raw: i32) -> Result<(), RexErrorCode> {
        if raw == REX_NO_ERROR {
            Ok(())
        } else {
            Err(Self::from_raw(raw))
        }
    }

    /// Map a non-success raw value to its typed code
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            2 => Self::OperationAbortedByUser,
            3 => Self::NoCreatorInfoAvailable,
            100 => Self::NotEnoughMemoryForDll,
            101 => Self::UnableToLoadDll,
            102 => Self::DllTooOld,
            103 => Self::DllNotFound,
            104 => Self::ApiTooOld,
            105 => Self::OutOfMemory,
            106 => Self::FileCorrupt,
            107 => Self::Rex2FileTooNew,
            108 => Self::FileHasZeroLoopLength,
            109 => Self::OsVersionNotSupported,
            200 => Self::DllNotInitialized,
            201 => Self::DllAlreadyInitialized,
            202 => Self::InvalidHandle,
            203 => Self::InvalidSize,
            204 => Self::InvalidArgument,
            205 => Self::InvalidSlice,
            206 => Self::InvalidSampleRate,
            207 => Self::BufferTooSmall,
            208 => Self::IsBeingPreviewed,
            209 => Self::NotBeingPreviewed,
            210 => Self::InvalidTempo,
            666 => Self::Undefined,
            other => Self::Other(other),
        }
    }

    /// Raw integer value as the engine reports it
    pub fn raw(&self) -> i32 {
        match self {
            Self::OperationAbortedByUser => 2,
            Self::NoCreatorInfoAvailable => 3,
            Self::NotEnoughMemoryForDll => 100,
            Self::UnableToLoadDll => 101,
            Self::DllTooOld => 102,
            Self::DllNotFound => 103,
            Self::ApiTooOld => 104,
            Self::OutOfMemory => 105,
            Self::FileCorrupt => 106,
            Self::Rex2FileTooNew => 107,
            Self::FileHasZeroLoopLength => 108,
            Self::OsVersionNotSupported => 109,
            Self::DllNotInitialized => 200,
            Self::DllAlreadyInitialized => 201,
            Self::InvalidHandle => 202,
            Self::InvalidSize => 203,
            Self::InvalidArgument => 204,
            Self::InvalidSlice => 205,
            Self::InvalidSampleRate => 206,
            Self::BufferTooSmall => 207,
            Self::IsBeingPreviewed => 208,
            Self::NotBeingPreviewed => 209,
            Self::InvalidTempo => 210,
            Self::Undefined => 666,
            Self::Other(raw) => *raw,
        }
    }
}

// ============================================================================
// Loop Metadata
// ============================================================================

/// Loop metadata as reported by the engine
///
/// Tempo fields are in 1/1000 BPM (123.456 BPM is stored as 123456).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoopInfo {
    pub channels: i32,
    pub sample_rate: i32,
    pub slice_count: i32,
    /// Tempo set when the loop was exported
    pub tempo: i32,
    /// Tempo derived from the locator positions and bars/beats settings
    pub original_tempo: i32,
    /// Loop length in pulses (see [`REX_PPQ`])
    pub ppq_length: i32,
    pub time_sign_numerator: i32,
    pub time_sign_denominator: i32,
    pub bit_depth: i32,
}

impl LoopInfo {
    /// True when neither tempo field was set ("bars/beats never set")
    pub fn has_no_tempo(&self) -> bool {
        self.tempo <= 0 && self.original_tempo <= 0
    }
}

// ============================================================================
// Creator Metadata
// ============================================================================

/// Optional creator-supplied attribution
///
/// Empty strings from the engine are normalized to `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CreatorInfo {
    pub name: Option<String>,
    pub copyright: Option<String>,
    pub url: Option<String>,
    pub email: Option<String>,
    pub free_text: Option<String>,
}

impl CreatorInfo {
    /// Build from raw strings, dropping empty or whitespace-only fields
    pub fn from_fields(
        name: &str,
        copyright: &str,
        url: &str,
        email: &str,
        free_text: &str,
    ) -> Self {
        fn field(s: &str) -> Option<String> {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }

        Self {
            name: field(name),
            copyright: field(copyright),
            url: field(url),
            email: field(email),
            free_text: field(free_text),
        }
    }

    /// True when every field is absent
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.copyright.is_none()
            && self.url.is_none()
            && self.email.is_none()
            && self.free_text.is_none()
    }
}

// ============================================================================
// Handle
// ============================================================================

/// Opaque engine object handle
///
/// Never null. Owning code wraps it in [`crate::sdk::EngineHandle`], which
/// guarantees a single release.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawHandle(NonZeroUsize);

impl RawHandle {
    /// Wrap a raw value; returns `None` for the null handle
    pub fn new(value: usize) -> Option<Self> {
        NonZeroUsize::new(value).map(Self)
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl fmt::Debug for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawHandle({:#x})", self.0.get())
    }
}
