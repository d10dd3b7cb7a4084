//! Header validation
//!
//! Cheap sanity checks run before the expensive, hang-prone object
//! construction. Only the engine's read-only header query is used.

use tracing::warn;

use crate::error::{DecodeError, Result};
use crate::sdk::{LoopInfo, RexEngine, RexErrorCode};

/// Highest source sample rate accepted
pub const MAX_SAMPLE_RATE: i32 = 192_000;

/// Longest loop, in pulses, accepted
pub const MAX_PPQ_LENGTH: i32 = 100_000_000;

/// Time signature denominators accepted
pub const VALID_DENOMINATORS: [i32; 5] = [1, 2, 4, 8, 16];

/// Validate the header of `data` and return its loop metadata
///
/// Checks run in order and stop at the first failure:
/// 1. non-empty buffer
/// 2. the engine's header query succeeds
/// 3. 1 or 2 channels
/// 4. sample rate in (0, 192000]
/// 5. loop length in (0, 100000000] pulses
/// 6. at least one tempo field is set (`ZeroLoopLength` otherwise)
/// 7. denominator is 1, 2, 4, 8 or 16
pub fn validate_header(engine: &dyn RexEngine, data: &[u8]) -> Result<LoopInfo> {
    if data.is_empty() {
        return Err(DecodeError::corrupt("empty file"));
    }

    let info = engine
        .info_from_buffer(data)
        .map_err(header_query_error)?;

    check_loop_info(&info)?;
    Ok(info)
}

/// Field checks 3–7 on already-read metadata
pub fn check_loop_info(info: &LoopInfo) -> Result<()> {
    if !(1..=2).contains(&info.channels) {
        return Err(DecodeError::corrupt(format!(
            "unsupported channel count {}",
            info.channels
        )));
    }

    if info.sample_rate <= 0 || info.sample_rate > MAX_SAMPLE_RATE {
        return Err(DecodeError::corrupt(format!(
            "sample rate {} out of range",
            info.sample_rate
        )));
    }

    if info.ppq_length <= 0 || info.ppq_length > MAX_PPQ_LENGTH {
        return Err(DecodeError::corrupt(format!(
            "loop length {} pulses out of range",
            info.ppq_length
        )));
    }

    if info.has_no_tempo() {
        return Err(DecodeError::ZeroLoopLength);
    }

    if !VALID_DENOMINATORS.contains(&info.time_sign_denominator) {
        return Err(DecodeError::corrupt(format!(
            "time signature denominator {} not supported",
            info.time_sign_denominator
        )));
    }

    Ok(())
}

/// The header query only distinguishes "bars/beats not set" and allocation
/// failure; every other rejection means the data is not a usable file.
fn header_query_error(code: RexErrorCode) -> DecodeError {
    match code {
        RexErrorCode::FileHasZeroLoopLength | RexErrorCode::OutOfMemory => code.into(),
        other => {
            warn!(code = other.raw(), error = %other, "Header query rejected the file");
            DecodeError::corrupt(format!("header query failed: {}", other))
        }
    }
}
