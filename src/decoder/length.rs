//! Output length calculation
//!
//! The engine renders the loop at a preview tempo; the number of frames it
//! takes to play the loop once is derived from the loop length in pulses,
//! the tempo and the output sample rate.

use serde::Serialize;

use crate::error::{DecodeError, Result};
use crate::sdk::LoopInfo;

/// Preview tempo used when the file carries none (120.000 BPM)
pub const FALLBACK_TEMPO: i32 = 120_000;

/// Divisor the engine's preview timing is built on
pub const LENGTH_DIVISOR: f64 = 256.0;

/// Tempo the loop is rendered at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TempoChoice {
    /// 1/1000 BPM
    pub tempo: i32,
    /// False when the fallback tempo was used
    pub from_file: bool,
}

impl TempoChoice {
    /// Export tempo, then original tempo, then the fallback
    pub fn for_loop(info: &LoopInfo) -> Self {
        if info.tempo > 0 {
            Self {
                tempo: info.tempo,
                from_file: true,
            }
        } else if info.original_tempo > 0 {
            Self {
                tempo: info.original_tempo,
                from_file: true,
            }
        } else {
            Self {
                tempo: FALLBACK_TEMPO,
                from_file: false,
            }
        }
    }

    pub fn bpm(&self) -> f64 {
        self.tempo as f64 / 1000.0
    }
}

/// Frame count and parameters for one render
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RenderPlan {
    pub frames: usize,
    pub sample_rate: u32,
    pub tempo: TempoChoice,
}

impl RenderPlan {
    /// Compute the plan for `info` rendered at `sample_rate`
    ///
    /// Fails with `FileCorrupt` when the frame count is not positive or the
    /// duration exceeds `max_duration_secs`.
    pub fn compute(info: &LoopInfo, sample_rate: u32, max_duration_secs: f64) -> Result<Self> {
        let tempo = TempoChoice::for_loop(info);
        let frames = loop_frames(sample_rate, info.ppq_length, tempo.tempo, info.time_sign_denominator);

        if frames == 0 || sample_rate == 0 {
            return Err(DecodeError::corrupt("loop renders to zero frames"));
        }

        // The batch protocol counts frames in 32-bit integers.
        if frames > i32::MAX as u64 {
            return Err(DecodeError::corrupt(format!("loop length {} frames too large", frames)));
        }

        let duration = frames as f64 / sample_rate as f64;
        if duration <= 0.0 || duration > max_duration_secs {
            return Err(DecodeError::corrupt(format!(
                "loop duration {:.1} s out of range",
                duration
            )));
        }

        Ok(Self {
            frames: frames as usize,
            sample_rate,
            tempo,
        })
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames as f64 / self.sample_rate as f64
    }
}

/// `floor(rate * 1000 * ppq / (tempo * 256))` in `f64`
///
/// Tempo is converted to quarter-note BPM first: for a denominator other
/// than 4 it is scaled by `4 / denominator`. Negative results clamp to 0.
pub fn loop_frames(sample_rate: u32, ppq_length: i32, tempo: i32, denominator: i32) -> u64 {
    let mut scaled_tempo = tempo as f64;
    if denominator > 0 && denominator != 4 {
        scaled_tempo = scaled_tempo * 4.0 / denominator as f64;
    }

    let frames = sample_rate as f64 * 1000.0 * ppq_length as f64 / (scaled_tempo * LENGTH_DIVISOR);
    if frames.is_finite() && frames > 0.0 {
        frames.floor() as u64
    } else {
        0
    }
}
