//! PCM materialization
//!
//! Turns the channel-separated render into the immutable interleaved store
//! the stream cursor reads from.

use super::render::RenderedChannels;
use crate::error::{DecodeError, Result};

/// Samples at or below this magnitude count as silence
pub const SILENCE_THRESHOLD: f32 = 1e-7;

/// Bytes per stored sample (32-bit float)
pub const BYTES_PER_SAMPLE: usize = 4;

/// Interleaved 32-bit float PCM, clamped to [-1, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct PcmStore {
    samples: Vec<f32>,
    channels: usize,
    sample_rate: u32,
}

impl PcmStore {
    /// Interleave and clamp `rendered`
    ///
    /// Fails with `NoActiveSlices` when nothing was rendered or every sample
    /// is silent.
    pub fn materialize(rendered: &RenderedChannels, sample_rate: u32) -> Result<Self> {
        let frames = rendered.frames_rendered();
        let channels = rendered.channels();
        if frames == 0 {
            return Err(DecodeError::NoActiveSlices);
        }

        let total = frames
            .checked_mul(channels)
            .ok_or_else(|| DecodeError::out_of_memory("PCM buffer size overflows"))?;
        let mut samples = Vec::new();
        samples.try_reserve_exact(total).map_err(|e| {
            DecodeError::out_of_memory(format!("PCM buffer of {} samples: {}", total, e))
        })?;

        match rendered.right() {
            Some(right) => {
                for (&l, &r) in rendered.left().iter().zip(right) {
                    samples.push(l);
                    samples.push(r);
                }
            }
            None => samples.extend_from_slice(rendered.left()),
        }

        Self::from_interleaved(samples, channels, sample_rate)
    }

    /// Clamp and wrap already interleaved samples
    ///
    /// The sample count must be a whole number of frames.
    pub fn from_interleaved(mut samples: Vec<f32>, channels: usize, sample_rate: u32) -> Result<Self> {
        if channels == 0 || samples.len() % channels != 0 {
            return Err(DecodeError::corrupt(format!(
                "{} samples do not form whole {}-channel frames",
                samples.len(),
                channels
            )));
        }
        for sample in samples.iter_mut() {
            *sample = clamp_sample(*sample);
        }
        if !samples.iter().any(|s| s.abs() > SILENCE_THRESHOLD) {
            return Err(DecodeError::NoActiveSlices);
        }

        Ok(Self {
            samples,
            channels,
            sample_rate,
        })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    pub fn frame_bytes(&self) -> usize {
        self.channels * BYTES_PER_SAMPLE
    }

    pub fn total_bytes(&self) -> usize {
        self.samples.len() * BYTES_PER_SAMPLE
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Peak absolute sample value
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |peak, s| peak.max(s.abs()))
    }
}

/// Clamp to [-1, 1]; NaN becomes silence
fn clamp_sample(sample: f32) -> f32 {
    if sample.is_nan() {
        0.0
    } else {
        sample.clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_interleaves_stereo() {
        let store = PcmStore::from_interleaved(vec![0.1, 0.2, 0.3, 0.4], 2, 44100).unwrap();
        assert_eq!(store.frames(), 2);
        assert_eq!(store.frame_bytes(), 8);
        assert_eq!(store.total_bytes(), 16);
    }

    #[test]
    fn test_partial_frame_rejected() {
        let err = PcmStore::from_interleaved(vec![0.5; 5], 2, 44100).unwrap_err();
        assert!(matches!(err, DecodeError::FileCorrupt { .. }));
    }

    #[test]
    fn test_silence_is_no_active_slices() {
        let quiet = vec![1e-8f32, -1e-7, 0.0, 5e-8];
        let err = PcmStore::from_interleaved(quiet, 1, 44100).unwrap_err();
        assert!(matches!(err, DecodeError::NoActiveSlices));

        let err = PcmStore::from_interleaved(Vec::new(), 2, 44100).unwrap_err();
        assert!(matches!(err, DecodeError::NoActiveSlices));
    }

    #[test]
    fn test_one_audible_sample_is_enough() {
        let mut samples = vec![0.0f32; 64];
        samples[40] = -2e-7;
        assert!(PcmStore::from_interleaved(samples, 2, 44100).is_ok());
    }

    #[test]
    fn test_clamping() {
        assert_eq!(clamp_sample(1.5), 1.0);
        assert_eq!(clamp_sample(-3.0), -1.0);
        assert_eq!(clamp_sample(f32::NAN), 0.0);
        assert_relative_eq!(clamp_sample(0.25), 0.25);
    }

    #[test]
    fn test_interleaved_input_is_clamped() {
        let store =
            PcmStore::from_interleaved(vec![1.5, -2.0, f32::NAN, 0.5], 2, 44100).unwrap();
        assert_eq!(store.samples(), [1.0f32, -1.0, 0.0, 0.5].as_slice());
        assert_relative_eq!(store.peak(), 1.0);
    }

    #[test]
    fn test_nan_only_input_is_silence() {
        let err = PcmStore::from_interleaved(vec![f32::NAN; 4], 2, 44100).unwrap_err();
        assert!(matches!(err, DecodeError::NoActiveSlices));
    }

    #[test]
    fn test_duration_and_peak() {
        let store = PcmStore::from_interleaved(vec![0.5, -0.75, 0.25, 0.0], 1, 4).unwrap();
        assert_relative_eq!(store.duration_secs(), 1.0);
        assert_relative_eq!(store.peak(), 0.75);
    }
}
