//! Decoder configuration
//!
//! Defaults reproduce the host plugin's behavior. Values can be overridden
//! from a JSON file or from `RX2_*` environment variables.

use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default deadline for the sandboxed engine object construction
pub const DEFAULT_CREATE_TIMEOUT_MS: u64 = 2000;

/// Default ceiling on the rendered loop duration (one hour)
pub const DEFAULT_MAX_DURATION_SECS: f64 = 60.0 * 60.0;

/// Playback rate used when the file does not report one
pub const DEFAULT_FALLBACK_SAMPLE_RATE: u32 = 44100;

/// How much of a stream the host preflight reads before falling back to the
/// whole file
pub const DEFAULT_PREFLIGHT_BYTES: usize = 1024 * 1024;

/// Decoder settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Deadline for the engine's object construction call
    pub create_timeout_ms: u64,
    /// Longest loop, in seconds, the decoder agrees to render
    pub max_duration_secs: f64,
    /// Render rate; `None` renders at the file's own sample rate
    pub output_sample_rate: Option<u32>,
    /// Render rate when the file reports none
    pub fallback_sample_rate: u32,
    /// Bytes read for the host's cheap header preflight
    pub preflight_bytes: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        DecoderConfig {
            create_timeout_ms: DEFAULT_CREATE_TIMEOUT_MS,
            max_duration_secs: DEFAULT_MAX_DURATION_SECS,
            output_sample_rate: None,
            fallback_sample_rate: DEFAULT_FALLBACK_SAMPLE_RATE,
            preflight_bytes: DEFAULT_PREFLIGHT_BYTES,
        }
    }
}

impl DecoderConfig {
    /// Defaults with `RX2_*` environment overrides applied
    ///
    /// Recognized variables: `RX2_CREATE_TIMEOUT_MS`, `RX2_MAX_DURATION_SECS`,
    /// `RX2_OUTPUT_SAMPLE_RATE`. Unparseable values are ignored.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `RX2_*` environment overrides on top of `self`
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(ms) = env_parse("RX2_CREATE_TIMEOUT_MS") {
            self.create_timeout_ms = ms;
        }
        if let Some(secs) = env_parse("RX2_MAX_DURATION_SECS") {
            self.max_duration_secs = secs;
        }
        if let Some(rate) = env_parse("RX2_OUTPUT_SAMPLE_RATE") {
            self.output_sample_rate = Some(rate);
        }
        self
    }

    /// Load from a JSON file; missing fields take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn create_timeout(&self) -> Duration {
        Duration::from_millis(self.create_timeout_ms)
    }

    /// Render rate for a file reporting `source_rate`
    pub fn output_rate_for(&self, source_rate: i32) -> u32 {
        match self.output_sample_rate {
            Some(rate) if rate > 0 => rate,
            _ if source_rate > 0 => source_rate as u32,
            _ => self.fallback_sample_rate,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}
