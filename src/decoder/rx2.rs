//! The decoding pipeline
//!
//! Validate, construct, measure, render, materialize. Each stage fails fast
//! and nothing is retried. The engine object only lives for the duration of
//! `from_bytes`; a finished decoder holds nothing but PCM and metadata.

use std::io::Read;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::cursor::StreamCursor;
use super::length::{RenderPlan, TempoChoice};
use super::pcm::PcmStore;
use super::render::render_loop;
use super::sandbox::create_sandboxed;
use super::validate::validate_header;
use crate::config::DecoderConfig;
use crate::error::{DecodeError, Result};
use crate::sdk::{CreatorInfo, EngineHandle, LoopInfo, RexEngine, RexErrorCode};

/// A fully decoded loop, ready to stream
#[derive(Debug)]
pub struct Rx2Decoder {
    file: Arc<[u8]>,
    info: LoopInfo,
    creator: Option<CreatorInfo>,
    plan: RenderPlan,
    pcm: Arc<PcmStore>,
    cursor: StreamCursor,
    warnings: Vec<RexErrorCode>,
}

impl Rx2Decoder {
    /// Decode a complete file held in memory
    pub fn from_bytes(
        engine: Arc<dyn RexEngine>,
        file: impl Into<Arc<[u8]>>,
        config: &DecoderConfig,
    ) -> Result<Self> {
        let file: Arc<[u8]> = file.into();
        debug!(bytes = file.len(), "Decoding REX file");

        validate_header(engine.as_ref(), &file)?;
        debug!("Header validated");

        let constructed = create_sandboxed(Arc::clone(&engine), Arc::clone(&file), config.create_timeout())?;
        let handle = constructed.handle;
        let mut warnings: Vec<RexErrorCode> = constructed.warning.into_iter().collect();

        let info = object_info(&handle)?;
        let creator = fetch_creator(&handle, &mut warnings)?;

        let sample_rate = config.output_rate_for(info.sample_rate);
        let plan = RenderPlan::compute(&info, sample_rate, config.max_duration_secs)?;
        debug!(
            frames = plan.frames,
            sample_rate,
            tempo = plan.tempo.tempo,
            tempo_from_file = plan.tempo.from_file,
            "Render planned"
        );

        let rendered = render_loop(&handle, info.channels as usize, &plan)?;
        let pcm = PcmStore::materialize(&rendered, sample_rate)?;
        drop(rendered);
        drop(handle);

        info!(
            frames = pcm.frames(),
            channels = pcm.channels(),
            sample_rate,
            duration_secs = pcm.duration_secs(),
            bpm = plan.tempo.bpm(),
            warnings = warnings.len(),
            "REX file decoded"
        );

        let pcm = Arc::new(pcm);
        Ok(Self {
            file,
            info,
            creator,
            plan,
            cursor: StreamCursor::new(Arc::clone(&pcm)),
            pcm,
            warnings,
        })
    }

    /// Read `reader` to the end and decode it
    pub fn from_reader<R: Read>(
        engine: Arc<dyn RexEngine>,
        mut reader: R,
        config: &DecoderConfig,
    ) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(engine, bytes, config)
    }

    /// Loop metadata reported by the engine object
    pub fn loop_info(&self) -> &LoopInfo {
        &self.info
    }

    pub fn creator_info(&self) -> Option<&CreatorInfo> {
        self.creator.as_ref()
    }

    pub fn plan(&self) -> &RenderPlan {
        &self.plan
    }

    pub fn tempo(&self) -> TempoChoice {
        self.plan.tempo
    }

    /// Non-fatal engine statuses collected while decoding
    pub fn warnings(&self) -> &[RexErrorCode] {
        &self.warnings
    }

    pub fn pcm(&self) -> &Arc<PcmStore> {
        &self.pcm
    }

    pub fn cursor(&self) -> &StreamCursor {
        &self.cursor
    }

    pub fn cursor_mut(&mut self) -> &mut StreamCursor {
        &mut self.cursor
    }

    /// An independent cursor over the same PCM, starting at 0
    pub fn new_cursor(&self) -> StreamCursor {
        StreamCursor::new(Arc::clone(&self.pcm))
    }

    pub fn file_size(&self) -> usize {
        self.file.len()
    }

    /// Playback rate of the decoded PCM
    pub fn sample_rate(&self) -> u32 {
        self.pcm.sample_rate()
    }

    /// Rate recorded in the file
    pub fn source_sample_rate(&self) -> i32 {
        self.info.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.pcm.channels()
    }

    pub fn frames(&self) -> usize {
        self.pcm.frames()
    }

    pub fn duration_secs(&self) -> f64 {
        self.pcm.duration_secs()
    }
}

/// Metadata of the constructed object
///
/// Rejects objects whose loop length or tempo went missing between the
/// header check and construction.
fn object_info(handle: &EngineHandle) -> Result<LoopInfo> {
    let info = handle.info()?;
    if info.ppq_length <= 0 || info.has_no_tempo() {
        return Err(DecodeError::ZeroLoopLength);
    }
    if !(1..=2).contains(&info.channels) {
        return Err(DecodeError::corrupt(format!(
            "engine object reports {} channels",
            info.channels
        )));
    }
    Ok(info)
}

/// Creator attribution; failures are warnings except a zero loop length
fn fetch_creator(
    handle: &EngineHandle,
    warnings: &mut Vec<RexErrorCode>,
) -> Result<Option<CreatorInfo>> {
    match handle.creator_info() {
        Ok(creator) if !creator.is_empty() => Ok(Some(creator)),
        Ok(_) | Err(RexErrorCode::NoCreatorInfoAvailable) => Ok(None),
        Err(RexErrorCode::FileHasZeroLoopLength) => Err(DecodeError::ZeroLoopLength),
        Err(code) => {
            warn!(error = %code, "Creator info unavailable");
            warnings.push(code);
            Ok(None)
        }
    }
}
