//! Batched preview rendering
//!
//! The engine only renders through its preview interface: configure rate and
//! tempo, start the preview, pull fixed-size batches, stop. After stopping,
//! one more batch is pulled into scratch buffers to let the engine drain its
//! internal state.

use tracing::{debug, warn};

use super::length::RenderPlan;
use crate::error::{DecodeError, Result};
use crate::sdk::{EngineHandle, RexErrorCode};

/// Largest batch the engine renders per call
pub const BATCH_FRAMES: usize = 64;

/// Channel-separated render output
///
/// One flat allocation holds the left channel followed by the right one.
#[derive(Debug, Clone)]
pub struct RenderedChannels {
    data: Vec<f32>,
    channels: usize,
    planned_frames: usize,
    frames_rendered: usize,
}

impl RenderedChannels {
    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn frames_rendered(&self) -> usize {
        self.frames_rendered
    }

    pub fn left(&self) -> &[f32] {
        &self.data[..self.frames_rendered]
    }

    /// Right channel; `None` for mono
    pub fn right(&self) -> Option<&[f32]> {
        (self.channels == 2).then(|| {
            let start = self.planned_frames;
            &self.data[start..start + self.frames_rendered]
        })
    }
}

/// Render the whole loop described by `plan`
///
/// A failing batch stops the preview and aborts with the engine's error.
pub fn render_loop(handle: &EngineHandle, channels: usize, plan: &RenderPlan) -> Result<RenderedChannels> {
    let engine = handle.engine();
    let raw = handle.raw();

    if !(1..=2).contains(&channels) {
        return Err(DecodeError::corrupt(format!("cannot render {} channels", channels)));
    }

    engine.set_output_sample_rate(raw, plan.sample_rate as i32)?;

    let total = plan
        .frames
        .checked_mul(channels)
        .ok_or_else(|| DecodeError::out_of_memory("render buffer size overflows"))?;
    let mut data = Vec::new();
    data.try_reserve_exact(total).map_err(|e| {
        DecodeError::out_of_memory(format!("render buffer of {} samples: {}", total, e))
    })?;
    data.resize(total, 0.0f32);

    engine.set_preview_tempo(raw, plan.tempo.tempo)?;
    engine.start_preview(raw)?;
    debug!(
        frames = plan.frames,
        channels,
        sample_rate = plan.sample_rate,
        tempo = plan.tempo.tempo,
        "Preview started"
    );

    let (left, mut right) = if channels == 2 {
        let (l, r) = data.split_at_mut(plan.frames);
        (l, Some(r))
    } else {
        (data.as_mut_slice(), None)
    };

    let mut frames_rendered = 0usize;
    let mut failure: Option<RexErrorCode> = None;
    while frames_rendered < plan.frames {
        let todo = (plan.frames - frames_rendered).min(BATCH_FRAMES);
        let range = frames_rendered..frames_rendered + todo;
        let right_batch = right.as_deref_mut().map(|r| &mut r[range.clone()]);

        if let Err(code) = engine.render_preview_batch(raw, &mut left[range], right_batch) {
            warn!(error = %code, frames_rendered, "Preview batch failed");
            failure = Some(code);
            break;
        }
        frames_rendered += todo;
    }

    if let Err(code) = engine.stop_preview(raw) {
        debug!(error = %code, "Stopping preview failed");
    }
    flush(handle, channels);

    if let Some(code) = failure {
        return Err(code.into());
    }

    debug!(frames_rendered, "Preview rendered");
    Ok(RenderedChannels {
        data,
        channels,
        planned_frames: plan.frames,
        frames_rendered,
    })
}

/// Pull one batch after the preview stopped; the output is discarded
fn flush(handle: &EngineHandle, channels: usize) {
    let mut left = [0.0f32; BATCH_FRAMES];
    let mut right = [0.0f32; BATCH_FRAMES];
    let right = (channels == 2).then_some(&mut right[..]);

    if let Err(code) = handle
        .engine()
        .render_preview_batch(handle.raw(), &mut left, right)
    {
        debug!(error = %code, "Post-stop flush reported an error");
    }
}
