//! Engine interface
//!
//! Defines the operation set every engine backend implements, and the owning
//! wrapper that guarantees each engine object is released exactly once.

use std::fmt;
use std::sync::Arc;

use super::types::{CreatorInfo, LoopInfo, RawHandle, RexErrorCode};

/// Result of an engine call
pub type EngineResult<T> = std::result::Result<T, RexErrorCode>;

/// Outcome of the engine's object construction call
///
/// The engine may hand back a usable handle together with a non-success
/// status, so both are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateOutcome {
    pub handle: Option<RawHandle>,
    pub status: EngineResult<()>,
}

/// Operation set of the external loop rendering engine
///
/// Implementations must tolerate being called from the sandbox worker
/// thread for `create`; all other calls happen on the decoding thread.
/// Callers never invoke `destroy` twice for the same handle.
pub trait RexEngine: Send + Sync {
    /// Read-only header query; does not build a full object
    fn info_from_buffer(&self, data: &[u8]) -> EngineResult<LoopInfo>;

    /// Parse the buffer and build an engine object (may be slow or hang)
    fn create(&self, data: &[u8]) -> CreateOutcome;

    /// Loop metadata of a constructed object
    fn info(&self, handle: RawHandle) -> EngineResult<LoopInfo>;

    /// Creator attribution, `Err(NoCreatorInfoAvailable)` when absent
    fn creator_info(&self, handle: RawHandle) -> EngineResult<CreatorInfo>;

    fn set_output_sample_rate(&self, handle: RawHandle, sample_rate: i32) -> EngineResult<()>;

    /// Tempo in 1/1000 BPM
    fn set_preview_tempo(&self, handle: RawHandle, tempo: i32) -> EngineResult<()>;

    fn start_preview(&self, handle: RawHandle) -> EngineResult<()>;

    /// Render the next `left.len()` frames of the preview
    ///
    /// `right` is `None` for mono objects and must have the same length as
    /// `left` otherwise.
    fn render_preview_batch(
        &self,
        handle: RawHandle,
        left: &mut [f32],
        right: Option<&mut [f32]>,
    ) -> EngineResult<()>;

    fn stop_preview(&self, handle: RawHandle) -> EngineResult<()>;

    /// Release the engine object
    fn destroy(&self, handle: RawHandle);
}

/// Owning wrapper around an engine object
///
/// Releases the object on drop. Not `Clone`: an engine object belongs to
/// exactly one owner at a time.
pub struct EngineHandle {
    engine: Arc<dyn RexEngine>,
    raw: RawHandle,
}

impl EngineHandle {
    /// Take ownership of a handle returned by `engine`
    pub fn adopt(engine: Arc<dyn RexEngine>, raw: RawHandle) -> Self {
        Self { engine, raw }
    }

    pub fn raw(&self) -> RawHandle {
        self.raw
    }

    pub fn engine(&self) -> &dyn RexEngine {
        self.engine.as_ref()
    }

    pub fn info(&self) -> EngineResult<LoopInfo> {
        self.engine.info(self.raw)
    }

    pub fn creator_info(&self) -> EngineResult<CreatorInfo> {
        self.engine.creator_info(self.raw)
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        tracing::debug!(handle = ?self.raw, "Releasing engine object");
        self.engine.destroy(self.raw);
    }
}

impl fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineHandle").field("raw", &self.raw).finish()
    }
}
