//! Sandboxed object construction
//!
//! The engine's `create` call parses the whole file and can hang on crafted
//! input. It runs on a dedicated worker thread while the caller waits with a
//! deadline. A worker that misses the deadline is abandoned; whatever handle
//! it eventually produces is owned by the worker and released there.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{DecodeError, Result};
use crate::sdk::{EngineHandle, EngineResult, RexEngine, RexErrorCode};

/// Name of the construction worker thread
pub const WORKER_THREAD_NAME: &str = "rex-create";

/// A constructed engine object
#[derive(Debug)]
pub struct Constructed {
    pub handle: EngineHandle,
    /// Non-fatal status the engine reported alongside a usable handle
    pub warning: Option<RexErrorCode>,
}

/// Run the engine's `create` on a worker thread with a deadline
///
/// The handle is adopted into an [`EngineHandle`] on the worker itself, so
/// it is released exactly once whichever side ends up owning it.
pub fn create_sandboxed(
    engine: Arc<dyn RexEngine>,
    file: Arc<[u8]>,
    timeout: Duration,
) -> Result<Constructed> {
    // Capacity 1: the worker never blocks on send, even after abandonment.
    let (tx, rx) = mpsc::sync_channel::<(Option<EngineHandle>, EngineResult<()>)>(1);

    let worker_engine = Arc::clone(&engine);
    let spawned = thread::Builder::new()
        .name(WORKER_THREAD_NAME.to_string())
        .spawn(move || {
            let outcome = worker_engine.create(&file);
            let handle = outcome
                .handle
                .map(|raw| EngineHandle::adopt(worker_engine, raw));
            if let Err(mpsc::SendError((Some(orphan), _))) = tx.send((handle, outcome.status)) {
                debug!(handle = ?orphan.raw(), "Releasing object from abandoned create");
            }
        });

    if let Err(e) = spawned {
        return Err(DecodeError::out_of_memory(format!(
            "could not start construction worker: {}",
            e
        )));
    }

    debug!(timeout_ms = timeout.as_millis() as u64, "Waiting for engine object");
    let (handle, status) = match rx.recv_timeout(timeout) {
        Ok(received) => received,
        Err(RecvTimeoutError::Timeout) => {
            warn!(
                timeout_ms = timeout.as_millis() as u64,
                "Engine object construction timed out; abandoning worker"
            );
            return Err(DecodeError::EngineUnavailable {
                reason: format!("object construction exceeded {} ms", timeout.as_millis()),
            });
        }
        Err(RecvTimeoutError::Disconnected) => {
            return Err(DecodeError::EngineUnavailable {
                reason: "construction worker exited without a result".to_string(),
            });
        }
    };

    let handle = match handle {
        Some(handle) => handle,
        None => {
            let code = status.err().unwrap_or(RexErrorCode::Undefined);
            debug!(error = %code, "Engine returned no object");
            return Err(code.into());
        }
    };

    match status {
        Ok(()) => Ok(Constructed {
            handle,
            warning: None,
        }),
        // `handle` drops here and releases the object.
        Err(RexErrorCode::FileHasZeroLoopLength) => Err(DecodeError::ZeroLoopLength),
        Err(code) => {
            warn!(error = %code, "Engine object created with a warning");
            Ok(Constructed {
                handle,
                warning: Some(code),
            })
        }
    }
}
