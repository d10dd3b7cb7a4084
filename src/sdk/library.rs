//! Vendor library loading
//!
//! Opens the REX shared library with `libloading`, resolves the legacy export
//! names and initializes the engine once per process. The engine is shut down
//! when the last reference to the [`RexLibrary`] is dropped.

use std::ffi::c_char;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use libloading::Library;
use thiserror::Error;
use tracing::{debug, info};

use super::ffi::{
    FfiEngine, RexApi, RexCreateFn, RexDeleteFn, RexGetCreatorInfoFn, RexGetInfoFn,
    RexGetInfoFromBufferFn, RexPreviewFn, RexRenderPreviewBatchFn, RexSetIntFn,
};
use super::types::RexErrorCode;

type OpenFn = unsafe extern "C" fn() -> c_char;
type CloseFn = unsafe extern "C" fn();

static ENGINE_OPEN: AtomicBool = AtomicBool::new(false);

/// Errors that can occur when loading the vendor library
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("REX library not found at {}: {reason}", path.display())]
    NotFound { path: PathBuf, reason: String },

    #[error("Required symbol not found: {symbol}: {reason}")]
    SymbolNotFound { symbol: &'static str, reason: String },

    #[error("REX library refused to initialize")]
    InitFailed,

    #[error("REX library is already initialized in this process")]
    AlreadyInitialized,
}

impl LibraryError {
    /// Equivalent engine status code
    pub fn code(&self) -> RexErrorCode {
        match self {
            LibraryError::NotFound { .. } => RexErrorCode::DllNotFound,
            LibraryError::SymbolNotFound { .. } => RexErrorCode::DllTooOld,
            LibraryError::InitFailed => RexErrorCode::DllTooOld,
            LibraryError::AlreadyInitialized => RexErrorCode::DllAlreadyInitialized,
        }
    }
}

/// Loaded and initialized vendor library
pub struct RexLibrary {
    api: RexApi,
    close: CloseFn,
    path: PathBuf,
    // Dropped last: the function pointers above point into it.
    _lib: Library,
}

impl RexLibrary {
    /// Load the library at `path` and initialize the engine
    pub fn load(path: &Path) -> Result<Arc<Self>, LibraryError> {
        if ENGINE_OPEN.swap(true, Ordering::SeqCst) {
            return Err(LibraryError::AlreadyInitialized);
        }

        match Self::open(path) {
            Ok(lib) => Ok(Arc::new(lib)),
            Err(e) => {
                ENGINE_OPEN.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    fn open(path: &Path) -> Result<Self, LibraryError> {
        info!(path = %path.display(), "Loading REX library");

        // SAFETY: loading a user-specified shared library. The caller asserts
        // this is the REX shared library, whose initializers are benign.
        let lib = unsafe { Library::new(path) }.map_err(|e| LibraryError::NotFound {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        // SAFETY: all symbol lookups below are REX API functions whose C
        // signatures match the pointer types. Each Symbol is dereferenced to
        // copy the raw function pointer; `lib` is stored alongside them.
        let (open, close, api) = unsafe {
            let open: OpenFn = symbol(&lib, "Open")?;
            let close: CloseFn = symbol(&lib, "Close")?;
            let api = RexApi {
                create: symbol::<RexCreateFn>(&lib, "REXCreate")?,
                delete: symbol::<RexDeleteFn>(&lib, "REXDelete")?,
                get_info: symbol::<RexGetInfoFn>(&lib, "REXGetInfo")?,
                get_info_from_buffer: symbol::<RexGetInfoFromBufferFn>(
                    &lib,
                    "REXGetInfoFromBuffer",
                )?,
                get_creator_info: symbol::<RexGetCreatorInfoFn>(&lib, "REXGetCreatorInfo")?,
                set_output_sample_rate: symbol::<RexSetIntFn>(&lib, "REXSetOutputSampleRate")?,
                set_preview_tempo: symbol::<RexSetIntFn>(&lib, "REXSetPreviewTempo")?,
                start_preview: symbol::<RexPreviewFn>(&lib, "REXStartPreview")?,
                stop_preview: symbol::<RexPreviewFn>(&lib, "REXStopPreview")?,
                render_preview_batch: symbol::<RexRenderPreviewBatchFn>(
                    &lib,
                    "REXRenderPreviewBatch",
                )?,
            };
            (open, close, api)
        };

        // SAFETY: `Open` takes no arguments and is called once per load.
        let initialized = unsafe { open() };
        if initialized == 0 {
            return Err(LibraryError::InitFailed);
        }
        debug!("REX library initialized");

        Ok(Self {
            api,
            close,
            path: path.to_path_buf(),
            _lib: lib,
        })
    }

    pub fn api(&self) -> &RexApi {
        &self.api
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Engine backed by this library; keeps the library loaded
    pub fn engine(self: &Arc<Self>) -> FfiEngine {
        FfiEngine::with_library(Arc::clone(self))
    }
}

impl Drop for RexLibrary {
    fn drop(&mut self) {
        debug!(path = %self.path.display(), "Shutting down REX library");
        // SAFETY: `Close` pairs with the successful `Open` in `open`; no
        // engine object can outlive this value because every FfiEngine holds
        // an Arc to it.
        unsafe { (self.close)() };
        ENGINE_OPEN.store(false, Ordering::SeqCst);
    }
}

/// Resolve one exported function
///
/// # Safety
/// `T` must be the function pointer type matching the export's C signature.
unsafe fn symbol<T: Copy>(lib: &Library, name: &'static str) -> Result<T, LibraryError> {
    let mut bytes = name.as_bytes().to_vec();
    bytes.push(0);
    lib.get::<T>(&bytes)
        .map(|sym| *sym)
        .map_err(|e| LibraryError::SymbolNotFound {
            symbol: name,
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_library_maps_to_dll_not_found() {
        let err = match RexLibrary::load(Path::new("/nonexistent/REX Shared Library.so")) {
            Err(e) => e,
            Ok(_) => panic!("loading a missing path must fail"),
        };
        assert_eq!(err.code(), RexErrorCode::DllNotFound);
        assert!(err.to_string().contains("not found"));
        // A failed load leaves the process free to try again.
        assert!(!ENGINE_OPEN.load(Ordering::SeqCst));
    }

    #[test]
    fn test_error_codes() {
        let err = LibraryError::SymbolNotFound {
            symbol: "REXCreate",
            reason: "missing".into(),
        };
        assert_eq!(err.code(), RexErrorCode::DllTooOld);
        assert_eq!(
            LibraryError::AlreadyInitialized.code(),
            RexErrorCode::DllAlreadyInitialized
        );
    }
}
