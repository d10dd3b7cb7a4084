//! Vendor Engine Interface
//!
//! Everything that touches the external REX rendering engine:
//! - Typed status codes and metadata (`types`)
//! - The `RexEngine` operation set and the owning handle wrapper (`engine`)
//! - The C API binding and library loader (`ffi`, `library`)
//! - An in-process mock for testing (`mock`)

pub mod engine;
pub mod ffi;
pub mod library;
pub mod mock;
pub mod types;

pub use engine::{CreateOutcome, EngineHandle, EngineResult, RexEngine};
pub use ffi::{FfiEngine, RexApi};
pub use library::{LibraryError, RexLibrary};
pub use mock::{MockCall, MockEngine, MockLoop, Waveform};
pub use types::{CreatorInfo, LoopInfo, RawHandle, RexErrorCode, REX_PPQ};
