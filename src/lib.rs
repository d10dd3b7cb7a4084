//! rx2-decoder - REX / RX2 Loop Decoding
//!
//! Decodes slice-based loop files (REX, RX2, RCY) through the vendor's
//! closed-source rendering engine and serves the result as seekable PCM.
//!
//! # Architecture
//!
//! The engine is treated as untrusted:
//! - Headers are checked with a read-only query before any object is built
//! - Object construction runs on a worker thread with a deadline
//! - Every engine object is owned by an RAII handle and released once
//! - The whole loop is rendered up front; playback only reads memory
//!
//! `sdk` wraps the engine, `decoder` is the pipeline, `host` is the surface
//! a media player integrates with, and `cli` is a standalone harness.

pub mod cli;
pub mod config;
pub mod decoder;
pub mod error;
pub mod export;
pub mod host;
pub mod sdk;

pub use config::DecoderConfig;
pub use decoder::{PcmStore, Rx2Decoder, StreamCursor};
pub use error::{DecodeError, Result};
pub use host::{AdapterStatus, DecoderExtension, FileInfo};
pub use sdk::{MockEngine, RexEngine, RexErrorCode, RexLibrary};
