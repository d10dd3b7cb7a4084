//! Host Integration
//!
//! The surface a media player sees:
//! - Format registration and signature sniffing (`format`)
//! - Stream preflight and decoder creation (`extension`)
//! - The per-file streaming instance (`instance`)
//! - Display metadata (`file_info`)

pub mod extension;
pub mod file_info;
pub mod format;
pub mod instance;

pub use extension::DecoderExtension;
pub use file_info::FileInfo;
pub use instance::{AdapterStatus, SampleFormat, StreamInfo};
