//! Decoding Adapter
//!
//! Turns an untrusted REX/RX2 file into a seekable PCM stream:
//! - Header validation without building an engine object (`validate`)
//! - Time-bounded object construction (`sandbox`)
//! - Output length from tempo and time signature (`length`)
//! - Batched preview rendering (`render`)
//! - Interleaving, clamping and silence detection (`pcm`)
//! - Byte-addressed seek/read (`cursor`)
//! - The pipeline tying them together (`rx2`)

pub mod cursor;
pub mod length;
pub mod pcm;
pub mod render;
pub mod rx2;
pub mod sandbox;
pub mod validate;

pub use cursor::StreamCursor;
pub use length::{RenderPlan, TempoChoice};
pub use pcm::PcmStore;
pub use render::{render_loop, RenderedChannels};
pub use rx2::Rx2Decoder;
pub use sandbox::{create_sandboxed, Constructed};
pub use validate::validate_header;
