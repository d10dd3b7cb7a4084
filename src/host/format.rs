//! File format registration and sniffing

use std::path::Path;

/// Extensions handled by the decoder, lowercase
pub const EXTENSIONS: [&str; 3] = ["rx2", "rex", "rcy"];

/// Extension list in the host's filter syntax
pub const EXTENSION_LIST: &str = "*.rx2;*.rex;*.rcy";

/// Human-readable format description
pub const DESCRIPTION: &str = "REX / RX2 loop files";

/// Bytes needed to recognize a RIFF/WAVE header
pub const SIGNATURE_LEN: usize = 12;

/// True when `path` has a REX extension (case-insensitive)
pub fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// True when `header` starts with a RIFF/WAVE signature
///
/// WAV files are often renamed loops; they are refused before any engine
/// work so another decoder can take them.
pub fn is_riff_wave(header: &[u8]) -> bool {
    header.len() >= SIGNATURE_LEN && &header[0..4] == b"RIFF" && &header[8..12] == b"WAVE"
}
