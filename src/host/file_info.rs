//! Display metadata for the host's file info panel
//!
//! Everything here is read from fields computed during decoding; building a
//! `FileInfo` never touches the engine.

use serde::Serialize;

use crate::decoder::Rx2Decoder;

/// Metadata shown for a decoded loop
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileInfo {
    pub duration_secs: f64,
    /// Rate stored in the file, or the playback rate when it has none
    pub sample_rate: u32,
    pub channels: usize,
    pub artist: Option<String>,
    pub composer: Option<String>,
    pub album_artist: Option<String>,
    pub copyright: Option<String>,
    pub url: Option<String>,
    /// Free text, then `Contact: <email>` on its own line
    pub comment: Option<String>,
    pub file_size: u64,
    /// Compressed bitrate estimate in kbit/s
    pub bitrate_kbps: Option<u32>,
    /// Whole BPM, only when the tempo came from the file
    pub bpm: Option<u32>,
}

impl FileInfo {
    pub fn from_decoder(decoder: &Rx2Decoder) -> Self {
        let duration_secs = decoder.duration_secs();
        let sample_rate = match decoder.source_sample_rate() {
            rate if rate > 0 => rate as u32,
            _ => decoder.sample_rate(),
        };

        let creator = decoder.creator_info();
        let name = creator.and_then(|c| c.name.clone());
        let comment = creator.and_then(|c| comment(c.free_text.as_deref(), c.email.as_deref()));

        let file_size = decoder.file_size() as u64;
        let tempo = decoder.tempo();

        Self {
            duration_secs,
            sample_rate,
            channels: decoder.channels(),
            artist: name.clone(),
            composer: name.clone(),
            album_artist: name,
            copyright: creator.and_then(|c| c.copyright.clone()),
            url: creator.and_then(|c| c.url.clone()),
            comment,
            file_size,
            bitrate_kbps: bitrate_kbps(file_size, duration_secs),
            bpm: (tempo.from_file && tempo.tempo >= 1000).then(|| (tempo.tempo / 1000) as u32),
        }
    }
}

fn comment(free_text: Option<&str>, email: Option<&str>) -> Option<String> {
    match (free_text, email) {
        (None, None) => None,
        (Some(text), None) => Some(text.to_string()),
        (None, Some(email)) => Some(format!("Contact: {}", email)),
        (Some(text), Some(email)) => Some(format!("{}\nContact: {}", text, email)),
    }
}

/// `round(size * 8 / duration / 1000)`; `None` when it rounds to 0
pub fn bitrate_kbps(file_size: u64, duration_secs: f64) -> Option<u32> {
    if file_size == 0 || duration_secs <= 0.0 {
        return None;
    }
    let kbps = (file_size as f64 * 8.0 / duration_secs / 1000.0).round();
    (kbps >= 1.0).then(|| kbps as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_layout() {
        assert_eq!(comment(None, None), None);
        assert_eq!(comment(Some("Made live"), None).as_deref(), Some("Made live"));
        assert_eq!(
            comment(None, Some("me@example.com")).as_deref(),
            Some("Contact: me@example.com")
        );
        assert_eq!(
            comment(Some("Made live"), Some("me@example.com")).as_deref(),
            Some("Made live\nContact: me@example.com")
        );
    }

    #[test]
    fn test_bitrate_estimate() {
        // 64000 bytes over 2 s is 256 kbit/s.
        assert_eq!(bitrate_kbps(64_000, 2.0), Some(256));
        assert_eq!(bitrate_kbps(0, 2.0), None);
        assert_eq!(bitrate_kbps(10, 0.0), None);
        // 40 bytes over 1 s rounds to 0 kbit/s.
        assert_eq!(bitrate_kbps(40, 1.0), None);
        assert_eq!(bitrate_kbps(63, 1.0), Some(1));
    }
}
