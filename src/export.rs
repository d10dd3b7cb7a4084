//! WAV export and text reports for decoded loops
//!
//! The decoded store is already interleaved 32-bit float at the playback
//! rate, so export is quantization plus a hound writer.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::decoder::{PcmStore, Rx2Decoder};
use crate::error::{DecodeError, Result};
use crate::host::FileInfo;

/// Bit depths `export_wav` accepts
pub const SUPPORTED_BIT_DEPTHS: [u16; 3] = [16, 24, 32];

/// Write `pcm` to a WAV file
///
/// 16 and 24 bit are integer PCM; 32 bit is IEEE float.
pub fn export_wav(pcm: &PcmStore, path: &Path, bit_depth: u16) -> Result<()> {
    if !SUPPORTED_BIT_DEPTHS.contains(&bit_depth) {
        return Err(DecodeError::UnsupportedFormat {
            reason: format!("{}-bit WAV (only 16, 24, 32 supported)", bit_depth),
        });
    }

    let spec = WavSpec {
        channels: pcm.channels() as u16,
        sample_rate: pcm.sample_rate(),
        bits_per_sample: bit_depth,
        sample_format: if bit_depth == 32 {
            SampleFormat::Float
        } else {
            SampleFormat::Int
        },
    };

    let mut writer = WavWriter::create(path, spec).map_err(wav_error)?;
    let samples = pcm.samples().iter().copied();
    match bit_depth {
        16 => {
            for sample in samples {
                let scaled = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
                writer.write_sample(scaled).map_err(wav_error)?;
            }
        }
        24 => {
            for sample in samples {
                // hound stores 24-bit samples in an i32
                let scaled = (sample * 8388607.0).clamp(-8388608.0, 8388607.0) as i32;
                writer.write_sample(scaled).map_err(wav_error)?;
            }
        }
        _ => {
            for sample in samples {
                writer.write_sample(sample).map_err(wav_error)?;
            }
        }
    }
    writer.finalize().map_err(wav_error)?;

    tracing::debug!(
        path = %path.display(),
        frames = pcm.frames(),
        bit_depth,
        "WAV written"
    );
    Ok(())
}

fn wav_error(e: hound::Error) -> DecodeError {
    match e {
        hound::Error::IoError(io) => DecodeError::Io(io),
        other => DecodeError::Io(std::io::Error::new(std::io::ErrorKind::Other, other.to_string())),
    }
}

/// Human-readable summary of a decoded loop
pub fn format_report(name: &str, decoder: &Rx2Decoder) -> String {
    let info = decoder.loop_info();
    let meta = FileInfo::from_decoder(decoder);
    let tempo = decoder.tempo();

    let mut out = String::new();
    let _ = writeln!(out, "REX Loop Report");
    let _ = writeln!(out, "===============");
    let _ = writeln!(out, "File:            {}", name);
    let _ = writeln!(out, "File size:       {} bytes", meta.file_size);
    let _ = writeln!(out, "Channels:        {}", info.channels);
    let _ = writeln!(out, "Source rate:     {} Hz", info.sample_rate);
    let _ = writeln!(out, "Playback rate:   {} Hz", decoder.sample_rate());
    let _ = writeln!(out, "Bit depth:       {}", info.bit_depth);
    let _ = writeln!(out, "Slices:          {}", info.slice_count);
    let _ = writeln!(
        out,
        "Time signature:  {}/{}",
        info.time_sign_numerator, info.time_sign_denominator
    );
    let _ = writeln!(
        out,
        "Tempo:           {:.3} BPM{}",
        tempo.bpm(),
        if tempo.from_file { "" } else { " (default)" }
    );
    let _ = writeln!(out, "Loop length:     {} PPQ", info.ppq_length);
    let _ = writeln!(out, "Frames:          {}", decoder.frames());
    let _ = writeln!(out, "Duration:        {:.3} s", meta.duration_secs);
    if let Some(kbps) = meta.bitrate_kbps {
        let _ = writeln!(out, "Bitrate:         {} kbps", kbps);
    }

    if let Some(creator) = decoder.creator_info() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Creator");
        let _ = writeln!(out, "-------");
        let fields = [
            ("Name", &creator.name),
            ("Copyright", &creator.copyright),
            ("URL", &creator.url),
            ("Email", &creator.email),
            ("Notes", &creator.free_text),
        ];
        for (label, value) in fields {
            if let Some(value) = value {
                let _ = writeln!(out, "{:<16} {}", format!("{}:", label), value);
            }
        }
    }

    if !decoder.warnings().is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Warnings");
        let _ = writeln!(out, "--------");
        for warning in decoder.warnings() {
            let _ = writeln!(out, "- {}", warning);
        }
    }

    out
}

/// Write the report for `decoder` to `path`
pub fn write_report(name: &str, decoder: &Rx2Decoder, path: &Path) -> Result<()> {
    fs::write(path, format_report(name, decoder))?;
    Ok(())
}
