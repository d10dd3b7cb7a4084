//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::DecoderConfig;
use crate::decoder::{RenderPlan, Rx2Decoder};
use crate::export::{export_wav, format_report, write_report};
use crate::host::{format, DecoderExtension, FileInfo};
use crate::sdk::{CreatorInfo, LoopInfo, MockEngine, RexEngine, RexLibrary};

/// Load decoder settings from `path` (or defaults) with env overrides
pub fn load_config(path: Option<&Path>) -> anyhow::Result<DecoderConfig> {
    let config = match path {
        Some(path) => DecoderConfig::from_json_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => DecoderConfig::default(),
    };
    Ok(config.with_env_overrides())
}

/// Engine backing the commands: the shared library, or the mock
pub fn open_engine(library: Option<&Path>, mock: bool) -> anyhow::Result<Arc<dyn RexEngine>> {
    if mock {
        debug!("Using mock engine");
        return Ok(Arc::new(MockEngine::new()));
    }

    let Some(path) = library else {
        bail!("no REX shared library given; pass --library or set RX2_LIBRARY");
    };
    let library = RexLibrary::load(path)
        .with_context(|| format!("loading REX library {}", path.display()))?;
    Ok(Arc::new(library.engine()))
}

#[derive(Debug, Serialize)]
struct InfoOutput<'a> {
    file: String,
    loop_info: &'a LoopInfo,
    creator: Option<&'a CreatorInfo>,
    plan: &'a RenderPlan,
    file_info: FileInfo,
    warnings: Vec<String>,
}

/// Decode a file and print its loop information.
pub fn info(
    extension: &DecoderExtension,
    file: &Path,
    json: bool,
    report: Option<&Path>,
) -> anyhow::Result<()> {
    info!("Inspecting: {}", file.display());

    let decoder = decode_path(extension, file)?;
    let name = display_name(file);

    if json {
        let output = InfoOutput {
            file: file.display().to_string(),
            loop_info: decoder.loop_info(),
            creator: decoder.creator_info(),
            plan: decoder.plan(),
            file_info: FileInfo::from_decoder(&decoder),
            warnings: decoder.warnings().iter().map(|w| w.to_string()).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{}", format_report(&name, &decoder));
    }

    if let Some(report_path) = report {
        write_report(&name, &decoder, report_path)
            .with_context(|| format!("writing report {}", report_path.display()))?;
        println!("Report written: {}", report_path.display());
    }

    Ok(())
}

/// Decode a file to WAV.
pub fn decode(
    extension: &DecoderExtension,
    file: &Path,
    output: &Path,
    bit_depth: u16,
) -> anyhow::Result<()> {
    info!("Decoding: {}", file.display());

    let decoder = decode_path(extension, file)?;
    export_wav(decoder.pcm(), output, bit_depth)
        .with_context(|| format!("writing {}", output.display()))?;

    println!(
        "Decoded {} -> {} ({} frames, {} ch, {} Hz, {}-bit, {:.3} s)",
        file.display(),
        output.display(),
        decoder.frames(),
        decoder.channels(),
        decoder.sample_rate(),
        bit_depth,
        decoder.duration_secs()
    );

    Ok(())
}

/// Outcome of decoding one file during a scan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanEntry {
    pub path: PathBuf,
    pub ok: bool,
    pub duration_secs: Option<f64>,
    pub error_code: Option<&'static str>,
    pub message: Option<String>,
}

/// Results of a directory scan
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanSummary {
    pub entries: Vec<ScanEntry>,
    pub decoded: usize,
    pub failed: usize,
}

/// Decode every REX file under `dir` and report the results.
pub fn scan(extension: &DecoderExtension, dir: &Path, json: bool) -> anyhow::Result<ScanSummary> {
    info!("Scanning: {}", dir.display());

    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }

    let summary = scan_dir(extension, dir);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        for entry in &summary.entries {
            match (&entry.duration_secs, &entry.message) {
                (Some(duration), _) => {
                    println!("OK    {} ({:.3} s)", entry.path.display(), duration)
                }
                (None, Some(message)) => println!(
                    "FAIL  {} [{}] {}",
                    entry.path.display(),
                    entry.error_code.unwrap_or("UNKNOWN"),
                    message
                ),
                (None, None) => println!("FAIL  {}", entry.path.display()),
            }
        }
        println!("{:-<60}", "");
        println!("Decoded: {} | Failed: {}", summary.decoded, summary.failed);
    }

    Ok(summary)
}

/// Walk `dir` and decode each file with a REX extension
pub fn scan_dir(extension: &DecoderExtension, dir: &Path) -> ScanSummary {
    let mut summary = ScanSummary::default();

    let mut paths: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| format::has_supported_extension(p))
        .collect();
    paths.sort();

    for path in paths {
        let entry = match extension.decode_file(&path) {
            Ok(decoder) => ScanEntry {
                path,
                ok: true,
                duration_secs: Some(decoder.duration_secs()),
                error_code: None,
                message: None,
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Decode failed");
                ScanEntry {
                    path,
                    ok: false,
                    duration_secs: None,
                    error_code: Some(e.error_code()),
                    message: Some(e.host_message().unwrap_or_else(|| e.to_string())),
                }
            }
        };

        if entry.ok {
            summary.decoded += 1;
        } else {
            summary.failed += 1;
        }
        summary.entries.push(entry);
    }

    summary
}

fn decode_path(extension: &DecoderExtension, file: &Path) -> anyhow::Result<Rx2Decoder> {
    let decoder = extension.decode_file(file).map_err(|e| {
        let message = e.host_message().unwrap_or_else(|| e.to_string());
        anyhow::Error::new(e).context(message)
    })?;

    for warning in decoder.warnings() {
        warn!("{}: {}", file.display(), warning);
    }
    Ok(decoder)
}

fn display_name(file: &Path) -> String {
    file.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdk::{MockLoop, Waveform};
    use std::fs;
    use tempfile::tempdir;

    fn mock_extension() -> DecoderExtension {
        DecoderExtension::new(Arc::new(MockEngine::new()), DecoderConfig::default())
    }

    #[test]
    fn test_scan_dir_reports_each_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("good.rx2"), MockLoop::default().to_file_bytes()).unwrap();
        let silent = MockLoop {
            waveform: Waveform::Silence,
            ..MockLoop::default()
        };
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/muted.REX"), silent.to_file_bytes()).unwrap();
        fs::write(dir.path().join("notes.txt"), b"not a loop").unwrap();

        let summary = scan_dir(&mock_extension(), dir.path());
        assert_eq!(summary.entries.len(), 2);
        assert_eq!(summary.decoded, 1);
        assert_eq!(summary.failed, 1);

        let muted = summary
            .entries
            .iter()
            .find(|e| e.path.ends_with("nested/muted.REX"))
            .unwrap();
        assert_eq!(muted.error_code, Some("NO_ACTIVE_SLICES"));
    }

    #[test]
    fn test_decode_writes_wav() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("loop.rx2");
        let output = dir.path().join("loop.wav");
        fs::write(&input, MockLoop::default().to_file_bytes()).unwrap();

        decode(&mock_extension(), &input, &output, 16).unwrap();
        let reader = hound::WavReader::open(&output).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.duration(), 88200);
    }

    #[test]
    fn test_info_failure_carries_host_message() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("broken.rx2");
        fs::write(&input, b"garbage garbage garbage").unwrap();

        let err = info(&mock_extension(), &input, false, None).unwrap_err();
        assert!(err.to_string().contains("unknown or the file is corrupt"));
    }

    #[test]
    fn test_missing_library_is_an_error() {
        assert!(open_engine(None, false).is_err());
        assert!(open_engine(None, true).is_ok());
    }
}
