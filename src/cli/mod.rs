//! CLI Module
//!
//! Command-line harness for inspecting and decoding REX loop files.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// REX / RX2 loop decoder
#[derive(Parser, Debug)]
#[command(name = "rx2-cli")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the REX shared library
    #[arg(long, global = true, env = "RX2_LIBRARY")]
    pub library: Option<PathBuf>,

    /// Use the built-in mock engine instead of the shared library
    #[arg(long, global = true, conflicts_with = "library")]
    pub mock: bool,

    /// Decoder settings file (JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Decode a file and print its loop information
    #[command(name = "info")]
    Info {
        /// REX file to inspect
        file: PathBuf,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,

        /// Also write a text report to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Decode a file to WAV
    #[command(name = "decode")]
    Decode {
        /// REX file to decode
        file: PathBuf,

        /// Output WAV path
        #[arg(short, long)]
        output: PathBuf,

        /// Output bit depth: 16, 24 or 32 (float)
        #[arg(short, long, default_value_t = 24)]
        bit_depth: u16,

        /// Render at this sample rate instead of the file's own
        #[arg(short, long)]
        sample_rate: Option<u32>,
    },

    /// Decode every REX file under a directory and report the results
    #[command(name = "scan")]
    Scan {
        /// Directory to walk
        dir: PathBuf,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}
