//! rx2-cli - REX Loop Decoder
//!
//! Command-line interface for inspecting and decoding REX / RX2 loop files.

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rx2_decoder::cli::{commands, Cli, Commands};
use rx2_decoder::host::DecoderExtension;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let default_filter = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("REX Loop Decoder v{}", env!("CARGO_PKG_VERSION"));

    let mut config = commands::load_config(cli.config.as_deref())?;
    if let Commands::Decode {
        sample_rate: Some(rate),
        ..
    } = &cli.command
    {
        config.output_sample_rate = Some(*rate);
    }

    let engine = commands::open_engine(cli.library.as_deref(), cli.mock)?;
    let extension = DecoderExtension::new(engine, config);

    handle_command(&extension, cli.command)
}

fn handle_command(extension: &DecoderExtension, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Info { file, json, report } => {
            commands::info(extension, &file, json, report.as_deref())
        }
        Commands::Decode {
            file,
            output,
            bit_depth,
            ..
        } => commands::decode(extension, &file, &output, bit_depth),
        Commands::Scan { dir, json } => commands::scan(extension, &dir, json).map(|_| ()),
    }
}
