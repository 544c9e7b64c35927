mod commands;
mod terminal_delegate;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use env_logger::Env;

use chain_capture_core::models::config::DEFAULT_OUTPUT_FILE;
use chain_capture_core::parse_positive;
use chain_capture_core::upload::DEFAULT_ENDPOINT;

#[derive(Debug, Parser)]
#[command(
    name = "chain-capture",
    about = "Record, inspect and upload bicycle-chain noise",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Record from the microphone until Enter is pressed or the duration elapses
    Record(RecordArgs),
    /// Play a saved recording on the default output device
    Replay {
        #[arg(long, default_value = DEFAULT_OUTPUT_FILE)]
        input: PathBuf,
    },
    /// Upload a saved recording to the ingestion service
    Upload(UploadArgs),
    /// Delete a saved recording and its metadata
    Reset {
        #[arg(long, default_value = DEFAULT_OUTPUT_FILE)]
        input: PathBuf,
    },
    /// Print the level and dominant frequency of a saved recording
    Analyze {
        #[arg(long, default_value = DEFAULT_OUTPUT_FILE)]
        input: PathBuf,
    },
    /// List available input devices
    Devices,
}

#[derive(Debug, Args)]
struct RecordArgs {
    /// Capture sample rate in Hz
    #[arg(long, default_value = "16000", value_parser = sample_rate_arg)]
    sample_rate: u32,

    /// Display refresh interval in milliseconds
    #[arg(long = "update-interval", default_value = "50", value_parser = update_interval_arg)]
    update_interval_ms: u32,

    /// Stop automatically after this many seconds
    #[arg(long, value_parser = duration_arg)]
    duration: Option<f64>,

    #[arg(long, default_value = DEFAULT_OUTPUT_FILE)]
    output: PathBuf,

    /// Label stored in the metadata sidecar
    #[arg(long)]
    label: Option<String>,

    /// Input device name (see `devices`); defaults to the system microphone
    #[arg(long)]
    device: Option<String>,
}

#[derive(Debug, Args)]
struct UploadArgs {
    #[arg(long, default_value = DEFAULT_OUTPUT_FILE)]
    input: PathBuf,

    /// Label attached to the uploaded sample
    #[arg(long, default_value = "Rantai")]
    label: String,

    #[arg(long, env = "CHAIN_CAPTURE_API_KEY", hide_env_values = true)]
    api_key: String,

    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Request timeout in seconds
    #[arg(long, default_value = "30", value_parser = timeout_arg)]
    timeout: u32,
}

fn sample_rate_arg(text: &str) -> Result<u32, String> {
    parse_positive("sample rate", text).map_err(|e| e.to_string())
}

fn update_interval_arg(text: &str) -> Result<u32, String> {
    parse_positive("update interval", text).map_err(|e| e.to_string())
}

fn timeout_arg(text: &str) -> Result<u32, String> {
    parse_positive("timeout", text).map_err(|e| e.to_string())
}

fn duration_arg(text: &str) -> Result<f64, String> {
    match text.trim().parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs > 0.0 => Ok(secs),
        _ => Err(format!("duration must be a positive number of seconds, got '{}'", text)),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Record(args) => commands::record(args),
        Command::Replay { input } => commands::replay(&input),
        Command::Upload(args) => commands::upload(args),
        Command::Reset { input } => commands::reset(&input),
        Command::Analyze { input } => commands::analyze(&input),
        Command::Devices => commands::devices(),
    }
}
