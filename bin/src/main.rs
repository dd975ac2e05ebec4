//! candela CLI - resample and replay OHLCV bar streams.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod display;
mod input;

use display::Format;

#[derive(Parser)]
#[command(name = "candela")]
#[command(about = "Resample and replay OHLCV bar streams", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Resample a bar file to a coarser timeframe
    Resample {
        /// Input CSV file (timestamp,open,high,low,close,volume[,open_interest])
        input: PathBuf,

        /// Target timeframe (e.g. m5, s30, d1, w1)
        #[arg(short, long, default_value = "m5")]
        timeframe: String,

        /// Output file path. Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "csv")]
        format: Format,

        /// Stamp bars on the slot start instead of the slot end
        #[arg(long)]
        left_edge: bool,

        /// Keep raw last-seen timestamps instead of snapping to slot edges
        #[arg(long)]
        raw_time: bool,

        /// Merge late ticks instead of dropping them
        #[arg(long)]
        take_late: bool,

        /// Shift the sub-day boundary grid by this many units
        #[arg(long, default_value = "0")]
        boundary_offset: i64,
    },

    /// Replay a bar file, printing the evolving output stack
    Replay {
        /// Input CSV file (timestamp,open,high,low,close,volume[,open_interest])
        input: PathBuf,

        /// Target timeframe (e.g. m5, s30, d1, w1)
        #[arg(short, long, default_value = "m5")]
        timeframe: String,

        /// Output file path for the finalized bars. Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format for the finalized bars
        #[arg(short, long, value_enum, default_value = "csv")]
        format: Format,

        /// Print every intermediate update, not only frozen bars
        #[arg(long)]
        evolution: bool,
    },

    /// List supported timeframe units
    Units,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Show help if no command provided
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Resample {
            input,
            timeframe,
            output,
            format,
            left_edge,
            raw_time,
            take_late,
            boundary_offset,
        } => commands::resample::resample(
            &input,
            &timeframe,
            output.as_deref(),
            format,
            left_edge,
            raw_time,
            take_late,
            boundary_offset,
        ),
        Commands::Replay {
            input,
            timeframe,
            output,
            format,
            evolution,
        } => commands::replay::replay(&input, &timeframe, output.as_deref(), format, evolution),
        Commands::Units => commands::units::list_units(),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();
}
