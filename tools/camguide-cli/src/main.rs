//! camguide CLI: command-line front-end for the camera guidance service.
//!
//! Usage:
//!   camguide run <SCRIPT>        Replay a detection script interactively
//!   camguide guidance --box ...  Compute guidance for one bounding box
//!   camguide convert <EXPORT>    Convert a detection export to CSV
//!   camguide rates               List capture interval labels
//!   camguide check               Validate configuration and models

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use camguide_common::AppConfig;
use camguide_detection_model::ExportDataType;
use camguide_processing_core::RenderMode;

mod commands;

#[derive(Parser)]
#[command(
    name = "camguide",
    about = "Camera guidance for positioning reading material",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the camera service over a replay script with an interactive prompt
    Run {
        /// JSONL replay script (one frame of detections per line)
        script: PathBuf,

        /// Capture interval label, e.g. "0.5s per image"
        #[arg(long)]
        rate: Option<String>,

        /// History display mode
        #[arg(long, default_value = "detailed")]
        mode: RenderMode,

        /// Start a capture session with this id right away
        #[arg(long)]
        session: Option<String>,
    },

    /// Compute robot guidance for a single reading material box
    Guidance {
        /// Bounding box as X,Y,W,H
        #[arg(long = "box", value_name = "X,Y,W,H")]
        bbox: String,

        /// Frame width
        #[arg(long, default_value = "640")]
        width: u32,

        /// Frame height
        #[arg(long, default_value = "480")]
        height: u32,

        /// Center threshold as a percentage of the smaller frame side
        #[arg(long, default_value = "15")]
        threshold: f64,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Convert a JSON detection export to CSV
    Convert {
        /// Path to the JSON export
        input: PathBuf,

        /// Table to write
        #[arg(long = "type", default_value = "materials")]
        data_type: ExportDataType,

        /// Output file (defaults to the input with a .csv extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the available capture intervals
    Rates,

    /// Validate configuration and report detector status
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_layers()?;
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    camguide_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Run {
            script,
            rate,
            mode,
            session,
        } => commands::run::run(config, script, rate, mode, session).await,
        Commands::Guidance {
            bbox,
            width,
            height,
            threshold,
            json,
        } => commands::guidance::run(&bbox, width, height, threshold, json),
        Commands::Convert {
            input,
            data_type,
            output,
        } => commands::convert::run(input, data_type, output),
        Commands::Rates => commands::rates::run(),
        Commands::Check => commands::check::run(&config),
    }
}
