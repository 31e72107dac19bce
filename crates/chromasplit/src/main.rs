//! ChromaSplit CLI - split an image into its color channels.
//!
//! Writes the original, red, green, blue and grayscale renditions of one
//! image as PNG files and prints a JSON report, optionally with a color
//! composition analysis from a multimodal model.
//!
//! # Usage
//!
//! ```bash
//! # Split an image into ./channels
//! chromasplit split photo.jpg -d ./channels
//!
//! # Histograms only
//! chromasplit histogram photo.jpg --channel red
//!
//! # View configuration
//! chromasplit config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// ChromaSplit - split images into red, green, blue and luminance channels.
#[derive(Parser, Debug)]
#[command(name = "chromasplit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Split an image into five PNGs and report on it
    Split(cli::split::SplitArgs),

    /// Print red, green and blue histograms of an image
    Histogram(cli::histogram::HistogramArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let config = match chromasplit_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `chromasplit config path`."
            );
            chromasplit_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("ChromaSplit v{}", chromasplit_core::VERSION);

    match cli.command {
        Commands::Split(args) => cli::split::execute(args, config).await,
        Commands::Histogram(args) => cli::histogram::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
