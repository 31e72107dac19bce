//! The `chromasplit split` command.

use anyhow::Context;
use chromasplit_core::{ChromaSplit, Config, OutputWriter, ProcessOptions};
use clap::Args;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::types::{AnalysisProvider, OutputFormat};

/// Arguments for the `split` command.
#[derive(Args, Debug)]
pub struct SplitArgs {
    /// Image file to split
    #[arg(required = true)]
    pub input: PathBuf,

    /// Report file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Report format (defaults to `output.format` from config)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Directory for the five PNGs (defaults to `output.image_dir`; nothing is written if unset)
    #[arg(short = 'd', long)]
    pub out_dir: Option<PathBuf>,

    /// Include red/green/blue histograms in the report
    #[arg(long)]
    pub histograms: bool,

    /// Embed every PNG in the report as a data URI
    #[arg(long)]
    pub data_urls: bool,

    /// Analysis provider (overrides `analysis.provider`)
    #[arg(long, value_enum)]
    pub analysis: Option<AnalysisProvider>,

    /// Analysis model name (provider-specific)
    #[arg(long)]
    pub analysis_model: Option<String>,

    /// Skip the color analysis
    #[arg(long, conflicts_with_all = ["analysis", "analysis_model"])]
    pub no_analysis: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,
}

/// Execute the split command.
pub async fn execute(args: SplitArgs, config: Config) -> anyhow::Result<()> {
    let options = ProcessOptions {
        include_histograms: args.histograms || config.processing.include_histograms,
        skip_analysis: args.no_analysis,
    };
    let format = args
        .format
        .unwrap_or_else(|| OutputFormat::from_config(&config.output.format));
    let pretty = args.pretty || config.output.pretty;
    let include_data_urls = args.data_urls || config.output.include_data_urls;
    let image_dir = args
        .out_dir
        .as_deref()
        .map(expand_path)
        .or_else(|| config.image_dir());
    let prefix = config.output.file_prefix.clone();

    let splitter = build_splitter(&args, config);

    let report = splitter
        .split_file(&args.input, &options)
        .await
        .with_context(|| format!("Could not process this file: {}", args.input.display()))?;

    if report.analysis.is_failed() {
        tracing::warn!("Channels were split, but the color analysis failed");
    }

    let written = match &image_dir {
        Some(dir) => {
            let written =
                chromasplit_core::write_channel_images(dir, &prefix, &report.image.channels)
                    .with_context(|| format!("Failed to write images to {}", dir.display()))?;
            tracing::info!("Wrote {} images to {}", written.len(), dir.display());
            written
        }
        None => Vec::new(),
    };

    let record = report.to_record(&written, include_data_urls);
    let sink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Cannot create {}", path.display()))?,
        )),
        None => Box::new(std::io::stdout().lock()),
    };
    let mut writer = OutputWriter::new(sink, format.into(), pretty);
    writer.write(&record)?;
    writer.flush()?;

    Ok(())
}

fn build_splitter(args: &SplitArgs, config: Config) -> ChromaSplit {
    let splitter = ChromaSplit::new(config);
    if args.no_analysis {
        return splitter.without_analysis();
    }
    match (args.analysis, args.analysis_model.as_deref()) {
        (None, None) => splitter,
        (provider, model) => {
            let provider = provider
                .map(|p| p.to_string())
                .unwrap_or_else(|| splitter.config().analysis.provider.clone());
            splitter.with_provider(&provider, model)
        }
    }
}

fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}
