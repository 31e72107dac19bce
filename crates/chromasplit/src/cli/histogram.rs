//! The `chromasplit histogram` command.

use anyhow::Context;
use chromasplit_core::pipeline::{
    histogram, histograms, Histogram, HistogramSummary, ImageProcessor,
};
use chromasplit_core::{Config, OutputFormat, OutputWriter};
use clap::Args;
use std::io::Write;
use std::path::PathBuf;

use super::types::Channel;

/// Arguments for the `histogram` command.
#[derive(Args, Debug)]
pub struct HistogramArgs {
    /// Image file to measure
    #[arg(required = true)]
    pub input: PathBuf,

    /// Only this channel (defaults to red, green and blue)
    #[arg(long, value_enum)]
    pub channel: Option<Channel>,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,
}

/// Execute the histogram command.
pub async fn execute(args: HistogramArgs, config: Config) -> anyhow::Result<()> {
    let result = compute(&args, &config).await?;
    for hist in &result {
        let peak = hist.peak();
        tracing::info!(
            "{}: peak {} ({} px), mean {:.1}",
            hist.channel,
            peak.value,
            peak.count,
            hist.mean()
        );
    }

    let stdout = std::io::stdout().lock();
    let pretty = args.pretty || config.output.pretty;
    write_summaries(stdout, &result, pretty)
}

fn write_summaries<W: Write>(
    sink: W,
    result: &[Histogram],
    pretty: bool,
) -> anyhow::Result<()> {
    let summaries: Vec<HistogramSummary<'_>> = result.iter().map(Histogram::summary).collect();
    let mut writer = OutputWriter::new(sink, OutputFormat::Json, pretty);
    writer.write(&summaries)?;
    writer.flush()?;
    Ok(())
}

async fn compute(args: &HistogramArgs, config: &Config) -> anyhow::Result<Vec<Histogram>> {
    let processor = ImageProcessor::new(config);
    let context = || format!("Could not process this file: {}", args.input.display());

    let bytes = processor.read_file(&args.input).await.with_context(context)?;
    let decoded = processor.decode(bytes).await.with_context(context)?;
    tracing::debug!("Decoded {}x{} image", decoded.width(), decoded.height());

    Ok(match args.channel {
        Some(channel) => vec![histogram(&decoded.pixels, channel.into())],
        None => histograms(&decoded.pixels),
    })
}
