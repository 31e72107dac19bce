//! Report serialization and channel image files.
//!
//! Reports go out as JSON (optionally pretty) or JSON Lines; the five PNGs
//! are written side by side as `<prefix>-<channel>.png` (the grayscale card
//! as `<prefix>-luminance.png`).

use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::pipeline::EncodedChannels;
use crate::types::ChannelKind;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One JSON document per report
    Json,
    /// One compact JSON object per line
    JsonLines,
}

impl OutputFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// Serializes reports to a writer.
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
}

impl<W: Write> OutputWriter<W> {
    /// `pretty` only affects [`OutputFormat::Json`].
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
        }
    }

    /// Write one item followed by a newline.
    pub fn write<T: Serialize>(&mut self, item: &T) -> io::Result<()> {
        if self.pretty && self.format == OutputFormat::Json {
            serde_json::to_writer_pretty(&mut self.writer, item).map_err(io::Error::other)?;
        } else {
            serde_json::to_writer(&mut self.writer, item).map_err(io::Error::other)?;
        }
        writeln!(self.writer)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Write all five encoded images into `dir`, creating it if needed.
///
/// Returns the written paths in display order. Existing files are replaced.
pub fn write_channel_images(
    dir: &Path,
    prefix: &str,
    channels: &EncodedChannels,
) -> io::Result<Vec<(ChannelKind, PathBuf)>> {
    std::fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(ChannelKind::ALL.len());
    for (kind, image) in channels.iter() {
        let path = dir.join(kind.file_name(prefix));
        std::fs::write(&path, image.as_bytes())?;
        tracing::debug!("Wrote {} ({} bytes)", path.display(), image.len());
        written.push((kind, path));
    }
    Ok(written)
}
