//! 256-bin intensity histograms.
//!
//! Counting is partitioned across the rayon pool: each chunk of pixels fills a
//! local table and the tables are summed at the end. Addition is commutative,
//! so the result is identical to a sequential scan.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::buffer::{PixelBuffer, CHANNELS};
use crate::types::ColorChannel;

/// Number of intensity levels in an 8-bit channel.
pub const BIN_COUNT: usize = 256;

/// Pixels per partition before counting is split across threads.
const PARTITION_PIXELS: usize = 16 * 1024;

/// Occurrence count for one intensity value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub value: u8,
    pub count: u64,
}

/// Raw counts for one channel, one bin per intensity in ascending order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Histogram {
    pub channel: ColorChannel,
    pub bins: Vec<HistogramBin>,
}

impl Histogram {
    fn from_counts(channel: ColorChannel, counts: [u64; BIN_COUNT]) -> Self {
        let bins = counts
            .iter()
            .enumerate()
            .map(|(value, &count)| HistogramBin {
                value: value as u8,
                count,
            })
            .collect();
        Self { channel, bins }
    }

    /// Count recorded for `value`.
    pub fn count(&self, value: u8) -> u64 {
        self.bins[value as usize].count
    }

    /// Sum of all bins; equals the pixel count of the source buffer.
    pub fn total(&self) -> u64 {
        self.bins.iter().map(|b| b.count).sum()
    }

    /// The most frequent intensity (lowest value wins ties).
    pub fn peak(&self) -> HistogramBin {
        self.bins
            .iter()
            .copied()
            .fold(self.bins[0], |best, bin| if bin.count > best.count { bin } else { best })
    }

    /// Mean intensity, or 0.0 for an empty histogram.
    pub fn mean(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let weighted: u64 = self.bins.iter().map(|b| b.value as u64 * b.count).sum();
        weighted as f64 / total as f64
    }

    /// Borrowing view with the headline statistics alongside the bins.
    pub fn summary(&self) -> HistogramSummary<'_> {
        HistogramSummary {
            channel: self.channel,
            total: self.total(),
            peak: self.peak(),
            mean: self.mean(),
            bins: &self.bins,
        }
    }
}

/// A histogram plus its pixel total, peak and mean, for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct HistogramSummary<'a> {
    pub channel: ColorChannel,
    pub total: u64,
    pub peak: HistogramBin,
    pub mean: f64,
    pub bins: &'a [HistogramBin],
}

/// Build the histogram of `channel` over every pixel of `buffer`.
pub fn histogram(buffer: &PixelBuffer, channel: ColorChannel) -> Histogram {
    let offset = channel.offset();
    let counts = buffer
        .as_raw()
        .par_chunks(PARTITION_PIXELS * CHANNELS)
        .map(|part| {
            let mut local = [0u64; BIN_COUNT];
            for px in part.chunks_exact(CHANNELS) {
                local[px[offset] as usize] += 1;
            }
            local
        })
        .reduce(|| [0u64; BIN_COUNT], merge_counts);
    Histogram::from_counts(channel, counts)
}

/// Red, green and blue histograms in that order.
pub fn histograms(buffer: &PixelBuffer) -> Vec<Histogram> {
    ColorChannel::ALL
        .par_iter()
        .map(|&channel| histogram(buffer, channel))
        .collect()
}

fn merge_counts(mut a: [u64; BIN_COUNT], b: [u64; BIN_COUNT]) -> [u64; BIN_COUNT] {
    for (acc, n) in a.iter_mut().zip(b) {
        *acc += n;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequential_counts(buffer: &PixelBuffer, channel: ColorChannel) -> Vec<u64> {
        let mut counts = vec![0u64; BIN_COUNT];
        for px in buffer.pixels() {
            counts[px[channel.offset()] as usize] += 1;
        }
        counts
    }

    #[test]
    fn test_uniform_red_image() {
        let buffer = PixelBuffer::from_fn(2, 2, |_, _| [128, 3, 250, 255]).unwrap();
        let hist = histogram(&buffer, ColorChannel::Red);
        assert_eq!(hist.bins.len(), BIN_COUNT);
        assert_eq!(hist.count(128), 4);
        assert_eq!(hist.total(), 4);
        for bin in &hist.bins {
            if bin.value != 128 {
                assert_eq!(bin.count, 0);
            }
        }
    }

    #[test]
    fn test_bins_ascend_by_value() {
        let buffer = PixelBuffer::from_fn(3, 3, |x, y| [x as u8, y as u8, 0, 255]).unwrap();
        let hist = histogram(&buffer, ColorChannel::Green);
        for (i, bin) in hist.bins.iter().enumerate() {
            assert_eq!(bin.value as usize, i);
        }
        assert_eq!(hist.channel, ColorChannel::Green);
    }

    #[test]
    fn test_partitioned_matches_sequential_scan() {
        // Large enough to span several partitions
        let buffer = PixelBuffer::from_fn(301, 257, |x, y| {
            [
                ((x * 7 + y * 13) % 256) as u8,
                ((x * y) % 256) as u8,
                ((x ^ y) % 256) as u8,
                255,
            ]
        })
        .unwrap();
        for channel in ColorChannel::ALL {
            let hist = histogram(&buffer, channel);
            let counts: Vec<u64> = hist.bins.iter().map(|b| b.count).collect();
            assert_eq!(counts, sequential_counts(&buffer, channel));
            assert_eq!(hist.total(), buffer.pixel_count() as u64);
        }
    }

    #[test]
    fn test_histograms_cover_all_channels() {
        let buffer = PixelBuffer::from_fn(4, 1, |x, _| [x as u8, 10, 20, 0]).unwrap();
        let all = histograms(&buffer);
        let channels: Vec<ColorChannel> = all.iter().map(|h| h.channel).collect();
        assert_eq!(channels, ColorChannel::ALL.to_vec());
        assert_eq!(all[1].count(10), 4);
        assert_eq!(all[2].count(20), 4);
    }

    #[test]
    fn test_peak_and_mean() {
        let buffer = PixelBuffer::new(3, 1, vec![10, 0, 0, 0, 10, 0, 0, 0, 40, 0, 0, 0]).unwrap();
        let hist = histogram(&buffer, ColorChannel::Red);
        assert_eq!(hist.peak(), HistogramBin { value: 10, count: 2 });
        assert!((hist.mean() - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_summary_serializes_statistics() {
        let buffer = PixelBuffer::new(2, 1, vec![0, 7, 0, 0, 0, 7, 0, 0]).unwrap();
        let hist = histogram(&buffer, ColorChannel::Green);
        let json = serde_json::to_value(hist.summary()).unwrap();
        assert_eq!(json["channel"], "green");
        assert_eq!(json["total"], 2);
        assert_eq!(json["peak"]["value"], 7);
        assert_eq!(json["mean"], 7.0);
        assert_eq!(json["bins"].as_array().unwrap().len(), BIN_COUNT);
    }

    #[test]
    fn test_serializes_value_count_pairs() {
        let buffer = PixelBuffer::from_fn(1, 1, |_, _| [0, 0, 0, 0]).unwrap();
        let json = serde_json::to_string(&histogram(&buffer, ColorChannel::Blue)).unwrap();
        assert!(json.starts_with(r#"{"channel":"blue","bins":[{"value":0,"count":1}"#));
    }
}
