//! Channel isolation and grayscale derivation.
//!
//! Every transform maps one pixel to one pixel with no neighborhood access,
//! so the work is split across the rayon pool in pixel chunks. Alpha is
//! always copied through unchanged.

use rayon::prelude::*;

use super::buffer::{PixelBuffer, CHANNELS};
use crate::types::ColorChannel;

/// The four buffers derived from an original image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedChannels {
    pub red: PixelBuffer,
    pub green: PixelBuffer,
    pub blue: PixelBuffer,
    pub grayscale: PixelBuffer,
}

/// Derive the red, green, blue and grayscale buffers.
///
/// The four derivations only read `buffer`, so they run concurrently.
pub fn extract(buffer: &PixelBuffer) -> DerivedChannels {
    let ((red, green), (blue, grayscale)) = rayon::join(
        || {
            rayon::join(
                || isolate(buffer, ColorChannel::Red),
                || isolate(buffer, ColorChannel::Green),
            )
        },
        || rayon::join(|| isolate(buffer, ColorChannel::Blue), || grayscale(buffer)),
    );
    DerivedChannels {
        red,
        green,
        blue,
        grayscale,
    }
}

/// Keep one color plane and zero the other two: red gives `(R, 0, 0, A)`.
pub fn isolate(buffer: &PixelBuffer, channel: ColorChannel) -> PixelBuffer {
    let keep = channel.offset();
    map_pixels(buffer, move |px| {
        let mut out = [0, 0, 0, px[3]];
        out[keep] = px[keep];
        out
    })
}

/// Unweighted mean of R, G and B (truncated) replicated into all three.
pub fn grayscale(buffer: &PixelBuffer) -> PixelBuffer {
    map_pixels(buffer, |px| {
        let avg = luminance(px[0], px[1], px[2]);
        [avg, avg, avg, px[3]]
    })
}

/// `floor((r + g + b) / 3)`. Not perceptually weighted.
#[inline]
pub fn luminance(r: u8, g: u8, b: u8) -> u8 {
    ((r as u16 + g as u16 + b as u16) / 3) as u8
}

fn map_pixels<F>(buffer: &PixelBuffer, f: F) -> PixelBuffer
where
    F: Fn([u8; 4]) -> [u8; 4] + Sync,
{
    let src = buffer.as_raw();
    let mut out = vec![0u8; src.len()];
    out.par_chunks_exact_mut(CHANNELS)
        .zip(src.par_chunks_exact(CHANNELS))
        .for_each(|(dst, px)| {
            dst.copy_from_slice(&f([px[0], px[1], px[2], px[3]]));
        });
    buffer.with_samples_of(out)
}
