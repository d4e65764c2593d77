use image::{GrayImage, Luma};

use super::Frame;
use crate::{Error, Result};

/// Computes a gradient hash for a single decoded frame.
///
/// The frame is converted to grayscale, reduced to a `(hash_size + 1) x hash_size` grid
/// using area averaging, and each pixel is compared to its right-hand neighbour. A bit is
/// set if the left pixel is strictly brighter. Bits are packed row-major, MSB first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameHasher {
    hash_size: u32,
}

impl Default for FrameHasher {
    fn default() -> Self {
        Self {
            hash_size: crate::DEFAULT_HASH_SIZE,
        }
    }
}

impl FrameHasher {
    /// Constructs a hasher for the given `hash_size`. The hash must fit in 64 bits, so
    /// `hash_size` is limited to 1..=8.
    pub fn new(hash_size: u32) -> Result<Self> {
        if !(1..=8).contains(&hash_size) {
            return Err(Error::InvalidHashSize(hash_size));
        }
        Ok(Self { hash_size })
    }

    pub fn hash_size(&self) -> u32 {
        self.hash_size
    }

    /// Number of meaningful bits in each hash.
    pub fn bits(&self) -> u32 {
        self.hash_size * self.hash_size
    }

    pub fn hash(&self, frame: &Frame) -> u64 {
        let gray = to_luma(frame);
        let small = resize_area(&gray, self.hash_size + 1, self.hash_size);

        let mut value = 0u64;
        for y in 0..self.hash_size {
            for x in 0..self.hash_size {
                let left = small.get_pixel(x, y)[0];
                let right = small.get_pixel(x + 1, y)[0];
                value = (value << 1) | u64::from(left > right);
            }
        }
        value
    }
}

/// Converts a frame to 8-bit luma using BT.601 weights (0.299, 0.587, 0.114) in 14-bit
/// fixed point, rounding to nearest.
pub(crate) fn to_luma(frame: &Frame) -> GrayImage {
    GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
        let [r, g, b] = frame.get_pixel(x, y).0;
        let luma = (u32::from(r) * 4899 + u32::from(g) * 9617 + u32::from(b) * 1868 + 8192) >> 14;
        Luma([luma as u8])
    })
}

/// Merges frame hashes into one hash using a per-bit majority vote.
///
/// A bit is set in the output if at least half of the inputs have it set, so ties resolve
/// to 1. An empty input yields 0.
pub fn combine_majority(hashes: &[u64], bits: u32) -> u64 {
    if hashes.is_empty() {
        return 0;
    }
    let bits = bits.min(u64::BITS);

    let mut combined = 0u64;
    for i in 0..bits {
        let mask = 1u64 << (bits - 1 - i);
        let count = hashes.iter().filter(|&&h| h & mask != 0).count();
        // count >= len / 2, without going through floats.
        combined = (combined << 1) | u64::from(2 * count >= hashes.len());
    }
    combined
}

// For each destination index along one axis, returns the source indices that overlap it
// along with their share of the destination pixel's footprint.
fn area_weights(src_len: u32, dst_len: u32) -> Vec<Vec<(u32, f64)>> {
    let scale = src_len as f64 / dst_len as f64;
    (0..dst_len)
        .map(|d| {
            let start = d as f64 * scale;
            let end = start + scale;
            let mut weights = Vec::new();
            let mut s = start.floor() as u32;
            while (s as f64) < end && s < src_len {
                let lo = start.max(s as f64);
                let hi = end.min(s as f64 + 1.0);
                if hi > lo {
                    weights.push((s, (hi - lo) / scale));
                }
                s += 1;
            }
            weights
        })
        .collect()
}

/// Resizes a grayscale image by area averaging: every output pixel is the mean of the
/// source area it covers, weighted by coverage.
pub(crate) fn resize_area(src: &GrayImage, width: u32, height: u32) -> GrayImage {
    let (src_width, src_height) = src.dimensions();
    let cols = area_weights(src_width, width);
    let rows = area_weights(src_height, height);

    GrayImage::from_fn(width, height, |x, y| {
        let mut sum = 0.0;
        for &(sy, wy) in &rows[y as usize] {
            for &(sx, wx) in &cols[x as usize] {
                sum += wy * wx * src.get_pixel(sx, sy)[0] as f64;
            }
        }
        Luma([sum.round().clamp(0.0, 255.0) as u8])
    })
}
