//! Perceptual hashing for video files.
//!
//! A video is summarized by sampling a fixed number of frames spread evenly across the
//! stream, hashing each frame with a gradient hash, and merging the frame hashes with a
//! per-bit majority vote.

mod ffmpeg;
mod hash;
mod sampler;

pub use ffmpeg::FfmpegBackend;
pub use hash::{combine_majority, FrameHasher};
pub use sampler::{sample_indices, video_hash};

use std::path::Path;

/// A decoded video frame.
pub type Frame = image::RgbImage;

/// An open handle on a single video file.
///
/// The handle is released when dropped.
pub trait FrameSource {
    /// Total number of frames in the stream. Returns 0 if unknown.
    fn frame_count(&self) -> u64;

    /// Seeks to the frame at `index` and decodes it. Returns `None` if the frame
    /// cannot be decoded.
    fn decode_frame(&mut self, index: u64) -> Option<Frame>;
}

/// Opens video files for frame extraction.
pub trait VideoBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns `None` if the file cannot be opened or has no video stream.
    fn open(&self, path: &Path) -> Option<Box<dyn FrameSource>>;
}
