use std::path::PathBuf;
use std::time::Duration;

pub mod audio;
pub mod fingerprint;
pub mod group;
pub mod report;
pub mod scan;
pub mod util;
pub mod video;

pub use fingerprint::{Capabilities, FingerprintKind, FingerprintResult, Fingerprinter, Kinds};
pub use group::{find_duplicates, DuplicateGroup, DuplicateGroups, Entry, ScanOutcome};
pub use report::Report;

/// Default number of frames sampled from each video.
pub const DEFAULT_SAMPLE_FRAMES: usize = 12;

/// Default perceptual hash size.
///
/// Frames are reduced to a `(hash_size + 1) x hash_size` grid, which yields `hash_size^2`
/// bits per frame hash.
pub const DEFAULT_HASH_SIZE: u32 = 8;

/// Default width (in bits) of a combined video hash.
pub const DEFAULT_HASH_BITS: u32 = 64;

/// Default length of audio passed to the audio fingerprinter.
pub const DEFAULT_AUDIO_LENGTH: Duration = Duration::from_secs(120);

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("root directory not found: {0:?}")]
    RootNotFound(PathBuf),
    #[error("invalid hash size {0}: must be between 1 and 8")]
    InvalidHashSize(u32),
    #[error("chromaprint error: {0}")]
    Chromaprint(String),
    #[error("FFmpeg error: {0}")]
    FFmpegError(#[from] ffmpeg_next::Error),
    #[error("serde_json error: {0}")]
    SerdeJSONError(#[from] serde_json::Error),
    #[error("walkdir error: {0}")]
    WalkDirError(#[from] walkdir::Error),
    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
