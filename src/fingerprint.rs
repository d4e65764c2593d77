//! Per-file fingerprinting.
//!
//! A [Fingerprinter] runs an ordered chain of strategies (audio, then video) and returns the
//! first result produced. If every strategy declines, the file falls back to an exact
//! SHA-256 content hash.

use std::collections::HashSet;
use std::fmt::Display;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::audio::{AudioFingerprinter, Chromaprint, Fpcalc};
use crate::video::{FfmpegBackend, FrameHasher, VideoBackend};
use crate::Result;

/// Extensions fingerprinted with the audio strategy.
pub const AUDIO_EXTENSIONS: &[&str] = &[".mp3", ".flac", ".wav", ".m4a", ".aac", ".ogg", ".wma"];

/// Extensions fingerprinted with the video strategy.
pub const VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".mkv", ".avi", ".mov", ".wmv", ".webm", ".flv", ".m4v"];

// Files are read in chunks of this size when hashing.
const FALLBACK_CHUNK_SIZE: usize = 1024 * 1024;

/// How a fingerprint was computed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintKind {
    Audio,
    Video,
    Fallback,
}

impl Display for FingerprintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Fallback => "fallback",
        };
        f.write_str(s)
    }
}

/// The fingerprint of a single file.
///
/// Two files are duplicates iff their `key`s are equal. `detail` is for display only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintResult {
    pub kind: FingerprintKind,
    pub key: String,
    pub detail: String,
}

impl FingerprintResult {
    fn audio(backend: &str, fingerprint: String) -> Self {
        Self {
            kind: FingerprintKind::Audio,
            detail: format!("{}:{}chars", backend, fingerprint.len()),
            key: fingerprint,
        }
    }

    fn video(hash: u64) -> Self {
        let key = format!("vhash:{:016x}", hash);
        Self {
            kind: FingerprintKind::Video,
            detail: key.clone(),
            key,
        }
    }

    fn fallback(digest: String) -> Self {
        Self {
            kind: FingerprintKind::Fallback,
            detail: format!("sha256:{}...", &digest[..12]),
            key: digest,
        }
    }
}

/// The media kinds enabled for fingerprinting and scanning.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Kinds {
    pub audio: bool,
    pub video: bool,
}

impl Default for Kinds {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }
}

impl Kinds {
    pub fn none() -> Self {
        Self {
            audio: false,
            video: false,
        }
    }
}

/// Which audio fingerprinting backend to probe for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AudioBackend {
    /// The `fpcalc` executable found on `PATH`.
    #[default]
    Fpcalc,
    /// Chromaprint linked in-process, with `FFmpeg` decoding.
    Chromaprint,
}

/// The external collaborators available to a [Fingerprinter].
///
/// This is determined once at startup by [Capabilities::probe].
#[derive(Default)]
pub struct Capabilities {
    pub audio: Option<Box<dyn AudioFingerprinter>>,
    pub video: Option<Box<dyn VideoBackend>>,
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities")
            .field("audio", &self.audio.as_ref().map(|a| a.name()))
            .field("video", &self.video.as_ref().map(|v| v.name()))
            .finish()
    }
}

impl Capabilities {
    /// No collaborators: every file is fingerprinted by content hash.
    pub fn none() -> Self {
        Self::default()
    }

    /// Detects the available collaborators.
    ///
    /// Video decoding (and in-process Chromaprint) requires `FFmpeg` to initialize. The
    /// `fpcalc` backend requires the executable to be on `PATH`.
    pub fn probe(audio_backend: AudioBackend) -> Self {
        let ffmpeg = match ffmpeg_next::init() {
            Ok(()) => {
                tracing::debug!("FFmpeg version: {}", crate::util::ffmpeg_version_string());
                true
            }
            Err(e) => {
                tracing::warn!("FFmpeg unavailable, video fingerprinting disabled: {}", e);
                false
            }
        };

        let audio: Option<Box<dyn AudioFingerprinter>> = match audio_backend {
            AudioBackend::Fpcalc => match Fpcalc::locate() {
                Some(fpcalc) => {
                    tracing::debug!("using {}", fpcalc.program().display());
                    Some(Box::new(fpcalc))
                }
                None => {
                    tracing::warn!("fpcalc not found on PATH, audio fingerprinting disabled");
                    None
                }
            },
            AudioBackend::Chromaprint if ffmpeg => Some(Box::new(Chromaprint)),
            AudioBackend::Chromaprint => None,
        };
        let video: Option<Box<dyn VideoBackend>> = if ffmpeg {
            Some(Box::new(FfmpegBackend))
        } else {
            None
        };

        let capabilities = Self { audio, video };
        tracing::debug!(?capabilities, "probed capabilities");
        capabilities
    }
}

// Fingerprinting strategies, in priority order.
#[derive(Clone, Copy, Debug)]
enum Strategy {
    Audio,
    Video,
}

const STRATEGIES: [Strategy; 2] = [Strategy::Audio, Strategy::Video];

/// Computes a [FingerprintResult] for each file.
///
/// # Example
///
/// ```
/// use dupehound::{Capabilities, Fingerprinter};
///
/// let fingerprinter = Fingerprinter::new(Capabilities::none()).with_sample_frames(6);
/// let result = fingerprinter.fingerprint("song.mp3");
/// ```
pub struct Fingerprinter {
    capabilities: Capabilities,
    kinds: Kinds,
    sample_frames: usize,
    audio_length: Duration,
    frame_hasher: FrameHasher,
    audio_extensions: HashSet<String>,
    video_extensions: HashSet<String>,
}

impl Fingerprinter {
    /// Constructs a [Fingerprinter] with default settings.
    pub fn new(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            kinds: Kinds::default(),
            sample_frames: crate::DEFAULT_SAMPLE_FRAMES,
            audio_length: crate::DEFAULT_AUDIO_LENGTH,
            frame_hasher: FrameHasher::default(),
            audio_extensions: AUDIO_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            video_extensions: VIDEO_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }

    /// Returns a new [Fingerprinter] with the provided `kinds`.
    pub fn with_kinds(mut self, kinds: Kinds) -> Self {
        self.kinds = kinds;
        self
    }

    /// Returns a new [Fingerprinter] with the provided `sample_frames`.
    pub fn with_sample_frames(mut self, sample_frames: usize) -> Self {
        self.sample_frames = sample_frames;
        self
    }

    /// Returns a new [Fingerprinter] with the provided `audio_length`.
    pub fn with_audio_length(mut self, audio_length: Duration) -> Self {
        self.audio_length = audio_length;
        self
    }

    /// Returns a new [Fingerprinter] with the provided `frame_hasher`.
    pub fn with_frame_hasher(mut self, frame_hasher: FrameHasher) -> Self {
        self.frame_hasher = frame_hasher;
        self
    }

    /// Returns a new [Fingerprinter] that treats the given extensions as audio.
    pub fn with_audio_extensions<S: AsRef<str>>(mut self, extensions: &[S]) -> Self {
        self.audio_extensions = normalize_all(extensions);
        self
    }

    /// Returns a new [Fingerprinter] that treats the given extensions as video.
    pub fn with_video_extensions<S: AsRef<str>>(mut self, extensions: &[S]) -> Self {
        self.video_extensions = normalize_all(extensions);
        self
    }

    pub fn kinds(&self) -> Kinds {
        self.kinds
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Fingerprints a single file.
    ///
    /// Audio and video failures fall through to the next strategy. Only an I/O error while
    /// hashing the file contents is returned as an error.
    pub fn fingerprint(&self, path: impl AsRef<Path>) -> Result<FingerprintResult> {
        let path = path.as_ref();
        let span = tracing::span!(tracing::Level::TRACE, "fingerprint");
        let _enter = span.enter();

        let ext = crate::util::extension_of(path);
        for strategy in STRATEGIES {
            if let Some(result) = self.run_strategy(strategy, path, &ext) {
                return Ok(result);
            }
        }

        tracing::debug!("falling back to content hash for {}", path.display());
        Ok(FingerprintResult::fallback(sha256_file(path)?))
    }

    fn run_strategy(&self, strategy: Strategy, path: &Path, ext: &str) -> Option<FingerprintResult> {
        match strategy {
            Strategy::Audio => {
                if !(self.kinds.audio && self.audio_extensions.contains(ext)) {
                    return None;
                }
                let audio = self.capabilities.audio.as_ref()?;
                let result = audio
                    .fingerprint(path, self.audio_length)
                    .filter(|fp| !fp.is_empty())
                    .map(|fp| FingerprintResult::audio(audio.name(), fp));
                if result.is_none() {
                    tracing::debug!("no audio fingerprint for {}", path.display());
                }
                result
            }
            Strategy::Video => {
                if !(self.kinds.video && self.video_extensions.contains(ext)) {
                    return None;
                }
                let backend = self.capabilities.video.as_ref()?;
                let hash = {
                    // The source is dropped, releasing the decoder, at the end of this block.
                    let mut source = backend.open(path)?;
                    crate::video::video_hash(source.as_mut(), self.sample_frames, &self.frame_hasher)
                };
                if hash.is_none() {
                    tracing::debug!("no video frames decoded for {}", path.display());
                }
                hash.map(FingerprintResult::video)
            }
        }
    }
}

fn normalize_all<S: AsRef<str>>(extensions: &[S]) -> HashSet<String> {
    extensions
        .iter()
        .filter_map(|e| crate::util::normalize_extension(e.as_ref()))
        .collect()
}

/// Computes the SHA-256 digest of a file's contents as lowercase hex.
pub fn sha256_file(path: impl AsRef<Path>) -> Result<String> {
    let mut f = std::fs::File::open(path.as_ref())?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; FALLBACK_CHUNK_SIZE];
    loop {
        let n = match f.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}
