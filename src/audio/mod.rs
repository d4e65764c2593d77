mod chromaprint;
mod fpcalc;

pub use self::chromaprint::Chromaprint;
pub use fpcalc::{parse_fpcalc_output, Fpcalc};

use std::path::Path;
use std::time::Duration;

/// Computes an opaque audio fingerprint for a file.
///
/// Implementations must not fail loudly: any problem (missing tool, undecodable file, no
/// fingerprint produced) is reported as `None` so the caller can fall back to another
/// strategy.
pub trait AudioFingerprinter: Send + Sync {
    /// Short name used in result details and logs.
    fn name(&self) -> &'static str;

    /// Fingerprints at most `length` of audio from the start of `path`.
    fn fingerprint(&self, path: &Path, length: Duration) -> Option<String>;
}
