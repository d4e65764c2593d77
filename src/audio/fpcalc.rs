use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use super::AudioFingerprinter;

const FPCALC: &str = "fpcalc";
const FINGERPRINT_PREFIX: &str = "FINGERPRINT=";

/// Runs Chromaprint's `fpcalc` command-line tool.
#[derive(Clone, Debug)]
pub struct Fpcalc {
    program: PathBuf,
}

impl Fpcalc {
    /// Uses the given `fpcalc` executable.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Searches `PATH` for `fpcalc`. Returns `None` if it is not installed.
    pub fn locate() -> Option<Self> {
        let path = std::env::var_os("PATH")?;
        Self::locate_in(&path)
    }

    fn locate_in(path: &OsStr) -> Option<Self> {
        let names: &[&str] = if cfg!(windows) {
            &["fpcalc.exe", FPCALC]
        } else {
            &[FPCALC]
        };
        std::env::split_paths(path)
            .flat_map(|dir| names.iter().map(move |name| dir.join(name)))
            .find(|candidate| candidate.is_file())
            .map(Self::new)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl AudioFingerprinter for Fpcalc {
    fn name(&self) -> &'static str {
        FPCALC
    }

    fn fingerprint(&self, path: &Path, length: Duration) -> Option<String> {
        let output = Command::new(&self.program)
            .arg("-length")
            .arg(length.as_secs().to_string())
            .arg(path)
            .stdin(Stdio::null())
            .output();

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                tracing::debug!("failed to run {}: {}", self.program.display(), e);
                return None;
            }
        };
        if !output.status.success() {
            tracing::debug!(
                status = ?output.status,
                "fpcalc failed for {}: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim(),
            );
            return None;
        }

        parse_fpcalc_output(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Extracts the fingerprint from `fpcalc` output. Returns `None` if there is no
/// non-empty `FINGERPRINT=` line.
pub fn parse_fpcalc_output(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .find_map(|line| line.strip_prefix(FINGERPRINT_PREFIX))
        .map(|fp| fp.trim().to_string())
        .filter(|fp| !fp.is_empty())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_fpcalc_output() {
        let stdout = "FILE=song.mp3\nDURATION=213\nFINGERPRINT=AQADtEmUaEkSRZEG\n";
        assert_eq!(parse_fpcalc_output(stdout).as_deref(), Some("AQADtEmUaEkSRZEG"));

        let stdout = "DURATION=10\r\nFINGERPRINT=AQAA  \r\n";
        assert_eq!(parse_fpcalc_output(stdout).as_deref(), Some("AQAA"));
    }

    #[test]
    fn test_parse_fpcalc_output_missing() {
        assert_eq!(parse_fpcalc_output(""), None);
        assert_eq!(parse_fpcalc_output("FILE=a.mp3\nDURATION=3\n"), None);
        assert_eq!(parse_fpcalc_output("FINGERPRINT=\n"), None);
    }

    #[test]
    fn test_locate_in() {
        let dir = tempfile::tempdir().unwrap();
        let path = std::env::join_paths([dir.path()]).unwrap();
        assert!(Fpcalc::locate_in(&path).is_none());

        let exe = dir.path().join(if cfg!(windows) { "fpcalc.exe" } else { FPCALC });
        std::fs::write(&exe, b"").unwrap();
        let fpcalc = Fpcalc::locate_in(&path).unwrap();
        assert_eq!(fpcalc.program(), exe);
    }

    #[test]
    fn test_missing_program() {
        let dir = tempfile::tempdir().unwrap();
        let fpcalc = Fpcalc::new(dir.path().join("does-not-exist"));
        let audio = dir.path().join("a.mp3");
        assert_eq!(fpcalc.fingerprint(&audio, Duration::from_secs(120)), None);
    }
}
