use std::path::Path;
use std::time::Duration;

/// Normalizes a user-supplied extension to lowercase with a leading dot.
///
/// Returns `None` for blank input.
pub fn normalize_extension(ext: &str) -> Option<String> {
    let ext = ext.trim();
    if ext.is_empty() {
        return None;
    }
    let ext = ext.to_lowercase();
    if ext.starts_with('.') {
        Some(ext)
    } else {
        Some(format!(".{}", ext))
    }
}

/// Returns the extension of `path` in normalized form (e.g. ".mp4"), or an empty string if
/// the file has none.
pub fn extension_of(path: impl AsRef<Path>) -> String {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .and_then(normalize_extension)
        .unwrap_or_default()
}

/// Formats the given [Duration] as "MM:SSs"
pub fn format_time(t: Duration) -> String {
    let minutes = t.as_secs() / 60;
    let seconds = t.as_secs() % 60;
    format!("{:02}:{:02}s", minutes, seconds)
}

// Converts a timestamp in time base units into a [std::time::Duration] that
// represents the timestamp in time units. Negative timestamps clamp to zero.
pub(crate) fn to_timestamp(
    time_base: ffmpeg_next::util::rational::Rational,
    raw_timestamp: i64,
) -> Duration {
    let time_base: f64 = time_base.into();
    let ts = raw_timestamp as f64 * time_base;
    if ts.is_finite() && ts > 0.0 {
        Duration::from_secs_f64(ts)
    } else {
        Duration::ZERO
    }
}

/// Returns the underlying FFmpeg version integer.
pub fn ffmpeg_version() -> u32 {
    ffmpeg_next::util::version()
}

/// Returns the underlying FFmpeg version string.
pub fn ffmpeg_version_string() -> String {
    let version_int = ffmpeg_version();

    // Reference: https://github.com/FFmpeg/FFmpeg/blob/130d19bf2044ac76372d1b97ab87ab283c8b37f8/libavutil/version.h#L64
    format!(
        "{}.{}.{}",
        version_int >> 16,             // MAJOR
        (version_int & 0x00FF00) >> 8, // MINOR
        version_int & 0xFF             // MICRO
    )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_normalize_extension() {
        assert_eq!(normalize_extension("MP4").as_deref(), Some(".mp4"));
        assert_eq!(normalize_extension(".Flac").as_deref(), Some(".flac"));
        assert_eq!(normalize_extension("  ogg "), Some(".ogg".to_string()));
        assert_eq!(normalize_extension(""), None);
        assert_eq!(normalize_extension("   "), None);
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("/music/Track.MP3"), ".mp3");
        assert_eq!(extension_of("clip.tar.mkv"), ".mkv");
        assert_eq!(extension_of("README"), "");
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(Duration::from_secs(125)), "02:05s");
        assert_eq!(format_time(Duration::ZERO), "00:00s");
    }

    #[test]
    fn test_to_timestamp() {
        let tb = ffmpeg_next::util::rational::Rational::new(1, 1000);
        assert_eq!(to_timestamp(tb, 2500), Duration::from_millis(2500));
        assert_eq!(to_timestamp(tb, -10), Duration::ZERO);
    }
}
