use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::fingerprint::{Kinds, AUDIO_EXTENSIONS, VIDEO_EXTENSIONS};
use crate::{Error, Result};

/// Builds the set of extensions admitted by [find_files].
///
/// An empty set means every file is admitted.
pub fn allowed_extensions<S: AsRef<str>>(kinds: Kinds, custom_exts: &[S]) -> HashSet<String> {
    let mut allowed = HashSet::new();
    if kinds.audio {
        allowed.extend(AUDIO_EXTENSIONS.iter().map(|e| e.to_string()));
    }
    if kinds.video {
        allowed.extend(VIDEO_EXTENSIONS.iter().map(|e| e.to_string()));
    }
    allowed.extend(
        custom_exts
            .iter()
            .filter_map(|e| crate::util::normalize_extension(e.as_ref())),
    );
    allowed
}

/// Lists the files under `root` whose extension matches the enabled kinds or one of
/// `custom_exts`.
///
/// If `recurse` is false, only the direct children of `root` are considered. Entries that
/// cannot be read are logged and skipped.
pub fn find_files<S: AsRef<str>>(
    root: impl AsRef<Path>,
    recurse: bool,
    kinds: Kinds,
    custom_exts: &[S],
) -> Result<Vec<PathBuf>> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(Error::RootNotFound(root.to_owned()));
    }

    let allowed = allowed_extensions(kinds, custom_exts);
    let max_depth = if recurse { usize::MAX } else { 1 };

    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("skipping unreadable entry: {}", Error::from(e));
                continue;
            }
        };
        // Links are not traversed, but a link to a regular file counts as a file.
        let is_file =
            entry.file_type().is_file() || (entry.path_is_symlink() && entry.path().is_file());
        if !is_file {
            continue;
        }
        if allowed.is_empty() || allowed.contains(&crate::util::extension_of(entry.path())) {
            files.push(entry.into_path());
        }
    }

    tracing::info!("found {} matching files under {}", files.len(), root.display());

    Ok(files)
}
