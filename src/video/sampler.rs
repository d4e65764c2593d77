use super::{combine_majority, FrameHasher, FrameSource};

/// Returns the frame indices to sample from a stream with `total_frames` frames.
///
/// Indices are spaced `max(1, total_frames / sample_frames)` apart, starting at 0. Nothing
/// is sampled if the frame count is unknown (0).
pub fn sample_indices(total_frames: u64, sample_frames: usize) -> Vec<u64> {
    if total_frames == 0 || sample_frames == 0 {
        return Vec::new();
    }
    let step = (total_frames / sample_frames as u64).max(1);
    (0..sample_frames as u64).map(|i| i * step).collect()
}

/// Samples frames from `source` and returns the majority-vote combination of their hashes.
///
/// Frames that fail to decode are skipped. Returns `None` if no frame could be hashed.
pub fn video_hash(
    source: &mut dyn FrameSource,
    sample_frames: usize,
    hasher: &FrameHasher,
) -> Option<u64> {
    let total_frames = source.frame_count();
    let indices = sample_indices(total_frames, sample_frames);

    let mut hashes = Vec::with_capacity(indices.len());
    for idx in indices {
        match source.decode_frame(idx) {
            Some(frame) => hashes.push(hasher.hash(&frame)),
            None => tracing::trace!(idx, "skipping frame that failed to decode"),
        }
    }

    tracing::trace!(total_frames, hashed = hashes.len(), "sampled video frames");

    if hashes.is_empty() {
        return None;
    }
    Some(combine_majority(&hashes, hasher.bits()))
}
