//! Commit concatenation: keep one commit per group and fall back to the skipped ones on failure.

/// Positions to attempt within a group of `group_len` snapshots sorted oldest first.
///
/// The newest snapshot is kept and goes first; when it fails, up to `fallback_attempts` of the
/// skipped predecessors follow, newest first.
pub fn attempt_order(group_len: usize, fallback_attempts: usize) -> Vec<usize> {
    let Some(kept) = group_len.checked_sub(1) else {
        return Vec::new();
    };
    std::iter::once(kept)
        .chain((0..kept).rev().take(fallback_attempts))
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/concat.rs"]
mod tests;
