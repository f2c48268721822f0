use std::collections::BTreeSet;

use crate::foundation::error::{TimelapseError, TimelapseResult};
use crate::snapshot::model::Snapshot;

/// A project's snapshots in index order, plus the commits that are kept but never scheduled.
#[derive(Clone, Debug, Default)]
pub struct SnapshotSet {
    snapshots: Vec<Snapshot>,
    orphaned: BTreeSet<String>,
}

impl SnapshotSet {
    pub fn new(mut snapshots: Vec<Snapshot>) -> Self {
        snapshots.sort_by_key(|s| s.index);
        Self {
            snapshots,
            orphaned: BTreeSet::new(),
        }
    }

    pub fn with_orphaned(mut self, orphaned: BTreeSet<String>) -> Self {
        self.orphaned = orphaned;
        self
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn snapshots_mut(&mut self) -> &mut [Snapshot] {
        &mut self.snapshots
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Every snapshot that is not orphaned, in index order.
    pub fn schedulable_mut(&mut self) -> Vec<&mut Snapshot> {
        let orphaned = &self.orphaned;
        self.snapshots
            .iter_mut()
            .filter(|s| !orphaned.contains(s.commit()))
            .collect()
    }

    /// Persisted commits that are no longer part of the selected history.
    pub fn is_orphaned(&self, commit: &str) -> bool {
        self.orphaned.contains(commit)
    }

    /// Position of `commit`; unknown and duplicated commits are structural errors.
    pub fn position(&self, commit: &str) -> TimelapseResult<usize> {
        let mut found = self
            .snapshots
            .iter()
            .enumerate()
            .filter(|(_, s)| {
                s.commit() == commit || (commit.len() >= 7 && s.commit().starts_with(commit))
            });
        let Some((pos, _)) = found.next() else {
            return Err(TimelapseError::snapshot(format!("snapshot {commit} not found")));
        };
        if found.next().is_some() {
            return Err(TimelapseError::snapshot(format!(
                "snapshot {commit} found multiple times"
            )));
        }
        Ok(pos)
    }

    pub fn into_vec(self) -> Vec<Snapshot> {
        self.snapshots
    }
}

#[cfg(test)]
#[path = "../../tests/unit/snapshot/set.rs"]
mod tests;
