use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use anyhow::Context;
use tempfile::NamedTempFile;

use crate::foundation::error::{TimelapseError, TimelapseResult};
use crate::project::paths::ProjectPaths;
use crate::snapshot::Snapshot;

/// Snapshot persistence: one project-level list plus one record per commit.
///
/// Records are written after every stage attempt and overlay the list on load, so an interrupted
/// run resumes from the most recent state of each snapshot.
#[derive(Clone, Debug)]
pub struct SnapshotStore {
    paths: ProjectPaths,
}

impl SnapshotStore {
    pub fn new(paths: ProjectPaths) -> Self {
        Self { paths }
    }

    pub fn save(&self, snapshot: &Snapshot) -> TimelapseResult<()> {
        write_json_atomic(&self.paths.record(snapshot.commit()), snapshot)
    }

    pub fn save_all(&self, snapshots: &[Snapshot]) -> TimelapseResult<()> {
        write_json_atomic(&self.paths.snapshots_file(), &snapshots)
    }

    /// Everything persisted for this project, in index order.
    ///
    /// A commit listed twice in `snapshots.json` is a structural error. Unreadable records are
    /// skipped with a warning.
    pub fn load_all(&self) -> TimelapseResult<Vec<Snapshot>> {
        let mut by_commit: BTreeMap<String, Snapshot> = BTreeMap::new();

        let list_path = self.paths.snapshots_file();
        if list_path.is_file() {
            let list: Vec<Snapshot> = read_json(&list_path)?;
            for snapshot in list {
                let commit = snapshot.commit().to_string();
                if by_commit.insert(commit.clone(), snapshot).is_some() {
                    return Err(TimelapseError::snapshot(format!(
                        "commit {commit} appears more than once in {}",
                        list_path.display()
                    )));
                }
            }
        }

        let records_dir = self.paths.records_dir();
        if records_dir.is_dir() {
            let entries = std::fs::read_dir(&records_dir)
                .with_context(|| format!("read {}", records_dir.display()))?;
            for entry in entries {
                let path = entry?.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                match read_json::<Snapshot>(&path) {
                    Ok(snapshot) => {
                        by_commit.insert(snapshot.commit().to_string(), snapshot);
                    }
                    Err(e) => {
                        tracing::warn!(record = %path.display(), error = %e, "ignoring unreadable snapshot record");
                    }
                }
            }
        }

        let mut snapshots: Vec<Snapshot> = by_commit.into_values().collect();
        snapshots.sort_by_key(|s| s.index);
        Ok(snapshots)
    }
}

pub(crate) fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> TimelapseResult<T> {
    let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| TimelapseError::serde(format!("{}: {e}", path.display())))
}

/// Pretty JSON written to a temp file next to `path`, then renamed over it.
pub(crate) fn write_json_atomic<T: serde::Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> TimelapseResult<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;

    let mut json = serde_json::to_vec_pretty(value)?;
    json.push(b'\n');

    let mut temp = NamedTempFile::new_in(dir)
        .with_context(|| format!("create temp file in {}", dir.display()))?;
    temp.write_all(&json)?;
    temp.flush()?;
    temp.into_temp_path()
        .persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/project/store.rs"]
mod tests;
