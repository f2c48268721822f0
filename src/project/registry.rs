use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::foundation::error::{TimelapseError, TimelapseResult};
use crate::project::config::Config;
use crate::project::paths::ProjectPaths;
use crate::project::store::{SnapshotStore, read_json, write_json_atomic};
use crate::snapshot::{Snapshot, SnapshotSet, StageId};
use crate::stages::{Stage, StageContext};
use crate::vcs::{CommitInfo, GitCli, VersionControl};

#[derive(serde::Serialize, serde::Deserialize)]
struct ProjectFile {
    name: String,
    #[serde(default)]
    config: Config,
}

/// A named timelapse: an imported repository, its settings, and everything derived from it.
#[derive(Clone, Debug)]
pub struct Project {
    name: String,
    pub config: Config,
    paths: ProjectPaths,
}

impl Project {
    /// Import `source` (a local path or a clone URL) as a new project under `projects_root`.
    pub fn create(projects_root: &Path, name: &str, source: &str) -> TimelapseResult<Self> {
        let slug = slugify(name)?;
        let paths = ProjectPaths::new(projects_root.join(&slug));
        if paths.project_file().exists() || paths.source().exists() {
            return Err(TimelapseError::validation(format!(
                "project '{slug}' already exists in {}",
                projects_root.display()
            )));
        }

        // `git clone` runs next to the destination, so local sources must be absolute.
        let source = match std::fs::canonicalize(source) {
            Ok(path) => path.to_string_lossy().into_owned(),
            Err(_) => source.to_string(),
        };

        let git = GitCli;
        git.clone_repo(&source, &paths.source())?;
        git.gc(&paths.source());

        let project = Self {
            name: name.trim().to_string(),
            config: Config::default(),
            paths,
        };
        project.save()?;
        tracing::info!(project = %slug, source = %source, "project created");
        Ok(project)
    }

    pub fn open(projects_root: &Path, name: &str) -> TimelapseResult<Self> {
        let paths = ProjectPaths::new(projects_root.join(slugify(name)?));
        Self::open_dir(paths)
    }

    fn open_dir(paths: ProjectPaths) -> TimelapseResult<Self> {
        let file = paths.project_file();
        if !file.is_file() {
            return Err(TimelapseError::validation(format!(
                "no project at {}",
                paths.root().display()
            )));
        }
        let ProjectFile { name, config } = read_json(&file)?;
        config.validate()?;
        Ok(Self {
            name,
            config,
            paths,
        })
    }

    /// Every project under `projects_root`, sorted by directory name.
    pub fn list(projects_root: &Path) -> TimelapseResult<Vec<Self>> {
        if !projects_root.is_dir() {
            return Ok(Vec::new());
        }
        let mut dirs: Vec<PathBuf> = std::fs::read_dir(projects_root)
            .with_context(|| format!("read {}", projects_root.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.join("project.json").is_file())
            .collect();
        dirs.sort();

        let mut projects = Vec::with_capacity(dirs.len());
        for dir in dirs {
            match Self::open_dir(ProjectPaths::new(&dir)) {
                Ok(p) => projects.push(p),
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "skipping unreadable project");
                }
            }
        }
        Ok(projects)
    }

    pub fn save(&self) -> TimelapseResult<()> {
        write_json_atomic(
            &self.paths.project_file(),
            &ProjectFile {
                name: self.name.clone(),
                config: self.config.clone(),
            },
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn paths(&self) -> &ProjectPaths {
        &self.paths
    }

    pub fn store(&self) -> SnapshotStore {
        SnapshotStore::new(self.paths.clone())
    }

    /// Persisted snapshots reconciled with the repository's current history.
    ///
    /// New commits in the selected range are appended with fresh indices. Persisted commits that
    /// fall outside the range keep their state but are marked orphaned.
    pub fn load_snapshots(&self, vcs: &dyn VersionControl) -> TimelapseResult<SnapshotSet> {
        let store = self.store();
        let mut snapshots = store.load_all()?;
        let history = vcs.commits(&self.paths.source())?;
        let selected = select_range(
            &history,
            self.config.start_commit.as_deref(),
            self.config.end_commit.as_deref(),
        )?;

        let known: BTreeSet<String> = snapshots.iter().map(|s| s.commit().to_string()).collect();
        let mut next_index = snapshots.iter().map(|s| s.index + 1).max().unwrap_or(0);
        let mut added = 0;
        for commit in selected {
            if known.contains(&commit.hash) {
                continue;
            }
            snapshots.push(Snapshot::new(commit.hash.clone(), commit.authored, next_index));
            next_index += 1;
            added += 1;
        }

        let wanted: BTreeSet<&str> = selected.iter().map(|c| c.hash.as_str()).collect();
        let orphaned: BTreeSet<String> = snapshots
            .iter()
            .filter(|s| !wanted.contains(s.commit()))
            .map(|s| s.commit().to_string())
            .collect();
        if !orphaned.is_empty() {
            tracing::info!(count = orphaned.len(), "keeping snapshots outside the selected history");
        }

        let set = SnapshotSet::new(snapshots).with_orphaned(orphaned);
        if added > 0 {
            tracing::info!(added, total = set.len(), "new commits found");
            store.save_all(set.snapshots())?;
        }
        Ok(set)
    }

    /// Reset `stage` and every stage after it in `stages` for all snapshots.
    pub fn reset_from(
        &self,
        set: &mut SnapshotSet,
        stage: StageId,
        stages: &[Box<dyn Stage>],
    ) -> TimelapseResult<()> {
        let start = stages.iter().position(|s| s.id() == stage).ok_or_else(|| {
            TimelapseError::validation(format!("stage '{}' is not part of the pipeline", stage.key()))
        })?;

        let ctx = StageContext { paths: &self.paths };
        let store = self.store();
        for snapshot in set.snapshots_mut() {
            let mut touched = false;
            for s in &stages[start..] {
                if snapshot.status.get(s.id()).is_none() {
                    continue;
                }
                s.reset(snapshot, &ctx);
                snapshot.status.reset(s.id());
                touched = true;
            }
            if touched {
                snapshot.error = None;
                store.save(snapshot)?;
            }
        }
        store.save_all(set.snapshots())?;
        tracing::info!(stage = stage.key(), "snapshots reset");
        Ok(())
    }
}

/// Commits between `start` and `end` inclusive; either bound may be an abbreviated hash.
fn select_range<'c>(
    history: &'c [CommitInfo],
    start: Option<&str>,
    end: Option<&str>,
) -> TimelapseResult<&'c [CommitInfo]> {
    let find = |wanted: &str| {
        history
            .iter()
            .position(|c| c.hash.starts_with(wanted))
            .ok_or_else(|| TimelapseError::validation(format!("commit {wanted} not in history")))
    };
    let from = start.map(find).transpose()?.unwrap_or(0);
    let to = match end {
        Some(e) => find(e)? + 1,
        None => history.len(),
    };
    if from >= to && !history.is_empty() {
        return Err(TimelapseError::validation(
            "start_commit comes after end_commit",
        ));
    }
    Ok(&history[from..to])
}

/// Lowercase ASCII alphanumerics joined by single dashes.
pub fn slugify(name: &str) -> TimelapseResult<String> {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        return Err(TimelapseError::validation(format!(
            "project name '{name}' has no usable characters"
        )));
    }
    Ok(slug)
}

#[cfg(test)]
#[path = "../../tests/unit/project/registry.rs"]
mod tests;
