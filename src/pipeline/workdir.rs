use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;

use crate::foundation::error::TimelapseResult;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkDirPoolStats {
    pub created: usize,
    pub leases: usize,
}

#[derive(Debug, Default)]
struct PoolState {
    free: Vec<PathBuf>,
    next_slot: usize,
    stats: WorkDirPoolStats,
}

/// Reusable scratch checkouts under `root/<slot>`.
///
/// Each slot holds a private copy of the source repository's `.git`, so concurrent checkouts never
/// touch the same repository. A slot is leased to one worker at a time and goes back to the pool
/// when the lease is dropped.
#[derive(Debug)]
pub struct WorkDirPool {
    root: PathBuf,
    source_git: PathBuf,
    state: Mutex<PoolState>,
}

impl WorkDirPool {
    pub fn new(root: impl Into<PathBuf>, source_repo: &Path) -> Self {
        Self {
            root: root.into(),
            source_git: source_repo.join(".git"),
            state: Mutex::new(PoolState::default()),
        }
    }

    pub fn acquire(&self) -> TimelapseResult<WorkDirLease<'_>> {
        let (reused, slot) = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.stats.leases += 1;
            match state.free.pop() {
                Some(path) => (true, path),
                None => {
                    let slot = self.root.join(state.next_slot.to_string());
                    state.next_slot += 1;
                    (false, slot)
                }
            }
        };

        if !reused {
            if let Err(e) = self.seed(&slot) {
                tracing::warn!(slot = %slot.display(), error = %e, "failed to prepare working directory");
                if let Err(rm) = std::fs::remove_dir_all(&slot)
                    && rm.kind() != std::io::ErrorKind::NotFound
                {
                    tracing::warn!(slot = %slot.display(), error = %rm, "failed to remove working directory");
                }
                return Err(e);
            }
            self.state.lock().unwrap_or_else(|e| e.into_inner()).stats.created += 1;
        }
        Ok(WorkDirLease {
            pool: self,
            path: Some(slot),
        })
    }

    fn seed(&self, slot: &Path) -> TimelapseResult<()> {
        let git_dir = slot.join(".git");
        if git_dir.is_dir() {
            return Ok(());
        }
        std::fs::create_dir_all(slot).with_context(|| format!("create {}", slot.display()))?;
        copy_tree(&self.source_git, &git_dir)?;
        tracing::debug!(slot = %slot.display(), "seeded working directory");
        Ok(())
    }

    fn release(&self, path: PathBuf) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.free.push(path);
    }

    pub fn stats(&self) -> WorkDirPoolStats {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).stats
    }

    /// Delete every slot. Only call once no lease is outstanding.
    pub fn remove_all(&self) -> TimelapseResult<()> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.free.clear();
        state.next_slot = 0;
        if self.root.exists() {
            std::fs::remove_dir_all(&self.root)
                .with_context(|| format!("remove {}", self.root.display()))?;
        }
        Ok(())
    }
}

/// Exclusive use of one working directory until dropped.
#[derive(Debug)]
pub struct WorkDirLease<'a> {
    pool: &'a WorkDirPool,
    path: Option<PathBuf>,
}

impl WorkDirLease<'_> {
    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or_else(|| Path::new(""))
    }
}

impl Drop for WorkDirLease<'_> {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            self.pool.release(path);
        }
    }
}

fn copy_tree(from: &Path, to: &Path) -> TimelapseResult<()> {
    for entry in walkdir::WalkDir::new(from) {
        let entry = entry.with_context(|| format!("walk {}", from.display()))?;
        let rel = entry
            .path()
            .strip_prefix(from)
            .with_context(|| format!("strip prefix of {}", entry.path().display()))?;
        let target = to.join(rel);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)
                .with_context(|| format!("create {}", target.display()))?;
        } else if entry.file_type().is_file() {
            std::fs::copy(entry.path(), &target)
                .with_context(|| format!("copy {}", entry.path().display()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/workdir.rs"]
mod tests;
