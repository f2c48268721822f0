//! Version-control access used by the pipeline.
//!
//! Only the handful of operations the stages need are exposed, behind [`VersionControl`], so that
//! the scheduler and project code can be exercised without a real repository.

use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};

use crate::foundation::error::{TimelapseError, TimelapseResult};
use crate::foundation::process;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitInfo {
    pub hash: String,
    pub authored: DateTime<Utc>,
}

pub trait VersionControl: Send + Sync {
    /// Every commit reachable from `HEAD`, oldest first.
    fn commits(&self, repo: &Path) -> TimelapseResult<Vec<CommitInfo>>;

    /// Force the working tree to `commit`, discarding local edits and untracked files.
    fn reset_hard(&self, work_dir: &Path, commit: &str) -> TimelapseResult<()>;

    /// Zero-context diff of `path` between `commit`'s first parent and `commit`.
    ///
    /// `None` when the commit has no parent or the file did not change.
    fn diff_parent(&self, work_dir: &Path, commit: &str, path: &str)
    -> TimelapseResult<Option<String>>;
}

/// [`VersionControl`] implemented by shelling out to `git`.
#[derive(Clone, Copy, Debug, Default)]
pub struct GitCli;

impl GitCli {
    pub fn clone_repo(&self, source: &str, dest: &Path) -> TimelapseResult<()> {
        let parent = dest.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)?;
        process::checked(
            parent,
            "git",
            [
                std::ffi::OsStr::new("clone"),
                std::ffi::OsStr::new("--quiet"),
                std::ffi::OsStr::new(source),
                dest.as_os_str(),
            ],
        )?;
        Ok(())
    }

    /// Best-effort repository compaction; failures are only logged.
    pub fn gc(&self, repo: &Path) {
        match process::checked(repo, "git", ["gc", "--aggressive", "--quiet"]) {
            Ok(_) => tracing::debug!(repo = %repo.display(), "git gc finished"),
            Err(e) => tracing::warn!(repo = %repo.display(), error = %e, "git gc failed"),
        }
    }

    pub fn is_available() -> bool {
        process::is_on_path("git")
    }
}

impl VersionControl for GitCli {
    fn commits(&self, repo: &Path) -> TimelapseResult<Vec<CommitInfo>> {
        let out = process::checked(repo, "git", ["log", "--reverse", "--format=%H %at"])?;
        parse_log(&out)
    }

    fn reset_hard(&self, work_dir: &Path, commit: &str) -> TimelapseResult<()> {
        process::checked(work_dir, "git", ["reset", "--hard", "--quiet", commit])?;
        // Build products of the previous commit in this directory must not leak into this one.
        process::checked(work_dir, "git", ["clean", "-fdxq"])?;
        Ok(())
    }

    fn diff_parent(
        &self,
        work_dir: &Path,
        commit: &str,
        path: &str,
    ) -> TimelapseResult<Option<String>> {
        let parent = format!("{commit}~1");
        let has_parent = process::output(
            work_dir,
            "git",
            ["rev-parse", "--verify", "--quiet", parent.as_str()],
        )?
        .success;
        if !has_parent {
            return Ok(None);
        }

        let out = process::checked(
            work_dir,
            "git",
            [
                "diff",
                "--no-color",
                "--unified=0",
                parent.as_str(),
                commit,
                "--",
                path,
            ],
        )?;
        Ok((!out.trim().is_empty()).then_some(out))
    }
}

/// Parse `git log --format='%H %at'` output.
pub fn parse_log(out: &str) -> TimelapseResult<Vec<CommitInfo>> {
    out.lines()
        .filter(|l| !l.trim().is_empty())
        .map(|line| {
            let (hash, ts) = line.trim().split_once(' ').ok_or_else(|| {
                TimelapseError::tool(format!("unexpected git log line: '{line}'"))
            })?;
            let secs: i64 = ts.trim().parse().map_err(|_| {
                TimelapseError::tool(format!("bad commit timestamp in git log line: '{line}'"))
            })?;
            let authored = Utc.timestamp_opt(secs, 0).single().ok_or_else(|| {
                TimelapseError::tool(format!("commit timestamp out of range: {secs}"))
            })?;
            Ok(CommitInfo {
                hash: hash.to_string(),
                authored,
            })
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/vcs/git.rs"]
mod tests;
