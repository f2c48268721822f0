use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::foundation::error::{TimelapseError, TimelapseResult};
use crate::snapshot::status::{StageId, StageStatus, StatusMap};

/// A highlighted area on one compiled page, in normalized image space (`0..=1` on both axes).
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChangedRegion {
    /// 1-based page number.
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ChangedRegion {
    /// Pixel rectangle `(left, top, width, height)` on an image of the given size.
    pub fn to_pixels(&self, image_width: u32, image_height: u32) -> (u32, u32, u32, u32) {
        let w = f64::from(image_width);
        let h = f64::from(image_height);
        let left = (self.x * w).round().clamp(0.0, w);
        let top = (self.y * h).round().clamp(0.0, h);
        let right = ((self.x + self.width) * w).round().clamp(left, w);
        let bottom = ((self.y + self.height) * h).round().clamp(top, h);
        (
            left as u32,
            top as u32,
            (right - left) as u32,
            (bottom - top) as u32,
        )
    }
}

/// Terminal view of a snapshot across an ordered stage list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    /// Every stage completed.
    Completed,
    /// Some stage failed; later stages are gated off.
    Failed,
    /// Nothing failed but at least one stage has not completed yet.
    Incomplete,
}

/// The per-commit unit of pipeline state.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Snapshot {
    commit: String,
    pub commit_date: DateTime<Utc>,
    /// Chronological position, used for frame ordering and fallback neighbour lookup.
    pub index: usize,
    #[serde(default)]
    pub main_file: Option<String>,
    #[serde(default)]
    pub status: StatusMap,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub includes: Vec<String>,
    /// File path -> raw `--unified=0` diff against the parent commit.
    #[serde(default)]
    pub git_diff: BTreeMap<String, String>,
    #[serde(default)]
    pub changed_regions: Vec<ChangedRegion>,
    #[serde(default)]
    pub pages: Vec<PathBuf>,
    #[serde(default)]
    pub frame: Option<PathBuf>,
    #[serde(skip)]
    work_dir: Option<PathBuf>,
}

impl Snapshot {
    pub fn new(commit: impl Into<String>, commit_date: DateTime<Utc>, index: usize) -> Self {
        Self {
            commit: commit.into(),
            commit_date,
            index,
            main_file: None,
            status: StatusMap::default(),
            error: None,
            includes: Vec::new(),
            git_diff: BTreeMap::new(),
            changed_regions: Vec::new(),
            pages: Vec::new(),
            frame: None,
            work_dir: None,
        }
    }

    /// Commit hash. Fixed for the lifetime of the snapshot.
    pub fn commit(&self) -> &str {
        &self.commit
    }

    pub fn short_commit(&self) -> &str {
        &self.commit[..self.commit.len().min(8)]
    }

    pub fn work_dir(&self) -> TimelapseResult<&Path> {
        self.work_dir.as_deref().ok_or_else(|| {
            TimelapseError::stage(format!(
                "snapshot {} has no working directory assigned",
                self.short_commit()
            ))
        })
    }

    pub fn set_work_dir(&mut self, dir: impl Into<PathBuf>) {
        self.work_dir = Some(dir.into());
    }

    pub fn clear_work_dir(&mut self) {
        self.work_dir = None;
    }

    pub fn main_file(&self) -> TimelapseResult<&str> {
        self.main_file.as_deref().ok_or_else(|| {
            TimelapseError::stage(format!(
                "snapshot {} has no main document (checkout has not run)",
                self.short_commit()
            ))
        })
    }

    /// Compiled PDF path relative to the working directory.
    pub fn pdf_file(&self) -> TimelapseResult<PathBuf> {
        Ok(Path::new(self.main_file()?).with_extension("pdf"))
    }

    pub fn stage_status(&self, stage: StageId) -> Option<StageStatus> {
        self.status.get(stage)
    }

    pub fn state(&self, stages: &[StageId]) -> PipelineState {
        let mut all_done = true;
        for &stage in stages {
            match self.status.get(stage) {
                Some(StageStatus::Completed) => {}
                Some(StageStatus::Failed) => return PipelineState::Failed,
                _ => all_done = false,
            }
        }
        if all_done {
            PipelineState::Completed
        } else {
            PipelineState::Incomplete
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/snapshot/model.rs"]
mod tests;
