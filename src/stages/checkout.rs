use std::sync::Arc;

use crate::document::{IncludeGraph, find_main_file};
use crate::foundation::error::{TimelapseError, TimelapseResult};
use crate::project::config::Config;
use crate::snapshot::{Snapshot, StageId};
use crate::stages::{Stage, StageContext};
use crate::vcs::VersionControl;

/// Reset the working tree to the snapshot's commit and collect its document and diffs.
pub struct Checkout {
    vcs: Arc<dyn VersionControl>,
    main_file: Option<String>,
}

impl Checkout {
    pub fn new(vcs: Arc<dyn VersionControl>) -> Self {
        Self {
            vcs,
            main_file: None,
        }
    }
}

impl Stage for Checkout {
    fn id(&self) -> StageId {
        StageId::Checkout
    }

    fn init(&mut self, config: &Config) -> TimelapseResult<()> {
        self.main_file = config.main_file.clone().filter(|m| !m.trim().is_empty());
        Ok(())
    }

    fn run(&self, snapshot: &mut Snapshot, _ctx: &StageContext<'_>) -> TimelapseResult<()> {
        let work_dir = snapshot.work_dir()?.to_path_buf();
        let commit = snapshot.commit().to_string();
        self.vcs.reset_hard(&work_dir, &commit)?;

        let main_file = match &self.main_file {
            Some(main) if work_dir.join(main).is_file() => main.clone(),
            Some(main) => {
                return Err(TimelapseError::stage(format!(
                    "configured main file '{main}' does not exist at this commit"
                )));
            }
            None => find_main_file(&work_dir)?,
        };

        let graph = IncludeGraph::scan(&work_dir, &main_file)?;
        snapshot.git_diff.clear();
        for file in graph.files() {
            if let Some(diff) = self.vcs.diff_parent(&work_dir, &commit, file)? {
                snapshot.git_diff.insert(file.clone(), diff);
            }
        }
        snapshot.includes = graph.files().to_vec();
        snapshot.main_file = Some(main_file);

        tracing::debug!(
            commit = %snapshot.short_commit(),
            includes = snapshot.includes.len(),
            changed = snapshot.git_diff.len(),
            "checked out"
        );
        Ok(())
    }

    fn restore(&self, snapshot: &Snapshot, _ctx: &StageContext<'_>) -> TimelapseResult<()> {
        self.vcs.reset_hard(snapshot.work_dir()?, snapshot.commit())
    }

    fn reset(&self, snapshot: &mut Snapshot, _ctx: &StageContext<'_>) {
        snapshot.main_file = None;
        snapshot.includes.clear();
        snapshot.git_diff.clear();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/stages/checkout.rs"]
mod tests;
