//! The pipeline steps applied to every snapshot.
//!
//! The scheduler only sees [`Stage`]; the concrete stages below are assembled into an explicit
//! ordered list by [`default_stages`].

pub(crate) mod assemble;
pub(crate) mod checkout;
pub(crate) mod compile;
pub(crate) mod rasterize;
pub(crate) mod replace_text;

use std::sync::Arc;

use crate::foundation::error::TimelapseResult;
use crate::project::config::Config;
use crate::project::paths::ProjectPaths;
use crate::snapshot::{Snapshot, StageId};
use crate::vcs::VersionControl;

pub use assemble::Assemble;
pub use checkout::Checkout;
pub use compile::Compile;
pub use rasterize::Rasterize;
pub use replace_text::ReplaceText;

/// Project-level locations a stage may read or write besides the snapshot's working directory.
#[derive(Clone, Copy, Debug)]
pub struct StageContext<'a> {
    pub paths: &'a ProjectPaths,
}

pub trait Stage: Send + Sync {
    fn id(&self) -> StageId;

    fn name(&self) -> &'static str {
        self.id().label()
    }

    /// Called once per run, before any snapshot is processed.
    fn init(&mut self, config: &Config) -> TimelapseResult<()>;

    /// `Ok` marks the stage completed for this snapshot, `Err` marks it failed.
    fn run(&self, snapshot: &mut Snapshot, ctx: &StageContext<'_>) -> TimelapseResult<()>;

    /// Called once per run, after every snapshot has been processed.
    fn cleanup(&self) {}

    /// Whether `run` reads the snapshot's working directory.
    fn uses_work_dir(&self) -> bool {
        true
    }

    /// Rebuild the working-directory state this stage left behind in an earlier run.
    ///
    /// Called on a freshly leased directory for a snapshot that already completed this stage, so a
    /// later stage resumes on that snapshot's own tree. Status and snapshot fields stay untouched.
    fn restore(&self, _snapshot: &Snapshot, _ctx: &StageContext<'_>) -> TimelapseResult<()> {
        Ok(())
    }

    /// Undo this stage's effects on `snapshot` so it can run again.
    fn reset(&self, snapshot: &mut Snapshot, ctx: &StageContext<'_>);
}

/// Checkout, text replacement, compilation, rasterization and frame assembly, in that order.
pub fn default_stages(vcs: Arc<dyn VersionControl>) -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(Checkout::new(vcs)),
        Box::new(ReplaceText::default()),
        Box::new(Compile::default()),
        Box::new(Rasterize::default()),
        Box::new(Assemble::default()),
    ]
}

/// Remove a file or directory tree, treating "already gone" as success.
pub(crate) fn remove_path(path: &std::path::Path) {
    let result = if path.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    if let Err(e) = result
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!(path = %path.display(), error = %e, "failed to remove stage output");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/stages/order.rs"]
mod tests;
