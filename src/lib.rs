//! Texlapse turns the git history of a LaTeX document into a timelapse video.
//!
//! Every commit becomes a [`Snapshot`] that moves through an ordered list of [`Stage`]s:
//!
//! - check the commit out into a private working directory
//! - patch the sources and compile them to PDF
//! - map the commit's diff onto the compiled pages
//! - rasterize the pages and lay them out as one highlighted frame
//!
//! The [`Scheduler`] runs that list over a project's snapshots on a bounded worker pool, persists
//! status after every stage, and resumes where an interrupted run stopped. [`assemble_video`]
//! turns the frames into an MP4.
#![forbid(unsafe_code)]

pub mod changes;
pub mod document;
pub mod encode;
pub(crate) mod foundation;
pub mod pipeline;
pub mod project;
pub mod render;
pub mod snapshot;
pub mod stages;
pub mod vcs;

pub use crate::foundation::error::{TimelapseError, TimelapseResult};

pub use crate::changes::{ChangeMapper, PageGeometry, PageMapper};
pub use crate::encode::{VideoOpts, assemble_video};
pub use crate::pipeline::{
    Reporter, RunSummary, Scheduler, TerminalReporter, TracingReporter, WorkDirPool,
};
pub use crate::project::{Config, Project, ProjectPaths, SnapshotStore};
pub use crate::snapshot::{
    ChangedRegion, PipelineState, Snapshot, SnapshotSet, StageId, StageStatus, StatusMap,
};
pub use crate::stages::{Stage, StageContext, default_stages};
pub use crate::vcs::{CommitInfo, GitCli, VersionControl};
