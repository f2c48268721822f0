//! Per-commit pipeline state.

pub(crate) mod model;
pub(crate) mod set;
pub(crate) mod status;

pub use model::{ChangedRegion, PipelineState, Snapshot};
pub use set::SnapshotSet;
pub use status::{StageId, StageStatus, StatusMap};
