//! Project directories: settings, on-disk layout and persisted snapshot state.

/// Per-project settings.
pub mod config;
pub mod paths;
pub(crate) mod registry;
pub mod store;

pub use config::{Config, CropMargins, CropSettings, TextReplacement};
pub use paths::ProjectPaths;
pub use registry::{Project, slugify};
pub use store::SnapshotStore;
