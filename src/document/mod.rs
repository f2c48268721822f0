//! LaTeX source discovery: the main document, the files it pulls in, and where it references them.

pub(crate) mod includes;
pub(crate) mod paths;

pub use includes::{IncludeGraph, Reference, ReferenceKind, ReferencePolicy, find_main_file};
