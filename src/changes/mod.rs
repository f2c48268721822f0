//! Mapping source-level diffs to highlighted regions on compiled pages.

pub(crate) mod hunk;
pub(crate) mod regions;
pub(crate) mod synctex;

use std::collections::{BTreeMap, BTreeSet};

use crate::document::paths::extension_of;
use crate::document::{IncludeGraph, ReferencePolicy};
use crate::snapshot::ChangedRegion;

pub use hunk::{HunkHeader, changed_lines, parse_hunks};
pub use regions::{PageGeometry, PageHit, PixelBox, normalize, to_image_space};
pub use synctex::{FALLBACK_PAGE_SIZE_PT, PageMapper, SynctexMapper, page_size};

pub const DEFAULT_TEXT_EXTENSIONS: &[&str] = &["tex", "sty", "cls", "bib"];

#[derive(Clone, Debug)]
pub struct ChangeMapper {
    /// Padding around each box, in image pixels.
    pub padding: f64,
    pub policy: ReferencePolicy,
    /// Lowercase extensions whose diffs are read hunk by hunk.
    pub text_extensions: Vec<String>,
}

impl Default for ChangeMapper {
    fn default() -> Self {
        Self {
            padding: 25.0,
            policy: ReferencePolicy::default(),
            text_extensions: DEFAULT_TEXT_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ChangeMapper {
    pub fn is_text_source(&self, path: &str) -> bool {
        extension_of(path).is_some_and(|ext| self.text_extensions.iter().any(|t| *t == ext))
    }

    /// Changed lines per source file.
    ///
    /// Text files contribute the line ranges of their hunks. Any other file with a non-empty diff
    /// contributes the lines that reference it, as chosen by `policy`.
    pub fn changed_lines(
        &self,
        diffs: &BTreeMap<String, String>,
        graph: &IncludeGraph,
    ) -> BTreeMap<String, BTreeSet<u32>> {
        let mut out: BTreeMap<String, BTreeSet<u32>> = BTreeMap::new();
        for (path, diff) in diffs {
            if diff.trim().is_empty() {
                continue;
            }
            if self.is_text_source(path) {
                let lines = hunk::changed_lines(diff);
                if !lines.is_empty() {
                    out.entry(path.clone()).or_default().extend(lines);
                }
            } else {
                for (file, lines) in graph.referencing_lines(path, self.policy) {
                    out.entry(file).or_default().extend(lines);
                }
            }
        }
        out
    }

    /// Query `mapper` for every changed line and turn the boxes into normalized regions.
    ///
    /// A line the locator cannot place is skipped. Identical (page, box) pairs are reported once.
    pub fn map_regions(
        &self,
        lines: &BTreeMap<String, BTreeSet<u32>>,
        mapper: &dyn PageMapper,
        geometry: &PageGeometry,
    ) -> Vec<ChangedRegion> {
        let mut regions: Vec<ChangedRegion> = Vec::new();
        for (file, file_lines) in lines {
            for &line in file_lines {
                let hits = match mapper.locate(file, line) {
                    Ok(hits) => hits,
                    Err(e) => {
                        tracing::debug!(file = %file, line, error = %e, "line not located in pdf");
                        continue;
                    }
                };
                for hit in hits {
                    let region = normalize(
                        hit.page,
                        to_image_space(&hit, geometry),
                        geometry,
                        self.padding,
                    );
                    if !regions.contains(&region) {
                        regions.push(region);
                    }
                }
            }
        }
        regions
    }

    pub fn map(
        &self,
        diffs: &BTreeMap<String, String>,
        graph: &IncludeGraph,
        mapper: &dyn PageMapper,
        geometry: &PageGeometry,
    ) -> Vec<ChangedRegion> {
        self.map_regions(&self.changed_lines(diffs, graph), mapper, geometry)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/changes/mapper.rs"]
mod tests;
