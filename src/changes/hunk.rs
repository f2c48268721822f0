use std::collections::BTreeSet;
use std::ops::RangeInclusive;
use std::sync::LazyLock;

use regex::Regex;

// `@@ -33,5 +55,4 @@`: removed start/count, added start/count. Counts are optional.
static RE_HUNK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@@\s+-(\d+)(?:,(\S*))?\s+\+(\d+)(?:,(\S*))?\s+@@").expect("valid hunk regex")
});

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HunkHeader {
    pub old_start: u32,
    pub old_count: u32,
    pub new_start: u32,
    pub new_count: u32,
}

impl HunkHeader {
    /// `[old_start, old_start + old_count]`, one line wider than the hunk on purpose.
    pub fn old_lines(&self) -> RangeInclusive<u32> {
        self.old_start..=self.old_start.saturating_add(self.old_count)
    }

    pub fn new_lines(&self) -> RangeInclusive<u32> {
        self.new_start..=self.new_start.saturating_add(self.new_count)
    }
}

/// Every hunk header in a unified diff. A missing or non-numeric count is treated as zero.
pub fn parse_hunks(diff: &str) -> Vec<HunkHeader> {
    RE_HUNK
        .captures_iter(diff)
        .filter_map(|cap| {
            let count = |i: usize| {
                cap.get(i)
                    .and_then(|m| m.as_str().parse::<u32>().ok())
                    .unwrap_or(0)
            };
            Some(HunkHeader {
                old_start: cap[1].parse().ok()?,
                old_count: count(2),
                new_start: cap[3].parse().ok()?,
                new_count: count(4),
            })
        })
        .collect()
}

/// Union of the old and new line ranges of every hunk.
pub fn changed_lines(diff: &str) -> BTreeSet<u32> {
    let mut lines = BTreeSet::new();
    for hunk in parse_hunks(diff) {
        lines.extend(hunk.old_lines());
        lines.extend(hunk.new_lines());
    }
    lines
}

#[cfg(test)]
#[path = "../../tests/unit/changes/hunk.rs"]
mod tests;
