use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::foundation::error::{TimelapseError, TimelapseResult};

/// Closed set of pipeline stages. The discriminant is the stage's ordinal position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StageId {
    Checkout = 0,
    ReplaceText = 1,
    Compile = 2,
    Rasterize = 3,
    Assemble = 4,
}

impl StageId {
    pub const COUNT: usize = 5;

    pub const ALL: [StageId; Self::COUNT] = [
        StageId::Checkout,
        StageId::ReplaceText,
        StageId::Compile,
        StageId::Rasterize,
        StageId::Assemble,
    ];

    pub fn ordinal(self) -> usize {
        self as usize
    }

    /// Stable identifier used as the persisted status key.
    pub fn key(self) -> &'static str {
        match self {
            StageId::Checkout => "checkout",
            StageId::ReplaceText => "replace_text",
            StageId::Compile => "compile",
            StageId::Rasterize => "rasterize",
            StageId::Assemble => "assemble",
        }
    }

    /// Human readable name used in progress output.
    pub fn label(self) -> &'static str {
        match self {
            StageId::Checkout => "Init Repository",
            StageId::ReplaceText => "Replace Text",
            StageId::Compile => "Compile LaTeX",
            StageId::Rasterize => "PDF to Image",
            StageId::Assemble => "Assemble Image",
        }
    }

    /// Accepts either the key or the label, case-insensitively.
    pub fn from_key(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|id| id.key().eq_ignore_ascii_case(s) || id.label().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for StageId {
    type Err = TimelapseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key(s).ok_or_else(|| {
            let known: Vec<&str> = Self::ALL.iter().map(|id| id.key()).collect();
            TimelapseError::validation(format!(
                "unknown stage '{s}' (expected one of: {})",
                known.join(", ")
            ))
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum StageStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl StageStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, StageStatus::Completed | StageStatus::Failed)
    }

    /// Forward-only transition rule. `None` means the stage was never attempted.
    ///
    /// `InProgress -> InProgress` is allowed so a run interrupted mid-stage can resume.
    pub fn can_advance(from: Option<StageStatus>, to: StageStatus) -> bool {
        use StageStatus::*;
        match (from, to) {
            (Some(Completed), _) => false,
            (None | Some(Pending), Pending) => true,
            (_, Pending) => false,
            (_, InProgress) => true,
            (Some(InProgress), Completed | Failed) => true,
            (_, Completed | Failed) => false,
        }
    }
}

/// Per-snapshot status, one slot per [`StageId`].
///
/// Persisted as a map from stage key to status; unknown keys are dropped on load.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(
    from = "BTreeMap<String, StageStatus>",
    into = "BTreeMap<String, StageStatus>"
)]
pub struct StatusMap {
    slots: [Option<StageStatus>; StageId::COUNT],
}

impl StatusMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, stage: StageId) -> Option<StageStatus> {
        self.slots[stage.ordinal()]
    }

    pub fn is_completed(&self, stage: StageId) -> bool {
        self.get(stage) == Some(StageStatus::Completed)
    }

    /// Move `stage` to `to`, rejecting backward transitions.
    pub fn advance(&mut self, stage: StageId, to: StageStatus) -> TimelapseResult<()> {
        let from = self.get(stage);
        if !StageStatus::can_advance(from, to) {
            return Err(TimelapseError::stage(format!(
                "illegal status transition for '{}': {from:?} -> {to:?}",
                stage.key()
            )));
        }
        self.slots[stage.ordinal()] = Some(to);
        Ok(())
    }

    /// Explicit reset back to `Pending`, the only way out of `Completed`.
    pub fn reset(&mut self, stage: StageId) {
        self.slots[stage.ordinal()] = Some(StageStatus::Pending);
    }

    pub fn iter(&self) -> impl Iterator<Item = (StageId, StageStatus)> + '_ {
        StageId::ALL
            .into_iter()
            .filter_map(|id| self.get(id).map(|s| (id, s)))
    }
}

impl From<BTreeMap<String, StageStatus>> for StatusMap {
    fn from(raw: BTreeMap<String, StageStatus>) -> Self {
        let mut map = StatusMap::default();
        for (key, status) in raw {
            match StageId::from_key(&key) {
                Some(id) => map.slots[id.ordinal()] = Some(status),
                None => tracing::warn!(key = %key, "dropping status for unknown stage"),
            }
        }
        map
    }
}

impl From<StatusMap> for BTreeMap<String, StageStatus> {
    fn from(map: StatusMap) -> Self {
        map.iter()
            .map(|(id, status)| (id.key().to_string(), status))
            .collect()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/snapshot/status.rs"]
mod tests;
