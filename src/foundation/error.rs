pub type TimelapseResult<T> = Result<T, TimelapseError>;

#[derive(thiserror::Error, Debug)]
pub enum TimelapseError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error("stage error: {0}")]
    Stage(String),

    #[error("tool error: {0}")]
    Tool(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TimelapseError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn snapshot(msg: impl Into<String>) -> Self {
        Self::Snapshot(msg.into())
    }

    pub fn stage(msg: impl Into<String>) -> Self {
        Self::Stage(msg.into())
    }

    pub fn tool(msg: impl Into<String>) -> Self {
        Self::Tool(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Structural errors abort a run; everything else is recorded per snapshot.
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Snapshot(_))
    }
}

impl From<std::io::Error> for TimelapseError {
    fn from(e: std::io::Error) -> Self {
        Self::Other(anyhow::Error::new(e))
    }
}

impl From<serde_json::Error> for TimelapseError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
