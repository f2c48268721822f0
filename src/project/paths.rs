use std::path::{Path, PathBuf};

/// On-disk layout of one project directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectPaths {
    root: PathBuf,
}

impl ProjectPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn project_file(&self) -> PathBuf {
        self.root.join("project.json")
    }

    /// The imported repository. Never checked out by the pipeline.
    pub fn source(&self) -> PathBuf {
        self.root.join("source")
    }

    pub fn snapshots_file(&self) -> PathBuf {
        self.root.join("snapshots.json")
    }

    pub fn records_dir(&self) -> PathBuf {
        self.root.join("records")
    }

    pub fn record(&self, commit: &str) -> PathBuf {
        self.records_dir().join(format!("{commit}.json"))
    }

    pub fn workdir_root(&self) -> PathBuf {
        self.root.join("workdir")
    }

    pub fn images_dir(&self, commit: &str) -> PathBuf {
        self.root.join("images").join(commit)
    }

    pub fn frames_dir(&self) -> PathBuf {
        self.root.join("frames")
    }

    pub fn frame(&self, index: usize) -> PathBuf {
        self.frames_dir().join(format!("frame_{index:06}.png"))
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join("output")
    }

    pub fn output_file(&self, name: &str) -> PathBuf {
        let file = if name.ends_with(".mp4") {
            name.to_string()
        } else {
            format!("{name}.mp4")
        };
        self.output_dir().join(file)
    }
}
