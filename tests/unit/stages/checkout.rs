use std::collections::BTreeMap;
use std::path::Path;

use chrono::{TimeZone, Utc};

use super::*;
use crate::project::paths::ProjectPaths;
use crate::vcs::CommitInfo;

/// Writes a fixed file tree per commit and serves canned diffs.
#[derive(Default)]
struct TreeVcs {
    trees: BTreeMap<String, Vec<(&'static str, &'static str)>>,
    diffs: BTreeMap<(String, String), String>,
}

impl VersionControl for TreeVcs {
    fn commits(&self, _repo: &Path) -> TimelapseResult<Vec<CommitInfo>> {
        Ok(Vec::new())
    }

    fn reset_hard(&self, work_dir: &Path, commit: &str) -> TimelapseResult<()> {
        let tree = self
            .trees
            .get(commit)
            .ok_or_else(|| TimelapseError::tool(format!("unknown revision {commit}")))?;
        for (rel, body) in tree {
            let path = work_dir.join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, body).unwrap();
        }
        Ok(())
    }

    fn diff_parent(
        &self,
        _work_dir: &Path,
        commit: &str,
        path: &str,
    ) -> TimelapseResult<Option<String>> {
        Ok(self
            .diffs
            .get(&(commit.to_string(), path.to_string()))
            .cloned())
    }
}

fn vcs() -> Arc<TreeVcs> {
    let mut v = TreeVcs::default();
    v.trees.insert(
        "c1".to_string(),
        vec![
            ("main.tex", "\\begin{document}\n\\input{intro}\n\\end{document}\n"),
            ("intro.tex", "Hello.\n"),
        ],
    );
    v.trees.insert("broken".to_string(), vec![("readme.md", "no tex")]);
    v.diffs.insert(
        ("c1".to_string(), "intro.tex".to_string()),
        "@@ -1 +1 @@\n-Hi.\n+Hello.\n".to_string(),
    );
    Arc::new(v)
}

fn snapshot(commit: &str, work_dir: &Path) -> Snapshot {
    let mut s = Snapshot::new(commit, Utc.timestamp_opt(0, 0).unwrap(), 0);
    s.set_work_dir(work_dir);
    s
}

#[test]
fn collects_main_file_includes_and_diffs() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ProjectPaths::new(dir.path().join("project"));
    let ctx = StageContext { paths: &paths };

    let mut stage = Checkout::new(vcs());
    stage.init(&Config::default()).unwrap();
    let mut snap = snapshot("c1", dir.path());
    stage.run(&mut snap, &ctx).unwrap();

    assert_eq!(snap.main_file.as_deref(), Some("main.tex"));
    assert_eq!(snap.includes, vec!["main.tex", "intro.tex"]);
    assert_eq!(snap.git_diff.keys().collect::<Vec<_>>(), vec!["intro.tex"]);

    stage.reset(&mut snap, &ctx);
    assert!(snap.includes.is_empty());
    assert!(snap.git_diff.is_empty());
    assert!(snap.main_file.is_none());
}

#[test]
fn missing_document_fails_the_stage() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ProjectPaths::new(dir.path().join("project"));
    let ctx = StageContext { paths: &paths };

    let mut stage = Checkout::new(vcs());
    stage.init(&Config::default()).unwrap();
    let mut snap = snapshot("broken", dir.path());
    let err = stage.run(&mut snap, &ctx).unwrap_err();
    assert!(!err.is_structural());
}

#[test]
fn configured_main_file_must_exist() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ProjectPaths::new(dir.path().join("project"));
    let ctx = StageContext { paths: &paths };

    let mut stage = Checkout::new(vcs());
    stage
        .init(&Config {
            main_file: Some("thesis.tex".to_string()),
            ..Config::default()
        })
        .unwrap();
    let mut snap = snapshot("c1", dir.path());
    let err = stage.run(&mut snap, &ctx).unwrap_err();
    assert!(err.to_string().contains("thesis.tex"));
}

#[test]
fn unknown_commit_fails_the_stage() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ProjectPaths::new(dir.path().join("project"));
    let ctx = StageContext { paths: &paths };

    let stage = Checkout::new(vcs());
    let mut snap = snapshot("nope", dir.path());
    assert!(stage.run(&mut snap, &ctx).is_err());
}

#[test]
fn restore_checks_the_commit_out_again_without_touching_the_record() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ProjectPaths::new(dir.path().join("project"));
    let ctx = StageContext { paths: &paths };

    let mut stage = Checkout::new(vcs());
    stage.init(&Config::default()).unwrap();
    let mut snap = snapshot("c1", dir.path());
    stage.run(&mut snap, &ctx).unwrap();
    let includes = snap.includes.clone();

    std::fs::remove_file(dir.path().join("intro.tex")).unwrap();
    std::fs::write(dir.path().join("main.tex"), "someone else's tree").unwrap();
    stage.restore(&snap, &ctx).unwrap();

    assert_eq!(
        std::fs::read_to_string(dir.path().join("intro.tex")).unwrap(),
        "Hello.\n"
    );
    assert!(
        std::fs::read_to_string(dir.path().join("main.tex"))
            .unwrap()
            .contains("\\input{intro}")
    );
    assert_eq!(snap.includes, includes);
}
