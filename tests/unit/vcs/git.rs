use super::*;

#[test]
fn log_lines_become_commits_in_order() {
    let out = "1111111111111111111111111111111111111111 1700000000\n\
               2222222222222222222222222222222222222222 1700003600\n\n";
    let commits = parse_log(out).unwrap();
    assert_eq!(commits.len(), 2);
    assert_eq!(commits[0].hash, "1111111111111111111111111111111111111111");
    assert_eq!(commits[1].authored.timestamp(), 1_700_003_600);
}

#[test]
fn malformed_log_is_a_tool_error() {
    let err = parse_log("deadbeef\n").unwrap_err();
    assert!(matches!(err, TimelapseError::Tool(_)));
    assert!(parse_log("deadbeef soon\n").is_err());
}

fn git(dir: &Path, args: &[&str]) {
    let status = std::process::Command::new("git")
        .args(["-c", "commit.gpgsign=false"])
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_NAME", "t")
        .env("GIT_AUTHOR_EMAIL", "t@example.com")
        .env("GIT_COMMITTER_NAME", "t")
        .env("GIT_COMMITTER_EMAIL", "t@example.com")
        .status()
        .unwrap();
    assert!(status.success(), "git {args:?} failed");
}

#[test]
fn diff_parent_against_real_repo() {
    if !GitCli::is_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    git(root, &["init", "--quiet"]);
    std::fs::write(root.join("main.tex"), "a\nb\nc\n").unwrap();
    git(root, &["add", "."]);
    git(root, &["commit", "--quiet", "-m", "one"]);
    std::fs::write(root.join("main.tex"), "a\nB\nc\n").unwrap();
    git(root, &["commit", "--quiet", "-am", "two"]);

    let vcs = GitCli;
    let commits = vcs.commits(root).unwrap();
    assert_eq!(commits.len(), 2);

    assert_eq!(
        vcs.diff_parent(root, &commits[0].hash, "main.tex").unwrap(),
        None
    );
    let diff = vcs
        .diff_parent(root, &commits[1].hash, "main.tex")
        .unwrap()
        .unwrap();
    assert!(diff.contains("@@ -2 +2 @@"));

    vcs.reset_hard(root, &commits[0].hash).unwrap();
    assert_eq!(std::fs::read_to_string(root.join("main.tex")).unwrap(), "a\nb\nc\n");
}
