use super::*;

fn fake_repo(root: &Path) -> PathBuf {
    let repo = root.join("source");
    std::fs::create_dir_all(repo.join(".git/refs/heads")).unwrap();
    std::fs::write(repo.join(".git/HEAD"), "ref: refs/heads/main\n").unwrap();
    std::fs::write(repo.join(".git/refs/heads/main"), "abc\n").unwrap();
    repo
}

#[test]
fn slots_are_seeded_with_a_git_copy() {
    let dir = tempfile::tempdir().unwrap();
    let repo = fake_repo(dir.path());
    let pool = WorkDirPool::new(dir.path().join("workdir"), &repo);

    let lease = pool.acquire().unwrap();
    assert_eq!(lease.path(), dir.path().join("workdir/0"));
    assert_eq!(
        std::fs::read_to_string(lease.path().join(".git/refs/heads/main")).unwrap(),
        "abc\n"
    );
}

#[test]
fn released_slots_are_reused() {
    let dir = tempfile::tempdir().unwrap();
    let repo = fake_repo(dir.path());
    let pool = WorkDirPool::new(dir.path().join("workdir"), &repo);

    let first = pool.acquire().unwrap().path().to_path_buf();
    let a = pool.acquire().unwrap();
    assert_eq!(a.path(), first);
    let b = pool.acquire().unwrap();
    assert_ne!(a.path(), b.path());
    drop(a);
    drop(b);

    assert_eq!(
        pool.stats(),
        WorkDirPoolStats {
            created: 2,
            leases: 3,
        }
    );

    pool.remove_all().unwrap();
    assert!(!dir.path().join("workdir").exists());
}

#[test]
fn concurrent_leases_never_share_a_slot() {
    let dir = tempfile::tempdir().unwrap();
    let repo = fake_repo(dir.path());
    let pool = WorkDirPool::new(dir.path().join("workdir"), &repo);

    let leases: Vec<_> = (0..4).map(|_| pool.acquire().unwrap()).collect();
    let mut paths: Vec<_> = leases.iter().map(|l| l.path().to_path_buf()).collect();
    paths.sort();
    paths.dedup();
    assert_eq!(paths.len(), 4);
}

#[test]
fn missing_source_repository_fails() {
    let dir = tempfile::tempdir().unwrap();
    let pool = WorkDirPool::new(dir.path().join("workdir"), &dir.path().join("nope"));
    assert!(pool.acquire().is_err());
}

#[test]
fn failed_seeding_leaves_no_slot_behind() {
    let dir = tempfile::tempdir().unwrap();
    let pool = WorkDirPool::new(dir.path().join("workdir"), &dir.path().join("nope"));

    assert!(pool.acquire().is_err());
    assert!(!dir.path().join("workdir/0").exists());
    assert_eq!(pool.stats().created, 0);
    assert_eq!(pool.stats().leases, 1);

    let repo = fake_repo(dir.path());
    let pool = WorkDirPool::new(dir.path().join("workdir"), &repo);
    assert!(pool.acquire().is_ok());
    assert_eq!(pool.stats().created, 1);
}
