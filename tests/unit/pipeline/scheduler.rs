use std::sync::Arc;

use chrono::{TimeZone, Utc};

use super::*;

struct Fake {
    id: StageId,
    fail_on: Option<&'static str>,
    panic_on: Option<&'static str>,
    runs: Arc<AtomicUsize>,
}

impl Fake {
    fn boxed(id: StageId, runs: &Arc<AtomicUsize>) -> Box<dyn Stage> {
        Box::new(Self {
            id,
            fail_on: None,
            panic_on: None,
            runs: Arc::clone(runs),
        })
    }
}

impl Stage for Fake {
    fn id(&self) -> StageId {
        self.id
    }

    fn init(&mut self, _config: &Config) -> TimelapseResult<()> {
        Ok(())
    }

    fn run(&self, snapshot: &mut Snapshot, _ctx: &StageContext<'_>) -> TimelapseResult<()> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        snapshot.work_dir()?;
        if self.panic_on == Some(snapshot.commit()) {
            panic!("boom");
        }
        if self.fail_on == Some(snapshot.commit()) {
            return Err(TimelapseError::stage("refused"));
        }
        Ok(())
    }

    fn reset(&self, _snapshot: &mut Snapshot, _ctx: &StageContext<'_>) {}
}

fn project(dir: &std::path::Path) -> ProjectPaths {
    let paths = ProjectPaths::new(dir);
    std::fs::create_dir_all(paths.source().join(".git")).unwrap();
    std::fs::write(paths.source().join(".git/HEAD"), "ref: refs/heads/main\n").unwrap();
    paths
}

fn snapshots(commits: &[&str]) -> SnapshotSet {
    SnapshotSet::new(
        commits
            .iter()
            .enumerate()
            .map(|(i, c)| Snapshot::new(*c, Utc.timestamp_opt(i as i64, 0).unwrap(), i))
            .collect(),
    )
}

#[test]
fn first_stage_runs_unless_completed() {
    let order = [StageId::Checkout, StageId::Compile];
    let mut s = Snapshot::new("abc", Utc.timestamp_opt(0, 0).unwrap(), 0);
    assert!(can_run(&s, &order, 0));
    assert!(!can_run(&s, &order, 1));

    s.status.advance(StageId::Checkout, StageStatus::InProgress).unwrap();
    s.status.advance(StageId::Checkout, StageStatus::Completed).unwrap();
    assert!(!can_run(&s, &order, 0));
    assert!(can_run(&s, &order, 1));
    assert!(!can_run(&s, &order, 2));
}

#[test]
fn failed_predecessor_gates_later_stages() {
    let order = [StageId::Checkout, StageId::Compile];
    let mut s = Snapshot::new("abc", Utc.timestamp_opt(0, 0).unwrap(), 0);
    s.status.advance(StageId::Checkout, StageStatus::InProgress).unwrap();
    s.status.advance(StageId::Checkout, StageStatus::Failed).unwrap();
    assert!(can_run(&s, &order, 0));
    assert!(!can_run(&s, &order, 1));
}

#[test]
fn panicking_stage_is_recorded_as_failed() {
    let dir = tempfile::tempdir().unwrap();
    let paths = project(dir.path());
    let config = Config::default();
    let runs = Arc::new(AtomicUsize::new(0));
    let mut stages: Vec<Box<dyn Stage>> = vec![
        Box::new(Fake {
            id: StageId::Checkout,
            fail_on: None,
            panic_on: Some("bbbbbbbb"),
            runs: Arc::clone(&runs),
        }),
        Fake::boxed(StageId::Compile, &runs),
    ];
    let mut set = snapshots(&["aaaaaaaa", "bbbbbbbb"]);

    let scheduler = Scheduler::new(&paths, &config, Some(2)).unwrap();
    let summary = scheduler
        .run(&mut set, &mut stages, &crate::pipeline::TracingReporter)
        .unwrap();

    assert_eq!(summary.completed, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.stage_runs, 3);
    let failed = &set.snapshots()[1];
    assert_eq!(
        failed.stage_status(StageId::Checkout),
        Some(StageStatus::Failed)
    );
    assert_eq!(failed.stage_status(StageId::Compile), None);
    assert!(failed.error.as_deref().unwrap().contains("stage panicked: boom"));
}

#[test]
fn stage_errors_are_recorded_and_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let paths = project(dir.path());
    let config = Config::default();
    let runs = Arc::new(AtomicUsize::new(0));
    let mut stages: Vec<Box<dyn Stage>> = vec![
        Fake::boxed(StageId::Checkout, &runs),
        Box::new(Fake {
            id: StageId::Compile,
            fail_on: Some("aaaaaaaa"),
            panic_on: None,
            runs: Arc::clone(&runs),
        }),
    ];
    let mut set = snapshots(&["aaaaaaaa"]);

    Scheduler::new(&paths, &config, Some(1))
        .unwrap()
        .run(&mut set, &mut stages, &crate::pipeline::TracingReporter)
        .unwrap();

    let stored = SnapshotStore::new(paths.clone()).load_all().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(
        stored[0].stage_status(StageId::Compile),
        Some(StageStatus::Failed)
    );
    assert_eq!(stored[0].error.as_deref(), Some("stage error: refused"));
    assert!(!paths.workdir_root().exists());
}

#[test]
fn duplicate_stage_ids_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let paths = project(dir.path());
    let config = Config::default();
    let runs = Arc::new(AtomicUsize::new(0));
    let mut stages = vec![
        Fake::boxed(StageId::Checkout, &runs),
        Fake::boxed(StageId::Checkout, &runs),
    ];
    let mut set = snapshots(&["aaaaaaaa"]);

    let err = Scheduler::new(&paths, &config, None)
        .unwrap()
        .run(&mut set, &mut stages, &crate::pipeline::TracingReporter)
        .unwrap_err();
    assert!(err.to_string().contains("more than once"));
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[test]
fn missing_source_repository_aborts_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ProjectPaths::new(dir.path());
    let config = Config::default();
    let runs = Arc::new(AtomicUsize::new(0));
    let mut stages = vec![Fake::boxed(StageId::Checkout, &runs)];
    let mut set = snapshots(&["aaaaaaaa", "bbbbbbbb"]);

    let err = Scheduler::new(&paths, &config, Some(1))
        .unwrap()
        .run(&mut set, &mut stages, &crate::pipeline::TracingReporter)
        .unwrap_err();
    assert!(err.is_structural());
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[test]
fn panic_payloads_are_readable() {
    let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
    let borrowed: Box<dyn Any + Send> = Box::new("static");
    let other: Box<dyn Any + Send> = Box::new(7_u8);
    assert_eq!(panic_message(owned.as_ref()), "owned");
    assert_eq!(panic_message(borrowed.as_ref()), "static");
    assert_eq!(panic_message(other.as_ref()), "unknown panic");
}

#[test]
fn unwritable_records_abort_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let paths = project(dir.path());
    std::fs::write(paths.records_dir(), "not a directory").unwrap();
    let config = Config::default();
    let runs = Arc::new(AtomicUsize::new(0));
    let mut stages = vec![
        Fake::boxed(StageId::Checkout, &runs),
        Fake::boxed(StageId::Compile, &runs),
    ];
    let mut set = snapshots(&["aaaaaaaa", "bbbbbbbb"]);

    let err = Scheduler::new(&paths, &config, Some(1))
        .unwrap()
        .run(&mut set, &mut stages, &crate::pipeline::TracingReporter)
        .unwrap_err();
    assert!(err.is_structural());
    assert!(err.to_string().contains("cannot persist snapshot"));
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(!paths.workdir_root().exists());
}
