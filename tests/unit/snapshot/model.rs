use super::*;
use chrono::TimeZone;

fn snap() -> Snapshot {
    let date = Utc.with_ymd_and_hms(2023, 5, 1, 12, 0, 0).unwrap();
    Snapshot::new("0123456789abcdef0123456789abcdef01234567", date, 3)
}

#[test]
fn pipeline_state_reports_failure_before_incompleteness() {
    let mut s = snap();
    let stages = [StageId::Checkout, StageId::Compile];
    assert_eq!(s.state(&stages), PipelineState::Incomplete);

    s.status
        .advance(StageId::Checkout, StageStatus::InProgress)
        .unwrap();
    s.status
        .advance(StageId::Checkout, StageStatus::Failed)
        .unwrap();
    assert_eq!(s.state(&stages), PipelineState::Failed);
}

#[test]
fn pipeline_state_completed_only_when_every_stage_is() {
    let mut s = snap();
    for stage in [StageId::Checkout, StageId::Compile] {
        s.status.advance(stage, StageStatus::InProgress).unwrap();
        s.status.advance(stage, StageStatus::Completed).unwrap();
    }
    assert_eq!(
        s.state(&[StageId::Checkout, StageId::Compile]),
        PipelineState::Completed
    );
    assert_eq!(
        s.state(&[StageId::Checkout, StageId::Compile, StageId::Assemble]),
        PipelineState::Incomplete
    );
}

#[test]
fn work_dir_is_not_persisted() {
    let mut s = snap();
    s.set_work_dir("/tmp/slot-0");
    s.main_file = Some("thesis/main.tex".to_string());

    let json = serde_json::to_string(&s).unwrap();
    assert!(!json.contains("slot-0"));

    let back: Snapshot = serde_json::from_str(&json).unwrap();
    assert!(back.work_dir().is_err());
    assert_eq!(back.commit(), s.commit());
    assert_eq!(back.pdf_file().unwrap(), Path::new("thesis/main.pdf"));
}

#[test]
fn sparse_records_load_with_defaults() {
    let json = r#"{
        "commit": "abc",
        "commit_date": "2023-05-01T12:00:00Z",
        "index": 0
    }"#;
    let s: Snapshot = serde_json::from_str(json).unwrap();
    assert_eq!(s.short_commit(), "abc");
    assert!(s.status.iter().next().is_none());
    assert!(s.main_file().is_err());
}

#[test]
fn region_to_pixels_clamps_to_image() {
    let r = ChangedRegion {
        page: 1,
        x: 0.9,
        y: -0.1,
        width: 0.5,
        height: 0.5,
    };
    let (left, top, w, h) = r.to_pixels(100, 200);
    assert_eq!((left, top), (90, 0));
    assert_eq!(w, 10);
    assert_eq!(h, 80);
}
