use std::collections::BTreeSet;
use std::sync::Mutex;

use super::*;

#[test]
fn zero_workers_is_rejected() {
    let err = Executor::new(Some(0)).err().unwrap();
    assert!(err.is_structural());
}

#[test]
fn explicit_size_is_honored() {
    assert_eq!(Executor::new(Some(3)).unwrap().threads(), 3);
    assert!(Executor::new(None).unwrap().threads() >= 1);
}

#[test]
fn groups_are_consecutive_and_results_ordered() {
    let exec = Executor::new(Some(4)).unwrap();
    let mut items: Vec<u32> = (0..10).collect();
    let sums = exec.run_groups(&mut items, 4, |group| {
        for v in group.iter_mut() {
            *v *= 10;
        }
        group.iter().sum::<u32>()
    });
    assert_eq!(sums, vec![60, 220, 170]);
    assert_eq!(items[9], 90);
}

#[test]
fn work_runs_on_pool_threads() {
    let exec = Executor::new(Some(2)).unwrap();
    let names = Mutex::new(BTreeSet::new());
    let mut items = vec![(); 8];
    exec.run_groups(&mut items, 1, |_| {
        let name = std::thread::current().name().unwrap_or_default().to_string();
        names.lock().unwrap().insert(name);
    });
    let names = names.into_inner().unwrap();
    assert!(!names.is_empty());
    assert!(names.iter().all(|n| n.starts_with("texlapse-worker-")));
}
