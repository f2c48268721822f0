use std::any::Any;
use std::collections::BTreeSet;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::foundation::error::{TimelapseError, TimelapseResult};
use crate::pipeline::concat::attempt_order;
use crate::pipeline::executor::Executor;
use crate::pipeline::reporter::Reporter;
use crate::pipeline::workdir::WorkDirPool;
use crate::project::config::Config;
use crate::project::paths::ProjectPaths;
use crate::project::store::SnapshotStore;
use crate::snapshot::{PipelineState, Snapshot, SnapshotSet, StageId, StageStatus};
use crate::stages::{Stage, StageContext};

/// Outcome counts of one scheduler run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Snapshots the run was responsible for.
    pub scheduled: usize,
    /// Stage invocations performed.
    pub stage_runs: usize,
    /// Skipped commits attempted because their group's kept commit failed.
    pub fallbacks: usize,
    pub completed: usize,
    pub failed: usize,
    /// Neither completed nor failed, e.g. commits skipped by concatenation.
    pub pending: usize,
}

/// Gate rule: stage `index` may run iff it has not completed and its predecessor has.
pub fn can_run(snapshot: &Snapshot, order: &[StageId], index: usize) -> bool {
    let Some(&stage) = order.get(index) else {
        return false;
    };
    if snapshot.status.is_completed(stage) {
        return false;
    }
    match index.checked_sub(1) {
        None => true,
        Some(prev) => snapshot.status.is_completed(order[prev]),
    }
}

/// Per-run state shared by all workers.
struct RunContext<'r> {
    stages: &'r [Box<dyn Stage>],
    order: Vec<StageId>,
    pool: &'r WorkDirPool,
    reporter: &'r dyn Reporter,
    stage_runs: AtomicUsize,
    abort: AtomicBool,
}

/// Drives an ordered stage list across a project's snapshots.
pub struct Scheduler<'a> {
    paths: &'a ProjectPaths,
    config: &'a Config,
    executor: Executor,
    store: SnapshotStore,
}

impl<'a> Scheduler<'a> {
    /// `workers` overrides the configured pool size for this run.
    pub fn new(
        paths: &'a ProjectPaths,
        config: &'a Config,
        workers: Option<usize>,
    ) -> TimelapseResult<Self> {
        config.validate()?;
        Ok(Self {
            paths,
            config,
            executor: Executor::new(workers.or(config.workers))?,
            store: SnapshotStore::new(paths.clone()),
        })
    }

    pub fn workers(&self) -> usize {
        self.executor.threads()
    }

    /// Run every eligible stage for every schedulable snapshot.
    ///
    /// Stage failures are recorded on the snapshot. Only structural problems (bad configuration,
    /// duplicated snapshots, an unusable source repository) are returned as errors.
    pub fn run(
        &self,
        set: &mut SnapshotSet,
        stages: &mut [Box<dyn Stage>],
        reporter: &dyn Reporter,
    ) -> TimelapseResult<RunSummary> {
        self.prepare(set, stages)?;

        let factor = self.config.concat_factor();
        let fallback_attempts = self.config.fallback_attempts();
        let pool = WorkDirPool::new(self.paths.workdir_root(), &self.paths.source());
        let rc = RunContext {
            stages: &*stages,
            order: stages.iter().map(|s| s.id()).collect(),
            pool: &pool,
            reporter,
            stage_runs: AtomicUsize::new(0),
            abort: AtomicBool::new(false),
        };

        let outcomes = {
            let mut scheduled = set.schedulable_mut();
            let groups = scheduled.len().div_ceil(factor);
            tracing::info!(
                snapshots = scheduled.len(),
                groups,
                workers = self.executor.threads(),
                "compiling snapshots"
            );
            reporter.set_stage("Compiling snapshots", groups);
            self.executor.run_groups(&mut scheduled, factor, |group| {
                self.run_group(group, fallback_attempts, &rc)
            })
        };

        let mut fallbacks = 0;
        let mut first_error = None;
        for outcome in outcomes {
            match outcome {
                Ok(n) => fallbacks += n,
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        self.finish(rc.stages, &pool);
        let saved = self.store.save_all(set.snapshots());
        if let Some(e) = first_error {
            if let Err(save_error) = saved {
                tracing::warn!(error = %save_error, "failed to save the snapshot list");
            }
            return Err(e);
        }
        saved?;

        let commits: Vec<&Snapshot> = set
            .snapshots()
            .iter()
            .filter(|s| !set.is_orphaned(s.commit()))
            .collect();
        let summary = summarize(&commits, &rc, fallbacks);
        tracing::info!(
            completed = summary.completed,
            failed = summary.failed,
            pending = summary.pending,
            stage_runs = summary.stage_runs,
            "run finished"
        );
        Ok(summary)
    }

    /// Re-run the pipeline for a single commit, without concatenation.
    pub fn run_snapshot(
        &self,
        set: &mut SnapshotSet,
        commit: &str,
        stages: &mut [Box<dyn Stage>],
        reporter: &dyn Reporter,
    ) -> TimelapseResult<RunSummary> {
        self.prepare(set, stages)?;
        let pos = set.position(commit)?;

        let pool = WorkDirPool::new(self.paths.workdir_root(), &self.paths.source());
        let rc = RunContext {
            stages: &*stages,
            order: stages.iter().map(|s| s.id()).collect(),
            pool: &pool,
            reporter,
            stage_runs: AtomicUsize::new(0),
            abort: AtomicBool::new(false),
        };

        let snapshot = &mut set.snapshots_mut()[pos];
        reporter.set_stage(&format!("Compiling snapshot {}", snapshot.short_commit()), 1);
        let result = self.run_pipeline(snapshot, &rc);
        reporter.add_progress(snapshot);

        self.finish(rc.stages, &pool);
        result?;
        self.store.save_all(set.snapshots())?;
        Ok(summarize(&[&set.snapshots()[pos]], &rc, 0))
    }

    fn prepare(&self, set: &SnapshotSet, stages: &mut [Box<dyn Stage>]) -> TimelapseResult<()> {
        self.config.validate()?;
        if stages.is_empty() {
            return Err(TimelapseError::validation("no stages to run"));
        }

        let mut ids = BTreeSet::new();
        for stage in stages.iter() {
            if !ids.insert(stage.id()) {
                return Err(TimelapseError::validation(format!(
                    "stage '{}' is listed more than once",
                    stage.name()
                )));
            }
        }

        let mut commits = BTreeSet::new();
        for s in set.snapshots() {
            if !commits.insert(s.commit()) {
                return Err(TimelapseError::snapshot(format!(
                    "snapshot {} found multiple times",
                    s.commit()
                )));
            }
        }

        for stage in stages.iter_mut() {
            stage.init(self.config)?;
        }
        Ok(())
    }

    fn finish(&self, stages: &[Box<dyn Stage>], pool: &WorkDirPool) {
        for stage in stages {
            stage.cleanup();
        }
        if let Err(e) = pool.remove_all() {
            tracing::warn!(error = %e, "failed to remove working directories");
        }
    }

    /// Kept commit first, then fallbacks until one completes. Returns the number of fallbacks.
    fn run_group(
        &self,
        group: &mut [&mut Snapshot],
        fallback_attempts: usize,
        rc: &RunContext<'_>,
    ) -> TimelapseResult<usize> {
        if rc.abort.load(Ordering::Relaxed) {
            return Ok(0);
        }

        let mut fallbacks = 0;
        for (n, pos) in attempt_order(group.len(), fallback_attempts)
            .into_iter()
            .enumerate()
        {
            let snapshot = &mut *group[pos];
            if n > 0 {
                fallbacks += 1;
                tracing::info!(commit = %snapshot.short_commit(), "falling back to skipped commit");
            }
            let state = match self.run_pipeline(snapshot, rc) {
                Ok(state) => state,
                Err(e) => {
                    rc.abort.store(true, Ordering::Relaxed);
                    return Err(e);
                }
            };
            if state != PipelineState::Failed {
                break;
            }
        }

        if let Some(kept) = group.last() {
            rc.reporter.add_progress(kept);
        }
        Ok(fallbacks)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(commit = %snapshot.short_commit()))]
    fn run_pipeline(
        &self,
        snapshot: &mut Snapshot,
        rc: &RunContext<'_>,
    ) -> TimelapseResult<PipelineState> {
        let ctx = StageContext { paths: self.paths };
        let mut lease = None;

        for (i, stage) in rc.stages.iter().enumerate() {
            if !can_run(snapshot, &rc.order, i) {
                continue;
            }
            // A leased directory holds nothing of this snapshot yet, so stages completed in an
            // earlier run rebuild their output before the first one that reads the tree.
            let mut restore = &rc.stages[..0];
            if lease.is_none() {
                let acquired = rc.pool.acquire().map_err(|e| {
                    TimelapseError::validation(format!("cannot prepare a working directory: {e}"))
                })?;
                snapshot.set_work_dir(acquired.path());
                lease = Some(acquired);
                if stage.uses_work_dir() {
                    restore = &rc.stages[..i];
                }
            }
            self.attempt(snapshot, stage.as_ref(), restore, &ctx, rc)?;
        }

        snapshot.clear_work_dir();
        drop(lease);
        Ok(snapshot.state(&rc.order))
    }

    fn attempt(
        &self,
        snapshot: &mut Snapshot,
        stage: &dyn Stage,
        restore: &[Box<dyn Stage>],
        ctx: &StageContext<'_>,
        rc: &RunContext<'_>,
    ) -> TimelapseResult<()> {
        let id = stage.id();
        snapshot.error = None;
        snapshot.status.advance(id, StageStatus::InProgress)?;
        rc.reporter.update_progress(snapshot);
        rc.stage_runs.fetch_add(1, Ordering::Relaxed);

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            restore_work_dir(restore, snapshot, ctx)?;
            stage.run(snapshot, ctx)
        }));
        let error = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(panic) => Some(format!("stage panicked: {}", panic_message(panic.as_ref()))),
        };

        match error {
            None => snapshot.status.advance(id, StageStatus::Completed)?,
            Some(message) => {
                snapshot.status.advance(id, StageStatus::Failed)?;
                rc.reporter.log(
                    &format!("Stage \"{}\" failed: {message}", stage.name()),
                    Some(snapshot),
                );
                snapshot.error = Some(message);
            }
        }
        rc.reporter.update_progress(snapshot);

        self.store.save(snapshot).map_err(|e| {
            TimelapseError::validation(format!(
                "cannot persist snapshot {}: {e}",
                snapshot.short_commit()
            ))
        })
    }
}

/// Replay the working-directory effects of the completed stages in `done`.
fn restore_work_dir(
    done: &[Box<dyn Stage>],
    snapshot: &Snapshot,
    ctx: &StageContext<'_>,
) -> TimelapseResult<()> {
    let mut restored = 0;
    for stage in done {
        if !snapshot.status.is_completed(stage.id()) {
            continue;
        }
        stage.restore(snapshot, ctx).map_err(|e| {
            TimelapseError::stage(format!(
                "cannot restore the output of \"{}\": {e}",
                stage.name()
            ))
        })?;
        restored += 1;
    }
    if restored > 0 {
        tracing::debug!(commit = %snapshot.short_commit(), stages = restored, "restored working directory");
    }
    Ok(())
}

fn summarize(snapshots: &[&Snapshot], rc: &RunContext<'_>, fallbacks: usize) -> RunSummary {
    let mut summary = RunSummary {
        scheduled: snapshots.len(),
        stage_runs: rc.stage_runs.load(Ordering::Relaxed),
        fallbacks,
        ..RunSummary::default()
    };
    for s in snapshots {
        match s.state(&rc.order) {
            PipelineState::Completed => summary.completed += 1,
            PipelineState::Failed => summary.failed += 1,
            PipelineState::Incomplete => summary.pending += 1,
        }
    }
    summary
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/scheduler.rs"]
mod tests;
