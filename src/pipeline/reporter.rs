use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};

use crate::snapshot::Snapshot;

/// Sink for user-facing progress. Called from worker threads.
pub trait Reporter: Sync {
    /// A new phase begins with `total` units of work.
    fn set_stage(&self, name: &str, total: usize);

    /// One snapshot finished its attempt.
    fn add_progress(&self, snapshot: &Snapshot);

    /// A snapshot's status changed.
    fn update_progress(&self, snapshot: &Snapshot);

    /// Absolute progress of the current phase, `0.0..=1.0`.
    fn set_progress(&self, fraction: f64);

    fn log(&self, message: &str, snapshot: Option<&Snapshot>);
}

/// Forwards everything to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn set_stage(&self, name: &str, total: usize) {
        tracing::info!(stage = name, total, "stage started");
    }

    fn add_progress(&self, snapshot: &Snapshot) {
        tracing::debug!(commit = %snapshot.short_commit(), "snapshot done");
    }

    fn update_progress(&self, snapshot: &Snapshot) {
        tracing::trace!(commit = %snapshot.short_commit(), status = ?snapshot.status, "status changed");
    }

    fn set_progress(&self, fraction: f64) {
        tracing::trace!(progress = fraction, "progress");
    }

    fn log(&self, message: &str, snapshot: Option<&Snapshot>) {
        match snapshot {
            Some(s) => tracing::warn!(commit = %s.short_commit(), "{message}"),
            None => tracing::info!("{message}"),
        }
    }
}

const BAR_LEN: u64 = 1000;

/// A progress bar on stderr, one bar per stage.
#[derive(Default)]
pub struct TerminalReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl TerminalReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        let guard = self.bar.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(bar) = guard.as_ref() {
            f(bar);
        }
    }

    pub fn finish(&self) {
        let mut guard = self.bar.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(bar) = guard.take() {
            bar.finish();
        }
    }
}

impl Reporter for TerminalReporter {
    fn set_stage(&self, name: &str, total: usize) {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );
        bar.set_message(name.to_string());

        let mut guard = self.bar.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = guard.replace(bar) {
            previous.finish();
        }
    }

    fn add_progress(&self, _snapshot: &Snapshot) {
        self.with_bar(|bar| bar.inc(1));
    }

    fn update_progress(&self, _snapshot: &Snapshot) {
        self.with_bar(|bar| bar.tick());
    }

    fn set_progress(&self, fraction: f64) {
        self.with_bar(|bar| {
            if bar.length() != Some(BAR_LEN) {
                bar.set_length(BAR_LEN);
            }
            bar.set_position((fraction.clamp(0.0, 1.0) * BAR_LEN as f64).round() as u64);
        });
    }

    fn log(&self, message: &str, snapshot: Option<&Snapshot>) {
        let line = match snapshot {
            Some(s) => format!("[{}] {message}", s.short_commit()),
            None => message.to_string(),
        };
        let guard = self.bar.lock().unwrap_or_else(|e| e.into_inner());
        match guard.as_ref() {
            Some(bar) => bar.println(line),
            None => eprintln!("{line}"),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/reporter.rs"]
mod tests;
