use rayon::prelude::*;

use crate::foundation::error::{TimelapseError, TimelapseResult};

/// A bounded worker pool owned by one run.
pub struct Executor {
    pool: rayon::ThreadPool,
}

impl Executor {
    /// `None` sizes the pool to the available parallelism.
    pub fn new(threads: Option<usize>) -> TimelapseResult<Self> {
        Ok(Self {
            pool: build_thread_pool(threads)?,
        })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Split `items` into consecutive groups of `group_size` and run `f` on each group.
    ///
    /// Workers claim one group at a time; results come back in group order regardless of which
    /// worker finished first.
    pub fn run_groups<T, R, F>(&self, items: &mut [T], group_size: usize, f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(&mut [T]) -> R + Sync,
    {
        let group_size = group_size.max(1);
        self.pool.install(|| {
            items
                .par_chunks_mut(group_size)
                .with_max_len(1)
                .map(&f)
                .collect()
        })
    }
}

fn build_thread_pool(threads: Option<usize>) -> TimelapseResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(TimelapseError::validation("workers must be >= 1 when set"));
    }

    let mut builder =
        rayon::ThreadPoolBuilder::new().thread_name(|i| format!("texlapse-worker-{i}"));
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| TimelapseError::validation(format!("failed to build worker pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/executor.rs"]
mod tests;
