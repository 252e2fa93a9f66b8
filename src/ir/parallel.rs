// ============================================================
// IR — Parallel Executor
// ============================================================
// A fixed-width rayon pool for per-question work.
//
//   Broadcast : a value wrapped once in a read-only shared handle,
//               cloned into tasks without copying the value
//   try_map   : run a task per item on the pool; results come back
//               in input order whatever the completion order, and
//               the first error wins

use std::ops::Deref;
use std::sync::Arc;

use anyhow::{Context, Result};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

/// Read-only value shared by every task
#[derive(Debug)]
pub struct Broadcast<T>(Arc<T>);

impl<T> Broadcast<T> {
    pub fn new(value: T) -> Self {
        Self(Arc::new(value))
    }

    pub fn value(&self) -> &T {
        &self.0
    }
}

impl<T> Clone for Broadcast<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> Deref for Broadcast<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

pub struct ParallelExecutor {
    pool: ThreadPool,
}

impl ParallelExecutor {
    pub fn new(n_cores: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(n_cores.max(1))
            .thread_name(|i| format!("qanta-worker-{i}"))
            .build()
            .context("Cannot start worker pool")?;
        Ok(Self { pool })
    }

    pub fn n_workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn try_map<T, R, E, F>(&self, items: &[T], task: F) -> Result<Vec<R>, E>
    where
        T: Sync,
        R: Send,
        E: Send,
        F: Fn(&T) -> Result<R, E> + Sync + Send,
    {
        self.pool.install(|| items.par_iter().map(task).collect())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_results_follow_input_order() {
        let exec  = ParallelExecutor::new(4).unwrap();
        let items: Vec<u64> = (0..32).collect();
        // later items finish first
        let out: Result<Vec<u64>, String> = exec.try_map(&items, |&i| {
            std::thread::sleep(Duration::from_millis(32 - i));
            Ok(i * 10)
        });
        assert_eq!(out.unwrap(), items.iter().map(|i| i * 10).collect::<Vec<_>>());
    }

    #[test]
    fn test_broadcast_is_shared_not_copied() {
        let exec   = ParallelExecutor::new(2).unwrap();
        let shared = Broadcast::new(vec![1, 2, 3]);
        let lens: Result<Vec<usize>, String> = exec.try_map(&[(); 8], |_| {
            let handle = shared.clone();
            Ok(handle.len())
        });
        assert_eq!(lens.unwrap(), vec![3; 8]);
        assert_eq!(Arc::strong_count(&shared.0), 1);
    }

    #[test]
    fn test_try_map_reports_error() {
        let exec = ParallelExecutor::new(3).unwrap();
        let res: Result<Vec<i32>, String> =
            exec.try_map(&[1, 2, -1, 4], |&x| if x < 0 { Err(format!("bad {x}")) } else { Ok(x) });
        assert_eq!(res.unwrap_err(), "bad -1");
        assert_eq!(exec.n_workers(), 3);
    }

    #[test]
    fn test_zero_cores_still_runs() {
        let exec = ParallelExecutor::new(0).unwrap();
        let out: Result<Vec<i32>, String> = exec.try_map(&[1, 2], |x| Ok(x + 1));
        assert_eq!(out.unwrap(), vec![2, 3]);
    }
}
