//! Rayon thread pool configuration for simulation workloads.
//!
//! Use [WorkerPool::install] to run trial batches and candidate evaluations with
//! a fixed number of threads, or rely on Rayon's default (all CPU cores).

use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::warn;

/// Configures how many worker threads are used for parallel batch execution.
#[derive(Debug, Clone, Default)]
pub struct WorkerPool {
    /// Dedicated pool; `None` means the global Rayon pool.
    pool: Option<Arc<ThreadPool>>,
}

impl WorkerPool {
    /// Use all available CPU cores (Rayon default).
    pub fn default_workers() -> Self {
        Self::default()
    }

    /// Use exactly `n` worker threads. `0` selects the global pool. If the
    /// dedicated pool cannot be built the global pool is used instead.
    pub fn with_workers(n: usize) -> Self {
        if n == 0 {
            return Self::default();
        }
        match ThreadPoolBuilder::new().num_threads(n).build() {
            Ok(pool) => Self {
                pool: Some(Arc::new(pool)),
            },
            Err(err) => {
                warn!(workers = n, error = %err, "failed to build worker pool, using global pool");
                Self::default()
            }
        }
    }

    /// Number of threads work will be spread across.
    pub fn workers(&self) -> usize {
        self.pool
            .as_ref()
            .map_or_else(rayon::current_num_threads, |pool| pool.current_num_threads())
    }

    /// Run a closure on this pool. Parallel iterators inside the closure use
    /// the pool's threads.
    pub fn install<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        match &self.pool {
            Some(pool) => pool.install(f),
            None => f(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn dedicated_pool_reports_its_size() {
        let pool = WorkerPool::with_workers(2);
        assert_eq!(pool.workers(), 2);
        let inside = pool.install(rayon::current_num_threads);
        assert_eq!(inside, 2);
    }

    #[test]
    fn install_preserves_parallel_results_order() {
        let pool = WorkerPool::with_workers(3);
        let squares: Vec<u64> = pool.install(|| (0..100u64).into_par_iter().map(|x| x * x).collect());
        assert_eq!(squares[10], 100);
        assert_eq!(squares.len(), 100);
    }
}
