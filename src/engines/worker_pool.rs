use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use rayon::prelude::*;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::EvoError;
use crate::types::ExecutorMode;

/// Shared handle lent to the population evaluator.
pub type PoolHandle = Arc<WorkerPool>;

/// Bounded concurrency resource used to fan fitness evaluation out.
///
/// In `Thread` mode tasks borrow the submitted items directly. In `Process`
/// mode every item and every result crosses the worker boundary as a
/// serialized copy, so tasks never share state with the caller.
///
/// Each call to [`map`](WorkerPool::map) joins all of its tasks before
/// returning; there is no partial-result path.
pub struct WorkerPool {
    mode: ExecutorMode,
    max_workers: Option<usize>,
    pool: RwLock<Option<rayon::ThreadPool>>,
}

impl WorkerPool {
    pub fn new(mode: ExecutorMode, max_workers: Option<usize>) -> Result<Self, EvoError> {
        if max_workers == Some(0) {
            return Err(EvoError::Configuration(
                "max_workers must be positive when set".to_string(),
            ));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(max_workers.unwrap_or(0))
            .thread_name(move |index| format!("evorun-{}-{}", mode, index))
            .build()
            .map_err(|e| EvoError::Configuration(format!("Failed to build worker pool: {}", e)))?;

        log::debug!(
            "Started {} worker pool with {} workers",
            mode,
            pool.current_num_threads()
        );

        Ok(Self {
            mode,
            max_workers,
            pool: RwLock::new(Some(pool)),
        })
    }

    /// Builds a pool from a textual mode, as found in configuration.
    pub fn from_name(mode: &str, max_workers: Option<usize>) -> Result<Self, EvoError> {
        Self::new(mode.parse()?, max_workers)
    }

    pub fn mode(&self) -> ExecutorMode {
        self.mode
    }

    pub fn max_workers(&self) -> Option<usize> {
        self.max_workers
    }

    /// Live worker count, or `None` once shut down.
    pub fn worker_count(&self) -> Option<usize> {
        self.pool
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(rayon::ThreadPool::current_num_threads)
    }

    pub fn is_shut_down(&self) -> bool {
        self.pool
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    pub fn lend(self: &Arc<Self>) -> PoolHandle {
        Arc::clone(self)
    }

    /// Runs `task` once per item on the pool and waits for all of them.
    ///
    /// Results keep the order of `items`. The first failing task fails the call.
    pub fn map<T, R, F>(&self, items: &[T], task: F) -> Result<Vec<R>, EvoError>
    where
        T: Serialize + DeserializeOwned + Sync,
        R: Serialize + DeserializeOwned + Send,
        F: Fn(&T) -> anyhow::Result<R> + Sync + Send,
    {
        let guard = self.pool.read().unwrap_or_else(PoisonError::into_inner);
        let pool = guard.as_ref().ok_or(EvoError::PoolShutDown)?;

        match self.mode {
            ExecutorMode::Thread => pool.install(|| {
                items
                    .par_iter()
                    .map(|item| task(item).map_err(EvoError::from))
                    .collect()
            }),
            ExecutorMode::Process => {
                let payloads = items
                    .iter()
                    .map(serde_json::to_string)
                    .collect::<Result<Vec<_>, _>>()?;
                let replies: Vec<String> = pool.install(|| {
                    payloads
                        .par_iter()
                        .map(|payload| -> Result<String, EvoError> {
                            let copy: T = serde_json::from_str(payload)?;
                            let reply = task(&copy)?;
                            Ok(serde_json::to_string(&reply)?)
                        })
                        .collect::<Result<Vec<_>, _>>()
                })?;
                replies
                    .iter()
                    .map(|reply| serde_json::from_str(reply).map_err(EvoError::from))
                    .collect()
            }
        }
    }

    /// Stops accepting work and waits for in-flight calls to drain.
    /// Calling it again has no effect.
    pub fn shutdown(&self) {
        let mut guard = self.pool.write().unwrap_or_else(PoisonError::into_inner);
        match guard.take() {
            Some(_) => log::debug!("Worker pool ({}) shut down", self.mode),
            None => log::debug!("Worker pool ({}) already shut down", self.mode),
        }
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("mode", &self.mode)
            .field("max_workers", &self.max_workers)
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_mode_keeps_order() {
        let pool = WorkerPool::new(ExecutorMode::Thread, Some(2)).unwrap();
        let squares = pool.map(&[1u32, 2, 3, 4], |x| Ok(x * x)).unwrap();
        assert_eq!(squares, vec![1, 4, 9, 16]);
    }

    #[test]
    fn test_process_mode_works_on_copies() {
        let pool = WorkerPool::new(ExecutorMode::Process, Some(2)).unwrap();
        let items = vec![vec![1.0, 2.0], vec![3.0]];
        let sums: Vec<f64> = pool.map(&items, |v| Ok(v.iter().sum())).unwrap();
        assert_eq!(sums, vec![3.0, 3.0]);
    }

    #[test]
    fn test_worker_bound_is_honoured() {
        let pool = WorkerPool::new(ExecutorMode::Thread, Some(3)).unwrap();
        assert_eq!(pool.worker_count(), Some(3));
        assert_eq!(pool.max_workers(), Some(3));
    }

    #[test]
    fn test_rejects_bad_configuration() {
        assert!(WorkerPool::new(ExecutorMode::Thread, Some(0)).is_err());
        assert!(matches!(
            WorkerPool::from_name("fork", None),
            Err(EvoError::Configuration(_))
        ));
    }

    #[test]
    fn test_task_failure_fails_the_call() {
        let pool = WorkerPool::new(ExecutorMode::Thread, Some(2)).unwrap();
        let result = pool.map(&[1, 2, 3], |x: &i32| {
            if *x == 2 {
                anyhow::bail!("cannot evaluate {}", x);
            }
            Ok(*x)
        });
        assert!(matches!(result, Err(EvoError::Collaborator(_))));
    }

    #[test]
    fn test_shutdown_is_idempotent_and_final() {
        let pool = Arc::new(WorkerPool::new(ExecutorMode::Thread, None).unwrap());
        let handle = pool.lend();

        pool.shutdown();
        pool.shutdown();

        assert!(handle.is_shut_down());
        assert_eq!(handle.worker_count(), None);
        assert!(matches!(handle.map(&[1], |x| Ok(*x)), Err(EvoError::PoolShutDown)));
    }
}
