//! Worker pool: lazily-created, reused-while-idle, reaped-after-keep-alive.
//!
//! The cache itself is the same `parking_lot::Mutex<LruCache<K, V>>`
//! shape used elsewhere in this workspace for pooled resources; what's
//! particular to a worker pool is the keep-alive counter and the rule
//! that a busy worker is never evicted or reaped regardless of its age.

use std::{collections::HashMap, sync::Arc};

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::error::ServiceError;
use crate::worker::{Worker, WorkerHandle, WorkerState};

#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Max distinct worker instances held per class.
    pub max_workers_per_class: usize,
    /// Minutes of idle time a worker survives before the reaper cleans it
    /// up. `0` means "never expire automatically".
    pub default_keep_alive_minutes: u32,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            max_workers_per_class: 4,
            default_keep_alive_minutes: 0,
        }
    }
}

struct Entry {
    handle: Arc<WorkerHandle>,
    /// Minutes remaining before this worker is reaped, decremented once
    /// per reaper tick. Only decremented while the worker is idle — a
    /// busy worker's clock does not run out from under it (see the
    /// keep-alive open question: decrementing while busy would let a
    /// job's own worker vanish mid-request).
    keep_alive_remaining: u32,
    /// The keep-alive budget this worker was last dispatched with, in
    /// minutes. While `Working`/`Streaming`, a run exceeding this budget
    /// is forcibly stopped and evicted rather than left to run forever
    /// (`spec.md` §4.4's reaper policy, second clause).
    run_budget_minutes: u32,
}

/// Owns every live Worker instance for one Service process, keyed by
/// `worker_class`. One class may have more than one concurrent instance
/// up to `max_workers_per_class`, matching the original's ability to run
/// several copies of the same model for throughput.
pub struct WorkerPool {
    config: WorkerPoolConfig,
    workers: DashMap<String, Mutex<Vec<Entry>>>,
    constructors: HashMap<String, Arc<dyn Fn() -> Box<dyn Worker> + Send + Sync>>,
}

impl WorkerPool {
    pub fn new(config: WorkerPoolConfig) -> Self {
        Self {
            config,
            workers: DashMap::new(),
            constructors: HashMap::new(),
        }
    }

    /// Registers the constructor for a worker class. Mirrors the original
    /// system's static `worker_id -> class` resolution table, replacing
    /// its dynamic string-to-class import with a static closure registry
    /// decided at startup.
    pub fn register(
        &mut self,
        worker_class: impl Into<String>,
        ctor: impl Fn() -> Box<dyn Worker> + Send + Sync + 'static,
    ) {
        self.constructors.insert(worker_class.into(), Arc::new(ctor));
    }

    /// Returns an idle worker of `worker_class`, creating one if none
    /// exists and the class is under its concurrency cap.
    pub fn acquire(
        &self,
        worker_class: &str,
        keep_alive_minutes: u32,
    ) -> Result<Arc<WorkerHandle>, ServiceError> {
        let class_entry = self
            .workers
            .entry(worker_class.to_string())
            .or_insert_with(|| Mutex::new(Vec::new()));
        let mut entries = class_entry.lock();

        let effective_keep_alive = if keep_alive_minutes == 0 {
            self.config.default_keep_alive_minutes
        } else {
            keep_alive_minutes
        };

        if let Some(entry) = entries.iter_mut().find(|e| e.handle.status() == WorkerState::Idle) {
            entry.handle.set_status(WorkerState::Working);
            entry.run_budget_minutes = effective_keep_alive;
            entry.keep_alive_remaining = effective_keep_alive;
            return Ok(Arc::clone(&entry.handle));
        }

        if entries.len() >= self.config.max_workers_per_class {
            return Err(ServiceError::PoolExhausted(worker_class.to_string()));
        }

        let ctor = self
            .constructors
            .get(worker_class)
            .ok_or_else(|| ServiceError::UnknownWorkerClass(worker_class.to_string()))?;
        let handle = Arc::new(WorkerHandle::new(worker_class, ctor()));
        handle.set_status(WorkerState::Working);
        entries.push(Entry {
            handle: Arc::clone(&handle),
            run_budget_minutes: effective_keep_alive,
            keep_alive_remaining: if keep_alive_minutes == 0 {
                self.config.default_keep_alive_minutes
            } else {
                keep_alive_minutes
            },
        });
        info!(worker_class, "spawned new worker");
        Ok(handle)
    }

    /// Returns a worker to the idle pool after a request completes.
    pub fn release(&self, handle: &Arc<WorkerHandle>) {
        handle.set_status(WorkerState::Idle);
    }

    /// One reaper tick, run once per minute by the Service's background
    /// reaper task (see [`crate::reaper`]):
    ///
    /// - An idle worker whose keep-alive counter has reached zero is
    ///   evicted; the counter is only decremented while idle, per the
    ///   idle-vs-busy keep-alive open question's recommended resolution.
    /// - A worker that is `Working`/`Streaming` longer than the keep-alive
    ///   budget it was last dispatched with (in seconds) is forcibly
    ///   stopped — `cleanup()` is invoked synchronously via `block_on`
    ///   since the pool's own API is synchronous — and evicted.
    pub fn reap_tick(&self) {
        for class_entry in self.workers.iter() {
            let class = class_entry.key().clone();
            let mut entries = class_entry.value().lock();
            let before = entries.len();
            entries.retain_mut(|entry| {
                match entry.handle.status() {
                    WorkerState::Idle => {
                        if entry.keep_alive_remaining == 0 {
                            return true; // never-expire
                        }
                        entry.keep_alive_remaining -= 1;
                        entry.keep_alive_remaining > 0
                    }
                    WorkerState::Working | WorkerState::Streaming => {
                        if entry.run_budget_minutes == 0 {
                            return true; // no run-duration cap configured
                        }
                        let budget_seconds = entry.run_budget_minutes as f64 * 60.0;
                        if entry.handle.duration_seconds() > budget_seconds {
                            warn!(
                                worker_class = %class,
                                duration = entry.handle.duration_seconds(),
                                budget_seconds,
                                "forcibly stopping worker that exceeded its run budget"
                            );
                            tokio::runtime::Handle::try_current()
                                .map(|h| h.block_on(entry.handle.worker.cleanup()))
                                .ok();
                            entry.handle.set_status(WorkerState::Idle);
                            false
                        } else {
                            true
                        }
                    }
                }
            });
            if entries.len() < before {
                warn!(worker_class = %class, reaped = before - entries.len(), "reaped idle workers");
            }
        }
    }

    pub fn worker_count(&self, worker_class: &str) -> usize {
        self.workers
            .get(worker_class)
            .map(|entry| entry.value().lock().len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;

    struct EchoWorker;

    #[async_trait]
    impl Worker for EchoWorker {
        fn name(&self) -> &str {
            "echo"
        }
        async fn work(&self, data: Value) -> Result<Value, ServiceError> {
            Ok(data)
        }
    }

    fn test_pool() -> WorkerPool {
        let mut pool = WorkerPool::new(WorkerPoolConfig {
            max_workers_per_class: 2,
            default_keep_alive_minutes: 0,
        });
        pool.register("echo", || Box::new(EchoWorker));
        pool
    }

    #[test]
    fn acquire_creates_then_reuses_idle_worker() {
        let pool = test_pool();
        let first = pool.acquire("echo", 0).unwrap();
        pool.release(&first);
        let second = pool.acquire("echo", 0).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn acquire_spawns_a_second_instance_when_first_is_busy() {
        let pool = test_pool();
        let first = pool.acquire("echo", 0).unwrap();
        let second = pool.acquire("echo", 0).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(pool.worker_count("echo"), 2);
    }

    #[test]
    fn acquire_fails_past_capacity() {
        let pool = test_pool();
        let _a = pool.acquire("echo", 0).unwrap();
        let _b = pool.acquire("echo", 0).unwrap();
        assert!(matches!(pool.acquire("echo", 0), Err(ServiceError::PoolExhausted(_))));
    }

    #[test]
    fn acquire_rejects_unknown_worker_class() {
        let pool = test_pool();
        assert!(matches!(
            pool.acquire("does-not-exist", 0),
            Err(ServiceError::UnknownWorkerClass(_))
        ));
    }

    #[test]
    fn reap_tick_never_evicts_a_busy_worker() {
        let pool = test_pool();
        let _busy = pool.acquire("echo", 1).unwrap();
        pool.reap_tick();
        pool.reap_tick();
        assert_eq!(pool.worker_count("echo"), 1);
    }

    #[test]
    fn reap_tick_evicts_idle_worker_after_keep_alive_expires() {
        let pool = test_pool();
        let handle = pool.acquire("echo", 1).unwrap();
        pool.release(&handle);
        drop(handle);
        pool.reap_tick();
        assert_eq!(pool.worker_count("echo"), 0);
    }

    #[test]
    fn reacquiring_an_idle_worker_resets_its_keep_alive() {
        let pool = test_pool();
        let handle = pool.acquire("echo", 5).unwrap();
        pool.release(&handle);
        pool.reap_tick();
        pool.reap_tick();
        pool.reap_tick(); // keep_alive_remaining: 5 -> 2

        let reused = pool.acquire("echo", 5).unwrap();
        assert!(Arc::ptr_eq(&handle, &reused));
        pool.release(&reused);

        // Without resetting keep_alive_remaining on reacquire, the leftover
        // count of 2 would run out after two more ticks.
        pool.reap_tick();
        pool.reap_tick();
        pool.reap_tick();
        assert_eq!(pool.worker_count("echo"), 1);
    }
}
