// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The ambient numeric-backend thread count as a scoped resource.
//!
//! Benchmarking a strategy at a requested thread count must never leak that
//! count into the next strategy. [`ThreadBudget::acquire`] hands out a
//! [`ThreadGuard`]; dropping the guard restores the previous value on every
//! exit path, including `?` returns and panics that unwind.
//!
//! Forward passes run through [`ThreadBudget::install`], which executes them
//! on a rayon pool with exactly [`current`](ThreadBudget::current) threads.
//! Pools are built lazily, one per thread count, and their threads are
//! pinned to the cores given to [`pin_to`](ThreadBudget::pin_to).

use crate::HarnessError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

#[derive(Debug, Default)]
struct Pools {
    /// Cores pool threads are pinned to, round-robin. Empty: unpinned.
    cores: Vec<usize>,
    by_threads: HashMap<usize, Arc<rayon::ThreadPool>>,
}

/// A settable thread count shared by everything that runs forward passes.
#[derive(Debug)]
pub struct ThreadBudget {
    current: AtomicUsize,
    pools: Mutex<Pools>,
}

impl ThreadBudget {
    /// Creates a budget starting at `threads` (at least 1).
    pub fn new(threads: usize) -> Self {
        Self {
            current: AtomicUsize::new(threads.max(1)),
            pools: Mutex::new(Pools::default()),
        }
    }

    /// The process-wide budget, initialised to the available parallelism.
    pub fn global() -> Arc<ThreadBudget> {
        static GLOBAL: OnceLock<Arc<ThreadBudget>> = OnceLock::new();
        GLOBAL
            .get_or_init(|| {
                let n = std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1);
                Arc::new(ThreadBudget::new(n))
            })
            .clone()
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    /// Sets the count to `threads` until the returned guard is dropped.
    pub fn acquire(&self, threads: usize) -> ThreadGuard<'_> {
        let threads = threads.max(1);
        let previous = self.current.swap(threads, Ordering::SeqCst);
        tracing::debug!("thread budget {previous} → {threads}");
        ThreadGuard {
            budget: self,
            previous,
        }
    }

    /// Sets the count permanently. Used once at worker start-up.
    pub fn set(&self, threads: usize) {
        self.current.store(threads.max(1), Ordering::SeqCst);
    }

    /// Pins the threads of every pool built from now on to `cores`
    /// (thread `i` to `cores[i % len]`). Already built pools are dropped.
    pub fn pin_to(&self, cores: Vec<usize>) {
        let mut pools = self.lock_pools();
        pools.by_threads.clear();
        pools.cores = cores;
    }

    /// The cores pool threads are pinned to; empty when unpinned.
    pub fn pinned_cores(&self) -> Vec<usize> {
        self.lock_pools().cores.clone()
    }

    /// Runs `f` on a pool of [`current`](Self::current) threads.
    ///
    /// Rayon work started inside `f` (such as a model's forward pass) is
    /// limited to that pool.
    pub fn install<R, F>(&self, f: F) -> Result<R, HarnessError>
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        let pool = self.pool(self.current())?;
        Ok(pool.install(f))
    }

    fn pool(&self, threads: usize) -> Result<Arc<rayon::ThreadPool>, HarnessError> {
        let mut pools = self.lock_pools();
        if let Some(pool) = pools.by_threads.get(&threads) {
            return Ok(Arc::clone(pool));
        }

        let cores = pools.cores.clone();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("forward-{i}"))
            .start_handler(move |i| {
                if cores.is_empty() {
                    return;
                }
                let core = cores[i % cores.len()];
                if !core_affinity::set_for_current(core_affinity::CoreId { id: core }) {
                    tracing::warn!("pool thread {i}: could not pin to core {core}");
                }
            })
            .build()
            .map_err(|e| HarnessError::ThreadPool {
                threads,
                detail: e.to_string(),
            })?;
        tracing::debug!("started {threads}-thread compute pool");

        let pool = Arc::new(pool);
        pools.by_threads.insert(threads, Arc::clone(&pool));
        Ok(pool)
    }

    fn lock_pools(&self) -> MutexGuard<'_, Pools> {
        // The map stays consistent even if a holder panicked.
        self.pools.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Restores the previous thread count on drop.
#[derive(Debug)]
pub struct ThreadGuard<'a> {
    budget: &'a ThreadBudget,
    previous: usize,
}

impl ThreadGuard<'_> {
    /// The value that will be restored.
    pub fn previous(&self) -> usize {
        self.previous
    }
}

impl Drop for ThreadGuard<'_> {
    fn drop(&mut self) {
        self.budget.current.store(self.previous, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_and_restore() {
        let b = ThreadBudget::new(8);
        {
            let g = b.acquire(2);
            assert_eq!(b.current(), 2);
            assert_eq!(g.previous(), 8);
        }
        assert_eq!(b.current(), 8);
    }

    #[test]
    fn test_nested_guards_unwind_in_order() {
        let b = ThreadBudget::new(4);
        let outer = b.acquire(2);
        let inner = b.acquire(1);
        assert_eq!(b.current(), 1);
        drop(inner);
        assert_eq!(b.current(), 2);
        drop(outer);
        assert_eq!(b.current(), 4);
    }

    #[test]
    fn test_restored_on_error_path() {
        fn failing(b: &ThreadBudget) -> Result<(), String> {
            let _g = b.acquire(3);
            Err("boom".into())
        }
        let b = ThreadBudget::new(6);
        assert!(failing(&b).is_err());
        assert_eq!(b.current(), 6);
    }

    #[test]
    fn test_zero_clamped_to_one() {
        let b = ThreadBudget::new(0);
        assert_eq!(b.current(), 1);
        let _g = b.acquire(0);
        assert_eq!(b.current(), 1);
    }

    #[test]
    fn test_install_runs_on_budget_sized_pool() {
        let b = ThreadBudget::new(2);
        assert_eq!(b.install(rayon::current_num_threads).unwrap(), 2);
        {
            let _g = b.acquire(3);
            assert_eq!(b.install(rayon::current_num_threads).unwrap(), 3);
        }
        assert_eq!(b.install(rayon::current_num_threads).unwrap(), 2);
    }

    #[test]
    fn test_install_spreads_work_across_threads() {
        use std::sync::Barrier;

        // Each task waits for the others, so all three must be running at
        // once on distinct pool threads.
        let b = ThreadBudget::new(3);
        let barrier = Barrier::new(3);
        let names = Mutex::new(Vec::new());
        b.install(|| {
            rayon::scope(|s| {
                for _ in 0..3 {
                    s.spawn(|_| {
                        barrier.wait();
                        let name = std::thread::current().name().unwrap_or("").to_string();
                        names.lock().unwrap().push(name);
                    });
                }
            })
        })
        .unwrap();
        let mut names = names.into_inner().unwrap();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 3);
        assert!(names.iter().all(|n| n.starts_with("forward-")));
    }

    #[test]
    fn test_pin_to_records_cores() {
        let b = ThreadBudget::new(2);
        assert!(b.pinned_cores().is_empty());
        b.pin_to(vec![0]);
        assert_eq!(b.pinned_cores(), vec![0]);
        assert_eq!(b.install(rayon::current_num_threads).unwrap(), 2);
    }

    #[test]
    fn test_global_is_shared() {
        let a = ThreadBudget::global();
        let b = ThreadBudget::global();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.current() >= 1);
    }
}
