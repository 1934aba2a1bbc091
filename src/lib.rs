//! threadmill - an elastic thread pool with pluggable ordering policies.
//!
//! Callers wrap work into [`Task`]s, submit them to a [`ThreadPool`], and
//! await the outcome through the returned [`TaskHandle`]. A dynamic set of
//! worker threads drains one shared [`TaskQueue`] whose dequeue order is
//! fixed at construction: first-in-first-out, last-in-first-out,
//! priority-ordered, or randomized.
//!
//! # Quick Start
//!
//! ```no_run
//! use threadmill::prelude::*;
//!
//! let pool: ThreadPool<i32> = ThreadPool::builder()
//!     .policy(TaskPolicy::Fifo)
//!     .max_workers(8)
//!     .init_workers(2)
//!     .build()
//!     .unwrap();
//!
//! let handle = pool.emplace(|| 21 * 2);
//! assert_eq!(handle.wait().unwrap(), 42);
//!
//! // Grow under load, shrink when idle.
//! pool.resize_workers(8);
//! pool.resize_workers(1);
//! ```
//!
//! # Features
//!
//! - **Ordering policies**: FIFO, LIFO, stable priority, randomized
//! - **Elastic worker set**: clamped resizing with worker reuse
//! - **Cooperative cancellation**: a retired worker finishes its task first
//! - **Captured failures**: a panicking task resolves its handle, never
//!   the worker
//! - **Presets**: `common`, `cpu_bound`, `io_bound`, `time_bound`

#![warn(missing_docs, missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod executor;
pub mod prelude;

pub use config::{PoolConfig, TaskPolicy};
pub use error::{Error, Result};
pub use executor::{
    PoolReport, Task, TaskHandle, TaskQueue, ThreadPool, ThreadPoolBuilder, Worker, WorkerStatus,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoke_submit_and_wait() {
        let pool: ThreadPool<i32> = ThreadPool::builder()
            .max_workers(2)
            .init_workers(1)
            .build()
            .unwrap();

        let handle = pool.emplace(|| 1 + 1);
        assert_eq!(handle.wait().unwrap(), 2);
    }

    #[test]
    fn smoke_all_policies() {
        for policy in [
            TaskPolicy::Fifo,
            TaskPolicy::Lifo,
            TaskPolicy::Prio,
            TaskPolicy::Rand,
        ] {
            let pool: ThreadPool<usize> = ThreadPool::builder()
                .policy(policy)
                .max_workers(2)
                .init_workers(2)
                .build()
                .unwrap();

            let handles: Vec<_> = (0..16).map(|i| pool.emplace(move || i)).collect();
            let mut results: Vec<_> = handles.into_iter().map(|h| h.wait().unwrap()).collect();
            results.sort_unstable();
            assert_eq!(results, (0..16).collect::<Vec<_>>());
        }
    }

    #[test]
    fn smoke_prelude() {
        use crate::prelude::*;

        let queue: TaskQueue<()> = TaskQueue::new(TaskPolicy::Lifo);
        assert!(queue.is_empty());
    }
}
