//! Elastic thread pool over a shared policy queue.

use super::queue::TaskQueue;
use super::task::{Task, TaskHandle};
use super::worker::Worker;
use crate::config::{PoolConfig, TaskPolicy};
use crate::error::Result;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::Arc;

/// Snapshot of the pool's worker states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolReport {
    /// Workers in the active collection.
    pub running: usize,
    /// Retired workers still draining their current task.
    pub cancel_wait: usize,
    /// Retired workers whose thread has exited.
    pub cancelled: usize,
}

struct PoolState<R: Send + 'static> {
    active: VecDeque<Worker<R>>,
    cancelled: VecDeque<Worker<R>>,
}

/// A dynamic set of workers draining one shared [`TaskQueue`].
///
/// Submissions return a [`TaskHandle`] to await the outcome. The worker set
/// resizes within `[min_workers, max_workers]`; shrinking retires workers
/// cooperatively and keeps them for later reuse.
///
/// Dropping the pool releases every worker, joins their threads, and then
/// drops the queue; tasks still queued at that point resolve their handles
/// with [`Error::Cancelled`](crate::Error::Cancelled).
pub struct ThreadPool<R: Send + 'static> {
    // Field order matters on drop: workers go before the queue so
    // undispatched tasks die only after every thread has exited.
    state: Mutex<PoolState<R>>,
    queue: Arc<TaskQueue<R>>,
    config: PoolConfig,
}

impl<R: Send + 'static> ThreadPool<R> {
    /// Start building a pool with the blank preset.
    pub fn builder() -> ThreadPoolBuilder<R> {
        ThreadPoolBuilder::new()
    }

    /// Build a pool from an explicit configuration.
    pub fn with_config(config: PoolConfig) -> Result<Self> {
        config.validate()?;

        let pool = Self {
            state: Mutex::new(PoolState {
                active: VecDeque::new(),
                cancelled: VecDeque::new(),
            }),
            queue: Arc::new(TaskQueue::new(config.policy)),
            config,
        };

        pool.resize_workers(pool.config.init_workers);
        Ok(pool)
    }

    /// The configuration the pool was built with.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Queue a task and return its completion handle.
    ///
    /// Pool state is untouched; after [`release`](Self::release) the task is
    /// accepted but dies with the queue, resolving the handle `Cancelled`.
    pub fn submit(&self, mut task: Task<R>) -> TaskHandle<R> {
        let handle = task.handle();
        self.queue.push(task);
        handle
    }

    /// Construct a task from `func` and submit it.
    pub fn emplace<F>(&self, func: F) -> TaskHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
    {
        self.submit(Task::new(func))
    }

    /// Grow or shrink the active worker set towards `target`.
    ///
    /// The target is clamped to `[min_workers, max_workers]`; a clamped
    /// target equal to the current size is a no-op. Growing reuses the
    /// oldest retired workers before spawning fresh ones. Shrinking retires
    /// from the front of the active collection (oldest first) and pulses
    /// the queue so idle workers notice. Retirement is asynchronous: the
    /// retired workers reach `Cancelled` eventually, not before this
    /// method returns.
    pub fn resize_workers(&self, target: usize) {
        let mut state = self.state.lock();

        let target = target.clamp(self.config.min_workers, self.config.max_workers);
        let current = state.active.len();

        if target > current {
            let mut shortfall = target - current;

            while shortfall > 0 {
                match state.cancelled.pop_front() {
                    Some(mut worker) => {
                        worker.uncancel();
                        state.active.push_back(worker);
                        shortfall -= 1;
                    }
                    None => break,
                }
            }

            for _ in 0..shortfall {
                let mut worker = Worker::new(Arc::clone(&self.queue));
                worker.run();
                state.active.push_back(worker);
            }
        } else if target < current {
            for _ in 0..(current - target) {
                if let Some(worker) = state.active.pop_front() {
                    worker.cancel();
                    state.cancelled.push_back(worker);
                }
            }

            self.queue.wakeup_all();
        }

        if self.config.remove_cancelled {
            state.cancelled.retain(|worker| !worker.is_cancelled());
        }
    }

    /// Retire every active worker and wake the queue.
    pub fn release(&self) {
        let mut state = self.state.lock();

        while let Some(worker) = state.active.pop_front() {
            worker.cancel();
            state.cancelled.push_back(worker);
        }

        self.queue.wakeup_all();
    }

    /// Count workers by state.
    pub fn report(&self) -> PoolReport {
        let state = self.state.lock();

        let mut report = PoolReport {
            running: state.active.len(),
            ..PoolReport::default()
        };

        for worker in &state.cancelled {
            if worker.is_cancelled() {
                report.cancelled += 1;
            } else if worker.is_cancel_wait() {
                report.cancel_wait += 1;
            }
        }

        report
    }

    /// Pending task count of the shared queue.
    pub fn queued_tasks(&self) -> usize {
        self.queue.size()
    }
}

impl<R: Send + 'static> Drop for ThreadPool<R> {
    fn drop(&mut self) {
        // Workers join in their own drops right after this.
        self.release();
    }
}

impl<R: Send + 'static> std::fmt::Debug for ThreadPool<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("config", &self.config)
            .field("queued_tasks", &self.queue.size())
            .finish()
    }
}

/// Fluent construction of a [`ThreadPool`].
///
/// Starts from the blank preset; [`build`](Self::build) validates the
/// bounds and spins up the initial workers. Preset constructors mirror
/// [`PoolConfig`]'s.
pub struct ThreadPoolBuilder<R> {
    config: PoolConfig,
    _result: PhantomData<fn() -> R>,
}

impl<R: Send + 'static> ThreadPoolBuilder<R> {
    /// Blank preset: Fifo, 16 max, 8 initial, 1 minimum.
    pub fn new() -> Self {
        Self::from_config(PoolConfig::default())
    }

    /// Start from an existing configuration.
    pub fn from_config(config: PoolConfig) -> Self {
        Self {
            config,
            _result: PhantomData,
        }
    }

    /// General-purpose preset, see [`PoolConfig::common`].
    pub fn common() -> Self {
        Self::from_config(PoolConfig::common())
    }

    /// Compute-heavy preset, see [`PoolConfig::cpu_bound`].
    pub fn cpu_bound() -> Self {
        Self::from_config(PoolConfig::cpu_bound())
    }

    /// I/O-heavy preset, see [`PoolConfig::io_bound`].
    pub fn io_bound() -> Self {
        Self::from_config(PoolConfig::io_bound())
    }

    /// Timer/housekeeping preset, see [`PoolConfig::time_bound`].
    pub fn time_bound() -> Self {
        Self::from_config(PoolConfig::time_bound())
    }

    /// Dequeue policy of the shared queue.
    pub fn policy(mut self, policy: TaskPolicy) -> Self {
        self.config.policy = policy;
        self
    }

    /// Upper bound on the active worker count.
    pub fn max_workers(mut self, n: usize) -> Self {
        self.config.max_workers = n;
        self
    }

    /// Lower bound on the active worker count.
    pub fn min_workers(mut self, n: usize) -> Self {
        self.config.min_workers = n;
        self
    }

    /// Worker count the pool starts with.
    pub fn init_workers(mut self, n: usize) -> Self {
        self.config.init_workers = n;
        self
    }

    /// Prune workers from the retired collection once their thread exits.
    pub fn remove_cancelled(mut self, remove: bool) -> Self {
        self.config.remove_cancelled = remove;
        self
    }

    /// Validate the configuration and start the pool.
    pub fn build(self) -> Result<ThreadPool<R>> {
        ThreadPool::with_config(self.config)
    }
}

impl<R: Send + 'static> Default for ThreadPoolBuilder<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> std::fmt::Debug for ThreadPoolBuilder<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPoolBuilder")
            .field("config", &self.config)
            .finish()
    }
}
