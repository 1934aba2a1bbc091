use crate::error::{Error, Result};

/// Fallback worker bound when hardware concurrency cannot be detected.
const FALLBACK_MAX_WORKERS: usize = 16;

const IO_BOUND_MAX_WORKERS: usize = 200;
const IO_BOUND_INIT_WORKERS: usize = 30;

/// Dequeue policy of a task queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskPolicy {
    /// Insertion order, oldest task first.
    Fifo,
    /// Insertion order, newest task first.
    Lifo,
    /// Highest priority first; equal priorities dequeue in push order.
    Prio,
    /// Each push is tagged with a random priority, highest tag first.
    Rand,
}

impl Default for TaskPolicy {
    fn default() -> Self {
        TaskPolicy::Fifo
    }
}

/// Worker-set configuration for a [`ThreadPool`](crate::ThreadPool).
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Dequeue policy of the shared queue.
    pub policy: TaskPolicy,
    /// Upper bound on the active worker count.
    pub max_workers: usize,
    /// Lower bound on the active worker count.
    pub min_workers: usize,
    /// Worker count the pool starts with.
    pub init_workers: usize,
    /// Drop workers from the cancelled collection once their thread exits,
    /// instead of keeping them around for reuse.
    pub remove_cancelled: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            policy: TaskPolicy::Fifo,
            max_workers: FALLBACK_MAX_WORKERS,
            min_workers: 1,
            init_workers: 8,
            remove_cancelled: false,
        }
    }
}

impl PoolConfig {
    /// General-purpose preset: up to one worker per hardware thread.
    pub fn common() -> Self {
        let ncpus = detected_parallelism();
        Self {
            max_workers: ncpus,
            init_workers: (ncpus / 2).max(1),
            ..Self::default()
        }
    }

    /// Preset for compute-heavy tasks; oversubscribing buys nothing.
    pub fn cpu_bound() -> Self {
        let ncpus = detected_parallelism();
        Self {
            max_workers: ncpus / 2 + 1,
            init_workers: (ncpus / 2).max(1),
            ..Self::default()
        }
    }

    /// Preset for tasks that mostly wait on I/O.
    pub fn io_bound() -> Self {
        Self {
            max_workers: IO_BOUND_MAX_WORKERS,
            init_workers: IO_BOUND_INIT_WORKERS,
            ..Self::default()
        }
    }

    /// Preset for timers and other latency-sensitive housekeeping.
    pub fn time_bound() -> Self {
        let ncpus = detected_parallelism();
        Self {
            max_workers: (ncpus / 2).max(1),
            init_workers: (ncpus / 2).max(1),
            ..Self::default()
        }
    }

    /// Check the worker bounds.
    pub fn validate(&self) -> Result<()> {
        if self.max_workers < self.min_workers {
            return Err(Error::config("max_workers is smaller than min_workers"));
        }

        if self.init_workers < self.min_workers || self.init_workers > self.max_workers {
            return Err(Error::config(format!(
                "init_workers must be within [{}, {}], got {}",
                self.min_workers, self.max_workers, self.init_workers
            )));
        }

        Ok(())
    }
}

/// Hardware concurrency, falling back when detection reports zero.
pub(crate) fn detected_parallelism() -> usize {
    match num_cpus::get() {
        0 => FALLBACK_MAX_WORKERS,
        n => n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(PoolConfig::default().validate().is_ok());
    }

    #[test]
    fn presets_are_valid() {
        assert!(PoolConfig::common().validate().is_ok());
        assert!(PoolConfig::cpu_bound().validate().is_ok());
        assert!(PoolConfig::io_bound().validate().is_ok());
        assert!(PoolConfig::time_bound().validate().is_ok());
    }

    #[test]
    fn inverted_bounds_rejected() {
        let config = PoolConfig {
            max_workers: 1,
            min_workers: 4,
            init_workers: 1,
            ..PoolConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn init_outside_bounds_rejected() {
        let config = PoolConfig {
            max_workers: 4,
            min_workers: 2,
            init_workers: 8,
            ..PoolConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
