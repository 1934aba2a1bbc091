//! Convenience re-exports of the working set.

pub use crate::config::{PoolConfig, TaskPolicy};
pub use crate::error::{Error, Result};
pub use crate::executor::{
    PoolReport, Task, TaskHandle, TaskQueue, ThreadPool, ThreadPoolBuilder, Worker, WorkerStatus,
};
