//! Task representation and the one-shot completion handle.

use crate::error::{Error, Result};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

/// A deferred computation with an attached result channel.
///
/// The closure and everything it captures are moved into the task, so no
/// borrowed data can cross the thread boundary; the compiler rejects
/// non-`'static` captures at construction. Invoking consumes the task and
/// resolves the channel exactly once, with the closure's return value or
/// with the captured panic if it unwound.
pub struct Task<R> {
    func: Box<dyn FnOnce() -> R + Send + 'static>,
    outcome: Sender<Result<R>>,
    handle: Option<Receiver<Result<R>>>,
    priority: i8,
}

impl<R: Send + 'static> Task<R> {
    /// Priority assigned to tasks that never call [`set_priority`](Self::set_priority).
    pub const DEFAULT_PRIORITY: i8 = 0;

    /// Wrap a closure into a task with default priority.
    pub fn new<F>(func: F) -> Self
    where
        F: FnOnce() -> R + Send + 'static,
    {
        let (outcome, handle) = bounded(1);
        Self {
            func: Box::new(func),
            outcome,
            handle: Some(handle),
            priority: Self::DEFAULT_PRIORITY,
        }
    }

    /// Wrap a closure into a task with the given priority.
    pub fn with_priority<F>(func: F, priority: i8) -> Self
    where
        F: FnOnce() -> R + Send + 'static,
    {
        let mut task = Self::new(func);
        task.set_priority(priority);
        task
    }

    /// Scheduling priority, only consulted by [`TaskPolicy::Prio`](crate::TaskPolicy::Prio) queues.
    pub fn priority(&self) -> i8 {
        self.priority
    }

    /// Change the scheduling priority. Has no effect once the task has been
    /// pushed into a queue.
    pub fn set_priority(&mut self, priority: i8) {
        self.priority = priority;
    }

    /// Detach the completion handle.
    ///
    /// The handle exists exactly once; soliciting it a second time is a
    /// programming error and panics.
    pub fn handle(&mut self) -> TaskHandle<R> {
        let receiver = self
            .handle
            .take()
            .expect("completion handle already taken");
        TaskHandle { receiver }
    }

    /// Run the computation and resolve the result channel.
    ///
    /// A panicking closure is caught here; the panic is delivered to the
    /// awaiter as [`Error::TaskPanicked`] and never unwinds into the caller.
    pub fn invoke(self) {
        let func = self.func;
        let result = match catch_unwind(AssertUnwindSafe(func)) {
            Ok(value) => Ok(value),
            Err(payload) => Err(Error::task_panicked(panic_message(payload.as_ref()))),
        };

        // The awaiter may already have dropped its handle.
        let _ = self.outcome.send(result);
    }
}

impl<R> std::fmt::Debug for Task<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("priority", &self.priority)
            .field("handle_taken", &self.handle.is_none())
            .finish()
    }
}

/// The caller's side of a task's result channel.
///
/// Resolves exactly once: with the task's return value, with the task's
/// captured panic, or with [`Error::Cancelled`] if the task was dropped
/// without ever running.
pub struct TaskHandle<R> {
    receiver: Receiver<Result<R>>,
}

impl<R> TaskHandle<R> {
    /// Block until the task resolves.
    pub fn wait(self) -> Result<R> {
        match self.receiver.recv() {
            Ok(outcome) => outcome,
            Err(_) => Err(Error::Cancelled),
        }
    }

    /// Block until the task resolves or `timeout` elapses.
    ///
    /// Timing out does not consume the handle; the wait can be retried.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<R> {
        match self.receiver.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => Err(Error::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(Error::Cancelled),
        }
    }

    /// Poll for the outcome without blocking. Returns `None` while the task
    /// is still pending.
    pub fn try_wait(&self) -> Option<Result<R>> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(Error::Cancelled)),
        }
    }
}

impl<R> std::fmt::Debug for TaskHandle<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("resolved", &!self.receiver.is_empty())
            .finish()
    }
}

/// Extract a printable message from a panic payload.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoke_resolves_value() {
        let mut task = Task::new(|| 40 + 2);
        let handle = task.handle();

        task.invoke();
        assert_eq!(handle.wait().unwrap(), 42);
    }

    #[test]
    fn priority_accessors() {
        let mut task: Task<()> = Task::new(|| {});
        assert_eq!(task.priority(), Task::<()>::DEFAULT_PRIORITY);

        task.set_priority(-7);
        assert_eq!(task.priority(), -7);

        let task: Task<()> = Task::with_priority(|| {}, 3);
        assert_eq!(task.priority(), 3);
    }

    #[test]
    fn panic_is_captured() {
        let mut task: Task<()> = Task::new(|| panic!("boom"));
        let handle = task.handle();

        task.invoke();
        match handle.wait() {
            Err(Error::TaskPanicked(msg)) => assert_eq!(msg, "boom"),
            other => panic!("expected captured panic, got {other:?}"),
        }
    }

    #[test]
    fn dropped_task_cancels_handle() {
        let mut task = Task::new(|| 1);
        let handle = task.handle();

        drop(task);
        assert!(matches!(handle.wait(), Err(Error::Cancelled)));
    }

    #[test]
    fn wait_timeout_reports_pending() {
        let mut task = Task::new(|| 1);
        let handle = task.handle();

        assert!(matches!(
            handle.wait_timeout(Duration::from_millis(10)),
            Err(Error::Timeout(_))
        ));
        assert!(handle.try_wait().is_none());

        task.invoke();
        assert_eq!(handle.wait_timeout(Duration::from_millis(10)).unwrap(), 1);
    }

    #[test]
    #[should_panic(expected = "completion handle already taken")]
    fn second_handle_solicitation_panics() {
        let mut task = Task::new(|| 1);
        let _first = task.handle();
        let _second = task.handle();
    }
}
