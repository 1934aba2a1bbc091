// Worker thread lifecycle.

use super::queue::TaskQueue;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

static NEXT_WORKER_ID: AtomicUsize = AtomicUsize::new(0);

/// Lifecycle state of a [`Worker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WorkerStatus {
    /// Constructed, thread not started.
    Create = 0,
    /// Thread live, pulling from the queue.
    Running = 1,
    /// Stop requested; honored at the next decision point.
    CancelWait = 2,
    /// Thread has exited its loop.
    Cancelled = 3,
}

impl WorkerStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => WorkerStatus::Create,
            1 => WorkerStatus::Running,
            2 => WorkerStatus::CancelWait,
            _ => WorkerStatus::Cancelled,
        }
    }
}

// Shared with the worker thread. Transitions happen only under `lock`; the
// atomic lets predicates read the status without locking.
struct Lifecycle {
    status: AtomicU8,
    lock: Mutex<()>,
    cancel_signal: Condvar,
}

impl Lifecycle {
    fn new() -> Self {
        Self {
            status: AtomicU8::new(WorkerStatus::Create as u8),
            lock: Mutex::new(()),
            cancel_signal: Condvar::new(),
        }
    }

    fn status(&self) -> WorkerStatus {
        WorkerStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    fn set_status(&self, status: WorkerStatus) {
        self.status.store(status as u8, Ordering::Release);
    }
}

/// One OS thread draining a shared [`TaskQueue`].
///
/// Cancellation is cooperative: [`cancel`](Self::cancel) latches
/// [`WorkerStatus::CancelWait`], the loop finishes its current task (if
/// any) and exits at the next decision point. A cancelled worker can be
/// revived with [`uncancel`](Self::uncancel).
pub struct Worker<R: Send + 'static> {
    id: usize,
    queue: Arc<TaskQueue<R>>,
    lifecycle: Arc<Lifecycle>,
    thread: Option<JoinHandle<()>>,
}

impl<R: Send + 'static> Worker<R> {
    /// Create a worker bound to `queue`. The thread starts on [`run`](Self::run).
    pub fn new(queue: Arc<TaskQueue<R>>) -> Self {
        Self {
            id: NEXT_WORKER_ID.fetch_add(1, Ordering::Relaxed),
            queue,
            lifecycle: Arc::new(Lifecycle::new()),
            thread: None,
        }
    }

    /// Spawn the worker thread.
    ///
    /// Returns `false` without side effects when the worker is already
    /// live (`Running` or `CancelWait`) or when the OS refuses the thread,
    /// in which case the worker stays in `Create`.
    pub fn run(&mut self) -> bool {
        // Lock through a clone so the guard does not pin `self` while the
        // old thread handle is reaped below.
        let lifecycle = Arc::clone(&self.lifecycle);
        let guard = lifecycle.lock.lock();

        match lifecycle.status() {
            WorkerStatus::Running | WorkerStatus::CancelWait => return false,
            WorkerStatus::Create | WorkerStatus::Cancelled => {}
        }

        let queue = Arc::clone(&self.queue);
        let thread_lifecycle = Arc::clone(&self.lifecycle);
        let spawned = thread::Builder::new()
            .name(format!("threadmill-worker-{}", self.id))
            .spawn(move || worker_loop(&queue, &thread_lifecycle));

        match spawned {
            Ok(handle) => {
                // A previous run has fully exited by now; reap it.
                if let Some(old) = self.thread.take() {
                    let _ = old.join();
                }
                self.thread = Some(handle);
                lifecycle.set_status(WorkerStatus::Running);
                drop(guard);
                true
            }
            Err(_) => false,
        }
    }

    /// Request the worker to stop after its current task.
    ///
    /// Returns `false` when there is nothing to cancel (`Create` or
    /// `Cancelled`). The request alone does not wake an idle worker; pulse
    /// the queue with [`TaskQueue::wakeup_all`] afterwards.
    pub fn cancel(&self) -> bool {
        let _guard = self.lifecycle.lock.lock();

        match self.lifecycle.status() {
            WorkerStatus::Create | WorkerStatus::Cancelled => false,
            WorkerStatus::Running | WorkerStatus::CancelWait => {
                self.lifecycle.set_status(WorkerStatus::CancelWait);
                true
            }
        }
    }

    /// Withdraw a cancel request, or revive a cancelled worker.
    ///
    /// `CancelWait` flips back to `Running` in place; the thread never
    /// noticed. From `Cancelled` (or `Create`) a fresh thread is spawned.
    /// Returns `false` when already `Running`.
    pub fn uncancel(&mut self) -> bool {
        {
            let _guard = self.lifecycle.lock.lock();

            match self.lifecycle.status() {
                WorkerStatus::Running => return false,
                WorkerStatus::CancelWait => {
                    self.lifecycle.set_status(WorkerStatus::Running);
                    return true;
                }
                WorkerStatus::Create | WorkerStatus::Cancelled => {}
            }
        }

        self.run()
    }

    /// Block until the worker's loop has exited.
    pub fn wait_for_cancel(&self) {
        let mut guard = self.lifecycle.lock.lock();
        while self.lifecycle.status() != WorkerStatus::Cancelled {
            self.lifecycle.cancel_signal.wait(&mut guard);
        }
    }

    /// Bounded [`wait_for_cancel`](Self::wait_for_cancel). Returns `false`
    /// on timeout.
    pub fn wait_for_cancel_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;

        let mut guard = self.lifecycle.lock.lock();
        while self.lifecycle.status() != WorkerStatus::Cancelled {
            if self
                .lifecycle
                .cancel_signal
                .wait_until(&mut guard, deadline)
                .timed_out()
            {
                return self.lifecycle.status() == WorkerStatus::Cancelled;
            }
        }

        true
    }

    /// Current lifecycle state.
    pub fn status(&self) -> WorkerStatus {
        self.lifecycle.status()
    }

    /// Worker is in `Create`.
    pub fn is_created(&self) -> bool {
        self.status() == WorkerStatus::Create
    }

    /// Worker is in `Running`.
    pub fn is_running(&self) -> bool {
        self.status() == WorkerStatus::Running
    }

    /// Worker is in `CancelWait`.
    pub fn is_cancel_wait(&self) -> bool {
        self.status() == WorkerStatus::CancelWait
    }

    /// Worker is in `Cancelled`.
    pub fn is_cancelled(&self) -> bool {
        self.status() == WorkerStatus::Cancelled
    }
}

impl<R: Send + 'static> Drop for Worker<R> {
    fn drop(&mut self) {
        self.cancel();
        self.queue.wakeup_all();
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl<R: Send + 'static> std::fmt::Debug for Worker<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("status", &self.status())
            .finish()
    }
}

// The loop itself. Task panics cannot escape (Task::invoke catches them),
// so the only way out is the cancel latch.
fn worker_loop<R: Send + 'static>(queue: &TaskQueue<R>, lifecycle: &Lifecycle) {
    loop {
        let task = queue.pop_until(|| lifecycle.status() == WorkerStatus::CancelWait);

        if let Some(task) = task {
            task.invoke();
        }

        let guard = lifecycle.lock.lock();
        if lifecycle.status() == WorkerStatus::CancelWait {
            lifecycle.set_status(WorkerStatus::Cancelled);
            drop(guard);
            lifecycle.cancel_signal.notify_all();
            break;
        }
    }
}
