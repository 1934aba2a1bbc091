//! Thread-safe task queue with pluggable dequeue policies.

use super::task::Task;
use crate::config::TaskPolicy;
use parking_lot::{Condvar, Mutex};
use rand::Rng;
use std::cmp::Ordering as CmpOrdering;
use std::collections::{BinaryHeap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Heap entry: priority first, then push order for stable ties.
struct Ranked<R> {
    priority: i8,
    seq: u64,
    task: Task<R>,
}

impl<R> PartialEq for Ranked<R> {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl<R> Eq for Ranked<R> {}

impl<R> PartialOrd for Ranked<R> {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl<R> Ord for Ranked<R> {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // Max-heap: greater entries pop first. Earlier pushes win ties, so
        // the sequence comparison is reversed.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Policy-selected internal structure.
enum PolicyQueue<R> {
    Fifo(VecDeque<Task<R>>),
    Lifo(VecDeque<Task<R>>),
    Prio(BinaryHeap<Ranked<R>>),
    Rand(BinaryHeap<Ranked<R>>),
}

impl<R: Send + 'static> PolicyQueue<R> {
    fn new(policy: TaskPolicy) -> Self {
        match policy {
            TaskPolicy::Fifo => PolicyQueue::Fifo(VecDeque::new()),
            TaskPolicy::Lifo => PolicyQueue::Lifo(VecDeque::new()),
            TaskPolicy::Prio => PolicyQueue::Prio(BinaryHeap::new()),
            TaskPolicy::Rand => PolicyQueue::Rand(BinaryHeap::new()),
        }
    }

    fn push(&mut self, mut task: Task<R>, seq: u64) {
        match self {
            PolicyQueue::Fifo(deque) | PolicyQueue::Lifo(deque) => deque.push_back(task),
            PolicyQueue::Prio(heap) => heap.push(Ranked {
                priority: task.priority(),
                seq,
                task,
            }),
            PolicyQueue::Rand(heap) => {
                // Random tag at push time keeps pop O(log n) while giving
                // uniformly random selection; the user priority is ignored.
                task.set_priority(rand::thread_rng().gen::<i8>());
                heap.push(Ranked {
                    priority: task.priority(),
                    seq,
                    task,
                });
            }
        }
    }

    fn pop(&mut self) -> Option<Task<R>> {
        match self {
            PolicyQueue::Fifo(deque) => deque.pop_front(),
            PolicyQueue::Lifo(deque) => deque.pop_back(),
            PolicyQueue::Prio(heap) | PolicyQueue::Rand(heap) => {
                heap.pop().map(|ranked| ranked.task)
            }
        }
    }

    fn len(&self) -> usize {
        match self {
            PolicyQueue::Fifo(deque) | PolicyQueue::Lifo(deque) => deque.len(),
            PolicyQueue::Prio(heap) | PolicyQueue::Rand(heap) => heap.len(),
        }
    }
}

/// Multi-producer multi-consumer task queue.
///
/// One mutex serializes every mutation; pushes wake exactly one waiter and
/// [`wakeup_all`](Self::wakeup_all) pulses every waiter without touching the
/// queue. The size counter is atomic so [`size`](Self::size) never locks.
pub struct TaskQueue<R> {
    inner: Mutex<Inner<R>>,
    ready: Condvar,
    size: AtomicUsize,
    policy: TaskPolicy,
}

struct Inner<R> {
    queue: PolicyQueue<R>,
    next_seq: u64,
}

impl<R: Send + 'static> TaskQueue<R> {
    /// Create a queue; the policy fixes the internal structure for good.
    pub fn new(policy: TaskPolicy) -> Self {
        Self {
            inner: Mutex::new(Inner {
                queue: PolicyQueue::new(policy),
                next_seq: 0,
            }),
            ready: Condvar::new(),
            size: AtomicUsize::new(0),
            policy,
        }
    }

    /// The policy this queue was created with.
    pub fn policy(&self) -> TaskPolicy {
        self.policy
    }

    /// Take ownership of a task and place it according to policy.
    pub fn push(&self, task: Task<R>) {
        let mut inner = self.inner.lock();
        let seq = inner.next_seq;
        inner.next_seq += 1;

        inner.queue.push(task, seq);
        self.size.fetch_add(1, Ordering::Release);
        drop(inner);

        self.ready.notify_one();
    }

    /// Construct a task in place and push it.
    pub fn emplace<F>(&self, func: F)
    where
        F: FnOnce() -> R + Send + 'static,
    {
        self.push(Task::new(func));
    }

    /// Block until a task is available, then dequeue it.
    pub fn pop(&self) -> Task<R> {
        let mut inner = self.inner.lock();
        while inner.queue.len() == 0 {
            self.ready.wait(&mut inner);
        }

        self.pop_locked(&mut inner)
    }

    /// Like [`pop`](Self::pop), but give up after `timeout`.
    pub fn pop_for(&self, timeout: Duration) -> Option<Task<R>> {
        let deadline = Instant::now() + timeout;

        let mut inner = self.inner.lock();
        while inner.queue.len() == 0 {
            if self.ready.wait_until(&mut inner, deadline).timed_out() {
                if inner.queue.len() == 0 {
                    return None;
                }
                break;
            }
        }

        Some(self.pop_locked(&mut inner))
    }

    /// Block until a task is available or `pred` turns true.
    ///
    /// The predicate is consulted before the queue on every wakeup, so a
    /// predicate-wakeup returns `None` even with tasks pending. Workers use
    /// this to honor a cancel request ahead of queued work.
    pub fn pop_until<F>(&self, mut pred: F) -> Option<Task<R>>
    where
        F: FnMut() -> bool,
    {
        let mut inner = self.inner.lock();
        loop {
            if pred() {
                return None;
            }

            if inner.queue.len() > 0 {
                return Some(self.pop_locked(&mut inner));
            }

            self.ready.wait(&mut inner);
        }
    }

    /// Lock-free task count snapshot.
    pub fn size(&self) -> usize {
        self.size.load(Ordering::Acquire)
    }

    /// Lock-free emptiness snapshot.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Wake every waiter without changing the queue. Used by the pool so
    /// idle workers re-check their cancel predicate.
    pub fn wakeup_all(&self) {
        self.ready.notify_all();
    }

    fn pop_locked(&self, inner: &mut Inner<R>) -> Task<R> {
        let task = inner
            .queue
            .pop()
            .expect("pop_locked called on an empty queue");
        self.size.fetch_sub(1, Ordering::Release);
        task
    }
}

impl<R> std::fmt::Debug for TaskQueue<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueue")
            .field("policy", &self.policy)
            .field("size", &self.size.load(Ordering::Relaxed))
            .finish()
    }
}
