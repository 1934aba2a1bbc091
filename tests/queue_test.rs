use threadmill::prelude::*;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn unwrap_task<R: Send + 'static>(mut task: Task<R>) -> R {
    let handle = task.handle();
    task.invoke();
    handle.wait().unwrap()
}

#[test]
fn fifo_ordering() {
    let fifo = TaskQueue::new(TaskPolicy::Fifo);

    fifo.emplace(|| 0);
    fifo.emplace(|| 1);
    fifo.emplace(|| 2);

    assert_eq!(unwrap_task(fifo.pop()), 0);
    assert_eq!(unwrap_task(fifo.pop()), 1);
    assert_eq!(unwrap_task(fifo.pop()), 2);
}

#[test]
fn lifo_ordering() {
    let lifo = TaskQueue::new(TaskPolicy::Lifo);

    lifo.emplace(|| 0);
    lifo.emplace(|| 1);
    lifo.emplace(|| 2);

    assert_eq!(unwrap_task(lifo.pop()), 2);
    assert_eq!(unwrap_task(lifo.pop()), 1);
    assert_eq!(unwrap_task(lifo.pop()), 0);
}

#[test]
fn prio_ordering() {
    let prio = TaskQueue::new(TaskPolicy::Prio);

    prio.push(Task::with_priority(|| 0, -1));
    prio.push(Task::with_priority(|| 1, 1));
    prio.push(Task::new(|| 2));

    assert_eq!(unwrap_task(prio.pop()), 1);
    assert_eq!(unwrap_task(prio.pop()), 2);
    assert_eq!(unwrap_task(prio.pop()), 0);
}

#[test]
fn prio_dequeue_is_non_increasing() {
    let prio = TaskQueue::new(TaskPolicy::Prio);

    let priorities = [3i8, -7, 0, 127, -128, 0, 3, 12];
    for p in priorities {
        prio.push(Task::with_priority(move || p, p));
    }

    let mut last = i8::MAX;
    for _ in 0..priorities.len() {
        let p = unwrap_task(prio.pop());
        assert!(p <= last);
        last = p;
    }
}

#[test]
fn rand_conserves_tasks() {
    let rand = TaskQueue::new(TaskPolicy::Rand);

    for i in 0..32 {
        rand.emplace(move || i);
    }

    let mut seen: Vec<i32> = (0..32).map(|_| unwrap_task(rand.pop())).collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..32).collect::<Vec<_>>());
    assert!(rand.is_empty());
}

#[test]
fn pop_for_zero_returns_promptly() {
    let queue: TaskQueue<i32> = TaskQueue::new(TaskPolicy::Fifo);
    assert!(queue.pop_for(Duration::ZERO).is_none());
}

#[test]
fn pop_for_sees_concurrent_push() {
    let queue: Arc<TaskQueue<i32>> = Arc::new(TaskQueue::new(TaskPolicy::Fifo));

    let producer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            queue.emplace(|| 9);
        })
    };

    let task = queue.pop_for(Duration::from_secs(5));
    producer.join().unwrap();

    assert_eq!(unwrap_task(task.expect("push should arrive in time")), 9);
}

#[test]
fn pop_until_predicate_wins_over_pending_work() {
    let queue: TaskQueue<i32> = TaskQueue::new(TaskPolicy::Fifo);
    queue.emplace(|| 1);

    assert!(queue.pop_until(|| true).is_none());
    assert_eq!(queue.size(), 1);
}

#[test]
fn wakeup_all_releases_predicate_waiters() {
    let queue: Arc<TaskQueue<i32>> = Arc::new(TaskQueue::new(TaskPolicy::Fifo));
    let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));

    let waiter = {
        let queue = Arc::clone(&queue);
        let stop = Arc::clone(&stop);
        thread::spawn(move || queue.pop_until(|| stop.load(std::sync::atomic::Ordering::Acquire)))
    };

    thread::sleep(Duration::from_millis(50));
    stop.store(true, std::sync::atomic::Ordering::Release);
    queue.wakeup_all();

    assert!(waiter.join().unwrap().is_none());
}
