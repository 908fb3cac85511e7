use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use hearth::pool::WorkerPool;

#[test]
fn test_every_task_runs_exactly_once() {
    let pool = WorkerPool::new(8).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));

    for _ in 0..1000 {
        let counter = Arc::clone(&counter);
        pool.submit(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
    }

    // Dropping the pool closes the queue and joins every worker after the
    // queue drains, so nothing may be lost or duplicated.
    drop(pool);

    assert_eq!(counter.load(Ordering::SeqCst), 1000);
}

#[test]
fn test_shutdown_waits_for_started_tasks() {
    let pool = WorkerPool::new(4).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));

    for _ in 0..64 {
        let counter = Arc::clone(&counter);
        pool.submit(move || {
            thread::sleep(Duration::from_millis(2));
            counter.fetch_add(1, Ordering::SeqCst);
        });
    }
    drop(pool);

    assert_eq!(counter.load(Ordering::SeqCst), 64);
}

#[test]
fn test_single_worker_preserves_fifo_order() {
    let pool = WorkerPool::new(1).unwrap();
    let order = Arc::new(Mutex::new(Vec::new()));

    for i in 0..100 {
        let order = Arc::clone(&order);
        pool.submit(move || {
            order.lock().unwrap().push(i);
        });
    }
    drop(pool);

    let seen = order.lock().unwrap();
    assert_eq!(*seen, (0..100).collect::<Vec<_>>());
}
