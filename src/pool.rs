use std::io;
use std::thread;

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, warn};

/// Capacity of the task queue; `submit` blocks once this many tasks are
/// waiting, which applies backpressure to the dispatcher.
const QUEUE_DEPTH: usize = 1024;

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Fixed set of worker threads draining a shared FIFO task queue.
///
/// Dropping the pool closes the queue; every worker finishes the tasks already
/// enqueued and exits, and the drop joins them all. A task that starts always
/// runs to completion. There is no guarantee about which worker runs a task.
pub struct WorkerPool {
    sender: Option<Sender<Task>>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(size: usize) -> io::Result<Self> {
        assert!(size > 0);
        let (sender, receiver) = crossbeam_channel::bounded::<Task>(QUEUE_DEPTH);

        let mut workers = Vec::with_capacity(size);
        for i in 0..size {
            let receiver: Receiver<Task> = receiver.clone();
            let handle = thread::Builder::new()
                .name(format!("worker-{i}"))
                .spawn(move || {
                    while let Ok(task) = receiver.recv() {
                        task();
                    }
                    debug!("worker {} exiting", i);
                })?;
            workers.push(handle);
        }

        Ok(Self {
            sender: Some(sender),
            workers,
        })
    }

    /// Enqueues a unit of work for the next idle worker.
    pub fn submit<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if let Some(sender) = &self.sender {
            if sender.send(Box::new(task)).is_err() {
                warn!("task submitted to a closed pool, dropping it");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the channel lets each worker drain what is left and exit.
        drop(self.sender.take());
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}
