//! Persistent worker threads consuming a FIFO of tasks.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::debug;

use crate::error::TaskError;
use crate::task::Task;

struct Queue {
    tasks: VecDeque<Arc<Task>>,
    shutdown: bool,
}

struct Shared {
    queue: Mutex<Queue>,
    work_available: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Claim a subtask from the front of the queue.
/// Tasks leave the queue once their last subtask is claimed.
fn claim_next(queue: &mut Queue) -> Option<(Arc<Task>, usize)> {
    while let Some(task) = queue.tasks.front() {
        match task.claim() {
            Some(index) => {
                let task = task.clone();
                if task.is_exhausted() {
                    queue.tasks.pop_front();
                }
                return Some((task, index));
            }
            None => {
                queue.tasks.pop_front();
            }
        }
    }
    None
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        let (task, index) = {
            let mut queue = shared.lock();
            loop {
                if let Some(work) = claim_next(&mut queue) {
                    break work;
                }
                if queue.shutdown {
                    return;
                }
                queue = shared
                    .work_available
                    .wait(queue)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };
        task.run(index);
    }
}

pub struct ThreadPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    pub fn new(threads: usize) -> ThreadPool {
        let threads = threads.max(1);
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue {
                tasks: VecDeque::new(),
                shutdown: false,
            }),
            work_available: Condvar::new(),
        });
        let workers = (0..threads)
            .map(|i| {
                let shared = shared.clone();
                thread::Builder::new()
                    .name(format!("render-worker-{}", i))
                    .spawn(move || worker_loop(shared))
            })
            .filter_map(|spawned| match spawned {
                Ok(handle) => Some(handle),
                Err(err) => {
                    tracing::warn!(error = %err, "failed to spawn worker thread");
                    None
                }
            })
            .collect::<Vec<_>>();
        debug!(threads = workers.len(), "started thread pool");
        ThreadPool { shared, workers }
    }

    /// Pool with one worker per logical cpu
    pub fn with_cpu_count() -> ThreadPool {
        ThreadPool::new(num_cpus::get())
    }

    pub fn thread_count(&self) -> usize {
        self.workers.len()
    }

    /// Queue a task behind the ones already submitted
    pub fn enqueue(&self, task: Task) -> Arc<Task> {
        let task = Arc::new(task);
        if task.count() == 0 {
            task.complete();
            return task;
        }
        self.shared.lock().tasks.push_back(task.clone());
        self.shared.work_available.notify_all();
        task
    }

    /// Help execute queued subtasks until the task finishes.
    /// Falls back to blocking once nothing is left to claim.
    pub fn yield_until_done(&self, task: &Task) -> Result<(), TaskError> {
        while !task.is_done() {
            let work = claim_next(&mut self.shared.lock());
            match work {
                Some((other, index)) => other.run(index),
                None => return task.wait(),
            }
        }
        task.take_error()
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shared.lock().shutdown = true;
        self.shared.work_available.notify_all();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::warn!("worker thread panicked");
            }
        }
        debug!("stopped thread pool");
    }
}
