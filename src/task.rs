//! Unit of parallel work executed by the thread pool.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};

use crate::error::{Error, TaskError};

type Work = dyn Fn(usize) -> Result<(), Error> + Send + Sync;
type Finisher = Box<dyn FnOnce() + Send>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Fixed number of subtasks sharing one closure.
/// Subtasks are claimed through an atomic counter so every index runs at
/// most once. When the last subtask finishes, or an abort drops the
/// unclaimed ones, the finisher runs once and waiters are released.
pub struct Task {
    name: String,
    count: usize,
    work: Box<Work>,
    claimed: AtomicUsize,
    finished: AtomicUsize,
    aborted: AtomicBool,
    finisher: Mutex<Option<Finisher>>,
    error: Mutex<Option<TaskError>>,
    done: Mutex<bool>,
    done_cv: Condvar,
}

impl Task {
    pub fn new<F>(name: &str, count: usize, work: F) -> Task
    where
        F: Fn(usize) -> Result<(), Error> + Send + Sync + 'static,
    {
        Task {
            name: name.to_string(),
            count,
            work: Box::new(work),
            claimed: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
            aborted: AtomicBool::new(false),
            finisher: Mutex::new(None),
            error: Mutex::new(None),
            done: Mutex::new(false),
            done_cv: Condvar::new(),
        }
    }

    /// Callback fired exactly once when the task finishes
    pub fn with_finisher<F>(self, finisher: F) -> Task
    where
        F: FnOnce() + Send + 'static,
    {
        *lock(&self.finisher) = Some(Box::new(finisher));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn finished_count(&self) -> usize {
        self.finished.load(Ordering::Acquire)
    }

    /// Claim the next subtask index
    pub(crate) fn claim(&self) -> Option<usize> {
        let mut current = self.claimed.load(Ordering::Acquire);
        loop {
            if current >= self.count {
                return None;
            }
            match self.claimed.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(current),
                Err(actual) => current = actual,
            }
        }
    }

    /// Every subtask has been handed out
    pub(crate) fn is_exhausted(&self) -> bool {
        self.claimed.load(Ordering::Acquire) >= self.count
    }

    /// Run a claimed subtask and account for it
    pub(crate) fn run(&self, index: usize) {
        if !self.is_aborted() {
            let result = panic::catch_unwind(AssertUnwindSafe(|| (self.work)(index)));
            let failure = match result {
                Ok(Ok(())) => None,
                Ok(Err(err)) => Some(TaskError::Failed {
                    subtask: index,
                    message: err.to_string(),
                }),
                Err(payload) => Some(TaskError::Panicked {
                    subtask: index,
                    message: panic_message(payload.as_ref()),
                }),
            };
            if let Some(failure) = failure {
                warn!(task = %self.name, error = %failure, "subtask failed");
                let mut error = lock(&self.error);
                if error.is_none() {
                    *error = Some(failure);
                }
            }
        }
        self.finish(1);
    }

    fn finish(&self, n: usize) {
        if n == 0 {
            return;
        }
        let previous = self.finished.fetch_add(n, Ordering::AcqRel);
        if previous + n == self.count {
            self.complete();
        }
    }

    pub(crate) fn complete(&self) {
        let finisher = lock(&self.finisher).take();
        if let Some(finisher) = finisher {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(finisher)) {
                warn!(
                    task = %self.name,
                    message = %panic_message(payload.as_ref()),
                    "task finisher panicked"
                );
            }
        }
        *lock(&self.done) = true;
        self.done_cv.notify_all();
    }

    /// Drop every unclaimed subtask. Running subtasks finish normally.
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::Release);
        let previous = self.claimed.swap(self.count, Ordering::AcqRel);
        let dropped = self.count.saturating_sub(previous);
        if dropped > 0 {
            info!(task = %self.name, dropped, "task aborted");
        }
        self.finish(dropped);
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }

    pub fn is_done(&self) -> bool {
        *lock(&self.done)
    }

    /// Block until the task finishes. The first subtask error is returned
    /// to exactly one caller.
    pub fn wait(&self) -> Result<(), TaskError> {
        let mut done = lock(&self.done);
        while !*done {
            done = self
                .done_cv
                .wait(done)
                .unwrap_or_else(PoisonError::into_inner);
        }
        drop(done);
        self.take_error()
    }

    pub(crate) fn take_error(&self) -> Result<(), TaskError> {
        match lock(&self.error).take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("count", &self.count)
            .field("claimed", &self.claimed.load(Ordering::Relaxed))
            .field("finished", &self.finished.load(Ordering::Relaxed))
            .field("aborted", &self.is_aborted())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn claims_never_exceed_count() {
        let task = Task::new("claims", 3, |_| Ok(()));
        assert_eq!(task.claim(), Some(0));
        assert_eq!(task.claim(), Some(1));
        assert_eq!(task.claim(), Some(2));
        assert_eq!(task.claim(), None);
        assert!(task.is_exhausted());
    }

    #[test]
    fn finisher_fires_after_last_subtask() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let task = Task::new("finisher", 2, |_| Ok(())).with_finisher(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let i = task.claim().unwrap();
        task.run(i);
        assert!(!task.is_done());
        let i = task.claim().unwrap();
        task.run(i);
        assert!(task.is_done());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(task.wait().is_ok());
    }

    #[test]
    fn error_is_reported_once() {
        let task = Task::new("failing", 2, |i| {
            if i == 1 {
                Err(Error::InvalidConfig("bad tile".to_string()))
            } else {
                Ok(())
            }
        });
        while let Some(i) = task.claim() {
            task.run(i);
        }
        match task.wait() {
            Err(TaskError::Failed { subtask, message }) => {
                assert_eq!(subtask, 1);
                assert!(message.contains("bad tile"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(task.wait().is_ok());
    }

    #[test]
    fn panics_become_errors() {
        let task = Task::new("panicking", 1, |_| panic!("boom"));
        let i = task.claim().unwrap();
        task.run(i);
        assert_eq!(
            task.wait(),
            Err(TaskError::Panicked {
                subtask: 0,
                message: "boom".to_string()
            })
        );
    }

    #[test]
    fn abort_releases_waiters_without_running() {
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = ran.clone();
        let task = Task::new("aborted", 5, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        task.abort();
        assert!(task.is_done());
        assert_eq!(task.claim(), None);
        assert!(task.wait().is_ok());
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        // A second abort changes nothing
        task.abort();
        assert_eq!(task.finished_count(), 5);
    }
}
