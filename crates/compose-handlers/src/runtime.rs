use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::mem;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use crate::error::{CommitError, StateError};
use crate::platform::RuntimeScheduler;

pub(crate) type CommitTask = Box<dyn FnOnce() -> Result<(), StateError> + 'static>;

struct RuntimeInner {
    scheduler: Arc<dyn RuntimeScheduler>,
    needs_render: Cell<bool>,
    commits: RefCell<VecDeque<CommitTask>>,
}

impl RuntimeInner {
    fn new(scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        Self {
            scheduler,
            needs_render: Cell::new(false),
            commits: RefCell::new(VecDeque::new()),
        }
    }

    fn enqueue_commit(&self, task: CommitTask) {
        self.commits.borrow_mut().push_back(task);
        self.scheduler.schedule_commit();
    }

    fn pending_commits(&self) -> usize {
        self.commits.borrow().len()
    }

    fn drain_commits(&self) -> Result<usize, CommitError> {
        // Commits queued by completion hooks belong to the next batch.
        let batch = self.pending_commits();
        let mut applied = 0;
        for index in 0..batch {
            // The borrow must end before the task runs so it can enqueue more work.
            let next = self.commits.borrow_mut().pop_front();
            let Some(task) = next else {
                break;
            };
            let guard = RescheduleOnUnwind { inner: self };
            let result = task();
            mem::forget(guard);
            if let Err(source) = result {
                self.reschedule_leftovers();
                return Err(CommitError { index, source });
            }
            applied += 1;
            self.needs_render.set(true);
        }
        Ok(applied)
    }

    fn reschedule_leftovers(&self) {
        if self.pending_commits() > 0 {
            self.scheduler.schedule_commit();
        }
    }
}

// Dropped only when a commit panics; the commits behind it still need a batch.
struct RescheduleOnUnwind<'a> {
    inner: &'a RuntimeInner,
}

impl Drop for RescheduleOnUnwind<'_> {
    fn drop(&mut self) {
        self.inner.reschedule_leftovers();
    }
}

/// Owner of the commit queue shared by every component created against it.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    pub fn new(scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        Self {
            inner: Rc::new(RuntimeInner::new(scheduler)),
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle(Rc::downgrade(&self.inner))
    }

    /// Apply every commit queued before this call, in request order.
    ///
    /// Stops at the first failing commit and reports it; the commits behind it
    /// stay queued and a new batch is scheduled for them.
    pub fn drain_commits(&self) -> Result<usize, CommitError> {
        self.inner.drain_commits()
    }

    pub fn pending_commits(&self) -> usize {
        self.inner.pending_commits()
    }

    /// Returns whether a commit was applied since the last call.
    pub fn take_render_request(&self) -> bool {
        self.inner.needs_render.replace(false)
    }
}

#[derive(Default)]
pub struct DefaultScheduler;

impl RuntimeScheduler for DefaultScheduler {
    fn schedule_commit(&self) {}
}

#[cfg(test)]
#[derive(Default)]
pub struct TestScheduler {
    requests: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl TestScheduler {
    pub fn requests(&self) -> usize {
        self.requests.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl RuntimeScheduler for TestScheduler {
    fn schedule_commit(&self) {
        self.requests
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
}

#[derive(Clone)]
pub struct RuntimeHandle(pub(crate) Weak<RuntimeInner>);

impl RuntimeHandle {
    /// Queue a commit. Without a live runtime there is nothing to defer to, so
    /// the commit runs immediately and a failure is only logged.
    pub(crate) fn enqueue_commit(&self, task: CommitTask) {
        if let Some(inner) = self.0.upgrade() {
            inner.enqueue_commit(task);
        } else if let Err(err) = task() {
            log::error!("commit without runtime failed: {err}");
        }
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }

    pub fn pending_commits(&self) -> usize {
        self.0
            .upgrade()
            .map(|inner| inner.pending_commits())
            .unwrap_or(0)
    }

    pub fn drain_commits(&self) -> Result<usize, CommitError> {
        self.0
            .upgrade()
            .map(|inner| inner.drain_commits())
            .unwrap_or(Ok(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateMode;

    fn runtime() -> (Runtime, Arc<TestScheduler>) {
        let scheduler = Arc::new(TestScheduler::default());
        (Runtime::new(scheduler.clone()), scheduler)
    }

    #[test]
    fn commits_apply_in_request_order() {
        let (runtime, scheduler) = runtime();
        let log = Rc::new(RefCell::new(Vec::new()));
        for n in 0..3 {
            let log = Rc::clone(&log);
            runtime.handle().enqueue_commit(Box::new(move || {
                log.borrow_mut().push(n);
                Ok(())
            }));
        }
        assert_eq!(scheduler.requests(), 3);
        assert!(log.borrow().is_empty());

        assert_eq!(runtime.drain_commits(), Ok(3));
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
        assert!(runtime.take_render_request());
        assert!(!runtime.take_render_request());
    }

    #[test]
    fn commits_queued_while_draining_wait_for_next_batch() {
        let (runtime, _) = runtime();
        let handle = runtime.handle();
        let inner_handle = handle.clone();
        handle.enqueue_commit(Box::new(move || {
            inner_handle.enqueue_commit(Box::new(|| Ok(())));
            Ok(())
        }));

        assert_eq!(runtime.drain_commits(), Ok(1));
        assert_eq!(runtime.pending_commits(), 1);
        assert_eq!(runtime.drain_commits(), Ok(1));
    }

    #[test]
    fn failing_commit_keeps_the_rest_queued() {
        let (runtime, scheduler) = runtime();
        let handle = runtime.handle();
        handle.enqueue_commit(Box::new(|| Ok(())));
        handle.enqueue_commit(Box::new(|| {
            Err(StateError::ShapeMismatch {
                mode: StateMode::Structured,
                found: "number",
            })
        }));
        handle.enqueue_commit(Box::new(|| Ok(())));

        let err = runtime.drain_commits().unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(runtime.pending_commits(), 1);
        assert_eq!(scheduler.requests(), 4);
        assert_eq!(runtime.drain_commits(), Ok(1));
    }

    #[test]
    fn panicking_commit_schedules_the_rest() {
        let (runtime, scheduler) = runtime();
        let handle = runtime.handle();
        handle.enqueue_commit(Box::new(|| panic!("transition blew up")));
        handle.enqueue_commit(Box::new(|| Ok(())));
        assert_eq!(scheduler.requests(), 2);

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            runtime.drain_commits()
        }));

        assert!(outcome.is_err());
        assert_eq!(runtime.pending_commits(), 1);
        assert_eq!(scheduler.requests(), 3);
        assert_eq!(runtime.drain_commits(), Ok(1));
    }

    #[test]
    fn dead_runtime_runs_commit_inline() {
        let (runtime, _) = runtime();
        let handle = runtime.handle();
        drop(runtime);
        let ran = Rc::new(Cell::new(false));
        let flag = Rc::clone(&ran);
        handle.enqueue_commit(Box::new(move || {
            flag.set(true);
            Ok(())
        }));
        assert!(ran.get());
        assert!(!handle.is_alive());
        assert_eq!(handle.drain_commits(), Ok(0));
    }
}
