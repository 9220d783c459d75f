//! Standard commit scheduling backed by Rust's `std` library.
//!
//! This crate provides a concrete [`RuntimeScheduler`] for
//! `compose-handlers`. Hosts construct a [`StdRuntime`], mount components
//! against it and call [`StdRuntime::pump`] from their event loop.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use compose_handlers::{
    CommitError, InitialState, Runtime, RuntimeHandle, RuntimeScheduler, StatefulComponent, Value,
};

type Waker = Box<dyn Fn() + Send + Sync + 'static>;

/// Counts commit requests between pumps and pings the host loop for each one.
#[derive(Default)]
pub struct StdScheduler {
    pending_requests: AtomicUsize,
    waker: OnceLock<Waker>,
}

impl StdScheduler {
    /// Consumes every request made since the last call; true if there was any.
    pub fn take_commit_request(&self) -> bool {
        self.pending_requests.swap(0, Ordering::AcqRel) > 0
    }

    /// Requests made since the last [`take_commit_request`](Self::take_commit_request).
    pub fn requests(&self) -> usize {
        self.pending_requests.load(Ordering::Acquire)
    }

    /// Installs the host wake-up hook. Only the first hook is kept; returns
    /// false if one was already installed.
    pub fn set_commit_waker(&self, waker: impl Fn() + Send + Sync + 'static) -> bool {
        self.waker.set(Box::new(waker)).is_ok()
    }
}

impl fmt::Debug for StdScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdScheduler")
            .field("requests", &self.requests())
            .field("has_waker", &self.waker.get().is_some())
            .finish()
    }
}

impl RuntimeScheduler for StdScheduler {
    fn schedule_commit(&self) {
        let pending = self.pending_requests.fetch_add(1, Ordering::AcqRel) + 1;
        log::trace!("commit requested ({pending} pending)");
        if let Some(waker) = self.waker.get() {
            waker();
        }
    }
}

/// Convenience container bundling the standard scheduler and a runtime.
#[derive(Clone)]
pub struct StdRuntime {
    scheduler: Arc<StdScheduler>,
    runtime: Runtime,
}

impl StdRuntime {
    pub fn new() -> Self {
        let scheduler = Arc::new(StdScheduler::default());
        let runtime = Runtime::new(scheduler.clone());
        Self { scheduler, runtime }
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.handle()
    }

    pub fn scheduler(&self) -> Arc<StdScheduler> {
        Arc::clone(&self.scheduler)
    }

    /// Mounts a component whose commits run on this runtime.
    pub fn mount(&self, initial: impl Into<InitialState>, props: &Value) -> StatefulComponent {
        StatefulComponent::with_props(self.runtime_handle(), initial, props)
    }

    /// Installs the hook called when a handler queues a commit; see
    /// [`StdScheduler::set_commit_waker`].
    pub fn set_commit_waker(&self, waker: impl Fn() + Send + Sync + 'static) -> bool {
        self.scheduler.set_commit_waker(waker)
    }

    /// Drains the pending commit batch if one was requested.
    ///
    /// Returns the number of applied commits. A failed commit is logged and
    /// returned; the commits behind it are requested again.
    pub fn pump(&self) -> Result<usize, CommitError> {
        if !self.scheduler.take_commit_request() {
            return Ok(0);
        }
        self.runtime.drain_commits().inspect_err(|err| {
            log::error!("commit batch failed: {err}");
        })
    }

    /// Returns whether applied commits are waiting for a re-render.
    pub fn take_render_request(&self) -> bool {
        self.runtime.take_render_request()
    }
}

impl fmt::Debug for StdRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdRuntime")
            .field("scheduler", &self.scheduler)
            .field("pending_commits", &self.runtime.pending_commits())
            .finish()
    }
}

impl Default for StdRuntime {
    fn default() -> Self {
        Self::new()
    }
}
