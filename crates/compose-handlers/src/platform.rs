//! Platform abstraction for the commit layer.
//!
//! Update handlers never apply state directly. They queue a commit on the
//! [`Runtime`](crate::Runtime), which asks the host to run the batch through
//! this trait. The host then calls [`Runtime::drain_commits`](crate::Runtime::drain_commits)
//! on its own schedule.

/// Schedules commit batches on behalf of the runtime.
pub trait RuntimeScheduler: Send + Sync {
    /// Request that the host drain the pending commit batch soon.
    fn schedule_commit(&self);
}
