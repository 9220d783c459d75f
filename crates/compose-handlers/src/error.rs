use std::fmt;

use crate::handler_cache::HandlerKind;
use crate::state::StateMode;

/// Reasons a handler request could not be served from the cache.
///
/// Every variant is recovered locally: the caller still receives a usable
/// handler (a no-op or an uncached one).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// The source callback carries no name, so it cannot be keyed safely.
    AnonymousCallback { kind: HandlerKind, shape: &'static str },
    /// The bound parameters could not be turned into a stable key.
    Unkeyable { kind: HandlerKind, reason: String },
    /// The owning component has already been torn down.
    Disposed { kind: HandlerKind },
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::AnonymousCallback { kind, shape } => write!(
                f,
                "{kind} handler requested for an unnamed callback ({shape}); name it to enable reuse"
            ),
            HandlerError::Unkeyable { kind, reason } => {
                write!(f, "{kind} handler parameters cannot be keyed: {reason}")
            }
            HandlerError::Disposed { kind } => {
                write!(f, "{kind} handler requested after component teardown")
            }
        }
    }
}

impl std::error::Error for HandlerError {}

/// Failures while applying a transition result to a state container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    ShapeMismatch {
        mode: StateMode,
        found: &'static str,
    },
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateError::ShapeMismatch { mode, found } => {
                write!(f, "{mode} state cannot accept a {found} update")
            }
        }
    }
}

impl std::error::Error for StateError {}

/// A queued commit that failed while the host drained the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitError {
    /// Position of the failing commit within the drained batch.
    pub index: usize,
    pub source: StateError,
}

impl fmt::Display for CommitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "commit #{} failed: {}", self.index, self.source)
    }
}

impl std::error::Error for CommitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}
