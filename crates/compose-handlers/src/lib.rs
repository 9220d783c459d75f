#![doc = r"Stateful components with memoized forward and update handlers for Compose-RS."]

pub mod collections;
pub mod component;
pub mod error;
pub mod event;
pub mod handler;
pub mod handler_cache;
pub mod hash;
pub mod identity;
pub mod platform;
pub mod runtime;
pub mod state;
pub mod update;

pub use component::{ComponentOptions, HandlerScope, StatefulComponent};
pub use error::{CommitError, HandlerError, StateError};
pub use event::{release, try_persist, CallArg, CallArgs, PersistedEvent, PooledEvent};
pub use handler::{build_forward_handler, Handler};
pub use handler_cache::{CacheKey, HandlerCache, HandlerKind};
pub use identity::{Callback, CallbackIdentity, IdentitySerializer, StableSerializer};
pub use platform::RuntimeScheduler;
pub use runtime::{DefaultScheduler, Runtime, RuntimeHandle};
pub use state::{InitialState, StateContainer, StateMode, StateValue};
pub use update::build_update_handler;

pub use serde_json::Value;

#[cfg(test)]
pub use runtime::TestScheduler;
