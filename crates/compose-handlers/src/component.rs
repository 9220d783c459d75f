//! A stateful component with memoized `handle` / `update` factories.

use serde::Serialize;
use serde_json::Value;
use std::cell::RefCell;
use std::fmt;

use crate::error::HandlerError;
use crate::event::CallArgs;
use crate::handler::{build_forward_handler, Handler};
use crate::handler_cache::{HandlerCache, HandlerKind};
use crate::identity::Callback;
use crate::runtime::RuntimeHandle;
use crate::state::{InitialState, StateContainer};
use crate::update::build_update_handler;

#[derive(Debug, Clone, Copy)]
pub struct ComponentOptions {
    /// Warn when a handler is requested for an unnamed callback.
    /// Defaults to on in debug builds only.
    pub diagnostics: bool,
}

impl Default for ComponentOptions {
    fn default() -> Self {
        Self {
            diagnostics: cfg!(debug_assertions),
        }
    }
}

/// State plus the per-instance handler cache of one mounted component.
///
/// The cache is released by [`dispose`](Self::dispose), which also runs on
/// drop. Handlers handed out earlier stay callable.
pub struct StatefulComponent {
    state: StateContainer,
    cache: RefCell<HandlerCache>,
}

impl StatefulComponent {
    pub fn new(runtime: RuntimeHandle, initial: impl Into<InitialState>) -> Self {
        Self::with_props(runtime, initial, &Value::Null)
    }

    /// Builds the component, running an initial-state factory once with `props`.
    pub fn with_props(
        runtime: RuntimeHandle,
        initial: impl Into<InitialState>,
        props: &Value,
    ) -> Self {
        Self::with_options(runtime, initial, props, ComponentOptions::default())
    }

    pub fn with_options(
        runtime: RuntimeHandle,
        initial: impl Into<InitialState>,
        props: &Value,
        options: ComponentOptions,
    ) -> Self {
        let initial = initial.into().resolve(props);
        let mut cache = HandlerCache::new();
        cache.set_diagnostics(options.diagnostics);
        Self {
            state: StateContainer::new(initial, runtime),
            cache: RefCell::new(cache),
        }
    }

    /// Runs one render pass with the injected capabilities.
    pub fn render<R>(&self, content: impl FnOnce(&HandlerScope<'_>) -> R) -> R {
        content(&HandlerScope { component: self })
    }

    pub fn state(&self) -> Value {
        self.state.get()
    }

    pub fn state_container(&self) -> &StateContainer {
        &self.state
    }

    pub fn cached_handlers(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn is_disposed(&self) -> bool {
        self.cache.borrow().is_disposed()
    }

    /// Teardown hook. Only the first call has an effect.
    pub fn dispose(&self) {
        let mut cache = self.cache.borrow_mut();
        if cache.is_disposed() {
            return;
        }
        cache.dispose();
    }
}

impl Drop for StatefulComponent {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for StatefulComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatefulComponent")
            .field("state", &self.state)
            .field("cached_handlers", &self.cached_handlers())
            .finish()
    }
}

/// Capabilities handed to a render pass: `state`, `handle` and `update`.
pub struct HandlerScope<'a> {
    component: &'a StatefulComponent,
}

impl HandlerScope<'_> {
    /// The current logical state.
    pub fn state(&self) -> Value {
        self.component.state()
    }

    /// A handler forwarding `callback(&params, args)`, stable across renders.
    ///
    /// A refused request falls back to a no-op handler, which is why `R` must
    /// have a default. Use [`try_handle`](Self::try_handle) for other returns.
    pub fn handle<F, P, A, R>(&self, callback: &Callback<F>, params: P) -> Handler<A, R>
    where
        F: Fn(&P, A) -> R + 'static,
        P: Serialize + 'static,
        A: 'static,
        R: Default + 'static,
    {
        self.component.cache.borrow_mut().get_or_build(
            HandlerKind::Forward,
            callback,
            params,
            build_forward_handler,
        )
    }

    /// Like [`handle`](Self::handle) but reports a refusal instead of
    /// substituting a no-op, so any return type works.
    pub fn try_handle<F, P, A, R>(
        &self,
        callback: &Callback<F>,
        params: P,
    ) -> Result<Handler<A, R>, HandlerError>
    where
        F: Fn(&P, A) -> R + 'static,
        P: Serialize + 'static,
        A: 'static,
        R: 'static,
    {
        self.component.cache.borrow_mut().try_get_or_build(
            HandlerKind::Forward,
            callback,
            params,
            build_forward_handler,
        )
    }

    /// A handler committing `callback(&state, &params, &args)` into state.
    pub fn update<F, P, A>(&self, callback: &Callback<F>, params: P) -> Handler<A>
    where
        F: Fn(&Value, &P, &A) -> Value + 'static,
        P: Serialize + 'static,
        A: CallArgs + 'static,
    {
        let builder = build_update_handler(self.component.state.clone());
        self.component
            .cache
            .borrow_mut()
            .get_or_build(HandlerKind::Update, callback, params, builder)
    }
}

#[cfg(test)]
#[path = "tests/component_tests.rs"]
mod tests;
