//! Memoization of derived handlers for one component instance.
//!
//! Entries are keyed by content: the handler kind, the callback's code
//! identity and the serialized bound parameters. A hit is only served when
//! the stored source callback is the same reference as the one presented
//! now; otherwise the handler is rebuilt in place so it never calls a stale
//! callback.

use std::any::{type_name, Any};
use std::fmt;

use serde::Serialize;

use crate::collections::map::{Entry, HashMap};
use crate::error::HandlerError;
use crate::handler::Handler;
use crate::identity::{Callback, IdentitySerializer, SourceRef, StableSerializer};

/// Factory family a handler belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    Forward,
    Update,
}

impl HandlerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            HandlerKind::Forward => "forward",
            HandlerKind::Update => "update",
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite content key of a cached handler.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    kind: HandlerKind,
    function: String,
    params: String,
}

impl CacheKey {
    pub fn new(kind: HandlerKind, function: String, params: String) -> Self {
        Self {
            kind,
            function,
            params,
        }
    }

    pub fn kind(&self) -> HandlerKind {
        self.kind
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.kind, self.function, self.params)
    }
}

struct CacheEntry {
    source: SourceRef,
    handler: Box<dyn Any>,
}

impl CacheEntry {
    fn new<A: 'static, R: 'static>(source: SourceRef, handler: &Handler<A, R>) -> Self {
        Self {
            source,
            handler: Box::new(handler.clone()),
        }
    }
}

/// Per-instance handler cache. `None` entries mean the owner was torn down.
pub struct HandlerCache<S = StableSerializer> {
    serializer: S,
    entries: Option<HashMap<CacheKey, CacheEntry>>,
    diagnostics: bool,
}

impl HandlerCache<StableSerializer> {
    pub fn new() -> Self {
        Self::with_serializer(StableSerializer)
    }
}

impl Default for HandlerCache<StableSerializer> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: IdentitySerializer> HandlerCache<S> {
    pub fn with_serializer(serializer: S) -> Self {
        Self {
            serializer,
            entries: Some(HashMap::default()),
            diagnostics: cfg!(debug_assertions),
        }
    }

    /// Enables or silences the unnamed-callback warning.
    pub fn set_diagnostics(&mut self, enabled: bool) {
        self.diagnostics = enabled;
    }

    /// Computes the key `callback` and `params` would be cached under.
    pub fn key_for<F: 'static, P: Serialize>(
        &self,
        kind: HandlerKind,
        callback: &Callback<F>,
        params: &P,
    ) -> Result<CacheKey, HandlerError> {
        let function = self.serializer.stringify_function(callback.identity());
        let params = self
            .serializer
            .stringify(params)
            .map_err(|err| HandlerError::Unkeyable {
                kind,
                reason: err.to_string(),
            })?;
        Ok(CacheKey::new(
            kind,
            function,
            format!("{}={params}", type_name::<P>()),
        ))
    }

    /// Returns a handler for `callback`, reusing the cached one when safe.
    ///
    /// Unnamed callbacks and calls after teardown yield a fresh no-op handler
    /// and leave the cache untouched. Parameters that cannot be keyed yield a
    /// working handler that is not cached.
    pub fn get_or_build<F, P, A, R>(
        &mut self,
        kind: HandlerKind,
        callback: &Callback<F>,
        params: P,
        builder: impl FnOnce(Callback<F>, P) -> Handler<A, R>,
    ) -> Handler<A, R>
    where
        F: 'static,
        P: Serialize,
        A: 'static,
        R: Default + 'static,
    {
        match self.prepare(kind, callback, &params) {
            Ok(key) => self.resolve(key, callback, params, builder),
            Err(err @ HandlerError::AnonymousCallback { .. }) => {
                if self.diagnostics {
                    log::warn!("{err}");
                }
                Handler::noop()
            }
            Err(err @ HandlerError::Unkeyable { .. }) => {
                log::warn!("{err}; building an uncached handler");
                builder(callback.clone(), params)
            }
            Err(err @ HandlerError::Disposed { .. }) => {
                log::error!("{err}");
                Handler::noop()
            }
        }
    }

    /// Like [`get_or_build`](Self::get_or_build) but reports every refusal.
    pub fn try_get_or_build<F, P, A, R>(
        &mut self,
        kind: HandlerKind,
        callback: &Callback<F>,
        params: P,
        builder: impl FnOnce(Callback<F>, P) -> Handler<A, R>,
    ) -> Result<Handler<A, R>, HandlerError>
    where
        F: 'static,
        P: Serialize,
        A: 'static,
        R: 'static,
    {
        let key = self.prepare(kind, callback, &params)?;
        Ok(self.resolve(key, callback, params, builder))
    }

    fn prepare<F: 'static, P: Serialize>(
        &self,
        kind: HandlerKind,
        callback: &Callback<F>,
        params: &P,
    ) -> Result<CacheKey, HandlerError> {
        if self.entries.is_none() {
            return Err(HandlerError::Disposed { kind });
        }
        if !callback.is_named() {
            return Err(HandlerError::AnonymousCallback {
                kind,
                shape: callback.identity().shape(),
            });
        }
        self.key_for(kind, callback, params)
    }

    fn resolve<F, P, A, R>(
        &mut self,
        key: CacheKey,
        callback: &Callback<F>,
        params: P,
        builder: impl FnOnce(Callback<F>, P) -> Handler<A, R>,
    ) -> Handler<A, R>
    where
        F: 'static,
        A: 'static,
        R: 'static,
    {
        let Some(entries) = self.entries.as_mut() else {
            return builder(callback.clone(), params);
        };
        let source = callback.source_ref();
        match entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get();
                if entry.source.same_as(&source) {
                    if let Some(handler) = entry.handler.downcast_ref::<Handler<A, R>>() {
                        log::trace!("handler cache hit: {}", occupied.key());
                        return handler.clone();
                    }
                }
                log::trace!("handler cache rebuild: {}", occupied.key());
                let handler = builder(callback.clone(), params);
                occupied.insert(CacheEntry::new(source, &handler));
                handler
            }
            Entry::Vacant(vacant) => {
                log::trace!("handler cache miss: {}", vacant.key());
                let handler = builder(callback.clone(), params);
                vacant.insert(CacheEntry::new(source, &handler));
                handler
            }
        }
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries
            .as_ref()
            .map(|entries| entries.contains_key(key))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_disposed(&self) -> bool {
        self.entries.is_none()
    }

    /// Releases every entry. The cache serves no handler afterwards.
    pub fn dispose(&mut self) {
        if let Some(entries) = self.entries.take() {
            log::debug!("handler cache disposed with {} entries", entries.len());
        }
    }
}

#[cfg(test)]
#[path = "tests/handler_cache_tests.rs"]
mod tests;
