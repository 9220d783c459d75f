use std::fmt;
use std::rc::Rc;

use crate::identity::Callback;

/// A function handed to the wrapped component, usually as an event callback.
///
/// Cloning keeps the same underlying function; [`Handler::ptr_eq`] is the
/// identity the cache keeps stable across render passes.
pub struct Handler<A, R = ()> {
    func: Rc<dyn Fn(A) -> R>,
}

impl<A: 'static, R: 'static> Handler<A, R> {
    pub fn new(func: impl Fn(A) -> R + 'static) -> Self {
        Self {
            func: Rc::new(func),
        }
    }

    /// A handler that ignores its arguments. Every call allocates a new one.
    pub fn noop() -> Self
    where
        R: Default,
    {
        Self::new(|_| R::default())
    }

    pub fn call(&self, args: A) -> R {
        (self.func)(args)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.func, &other.func)
    }
}

impl<A, R> Clone for Handler<A, R> {
    fn clone(&self) -> Self {
        Self {
            func: Rc::clone(&self.func),
        }
    }
}

impl<A, R> fmt::Debug for Handler<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handler")
            .field(&Rc::as_ptr(&self.func).cast::<()>())
            .finish()
    }
}

/// Builds a handler that forwards to `callback(&params, args)`.
pub fn build_forward_handler<F, P, A, R>(callback: Callback<F>, params: P) -> Handler<A, R>
where
    F: Fn(&P, A) -> R + 'static,
    P: 'static,
    A: 'static,
    R: 'static,
{
    Handler::new(move |args| (callback.get())(&params, args))
}
