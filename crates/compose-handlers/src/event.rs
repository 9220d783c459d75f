//! Pool-recycled event arguments crossing the deferred commit boundary.
//!
//! Hosts that recycle event objects hand them to handlers wrapped in `Rc`.
//! An update handler persists the first such argument before queuing its
//! commit and releases it once the commit has been applied.

use std::fmt;
use std::rc::Rc;

use serde_json::Value;

/// An event object owned by a reuse pool.
pub trait PooledEvent {
    /// Removes the event from its pool so it stays valid after dispatch.
    fn persist(&self);

    /// Returns the event to its pool. Events without a destructor keep the
    /// default no-op.
    fn release(&self) {}
}

/// A single call-time argument of an update handler.
pub trait CallArg {
    /// The pooled event behind this argument, if it is one.
    fn as_pooled(&self) -> Option<Rc<dyn PooledEvent>> {
        None
    }
}

impl<E: PooledEvent + 'static> CallArg for Rc<E> {
    fn as_pooled(&self) -> Option<Rc<dyn PooledEvent>> {
        Some(Rc::clone(self) as Rc<dyn PooledEvent>)
    }
}

impl<T: CallArg> CallArg for Option<T> {
    fn as_pooled(&self) -> Option<Rc<dyn PooledEvent>> {
        self.as_ref().and_then(CallArg::as_pooled)
    }
}

macro_rules! plain_call_args {
    ($($ty:ty),* $(,)?) => {
        $(impl CallArg for $ty {})*
    };
}

plain_call_args!(
    bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64,
    String, &'static str, Value,
);

impl<T> CallArg for Vec<T> {}

/// The full call-time argument list of an update handler.
pub trait CallArgs {
    /// First pooled event among the arguments, scanned in order.
    fn first_pooled(&self) -> Option<Rc<dyn PooledEvent>>;
}

impl CallArgs for () {
    fn first_pooled(&self) -> Option<Rc<dyn PooledEvent>> {
        None
    }
}

macro_rules! tuple_call_args {
    ($($name:ident),+) => {
        impl<$($name: CallArg),+> CallArgs for ($($name,)+) {
            #[allow(non_snake_case)]
            fn first_pooled(&self) -> Option<Rc<dyn PooledEvent>> {
                let ($($name,)+) = self;
                None$(.or_else(|| $name.as_pooled()))+
            }
        }
    };
}

tuple_call_args!(A);
tuple_call_args!(A, B);
tuple_call_args!(A, B, C);
tuple_call_args!(A, B, C, D);
tuple_call_args!(A, B, C, D, E);
tuple_call_args!(A, B, C, D, E, F);

/// The pooled event retained by one update invocation.
///
/// Releasing takes the event out, so the destructor runs at most once; a
/// persisted event that is dropped unreleased is released then.
pub struct PersistedEvent {
    event: Option<Rc<dyn PooledEvent>>,
}

impl PersistedEvent {
    pub fn is_released(&self) -> bool {
        self.event.is_none()
    }

    pub fn release(&mut self) {
        if let Some(event) = self.event.take() {
            event.release();
        }
    }
}

impl Drop for PersistedEvent {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for PersistedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistedEvent")
            .field("released", &self.is_released())
            .finish()
    }
}

/// Persists the first pooled argument, if any, and keeps it for release.
pub fn try_persist<A: CallArgs + ?Sized>(args: &A) -> Option<PersistedEvent> {
    let event = args.first_pooled()?;
    event.persist();
    Some(PersistedEvent { event: Some(event) })
}

/// Releases `event` if one was persisted. Safe to call more than once.
pub fn release(event: Option<&mut PersistedEvent>) {
    if let Some(event) = event {
        event.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Recorder {
        name: &'static str,
        journal: Rc<RefCell<Vec<String>>>,
    }

    impl PooledEvent for Recorder {
        fn persist(&self) {
            self.journal.borrow_mut().push(format!("persist {}", self.name));
        }

        fn release(&self) {
            self.journal.borrow_mut().push(format!("release {}", self.name));
        }
    }

    struct PersistOnly;

    impl PooledEvent for PersistOnly {
        fn persist(&self) {}
    }

    fn recorder(name: &'static str, journal: &Rc<RefCell<Vec<String>>>) -> Rc<Recorder> {
        Rc::new(Recorder {
            name,
            journal: Rc::clone(journal),
        })
    }

    #[test]
    fn first_pooled_argument_wins() {
        let journal = Rc::new(RefCell::new(Vec::new()));
        let args = (7u32, recorder("a", &journal), recorder("b", &journal));

        let mut event = try_persist(&args).expect("pooled argument");
        assert_eq!(*journal.borrow(), vec!["persist a"]);

        event.release();
        event.release();
        assert!(event.is_released());
        assert_eq!(*journal.borrow(), vec!["persist a", "release a"]);
    }

    #[test]
    fn plain_arguments_persist_nothing() {
        assert!(try_persist(&()).is_none());
        assert!(try_persist(&(1u8, "x", None::<Rc<PersistOnly>>)).is_none());
        release(None);
    }

    #[test]
    fn optional_events_are_found() {
        let journal = Rc::new(RefCell::new(Vec::new()));
        let args = (Some(recorder("opt", &journal)),);
        assert!(try_persist(&args).is_some());
        assert_eq!(journal.borrow()[0], "persist opt");
    }

    #[test]
    fn dropping_an_unreleased_event_releases_it() {
        let journal = Rc::new(RefCell::new(Vec::new()));
        let event = try_persist(&(recorder("d", &journal),));
        drop(event);
        assert_eq!(*journal.borrow(), vec!["persist d", "release d"]);
    }

    #[test]
    fn missing_destructor_is_a_no_op() {
        let mut event = try_persist(&(Rc::new(PersistOnly),)).expect("pooled argument");
        release(Some(&mut event));
        assert!(event.is_released());
    }
}
