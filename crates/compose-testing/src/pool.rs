//! A recycling event pool, standing in for hosts that reuse event objects.
//!
//! Events dispatched through [`TestEventPool::dispatch`] are wiped and put
//! back into the pool as soon as dispatch returns, unless a handler
//! persisted them. Persisted events go back only when released.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use compose_handlers::PooledEvent;

/// Ordered log shared by events and test callbacks.
#[derive(Clone, Default)]
pub struct CallJournal {
    entries: Rc<RefCell<Vec<String>>>,
}

impl CallJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.entries.borrow_mut().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.borrow().clone()
    }

    /// Index of the first entry equal to `entry`.
    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries.borrow().iter().position(|e| e == entry)
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries.borrow().iter().filter(|e| *e == entry).count()
    }
}

/// A pointer click owned by a [`TestEventPool`].
pub struct PooledClick {
    id: usize,
    position: Cell<Option<(i32, i32)>>,
    persisted: Cell<bool>,
    releases: Cell<usize>,
    pool: Weak<PoolInner>,
}

impl PooledClick {
    pub fn id(&self) -> usize {
        self.id
    }

    /// The click position, or `None` once the event was recycled.
    pub fn position(&self) -> Option<(i32, i32)> {
        self.position.get()
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted.get()
    }

    pub fn releases(&self) -> usize {
        self.releases.get()
    }

    fn recycle(&self) {
        self.position.set(None);
        self.persisted.set(false);
    }
}

impl PooledEvent for PooledClick {
    fn persist(&self) {
        self.persisted.set(true);
        if let Some(pool) = self.pool.upgrade() {
            pool.journal.record(format!("persist #{}", self.id));
        }
    }

    fn release(&self) {
        self.releases.set(self.releases.get() + 1);
        if let Some(pool) = self.pool.upgrade() {
            pool.journal.record(format!("release #{}", self.id));
            pool.give_back(self.id);
        }
    }
}

struct PoolInner {
    journal: CallJournal,
    events: RefCell<Vec<Rc<PooledClick>>>,
    free: RefCell<Vec<usize>>,
}

impl PoolInner {
    fn give_back(&self, id: usize) {
        if let Some(event) = self.events.borrow().get(id) {
            event.recycle();
        }
        let mut free = self.free.borrow_mut();
        if !free.contains(&id) {
            free.push(id);
        }
    }
}

pub struct TestEventPool {
    inner: Rc<PoolInner>,
}

impl TestEventPool {
    pub fn new(journal: CallJournal) -> Self {
        Self {
            inner: Rc::new(PoolInner {
                journal,
                events: RefCell::new(Vec::new()),
                free: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn journal(&self) -> &CallJournal {
        &self.inner.journal
    }

    /// Number of events sitting in the pool, ready for reuse.
    pub fn available(&self) -> usize {
        self.inner.free.borrow().len()
    }

    /// Dispatches a click at `(x, y)` to `listener`, then recycles the event
    /// unless the listener persisted it.
    pub fn dispatch<R>(&self, x: i32, y: i32, listener: impl FnOnce(Rc<PooledClick>) -> R) -> R {
        let event = self.acquire();
        event.position.set(Some((x, y)));
        let result = listener(Rc::clone(&event));
        if !event.is_persisted() {
            self.inner.give_back(event.id);
        }
        result
    }

    fn acquire(&self) -> Rc<PooledClick> {
        let reused = self.inner.free.borrow_mut().pop();
        if let Some(id) = reused {
            return Rc::clone(&self.inner.events.borrow()[id]);
        }
        let mut events = self.inner.events.borrow_mut();
        let event = Rc::new(PooledClick {
            id: events.len(),
            position: Cell::new(None),
            persisted: Cell::new(false),
            releases: Cell::new(0),
            pool: Rc::downgrade(&self.inner),
        });
        events.push(Rc::clone(&event));
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpersisted_events_are_recycled_after_dispatch() {
        let pool = TestEventPool::new(CallJournal::new());
        let kept = pool.dispatch(1, 2, |event| {
            assert_eq!(event.position(), Some((1, 2)));
            event
        });
        assert_eq!(kept.position(), None);
        assert_eq!(pool.available(), 1);

        let reused = pool.dispatch(3, 4, |event| event.id());
        assert_eq!(reused, kept.id());
    }

    #[test]
    fn persisted_events_stay_valid_until_released() {
        let pool = TestEventPool::new(CallJournal::new());
        let event = pool.dispatch(5, 6, |event| {
            event.persist();
            event
        });
        assert_eq!(event.position(), Some((5, 6)));
        assert_eq!(pool.available(), 0);

        let other = pool.dispatch(7, 8, |event| event.id());
        assert_ne!(other, event.id());

        event.release();
        assert_eq!(event.position(), None);
        assert_eq!(event.releases(), 1);
        assert_eq!(
            pool.journal().entries(),
            vec!["persist #0".to_string(), "release #0".to_string()]
        );
    }
}
