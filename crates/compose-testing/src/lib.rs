//! Testing utilities and harness for Compose-RS handlers

pub mod harness;
pub mod pool;

pub use harness::{ComponentHarness, CountingScheduler};
pub use pool::{CallJournal, PooledClick, TestEventPool};

pub mod prelude {
    pub use crate::harness::*;
    pub use crate::pool::*;
}
