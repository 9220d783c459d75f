use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use compose_handlers::{
    CommitError, ComponentOptions, HandlerScope, InitialState, Runtime, RuntimeScheduler,
    StatefulComponent, Value,
};

/// Scheduler that only counts commit requests; tests drain by hand.
#[derive(Debug, Default)]
pub struct CountingScheduler {
    requests: AtomicUsize,
}

impl CountingScheduler {
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl RuntimeScheduler for CountingScheduler {
    fn schedule_commit(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }
}

/// One component mounted on its own runtime.
pub struct ComponentHarness {
    component: StatefulComponent,
    scheduler: Arc<CountingScheduler>,
    runtime: Runtime,
}

impl ComponentHarness {
    pub fn new(initial: impl Into<InitialState>) -> Self {
        Self::with_props(initial, &Value::Null)
    }

    pub fn with_props(initial: impl Into<InitialState>, props: &Value) -> Self {
        let scheduler = Arc::new(CountingScheduler::default());
        let runtime = Runtime::new(scheduler.clone());
        // Diagnostics stay on so warnings show up in test logs.
        let component = StatefulComponent::with_options(
            runtime.handle(),
            initial,
            props,
            ComponentOptions { diagnostics: true },
        );
        Self {
            component,
            scheduler,
            runtime,
        }
    }

    pub fn component(&self) -> &StatefulComponent {
        &self.component
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn render<R>(&self, content: impl FnOnce(&HandlerScope<'_>) -> R) -> R {
        self.component.render(content)
    }

    pub fn state(&self) -> Value {
        self.component.state()
    }

    pub fn commit_requests(&self) -> usize {
        self.scheduler.requests()
    }

    /// Applies every pending commit, as the host would on its next tick.
    pub fn flush(&self) -> Result<usize, CommitError> {
        self.runtime.drain_commits()
    }

    pub fn unmount(&self) {
        self.component.dispose();
    }
}
