//! Component state that is either a structured record or an opaque scalar.
//!
//! The mode is chosen once from the initial value and never changes. Readers
//! and transitions only ever see the logical [`Value`].

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::error::StateError;
use crate::runtime::RuntimeHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateMode {
    Structured,
    Scalar,
}

impl fmt::Display for StateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateMode::Structured => f.write_str("structured"),
            StateMode::Scalar => f.write_str("scalar"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StateValue {
    Structured(Map<String, Value>),
    Scalar(Value),
}

impl StateValue {
    /// Objects start a structured state, everything else a scalar one.
    pub fn from_initial(value: Value) -> Self {
        match value {
            Value::Object(record) => StateValue::Structured(record),
            other => StateValue::Scalar(other),
        }
    }

    pub fn mode(&self) -> StateMode {
        match self {
            StateValue::Structured(_) => StateMode::Structured,
            StateValue::Scalar(_) => StateMode::Scalar,
        }
    }

    pub fn logical(&self) -> Value {
        match self {
            StateValue::Structured(record) => Value::Object(record.clone()),
            StateValue::Scalar(value) => value.clone(),
        }
    }

    /// Applies a transition result.
    ///
    /// Structured state shallow-merges the returned record field by field.
    /// Scalar state takes the result as its new value, whatever its shape.
    pub fn apply(&mut self, next: Value) -> Result<(), StateError> {
        match (self, next) {
            (StateValue::Structured(record), Value::Object(fields)) => {
                record.extend(fields);
                Ok(())
            }
            (StateValue::Structured(_), other) => Err(StateError::ShapeMismatch {
                mode: StateMode::Structured,
                found: value_kind(&other),
            }),
            (StateValue::Scalar(value), other) => {
                *value = other;
                Ok(())
            }
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "record",
    }
}

/// Initial state of a component: a value, or a factory run once with props.
pub enum InitialState {
    Value(Value),
    Factory(Box<dyn FnOnce(&Value) -> Value>),
}

impl InitialState {
    pub fn factory(factory: impl FnOnce(&Value) -> Value + 'static) -> Self {
        InitialState::Factory(Box::new(factory))
    }

    pub(crate) fn resolve(self, props: &Value) -> Value {
        match self {
            InitialState::Value(value) => value,
            InitialState::Factory(factory) => factory(props),
        }
    }
}

impl From<Value> for InitialState {
    fn from(value: Value) -> Self {
        InitialState::Value(value)
    }
}

impl fmt::Debug for InitialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitialState::Value(value) => f.debug_tuple("Value").field(value).finish(),
            InitialState::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// Shared handle to one component's state.
///
/// Writes go through [`StateContainer::request_transition`], which defers to
/// the runtime's commit queue.
#[derive(Clone)]
pub struct StateContainer {
    value: Rc<RefCell<StateValue>>,
    version: Rc<Cell<u64>>,
    runtime: RuntimeHandle,
}

impl StateContainer {
    pub fn new(initial: Value, runtime: RuntimeHandle) -> Self {
        Self {
            value: Rc::new(RefCell::new(StateValue::from_initial(initial))),
            version: Rc::new(Cell::new(0)),
            runtime,
        }
    }

    pub fn get(&self) -> Value {
        self.value.borrow().logical()
    }

    pub fn mode(&self) -> StateMode {
        self.value.borrow().mode()
    }

    /// Number of transitions applied so far.
    pub fn version(&self) -> u64 {
        self.version.get()
    }

    /// Queues `transition` and runs `on_complete` once its result is applied.
    ///
    /// `on_complete` is dropped without running when the transition result is
    /// rejected.
    pub fn request_transition(
        &self,
        transition: impl FnOnce(&Value) -> Value + 'static,
        on_complete: impl FnOnce() + 'static,
    ) {
        let value = Rc::clone(&self.value);
        let version = Rc::clone(&self.version);
        self.runtime.enqueue_commit(Box::new(move || {
            let current = value.borrow().logical();
            let next = transition(&current);
            value.borrow_mut().apply(next)?;
            version.set(version.get() + 1);
            on_complete();
            Ok(())
        }));
    }
}

impl fmt::Debug for StateContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateContainer")
            .field("value", &*self.value.borrow())
            .field("version", &self.version.get())
            .finish()
    }
}
