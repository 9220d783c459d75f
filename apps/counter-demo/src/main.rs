use std::cell::Cell;
use std::rc::Rc;

use compose_handlers::{Callback, Handler, HandlerScope, InitialState, PooledEvent, Value};
use compose_runtime_std::StdRuntime;
use serde_json::json;

/// A button tap the host would normally recycle after dispatch.
struct Tap {
    button: &'static str,
    persisted: Cell<bool>,
}

impl PooledEvent for Tap {
    fn persist(&self) {
        self.persisted.set(true);
        log::debug!("tap on {} persisted", self.button);
    }

    fn release(&self) {
        self.persisted.set(false);
        log::debug!("tap on {} released", self.button);
    }
}

fn step(state: &Value, delta: &i64, args: &(Rc<Tap>,)) -> Value {
    let (tap,) = args;
    json!({
        "count": state["count"].as_i64().unwrap_or(0) + delta,
        "last": tap.button,
    })
}

fn describe(prefix: &String, state: Value) -> String {
    format!("{prefix} {} (last: {})", state["count"], state["last"])
}

struct Buttons {
    increment: Handler<(Rc<Tap>,)>,
    decrement: Handler<(Rc<Tap>,)>,
    label: Handler<Value, String>,
}

fn counter(scope: &HandlerScope<'_>) -> Buttons {
    let step = Callback::new(step);
    Buttons {
        increment: scope.update(&step, 1i64),
        decrement: scope.update(&step, -1i64),
        label: scope.handle(&Callback::new(describe), "count:".to_string()),
    }
}

fn main() {
    env_logger::init();

    let runtime = StdRuntime::new();
    let component = runtime.mount(
        InitialState::factory(|props| json!({ "count": props["start"], "last": null })),
        &json!({ "start": 10 }),
    );

    let script = ["+", "+", "-", "+"];
    for input in script {
        let buttons = component.render(counter);
        let button = if input == "+" { "increment" } else { "decrement" };
        let tap = Rc::new(Tap {
            button,
            persisted: Cell::new(false),
        });
        match input {
            "+" => buttons.increment.call((tap,)),
            _ => buttons.decrement.call((tap,)),
        }

        if let Err(err) = runtime.pump() {
            log::error!("tap dropped: {err}");
            continue;
        }
        if runtime.take_render_request() {
            let buttons = component.render(counter);
            println!("{}", buttons.label.call(component.state()));
        }
    }

    println!("cached handlers: {}", component.cached_handlers());
    component.dispose();
}
