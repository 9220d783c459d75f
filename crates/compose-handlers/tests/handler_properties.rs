use std::rc::Rc;

use compose_handlers::{
    build_forward_handler, Callback, Handler, HandlerCache, HandlerKind, InitialState, Value,
};
use compose_testing::{CallJournal, ComponentHarness, PooledClick, TestEventPool};
use serde_json::json;

fn increment(state: &Value, step: &i64, _: &()) -> Value {
    json!({ "count": state["count"].as_i64().unwrap_or(0) + step })
}

#[test]
fn counter_example() {
    let harness = ComponentHarness::new(json!({ "count": 0 }));
    let handler = harness.render(|scope| scope.update(&Callback::new(increment), 1i64));

    handler.call(());
    harness.flush().unwrap();
    assert_eq!(harness.state(), json!({ "count": 1 }));

    handler.call(());
    harness.flush().unwrap();
    assert_eq!(harness.state(), json!({ "count": 2 }));
}

#[test]
fn rerender_after_commit_reuses_handlers() {
    let harness = ComponentHarness::new(json!({ "count": 0 }));
    let increment = Callback::new(increment);

    let before = harness.render(|scope| scope.update(&increment, 5i64));
    before.call(());
    harness.flush().unwrap();
    assert!(harness.runtime().take_render_request());

    let (after, state) = harness.render(|scope| (scope.update(&increment, 5i64), scope.state()));
    assert!(before.ptr_eq(&after));
    assert_eq!(state, json!({ "count": 5 }));
}

#[test]
fn forward_handlers_adapt_pooled_events_without_persisting() {
    let journal = CallJournal::new();
    let pool = TestEventPool::new(journal.clone());
    let harness = ComponentHarness::new(json!(null));
    let describe = Callback::named("describe", |row: &u32, click: Rc<PooledClick>| {
        format!("row {row} at {:?}", click.position())
    });

    let handler: Handler<Rc<PooledClick>, String> =
        harness.render(|scope| scope.handle(&describe, 7u32));
    let text = pool.dispatch(1, 2, |click| handler.call(click));

    assert_eq!(text, "row 7 at Some((1, 2))");
    assert!(journal.entries().is_empty());
    assert_eq!(pool.available(), 1);
}

#[test]
fn same_name_different_closure_invalidates() {
    let mut cache = HandlerCache::new();
    let make = |tag: &'static str| Callback::named("same", move |_: &(), _: ()| tag);

    let first: Handler<(), &'static str> =
        cache.get_or_build(HandlerKind::Forward, &make("first"), (), build_forward_handler);
    let second: Handler<(), &'static str> =
        cache.get_or_build(HandlerKind::Forward, &make("second"), (), build_forward_handler);

    assert!(!first.ptr_eq(&second));
    assert_eq!(first.call(()), "first");
    assert_eq!(second.call(()), "second");
    assert_eq!(cache.len(), 1);
}

#[test]
fn factory_state_is_built_from_props_once() {
    let harness = ComponentHarness::with_props(
        InitialState::factory(|props| props["initial"].clone()),
        &json!({ "initial": 10 }),
    );
    let bump = Callback::named("bump", |state: &Value, by: &i64, _: &()| {
        json!(state.as_i64().unwrap_or(0) + by)
    });

    let handler = harness.render(|scope| scope.update(&bump, 2i64));
    handler.call(());
    handler.call(());
    harness.flush().unwrap();

    assert_eq!(harness.state(), json!(14));
}

#[test]
fn unmount_leaves_no_cached_handlers() {
    let harness = ComponentHarness::new(json!({ "count": 0 }));
    harness.render(|scope| {
        scope.update(&Callback::new(increment), 1i64);
        scope.update(&Callback::new(increment), 2i64);
    });
    assert_eq!(harness.component().cached_handlers(), 2);

    harness.unmount();

    assert!(harness.component().is_disposed());
    assert_eq!(harness.component().cached_handlers(), 0);
}
