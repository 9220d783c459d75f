use std::rc::Rc;

use serde_json::Value;

use crate::event::{release, try_persist, CallArgs};
use crate::handler::Handler;
use crate::identity::Callback;
use crate::state::StateContainer;

/// Returns a builder for update handlers that commit into `state`.
///
/// Each invocation of a built handler persists the first pooled argument,
/// queues `callback(&current, &params, &args)` as a state transition and
/// returns without waiting for it. The persisted event is released once the
/// transition has been applied, or when the queued commit is dropped.
pub fn build_update_handler<F, P, A>(
    state: StateContainer,
) -> impl FnOnce(Callback<F>, P) -> Handler<A>
where
    F: Fn(&Value, &P, &A) -> Value + 'static,
    P: 'static,
    A: CallArgs + 'static,
{
    move |callback, params| {
        let params = Rc::new(params);
        Handler::new(move |args: A| {
            let mut event = try_persist(&args);
            let callback = callback.clone();
            let params = Rc::clone(&params);
            state.request_transition(
                move |current| (callback.get())(current, &*params, &args),
                move || release(event.as_mut()),
            );
        })
    }
}
