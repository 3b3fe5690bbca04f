use std::rc::Rc;

use crate::client::FlowClient;
use crate::cursor::Cursor;
use crate::engine::next::next_cursor;
use crate::engine::resolve::{is_stream, resolve_active, Active};
use crate::error::FlowError;
use crate::flow::StreamMap;
use crate::step::{Prompt, Signal, Step};

/// Runs the flow from the cursor's position until a step needs input or the
/// streams are exhausted, returning the settled cursor.
///
/// Satisfied steps are skipped through recursively; pointer positions
/// resolve into their target stream. An unsatisfied step either extracts
/// (first pass), falls back (when requested), or prompts. A prompt's
/// continuation re-enters this function on a strictly advancing cursor, so
/// no step prompts twice within one turn; cursors produced inside a
/// detached continuation chain are observable only through the client.
pub fn run(
    cursor: Cursor,
    streams: &Rc<StreamMap>,
    client: &Rc<dyn FlowClient>,
) -> Result<Cursor, FlowError> {
    let Some(stream) = streams.get(&cursor.stream_name) else {
        return Ok(cursor);
    };
    let Some(active) = resolve_active(stream, &cursor) else {
        // Past the end of every stream: idle terminal case.
        return Ok(cursor);
    };

    client.set_active_stream(&cursor.stream_name);
    client.set_stream_stack(&cursor.stream_stack);

    let step = match active {
        Active::Pointer(target) => {
            if !is_stream(streams, &target) {
                return Err(FlowError::InvalidStreamReference { token: target });
            }
            return run(cursor.at_stream(target), streams, client);
        }
        Active::Step(step) => step,
    };

    if step.is_satisfied() {
        let advanced = next_cursor(&step, streams, &cursor)?;
        return run(advanced, streams, client);
    }

    if cursor.is_first_run {
        // Extraction only on the first pass; prompting is the second
        // pass's job once routing has settled.
        step.extract_info(&client.message_part());
        return Ok(cursor.with_active_step(step));
    }

    if cursor.run_fallback {
        if step.run_fallback() {
            return Ok(cursor.with_ran_fallback());
        }
        tracing::debug!(
            stream = %cursor.stream_name,
            index = cursor.step_index,
            "unsatisfied step has no fallback"
        );
        return Ok(cursor);
    }

    dispatch_prompt(&step, streams, client, &cursor);
    Ok(cursor)
}

/// Invokes a step's prompt, wiring its signal into the engine.
///
/// Synchronous prompts are processed inline; suspending prompts receive the
/// continuation and the engine returns to its caller. Either way the
/// current cursor is left untouched — the signal handler re-runs the engine
/// on a fresh cursor for its side effects.
pub(crate) fn dispatch_prompt(
    step: &Rc<Step>,
    streams: &Rc<StreamMap>,
    client: &Rc<dyn FlowClient>,
    cursor: &Cursor,
) {
    let handler = signal_handler(
        Rc::clone(step),
        Rc::clone(streams),
        Rc::clone(client),
        cursor.clone(),
    );
    match step.prompt() {
        Prompt::Sync(prompt) => handler(prompt()),
        Prompt::Suspending(prompt) => prompt(Box::new(handler)),
    }
}

fn signal_handler(
    step: Rc<Step>,
    streams: Rc<StreamMap>,
    client: Rc<dyn FlowClient>,
    cursor: Cursor,
) -> impl FnOnce(Option<Signal>) {
    move |signal| match signal {
        Some(Signal::Proceed) => {
            tracing::debug!(
                stream = %cursor.stream_name,
                index = cursor.step_index,
                "received proceed signal"
            );
            let resumed = next_cursor(&step, &streams, &cursor)
                .and_then(|next| run(next, &streams, &client));
            if let Err(error) = resumed {
                // A detached chain has no caller left to unwind into; the
                // turn ends here without `done()`.
                tracing::error!(error = %error, "continuation chain aborted");
            }
        }
        Some(Signal::Route(target)) if is_stream(&streams, &target) => {
            tracing::debug!(
                stream = %cursor.stream_name,
                index = cursor.step_index,
                target = %target,
                "prompt rerouted to stream"
            );
            if let Err(error) = run(cursor.at_stream(target), &streams, &client) {
                tracing::error!(error = %error, "continuation chain aborted");
            }
        }
        Some(Signal::Route(target)) => {
            tracing::warn!(
                stream = %cursor.stream_name,
                index = cursor.step_index,
                target = %target,
                "prompt routed to unknown stream; ending turn"
            );
        }
        None => {
            tracing::debug!(
                stream = %cursor.stream_name,
                index = cursor.step_index,
                "prompt returned no signal; step owns turn termination"
            );
        }
    }
}
