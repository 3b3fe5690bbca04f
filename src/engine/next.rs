use crate::cursor::{Cursor, StackFrame};
use crate::engine::resolve::is_stream;
use crate::error::FlowError;
use crate::flow::{StreamMap, END_STREAM};
use crate::step::Step;

/// Computes the cursor that follows a satisfied step.
///
/// In order: honor the step's `next()` redirect (a self-redirect is a plain
/// advance and never grows the stack), advance within the current stream
/// otherwise, return to the pushed frame or route to the terminal stream on
/// exhaustion, and descend into pointer elements. A pushed frame's
/// `step_index` is the exact resume position; popping restores it as-is.
pub fn next_cursor(
    step: &Step,
    streams: &StreamMap,
    cursor: &Cursor,
) -> Result<Cursor, FlowError> {
    let mut next = match step.next_stream() {
        Some(target) if is_stream(streams, &target) => {
            if target == cursor.stream_name {
                // Restarting the active stream is treated as a plain
                // advance so self-redirecting steps cannot grow the stack.
                cursor.clone().advanced()
            } else {
                cursor.clone().descended(target)
            }
        }
        _ => cursor.clone().advanced(),
    };

    let stream_len = streams.get(&next.stream_name).map_or(0, |s| s.len());
    if next.step_index >= stream_len {
        return Ok(match next.stream_stack.pop() {
            Some(frame) => {
                next.stream_name = frame.stream_name;
                next.step_index = frame.step_index;
                next
            }
            None => {
                // Out of steps with nowhere to return: remember where the
                // flow ran out and fall into the terminal stream.
                next.stream_stack.push(StackFrame {
                    stream_name: std::mem::replace(
                        &mut next.stream_name,
                        END_STREAM.to_string(),
                    ),
                    step_index: next.step_index,
                });
                next.step_index = 0;
                next
            }
        });
    }

    // A pointer element at the new position descends immediately, with a
    // frame to resume right after it.
    if let Some(target) = streams
        .get(&next.stream_name)
        .and_then(|s| s.pointer_at(next.step_index))
    {
        if !is_stream(streams, target) {
            return Err(FlowError::InvalidStreamReference {
                token: target.to_string(),
            });
        }
        return Ok(next.descended(target.to_string()));
    }

    Ok(next)
}
