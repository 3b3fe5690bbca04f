use std::rc::Rc;

use crate::cursor::Cursor;
use crate::flow::{Stream, StreamEntry, StreamMap};
use crate::step::Step;

/// Whether `name` refers to a defined stream, as opposed to a step or an
/// unresolvable token.
pub fn is_stream(streams: &StreamMap, name: &str) -> bool {
    streams.contains_key(name)
}

/// What a cursor position resolves to.
#[derive(Debug, Clone)]
pub enum Active {
    Step(Rc<Step>),
    /// The position holds a pointer to another stream.
    Pointer(String),
}

/// Resolves the step in focus at the cursor's position.
///
/// Sequences are indexed by `step_index`; a single step or pointer stream
/// occupies position 0 only. Any out-of-range index resolves to nothing
/// (the idle terminal case — range handling is the caller's concern).
/// Resolving past the end of every stream is what stops the walk after a
/// return frame pops to an exhausted position.
pub fn resolve_active(stream: &Stream, cursor: &Cursor) -> Option<Active> {
    match stream {
        Stream::Sequence(entries) => entries.get(cursor.step_index).map(|entry| match entry {
            StreamEntry::Step(step) => Active::Step(Rc::clone(step)),
            StreamEntry::Pointer(target) => Active::Pointer(target.clone()),
        }),
        Stream::Single(step) if cursor.step_index == 0 => Some(Active::Step(Rc::clone(step))),
        Stream::Pointer(target) if cursor.step_index == 0 => Some(Active::Pointer(target.clone())),
        Stream::Single(_) | Stream::Pointer(_) => None,
    }
}
