use std::rc::Rc;

use ahash::AHashSet;

use crate::flow::{Stream, StreamEntry, StreamMap, MAIN_STREAM};
use crate::message::MessagePart;
use crate::step::Step;

/// Runs every step's `extract_info` against the current message part,
/// independent of cursor position.
///
/// Visits streams in definition order, skipping `main` (its target is
/// reachable as a stream of its own) and pointer entries (their targets are
/// visited directly). A step shared between streams is extracted exactly
/// once per call, deduplicated by object identity.
pub fn extract_all(streams: &StreamMap, part: &MessagePart) {
    let mut seen: AHashSet<*const Step> = AHashSet::new();

    for (name, stream) in streams {
        if name == MAIN_STREAM {
            continue;
        }
        match stream {
            Stream::Sequence(entries) => {
                for entry in entries {
                    if let StreamEntry::Step(step) = entry {
                        extract_once(step, part, &mut seen);
                    }
                }
            }
            Stream::Single(step) => extract_once(step, part, &mut seen),
            Stream::Pointer(_) => {}
        }
    }
}

fn extract_once(step: &Rc<Step>, part: &MessagePart, seen: &mut AHashSet<*const Step>) {
    if seen.insert(Rc::as_ptr(step)) {
        step.extract_info(part);
    }
}
