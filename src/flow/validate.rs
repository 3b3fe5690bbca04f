use ahash::AHashMap;

use crate::error::FlowConfigError;
use crate::flow::definition::{Stream, StreamEntry, StreamMap};
use crate::flow::MAIN_STREAM;

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Visiting,
    Done,
}

/// Load-time validation of the stream graph.
///
/// Cyclic pointer chains would recurse without bound at runtime, so
/// acyclicity is enforced here as a precondition. `next()` closures are
/// opaque and cannot be checked; a self-referential `next()` is already
/// harmless because it never pushes a return frame.
pub(crate) fn validate_streams(streams: &StreamMap) -> Result<(), FlowConfigError> {
    if !streams.contains_key(MAIN_STREAM) {
        return Err(FlowConfigError::MissingMainStream);
    }

    for (name, stream) in streams {
        if stream.is_empty() {
            return Err(FlowConfigError::EmptyStream {
                stream: name.clone(),
            });
        }
        match stream {
            Stream::Sequence(entries) => {
                for entry in entries {
                    if let StreamEntry::Pointer(target) = entry {
                        require_defined(streams, name, target)?;
                    }
                }
            }
            Stream::Pointer(target) => require_defined(streams, name, target)?,
            Stream::Single(_) => {}
        }
    }

    let mut marks: AHashMap<&str, Mark> = AHashMap::new();
    let mut path: Vec<String> = Vec::new();
    for name in streams.keys() {
        visit(name, streams, &mut marks, &mut path)?;
    }

    Ok(())
}

fn require_defined(
    streams: &StreamMap,
    stream: &str,
    target: &str,
) -> Result<(), FlowConfigError> {
    if streams.contains_key(target) {
        Ok(())
    } else {
        Err(FlowConfigError::UndefinedStreamReference {
            stream: stream.to_string(),
            target: target.to_string(),
        })
    }
}

/// Depth-first search over pointer edges, reporting the offending path on
/// the first back edge.
fn visit<'a>(
    name: &'a str,
    streams: &'a StreamMap,
    marks: &mut AHashMap<&'a str, Mark>,
    path: &mut Vec<String>,
) -> Result<(), FlowConfigError> {
    match marks.get(name) {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::Visiting) => {
            let mut cycle: Vec<String> = path
                .iter()
                .skip_while(|entry| entry.as_str() != name)
                .cloned()
                .collect();
            cycle.push(name.to_string());
            return Err(FlowConfigError::CyclicStreamGraph { cycle });
        }
        None => {}
    }

    marks.insert(name, Mark::Visiting);
    path.push(name.to_string());

    if let Some(stream) = streams.get(name) {
        match stream {
            Stream::Pointer(target) => visit(target, streams, marks, path)?,
            Stream::Sequence(entries) => {
                for entry in entries {
                    if let StreamEntry::Pointer(target) = entry {
                        visit(target, streams, marks, path)?;
                    }
                }
            }
            Stream::Single(_) => {}
        }
    }

    path.pop();
    marks.insert(name, Mark::Done);
    Ok(())
}
