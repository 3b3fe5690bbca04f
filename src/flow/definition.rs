use std::rc::Rc;

use ahash::AHashMap;
use indexmap::IndexMap;

use crate::error::FlowConfigError;
use crate::flow::validate::validate_streams;
use crate::flow::Flow;
use crate::message::ParticipantRole;
use crate::step::Step;

/// Default confidence threshold for output auto-responses.
pub const DEFAULT_MINIMUM_CONFIDENCE: f64 = 0.5;

/// Event-handler key that matches any event type.
pub const WILDCARD_EVENT: &str = "*";

/// The stream mapping. Insertion order is preserved so that whole-flow
/// traversals (extraction) are deterministic.
pub type StreamMap = IndexMap<String, Stream>;

/// Handler for event-type message parts: `(event_type, payload)`.
pub type EventHandler = Box<dyn Fn(&str, &serde_json::Value)>;

/// One element of a stream sequence: a step, or a pointer naming another
/// stream to descend into.
pub enum StreamEntry {
    Step(Rc<Step>),
    Pointer(String),
}

impl From<Rc<Step>> for StreamEntry {
    fn from(step: Rc<Step>) -> Self {
        StreamEntry::Step(step)
    }
}

impl From<&str> for StreamEntry {
    fn from(pointer: &str) -> Self {
        StreamEntry::Pointer(pointer.to_string())
    }
}

impl From<String> for StreamEntry {
    fn from(pointer: String) -> Self {
        StreamEntry::Pointer(pointer)
    }
}

/// A named unit of conversation structure: an ordered sequence of steps,
/// a single step, or a pointer to another stream.
pub enum Stream {
    Sequence(Vec<StreamEntry>),
    Single(Rc<Step>),
    Pointer(String),
}

impl Stream {
    pub fn sequence(entries: impl IntoIterator<Item = StreamEntry>) -> Self {
        Stream::Sequence(entries.into_iter().collect())
    }

    /// The number of step positions before the stream is exhausted.
    /// Single steps and pointers occupy exactly one position.
    pub fn len(&self) -> usize {
        match self {
            Stream::Sequence(entries) => entries.len(),
            Stream::Single(_) | Stream::Pointer(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The pointer at `index`, if this is a sequence and the element there
    /// is a pointer.
    pub fn pointer_at(&self, index: usize) -> Option<&str> {
        match self {
            Stream::Sequence(entries) => match entries.get(index) {
                Some(StreamEntry::Pointer(target)) => Some(target),
                _ => None,
            },
            _ => None,
        }
    }
}

impl From<Vec<StreamEntry>> for Stream {
    fn from(entries: Vec<StreamEntry>) -> Self {
        Stream::Sequence(entries)
    }
}

impl From<Rc<Step>> for Stream {
    fn from(step: Rc<Step>) -> Self {
        Stream::Single(step)
    }
}

impl From<&str> for Stream {
    fn from(pointer: &str) -> Self {
        Stream::Pointer(pointer.to_string())
    }
}

impl From<String> for Stream {
    fn from(pointer: String) -> Self {
        Stream::Pointer(pointer)
    }
}

/// Gate for one auto-response entry, keyed by `base_type` or
/// `base_type/sub_type`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AutoResponseConfig {
    /// Confidence the prediction must reach before an automatic response
    /// is sent. Defaults to 0.5 when unset.
    pub minimum_confidence: Option<f64>,
}

/// Policy for predictions that say more user input is coming.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContinuationPolicy {
    /// Silently end processing for confident continuation predictions.
    pub ignore: bool,
    /// Confidence below which the continuation prediction is disregarded.
    pub minimum_confidence: Option<f64>,
}

/// The raw, unvalidated flow configuration as authored.
///
/// [`FlowBuilder`] is the usual way to assemble one; [`FlowBuilder::build`]
/// validates it into a runnable [`Flow`].
pub struct FlowDefinition {
    pub streams: StreamMap,
    pub classifications: AHashMap<String, String>,
    pub event_handlers: AHashMap<String, EventHandler>,
    pub auto_responses: AHashMap<String, AutoResponseConfig>,
    pub continuation: Option<ContinuationPolicy>,
    pub sender_roles_to_process: Vec<ParticipantRole>,
}

impl Default for FlowDefinition {
    fn default() -> Self {
        Self {
            streams: StreamMap::new(),
            classifications: AHashMap::new(),
            event_handlers: AHashMap::new(),
            auto_responses: AHashMap::new(),
            continuation: None,
            sender_roles_to_process: vec![ParticipantRole::EndUser],
        }
    }
}

/// Assembles and validates a [`Flow`].
pub struct FlowBuilder {
    definition: FlowDefinition,
}

impl FlowBuilder {
    pub fn new() -> Self {
        Self {
            definition: FlowDefinition::default(),
        }
    }

    pub fn stream(mut self, name: impl Into<String>, stream: impl Into<Stream>) -> Self {
        self.definition.streams.insert(name.into(), stream.into());
        self
    }

    /// Maps a classification key to the stream that handles it.
    pub fn classification(
        mut self,
        key: impl Into<String>,
        stream_name: impl Into<String>,
    ) -> Self {
        self.definition
            .classifications
            .insert(key.into(), stream_name.into());
        self
    }

    /// Registers a handler for an event type. `"*"` acts as a wildcard.
    pub fn event_handler(
        mut self,
        event_type: impl Into<String>,
        handler: impl Fn(&str, &serde_json::Value) + 'static,
    ) -> Self {
        self.definition
            .event_handlers
            .insert(event_type.into(), Box::new(handler));
        self
    }

    pub fn auto_response(mut self, key: impl Into<String>, config: AutoResponseConfig) -> Self {
        self.definition.auto_responses.insert(key.into(), config);
        self
    }

    pub fn continuation_policy(mut self, policy: ContinuationPolicy) -> Self {
        self.definition.continuation = Some(policy);
        self
    }

    pub fn sender_roles(mut self, roles: Vec<ParticipantRole>) -> Self {
        self.definition.sender_roles_to_process = roles;
        self
    }

    /// Validates the stream graph and produces a runnable flow.
    ///
    /// Checks performed: a `main` stream exists, sequences are non-empty,
    /// every pointer names a defined stream, and the pointer graph is
    /// acyclic. A flow that passes cannot hit a dangling pointer at runtime.
    pub fn build(self) -> Result<Flow, FlowConfigError> {
        validate_streams(&self.definition.streams)?;
        Ok(Flow::from_definition(self.definition))
    }
}

impl Default for FlowBuilder {
    fn default() -> Self {
        Self::new()
    }
}
