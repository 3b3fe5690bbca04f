//! Common test utilities: a recording mock client and step helpers.
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use kaiwa::prelude::*;
use serde_json::Value;

/// A client collaborator that records every effect the engine emits.
#[allow(dead_code)]
pub struct MockClient {
    message: RefCell<Message>,
    state: RefCell<Value>,
    pub responses: RefCell<Vec<(String, Value)>>,
    pub reset_calls: Cell<u32>,
    pub done_calls: Cell<u32>,
    pub active_stream: RefCell<Option<String>>,
    pub stream_stack: RefCell<Vec<StackFrame>>,
    pub state_updates: RefCell<Vec<(String, Value)>>,
}

#[allow(dead_code)]
impl MockClient {
    pub fn new(message: Message) -> Rc<Self> {
        Rc::new(Self {
            message: RefCell::new(message),
            state: RefCell::new(Value::Object(Default::default())),
            responses: RefCell::new(Vec::new()),
            reset_calls: Cell::new(0),
            done_calls: Cell::new(0),
            active_stream: RefCell::new(None),
            stream_stack: RefCell::new(Vec::new()),
            state_updates: RefCell::new(Vec::new()),
        })
    }

    pub fn with_text(text: &str) -> Rc<Self> {
        Self::with_part(MessagePart::new(MessageContent::Text(text.to_string())))
    }

    pub fn with_part(part: MessagePart) -> Rc<Self> {
        Self::new(Message::new(part))
    }

    /// Seeds the persisted conversation state for the turn.
    pub fn set_state(&self, state: Value) {
        *self.state.borrow_mut() = state;
    }

    /// The client as the trait object the engine expects.
    pub fn as_flow_client(self: &Rc<Self>) -> Rc<dyn FlowClient> {
        Rc::clone(self) as Rc<dyn FlowClient>
    }
}

impl FlowClient for MockClient {
    fn message(&self) -> Message {
        self.message.borrow().clone()
    }

    fn message_part(&self) -> MessagePart {
        self.message.borrow().parts[0].clone()
    }

    fn conversation_state(&self) -> Value {
        self.state.borrow().clone()
    }

    fn update_conversation_state(&self, key: &str, value: Value) {
        self.state_updates
            .borrow_mut()
            .push((key.to_string(), value.clone()));
        if let Value::Object(map) = &mut *self.state.borrow_mut() {
            map.insert(key.to_string(), value);
        }
    }

    fn reset_user(&self) {
        self.reset_calls.set(self.reset_calls.get() + 1);
    }

    fn add_response(&self, name: &str, data: Value) {
        self.responses.borrow_mut().push((name.to_string(), data));
    }

    fn done(&self) {
        self.done_calls.set(self.done_calls.get() + 1);
    }

    fn set_active_stream(&self, stream_name: &str) {
        *self.active_stream.borrow_mut() = Some(stream_name.to_string());
    }

    fn set_stream_stack(&self, stack: &[StackFrame]) {
        *self.stream_stack.borrow_mut() = stack.to_vec();
    }
}

/// Invocation counters shared with the closures of a step under test.
#[derive(Default)]
#[allow(dead_code)]
pub struct StepCounters {
    pub extracted: Cell<u32>,
    pub prompted: Cell<u32>,
    pub fell_back: Cell<u32>,
}

#[allow(dead_code)]
pub fn counters() -> Rc<StepCounters> {
    Rc::new(StepCounters::default())
}

/// An unsatisfied step that counts extractions and prompts and answers its
/// prompt with the given signal.
#[allow(dead_code)]
pub fn counting_step(counters: &Rc<StepCounters>, signal: Option<Signal>) -> Rc<Step> {
    let extracted = Rc::clone(counters);
    let prompted = Rc::clone(counters);
    Step::builder()
        .satisfied(|| false)
        .extract_info(move |_| extracted.extracted.set(extracted.extracted.get() + 1))
        .prompt(move || {
            prompted.prompted.set(prompted.prompted.get() + 1);
            signal.clone()
        })
        .build()
}

/// A step that is always satisfied and does nothing.
#[allow(dead_code)]
pub fn satisfied_step() -> Rc<Step> {
    Step::builder().build()
}

/// Builds a raw stream map for driving the engine directly.
#[allow(dead_code)]
pub fn stream_map(streams: Vec<(&str, Stream)>) -> Rc<StreamMap> {
    Rc::new(
        streams
            .into_iter()
            .map(|(name, stream)| (name.to_string(), stream))
            .collect(),
    )
}

/// A second-pass cursor: the initial position with the first-run flag off.
#[allow(dead_code)]
pub fn execution_cursor(stream_name: &str) -> Cursor {
    Cursor::initial().with_first_run(false).at_stream(stream_name)
}
