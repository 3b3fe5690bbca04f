use crate::cursor::StackFrame;
use crate::message::{Message, MessagePart};

/// Prefix for synthesized auto-response names.
pub const RESPONSE_NAME_PREFIX: &str = "app:response:name:";

/// Conversation-state keys owned by the engine.
pub mod state_keys {
    /// One-turn-ahead routing hints: `{streamName: [classification, ...]}`.
    pub const CURRENT_EXPECTATIONS: &str = "currentExpectations";
    /// Archive of the expectations consumed on the previous turn.
    pub const LAST_EXPECTATIONS: &str = "lastExpectations";
    /// Return addresses persisted alongside the expectations, restored when
    /// an expectation match routes back into a suspended stream.
    pub const EXPECTATIONS_STREAM_STACK: &str = "currentExpectationsStreamStack";
}

/// The external collaborator through which the engine observes the inbound
/// message and emits every effect: state writes, queued responses, user
/// resets and turn termination.
///
/// Implementations own durable persistence and the response queue; the
/// engine treats the client as a single-writer resource scoped to one turn.
/// Accessors must be idempotent within a turn.
pub trait FlowClient {
    /// The inbound message for this turn.
    fn message(&self) -> Message;

    /// The message part being processed (the first part of [`message`]).
    ///
    /// [`message`]: FlowClient::message
    fn message_part(&self) -> MessagePart;

    /// The persisted conversation-state document.
    fn conversation_state(&self) -> serde_json::Value;

    /// Writes one top-level key of the conversation state. `Value::Null`
    /// clears the key.
    fn update_conversation_state(&self, key: &str, value: serde_json::Value);

    /// Queues a reset of the current user.
    fn reset_user(&self);

    /// Queues an outbound prepared response.
    fn add_response(&self, name: &str, data: serde_json::Value);

    /// Terminates the turn, flushing all queued effects to the caller.
    fn done(&self);

    /// Records the stream currently in focus. Called by the engine each
    /// time a step resolves, for other SDK components to query.
    fn set_active_stream(&self, stream_name: &str);

    /// Records the current sub-stream return addresses.
    fn set_stream_stack(&self, stack: &[StackFrame]);
}
