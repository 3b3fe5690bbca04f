//! Prelude module for convenient imports
//!
//! Re-exports the most commonly used types from the kaiwa crate. Import
//! this module to get access to the core functionality without having to
//! import each type individually.

// Flow configuration and execution
pub use crate::flow::{
    AutoResponseConfig, ContinuationPolicy, Flow, FlowBuilder, FlowDefinition, Stream,
    StreamEntry, StreamMap, DEFAULT_MINIMUM_CONFIDENCE, END_STREAM, MAIN_STREAM, WILDCARD_EVENT,
};

// Steps and the prompt/continuation protocol
pub use crate::step::{Continuation, Prompt, Signal, Step, StepBuilder};

// Turn-scoped position state
pub use crate::cursor::{Cursor, StackFrame};

// The external collaborator contract
pub use crate::client::{FlowClient, RESPONSE_NAME_PREFIX};

// Message and classification data
pub use crate::classification::{
    Classification, ClassificationKeys, Facet, PredictedResponse, Prediction,
};
pub use crate::message::{
    Message, MessageContent, MessagePart, MessageType, ParticipantRole, PostbackContent,
};

// Engine operations, for callers driving traversal directly
pub use crate::engine::{extract_all, is_stream, next_cursor, resolve_active, run, Active};

// Error types
pub use crate::error::{FlowConfigError, FlowError};
