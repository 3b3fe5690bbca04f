use itertools::Itertools;
use thiserror::Error;

/// Errors detected while validating a flow definition at load time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowConfigError {
    #[error("flow definition has no 'main' stream to enter")]
    MissingMainStream,

    #[error("stream '{stream}' has no steps")]
    EmptyStream { stream: String },

    #[error("'{target}' referenced from stream '{stream}' is not a defined stream")]
    UndefinedStreamReference { stream: String, target: String },

    #[error("stream pointers form a cycle: {}", cycle.iter().join(" -> "))]
    CyclicStreamGraph { cycle: Vec<String> },
}

/// Errors that can occur while walking streams during a turn.
///
/// These indicate a broken flow configuration, not a recoverable routing
/// miss. The turn terminates abnormally: no `done()` is sent and whatever
/// it would have flushed is lost.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    #[error("'{token}' is not a valid stream")]
    InvalidStreamReference { token: String },
}
