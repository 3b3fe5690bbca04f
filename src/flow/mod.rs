//! Flow configuration: streams of steps, routing tables, and the validated
//! [`Flow`] that executes one message turn at a time.

pub mod definition;
mod validate;

pub use definition::*;

use std::rc::Rc;

use ahash::AHashMap;

use crate::client::FlowClient;
use crate::controller::FlowController;
use crate::cursor::Cursor;
use crate::error::FlowError;
use crate::message::ParticipantRole;

/// Name of the entry stream. May itself be a pointer to another stream.
pub const MAIN_STREAM: &str = "main";

/// Name of the reserved terminal stream that catches exhausted or
/// unroutable turns.
pub const END_STREAM: &str = "end";

/// A validated conversation flow, ready to process message turns.
///
/// Built from a [`FlowDefinition`] via [`FlowBuilder`]; construction fails
/// if the stream graph is unresolvable or cyclic. The flow itself is
/// immutable: each call to [`run`] processes exactly one inbound turn
/// against the given client.
///
/// [`run`]: Flow::run
pub struct Flow {
    pub(crate) streams: Rc<StreamMap>,
    pub(crate) classifications: AHashMap<String, String>,
    pub(crate) event_handlers: AHashMap<String, EventHandler>,
    pub(crate) auto_responses: AHashMap<String, AutoResponseConfig>,
    pub(crate) continuation: Option<ContinuationPolicy>,
    pub(crate) sender_roles: Vec<ParticipantRole>,
}

impl Flow {
    pub fn builder() -> FlowBuilder {
        FlowBuilder::new()
    }

    pub(crate) fn from_definition(definition: FlowDefinition) -> Self {
        Self {
            streams: Rc::new(definition.streams),
            classifications: definition.classifications,
            event_handlers: definition.event_handlers,
            auto_responses: definition.auto_responses,
            continuation: definition.continuation,
            sender_roles: definition.sender_roles_to_process,
        }
    }

    /// Processes one inbound message turn.
    ///
    /// Returns the cursor the turn settled on. Side effects (responses,
    /// state writes, `done()`) happen through the client as the turn runs;
    /// a suspending prompt may extend the turn past this call, in which
    /// case the remaining transitions happen when its continuation fires.
    pub fn run(&self, client: Rc<dyn FlowClient>) -> Result<Cursor, FlowError> {
        FlowController::new(self, client).run_turn()
    }

    /// The shared stream mapping, for callers driving the engine directly.
    pub fn streams(&self) -> &Rc<StreamMap> {
        &self.streams
    }
}
