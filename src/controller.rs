use std::rc::Rc;

use ahash::AHashMap;
use serde_json::Value;

use crate::classification::{ClassificationKeys, Prediction};
use crate::client::{state_keys, FlowClient, RESPONSE_NAME_PREFIX};
use crate::cursor::{Cursor, StackFrame};
use crate::engine::{dispatch_prompt, extract_all, is_stream, run};
use crate::error::FlowError;
use crate::flow::{Flow, DEFAULT_MINIMUM_CONFIDENCE, END_STREAM, WILDCARD_EVENT};
use crate::message::{Message, MessageContent, MessagePart, MessageType};

/// Outcome of the routing decision: either the second engine pass runs on
/// the routed cursor, or the turn stops where routing left it.
#[derive(Debug, PartialEq, Eq)]
enum Routing {
    Continue,
    Halt,
}

/// Outcome of the auto-responder.
#[derive(Debug, PartialEq, Eq)]
enum AutoRespond {
    /// Nothing happened; routing proceeds normally.
    Continue,
    /// The prediction was answered (or deliberately swallowed); stop.
    Handled,
}

/// The one-turn-ahead routing hints read from conversation state: a stream
/// plus the classification keys that should activate it.
#[derive(Debug, Default)]
struct Expectations {
    stream: Option<String>,
    classifications: AHashMap<String, String>,
}

impl Expectations {
    fn matched_stream(&self, keys: &ClassificationKeys) -> Option<&String> {
        keys.lookup(&self.classifications)
    }

    fn archive_value(&self) -> Value {
        serde_json::json!({
            "stream": self.stream,
            "classifications": &self.classifications,
        })
    }
}

/// Orchestrates one message turn: gates on sender role, dispatches events,
/// and for conversational content runs the extraction pass, the routing
/// decision ladder, and the execution pass.
pub(crate) struct FlowController<'f> {
    flow: &'f Flow,
    client: Rc<dyn FlowClient>,
    /// Classification projections, computed once and reused for every
    /// routing-table probe this turn.
    keys: ClassificationKeys,
    cursor: Cursor,
}

impl<'f> FlowController<'f> {
    pub(crate) fn new(flow: &'f Flow, client: Rc<dyn FlowClient>) -> Self {
        let part = client.message_part();
        let keys = ClassificationKeys::new(part.classification.as_ref());
        Self {
            flow,
            client,
            keys,
            cursor: Cursor::initial(),
        }
    }

    pub(crate) fn run_turn(mut self) -> Result<Cursor, FlowError> {
        let message = self.client.message();
        if !self.sender_allowed(&message) {
            tracing::debug!(role = ?message.sender_role, "sender role not processed; ending turn");
            self.client.done();
            return Ok(self.cursor);
        }

        let part = self.client.message_part();
        match part.content.content_type() {
            MessageType::Event => {
                tracing::debug!("processing event message part");
                self.handle_event(&part);
                Ok(self.cursor)
            }
            content_type @ (MessageType::Text | MessageType::Postback | MessageType::Image) => {
                tracing::debug!(%content_type, "processing message part");

                // First pass: walk to the active step and extract.
                self.cursor = run(self.cursor.clone(), &self.flow.streams, &self.client)?;
                extract_all(&self.flow.streams, &part);

                match self.route(&part)? {
                    Routing::Halt => Ok(self.cursor),
                    Routing::Continue => {
                        // Second pass: execute from wherever routing landed.
                        self.cursor = run(self.cursor.clone(), &self.flow.streams, &self.client)?;
                        Ok(self.cursor)
                    }
                }
            }
        }
    }

    fn sender_allowed(&self, message: &Message) -> bool {
        match message.sender_role {
            Some(role) => self.flow.sender_roles.contains(&role),
            None => true,
        }
    }

    /// The per-turn routing decision ladder; first match wins.
    fn route(&mut self, part: &MessagePart) -> Result<Routing, FlowError> {
        // 1. Reset command bypasses all routing.
        if let MessageContent::Text(text) = &part.content {
            if matches!(text.trim(), "!RESET" | "/reset") {
                tracing::debug!("resetting user");
                self.client.reset_user();
                self.client.done();
                return Ok(Routing::Halt);
            }
        }

        // 2. An active step that expects the current classification claims
        // the turn outright.
        if let Some(active) = self.cursor.currently_active_step.clone() {
            if let Some(display_key) = self.keys.display.as_deref() {
                if active.expects().iter().any(|expected| expected == display_key) {
                    tracing::debug!(
                        classification = %display_key,
                        "active step expected this classification; prompting directly"
                    );
                    dispatch_prompt(&active, &self.flow.streams, &self.client, &self.cursor);
                    return Ok(Routing::Halt);
                }
            }
        }

        let expectations = self.current_expectations();

        // 3. Expectations set by the previous turn override the static
        // classification mappings.
        if let Some(target) = expectations.matched_stream(&self.keys).cloned() {
            tracing::debug!(stream = %target, "routing via expected classification");
            let stack = self.persisted_stream_stack();
            self.cursor = self.cursor.clone().routed_to(target).with_stack(stack);
            self.client
                .update_conversation_state(state_keys::CURRENT_EXPECTATIONS, Value::Null);
            self.client
                .update_conversation_state(state_keys::LAST_EXPECTATIONS, expectations.archive_value());
            return Ok(Routing::Continue);
        }

        // 4. Auto-response.
        if self.auto_respond(part.predicted_next_message.as_ref()) == AutoRespond::Handled {
            tracing::debug!("auto-responder stopped processing");
            return Ok(Routing::Halt);
        }

        // 5. A postback may name its target stream directly.
        if let MessageContent::Postback(postback) = &part.content {
            if let Some(target) = postback
                .stream
                .as_ref()
                .filter(|target| is_stream(&self.flow.streams, target))
            {
                tracing::debug!(stream = %target, "postback directs to stream");
                self.cursor = self.cursor.clone().routed_to(target.clone());
                return Ok(Routing::Continue);
            }
        }

        // 6. Static classification mappings.
        if let Some(target) = self.keys.lookup(&self.flow.classifications).cloned() {
            tracing::debug!(stream = %target, "routing via classification mapping");
            self.cursor = self.cursor.clone().routed_to(target);
            return Ok(Routing::Continue);
        }

        if self.cursor.currently_active_step.is_none() {
            // 7. No active step, but an expectation names a stream: give its
            // start a chance to fall back before giving up.
            if let Some(stream) = expectations.stream.clone() {
                self.cursor = self
                    .cursor
                    .clone()
                    .routed_to(stream)
                    .with_fallback_request();
                self.cursor = run(self.cursor.clone(), &self.flow.streams, &self.client)?;
                if self.cursor.ran_fallback {
                    tracing::debug!("ran expectation fallback");
                    return Ok(Routing::Halt);
                }
                tracing::debug!("no expectation fallback ran; routing to end");
                self.cursor = Cursor {
                    run_fallback: false,
                    ..self.cursor.clone().routed_to(END_STREAM)
                };
                return Ok(Routing::Continue);
            }

            // 8. Nothing matched and nothing is active.
            tracing::debug!("routing to end");
            self.cursor = self.cursor.clone().routed_to(END_STREAM);
            return Ok(Routing::Continue);
        }

        // 9. An active step is waiting but nothing matched: restart the
        // flow from its initial position.
        tracing::debug!("no route matched; restarting from the initial position");
        self.cursor = Cursor::initial().with_first_run(false);
        Ok(Routing::Continue)
    }

    /// Policy-gated automatic replies driven by the predicted next message.
    fn auto_respond(&self, prediction: Option<&Prediction>) -> AutoRespond {
        let Some(prediction) = prediction else {
            return AutoRespond::Continue;
        };

        match prediction.direction.value.as_str() {
            "input" => {
                // More user input is expected before a response is due.
                if let Some(policy) = &self.flow.continuation {
                    if let Some(minimum) = policy.minimum_confidence {
                        if minimum > prediction.overall_confidence {
                            tracing::debug!(
                                confidence = prediction.overall_confidence,
                                "not confident enough in continuation"
                            );
                            return AutoRespond::Continue;
                        }
                    }
                    if policy.ignore {
                        tracing::debug!("ignoring message; user is expected to continue");
                        return AutoRespond::Handled;
                    }
                }
                tracing::debug!("continuation expected, but processing continues");
                AutoRespond::Continue
            }
            "output" => {
                let base = &prediction.base_type.value;
                let sub = &prediction.sub_type.value;
                let config = self
                    .flow
                    .auto_responses
                    .get(&format!("{}/{}", base, sub))
                    .or_else(|| self.flow.auto_responses.get(base.as_str()));
                let Some(config) = config else {
                    tracing::debug!("auto response not configured for the predicted response");
                    return AutoRespond::Continue;
                };

                let capable = prediction
                    .predicted_response
                    .as_ref()
                    .is_some_and(|response| response.auto_fill_capable);
                if !capable {
                    tracing::debug!("predicted response is not auto-fill capable");
                    return AutoRespond::Continue;
                }

                let minimum = config
                    .minimum_confidence
                    .unwrap_or(DEFAULT_MINIMUM_CONFIDENCE);
                if minimum > prediction.overall_confidence {
                    tracing::debug!(
                        confidence = prediction.overall_confidence,
                        minimum,
                        "prediction confidence below threshold"
                    );
                    return AutoRespond::Continue;
                }

                let mut name = format!("{}{}", RESPONSE_NAME_PREFIX, base);
                if !sub.is_empty() {
                    name.push('/');
                    name.push_str(sub);
                }
                tracing::debug!(response = %name, "automatically sending predicted response");
                self.client.add_response(&name, serde_json::json!({}));
                AutoRespond::Handled
            }
            direction => {
                tracing::debug!(%direction, "unrecognized prediction direction");
                AutoRespond::Continue
            }
        }
    }

    fn handle_event(&self, part: &MessagePart) {
        let MessageContent::Event {
            event_type,
            payload,
        } = &part.content
        else {
            return;
        };

        let handler = self
            .flow
            .event_handlers
            .get(event_type.as_str())
            .or_else(|| self.flow.event_handlers.get(WILDCARD_EVENT));
        match handler {
            Some(handler) => {
                tracing::debug!(event = %event_type, "dispatching event handler");
                handler(event_type, payload);
            }
            None => tracing::debug!(event = %event_type, "no matching event handler"),
        }
    }

    /// Reads the expectations persisted by a previous turn. Only the first
    /// entry of the `currentExpectations` object is honored.
    fn current_expectations(&self) -> Expectations {
        let state = self.client.conversation_state();
        let Some(map) = state
            .get(state_keys::CURRENT_EXPECTATIONS)
            .and_then(Value::as_object)
        else {
            tracing::debug!("no expectations on conversation state");
            return Expectations::default();
        };
        let Some((stream, list)) = map.iter().next() else {
            return Expectations::default();
        };

        let classifications = list
            .as_array()
            .map(|classifications| {
                classifications
                    .iter()
                    .filter_map(Value::as_str)
                    .map(|classification| (classification.to_string(), stream.clone()))
                    .collect()
            })
            .unwrap_or_default();

        tracing::debug!(stream = %stream, "found expectations on conversation state");
        Expectations {
            stream: Some(stream.clone()),
            classifications,
        }
    }

    fn persisted_stream_stack(&self) -> Vec<StackFrame> {
        self.client
            .conversation_state()
            .get(state_keys::EXPECTATIONS_STREAM_STACK)
            .cloned()
            .and_then(|stack| serde_json::from_value(stack).ok())
            .unwrap_or_default()
    }
}
