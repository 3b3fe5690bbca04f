use std::fmt;

use serde::{Deserialize, Serialize};

use crate::classification::{Classification, Prediction};

/// Content types a message part can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Text,
    Event,
    Postback,
    Image,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageType::Text => "text",
            MessageType::Event => "event",
            MessageType::Postback => "postback",
            MessageType::Image => "image",
        };
        write!(f, "{}", name)
    }
}

/// Conversation participant roles. Only messages from roles in the flow's
/// allow-set are processed; the default allow-set is end-user only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParticipantRole {
    #[serde(rename = "app")]
    App,
    #[serde(rename = "agent")]
    Agent,
    #[serde(rename = "end-user")]
    EndUser,
}

impl fmt::Display for ParticipantRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParticipantRole::App => "app",
            ParticipantRole::Agent => "agent",
            ParticipantRole::EndUser => "end-user",
        };
        write!(f, "{}", name)
    }
}

/// Payload of a postback (button press) message part.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PostbackContent {
    /// A postback may name a stream to jump to directly.
    #[serde(default)]
    pub stream: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
}

/// The content of a single message part, tagged by type.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageContent {
    Text(String),
    Postback(PostbackContent),
    Image { url: Option<String> },
    Event {
        event_type: String,
        payload: serde_json::Value,
    },
}

impl MessageContent {
    pub fn content_type(&self) -> MessageType {
        match self {
            MessageContent::Text(_) => MessageType::Text,
            MessageContent::Postback(_) => MessageType::Postback,
            MessageContent::Image { .. } => MessageType::Image,
            MessageContent::Event { .. } => MessageType::Event,
        }
    }

    /// The textual body, if this content carries one.
    pub fn text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(text) => Some(text),
            MessageContent::Postback(postback) => postback.text.as_deref(),
            _ => None,
        }
    }
}

/// A single part of an inbound message: content plus the transient
/// NLP annotations the engine routes on.
#[derive(Debug, Clone, PartialEq)]
pub struct MessagePart {
    pub content: MessageContent,
    pub classification: Option<Classification>,
    pub predicted_next_message: Option<Prediction>,
}

impl MessagePart {
    pub fn new(content: MessageContent) -> Self {
        Self {
            content,
            classification: None,
            predicted_next_message: None,
        }
    }

    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.classification = Some(classification);
        self
    }

    pub fn with_prediction(mut self, prediction: Prediction) -> Self {
        self.predicted_next_message = Some(prediction);
        self
    }
}

/// An inbound message. Only the first part is processed per turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub sender_role: Option<ParticipantRole>,
    pub parts: Vec<MessagePart>,
}

impl Message {
    pub fn new(part: MessagePart) -> Self {
        Self {
            sender_role: None,
            parts: vec![part],
        }
    }

    pub fn with_sender_role(mut self, role: ParticipantRole) -> Self {
        self.sender_role = Some(role);
        self
    }
}
