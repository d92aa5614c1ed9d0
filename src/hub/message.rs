/// Wire envelope codec
///
/// Every frame on the socket is one JSON object:
/// - Outbound (client → server): `{topic, action, payload, ref}`
/// - Inbound (server → client): `{topic, event, payload, ref|null}`
///
/// `ack-ok` / `ack-err` inbound envelopes echo the `ref` of the action they
/// answer. Business events carry no meaningful ref and go to topic listeners.
use serde::{ Deserialize, Serialize };
use serde_json::Value;
use std::fmt;

use crate::errors::HubResult;

// ============================================================================
// RESERVED NAMES
// ============================================================================

/// Control topic carrying the identify handshake
pub const CONTROL_TOPIC: &str = "topichub";

pub const ACTION_IDENTIFY: &str = "identify";
pub const ACTION_SUBSCRIBE: &str = "subscribe";
pub const ACTION_UNSUBSCRIBE: &str = "unsubscribe";

pub const EVENT_ACK_OK: &str = "ack-ok";
pub const EVENT_ACK_ERR: &str = "ack-err";

pub const EVENT_PRESENCE_STATE: &str = "presence:state";
pub const EVENT_PRESENCE_JOIN: &str = "presence:join";
pub const EVENT_PRESENCE_LEAVE: &str = "presence:leave";

// ============================================================================
// TOPIC EVENTS
// ============================================================================

/// Business events a topic can deliver (names are wire-exact)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopicEvent {
    MessageCreated,
    MessageUpdated,
    MessageDeleted,
    ParticipantCreated,
    ParticipantUpdated,
    ParticipantDeleted,
    InvitationCreated,
    InvitationUpdated,
    InvitationDeleted,
    RelatedItemCreated,
    RelatedItemDeleted,
    DiscussionUpdated,
    DiscussionDeleted,
    Unsubscribed,
}

impl TopicEvent {
    pub const ALL: [TopicEvent; 14] = [
        TopicEvent::MessageCreated,
        TopicEvent::MessageUpdated,
        TopicEvent::MessageDeleted,
        TopicEvent::ParticipantCreated,
        TopicEvent::ParticipantUpdated,
        TopicEvent::ParticipantDeleted,
        TopicEvent::InvitationCreated,
        TopicEvent::InvitationUpdated,
        TopicEvent::InvitationDeleted,
        TopicEvent::RelatedItemCreated,
        TopicEvent::RelatedItemDeleted,
        TopicEvent::DiscussionUpdated,
        TopicEvent::DiscussionDeleted,
        TopicEvent::Unsubscribed,
    ];

    /// Get event name as it appears on the wire
    pub fn code(&self) -> &'static str {
        match self {
            TopicEvent::MessageCreated => "message:created",
            TopicEvent::MessageUpdated => "message:updated",
            TopicEvent::MessageDeleted => "message:deleted",
            TopicEvent::ParticipantCreated => "participant:created",
            TopicEvent::ParticipantUpdated => "participant:updated",
            TopicEvent::ParticipantDeleted => "participant:deleted",
            TopicEvent::InvitationCreated => "invitation:created",
            TopicEvent::InvitationUpdated => "invitation:updated",
            TopicEvent::InvitationDeleted => "invitation:deleted",
            TopicEvent::RelatedItemCreated => "relatedItem:created",
            TopicEvent::RelatedItemDeleted => "relatedItem:deleted",
            TopicEvent::DiscussionUpdated => "discussion:updated",
            TopicEvent::DiscussionDeleted => "discussion:deleted",
            TopicEvent::Unsubscribed => "unsubscribed",
        }
    }

    /// Parse event from wire name
    pub fn from_code(code: &str) -> Option<Self> {
        TopicEvent::ALL.iter()
            .copied()
            .find(|event| event.code() == code)
    }
}

impl AsRef<str> for TopicEvent {
    fn as_ref(&self) -> &str {
        self.code()
    }
}

impl fmt::Display for TopicEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// ENVELOPES
// ============================================================================

fn empty_payload() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Client → server envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundEnvelope {
    pub topic: String,
    pub action: String,
    #[serde(default = "empty_payload")]
    pub payload: Value,
    #[serde(rename = "ref")]
    pub reference: String,
}

/// Server → client envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEnvelope {
    pub topic: String,
    pub event: String,
    #[serde(default = "empty_payload")]
    pub payload: Value,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
}

impl OutboundEnvelope {
    pub fn new(
        topic: impl Into<String>,
        action: impl Into<String>,
        payload: Value,
        reference: impl Into<String>
    ) -> Self {
        Self {
            topic: topic.into(),
            action: action.into(),
            payload,
            reference: reference.into(),
        }
    }

    /// Identify handshake envelope on the control topic
    pub fn identify(token: &str, reference: impl Into<String>) -> Self {
        Self::new(CONTROL_TOPIC, ACTION_IDENTIFY, serde_json::json!({ "token": token }), reference)
    }

    pub fn is_identify(&self) -> bool {
        self.topic == CONTROL_TOPIC && self.action == ACTION_IDENTIFY
    }

    pub fn to_json(&self) -> HubResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> HubResult<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

impl InboundEnvelope {
    pub fn new(topic: impl Into<String>, event: impl Into<String>, payload: Value) -> Self {
        Self {
            topic: topic.into(),
            event: event.into(),
            payload,
            reference: None,
        }
    }

    /// Acknowledgement for `reference`
    pub fn ack(topic: impl Into<String>, reference: impl Into<String>, ok: bool, payload: Value) -> Self {
        Self {
            topic: topic.into(),
            event: (if ok { EVENT_ACK_OK } else { EVENT_ACK_ERR }).to_string(),
            payload,
            reference: Some(reference.into()),
        }
    }

    /// Set correlation reference
    pub fn with_ref(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// True for `ack-ok` / `ack-err`
    pub fn is_ack(&self) -> bool {
        self.event == EVENT_ACK_OK || self.event == EVENT_ACK_ERR
    }

    pub fn is_ack_ok(&self) -> bool {
        self.event == EVENT_ACK_OK
    }

    pub fn to_json(&self) -> HubResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> HubResult<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
