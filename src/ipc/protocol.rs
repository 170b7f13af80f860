//! Control channel message types and codec
//!
//! Every message in either direction is an [`Event`]: a type tag, the UTC time
//! the sender created it, and an opaque payload whose schema is keyed by the
//! tag. The codec works on one already-delimited message; framing lives in
//! [`super::transport`].
//!
//! ```text
//! {"type":"error","created":"2026-10-19T08:15:02.118Z","payload":{"error":"no track loaded"}}
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::{Error, Result};

/// Event type tag
///
/// Known tags get their own variant; anything else is kept verbatim in
/// `Other` so newer daemons can add events without breaking older clients.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    Pause,
    Paused,
    Resume,
    Resumed,
    Stop,
    Stopped,
    Error,
    Other(String),
}

impl EventType {
    /// The wire tag for this type
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pause => "pause",
            Self::Paused => "paused",
            Self::Resume => "resume",
            Self::Resumed => "resumed",
            Self::Stop => "stop",
            Self::Stopped => "stopped",
            Self::Error => "error",
            Self::Other(tag) => tag,
        }
    }
}

impl From<String> for EventType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "pause" => Self::Pause,
            "paused" => Self::Paused,
            "resume" => Self::Resume,
            "resumed" => Self::Resumed,
            "stop" => Self::Stop,
            "stopped" => Self::Stopped,
            "error" => Self::Error,
            _ => Self::Other(tag),
        }
    }
}

impl From<EventType> for String {
    fn from(kind: EventType) -> Self {
        match kind {
            EventType::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single control message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// What this event means; decides how `payload` is read
    #[serde(rename = "type")]
    pub kind: EventType,
    /// When the sender produced the event. Advisory only; a sender that
    /// leaves it out gets the Unix epoch.
    #[serde(default)]
    pub created: DateTime<Utc>,
    /// Type-specific data, `null` for payload-less events
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,
}

impl Event {
    /// Create a payload-less event stamped with the current time
    pub fn new(kind: EventType) -> Self {
        Self {
            kind,
            created: Utc::now(),
            payload: Value::Null,
        }
    }

    /// Create an event carrying a serialized payload
    pub fn with_payload<P: Serialize>(kind: EventType, payload: &P) -> Result<Self> {
        Ok(Self {
            kind,
            created: Utc::now(),
            payload: serde_json::to_value(payload)?,
        })
    }

    /// Create an error event with the given description
    pub fn error(description: impl Into<String>) -> Self {
        Self {
            kind: EventType::Error,
            created: Utc::now(),
            payload: serde_json::json!({ "error": description.into() }),
        }
    }

    /// Read the payload as `P`, but only if this event is of type `expected`
    pub fn payload_as<P: DeserializeOwned>(&self, expected: &EventType) -> Result<P> {
        if &self.kind != expected {
            return Err(Error::unexpected_payload(expected.as_str(), self.kind.as_str()));
        }
        serde_json::from_value(self.payload.clone()).map_err(Error::MalformedMessage)
    }

    /// Read the payload of an error event
    pub fn error_payload(&self) -> Result<ErrorPayload> {
        self.payload_as(&EventType::Error)
    }
}

/// Payload of an `error` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Human-readable description of what went wrong on the daemon side
    pub error: String,
}

/// Encode an event into its canonical JSON form
pub fn encode(event: &Event) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(event)?)
}

/// Decode one message into an event
pub fn decode(bytes: &[u8]) -> Result<Event> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(Error::EmptyMessage);
    }
    serde_json::from_slice(bytes).map_err(Error::MalformedMessage)
}

/// Playback commands the client can issue
///
/// Each command is a request event answered by exactly one acknowledgement
/// event or an `error` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Pause,
    Resume,
    Stop,
}

impl ControlCommand {
    /// Event type sent to the daemon
    pub fn request_type(self) -> EventType {
        match self {
            Self::Pause => EventType::Pause,
            Self::Resume => EventType::Resume,
            Self::Stop => EventType::Stop,
        }
    }

    /// Event type the daemon answers with on success
    pub fn ack_type(self) -> EventType {
        match self {
            Self::Pause => EventType::Paused,
            Self::Resume => EventType::Resumed,
            Self::Stop => EventType::Stopped,
        }
    }

    /// Map a request event type back to its command
    pub fn from_request(kind: &EventType) -> Option<Self> {
        match kind {
            EventType::Pause => Some(Self::Pause),
            EventType::Resume => Some(Self::Resume),
            EventType::Stop => Some(Self::Stop),
            _ => None,
        }
    }

    /// Build the request event for this command
    pub fn request(self) -> Event {
        Event::new(self.request_type())
    }

    /// Build the acknowledgement event for this command
    pub fn ack(self) -> Event {
        Event::new(self.ack_type())
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.request_type().as_str())
    }
}
