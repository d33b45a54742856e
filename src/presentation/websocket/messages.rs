//! WebSocket Message Types
//!
//! Inbound command envelopes and the JSON replies written back to peers.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One data record inside an envelope
pub type Record = Map<String, Value>;

/// Incoming `{messageType, data}` envelope
#[derive(Debug, Deserialize)]
pub struct CommandEnvelope {
    #[serde(rename = "messageType")]
    pub message_type: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub data: Vec<Record>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Record>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Record>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Routed message types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    GetAds,
    UserIsTyping,
    GetMySessionId,
    WebCall,
    Reject,
    SdpAnswer,
}

impl MessageType {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "getADS" => Some(MessageType::GetAds),
            "UserIsTyping" => Some(MessageType::UserIsTyping),
            "getMySessionId" => Some(MessageType::GetMySessionId),
            "webcall" => Some(MessageType::WebCall),
            "reject" => Some(MessageType::Reject),
            "sdpAnswer" => Some(MessageType::SdpAnswer),
            _ => None,
        }
    }

    /// Wire tag
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::GetAds => "getADS",
            MessageType::UserIsTyping => "UserIsTyping",
            MessageType::GetMySessionId => "getMySessionId",
            MessageType::WebCall => "webcall",
            MessageType::Reject => "reject",
            MessageType::SdpAnswer => "sdpAnswer",
        }
    }
}

/// Decoded command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    GetAds {
        count: Option<usize>,
        locale: Option<String>,
    },
    UserIsTyping {
        token: String,
        room: String,
    },
    GetMySessionId,
    WebCall {
        target: String,
        payload: String,
    },
    Reject {
        targets: Vec<String>,
    },
    SdpAnswer {
        target: String,
        sdp: String,
    },
}

/// Command decode errors. None of them end the connection.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Unknown message type: {0}")]
    UnknownType(String),

    #[error("{message_type}: missing field `{field}`")]
    MissingField {
        message_type: &'static str,
        field: &'static str,
    },

    #[error("{message_type}: field `{field}` has the wrong type")]
    InvalidField {
        message_type: &'static str,
        field: &'static str,
    },
}

impl Command {
    /// Decode a text frame into a typed command.
    pub fn decode(text: &str) -> Result<Self, CommandError> {
        let envelope: CommandEnvelope = serde_json::from_str(text)?;
        Self::from_envelope(envelope)
    }

    pub fn from_envelope(envelope: CommandEnvelope) -> Result<Self, CommandError> {
        let message_type = MessageType::parse(&envelope.message_type)
            .ok_or(CommandError::UnknownType(envelope.message_type))?;
        let mt = message_type.as_str();
        let first = envelope.data.first();

        match message_type {
            MessageType::GetAds => {
                let count = match first.and_then(|r| r.get("count")) {
                    None | Some(Value::Null) => None,
                    Some(value) => Some(parse_count(value).ok_or(CommandError::InvalidField {
                        message_type: mt,
                        field: "count",
                    })?),
                };
                let locale = first
                    .map(|r| optional_string(mt, r, "lang"))
                    .transpose()?
                    .flatten()
                    .filter(|l| !l.is_empty());
                Ok(Command::GetAds { count, locale })
            }
            MessageType::UserIsTyping => {
                let record = require_record(mt, first, "token")?;
                Ok(Command::UserIsTyping {
                    token: required_string(mt, record, "token")?,
                    room: required_string(mt, record, "room")?,
                })
            }
            MessageType::GetMySessionId => Ok(Command::GetMySessionId),
            MessageType::WebCall => {
                let record = require_record(mt, first, "id")?;
                let target = required_string(mt, record, "id")?;
                let payload = match record.get("payload") {
                    None => {
                        return Err(CommandError::MissingField {
                            message_type: mt,
                            field: "payload",
                        })
                    }
                    Some(Value::String(raw)) => raw.clone(),
                    Some(other) => other.to_string(),
                };
                Ok(Command::WebCall { target, payload })
            }
            MessageType::Reject => {
                let targets = envelope
                    .data
                    .iter()
                    .filter_map(|r| optional_string(mt, r, "id").ok().flatten())
                    .collect();
                Ok(Command::Reject { targets })
            }
            MessageType::SdpAnswer => {
                let record = require_record(mt, first, "sessionID")?;
                Ok(Command::SdpAnswer {
                    target: required_string(mt, record, "sessionID")?,
                    sdp: required_string(mt, record, "sdpAnswer")?,
                })
            }
        }
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            Command::GetAds { .. } => MessageType::GetAds,
            Command::UserIsTyping { .. } => MessageType::UserIsTyping,
            Command::GetMySessionId => MessageType::GetMySessionId,
            Command::WebCall { .. } => MessageType::WebCall,
            Command::Reject { .. } => MessageType::Reject,
            Command::SdpAnswer { .. } => MessageType::SdpAnswer,
        }
    }
}

fn require_record<'a>(
    message_type: &'static str,
    record: Option<&'a Record>,
    field: &'static str,
) -> Result<&'a Record, CommandError> {
    record.ok_or(CommandError::MissingField {
        message_type,
        field,
    })
}

/// Ids may arrive as strings or bare numbers.
fn optional_string(
    message_type: &'static str,
    record: &Record,
    field: &'static str,
) -> Result<Option<String>, CommandError> {
    match record.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(_) => Err(CommandError::InvalidField {
            message_type,
            field,
        }),
    }
}

fn required_string(
    message_type: &'static str,
    record: &Record,
    field: &'static str,
) -> Result<String, CommandError> {
    optional_string(message_type, record, field)?.ok_or(CommandError::MissingField {
        message_type,
        field,
    })
}

fn parse_count(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Reply to `getMySessionId`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdReply {
    pub session: String,
}

/// Bare `{"command": ...}` notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandReply {
    pub command: String,
}

impl CommandReply {
    /// Tells a peer that the call was ended
    pub fn end_call() -> Self {
        Self {
            command: "endc".to_string(),
        }
    }
}

/// SDP answer relayed to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdpAnswerReply {
    pub command: String,
    pub userb: String,
    pub sdp: String,
    pub usera: String,
}

impl SdpAnswerReply {
    pub fn new(target: &str, sdp: &str, sender: &str) -> Self {
        Self {
            command: "sdpAnswer".to_string(),
            userb: target.to_string(),
            sdp: sdp.to_string(),
            usera: sender.to_string(),
        }
    }
}
