//! The [`WireMessage`] envelope and the error payload carried by error responses.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::MessageId;

/// Response status. Absent on requests and notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// One streamed chunk of a response that is still in flight.
    Pending,
    Success,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

/// One unit of traffic on a transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    pub message_id: MessageId,
    pub message_type: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl WireMessage {
    /// A request or notification under a freshly generated id.
    #[must_use]
    pub fn request(message_type: impl Into<String>, data: Value) -> Self {
        Self::request_with_id(MessageId::generate(), message_type, data)
    }

    #[must_use]
    pub fn request_with_id(id: MessageId, message_type: impl Into<String>, data: Value) -> Self {
        Self {
            message_id: id,
            message_type: message_type.into(),
            data,
            metadata: None,
        }
    }

    #[must_use]
    pub fn reply_success(id: MessageId, message_type: impl Into<String>, data: Value) -> Self {
        Self::with_status(id, message_type, data, Status::Success)
    }

    #[must_use]
    pub fn reply_error(
        id: MessageId,
        message_type: impl Into<String>,
        error: &ErrorPayload,
    ) -> Self {
        let data = serde_json::to_value(error).unwrap_or(Value::Null);
        Self::with_status(id, message_type, data, Status::Error)
    }

    #[must_use]
    pub fn chunk(id: MessageId, message_type: impl Into<String>, data: Value) -> Self {
        Self::with_status(id, message_type, data, Status::Pending)
    }

    fn with_status(
        id: MessageId,
        message_type: impl Into<String>,
        data: Value,
        status: Status,
    ) -> Self {
        Self {
            message_id: id,
            message_type: message_type.into(),
            data,
            metadata: Some(Metadata {
                status: Some(status),
            }),
        }
    }

    /// `None` means this is an inbound request or notification.
    #[must_use]
    pub fn status(&self) -> Option<Status> {
        self.metadata.as_ref().and_then(|m| m.status)
    }
}

/// Error taxonomy shared by both ends of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    UnknownMessageType,
    HandlerFault,
    CollaboratorFailure,
    TransportDisconnected,
    FramingError,
    InvalidPayload,
    DuplicateHandler,
    DuplicateMessageId,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnknownMessageType => "unknownMessageType",
            Self::HandlerFault => "handlerFault",
            Self::CollaboratorFailure => "collaboratorFailure",
            Self::TransportDisconnected => "transportDisconnected",
            Self::FramingError => "framingError",
            Self::InvalidPayload => "invalidPayload",
            Self::DuplicateHandler => "duplicateHandler",
            Self::DuplicateMessageId => "duplicateMessageId",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `data` of an error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorPayload {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Recover a payload from an error response's `data`.
    ///
    /// Peers that answer with an arbitrary value are reported as a handler fault
    /// carrying that value's text.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match serde_json::from_value::<Self>(value.clone()) {
            Ok(payload) => payload,
            Err(_) => {
                let message = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                Self::new(ErrorKind::HandlerFault, message)
            }
        }
    }
}

impl fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}
