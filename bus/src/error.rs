use tether_types::{ErrorKind, ErrorPayload};
use thiserror::Error;

use crate::codec::FrameError;

#[derive(Debug, Clone, Error)]
pub enum BusError {
    #[error("no handler for message type {0}")]
    UnknownMessageType(String),
    #[error("handler for {message_type} failed: {reason}")]
    HandlerFault { message_type: String, reason: String },
    #[error("collaborator call failed: {0}")]
    CollaboratorFailure(String),
    #[error("transport disconnected: {0}")]
    TransportDisconnected(String),
    #[error("framing error: {0}")]
    Framing(String),
    #[error("invalid payload for {message_type}: {reason}")]
    InvalidPayload { message_type: String, reason: String },
    #[error("a handler for {0} is already registered")]
    DuplicateHandler(String),
    #[error("message id {0} already has a pending request")]
    DuplicateMessageId(String),
    /// The peer answered with an error response.
    #[error("{0}")]
    Remote(ErrorPayload),
}

impl BusError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownMessageType(_) => ErrorKind::UnknownMessageType,
            Self::HandlerFault { .. } => ErrorKind::HandlerFault,
            Self::CollaboratorFailure(_) => ErrorKind::CollaboratorFailure,
            Self::TransportDisconnected(_) => ErrorKind::TransportDisconnected,
            Self::Framing(_) => ErrorKind::FramingError,
            Self::InvalidPayload { .. } => ErrorKind::InvalidPayload,
            Self::DuplicateHandler(_) => ErrorKind::DuplicateHandler,
            Self::DuplicateMessageId(_) => ErrorKind::DuplicateMessageId,
            Self::Remote(payload) => payload.kind,
        }
    }

    /// The `data` of an error response reporting this error.
    ///
    /// A remote error is passed on unchanged so its kind survives forwarding.
    #[must_use]
    pub fn to_payload(&self) -> ErrorPayload {
        match self {
            Self::Remote(payload) => payload.clone(),
            other => ErrorPayload::new(other.kind(), other.to_string()),
        }
    }

    /// Whether the connection cannot carry traffic after this error.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::TransportDisconnected(_) | Self::Framing(_))
    }

    pub(crate) fn disconnected() -> Self {
        Self::TransportDisconnected("connection closed".to_string())
    }
}

impl From<FrameError> for BusError {
    fn from(err: FrameError) -> Self {
        if err.is_io() {
            Self::TransportDisconnected(err.to_string())
        } else {
            Self::Framing(err.to_string())
        }
    }
}
