//! Transports move [`WireMessage`]s between two peers.
//!
//! A transport is handed out as an [`Attached`]: the sending half behind the
//! [`Transport`] trait plus the receiver its inbound traffic arrives on. The
//! receiver yields exactly one [`TransportEvent::Closed`] when the channel
//! goes away, whichever side closed it.

use std::fmt;
use std::sync::Arc;

use tether_types::WireMessage;
use tokio::sync::mpsc;

use crate::BusError;

mod framed;
mod in_process;
pub mod ipc;
pub mod tcp;

pub use in_process::InProcessTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    InProcess,
    Ipc,
    Tcp,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::InProcess => "in-process",
            Self::Ipc => "ipc",
            Self::Tcp => "tcp",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// `close()` was called on this side.
    Local,
    PeerHungUp,
    /// The peer sent bytes that could not be decoded into a message.
    Framing(String),
    Io(String),
}

impl CloseReason {
    /// The error pending requests fail with.
    #[must_use]
    pub fn to_error(&self) -> BusError {
        match self {
            Self::Local => BusError::TransportDisconnected("closed locally".to_string()),
            Self::PeerHungUp => BusError::TransportDisconnected("peer hung up".to_string()),
            Self::Framing(reason) => BusError::Framing(reason.clone()),
            Self::Io(reason) => BusError::TransportDisconnected(reason.clone()),
        }
    }
}

#[derive(Debug)]
pub enum TransportEvent {
    Message(WireMessage),
    Closed(CloseReason),
}

pub trait Transport: Send + Sync {
    fn kind(&self) -> TransportKind;

    /// Queue a message for the peer. Never blocks.
    fn send(&self, message: WireMessage) -> Result<(), BusError>;

    /// Idempotent.
    fn close(&self);

    /// Process id of the peer when this side spawned it.
    fn child_pid(&self) -> Option<u32> {
        None
    }
}

/// A live transport and the stream of its inbound events.
pub struct Attached {
    pub transport: Arc<dyn Transport>,
    pub events: mpsc::UnboundedReceiver<TransportEvent>,
}

impl fmt::Debug for Attached {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attached")
            .field("kind", &self.transport.kind())
            .finish_non_exhaustive()
    }
}
