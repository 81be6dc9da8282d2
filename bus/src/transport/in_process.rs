use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tether_types::WireMessage;
use tokio::sync::mpsc;

use super::{Attached, CloseReason, Transport, TransportEvent, TransportKind};
use crate::BusError;

/// Both ends live in one process; messages move between them without
/// serialization.
pub struct InProcessTransport {
    local: mpsc::UnboundedSender<TransportEvent>,
    peer: mpsc::UnboundedSender<TransportEvent>,
    closed: Arc<AtomicBool>,
}

impl InProcessTransport {
    /// Two connected ends. Closing either one closes both.
    #[must_use]
    pub fn pair() -> (Attached, Attached) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));

        let a = Self {
            local: a_tx.clone(),
            peer: b_tx.clone(),
            closed: Arc::clone(&closed),
        };
        let b = Self {
            local: b_tx,
            peer: a_tx,
            closed,
        };

        (
            Attached {
                transport: Arc::new(a),
                events: a_rx,
            },
            Attached {
                transport: Arc::new(b),
                events: b_rx,
            },
        )
    }
}

impl Transport for InProcessTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::InProcess
    }

    fn send(&self, message: WireMessage) -> Result<(), BusError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BusError::disconnected());
        }
        self.peer
            .send(TransportEvent::Message(message))
            .map_err(|_| BusError::TransportDisconnected("peer dropped".to_string()))
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.local.send(TransportEvent::Closed(CloseReason::Local));
        let _ = self.peer.send(TransportEvent::Closed(CloseReason::PeerHungUp));
    }
}
