//! Shared machinery for byte-stream transports: one reader task that decodes
//! frames into events and one writer task that owns the write half.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tether_types::WireMessage;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::Child;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use super::{Attached, CloseReason, Transport, TransportEvent, TransportKind};
use crate::BusError;
use crate::codec::{FrameReader, FrameWriter};

enum WriterCommand {
    Send(WireMessage),
    Shutdown,
}

pub(crate) struct FramedTransport {
    kind: TransportKind,
    writer_tx: mpsc::UnboundedSender<WriterCommand>,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    closed: Arc<AtomicBool>,
    reader_abort: AbortHandle,
    child_pid: Option<u32>,
    child: Mutex<Option<Child>>,
}

/// Reports the close exactly once across the reader, the writer and `close()`.
fn report_closed(
    closed: &AtomicBool,
    events_tx: &mpsc::UnboundedSender<TransportEvent>,
    reason: CloseReason,
) {
    if !closed.swap(true, Ordering::AcqRel) {
        let _ = events_tx.send(TransportEvent::Closed(reason));
    }
}

pub(crate) fn attach<R, W>(
    kind: TransportKind,
    reader: R,
    writer: W,
    max_frame_bytes: usize,
    child: Option<Child>,
) -> Attached
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (events_tx, events) = mpsc::unbounded_channel();
    let (writer_tx, mut writer_rx) = mpsc::unbounded_channel::<WriterCommand>();
    let closed = Arc::new(AtomicBool::new(false));

    let writer_closed = Arc::clone(&closed);
    let writer_events = events_tx.clone();
    tokio::spawn(async move {
        let mut writer = FrameWriter::new(writer);
        while let Some(cmd) = writer_rx.recv().await {
            match cmd {
                WriterCommand::Send(message) => {
                    if let Err(e) = writer.write_frame(&message).await {
                        tracing::warn!("{kind} write error: {e}");
                        report_closed(
                            &writer_closed,
                            &writer_events,
                            CloseReason::Io(e.to_string()),
                        );
                        break;
                    }
                }
                WriterCommand::Shutdown => break,
            }
        }
    });

    let reader_closed = Arc::clone(&closed);
    let reader_events = events_tx.clone();
    let reader_handle = tokio::spawn(async move {
        let mut reader = FrameReader::with_limit(reader, max_frame_bytes);
        loop {
            match reader.read_frame::<WireMessage>().await {
                Ok(Some(message)) => {
                    tracing::trace!(
                        message_type = %message.message_type,
                        id = %message.message_id,
                        "{kind} frame received"
                    );
                    if reader_events.send(TransportEvent::Message(message)).is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    tracing::info!("{kind} peer closed the stream");
                    report_closed(&reader_closed, &reader_events, CloseReason::PeerHungUp);
                    break;
                }
                Err(e) if e.is_io() => {
                    tracing::warn!("{kind} read error: {e}");
                    report_closed(&reader_closed, &reader_events, CloseReason::Io(e.to_string()));
                    break;
                }
                Err(e) => {
                    tracing::warn!("{kind} framing error: {e}");
                    report_closed(
                        &reader_closed,
                        &reader_events,
                        CloseReason::Framing(e.to_string()),
                    );
                    break;
                }
            }
        }
    });

    let transport = FramedTransport {
        kind,
        writer_tx,
        events_tx,
        closed,
        reader_abort: reader_handle.abort_handle(),
        child_pid: child.as_ref().and_then(Child::id),
        child: Mutex::new(child),
    };

    Attached {
        transport: Arc::new(transport),
        events,
    }
}

impl Transport for FramedTransport {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    fn send(&self, message: WireMessage) -> Result<(), BusError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BusError::disconnected());
        }
        self.writer_tx
            .send(WriterCommand::Send(message))
            .map_err(|_| BusError::TransportDisconnected("writer task stopped".to_string()))
    }

    fn close(&self) {
        report_closed(&self.closed, &self.events_tx, CloseReason::Local);
        self.reader_abort.abort();
        let _ = self.writer_tx.send(WriterCommand::Shutdown);
        if let Ok(mut guard) = self.child.lock()
            && let Some(child) = guard.as_mut()
        {
            let _ = child.start_kill();
        }
    }

    fn child_pid(&self) -> Option<u32> {
        self.child_pid
    }
}

impl Drop for FramedTransport {
    fn drop(&mut self) {
        self.reader_abort.abort();
    }
}
