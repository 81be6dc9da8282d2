//! Request/response correlation and inbound dispatch over one transport.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};

use futures_util::{FutureExt, Stream};
use serde_json::Value;
use tether_types::{ErrorPayload, MessageId, Status, WireMessage};
use tokio::sync::{mpsc, oneshot, watch};

use crate::BusError;
use crate::transport::{Attached, Transport, TransportEvent};

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Value, BusError>> + Send>>;

type UnaryFn = dyn Fn(MessageId, Value) -> HandlerFuture + Send + Sync;
type StreamFn = dyn Fn(MessageId, Value, StreamSink) -> HandlerFuture + Send + Sync;

#[derive(Clone)]
enum Handler {
    Unary(Arc<UnaryFn>),
    Stream(Arc<StreamFn>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Uninitialized,
    /// At least one handler is installed.
    Wired,
    Active,
    Closed,
}

/// What `on_request` does when a handler for the type already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RegistrationPolicy {
    /// The new handler replaces the old one.
    #[default]
    Replace,
    /// Registration fails with [`BusError::DuplicateHandler`].
    Reject,
}

enum Waiter {
    Single(oneshot::Sender<Result<Value, BusError>>),
    Stream(mpsc::UnboundedSender<Result<Value, BusError>>),
}

impl Waiter {
    fn complete(self, result: Result<Value, BusError>) {
        match self {
            Self::Single(tx) => {
                let _ = tx.send(result);
            }
            Self::Stream(tx) => match result {
                Ok(Value::Null) => {}
                other => {
                    let _ = tx.send(other);
                }
            },
        }
    }
}

#[derive(Default)]
struct Pending {
    waiters: HashMap<MessageId, Waiter>,
    /// Set once; later requests fail with a copy.
    closed: Option<BusError>,
}

struct Shared {
    label: String,
    transport: Arc<dyn Transport>,
    events: Mutex<Option<mpsc::UnboundedReceiver<TransportEvent>>>,
    handlers: Mutex<HashMap<String, Handler>>,
    pending: Mutex<Pending>,
    state: watch::Sender<ConnectionState>,
    policy: RegistrationPolicy,
}

/// One end of a bus link.
///
/// Cloning is cheap and every clone refers to the same connection. The
/// transport is closed when the last clone is dropped.
#[derive(Clone)]
pub struct Connection {
    shared: Arc<Shared>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("label", &self.shared.label)
            .field("transport", &self.shared.transport.kind())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Non-owning handle to a [`Connection`], for handlers installed on another
/// connection that must not keep this one alive.
#[derive(Clone)]
pub struct WeakConnection {
    shared: Weak<Shared>,
}

impl WeakConnection {
    #[must_use]
    pub fn upgrade(&self) -> Option<Connection> {
        self.shared.upgrade().map(|shared| Connection { shared })
    }
}

impl fmt::Debug for WeakConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakConnection").finish_non_exhaustive()
    }
}

impl Connection {
    pub fn new(label: impl Into<String>, attached: Attached) -> Self {
        Self::with_policy(label, attached, RegistrationPolicy::default())
    }

    pub fn with_policy(
        label: impl Into<String>,
        attached: Attached,
        policy: RegistrationPolicy,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Uninitialized);
        Self {
            shared: Arc::new(Shared {
                label: label.into(),
                transport: attached.transport,
                events: Mutex::new(Some(attached.events)),
                handlers: Mutex::new(HashMap::new()),
                pending: Mutex::new(Pending::default()),
                state,
                policy,
            }),
        }
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakConnection {
        WeakConnection {
            shared: Arc::downgrade(&self.shared),
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.shared.label
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Install the handler for `message_type`.
    pub fn on_request<F, Fut>(
        &self,
        message_type: impl Into<String>,
        handler: F,
    ) -> Result<(), BusError>
    where
        F: Fn(MessageId, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, BusError>> + Send + 'static,
    {
        let handler: Arc<UnaryFn> =
            Arc::new(move |id, data| -> HandlerFuture { Box::pin(handler(id, data)) });
        self.register(message_type.into(), Handler::Unary(handler))
    }

    /// Install a handler that answers with `pending` chunks pushed through
    /// the [`StreamSink`], followed by its return value as the final response.
    pub fn on_stream<F, Fut>(
        &self,
        message_type: impl Into<String>,
        handler: F,
    ) -> Result<(), BusError>
    where
        F: Fn(MessageId, Value, StreamSink) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, BusError>> + Send + 'static,
    {
        let handler: Arc<StreamFn> = Arc::new(move |id, data, sink| -> HandlerFuture {
            Box::pin(handler(id, data, sink))
        });
        self.register(message_type.into(), Handler::Stream(handler))
    }

    #[must_use]
    pub fn has_handler(&self, message_type: &str) -> bool {
        lock(&self.shared.handlers).contains_key(message_type)
    }

    fn register(&self, message_type: String, handler: Handler) -> Result<(), BusError> {
        {
            let mut handlers = lock(&self.shared.handlers);
            if handlers.contains_key(&message_type) {
                match self.shared.policy {
                    RegistrationPolicy::Reject => {
                        return Err(BusError::DuplicateHandler(message_type));
                    }
                    RegistrationPolicy::Replace => tracing::debug!(
                        connection = %self.shared.label,
                        %message_type,
                        "replacing handler"
                    ),
                }
            }
            handlers.insert(message_type, handler);
        }
        self.shared.state.send_if_modified(|state| {
            if *state == ConnectionState::Uninitialized {
                *state = ConnectionState::Wired;
                true
            } else {
                false
            }
        });
        Ok(())
    }

    /// Begin draining the transport. Inbound traffic that arrived earlier is
    /// delivered now. Calling `start` twice is a no-op.
    pub fn start(&self) -> Result<(), BusError> {
        let activated = self.shared.state.send_if_modified(|state| match state {
            ConnectionState::Uninitialized | ConnectionState::Wired => {
                *state = ConnectionState::Active;
                true
            }
            ConnectionState::Active | ConnectionState::Closed => false,
        });
        if !activated {
            return match self.state() {
                ConnectionState::Closed => Err(BusError::disconnected()),
                _ => Ok(()),
            };
        }

        let Some(events) = lock(&self.shared.events).take() else {
            return Ok(());
        };
        tracing::info!(
            connection = %self.shared.label,
            transport = %self.shared.transport.kind(),
            "connection active"
        );
        tokio::spawn(run_dispatch(Arc::downgrade(&self.shared), events));
        Ok(())
    }

    /// Close the transport and fail every pending request.
    pub fn close(&self) {
        self.shared.transport.close();
        self.shared
            .shut_down(BusError::TransportDisconnected("connection closed".to_string()));
    }

    /// Resolves once the connection is closed, from either side.
    pub async fn closed(&self) {
        let mut rx = self.shared.state.subscribe();
        let _ = rx.wait_for(|state| *state == ConnectionState::Closed).await;
    }

    pub async fn request(&self, message_type: &str, data: Value) -> Result<Value, BusError> {
        self.request_with_id(MessageId::generate(), message_type, data)
            .await
    }

    /// Send a request under a caller-chosen id, as forwarding does.
    pub async fn request_with_id(
        &self,
        id: MessageId,
        message_type: &str,
        data: Value,
    ) -> Result<Value, BusError> {
        let (tx, rx) = oneshot::channel();
        self.shared
            .send_request(id, message_type, data, Waiter::Single(tx))?;
        rx.await.unwrap_or_else(|_| Err(BusError::disconnected()))
    }

    pub fn request_stream(
        &self,
        message_type: &str,
        data: Value,
    ) -> Result<ResponseStream, BusError> {
        self.request_stream_with_id(MessageId::generate(), message_type, data)
    }

    pub fn request_stream_with_id(
        &self,
        id: MessageId,
        message_type: &str,
        data: Value,
    ) -> Result<ResponseStream, BusError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.shared
            .send_request(id, message_type, data, Waiter::Stream(tx))?;
        Ok(ResponseStream { rx })
    }

    /// Fire and forget. Transmit failures are logged, never returned.
    pub fn notify(&self, message_type: &str, data: Value) {
        let message = WireMessage::request(message_type, data);
        if let Err(e) = self.shared.transport.send(message) {
            tracing::warn!(
                connection = %self.shared.label,
                %message_type,
                "notification not sent: {e}"
            );
        }
    }
}

impl Shared {
    fn send_request(
        &self,
        id: MessageId,
        message_type: &str,
        data: Value,
        waiter: Waiter,
    ) -> Result<(), BusError> {
        {
            let mut pending = lock(&self.pending);
            if let Some(err) = &pending.closed {
                return Err(err.clone());
            }
            if pending.waiters.contains_key(&id) {
                return Err(BusError::DuplicateMessageId(id.to_string()));
            }
            pending.waiters.insert(id.clone(), waiter);
        }

        tracing::trace!(connection = %self.label, %message_type, %id, "request");
        let message = WireMessage::request_with_id(id.clone(), message_type, data);
        if let Err(e) = self.transport.send(message) {
            lock(&self.pending).waiters.remove(&id);
            return Err(e);
        }
        Ok(())
    }

    fn dispatch(&self, message: WireMessage) {
        match message.status() {
            None => self.handle_request(message),
            Some(status) => self.handle_response(message, status),
        }
    }

    fn handle_request(&self, message: WireMessage) {
        let WireMessage {
            message_id,
            message_type,
            data,
            ..
        } = message;

        let handler = lock(&self.handlers).get(&message_type).cloned();
        let Some(handler) = handler else {
            tracing::warn!(connection = %self.label, %message_type, "no handler for message type");
            let err = BusError::UnknownMessageType(message_type.clone());
            self.reply(WireMessage::reply_error(
                message_id,
                message_type,
                &err.to_payload(),
            ));
            return;
        };

        tracing::debug!(connection = %self.label, %message_type, id = %message_id, "dispatch");
        let transport = Arc::clone(&self.transport);
        let label = self.label.clone();
        tokio::spawn(async move {
            let invoke: HandlerFuture = match handler {
                Handler::Unary(f) => {
                    let id = message_id.clone();
                    Box::pin(async move { f(id, data).await })
                }
                Handler::Stream(f) => {
                    let sink = StreamSink {
                        id: message_id.clone(),
                        message_type: message_type.clone(),
                        transport: Arc::clone(&transport),
                    };
                    let id = message_id.clone();
                    Box::pin(async move { f(id, data, sink).await })
                }
            };

            let reply = match AssertUnwindSafe(invoke).catch_unwind().await {
                Ok(Ok(value)) => WireMessage::reply_success(message_id, &message_type, value),
                Ok(Err(err)) => {
                    tracing::debug!(connection = %label, %message_type, "handler failed: {err}");
                    WireMessage::reply_error(message_id, &message_type, &err.to_payload())
                }
                Err(panic) => {
                    let reason = panic_payload_to_string(&panic);
                    tracing::warn!(
                        connection = %label,
                        %message_type,
                        "handler panicked: {reason}"
                    );
                    let err = BusError::HandlerFault {
                        message_type: message_type.clone(),
                        reason,
                    };
                    WireMessage::reply_error(message_id, &message_type, &err.to_payload())
                }
            };

            if let Err(e) = transport.send(reply) {
                tracing::debug!(connection = %label, %message_type, "reply dropped: {e}");
            }
        });
    }

    fn handle_response(&self, message: WireMessage, status: Status) {
        let id = message.message_id;
        let mut pending = lock(&self.pending);

        if status == Status::Pending {
            match pending.waiters.get(&id) {
                Some(Waiter::Stream(tx)) => {
                    let _ = tx.send(Ok(message.data));
                }
                Some(Waiter::Single(_)) => {
                    tracing::debug!(
                        connection = %self.label,
                        %id,
                        "chunk for a unary request ignored"
                    );
                }
                None => tracing::trace!(connection = %self.label, %id, "chunk for unknown id"),
            }
            return;
        }

        let Some(waiter) = pending.waiters.remove(&id) else {
            tracing::trace!(connection = %self.label, %id, "response for unknown id");
            return;
        };
        drop(pending);

        let result = if status == Status::Success {
            Ok(message.data)
        } else {
            Err(BusError::Remote(ErrorPayload::from_value(message.data)))
        };
        waiter.complete(result);
    }

    fn reply(&self, message: WireMessage) {
        if let Err(e) = self.transport.send(message) {
            tracing::debug!(connection = %self.label, "reply dropped: {e}");
        }
    }

    fn shut_down(&self, error: BusError) {
        let waiters = {
            let mut pending = lock(&self.pending);
            if pending.closed.is_none() {
                pending.closed = Some(error.clone());
            }
            std::mem::take(&mut pending.waiters)
        };
        self.state.send_replace(ConnectionState::Closed);

        if !waiters.is_empty() {
            tracing::warn!(
                connection = %self.label,
                count = waiters.len(),
                "failing pending requests: {error}"
            );
        }
        for waiter in waiters.into_values() {
            waiter.complete(Err(error.clone()));
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        self.transport.close();
    }
}

async fn run_dispatch(shared: Weak<Shared>, mut events: mpsc::UnboundedReceiver<TransportEvent>) {
    while let Some(event) = events.recv().await {
        let Some(shared) = shared.upgrade() else {
            return;
        };
        match event {
            TransportEvent::Message(message) => shared.dispatch(message),
            TransportEvent::Closed(reason) => {
                tracing::info!(connection = %shared.label, ?reason, "transport closed");
                shared.shut_down(reason.to_error());
                return;
            }
        }
    }
    if let Some(shared) = shared.upgrade() {
        shared.shut_down(BusError::disconnected());
    }
}

/// Pushes `pending` chunks for one inbound streaming request.
#[derive(Clone)]
pub struct StreamSink {
    id: MessageId,
    message_type: String,
    transport: Arc<dyn Transport>,
}

impl StreamSink {
    #[must_use]
    pub fn id(&self) -> &MessageId {
        &self.id
    }

    pub fn send(&self, chunk: Value) -> Result<(), BusError> {
        self.transport
            .send(WireMessage::chunk(self.id.clone(), &self.message_type, chunk))
    }
}

impl fmt::Debug for StreamSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamSink")
            .field("id", &self.id)
            .field("message_type", &self.message_type)
            .finish_non_exhaustive()
    }
}

/// Chunks of a streamed response, ending after the final response.
///
/// An error response or a closed connection yields one `Err` and then ends.
#[derive(Debug)]
pub struct ResponseStream {
    rx: mpsc::UnboundedReceiver<Result<Value, BusError>>,
}

impl Stream for ResponseStream {
    type Item = Result<Value, BusError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn panic_payload_to_string(payload: &Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
