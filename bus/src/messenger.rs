//! Typed operations over a [`Connection`].
//!
//! `Messenger<In, Out>` may only send members of `Out` and only handle
//! members of `In`, so a message that the peer's table does not list is a
//! compile error rather than an `UnknownMessageType` response.

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tether_types::protocol::{Member, MessageType, Table};

use crate::BusError;
use crate::connection::{Connection, StreamSink};

pub struct Messenger<In, Out> {
    connection: Connection,
    _tables: PhantomData<fn() -> (In, Out)>,
}

impl<In, Out> Clone for Messenger<In, Out> {
    fn clone(&self) -> Self {
        Self {
            connection: self.connection.clone(),
            _tables: PhantomData,
        }
    }
}

impl<In, Out> fmt::Debug for Messenger<In, Out> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Messenger").field(&self.connection).finish()
    }
}

impl<In: Table, Out: Table> Messenger<In, Out> {
    #[must_use]
    pub fn new(connection: Connection) -> Self {
        Self {
            connection,
            _tables: PhantomData,
        }
    }

    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub async fn request<M: Member<Out>>(
        &self,
        payload: M::Request,
    ) -> Result<M::Response, BusError> {
        let data = encode_payload::<M, _>(&payload)?;
        let value = self.connection.request(M::NAME, data).await?;
        decode_payload::<M, _>(value)
    }

    pub fn notify<M: Member<Out>>(&self, payload: M::Request) {
        match encode_payload::<M, _>(&payload) {
            Ok(data) => self.connection.notify(M::NAME, data),
            Err(e) => tracing::warn!("notification not sent: {e}"),
        }
    }

    pub fn request_stream<M: Member<Out>>(
        &self,
        payload: M::Request,
    ) -> Result<
        impl Stream<Item = Result<M::Response, BusError>> + Send + Unpin + 'static,
        BusError,
    > {
        const { assert!(M::STREAMING, "request_stream needs a streaming message type") };
        let data = encode_payload::<M, _>(&payload)?;
        let stream = self.connection.request_stream(M::NAME, data)?;
        Ok(stream.map(|item| item.and_then(decode_payload::<M, M::Response>)))
    }

    pub fn on<M, F, Fut>(&self, handler: F) -> Result<(), BusError>
    where
        M: Member<In>,
        F: Fn(M::Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<M::Response, BusError>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        self.connection.on_request(M::NAME, move |_id, data| {
            let handler = Arc::clone(&handler);
            async move {
                let request = decode_payload::<M, M::Request>(data)?;
                let response = handler(request).await?;
                encode_payload::<M, _>(&response)
            }
        })
    }

    /// Handle a streaming type. Chunks go through the [`ChunkSink`]; the
    /// final response is sent when the handler returns.
    pub fn on_stream<M, F, Fut>(&self, handler: F) -> Result<(), BusError>
    where
        M: Member<In>,
        F: Fn(M::Request, ChunkSink<M>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BusError>> + Send + 'static,
    {
        const { assert!(M::STREAMING, "on_stream needs a streaming message type") };
        let handler = Arc::new(handler);
        self.connection.on_stream(M::NAME, move |_id, data, sink| {
            let handler = Arc::clone(&handler);
            async move {
                let request = decode_payload::<M, M::Request>(data)?;
                handler(request, ChunkSink::new(sink)).await?;
                Ok(Value::Null)
            }
        })
    }
}

/// Typed chunk sender for one streaming request.
pub struct ChunkSink<M> {
    sink: StreamSink,
    _message: PhantomData<fn() -> M>,
}

impl<M> Clone for ChunkSink<M> {
    fn clone(&self) -> Self {
        Self {
            sink: self.sink.clone(),
            _message: PhantomData,
        }
    }
}

impl<M> fmt::Debug for ChunkSink<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ChunkSink").field(&self.sink).finish()
    }
}

impl<M: MessageType> ChunkSink<M> {
    fn new(sink: StreamSink) -> Self {
        Self {
            sink,
            _message: PhantomData,
        }
    }

    pub fn send(&self, chunk: M::Response) -> Result<(), BusError> {
        self.sink.send(encode_payload::<M, _>(&chunk)?)
    }
}

/// Serialize a payload of `M`, reporting failures as [`BusError::InvalidPayload`].
pub fn encode_payload<M: MessageType, T: Serialize>(value: &T) -> Result<Value, BusError> {
    serde_json::to_value(value).map_err(|e| BusError::InvalidPayload {
        message_type: M::NAME.to_string(),
        reason: e.to_string(),
    })
}

/// Deserialize a payload of `M`, reporting a shape mismatch as [`BusError::InvalidPayload`].
pub fn decode_payload<M: MessageType, T: DeserializeOwned>(value: Value) -> Result<T, BusError> {
    serde_json::from_value(value).map_err(|e| BusError::InvalidPayload {
        message_type: M::NAME.to_string(),
        reason: e.to_string(),
    })
}
