//! Cross-process message bus.
//!
//! A [`Connection`] correlates requests and responses over one
//! [`Transport`](transport::Transport) and dispatches inbound requests to
//! registered handlers. A [`Messenger`] layers the protocol tables from
//! `tether-types` on top so both ends agree on names and payload shapes at
//! compile time.

pub mod codec;
pub mod transport;

mod connection;
mod error;
mod messenger;

pub use connection::{
    Connection, ConnectionState, HandlerFuture, RegistrationPolicy, ResponseStream, StreamSink,
    WeakConnection,
};
pub use error::BusError;
pub use messenger::{ChunkSink, Messenger, decode_payload, encode_payload};
