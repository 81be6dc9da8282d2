//! Wire and protocol types for Tether.
//!
//! This crate holds the pure data the bus moves around: the [`WireMessage`]
//! envelope, correlation ids, the error payload that travels in error
//! responses, and the protocol tables that name every message type and its
//! request/response shapes. No IO, no async.

#![allow(clippy::missing_errors_doc)]

mod ids;
pub mod protocol;
mod wire;

pub use ids::{MessageId, SurfaceId};
pub use wire::{ErrorKind, ErrorPayload, Metadata, Status, WireMessage};
