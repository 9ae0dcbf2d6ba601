//! Controller Protocol
//!
//! Inbound: one flat object per line, classified by its `command` field.
//! Outbound: `response` objects, one per handled command.
//!
//! This layer is pure text handling. It knows nothing about sockets or
//! animation state.

pub mod commands;
pub mod fields;
pub mod messages;

pub use commands::{normalize_path, BridgeCommand, CommandKind};
pub use fields::{FlatObject, Scalar};
pub use messages::{BridgeMessage, MessageType, NullSink, ResponseSink, ResponseStatus};
