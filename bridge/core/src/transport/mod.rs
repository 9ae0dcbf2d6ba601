//! Transport Layer for Controller-Bridge IPC
//!
//! The controller process connects over TCP loopback and exchanges
//! newline-delimited text messages with the bridge.
//!
//! # Threading
//!
//! The transport runs on its own I/O thread. It never touches animation
//! state: decoded commands are handed to the [`CommandQueue`] and executed
//! by the render thread.
//!
//! ```text
//! ┌──────────────┐   TCP 127.0.0.1:5555   ┌───────────────────┐   enqueue   ┌──────────────┐
//! │  Controller  ├───────────────────────►│ ConnectionManager ├────────────►│ CommandQueue │
//! │  (external)  │◄───────────────────────┤   (I/O thread)    │             └──────┬───────┘
//! └──────────────┘   responses (\n JSON)  └─────────▲─────────┘                    │ drain
//!                                                   │ send                  ┌──────▼───────┐
//!                                                   └───────────────────────┤ render thread│
//!                                                                           └──────────────┘
//! ```
//!
//! [`CommandQueue`]: crate::queue::CommandQueue

pub mod config;
pub mod frame;
pub mod tcp;

use std::fmt;

use thiserror::Error;

pub use config::{TransportConfig, DEFAULT_HOST, DEFAULT_PORT};
pub use frame::{encode, LineDecoder, MAX_LINE_LENGTH};
pub use tcp::{ConnectionHandle, ConnectionManager, ConnectionState};

/// Errors raised by the transport layer
#[derive(Debug, Error)]
pub enum TransportError {
    /// Could not bind the listening socket
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Address that was requested
        addr: String,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// IO error from the underlying socket
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Message serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Identifier for one accepted client connection (for logs)
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub String);

impl ConnectionId {
    /// Allocate a fresh random identifier
    #[must_use]
    pub fn new() -> Self {
        Self(format!("conn-{}", uuid::Uuid::new_v4()))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
