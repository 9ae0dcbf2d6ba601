//! TCP Loopback Transport
//!
//! One controller at a time connects to `127.0.0.1:5555` (by default).
//! Further connection attempts wait in the OS backlog until the current
//! client leaves.
//!
//! # Lifecycle
//!
//! ```text
//! Disconnected ──start()──► Listening ──accept──► Connected
//!                              ▲                      │ EOF / error
//!                              └──────────────────────┘
//! ```
//!
//! `stop()` from any state returns to `Disconnected` for good.

mod server;

pub use server::ConnectionManager;

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::ConnectionId;
use crate::protocol::{BridgeMessage, ResponseSink};

/// Connection lifecycle state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Server not running
    #[default]
    Disconnected,
    /// Waiting for a client
    Listening,
    /// One client attached
    Connected,
}

#[derive(Debug, Default)]
struct Link {
    state: ConnectionState,
    conn_id: Option<ConnectionId>,
    outbound: Option<mpsc::Sender<BridgeMessage>>,
}

/// Cloneable send path to the current client
///
/// Holds no socket itself; it forwards to the I/O thread through a channel
/// that exists only while a client is connected.
#[derive(Clone, Debug, Default)]
pub struct ConnectionHandle {
    link: Arc<Mutex<Link>>,
}

impl ConnectionHandle {
    /// Queue a message for the connected client (best-effort)
    ///
    /// Never blocks. With no client attached, or with the client's outbound
    /// buffer full, the message is dropped and a warning is logged.
    pub fn send(&self, message: BridgeMessage) {
        let link = self.link.lock();
        match (&link.outbound, &link.conn_id) {
            (Some(tx), Some(conn_id)) => match tx.try_send(message) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(message)) => tracing::warn!(
                    conn_id = %conn_id,
                    status = ?message.status,
                    "Client not reading, dropping message"
                ),
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::warn!(conn_id = %conn_id, "Writer gone, dropping message");
                }
            },
            _ => tracing::warn!(
                status = ?message.status,
                command = message.command.as_deref().unwrap_or("-"),
                "No client connected, dropping message"
            ),
        }
    }

    /// Whether a client is attached
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.link.lock().state == ConnectionState::Connected
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.link.lock().state
    }

    /// Id of the attached client
    #[must_use]
    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.link.lock().conn_id.clone()
    }

    fn set_state(&self, state: ConnectionState) {
        self.link.lock().state = state;
    }

    fn attach(&self, conn_id: ConnectionId, outbound: mpsc::Sender<BridgeMessage>) {
        let mut link = self.link.lock();
        link.state = ConnectionState::Connected;
        link.conn_id = Some(conn_id);
        link.outbound = Some(outbound);
    }

    fn detach(&self, next: ConnectionState) {
        let mut link = self.link.lock();
        link.state = next;
        link.conn_id = None;
        link.outbound = None;
    }
}

impl ResponseSink for ConnectionHandle {
    fn send(&self, message: BridgeMessage) {
        ConnectionHandle::send(self, message);
    }
}
