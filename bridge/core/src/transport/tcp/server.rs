//! TCP accept/read loop on a dedicated I/O thread

use std::net::SocketAddr;
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};

use super::{ConnectionHandle, ConnectionState};
use crate::protocol::{BridgeCommand, BridgeMessage};
use crate::transport::{encode, ConnectionId, LineDecoder, TransportConfig, TransportError};

/// Pause after a failed `accept` before trying again
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Longest line excerpt included in warnings
const LOG_EXCERPT_LEN: usize = 120;

type CommandCallback = Arc<dyn Fn(BridgeCommand) + Send + Sync>;

/// Per-connection buffer sizes
#[derive(Clone, Copy, Debug)]
struct Buffers {
    read: usize,
    outbound: usize,
}

/// Owns the listening socket and the I/O thread
///
/// Decoded commands are passed to the callback given to [`start`]; it runs
/// on the I/O thread and should only enqueue.
///
/// [`start`]: ConnectionManager::start
pub struct ConnectionManager {
    handle: ConnectionHandle,
    local_addr: SocketAddr,
    shutdown_tx: Option<watch::Sender<bool>>,
    thread: Option<JoinHandle<()>>,
    done_rx: std_mpsc::Receiver<()>,
    join_timeout: Duration,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("local_addr", &self.local_addr)
            .field("state", &self.handle.state())
            .finish_non_exhaustive()
    }
}

impl ConnectionManager {
    /// Bind the listener and spawn the I/O thread
    ///
    /// Binding happens before this returns, so a port conflict is reported
    /// here rather than on the I/O thread.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Bind` if the address cannot be bound and
    /// `TransportError::Io` if the thread cannot be spawned.
    pub fn start<F>(config: &TransportConfig, on_command: F) -> Result<Self, TransportError>
    where
        F: Fn(BridgeCommand) + Send + Sync + 'static,
    {
        let addr = config.listen_addr();
        let listener = std::net::TcpListener::bind(&addr).map_err(|source| TransportError::Bind {
            addr: addr.clone(),
            source,
        })?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        let handle = ConnectionHandle::default();
        handle.set_state(ConnectionState::Listening);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (done_tx, done_rx) = std_mpsc::channel();
        let on_command: CommandCallback = Arc::new(on_command);
        let buffers = Buffers {
            read: config.read_buffer_size.max(1),
            outbound: config.outbound_capacity.max(1),
        };
        let io_handle = handle.clone();

        let thread = std::thread::Builder::new()
            .name("bridge-io".to_string())
            .spawn(move || {
                match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime.block_on(accept_loop(
                        listener,
                        io_handle.clone(),
                        on_command,
                        shutdown_rx,
                        buffers,
                    )),
                    Err(e) => tracing::error!(error = %e, "Failed to build I/O runtime"),
                }
                io_handle.detach(ConnectionState::Disconnected);
                // Receiver may already have given up waiting
                let _ = done_tx.send(());
            })?;

        tracing::info!(addr = %local_addr, "Bridge listening");

        Ok(Self {
            handle,
            local_addr,
            shutdown_tx: Some(shutdown_tx),
            thread: Some(thread),
            done_rx,
            join_timeout: config.join_timeout(),
        })
    }

    /// Send path to the current client
    #[must_use]
    pub fn handle(&self) -> ConnectionHandle {
        self.handle.clone()
    }

    /// Best-effort send to the current client
    pub fn send(&self, message: BridgeMessage) {
        self.handle.send(message);
    }

    /// Whether a client is attached
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.handle.is_connected()
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.handle.state()
    }

    /// Address actually bound (useful with port 0)
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting, close sockets and wait (bounded) for the I/O thread
    ///
    /// Idempotent. If the thread does not finish within the join timeout it
    /// is detached and a warning is logged.
    pub fn stop(&mut self) {
        let Some(shutdown_tx) = self.shutdown_tx.take() else {
            return;
        };
        // Receiver gone means the loop already exited
        let _ = shutdown_tx.send(true);

        if let Some(thread) = self.thread.take() {
            match self.done_rx.recv_timeout(self.join_timeout) {
                Ok(()) | Err(std_mpsc::RecvTimeoutError::Disconnected) => {
                    if thread.join().is_err() {
                        tracing::error!("I/O thread panicked");
                    }
                }
                Err(std_mpsc::RecvTimeoutError::Timeout) => {
                    tracing::warn!(
                        timeout_ms = self.join_timeout.as_millis() as u64,
                        "I/O thread did not stop in time, detaching"
                    );
                }
            }
        }

        self.handle.detach(ConnectionState::Disconnected);
        tracing::info!(addr = %self.local_addr, "Bridge stopped");
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn accept_loop(
    listener: std::net::TcpListener,
    handle: ConnectionHandle,
    on_command: CommandCallback,
    mut shutdown: watch::Receiver<bool>,
    buffers: Buffers,
) {
    let listener = match TcpListener::from_std(listener) {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, "Failed to register listener with runtime");
            return;
        }
    };

    while !*shutdown.borrow() {
        handle.set_state(ConnectionState::Listening);

        let accepted = tokio::select! {
            res = listener.accept() => res,
            _ = shutdown.changed() => break,
        };

        match accepted {
            Ok((stream, peer)) => {
                serve_client(
                    stream,
                    peer,
                    &handle,
                    &on_command,
                    &mut shutdown,
                    buffers,
                )
                .await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Accept failed");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
            }
        }
    }

    tracing::debug!("Accept loop exited");
}

async fn serve_client(
    stream: TcpStream,
    peer: SocketAddr,
    handle: &ConnectionHandle,
    on_command: &CommandCallback,
    shutdown: &mut watch::Receiver<bool>,
    buffers: Buffers,
) {
    let conn_id = ConnectionId::new();
    let (mut read_half, write_half) = stream.into_split();
    let (tx, rx) = mpsc::channel::<BridgeMessage>(buffers.outbound);

    // Fresh channel, cannot be full
    let _ = tx.try_send(BridgeMessage::connected());
    handle.attach(conn_id.clone(), tx);
    tracing::info!(conn_id = %conn_id, peer = %peer, "Controller connected");

    // A client that stops reading stalls only this task
    let mut writer = tokio::spawn(write_loop(conn_id.clone(), write_half, rx));

    let mut decoder = LineDecoder::new();
    let mut buf = vec![0u8; buffers.read];

    loop {
        tokio::select! {
            read = read_half.read(&mut buf) => match read {
                Ok(0) => {
                    tracing::info!(conn_id = %conn_id, "Connection closed by peer");
                    break;
                }
                Ok(n) => {
                    for line in decoder.push(&buf[..n]) {
                        dispatch(&conn_id, &line, on_command);
                    }
                }
                Err(e) => {
                    tracing::warn!(conn_id = %conn_id, error = %e, "Read error");
                    break;
                }
            },
            _ = &mut writer => {
                tracing::debug!(conn_id = %conn_id, "Writer finished, closing connection");
                break;
            }
            _ = shutdown.changed() => {
                tracing::debug!(conn_id = %conn_id, "Shutdown requested, closing connection");
                break;
            }
        }
    }

    handle.detach(ConnectionState::Listening);
    writer.abort();
    if decoder.pending() > 0 {
        tracing::debug!(
            conn_id = %conn_id,
            bytes = decoder.pending(),
            "Discarding unterminated tail"
        );
    }
    tracing::info!(conn_id = %conn_id, "Controller disconnected");
}

async fn write_loop(
    conn_id: ConnectionId,
    mut write_half: OwnedWriteHalf,
    mut rx: mpsc::Receiver<BridgeMessage>,
) {
    while let Some(msg) = rx.recv().await {
        match encode(&msg) {
            Ok(data) => {
                if let Err(e) = write_half.write_all(&data).await {
                    tracing::warn!(conn_id = %conn_id, error = %e, "Write error");
                    break;
                }
            }
            Err(e) => tracing::warn!(conn_id = %conn_id, error = %e, "Encode error"),
        }
    }
}

fn dispatch(conn_id: &ConnectionId, line: &str, on_command: &CommandCallback) {
    match BridgeCommand::parse(line) {
        Some(command) => {
            tracing::debug!(conn_id = %conn_id, command = %command.kind(), "Command received");
            on_command(command);
        }
        None => tracing::warn!(
            conn_id = %conn_id,
            line = excerpt(line),
            "Unknown command, ignoring"
        ),
    }
}

fn excerpt(line: &str) -> &str {
    match line.char_indices().nth(LOG_EXCERPT_LEN) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}
