//! Connections seen from the conn-stream layer.
//!
//! # Responsibilities
//! - Identify a connection for tracing
//! - Expose the mux operation table driving the connection, if any
//! - Track socket-level half-closes requested by the mux
//!
//! A connection is owned by the surrounding infrastructure and shared by every
//! conn-stream it multiplexes, hence `Arc<Connection>` everywhere.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::mux::{MuxFlags, MuxOps};

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Socket-level state derived from the half-close bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Both directions open.
    Active,
    /// One direction shut.
    Draining,
    /// Both directions shut.
    Closed,
}

/// A transport connection, possibly carrying several conn-streams.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    mux: Option<Arc<dyn MuxOps>>,
    read_shut: AtomicBool,
    write_shut: AtomicBool,
    drained: AtomicBool,
}

impl Connection {
    /// Create a connection driven by `mux`. `None` for a connection with no
    /// mux installed yet.
    pub fn new(mux: Option<Arc<dyn MuxOps>>) -> Self {
        Self {
            id: ConnectionId::new(),
            mux,
            read_shut: AtomicBool::new(false),
            write_shut: AtomicBool::new(false),
            drained: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// The mux operation table, if a mux is installed.
    pub fn mux(&self) -> Option<&Arc<dyn MuxOps>> {
        self.mux.as_ref()
    }

    /// True when the mux exchanges HTX rather than raw bytes.
    pub fn is_htx(&self) -> bool {
        self.mux
            .as_ref()
            .map_or(false, |mux| mux.flags().contains(MuxFlags::HTX))
    }

    /// Shut the read side of the socket.
    pub fn sock_shut_read(&self) {
        self.read_shut.store(true, Ordering::Relaxed);
    }

    /// Shut the write side of the socket.
    pub fn sock_shut_write(&self) {
        self.write_shut.store(true, Ordering::Relaxed);
    }

    /// Consume and discard whatever input is pending on the socket.
    pub fn drain(&self) {
        self.drained.store(true, Ordering::Relaxed);
    }

    /// Close both directions at once.
    pub fn full_close(&self) {
        self.sock_shut_read();
        self.sock_shut_write();
        tracing::trace!(connection_id = %self.id, "Connection fully closed");
    }

    pub fn is_read_shut(&self) -> bool {
        self.read_shut.load(Ordering::Relaxed)
    }

    pub fn is_write_shut(&self) -> bool {
        self.write_shut.load(Ordering::Relaxed)
    }

    pub fn is_drained(&self) -> bool {
        self.drained.load(Ordering::Relaxed)
    }

    pub fn state(&self) -> ConnectionState {
        match (self.is_read_shut(), self.is_write_shut()) {
            (true, true) => ConnectionState::Closed,
            (false, false) => ConnectionState::Active,
            _ => ConnectionState::Draining,
        }
    }
}
