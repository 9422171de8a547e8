//! Pass-through mux: one conn-stream per connection, no framing.
//!
//! Half-closes go straight to the socket. Once both directions of the only
//! conn-stream are shut, the connection is fully closed.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::conn_stream::{ConnStream, ConnStreamId};
use crate::endpoint::{ShutReadMode, ShutWriteMode};
use crate::mux::MuxOps;
use crate::net::Connection;

const NO_STREAM: u64 = u64::MAX;

#[derive(Debug)]
pub struct PassThroughMux {
    /// Packed id of the conn-stream riding this connection.
    stream: AtomicU64,
}

impl PassThroughMux {
    pub fn new() -> Self {
        Self {
            stream: AtomicU64::new(NO_STREAM),
        }
    }

    /// Record the conn-stream carried by this mux.
    pub fn bind(&self, id: ConnStreamId) {
        self.stream.store(id.to_raw(), Ordering::Relaxed);
    }

    /// The conn-stream carried by this mux, if any.
    pub fn stream(&self) -> Option<ConnStreamId> {
        match self.stream.load(Ordering::Relaxed) {
            NO_STREAM => None,
            raw => Some(ConnStreamId::from_raw(raw)),
        }
    }
}

impl Default for PassThroughMux {
    fn default() -> Self {
        Self::new()
    }
}

impl MuxOps for PassThroughMux {
    fn name(&self) -> &'static str {
        "PASS"
    }

    fn shut_read(&self, cs: &ConnStream, mode: ShutReadMode) {
        let Some(conn) = cs.conn() else {
            return;
        };
        if mode == ShutReadMode::Drain {
            conn.drain();
        }
        conn.sock_shut_read();
        if cs.endpoint().write_state().is_shut() {
            conn.full_close();
        }
        tracing::trace!(connection_id = %conn.id(), mode = mode.as_str(), "pt: read side shut");
    }

    fn shut_write(&self, cs: &ConnStream, mode: ShutWriteMode) {
        let Some(conn) = cs.conn() else {
            return;
        };
        conn.sock_shut_write();
        if cs.endpoint().read_state().is_shut() {
            conn.full_close();
        }
        tracing::trace!(connection_id = %conn.id(), mode = mode.as_str(), "pt: write side shut");
    }

    fn detach(&self, _cs: &ConnStream) {
        self.stream.store(NO_STREAM, Ordering::Relaxed);
    }

    fn get_first_stream(&self, _conn: &Connection) -> Option<ConnStreamId> {
        self.stream()
    }
}
