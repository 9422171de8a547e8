//! Sessions and the stream engine boundary.
//!
//! A conn-stream created on behalf of a mux or an applet immediately gets a
//! stream built by the stream engine, owned by the session that accepted the
//! connection.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;

use crate::app::StreamId;
use crate::conn_stream::ConnStreamId;

static SESSION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    pub fn new() -> Self {
        Self(SESSION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sess-{}", self.0)
    }
}

/// Client session that owns the streams it spawns.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    /// Name of the frontend that accepted the connection.
    pub frontend: String,
    /// Client address, when known.
    pub origin: Option<SocketAddr>,
}

impl Session {
    pub fn new(frontend: impl Into<String>, origin: Option<SocketAddr>) -> Self {
        Self {
            id: SessionId::new(),
            frontend: frontend.into(),
            origin,
        }
    }
}

/// Creates proxy streams for new conn-streams.
pub trait StreamEngine {
    /// Build a stream owned by `session` on top of conn-stream `cs`, seeded
    /// with `input` (data already received by the endpoint).
    fn create_stream(
        &mut self,
        session: &Session,
        cs: ConnStreamId,
        input: Bytes,
    ) -> Result<StreamId, Box<dyn std::error::Error + Send + Sync>>;
}
