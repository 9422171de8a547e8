//! Half-close and error signaling.
//!
//! # State Transitions
//! ```text
//! shut_read(mode):   no mux endpoint or read side shut → nothing
//!                    otherwise MuxOps::shut_read, then Open → Drained | Reset
//! shut_write(mode):  same on the write axis, Open → Normal | Silent
//! close():           shut_write(Silent), shut_read(Reset)
//! drain_and_close(): shut_write(Silent), shut_read(Drain)
//! ```
//!
//! The mux is always called before the local state moves, so it never sees
//! its own transition as already done.

use std::sync::Arc;

use crate::conn_stream::ConnStream;
use crate::endpoint::{ErrorState, ShutReadMode, ShutWriteMode};
use crate::observability::metrics;

impl ConnStream {
    /// Shut the read side.
    pub fn shut_read(&mut self, mode: ShutReadMode) {
        if self.endpoint.read_state().is_shut() {
            return;
        }
        let Some(conn) = self.conn().map(Arc::clone) else {
            return;
        };

        // clean data-layer shutdown
        if let Some(mux) = conn.mux() {
            mux.shut_read(self, mode);
        }
        if self.endpoint.shut_read(mode) {
            metrics::record_shutdown("read", mode.as_str());
            tracing::debug!(connection_id = %conn.id(), mode = mode.as_str(), "Conn-stream read side shut");
        }
    }

    /// Shut the write side. The mode is passed through as given; lingering
    /// policy (`NOLINGER`) belongs to the caller.
    pub fn shut_write(&mut self, mode: ShutWriteMode) {
        if self.endpoint.write_state().is_shut() {
            return;
        }
        let Some(conn) = self.conn().map(Arc::clone) else {
            return;
        };

        // clean data-layer shutdown
        if let Some(mux) = conn.mux() {
            mux.shut_write(self, mode);
        }
        if self.endpoint.shut_write(mode) {
            metrics::record_shutdown("write", mode.as_str());
            tracing::debug!(connection_id = %conn.id(), mode = mode.as_str(), "Conn-stream write side shut");
        }
    }

    /// Close both sides abruptly, without detaching.
    pub fn close(&mut self) {
        self.shut_write(ShutWriteMode::Silent);
        self.shut_read(ShutReadMode::Reset);
    }

    /// Close both sides, draining pending input first, without detaching.
    pub fn drain_and_close(&mut self) {
        self.shut_write(ShutWriteMode::Silent);
        self.shut_read(ShutReadMode::Drain);
    }

    /// Record a transport error: confirmed if EOS was already seen, pending
    /// otherwise.
    pub fn set_error(&mut self) {
        let state = self.endpoint.raise_error();
        let level = match state {
            ErrorState::Confirmed => "confirmed",
            _ => "pending",
        };
        metrics::record_error(level);
        tracing::debug!(level, endpoint = %self.endpoint.kind(), "Conn-stream error raised");
    }

    /// Record end of stream. A pending error becomes confirmed.
    pub fn set_eos(&mut self) {
        self.endpoint.set_eos();
        tracing::trace!(error = ?self.endpoint.error_state(), "Conn-stream reached EOS");
    }
}

#[cfg(test)]
mod tests {
    use crate::conn_stream::{ConnStream, ConnStreamFlags};
    use crate::endpoint::{Endpoint, EndpointFlags, ReadState, ShutWriteMode, WriteState};
    use crate::mux::PassThroughMux;
    use crate::net::{Connection, ConnectionState};
    use std::sync::Arc;

    fn pt_cs() -> (ConnStream, Arc<Connection>) {
        let conn = Arc::new(Connection::new(Some(Arc::new(PassThroughMux::new()))));
        let mut cs = ConnStream::new(Endpoint::new());
        cs.attach_mux(Arc::new(()), conn.clone());
        (cs, conn)
    }

    #[test]
    fn close_fully_closes_pass_through_connection() {
        let (mut cs, conn) = pt_cs();
        cs.close();

        assert_eq!(cs.endpoint().read_state(), ReadState::Reset);
        assert_eq!(cs.endpoint().write_state(), WriteState::Silent);
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert!(!conn.is_drained());
    }

    #[test]
    fn drain_and_close_drains() {
        let (mut cs, conn) = pt_cs();
        cs.drain_and_close();

        assert_eq!(cs.endpoint().read_state(), ReadState::Drained);
        assert!(conn.is_drained());
        assert_eq!(conn.state(), ConnectionState::Closed);
    }

    #[test]
    fn half_close_keeps_connection_draining() {
        let (mut cs, conn) = pt_cs();
        cs.shut_write(ShutWriteMode::Normal);

        assert_eq!(cs.endpoint().write_state(), WriteState::Normal);
        assert_eq!(cs.endpoint().read_state(), ReadState::Open);
        assert_eq!(conn.state(), ConnectionState::Draining);
    }

    #[test]
    fn nolinger_does_not_change_requested_mode() {
        let (mut cs, _conn) = pt_cs();
        cs.insert_flags(ConnStreamFlags::NOLINGER);
        cs.shut_write(ShutWriteMode::Normal);
        assert_eq!(cs.endpoint().write_state(), WriteState::Normal);
        assert!(cs.flags().contains(ConnStreamFlags::NOLINGER));
    }

    #[test]
    fn set_error_without_endpoint_only_touches_flags() {
        let mut cs = ConnStream::new(Endpoint::new());
        cs.set_error();
        assert_eq!(cs.endpoint().flags(), EndpointFlags::ERR_PENDING);

        cs.set_eos();
        assert_eq!(cs.endpoint().flags(), EndpointFlags::EOS | EndpointFlags::ERROR);
    }
}
