//! Multiplexer operation tables.
//!
//! # Data Flow
//! ```text
//! ConnStream::shut_read / shut_write / detach_endp
//!     → Connection::mux()            (Option<Arc<dyn MuxOps>>)
//!     → MuxOps capability            (protocol specific, e.g. pt.rs)
//!
//! get_first(connection)
//!     → MuxOps::get_first_stream     (any live conn-stream on the connection)
//! ```
//!
//! # Design Decisions
//! - Every capability has a default body; a mux that does not provide one
//!   gets a no-op (or `None`), never a null check at the call site
//! - Capabilities receive the conn-stream before its own flags are updated

pub mod pt;

use std::fmt;

use crate::conn_stream::{ConnStream, ConnStreamId};
use crate::endpoint::{ShutReadMode, ShutWriteMode};
use crate::net::Connection;

pub use pt::PassThroughMux;

flag_set! {
    /// Static properties advertised by a mux.
    pub struct MuxFlags: u32 {
        /// The mux exchanges HTX messages instead of raw bytes.
        const HTX = 1 << 0;
    }
}

/// Operation table implemented by each multiplexer.
pub trait MuxOps: fmt::Debug + Send + Sync {
    /// Short protocol name, for logs.
    fn name(&self) -> &'static str;

    fn flags(&self) -> MuxFlags {
        MuxFlags::NONE
    }

    /// Protocol-level read shutdown for `cs`. Called once per attachment,
    /// before the conn-stream records the new read state.
    fn shut_read(&self, _cs: &ConnStream, _mode: ShutReadMode) {}

    /// Protocol-level write shutdown for `cs`. Called once per attachment,
    /// before the conn-stream records the new write state.
    fn shut_write(&self, _cs: &ConnStream, _mode: ShutWriteMode) {}

    /// The conn-stream is letting go of its mux endpoint.
    fn detach(&self, _cs: &ConnStream) {}

    /// Any valid conn-stream carried by `conn`, preferably the first one.
    fn get_first_stream(&self, _conn: &Connection) -> Option<ConnStreamId> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Bare;

    impl MuxOps for Bare {
        fn name(&self) -> &'static str {
            "BARE"
        }
    }

    #[test]
    fn missing_capabilities_default_to_nothing() {
        let conn = Connection::new(None);
        let mux = Bare;
        assert!(mux.flags().is_empty());
        assert_eq!(mux.get_first_stream(&conn), None);
    }
}
