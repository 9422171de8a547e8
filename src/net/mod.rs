//! Network layer collaborators.
//!
//! # Data Flow
//! ```text
//! connection pool / listener (external)
//!     → connection.rs (Connection: id, mux op table, socket half-closes)
//!     → shared by the conn-streams the mux carries
//! ```
//!
//! # Design Decisions
//! - Connections are never owned by a conn-stream
//! - Socket state uses atomics since a connection is shared

pub mod connection;

pub use connection::{Connection, ConnectionId, ConnectionState};
