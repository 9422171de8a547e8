//! Conn-stream layer of a reverse proxy.
//!
//! A conn-stream ties one transport endpoint (a mux stream on a connection,
//! or an applet) to one application object (a proxy stream or a health
//! check), and gives both sides the same shutdown, query and attach/detach
//! operations.

#[macro_use]
mod flags;

pub mod app;
pub mod applet;
pub mod config;
pub mod conn_stream;
pub mod endpoint;
pub mod error;
pub mod mux;
pub mod net;
pub mod observability;

pub use config::LayerConfig;
pub use conn_stream::{get_first, ConnStream, ConnStreamFlags, ConnStreamId, ConnStreamTable};
pub use endpoint::{Endpoint, EndpointFlags, EndpointKind, ShutReadMode, ShutWriteMode};
pub use error::{ConnStreamError, ConnStreamResult};
