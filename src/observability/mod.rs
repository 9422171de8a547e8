//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! conn-stream operations produce:
//!     → tracing events (attach/detach at debug, transitions at trace)
//!     → metrics.rs (counters and a live gauge)
//!
//! logging.rs installs the subscriber once, at startup.
//! ```
//!
//! # Design Decisions
//! - The library only emits; installing subscribers and recorders is up to
//!   the binary embedding it
//! - Metrics are cheap (no recorder installed means no-op)

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
