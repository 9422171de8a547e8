//! Error definitions for conn-stream management.

use thiserror::Error;

use crate::app::AppRef;
use crate::conn_stream::ConnStreamId;
use crate::endpoint::EndpointKind;

/// Errors returned by conn-stream lifecycle operations.
///
/// Transport errors are not here: they are recorded in the endpoint's error
/// state. Narrowing accessors never fail either, they return `None`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnStreamError {
    /// The id does not name a live conn-stream (never allocated, or freed).
    #[error("unknown conn-stream {0}")]
    UnknownConnStream(ConnStreamId),

    /// Freeing would leak an attachment the other side still relies on.
    #[error("conn-stream {id} still attached to {side}")]
    StillAttached { id: ConnStreamId, side: &'static str },

    /// Another application already drives this conn-stream.
    #[error("application conflict: {current} already attached")]
    AppConflict { current: AppRef },

    /// The endpoint handed over does not have the expected type.
    #[error("expected {expected} endpoint, got {actual}")]
    EndpointKind {
        expected: EndpointKind,
        actual: EndpointKind,
    },

    /// Recycling an endpoint requires an application to hand it to.
    #[error("no application attached")]
    NoApplication,

    /// The table reached its configured capacity.
    #[error("conn-stream table full ({0} entries)")]
    TableFull(usize),

    /// The stream engine could not build a stream for the conn-stream.
    #[error("stream engine failed: {0}")]
    Engine(String),
}

/// Result type for conn-stream operations.
pub type ConnStreamResult<T> = Result<T, ConnStreamError>;
