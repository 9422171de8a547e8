//! Application side of a conn-stream.
//!
//! # Data Flow
//! ```text
//! stream engine (external)        health-check scheduler (external)
//!     │ StreamId                      │ CheckId
//!     └──────────► AppRef ◄───────────┘
//!                    │
//!             ConnStream::stream() / check()   (narrowing, None on mismatch)
//! ```
//!
//! # Design Decisions
//! - The back-reference is a tagged id, never ownership
//! - Narrowing is a pattern match on the tag; there is no cast to get wrong

pub mod session;

use std::fmt;

use serde::Serialize;

pub use session::{Session, SessionId, StreamEngine};

/// Identifier of a proxy stream owned by the stream engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct StreamId(u64);

impl StreamId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "strm-{}", self.0)
    }
}

/// Identifier of a health check owned by the check scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CheckId(u64);

impl CheckId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CheckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "check-{}", self.0)
    }
}

/// The object driving a conn-stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum AppRef {
    #[default]
    None,
    Stream(StreamId),
    Check(CheckId),
}

impl AppRef {
    pub fn is_none(&self) -> bool {
        matches!(self, AppRef::None)
    }

    pub fn as_stream(&self) -> Option<StreamId> {
        match self {
            AppRef::Stream(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_check(&self) -> Option<CheckId> {
        match self {
            AppRef::Check(id) => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for AppRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppRef::None => f.write_str("none"),
            AppRef::Stream(id) => write!(f, "{}", id),
            AppRef::Check(id) => write!(f, "{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrowing_matches_tag_only() {
        let strm = AppRef::Stream(StreamId::new(7));
        let chk = AppRef::Check(CheckId::new(7));

        assert_eq!(strm.as_stream(), Some(StreamId::new(7)));
        assert_eq!(strm.as_check(), None);
        assert_eq!(chk.as_check(), Some(CheckId::new(7)));
        assert_eq!(chk.as_stream(), None);
        assert_eq!(AppRef::None.as_stream(), None);
        assert_eq!(AppRef::None.as_check(), None);
    }

    #[test]
    fn display() {
        assert_eq!(AppRef::None.to_string(), "none");
        assert_eq!(AppRef::Stream(StreamId::new(3)).to_string(), "strm-3");
        assert_eq!(AppRef::Check(CheckId::new(4)).to_string(), "check-4");
    }
}
