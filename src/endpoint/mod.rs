//! Endpoint descriptor.
//!
//! # Responsibilities
//! - Describe what a conn-stream is wired to (mux stream, applet, nothing)
//! - Hold the transport state: read/write half-closes, error tier, EOS
//! - Render that state as an additive `EndpointFlags` bit set
//!
//! The descriptor is exclusively owned by its conn-stream. The target and
//! context it points to are not: they belong to the connection pool or the
//! applet scheduler and are only borrowed for the current attachment.

pub mod flags;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::applet::AppCtx;
use crate::net::Connection;

pub use flags::{
    EndpointFlags, ErrorState, ReadState, ShutReadMode, ShutWriteMode, WriteState,
};

/// Opaque shared handle, meaning given by the endpoint kind.
pub type Opaque = Arc<dyn Any + Send + Sync>;

/// What an endpoint is wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointKind {
    None,
    Mux,
    Applet,
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EndpointKind::None => "none",
            EndpointKind::Mux => "mux",
            EndpointKind::Applet => "applet",
        })
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Binding {
    Mux { target: Opaque, conn: Arc<Connection> },
    Applet { appctx: Arc<AppCtx>, ctx: Option<Opaque> },
}

/// Raw view of the endpoint target.
#[derive(Debug, Clone, Copy)]
pub enum EndpointTarget<'a> {
    /// The mux's per-stream context.
    Mux(&'a Opaque),
    Applet(&'a Arc<AppCtx>),
}

/// Raw view of the endpoint context.
#[derive(Debug, Clone, Copy)]
pub enum EndpointCtx<'a> {
    /// For a mux endpoint the context is the connection itself.
    Conn(&'a Arc<Connection>),
    Opaque(&'a Opaque),
}

/// Endpoint descriptor owned by one conn-stream.
#[derive(Debug, Default)]
pub struct Endpoint {
    binding: Option<Binding>,
    read: ReadState,
    write: WriteState,
    error: ErrorState,
    eos: bool,
    extra: EndpointFlags,
}

impl Endpoint {
    /// Empty descriptor, kind none.
    pub fn new() -> Self {
        Self::default()
    }

    /// Descriptor already wired to a mux stream, as a mux builds it before
    /// asking for a conn-stream.
    pub fn for_mux(target: Opaque, conn: Arc<Connection>) -> Self {
        Self {
            binding: Some(Binding::Mux { target, conn }),
            ..Self::default()
        }
    }

    /// Descriptor already wired to an applet context.
    pub fn for_applet(appctx: Arc<AppCtx>, ctx: Option<Opaque>) -> Self {
        Self {
            binding: Some(Binding::Applet { appctx, ctx }),
            ..Self::default()
        }
    }

    /// Release the descriptor. Whatever it points to is left alone.
    pub fn free(self) {}

    pub fn kind(&self) -> EndpointKind {
        match self.binding {
            None => EndpointKind::None,
            Some(Binding::Mux { .. }) => EndpointKind::Mux,
            Some(Binding::Applet { .. }) => EndpointKind::Applet,
        }
    }

    /// Target without any kind check.
    pub fn target(&self) -> Option<EndpointTarget<'_>> {
        match &self.binding {
            None => None,
            Some(Binding::Mux { target, .. }) => Some(EndpointTarget::Mux(target)),
            Some(Binding::Applet { appctx, .. }) => Some(EndpointTarget::Applet(appctx)),
        }
    }

    /// Context without any kind check.
    pub fn ctx(&self) -> Option<EndpointCtx<'_>> {
        match &self.binding {
            None => None,
            Some(Binding::Mux { conn, .. }) => Some(EndpointCtx::Conn(conn)),
            Some(Binding::Applet { ctx, .. }) => ctx.as_ref().map(EndpointCtx::Opaque),
        }
    }

    pub(crate) fn binding(&self) -> Option<&Binding> {
        self.binding.as_ref()
    }

    pub fn read_state(&self) -> ReadState {
        self.read
    }

    pub fn write_state(&self) -> WriteState {
        self.write
    }

    pub fn error_state(&self) -> ErrorState {
        self.error
    }

    pub fn is_eos(&self) -> bool {
        self.eos
    }

    /// Everything above as a bit set.
    pub fn flags(&self) -> EndpointFlags {
        let kind = match self.kind() {
            EndpointKind::None => EndpointFlags::NONE,
            EndpointKind::Mux => EndpointFlags::T_MUX,
            EndpointKind::Applet => EndpointFlags::T_APPLET,
        };
        let eos = if self.eos {
            EndpointFlags::EOS
        } else {
            EndpointFlags::NONE
        };
        kind | self.read.flags() | self.write.flags() | self.error.flags() | eos | self.extra
    }

    /// Set transport hints (`EOI`, `RCV_MORE`, ...). State bits are ignored:
    /// they only move through transitions.
    pub fn insert_hints(&mut self, hints: EndpointFlags) {
        self.extra.insert(hints.difference(EndpointFlags::STATE_MASK));
    }

    pub fn remove_hints(&mut self, hints: EndpointFlags) {
        self.extra.remove(hints.difference(EndpointFlags::STATE_MASK));
    }

    /// Install a binding, returning whatever was there before.
    pub(crate) fn bind(&mut self, binding: Binding) -> Option<Binding> {
        self.binding.replace(binding)
    }

    /// Back to the freshly created state.
    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    /// Returns false when the read axis was already shut.
    pub(crate) fn shut_read(&mut self, mode: ShutReadMode) -> bool {
        match self.read.shut(mode) {
            Some(next) => {
                self.read = next;
                true
            }
            None => false,
        }
    }

    /// Returns false when the write axis was already shut.
    pub(crate) fn shut_write(&mut self, mode: ShutWriteMode) -> bool {
        match self.write.shut(mode) {
            Some(next) => {
                self.write = next;
                true
            }
            None => false,
        }
    }

    pub(crate) fn raise_error(&mut self) -> ErrorState {
        self.error = self.error.raise(self.eos);
        self.error
    }

    pub(crate) fn set_eos(&mut self) {
        self.eos = true;
        self.error = self.error.on_eos();
    }
}
