//! Conn-streams.
//!
//! # Data Flow
//! ```text
//!   application side                      endpoint side
//!   ────────────────                      ─────────────
//!   stream engine ─┐                  ┌─ mux stream (Connection + MuxOps)
//!                  ├─► ConnStream ◄───┤
//!   health check ──┘     │            └─ applet (AppCtx)
//!                        │
//!          shutdown.rs   │  shut_read / shut_write / close / set_error
//!                        ▼
//!               MuxOps capabilities, then Endpoint state
//!
//!   table.rs: slot arena owning conn-streams, ConnStreamId handles
//! ```
//!
//! # Design Decisions
//! - Endpoint and application sides attach and detach independently
//! - Checked accessors match on the binding or the app tag and return `None`
//!   on mismatch; unchecked ones expose the raw views
//! - Every operation on a detached endpoint is a no-op

mod shutdown;
pub mod table;

use std::any::Any;
use std::sync::Arc;

use serde::Serialize;

use crate::app::{AppRef, CheckId, StreamId};
use crate::applet::AppCtx;
use crate::endpoint::{
    Binding, Endpoint, EndpointCtx, EndpointKind, EndpointTarget, ErrorState, Opaque, ReadState,
    WriteState,
};
use crate::error::{ConnStreamError, ConnStreamResult};
use crate::mux::MuxOps;
use crate::net::{Connection, ConnectionId, ConnectionState};

pub use table::{get_first, ConnStreamId, ConnStreamTable};

flag_set! {
    /// Conn-stream flags set by the application side.
    pub struct ConnStreamFlags: u32 {
        /// Backend side of a stream.
        const ISBACK = 1 << 0;
        /// The caller wants abortive closes instead of lingering ones.
        const NOLINGER = 1 << 1;
        /// The caller refuses half-closed connections.
        const NOHALF = 1 << 2;
        /// Do not wake the application on state changes.
        const DONT_WAKE = 1 << 3;
    }
}

/// Named callback table of the application layer, used for diagnostics.
#[derive(Debug, PartialEq, Eq)]
pub struct DataCallbacks {
    pub name: &'static str,
}

/// Callbacks installed when a proxy stream drives the conn-stream.
pub static STREAM_DATA_CB: DataCallbacks = DataCallbacks { name: "STRM" };
/// Callbacks installed when a health check drives the conn-stream.
pub static CHECK_DATA_CB: DataCallbacks = DataCallbacks { name: "CHCK" };

/// One logical data flow between an endpoint and an application.
#[derive(Debug)]
pub struct ConnStream {
    endpoint: Endpoint,
    app: AppRef,
    flags: ConnStreamFlags,
    data_cb: Option<&'static DataCallbacks>,
    peer: Option<ConnStreamId>,
}

impl ConnStream {
    /// Conn-stream bound to `endpoint` (possibly empty), no application.
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            app: AppRef::None,
            flags: ConnStreamFlags::NONE,
            data_cb: None,
            peer: None,
        }
    }

    /// Conn-stream driven by `stream`, endpoint left empty.
    pub fn from_strm(stream: StreamId, flags: ConnStreamFlags) -> Self {
        Self {
            app: AppRef::Stream(stream),
            flags,
            data_cb: Some(&STREAM_DATA_CB),
            ..Self::new(Endpoint::new())
        }
    }

    /// Conn-stream driven by health check `check`, endpoint left empty.
    pub fn from_check(check: CheckId, flags: ConnStreamFlags) -> Self {
        Self {
            app: AppRef::Check(check),
            flags,
            data_cb: Some(&CHECK_DATA_CB),
            ..Self::new(Endpoint::new())
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Mutable access for the endpoint owner (hints such as `RCV_MORE`).
    pub fn endpoint_mut(&mut self) -> &mut Endpoint {
        &mut self.endpoint
    }

    pub fn flags(&self) -> ConnStreamFlags {
        self.flags
    }

    pub fn insert_flags(&mut self, flags: ConnStreamFlags) {
        self.flags.insert(flags);
    }

    pub fn is_back(&self) -> bool {
        self.flags.contains(ConnStreamFlags::ISBACK)
    }

    pub fn app(&self) -> AppRef {
        self.app
    }

    // --- Endpoint attachment ---

    /// Wire the endpoint to a mux stream.
    ///
    /// Precondition: no endpoint is attached. An existing binding is
    /// overwritten without notifying its owner, so callers must
    /// `detach_endp` first.
    pub fn attach_mux(&mut self, target: Opaque, conn: Arc<Connection>) {
        let conn_id = conn.id();
        self.bind(Binding::Mux { target, conn });
        tracing::debug!(connection_id = %conn_id, app = %self.app, "Conn-stream attached to mux");
    }

    /// Wire the endpoint to an applet context. Same precondition as
    /// [`attach_mux`](Self::attach_mux).
    pub fn attach_applet(&mut self, appctx: Arc<AppCtx>, ctx: Option<Opaque>) {
        let appctx_id = appctx.id();
        self.bind(Binding::Applet { appctx, ctx });
        tracing::debug!(appctx = appctx_id, app = %self.app, "Conn-stream attached to applet");
    }

    fn bind(&mut self, binding: Binding) {
        if let Some(previous) = self.endpoint.bind(binding) {
            let kind = match previous {
                Binding::Mux { .. } => EndpointKind::Mux,
                Binding::Applet { .. } => EndpointKind::Applet,
            };
            tracing::warn!(previous = %kind, "Endpoint overwritten while still attached");
        }
    }

    /// Let go of the endpoint. The mux (or applet) is told first, then the
    /// descriptor is emptied and its transport state cleared.
    pub fn detach_endp(&mut self) {
        match self.endpoint.binding() {
            Some(Binding::Mux { conn, .. }) => {
                let conn = Arc::clone(conn);
                if let Some(mux) = conn.mux() {
                    mux.detach(self);
                }
                tracing::debug!(connection_id = %conn.id(), "Conn-stream detached from mux");
            }
            Some(Binding::Applet { appctx, .. }) => {
                appctx.release();
                tracing::debug!(appctx = appctx.id(), "Conn-stream detached from applet");
            }
            None => {}
        }
        self.endpoint.reset();
    }

    /// Recycle the endpoint for a new attachment while the application stays.
    ///
    /// Fails when no application is attached: an orphan conn-stream is freed,
    /// not recycled.
    pub fn reset_endp(&mut self) -> ConnStreamResult<()> {
        if self.app.is_none() {
            return Err(ConnStreamError::NoApplication);
        }
        self.detach_endp();
        Ok(())
    }

    // --- Application attachment ---

    /// Bind a proxy stream. Re-attaching the same stream is accepted; any
    /// other application already present is a conflict.
    pub fn attach_strm(&mut self, stream: StreamId) -> ConnStreamResult<()> {
        match self.app {
            AppRef::None => {}
            AppRef::Stream(current) if current == stream => return Ok(()),
            current => return Err(ConnStreamError::AppConflict { current }),
        }
        self.app = AppRef::Stream(stream);
        self.data_cb = Some(&STREAM_DATA_CB);
        tracing::debug!(stream = %stream, endpoint = %self.endpoint.kind(), "Stream attached");
        Ok(())
    }

    /// Drop the application back-reference and the peer link.
    pub fn detach_app(&mut self) {
        tracing::debug!(app = %self.app, "Application detached");
        self.app = AppRef::None;
        self.data_cb = None;
        self.peer = None;
    }

    // --- Unchecked accessors ---

    pub fn endpoint_target(&self) -> Option<EndpointTarget<'_>> {
        self.endpoint.target()
    }

    pub fn endpoint_ctx(&self) -> Option<EndpointCtx<'_>> {
        self.endpoint.ctx()
    }

    // --- Checked accessors ---

    /// The connection, only for a mux endpoint.
    pub fn conn(&self) -> Option<&Arc<Connection>> {
        match self.endpoint.binding() {
            Some(Binding::Mux { conn, .. }) => Some(conn),
            _ => None,
        }
    }

    /// The mux-side stream handle, only for a mux endpoint.
    pub fn mux(&self) -> Option<&Opaque> {
        match self.endpoint.binding() {
            Some(Binding::Mux { target, .. }) => Some(target),
            _ => None,
        }
    }

    /// The mux-side stream handle as a `T`, if it is one.
    pub fn mux_ctx<T: Any>(&self) -> Option<&T> {
        self.mux().and_then(|target| target.downcast_ref::<T>())
    }

    /// The operation table of the connection, only for a mux endpoint.
    pub fn conn_mux(&self) -> Option<&Arc<dyn MuxOps>> {
        self.conn().and_then(|conn| conn.mux())
    }

    /// The applet context, only for an applet endpoint.
    pub fn appctx(&self) -> Option<&Arc<AppCtx>> {
        match self.endpoint.binding() {
            Some(Binding::Applet { appctx, .. }) => Some(appctx),
            _ => None,
        }
    }

    pub fn stream(&self) -> Option<StreamId> {
        self.app.as_stream()
    }

    pub fn check(&self) -> Option<CheckId> {
        self.app.as_check()
    }

    /// The paired conn-stream on the other side of the stream, if linked.
    pub fn peer(&self) -> Option<ConnStreamId> {
        self.peer
    }

    pub fn set_peer(&mut self, peer: Option<ConnStreamId>) {
        self.peer = peer;
    }

    /// Name of the installed data callbacks, `"NONE"` when unset.
    pub fn data_name(&self) -> &'static str {
        self.data_cb.map_or("NONE", |cb| cb.name)
    }

    /// True when carried by a mux exchanging HTX.
    pub fn is_htx(&self) -> bool {
        self.conn().map_or(false, |conn| conn.is_htx())
    }

    /// Serializable snapshot for diagnostics.
    pub fn info(&self) -> ConnStreamInfo {
        ConnStreamInfo {
            kind: self.endpoint.kind(),
            endpoint_flags: self.endpoint.flags().to_string(),
            read: self.endpoint.read_state(),
            write: self.endpoint.write_state(),
            error: self.endpoint.error_state(),
            eos: self.endpoint.is_eos(),
            flags: self.flags.to_string(),
            app: self.app,
            data: self.data_name(),
            connection: self.conn().map(|conn| conn.id()),
            connection_state: self.conn().map(|conn| conn.state()),
            appctx: self.appctx().map(|appctx| appctx.id()),
        }
    }
}

/// Snapshot of a conn-stream, as printed by diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct ConnStreamInfo {
    pub kind: EndpointKind,
    pub endpoint_flags: String,
    pub read: ReadState,
    pub write: WriteState,
    pub error: ErrorState,
    pub eos: bool,
    pub flags: String,
    pub app: AppRef,
    pub data: &'static str,
    pub connection: Option<ConnectionId>,
    pub connection_state: Option<ConnectionState>,
    pub appctx: Option<u64>,
}
