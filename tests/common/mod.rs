//! Shared mocks for integration testing.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use cslayer::app::{Session, StreamEngine, StreamId};
use cslayer::applet::Applet;
use cslayer::conn_stream::{ConnStream, ConnStreamId};
use cslayer::endpoint::{ShutReadMode, ShutWriteMode};
use cslayer::mux::{MuxFlags, MuxOps};
use cslayer::net::Connection;

/// One capability call seen by a [`RecordingMux`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MuxCall {
    ShutRead(ShutReadMode),
    ShutWrite(ShutWriteMode),
    Detach,
    GetFirst,
}

/// Mux implementing every capability and recording each call in order.
#[derive(Debug, Default)]
pub struct RecordingMux {
    calls: Mutex<Vec<MuxCall>>,
    first: Mutex<Option<ConnStreamId>>,
    htx: bool,
}

impl RecordingMux {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn htx() -> Arc<Self> {
        Arc::new(Self {
            htx: true,
            ..Self::default()
        })
    }

    pub fn calls(&self) -> Vec<MuxCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn shutdown_calls(&self) -> Vec<MuxCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, MuxCall::ShutRead(_) | MuxCall::ShutWrite(_)))
            .collect()
    }

    pub fn set_first(&self, id: Option<ConnStreamId>) {
        *self.first.lock().unwrap() = id;
    }

    fn record(&self, call: MuxCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl MuxOps for RecordingMux {
    fn name(&self) -> &'static str {
        "REC"
    }

    fn flags(&self) -> MuxFlags {
        if self.htx {
            MuxFlags::HTX
        } else {
            MuxFlags::NONE
        }
    }

    fn shut_read(&self, cs: &ConnStream, mode: ShutReadMode) {
        // the transition must not be visible yet
        assert!(!cs.endpoint().read_state().is_shut());
        self.record(MuxCall::ShutRead(mode));
    }

    fn shut_write(&self, cs: &ConnStream, mode: ShutWriteMode) {
        assert!(!cs.endpoint().write_state().is_shut());
        self.record(MuxCall::ShutWrite(mode));
    }

    fn detach(&self, _cs: &ConnStream) {
        self.record(MuxCall::Detach);
    }

    fn get_first_stream(&self, _conn: &Connection) -> Option<ConnStreamId> {
        self.record(MuxCall::GetFirst);
        *self.first.lock().unwrap()
    }
}

/// Mux providing none of the optional capabilities.
#[derive(Debug, Default)]
pub struct BareMux;

impl MuxOps for BareMux {
    fn name(&self) -> &'static str {
        "BARE"
    }
}

/// Applet with no release hook.
#[derive(Debug, Default)]
pub struct NullApplet;

impl Applet for NullApplet {
    fn name(&self) -> &'static str {
        "<NULL>"
    }
}

/// Connection carried by `mux`.
pub fn connection(mux: Arc<dyn MuxOps>) -> Arc<Connection> {
    Arc::new(Connection::new(Some(mux)))
}

/// Stream engine handing out sequential stream ids, or refusing everything.
#[derive(Debug, Default)]
pub struct TestEngine {
    next: AtomicU64,
    pub refuse: bool,
    pub seen: Vec<(ConnStreamId, Bytes)>,
}

impl TestEngine {
    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }
}

impl StreamEngine for TestEngine {
    fn create_stream(
        &mut self,
        _session: &Session,
        cs: ConnStreamId,
        input: Bytes,
    ) -> Result<StreamId, Box<dyn std::error::Error + Send + Sync>> {
        if self.refuse {
            return Err("out of memory".into());
        }
        self.seen.push((cs, input));
        Ok(StreamId::new(self.next.fetch_add(1, Ordering::Relaxed) + 1))
    }
}
