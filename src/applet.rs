//! Applets: internal services standing in for a connection endpoint.
//!
//! An applet context is created and scheduled by the applet scheduler. A
//! conn-stream only holds a shared reference to it while attached, and asks
//! for its release on detach.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

static APPCTX_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Applet descriptor (the service implementation).
pub trait Applet: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Called once when the conn-stream lets go of the applet context.
    fn release(&self, _appctx: &AppCtx) {}
}

/// Running instance of an applet.
#[derive(Debug)]
pub struct AppCtx {
    id: u64,
    applet: Arc<dyn Applet>,
    released: AtomicBool,
}

impl AppCtx {
    pub fn new(applet: Arc<dyn Applet>) -> Self {
        Self {
            id: APPCTX_ID_COUNTER.fetch_add(1, Ordering::Relaxed),
            applet,
            released: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn applet(&self) -> &Arc<dyn Applet> {
        &self.applet
    }

    pub fn name(&self) -> &'static str {
        self.applet.name()
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Relaxed)
    }

    /// Run the applet's release hook. Later calls do nothing.
    pub fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::trace!(appctx = self.id, applet = self.name(), "Applet context released");
        self.applet.release(self);
    }
}
