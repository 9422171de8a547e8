//! Conn-stream metrics.
//!
//! # Metrics
//! - `conn_stream_created_total` (counter): by origin (endpoint, mux, applet, stream, check)
//! - `conn_stream_freed_total` (counter)
//! - `conn_stream_live` (gauge): conn-streams currently allocated
//! - `conn_stream_shutdown_total` (counter): by axis (read, write) and mode
//! - `conn_stream_errors_total` (counter): by level (pending, confirmed)
//!
//! Recording goes through the `metrics` facade; with no recorder installed
//! every call is a no-op.

use std::sync::atomic::{AtomicBool, Ordering};

static ENABLED: AtomicBool = AtomicBool::new(true);

/// Turn recording on or off process-wide.
pub fn set_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

pub fn record_created(origin: &'static str) {
    if !is_enabled() {
        return;
    }
    metrics::counter!("conn_stream_created_total", "origin" => origin).increment(1);
    metrics::gauge!("conn_stream_live").increment(1.0);
}

pub fn record_freed() {
    if !is_enabled() {
        return;
    }
    metrics::counter!("conn_stream_freed_total").increment(1);
    metrics::gauge!("conn_stream_live").decrement(1.0);
}

pub fn record_shutdown(axis: &'static str, mode: &'static str) {
    if !is_enabled() {
        return;
    }
    metrics::counter!("conn_stream_shutdown_total", "axis" => axis, "mode" => mode).increment(1);
}

pub fn record_error(level: &'static str) {
    if !is_enabled() {
        return;
    }
    metrics::counter!("conn_stream_errors_total", "level" => level).increment(1);
}
