//! Process-wide counters for handle traffic.
//!
//! [`OwnedHandle`](crate::OwnedHandle) feeds three relaxed atomic counters;
//! [`snapshot`] gives a point-in-time view for leak hunting. The counters
//! are monotonic diagnostics, not a ledger: a nonzero [`BridgeStats::live`]
//! over a quiesced process means wrappers were leaked without dropping.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

static HANDLES_OPENED: AtomicU64 = AtomicU64::new(0);
static HANDLES_RELEASED: AtomicU64 = AtomicU64::new(0);
static RETAINS_ISSUED: AtomicU64 = AtomicU64::new(0);

pub(crate) fn record_open() {
    HANDLES_OPENED.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn record_release() {
    HANDLES_RELEASED.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn record_retain() {
    RETAINS_ISSUED.fetch_add(1, Ordering::Relaxed);
}

/// Point-in-time view of bridge handle traffic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BridgeStats {
    /// Wrappers constructed over an owned reference count unit.
    pub handles_opened: u64,
    /// Releases actually delivered to the native side.
    pub handles_released: u64,
    /// Retains issued for borrowed references and handle clones.
    pub retains_issued: u64,
}

impl BridgeStats {
    /// Wrappers whose release has not happened yet.
    pub fn live(&self) -> u64 {
        self.handles_opened.saturating_sub(self.handles_released)
    }

    /// JSON form for log pipelines and doctor-style tooling.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Snapshot the process-wide counters.
pub fn snapshot() -> BridgeStats {
    BridgeStats {
        handles_opened: HANDLES_OPENED.load(Ordering::Relaxed),
        handles_released: HANDLES_RELEASED.load(Ordering::Relaxed),
        retains_issued: RETAINS_ISSUED.load(Ordering::Relaxed),
    }
}
