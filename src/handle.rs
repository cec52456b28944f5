//! Reference ownership for Prism objects.
//!
//! Prism hands out reference-counted object handles with manual retain and
//! release. [`OwnedHandle`] owns exactly one reference count unit and
//! guarantees the matching release happens exactly once: through an explicit
//! [`close`](OwnedHandle::close), or through `Drop` as the safety net when
//! no close was issued. Every wrapper type in this crate stores its native
//! reference in one of these.

use std::fmt;
use std::marker::PhantomData;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

use libc::c_void;
use log::trace;

use crate::error::{BridgeError, BridgeResult};
use crate::stats;
use crate::sys::{Api, PrismRef, ReleaseFn, RetainFn};

/// How a pre-existing reference is handed to [`OwnedHandle::from_existing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// The caller's reference count unit transfers to the wrapper. No
    /// retain is issued; the wrapper's release consumes the caller's unit.
    Transfer,
    /// The reference stays owned by whoever produced it. The wrapper
    /// retains once on construction so it owns a unit of its own.
    Borrow,
}

/// Owning wrapper around one reference count unit of a Prism object.
///
/// The stored reference is released exactly once, whichever comes first:
/// [`close`](OwnedHandle::close) or drop. After release the slot holds the
/// null sentinel and every access fails with [`BridgeError::Disposed`];
/// the raw null is never handed back to a caller.
///
/// The retain and release entry points are copied into the wrapper at
/// construction, so the drop path reads nothing but the wrapper's own
/// fields. The slot swap is atomic: a close racing a drop (or a second
/// close) delivers a single release to the native side.
///
/// # Thread Safety
///
/// `OwnedHandle` is neither `Send` nor `Sync`. Prism objects keep whatever
/// thread affinity the native library gives them; only the release path is
/// atomic.
pub struct OwnedHandle {
    raw: AtomicPtr<c_void>,
    retain: RetainFn,
    release: ReleaseFn,
    what: &'static str,
    _affinity: PhantomData<*mut c_void>,
}

impl OwnedHandle {
    /// Adopt a reference just produced by a creating native call.
    ///
    /// The creation reference transfers to the wrapper; no retain is
    /// issued. Fails with [`BridgeError::InvalidHandle`] when the call
    /// produced the null sentinel, in which case nothing is retained or
    /// released. `what` names the object kind in errors and logs.
    pub fn from_created(raw: PrismRef, api: &Api, what: &'static str) -> BridgeResult<Self> {
        if raw.is_null() {
            return Err(BridgeError::InvalidHandle { context: what });
        }
        stats::record_open();
        trace!("adopted created {what} handle {raw:?}");
        Ok(Self::wrap(raw, api, what))
    }

    /// Wrap a reference that already existed before this call.
    ///
    /// With [`Ownership::Borrow`] one retain is issued immediately so the
    /// wrapper owns a reference count unit of its own. With
    /// [`Ownership::Transfer`] the caller's unit is adopted as is. Fails
    /// with [`BridgeError::InvalidHandle`] on the null sentinel, before
    /// any retain.
    pub fn from_existing(
        raw: PrismRef,
        api: &Api,
        ownership: Ownership,
        what: &'static str,
    ) -> BridgeResult<Self> {
        if raw.is_null() {
            return Err(BridgeError::InvalidHandle { context: what });
        }
        if ownership == Ownership::Borrow {
            // SAFETY: raw is a live reference supplied by the native side
            // and checked non-null above.
            unsafe { (api.retain)(raw) };
            stats::record_retain();
            trace!("retained borrowed {what} handle {raw:?}");
        }
        stats::record_open();
        Ok(Self::wrap(raw, api, what))
    }

    fn wrap(raw: PrismRef, api: &Api, what: &'static str) -> Self {
        Self {
            raw: AtomicPtr::new(raw),
            retain: api.retain,
            release: api.release,
            what,
            _affinity: PhantomData,
        }
    }

    /// The raw reference, for passing back across the boundary.
    ///
    /// Guards the top of every native call: fails with
    /// [`BridgeError::Disposed`] once the reference has been released.
    pub fn get(&self) -> BridgeResult<PrismRef> {
        let raw = self.raw.load(Ordering::Acquire);
        if raw.is_null() {
            return Err(BridgeError::Disposed { type_name: self.what });
        }
        Ok(raw)
    }

    /// Whether the wrapped reference has been released.
    pub fn is_closed(&self) -> bool {
        self.raw.load(Ordering::Acquire).is_null()
    }

    /// Release the wrapped reference now instead of at drop.
    ///
    /// Idempotent: the first call delivers the release, every later call
    /// and the eventual drop observe the null slot and do nothing.
    pub fn close(&self) {
        self.release_now();
    }

    /// A second wrapper owning a fresh reference count unit for the same
    /// object.
    ///
    /// Fails with [`BridgeError::Disposed`] after close.
    pub fn try_clone(&self) -> BridgeResult<Self> {
        let raw = self.get()?;
        // SAFETY: raw is live while self holds its own unit.
        unsafe { (self.retain)(raw) };
        stats::record_retain();
        stats::record_open();
        trace!("cloned {} handle {raw:?}", self.what);
        Ok(Self {
            raw: AtomicPtr::new(raw),
            retain: self.retain,
            release: self.release,
            what: self.what,
            _affinity: PhantomData,
        })
    }

    fn release_now(&self) {
        let raw = self.raw.swap(ptr::null_mut(), Ordering::AcqRel);
        if raw.is_null() {
            return;
        }
        stats::record_release();
        trace!("released {} handle {raw:?}", self.what);
        // SAFETY: the swap took the sole live reference out of the slot;
        // no other path can release it again.
        unsafe { (self.release)(raw) };
    }
}

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl fmt::Debug for OwnedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedHandle")
            .field("what", &self.what)
            .field("raw", &self.raw.load(Ordering::Relaxed))
            .finish()
    }
}
