//! Capture devices and device inputs.
//!
//! Two boundary conventions live here. Device lookups return references the
//! library keeps owning, so wrappers retain on entry. Opening a device can
//! fail as an ordinary outcome (device busy, permission withheld); that
//! failure arrives through an error-object out-parameter and is returned as
//! data, not raised.

use std::fmt;
use std::ptr;
use std::sync::Arc;

use crate::error::{BridgeError, BridgeResult, NativeError};
use crate::handle::{OwnedHandle, Ownership};
use crate::library::{Library, Shared};
use crate::marshal;
use crate::string;
use crate::sys::PrismRef;

/// A capture device attached to the system.
pub struct CaptureDevice {
    shared: Arc<Shared>,
    handle: OwnedHandle,
}

impl CaptureDevice {
    /// The library's preferred device, `None` when nothing is attached.
    ///
    /// The native call returns a borrowed reference; the wrapper retains
    /// it, so closing or dropping the wrapper stays balanced.
    pub fn default_device(library: &Library) -> BridgeResult<Option<Self>> {
        let api = library.api();
        // SAFETY: no arguments; the result is null or a live borrowed
        // reference.
        let raw = unsafe { (api.capture_default_device)() };
        if raw.is_null() {
            return Ok(None);
        }
        let handle = OwnedHandle::from_existing(raw, api, Ownership::Borrow, "capture device")?;
        Ok(Some(Self { shared: library.shared().clone(), handle }))
    }

    /// Every attached device, in library order.
    pub fn all(library: &Library) -> BridgeResult<Vec<Self>> {
        let api = library.api();
        // SAFETY: no arguments; the count is validated before use.
        let raw_count = unsafe { (api.capture_device_count)() };
        let count = marshal::ensure_count("device count", raw_count)?;
        let mut devices = Vec::with_capacity(count);
        for i in 0..count {
            let index = marshal::to_index("device index", i)?;
            // SAFETY: the index is in the range the library just reported.
            let raw = unsafe { (api.capture_device_at)(index) };
            let handle =
                OwnedHandle::from_existing(raw, api, Ownership::Borrow, "capture device")?;
            devices.push(Self { shared: library.shared().clone(), handle });
        }
        Ok(devices)
    }

    /// Localized device name.
    pub fn name(&self) -> BridgeResult<String> {
        let raw = self.handle.get()?;
        // SAFETY: raw is live; the result is an owned string reference
        // consumed by the decoder.
        let name = unsafe { (self.shared.api.capture_device_name)(raw) };
        string::from_native_owned(&self.shared.api, name)
    }

    /// Release the device's reference now instead of at drop.
    pub fn close(&mut self) {
        self.handle.close();
    }

    /// Whether the device wrapper has been closed.
    pub fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }
}

impl fmt::Debug for CaptureDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureDevice").field("handle", &self.handle).finish()
    }
}

/// An opened capture input feeding from one device.
pub struct DeviceInput {
    handle: OwnedHandle,
    // Held so the entry-point table outlives the input.
    _shared: Arc<Shared>,
}

impl DeviceInput {
    /// Try to open `device`, reporting refusal as data.
    ///
    /// The outer error is a contract violation (a closed device wrapper, a
    /// broken out-parameter convention). The inner result is the native
    /// side's verdict: the opened input, or the structured [`NativeError`]
    /// it reported. The error object behind the out-parameter is decoded
    /// and released exactly once.
    pub fn try_from_device(device: &CaptureDevice) -> BridgeResult<Result<Self, NativeError>> {
        let api = &device.shared.api;
        let raw_device = device.handle.get()?;
        let mut out_error: PrismRef = ptr::null_mut();
        // SAFETY: the device reference is live and the out-pointer
        // addresses a local slot. Success and failure are exclusive: a
        // null result means an owned error object was stored.
        let raw = unsafe { (api.capture_input_create)(raw_device, &mut out_error) };
        if raw.is_null() {
            return Ok(Err(NativeError::read_from(api, out_error)?));
        }
        let handle = OwnedHandle::from_created(raw, api, "device input")?;
        Ok(Ok(Self { handle, _shared: device.shared.clone() }))
    }

    /// Open `device`, folding refusal into the error channel.
    ///
    /// Convenience over [`try_from_device`](DeviceInput::try_from_device)
    /// for callers that treat refusal like any other failure.
    pub fn from_device(device: &CaptureDevice) -> BridgeResult<Self> {
        match Self::try_from_device(device)? {
            Ok(input) => Ok(input),
            Err(native) => Err(BridgeError::Native(native)),
        }
    }

    /// Release the input's reference now instead of at drop.
    pub fn close(&mut self) {
        self.handle.close();
    }

    /// Whether the input has been closed.
    pub fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }
}

impl fmt::Debug for DeviceInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceInput").field("handle", &self.handle).finish()
    }
}
