//! Error types for boundary calls and their translation rules.
//!
//! Native failure signals never cross the boundary raw: a null handle, a
//! false return or an error object is translated here into a typed error
//! before any caller sees it. Expected failures (a device refusing to open)
//! travel as [`NativeError`] values inside `Ok`; everything else is a
//! [`BridgeError`].

use serde::Serialize;
use thiserror::Error;

use crate::handle::{OwnedHandle, Ownership};
use crate::string;
use crate::sys::{Api, PrismRef};

/// Result alias used across the crate.
pub type BridgeResult<T> = std::result::Result<T, BridgeError>;

/// An error raised at the native boundary.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The null sentinel showed up where an object reference was required,
    /// either from a creating call that failed or from a caller-supplied
    /// handle.
    #[error("invalid handle for {context}")]
    InvalidHandle { context: &'static str },

    /// Operation on a wrapper whose reference has already been released.
    #[error("{type_name} used after close")]
    Disposed { type_name: &'static str },

    /// An argument failed validation before the native call ran.
    #[error("invalid argument {name}: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    /// A native entry point reported failure without structured detail.
    #[error("native call {operation} failed")]
    NativeCallFailed { operation: &'static str },

    /// Structured failure reported by the native side.
    #[error(transparent)]
    Native(#[from] NativeError),

    /// Text crossing the boundary was not valid UTF-8.
    #[error("text for {context} is not valid UTF-8")]
    InvalidUtf8 { context: &'static str },

    /// The native library could not be loaded.
    #[error("failed to load prism library from {path}")]
    LibraryLoad {
        path: String,
        #[source]
        source: libloading::Error,
    },

    /// The loaded library does not export a required entry point.
    #[error("symbol {name} missing from prism library")]
    MissingSymbol {
        name: &'static str,
        #[source]
        source: libloading::Error,
    },
}

/// Structured failure reported by the native side through an error object.
///
/// Operations where failure is an expected outcome return this as data
/// (`Ok(Err(NativeError))`) rather than raising a [`BridgeError`]; see
/// [`DeviceInput::try_from_device`](crate::DeviceInput::try_from_device).
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{domain} error {code}: {message}")]
pub struct NativeError {
    /// Subsystem that produced the error, e.g. `PrismCapture`.
    pub domain: String,
    /// Numeric code within the domain.
    pub code: i64,
    /// Human-readable description.
    pub message: String,
}

impl NativeError {
    /// Decode an owned error object produced by a native call.
    ///
    /// Adopts the reference, reads domain, code and message, and releases
    /// the object exactly once whichever way decoding exits. Fails with
    /// [`BridgeError::InvalidHandle`] when `raw` is null, which means the
    /// native side broke the out-parameter convention.
    pub(crate) fn read_from(api: &Api, raw: PrismRef) -> BridgeResult<Self> {
        let handle = OwnedHandle::from_existing(raw, api, Ownership::Transfer, "error object")?;
        let raw = handle.get()?;
        let domain = string::from_native_owned(api, unsafe { (api.error_domain)(raw) })?;
        let code = unsafe { (api.error_code)(raw) };
        let message = string::from_native_owned(api, unsafe { (api.error_message)(raw) })?;
        Ok(Self { domain, code, message })
    }
}
