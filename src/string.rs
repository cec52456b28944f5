//! Text crossing the boundary as Prism string objects.
//!
//! Prism has no notion of Rust strings; text travels as reference-counted
//! string objects. Inbound arguments become a transient object scoped to
//! one call. Outbound results arrive as owned references that are decoded
//! and released here, on every exit path, so a failed decode never leaks
//! the native allocation.

use crate::error::{BridgeError, BridgeResult};
use crate::handle::{OwnedHandle, Ownership};
use crate::marshal;
use crate::sys::{Api, PrismRef};

/// Create a Prism string for the duration of one native call.
///
/// The returned handle owns the new object and releases it when dropped,
/// whichever way the surrounding operation exits. Fails with
/// [`BridgeError::InvalidHandle`] when the native side could not allocate.
pub fn to_native(api: &Api, text: &str) -> BridgeResult<OwnedHandle> {
    // SAFETY: the pointer/length pair describes the live &str bytes; the
    // native side copies them before returning.
    let raw = unsafe { (api.string_create_utf8)(text.as_ptr(), text.len()) };
    OwnedHandle::from_created(raw, api, "string")
}

/// Decode a string reference the caller owns, releasing it exactly once.
///
/// For native calls that return an owned reference (the `*_copy_*` and
/// `*_create_*` entry points). The reference is adopted before decoding, so
/// it is released whether decoding succeeds or fails. Null input fails with
/// [`BridgeError::InvalidHandle`]; callers for whom absence is an expected
/// answer go through [`from_native_opt`].
pub fn from_native_owned(api: &Api, raw: PrismRef) -> BridgeResult<String> {
    let handle = OwnedHandle::from_existing(raw, api, Ownership::Transfer, "string")?;
    decode(api, &handle)
}

/// Like [`from_native_owned`], mapping the null sentinel to `None`.
pub fn from_native_opt(api: &Api, raw: PrismRef) -> BridgeResult<Option<String>> {
    if raw.is_null() {
        return Ok(None);
    }
    from_native_owned(api, raw).map(Some)
}

fn decode(api: &Api, handle: &OwnedHandle) -> BridgeResult<String> {
    let raw = handle.get()?;
    // SAFETY: raw is live for the duration of both calls; the copy writes
    // at most `len` bytes into a buffer of exactly `len` bytes.
    let len = marshal::ensure_count("string length", unsafe { (api.string_utf8_len)(raw) })?;
    let mut buf = vec![0u8; len];
    let ok = unsafe { (api.string_copy_utf8)(raw, buf.as_mut_ptr(), buf.len()) };
    marshal::ensure_ok("prism_string_copy_utf8", ok)?;
    String::from_utf8(buf).map_err(|_| BridgeError::InvalidUtf8 { context: "string contents" })
}
