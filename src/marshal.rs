//! Validation for counts and arrays crossing the boundary.
//!
//! Every native call that reads or writes caller memory is preceded by
//! these checks. An undersized buffer or a negative count is rejected
//! before the call runs; after a rejection nothing is invoked and nothing
//! is partially filled.

use log::debug;

use crate::error::{BridgeError, BridgeResult};
use crate::sys::PrismIndex;

/// Whether an absent array argument is acceptable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullPolicy {
    /// The array must be present.
    Required,
    /// The native call treats a null array as "skip this output".
    AllowNull,
}

/// Validate a signed count reported by or destined for the native side.
///
/// Negative counts signal failure in the ABI and are rejected as
/// [`BridgeError::InvalidArgument`] naming the argument.
pub fn ensure_count(name: &'static str, count: PrismIndex) -> BridgeResult<usize> {
    usize::try_from(count).map_err(|_| BridgeError::InvalidArgument {
        name,
        reason: format!("count {count} is negative"),
    })
}

/// Validate an element count that crosses toward the native side.
pub fn to_index(name: &'static str, len: usize) -> BridgeResult<PrismIndex> {
    PrismIndex::try_from(len).map_err(|_| BridgeError::InvalidArgument {
        name,
        reason: format!("count {len} exceeds the native index range"),
    })
}

/// Validate an array length against the count a native call will touch.
///
/// `None` means the array is absent, which is an error unless `policy`
/// allows it. A present array may be longer than `count` but never
/// shorter.
pub fn require_len(
    name: &'static str,
    len: Option<usize>,
    count: usize,
    policy: NullPolicy,
) -> BridgeResult<()> {
    match len {
        None if policy == NullPolicy::AllowNull => Ok(()),
        None => Err(BridgeError::InvalidArgument { name, reason: "array is required".into() }),
        Some(len) if len < count => Err(BridgeError::InvalidArgument {
            name,
            reason: format!("length {len} is shorter than count {count}"),
        }),
        Some(_) => Ok(()),
    }
}

/// [`require_len`] over an optional input slice.
pub fn require_slice<T>(
    name: &'static str,
    slice: Option<&[T]>,
    count: usize,
    policy: NullPolicy,
) -> BridgeResult<()> {
    require_len(name, slice.map(<[T]>::len), count, policy)
}

/// Validate an output buffer a native call will fill.
pub fn require_out<T>(name: &'static str, buf: &[T], count: usize) -> BridgeResult<()> {
    require_len(name, Some(buf.len()), count, NullPolicy::Required)
}

/// Translate the boolean failure signal of a fill-style entry point.
///
/// On `false` the out-buffers are treated as unspecified and the call
/// surfaces as [`BridgeError::NativeCallFailed`] naming the entry point.
pub fn ensure_ok(operation: &'static str, ok: bool) -> BridgeResult<()> {
    if ok {
        Ok(())
    } else {
        debug!("native call {operation} reported failure");
        Err(BridgeError::NativeCallFailed { operation })
    }
}
