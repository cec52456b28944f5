//! Raw ABI surface of the Prism native library.
//!
//! Everything the crate calls in libprism goes through [`Api`], a table of
//! `extern "C"` entry points resolved once when the library is loaded.
//! Nothing outside the wrapper modules dereferences a [`PrismRef`]; the raw
//! types live here and the ownership rules live in [`crate::handle`].

use libc::{c_char, c_void};

use crate::error::{BridgeError, BridgeResult};

/// Opaque reference to a Prism-owned object.
///
/// Never dereferenced on the Rust side. The null value is the universal
/// "no object" sentinel across the whole ABI.
pub type PrismRef = *mut c_void;

/// Signed count type used by the ABI.
///
/// Length and count queries return a negative value to signal failure, so
/// counts are validated through [`crate::marshal::ensure_count`] before use.
pub type PrismIndex = isize;

/// Glyph index within a font. `0` is the missing-glyph sentinel.
pub type PrismGlyph = u16;

/// Axis-aligned rectangle in font units.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PrismRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Signature of `prism_retain`. Returns its argument.
pub type RetainFn = unsafe extern "C" fn(PrismRef) -> PrismRef;

/// Signature of `prism_release`.
pub type ReleaseFn = unsafe extern "C" fn(PrismRef);

/// Resolved entry points of one loaded copy of libprism.
///
/// Calls follow the handle-first convention: the object reference comes
/// first, counts are [`PrismIndex`], fallible fill operations return `bool`.
/// Ownership of returned references is noted per field; `copy`/`create`
/// entry points hand over an owned reference, device lookups return
/// references that stay owned by the library.
///
/// Fields are public so an embedder that resolves symbols itself (or a test
/// harness) can build or patch a table and hand it to
/// [`Library::from_api`](crate::Library::from_api).
#[derive(Debug, Clone, Copy)]
pub struct Api {
    /// Increment the reference count of an object. Returns its argument.
    pub retain: RetainFn,
    /// Decrement the reference count, freeing the object when it hits zero.
    pub release: ReleaseFn,
    /// Version of the loaded library as a static C string, never freed.
    pub version: unsafe extern "C" fn() -> *const c_char,

    /// Create a string object from UTF-8 bytes. Owned reference, null on
    /// allocation failure.
    pub string_create_utf8: unsafe extern "C" fn(*const u8, usize) -> PrismRef,
    /// Byte length of a string's UTF-8 form, negative on failure.
    pub string_utf8_len: unsafe extern "C" fn(PrismRef) -> PrismIndex,
    /// Copy the UTF-8 form into `buf`; false when `cap` is too small.
    pub string_copy_utf8: unsafe extern "C" fn(PrismRef, *mut u8, usize) -> bool,

    /// Look up a font by PostScript name. Owned reference, null when the
    /// library knows no such font.
    pub font_create_named: unsafe extern "C" fn(PrismRef) -> PrismRef,
    /// Units per em of the font's glyph space.
    pub font_units_per_em: unsafe extern "C" fn(PrismRef) -> i32,
    /// Number of glyphs in the font, negative on failure.
    pub font_glyph_count: unsafe extern "C" fn(PrismRef) -> PrismIndex,
    /// Ascent in font units.
    pub font_ascent: unsafe extern "C" fn(PrismRef) -> i32,
    /// Descent in font units (non-positive for downward extent).
    pub font_descent: unsafe extern "C" fn(PrismRef) -> i32,
    /// Leading in font units.
    pub font_leading: unsafe extern "C" fn(PrismRef) -> i32,
    /// Italic angle in degrees.
    pub font_italic_angle: unsafe extern "C" fn(PrismRef) -> f64,
    /// PostScript name as an owned string reference.
    pub font_copy_name: unsafe extern "C" fn(PrismRef) -> PrismRef,
    /// Glyph index for a glyph name; `0` when the font has no such glyph.
    pub font_glyph_named: unsafe extern "C" fn(PrismRef, PrismRef) -> PrismGlyph,
    /// Name of a glyph as an owned string reference, null for unnamed
    /// glyphs.
    pub font_copy_glyph_name: unsafe extern "C" fn(PrismRef, PrismGlyph) -> PrismRef,
    /// Fill `advances` with per-glyph advances for `count` glyphs; false on
    /// failure, in which case the buffer contents are unspecified.
    pub font_glyph_advances:
        unsafe extern "C" fn(PrismRef, *const PrismGlyph, PrismIndex, *mut i32) -> bool,
    /// Fill `bounds` with per-glyph bounding rectangles for `count` glyphs;
    /// false on failure.
    pub font_glyph_bounds:
        unsafe extern "C" fn(PrismRef, *const PrismGlyph, PrismIndex, *mut PrismRect) -> bool,
    /// Write the font's bounding box through the out-pointer; false on
    /// failure.
    pub font_bounding_box: unsafe extern "C" fn(PrismRef, *mut PrismRect) -> bool,

    /// Number of attached capture devices, negative on failure.
    pub capture_device_count: unsafe extern "C" fn() -> PrismIndex,
    /// Device at `index`. Borrowed reference, null when out of range.
    pub capture_device_at: unsafe extern "C" fn(PrismIndex) -> PrismRef,
    /// The library's preferred device. Borrowed reference, null when no
    /// device is attached.
    pub capture_default_device: unsafe extern "C" fn() -> PrismRef,
    /// Localized device name as an owned string reference.
    pub capture_device_name: unsafe extern "C" fn(PrismRef) -> PrismRef,
    /// Open a device as a capture input. Owned reference on success; on
    /// failure returns null and stores an owned error object through
    /// `out_error`.
    pub capture_input_create: unsafe extern "C" fn(PrismRef, *mut PrismRef) -> PrismRef,

    /// Error domain as an owned string reference.
    pub error_domain: unsafe extern "C" fn(PrismRef) -> PrismRef,
    /// Numeric error code within the domain.
    pub error_code: unsafe extern "C" fn(PrismRef) -> i64,
    /// Human-readable error message as an owned string reference.
    pub error_message: unsafe extern "C" fn(PrismRef) -> PrismRef,
}

impl Api {
    /// Resolve every entry point from a loaded shared library.
    ///
    /// Fails with [`BridgeError::MissingSymbol`] naming the first symbol
    /// that cannot be found. The returned table copies the function
    /// pointers; the caller keeps the library mapped for as long as the
    /// table is used.
    pub fn load(lib: &libloading::Library) -> BridgeResult<Self> {
        Ok(Self {
            retain: sym(lib, "prism_retain")?,
            release: sym(lib, "prism_release")?,
            version: sym(lib, "prism_version")?,
            string_create_utf8: sym(lib, "prism_string_create_utf8")?,
            string_utf8_len: sym(lib, "prism_string_utf8_len")?,
            string_copy_utf8: sym(lib, "prism_string_copy_utf8")?,
            font_create_named: sym(lib, "prism_font_create_named")?,
            font_units_per_em: sym(lib, "prism_font_units_per_em")?,
            font_glyph_count: sym(lib, "prism_font_glyph_count")?,
            font_ascent: sym(lib, "prism_font_ascent")?,
            font_descent: sym(lib, "prism_font_descent")?,
            font_leading: sym(lib, "prism_font_leading")?,
            font_italic_angle: sym(lib, "prism_font_italic_angle")?,
            font_copy_name: sym(lib, "prism_font_copy_name")?,
            font_glyph_named: sym(lib, "prism_font_glyph_named")?,
            font_copy_glyph_name: sym(lib, "prism_font_copy_glyph_name")?,
            font_glyph_advances: sym(lib, "prism_font_glyph_advances")?,
            font_glyph_bounds: sym(lib, "prism_font_glyph_bounds")?,
            font_bounding_box: sym(lib, "prism_font_bounding_box")?,
            capture_device_count: sym(lib, "prism_capture_device_count")?,
            capture_device_at: sym(lib, "prism_capture_device_at")?,
            capture_default_device: sym(lib, "prism_capture_default_device")?,
            capture_device_name: sym(lib, "prism_capture_device_name")?,
            capture_input_create: sym(lib, "prism_capture_input_create")?,
            error_domain: sym(lib, "prism_error_domain")?,
            error_code: sym(lib, "prism_error_code")?,
            error_message: sym(lib, "prism_error_message")?,
        })
    }
}

fn sym<T: Copy>(lib: &libloading::Library, name: &'static str) -> BridgeResult<T> {
    // SAFETY: the symbol type is fixed by the libprism ABI; a library that
    // exports these names with other signatures is out of contract.
    let resolved = unsafe { lib.get::<T>(name.as_bytes()) }
        .map_err(|source| BridgeError::MissingSymbol { name, source })?;
    Ok(*resolved)
}
