//! Font objects and their metric accessors.
//!
//! The pattern every accessor follows: guard the handle, validate whatever
//! memory the call will touch, invoke one `prism_font_*` entry point,
//! translate its failure signal. Fonts are cheap to keep around; the
//! underlying object is released when the wrapper is closed or dropped.

use std::fmt;
use std::sync::Arc;

use crate::error::BridgeResult;
use crate::handle::OwnedHandle;
use crate::library::{Library, Shared};
use crate::marshal;
use crate::string;
use crate::sys::{Api, PrismGlyph, PrismRect};

/// Glyph index within a font. `0` is the missing-glyph sentinel.
pub type Glyph = PrismGlyph;

/// A font owned by the Prism library.
pub struct Font {
    shared: Arc<Shared>,
    handle: OwnedHandle,
}

impl Font {
    /// Look up a font by its PostScript name.
    ///
    /// The name crosses the boundary as a transient string object that is
    /// released on every exit path. Fails with
    /// [`BridgeError::InvalidHandle`](crate::BridgeError::InvalidHandle)
    /// when the library knows no font by that name.
    pub fn with_name(library: &Library, name: &str) -> BridgeResult<Self> {
        let api = library.api();
        let name_ref = string::to_native(api, name)?;
        // SAFETY: both references are live; the call copies nothing out of
        // the name string beyond its own lookup.
        let raw = unsafe { (api.font_create_named)(name_ref.get()?) };
        let handle = OwnedHandle::from_created(raw, api, "font")?;
        Ok(Self { shared: library.shared().clone(), handle })
    }

    fn api(&self) -> &Api {
        &self.shared.api
    }

    /// Units per em of the glyph space.
    pub fn units_per_em(&self) -> BridgeResult<i32> {
        let raw = self.handle.get()?;
        // SAFETY: raw is live; plain value accessor.
        Ok(unsafe { (self.api().font_units_per_em)(raw) })
    }

    /// Number of glyphs in the font.
    pub fn glyph_count(&self) -> BridgeResult<usize> {
        let raw = self.handle.get()?;
        // SAFETY: raw is live; plain value accessor.
        let count = unsafe { (self.api().font_glyph_count)(raw) };
        marshal::ensure_count("glyph count", count)
    }

    /// Ascent in font units.
    pub fn ascent(&self) -> BridgeResult<i32> {
        let raw = self.handle.get()?;
        // SAFETY: raw is live; plain value accessor.
        Ok(unsafe { (self.api().font_ascent)(raw) })
    }

    /// Descent in font units, non-positive for downward extent.
    pub fn descent(&self) -> BridgeResult<i32> {
        let raw = self.handle.get()?;
        // SAFETY: raw is live; plain value accessor.
        Ok(unsafe { (self.api().font_descent)(raw) })
    }

    /// Leading in font units.
    pub fn leading(&self) -> BridgeResult<i32> {
        let raw = self.handle.get()?;
        // SAFETY: raw is live; plain value accessor.
        Ok(unsafe { (self.api().font_leading)(raw) })
    }

    /// Italic angle in degrees.
    pub fn italic_angle(&self) -> BridgeResult<f64> {
        let raw = self.handle.get()?;
        // SAFETY: raw is live; plain value accessor.
        Ok(unsafe { (self.api().font_italic_angle)(raw) })
    }

    /// PostScript name, decoded from an owned native string.
    pub fn postscript_name(&self) -> BridgeResult<String> {
        let raw = self.handle.get()?;
        // SAFETY: raw is live; the returned string reference is owned and
        // consumed by the decoder.
        let name = unsafe { (self.api().font_copy_name)(raw) };
        string::from_native_owned(self.api(), name)
    }

    /// Glyph index for a glyph name, `None` when the font has no such
    /// glyph.
    pub fn glyph_named(&self, name: &str) -> BridgeResult<Option<Glyph>> {
        let raw = self.handle.get()?;
        let name_ref = string::to_native(self.api(), name)?;
        // SAFETY: both references are live for the duration of the call.
        let glyph = unsafe { (self.api().font_glyph_named)(raw, name_ref.get()?) };
        Ok((glyph != 0).then_some(glyph))
    }

    /// Name of a glyph, `None` for unnamed glyphs.
    pub fn glyph_name(&self, glyph: Glyph) -> BridgeResult<Option<String>> {
        let raw = self.handle.get()?;
        // SAFETY: raw is live; a non-null result is an owned string
        // reference consumed by the decoder.
        let name = unsafe { (self.api().font_copy_glyph_name)(raw, glyph) };
        string::from_native_opt(self.api(), name)
    }

    /// Fill `advances` with per-glyph advances in font units.
    ///
    /// `advances` must be at least as long as `glyphs`; the call is
    /// rejected before it runs otherwise. On failure the buffer contents
    /// are unspecified.
    pub fn glyph_advances(&self, glyphs: &[Glyph], advances: &mut [i32]) -> BridgeResult<()> {
        let raw = self.handle.get()?;
        let count = glyphs.len();
        marshal::require_out("advances", advances, count)?;
        let index = marshal::to_index("count", count)?;
        // SAFETY: the buffers were just validated against count; the call
        // reads count glyphs and writes at most count advances.
        let ok = unsafe {
            (self.api().font_glyph_advances)(raw, glyphs.as_ptr(), index, advances.as_mut_ptr())
        };
        marshal::ensure_ok("prism_font_glyph_advances", ok)
    }

    /// Allocating variant of [`glyph_advances`](Font::glyph_advances).
    pub fn glyph_advances_vec(&self, glyphs: &[Glyph]) -> BridgeResult<Vec<i32>> {
        let mut advances = vec![0; glyphs.len()];
        self.glyph_advances(glyphs, &mut advances)?;
        Ok(advances)
    }

    /// Fill `bounds` with per-glyph bounding rectangles in font units.
    ///
    /// Same contract as [`glyph_advances`](Font::glyph_advances).
    pub fn glyph_bounds(&self, glyphs: &[Glyph], bounds: &mut [PrismRect]) -> BridgeResult<()> {
        let raw = self.handle.get()?;
        let count = glyphs.len();
        marshal::require_out("bounds", bounds, count)?;
        let index = marshal::to_index("count", count)?;
        // SAFETY: the buffers were just validated against count.
        let ok = unsafe {
            (self.api().font_glyph_bounds)(raw, glyphs.as_ptr(), index, bounds.as_mut_ptr())
        };
        marshal::ensure_ok("prism_font_glyph_bounds", ok)
    }

    /// Bounding box of the whole font, in font units.
    pub fn bounding_box(&self) -> BridgeResult<PrismRect> {
        let raw = self.handle.get()?;
        let mut rect = PrismRect::default();
        // SAFETY: raw is live and the out-pointer addresses a local.
        let ok = unsafe { (self.api().font_bounding_box)(raw, &mut rect) };
        marshal::ensure_ok("prism_font_bounding_box", ok)?;
        Ok(rect)
    }

    /// Release the font's reference now instead of at drop.
    ///
    /// Idempotent; afterwards every accessor fails with
    /// [`BridgeError::Disposed`](crate::BridgeError::Disposed).
    pub fn close(&mut self) {
        self.handle.close();
    }

    /// Whether the font has been closed.
    pub fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }
}

impl fmt::Debug for Font {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Font").field("handle", &self.handle).finish()
    }
}
