//! Safe Rust bindings for the Prism native toolkit.
//!
//! Prism hands out reference-counted object handles with manual retain and
//! release. This crate wraps those handles so Rust code cannot double-free,
//! leak, or use a freed object through safe calls:
//!
//! - [`OwnedHandle`] owns exactly one reference count unit and releases it
//!   exactly once, through an explicit close or at drop.
//! - Text and arrays are validated and marshaled before any native call
//!   runs ([`string`], [`marshal`]).
//! - Native failure signals (null handles, false returns, error objects)
//!   are translated into [`BridgeError`] and [`NativeError`] at the
//!   boundary ([`error`]).
//!
//! [`Font`] and [`CaptureDevice`]/[`DeviceInput`] are wrapper surfaces built
//! on those pieces; they show the conventions rather than cover the whole
//! native API.
//!
//! # Loading
//!
//! Entry points are resolved at runtime: [`Library::load`] takes an
//! explicit path, [`Library::load_default`] consults the `PRISM_LIBRARY`
//! environment variable before the platform's default library name, and
//! [`Library::from_api`] accepts a table the embedder resolved itself.
//!
//! # Thread Safety
//!
//! Wrappers are NOT `Send` or `Sync`. Prism objects keep the thread
//! affinity the native library gives them; only the release path is
//! atomic, so a racing close and drop still deliver a single release.
//!
//! # Memory Management
//!
//! Creating calls transfer their reference to the wrapper; borrowed
//! references are retained on entry; owned string results are decoded and
//! released before the wrapper call returns. A process-wide traffic view
//! lives in [`stats`].
//!
//! # Example
//!
//! ```no_run
//! use prism::{Font, Library};
//!
//! fn main() -> Result<(), prism::BridgeError> {
//!     let library = Library::load_default()?;
//!     let font = Font::with_name(&library, "Menlo-Regular")?;
//!     println!("{} units per em", font.units_per_em()?);
//!
//!     let glyphs = [17u16, 18, 19];
//!     let mut advances = [0i32; 3];
//!     font.glyph_advances(&glyphs, &mut advances)?;
//!     Ok(())
//! }
//! ```

pub mod capture;
pub mod error;
pub mod font;
pub mod handle;
pub mod library;
pub mod marshal;
pub mod stats;
pub mod string;
pub mod sys;

pub use capture::{CaptureDevice, DeviceInput};
pub use error::{BridgeError, BridgeResult, NativeError};
pub use font::{Font, Glyph};
pub use handle::{OwnedHandle, Ownership};
pub use library::{Library, LIBRARY_PATH_VAR};
pub use marshal::NullPolicy;
pub use stats::BridgeStats;
pub use sys::{Api, PrismGlyph, PrismIndex, PrismRect, PrismRef};
