//! Loading libprism and sharing its entry-point table.

use std::env;
use std::ffi::CStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;

use crate::error::{BridgeError, BridgeResult};
use crate::sys::Api;

/// Environment variable consulted by [`Library::load_default`] for the
/// path of the native library.
pub const LIBRARY_PATH_VAR: &str = "PRISM_LIBRARY";

#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) api: Api,
    // Keeps the mapping alive while any wrapper still holds entry points
    // resolved from it. None when the table came from the embedder.
    _dylib: Option<libloading::Library>,
}

/// A loaded copy of the Prism native library.
///
/// Every wrapper constructed from a `Library` shares its entry-point table
/// and keeps the underlying mapping alive. Cloning is cheap.
#[derive(Clone, Debug)]
pub struct Library {
    shared: Arc<Shared>,
}

impl Library {
    /// Load libprism from an explicit path and resolve its entry points.
    ///
    /// Loading a shared library runs its initializers; the path must name
    /// a genuine libprism build.
    pub fn load(path: impl AsRef<Path>) -> BridgeResult<Self> {
        let path = path.as_ref();
        // SAFETY: loading runs the library's initializers; the caller
        // vouches for the path per the contract above.
        let dylib = unsafe { libloading::Library::new(path) }.map_err(|source| {
            BridgeError::LibraryLoad { path: path.display().to_string(), source }
        })?;
        let api = Api::load(&dylib)?;
        debug!("loaded prism library from {}", path.display());
        Ok(Self { shared: Arc::new(Shared { api, _dylib: Some(dylib) }) })
    }

    /// Load libprism from [`LIBRARY_PATH_VAR`], falling back to the
    /// platform's default library name and search order.
    pub fn load_default() -> BridgeResult<Self> {
        match env::var_os(LIBRARY_PATH_VAR) {
            Some(path) => Self::load(PathBuf::from(path)),
            None => Self::load(default_library_name()),
        }
    }

    /// Wrap an entry-point table supplied by the embedder.
    ///
    /// For builds where the symbols are linked statically or resolved by
    /// the host application; no dynamic library is loaded or held.
    pub fn from_api(api: Api) -> Self {
        Self { shared: Arc::new(Shared { api, _dylib: None }) }
    }

    /// Version string reported by the native library.
    ///
    /// The native side returns a static string that is copied here, never
    /// freed.
    pub fn version(&self) -> BridgeResult<String> {
        // SAFETY: prism_version returns a process-lifetime C string.
        let ptr = unsafe { (self.shared.api.version)() };
        if ptr.is_null() {
            return Err(BridgeError::InvalidHandle { context: "prism_version" });
        }
        let text = unsafe { CStr::from_ptr(ptr) }
            .to_str()
            .map_err(|_| BridgeError::InvalidUtf8 { context: "version" })?;
        Ok(text.to_owned())
    }

    /// The resolved entry-point table.
    ///
    /// Escape hatch for calls this crate does not wrap; every pointer rule
    /// in [`crate::handle`] becomes the caller's responsibility.
    pub fn api(&self) -> &Api {
        &self.shared.api
    }

    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }
}

fn default_library_name() -> PathBuf {
    if cfg!(target_os = "macos") {
        PathBuf::from("libprism.dylib")
    } else if cfg!(windows) {
        PathBuf::from("prism.dll")
    } else {
        PathBuf::from("libprism.so")
    }
}
