//! Native library discovery and the process-wide handle cache.

use libloading::Library;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use crate::error::OperRouterError;

/// Environment variable naming the native library to load.
pub const LIBRARY_PATH_ENV: &str = "OPERROUTER_FFI_PATH";

/// File names tried through the system loader search path.
pub const LIBRARY_NAMES: [&str; 3] = [
    "liboperrouter_core_ffi.so",
    "liboperrouter_core_ffi.dylib",
    "operrouter_core_ffi.dll",
];

/// Install directories searched when the configuration names none. Relative
/// entries resolve against the working directory.
pub const DEFAULT_SEARCH_DIRS: [&str; 3] = [
    "bridges/operrouter-core-ffi/target/release",
    "/usr/local/lib",
    "/opt/operrouter/lib",
];

static LOADED: OnceLock<Mutex<HashMap<PathBuf, Arc<Library>>>> = OnceLock::new();

/// Ordered load candidates: explicit override, environment, bare platform
/// names, then the platform names under each search directory.
pub fn candidates(
    override_path: Option<&Path>,
    env_path: Option<&OsStr>,
    search_dirs: &[PathBuf],
) -> Vec<PathBuf> {
    let mut out = Vec::with_capacity(2 + LIBRARY_NAMES.len() * (1 + search_dirs.len()));
    out.extend(override_path.map(Path::to_path_buf));
    out.extend(
        env_path
            .filter(|p| !p.is_empty())
            .map(PathBuf::from),
    );
    out.extend(LIBRARY_NAMES.iter().map(PathBuf::from));
    for dir in search_dirs {
        out.extend(LIBRARY_NAMES.iter().map(|name| dir.join(name)));
    }
    out
}

/// Load the first candidate that opens, reusing a cached handle when the
/// same path was loaded before.
///
/// # Errors
/// Returns `OperRouterError::LibraryNotFound` listing every candidate if none
/// of them loads.
pub fn load_first(
    candidates: &[PathBuf],
) -> Result<(PathBuf, Arc<Library>), OperRouterError> {
    let cache = LOADED.get_or_init(|| Mutex::new(HashMap::new()));
    let mut loaded = cache.lock();

    for path in candidates {
        if let Some(lib) = loaded.get(path) {
            tracing::debug!(path = %path.display(), "reusing loaded native library");
            return Ok((path.clone(), Arc::clone(lib)));
        }

        // SAFETY: loading runs the library's initializers; the OperRouter
        // core library has none with preconditions on the caller.
        let opened = unsafe { Library::new(path) };
        match opened {
            Ok(lib) => {
                let lib = Arc::new(lib);
                loaded.insert(path.clone(), Arc::clone(&lib));
                tracing::info!(path = %path.display(), "native library loaded");
                return Ok((path.clone(), lib));
            }
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "candidate did not load");
            }
        }
    }

    Err(OperRouterError::LibraryNotFound {
        candidates: candidates
            .iter()
            .map(|p| p.display().to_string())
            .collect(),
    })
}
