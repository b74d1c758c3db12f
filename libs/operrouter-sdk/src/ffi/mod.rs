//! Native-call realization over the OperRouter core shared library.

#![allow(unsafe_code)]

mod client;
mod library;
mod symbols;

pub use client::FfiClient;
pub use library::{DEFAULT_SEARCH_DIRS, LIBRARY_NAMES, LIBRARY_PATH_ENV};
pub use symbols::{FreeFn, JsonFn, NativeApi, NoArgFn, VersionFn};
