// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Built-in (native) modules
//!
//! - The catalog of publicly requirable built-in names
//! - The [`NativeRegistry`] seam the runtime provides
//! - [`load_native_module`], which compiles a built-in for public use

mod registry;

pub use registry::{load_native_module, ModuleFactory, NativeModule, NativeModuleMap, NativeRegistry};

/// Built-in modules every runtime exposes, sorted
pub const BUILTIN_LIBS: &[&str] = &[
    "assert",
    "async_hooks",
    "buffer",
    "child_process",
    "cluster",
    "crypto",
    "dgram",
    "dns",
    "domain",
    "events",
    "fs",
    "http",
    "http2",
    "https",
    "net",
    "os",
    "path",
    "perf_hooks",
    "punycode",
    "quic",
    "querystring",
    "readline",
    "repl",
    "stream",
    "string_decoder",
    "tls",
    "trace_events",
    "tty",
    "url",
    "util",
    "v8",
    "vm",
    "worker_threads",
    "zlib",
];

/// Only present when the inspector binding can be opened
pub const INSPECTOR_LIB: &str = "inspector";

/// How built-ins are compiled for the public loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadingMode {
    /// CommonJS exports only
    Conventional,
    /// Also keep an ES module facade in sync with the exports
    Experimental,
}

/// Ordered set of built-in module names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinCatalog {
    names: Vec<&'static str>,
}

impl BuiltinCatalog {
    /// Build the catalog, appending `inspector` when available
    pub fn new(inspector: bool) -> Self {
        Self {
            names: builtin_libs(inspector),
        }
    }

    /// Names in catalog order
    pub fn names(&self) -> &[&'static str] {
        &self.names
    }

    /// Check if a name is in the catalog
    pub fn contains(&self, name: &str) -> bool {
        self.names.binary_search(&name).is_ok()
    }

    /// Check if a specifier names a built-in, with or without `node:`
    pub fn is_builtin(&self, specifier: &str) -> bool {
        self.contains(specifier.strip_prefix("node:").unwrap_or(specifier))
    }

    /// Iterate over names
    pub fn iter(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.names.iter().copied()
    }

    /// Number of built-ins
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false in practice
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for BuiltinCatalog {
    fn default() -> Self {
        Self::new(false)
    }
}

/// The built-in names, with `inspector` appended and the list re-sorted
/// when the inspector capability is present
pub fn builtin_libs(inspector: bool) -> Vec<&'static str> {
    let mut libs = BUILTIN_LIBS.to_vec();
    if inspector {
        libs.push(INSPECTOR_LIB);
        libs.sort_unstable();
    }
    libs
}
