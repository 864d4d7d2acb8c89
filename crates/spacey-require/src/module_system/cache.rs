// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module cache shared as `require.cache`

use crate::value::Value;
use dashmap::DashMap;
use std::path::{Path, PathBuf};

/// Cached module entry
#[derive(Debug, Clone)]
pub struct CachedModule {
    /// The module's exports
    pub exports: Value,
    /// The module's filename
    pub filename: PathBuf,
    /// Whether the module has finished loading
    pub loaded: bool,
    /// Module that first required this one
    pub parent: Option<String>,
}

impl CachedModule {
    /// Entry for a module that is still being evaluated
    pub fn loading(filename: PathBuf, exports: Value, parent: Option<String>) -> Self {
        Self {
            exports,
            filename,
            loaded: false,
            parent,
        }
    }
}

/// Thread-safe module cache keyed by resolved filename
#[derive(Debug, Default)]
pub struct ModuleCache {
    cache: DashMap<PathBuf, CachedModule>,
}

impl ModuleCache {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a cached module by path
    pub fn get(&self, path: &Path) -> Option<CachedModule> {
        self.cache.get(path).map(|entry| entry.clone())
    }

    /// Exports of a cached module
    pub fn exports(&self, path: &Path) -> Option<Value> {
        self.cache.get(path).map(|entry| entry.exports.clone())
    }

    /// Check if a module is cached
    pub fn has(&self, path: &Path) -> bool {
        self.cache.contains_key(path)
    }

    /// Add a module to the cache
    pub fn set(&self, path: PathBuf, module: CachedModule) {
        self.cache.insert(path, module);
    }

    /// Record final exports and mark the module loaded
    pub fn finish(&self, path: &Path, exports: Value) {
        if let Some(mut entry) = self.cache.get_mut(path) {
            entry.exports = exports;
            entry.loaded = true;
        }
    }

    /// Remove a module from the cache
    pub fn delete(&self, path: &Path) -> Option<CachedModule> {
        self.cache.remove(path).map(|(_, v)| v)
    }

    /// Clear the entire cache
    pub fn clear(&self) {
        self.cache.clear();
    }

    /// Get all cached module paths, sorted
    pub fn keys(&self) -> Vec<PathBuf> {
        let mut keys: Vec<PathBuf> = self.cache.iter().map(|entry| entry.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Get the number of cached modules
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
