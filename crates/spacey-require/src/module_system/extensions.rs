// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Extension handlers shared as `require.extensions`

use crate::error::Result;
use crate::module_system::context::ModuleContext;
use crate::value::Value;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Turns a resolved file into module exports
pub type ExtensionHandler = Arc<dyn Fn(&ModuleContext, &Path) -> Result<Value> + Send + Sync>;

/// Extension (with leading dot) → handler
#[derive(Default)]
pub struct ExtensionRegistry {
    handlers: RwLock<BTreeMap<String, ExtensionHandler>>,
}

impl ExtensionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the handler for `ext` (e.g. `".json"`)
    pub fn register<F>(&self, ext: &str, handler: F)
    where
        F: Fn(&ModuleContext, &Path) -> Result<Value> + Send + Sync + 'static,
    {
        self.handlers.write().insert(ext.to_string(), Arc::new(handler));
    }

    /// Handler for `ext`
    pub fn get(&self, ext: &str) -> Option<ExtensionHandler> {
        self.handlers.read().get(ext).cloned()
    }

    /// Remove the handler for `ext`
    pub fn remove(&self, ext: &str) -> bool {
        self.handlers.write().remove(ext).is_some()
    }

    /// Check if `ext` has a handler
    pub fn contains(&self, ext: &str) -> bool {
        self.handlers.read().contains_key(ext)
    }

    /// Registered extensions, sorted
    pub fn keys(&self) -> Vec<String> {
        self.handlers.read().keys().cloned().collect()
    }
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("extensions", &self.keys())
            .finish()
    }
}
