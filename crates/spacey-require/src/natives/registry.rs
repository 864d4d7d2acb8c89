// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Native module registry

use super::{BuiltinCatalog, LoadingMode};
use crate::value::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Produces the exports of a built-in module
pub type ModuleFactory = Box<dyn Fn(LoadingMode) -> Value + Send + Sync>;

/// A built-in module known to the runtime.
///
/// Compilation happens at most once; every later call hands back the same
/// exports instance.
pub struct NativeModule {
    id: String,
    can_be_required_by_users: bool,
    factory: ModuleFactory,
    exports: OnceLock<Value>,
    export_keys: OnceLock<Vec<String>>,
}

impl NativeModule {
    /// Create a native module. Ids under `internal/` are never exposed to users.
    pub fn new(id: impl Into<String>, factory: ModuleFactory) -> Self {
        let id = id.into();
        let can_be_required_by_users = !id.starts_with("internal/");
        Self {
            id,
            can_be_required_by_users,
            factory,
            exports: OnceLock::new(),
            export_keys: OnceLock::new(),
        }
    }

    /// Canonical module id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether user code may require this module
    pub fn can_be_required_by_users(&self) -> bool {
        self.can_be_required_by_users
    }

    /// Exports, if the module has been compiled
    pub fn exports(&self) -> Option<&Value> {
        self.exports.get()
    }

    /// Names exposed through the ES module facade, once synced
    pub fn export_keys(&self) -> Option<&[String]> {
        self.export_keys.get().map(Vec::as_slice)
    }

    /// Compile the module for the public loader and return its exports.
    ///
    /// In [`LoadingMode::Experimental`] the ES module facade's export names are
    /// captured as well, even if an earlier call compiled conventionally.
    pub fn compile_for_public_loader(&self, mode: LoadingMode) -> &Value {
        let exports = self.exports.get_or_init(|| {
            debug!(target: "module", "compiling native module {}", self.id);
            (self.factory)(mode)
        });
        if mode == LoadingMode::Experimental {
            self.export_keys.get_or_init(|| match exports.as_object() {
                Some(obj) => obj.keys(),
                None => Vec::new(),
            });
        }
        exports
    }
}

impl fmt::Debug for NativeModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeModule")
            .field("id", &self.id)
            .field("can_be_required_by_users", &self.can_be_required_by_users)
            .field("compiled", &self.exports.get().is_some())
            .finish()
    }
}

/// Lookup of built-in modules by canonical name
pub trait NativeRegistry: Send + Sync {
    /// Find a built-in module. `None` means "not a built-in".
    fn lookup(&self, name: &str) -> Option<Arc<NativeModule>>;
}

/// In-memory registry backed by module factories
#[derive(Debug, Default)]
pub struct NativeModuleMap {
    modules: HashMap<String, Arc<NativeModule>>,
}

impl NativeModuleMap {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every catalog name, building exports with `factory`
    pub fn from_catalog<F>(catalog: &BuiltinCatalog, factory: F) -> Self
    where
        F: Fn(&str, LoadingMode) -> Value + Send + Sync + Clone + 'static,
    {
        let mut map = Self::new();
        for name in catalog.iter() {
            let factory = factory.clone();
            map.register(name, move |mode| factory(name, mode));
        }
        map
    }

    /// Register a module, replacing any previous one with the same id
    pub fn register<F>(&mut self, id: &str, factory: F) -> Arc<NativeModule>
    where
        F: Fn(LoadingMode) -> Value + Send + Sync + 'static,
    {
        let module = Arc::new(NativeModule::new(id, Box::new(factory)));
        self.modules.insert(id.to_string(), Arc::clone(&module));
        module
    }

    /// Number of registered modules
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl NativeRegistry for NativeModuleMap {
    fn lookup(&self, name: &str) -> Option<Arc<NativeModule>> {
        self.modules.get(name).cloned()
    }
}

/// Load a built-in for the public loader.
///
/// Returns `None` when `name` is not a built-in. Internal modules are
/// returned uncompiled so the caller can reject them.
pub fn load_native_module(
    registry: &dyn NativeRegistry,
    name: &str,
    request: &str,
    mode: LoadingMode,
) -> Option<Arc<NativeModule>> {
    let module = registry.lookup(name)?;
    debug!(target: "module", "load native module {}", request);
    if module.can_be_required_by_users() {
        module.compile_for_public_loader(mode);
    }
    Some(module)
}
