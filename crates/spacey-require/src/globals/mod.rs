// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Built-in modules as lazy globals
//!
//! Every catalog name becomes a non-enumerable property on a target object
//! (the REPL context, say). The module is only required on first read, and
//! user code can assign over the name as if no global existed.

use crate::error::Result;
use crate::module_system::ModuleContext;
use crate::natives::BuiltinCatalog;
use crate::value::{JsObject, PropertyFlags, Value};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Loads the module behind a binding
pub type BindingLoader = Arc<dyn Fn(&str) -> Result<Value> + Send + Sync>;

/// Where a lazy binding is in its life
#[derive(Debug, Clone, PartialEq)]
pub enum BindingState {
    /// Never read
    Unresolved,
    /// Read once; holds the loaded module
    Resolved(Value),
    /// Assigned by user code. Terminal.
    Overridden(Value),
}

/// One lazily loaded property
pub struct LazyBinding {
    name: String,
    loader: BindingLoader,
    state: Mutex<BindingState>,
}

impl LazyBinding {
    /// Create an unresolved binding
    pub fn new(name: impl Into<String>, loader: BindingLoader) -> Self {
        Self {
            name: name.into(),
            loader,
            state: Mutex::new(BindingState::Unresolved),
        }
    }

    /// Property name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state
    pub fn state(&self) -> BindingState {
        self.state.lock().clone()
    }

    /// Read the binding, loading the module on first access.
    ///
    /// The loader runs without the state lock held, so a module may read
    /// other globals while it loads. The first stored value wins.
    pub fn get(&self) -> Result<Value> {
        if let BindingState::Resolved(value) | BindingState::Overridden(value) = &*self.state.lock() {
            return Ok(value.clone());
        }

        let lib = (self.loader)(&self.name)?;

        let mut state = self.state.lock();
        if let BindingState::Resolved(value) | BindingState::Overridden(value) = &*state {
            return Ok(value.clone());
        }
        debug!(target: "module", "resolved lazy global {}", self.name);
        *state = BindingState::Resolved(lib.clone());
        Ok(lib)
    }

    /// Replace whatever the binding holds with a user value
    pub fn override_with(&self, value: Value) {
        *self.state.lock() = BindingState::Overridden(value);
    }
}

impl fmt::Debug for LazyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyBinding")
            .field("name", &self.name)
            .field("state", &*self.state.lock())
            .finish()
    }
}

/// Define `name` on `target` as a lazy, configurable, non-enumerable property
pub fn define_lazy_global(target: &JsObject, name: &str, loader: BindingLoader) {
    target.define_lazy(
        name,
        Arc::new(LazyBinding::new(name, loader)),
        PropertyFlags::HIDDEN,
    );
}

/// Install every built-in in `catalog` on `target` as a lazy global that
/// `module` requires on first read.
///
/// Installing again on the same target redefines every name, discarding
/// earlier reads and assignments.
pub fn add_builtin_libs_to_object(
    target: &JsObject,
    catalog: &BuiltinCatalog,
    module: Arc<ModuleContext>,
) {
    let loader: BindingLoader = Arc::new(move |name: &str| module.require(name));
    for name in catalog.iter() {
        define_lazy_global(target, name, Arc::clone(&loader));
    }
    debug!(target: "module", "installed {} lazy built-in globals", catalog.len());
}
