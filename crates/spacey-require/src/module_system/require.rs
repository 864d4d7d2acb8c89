// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! CommonJS require() implementation

use crate::error::{RequireError, Result};
use crate::module_system::cache::ModuleCache;
use crate::module_system::context::{ModuleContext, ResolveOptions};
use crate::module_system::extensions::ExtensionRegistry;
use crate::module_system::helpers::validate_string;
use crate::natives::{LoadingMode, NativeRegistry};
use crate::policy::{Decision, Redirects};
use crate::value::Value;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// The `require` function handed to a module.
///
/// Cloning is cheap; clones share the module, policy and registries.
#[derive(Clone)]
pub struct Require {
    module: Arc<ModuleContext>,
    redirects: Option<Redirects>,
    natives: Arc<dyn NativeRegistry>,
    mode: LoadingMode,
    main: Option<Arc<ModuleContext>>,
    extensions: Arc<ExtensionRegistry>,
    cache: Arc<ModuleCache>,
}

/// Build the `require` function for `module`.
///
/// With `redirects`, every call is checked against the policy first.
/// `main` is captured now and does not follow later changes.
pub fn make_require_function(module: Arc<ModuleContext>, redirects: Option<Redirects>) -> Require {
    let system = Arc::clone(module.system());
    Require {
        natives: system.natives(),
        mode: system.loading_mode(),
        main: system.main_module(),
        extensions: system.extensions(),
        cache: system.cache(),
        module,
        redirects,
    }
}

impl Require {
    /// `require(request)`
    pub fn call(&self, request: &str) -> Result<Value> {
        let Some(redirects) = &self.redirects else {
            return self.module.require(request);
        };

        match redirects
            .policy
            .decide(request, self.natives.as_ref(), self.mode)?
        {
            Decision::UseNativeTarget(module) => {
                return Ok(module.compile_for_public_loader(self.mode).clone());
            }
            Decision::UseFileTarget(path) => {
                let request = path
                    .to_str()
                    .ok_or_else(|| RequireError::InvalidFileUrl(path.display().to_string()))?;
                return self.module.require(request);
            }
            Decision::UseAsGiven => {}
            Decision::Denied => {
                redirects
                    .reaction
                    .react(RequireError::missing_dependency(self.module.id(), request))?;
                // The reaction chose not to fail, so the undeclared load goes ahead.
                debug!(
                    target: "module",
                    "{} loading undeclared dependency {}",
                    self.module.id(),
                    request
                );
            }
        }

        self.module.require(request)
    }

    /// `require.resolve(request, options)`
    pub fn resolve(&self, request: &Value, options: Option<&ResolveOptions>) -> Result<String> {
        let request = validate_string(request, "request")?;
        self.module
            .system()
            .resolve_filename(request, &self.module, false, options)
    }

    /// `require.resolve.paths(request)`
    pub fn resolve_paths(&self, request: &Value) -> Result<Option<Vec<PathBuf>>> {
        let request = validate_string(request, "request")?;
        Ok(self
            .module
            .system()
            .resolve_lookup_paths(request, &self.module))
    }

    /// `require.main`
    pub fn main(&self) -> Option<&Arc<ModuleContext>> {
        self.main.as_ref()
    }

    /// `require.extensions`
    pub fn extensions(&self) -> &Arc<ExtensionRegistry> {
        &self.extensions
    }

    /// `require.cache`
    pub fn cache(&self) -> &Arc<ModuleCache> {
        &self.cache
    }

    /// The module this function requires on behalf of
    pub fn module(&self) -> &Arc<ModuleContext> {
        &self.module
    }

    /// Policy in effect, if any
    pub fn redirects(&self) -> Option<&Redirects> {
        self.redirects.as_ref()
    }
}

impl fmt::Debug for Require {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Require")
            .field("module", &self.module)
            .field("redirects", &self.redirects)
            .field("mode", &self.mode)
            .finish()
    }
}
