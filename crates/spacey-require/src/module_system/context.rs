// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The module system seam and the per-module context

use crate::error::Result;
use crate::module_system::cache::ModuleCache;
use crate::module_system::extensions::ExtensionRegistry;
use crate::natives::{LoadingMode, NativeRegistry};
use crate::value::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Options for `require.resolve()`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Search from these directories instead of the parent's lookup paths
    pub paths: Option<Vec<PathBuf>>,
}

/// Everything `require()` needs from the module system that owns a module.
///
/// Implementations own the module cache and the extension registry; require
/// capabilities hold shared handles to them.
pub trait ModuleSystem: Send + Sync {
    /// Load `request` on behalf of `parent` and return its exports
    fn load(&self, request: &str, parent: &ModuleContext) -> Result<Value>;

    /// Resolve `request` to a filename (or built-in id) without loading it
    fn resolve_filename(
        &self,
        request: &str,
        parent: &ModuleContext,
        is_main: bool,
        options: Option<&ResolveOptions>,
    ) -> Result<String>;

    /// Directories searched for `request`, or `None` for built-ins
    fn resolve_lookup_paths(&self, request: &str, parent: &ModuleContext) -> Option<Vec<PathBuf>>;

    /// Shared module cache
    fn cache(&self) -> Arc<ModuleCache>;

    /// Shared extension handlers
    fn extensions(&self) -> Arc<ExtensionRegistry>;

    /// The entry module, if one has been designated
    fn main_module(&self) -> Option<Arc<ModuleContext>>;

    /// Registry used for `node:` redirects
    fn natives(&self) -> Arc<dyn NativeRegistry>;

    /// How built-ins are compiled for public use
    fn loading_mode(&self) -> LoadingMode;
}

/// A loaded (or loading) module, as seen by the code that requires from it
#[derive(Clone)]
pub struct ModuleContext {
    id: String,
    filename: Option<PathBuf>,
    system: Arc<dyn ModuleSystem>,
}

impl ModuleContext {
    /// Create a context with a synthetic id and no backing file
    pub fn new(id: impl Into<String>, system: Arc<dyn ModuleSystem>) -> Self {
        Self {
            id: id.into(),
            filename: None,
            system,
        }
    }

    /// Create a context for a file. The id is the filename.
    pub fn from_filename(filename: impl Into<PathBuf>, system: Arc<dyn ModuleSystem>) -> Self {
        let filename = filename.into();
        Self {
            id: filename.display().to_string(),
            filename: Some(filename),
            system,
        }
    }

    /// Identifier used in diagnostics: the filename when known, else the id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Backing file, if any
    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    /// Directory relative requests are resolved against
    pub fn dirname(&self) -> PathBuf {
        self.filename
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// The owning module system
    pub fn system(&self) -> &Arc<dyn ModuleSystem> {
        &self.system
    }

    /// Load a dependency with no policy applied
    pub fn require(&self, request: &str) -> Result<Value> {
        self.system.load(request, self)
    }
}

impl fmt::Debug for ModuleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleContext")
            .field("id", &self.id)
            .field("filename", &self.filename)
            .finish()
    }
}
