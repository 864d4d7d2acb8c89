// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Filesystem-backed module system

use crate::config::LoaderOptions;
use crate::error::{RequireError, Result};
use crate::module_system::cache::{CachedModule, ModuleCache};
use crate::module_system::context::{ModuleContext, ModuleSystem, ResolveOptions};
use crate::module_system::extensions::ExtensionRegistry;
use crate::module_system::helpers::strip_bom;
use crate::module_system::require::{make_require_function, Require};
use crate::module_system::resolver::ModuleResolver;
use crate::natives::{load_native_module, BuiltinCatalog, LoadingMode, NativeRegistry};
use crate::value::{JsObject, Value};
use dashmap::DashMap;
use parking_lot::{ReentrantMutex, RwLock};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use tracing::debug;

/// Evaluates JavaScript source for `.js` files.
///
/// The loader does not bundle an engine; the runtime plugs one in.
pub trait SourceCompiler: Send + Sync {
    /// Evaluate `source` as the body of `module` and return its exports.
    /// `exports` is the object already visible to circular requires.
    fn compile(
        &self,
        module: &ModuleContext,
        require: Require,
        exports: Value,
        source: &str,
    ) -> Result<Value>;
}

/// Module system that loads built-ins from a [`NativeRegistry`] and
/// everything else from disk.
///
/// A file is evaluated by one thread at a time. Other threads requiring it
/// meanwhile wait for its final exports; only requires made during its own
/// evaluation see the partial exports.
pub struct FsModuleSystem {
    this: Weak<FsModuleSystem>,
    natives: Arc<dyn NativeRegistry>,
    catalog: BuiltinCatalog,
    mode: LoadingMode,
    resolver: ModuleResolver,
    cache: Arc<ModuleCache>,
    extensions: Arc<ExtensionRegistry>,
    loading: DashMap<PathBuf, Arc<ReentrantMutex<()>>>,
    main: RwLock<Option<PathBuf>>,
}

impl FsModuleSystem {
    /// Create a module system with `.js` and `.json` handlers installed
    pub fn new(
        natives: Arc<dyn NativeRegistry>,
        options: &LoaderOptions,
        compiler: Arc<dyn SourceCompiler>,
    ) -> Arc<Self> {
        let extensions = Arc::new(ExtensionRegistry::new());
        extensions.register(".js", move |module, path| {
            let source = std::fs::read_to_string(path)?;
            let require = make_require_function(Arc::new(module.clone()), None);
            let exports = module
                .system()
                .cache()
                .exports(path)
                .unwrap_or_else(|| Value::object(JsObject::new()));
            compiler.compile(module, require, exports, strip_bom(&source))
        });
        extensions.register(".json", |_module, path| {
            let content = std::fs::read_to_string(path)?;
            let json: serde_json::Value = serde_json::from_str(strip_bom(&content))?;
            Ok(Value::from(&json))
        });

        Arc::new_cyclic(|this| Self {
            this: Weak::clone(this),
            natives,
            catalog: BuiltinCatalog::new(options.inspector),
            mode: options.loading_mode(),
            resolver: ModuleResolver::new(options.extensions.clone()),
            cache: Arc::new(ModuleCache::new()),
            extensions,
            loading: DashMap::new(),
            main: RwLock::new(None),
        })
    }

    /// Context for `filename`, owned by this module system
    pub fn context(self: &Arc<Self>, filename: impl Into<PathBuf>) -> ModuleContext {
        ModuleContext::from_filename(filename, Arc::clone(self) as Arc<dyn ModuleSystem>)
    }

    /// Designate the entry module. Returns its context.
    ///
    /// Only the filename is kept, so the system does not own a context that
    /// points back at it.
    pub fn set_main_module(self: &Arc<Self>, filename: impl Into<PathBuf>) -> Arc<ModuleContext> {
        let filename = filename.into();
        *self.main.write() = Some(filename.clone());
        Arc::new(self.context(filename))
    }

    /// The built-in catalog this system recognizes
    pub fn catalog(&self) -> &BuiltinCatalog {
        &self.catalog
    }

    fn builtin_name<'a>(&self, request: &'a str) -> Option<&'a str> {
        let name = request.strip_prefix("node:").unwrap_or(request);
        self.catalog.contains(name).then_some(name)
    }

    fn resolve_path(
        &self,
        request: &str,
        parent: &ModuleContext,
        options: Option<&ResolveOptions>,
    ) -> Result<PathBuf> {
        let search_paths = options.and_then(|o| o.paths.as_deref());
        self.resolver.resolve(request, &parent.dirname(), search_paths)
    }

    fn load_file(&self, filename: PathBuf, parent: &ModuleContext) -> Result<Value> {
        if let Some(entry) = self.cache.get(&filename).filter(|entry| entry.loaded) {
            return Ok(entry.exports);
        }

        let lock = Arc::clone(&self.loading.entry(filename.clone()).or_default());
        let guard = lock.lock();
        let result = self.evaluate_file(&filename, parent);
        drop(guard);
        drop(lock);
        self.loading
            .remove_if(&filename, |_, waiting| Arc::strong_count(waiting) == 1);
        result
    }

    /// Runs with the file's loading lock held. Reentrant calls from the
    /// same thread are circular requires and get the partial exports.
    fn evaluate_file(&self, filename: &Path, parent: &ModuleContext) -> Result<Value> {
        if let Some(exports) = self.cache.exports(filename) {
            return Ok(exports);
        }

        let ext = filename
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e));
        let handler = ext
            .as_deref()
            .and_then(|e| self.extensions.get(e))
            .or_else(|| self.extensions.get(".js"))
            .ok_or_else(|| RequireError::UnknownExtension(filename.to_path_buf()))?;

        // Cached before evaluation so circular requires see partial exports.
        self.cache.set(
            filename.to_path_buf(),
            CachedModule::loading(
                filename.to_path_buf(),
                Value::object(JsObject::new()),
                Some(parent.id().to_string()),
            ),
        );

        let module = ModuleContext::from_filename(filename, Arc::clone(parent.system()));
        debug!(target: "module", "load {} for {}", filename.display(), parent.id());
        match handler(&module, filename) {
            Ok(exports) => {
                self.cache.finish(filename, exports.clone());
                Ok(exports)
            }
            Err(err) => {
                self.cache.delete(filename);
                Err(err)
            }
        }
    }
}

impl ModuleSystem for FsModuleSystem {
    fn load(&self, request: &str, parent: &ModuleContext) -> Result<Value> {
        if let Some(name) = self.builtin_name(request) {
            return match load_native_module(self.natives.as_ref(), name, request, self.mode) {
                Some(module) if module.can_be_required_by_users() => {
                    Ok(module.compile_for_public_loader(self.mode).clone())
                }
                _ => Err(RequireError::module_not_found(request)),
            };
        }

        let filename = self.resolve_path(request, parent, None)?;
        self.load_file(filename, parent)
    }

    fn resolve_filename(
        &self,
        request: &str,
        parent: &ModuleContext,
        is_main: bool,
        options: Option<&ResolveOptions>,
    ) -> Result<String> {
        if self.builtin_name(request).is_some() {
            return Ok(request.to_string());
        }
        let filename = self.resolve_path(request, parent, options)?;
        debug!(
            target: "module",
            "resolved {} -> {} (main: {})",
            request,
            filename.display(),
            is_main
        );
        Ok(filename.display().to_string())
    }

    fn resolve_lookup_paths(&self, request: &str, parent: &ModuleContext) -> Option<Vec<PathBuf>> {
        if self.builtin_name(request).is_some() {
            return None;
        }
        if ModuleResolver::is_relative(request) {
            return Some(vec![parent.dirname()]);
        }
        Some(ModuleResolver::node_module_paths(&parent.dirname()))
    }

    fn cache(&self) -> Arc<ModuleCache> {
        Arc::clone(&self.cache)
    }

    fn extensions(&self) -> Arc<ExtensionRegistry> {
        Arc::clone(&self.extensions)
    }

    fn main_module(&self) -> Option<Arc<ModuleContext>> {
        let filename = self.main.read().clone()?;
        let this = self.this.upgrade()?;
        Some(Arc::new(ModuleContext::from_filename(filename, this)))
    }

    fn natives(&self) -> Arc<dyn NativeRegistry> {
        Arc::clone(&self.natives)
    }

    fn loading_mode(&self) -> LoadingMode {
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::natives::NativeModuleMap;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Treats a `.js` file's source as a string export, requiring each
    /// `// require: <specifier>` line first
    struct EchoCompiler {
        runs: AtomicUsize,
    }

    impl SourceCompiler for EchoCompiler {
        fn compile(
            &self,
            _module: &ModuleContext,
            require: Require,
            exports: Value,
            source: &str,
        ) -> Result<Value> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            let obj = exports.as_object().cloned().unwrap_or_default();
            for line in source.lines() {
                if let Some(specifier) = line.strip_prefix("// require: ") {
                    obj.set(specifier, require.call(specifier)?);
                }
            }
            obj.set("source", Value::from(source.trim()));
            Ok(Value::Object(obj))
        }
    }

    fn system(compiler: Arc<EchoCompiler>) -> Arc<FsModuleSystem> {
        let mut natives = NativeModuleMap::new();
        natives.register("fs", |_| Value::from("fs exports"));
        FsModuleSystem::new(Arc::new(natives), &LoaderOptions::default(), compiler)
    }

    #[test]
    fn test_load_json_with_bom() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::write(root.join("data.json"), "\u{FEFF}{\"ok\": true}").unwrap();

        let sys = system(Arc::new(EchoCompiler { runs: AtomicUsize::new(0) }));
        let main = sys.set_main_module(root.join("main.js"));
        let data = main.require("./data.json").unwrap();
        assert_eq!(
            data.as_object().unwrap().get("ok").unwrap(),
            Value::Boolean(true)
        );
        assert!(sys.cache().has(&root.join("data.json")));
    }

    #[test]
    fn test_js_cached_and_circular() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::write(root.join("a.js"), "// require: ./b\nA").unwrap();
        fs::write(root.join("b.js"), "// require: ./a\nB").unwrap();

        let compiler = Arc::new(EchoCompiler { runs: AtomicUsize::new(0) });
        let sys = system(Arc::clone(&compiler));
        let main = sys.context(root.join("main.js"));

        let a = main.require("./a").unwrap();
        let again = main.require("./a.js").unwrap();
        assert_eq!(a, again);
        assert_eq!(compiler.runs.load(Ordering::SeqCst), 2);

        let a_obj = a.as_object().unwrap();
        let b = a_obj.get("./b").unwrap();
        // b saw a's partial exports, which are the final exports object
        assert_eq!(b.as_object().unwrap().get("./a").unwrap(), a);
    }

    #[test]
    fn test_failed_load_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::write(root.join("bad.json"), "{").unwrap();

        let sys = system(Arc::new(EchoCompiler { runs: AtomicUsize::new(0) }));
        let main = sys.context(root.join("main.js"));
        assert_eq!(main.require("./bad.json").unwrap_err().code(), "ERR_JSON_PARSE");
        assert!(sys.cache().is_empty());
    }

    #[test]
    fn test_builtins() {
        let sys = system(Arc::new(EchoCompiler { runs: AtomicUsize::new(0) }));
        let main = sys.context("/app/main.js");
        assert_eq!(main.require("fs").unwrap(), Value::from("fs exports"));
        assert_eq!(main.require("node:fs").unwrap(), Value::from("fs exports"));
        // In the catalog but not registered
        assert_eq!(main.require("zlib").unwrap_err().code(), "MODULE_NOT_FOUND");

        assert_eq!(sys.resolve_filename("fs", &main, false, None).unwrap(), "fs");
        assert!(sys.resolve_lookup_paths("node:fs", &main).is_none());
    }

    #[test]
    fn test_lookup_paths() {
        let sys = system(Arc::new(EchoCompiler { runs: AtomicUsize::new(0) }));
        let main = sys.context("/app/src/main.js");
        assert_eq!(
            sys.resolve_lookup_paths("./x", &main),
            Some(vec![PathBuf::from("/app/src")])
        );
        assert_eq!(
            sys.resolve_lookup_paths("lodash", &main).unwrap()[0],
            PathBuf::from("/app/src/node_modules")
        );
    }

    #[test]
    fn test_system_freed_after_main_set() {
        let sys = system(Arc::new(EchoCompiler { runs: AtomicUsize::new(0) }));
        let weak = Arc::downgrade(&sys);
        let main = sys.set_main_module("/app/index.js");
        assert_eq!(
            sys.main_module().unwrap().filename(),
            Some(Path::new("/app/index.js"))
        );

        drop(main);
        drop(sys);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_concurrent_require_waits_for_final_exports() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::write(root.join("x.slow"), "").unwrap();

        let sys = system(Arc::new(EchoCompiler { runs: AtomicUsize::new(0) }));
        let runs = Arc::new(AtomicUsize::new(0));
        let runs_in_handler = Arc::clone(&runs);
        sys.extensions().register(".slow", move |_, _| {
            runs_in_handler.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(300));
            Ok(Value::from("final"))
        });
        let main = Arc::new(sys.context(root.join("main.js")));

        let first = {
            let main = Arc::clone(&main);
            std::thread::spawn(move || main.require("./x.slow"))
        };
        std::thread::sleep(std::time::Duration::from_millis(100));
        let second = {
            let main = Arc::clone(&main);
            std::thread::spawn(move || main.require("./x.slow"))
        };

        assert_eq!(first.join().unwrap().unwrap(), Value::from("final"));
        assert_eq!(second.join().unwrap().unwrap(), Value::from("final"));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(sys.cache().get(&root.join("x.slow")).unwrap().loaded);
    }

    #[test]
    fn test_extension_handlers() {
        let sys = system(Arc::new(EchoCompiler { runs: AtomicUsize::new(0) }));
        assert_eq!(sys.extensions().keys(), vec![".js", ".json"]);
        assert!(!sys.extensions().contains(".ts"));
    }
}
