//! Require Policy Integration Tests
//!
//! Drives `require()` through the filesystem module system with redirect
//! maps, and installs built-in globals on a fresh namespace object.

use parking_lot::Mutex;
use spacey_require::module_system::{ResolveOptions, SourceCompiler};
use spacey_require::natives::{NativeModuleMap, NativeRegistry};
use spacey_require::policy::{RedirectMap, Redirects, ViolationReaction};
use spacey_require::{
    add_builtin_libs_to_object, make_require_function, BuiltinCatalog, FsModuleSystem, JsObject,
    LoaderOptions, ModuleContext, ModuleSystem, Require, RequireError, Value,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Exports `{ file: <first source line> }`
struct FirstLineCompiler;

impl SourceCompiler for FirstLineCompiler {
    fn compile(
        &self,
        _module: &ModuleContext,
        _require: Require,
        exports: Value,
        source: &str,
    ) -> spacey_require::Result<Value> {
        let obj = exports.as_object().cloned().unwrap_or_default();
        obj.set("file", Value::from(source.lines().next().unwrap_or_default()));
        Ok(Value::Object(obj))
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    root: PathBuf,
    natives: Arc<NativeModuleMap>,
    compiles: Arc<AtomicUsize>,
    system: Arc<FsModuleSystem>,
    main: Arc<ModuleContext>,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::write(root.join("a.js"), "module a").unwrap();
    fs::write(root.join("b.js"), "module b").unwrap();
    fs::create_dir_all(root.join("abs/path")).unwrap();
    fs::write(root.join("abs/path/mod.js"), "redirected").unwrap();

    let compiles = Arc::new(AtomicUsize::new(0));
    let catalog = BuiltinCatalog::default();
    let counter = Arc::clone(&compiles);
    let mut natives = NativeModuleMap::from_catalog(&catalog, move |name, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        Value::object(JsObject::from_iter([("id", Value::from(name))]))
    });
    natives.register("internal/errors", |_| Value::object(JsObject::new()));
    let natives = Arc::new(natives);

    let system = FsModuleSystem::new(
        natives.clone(),
        &LoaderOptions::default(),
        Arc::new(FirstLineCompiler),
    );
    let main = system.set_main_module(root.join("index.js"));

    Fixture {
        _dir: dir,
        root,
        natives,
        compiles,
        system,
        main,
    }
}

fn file_of(value: &Value) -> Value {
    value.as_object().unwrap().get("file").unwrap()
}

fn file_url(path: &Path) -> String {
    url::Url::from_file_path(path).unwrap().to_string()
}

#[test]
fn test_unrestricted_matches_direct_load() {
    let fx = fixture();
    let require = make_require_function(Arc::clone(&fx.main), Some(Redirects::unrestricted()));

    let via_require = require.call("./a").unwrap();
    let direct = fx.main.require("./a").unwrap();
    assert_eq!(via_require, direct);
    assert_eq!(file_of(&direct), Value::from("module a"));
}

#[test]
fn test_lenient_reaction_falls_back() {
    let fx = fixture();
    let reported = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&reported);
    let reaction = ViolationReaction::custom(move |err| {
        sink.lock().push(err.to_string());
        Ok(())
    });
    let require = make_require_function(
        Arc::clone(&fx.main),
        Some(Redirects::new(RedirectMap::new().allow("./a"), reaction)),
    );

    assert_eq!(file_of(&require.call("./a").unwrap()), Value::from("module a"));
    assert!(reported.lock().is_empty());

    assert_eq!(file_of(&require.call("./b").unwrap()), Value::from("module b"));
    let expected = format!(
        "Manifest resource {} does not list ./b as a dependency specifier",
        fx.root.join("index.js").display()
    );
    assert_eq!(*reported.lock(), vec![expected]);
}

#[test]
fn test_log_reaction_falls_back() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("module=debug")
        .with_test_writer()
        .try_init();

    let fx = fixture();
    let require = make_require_function(
        Arc::clone(&fx.main),
        Some(Redirects::new(RedirectMap::new(), ViolationReaction::log())),
    );
    assert_eq!(file_of(&require.call("./b")?), Value::from("module b"));
    Ok(())
}

#[test]
fn test_throwing_reaction_blocks() {
    let fx = fixture();
    let require = make_require_function(
        Arc::clone(&fx.main),
        Some(Redirects::new(RedirectMap::new(), ViolationReaction::throw())),
    );
    let err = require.call("./b").unwrap_err();
    assert!(matches!(err, RequireError::MissingDependency { ref specifier, .. } if specifier == "./b"));
    assert!(fx.system.cache().is_empty());
}

#[test]
fn test_node_redirect() {
    let fx = fixture();
    let require = make_require_function(
        Arc::clone(&fx.main),
        Some(Redirects::new(
            RedirectMap::new()
                .redirect("x", "node:fs")
                .redirect("missing", "node:not_a_module")
                .redirect("hidden", "node:internal/errors"),
            ViolationReaction::throw(),
        )),
    );

    let via_policy = require.call("x").unwrap();
    let direct = fx.main.require("fs").unwrap();
    assert_eq!(via_policy, direct);
    assert_eq!(Some(&direct), fx.natives.lookup("fs").unwrap().exports());

    for name in ["missing", "hidden"] {
        let err = require.call(name).unwrap_err();
        assert_eq!(err.code(), "ERR_UNKNOWN_BUILTIN_MODULE");
    }
}

#[test]
fn test_file_redirect() {
    let fx = fixture();
    let target = fx.root.join("abs/path/mod.js");
    let require = make_require_function(
        Arc::clone(&fx.main),
        Some(Redirects::new(
            RedirectMap::new().redirect("y", file_url(&target)),
            ViolationReaction::throw(),
        )),
    );

    let via_policy = require.call("y").unwrap();
    let direct = fx.main.require(&target.display().to_string()).unwrap();
    assert_eq!(via_policy, direct);
    assert_eq!(file_of(&via_policy), Value::from("redirected"));
}

#[test]
fn test_unsupported_and_malformed_redirects() {
    let fx = fixture();
    let require = make_require_function(
        Arc::clone(&fx.main),
        Some(Redirects::new(
            RedirectMap::new()
                .redirect("remote", "https://example.com/x.js")
                .redirect("broken", "::"),
            ViolationReaction::throw(),
        )),
    );
    assert_eq!(
        require.call("remote").unwrap_err().code(),
        "ERR_UNSUPPORTED_REDIRECT_SCHEME"
    );
    assert_eq!(require.call("broken").unwrap_err().code(), "ERR_INVALID_URL");
}

#[test]
fn test_resolve_and_paths() {
    let fx = fixture();
    let require = make_require_function(Arc::clone(&fx.main), None);

    assert_eq!(
        require.resolve(&Value::Number(42.0), None).unwrap_err().code(),
        "ERR_INVALID_ARG_TYPE"
    );
    assert_eq!(
        require.resolve(&Value::from("./a"), None).unwrap(),
        fx.system.resolve_filename("./a", &fx.main, false, None).unwrap()
    );
    assert_eq!(
        require.resolve(&Value::from("./a"), None).unwrap(),
        fx.root.join("a.js").display().to_string()
    );
    assert_eq!(require.resolve(&Value::from("node:fs"), None).unwrap(), "node:fs");

    let options = ResolveOptions {
        paths: Some(vec![fx.root.join("abs/path")]),
    };
    assert_eq!(
        require.resolve(&Value::from("./mod"), Some(&options)).unwrap(),
        fx.root.join("abs/path/mod.js").display().to_string()
    );

    assert_eq!(
        require.resolve_paths(&Value::from("./a")).unwrap(),
        Some(vec![fx.root.clone()])
    );
    assert_eq!(require.resolve_paths(&Value::from("fs")).unwrap(), None);
    assert!(require.resolve_paths(&Value::Boolean(true)).is_err());
}

#[test]
fn test_main_cache_and_extensions() {
    let fx = fixture();
    let require = make_require_function(Arc::clone(&fx.main), None);

    assert_eq!(require.main().unwrap().filename(), fx.main.filename());
    require.call("./a").unwrap();
    assert!(fx.system.cache().has(&fx.root.join("a.js")));

    // Mutations through require.cache are visible to the module system
    require.cache().delete(&fx.root.join("a.js"));
    assert!(!fx.system.cache().has(&fx.root.join("a.js")));

    require
        .extensions()
        .register(".txt", |_, _| Ok(Value::from("text")));
    assert!(fx.system.extensions().contains(".txt"));
}

#[test]
fn test_main_is_snapshot() {
    let fx = fixture();
    let require = make_require_function(Arc::clone(&fx.main), None);
    fx.system.set_main_module(fx.root.join("other.js"));
    assert_eq!(require.main().unwrap().filename(), fx.main.filename());
}

#[test]
fn test_builtin_globals() {
    let fx = fixture();
    let catalog = BuiltinCatalog::default();
    let global = JsObject::new();
    add_builtin_libs_to_object(&global, &catalog, Arc::clone(&fx.main));

    assert!(global.keys().is_empty());
    assert_eq!(global.own_keys().len(), catalog.len());
    assert_eq!(fx.compiles.load(Ordering::SeqCst), 0);

    for name in catalog.iter() {
        let first = global.get(name).unwrap();
        let second = global.get(name).unwrap();
        assert_eq!(first, second);
        assert_eq!(Some(&first), fx.natives.lookup(name).unwrap().exports());
    }
    assert_eq!(fx.compiles.load(Ordering::SeqCst), catalog.len());
}

#[test]
fn test_builtin_globals_overridable() {
    let fx = fixture();
    let global = JsObject::new();
    add_builtin_libs_to_object(&global, &BuiltinCatalog::default(), Arc::clone(&fx.main));

    global.set("path", Value::from("mine"));
    assert_eq!(global.get("path").unwrap(), Value::from("mine"));
    assert_eq!(fx.compiles.load(Ordering::SeqCst), 0);
    assert_eq!(global.keys(), vec!["path"]);

    global.get("util").unwrap();
    global.set("util", Value::Undefined);
    assert!(global.get("util").unwrap().is_undefined());
    assert_eq!(fx.compiles.load(Ordering::SeqCst), 1);
}

#[test]
fn test_inspector_catalog() {
    let options = LoaderOptions::from_json_str(r#"{"inspector": true}"#).unwrap();
    let catalog = BuiltinCatalog::new(options.inspector);
    let global = JsObject::new();
    let natives = Arc::new(NativeModuleMap::from_catalog(&catalog, |name, _| {
        Value::from(name)
    }));
    let system = FsModuleSystem::new(natives, &options, Arc::new(FirstLineCompiler));
    let main = Arc::new(system.context("/app/index.js"));
    add_builtin_libs_to_object(&global, system.catalog(), main);

    assert_eq!(global.get("inspector").unwrap(), Value::from("inspector"));
}
