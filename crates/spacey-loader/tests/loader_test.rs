//! Loader integration tests
//!
//! Exercises resolution across scopes, caching, cycles and the host fallback.

use parking_lot::Mutex;
use spacey_loader::{
    AddOptions, HostResolver, Loader, LoaderConfig, LoaderError, NodeHost, Resolved, Result, Value,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const ROOT: &str = "/srv/app";

/// Host with a fixed set of built-ins and "installed" packages.
#[derive(Default)]
struct FakeHost {
    builtins: Vec<&'static str>,
    installed: HashMap<String, Value>,
    resolve_calls: Mutex<Vec<(String, PathBuf)>>,
}

impl FakeHost {
    fn new() -> Self {
        let mut installed = HashMap::new();
        installed.insert("left-pad".to_string(), Value::from("left-pad@1.3.0"));
        Self {
            builtins: vec!["fs", "path", "events"],
            installed,
            resolve_calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<(String, PathBuf)> {
        self.resolve_calls.lock().clone()
    }
}

impl HostResolver for FakeHost {
    fn is_builtin(&self, specifier: &str) -> bool {
        self.builtins.contains(&specifier)
    }

    fn resolve(&self, specifier: &str, basedir: &Path) -> Option<PathBuf> {
        self.resolve_calls
            .lock()
            .push((specifier.to_string(), basedir.to_path_buf()));
        self.installed
            .contains_key(specifier)
            .then(|| basedir.join("node_modules").join(specifier).join("index.js"))
    }

    fn require(&self, id: &str) -> Result<Value> {
        if self.builtins.contains(&id) {
            return Ok(Value::from(format!("builtin:{}", id)));
        }
        self.installed
            .iter()
            .find(|(name, _)| id.contains(&format!("/node_modules/{}/", name)))
            .map(|(_, exports)| exports.clone())
            .ok_or_else(|| LoaderError::host(format!("not installed: {}", id)))
    }
}

fn config() -> LoaderConfig {
    LoaderConfig::default().with_root_dir(ROOT)
}

fn root_with_host() -> (Arc<Loader>, Arc<FakeHost>) {
    let host = Arc::new(FakeHost::new());
    let root = Loader::with_host(config(), host.clone());
    (root, host)
}

/// Registers a module whose exports are `{ name: <name> }`.
fn add_named(loader: &Loader, path: &str, name: &'static str) {
    loader.add(path, AddOptions::default(), move |_, exports, _, _, _| {
        exports.set("name", name);
        Ok(())
    });
}

fn counter() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    (count.clone(), count)
}

#[test]
fn test_repeated_load_returns_same_exports() {
    let root = Loader::with_config(config());
    let (count, seen) = counter();
    root.add("/lib/util.js", AddOptions::default(), move |_, exports, _, _, _| {
        seen.fetch_add(1, Ordering::SeqCst);
        exports.set("ready", true);
        Ok(())
    });

    let first = root.load("/lib/util").unwrap();
    let second = root.load("lib/util.js").unwrap();

    assert!(first.same_value(&second));
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(root.cache().keys(), vec!["/lib/util".to_string()]);
}

#[test]
fn test_file_variant_beats_index() {
    let root = Loader::with_config(config());
    add_named(&root, "/foo", "file");
    add_named(&root, "/foo/index", "index");

    assert_eq!(root.load("/foo").unwrap().get("name"), Value::from("file"));
    assert_eq!(
        root.load_from("/", "./foo").unwrap().get("name"),
        Value::from("file")
    );
}

#[test]
fn test_directory_index_variant() {
    let root = Loader::with_config(config());
    add_named(&root, "/lib/index.js", "lib");

    assert_eq!(root.load_from("/", "./lib").unwrap().get("name"), Value::from("lib"));
    assert_eq!(root.load_from("/lib/deep", "..").unwrap().get("name"), Value::from("lib"));
}

#[test]
fn test_namespace_isolation() {
    let root = Loader::with_config(config());

    root.scope("a", "1.0.0", |a| {
        add_named(a, "/lib", "a-lib");
        a.add_main("/index", |_, exports, require, _, _| {
            exports.set("lib", require.call("./lib")?);
            exports.set("b", require.call("b")?);
            Ok(())
        });

        a.scope("b", "2.0.0", |b| {
            add_named(b, "/lib", "b-lib");
            b.add_main("/index", |_, exports, require, _, _| {
                exports.set("lib", require.call("./lib")?);
                Ok(())
            });
        });
    });

    let a = root.load_from("/", "a").unwrap();
    assert_eq!(a.get("lib").get("name"), Value::from("a-lib"));
    assert_eq!(a.get("b").get("lib").get("name"), Value::from("b-lib"));

    let scope_a = root.child("a").unwrap();
    let scope_b = scope_a.child("b").unwrap();
    assert_eq!(
        scope_a.cache().get("/lib").unwrap().filename(),
        "/srv/app/node_modules/a/lib"
    );
    assert_eq!(
        scope_b.cache().get("/lib").unwrap().filename(),
        "/srv/app/node_modules/a/node_modules/b/lib"
    );
    assert!(!a.get("lib").same_value(&a.get("b").get("lib")));
}

#[test]
fn test_scoped_package_subpath() {
    let root = Loader::with_config(config());
    root.scope("@org/pkg", "0.1.0", |pkg| {
        add_named(pkg, "/sub/file.js", "scoped");
    });

    let value = root.load_from("/", "@org/pkg/sub/file").unwrap();
    assert_eq!(value.get("name"), Value::from("scoped"));

    let record = root.child("@org/pkg").unwrap().cache().get("/sub/file").unwrap();
    assert_eq!(record.filename(), "/srv/app/node_modules/@org/pkg/sub/file");
}

#[test]
fn test_circular_require_sees_partial_exports() {
    let root = Loader::with_config(config());
    let (count, seen) = counter();

    root.add("/x", AddOptions::main(), move |_, exports, require, _, _| {
        seen.fetch_add(1, Ordering::SeqCst);
        exports.set("early", true);
        let y = require.call("./y")?;
        exports.set("late", true);
        exports.set("y", y);
        Ok(())
    });
    root.add("/y", AddOptions::default(), |_, exports, require, _, _| {
        let x = require.call("./x")?;
        let x_record = require.loader().cache().get("/x");
        exports.set("x_loaded", x_record.is_some_and(|record| record.is_loaded()));
        exports.set("x_early", x.get("early"));
        exports.set("x_late_seen", !x.get("late").is_undefined());
        exports.set("x", x);
        Ok(())
    });

    let x = root.load_main().unwrap();
    let y = x.get("y");

    assert!(y.get("x").same_value(&x));
    assert_eq!(y.get("x_loaded"), Value::Boolean(false));
    assert_eq!(y.get("x_early"), Value::Boolean(true));
    assert_eq!(y.get("x_late_seen"), Value::Boolean(false));
    assert_eq!(x.get("late"), Value::Boolean(true));
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert!(root.cache().get("/x").unwrap().is_loaded());
}

#[test]
fn test_child_subpath_tried_before_escalation() {
    let (root, host) = root_with_host();
    root.scope("pkg", "1.0.0", |pkg| {
        add_named(pkg, "/lib/a", "pkg-a");
    });

    let found = root.load_from("/", "pkg/lib/a").unwrap();
    assert_eq!(found.get("name"), Value::from("pkg-a"));
    assert!(host.calls().is_empty());

    let err = root.load_from("/", "pkg/lib/missing").unwrap_err();
    assert_eq!(
        host.calls(),
        vec![(
            "./lib/missing".to_string(),
            PathBuf::from("/srv/app/node_modules/pkg")
        )]
    );
    match err {
        LoaderError::ModuleNotFound { specifier, from } => {
            assert_eq!(specifier, "./lib/missing");
            assert_eq!(from, "/node_modules/pkg");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_end_to_end_main_with_virtual_and_host_modules() {
    let (root, host) = root_with_host();

    root.add("/helper.js", AddOptions::default(), |_, exports, _, _, _| {
        exports.set("help", "virtual helper");
        Ok(())
    });
    root.add("/app.js", AddOptions::main(), |_, exports, require, _, _| {
        exports.set("helper", require.call("./helper")?);
        exports.set("pad", require.call("left-pad")?);
        exports.set("fs", require.call("fs")?);
        Ok(())
    });

    let app = root.load_main().unwrap();

    assert_eq!(app.get("helper").get("help"), Value::from("virtual helper"));
    assert_eq!(app.get("pad"), Value::from("left-pad@1.3.0"));
    assert_eq!(app.get("fs"), Value::from("builtin:fs"));
    assert_eq!(
        host.calls(),
        vec![("left-pad".to_string(), PathBuf::from(ROOT))]
    );
}

#[test]
fn test_dependency_sees_sibling_through_parent() {
    let root = Loader::with_config(config());
    root.scope("a", "1.0.0", |a| {
        a.add_main("/index", |_, exports, require, _, _| {
            exports.set("b", require.call("b")?);
            Ok(())
        });
    });
    root.scope("b", "1.0.0", |b| {
        b.add_main("/index", |module, _, _, _, _| {
            module.set_exports("b-main");
            Ok(())
        });
    });

    let a = root.load_from("/", "a").unwrap();
    assert_eq!(a.get("b"), Value::from("b-main"));
}

#[test]
fn test_nested_dependency_invisible_to_root() {
    let root = Loader::with_config(config());
    root.scope("a", "1.0.0", |a| {
        a.scope("c", "1.0.0", |c| add_named(c, "/index", "c"));
    });

    let err = root.load_from("/", "c").unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "Cannot find module 'c' from '/'");
}

#[test]
fn test_registered_scope_shadows_builtin() {
    let (root, _host) = root_with_host();
    root.scope("events", "3.3.0", |events| {
        events.add_main("/events.js", |module, _, _, _, _| {
            module.set_exports("userland events");
            Ok(())
        });
    });

    assert_eq!(root.load_from("/", "events").unwrap(), Value::from("userland events"));
    assert_eq!(root.load_from("/", "path").unwrap(), Value::from("builtin:path"));
}

#[test]
fn test_factory_error_leaves_broken_record() {
    let root = Loader::with_config(config());
    let (count, seen) = counter();
    root.add("/broken", AddOptions::default(), move |_, exports, _, _, _| {
        seen.fetch_add(1, Ordering::SeqCst);
        exports.set("partial", true);
        Err(anyhow::anyhow!("boom").into())
    });

    let err = root.load("/broken").unwrap_err();
    assert!(matches!(err, LoaderError::Factory(_)));
    assert_eq!(err.to_string(), "boom");

    let retried = root.load("/broken").unwrap();
    assert_eq!(retried.get("partial"), Value::Boolean(true));
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert!(!root.cache().get("/broken").unwrap().is_loaded());

    root.add("/broken", AddOptions::default(), |_, exports, _, _, _| {
        exports.set("fixed", true);
        Ok(())
    });
    let recovered = root.load("/broken").unwrap();
    assert_eq!(recovered.get("fixed"), Value::Boolean(true));
    assert!(root.cache().get("/broken").unwrap().is_loaded());
}

#[test]
fn test_load_main_without_main() {
    let root = Loader::with_config(config());
    root.scope("nomain", "1.0.0", |pkg| add_named(pkg, "/lib", "lib"));

    assert!(matches!(
        root.load_main(),
        Err(LoaderError::NoMainModule { .. })
    ));
    match root.load_from("/", "nomain") {
        Err(LoaderError::NoMainModule { scope }) => assert_eq!(scope, "nomain@1.0.0"),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_factory_arguments_and_record_graph() {
    let root = Loader::with_config(config());
    let seen: Arc<Mutex<Vec<(String, String)>>> = Arc::new(Mutex::new(Vec::new()));

    let log = seen.clone();
    root.add("/lib/util.js", AddOptions::default(), move |module, _, require, filename, dirname| {
        log.lock().push((filename.to_string(), dirname.to_string()));
        assert_eq!(module.filename(), filename);
        assert_eq!(require.dirname(), "/lib");
        Ok(())
    });
    root.add("/main.js", AddOptions::main(), |_, exports, require, _, _| {
        exports.set("util", require.call("./lib/util")?);
        Ok(())
    });

    root.load_main().unwrap();

    assert_eq!(
        seen.lock().clone(),
        vec![("/srv/app/lib/util".to_string(), "/srv/app/lib".to_string())]
    );

    let main = root.cache().get("/main").unwrap();
    let util = root.cache().get("/lib/util").unwrap();
    assert_eq!(main.children().len(), 1);
    assert!(Arc::ptr_eq(&main.children()[0], &util));
    assert!(Arc::ptr_eq(&util.parent().unwrap(), &main));
    assert!(main.parent().is_none());
}

#[test]
fn test_require_resolve() {
    let (root, _host) = root_with_host();
    root.scope("dep", "1.0.0", |dep| dep.add_main("/index.js", |_, _, _, _, _| Ok(())));
    root.add("/app", AddOptions::main(), |_, exports, require, _, _| {
        exports.set("dep", format!("{:?}", require.resolve("dep")?));
        exports.set("fs", format!("{:?}", require.resolve("fs")?));
        exports.set("pad", format!("{:?}", require.resolve("left-pad")?));
        exports.set("missing", require.resolve("./nope").is_err());
        Ok(())
    });

    let app = root.load_main().unwrap();

    let dep = Resolved::Virtual {
        filename: "/srv/app/node_modules/dep/index".to_string(),
    };
    assert_eq!(app.get("dep"), Value::from(format!("{:?}", dep)));
    assert_eq!(app.get("fs"), Value::from(format!("{:?}", Resolved::Builtin("fs".to_string()))));
    let pad = Resolved::Host(PathBuf::from("/srv/app/node_modules/left-pad/index.js"));
    assert_eq!(app.get("pad"), Value::from(format!("{:?}", pad)));
    assert_eq!(app.get("missing"), Value::Boolean(true));
    assert!(root.child("dep").unwrap().cache().is_empty());
}

#[test]
fn test_load_as_typed() {
    let root = Loader::with_config(config());
    root.add("/answer", AddOptions::default(), |module, _, _, _, _| {
        module.set_exports(42);
        Ok(())
    });

    let answer: f64 = root.load_as("/answer").unwrap();
    assert_eq!(answer, 42.0);
    assert!(root.load_as::<String>("/answer").is_err());
}

#[test]
fn test_unregistered_relative_request_falls_back_to_host() {
    let (root, host) = root_with_host();
    root.add("/lib/main", AddOptions::main(), |_, _, require, _, _| {
        require.call("./generated")?;
        Ok(())
    });

    let err = root.load_main().unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(
        host.calls(),
        vec![("./generated".to_string(), PathBuf::from("/srv/app/lib"))]
    );
}

#[test]
fn test_node_host_loads_real_json_file() {
    let tmp = tempfile::TempDir::new().unwrap();
    std::fs::write(tmp.path().join("data.json"), r#"{ "answer": 42 }"#).unwrap();

    let host = NodeHost::new(|id| Err(LoaderError::host(format!("cannot execute {}", id))));
    let root = Loader::with_host(
        LoaderConfig::default().with_root_dir(tmp.path()),
        Arc::new(host),
    );
    root.add("/main", AddOptions::main(), |_, exports, require, _, _| {
        exports.set("data", require.call("./data.json")?);
        Ok(())
    });

    let main = root.load_main().unwrap();
    assert_eq!(main.get("data").get("answer"), Value::Number(42.0));
}

#[test]
fn test_exported_functions_are_shared() {
    let root = Loader::with_config(config());
    root.add("/math", AddOptions::default(), |_, exports, _, _, _| {
        exports.set(
            "double",
            spacey_loader::Function::new("double", |args| {
                let n = args.first().and_then(Value::as_number).unwrap_or(0.0);
                Ok(Value::Number(n * 2.0))
            }),
        );
        Ok(())
    });
    root.add("/main", AddOptions::main(), |_, exports, require, _, _| {
        let math = require.call("./math")?;
        exports.set("result", math.get("double").call(&[Value::Number(21.0)])?);
        exports.set("double", math.get("double"));
        Ok(())
    });

    let main = root.load_main().unwrap();
    assert_eq!(main.get("result"), Value::Number(42.0));
    assert!(main.get("double").same_value(&root.load("/math").unwrap().get("double")));
}
