//! require() integration tests: caching, cycles, errors, native modules,
//! source maps and the filesystem loader.

use spacey_require::module_system::path;
use spacey_require::{NativeModule, Registry, RequireError, register_builtins};
use spacey_script::{Object, Runtime, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn map_loader(
    files: &[(&str, &str)],
) -> impl Fn(&str) -> Result<Vec<u8>, RequireError> + Send + Sync + 'static {
    let files: HashMap<String, String> = files
        .iter()
        .map(|(p, s)| (p.to_string(), s.to_string()))
        .collect();
    move |p| match files.get(p) {
        Some(source) => Ok(source.clone().into_bytes()),
        None => Err(RequireError::ModuleNotExist),
    }
}

fn enable(registry: &Registry) -> (Runtime, spacey_require::ModuleResolver) {
    let mut runtime = Runtime::new();
    let resolver = registry.enable(&mut runtime).unwrap();
    (runtime, resolver)
}

struct TestModule;

impl NativeModule for TestModule {
    fn enable(&self, runtime: &mut Runtime) -> spacey_require::Result<()> {
        let test = runtime.new_function("test", |_rt, _this, _args| Ok(Value::from("passed")));
        runtime.set_global("test", test);
        Ok(())
    }

    fn export(&self, runtime: &mut Runtime, module: &Object) -> spacey_require::Result<()> {
        let exports = module.get("exports");
        if let Some(exports) = exports.as_object() {
            exports.set("test", runtime.get_global("test"));
        }
        Ok(())
    }
}

#[test]
fn test_require_native_module() {
    let registry = Registry::new();
    registry.register_native_module("test/m", TestModule);
    let (mut runtime, _) = enable(&registry);
    let value = runtime
        .run_string("test.js", "var m = require('test/m'); m.test()")
        .unwrap();
    assert_eq!(value, Value::from("passed"));
}

#[test]
fn test_native_module_wins_over_packages() {
    let registry = Registry::builder()
        .loader(map_loader(&[("node_modules/test/m.js", "exports.test = function () { return 'file' }")]))
        .build();
    registry.register_native_module("test/m", TestModule);
    let (mut runtime, _) = enable(&registry);
    let value = runtime.run_string("test.js", "require('test/m').test()").unwrap();
    assert_eq!(value, Value::from("passed"));
}

#[test]
fn test_native_export_runs_once_per_runtime() {
    struct Counting(Arc<AtomicUsize>);

    impl NativeModule for Counting {
        fn enable(&self, _runtime: &mut Runtime) -> spacey_require::Result<()> {
            Ok(())
        }

        fn export(&self, _runtime: &mut Runtime, _module: &Object) -> spacey_require::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    let exports = Arc::new(AtomicUsize::new(0));
    let registry = Registry::new();
    registry.register_native_module("counting", Counting(Arc::clone(&exports)));

    let (mut first, _) = enable(&registry);
    first
        .run_string("a.js", "require('counting') === require('counting')")
        .unwrap();
    let (mut second, _) = enable(&registry);
    second.run_string("b.js", "require('counting')").unwrap();

    assert_eq!(exports.load(Ordering::SeqCst), 2);
}

#[test]
fn test_source_loader_with_global_folder() {
    let registry = Registry::builder()
        .global_folders(["."])
        .loader(|name| match name {
            "m.js" => Ok(b"function test() { return 'passed1' }\nexports.test = test;".to_vec()),
            _ => Err(RequireError::ModuleNotExist),
        })
        .build();
    let (mut runtime, _) = enable(&registry);
    let value = runtime
        .run_string("test.js", "var m = require('m.js'); m.test()")
        .unwrap();
    assert_eq!(value, Value::from("passed1"));
}

#[test]
fn test_require_cycle() {
    let registry = Registry::with_loader(map_loader(&[
        ("a.js", "var b = require('./b.js'); exports.done = true;"),
        ("b.js", "var a = require('./a.js'); exports.done = true;"),
    ]));
    let (mut runtime, _) = enable(&registry);
    let value = runtime
        .run_string(
            "test.js",
            "var a = require('./a.js'); var b = require('./b.js'); a.done && b.done",
        )
        .unwrap();
    assert_eq!(value, Value::from(true));
}

#[test]
fn test_cycle_sees_partial_exports() {
    let registry = Registry::with_loader(map_loader(&[
        ("/a.js", "exports.before = 1; exports.seen = require('./b').seen; exports.after = 2;"),
        ("/b.js", "var a = require('./a'); exports.seen = JSON.stringify(a);"),
    ]));
    let (mut runtime, resolver) = enable(&registry);
    let a = resolver.require(&mut runtime, "/a").unwrap();
    let a = a.as_object().unwrap();
    assert_eq!(a.get("seen"), Value::from(r#"{"before":1}"#));
    assert_eq!(a.get("after"), Value::from(2));
}

#[test]
fn test_error_propagation() {
    let registry = Registry::with_loader(map_loader(&[("m.js", "throw 'test passed';")]));
    let (mut runtime, resolver) = enable(&registry);
    let err = resolver.require(&mut runtime, "./m").unwrap_err();
    match err {
        RequireError::Exception(exception) => assert_eq!(exception.value(), &Value::from("test passed")),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_thrown_error_object_keeps_identity() {
    let registry = Registry::with_loader(map_loader(&[(
        "/m.js",
        "var e = new TypeError('bad'); globalThis.thrown = e; throw e;",
    )]));
    let (mut runtime, resolver) = enable(&registry);
    let err = resolver.require(&mut runtime, "/m").unwrap_err();
    let exception = err.exception().unwrap();
    assert_eq!(exception.value(), &runtime.get_global("thrown"));
    assert_eq!(exception.to_string(), "TypeError: bad");
}

#[test]
fn test_script_catches_module_exception() {
    let registry = Registry::with_loader(map_loader(&[("/m.js", "throw { code: 7 }")]));
    let (mut runtime, resolver) = enable(&registry);
    let value = resolver
        .run_script(&mut runtime, "/main.js", "var c; try { require('./m') } catch (e) { c = e.code } c")
        .unwrap();
    assert_eq!(value, Value::from(7));
}

#[test]
fn test_source_map_loader() {
    let registry = Registry::with_loader(|p| match p {
        "dir/m.js" => Ok(b"throw 'test passed';\n//# sourceMappingURL=m.js.map".to_vec()),
        "dir/m.js.map" => Ok(
            br#"{"version":3,"file":"m.js","sourceRoot":"","sources":["m.ts"],"names":[],"mappings":";AAAA"}
"#
            .to_vec(),
        ),
        _ => Err(RequireError::ModuleNotExist),
    });
    let (mut runtime, resolver) = enable(&registry);
    let err = resolver.require(&mut runtime, "./dir/m").unwrap_err();
    assert_eq!(err.exception().map(|e| e.value().clone()), Some(Value::from("test passed")));

    let compiled = registry.compiled_program("dir/m.js").unwrap();
    let map = compiled.source_map().expect("source map loaded");
    assert_eq!(map.sources, vec!["m.ts"]);
    assert_eq!(map.mappings, ";AAAA");
}

#[test]
fn test_identity_and_single_execution() {
    let registry = Registry::with_loader(map_loader(&[(
        "/lib/counter.js",
        "globalThis.runs = (globalThis.runs || 0) + 1; exports.id = {};",
    )]));
    let (mut runtime, resolver) = enable(&registry);
    let value = resolver
        .run_script(
            &mut runtime,
            "/lib/main.js",
            "require('./counter') === require('./counter.js') && require('/lib/counter').id === require('./counter').id",
        )
        .unwrap();
    assert_eq!(value, Value::from(true));
    assert_eq!(runtime.get_global("runs"), Value::from(1));
}

#[test]
fn test_module_exports_replacement() {
    let registry = Registry::with_loader(map_loader(&[
        ("/greet.js", "module.exports = function (who) { return 'hello ' + who }"),
        ("/main.js", "exports.line = require('./greet')('world')"),
    ]));
    let (mut runtime, resolver) = enable(&registry);
    let main = resolver.require(&mut runtime, "/main").unwrap();
    assert_eq!(main.as_object().unwrap().get("line"), Value::from("hello world"));
}

#[test]
fn test_json_module() {
    let registry = Registry::with_loader(map_loader(&[(
        "/data/config.json",
        r#"{"port": 8080, "hosts": ["a", "b"], "quote": "it's \"fine\""}"#,
    )]));
    let (mut runtime, resolver) = enable(&registry);
    let config = resolver.require(&mut runtime, "/data/config").unwrap();
    let config = config.as_object().unwrap();
    assert_eq!(config.get("port"), Value::from(8080));
    assert_eq!(config.get("quote"), Value::from("it's \"fine\""));
    assert!(config.get("hosts").as_object().unwrap().is_array());
}

#[test]
fn test_invalid_json_module_is_an_exception() {
    let registry = Registry::with_loader(map_loader(&[("/bad.json", "{ nope")]));
    let (mut runtime, resolver) = enable(&registry);
    let err = resolver.require(&mut runtime, "/bad.json").unwrap_err();
    let name = err.exception().unwrap().value().as_object().unwrap().get("name");
    assert_eq!(name, Value::from("SyntaxError"));
}

#[test]
fn test_module_fields() {
    let registry = Registry::with_loader(map_loader(&[(
        "/m.js",
        "exports.during = module.loaded; exports.id = module.id;",
    )]));
    let (mut runtime, resolver) = enable(&registry);
    let module = resolver.resolve(&mut runtime, "/m").unwrap();
    let exports = module.exports();
    let exports = exports.as_object().unwrap();
    assert_eq!(exports.get("during"), Value::from(false));
    assert_eq!(exports.get("id"), Value::from("/m.js"));
    assert_eq!(module.object().get("loaded"), Value::from(true));
}

#[test]
fn test_runtimes_do_not_share_instances() {
    let loads = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&loads);
    let registry = Registry::with_loader(move |p| {
        counter.fetch_add(1, Ordering::SeqCst);
        match p {
            "/m.js" => Ok(b"globalThis.runs = (globalThis.runs || 0) + 1".to_vec()),
            _ => Err(RequireError::ModuleNotExist),
        }
    });
    let (mut first, first_resolver) = enable(&registry);
    let (mut second, second_resolver) = enable(&registry);
    first_resolver.require(&mut first, "/m.js").unwrap();
    second_resolver.require(&mut second, "/m.js").unwrap();

    assert_eq!(first.get_global("runs"), Value::from(1));
    assert_eq!(second.get_global("runs"), Value::from(1));
    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[test]
fn test_concurrent_runtimes_compile_once() {
    let loads = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&loads);
    let registry = Registry::with_loader(move |p| {
        counter.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(std::time::Duration::from_millis(5));
        match p {
            "/shared.js" => Ok(b"exports.value = 6 * 7".to_vec()),
            _ => Err(RequireError::ModuleNotExist),
        }
    });

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = registry.clone();
            std::thread::spawn(move || {
                let mut runtime = Runtime::new();
                let resolver = registry.enable(&mut runtime).unwrap();
                let exports = resolver.require(&mut runtime, "/shared").unwrap();
                exports.as_object().map(|o| o.get("value").to_number())
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), Some(42.0));
    }
    // One read for the source; "/shared" itself misses once per runtime
    assert_eq!(registry.compiled_count(), 1);
    assert_eq!(loads.load(Ordering::SeqCst), 8 + 1);
}

#[test]
fn test_default_module_loader() {
    let workdir = tempfile::tempdir().unwrap();
    std::fs::create_dir(workdir.path().join("module")).unwrap();
    std::fs::write(workdir.path().join("module/index.js"), "throw 'test passed';").unwrap();

    let registry = Registry::new();
    let (mut runtime, resolver) = enable(&registry);
    let entry = format!("{}/module", path::from_host(workdir.path()));
    let err = resolver.require(&mut runtime, &entry).unwrap_err();
    assert_eq!(err.exception().map(|e| e.value().clone()), Some(Value::from("test passed")));
}

#[test]
fn test_default_loader_package_tree() {
    let root = tempfile::tempdir().unwrap();
    let app = root.path().join("app");
    let pkg = app.join("node_modules").join("greeter");
    std::fs::create_dir_all(pkg.join("lib")).unwrap();
    std::fs::write(pkg.join("package.json"), r#"{"name": "greeter", "main": "lib/greet.js"}"#).unwrap();
    std::fs::write(pkg.join("lib").join("greet.js"), "module.exports = function (n) { return 'hi ' + n }").unwrap();
    std::fs::write(app.join("main.js"), "exports.out = require('greeter')('there')").unwrap();

    let registry = Registry::new();
    let (mut runtime, resolver) = enable(&registry);
    let main = resolver
        .require(&mut runtime, &path::from_host(&app.join("main.js")))
        .unwrap();
    assert_eq!(main.as_object().unwrap().get("out"), Value::from("hi there"));
}

#[test]
fn test_builtins_end_to_end() {
    let registry = Registry::with_loader(map_loader(&[(
        "/app/main.js",
        "var util = require('node:util'); exports.line = util.format('%s=%d', 'x', 3);",
    )]));
    register_builtins(&registry);
    let (mut runtime, resolver) = enable(&registry);
    let main = resolver.require(&mut runtime, "/app/main").unwrap();
    assert_eq!(main.as_object().unwrap().get("line"), Value::from("x=3"));
    assert!(runtime.get_global("console").as_object().is_some());
}

#[test]
fn test_deeply_nested_module_is_a_syntax_error() {
    let source = format!("exports.x = {}1{}", "(".repeat(400), ")".repeat(400));
    let registry = Registry::with_loader(map_loader(&[("/deep.js", &source)]));
    let (mut runtime, resolver) = enable(&registry);
    match resolver.require(&mut runtime, "/deep") {
        Err(RequireError::Syntax(message)) => {
            assert!(message.starts_with("/deep.js:"), "{message}");
            assert!(message.ends_with("nesting too deep"), "{message}");
        }
        other => panic!("expected a syntax error, got {other:?}"),
    }
}

#[test]
fn test_long_require_chain() {
    const DEPTH: usize = 120;

    let worker = std::thread::Builder::new()
        .stack_size(spacey_script::RECOMMENDED_STACK_SIZE)
        .spawn(|| {
            let files: Vec<(String, String)> = (0..=DEPTH)
                .map(|i| {
                    let source = if i == DEPTH {
                        "module.exports = 0".to_string()
                    } else {
                        format!("module.exports = require('./m{}') + 1", i + 1)
                    };
                    (format!("/m{i}.js"), source)
                })
                .collect();
            let refs: Vec<(&str, &str)> = files
                .iter()
                .map(|(p, s)| (p.as_str(), s.as_str()))
                .collect();
            let registry = Registry::with_loader(map_loader(&refs));
            let (mut runtime, resolver) = enable(&registry);
            resolver.require(&mut runtime, "/m0").unwrap().to_number()
        })
        .unwrap();
    assert_eq!(worker.join().unwrap(), DEPTH as f64);
}
