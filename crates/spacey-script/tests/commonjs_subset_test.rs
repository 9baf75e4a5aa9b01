//! Integration tests for the language subset CommonJS module bodies rely on.

use spacey_script::{Error, Program, Runtime, Value};

fn run(source: &str) -> Value {
    let mut runtime = Runtime::new();
    runtime.run_string("test.js", source).unwrap()
}

#[test]
fn test_module_wrapper_call() {
    // The wrapper shape the module loader compiles every source into
    let program = Program::compile(
        "/app/m.js",
        "(function(exports, require, module) {exports.name = 'm'; module.loaded = this === exports\n})",
    )
    .unwrap();

    let mut runtime = Runtime::new();
    let wrapper = runtime.run_program(&program).unwrap();
    assert!(wrapper.is_callable());

    let exports = runtime.new_object();
    let module = runtime.new_object();
    module.set("exports", Value::Object(exports.clone()));
    let require = runtime.new_function("require", |_rt, _this, _args| Ok(Value::Undefined));

    runtime
        .call(
            &wrapper,
            Value::Object(exports.clone()),
            &[
                Value::Object(exports.clone()),
                Value::Object(require),
                Value::Object(module.clone()),
            ],
        )
        .unwrap();

    assert_eq!(exports.get("name"), Value::from("m"));
    assert_eq!(module.get("loaded"), Value::from(true));
}

#[test]
fn test_json_module_rewrite() {
    let text = r#"{"name": "app2", "list": [1, 2]}"#;
    let source = format!(
        "module.exports = JSON.parse({})",
        serde_json::to_string(text).unwrap()
    );
    let mut runtime = Runtime::new();
    let module = runtime.new_object();
    runtime.set_global("module", module.clone());
    runtime.run_string("app2.json", &source).unwrap();

    let exports = module.get("exports");
    let exports = exports.as_object().unwrap();
    assert_eq!(exports.get("name"), Value::from("app2"));
    assert_eq!(exports.keys(), vec!["name", "list"]);
}

#[test]
fn test_module_exports_replacement() {
    let source = "
        var module = { exports: {} };
        var exports = module.exports;
        module.exports = function greet(who) { return 'hello ' + who };
        typeof exports + ':' + module.exports('world')
    ";
    assert_eq!(run(source), Value::from("object:hello world"));
}

#[test]
fn test_syntax_error_location() {
    let err = Program::compile("/src/broken.js", "exports.a = 1;\nexports.b = ;").unwrap_err();
    match err {
        Error::SyntaxError(message) => {
            assert_eq!(message, "/src/broken.js:2:13: unexpected token ';'")
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_thrown_error_objects_keep_identity() {
    let mut runtime = Runtime::new();
    runtime.run_string("setup.js", "var boom = new Error('boom')").unwrap();
    let err = runtime.run_string("throw.js", "throw boom").unwrap_err();
    let Error::Exception(exception) = err else {
        panic!("expected exception");
    };
    assert_eq!(exception.value(), &runtime.get_global("boom"));
    assert_eq!(exception.to_string(), "Error: boom");
}

#[test]
fn test_exception_from_native_function_is_catchable() {
    let mut runtime = Runtime::new();
    let fail = runtime.new_function("fail", |rt, _this, _args| Err(rt.throw_error("native failure")));
    runtime.set_global("fail", fail);
    let value = runtime
        .run_string("t.js", "var m; try { fail() } catch (e) { m = e.message } m")
        .unwrap();
    assert_eq!(value, Value::from("native failure"));
}

#[test]
fn test_programs_compile_on_other_threads() {
    let handle = std::thread::spawn(|| Program::compile("worker.js", "exports.x = 1").unwrap());
    let program = handle.join().unwrap();

    let mut runtime = Runtime::new();
    let exports = runtime.new_object();
    runtime.set_global("exports", exports.clone());
    runtime.run_program(&program).unwrap();
    assert_eq!(exports.get("x"), Value::from(1));
}
