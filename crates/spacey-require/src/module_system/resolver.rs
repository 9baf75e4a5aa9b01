// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module resolution following Node.js semantics
//!
//! Implements the algorithm from
//! <https://nodejs.org/api/modules.html#all-together>:
//!
//! 1. File specifiers (`/`, `./`, `../`, `.`, `..`) are joined onto the
//!    requiring module's directory and loaded as a file, then as a
//!    directory.
//! 2. Anything else is a native module if one is registered under that
//!    name, otherwise it is searched for in the global folders and then in
//!    every `node_modules` directory from the requiring module up to the
//!    root.
//!
//! A module object is cached before its body runs, so a require cycle sees
//! the partially populated exports instead of looping.

use super::cache::{BareKey, ModuleCache};
use super::path;
use super::registry::Registry;
use crate::error::{RequireError, Result};
use serde::Deserialize;
use spacey_script::{Exception, Object, Runtime, Value};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::{debug, trace};

/// The part of `package.json` that matters for resolution.
#[derive(Debug, Default, Deserialize)]
struct PackageJson {
    #[serde(default)]
    main: Option<String>,
}

/// A module instance: the script object `{ exports, id, loaded }` a module
/// body receives as `module`.
///
/// Two `Module`s are equal when they are the same object.
#[derive(Clone)]
pub struct Module {
    id: Rc<str>,
    object: Object,
}

impl Module {
    fn new(runtime: &Runtime, id: &str) -> Self {
        let object = runtime.new_object();
        object.set("exports", Value::Object(runtime.new_object()));
        object.set("id", Value::from(id));
        object.set("loaded", Value::Boolean(false));
        Self {
            id: Rc::from(id),
            object,
        }
    }

    /// The path the module was loaded from, or the native module's name.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The `module` object itself.
    pub fn object(&self) -> &Object {
        &self.object
    }

    /// Current value of `module.exports`.
    pub fn exports(&self) -> Value {
        self.object.get("exports")
    }

    /// Whether the module body has finished running.
    pub fn is_loaded(&self) -> bool {
        self.object.get("loaded").to_boolean()
    }

    fn mark_loaded(&self) {
        self.object.set("loaded", Value::Boolean(true));
    }
}

impl PartialEq for Module {
    fn eq(&self, other: &Self) -> bool {
        self.object.ptr_eq(&other.object)
    }
}

impl Eq for Module {}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module")
            .field("id", &self.id)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

/// Resolves and runs modules for a single runtime.
///
/// Created by [`Registry::enable`]. Clones share the same caches. A
/// resolver is tied to the runtime it was enabled on and must not be used
/// with another one.
///
/// The runtime's global `require` keeps the resolver alive. The `require`
/// passed to each module only holds a weak reference, so module exports do
/// not keep the caches alive once the runtime and every host handle are
/// dropped.
#[derive(Clone)]
pub struct ModuleResolver {
    inner: Rc<ResolverInner>,
}

struct ResolverInner {
    registry: Registry,
    /// Modules found through file specifiers, and every loaded file
    modules: ModuleCache<String>,
    /// Native modules and package search results
    bare: ModuleCache<BareKey>,
    /// Directories of the modules and scripts currently executing
    stack: RefCell<Vec<String>>,
}

/// Pops the execution stack when dropped.
struct ExecutionFrame<'a> {
    stack: &'a RefCell<Vec<String>>,
}

impl Drop for ExecutionFrame<'_> {
    fn drop(&mut self) {
        self.stack.borrow_mut().pop();
    }
}

impl ModuleResolver {
    pub(crate) fn new(registry: Registry) -> Self {
        Self {
            inner: Rc::new(ResolverInner {
                registry,
                modules: ModuleCache::new(),
                bare: ModuleCache::new(),
                stack: RefCell::new(Vec::new()),
            }),
        }
    }

    fn from_weak(weak: &Weak<ResolverInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    /// The registry this resolver loads from.
    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Installs the global `require`. It resolves against the directory of
    /// whatever module or script is executing, or `.` from host code.
    pub(crate) fn install(&self, runtime: &mut Runtime) {
        let resolver = self.clone();
        let require = runtime.new_function("require", move |rt, _this, args| {
            let base = resolver.current_dir();
            resolver.script_require(rt, &base, args)
        });
        runtime.set_global("require", require);
    }

    /// Requires `specifier` from host code and returns its exports.
    pub fn require(&self, runtime: &mut Runtime, specifier: &str) -> Result<Value> {
        Ok(self.resolve(runtime, specifier)?.exports())
    }

    /// Like [`require`](Self::require) but returns the module instance.
    pub fn resolve(&self, runtime: &mut Runtime, specifier: &str) -> Result<Module> {
        let base = self.current_dir();
        self.resolve_from(runtime, specifier, &base)
    }

    /// Runs a top-level script as if it were located at `name`, so relative
    /// requires made through the global `require` resolve from its
    /// directory.
    pub fn run_script(&self, runtime: &mut Runtime, name: &str, source: &str) -> Result<Value> {
        let _frame = self.enter(path::dir(name));
        Ok(runtime.run_string(name, source)?)
    }

    fn current_dir(&self) -> String {
        self.inner
            .stack
            .borrow()
            .last()
            .cloned()
            .unwrap_or_else(|| ".".to_string())
    }

    fn enter(&self, dir: String) -> ExecutionFrame<'_> {
        self.inner.stack.borrow_mut().push(dir);
        ExecutionFrame {
            stack: &self.inner.stack,
        }
    }

    /// A `require` function bound to one module's directory.
    fn make_require(&self, runtime: &Runtime, dir: String) -> Object {
        let resolver = Rc::downgrade(&self.inner);
        runtime.new_function("require", move |rt, _this, args| {
            let Some(resolver) = Self::from_weak(&resolver) else {
                return Err(rt.throw_error("module system is no longer available"));
            };
            resolver.script_require(rt, &dir, args)
        })
    }

    /// The body of every script-visible `require`. Script exceptions are
    /// rethrown as they were thrown; resolver errors become `Error`s.
    fn script_require(
        &self,
        runtime: &mut Runtime,
        base: &str,
        args: &[Value],
    ) -> std::result::Result<Value, Exception> {
        let specifier = args.first().cloned().unwrap_or_default().to_display_string();
        match self.resolve_from(runtime, &specifier, base) {
            Ok(module) => Ok(module.exports()),
            Err(RequireError::Exception(exception)) => Err(exception),
            Err(err) => Err(runtime.throw_error(err.to_string())),
        }
    }

    fn resolve_from(&self, runtime: &mut Runtime, specifier: &str, base: &str) -> Result<Module> {
        if specifier.is_empty() {
            return Err(RequireError::InvalidModuleName);
        }

        let cleaned = path::clean(specifier);
        let start = if path::is_abs(specifier) { "/" } else { base };
        let p = path::join(start, &cleaned);
        trace!(specifier, start, candidate = %p, "resolving module");

        if path::is_file_specifier(specifier) {
            if let Some(module) = self.inner.modules.get(&p) {
                trace!(path = %p, "module cache hit");
                return Ok(module);
            }
            if let Some(module) = self.load_as_file_or_directory(runtime, &p)? {
                self.inner.modules.set(p, module.clone());
                return Ok(module);
            }
        } else {
            if let Some(module) = self.load_native(runtime, &cleaned)? {
                return Ok(module);
            }
            let key = BareKey::Search(p);
            if let Some(module) = self.inner.bare.get(&key) {
                trace!(specifier, "package cache hit");
                return Ok(module);
            }
            if let Some(module) = self.load_node_modules(runtime, &cleaned, start)? {
                self.inner.bare.set(key, module.clone());
                return Ok(module);
            }
        }

        debug!(specifier, base, "module not found");
        Err(RequireError::InvalidModule)
    }

    fn load_native(&self, runtime: &mut Runtime, name: &str) -> Result<Option<Module>> {
        let key = BareKey::Native(name.to_string());
        if let Some(module) = self.inner.bare.get(&key) {
            return Ok(Some(module));
        }
        let Some(native) = self.inner.registry.native(name) else {
            return Ok(None);
        };

        debug!(module = name, "exporting native module");
        let module = Module::new(runtime, name);
        native.export(runtime, module.object())?;
        module.mark_loaded();
        self.inner.bare.set(key, module.clone());
        Ok(Some(module))
    }

    fn load_as_file_or_directory(&self, runtime: &mut Runtime, p: &str) -> Result<Option<Module>> {
        if let Some(module) = self.load_as_file(runtime, p)? {
            return Ok(Some(module));
        }
        self.load_as_directory(runtime, p)
    }

    fn load_as_file(&self, runtime: &mut Runtime, p: &str) -> Result<Option<Module>> {
        for candidate in [p.to_string(), format!("{}.js", p), format!("{}.json", p)] {
            if let Some(module) = self.load_module(runtime, &candidate)? {
                return Ok(Some(module));
            }
        }
        Ok(None)
    }

    fn load_index(&self, runtime: &mut Runtime, p: &str) -> Result<Option<Module>> {
        for index in ["index.js", "index.json"] {
            if let Some(module) = self.load_module(runtime, &path::join(p, index))? {
                return Ok(Some(module));
            }
        }
        Ok(None)
    }

    fn load_as_directory(&self, runtime: &mut Runtime, p: &str) -> Result<Option<Module>> {
        let package_path = path::join(p, "package.json");
        let main = match self.inner.registry.source(&package_path) {
            Ok(bytes) => match serde_json::from_slice::<PackageJson>(&bytes) {
                Ok(package) => package.main.filter(|main| !main.is_empty()),
                Err(err) => {
                    debug!(path = %package_path, error = %err, "ignoring malformed package.json");
                    None
                }
            },
            Err(_) => None,
        };

        let Some(main) = main else {
            return self.load_index(runtime, p);
        };
        let m = path::join(p, &main);
        trace!(package = %package_path, main = %m, "following package main");
        if let Some(module) = self.load_as_file(runtime, &m)? {
            return Ok(Some(module));
        }
        self.load_index(runtime, &m)
    }

    fn load_node_modules(&self, runtime: &mut Runtime, modpath: &str, start: &str) -> Result<Option<Module>> {
        for folder in self.inner.registry.global_folders() {
            if let Some(module) = self.load_as_file_or_directory(runtime, &path::join(folder, modpath))? {
                return Ok(Some(module));
            }
        }

        let mut start = start.to_string();
        loop {
            let dir = if path::base(&start) != "node_modules" {
                path::join(&start, "node_modules")
            } else {
                start.clone()
            };
            if let Some(module) = self.load_as_file_or_directory(runtime, &path::join(&dir, modpath))? {
                return Ok(Some(module));
            }
            if start == ".." {
                break;
            }
            let parent = path::dir(&start);
            if parent == start {
                break;
            }
            start = parent;
        }
        Ok(None)
    }

    /// Loads and runs the file at `p` unless it is already cached. A
    /// missing file is a miss (`Ok(None)`); anything else is an error.
    /// Either way a failed module leaves no cache entry behind.
    fn load_module(&self, runtime: &mut Runtime, p: &str) -> Result<Option<Module>> {
        if let Some(module) = self.inner.modules.get(&p.to_string()) {
            return Ok(Some(module));
        }

        let module = Module::new(runtime, p);
        self.inner.modules.set(p.to_string(), module.clone());
        match self.execute(runtime, &module) {
            Ok(()) => Ok(Some(module)),
            Err(err) => {
                self.inner.modules.delete(&p.to_string());
                if err.is_not_exist() { Ok(None) } else { Err(err) }
            }
        }
    }

    fn execute(&self, runtime: &mut Runtime, module: &Module) -> Result<()> {
        let compiled = self.inner.registry.compiled_program(module.id())?;
        let wrapper = runtime.run_program(compiled.program())?;
        if !wrapper.is_callable() {
            return Err(RequireError::InvalidModule);
        }

        debug!(path = module.id(), "running module");
        let dir = path::dir(module.id());
        let require = self.make_require(runtime, dir.clone());
        let exports = module.exports();
        let _frame = self.enter(dir);
        runtime.call(
            &wrapper,
            exports.clone(),
            &[exports, Value::Object(require), Value::Object(module.object().clone())],
        )?;
        module.mark_loaded();
        Ok(())
    }
}

impl std::fmt::Debug for ModuleResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleResolver")
            .field("registry", &self.inner.registry)
            .field("modules", &self.inner.modules.len())
            .field("stack", &self.inner.stack.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn registry(files: &[(&str, &str)]) -> Registry {
        let files: Arc<HashMap<String, String>> = Arc::new(
            files
                .iter()
                .map(|(p, s)| (p.to_string(), s.to_string()))
                .collect(),
        );
        Registry::with_loader(move |p| match files.get(p) {
            Some(source) => Ok(source.clone().into_bytes()),
            None => Err(RequireError::ModuleNotExist),
        })
    }

    fn enabled(files: &[(&str, &str)]) -> (Runtime, ModuleResolver) {
        let mut runtime = Runtime::new();
        let resolver = registry(files).enable(&mut runtime).unwrap();
        (runtime, resolver)
    }

    #[test]
    fn test_module_object_shape() {
        let (mut rt, resolver) = enabled(&[("/m.js", "exports.seen = module.loaded + ':' + module.id")]);
        let module = resolver.resolve(&mut rt, "/m").unwrap();
        assert_eq!(module.id(), "/m.js");
        assert!(module.is_loaded());
        let exports = module.exports();
        assert_eq!(exports.as_object().unwrap().get("seen"), Value::from("false:/m.js"));
    }

    #[test]
    fn test_empty_specifier() {
        let (mut rt, resolver) = enabled(&[]);
        assert!(matches!(
            resolver.require(&mut rt, "").unwrap_err(),
            RequireError::InvalidModuleName
        ));
    }

    #[test]
    fn test_all_misses_are_invalid_module() {
        let (mut rt, resolver) = enabled(&[]);
        assert!(matches!(
            resolver.require(&mut rt, "./nothing").unwrap_err(),
            RequireError::InvalidModule
        ));
        assert!(matches!(
            resolver.require(&mut rt, "nothing").unwrap_err(),
            RequireError::InvalidModule
        ));
    }

    #[test]
    fn test_this_is_exports() {
        let (mut rt, resolver) = enabled(&[("/m.js", "this.viaThis = this === exports")]);
        let exports = resolver.require(&mut rt, "/m.js").unwrap();
        assert_eq!(exports.as_object().unwrap().get("viaThis"), Value::from(true));
    }

    #[test]
    fn test_failed_module_is_not_cached() {
        let (mut rt, resolver) = enabled(&[("/m.js", "exports.n = (globalThis.runs = (globalThis.runs || 0) + 1); throw 'fail'")]);
        assert!(resolver.require(&mut rt, "/m.js").is_err());
        assert!(resolver.require(&mut rt, "/m.js").is_err());
        assert_eq!(rt.get_global("runs"), Value::from(2));
    }

    #[test]
    fn test_execution_stack_unwinds_on_error() {
        let (mut rt, resolver) = enabled(&[("/lib/bad.js", "throw new Error('bad')")]);
        assert!(resolver.run_script(&mut rt, "/lib/main.js", "require('./bad')").is_err());
        assert_eq!(resolver.current_dir(), ".");
    }

    #[test]
    fn test_script_require_error_message() {
        let (mut rt, resolver) = enabled(&[]);
        let value = resolver
            .run_script(
                &mut rt,
                "/main.js",
                "var m; try { require('./missing') } catch (e) { m = e.message } m",
            )
            .unwrap();
        assert_eq!(value, Value::from("invalid module"));
    }

    #[test]
    fn test_resolver_released_with_runtime() {
        let (mut rt, resolver) = enabled(&[(
            "/m.js",
            "exports.load = function (name) { return require(name) }",
        )]);
        resolver.require(&mut rt, "/m").unwrap();
        let weak = Rc::downgrade(&resolver.inner);
        drop(resolver);
        assert!(weak.upgrade().is_some());
        drop(rt);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_module_require_after_resolver_is_gone() {
        let (mut rt, resolver) = enabled(&[(
            "/m.js",
            "exports.load = function (name) { return require(name) }",
        )]);
        let exports = resolver.require(&mut rt, "/m").unwrap();
        rt.global().delete("require");
        drop(resolver);
        rt.set_global("m", exports);
        let value = rt
            .run_string("t.js", "var r; try { m.load('/m') } catch (e) { r = e.message } r")
            .unwrap();
        assert_eq!(value, Value::from("module system is no longer available"));
    }

    #[test]
    fn test_non_function_wrapper_is_rejected() {
        // Closes the wrapper early so the program evaluates to an object
        let (mut rt, resolver) = enabled(&[("/odd.js", "}); ({")]);
        assert!(matches!(
            resolver.require(&mut rt, "/odd.js").unwrap_err(),
            RequireError::InvalidModule
        ));
    }
}
