// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Node.js `process` global object

use crate::error::{RequireError, Result};
use crate::module_system::NativeModule;
use spacey_script::{Object, Runtime, Value};
use std::ffi::OsString;

/// Name the module is registered under
pub const MODULE_NAME: &str = "node:process";

/// The `node:process` native module.
///
/// Enabling installs a global `process` with `env`, `argv` and `platform`.
/// Requiring it yields `process.env`.
#[derive(Debug, Clone, Default)]
pub struct Process {
    argv: Vec<String>,
}

impl Process {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `process.argv`. Defaults to the host's arguments.
    pub fn with_argv<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
        }
    }
}

/// Node's name for the host platform
fn platform() -> &'static str {
    match std::env::consts::OS {
        "windows" => "win32",
        "macos" => "darwin",
        other => other,
    }
}

/// Host arguments as strings. Invalid UTF-8 is replaced, not rejected.
fn host_args<I: IntoIterator<Item = OsString>>(args: I) -> Vec<String> {
    args.into_iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect()
}

impl NativeModule for Process {
    fn enable(&self, runtime: &mut Runtime) -> Result<()> {
        let env = runtime.new_object();
        for (key, value) in std::env::vars_os() {
            env.set(&key.to_string_lossy(), Value::String(value.to_string_lossy().into_owned()));
        }

        let argv: Vec<Value> = if self.argv.is_empty() {
            host_args(std::env::args_os()).into_iter().map(Value::String).collect()
        } else {
            self.argv.iter().cloned().map(Value::String).collect()
        };

        let process = runtime.new_object();
        process.set("env", Value::Object(env));
        process.set("argv", Value::Object(runtime.new_array(argv)));
        process.set("platform", Value::from(platform()));
        runtime.set_global("process", process);
        Ok(())
    }

    fn export(&self, runtime: &mut Runtime, module: &Object) -> Result<()> {
        let process = runtime.get_global("process");
        let process = process
            .as_object()
            .ok_or_else(|| RequireError::Native("process global is missing".to_string()))?;
        module.set("exports", process.get("env"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module_system::Registry;

    fn enabled(process: Process) -> Runtime {
        let registry = Registry::new();
        registry.register_native_module(MODULE_NAME, process);
        let mut runtime = Runtime::new();
        registry.enable(&mut runtime).unwrap();
        runtime
    }

    #[test]
    fn test_process_global() {
        let mut runtime = enabled(Process::with_argv(["spacey-cjs", "main.js"]));
        let value = runtime
            .run_string("t.js", "typeof process.env + ' ' + process.argv.length + ' ' + process.argv[1]")
            .unwrap();
        assert_eq!(value, Value::from("object 2 main.js"));
        assert_eq!(
            runtime.run_string("t.js", "process.platform").unwrap(),
            Value::from(platform())
        );
    }

    #[test]
    fn test_env_snapshot() {
        let Some((key, value)) = std::env::vars().next() else {
            return;
        };
        let mut runtime = enabled(Process::new());
        let seen = runtime
            .run_string("t.js", &format!("process.env[{}]", serde_json::to_string(&key).unwrap()))
            .unwrap();
        assert_eq!(seen, Value::String(value));
    }

    #[test]
    fn test_require_yields_env() {
        let mut runtime = enabled(Process::new());
        let value = runtime
            .run_string("t.js", "require('node:process') === process.env")
            .unwrap();
        assert_eq!(value, Value::from(true));
    }

    #[test]
    fn test_default_argv_comes_from_host() {
        let mut runtime = enabled(Process::new());
        let value = runtime
            .run_string("t.js", "process.argv.length > 0 && typeof process.argv[0]")
            .unwrap();
        assert_eq!(value, Value::from("string"));
    }

    #[cfg(unix)]
    #[test]
    fn test_host_args_replace_invalid_utf8() {
        use std::os::unix::ffi::OsStringExt;

        let args = host_args([
            OsString::from("spacey-cjs"),
            OsString::from_vec(vec![b'a', 0xff, b'b']),
        ]);
        assert_eq!(args, ["spacey-cjs", "a\u{FFFD}b"]);
    }

    #[test]
    fn test_platform_names() {
        assert!(!platform().is_empty());
        assert_ne!(platform(), "macos");
        assert_ne!(platform(), "windows");
    }
}
