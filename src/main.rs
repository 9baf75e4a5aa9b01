// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! spacey-cjs - run CommonJS modules on the Spacey script interpreter
//!
//! This is the main entry point for the spacey-cjs CLI/REPL.
//!
//! ## Features
//!
//! - Runs a file as the entry module, with Node.js `require()` resolution
//! - `-e` evaluates inline code from the current directory
//! - Interactive REPL with history when no file is given

mod cli;
mod repl;

use anyhow::Context;
use clap::Parser;
use cli::Cli;
use owo_colors::OwoColorize;
use spacey_require::module_system::path;
use spacey_require::{ModuleResolver, Process, Registry, RequireError, register_builtins};
use spacey_script::Runtime;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // The interpreter recurses on the native stack
    let worker = std::thread::Builder::new()
        .name("spacey-cjs".into())
        .stack_size(spacey_script::RECOMMENDED_STACK_SIZE)
        .spawn(move || run(&cli));
    let result = match worker {
        Ok(handle) => handle
            .join()
            .unwrap_or_else(|_| Err(anyhow::anyhow!("interpreter thread panicked"))),
        Err(err) => Err(anyhow::Error::new(err).context("failed to start the interpreter thread")),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{}: {:#}", "Error".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr; `RUST_LOG` overrides the default filter.
fn init_logging(verbose: bool) {
    let default = if verbose {
        "spacey_require=debug"
    } else {
        "spacey_require=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    let cwd = std::env::current_dir().context("cannot determine the working directory")?;
    let registry = build_registry(cli);

    let script = cli
        .file
        .as_ref()
        .map(|file| file.display().to_string())
        .unwrap_or_else(|| "[eval]".to_string());
    let argv = std::iter::once("spacey-cjs".to_string())
        .chain(std::iter::once(script))
        .chain(cli.args.iter().cloned());
    registry.register_native_module(spacey_require::globals::process::MODULE_NAME, Process::with_argv(argv));

    let mut runtime = Runtime::new();
    let resolver = registry
        .enable(&mut runtime)
        .map_err(|err| anyhow::anyhow!("failed to enable built-in modules: {}", err))?;

    if let Some(code) = &cli.eval {
        return Ok(run_eval(&mut runtime, &resolver, &cwd, code));
    }
    if let Some(file) = &cli.file {
        return Ok(run_file(&mut runtime, &resolver, &cwd.join(file)));
    }

    let mut repl = repl::Repl::new(runtime, resolver, &cwd).context("failed to initialize REPL")?;
    repl.run().context("REPL error")?;
    Ok(ExitCode::SUCCESS)
}

fn build_registry(cli: &Cli) -> Registry {
    let mut builder = Registry::builder().global_folders(cli.global_folders.iter().map(|dir| path::from_host(dir)));
    if cli.node_path {
        builder = builder.node_path_from_env();
    }
    let registry = builder.build();
    register_builtins(&registry);
    registry
}

/// Requires the entry module by its absolute path.
fn run_file(runtime: &mut Runtime, resolver: &ModuleResolver, file: &Path) -> ExitCode {
    let entry = path::clean(&path::from_host(file));
    match resolver.require(runtime, &entry) {
        Ok(_) => ExitCode::SUCCESS,
        Err(RequireError::InvalidModule) => {
            eprintln!(
                "{}: cannot find module '{}'",
                "Error".red().bold(),
                file.display().cyan()
            );
            ExitCode::FAILURE
        }
        Err(err) => {
            print_error(&err);
            ExitCode::FAILURE
        }
    }
}

fn run_eval(runtime: &mut Runtime, resolver: &ModuleResolver, cwd: &Path, code: &str) -> ExitCode {
    let name = path::join(&path::from_host(cwd), "[eval]");
    match resolver.run_script(runtime, &name, code) {
        Ok(value) => {
            if !value.is_undefined() {
                println!("{}", value);
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            print_error(&err);
            ExitCode::FAILURE
        }
    }
}

/// Print a formatted error message
pub(crate) fn print_error(error: &RequireError) {
    let error_str = match error {
        RequireError::Exception(exception) => format!("Uncaught {}", exception),
        other => other.to_string(),
    };

    // Split error type from message
    if let Some(colon_pos) = error_str.find(':') {
        let (error_type, message) = error_str.split_at(colon_pos);
        eprintln!("{}{}", error_type.red().bold(), message);
    } else {
        eprintln!("{}", error_str.red());
    }
}
