// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! CLI argument parsing for spacey-cjs.

use clap::Parser;
use std::path::PathBuf;

/// Run CommonJS modules on the Spacey script interpreter
#[derive(Parser, Debug)]
#[command(name = "spacey-cjs")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Module to run; starts the REPL when omitted
    #[arg(conflicts_with = "eval")]
    pub file: Option<PathBuf>,

    /// Evaluate code as if it were a script in the current directory
    #[arg(short, long, value_name = "CODE")]
    pub eval: Option<String>,

    /// Extra folder searched for packages before node_modules (repeatable)
    #[arg(short = 'g', long = "global-folder", value_name = "DIR")]
    pub global_folders: Vec<PathBuf>,

    /// Also search the folders listed in $NODE_PATH
    #[arg(long)]
    pub node_path: bool,

    /// Enable debug logging of module resolution
    #[arg(long)]
    pub verbose: bool,

    /// Arguments made available to the script as process.argv
    #[arg(last = true, value_name = "ARGS")]
    pub args: Vec<String>,
}
