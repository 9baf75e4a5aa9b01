// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Execution of parsed programs.
//!
//! The [`Runtime`] walks the AST directly; there is no bytecode stage.

mod interpreter;

pub use interpreter::{MAX_CALL_DEPTH, MAX_EXPRESSION_DEPTH, Runtime};
