// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Parser for JavaScript source code.
//!
//! Transforms a stream of tokens into an Abstract Syntax Tree (AST).
//!
//! ## Usage
//!
//! ```rust
//! use spacey_script::parser::Parser;
//!
//! let mut parser = Parser::new("var x = 1 + 2;");
//! let file = parser.parse_source_file().expect("Should parse");
//! assert_eq!(file.body.len(), 1);
//! ```

mod parser;

pub use parser::{MAX_NESTING_DEPTH, Parser};
