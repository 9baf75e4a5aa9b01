// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Lexical analysis (tokenization) for JavaScript source code.
//!
//! The lexer transforms module source text into a stream of tokens that the
//! parser consumes. Every token records whether a line terminator preceded
//! it, which is what the parser uses for automatic semicolon insertion.
//!
//! ## Usage
//!
//! ```rust
//! use spacey_script::lexer::{Scanner, TokenKind};
//!
//! let mut scanner = Scanner::new("exports.name = 'app';");
//!
//! loop {
//!     let token = scanner.next_token();
//!     if matches!(token.kind, TokenKind::Eof) {
//!         break;
//!     }
//!     println!("{:?}", token.kind);
//! }
//! ```

mod scanner;
mod token;

pub use scanner::Scanner;
pub use token::{Span, Token, TokenKind};
