// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Token definitions for the JavaScript lexer.

/// A span in the source code, representing a range of bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Start byte offset (inclusive)
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
}

impl Span {
    /// Creates a new span.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Returns the length of this span in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns true if this span is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The span in the source code
    pub span: Span,
    /// Whether a line terminator appeared between this token and the previous one
    pub newline_before: bool,
}

impl Token {
    /// Creates a new token.
    pub fn new(kind: TokenKind, span: Span, newline_before: bool) -> Self {
        Self {
            kind,
            span,
            newline_before,
        }
    }
}

/// The different kinds of tokens understood by the interpreter.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    /// Numeric literal (integer or floating point)
    Number(f64),
    /// String literal, escapes already decoded
    String(String),
    /// Boolean true
    True,
    /// Boolean false
    False,
    /// null
    Null,

    /// Identifier
    Identifier(String),

    // Keywords
    Break,
    Catch,
    Const,
    Continue,
    Else,
    Finally,
    For,
    Function,
    If,
    Let,
    New,
    Return,
    This,
    Throw,
    Try,
    Typeof,
    Var,
    Void,
    While,

    // Punctuation
    /// {
    LeftBrace,
    /// }
    RightBrace,
    /// (
    LeftParen,
    /// )
    RightParen,
    /// [
    LeftBracket,
    /// ]
    RightBracket,
    /// .
    Dot,
    /// ;
    Semicolon,
    /// ,
    Comma,
    /// :
    Colon,
    /// ?
    Question,
    /// <
    LessThan,
    /// >
    GreaterThan,
    /// <=
    LessThanEqual,
    /// >=
    GreaterThanEqual,
    /// ==
    EqualEqual,
    /// !=
    NotEqual,
    /// ===
    StrictEqual,
    /// !==
    StrictNotEqual,
    /// +
    Plus,
    /// -
    Minus,
    /// *
    Star,
    /// /
    Slash,
    /// %
    Percent,
    /// ++
    PlusPlus,
    /// --
    MinusMinus,
    /// !
    Bang,
    /// &&
    AmpersandAmpersand,
    /// ||
    PipePipe,
    /// ??
    QuestionQuestion,
    /// =
    Equal,
    /// +=
    PlusEqual,
    /// -=
    MinusEqual,

    /// End of input
    Eof,
    /// Malformed input, with a description of what went wrong
    Invalid(String),
}

impl TokenKind {
    /// Maps a reserved word to its keyword token.
    pub fn keyword(ident: &str) -> Option<TokenKind> {
        let kind = match ident {
            "break" => TokenKind::Break,
            "catch" => TokenKind::Catch,
            "const" => TokenKind::Const,
            "continue" => TokenKind::Continue,
            "else" => TokenKind::Else,
            "false" => TokenKind::False,
            "finally" => TokenKind::Finally,
            "for" => TokenKind::For,
            "function" => TokenKind::Function,
            "if" => TokenKind::If,
            "let" => TokenKind::Let,
            "new" => TokenKind::New,
            "null" => TokenKind::Null,
            "return" => TokenKind::Return,
            "this" => TokenKind::This,
            "throw" => TokenKind::Throw,
            "true" => TokenKind::True,
            "try" => TokenKind::Try,
            "typeof" => TokenKind::Typeof,
            "var" => TokenKind::Var,
            "void" => TokenKind::Void,
            "while" => TokenKind::While,
            _ => return None,
        };
        Some(kind)
    }

    /// The source text of a keyword token, if this is one.
    ///
    /// Keywords are valid property names (`module.exports.default`,
    /// `{ catch: 1 }`), so the parser needs their spelling back.
    pub fn keyword_text(&self) -> Option<&'static str> {
        let text = match self {
            TokenKind::Break => "break",
            TokenKind::Catch => "catch",
            TokenKind::Const => "const",
            TokenKind::Continue => "continue",
            TokenKind::Else => "else",
            TokenKind::False => "false",
            TokenKind::Finally => "finally",
            TokenKind::For => "for",
            TokenKind::Function => "function",
            TokenKind::If => "if",
            TokenKind::Let => "let",
            TokenKind::New => "new",
            TokenKind::Null => "null",
            TokenKind::Return => "return",
            TokenKind::This => "this",
            TokenKind::Throw => "throw",
            TokenKind::True => "true",
            TokenKind::Try => "try",
            TokenKind::Typeof => "typeof",
            TokenKind::Var => "var",
            TokenKind::Void => "void",
            TokenKind::While => "while",
            _ => return None,
        };
        Some(text)
    }
}
