// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The scanner that produces tokens from source text.

use super::{Span, Token, TokenKind};
use unicode_xid::UnicodeXID;

/// A scanner that tokenizes JavaScript source code.
pub struct Scanner<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    current_pos: usize,
}

impl<'a> Scanner<'a> {
    /// Creates a new scanner for the given source code.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            current_pos: 0,
        }
    }

    /// Returns the source text this scanner reads from.
    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Returns the next token from the source.
    pub fn next_token(&mut self) -> Token {
        let newline_before = self.skip_whitespace_and_comments();

        let start = self.current_pos;

        let Some((_pos, ch)) = self.advance() else {
            return Token::new(TokenKind::Eof, Span::new(start, start), newline_before);
        };

        let kind = match ch {
            // Single-character tokens
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,

            // Multi-character tokens
            '.' => self.scan_dot(start),
            '+' => self.scan_plus(),
            '-' => self.scan_minus(),
            '<' => self.scan_relational(TokenKind::LessThan, TokenKind::LessThanEqual),
            '>' => self.scan_relational(TokenKind::GreaterThan, TokenKind::GreaterThanEqual),
            '=' => self.scan_equal(),
            '!' => self.scan_bang(),
            '&' => self.scan_pair('&', TokenKind::AmpersandAmpersand),
            '|' => self.scan_pair('|', TokenKind::PipePipe),
            '?' => self.scan_question(),

            // String literals
            '"' | '\'' => self.scan_string(ch),

            // Numbers
            '0'..='9' => self.scan_number(start),

            // Identifiers and keywords
            _ if is_id_start(ch) => self.scan_identifier(start),

            _ => TokenKind::Invalid(format!("unexpected character '{}'", ch)),
        };

        Token::new(kind, Span::new(start, self.current_pos), newline_before)
    }

    fn advance(&mut self) -> Option<(usize, char)> {
        let result = self.chars.next();
        if let Some((pos, ch)) = result {
            self.current_pos = pos + ch.len_utf8();
        }
        result
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, ch)| *ch)
    }

    fn peek_next(&self) -> Option<char> {
        let mut iter = self.chars.clone();
        iter.next();
        iter.next().map(|(_, ch)| ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Skips trivia and reports whether a line terminator was crossed.
    fn skip_whitespace_and_comments(&mut self) -> bool {
        let mut newline = false;
        loop {
            match self.peek() {
                Some('\n' | '\r' | '\u{2028}' | '\u{2029}') => {
                    newline = true;
                    self.advance();
                }
                Some(ch) if ch.is_whitespace() || ch == '\u{feff}' => {
                    self.advance();
                }
                Some('/') => match self.peek_next() {
                    Some('/') => {
                        self.advance();
                        self.advance();
                        while let Some(ch) = self.peek() {
                            if ch == '\n' || ch == '\r' {
                                break;
                            }
                            self.advance();
                        }
                    }
                    Some('*') => {
                        self.advance();
                        self.advance();
                        let mut prev = ' ';
                        while let Some((_, ch)) = self.advance() {
                            if ch == '\n' || ch == '\r' {
                                newline = true;
                            }
                            if prev == '*' && ch == '/' {
                                break;
                            }
                            prev = ch;
                        }
                    }
                    _ => break,
                },
                _ => break,
            }
        }
        newline
    }

    fn scan_dot(&mut self, start: usize) -> TokenKind {
        if matches!(self.peek(), Some('0'..='9')) {
            self.scan_number(start)
        } else {
            TokenKind::Dot
        }
    }

    fn scan_plus(&mut self) -> TokenKind {
        if self.eat('+') {
            TokenKind::PlusPlus
        } else if self.eat('=') {
            TokenKind::PlusEqual
        } else {
            TokenKind::Plus
        }
    }

    fn scan_minus(&mut self) -> TokenKind {
        if self.eat('-') {
            TokenKind::MinusMinus
        } else if self.eat('=') {
            TokenKind::MinusEqual
        } else {
            TokenKind::Minus
        }
    }

    fn scan_relational(&mut self, plain: TokenKind, with_equal: TokenKind) -> TokenKind {
        if self.eat('=') { with_equal } else { plain }
    }

    fn scan_equal(&mut self) -> TokenKind {
        if self.eat('=') {
            if self.eat('=') {
                TokenKind::StrictEqual
            } else {
                TokenKind::EqualEqual
            }
        } else {
            TokenKind::Equal
        }
    }

    fn scan_bang(&mut self) -> TokenKind {
        if self.eat('=') {
            if self.eat('=') {
                TokenKind::StrictNotEqual
            } else {
                TokenKind::NotEqual
            }
        } else {
            TokenKind::Bang
        }
    }

    fn scan_pair(&mut self, second: char, kind: TokenKind) -> TokenKind {
        if self.eat(second) {
            kind
        } else {
            TokenKind::Invalid(format!("bitwise operator '{}' is not supported", second))
        }
    }

    fn scan_question(&mut self) -> TokenKind {
        if self.eat('?') {
            TokenKind::QuestionQuestion
        } else {
            TokenKind::Question
        }
    }

    fn scan_string(&mut self, quote: char) -> TokenKind {
        let mut value = String::new();
        loop {
            let Some((_, ch)) = self.advance() else {
                return TokenKind::Invalid("unterminated string literal".into());
            };
            match ch {
                _ if ch == quote => return TokenKind::String(value),
                '\n' | '\r' => {
                    return TokenKind::Invalid("unterminated string literal".into());
                }
                '\\' => match self.scan_escape() {
                    Ok(Some(decoded)) => value.push(decoded),
                    Ok(None) => {}
                    Err(message) => return TokenKind::Invalid(message),
                },
                _ => value.push(ch),
            }
        }
    }

    /// Decodes the escape sequence after a backslash. `Ok(None)` is a line
    /// continuation, which contributes nothing to the string value.
    fn scan_escape(&mut self) -> Result<Option<char>, String> {
        let Some((_, ch)) = self.advance() else {
            return Err("unterminated string literal".into());
        };
        let decoded = match ch {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'v' => '\u{b}',
            '0' if !matches!(self.peek(), Some('0'..='9')) => '\0',
            'x' => self.scan_hex_digits(2)?,
            'u' => {
                if self.eat('{') {
                    let mut code = 0u32;
                    let mut digits = 0;
                    loop {
                        match self.advance() {
                            Some((_, '}')) if digits > 0 => break,
                            Some((_, c)) if c.is_ascii_hexdigit() && digits < 6 => {
                                code = code * 16 + c.to_digit(16).unwrap_or(0);
                                digits += 1;
                            }
                            _ => return Err("invalid unicode escape".into()),
                        }
                    }
                    char::from_u32(code).ok_or_else(|| "invalid unicode code point".to_string())?
                } else {
                    self.scan_utf16_escape()?
                }
            }
            '\r' => {
                self.eat('\n');
                return Ok(None);
            }
            '\n' | '\u{2028}' | '\u{2029}' => return Ok(None),
            other => other,
        };
        Ok(Some(decoded))
    }

    fn scan_hex_digits(&mut self, count: usize) -> Result<char, String> {
        let code = self.scan_hex_value(count)?;
        char::from_u32(code).ok_or_else(|| "invalid escape sequence".to_string())
    }

    fn scan_hex_value(&mut self, count: usize) -> Result<u32, String> {
        let mut code = 0u32;
        for _ in 0..count {
            match self.advance() {
                Some((_, c)) if c.is_ascii_hexdigit() => {
                    code = code * 16 + c.to_digit(16).unwrap_or(0);
                }
                _ => return Err("invalid hexadecimal escape sequence".into()),
            }
        }
        Ok(code)
    }

    /// `\uXXXX`, pairing surrogates written as two consecutive escapes.
    fn scan_utf16_escape(&mut self) -> Result<char, String> {
        let high = self.scan_hex_value(4)?;
        if (0xD800..0xDC00).contains(&high) && self.peek() == Some('\\') && self.peek_next() == Some('u') {
            self.advance();
            self.advance();
            let low = self.scan_hex_value(4)?;
            if (0xDC00..0xE000).contains(&low) {
                let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                return char::from_u32(code).ok_or_else(|| "invalid surrogate pair".to_string());
            }
            return Ok(char::REPLACEMENT_CHARACTER);
        }
        Ok(char::from_u32(high).unwrap_or(char::REPLACEMENT_CHARACTER))
    }

    fn scan_number(&mut self, start: usize) -> TokenKind {
        let first = &self.source[start..self.current_pos];
        if first == "0" && matches!(self.peek(), Some('x' | 'X')) {
            self.advance();
            let digits_start = self.current_pos;
            while matches!(self.peek(), Some(c) if c.is_ascii_hexdigit()) {
                self.advance();
            }
            let digits = &self.source[digits_start..self.current_pos];
            return match u64::from_str_radix(digits, 16) {
                Ok(n) => TokenKind::Number(n as f64),
                Err(_) => TokenKind::Invalid("invalid hexadecimal literal".into()),
            };
        }

        while matches!(self.peek(), Some('0'..='9')) {
            self.advance();
        }
        if !first.starts_with('.') && self.peek() == Some('.') {
            self.advance();
            while matches!(self.peek(), Some('0'..='9')) {
                self.advance();
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let exponent_ok = match self.peek_next() {
                Some('0'..='9') => true,
                Some('+' | '-') => {
                    let mut iter = self.chars.clone();
                    iter.next();
                    iter.next();
                    matches!(iter.next(), Some((_, '0'..='9')))
                }
                _ => false,
            };
            if exponent_ok {
                self.advance();
                if matches!(self.peek(), Some('+' | '-')) {
                    self.advance();
                }
                while matches!(self.peek(), Some('0'..='9')) {
                    self.advance();
                }
            }
        }

        let text = &self.source[start..self.current_pos];
        match text.parse::<f64>() {
            Ok(n) => TokenKind::Number(n),
            Err(_) => TokenKind::Invalid(format!("invalid number literal '{}'", text)),
        }
    }

    fn scan_identifier(&mut self, start: usize) -> TokenKind {
        while matches!(self.peek(), Some(c) if is_id_continue(c)) {
            self.advance();
        }
        let ident = &self.source[start..self.current_pos];
        TokenKind::keyword(ident).unwrap_or_else(|| TokenKind::Identifier(ident.to_string()))
    }
}

fn is_id_start(ch: char) -> bool {
    ch == '$' || ch == '_' || ch.is_xid_start()
}

fn is_id_continue(ch: char) -> bool {
    ch == '$' || ch == '\u{200c}' || ch == '\u{200d}' || ch.is_xid_continue()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut scanner = Scanner::new(source);
        let mut out = Vec::new();
        loop {
            let token = scanner.next_token();
            if token.kind == TokenKind::Eof {
                break;
            }
            out.push(token.kind);
        }
        out
    }

    #[test]
    fn test_member_assignment() {
        assert_eq!(
            kinds("exports.name = \"app\";"),
            vec![
                TokenKind::Identifier("exports".into()),
                TokenKind::Dot,
                TokenKind::Identifier("name".into()),
                TokenKind::Equal,
                TokenKind::String("app".into()),
                TokenKind::Semicolon,
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("a === b !== c == d != e && f || g ?? h"),
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::StrictEqual,
                TokenKind::Identifier("b".into()),
                TokenKind::StrictNotEqual,
                TokenKind::Identifier("c".into()),
                TokenKind::EqualEqual,
                TokenKind::Identifier("d".into()),
                TokenKind::NotEqual,
                TokenKind::Identifier("e".into()),
                TokenKind::AmpersandAmpersand,
                TokenKind::Identifier("f".into()),
                TokenKind::PipePipe,
                TokenKind::Identifier("g".into()),
                TokenKind::QuestionQuestion,
                TokenKind::Identifier("h".into()),
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("42 1.5 .5 1e3 0x1F"),
            vec![
                TokenKind::Number(42.0),
                TokenKind::Number(1.5),
                TokenKind::Number(0.5),
                TokenKind::Number(1000.0),
                TokenKind::Number(31.0),
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r#"'it\'s' "a\nb" "\x41B\u{43}" "😀""#),
            vec![
                TokenKind::String("it's".into()),
                TokenKind::String("a\nb".into()),
                TokenKind::String("ABC".into()),
                TokenKind::String("\u{1F600}".into()),
            ]
        );
    }

    #[test]
    fn test_unterminated_string() {
        assert!(matches!(kinds("'abc")[0], TokenKind::Invalid(_)));
    }

    #[test]
    fn test_comments_and_newlines() {
        let mut scanner = Scanner::new("a // comment\n/* block\n */ b c");
        let a = scanner.next_token();
        assert!(!a.newline_before);
        let b = scanner.next_token();
        assert_eq!(b.kind, TokenKind::Identifier("b".into()));
        assert!(b.newline_before);
        let c = scanner.next_token();
        assert!(!c.newline_before);
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            kinds("var $x = function _y() {}"),
            vec![
                TokenKind::Var,
                TokenKind::Identifier("$x".into()),
                TokenKind::Equal,
                TokenKind::Function,
                TokenKind::Identifier("_y".into()),
                TokenKind::LeftParen,
                TokenKind::RightParen,
                TokenKind::LeftBrace,
                TokenKind::RightBrace,
            ]
        );
    }
}
