// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The main parser implementation.

use std::sync::Arc;

use crate::Error;
use crate::ast::*;
use crate::lexer::{Scanner, Token, TokenKind};

/// Deepest statement or expression nesting accepted before a syntax error.
///
/// Every level costs several native stack frames, so this keeps hostile or
/// generated input from overflowing the host's stack.
pub const MAX_NESTING_DEPTH: usize = 100;

/// A recursive descent parser for JavaScript.
pub struct Parser<'a> {
    name: &'a str,
    scanner: Scanner<'a>,
    current: Token,
    depth: usize,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given source code.
    pub fn new(source: &'a str) -> Self {
        Self::with_name("<anonymous>", source)
    }

    /// Creates a parser whose syntax errors are reported against `name`.
    pub fn with_name(name: &'a str, source: &'a str) -> Self {
        let mut scanner = Scanner::new(source);
        let current = scanner.next_token();
        Self {
            name,
            scanner,
            current,
            depth: 0,
        }
    }

    /// Parses the whole input.
    pub fn parse_source_file(&mut self) -> Result<SourceFile, Error> {
        let mut body = Vec::new();

        while !self.is_at_end() {
            body.push(self.parse_statement()?);
        }

        Ok(SourceFile { body })
    }

    /// Parses a single statement.
    pub fn parse_statement(&mut self) -> Result<Statement, Error> {
        self.nested(Self::statement)
    }

    fn statement(&mut self) -> Result<Statement, Error> {
        match &self.current.kind {
            TokenKind::Var | TokenKind::Let | TokenKind::Const => {
                let declaration = self.parse_variable_declaration()?;
                self.consume_semicolon()?;
                Ok(Statement::VariableDeclaration(declaration))
            }
            TokenKind::Function => self.parse_function_declaration(),
            TokenKind::If => self.parse_if_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::For => self.parse_for_statement(),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::Break => {
                self.advance();
                self.consume_semicolon()?;
                Ok(Statement::Break)
            }
            TokenKind::Continue => {
                self.advance();
                self.consume_semicolon()?;
                Ok(Statement::Continue)
            }
            TokenKind::Throw => self.parse_throw_statement(),
            TokenKind::Try => self.parse_try_statement(),
            TokenKind::LeftBrace => Ok(Statement::Block(self.parse_block()?)),
            TokenKind::Semicolon => {
                self.advance();
                Ok(Statement::Empty)
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_variable_declaration(&mut self) -> Result<VariableDeclaration, Error> {
        let kind = match &self.current.kind {
            TokenKind::Var => VariableKind::Var,
            TokenKind::Let => VariableKind::Let,
            TokenKind::Const => VariableKind::Const,
            _ => return Err(self.error("expected variable declaration")),
        };
        self.advance();

        let mut declarations = Vec::new();
        loop {
            let name = self.expect_identifier()?;
            let init = if self.check(&TokenKind::Equal) {
                self.advance();
                Some(self.parse_assignment()?)
            } else {
                None
            };
            if kind == VariableKind::Const && init.is_none() {
                return Err(self.error("missing initializer in const declaration"));
            }

            declarations.push(VariableDeclarator { name, init });

            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }

        Ok(VariableDeclaration { kind, declarations })
    }

    fn parse_function_declaration(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'function'
        let name = self.expect_identifier()?;
        let function = self.parse_function_rest(Some(name))?;
        Ok(Statement::FunctionDeclaration(function))
    }

    /// Parses parameters and body once the name (if any) has been read.
    fn parse_function_rest(&mut self, name: Option<String>) -> Result<Arc<FunctionNode>, Error> {
        self.expect(&TokenKind::LeftParen)?;
        let mut params = Vec::new();
        while !self.check(&TokenKind::RightParen) {
            params.push(self.expect_identifier()?);
            if !self.check(&TokenKind::RightParen) {
                self.expect(&TokenKind::Comma)?;
            }
        }
        self.expect(&TokenKind::RightParen)?;
        let body = self.parse_block()?;
        Ok(Arc::new(FunctionNode { name, params, body }))
    }

    fn parse_if_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'if'
        self.expect(&TokenKind::LeftParen)?;
        let test = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.check(&TokenKind::Else) {
            self.advance();
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Statement::If(IfStatement {
            test,
            consequent,
            alternate,
        }))
    }

    fn parse_while_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'while'
        self.expect(&TokenKind::LeftParen)?;
        let test = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        let body = Box::new(self.parse_statement()?);
        Ok(Statement::While(WhileStatement { test, body }))
    }

    fn parse_for_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'for'
        self.expect(&TokenKind::LeftParen)?;

        let init = match &self.current.kind {
            TokenKind::Semicolon => None,
            TokenKind::Var | TokenKind::Let | TokenKind::Const => {
                Some(ForInit::Variable(self.parse_variable_declaration()?))
            }
            _ => Some(ForInit::Expression(self.parse_expression()?)),
        };
        self.expect(&TokenKind::Semicolon)?;

        let test = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::Semicolon)?;

        let update = if self.check(&TokenKind::RightParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::RightParen)?;

        let body = Box::new(self.parse_statement()?);
        Ok(Statement::For(ForStatement {
            init,
            test,
            update,
            body,
        }))
    }

    fn parse_return_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'return'
        if self.at_statement_end() {
            self.consume_semicolon()?;
            return Ok(Statement::Return(None));
        }
        let argument = self.parse_expression()?;
        self.consume_semicolon()?;
        Ok(Statement::Return(Some(argument)))
    }

    fn parse_throw_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'throw'
        if self.current.newline_before {
            return Err(self.error("illegal newline after throw"));
        }
        let argument = self.parse_expression()?;
        self.consume_semicolon()?;
        Ok(Statement::Throw(argument))
    }

    fn parse_try_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'try'
        let block = self.parse_block()?;

        let handler = if self.check(&TokenKind::Catch) {
            self.advance();
            let param = if self.check(&TokenKind::LeftParen) {
                self.advance();
                let name = self.expect_identifier()?;
                self.expect(&TokenKind::RightParen)?;
                Some(name)
            } else {
                None
            };
            let body = self.parse_block()?;
            Some(CatchClause { param, body })
        } else {
            None
        };

        let finalizer = if self.check(&TokenKind::Finally) {
            self.advance();
            Some(self.parse_block()?)
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            return Err(self.error("missing catch or finally after try"));
        }

        Ok(Statement::Try(TryStatement {
            block,
            handler,
            finalizer,
        }))
    }

    fn parse_block(&mut self) -> Result<Vec<Statement>, Error> {
        self.expect(&TokenKind::LeftBrace)?;
        let mut body = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            body.push(self.parse_statement()?);
        }
        self.expect(&TokenKind::RightBrace)?;
        Ok(body)
    }

    fn parse_expression_statement(&mut self) -> Result<Statement, Error> {
        let expression = self.parse_expression()?;
        self.consume_semicolon()?;
        Ok(Statement::Expression(expression))
    }

    // Expressions, lowest precedence first

    /// Parses a full expression, including the comma operator.
    pub fn parse_expression(&mut self) -> Result<Expression, Error> {
        let first = self.parse_assignment()?;
        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }
        let mut expressions = vec![first];
        while self.check(&TokenKind::Comma) {
            self.advance();
            expressions.push(self.parse_assignment()?);
        }
        Ok(Expression::Sequence(expressions))
    }

    fn parse_assignment(&mut self) -> Result<Expression, Error> {
        let target = self.nested(Self::parse_conditional)?;

        let op = match self.current.kind {
            TokenKind::Equal => AssignOp::Assign,
            TokenKind::PlusEqual => AssignOp::AddAssign,
            TokenKind::MinusEqual => AssignOp::SubAssign,
            _ => return Ok(target),
        };
        if !target.is_assignable() {
            return Err(self.error("invalid assignment target"));
        }
        self.advance();
        let value = self.nested(Self::parse_assignment)?;
        Ok(Expression::Assign {
            op,
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    fn parse_conditional(&mut self) -> Result<Expression, Error> {
        let test = self.parse_logical_or()?;

        if !self.check(&TokenKind::Question) {
            return Ok(test);
        }
        self.advance(); // consume '?'
        let consequent = self.parse_assignment()?;
        self.expect(&TokenKind::Colon)?;
        let alternate = self.parse_assignment()?;

        Ok(Expression::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    fn parse_logical_or(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_logical_and()?;
        loop {
            let op = match self.current.kind {
                TokenKind::PipePipe => LogicalOp::Or,
                TokenKind::QuestionQuestion => LogicalOp::Coalesce,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_logical_and()?;
            left = Expression::Logical(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_logical_and(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_equality()?;
        while self.check(&TokenKind::AmpersandAmpersand) {
            self.advance();
            let right = self.parse_equality()?;
            left = Expression::Logical(LogicalOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = match self.current.kind {
                TokenKind::EqualEqual => BinaryOp::Eq,
                TokenKind::NotEqual => BinaryOp::NotEq,
                TokenKind::StrictEqual => BinaryOp::StrictEq,
                TokenKind::StrictNotEqual => BinaryOp::StrictNotEq,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_comparison()?;
            left = Expression::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_comparison(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.current.kind {
                TokenKind::LessThan => BinaryOp::Lt,
                TokenKind::GreaterThan => BinaryOp::Gt,
                TokenKind::LessThanEqual => BinaryOp::LtEq,
                TokenKind::GreaterThanEqual => BinaryOp::GtEq,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_additive()?;
            left = Expression::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_additive(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expression::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expression::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_unary(&mut self) -> Result<Expression, Error> {
        let op = match self.current.kind {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Minus,
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Typeof => UnaryOp::Typeof,
            TokenKind::Void => UnaryOp::Void,
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let op = if self.check(&TokenKind::PlusPlus) {
                    UpdateOp::Increment
                } else {
                    UpdateOp::Decrement
                };
                self.advance();
                let target = self.nested(Self::parse_unary)?;
                if !target.is_assignable() {
                    return Err(self.error("invalid update target"));
                }
                return Ok(Expression::Update {
                    op,
                    prefix: true,
                    target: Box::new(target),
                });
            }
            _ => return self.parse_postfix(),
        };
        self.advance();
        let argument = self.nested(Self::parse_unary)?;
        Ok(Expression::Unary(op, Box::new(argument)))
    }

    fn parse_postfix(&mut self) -> Result<Expression, Error> {
        let expr = self.parse_call()?;

        // A line break before ++/-- starts a new statement
        if self.current.newline_before {
            return Ok(expr);
        }
        let op = match self.current.kind {
            TokenKind::PlusPlus => UpdateOp::Increment,
            TokenKind::MinusMinus => UpdateOp::Decrement,
            _ => return Ok(expr),
        };
        if !expr.is_assignable() {
            return Err(self.error("invalid update target"));
        }
        self.advance();
        Ok(Expression::Update {
            op,
            prefix: false,
            target: Box::new(expr),
        })
    }

    fn parse_call(&mut self) -> Result<Expression, Error> {
        let mut expr = if self.check(&TokenKind::New) {
            self.parse_new_expression()?
        } else {
            self.parse_primary()?
        };

        loop {
            match self.current.kind {
                TokenKind::LeftParen => {
                    let arguments = self.parse_arguments()?;
                    expr = Expression::Call {
                        callee: Box::new(expr),
                        arguments,
                    };
                }
                TokenKind::Dot | TokenKind::LeftBracket => {
                    expr = self.parse_member(expr)?;
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_new_expression(&mut self) -> Result<Expression, Error> {
        self.advance(); // consume 'new'
        let mut callee = if self.check(&TokenKind::New) {
            self.nested(Self::parse_new_expression)?
        } else {
            self.parse_primary()?
        };
        while self.check(&TokenKind::Dot) || self.check(&TokenKind::LeftBracket) {
            callee = self.parse_member(callee)?;
        }
        let arguments = if self.check(&TokenKind::LeftParen) {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        Ok(Expression::New {
            callee: Box::new(callee),
            arguments,
        })
    }

    fn parse_member(&mut self, object: Expression) -> Result<Expression, Error> {
        let property = if self.check(&TokenKind::Dot) {
            self.advance();
            MemberProperty::Named(self.expect_property_name()?)
        } else {
            self.expect(&TokenKind::LeftBracket)?;
            let property = self.parse_expression()?;
            self.expect(&TokenKind::RightBracket)?;
            MemberProperty::Computed(Box::new(property))
        };
        Ok(Expression::Member {
            object: Box::new(object),
            property,
        })
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expression>, Error> {
        self.expect(&TokenKind::LeftParen)?;
        let mut arguments = Vec::new();
        while !self.check(&TokenKind::RightParen) {
            arguments.push(self.parse_assignment()?);
            if !self.check(&TokenKind::RightParen) {
                self.expect(&TokenKind::Comma)?;
            }
        }
        self.expect(&TokenKind::RightParen)?;
        Ok(arguments)
    }

    fn parse_primary(&mut self) -> Result<Expression, Error> {
        let expr = match &self.current.kind {
            TokenKind::Number(n) => Expression::Number(*n),
            TokenKind::String(s) => Expression::String(s.clone()),
            TokenKind::True => Expression::Boolean(true),
            TokenKind::False => Expression::Boolean(false),
            TokenKind::Null => Expression::Null,
            TokenKind::This => Expression::This,
            TokenKind::Identifier(name) => Expression::Identifier(name.clone()),
            TokenKind::Function => return self.parse_function_expression(),
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(&TokenKind::RightParen)?;
                return Ok(expr);
            }
            TokenKind::LeftBracket => return self.parse_array_literal(),
            TokenKind::LeftBrace => return self.parse_object_literal(),
            TokenKind::Invalid(message) => {
                let message = message.clone();
                return Err(self.error(&message));
            }
            _ => return Err(self.unexpected()),
        };
        self.advance();
        Ok(expr)
    }

    fn parse_function_expression(&mut self) -> Result<Expression, Error> {
        self.advance(); // consume 'function'
        let name = if let TokenKind::Identifier(name) = &self.current.kind {
            let name = name.clone();
            self.advance();
            Some(name)
        } else {
            None
        };
        Ok(Expression::Function(self.parse_function_rest(name)?))
    }

    fn parse_array_literal(&mut self) -> Result<Expression, Error> {
        self.expect(&TokenKind::LeftBracket)?;
        let mut elements = Vec::new();
        while !self.check(&TokenKind::RightBracket) {
            elements.push(self.parse_assignment()?);
            if !self.check(&TokenKind::RightBracket) {
                self.expect(&TokenKind::Comma)?;
            }
        }
        self.expect(&TokenKind::RightBracket)?;
        Ok(Expression::Array(elements))
    }

    fn parse_object_literal(&mut self) -> Result<Expression, Error> {
        self.expect(&TokenKind::LeftBrace)?;
        let mut properties = Vec::new();
        while !self.check(&TokenKind::RightBrace) {
            let shorthand = matches!(self.current.kind, TokenKind::Identifier(_));
            let key = match &self.current.kind {
                TokenKind::String(s) => {
                    let key = s.clone();
                    self.advance();
                    key
                }
                TokenKind::Number(n) => {
                    let key = crate::runtime::number_to_string(*n);
                    self.advance();
                    key
                }
                _ => self.expect_property_name()?,
            };

            let value = match self.current.kind {
                TokenKind::Colon => {
                    self.advance();
                    self.parse_assignment()?
                }
                TokenKind::LeftParen => {
                    Expression::Function(self.parse_function_rest(Some(key.clone()))?)
                }
                TokenKind::Comma | TokenKind::RightBrace if shorthand => {
                    Expression::Identifier(key.clone())
                }
                _ => return Err(self.unexpected()),
            };
            properties.push(Property { key, value });

            if !self.check(&TokenKind::RightBrace) {
                self.expect(&TokenKind::Comma)?;
            }
        }
        self.expect(&TokenKind::RightBrace)?;
        Ok(Expression::Object(properties))
    }

    // Helper methods

    /// Runs `parse` one nesting level deeper.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T, Error>) -> Result<T, Error> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn advance(&mut self) {
        self.current = self.scanner.next_token();
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind)
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), Error> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn expect_identifier(&mut self) -> Result<String, Error> {
        if let TokenKind::Identifier(name) = &self.current.kind {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.unexpected())
        }
    }

    /// Property names after `.` and in object literals may be keywords.
    fn expect_property_name(&mut self) -> Result<String, Error> {
        if let Some(text) = self.current.kind.keyword_text() {
            self.advance();
            return Ok(text.to_string());
        }
        self.expect_identifier()
    }

    fn at_statement_end(&self) -> bool {
        self.current.newline_before
            || matches!(
                self.current.kind,
                TokenKind::Semicolon | TokenKind::RightBrace | TokenKind::Eof
            )
    }

    /// Automatic semicolon insertion, restricted to the common cases.
    fn consume_semicolon(&mut self) -> Result<(), Error> {
        if self.check(&TokenKind::Semicolon) {
            self.advance();
            return Ok(());
        }
        if self.at_statement_end() {
            return Ok(());
        }
        Err(self.unexpected())
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current.kind, TokenKind::Eof)
    }

    fn unexpected(&self) -> Error {
        let message = match &self.current.kind {
            TokenKind::Eof => "unexpected end of input".to_string(),
            TokenKind::Invalid(message) => message.clone(),
            _ => {
                let span = self.current.span;
                let text = &self.scanner.source()[span.start..span.end];
                format!("unexpected token '{}'", text)
            }
        };
        self.error(&message)
    }

    fn error(&self, message: &str) -> Error {
        let (line, column) = line_column(self.scanner.source(), self.current.span.start);
        Error::SyntaxError(format!("{}:{}:{}: {}", self.name, line, column, message))
    }
}

/// One-based line and column of a byte offset.
fn line_column(source: &str, offset: usize) -> (usize, usize) {
    let before = &source[..offset.min(source.len())];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}
