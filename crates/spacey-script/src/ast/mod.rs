// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Abstract Syntax Tree (AST) definitions for the supported JavaScript subset.
//!
//! Node names follow ESTree where the shapes line up. Function bodies sit
//! behind `Arc` so closures can share them with the compiled program, which
//! keeps the whole tree `Send + Sync`.

use std::sync::Arc;

/// A parsed source file.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    /// The statements in the file
    pub body: Vec<Statement>,
}

/// A JavaScript statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Variable declaration (var, let, const)
    VariableDeclaration(VariableDeclaration),
    /// Function declaration
    FunctionDeclaration(Arc<FunctionNode>),
    /// Expression statement
    Expression(Expression),
    /// Block statement { ... }
    Block(Vec<Statement>),
    /// If statement
    If(IfStatement),
    /// While statement
    While(WhileStatement),
    /// For statement
    For(ForStatement),
    /// Return statement
    Return(Option<Expression>),
    /// Break statement
    Break,
    /// Continue statement
    Continue,
    /// Throw statement
    Throw(Expression),
    /// Try statement
    Try(TryStatement),
    /// Empty statement (;)
    Empty,
}

/// Variable declaration kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    /// var declaration
    Var,
    /// let declaration
    Let,
    /// const declaration
    Const,
}

/// A variable declaration statement.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclaration {
    /// The kind of declaration
    pub kind: VariableKind,
    /// The declarators
    pub declarations: Vec<VariableDeclarator>,
}

/// A single variable declarator.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclarator {
    /// The name being declared
    pub name: String,
    /// Optional initializer expression
    pub init: Option<Expression>,
}

/// A function, shared by declarations and expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionNode {
    /// The function name, absent for anonymous expressions
    pub name: Option<String>,
    /// The parameter names
    pub params: Vec<String>,
    /// The function body
    pub body: Vec<Statement>,
}

/// An if statement.
#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    pub test: Expression,
    pub consequent: Box<Statement>,
    pub alternate: Option<Box<Statement>>,
}

/// A while statement.
#[derive(Debug, Clone, PartialEq)]
pub struct WhileStatement {
    pub test: Expression,
    pub body: Box<Statement>,
}

/// A C-style for statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ForStatement {
    pub init: Option<ForInit>,
    pub test: Option<Expression>,
    pub update: Option<Expression>,
    pub body: Box<Statement>,
}

/// The initializer clause of a for statement.
#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    /// for (var i = 0; ...)
    Variable(VariableDeclaration),
    /// for (i = 0; ...)
    Expression(Expression),
}

/// A try statement. At least one of `handler` or `finalizer` is present.
#[derive(Debug, Clone, PartialEq)]
pub struct TryStatement {
    pub block: Vec<Statement>,
    pub handler: Option<CatchClause>,
    pub finalizer: Option<Vec<Statement>>,
}

/// A catch clause. The binding is optional (`catch { ... }`).
#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub param: Option<String>,
    pub body: Vec<Statement>,
}

/// A JavaScript expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Numeric literal
    Number(f64),
    /// String literal
    String(String),
    /// Boolean literal
    Boolean(bool),
    /// null
    Null,
    /// Identifier reference
    Identifier(String),
    /// this
    This,
    /// Array literal [a, b, c]
    Array(Vec<Expression>),
    /// Object literal { key: value }
    Object(Vec<Property>),
    /// Function expression
    Function(Arc<FunctionNode>),
    /// Unary operation (!x, -x, typeof x)
    Unary(UnaryOp, Box<Expression>),
    /// Increment or decrement of an assignable target
    Update {
        op: UpdateOp,
        prefix: bool,
        target: Box<Expression>,
    },
    /// Binary operation
    Binary(BinaryOp, Box<Expression>, Box<Expression>),
    /// Short-circuiting operation
    Logical(LogicalOp, Box<Expression>, Box<Expression>),
    /// test ? consequent : alternate
    Conditional {
        test: Box<Expression>,
        consequent: Box<Expression>,
        alternate: Box<Expression>,
    },
    /// Assignment to an identifier or member
    Assign {
        op: AssignOp,
        target: Box<Expression>,
        value: Box<Expression>,
    },
    /// Member access (obj.prop or obj[expr])
    Member {
        object: Box<Expression>,
        property: MemberProperty,
    },
    /// Function call
    Call {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
    },
    /// Constructor call (new F(args))
    New {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
    },
    /// Comma-separated sequence, evaluating to the last element
    Sequence(Vec<Expression>),
}

impl Expression {
    /// Whether this expression may appear on the left of an assignment.
    pub fn is_assignable(&self) -> bool {
        matches!(self, Expression::Identifier(_) | Expression::Member { .. })
    }
}

/// An object literal property.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub key: String,
    pub value: Expression,
}

/// The property part of a member expression.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberProperty {
    /// obj.name
    Named(String),
    /// obj[expr]
    Computed(Box<Expression>),
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// !
    Not,
    /// -
    Minus,
    /// +
    Plus,
    /// typeof
    Typeof,
    /// void
    Void,
}

/// Update operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    /// ++
    Increment,
    /// --
    Decrement,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
}

/// Logical operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    /// &&
    And,
    /// ||
    Or,
    /// ??
    Coalesce,
}

/// Assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    /// =
    Assign,
    /// +=
    AddAssign,
    /// -=
    SubAssign,
}
