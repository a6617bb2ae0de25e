//! Inline expression language
//!
//! A rule written as `{ ... }` in a transform document is compiled into an
//! [`Expression`]. The language is deliberately small: literals, field access
//! on the input record, arithmetic, string concatenation, comparisons, boolean
//! logic, a ternary, null-coalescing and a fixed set of functions. The input
//! record is the only variable scope; expressions never see the output record
//! being built.
//!
//! # Grammar
//!
//! ```text
//! expression = ternary
//! ternary    = coalesce ("?" ternary ":" ternary)?
//! coalesce   = or ("??" or)*
//! or         = and ("||" and)*
//! and        = comparison ("&&" comparison)*
//! comparison = additive (("==" | "!=" | "<" | "<=" | ">" | ">=") additive)?
//! additive   = term (("+" | "-") term)*
//! term       = unary (("*" | "/" | "%") unary)*
//! unary      = ("-" | "!") unary | primary
//! primary    = literal | field | call | "(" expression ")"
//! field      = "input" "[" string "]" | "input" "." ident | ident
//! call       = ident "(" (expression ("," expression)*)? ")"
//! ```
//!
//! # Example
//!
//! ```rust
//! use eventloom_core::expression::Expression;
//! use eventloom_core::InputRecord;
//!
//! let expr = Expression::compile(" input['ID'] + '-note' ");
//! let input = InputRecord::from_pairs([("ID", "42")]);
//! assert_eq!(expr.evaluate(&input).unwrap(), serde_json::json!("42-note"));
//! ```

mod eval;
mod parser;

use serde_json::Value;

use crate::record::InputRecord;

pub use parser::{MAX_DEPTH, parse};

/// Error raised while parsing or evaluating an expression
#[derive(Debug, Clone, PartialEq)]
pub struct ExprError {
    /// Description of the problem
    pub message: String,
    /// Byte offset into the expression source, for parse errors
    pub position: Option<usize>,
}

impl ExprError {
    pub(crate) fn parse(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position: Some(position),
        }
    }

    pub(crate) fn eval(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            position: None,
        }
    }
}

impl std::fmt::Display for ExprError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.position {
            Some(pos) => write!(f, "at position {}: {}", pos, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ExprError {}

/// Parsed expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Constant: `'text'`, `42`, `1.5`, `true`, `null`
    Literal(Value),
    /// Input field reference
    Field(String),
    /// Prefix operator
    Unary {
        /// Operator
        op: UnaryOp,
        /// Operand
        expr: Box<Expr>,
    },
    /// Infix operator
    Binary {
        /// Left operand
        left: Box<Expr>,
        /// Operator
        op: BinaryOp,
        /// Right operand
        right: Box<Expr>,
    },
    /// `condition ? then_expr : else_expr`
    Ternary {
        /// Condition, tested for truthiness
        condition: Box<Expr>,
        /// Value when truthy
        then_expr: Box<Expr>,
        /// Value when falsy
        else_expr: Box<Expr>,
    },
    /// `a ?? b ?? c`: first non-null value
    Coalesce(Vec<Expr>),
    /// Built-in function call
    Call {
        /// Function
        func: Function,
        /// Arguments
        args: Vec<Expr>,
    },
}

/// Prefix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `!x`
    Not,
}

/// Infix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `&&`
    And,
    /// `||`
    Or,
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        };
        write!(f, "{}", s)
    }
}

/// Built-in functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    /// `int(x)`
    Int,
    /// `float(x)`
    Float,
    /// `str(x)`
    Str,
    /// `bool(x)`
    Bool,
    /// `upper(x)`
    Upper,
    /// `lower(x)`
    Lower,
    /// `trim(x)`
    Trim,
    /// `len(x)`
    Len,
    /// `concat(a, b, ...)`
    Concat,
    /// `timestamp(x)` or `timestamp(x, pattern)`
    Timestamp,
}

impl Function {
    /// Resolve a function by name
    pub fn lookup(name: &str) -> Option<Self> {
        let func = match name {
            "int" => Function::Int,
            "float" => Function::Float,
            "str" => Function::Str,
            "bool" => Function::Bool,
            "upper" => Function::Upper,
            "lower" => Function::Lower,
            "trim" => Function::Trim,
            "len" => Function::Len,
            "concat" => Function::Concat,
            "timestamp" => Function::Timestamp,
            _ => return None,
        };
        Some(func)
    }

    /// Accepted argument counts as an inclusive range
    pub fn arity(&self) -> (usize, usize) {
        match self {
            Function::Concat => (1, usize::MAX),
            Function::Timestamp => (1, 2),
            _ => (1, 1),
        }
    }

    /// Function name as written in expressions
    pub fn name(&self) -> &'static str {
        match self {
            Function::Int => "int",
            Function::Float => "float",
            Function::Str => "str",
            Function::Bool => "bool",
            Function::Upper => "upper",
            Function::Lower => "lower",
            Function::Trim => "trim",
            Function::Len => "len",
            Function::Concat => "concat",
            Function::Timestamp => "timestamp",
        }
    }
}

/// A compiled inline expression.
///
/// The source text is kept verbatim. Compilation never fails outright: a
/// parse error is stored and reported by [`Expression::evaluate`], so a
/// transform document with a broken expression still loads.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    compiled: std::result::Result<Expr, ExprError>,
}

impl Expression {
    /// Compile expression source text
    pub fn compile(source: impl Into<String>) -> Self {
        let source = source.into();
        let compiled = parse(&source);
        Self { source, compiled }
    }

    /// The expression body exactly as written between the braces
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The parsed tree, or the deferred parse error
    pub fn check(&self) -> std::result::Result<&Expr, &ExprError> {
        self.compiled.as_ref()
    }

    /// Evaluate against one input record
    pub fn evaluate(&self, input: &InputRecord) -> std::result::Result<Value, ExprError> {
        match &self.compiled {
            Ok(expr) => eval::evaluate(expr, input),
            Err(e) => Err(e.clone()),
        }
    }
}
