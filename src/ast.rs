//! Abstract syntax tree for constraint expressions.
//!
//! Expressions appear in the `where` clause of a transition declaration and
//! are evaluated against the variable bindings of a token (see
//! [`eval::expr`](crate::eval::expr)). The tree is a closed sum type;
//! evaluation and pretty-printing are recursive functions over it.

use std::fmt;

use crate::event::EventValue;

/// Binary operators, in the notation used by the behavior DSL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    And,
    Or,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    In,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::In => "in",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Two's complement negation in unsigned 64-bit space.
    Neg,
    /// Bitwise complement on integers, logical negation on booleans.
    Not,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "~",
        })
    }
}

/// Static type tags assigned to expressions during parsing. The parser
/// rejects operator applications whose operand types do not match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionType {
    Integer,
    Boolean,
    String,
    Range,
}

impl fmt::Display for ExpressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExpressionType::Integer => "integer",
            ExpressionType::Boolean => "boolean",
            ExpressionType::String => "string",
            ExpressionType::Range => "range",
        })
    }
}

/// A node in the constraint expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(EventValue),
    Variable(String),
    Binary {
        left: Box<Expression>,
        op: BinaryOp,
        right: Box<Expression>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    Range {
        start: Box<Expression>,
        end: Box<Expression>,
    },
}

impl Expression {
    pub fn literal(value: impl Into<EventValue>) -> Self {
        Expression::Literal(value.into())
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Expression::Variable(name.into())
    }

    pub fn binary(left: Expression, op: BinaryOp, right: Expression) -> Self {
        Expression::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOp, operand: Expression) -> Self {
        Expression::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn range(start: Expression, end: Expression) -> Self {
        Expression::Range {
            start: Box::new(start),
            end: Box::new(end),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(value) => write!(f, "{value}"),
            Expression::Variable(name) => f.write_str(name),
            Expression::Binary { left, op, right } => write!(f, "({left} {op} {right})"),
            Expression::Unary { op, operand } => write!(f, "{op}{operand}"),
            Expression::Range { start, end } => write!(f, "[{start}..{end}]"),
        }
    }
}
