//! Operators and their semantics over runtime values.
//!
//! Mixed integer/float operands are promoted to float. Arrays combine
//! element-wise and must agree in element kind and length; relational
//! operators on arrays compare lexicographically.

use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;

use crate::event::{Value, ValueKind};

/// A per-cycle evaluation failure. The item being evaluated is skipped for
/// the current cycle only.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("port '{0}' is empty")]
    EmptyPort(String),

    #[error("cannot apply '{op}' to {left} and {right}")]
    TypeMismatch {
        op: BinaryOp,
        left: ValueKind,
        right: ValueKind,
    },

    #[error("array lengths differ ({left} vs {right})")]
    LengthMismatch { left: usize, right: usize },

    #[error("slice [{start}:{end}] is out of range for '{path}' ({len} elements)")]
    SliceOutOfRange {
        path: String,
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("{context} expects an array, got {kind}")]
    NotAnArray { context: String, kind: ValueKind },

    #[error("{0} of an empty array")]
    EmptyAggregate(Aggregate),

    #[error("variable '{0}' has no value this cycle")]
    UnavailableVariable(String),
}

impl EvalError {
    /// Whether the error is expected in a healthy run, such as a port that
    /// carries no value this cycle.
    pub fn is_transient(&self) -> bool {
        matches!(self, EvalError::EmptyPort(_) | EvalError::UnavailableVariable(_))
    }
}

/// Binary operators, grouped in precedence tiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    /// Binding strength; higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or | BinaryOp::And => 1,
            BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge => 2,
            BinaryOp::Add | BinaryOp::Sub => 3,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 4,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        }
    }

    fn is_logical(self) -> bool {
        matches!(self, BinaryOp::Or | BinaryOp::And)
    }

    fn is_comparison(self) -> bool {
        self.precedence() == 2
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Aggregate functions over arrays. They bind tighter than any binary
/// operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Aggregate {
    Sum,
    Max,
    Min,
}

impl Aggregate {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sum" => Some(Aggregate::Sum),
            "max" => Some(Aggregate::Max),
            "min" => Some(Aggregate::Min),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Aggregate::Sum => "sum",
            Aggregate::Max => "max",
            Aggregate::Min => "min",
        }
    }

    /// Reduces an array to a scalar of its element kind.
    pub fn apply(self, value: &Value) -> Result<Value, EvalError> {
        match value {
            Value::IntegerArray(items) => {
                let result = match self {
                    Aggregate::Sum => Some(items.iter().fold(0i64, |acc, v| acc.wrapping_add(*v))),
                    Aggregate::Max => items.iter().copied().max(),
                    Aggregate::Min => items.iter().copied().min(),
                };
                result.map(Value::Integer).ok_or(EvalError::EmptyAggregate(self))
            }
            Value::FloatArray(items) => {
                let result = match self {
                    Aggregate::Sum => Some(items.iter().sum::<f64>()),
                    Aggregate::Max => items.iter().copied().reduce(f64::max),
                    Aggregate::Min => items.iter().copied().reduce(f64::min),
                };
                result.map(Value::Float).ok_or(EvalError::EmptyAggregate(self))
            }
            other => Err(EvalError::NotAnArray {
                context: self.name().to_string(),
                kind: other.kind(),
            }),
        }
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Applies a binary operator.
pub fn apply_binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    let mismatch = || EvalError::TypeMismatch {
        op,
        left: left.kind(),
        right: right.kind(),
    };

    if op.is_logical() {
        return match (left, right) {
            (Value::Boolean(l), Value::Boolean(r)) => Ok(Value::Boolean(match op {
                BinaryOp::And => *l && *r,
                _ => *l || *r,
            })),
            _ => Err(mismatch()),
        };
    }

    match (left, right) {
        (Value::Boolean(l), Value::Boolean(r)) => match op {
            BinaryOp::Eq => Ok(Value::Boolean(l == r)),
            BinaryOp::Ne => Ok(Value::Boolean(l != r)),
            _ => Err(mismatch()),
        },
        (Value::Integer(l), Value::Integer(r)) => {
            if op.is_comparison() {
                Ok(Value::Boolean(compare(op, l.cmp(r))))
            } else {
                integer_arithmetic(op, *l, *r).map(Value::Integer)
            }
        }
        (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
            let (l, r) = match (left.as_float(), right.as_float()) {
                (Some(l), Some(r)) => (l, r),
                _ => return Err(mismatch()),
            };
            if op.is_comparison() {
                Ok(Value::Boolean(compare_floats(op, l, r)))
            } else {
                Ok(Value::Float(float_arithmetic(op, l, r)))
            }
        }
        (Value::IntegerArray(l), Value::IntegerArray(r)) => {
            check_lengths(l.len(), r.len())?;
            if op.is_comparison() {
                Ok(Value::Boolean(compare(op, l.cmp(r))))
            } else {
                l.iter()
                    .zip(r)
                    .map(|(a, b)| integer_arithmetic(op, *a, *b))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::IntegerArray)
            }
        }
        (Value::FloatArray(l), Value::FloatArray(r)) => float_array_op(op, l, r),
        // integer arrays widen against float arrays, like scalars do
        (Value::IntegerArray(l), Value::FloatArray(r)) => float_array_op(op, &widen(l), r),
        (Value::FloatArray(l), Value::IntegerArray(r)) => float_array_op(op, l, &widen(r)),
        _ => Err(mismatch()),
    }
}

fn float_array_op(op: BinaryOp, l: &[f64], r: &[f64]) -> Result<Value, EvalError> {
    check_lengths(l.len(), r.len())?;
    if op.is_comparison() {
        Ok(Value::Boolean(compare_float_arrays(op, l, r)))
    } else {
        Ok(Value::FloatArray(
            l.iter().zip(r).map(|(a, b)| float_arithmetic(op, *a, *b)).collect(),
        ))
    }
}

fn widen(items: &[i64]) -> Vec<f64> {
    items.iter().map(|v| *v as f64).collect()
}

fn check_lengths(left: usize, right: usize) -> Result<(), EvalError> {
    if left != right {
        return Err(EvalError::LengthMismatch { left, right });
    }
    Ok(())
}

fn integer_arithmetic(op: BinaryOp, l: i64, r: i64) -> Result<i64, EvalError> {
    match op {
        BinaryOp::Add => Ok(l.wrapping_add(r)),
        BinaryOp::Sub => Ok(l.wrapping_sub(r)),
        BinaryOp::Mul => Ok(l.wrapping_mul(r)),
        BinaryOp::Div if r == 0 => Err(EvalError::DivisionByZero),
        BinaryOp::Div => Ok(l.wrapping_div(r)),
        BinaryOp::Rem if r == 0 => Err(EvalError::DivisionByZero),
        BinaryOp::Rem => Ok(l.wrapping_rem(r)),
        _ => unreachable!("non-arithmetic operator {}", op),
    }
}

fn float_arithmetic(op: BinaryOp, l: f64, r: f64) -> f64 {
    match op {
        BinaryOp::Add => l + r,
        BinaryOp::Sub => l - r,
        BinaryOp::Mul => l * r,
        BinaryOp::Div => l / r,
        BinaryOp::Rem => l % r,
        _ => unreachable!("non-arithmetic operator {}", op),
    }
}

fn compare(op: BinaryOp, ordering: Ordering) -> bool {
    match op {
        BinaryOp::Eq => ordering == Ordering::Equal,
        BinaryOp::Ne => ordering != Ordering::Equal,
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::Le => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::Ge => ordering != Ordering::Less,
        _ => unreachable!("non-comparison operator {}", op),
    }
}

/// IEEE-754 comparison: every relation except `!=` is false against NaN.
fn compare_floats(op: BinaryOp, l: f64, r: f64) -> bool {
    match op {
        BinaryOp::Eq => l == r,
        BinaryOp::Ne => l != r,
        BinaryOp::Lt => l < r,
        BinaryOp::Le => l <= r,
        BinaryOp::Gt => l > r,
        BinaryOp::Ge => l >= r,
        _ => unreachable!("non-comparison operator {}", op),
    }
}

fn compare_float_arrays(op: BinaryOp, l: &[f64], r: &[f64]) -> bool {
    match op {
        BinaryOp::Eq => l == r,
        BinaryOp::Ne => l != r,
        _ => match l.partial_cmp(r) {
            Some(ordering) => compare(op, ordering),
            None => false,
        },
    }
}
