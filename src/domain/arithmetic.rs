//! Binary arithmetic over evaluated values.
//!
//! Operands are double-precision floats; division by zero follows float semantics
//! (`Infinity` or `NaN`). When an operand is a list, the operator joins the two
//! neighbouring elements, i.e. the last element of the left list with the first
//! element of the right list, and the remaining elements are kept in place. So
//! `increment(1,2)*3` yields `2,9`.

use std::fmt;

use super::models::Value;

/// Binary operators, listed from lowest to highest precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl BinaryOp {
    pub fn symbol(self) -> char {
        match self {
            BinaryOp::Add => '+',
            BinaryOp::Subtract => '-',
            BinaryOp::Multiply => '*',
            BinaryOp::Divide => '/',
        }
    }

    /// Whether the operator binds tighter than `+` and `-`.
    pub fn is_high_precedence(self) -> bool {
        matches!(self, BinaryOp::Multiply | BinaryOp::Divide)
    }

    pub fn apply(self, left: f64, right: f64) -> f64 {
        match self {
            BinaryOp::Add => left + right,
            BinaryOp::Subtract => left - right,
            BinaryOp::Multiply => left * right,
            BinaryOp::Divide => left / right,
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Combines two evaluated operands.
///
/// Unresolved operands, and empty lists that leave the operator without a
/// neighbour, keep the whole operation as text.
pub fn combine(op: BinaryOp, left: Value, right: Value) -> Value {
    let (mut lhs, rhs) = match (left.to_numbers(), right.to_numbers()) {
        (Some(lhs), Some(rhs)) if !lhs.is_empty() && !rhs.is_empty() => (lhs, rhs),
        _ => return Value::Unresolved(format!("{}{}{}", left, op, right)),
    };

    let mut rhs = rhs.into_iter();
    if let (Some(last), Some(first)) = (lhs.last_mut(), rhs.next()) {
        *last = op.apply(*last, first);
    }
    lhs.extend(rhs);

    if lhs.len() == 1 {
        Value::Number(lhs[0])
    } else {
        Value::List(lhs)
    }
}
