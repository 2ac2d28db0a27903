//! Typing rules for operators, assignments and conditions.
//!
//! Every function here is pure: it inspects operand types and decides which
//! opcode to emit and which operands to convert first. Emitting is left to the
//! parser.

use std::fmt;

use thiserror::Error;

use crate::{ir::OpCode, types::Type};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Neq,
    Gt,
    Geq,
    Lt,
    Leq,
    And,
    Or,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use BinaryOp::*;
        f.write_str(match self {
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Eq => "==",
            Neq => "!=",
            Gt => ">",
            Geq => ">=",
            Lt => "<",
            Leq => "<=",
            And => "and",
            Or => "or",
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnaryOp::Negate => "-",
            UnaryOp::Not => "!",
        })
    }
}

/// The construct a condition belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Construct {
    If,
    While,
}

impl fmt::Display for Construct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Construct::If => "if",
            Construct::While => "while",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    #[error("Operands of '{op}' must have the same type, got {lhs} and {rhs}.")]
    Mismatch { op: BinaryOp, lhs: Type, rhs: Type },

    #[error("Operands of '{op}' must be numbers, got {lhs} and {rhs}.")]
    NotNumeric { op: BinaryOp, lhs: Type, rhs: Type },

    #[error("Operands of '{op}' must be booleans, got {ty}.")]
    NotBoolean { op: BinaryOp, ty: Type },

    #[error("Operand of '{op}' must be {expected}, got {actual}.")]
    BadOperand {
        op: UnaryOp,
        expected: &'static str,
        actual: Type,
    },

    #[error("Condition of '{construct}' must be bool, got {actual}.")]
    ConditionNotBool { construct: Construct, actual: Type },

    #[error("Cannot assign a value of type {value} to '{target}' of type {expected}.")]
    Unassignable {
        target: Box<str>,
        expected: Type,
        value: Type,
    },
}

/// How to emit a well-typed binary operation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BinaryTyping {
    pub opcode: OpCode,
    /// Whether the left operand must go through `I2F` first.
    pub coerce_lhs: bool,
    /// Whether the right operand must go through `I2F` first.
    pub coerce_rhs: bool,
    pub result: Type,
}

pub fn check_binary(op: BinaryOp, lhs: Type, rhs: Type) -> Result<BinaryTyping, Error> {
    use BinaryOp::*;
    match op {
        Add | Sub | Mul | Div => check_arithmetic(op, lhs, rhs),
        Gt | Geq | Lt | Leq => {
            if !lhs.is_numeric() || !rhs.is_numeric() {
                return Err(Error::NotNumeric { op, lhs, rhs });
            }
            if lhs != rhs {
                return Err(Error::Mismatch { op, lhs, rhs });
            }
            let real = lhs == Type::Real;
            let opcode = match (op, real) {
                (Gt, false) => OpCode::Gt,
                (Gt, true) => OpCode::FGt,
                (Geq, false) => OpCode::Geq,
                (Geq, true) => OpCode::FGeq,
                (Lt, false) => OpCode::Lt,
                (Lt, true) => OpCode::FLt,
                (_, false) => OpCode::Leq,
                (_, true) => OpCode::FLeq,
            };
            Ok(plain(opcode, Type::Bool))
        }
        Eq | Neq => {
            if lhs != rhs {
                return Err(Error::Mismatch { op, lhs, rhs });
            }
            let real = lhs == Type::Real;
            let opcode = match (op, real) {
                (Eq, false) => OpCode::Eq,
                (Eq, true) => OpCode::FEq,
                (_, false) => OpCode::Neq,
                (_, true) => OpCode::FNeq,
            };
            Ok(plain(opcode, Type::Bool))
        }
        And | Or => {
            if lhs != rhs {
                return Err(Error::Mismatch { op, lhs, rhs });
            }
            if lhs != Type::Bool {
                return Err(Error::NotBoolean { op, ty: lhs });
            }
            let opcode = if op == And { OpCode::And } else { OpCode::Or };
            Ok(plain(opcode, Type::Bool))
        }
    }
}

fn check_arithmetic(op: BinaryOp, lhs: Type, rhs: Type) -> Result<BinaryTyping, Error> {
    if !lhs.is_numeric() || !rhs.is_numeric() {
        return Err(Error::NotNumeric { op, lhs, rhs });
    }
    let (int, real) = match op {
        BinaryOp::Add => (OpCode::Add, OpCode::FAdd),
        BinaryOp::Sub => (OpCode::Sub, OpCode::FSub),
        BinaryOp::Mul => (OpCode::Mult, OpCode::FMult),
        _ => (OpCode::Div, OpCode::FDiv),
    };
    if lhs == rhs {
        let opcode = if lhs == Type::Real { real } else { int };
        return Ok(plain(opcode, lhs));
    }
    // Mixed: widen whichever side is the integer.
    Ok(BinaryTyping {
        opcode: real,
        coerce_lhs: lhs == Type::Int,
        coerce_rhs: rhs == Type::Int,
        result: Type::Real,
    })
}

fn plain(opcode: OpCode, result: Type) -> BinaryTyping {
    BinaryTyping {
        opcode,
        coerce_lhs: false,
        coerce_rhs: false,
        result,
    }
}

/// Returns the opcode implementing `op` for an operand of type `ty`, along with
/// the result type.
///
/// Negation is emitted as a subtraction from zero, so the opcode returned for
/// it is `SUB` or `FSUB`.
pub fn check_unary(op: UnaryOp, ty: Type) -> Result<(OpCode, Type), Error> {
    match op {
        UnaryOp::Negate => match ty {
            Type::Int => Ok((OpCode::Sub, Type::Int)),
            Type::Real => Ok((OpCode::FSub, Type::Real)),
            actual => Err(Error::BadOperand {
                op,
                expected: "a number",
                actual,
            }),
        },
        UnaryOp::Not => match ty {
            Type::Bool => Ok((OpCode::Not, Type::Bool)),
            actual => Err(Error::BadOperand {
                op,
                expected: "bool",
                actual,
            }),
        },
    }
}

/// Checks that a value of type `value` can be stored in `target`, declared with
/// type `expected`. Returns whether the value must be widened with `I2F` first.
pub fn check_assignment(target: &str, expected: Type, value: Type) -> Result<bool, Error> {
    match (expected, value) {
        (expected, value) if expected == value => Ok(false),
        (Type::Real, Type::Int) => Ok(true),
        _ => Err(Error::Unassignable {
            target: target.into(),
            expected,
            value,
        }),
    }
}

pub fn check_condition(construct: Construct, ty: Type) -> Result<(), Error> {
    if ty == Type::Bool {
        Ok(())
    } else {
        Err(Error::ConditionNotBool {
            construct,
            actual: ty,
        })
    }
}
