//! Human-readable program listings.
//!
//! Labels sit at column zero; every other instruction is indented. Constant
//! loads are annotated with the pooled value:
//!
//! ```text
//! .while_0.cond:
//!   %t1 = CONST #0 (10)
//!   %t2 = LT i, %t1
//!   BR %t2, .while_0.true, .while_0.exit
//! ```

use std::{fmt, io::Write};

use crate::{
    constant_pool::ConstantPool,
    ir::{Address, InstrKind, Instruction, Label, Program},
    util::fmt::{Context, Show},
};

const INDENT: &str = "  ";

pub fn print_program_string(pool: &ConstantPool, program: &Program) -> String {
    let mut buf = Vec::with_capacity(64 * program.len());
    // Writing into a `Vec` never fails.
    let _ = print_program(&mut buf, pool, program);
    String::from_utf8_lossy(&buf).into_owned()
}

pub fn print_program(
    w: &mut impl Write,
    pool: &ConstantPool,
    program: &Program,
) -> std::io::Result<()> {
    let ctx = Context { pool };
    for instruction in program {
        writeln!(w, "{}", instruction.display(&ctx))?;
    }
    Ok(())
}

impl Show for Instruction {
    fn show(&self, f: &mut fmt::Formatter<'_>, ctx: &Context<'_>) -> fmt::Result {
        if f.alternate() {
            write!(f, "{:>4}:{:<3} ", self.line, self.col)?;
        }
        self.kind.show(f, ctx)
    }
}

impl Show for InstrKind {
    fn show(&self, f: &mut fmt::Formatter<'_>, ctx: &Context<'_>) -> fmt::Result {
        match self {
            InstrKind::Label(label) => write!(f, "{label}:"),
            InstrKind::Const { dest, id } => {
                write!(f, "{INDENT}{dest} = CONST {id} ")?;
                match ctx.pool.get(*id) {
                    Ok(value) => write!(f, "({value})"),
                    Err(_) => f.write_str("(?)"),
                }
            }
            InstrKind::Pure { op, dest, args } => {
                write!(f, "{INDENT}{dest} = {op}")?;
                write_operands(f, args)
            }
            InstrKind::Impure { op, args, labels } => {
                write!(f, "{INDENT}{op}")?;
                write_operands(f, args)?;
                let mut sep = if args.is_empty() { " " } else { ", " };
                for label in labels {
                    write!(f, "{sep}{label}")?;
                    sep = ", ";
                }
                Ok(())
            }
            InstrKind::Call { dest, func, args } => {
                f.write_str(INDENT)?;
                if let Some(dest) = dest {
                    write!(f, "{dest} = ")?;
                }
                write!(f, "CALL @{func}(")?;
                write_list(f, args.iter())?;
                f.write_str(")")
            }
            InstrKind::Phi { dest, args, labels } => {
                write!(f, "{INDENT}{dest} = PHI [")?;
                for (i, (arg, label)) in args.iter().zip(labels).enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write_phi_arm(f, label, arg)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl Show for Program {
    fn show(&self, f: &mut fmt::Formatter<'_>, ctx: &Context<'_>) -> fmt::Result {
        for instruction in self {
            instruction.show(f, ctx)?;
            writeln!(f)?;
        }
        Ok(())
    }
}

fn write_operands(f: &mut fmt::Formatter<'_>, args: &[Address]) -> fmt::Result {
    if args.is_empty() {
        return Ok(());
    }
    f.write_str(" ")?;
    write_list(f, args.iter())
}

fn write_list<'a>(
    f: &mut fmt::Formatter<'_>,
    items: impl Iterator<Item = &'a Address>,
) -> fmt::Result {
    for (i, item) in items.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn write_phi_arm(f: &mut fmt::Formatter<'_>, label: &Label, arg: &Address) -> fmt::Result {
    write!(f, "{label}: {arg}")
}
