//! Three-address intermediate representation.

use std::fmt;

use crate::constant_pool::ConstId;

/// A named storage location: either a source variable or a compiler
/// temporary (`%t<N>`).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Address(Box<str>);

impl Address {
    pub fn named(name: &str) -> Address {
        Address(name.into())
    }

    pub fn temp(n: u32) -> Address {
        Address(format!("%t{n}").into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_temp(&self) -> bool {
        self.0.starts_with("%t")
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A jump target.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Label(Box<str>);

impl Label {
    /// `.if_<suffix>.<part>`, where `part` is one of `true`, `false` or `exit`.
    pub fn if_branch(suffix: u32, part: &str) -> Label {
        Label(format!(".if_{suffix}.{part}").into())
    }

    /// `.while_<suffix>.<part>`, where `part` is one of `cond`, `true` or
    /// `exit`.
    pub fn while_loop(suffix: u32, part: &str) -> Label {
        Label(format!(".while_{suffix}.{part}").into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Label({})", self.0)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OpCode {
    // Integer arithmetic.
    Add,
    Sub,
    Mult,
    Div,
    // Real arithmetic.
    FAdd,
    FSub,
    FMult,
    FDiv,
    // Integer (and char, bool) comparison.
    Eq,
    Gt,
    Lt,
    Geq,
    Leq,
    Neq,
    // Real comparison.
    FEq,
    FGt,
    FLt,
    FGeq,
    FLeq,
    FNeq,
    // Conversions.
    F2I,
    I2F,
    // Logic.
    Not,
    And,
    Or,
    Xor,
    Negate,
    // Control flow.
    Jmp,
    Br,
    Ret,
    // Misc.
    Id,
    Print,
    Concat,
    ToString,
}

impl OpCode {
    pub fn name(self) -> &'static str {
        use OpCode::*;
        match self {
            Add => "ADD",
            Sub => "SUB",
            Mult => "MULT",
            Div => "DIV",
            FAdd => "FADD",
            FSub => "FSUB",
            FMult => "FMULT",
            FDiv => "FDIV",
            Eq => "EQ",
            Gt => "GT",
            Lt => "LT",
            Geq => "GEQ",
            Leq => "LEQ",
            Neq => "NEQ",
            FEq => "FEQ",
            FGt => "FGT",
            FLt => "FLT",
            FGeq => "FGEQ",
            FLeq => "FLEQ",
            FNeq => "FNEQ",
            F2I => "F2I",
            I2F => "I2F",
            Not => "NOT",
            And => "AND",
            Or => "OR",
            Xor => "XOR",
            Negate => "NEGATE",
            Jmp => "JMP",
            Br => "BR",
            Ret => "RET",
            Id => "ID",
            Print => "PRINT",
            Concat => "CONCAT",
            ToString => "TO_STRING",
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum InstrKind {
    /// Marks a jump target.
    Label(Label),
    /// Loads the pool constant `id` into `dest`.
    Const { dest: Address, id: ConstId },
    /// Computes `dest` from `args`, with no other effect.
    Pure {
        op: OpCode,
        dest: Address,
        args: Vec<Address>,
    },
    /// An operation with effects beyond defining a value: printing, jumps and
    /// branches.
    Impure {
        op: OpCode,
        args: Vec<Address>,
        labels: Vec<Label>,
    },
    /// Calls the function numbered `func`. Never produced by the front end
    /// itself.
    Call {
        dest: Option<Address>,
        func: u32,
        args: Vec<Address>,
    },
    /// Selects among `args` by the predecessor label it flowed from. Never
    /// produced by the front end itself.
    Phi {
        dest: Address,
        args: Vec<Address>,
        labels: Vec<Label>,
    },
}

impl InstrKind {
    /// The address this instruction defines, if any.
    pub fn dest(&self) -> Option<&Address> {
        match self {
            InstrKind::Const { dest, .. }
            | InstrKind::Pure { dest, .. }
            | InstrKind::Phi { dest, .. } => Some(dest),
            InstrKind::Call { dest, .. } => dest.as_ref(),
            InstrKind::Label(_) | InstrKind::Impure { .. } => None,
        }
    }
}

/// An instruction tagged with the source position of the token that caused
/// it.
#[derive(Clone, Debug, PartialEq)]
pub struct Instruction {
    pub kind: InstrKind,
    pub line: u32,
    pub col: u32,
}

/// An ordered list of instructions. Order is execution order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Program {
    instructions: Vec<Instruction>,
}

impl Program {
    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }

    pub fn as_slice(&self) -> &[Instruction] {
        &self.instructions
    }
}

impl<'a> IntoIterator for &'a Program {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Hands out fresh temporaries and label suffixes.
///
/// Temporaries are numbered from 1. Label suffixes are numbered from 0 and
/// are shared by `if` and `while`, so no two control-flow constructs in a
/// compilation ever share a suffix.
#[derive(Debug)]
pub struct NameGen {
    next_temp: u32,
    next_suffix: u32,
}

impl NameGen {
    pub fn new() -> NameGen {
        NameGen {
            next_temp: 1,
            next_suffix: 0,
        }
    }

    pub fn fresh_temp(&mut self) -> Address {
        let temp = Address::temp(self.next_temp);
        self.next_temp += 1;
        temp
    }

    pub fn fresh_suffix(&mut self) -> u32 {
        let suffix = self.next_suffix;
        self.next_suffix += 1;
        suffix
    }
}

impl Default for NameGen {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temps_start_at_one() {
        let mut names = NameGen::new();
        assert_eq!(names.fresh_temp().as_str(), "%t1");
        assert_eq!(names.fresh_temp().as_str(), "%t2");
        assert!(names.fresh_temp().is_temp());
        assert!(!Address::named("total").is_temp());
    }

    #[test]
    fn suffixes_are_shared_between_constructs() {
        let mut names = NameGen::new();
        let first = names.fresh_suffix();
        let second = names.fresh_suffix();
        assert_eq!(Label::if_branch(first, "true").as_str(), ".if_0.true");
        assert_eq!(Label::while_loop(second, "cond").as_str(), ".while_1.cond");
    }

    #[test]
    fn opcode_names() {
        assert_eq!(OpCode::FMult.to_string(), "FMULT");
        assert_eq!(OpCode::I2F.to_string(), "I2F");
        assert_eq!(OpCode::ToString.to_string(), "TO_STRING");
    }

    #[test]
    fn dest_of_instructions() {
        let t1 = Address::temp(1);
        let pure = InstrKind::Pure {
            op: OpCode::Not,
            dest: t1.clone(),
            args: vec![Address::named("b")],
        };
        let jump = InstrKind::Impure {
            op: OpCode::Jmp,
            args: vec![],
            labels: vec![Label::if_branch(0, "exit")],
        };
        let call = InstrKind::Call {
            dest: None,
            func: 0,
            args: vec![],
        };
        assert_eq!(pure.dest(), Some(&t1));
        assert_eq!(jump.dest(), None);
        assert_eq!(call.dest(), None);
    }
}
