use tracing::trace;

use crate::{
    constant_pool::{ConstId, Constant, ConstantPool},
    ir::{Address, InstrKind, Instruction, Program},
};


const DEFAULT_POOL_CAPACITY: usize = 64;

/// Accumulates the instruction list and the constant pool of a compilation.
///
/// Instructions are only ever appended; nothing emitted is reordered or
/// removed.
#[derive(Debug)]
pub struct CodeGen {
    program: Program,
    pool: ConstantPool,
}

impl CodeGen {
    pub fn new() -> CodeGen {
        CodeGen {
            program: Program::default(),
            pool: ConstantPool::with_capacity(DEFAULT_POOL_CAPACITY),
        }
    }

    /// Appends `kind` to the program, tagged with the given position.
    pub fn add_instruction(&mut self, kind: InstrKind, line: u32, col: u32) {
        trace!(index = self.program.len(), ?kind, line, col, "emit");
        self.program.push(Instruction { kind, line, col });
    }

    /// Pools `value` and appends an instruction loading it into `dest`.
    pub fn add_constant_instruction(
        &mut self,
        dest: Address,
        value: Constant,
        line: u32,
        col: u32,
    ) -> ConstId {
        let id = self.pool.add(value);
        self.add_instruction(InstrKind::Const { dest, id }, line, col);
        id
    }

    /// Number of instructions emitted so far.
    pub fn size(&self) -> usize {
        self.program.len()
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn pool(&self) -> &ConstantPool {
        &self.pool
    }

    pub fn into_parts(self) -> (Program, ConstantPool) {
        (self.program, self.pool)
    }
}

impl Default for CodeGen {
    fn default() -> Self {
        Self::new()
    }
}
