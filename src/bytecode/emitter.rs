//! Append-only bytecode writer.

use crate::bytecode::opcode::{pack_reg, reg_width, OpCode, REG_LEFT};
use crate::bytecode::pool::ConstantPool;

/// Writes opcodes and little-endian operands into a growing byte vector,
/// tracks the compile-time stack cursor, and records the fixups that are
/// resolved when emission finishes.
#[derive(Debug)]
pub struct Emitter {
    code: Vec<u8>,
    constants: ConstantPool,
    /// Placeholder position in `code` -> offset in pool storage.
    constant_fixups: Vec<(usize, u32)>,
    /// Compile-time mirror of the VM stack end.
    stack_top: i32,
    /// High-water mark of `stack_top`.
    max_stack: i32,
}

impl Emitter {
    /// `stack_base` is where the first value will land at runtime (past the
    /// VM's startup frame header).
    pub fn new(stack_base: i32) -> Self {
        Self {
            code: Vec::with_capacity(32),
            constants: ConstantPool::new(),
            constant_fixups: Vec::new(),
            stack_top: stack_base,
            max_stack: stack_base,
        }
    }

    /// Current offset in the byte stream.
    pub fn position(&self) -> usize {
        self.code.len()
    }

    /// Compile-time stack cursor.
    pub fn stack_top(&self) -> i32 {
        self.stack_top
    }

    /// Highest stack cursor seen so far.
    pub fn high_water(&self) -> i32 {
        self.max_stack
    }

    pub fn op(&mut self, op: OpCode) {
        self.code.push(op as u8);
    }

    pub fn byte(&mut self, value: u8) {
        self.code.push(value);
    }

    pub fn i16(&mut self, value: i16) {
        self.code.extend_from_slice(&value.to_le_bytes());
    }

    pub fn i32(&mut self, value: i32) {
        self.code.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a 32-bit placeholder and return its position for later patching.
    pub fn placeholder_i32(&mut self) -> usize {
        let at = self.code.len();
        self.i32(0);
        at
    }

    /// Overwrite a previously written 32-bit slot.
    pub fn patch_i32(&mut self, at: usize, value: i32) {
        assert!(at + 4 <= self.code.len(), "patch outside emitted code");
        self.code[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// PUSH of a packed register operand. Returns the stack offset the
    /// pushed bytes occupy.
    pub fn emit_push(&mut self, reg: u8) -> i32 {
        self.op(OpCode::Push);
        self.byte(reg);
        let at = self.stack_top;
        self.stack_top += reg_width(reg) as i32;
        self.max_stack = self.max_stack.max(self.stack_top);
        at
    }

    /// POP of a packed register operand.
    pub fn emit_pop(&mut self, reg: u8) {
        self.op(OpCode::Pop);
        self.byte(reg);
        self.stack_top -= reg_width(reg) as i32;
    }

    /// RESERVE: grow the stack without writing. Returns the reserved offset.
    pub fn emit_reserve(&mut self, size: i16) -> i32 {
        self.op(OpCode::Reserve);
        self.i16(size);
        let at = self.stack_top;
        self.stack_top += size as i32;
        self.max_stack = self.max_stack.max(self.stack_top);
        at
    }

    /// RELEASE: shrink the stack without reading.
    pub fn emit_release(&mut self, size: i16) {
        self.op(OpCode::Release);
        self.i16(size);
        self.stack_top -= size as i32;
    }

    /// RELEASE on an early-exit path (a forward jump out of a scope). The
    /// instruction is emitted but the compile-time cursor is left alone:
    /// fall-through code after the jump still sees the allocation.
    pub fn emit_release_untracked(&mut self, size: i16) {
        self.op(OpCode::Release);
        self.i16(size);
    }

    /// LOADC of a pooled constant: emits the size byte and a placeholder
    /// offset, recorded for fixup against the final pool position.
    pub fn emit_load_constant(&mut self, bytes: &[u8]) {
        debug_assert!(matches!(bytes.len(), 1 | 2 | 4 | 8));
        self.op(OpCode::LoadC);
        self.byte(bytes.len() as u8);
        let pool_offset = self.constants.add(bytes);
        let at = self.placeholder_i32();
        self.constant_fixups.push((at, pool_offset));
    }

    /// CONV from one primitive byte to another. Elided when equal.
    pub fn emit_conv(&mut self, from: u8, to: u8) {
        if from == to {
            return;
        }
        self.op(OpCode::Conv);
        self.byte(from);
        self.byte(to);
    }

    /// Pop `size` stack bytes into Left during scope teardown.
    pub fn emit_pop_left(&mut self, size: u8) {
        self.emit_pop(pack_reg(REG_LEFT, size));
    }

    /// Seal the stream: append RETURN, rewrite every LOADC placeholder to
    /// `pool offset + end of instructions`, then append the pool storage.
    /// Returns the final byte vector and the instruction-region length.
    pub fn finish(mut self) -> (Vec<u8>, usize) {
        self.op(OpCode::Return);

        let pool_base = self.code.len();
        for (at, pool_offset) in std::mem::take(&mut self.constant_fixups) {
            let resolved = pool_offset as i32 + pool_base as i32;
            self.patch_i32(at, resolved);
        }

        self.code.extend_from_slice(self.constants.storage());
        (self.code, pool_base)
    }
}
