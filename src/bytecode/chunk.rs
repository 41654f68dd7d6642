//! Bytecode chunk containing instructions, line info and constants.

use crate::bytecode::instruction::OpCode;
use crate::bytecode::value::Value;
use crate::error::ChunkError;

/// Largest constant pool a chunk can address with a one-byte operand.
pub const MAX_CONSTANTS: usize = u8::MAX as usize + 1;

/// A chunk of bytecode containing instructions and metadata.
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    /// The bytecode instructions.
    pub code: Vec<u8>,
    /// Source line for every byte in `code`.
    pub lines: Vec<u32>,
    /// The constant pool.
    pub constants: Vec<Value>,
}

impl Chunk {
    pub fn new() -> Self {
        Self {
            code: Vec::new(),
            lines: Vec::new(),
            constants: Vec::new(),
        }
    }

    /// Append one instruction or operand byte and its source line.
    pub fn write(&mut self, byte: u8, line: u32) {
        self.code.push(byte);
        self.lines.push(line);
    }

    /// Write an opcode to the chunk.
    pub fn write_op(&mut self, op: OpCode, line: u32) {
        self.write(op.into(), line);
    }

    /// Add a constant to the pool and return its index.
    ///
    /// The caller must keep the pool within [`MAX_CONSTANTS`] for the chunk
    /// to be addressable by `CONSTANT`.
    pub fn add_constant(&mut self, value: Value) -> usize {
        self.constants.push(value);
        self.constants.len() - 1
    }

    /// Release all backing storage.
    pub fn free(&mut self) {
        self.code = Vec::new();
        self.lines = Vec::new();
        self.constants = Vec::new();
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Get the line number at a given offset.
    pub fn line_at(&self, offset: usize) -> u32 {
        self.lines.get(offset).copied().unwrap_or(0)
    }

    /// Check the invariants the VM relies on: a parallel line table, an
    /// addressable constant pool, known opcodes and complete operands.
    pub fn validate(&self) -> Result<(), ChunkError> {
        if self.lines.len() != self.code.len() {
            return Err(ChunkError::LineTableMismatch {
                code: self.code.len(),
                lines: self.lines.len(),
            });
        }
        if self.constants.len() > MAX_CONSTANTS {
            return Err(ChunkError::TooManyConstants(self.constants.len()));
        }

        let mut offset = 0;
        while offset < self.code.len() {
            let byte = self.code[offset];
            let op = OpCode::from_u8(byte).ok_or(ChunkError::UnknownOpcode {
                opcode: byte,
                offset,
            })?;
            if op == OpCode::Constant {
                let index = *self
                    .code
                    .get(offset + 1)
                    .ok_or(ChunkError::TruncatedInstruction(offset))?;
                if index as usize >= self.constants.len() {
                    return Err(ChunkError::ConstantOutOfRange {
                        index,
                        size: self.constants.len(),
                        offset,
                    });
                }
            }
            offset += 1 + op.operand_size();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_basics() {
        let mut chunk = Chunk::new();
        let idx = chunk.add_constant(Value::Number(1.2));
        chunk.write_op(OpCode::Constant, 123);
        chunk.write(idx as u8, 123);
        chunk.write_op(OpCode::Return, 124);

        assert_eq!(chunk.len(), 3);
        assert_eq!(chunk.code, vec![0, 0, OpCode::Return as u8]);
        assert_eq!(chunk.lines, vec![123, 123, 124]);
        assert_eq!(chunk.line_at(2), 124);
        assert_eq!(chunk.line_at(99), 0);
        assert!(chunk.validate().is_ok());
    }

    #[test]
    fn test_constant_pool_indices_are_sequential() {
        let mut chunk = Chunk::new();
        assert_eq!(chunk.add_constant(Value::Number(1.0)), 0);
        assert_eq!(chunk.add_constant(Value::Number(1.0)), 1);
        assert_eq!(chunk.add_constant(Value::Nil), 2);
    }

    #[test]
    fn test_growth_keeps_tables_parallel() {
        let mut chunk = Chunk::new();
        for i in 0..1000u32 {
            chunk.write_op(OpCode::Nil, i);
        }
        assert_eq!(chunk.code.len(), chunk.lines.len());
        assert_eq!(chunk.line_at(999), 999);
    }

    #[test]
    fn test_free_resets() {
        let mut chunk = Chunk::new();
        chunk.add_constant(Value::Bool(true));
        chunk.write_op(OpCode::True, 1);
        chunk.free();

        assert!(chunk.is_empty());
        assert!(chunk.lines.is_empty());
        assert!(chunk.constants.is_empty());
    }

    #[test]
    fn test_validate_rejects_bad_constant_index() {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Constant, 1);
        chunk.write(3, 1);

        assert_eq!(
            chunk.validate(),
            Err(ChunkError::ConstantOutOfRange {
                index: 3,
                size: 0,
                offset: 0
            })
        );
    }

    #[test]
    fn test_validate_rejects_truncated_and_unknown() {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Constant, 1);
        assert_eq!(chunk.validate(), Err(ChunkError::TruncatedInstruction(0)));

        let mut chunk = Chunk::new();
        chunk.write(0xEE, 1);
        assert_eq!(
            chunk.validate(),
            Err(ChunkError::UnknownOpcode {
                opcode: 0xEE,
                offset: 0
            })
        );
    }

    #[test]
    fn test_validate_rejects_line_mismatch() {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Nil, 1);
        chunk.lines.push(1);
        assert_eq!(
            chunk.validate(),
            Err(ChunkError::LineTableMismatch { code: 1, lines: 2 })
        );
    }
}
