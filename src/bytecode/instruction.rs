//! Bytecode instruction definitions for the smed VM.

/// Opcodes for the bytecode virtual machine.
///
/// The discriminant is the byte written into a chunk, so the order of the
/// variants is part of the encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    // ============ Constants & Literals ============
    /// Load a constant from the constant pool: CONSTANT <index:u8>
    Constant = 0,
    /// Push nil onto the stack
    Nil,
    /// Push true onto the stack
    True,
    /// Push false onto the stack
    False,

    // ============ Comparison ============
    /// Equal: a == b
    Equal,
    /// Greater than: a > b
    Greater,
    /// Less than: a < b
    Less,

    // ============ Arithmetic ============
    /// Add numbers or concatenate strings: a + b
    Add,
    /// Subtract numbers, or trim a string by a count: a - b
    Sub,
    /// Multiply: a * b
    Mul,
    /// Divide: a / b
    Div,

    // ============ Logic ============
    /// Logical not: !a
    Not,
    /// Negate a number: -a
    Negate,

    // ============ Control Flow ============
    /// Print the top of stack and halt
    Return,
}

impl OpCode {
    /// Every opcode, in encoding order.
    pub const ALL: [OpCode; 14] = [
        OpCode::Constant,
        OpCode::Nil,
        OpCode::True,
        OpCode::False,
        OpCode::Equal,
        OpCode::Greater,
        OpCode::Less,
        OpCode::Add,
        OpCode::Sub,
        OpCode::Mul,
        OpCode::Div,
        OpCode::Not,
        OpCode::Negate,
        OpCode::Return,
    ];

    /// Get the number of operand bytes for this opcode.
    pub fn operand_size(self) -> usize {
        match self {
            OpCode::Constant => 1,
            OpCode::Nil
            | OpCode::True
            | OpCode::False
            | OpCode::Equal
            | OpCode::Greater
            | OpCode::Less
            | OpCode::Add
            | OpCode::Sub
            | OpCode::Mul
            | OpCode::Div
            | OpCode::Not
            | OpCode::Negate
            | OpCode::Return => 0,
        }
    }

    /// Convert from u8 to OpCode.
    pub fn from_u8(byte: u8) -> Option<OpCode> {
        Self::ALL.get(byte as usize).copied()
    }

    /// Mnemonic used by the disassembler and the assembler.
    pub fn name(self) -> &'static str {
        match self {
            OpCode::Constant => "CONSTANT",
            OpCode::Nil => "NIL",
            OpCode::True => "TRUE",
            OpCode::False => "FALSE",
            OpCode::Equal => "EQUAL",
            OpCode::Greater => "GREATER",
            OpCode::Less => "LESS",
            OpCode::Add => "ADD",
            OpCode::Sub => "SUB",
            OpCode::Mul => "MUL",
            OpCode::Div => "DIV",
            OpCode::Not => "NOT",
            OpCode::Negate => "NEGATE",
            OpCode::Return => "RETURN",
        }
    }

    /// Look up an opcode by mnemonic, ignoring ASCII case.
    pub fn from_name(name: &str) -> Option<OpCode> {
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.name().eq_ignore_ascii_case(name))
    }
}

impl From<OpCode> for u8 {
    fn from(op: OpCode) -> u8 {
        op as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_roundtrip() {
        for i in 0..=OpCode::Return as u8 {
            let op = OpCode::from_u8(i).expect("valid opcode");
            assert_eq!(i, op as u8);
        }
    }

    #[test]
    fn test_invalid_opcode() {
        assert!(OpCode::from_u8(OpCode::Return as u8 + 1).is_none());
        assert!(OpCode::from_u8(255).is_none());
    }

    #[test]
    fn test_encoding_is_stable() {
        assert_eq!(OpCode::Constant as u8, 0);
        assert_eq!(OpCode::Equal as u8, 4);
        assert_eq!(OpCode::Add as u8, 7);
        assert_eq!(OpCode::Return as u8, 13);
    }

    #[test]
    fn test_only_constant_has_operand() {
        for op in OpCode::ALL {
            let expected = usize::from(op == OpCode::Constant);
            assert_eq!(op.operand_size(), expected, "{:?}", op);
        }
    }

    #[test]
    fn test_from_name_ignores_case() {
        assert_eq!(OpCode::from_name("negate"), Some(OpCode::Negate));
        assert_eq!(OpCode::from_name("Constant"), Some(OpCode::Constant));
        assert_eq!(OpCode::from_name("POP"), None);
    }
}
