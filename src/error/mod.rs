//! Error types for chunk validation, compilation and execution.

use thiserror::Error;

/// Errors reported by a compiler front end.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CompileError {
    pub message: String,
    pub line: u32,
}

impl CompileError {
    pub fn new(message: impl Into<String>, line: u32) -> Self {
        Self {
            message: message.into(),
            line,
        }
    }

    pub fn line(&self) -> u32 {
        self.line
    }
}

/// Structural problems found by [`Chunk::validate`](crate::bytecode::Chunk::validate).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkError {
    #[error("Line table has {lines} entries but code has {code} bytes")]
    LineTableMismatch { code: usize, lines: usize },

    #[error("Too many constants in one chunk ({0}, limit is 256)")]
    TooManyConstants(usize),

    #[error("Constant index {index} out of range (pool size {size}) at offset {offset}")]
    ConstantOutOfRange {
        index: u8,
        size: usize,
        offset: usize,
    },

    #[error("Instruction at offset {0} is missing its operand")]
    TruncatedInstruction(usize),

    #[error("Unknown opcode {opcode} at offset {offset}")]
    UnknownOpcode { opcode: u8, offset: usize },
}

/// Runtime errors. The `Display` text is the message written to the error
/// stream; the line is reported separately.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Operands must be numbers.")]
    OperandsMustBeNumbers { line: u32 },

    #[error("Operands must be numbers or strings.")]
    OperandsMustBeNumbersOrStrings { line: u32 },

    #[error("Can't negate non-number.")]
    NegateNonNumber { line: u32 },

    #[error("Can't trim {count} characters from a string of length {length}.")]
    TrimOutOfRange { count: f64, length: usize, line: u32 },

    #[error("Stack overflow.")]
    StackOverflow { line: u32 },

    #[error("Stack underflow.")]
    StackUnderflow { line: u32 },

    #[error("Constant index {index} out of range.")]
    ConstantOutOfRange { index: u8, line: u32 },

    #[error("Unknown opcode {opcode}.")]
    UnknownOpcode { opcode: u8, line: u32 },

    #[error("Instruction is missing its operand.")]
    TruncatedInstruction { line: u32 },

    #[error("Reached end of code without RETURN.")]
    UnexpectedEndOfCode { line: u32 },

    #[error("Failed to write output: {source}")]
    Io {
        #[source]
        source: std::io::Error,
        line: u32,
    },
}

impl RuntimeError {
    pub fn io(source: std::io::Error, line: u32) -> Self {
        Self::Io { source, line }
    }

    /// Source line of the instruction that failed.
    pub fn line(&self) -> u32 {
        match self {
            Self::OperandsMustBeNumbers { line }
            | Self::OperandsMustBeNumbersOrStrings { line }
            | Self::NegateNonNumber { line }
            | Self::TrimOutOfRange { line, .. }
            | Self::StackOverflow { line }
            | Self::StackUnderflow { line }
            | Self::ConstantOutOfRange { line, .. }
            | Self::UnknownOpcode { line, .. }
            | Self::TruncatedInstruction { line }
            | Self::UnexpectedEndOfCode { line }
            | Self::Io { line, .. } => *line,
        }
    }

    /// True for traps that indicate malformed bytecode rather than a type
    /// error in the program.
    pub fn is_trap(&self) -> bool {
        matches!(
            self,
            Self::StackOverflow { .. }
                | Self::StackUnderflow { .. }
                | Self::ConstantOutOfRange { .. }
                | Self::UnknownOpcode { .. }
                | Self::TruncatedInstruction { .. }
                | Self::UnexpectedEndOfCode { .. }
        )
    }
}

/// A unified error type for all phases.
#[derive(Debug, Error)]
pub enum SmedError {
    #[error("Chunk error: {0}")]
    Chunk(#[from] ChunkError),

    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
