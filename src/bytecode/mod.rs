//! Bytecode runtime: values, chunks, the VM and the disassembler.
//!
//! # Architecture
//!
//! - `instruction`: OpCode definitions for the bytecode instruction set
//! - `value`: Tagged runtime values and their text rendering
//! - `object`: Heap objects and the string interning table
//! - `chunk`: Bytecode chunks containing instructions, lines and constants
//! - `compiler`: The `Compile` boundary a front end implements
//! - `assembler`: A textual assembler front end
//! - `vm`: Stack-based virtual machine for executing bytecode
//! - `disassembler`: Debug output for bytecode inspection

pub mod assembler;
pub mod chunk;
pub mod compiler;
pub mod disassembler;
pub mod instruction;
pub mod object;
pub mod value;
pub mod vm;


pub use assembler::{assemble, Assembler};
pub use chunk::{Chunk, MAX_CONSTANTS};
pub use compiler::Compile;
pub use disassembler::{disassemble_chunk, disassemble_instruction, print_disassembly};
pub use instruction::OpCode;
pub use object::{Heap, Obj, ObjRef, ObjString};
pub use value::{format_number, values_equal, Value};
pub use vm::{InterpretResult, Vm, STACK_MAX};
