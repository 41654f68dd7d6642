//! Bytecode disassembler for debugging.
//!
//! Pure readers over a [`Chunk`]: nothing here mutates the chunk or the heap.
//! The same per-instruction routine backs the static dump and the VM's
//! execution trace.

use std::fmt::Write;

use crate::bytecode::chunk::Chunk;
use crate::bytecode::instruction::OpCode;
use crate::bytecode::object::Heap;

/// Disassemble a whole chunk under a `=== name ===` header.
pub fn disassemble_chunk(chunk: &Chunk, heap: &Heap, name: &str) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "=== {} ===", name);

    let mut offset = 0;
    while offset < chunk.code.len() {
        offset = disassemble_instruction(chunk, heap, offset, &mut output);
    }

    output
}

/// Disassemble a single instruction and return the offset of the next one.
pub fn disassemble_instruction(
    chunk: &Chunk,
    heap: &Heap,
    offset: usize,
    output: &mut String,
) -> usize {
    let _ = write!(output, "{:04} ", offset);

    // Print line number (or | if same as previous)
    let line = chunk.line_at(offset);
    if offset > 0 && line == chunk.line_at(offset - 1) {
        output.push_str("   | ");
    } else {
        let _ = write!(output, "{:04} ", line);
    }

    let byte = match chunk.code.get(offset) {
        Some(&byte) => byte,
        None => {
            output.push_str("<end of chunk>\n");
            return offset + 1;
        }
    };
    let opcode = match OpCode::from_u8(byte) {
        Some(op) => op,
        None => {
            let _ = writeln!(output, "Unknown opcode {}", byte);
            return offset + 1;
        }
    };

    match opcode {
        OpCode::Constant => constant_instruction(opcode, chunk, heap, offset, output),

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
        | OpCode::Return => {
            let _ = writeln!(output, "{}", opcode.name());
            offset + 1
        }
    }
}

fn constant_instruction(
    opcode: OpCode,
    chunk: &Chunk,
    heap: &Heap,
    offset: usize,
    output: &mut String,
) -> usize {
    let index = match chunk.code.get(offset + 1) {
        Some(&index) => index,
        None => {
            let _ = writeln!(output, "{} <truncated>", opcode.name());
            return offset + 1;
        }
    };

    let _ = write!(output, "{:<16} {:>4} '", opcode.name(), index);
    match chunk.constants.get(index as usize) {
        Some(value) => {
            let _ = write!(output, "{}", value.display(heap));
        }
        None => output.push_str("???"),
    }
    output.push_str("'\n");

    offset + 2
}

/// Print disassembly to stdout.
pub fn print_disassembly(chunk: &Chunk, heap: &Heap, name: &str) {
    print!("{}", disassemble_chunk(chunk, heap, name));
}
