//! A small textual assembler for the instruction set.
//!
//! One instruction per line, mnemonics in any case, `;` starts a comment:
//!
//! ```text
//! CONSTANT "hello"   ; push a string
//! CONSTANT 2
//! SUB
//! .line 10           ; following bytes report line 10
//! RETURN
//! ```
//!
//! `CONSTANT` takes a literal: `nil`, `true`, `false`, a number or a
//! double-quoted string (`\"`, `\\`, `\n` and `\t` escapes).

use crate::bytecode::chunk::{Chunk, MAX_CONSTANTS};
use crate::bytecode::compiler::Compile;
use crate::bytecode::instruction::OpCode;
use crate::bytecode::object::Heap;
use crate::bytecode::value::Value;
use crate::error::CompileError;

/// Front end that assembles bytecode text. Stateless between calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct Assembler;

impl Assembler {
    pub fn new() -> Self {
        Self
    }
}

impl Compile for Assembler {
    fn compile(&mut self, source: &str, heap: &mut Heap) -> Result<Chunk, CompileError> {
        assemble(source, heap)
    }
}

/// Assemble `source` into a chunk, interning string literals in `heap`.
pub fn assemble(source: &str, heap: &mut Heap) -> Result<Chunk, CompileError> {
    let mut chunk = Chunk::new();
    let mut line_override: Option<u32> = None;

    for (idx, raw_line) in source.lines().enumerate() {
        let source_line = (idx + 1) as u32;
        let text = strip_comment(raw_line).trim();
        if text.is_empty() {
            continue;
        }

        let (mnemonic, rest) = match text.split_once(char::is_whitespace) {
            Some((mnemonic, rest)) => (mnemonic, rest.trim()),
            None => (text, ""),
        };

        if mnemonic.eq_ignore_ascii_case(".line") {
            let line = rest.parse::<u32>().map_err(|_| {
                CompileError::new(format!("Expected a line number, got '{}'.", rest), source_line)
            })?;
            line_override = Some(line);
            continue;
        }

        let line = line_override.unwrap_or(source_line);
        let op = OpCode::from_name(mnemonic).ok_or_else(|| {
            CompileError::new(format!("Unknown instruction '{}'.", mnemonic), source_line)
        })?;

        match op {
            OpCode::Constant => {
                if rest.is_empty() {
                    return Err(CompileError::new("CONSTANT expects a literal.", source_line));
                }
                let value = parse_literal(rest, heap)
                    .map_err(|message| CompileError::new(message, source_line))?;
                if chunk.constants.len() >= MAX_CONSTANTS {
                    return Err(CompileError::new(
                        "Too many constants in one chunk.",
                        source_line,
                    ));
                }
                let index = chunk.add_constant(value);
                chunk.write_op(OpCode::Constant, line);
                chunk.write(index as u8, line);
            }
            _ => {
                if !rest.is_empty() {
                    return Err(CompileError::new(
                        format!("{} takes no operand.", op.name()),
                        source_line,
                    ));
                }
                chunk.write_op(op, line);
            }
        }
    }

    Ok(chunk)
}

/// Cut the line at the first `;` that is not inside a string literal.
fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    let mut escaping = false;
    for (i, b) in line.bytes().enumerate() {
        if escaping {
            escaping = false;
            continue;
        }
        match b {
            b'\\' if in_string => escaping = true,
            b'"' => in_string = !in_string,
            b';' if !in_string => return &line[..i],
            _ => {}
        }
    }
    line
}

fn parse_literal(literal: &str, heap: &mut Heap) -> Result<Value, String> {
    match literal {
        "nil" => return Ok(Value::Nil),
        "true" => return Ok(Value::Bool(true)),
        "false" => return Ok(Value::Bool(false)),
        _ => {}
    }

    if literal.starts_with('"') {
        let chars = parse_string_literal(literal)?;
        return Ok(Value::Obj(heap.copy_string(&chars)));
    }

    literal
        .parse::<f64>()
        .map(Value::Number)
        .map_err(|_| format!("Invalid literal '{}'.", literal))
}

fn parse_string_literal(input: &str) -> Result<Vec<u8>, String> {
    let bytes = input.as_bytes();
    if bytes.len() < 2 || bytes[bytes.len() - 1] != b'"' {
        return Err("Unterminated string.".to_string());
    }

    let mut out = Vec::with_capacity(bytes.len() - 2);
    let mut escaping = false;
    for &b in &bytes[1..bytes.len() - 1] {
        if escaping {
            out.push(match b {
                b'"' => b'"',
                b'\\' => b'\\',
                b'n' => b'\n',
                b't' => b'\t',
                other => return Err(format!("Unknown escape '\\{}'.", other as char)),
            });
            escaping = false;
            continue;
        }
        match b {
            b'\\' => escaping = true,
            b'"' => return Err("Unexpected '\"' inside string.".to_string()),
            _ => out.push(b),
        }
    }

    if escaping {
        return Err("Unterminated string.".to_string());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::disassembler::disassemble_chunk;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_assemble_sample_program() {
        let mut heap = Heap::new();
        let chunk = assemble("constant 1.2\nCONSTANT 3.4\nAdd\nRETURN\n", &mut heap).unwrap();

        assert_eq!(
            chunk.code,
            vec![
                OpCode::Constant as u8,
                0,
                OpCode::Constant as u8,
                1,
                OpCode::Add as u8,
                OpCode::Return as u8
            ]
        );
        assert_eq!(chunk.lines, vec![1, 1, 2, 2, 3, 4]);
        assert_eq!(chunk.constants, vec![Value::Number(1.2), Value::Number(3.4)]);
        assert!(chunk.validate().is_ok());
    }

    #[test]
    fn test_comments_blank_lines_and_line_directive() {
        let mut heap = Heap::new();
        let source = "; header\n\n.line 123\nCONSTANT 1.2 ; the value\nRETURN\n";
        let chunk = assemble(source, &mut heap).unwrap();

        assert_eq!(
            disassemble_chunk(&chunk, &heap, "test"),
            "=== test ===\n\
             0000 0123 CONSTANT            0 '1.2'\n\
             0002    | RETURN\n"
        );
    }

    #[test]
    fn test_string_literals_are_interned() {
        let mut heap = Heap::new();
        let source = "CONSTANT \"a; b\"\nCONSTANT \"a; b\"\nCONSTANT \"say \\\"hi\\\"\\n\"\n";
        let chunk = assemble(source, &mut heap).unwrap();

        assert_eq!(chunk.constants[0], chunk.constants[1]);
        let r = chunk.constants[0].as_obj().unwrap();
        assert_eq!(heap.string(r).unwrap().as_bytes(), b"a; b");
        let r = chunk.constants[2].as_obj().unwrap();
        assert_eq!(heap.string(r).unwrap().as_bytes(), b"say \"hi\"\n");
        assert_eq!(heap.len(), 2);
    }

    #[test]
    fn test_keyword_literals() {
        let mut heap = Heap::new();
        let chunk = assemble("CONSTANT nil\nCONSTANT true\nCONSTANT false", &mut heap).unwrap();
        assert_eq!(
            chunk.constants,
            vec![Value::Nil, Value::Bool(true), Value::Bool(false)]
        );
    }

    #[test]
    fn test_errors_carry_source_line() {
        let mut heap = Heap::new();

        let err = assemble("NIL\nPOP\n", &mut heap).unwrap_err();
        assert_eq!(err, CompileError::new("Unknown instruction 'POP'.", 2));

        let err = assemble("CONSTANT\n", &mut heap).unwrap_err();
        assert_eq!(err.line(), 1);

        let err = assemble("NIL\nNIL\nCONSTANT \"open\n", &mut heap).unwrap_err();
        assert_eq!(err, CompileError::new("Unterminated string.", 3));

        let err = assemble("ADD 1\n", &mut heap).unwrap_err();
        assert_eq!(err.message, "ADD takes no operand.");

        let err = assemble("CONSTANT abc\n", &mut heap).unwrap_err();
        assert_eq!(err.message, "Invalid literal 'abc'.");
    }

    #[test]
    fn test_constant_pool_limit() {
        let mut heap = Heap::new();
        let mut source = String::new();
        for i in 0..=MAX_CONSTANTS {
            source.push_str(&format!("CONSTANT {}\n", i));
        }
        let err = assemble(&source, &mut heap).unwrap_err();
        assert_eq!(err.line(), MAX_CONSTANTS as u32 + 1);
    }
}
