//! Stack-based virtual machine for executing bytecode.
//!
//! A [`Vm`] owns the object heap (and with it the string interning table),
//! a bounded evaluation stack and the output writers. Chunks are attached
//! for the duration of one run and dropped afterwards; heap objects created
//! during a run stay alive until the VM itself is freed.

use std::io::{self, Write};

use log::{debug, warn};

use crate::bytecode::chunk::Chunk;
use crate::bytecode::compiler::Compile;
use crate::bytecode::disassembler::disassemble_instruction;
use crate::bytecode::instruction::OpCode;
use crate::bytecode::object::{Heap, ObjRef};
use crate::bytecode::value::{values_equal, Value};
use crate::config::VmConfig;
use crate::error::{CompileError, RuntimeError};

/// Maximum stack size.
pub const STACK_MAX: usize = 256;

/// Result type for VM operations.
pub type VMResult<T> = Result<T, RuntimeError>;

/// Outcome of [`Vm::interpret`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpretResult {
    Ok,
    CompileError,
    RuntimeError,
}

/// The bytecode VM.
pub struct Vm<W: Write = io::Stdout, E: Write = io::Stderr> {
    /// Chunk being executed; empty between runs.
    chunk: Chunk,
    /// Offset of the next byte to fetch.
    ip: usize,
    /// Offset of the opcode currently being executed.
    op_offset: usize,
    stack: Vec<Value>,
    heap: Heap,
    config: VmConfig,
    out: W,
    err: E,
}

impl Vm {
    /// Create a VM writing to stdout/stderr, configured from the environment.
    pub fn new() -> Self {
        Self::with_writers(io::stdout(), io::stderr()).with_config(VmConfig::from_env())
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write, E: Write> Vm<W, E> {
    /// Create a VM writing program output to `out` and diagnostics to `err`.
    pub fn with_writers(out: W, err: E) -> Self {
        debug!("vm initialized (stack capacity {})", STACK_MAX);
        Self {
            chunk: Chunk::new(),
            ip: 0,
            op_offset: 0,
            stack: Vec::with_capacity(STACK_MAX),
            heap: Heap::new(),
            config: VmConfig::default(),
            out,
            err,
        }
    }

    pub fn with_config(mut self, config: VmConfig) -> Self {
        self.config = config;
        self
    }

    /// Current stack contents, bottom first.
    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Mutable heap access, for front ends and hosts that intern strings.
    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn error_output(&self) -> &E {
        &self.err
    }

    /// Compile `source` with `compiler` and run the resulting chunk.
    pub fn interpret<C>(&mut self, compiler: &mut C, source: &str) -> InterpretResult
    where
        C: Compile + ?Sized,
    {
        let chunk = match compiler.compile(source, &mut self.heap) {
            Ok(chunk) => chunk,
            Err(err) => {
                debug!("compile failed at line {}: {}", err.line, err.message);
                self.report_compile_error(&err);
                return InterpretResult::CompileError;
            }
        };

        match self.run_chunk(chunk) {
            Ok(()) => InterpretResult::Ok,
            Err(_) => InterpretResult::RuntimeError,
        }
    }

    /// Attach `chunk`, run it to completion and detach it.
    ///
    /// A runtime error has already been written to the error stream and the
    /// stack has been reset when this returns `Err`.
    pub fn run_chunk(&mut self, chunk: Chunk) -> VMResult<()> {
        debug!(
            "attached chunk ({} bytes, {} constants)",
            chunk.len(),
            chunk.constants.len()
        );
        self.chunk = chunk;
        self.ip = 0;
        self.op_offset = 0;

        let result = self.run();
        if let Err(err) = &result {
            debug!("runtime error at line {}: {}", err.line(), err);
            self.report_runtime_error(err);
            self.reset_stack();
        }

        self.chunk = Chunk::new();
        debug!("detached chunk");
        result
    }

    /// Free every heap object. Returns the number of objects released.
    pub fn free(mut self) -> usize {
        self.heap.free_objects()
    }

    /// Main execution loop.
    fn run(&mut self) -> VMResult<()> {
        loop {
            if self.config.trace_execution && self.ip < self.chunk.code.len() {
                self.trace_instruction()?;
            }

            self.op_offset = self.ip;
            let opcode = self.read_opcode()?;

            match opcode {
                OpCode::Constant => {
                    let value = self.read_constant()?;
                    self.push(value)?;
                }
                OpCode::Nil => self.push(Value::Nil)?,
                OpCode::True => self.push(Value::Bool(true))?,
                OpCode::False => self.push(Value::Bool(false))?,

                OpCode::Equal => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    self.push(Value::Bool(values_equal(a, b)))?;
                }
                OpCode::Greater => self.binary_number_op(|a, b| Value::Bool(a > b))?,
                OpCode::Less => self.binary_number_op(|a, b| Value::Bool(a < b))?,

                OpCode::Add => match (self.peek(1)?, self.peek(0)?) {
                    (Value::Number(a), Value::Number(b)) => {
                        self.pop()?;
                        self.pop()?;
                        self.push(Value::Number(a + b))?;
                    }
                    (Value::Obj(a), Value::Obj(b))
                        if self.heap.is_string(a) && self.heap.is_string(b) =>
                    {
                        self.concatenate(a, b)?;
                    }
                    _ => {
                        return Err(RuntimeError::OperandsMustBeNumbersOrStrings {
                            line: self.current_line(),
                        })
                    }
                },
                OpCode::Sub => match (self.peek(1)?, self.peek(0)?) {
                    (Value::Number(a), Value::Number(b)) => {
                        self.pop()?;
                        self.pop()?;
                        self.push(Value::Number(a - b))?;
                    }
                    (Value::Obj(a), Value::Number(count)) if self.heap.is_string(a) => {
                        self.trim(a, count)?;
                    }
                    _ => {
                        return Err(RuntimeError::OperandsMustBeNumbersOrStrings {
                            line: self.current_line(),
                        })
                    }
                },
                OpCode::Mul => self.binary_number_op(|a, b| Value::Number(a * b))?,
                OpCode::Div => self.binary_number_op(|a, b| Value::Number(a / b))?,

                OpCode::Not => {
                    let value = self.pop()?;
                    self.push(Value::Bool(value.is_falsey()))?;
                }
                OpCode::Negate => match self.peek(0)? {
                    Value::Number(n) => {
                        self.pop()?;
                        self.push(Value::Number(-n))?;
                    }
                    _ => {
                        return Err(RuntimeError::NegateNonNumber {
                            line: self.current_line(),
                        })
                    }
                },

                OpCode::Return => {
                    let value = self.pop()?;
                    let line = self.current_line();
                    writeln!(self.out, "{}", value.display(&self.heap))
                        .and_then(|()| self.out.flush())
                        .map_err(|e| RuntimeError::io(e, line))?;
                    return Ok(());
                }
            }
        }
    }

    /// String + string: intern the concatenation of both contents.
    fn concatenate(&mut self, a: ObjRef, b: ObjRef) -> VMResult<()> {
        let a_bytes = self.string_bytes(a);
        let b_bytes = self.string_bytes(b);
        let mut chars = Vec::with_capacity(a_bytes.len() + b_bytes.len());
        chars.extend_from_slice(a_bytes);
        chars.extend_from_slice(b_bytes);

        self.pop()?;
        self.pop()?;
        let result = self.heap.take_string(chars);
        self.push(Value::Obj(result))
    }

    /// String - number. With `n` the truncated count and `L` the length:
    /// `begin = L - n`, `keep = n` clamped to `L - begin`; the bytes past
    /// `begin + keep` shift down to `begin`, then the first `keep` bytes of
    /// the buffer become the result.
    ///
    /// The shift runs on a scratch copy: interned strings are never mutated.
    fn trim(&mut self, a: ObjRef, count: f64) -> VMResult<()> {
        let mut chars = self.string_bytes(a).to_vec();
        let length = chars.len();

        let n = count.trunc();
        if !(0.0..=length as f64).contains(&n) {
            return Err(RuntimeError::TrimOutOfRange {
                count,
                length,
                line: self.current_line(),
            });
        }
        let n = n as usize;
        let begin = length - n;
        let mut keep = n;
        if begin + keep > length {
            keep = length - begin;
        }

        chars.copy_within(begin + keep..length, begin);
        chars.truncate(keep);

        self.pop()?;
        self.pop()?;
        let result = self.heap.take_string(chars);
        self.push(Value::Obj(result))
    }

    fn string_bytes(&self, r: ObjRef) -> &[u8] {
        self.heap.string(r).map(|s| s.as_bytes()).unwrap_or_default()
    }

    fn binary_number_op<F>(&mut self, op: F) -> VMResult<()>
    where
        F: FnOnce(f64, f64) -> Value,
    {
        match (self.peek(1)?, self.peek(0)?) {
            (Value::Number(a), Value::Number(b)) => {
                self.pop()?;
                self.pop()?;
                self.push(op(a, b))
            }
            _ => Err(RuntimeError::OperandsMustBeNumbers {
                line: self.current_line(),
            }),
        }
    }

    // ===== Helper methods =====

    fn current_line(&self) -> u32 {
        self.chunk.line_at(self.op_offset)
    }

    fn read_byte(&mut self) -> Option<u8> {
        let byte = self.chunk.code.get(self.ip).copied()?;
        self.ip += 1;
        Some(byte)
    }

    fn read_opcode(&mut self) -> VMResult<OpCode> {
        let byte = self.read_byte().ok_or_else(|| RuntimeError::UnexpectedEndOfCode {
            line: self.chunk.lines.last().copied().unwrap_or(0),
        })?;
        OpCode::from_u8(byte).ok_or(RuntimeError::UnknownOpcode {
            opcode: byte,
            line: self.current_line(),
        })
    }

    fn read_constant(&mut self) -> VMResult<Value> {
        let index = self.read_byte().ok_or(RuntimeError::TruncatedInstruction {
            line: self.current_line(),
        })?;
        self.chunk
            .constants
            .get(index as usize)
            .copied()
            .ok_or(RuntimeError::ConstantOutOfRange {
                index,
                line: self.current_line(),
            })
    }

    fn push(&mut self, value: Value) -> VMResult<()> {
        if self.stack.len() >= STACK_MAX {
            return Err(RuntimeError::StackOverflow {
                line: self.current_line(),
            });
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> VMResult<Value> {
        self.stack.pop().ok_or(RuntimeError::StackUnderflow {
            line: self.current_line(),
        })
    }

    fn peek(&self, distance: usize) -> VMResult<Value> {
        self.stack
            .len()
            .checked_sub(1 + distance)
            .map(|index| self.stack[index])
            .ok_or(RuntimeError::StackUnderflow {
                line: self.current_line(),
            })
    }

    fn reset_stack(&mut self) {
        self.stack.clear();
    }

    fn trace_instruction(&mut self) -> VMResult<()> {
        let mut trace = String::from("          ");
        for slot in &self.stack {
            trace.push_str(&format!("[ {} ]", slot.display(&self.heap)));
        }
        trace.push('\n');
        disassemble_instruction(&self.chunk, &self.heap, self.ip, &mut trace);

        let line = self.chunk.line_at(self.ip);
        self.out
            .write_all(trace.as_bytes())
            .map_err(|e| RuntimeError::io(e, line))
    }

    fn report_runtime_error(&mut self, err: &RuntimeError) {
        let line = err.line();
        self.report(&err.to_string(), line);
    }

    fn report_compile_error(&mut self, err: &CompileError) {
        self.report(&err.message, err.line);
    }

    fn report(&mut self, message: &str, line: u32) {
        let written = write!(self.err, "{}\n[line {}] in script\n", message, line)
            .and_then(|()| self.err.flush());
        if let Err(e) = written {
            warn!("failed to write diagnostic: {}", e);
        }
    }
}

impl<W: Write, E: Write> Drop for Vm<W, E> {
    fn drop(&mut self) {
        let freed = self.heap.free_objects();
        if freed > 0 {
            debug!("vm teardown freed {} objects", freed);
        }
    }
}
