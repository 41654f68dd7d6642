//! smed: the runtime core of a small dynamically-typed scripting language.
//!
//! This is the library root that exports all modules.
//!
//! A front end implementing [`bytecode::Compile`] turns source text into a
//! [`bytecode::Chunk`]; the [`bytecode::Vm`] executes it. The crate ships one
//! front end, a textual [`bytecode::Assembler`].

#![allow(clippy::new_without_default)]
#![allow(clippy::unnecessary_cast)]

pub mod bytecode;
pub mod config;
pub mod error;

use std::io::Write;
use std::path::Path;

use log::debug;

pub use bytecode::{Assembler, Chunk, InterpretResult, OpCode, Value, Vm};
pub use config::VmConfig;
pub use error::{ChunkError, CompileError, RuntimeError, SmedError};

/// Assemble and run `source` on `vm`, optionally printing the chunk's
/// disassembly under `name` first.
pub fn run_source<W: Write, E: Write>(
    vm: &mut Vm<W, E>,
    source: &str,
    name: &str,
    disassemble: bool,
) -> InterpretResult {
    let mut front_end = |source: &str, heap: &mut bytecode::Heap| -> Result<Chunk, CompileError> {
        let chunk = bytecode::assemble(source, heap)?;
        if disassemble {
            bytecode::print_disassembly(&chunk, heap, name);
        }
        Ok(chunk)
    };
    vm.interpret(&mut front_end, source)
}

/// Read an assembly file and run it on a fresh VM writing to stdout/stderr.
pub fn run_file(
    path: &Path,
    config: VmConfig,
    disassemble: bool,
) -> Result<InterpretResult, SmedError> {
    let source = std::fs::read_to_string(path)?;

    let mut vm = Vm::new().with_config(config);
    let result = run_source(&mut vm, &source, &path.display().to_string(), disassemble);
    let freed = vm.free();
    debug!("freed {} objects after {}", freed, path.display());
    Ok(result)
}
