//! smed CLI: run a bytecode assembly file, or the built-in sample chunk.

use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use colored::Colorize;
use log::debug;

use smed::bytecode::{print_disassembly, Chunk, InterpretResult, OpCode, Value, Vm};
use smed::config::VmConfig;

/// Exit status for a compile error (EX_DATAERR).
const EXIT_COMPILE_ERROR: i32 = 65;
/// Exit status for a runtime error (EX_SOFTWARE).
const EXIT_RUNTIME_ERROR: i32 = 70;
/// Exit status when the input file cannot be read (EX_IOERR).
const EXIT_IO_ERROR: i32 = 74;

#[derive(Debug, Parser)]
#[command(name = "smed", version, about = "Run bytecode assembly on the smed VM")]
struct Cli {
    /// Print the stack and each instruction as it executes
    #[arg(long)]
    trace: bool,

    /// Print the chunk's disassembly before running it
    #[arg(short, long)]
    disassemble: bool,

    /// Assembly file to run (runs the built-in sample chunk when omitted)
    file: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let mut config = VmConfig::from_env();
    if cli.trace {
        config.trace_execution = true;
    }

    let code = match &cli.file {
        Some(path) => run_file(path, config, cli.disassemble),
        None => run_sample(config),
    };
    process::exit(code);
}

fn run_file(path: &Path, config: VmConfig, disassemble: bool) -> i32 {
    match smed::run_file(path, config, disassemble) {
        Ok(result) => exit_code(result),
        Err(e) => {
            eprintln!(
                "{} Could not read file '{}': {}",
                "Error:".red().bold(),
                path.display(),
                e
            );
            EXIT_IO_ERROR
        }
    }
}

/// CONSTANT 1.2 and RETURN, both on line 123.
fn sample_chunk() -> Chunk {
    let mut chunk = Chunk::new();
    let constant = chunk.add_constant(Value::Number(1.2));
    chunk.write_op(OpCode::Constant, 123);
    chunk.write(constant as u8, 123);
    chunk.write_op(OpCode::Return, 123);
    chunk
}

fn run_sample(config: VmConfig) -> i32 {
    let mut vm = Vm::new().with_config(config);
    let chunk = sample_chunk();
    print_disassembly(&chunk, vm.heap(), "test");

    let result = match vm.run_chunk(chunk) {
        Ok(()) => InterpretResult::Ok,
        Err(_) => InterpretResult::RuntimeError,
    };
    shutdown(vm);
    exit_code(result)
}

fn shutdown(vm: Vm) {
    let freed = vm.free();
    debug!("freed {} objects at exit", freed);
}

fn exit_code(result: InterpretResult) -> i32 {
    match result {
        InterpretResult::Ok => 0,
        InterpretResult::CompileError => EXIT_COMPILE_ERROR,
        InterpretResult::RuntimeError => EXIT_RUNTIME_ERROR,
    }
}
