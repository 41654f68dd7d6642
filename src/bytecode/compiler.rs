//! Boundary between the VM and a compiler front end.
//!
//! The VM does not know how source text becomes bytecode. Anything that can
//! fill a [`Chunk`] from a source string implements [`Compile`]; string
//! literals it produces must be interned through the VM's [`Heap`] so that
//! identity comparison keeps working at runtime.

use crate::bytecode::chunk::Chunk;
use crate::bytecode::object::Heap;
use crate::error::CompileError;

/// A front end that turns source text into a chunk.
///
/// On success the chunk must satisfy [`Chunk::validate`]; the VM traps
/// instead of misbehaving if it does not, but it does not re-check up front.
pub trait Compile {
    fn compile(&mut self, source: &str, heap: &mut Heap) -> Result<Chunk, CompileError>;
}

impl<F> Compile for F
where
    F: FnMut(&str, &mut Heap) -> Result<Chunk, CompileError>,
{
    fn compile(&mut self, source: &str, heap: &mut Heap) -> Result<Chunk, CompileError> {
        self(source, heap)
    }
}
