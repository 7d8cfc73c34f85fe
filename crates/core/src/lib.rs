//! brainjit internals.
//!
//! Compiles programs in the eight-symbol tape language (`<>+-.,[]`) straight to machine code,
//! in a single pass, and runs that code in place. The pipeline is:
//!
//!  - the [Translator] scans the source once, folding runs of `<>` and `+-` into single
//!    operations;
//!  - it asks a [Target] to encode each operation into an [Emitter], a fixed-capacity buffer;
//!  - loops go through the [BranchResolver], which leaves a placeholder for every forward jump
//!    and patches it when the matching `]` shows up;
//!  - the filled buffer becomes executable, and is called like a function ([CompiledProgram]).
//!
//! The native target is x86-64 ([asm::x86_64]). The same translator can also produce portable
//! [bytecode], which is run by an interpreter; that's what [compile_to_bytecode] does.

extern crate mmap_jit;

pub mod asm;
pub mod branch;
pub mod bytecode;
pub mod config;
pub mod emitter;
pub mod errors;
pub mod program;
pub mod tape;
pub mod translate;

mod jit;

pub use crate::asm::Target;
pub use crate::branch::{BranchRecord, BranchResolver};
pub use crate::bytecode::{BytecodeTarget, InterpretedProgram};
pub use crate::config::Config;
pub use crate::emitter::Emitter;
pub use crate::errors::{CompilationError, ConfigError, Error, Location, Reason, RuntimeError};
pub use crate::jit::{CompiledProgram, NATIVE_SUPPORTED};
pub use crate::program::{GetChar, Io, PutChar};
pub use crate::tape::Tape;
pub use crate::translate::Translator;

/// Compile the source down to bytecode, that can then be interpreted.
///
/// Bytecode is held to the same limits as native code, `code_capacity` included.
pub fn compile_to_bytecode(source: &[u8], config: &Config) -> Result<InterpretedProgram, Error> {
    config.validate()?;

    let mut code = Emitter::new(vec![0u8; config.code_capacity]);
    Translator::new(BytecodeTarget, &mut code, config.max_loop_depth).translate(source)?;

    let (mut bytecode, len) = code.into_inner();
    bytecode.truncate(len);

    Ok(InterpretedProgram::new(bytecode))
}

/// Compile the source to native code, injected into the current process's image, with I/O on
/// `stdin` and `stdout`.
pub fn jit_compile(source: &[u8], config: &Config) -> Result<CompiledProgram, Error> {
    jit::compile(source, config, Io::stdio())
}

/// Like [jit_compile], with I/O primitives of your choosing.
pub fn jit_compile_with_io(
    source: &[u8],
    config: &Config,
    io: Io,
) -> Result<CompiledProgram, Error> {
    jit::compile(source, config, io)
}
