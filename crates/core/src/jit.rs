//! The execution host: from source to a running native program.

use mmap_jit::{as_function, ExecutableRegion, WritableRegion};

use crate::asm::x86_64::{HostConstants, X86_64, STATUS_OK, STATUS_POINTER_OUT_OF_BOUNDS};
use crate::config::Config;
use crate::emitter::Emitter;
use crate::errors::{Error, RuntimeError};
use crate::program::Io;
use crate::tape::Tape;
use crate::translate::Translator;

/// Signature of the generated code: no arguments, returns a status.
type EntryPoint = unsafe extern "C" fn() -> u32;

/// Whether this host can run the code [X86_64] generates.
pub const NATIVE_SUPPORTED: bool = cfg!(all(target_arch = "x86_64", unix));

/// Native code, ready to run, together with the tape it was compiled against.
///
/// Only [compile] creates these, and only after a successful compilation: a value of this type is
/// proof that every loop was closed and the code was completely written.
pub struct CompiledProgram {
    code: ExecutableRegion,
    code_len: usize,
    tape: Tape,
}

impl CompiledProgram {
    /// The generated machine code.
    pub fn code(&self) -> &[u8] {
        &self.code[..self.code_len]
    }

    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    /// Runs the program on the calling thread until it finishes, which may be never.
    ///
    /// The tape is not reset between runs, but the data pointer starts at cell 0 every time.
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        assert!(NATIVE_SUPPORTED, "compiled code cannot run on this host");
        assert!(
            self.code_len > 0 && self.code_len <= self.code.len(),
            "code region is not completely written"
        );

        // SAFETY: the region is read+execute (ExecutableRegion), holds a complete function with
        // the System V signature of EntryPoint, and outlives the call. The only memory the code
        // writes is the tape, which `&mut self` keeps exclusive for the duration of the call.
        let status = unsafe {
            let entry = as_function!(self.code, EntryPoint);
            entry()
        };

        match status {
            STATUS_OK => Ok(()),
            STATUS_POINTER_OUT_OF_BOUNDS => Err(RuntimeError::PointerOutOfBounds),
            other => Err(RuntimeError::UnknownStatus(other)),
        }
    }
}

/// Allocates the code buffer and a fresh tape, compiles `source` into the buffer, and makes it
/// executable.
pub fn compile(source: &[u8], config: &Config, io: Io) -> Result<CompiledProgram, Error> {
    config.validate()?;
    if !NATIVE_SUPPORTED {
        return Err(Error::UnsupportedHost(std::env::consts::ARCH));
    }

    // Allocation failures surface before any compilation happens.
    let region = WritableRegion::allocate(config.code_capacity)?;
    let tape = Tape::new(config.tape_len);

    let host = HostConstants {
        tape_base: tape.base_address() as u64,
        tape_len: tape.len() as u32,
        putchar: io.putchar as usize as u64,
        getchar: io.getchar as usize as u64,
    };

    let mut code = Emitter::new(region);
    // On error the writable region is dropped (and unmapped) without ever becoming executable.
    Translator::new(X86_64::new(host), &mut code, config.max_loop_depth).translate(source)?;

    let (region, code_len) = code.into_inner();
    let code = region.into_executable()?;
    log::debug!(
        "{} bytes of machine code at {:p}",
        code_len,
        code.addr()
    );

    Ok(CompiledProgram {
        code,
        code_len,
        tape,
    })
}
