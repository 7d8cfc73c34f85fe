//! The two primitives compiled code calls to talk to the outside world.

use std::io::{self, Read, Write};

/// Called with the current cell on `.`. Has a C signature so that native code can call it.
pub type PutChar = extern "C" fn(u8);
/// Called on `,`; its result is stored in the current cell. May block.
pub type GetChar = extern "C" fn() -> u8;

/// A pair of I/O primitives. Only their addresses end up in generated code.
#[derive(Debug, Clone, Copy)]
pub struct Io {
    pub putchar: PutChar,
    pub getchar: GetChar,
}

impl Io {
    /// Bytes go to `stdout`, and come from `stdin`.
    pub fn stdio() -> Self {
        Io {
            putchar: stdout_putchar,
            getchar: stdin_getchar,
        }
    }
}

/// What `,` reads once input is exhausted: an `int` EOF (-1) truncated to a byte.
pub const EOF_BYTE: u8 = 0xFF;

// Neither primitive may unwind: they are called from code with no unwind tables.

extern "C" fn stdout_putchar(c: u8) {
    if let Err(e) = io::stdout().write_all(&[c]) {
        log::error!("could not write to stdout: {}", e);
    }
}

extern "C" fn stdin_getchar() -> u8 {
    // Whatever was printed so far is probably a prompt for this input.
    if let Err(e) = io::stdout().flush() {
        log::error!("could not flush stdout: {}", e);
    }

    let mut one_byte = [0u8];
    match io::stdin().read_exact(&mut one_byte) {
        Ok(()) => one_byte[0],
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => EOF_BYTE,
        Err(e) => {
            log::error!("could not read from stdin: {}", e);
            EOF_BYTE
        }
    }
}
