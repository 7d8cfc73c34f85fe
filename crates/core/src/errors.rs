//! All errors that can be _generated_ by the compiler, and by the programs it compiles.
use std::fmt;

use mmap_jit::MappingError;

use crate::emitter::CodeBufferFull;

/// Any error that occurs as a result of compiling the source code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationError {
    reason: Reason,
    location: Location,
}

/// Where in the source code something went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    /// Byte offset into the source.
    offset: usize,
    line_no: u32,
    column: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    /// A `]` with no `[` to close.
    TooManyCloseBrackets,
    /// Source ended while this many loops were still open.
    NotEnoughCloseBrackets { open_loops: usize },
    /// A `[` would nest deeper than allowed.
    NestingTooDeep { max_depth: usize },
    /// Generated code does not fit in the code buffer.
    CodeBufferFull { capacity: usize },
}

impl CompilationError {
    pub fn new(reason: Reason, location: Location) -> Self {
        CompilationError { reason, location }
    }

    pub fn reason(&self) -> Reason {
        self.reason
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn message(&self) -> String {
        self.reason.message()
    }

    pub fn message_identifier(&self) -> u32 {
        self.reason.message_identifier()
    }
}

impl Reason {
    pub fn message_identifier(&self) -> u32 {
        use Reason::*;
        match self {
            TooManyCloseBrackets => 0x001,
            NotEnoughCloseBrackets { .. } => 0x002,
            NestingTooDeep { .. } => 0x003,
            CodeBufferFull { .. } => 0x004,
        }
    }

    pub fn message(&self) -> String {
        use Reason::*;
        match self {
            TooManyCloseBrackets => {
                String::from("too many ']' brackets. Check that each '[' has a matching ']'")
            }
            NotEnoughCloseBrackets { open_loops: 1 } => {
                String::from("1 '[' bracket was never closed. Check that each '[' has a matching ']'")
            }
            NotEnoughCloseBrackets { open_loops } => format!(
                "{} '[' brackets were never closed. Check that each '[' has a matching ']'",
                open_loops
            ),
            NestingTooDeep { max_depth } => {
                format!("loops are nested more than {} levels deep", max_depth)
            }
            CodeBufferFull { capacity } => format!(
                "generated code does not fit in the {} byte code buffer",
                capacity
            ),
        }
    }
}

impl From<CodeBufferFull> for Reason {
    fn from(full: CodeBufferFull) -> Self {
        Reason::CodeBufferFull {
            capacity: full.capacity,
        }
    }
}

impl Location {
    pub fn new(offset: usize, line_no: u32, column: u32) -> Self {
        Location {
            offset,
            line_no,
            column,
        }
    }

    /// Finds the line and column of the given byte offset.
    pub fn in_source(source: &[u8], offset: usize) -> Self {
        let before = &source[..offset.min(source.len())];
        let line_no = 1 + before.iter().filter(|&&b| b == b'\n').count() as u32;
        let line_start = before
            .iter()
            .rposition(|&b| b == b'\n')
            .map(|newline| newline + 1)
            .unwrap_or(0);
        let column = 1 + (before.len() - line_start) as u32;

        Location::new(offset, line_no, column)
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl std::error::Error for CompilationError {}

impl fmt::Display for CompilationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "error[{:04x}]:{}: {}",
            self.message_identifier(),
            self.location,
            self.message()
        )
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.line_no, self.column)
    }
}

/// Limits that make no sense, caught before anything is allocated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("the tape must have between 1 and {max} cells (got {got})")]
    TapeLength { got: usize, max: usize },
    #[error("the code buffer must hold between 1 and {max} bytes (got {got})")]
    CodeCapacity { got: usize, max: usize },
}

/// Anything that can stop [crate::jit_compile] from handing back a runnable program.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("could not allocate executable memory: {0}")]
    Allocation(#[from] MappingError),
    #[error(transparent)]
    Compilation(#[from] CompilationError),
    #[error("native code generation needs an x86-64 unix host, not {0}")]
    UnsupportedHost(&'static str),
}

/// Errors raised while a compiled program runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    #[error("runtime error: the data pointer moved off the tape")]
    PointerOutOfBounds,
    #[error("runtime error: invalid bytecode {opcode:#04x} at offset {offset}")]
    InvalidBytecode { opcode: u8, offset: usize },
    #[error("runtime error: compiled code returned unknown status {0}")]
    UnknownStatus(u32),
}
