//! Fixed limits for a compilation, decided once before it starts.

use crate::emitter::MAX_CODE_CAPACITY;
use crate::errors::ConfigError;

/// Largest tape the generated code can index: the bounds check compares against an imm32.
pub const MAX_TAPE_LEN: usize = i32::MAX as usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Size of the code buffer, in bytes.
    pub code_capacity: usize,
    /// How many loops may be open at once. Zero forbids loops altogether.
    pub max_loop_depth: usize,
    /// Number of cells on the tape.
    pub tape_len: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            code_capacity: 1 << 16,
            max_loop_depth: 256,
            tape_len: 30_000,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tape_len == 0 || self.tape_len > MAX_TAPE_LEN {
            return Err(ConfigError::TapeLength {
                got: self.tape_len,
                max: MAX_TAPE_LEN,
            });
        }

        if self.code_capacity == 0 || self.code_capacity > MAX_CODE_CAPACITY {
            return Err(ConfigError::CodeCapacity {
                got: self.code_capacity,
                max: MAX_CODE_CAPACITY,
            });
        }

        Ok(())
    }
}
