//! Defines and implements a "bytecode" target and its interpreter.
//!
//! The translator emits bytecode exactly the way it emits machine code: through the [Target]
//! trait, into an [Emitter], with the same rel32 jumps patched by the same
//! [crate::branch::BranchResolver]. Only the encoding differs, and the result is run by a loop in
//! Rust instead of by the CPU.
//!
//! Since this is platform-independent code, it will run on any platform, unlike the JIT compiler!

use std::borrow::BorrowMut;

use crate::asm::{Emit, Target};
use crate::emitter::Emitter;
use crate::errors::RuntimeError;
use crate::program::Io;
use crate::tape::Tape;

/// One byte per operation, followed by its operand, if any.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Halt = 0x00,
    IncrementPointer = 0x01,
    DecrementPointer = 0x02,
    /// Followed by an i32.
    AddToPointer = 0x03,
    IncrementCell = 0x04,
    DecrementCell = 0x05,
    /// Followed by a u8.
    AddToCell = 0x06,
    Output = 0x07,
    Input = 0x08,
    /// Followed by a rel32.
    JumpIfZero = 0x09,
    /// Followed by a rel32.
    Jump = 0x0A,
}

impl TryFrom<u8> for Opcode {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        use Opcode::*;
        Ok(match byte {
            0x00 => Halt,
            0x01 => IncrementPointer,
            0x02 => DecrementPointer,
            0x03 => AddToPointer,
            0x04 => IncrementCell,
            0x05 => DecrementCell,
            0x06 => AddToCell,
            0x07 => Output,
            0x08 => Input,
            0x09 => JumpIfZero,
            0x0A => Jump,
            other => return Err(other),
        })
    }
}

/// Encodes each operation as an [Opcode]. Needs no host constants: the interpreter is handed the
/// tape and I/O when it runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytecodeTarget;

impl Target for BytecodeTarget {
    fn prologue<B: BorrowMut<[u8]>>(&mut self, _code: &mut Emitter<B>) -> Emit {
        Ok(())
    }

    fn epilogue<B: BorrowMut<[u8]>>(&mut self, code: &mut Emitter<B>) -> Emit {
        code.emit(Opcode::Halt as u8)
    }

    fn increment_pointer<B: BorrowMut<[u8]>>(&mut self, code: &mut Emitter<B>) -> Emit {
        code.emit(Opcode::IncrementPointer as u8)
    }

    fn decrement_pointer<B: BorrowMut<[u8]>>(&mut self, code: &mut Emitter<B>) -> Emit {
        code.emit(Opcode::DecrementPointer as u8)
    }

    fn add_to_pointer<B: BorrowMut<[u8]>>(&mut self, code: &mut Emitter<B>, delta: i32) -> Emit {
        let [a, b, c, d] = delta.to_le_bytes();
        code.emit_bytes(&[Opcode::AddToPointer as u8, a, b, c, d])
    }

    fn increment_cell<B: BorrowMut<[u8]>>(&mut self, code: &mut Emitter<B>) -> Emit {
        code.emit(Opcode::IncrementCell as u8)
    }

    fn decrement_cell<B: BorrowMut<[u8]>>(&mut self, code: &mut Emitter<B>) -> Emit {
        code.emit(Opcode::DecrementCell as u8)
    }

    fn add_to_cell<B: BorrowMut<[u8]>>(&mut self, code: &mut Emitter<B>, delta: u8) -> Emit {
        code.emit_bytes(&[Opcode::AddToCell as u8, delta])
    }

    fn output<B: BorrowMut<[u8]>>(&mut self, code: &mut Emitter<B>) -> Emit {
        code.emit(Opcode::Output as u8)
    }

    fn input<B: BorrowMut<[u8]>>(&mut self, code: &mut Emitter<B>) -> Emit {
        code.emit(Opcode::Input as u8)
    }

    fn jump_if_zero<B: BorrowMut<[u8]>>(&mut self, code: &mut Emitter<B>) -> Emit {
        code.emit(Opcode::JumpIfZero as u8)
    }

    fn jump<B: BorrowMut<[u8]>>(&mut self, code: &mut Emitter<B>) -> Emit {
        code.emit(Opcode::Jump as u8)
    }
}

/// A program that is dynamically interpreted from bytecode.
#[derive(Debug, Clone)]
pub struct InterpretedProgram {
    bytecode: Vec<u8>,
}

impl InterpretedProgram {
    pub fn new(bytecode: Vec<u8>) -> Self {
        InterpretedProgram { bytecode }
    }

    pub fn bytecode(&self) -> &[u8] {
        &self.bytecode
    }

    /// Runs the program to completion on the given tape. The data pointer starts at cell 0.
    pub fn run(&self, tape: &mut Tape, io: Io) -> Result<(), RuntimeError> {
        use Opcode::*;

        let universe = tape.cells_mut();
        // Not even cell 0 exists.
        if universe.is_empty() {
            return Err(RuntimeError::PointerOutOfBounds);
        }

        let mut current_address = 0usize;
        let mut program_counter = 0usize;

        while program_counter < self.bytecode.len() {
            let byte = self.bytecode[program_counter];
            let opcode = Opcode::try_from(byte).map_err(|opcode| RuntimeError::InvalidBytecode {
                opcode,
                offset: program_counter,
            })?;

            program_counter = match opcode {
                Halt => return Ok(()),
                IncrementPointer => {
                    current_address = move_pointer(universe.len(), current_address, 1)?;
                    program_counter + 1
                }
                DecrementPointer => {
                    current_address = move_pointer(universe.len(), current_address, -1)?;
                    program_counter + 1
                }
                AddToPointer => {
                    let delta = self.operand32(program_counter)?;
                    current_address = move_pointer(universe.len(), current_address, delta)?;
                    program_counter + 5
                }
                IncrementCell => {
                    universe[current_address] = universe[current_address].wrapping_add(1);
                    program_counter + 1
                }
                DecrementCell => {
                    universe[current_address] = universe[current_address].wrapping_sub(1);
                    program_counter + 1
                }
                AddToCell => {
                    let delta = self.operand8(program_counter)?;
                    universe[current_address] = universe[current_address].wrapping_add(delta);
                    program_counter + 2
                }
                Output => {
                    (io.putchar)(universe[current_address]);
                    program_counter + 1
                }
                Input => {
                    universe[current_address] = (io.getchar)();
                    program_counter + 1
                }
                JumpIfZero => {
                    let next = program_counter + 5;
                    if universe[current_address] == 0 {
                        self.jump_target(program_counter, next)?
                    } else {
                        next
                    }
                }
                Jump => self.jump_target(program_counter, program_counter + 5)?,
            }
        }

        Ok(())
    }

    fn operand8(&self, program_counter: usize) -> Result<u8, RuntimeError> {
        self.bytecode
            .get(program_counter + 1)
            .copied()
            .ok_or_else(|| self.invalid_at(program_counter))
    }

    fn operand32(&self, program_counter: usize) -> Result<i32, RuntimeError> {
        let bytes = self
            .bytecode
            .get(program_counter + 1..program_counter + 5)
            .ok_or_else(|| self.invalid_at(program_counter))?;

        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Resolves the rel32 of the jump at `program_counter`, relative to `next`. The target may be
    /// the end of the bytecode, but not beyond it.
    fn jump_target(&self, program_counter: usize, next: usize) -> Result<usize, RuntimeError> {
        let rel = self.operand32(program_counter)?;
        match usize::try_from(next as i64 + rel as i64) {
            Ok(target) if target <= self.bytecode.len() => Ok(target),
            _ => Err(self.invalid_at(program_counter)),
        }
    }

    fn invalid_at(&self, offset: usize) -> RuntimeError {
        RuntimeError::InvalidBytecode {
            opcode: self.bytecode[offset],
            offset,
        }
    }
}

/// Same policy as the native code: leaving the tape is an error, not a wrap-around.
fn move_pointer(tape_len: usize, address: usize, delta: i32) -> Result<usize, RuntimeError> {
    let address = address as i64 + delta as i64;
    if address < 0 || address >= tape_len as i64 {
        return Err(RuntimeError::PointerOutOfBounds);
    }

    Ok(address as usize)
}
