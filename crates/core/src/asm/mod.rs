//! Instruction encoders.
//!
//! The translator never writes an opcode itself. It asks a [Target] for abstract operations
//! ("move the pointer by d", "call output", ...) and the target decides which bytes that takes.

use std::borrow::BorrowMut;

use crate::emitter::{CodeBufferFull, Emitter};

pub mod x86_64;

/// Result of emitting one operation.
pub type Emit = Result<(), CodeBufferFull>;

/// Something that knows how to encode each operation of the tape language.
///
/// Loops are split in two: the target emits the test and the opcode of each jump, and the caller
/// (the [crate::branch::BranchResolver]) appends and patches the 32-bit displacement that follows
/// it. Displacements are measured from the end of that field.
pub trait Target {
    /// Emitted once, before the first operation. Entry point of the compiled code.
    fn prologue<B: BorrowMut<[u8]>>(&mut self, code: &mut Emitter<B>) -> Emit;

    /// Emitted once, after the last operation: returns to the caller.
    fn epilogue<B: BorrowMut<[u8]>>(&mut self, code: &mut Emitter<B>) -> Emit;

    /// Data pointer one cell to the right.
    fn increment_pointer<B: BorrowMut<[u8]>>(&mut self, code: &mut Emitter<B>) -> Emit;

    /// Data pointer one cell to the left.
    fn decrement_pointer<B: BorrowMut<[u8]>>(&mut self, code: &mut Emitter<B>) -> Emit;

    /// Data pointer moves by `delta` cells.
    fn add_to_pointer<B: BorrowMut<[u8]>>(&mut self, code: &mut Emitter<B>, delta: i32) -> Emit;

    fn increment_cell<B: BorrowMut<[u8]>>(&mut self, code: &mut Emitter<B>) -> Emit;

    fn decrement_cell<B: BorrowMut<[u8]>>(&mut self, code: &mut Emitter<B>) -> Emit;

    /// Current cell += `delta` (mod 256).
    fn add_to_cell<B: BorrowMut<[u8]>>(&mut self, code: &mut Emitter<B>, delta: u8) -> Emit;

    /// Passes the current cell to the output primitive.
    fn output<B: BorrowMut<[u8]>>(&mut self, code: &mut Emitter<B>) -> Emit;

    /// Stores the result of the input primitive in the current cell.
    fn input<B: BorrowMut<[u8]>>(&mut self, code: &mut Emitter<B>) -> Emit;

    /// Tests the current cell, then the opcode of a "jump if zero". A rel32 must follow.
    fn jump_if_zero<B: BorrowMut<[u8]>>(&mut self, code: &mut Emitter<B>) -> Emit;

    /// Opcode of an unconditional jump. A rel32 must follow.
    fn jump<B: BorrowMut<[u8]>>(&mut self, code: &mut Emitter<B>) -> Emit;
}
