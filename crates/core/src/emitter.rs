//! Append-only writer for generated code.

use std::borrow::{Borrow, BorrowMut};

/// Largest capacity an [Emitter] will use. Any two offsets below this are at most a rel32 apart.
pub const MAX_CODE_CAPACITY: usize = i32::MAX as usize;

/// Returned when a write would run past the end of the code buffer. Nothing is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeBufferFull {
    pub capacity: usize,
}

/// Writes little-endian values into a fixed-capacity buffer, one after another.
///
/// The buffer can be anything that borrows as a mutable byte slice: a
/// [mmap_jit::WritableRegion] when compiling for real, a `Vec<u8>` or an array in tests.
pub struct Emitter<B> {
    buffer: B,
    capacity: usize,
    cursor: usize,
}

impl<B: BorrowMut<[u8]>> Emitter<B> {
    /// Wraps the buffer. Its current length is the capacity; it can never grow.
    pub fn new(buffer: B) -> Self {
        let capacity = buffer.borrow().len().min(MAX_CODE_CAPACITY);
        Emitter {
            buffer,
            capacity,
            cursor: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Offset of the next byte to be written, relative to the start of the buffer.
    pub fn offset(&self) -> usize {
        self.cursor
    }

    /// Everything written so far.
    pub fn code(&self) -> &[u8] {
        &self.buffer.borrow()[..self.cursor]
    }

    /// Gives the buffer back, along with how many bytes of it were written.
    pub fn into_inner(self) -> (B, usize) {
        (self.buffer, self.cursor)
    }

    pub fn emit(&mut self, byte: u8) -> Result<(), CodeBufferFull> {
        self.emit_bytes(&[byte])
    }

    pub fn emit16(&mut self, word: u16) -> Result<(), CodeBufferFull> {
        self.emit_bytes(&word.to_le_bytes())
    }

    pub fn emit32(&mut self, dword: u32) -> Result<(), CodeBufferFull> {
        self.emit_bytes(&dword.to_le_bytes())
    }

    pub fn emit64(&mut self, qword: u64) -> Result<(), CodeBufferFull> {
        self.emit_bytes(&qword.to_le_bytes())
    }

    /// Appends raw bytes. Either all of them fit, or none are written.
    pub fn emit_bytes(&mut self, bytes: &[u8]) -> Result<(), CodeBufferFull> {
        let end = self.cursor + bytes.len();
        if end > self.capacity {
            return Err(CodeBufferFull {
                capacity: self.capacity,
            });
        }

        self.buffer.borrow_mut()[self.cursor..end].copy_from_slice(bytes);
        self.cursor = end;

        Ok(())
    }

    /// Overwrites four already-emitted bytes at `offset`. The cursor does not move.
    ///
    /// # Panics
    ///
    /// If any of the four bytes has not been emitted yet.
    pub fn patch32(&mut self, offset: usize, dword: u32) {
        assert!(
            offset + 4 <= self.cursor,
            "tried to patch offset {} beyond the cursor at {}",
            offset,
            self.cursor
        );

        self.buffer.borrow_mut()[offset..offset + 4].copy_from_slice(&dword.to_le_bytes());
    }
}

/// Relative displacement from the end of a field (`from`) to `to`, in the rel32 convention.
pub fn rel32(from: usize, to: usize) -> i32 {
    debug_assert!(from <= MAX_CODE_CAPACITY && to <= MAX_CODE_CAPACITY);
    (to as i64 - from as i64) as i32
}
