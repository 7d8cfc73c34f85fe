//! Encoder for x86-64, System V calling convention.

use std::borrow::BorrowMut;

use super::{Emit, Target};
use crate::emitter::{rel32, Emitter};

// REGISTERS:
//
// rbx (callee saved) - data pointer, as an index into the tape
// r12 (callee saved) - address of the output primitive
// r13 (callee saved) - address of the input primitive
// r14 (callee saved) - base address of the tape
// rdi (argument)     - byte passed to the output primitive
// al  (return)       - byte returned by the input primitive
// eax (return)       - status returned by the compiled code
//
// Cells are always addressed as [r14 + rbx]. Keeping the pointer as an index makes the bounds
// check a single unsigned comparison: an index that went below zero wraps to a huge value.
//
// see: https://refspecs.linuxbase.org/elf/x86_64-abi-0.99.pdf

/// Returned in `eax` when the program ran to completion.
pub const STATUS_OK: u32 = 0;
/// Returned in `eax` when the data pointer left the tape.
pub const STATUS_POINTER_OUT_OF_BOUNDS: u32 = 1;

/// mov eax, imm32 (5) + the register restore sequence (12).
const FAULT_HANDLER_LEN: u8 = 17;

/// The addresses baked into the generated code as immediates.
///
/// Once these are embedded the code needs no further symbol resolution. They must stay valid for
/// as long as the code can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostConstants {
    pub tape_base: u64,
    /// Must not exceed `i32::MAX`: it is compared against as a sign-extended imm32.
    pub tape_len: u32,
    /// Address of an `extern "C" fn(u8)`.
    pub putchar: u64,
    /// Address of an `extern "C" fn() -> u8`.
    pub getchar: u64,
}

/// Generates x86-64 machine code that runs in place, with the tape and I/O fixed at compile time.
pub struct X86_64 {
    host: HostConstants,
    fault_handler: Option<usize>,
}

impl X86_64 {
    pub fn new(host: HostConstants) -> Self {
        debug_assert!(host.tape_len <= i32::MAX as u32);
        X86_64 {
            host,
            fault_handler: None,
        }
    }

    // STACK
    //
    // on entry             rsp == 16n + 8 (return address just pushed)
    // after four pushes    rsp == 16n + 8
    // after sub rsp, 8     rsp == 16n      <- aligned for calls into the primitives

    fn save_registers<B: BorrowMut<[u8]>>(code: &mut Emitter<B>) -> Emit {
        code.emit_bytes(&[
            0x53, // push rbx
            0x41, 0x54, // push r12
            0x41, 0x55, // push r13
            0x41, 0x56, // push r14
            0x48, 0x83, 0xEC, 0x08, // sub rsp, 8
        ])
    }

    fn restore_registers_and_return<B: BorrowMut<[u8]>>(code: &mut Emitter<B>) -> Emit {
        code.emit_bytes(&[
            0x48, 0x83, 0xC4, 0x08, // add rsp, 8
            0x41, 0x5E, // pop r14
            0x41, 0x5D, // pop r13
            0x41, 0x5C, // pop r12
            0x5B, // pop rbx
            0xC3, // ret
        ])
    }

    /// cmp rbx, tape_len ; jae fault_handler
    fn check_bounds<B: BorrowMut<[u8]>>(&self, code: &mut Emitter<B>) -> Emit {
        let fault_handler = self
            .fault_handler
            .expect("the prologue places the fault handler before any pointer move");

        code.emit_bytes(&[0x48, 0x81, 0xFB])?;
        code.emit32(self.host.tape_len)?;
        code.emit_bytes(&[0x0F, 0x83])?;
        let end_of_jump = code.offset() + 4;
        code.emit32(rel32(end_of_jump, fault_handler) as u32)
    }
}

impl Target for X86_64 {
    fn prologue<B: BorrowMut<[u8]>>(&mut self, code: &mut Emitter<B>) -> Emit {
        Self::save_registers(code)?;

        // mov r14, tape_base
        code.emit_bytes(&[0x49, 0xBE])?;
        code.emit64(self.host.tape_base)?;
        // mov r12, putchar
        code.emit_bytes(&[0x49, 0xBC])?;
        code.emit64(self.host.putchar)?;
        // mov r13, getchar
        code.emit_bytes(&[0x49, 0xBD])?;
        code.emit64(self.host.getchar)?;
        // xor ebx, ebx
        code.emit_bytes(&[0x31, 0xDB])?;

        // The fault handler lives here, so every bounds check can jump backwards to a known
        // offset. Normal execution hops over it.
        // jmp short +17
        code.emit_bytes(&[0xEB, FAULT_HANDLER_LEN])?;

        let fault_handler = code.offset();
        // mov eax, STATUS_POINTER_OUT_OF_BOUNDS
        code.emit(0xB8)?;
        code.emit32(STATUS_POINTER_OUT_OF_BOUNDS)?;
        Self::restore_registers_and_return(code)?;
        debug_assert_eq!(fault_handler + FAULT_HANDLER_LEN as usize, code.offset());

        self.fault_handler = Some(fault_handler);
        Ok(())
    }

    fn epilogue<B: BorrowMut<[u8]>>(&mut self, code: &mut Emitter<B>) -> Emit {
        // xor eax, eax (STATUS_OK)
        code.emit_bytes(&[0x31, 0xC0])?;
        Self::restore_registers_and_return(code)
    }

    fn increment_pointer<B: BorrowMut<[u8]>>(&mut self, code: &mut Emitter<B>) -> Emit {
        // inc rbx
        code.emit_bytes(&[0x48, 0xFF, 0xC3])?;
        self.check_bounds(code)
    }

    fn decrement_pointer<B: BorrowMut<[u8]>>(&mut self, code: &mut Emitter<B>) -> Emit {
        // dec rbx
        code.emit_bytes(&[0x48, 0xFF, 0xCB])?;
        self.check_bounds(code)
    }

    fn add_to_pointer<B: BorrowMut<[u8]>>(&mut self, code: &mut Emitter<B>, delta: i32) -> Emit {
        // add rbx, imm32 (sign-extended, so this also moves left)
        code.emit_bytes(&[0x48, 0x81, 0xC3])?;
        code.emit32(delta as u32)?;
        self.check_bounds(code)
    }

    fn increment_cell<B: BorrowMut<[u8]>>(&mut self, code: &mut Emitter<B>) -> Emit {
        // inc byte [r14 + rbx]
        code.emit_bytes(&[0x41, 0xFE, 0x04, 0x1E])
    }

    fn decrement_cell<B: BorrowMut<[u8]>>(&mut self, code: &mut Emitter<B>) -> Emit {
        // dec byte [r14 + rbx]
        code.emit_bytes(&[0x41, 0xFE, 0x0C, 0x1E])
    }

    fn add_to_cell<B: BorrowMut<[u8]>>(&mut self, code: &mut Emitter<B>, delta: u8) -> Emit {
        // add byte [r14 + rbx], imm8
        code.emit_bytes(&[0x41, 0x80, 0x04, 0x1E, delta])
    }

    fn output<B: BorrowMut<[u8]>>(&mut self, code: &mut Emitter<B>) -> Emit {
        code.emit_bytes(&[
            0x41, 0x0F, 0xB6, 0x3C, 0x1E, // movzx edi, byte [r14 + rbx]
            0x41, 0xFF, 0xD4, // call r12
        ])
    }

    fn input<B: BorrowMut<[u8]>>(&mut self, code: &mut Emitter<B>) -> Emit {
        code.emit_bytes(&[
            0x41, 0xFF, 0xD5, // call r13
            0x41, 0x88, 0x04, 0x1E, // mov byte [r14 + rbx], al
        ])
    }

    fn jump_if_zero<B: BorrowMut<[u8]>>(&mut self, code: &mut Emitter<B>) -> Emit {
        code.emit_bytes(&[
            0x41, 0x80, 0x3C, 0x1E, 0x00, // cmp byte [r14 + rbx], 0
            0x0F, 0x84, // jz rel32
        ])
    }

    fn jump<B: BorrowMut<[u8]>>(&mut self, code: &mut Emitter<B>) -> Emit {
        // jmp rel32
        code.emit(0xE9)
    }
}
