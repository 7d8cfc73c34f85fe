//! Just enough `mmap(2)` to run machine code generated at runtime.
//!
//! Memory goes through three stages, each one a type:
//!
//!  1. [MappedRegion]: freshly mapped, no access at all;
//!  2. [WritableRegion]: read-write, so that code can be written into it;
//!  3. [ExecutableRegion]: read-execute, so that the code can be called with [as_function!].
//!
//! Each conversion consumes the previous stage, so there is never a live handle that could write
//! to memory that is currently executable.

mod error;
mod executable_region;
mod mapped_region;
mod writable_region;

pub use crate::error::{MappingError, Result};
pub use crate::executable_region::ExecutableRegion;
pub use crate::mapped_region::MappedRegion;
pub use crate::writable_region::WritableRegion;

/// Reinterprets the start of an [ExecutableRegion] as a function pointer of the given type.
///
/// # Safety
///
/// The region must contain a complete function that follows the calling convention of
/// `$fn_type`, and the region must outlive every call made through the returned pointer.
#[macro_export]
macro_rules! as_function {
    ($region: expr, $fn_type: ty) => {
        ::std::mem::transmute::<*const u8, $fn_type>($crate::ExecutableRegion::addr(&$region))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A function that returns 42, for whatever architecture we're running on.
    fn answer_function() -> &'static [u8] {
        if cfg!(target_arch = "x86_64") {
            &[
                // mov eax, 42
                0xB8, 0x2A, 0x00, 0x00, 0x00, //
                // ret
                0xC3,
            ]
        } else if cfg!(target_arch = "aarch64") {
            &[
                // mov w0, #42
                0x40, 0x05, 0x80, 0x52, //
                // ret
                0xc0, 0x03, 0x5f, 0xd6,
            ]
        } else {
            &[]
        }
    }

    #[test]
    fn rejects_empty_regions() {
        assert!(matches!(
            MappedRegion::allocate(0),
            Err(MappingError::EmptyRegion)
        ));
    }

    #[test]
    fn writable_region_remembers_what_was_written() {
        let mut mem = WritableRegion::allocate(4096).unwrap();
        assert_eq!(4096, mem.len());
        assert!(mem[..].iter().all(|&b| b == 0), "fresh pages are zeroed");

        mem[10] = 0xAB;
        mem[11..13].copy_from_slice(&[0xCD, 0xEF]);
        assert_eq!(&[0xAB, 0xCD, 0xEF], &mem[10..13]);
    }

    #[test]
    fn executable_region_keeps_its_contents() {
        let mut mem = WritableRegion::allocate(100).unwrap();
        mem[0..3].copy_from_slice(&[1, 2, 3]);
        let code = mem.into_executable().unwrap();

        assert_eq!(100, code.len());
        assert_eq!(&[1, 2, 3], &code[0..3]);
    }

    #[test]
    fn runs_generated_code() {
        let program = answer_function();
        if program.is_empty() {
            return;
        }

        let mut mem = WritableRegion::allocate(program.len()).unwrap();
        mem[0..program.len()].copy_from_slice(program);
        let code = mem.into_executable().unwrap();

        let answer = unsafe { as_function!(code, extern "C" fn() -> u32) };
        assert_eq!(42, answer());
    }
}
