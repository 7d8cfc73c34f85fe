use std::ops::Deref;

use crate::MappedRegion;

/// An executable region of memory. Use [as_function!](crate::as_function) to run code from here!
#[derive(Debug)]
pub struct ExecutableRegion {
    region: MappedRegion,
}

impl ExecutableRegion {
    /// Consumes the [MappedRegion] and marks its memory as read-only and executable.
    pub fn from(region: MappedRegion) -> crate::Result<Self> {
        region.protect(libc::PROT_READ | libc::PROT_EXEC)?;

        Ok(Self { region })
    }

    /// Returns the address of the mapped memory.
    ///
    /// Use [as_function!](crate::as_function) to call this region of memory like a function.
    pub fn addr(&self) -> *const u8 {
        self.region.addr() as *const u8
    }

    pub fn len(&self) -> usize {
        self.region.len()
    }

    pub fn is_empty(&self) -> bool {
        self.region.is_empty()
    }
}

/// The code can still be read, e.g., to compare two compilations.
impl Deref for ExecutableRegion {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        unsafe { self.region.as_slice() }
    }
}
