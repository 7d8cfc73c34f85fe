use std::borrow::{Borrow, BorrowMut};
use std::ops::{Index, IndexMut};
use std::slice::SliceIndex;

use crate::ExecutableRegion;
use crate::MappedRegion;

/// A mapped region that can be read and written, but not executed.
///
/// Fill it in (it implements [BorrowMut] for `[u8]`), then call
/// [WritableRegion::into_executable] to run it. The same memory is never writable and executable
/// at the same time.
#[derive(Debug)]
pub struct WritableRegion {
    region: MappedRegion,
}

impl WritableRegion {
    /// Consumes the [MappedRegion] and marks its memory as read-write.
    pub fn from(region: MappedRegion) -> crate::Result<Self> {
        region.protect(libc::PROT_READ | libc::PROT_WRITE)?;

        Ok(Self { region })
    }

    /// Shortcut for `MappedRegion::allocate(size)?.into_writable()`.
    pub fn allocate(size: usize) -> crate::Result<Self> {
        MappedRegion::allocate(size)?.into_writable()
    }

    /// Returns the address of the first byte.
    pub fn addr(&self) -> *const u8 {
        self.region.addr() as *const u8
    }

    pub fn len(&self) -> usize {
        self.region.len()
    }

    pub fn is_empty(&self) -> bool {
        self.region.is_empty()
    }

    /// Consumes the region and returns an executable region. That means you can run it!
    pub fn into_executable(self) -> crate::Result<ExecutableRegion> {
        ExecutableRegion::from(self.region)
    }
}

impl<I> Index<I> for WritableRegion
where
    I: SliceIndex<[u8]>,
{
    type Output = I::Output;

    fn index(&self, index: I) -> &Self::Output {
        unsafe { &self.region.as_slice()[index] }
    }
}

impl<I> IndexMut<I> for WritableRegion
where
    I: SliceIndex<[u8]>,
{
    fn index_mut(&mut self, index: I) -> &mut Self::Output {
        unsafe { &mut self.region.as_mut_slice()[index] }
    }
}

impl Borrow<[u8]> for WritableRegion {
    fn borrow(&self) -> &[u8] {
        &self[..]
    }
}

impl BorrowMut<[u8]> for WritableRegion {
    fn borrow_mut(&mut self) -> &mut [u8] {
        &mut self[..]
    }
}
