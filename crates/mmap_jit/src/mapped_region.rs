use std::ops::Drop;
use std::ptr;

use errno::errno;
use libc::{c_void, size_t};

use crate::{MappingError, WritableRegion};

#[cfg(target_os = "macos")]
const MAP_FLAGS: libc::c_int = libc::MAP_PRIVATE | libc::MAP_ANON | libc::MAP_JIT;
#[cfg(not(target_os = "macos"))]
const MAP_FLAGS: libc::c_int = libc::MAP_PRIVATE | libc::MAP_ANON;

/// A region of memory mapped by `mmap(2)`.
///
/// The memory starts out with no access rights at all; convert it into a [WritableRegion] to fill
/// it in. `munmap(2)` is automatically called when the value is dropped.
#[derive(Debug)]
pub struct MappedRegion {
    addr: *mut c_void,
    len: size_t,
}

impl MappedRegion {
    /// Allocate a region of the given size (in bytes).
    ///
    /// The kernel rounds the mapping up to whole pages, but [MappedRegion::len] always reports the
    /// size that was asked for.
    pub fn allocate(size: usize) -> crate::Result<Self> {
        if size == 0 {
            return Err(MappingError::EmptyRegion);
        }

        let memory = unsafe { libc::mmap(ptr::null_mut(), size, libc::PROT_NONE, MAP_FLAGS, -1, 0) };

        if memory == libc::MAP_FAILED {
            return Err(errno().into());
        }

        log::trace!("mapped {} bytes at {:p}", size, memory);

        Ok(MappedRegion {
            addr: memory,
            len: size,
        })
    }

    /// Returns a pointer to mapped memory.
    pub fn addr(&self) -> *const c_void {
        self.addr
    }

    /// Return the length of region.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false: empty regions cannot be allocated.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Consumes the region and returns a writable region.
    pub fn into_writable(self) -> crate::Result<WritableRegion> {
        WritableRegion::from(self)
    }

    /// Changes the access rights of the whole region.
    pub(crate) fn protect(&self, protection: libc::c_int) -> crate::Result<()> {
        if unsafe { libc::mprotect(self.addr, self.len, protection) } < 0 {
            return Err(errno().into());
        }

        Ok(())
    }
}

impl Drop for MappedRegion {
    fn drop(&mut self) {
        if unsafe { libc::munmap(self.addr, self.len) } < 0 {
            log::warn!("could not unmap region at {:p}: {}", self.addr, errno());
        }
    }
}

impl MappedRegion {
    // Callers must have made the region readable first.
    pub(crate) unsafe fn as_slice(&self) -> &[u8] {
        std::slice::from_raw_parts(self.addr as *const u8, self.len)
    }

    // Callers must have made the region writable first.
    pub(crate) unsafe fn as_mut_slice(&mut self) -> &mut [u8] {
        std::slice::from_raw_parts_mut(self.addr as *mut u8, self.len)
    }
}
