//! The data tape: the only memory a compiled program reads or writes.

use std::ptr::NonNull;

/// A fixed number of byte cells, all starting at zero.
///
/// The cells live in one heap allocation that never moves, so its address can be embedded in
/// generated code. All access goes through that one pointer; the tape hands out ordinary slices
/// only through `&self`/`&mut self`, which keeps it exclusive while compiled code is running.
pub struct Tape {
    cells: NonNull<u8>,
    len: usize,
}

impl Tape {
    pub fn new(len: usize) -> Self {
        let cells: Box<[u8]> = vec![0u8; len].into_boxed_slice();
        let cells = Box::into_raw(cells) as *mut u8;

        Tape {
            // Box::into_raw never returns null, even for empty slices.
            cells: NonNull::new(cells).unwrap_or(NonNull::dangling()),
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn cells(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.cells.as_ptr(), self.len) }
    }

    pub fn cells_mut(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.cells.as_ptr(), self.len) }
    }

    /// Address of cell 0.
    pub fn base_address(&self) -> *mut u8 {
        self.cells.as_ptr()
    }
}

impl Drop for Tape {
    fn drop(&mut self) {
        let cells = std::ptr::slice_from_raw_parts_mut(self.cells.as_ptr(), self.len);
        drop(unsafe { Box::from_raw(cells) });
    }
}

impl std::fmt::Debug for Tape {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        // Tapes are mostly zeros; only show up to the last non-zero cell.
        let used = self
            .cells()
            .iter()
            .rposition(|&c| c != 0)
            .map_or(0, |last| last + 1);
        f.debug_struct("Tape")
            .field("len", &self.len)
            .field("cells", &&self.cells()[..used])
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_zeroed() {
        let tape = Tape::new(30_000);
        assert_eq!(30_000, tape.len());
        assert!(tape.cells().iter().all(|&c| c == 0));
    }

    #[test]
    fn writes_are_visible_through_the_base_address() {
        let mut tape = Tape::new(4);
        tape.cells_mut()[2] = 9;
        assert_eq!(9, unsafe { *tape.base_address().add(2) });
    }

    #[test]
    fn debug_trims_trailing_zeros() {
        let mut tape = Tape::new(100);
        tape.cells_mut()[1] = 3;
        assert_eq!("Tape { len: 100, cells: [0, 3] }", format!("{:?}", tape));
    }
}
