//! I/O primitives that record output and replay scripted input, one script per test thread.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;

use brainjit_core::Io;

thread_local! {
    static OUTPUT: RefCell<Vec<u8>> = RefCell::new(Vec::new());
    static INPUT: RefCell<VecDeque<u8>> = RefCell::new(VecDeque::new());
}

extern "C" fn record_putchar(c: u8) {
    OUTPUT.with(|output| output.borrow_mut().push(c));
}

extern "C" fn scripted_getchar() -> u8 {
    INPUT.with(|input| input.borrow_mut().pop_front().unwrap_or(0xFF))
}

/// Fresh I/O for this thread: `input` will be read by `,`, and output starts out empty.
pub fn scripted_io(input: &[u8]) -> Io {
    OUTPUT.with(|output| output.borrow_mut().clear());
    INPUT.with(|queue| *queue.borrow_mut() = input.iter().copied().collect());

    Io {
        putchar: record_putchar,
        getchar: scripted_getchar,
    }
}

/// Everything written since the last call to [scripted_io] or [take_output].
pub fn take_output() -> Vec<u8> {
    OUTPUT.with(|output| std::mem::take(&mut *output.borrow_mut()))
}

pub const HELLO_WORLD: &str = "
    ++++++++[>++++[>++>+++>+++>+<<<<-]>+>+>->>+[<]<-]>>.>---.+++++++..+++.>>.<-.<.+++.------.--------.>>+.>++.
";

/// Prints the bytes 0 to 255, in order; the loop ends when the cell wraps back to zero.
pub const ALL_BYTES: &str = "
    .+[.+]
";
