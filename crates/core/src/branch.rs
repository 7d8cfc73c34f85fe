//! Matches `[` with `]` and fills in the jump displacements between them.

use std::borrow::BorrowMut;

use crate::asm::Target;
use crate::emitter::{rel32, Emitter};
use crate::errors::Reason;

/// Bookkeeping for a loop whose `]` has not been seen yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchRecord {
    /// Where the loop's zero test starts. The backward jump lands here.
    pub test_offset: usize,
    /// Where the forward "jump if zero" displacement lives, still zero for now.
    pub placeholder_offset: usize,
}

/// A bounded stack of open loops.
pub struct BranchResolver {
    stack: Vec<BranchRecord>,
    max_depth: usize,
}

impl BranchResolver {
    pub fn new(max_depth: usize) -> Self {
        BranchResolver {
            stack: Vec::with_capacity(max_depth.min(1024)),
            max_depth,
        }
    }

    /// Number of loops currently open.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Emits the test at the top of a loop with a placeholder displacement, and remembers it.
    pub fn open_loop<T, B>(&mut self, target: &mut T, code: &mut Emitter<B>) -> Result<(), Reason>
    where
        T: Target,
        B: BorrowMut<[u8]>,
    {
        if self.depth() >= self.max_depth {
            return Err(Reason::NestingTooDeep {
                max_depth: self.max_depth,
            });
        }

        let test_offset = code.offset();
        target.jump_if_zero(code)?;
        let placeholder_offset = code.offset();
        code.emit32(0)?;

        self.stack.push(BranchRecord {
            test_offset,
            placeholder_offset,
        });

        Ok(())
    }

    /// Emits the jump back to the innermost open loop, and patches that loop's forward jump to
    /// land just after it.
    pub fn close_loop<T, B>(&mut self, target: &mut T, code: &mut Emitter<B>) -> Result<(), Reason>
    where
        T: Target,
        B: BorrowMut<[u8]>,
    {
        let branch = *self.stack.last().ok_or(Reason::TooManyCloseBrackets)?;

        target.jump(code)?;
        let end_of_loop = code.offset() + 4;
        code.emit32(rel32(end_of_loop, branch.test_offset) as u32)?;

        // Only pop once the jump is fully written: a failed close leaves the record intact.
        self.stack.pop();

        let forward = rel32(branch.placeholder_offset + 4, end_of_loop);
        code.patch32(branch.placeholder_offset, forward as u32);
        log::trace!(
            "loop at {:#x}: skip {:+}, repeat {:+}",
            branch.test_offset,
            forward,
            rel32(end_of_loop, branch.test_offset)
        );

        Ok(())
    }

    /// Succeeds only if every loop has been closed.
    pub fn finish(&self) -> Result<(), Reason> {
        match self.depth() {
            0 => Ok(()),
            open_loops => Err(Reason::NotEnoughCloseBrackets { open_loops }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::{BytecodeTarget, Opcode};

    fn read_rel32(code: &[u8], at: usize) -> i32 {
        i32::from_le_bytes([code[at], code[at + 1], code[at + 2], code[at + 3]])
    }

    #[test]
    fn close_patches_both_directions() {
        let mut target = BytecodeTarget;
        let mut code = Emitter::new(vec![0u8; 64]);
        let mut branches = BranchResolver::new(8);

        branches.open_loop(&mut target, &mut code).unwrap();
        assert_eq!(1, branches.depth());
        target.decrement_cell(&mut code).unwrap();
        branches.close_loop(&mut target, &mut code).unwrap();
        assert_eq!(0, branches.depth());

        let code = code.code();
        // [jz rel32] [dec] [jmp rel32]
        assert_eq!(11, code.len());
        assert_eq!(Opcode::JumpIfZero as u8, code[0]);
        assert_eq!(Opcode::Jump as u8, code[6]);

        // the forward jump lands right after the backward jump
        assert_eq!(11, 5 + read_rel32(code, 1));
        // the backward jump lands on the test
        assert_eq!(0, 11 + read_rel32(code, 7));
    }

    #[test]
    fn nested_loops_close_innermost_first() {
        let mut target = BytecodeTarget;
        let mut code = Emitter::new(vec![0u8; 64]);
        let mut branches = BranchResolver::new(8);

        branches.open_loop(&mut target, &mut code).unwrap(); // outer at 0
        branches.open_loop(&mut target, &mut code).unwrap(); // inner at 5
        branches.close_loop(&mut target, &mut code).unwrap(); // jmp at 10..15
        branches.close_loop(&mut target, &mut code).unwrap(); // jmp at 15..20

        let code = code.code();
        assert_eq!(15, 10 + read_rel32(code, 6));
        assert_eq!(5, 15 + read_rel32(code, 11));
        assert_eq!(20, 5 + read_rel32(code, 1));
        assert_eq!(0, 20 + read_rel32(code, 16));
    }

    #[test]
    fn close_without_open_is_an_error() {
        let mut code = Emitter::new(vec![0u8; 64]);
        let mut branches = BranchResolver::new(8);

        assert_eq!(
            Err(Reason::TooManyCloseBrackets),
            branches.close_loop(&mut BytecodeTarget, &mut code)
        );
        assert_eq!(0, code.offset(), "nothing should be emitted");
    }

    #[test]
    fn depth_is_bounded() {
        let mut code = Emitter::new(vec![0u8; 64]);
        let mut branches = BranchResolver::new(2);

        branches.open_loop(&mut BytecodeTarget, &mut code).unwrap();
        branches.open_loop(&mut BytecodeTarget, &mut code).unwrap();
        assert_eq!(
            Err(Reason::NestingTooDeep { max_depth: 2 }),
            branches.open_loop(&mut BytecodeTarget, &mut code)
        );
        assert_eq!(2, branches.depth());
    }

    #[test]
    fn unclosed_loops_are_reported() {
        let mut code = Emitter::new(vec![0u8; 64]);
        let mut branches = BranchResolver::new(8);
        assert_eq!(Ok(()), branches.finish());

        branches.open_loop(&mut BytecodeTarget, &mut code).unwrap();
        branches.open_loop(&mut BytecodeTarget, &mut code).unwrap();
        assert_eq!(
            Err(Reason::NotEnoughCloseBrackets { open_loops: 2 }),
            branches.finish()
        );
    }

    #[test]
    fn running_out_of_room_is_an_error() {
        let mut code = Emitter::new(vec![0u8; 3]);
        let mut branches = BranchResolver::new(8);

        assert_eq!(
            Err(Reason::CodeBufferFull { capacity: 3 }),
            branches.open_loop(&mut BytecodeTarget, &mut code)
        );
        assert_eq!(0, branches.depth());
    }
}
