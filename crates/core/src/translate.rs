//! The single pass from source symbols to code.

use std::borrow::BorrowMut;

use crate::asm::Target;
use crate::branch::BranchResolver;
use crate::emitter::Emitter;
use crate::errors::{CompilationError, Location, Reason};

/// Scans the source once, folding runs of `<>` and `+-`, and asks its [Target] to encode
/// everything into the [Emitter].
///
/// The translator owns no global state: the emitter is borrowed from the caller, so independent
/// compilations never interfere with each other.
pub struct Translator<'c, T, B> {
    target: T,
    code: &'c mut Emitter<B>,
    branches: BranchResolver,
}

impl<'c, T, B> Translator<'c, T, B>
where
    T: Target,
    B: BorrowMut<[u8]>,
{
    pub fn new(target: T, code: &'c mut Emitter<B>, max_loop_depth: usize) -> Self {
        Translator {
            target,
            code,
            branches: BranchResolver::new(max_loop_depth),
        }
    }

    /// Translates the whole program, prologue to epilogue.
    ///
    /// On error, the emitter holds a partial, unpatched program that must never be run.
    pub fn translate(mut self, source: &[u8]) -> Result<(), CompilationError> {
        let at = |offset: usize| Location::in_source(source, offset);

        self.target
            .prologue(self.code)
            .map_err(|full| CompilationError::new(full.into(), at(0)))?;

        let mut position = 0;
        while let Some(&symbol) = source.get(position) {
            let start = position;
            let result = match symbol {
                b'>' | b'<' => {
                    let (delta, len) = fold_pointer_run(&source[position..]);
                    position += len;
                    self.move_pointer(delta)
                }
                b'+' | b'-' => {
                    let (delta, len) = fold_cell_run(&source[position..]);
                    position += len;
                    self.modify_cell(delta)
                }
                _ => {
                    position += 1;
                    self.translate_symbol(symbol)
                }
            };

            result.map_err(|reason| CompilationError::new(reason, at(start)))?;
        }

        self.branches
            .finish()
            .map_err(|reason| CompilationError::new(reason, at(source.len())))?;

        self.target
            .epilogue(self.code)
            .map_err(|full| CompilationError::new(full.into(), at(source.len())))?;

        log::debug!(
            "translated {} bytes of source into {} of {} bytes of code (loop depth limit {})",
            source.len(),
            self.code.offset(),
            self.code.capacity(),
            self.branches.max_depth()
        );

        Ok(())
    }

    fn translate_symbol(&mut self, symbol: u8) -> Result<(), Reason> {
        match symbol {
            b'.' => self.target.output(self.code)?,
            b',' => self.target.input(self.code)?,
            b'[' => self.branches.open_loop(&mut self.target, self.code)?,
            b']' => self.branches.close_loop(&mut self.target, self.code)?,
            // everything else is commentary
            _ => (),
        }

        Ok(())
    }

    fn move_pointer(&mut self, delta: i64) -> Result<(), Reason> {
        match delta {
            0 => (),
            1 => self.target.increment_pointer(self.code)?,
            -1 => self.target.decrement_pointer(self.code)?,
            _ => {
                // Immediates are 32 bits; absurdly long runs take several adds.
                let mut remaining = delta;
                while remaining != 0 {
                    let step = remaining.clamp(i32::MIN as i64, i32::MAX as i64);
                    self.target.add_to_pointer(self.code, step as i32)?;
                    remaining -= step;
                }
            }
        }

        Ok(())
    }

    fn modify_cell(&mut self, delta: u8) -> Result<(), Reason> {
        match delta {
            0 => (),
            1 => self.target.increment_cell(self.code)?,
            0xFF => self.target.decrement_cell(self.code)?,
            _ => self.target.add_to_cell(self.code, delta)?,
        }

        Ok(())
    }
}

/// Folds the run of `>` and `<` at the start of `symbols`.
///
/// Returns the net displacement (`>` is +1, `<` is -1) and how many symbols the run spans. Any
/// other byte, commentary included, ends the run.
pub fn fold_pointer_run(symbols: &[u8]) -> (i64, usize) {
    let len = symbols
        .iter()
        .take_while(|&&b| b == b'>' || b == b'<')
        .count();
    let delta = symbols[..len]
        .iter()
        .map(|&b| if b == b'>' { 1 } else { -1 })
        .sum();

    (delta, len)
}

/// Folds the run of `+` and `-` at the start of `symbols`, modulo 256.
pub fn fold_cell_run(symbols: &[u8]) -> (u8, usize) {
    let len = symbols
        .iter()
        .take_while(|&&b| b == b'+' || b == b'-')
        .count();
    let delta = symbols[..len].iter().fold(0u8, |acc, &b| {
        if b == b'+' {
            acc.wrapping_add(1)
        } else {
            acc.wrapping_sub(1)
        }
    });

    (delta, len)
}
