//! Block stack: tracks `SETUP_LOOP`/`SETUP_EXCEPT`/`SETUP_FINALLY` nesting
//! during emission, resolving where `BREAK_LOOP`/`CONTINUE_LOOP`/`RETURN_VALUE`
//! must jump when one or more `FINALLY` blocks sit between the instruction and
//! its real target.
//!
//! Mirrors CPython's `f_blockstack`: a LIFO of block records, each carrying
//! the label its `POP_BLOCK`/exception unwind resumes at.

use crate::error::EmitError;
use crate::il::Label;

/// Why control left a block normally, for `END_FINALLY` to re-dispatch after
/// a `FINALLY` block has run. `None` means "fell through", i.e. nothing
/// special to resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasonCode {
    None,
    Break,
    Continue,
    Return,
}

#[derive(Debug, Clone, Copy)]
pub enum BlockKind {
    Loop { end: Label },
    Except { handler: Label },
    Finally { handler: Label },
}

#[derive(Debug, Clone, Copy)]
pub struct BlockInfo {
    pub kind: BlockKind,
}

/// The compiler's block stack, pushed by `SETUP_*` and popped by `POP_BLOCK`.
#[derive(Debug, Default)]
pub struct BlockStack {
    blocks: Vec<BlockInfo>,
}

impl BlockStack {
    pub fn new() -> Self {
        BlockStack { blocks: Vec::new() }
    }

    pub fn push_loop(&mut self, end: Label) {
        self.blocks.push(BlockInfo { kind: BlockKind::Loop { end } });
    }

    pub fn push_except(&mut self, handler: Label) {
        self.blocks.push(BlockInfo { kind: BlockKind::Except { handler } });
    }

    pub fn push_finally(&mut self, handler: Label) {
        self.blocks.push(BlockInfo { kind: BlockKind::Finally { handler } });
    }

    pub fn pop(&mut self, offset: usize) -> Result<BlockInfo, EmitError> {
        self.blocks.pop().ok_or(EmitError::BlockUnderflow { offset })
    }

    /// The label `BREAK_LOOP` at `offset` must jump to: the nearest enclosing
    /// loop's end, but if any `FINALLY` blocks sit between here and that
    /// loop, the nearest one's handler runs first (with `ReasonCode::Break`
    /// recorded for `END_FINALLY` to resume the break afterward).
    pub fn break_target(&self, offset: usize) -> Result<(Label, ReasonCode), EmitError> {
        for block in self.blocks.iter().rev() {
            match block.kind {
                BlockKind::Finally { handler } => return Ok((handler, ReasonCode::Break)),
                BlockKind::Loop { end } => return Ok((end, ReasonCode::None)),
                BlockKind::Except { .. } => continue,
            }
        }
        Err(EmitError::BreakOutsideLoop { offset })
    }

    /// Same dispatch for `CONTINUE_LOOP`, whose real target is supplied by
    /// the opcode's own operand (the loop header), not computed here — this
    /// only decides whether a `FINALLY` must run first.
    pub fn continue_crosses_finally(&self, offset: usize) -> Result<Option<Label>, EmitError> {
        let mut saw_loop = false;
        for block in self.blocks.iter().rev() {
            match block.kind {
                BlockKind::Finally { handler } => return Ok(Some(handler)),
                BlockKind::Loop { .. } => {
                    saw_loop = true;
                    break;
                }
                BlockKind::Except { .. } => continue,
            }
        }
        if saw_loop {
            Ok(None)
        } else {
            Err(EmitError::ContinueOutsideLoop { offset })
        }
    }

    /// `RETURN_VALUE`'s dispatch: the nearest enclosing `FINALLY`, if any,
    /// must run before the function actually returns. `EXCEPT` blocks never
    /// catch a `return`, so this skips them rather than stopping at them.
    pub fn return_crosses_finally(&self) -> Option<Label> {
        for block in self.blocks.iter().rev() {
            if let BlockKind::Finally { handler } = block.kind {
                return Some(handler);
            }
        }
        None
    }

    /// A helper failure or `raise`'s dispatch: the nearest enclosing `EXCEPT`
    /// or `FINALLY` handler, whichever is innermost — unlike `return`, an
    /// exception is caught by the first `except` it meets.
    pub fn nearest_handler(&self) -> Option<Label> {
        for block in self.blocks.iter().rev() {
            match block.kind {
                BlockKind::Except { handler } | BlockKind::Finally { handler } => return Some(handler),
                BlockKind::Loop { .. } => continue,
            }
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn break_inside_plain_loop_targets_loop_end() {
        let mut bs = BlockStack::new();
        bs.push_loop(Label(1));
        let (label, reason) = bs.break_target(0).unwrap();
        assert_eq!(label, Label(1));
        assert_eq!(reason, ReasonCode::None);
    }

    #[test]
    fn break_through_finally_targets_handler_with_break_reason() {
        let mut bs = BlockStack::new();
        bs.push_loop(Label(1));
        bs.push_finally(Label(2));
        let (label, reason) = bs.break_target(0).unwrap();
        assert_eq!(label, Label(2));
        assert_eq!(reason, ReasonCode::Break);
    }

    #[test]
    fn break_outside_loop_is_an_error() {
        let bs = BlockStack::new();
        assert!(matches!(bs.break_target(0), Err(EmitError::BreakOutsideLoop { .. })));
    }
}
