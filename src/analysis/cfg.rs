//! Control-flow successor computation for the abstract interpreter's worklist.
//!
//! Jump-target operands are absolute byte offsets (already resolved by the
//! decoder's `EXTENDED_ARG` folding). `BREAK_LOOP` carries no operand of its
//! own — its target is resolved here by tracking the nearest enclosing `LOOP`
//! block in a single linear pass, the same way the stack-effect compiler's
//! block stack resolves it at emission time (the two are independent passes
//! over the same nesting structure; keeping them independent here keeps the
//! abstract interpreter from needing the full block-stack machinery of
//! component G).

use rustc_hash::FxHashMap;

use crate::bytecode::{DecodedInstr, Operands, Opcode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Fallthrough,
    Jump,
    /// `FOR_ITER`'s "iteration continues, value pushed" edge.
    ForIterBody,
    /// `FOR_ITER`'s "iterator exhausted" edge.
    ForIterExit,
    /// `JUMP_IF_{TRUE,FALSE}_OR_POP`'s "condition decided the jump, TOS stays" edge.
    JumpKeepTos,
    /// `JUMP_IF_{TRUE,FALSE}_OR_POP`'s "condition decided fallthrough, TOS popped" edge.
    FallthroughPop,
}

#[derive(Debug, Clone, Copy)]
pub struct Successor {
    pub offset: usize,
    pub edge: EdgeKind,
}

enum BlockKind {
    Loop { end: usize },
    Other,
}

fn u32_operand(instr: &DecodedInstr) -> usize {
    match instr.operands {
        Operands::U32(v) => v as usize,
        _ => panic!("opcode {:?} expected a u32 operand", instr.opcode),
    }
}

/// Build the successor edges for every instruction, keyed by its offset.
pub fn build_successors(instrs: &[DecodedInstr]) -> FxHashMap<usize, Vec<Successor>> {
    let offset_to_index: FxHashMap<usize, usize> =
        instrs.iter().enumerate().map(|(i, ins)| (ins.offset, i)).collect();
    let mut out = FxHashMap::default();
    let mut blocks: Vec<BlockKind> = Vec::new();

    for (i, instr) in instrs.iter().enumerate() {
        let next = instrs.get(i + 1).map(|n| n.offset);
        let succs = match instr.opcode {
            Opcode::SetupLoop => {
                blocks.push(BlockKind::Loop { end: u32_operand(instr) });
                vec![fallthrough(next)]
            }
            Opcode::SetupExcept | Opcode::SetupFinally => {
                blocks.push(BlockKind::Other);
                let handler = u32_operand(instr);
                let mut v = vec![fallthrough(next)];
                v.push(Successor { offset: handler, edge: EdgeKind::Jump });
                v
            }
            Opcode::PopBlock => {
                blocks.pop();
                vec![fallthrough(next)]
            }
            Opcode::JumpForward | Opcode::JumpAbsolute => {
                vec![Successor { offset: u32_operand(instr), edge: EdgeKind::Jump }]
            }
            Opcode::PopJumpIfTrue | Opcode::PopJumpIfFalse => {
                let mut v = vec![fallthrough(next)];
                v.push(Successor { offset: u32_operand(instr), edge: EdgeKind::Jump });
                v
            }
            Opcode::JumpIfTrueOrPop | Opcode::JumpIfFalseOrPop => vec![
                Successor { offset: next.expect("fallthrough must exist"), edge: EdgeKind::FallthroughPop },
                Successor { offset: u32_operand(instr), edge: EdgeKind::JumpKeepTos },
            ],
            Opcode::ContinueLoop => {
                vec![Successor { offset: u32_operand(instr), edge: EdgeKind::Jump }]
            }
            Opcode::BreakLoop => {
                let end = blocks.iter().rev().find_map(|b| match b {
                    BlockKind::Loop { end } => Some(*end),
                    BlockKind::Other => None,
                });
                match end {
                    Some(end) => vec![Successor { offset: end, edge: EdgeKind::Jump }],
                    None => vec![],
                }
            }
            Opcode::ForIter => {
                let exit = u32_operand(instr);
                vec![
                    Successor { offset: next.expect("FOR_ITER must have a fallthrough body"), edge: EdgeKind::ForIterBody },
                    Successor { offset: exit, edge: EdgeKind::ForIterExit },
                ]
            }
            Opcode::ReturnValue | Opcode::RaiseVarargs => vec![],
            _ => match next {
                Some(n) => vec![fallthrough(Some(n))],
                None => vec![],
            },
        };
        // All resolved offsets must exist in the decoded function.
        for s in &succs {
            debug_assert!(offset_to_index.contains_key(&s.offset), "jump to unknown offset {}", s.offset);
        }
        out.insert(instr.offset, succs);
    }
    out
}

fn fallthrough(next: Option<usize>) -> Successor {
    Successor { offset: next.expect("non-terminal opcode must have a fallthrough"), edge: EdgeKind::Fallthrough }
}
