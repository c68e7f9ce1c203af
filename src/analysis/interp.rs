//! Abstract interpreter (component E): forward dataflow over decoded bytecode.
//!
//! A worklist over byte offsets, propagating an abstract operand stack and an
//! abstract local array, joining at merge points. Convergence follows from the
//! lattice's finite height and the monotonicity of the transfer functions below
//! (each transfer only ever replaces a value with itself or a join of it).

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::analysis::cfg::{build_successors, EdgeKind};
use crate::bytecode::{DecodedInstr, Operands, Opcode};
use crate::error::AnalysisError;
use crate::lattice::AbstractValue;

/// Per-offset entry state: the abstract operand stack and local array on entry
/// to the instruction at that offset.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub stack: Vec<AbstractValue>,
    pub locals: Vec<AbstractValue>,
}

/// The fixed point computed over an entire function body.
#[derive(Debug)]
pub struct AnalysisResult {
    entry: FxHashMap<usize, State>,
    should_box: FxHashSet<usize>,
    local_count: usize,
}

impl AnalysisResult {
    /// `should_box(offset)`: the opcode at `offset`'s stack effect must produce a
    /// boxed result, per §4.E. False only for the Float fast path.
    pub fn should_box(&self, offset: usize) -> bool {
        !self.should_box.contains(&offset)
    }

    pub fn get_stack_info(&self, offset: usize) -> &[AbstractValue] {
        &self.entry.get(&offset).expect("offset analyzed").stack
    }

    pub fn get_local_info(&self, offset: usize, idx: usize) -> &AbstractValue {
        &self.entry.get(&offset).expect("offset analyzed").locals[idx]
    }

    /// True when no operation between `offset` and the next potentially-throwing
    /// instruction observes the frame's last-instruction field. In this
    /// instruction set that is exactly the set of opcodes that cannot
    /// themselves raise: they never need `lasti` to be current when they run.
    pub fn can_skip_lasti_update(&self, opcode: Opcode) -> bool {
        !potentially_throws(opcode)
    }

    pub fn local_count(&self) -> usize {
        self.local_count
    }

    /// Diagnostic dump of the abstract state at `offset`, for logging and tests
    /// — not a disassembler, just the analysis's own output.
    pub fn describe(&self, offset: usize) -> String {
        match self.entry.get(&offset) {
            Some(s) => format!("stack={:?} locals={:?}", s.stack, s.locals),
            None => "unreached".to_string(),
        }
    }
}

fn potentially_throws(opcode: Opcode) -> bool {
    use Opcode::*;
    !matches!(
        opcode,
        Nop | PopTop
            | DupTop
            | RotTwo
            | LoadConstInt
            | LoadConstFloat
            | LoadConstStr
            | LoadConstNone
            | LoadConstBool
            | LoadFast
            | JumpForward
            | JumpAbsolute
            | SetupLoop
            | SetupExcept
            | SetupFinally
            | PopBlock
            | ContinueLoop
    )
}

fn u32_operand(instr: &DecodedInstr) -> usize {
    match instr.operands {
        Operands::U32(v) => v as usize,
        _ => 0,
    }
}

fn is_float(v: &AbstractValue) -> bool {
    matches!(v, AbstractValue::Float)
}

/// Pop `n` values off `stack`, returning a fatal underflow-shaped error if
/// there aren't enough — in well-formed bytecode this never triggers; it is
/// the "fatal condition" §7 describes for malformed input.
fn pop_n(stack: &mut Vec<AbstractValue>, n: usize, offset: usize) -> Result<Vec<AbstractValue>, AnalysisError> {
    if stack.len() < n {
        return Err(AnalysisError::BlockUnderflow { offset });
    }
    Ok(stack.split_off(stack.len() - n))
}

/// Apply one instruction's transfer function to a (stack, locals) pair along a
/// specific outgoing edge, marking `should_box` for the offsets where the
/// Float fast path is authorized.
fn transfer(
    instr: &DecodedInstr,
    edge: EdgeKind,
    mut stack: Vec<AbstractValue>,
    mut locals: Vec<AbstractValue>,
    unboxed: &mut FxHashSet<usize>,
) -> Result<(Vec<AbstractValue>, Vec<AbstractValue>), AnalysisError> {
    use AbstractValue::*;
    let off = instr.offset;
    macro_rules! push {
        ($v:expr) => {
            stack.push($v)
        };
    }
    match instr.opcode {
        Opcode::Nop | Opcode::SetupLoop | Opcode::PopBlock | Opcode::JumpForward
        | Opcode::JumpAbsolute | Opcode::ContinueLoop | Opcode::BreakLoop => {}
        Opcode::SetupExcept | Opcode::SetupFinally => {}
        Opcode::PopTop => {
            pop_n(&mut stack, 1, off)?;
        }
        Opcode::DupTop => {
            let top = stack.last().cloned().unwrap_or(Bottom);
            push!(top);
        }
        Opcode::RotTwo => {
            let n = stack.len();
            if n >= 2 {
                stack.swap(n - 1, n - 2);
            }
        }
        Opcode::LoadConstInt => push!(Int),
        Opcode::LoadConstFloat => {
            unboxed.insert(off);
            push!(Float);
        }
        Opcode::LoadConstStr => push!(String),
        Opcode::LoadConstNone => push!(NoneVal),
        Opcode::LoadConstBool => push!(Bool),
        Opcode::LoadFast => {
            let idx = u32_operand(instr);
            push!(locals.get(idx).cloned().unwrap_or(Undefined));
        }
        Opcode::StoreFast => {
            let idx = u32_operand(instr);
            let v = pop_n(&mut stack, 1, off)?.remove(0);
            if idx >= locals.len() {
                locals.resize(idx + 1, Bottom);
            }
            locals[idx] = v;
        }
        Opcode::DeleteFast => {
            let idx = u32_operand(instr);
            if idx < locals.len() {
                locals[idx] = Undefined;
            }
        }
        Opcode::LoadGlobal | Opcode::LoadName | Opcode::LoadAttr | Opcode::BinarySubscr => {
            let arity = if matches!(instr.opcode, Opcode::BinarySubscr) { 2 } else {
                if matches!(instr.opcode, Opcode::LoadAttr) { 1 } else { 0 }
            };
            pop_n(&mut stack, arity, off)?;
            push!(Any);
        }
        Opcode::StoreGlobal | Opcode::StoreName => {
            pop_n(&mut stack, 1, off)?;
        }
        Opcode::StoreAttr | Opcode::StoreSubscr => {
            pop_n(&mut stack, 2, off)?;
        }
        Opcode::BinaryAdd | Opcode::BinarySubtract | Opcode::BinaryMultiply
        | Opcode::BinaryTrueDivide | Opcode::BinaryFloorDivide | Opcode::BinaryModulo
        | Opcode::BinaryPower | Opcode::BinaryLshift | Opcode::BinaryRshift
        | Opcode::BinaryAnd | Opcode::BinaryOr | Opcode::BinaryXor
        | Opcode::InplaceAdd | Opcode::InplaceSubtract | Opcode::InplaceMultiply
        | Opcode::InplaceTrueDivide | Opcode::InplaceFloorDivide | Opcode::InplaceModulo
        | Opcode::InplacePower | Opcode::InplaceLshift | Opcode::InplaceRshift
        | Opcode::InplaceAnd | Opcode::InplaceOr | Opcode::InplaceXor => {
            let ops = pop_n(&mut stack, 2, off)?;
            let both_float = is_float(&ops[0]) && is_float(&ops[1]);
            // Division and bitwise ops never keep a float result unboxed in the
            // minimum viable implementation's float path (they either always
            // box, or are not float-typed to begin with).
            let float_eligible = both_float
                && matches!(
                    instr.opcode,
                    Opcode::BinaryAdd
                        | Opcode::BinarySubtract
                        | Opcode::BinaryMultiply
                        | Opcode::BinaryTrueDivide
                        | Opcode::InplaceAdd
                        | Opcode::InplaceSubtract
                        | Opcode::InplaceMultiply
                        | Opcode::InplaceTrueDivide
                );
            if float_eligible {
                unboxed.insert(off);
                push!(Float);
            } else {
                push!(Any);
            }
        }
        Opcode::UnaryNegative => {
            let v = pop_n(&mut stack, 1, off)?.remove(0);
            if is_float(&v) {
                unboxed.insert(off);
                push!(Float);
            } else {
                push!(Any);
            }
        }
        Opcode::UnaryNot => {
            pop_n(&mut stack, 1, off)?;
            push!(Bool);
        }
        Opcode::CompareOp => {
            pop_n(&mut stack, 2, off)?;
            push!(Bool);
        }
        Opcode::PopJumpIfTrue | Opcode::PopJumpIfFalse => {
            pop_n(&mut stack, 1, off)?;
        }
        Opcode::JumpIfTrueOrPop | Opcode::JumpIfFalseOrPop => {
            if edge == EdgeKind::FallthroughPop {
                pop_n(&mut stack, 1, off)?;
            }
            // JumpKeepTos: TOS remains on the stack across the jump.
        }
        Opcode::PopExcept | Opcode::EndFinally => {}
        Opcode::ReturnValue => {
            pop_n(&mut stack, 1, off)?;
        }
        Opcode::RaiseVarargs => {
            let n = u32_operand(instr);
            pop_n(&mut stack, n, off)?;
        }
        Opcode::CallFunction => {
            let argc = u32_operand(instr);
            pop_n(&mut stack, argc + 1, off)?;
            push!(Any);
        }
        Opcode::CallFunctionVar | Opcode::CallFunctionKw => {
            let argc = u32_operand(instr);
            pop_n(&mut stack, argc + 2, off)?;
            push!(Any);
        }
        Opcode::CallFunctionVarKw => {
            let argc = u32_operand(instr);
            pop_n(&mut stack, argc + 3, off)?;
            push!(Any);
        }
        Opcode::BuildTuple => {
            let n = u32_operand(instr);
            pop_n(&mut stack, n, off)?;
            push!(Tuple);
        }
        Opcode::BuildList => {
            let n = u32_operand(instr);
            pop_n(&mut stack, n, off)?;
            push!(List);
        }
        Opcode::BuildMap => {
            let n = u32_operand(instr);
            pop_n(&mut stack, n * 2, off)?;
            push!(Dict);
        }
        Opcode::BuildSet => {
            let n = u32_operand(instr);
            pop_n(&mut stack, n, off)?;
            push!(Set);
        }
        Opcode::ImportName => {
            pop_n(&mut stack, 2, off)?;
            push!(Any);
        }
        Opcode::ImportFrom => push!(Any),
        Opcode::ImportStar => {
            pop_n(&mut stack, 1, off)?;
        }
        Opcode::BuildClass => {
            pop_n(&mut stack, 3, off)?;
            push!(Any);
        }
        Opcode::GetIter => {
            pop_n(&mut stack, 1, off)?;
            push!(Any);
        }
        Opcode::ForIter => {
            let top = stack.last().cloned().unwrap_or(Any);
            match edge {
                EdgeKind::ForIterBody => push!(top),
                EdgeKind::ForIterExit => {
                    pop_n(&mut stack, 1, off)?;
                }
                _ => unreachable!("FOR_ITER only has ForIterBody/ForIterExit edges"),
            }
        }
        Opcode::MakeFunction | Opcode::MakeClosure => {
            pop_n(&mut stack, 1, off)?;
            push!(Function);
        }
        Opcode::ExtendedArg => unreachable!("folded away by the decoder"),
        Opcode::YieldValue | Opcode::YieldFrom | Opcode::SetupWith
        | Opcode::WithCleanupStart | Opcode::WithCleanupFinish => {
            return Err(AnalysisError::UnsupportedOpcode { opcode: instr.opcode, offset: off });
        }
    }
    Ok((stack, locals))
}

fn join_states(a: &State, b: &State, offset: usize) -> Result<State, AnalysisError> {
    if a.stack.len() != b.stack.len() {
        return Err(AnalysisError::StackDepthMismatch { offset, a: a.stack.len(), b: b.stack.len() });
    }
    let stack = a.stack.iter().zip(&b.stack).map(|(x, y)| x.join(y)).collect();
    let len = a.locals.len().max(b.locals.len());
    let mut locals = Vec::with_capacity(len);
    for i in 0..len {
        let x = a.locals.get(i).unwrap_or(&AbstractValue::Undefined);
        let y = b.locals.get(i).unwrap_or(&AbstractValue::Undefined);
        locals.push(x.join(y));
    }
    Ok(State { stack, locals })
}

/// Run the worklist to a fixed point starting from offset 0 with an empty
/// operand stack and all locals `Undefined` except the first `param_count`,
/// which start `Any` (the calling convention always supplies a value for
/// declared parameters).
pub fn analyze(instrs: &[DecodedInstr], local_count: usize, param_count: usize) -> Result<AnalysisResult, AnalysisError> {
    let successors = build_successors(instrs);
    let by_offset: FxHashMap<usize, &DecodedInstr> = instrs.iter().map(|i| (i.offset, i)).collect();

    let mut entry: FxHashMap<usize, State> = FxHashMap::default();
    let mut worklist: VecDeque<usize> = VecDeque::new();

    let entry_offset = instrs.first().map(|i| i.offset).unwrap_or(0);
    let mut initial_locals = vec![AbstractValue::Undefined; local_count];
    for slot in initial_locals.iter_mut().take(param_count) {
        *slot = AbstractValue::Any;
    }
    entry.insert(entry_offset, State { stack: Vec::new(), locals: initial_locals });
    worklist.push_back(entry_offset);

    // Offsets where a Float-typed binary/unary/const-load result is
    // authorized to stay unboxed; `should_box(offset)` is the negation of
    // membership here.
    let mut unboxed: FxHashSet<usize> = FxHashSet::default();

    let mut iterations = 0usize;
    while let Some(offset) = worklist.pop_front() {
        iterations += 1;
        log::trace!("abstract interpreter worklist: offset {offset} (iteration {iterations})");
        let state = entry.get(&offset).expect("offset must have an entry state before processing").clone();
        let instr = by_offset.get(&offset).copied().expect("offset must map to a decoded instruction");
        if instr.opcode.always_unsupported() {
            return Err(AnalysisError::UnsupportedOpcode { opcode: instr.opcode, offset });
        }
        let succs = successors.get(&offset).cloned().unwrap_or_default();

        for succ in &succs {
            let mut local_unboxed = FxHashSet::default();
            let (stack, locals) = transfer(instr, succ.edge, state.stack.clone(), state.locals.clone(), &mut local_unboxed)?;
            unboxed.extend(local_unboxed);
            let new_state = State { stack, locals };
            match entry.get(&succ.offset) {
                None => {
                    entry.insert(succ.offset, new_state);
                    worklist.push_back(succ.offset);
                }
                Some(existing) => {
                    let joined = join_states(existing, &new_state, succ.offset)?;
                    if &joined != existing {
                        entry.insert(succ.offset, joined);
                        worklist.push_back(succ.offset);
                    }
                }
            }
        }
    }

    log::debug!("abstract interpreter converged after {iterations} worklist iterations");
    Ok(AnalysisResult { entry, should_box: unboxed, local_count })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::decode_function;

    fn build(code: Vec<u8>) -> Vec<crate::bytecode::DecodedInstr> {
        decode_function(&code).unwrap()
    }

    #[test]
    fn simple_straight_line_add() {
        // LOAD_FAST 0; LOAD_CONST_INT 1; BINARY_ADD; RETURN_VALUE
        let mut code = vec![0x20];
        code.extend_from_slice(&0u16.to_be_bytes());
        code.push(0x05);
        code.extend_from_slice(&1i32.to_be_bytes());
        code.push(0x40); // BINARY_ADD
        code.push(0x88); // RETURN_VALUE
        let instrs = build(code);
        let result = analyze(&instrs, 1, 1).unwrap();
        assert_eq!(result.get_stack_info(instrs[2].offset).len(), 2);
    }

    #[test]
    fn float_binary_add_is_unboxed() {
        let mut code = vec![0x20];
        code.extend_from_slice(&0u16.to_be_bytes()); // LOAD_FAST 0 (param, Any not Float — use const instead)
        let mut code2 = vec![0x06];
        code2.extend_from_slice(&1.0f64.to_bits().to_be_bytes()); // LOAD_CONST_FLOAT
        let mut code3 = vec![0x06];
        code3.extend_from_slice(&2.0f64.to_bits().to_be_bytes());
        let mut full = code2;
        full.extend(code3);
        full.push(0x40); // BINARY_ADD
        full.push(0x88);
        let _ = code; // unused straight-line param variant
        let instrs = build(full);
        let result = analyze(&instrs, 0, 0).unwrap();
        let add_offset = instrs[2].offset;
        assert!(!result.should_box(add_offset));
    }

    #[test]
    fn join_at_branch_target_requires_equal_depth() {
        // LOAD_CONST_BOOL; PopJumpIfFalse(target) -> [fallthrough: push const] -> target: PopTop
        // jump edge: the condition pops, nothing else pushed before target.
        // fallthrough edge: the condition pops, then LOAD_CONST_INT pushes one
        // value before falling into the same target -> depths disagree there.
        let mut code = vec![0x09, 0x01]; // LOAD_CONST_BOOL true
        let target: u32 = 12;
        code.push(0x73); // PopJumpIfFalse
        code.extend_from_slice(&target.to_be_bytes());
        code.push(0x05); // LOAD_CONST_INT (pushes one value, taking stack to depth 1 before target)
        code.extend_from_slice(&1i32.to_be_bytes());
        code.push(0x01); // PopTop at offset 12 expects depth >= 1 from both paths
        assert_eq!(code.len(), target as usize + 1);
        let instrs = build(code);
        // fallthrough path reaches PopTop with depth 1 (pushed by LOAD_CONST_INT),
        // jump path reaches PopTop with depth 0 -> mismatch
        let err = analyze(&instrs, 0, 0).unwrap_err();
        assert!(matches!(err, AnalysisError::StackDepthMismatch { .. }));
    }

    #[test]
    fn yield_is_rejected() {
        let code = vec![0xE0]; // YIELD_VALUE
        let instrs = build(code);
        let err = analyze(&instrs, 0, 0).unwrap_err();
        assert!(matches!(err, AnalysisError::UnsupportedOpcode { .. }));
    }
}
