//! Stack-effect compiler (component G): single forward pass over decoded
//! bytecode, opcode by opcode, emitting IL through the [`IlBuilder`] seam.
//!
//! The emulated operand stack is modeled as a run of extra local slots
//! (indices `local_count..`) rather than SSA values: pushing stores into the
//! next slot, popping loads the previous one. That sidesteps the need for
//! phi nodes at branch targets entirely — whichever control-flow edge
//! reaches a join point, the slot for stack depth *d* always holds the value
//! that path produced, the same way a real stack machine's operand stack
//! behaves at runtime. [`crate::analysis::AnalysisResult::should_box`] decides,
//! per binary/unary/const-load site, whether that slot holds an unboxed
//! `f64` (no refcount, no helper call, native float arithmetic) or a boxed
//! object handle.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::analysis::AnalysisResult;
use crate::bytecode::{DecodedInstr, Opcode, Operands};
use crate::compiler::blocks::BlockStack;
use crate::error::EmitError;
use crate::helpers::HelperId;
use crate::il::{FloatOp, IlBuilder, Label, ValueRef};
use crate::lattice::AbstractValue;
use crate::tagged::{BinOp, CompareOp};

fn u32_operand(instr: &DecodedInstr) -> u32 {
    match instr.operands {
        Operands::U32(v) => v,
        _ => 0,
    }
}

/// Opcodes with no representative helper family to compile against (spec's
/// ten named families cover every other opcode in the set); the driver
/// downgrades these to `NotCompilable` rather than emitting partial code.
fn opcodes_without_representative(opcode: Opcode) -> bool {
    matches!(opcode, Opcode::BuildTuple | Opcode::BuildList | Opcode::BuildMap | Opcode::BuildSet)
}

fn binop_of(opcode: Opcode) -> Option<(BinOp, bool)> {
    use Opcode::*;
    Some(match opcode {
        BinaryAdd => (BinOp::Add, false),
        BinarySubtract => (BinOp::Sub, false),
        BinaryMultiply => (BinOp::Mul, false),
        BinaryFloorDivide => (BinOp::FloorDiv, false),
        BinaryModulo => (BinOp::Mod, false),
        BinaryPower => (BinOp::Pow, false),
        BinaryLshift => (BinOp::Lshift, false),
        BinaryRshift => (BinOp::Rshift, false),
        BinaryAnd => (BinOp::And, false),
        BinaryOr => (BinOp::Or, false),
        BinaryXor => (BinOp::Xor, false),
        InplaceAdd => (BinOp::Add, true),
        InplaceSubtract => (BinOp::Sub, true),
        InplaceMultiply => (BinOp::Mul, true),
        InplaceFloorDivide => (BinOp::FloorDiv, true),
        InplaceModulo => (BinOp::Mod, true),
        InplacePower => (BinOp::Pow, true),
        InplaceLshift => (BinOp::Lshift, true),
        InplaceRshift => (BinOp::Rshift, true),
        InplaceAnd => (BinOp::And, true),
        InplaceOr => (BinOp::Or, true),
        InplaceXor => (BinOp::Xor, true),
        _ => return None,
    })
}

fn float_op_of(opcode: Opcode) -> Option<FloatOp> {
    use Opcode::*;
    Some(match opcode {
        BinaryAdd | InplaceAdd => FloatOp::Add,
        BinarySubtract | InplaceSubtract => FloatOp::Sub,
        BinaryMultiply | InplaceMultiply => FloatOp::Mul,
        BinaryTrueDivide | InplaceTrueDivide => FloatOp::Div,
        _ => return None,
    })
}

fn compare_op_of(selector: u32) -> Option<CompareOp> {
    Some(match selector {
        0 => CompareOp::Lt,
        1 => CompareOp::Le,
        2 => CompareOp::Eq,
        3 => CompareOp::Ne,
        4 => CompareOp::Gt,
        5 => CompareOp::Ge,
        _ => return None,
    })
}

/// Every offset that some instruction's operand names as a jump/handler/loop
/// target needs a bound label before emission reaches it.
fn target_offsets(instrs: &[DecodedInstr]) -> Vec<usize> {
    use Opcode::*;
    instrs
        .iter()
        .filter(|i| {
            matches!(
                i.opcode,
                JumpForward
                    | JumpAbsolute
                    | PopJumpIfTrue
                    | PopJumpIfFalse
                    | JumpIfTrueOrPop
                    | JumpIfFalseOrPop
                    | ContinueLoop
                    | SetupLoop
                    | SetupExcept
                    | SetupFinally
                    | ForIter
            )
        })
        .map(|i| u32_operand(i) as usize)
        .collect()
}

struct Emitter<'a, B: IlBuilder> {
    builder: &'a mut B,
    analysis: &'a AnalysisResult,
    labels: FxHashMap<usize, Label>,
    depth: u32,
    float_depths: FxHashSet<u32>,
    blocks: BlockStack,
    stack_base: u32,
    /// Bound once, at the end of the function body: the landing point for a
    /// helper failure with no enclosing `finally` to run first.
    fail_label: Label,
}

impl<'a, B: IlBuilder> Emitter<'a, B> {
    fn push(&mut self, v: ValueRef, is_float: bool) {
        let slot = self.stack_base + self.depth;
        self.builder.emit_store_local(slot, v);
        if is_float {
            self.float_depths.insert(self.depth);
        } else {
            self.float_depths.remove(&self.depth);
        }
        self.depth += 1;
    }

    fn pop(&mut self) -> (ValueRef, bool) {
        self.depth -= 1;
        let slot = self.stack_base + self.depth;
        let v = self.builder.emit_load_local(slot);
        let is_float = self.float_depths.remove(&self.depth);
        (v, is_float)
    }

    fn peek(&mut self) -> (ValueRef, bool) {
        let slot = self.stack_base + self.depth - 1;
        let v = self.builder.emit_load_local(slot);
        (v, self.float_depths.contains(&(self.depth - 1)))
    }

    fn pop_object(&mut self) -> ValueRef {
        let (v, _) = self.pop();
        v
    }

    fn label_for(&self, offset: usize) -> Label {
        *self.labels.get(&offset).expect("offset must have a registered label")
    }

    fn run(&mut self, instrs: &[DecodedInstr]) -> Result<(), EmitError> {
        for instr in instrs {
            if let Some(&label) = self.labels.get(&instr.offset) {
                self.builder.bind_label(label);
            }
            self.emit_one(instr)?;
        }
        self.builder.bind_label(self.fail_label);
        self.builder.emit_return_null();
        Ok(())
    }

    fn emit_one(&mut self, instr: &DecodedInstr) -> Result<(), EmitError> {
        use Opcode::*;
        if opcodes_without_representative(instr.opcode) {
            return Err(EmitError::NoRepresentativeHelper { opcode: instr.opcode, offset: instr.offset });
        }

        match instr.opcode {
            Nop => {}
            PopTop => {
                let (v, is_float) = self.pop();
                if !is_float {
                    self.builder.emit_decref(v);
                }
            }
            DupTop => {
                let (v, is_float) = self.peek();
                if !is_float {
                    self.builder.emit_incref(v);
                }
                self.push(v, is_float);
            }
            RotTwo => {
                if self.depth >= 2 {
                    let top = self.pop();
                    let below = self.pop();
                    self.push(top.0, top.1);
                    self.push(below.0, below.1);
                }
            }
            LoadConstInt => {
                let v = match instr.operands {
                    Operands::I32(n) => self.builder.emit_const_int(n as i64),
                    _ => self.builder.emit_const_int(0),
                };
                self.push(v, false);
            }
            LoadConstFloat => {
                let v = match instr.operands {
                    Operands::F64(f) => self.builder.emit_const_float(f),
                    _ => self.builder.emit_const_float(0.0),
                };
                self.push(v, !self.analysis.should_box(instr.offset));
            }
            LoadConstBool => {
                let v = match instr.operands {
                    Operands::Bool(b) => self.builder.emit_const_bool(b),
                    _ => self.builder.emit_const_bool(false),
                };
                self.push(v, false);
            }
            LoadConstNone => {
                let v = self.builder.emit_const_none();
                self.push(v, false);
            }
            LoadConstStr => {
                let idx = u32_operand(instr);
                let v = self.builder.emit_load_const_pool(idx);
                self.push(v, false);
            }
            LoadFast => {
                let idx = u32_operand(instr);
                let v = self.builder.emit_load_local(idx);
                let is_float = matches!(self.local_type(instr.offset, idx), AbstractValue::Float);
                self.push(v, is_float);
            }
            StoreFast => {
                let idx = u32_operand(instr);
                let (v, _) = self.pop();
                self.builder.emit_store_local(idx, v);
            }
            DeleteFast => {
                let idx = u32_operand(instr);
                let old = self.builder.emit_load_local(idx);
                self.builder.emit_decref(old);
            }
            LoadGlobal | LoadName => {
                let idx = u32_operand(instr);
                let name = self.builder.emit_load_const_pool(idx);
                let v = self.builder.emit_call_helper(HelperId::GlobalGet, &[name]);
                self.builder.emit_branch_if_null(v, self.current_error_label());
                self.push(v, false);
            }
            StoreGlobal | StoreName => {
                let idx = u32_operand(instr);
                let name = self.builder.emit_load_const_pool(idx);
                let value = self.pop_object();
                self.builder.emit_call_helper(HelperId::GlobalSet, &[name, value]);
            }
            LoadAttr => {
                let idx = u32_operand(instr);
                let name = self.builder.emit_load_const_pool(idx);
                let obj = self.pop_object();
                let v = self.builder.emit_call_helper(HelperId::AttrGet, &[obj, name]);
                self.builder.emit_branch_if_null(v, self.current_error_label());
                self.push(v, false);
            }
            StoreAttr => {
                let idx = u32_operand(instr);
                let name = self.builder.emit_load_const_pool(idx);
                let obj = self.pop_object();
                let value = self.pop_object();
                self.builder.emit_call_helper(HelperId::AttrSet, &[obj, name, value]);
            }
            BinarySubscr => {
                let key = self.pop_object();
                let obj = self.pop_object();
                let v = self.builder.emit_call_helper(HelperId::SubscrGet, &[obj, key]);
                self.builder.emit_branch_if_null(v, self.current_error_label());
                self.push(v, false);
            }
            StoreSubscr => {
                let key = self.pop_object();
                let obj = self.pop_object();
                let value = self.pop_object();
                self.builder.emit_call_helper(HelperId::SubscrSet, &[obj, key, value]);
            }
            BinaryAdd | BinarySubtract | BinaryMultiply | BinaryTrueDivide | BinaryFloorDivide
            | BinaryModulo | BinaryPower | BinaryLshift | BinaryRshift | BinaryAnd | BinaryOr
            | BinaryXor | InplaceAdd | InplaceSubtract | InplaceMultiply | InplaceTrueDivide
            | InplaceFloorDivide | InplaceModulo | InplacePower | InplaceLshift | InplaceRshift
            | InplaceAnd | InplaceOr | InplaceXor => {
                self.emit_binary(instr)?;
            }
            UnaryNegative => {
                let (v, is_float) = self.pop();
                if is_float && !self.analysis.should_box(instr.offset) {
                    let zero = self.builder.emit_const_float(0.0);
                    let r = self.builder.emit_float_binop(FloatOp::Sub, zero, v);
                    self.push(r, true);
                } else {
                    // Negation has no dedicated helper; it is `0 - v` run
                    // through the same binary-numeric helper as `BINARY_SUBTRACT`.
                    let tag = self.builder.emit_const_int(BinOp::Sub as i64);
                    let zero = self.builder.emit_const_int(0);
                    let r = self.builder.emit_call_helper(HelperId::BinaryOp, &[tag, zero, v]);
                    self.builder.emit_branch_if_null(r, self.current_error_label());
                    self.push(r, false);
                }
            }
            UnaryNot => {
                return Err(EmitError::NoRepresentativeHelper { opcode: instr.opcode, offset: instr.offset });
            }
            CompareOp => {
                let op = compare_op_of(u32_operand(instr));
                let b = self.pop_object();
                let a = self.pop_object();
                // `Eq` is the one comparison with a self-specializing entry
                // point (`helpers::compare::equals`'s cell); its call site
                // carries no op tag since the helper only ever does equality.
                let r = if op == Some(crate::tagged::CompareOp::Eq) {
                    self.builder.emit_call_helper(HelperId::CompareEqSpecialized, &[a, b])
                } else {
                    let tag = self.builder.emit_const_int(op.map(|o| o as i64).unwrap_or(-1));
                    self.builder.emit_call_helper(HelperId::RichCompare, &[tag, a, b])
                };
                self.builder.emit_branch_if_neg1(r, self.current_error_label());
                self.push(r, false);
            }
            PopJumpIfTrue => {
                let v = self.pop_object();
                self.builder.emit_branch_if_true(v, self.label_for(u32_operand(instr) as usize));
            }
            PopJumpIfFalse => {
                let v = self.pop_object();
                let not_label = self.builder.new_label();
                self.builder.emit_branch_if_true(v, not_label);
                self.builder.emit_jump(self.label_for(u32_operand(instr) as usize));
                self.builder.bind_label(not_label);
            }
            JumpIfTrueOrPop => {
                let (v, is_float) = self.peek();
                let keep_label = self.label_for(u32_operand(instr) as usize);
                self.builder.emit_branch_if_true(v, keep_label);
                self.pop();
                let _ = is_float;
            }
            JumpIfFalseOrPop => {
                let (v, _) = self.peek();
                let fallthrough = self.builder.new_label();
                self.builder.emit_branch_if_true(v, fallthrough);
                self.builder.emit_jump(self.label_for(u32_operand(instr) as usize));
                self.builder.bind_label(fallthrough);
                self.pop();
            }
            JumpForward | JumpAbsolute => {
                self.builder.emit_jump(self.label_for(u32_operand(instr) as usize));
            }
            SetupLoop => {
                self.blocks.push_loop(self.label_for(u32_operand(instr) as usize));
            }
            SetupExcept => {
                self.blocks.push_except(self.label_for(u32_operand(instr) as usize));
            }
            SetupFinally => {
                self.blocks.push_finally(self.label_for(u32_operand(instr) as usize));
            }
            PopBlock => {
                self.blocks.pop(instr.offset)?;
            }
            PopExcept => {
                self.blocks.pop(instr.offset)?;
            }
            EndFinally => {
                let triple_ok = self.builder.emit_const_bool(true);
                self.builder.emit_call_helper(HelperId::ErrRestore, &[triple_ok]);
            }
            BreakLoop => {
                let (target, _reason) = self.blocks.break_target(instr.offset)?;
                self.builder.emit_jump(target);
            }
            ContinueLoop => {
                match self.blocks.continue_crosses_finally(instr.offset)? {
                    Some(handler) => self.builder.emit_jump(handler),
                    None => self.builder.emit_jump(self.label_for(u32_operand(instr) as usize)),
                }
            }
            ReturnValue => {
                let v = self.pop_object();
                match self.blocks.return_crosses_finally() {
                    Some(handler) => self.builder.emit_jump(handler),
                    None => self.builder.emit_return(v),
                }
            }
            RaiseVarargs => {
                let n = u32_operand(instr);
                let args: Vec<ValueRef> = (0..n).map(|_| self.pop_object()).collect();
                self.builder.emit_call_helper(HelperId::Raise, &args);
                self.builder.emit_jump(self.current_error_label());
            }
            CallFunction => {
                let argc = u32_operand(instr);
                let mut args: Vec<ValueRef> = (0..argc).map(|_| self.pop_object()).collect();
                args.reverse();
                let callable = self.pop_object();
                let helper = match argc {
                    // Zero-arg calls are the one arity with a self-specializing
                    // entry point (`helpers::call::call0_specialized`'s cell).
                    0 => HelperId::Call0Specialized,
                    1 => HelperId::Call1,
                    2 => HelperId::Call2,
                    3 => HelperId::Call3,
                    4 => HelperId::Call4,
                    _ => HelperId::FancyCall,
                };
                let mut call_args = vec![callable];
                call_args.extend(args);
                let v = self.builder.emit_call_helper(helper, &call_args);
                self.builder.emit_branch_if_null(v, self.current_error_label());
                self.push(v, false);
            }
            CallFunctionVar | CallFunctionKw | CallFunctionVarKw => {
                let argc = u32_operand(instr);
                let extra = match instr.opcode {
                    CallFunctionVarKw => 2,
                    _ => 1,
                };
                let mut args: Vec<ValueRef> = (0..(argc + extra)).map(|_| self.pop_object()).collect();
                args.reverse();
                let callable = self.pop_object();
                let mut call_args = vec![callable];
                call_args.extend(args);
                let v = self.builder.emit_call_helper(HelperId::FancyCall, &call_args);
                self.builder.emit_branch_if_null(v, self.current_error_label());
                self.push(v, false);
            }
            ImportName => {
                let idx = u32_operand(instr);
                let name = self.builder.emit_load_const_pool(idx);
                let fromlist = self.pop_object();
                let level = self.pop_object();
                let v = self.builder.emit_call_helper(HelperId::ImportName, &[name, fromlist, level]);
                self.builder.emit_branch_if_null(v, self.current_error_label());
                self.push(v, false);
            }
            ImportFrom => {
                let idx = u32_operand(instr);
                let name = self.builder.emit_load_const_pool(idx);
                let (module, _) = self.peek();
                let v = self.builder.emit_call_helper(HelperId::ImportFrom, &[module, name]);
                self.builder.emit_branch_if_null(v, self.current_error_label());
                self.push(v, false);
            }
            ImportStar => {
                let module = self.pop_object();
                self.builder.emit_call_helper(HelperId::ImportStar, &[module]);
            }
            BuildClass => {
                // Matches the abstract interpreter's arity-3 stack effect:
                // name, bases, namespace. Metaclass resolution is the
                // runtime helper's concern, not something the compiled call
                // site needs to supply explicitly.
                let namespace = self.pop_object();
                let bases = self.pop_object();
                let name = self.pop_object();
                let v = self.builder.emit_call_helper(HelperId::BuildClass, &[name, bases, namespace]);
                self.builder.emit_branch_if_null(v, self.current_error_label());
                self.push(v, false);
            }
            GetIter => {
                let obj = self.pop_object();
                let v = self.builder.emit_call_helper(HelperId::GetIter, &[obj]);
                self.builder.emit_branch_if_null(v, self.current_error_label());
                self.push(v, false);
            }
            ForIter => {
                // The body edge keeps the iterator on the stack and pushes
                // the yielded value (net effect: +1, matching the abstract
                // interpreter's `ForIterBody` edge). The exit edge drops the
                // iterator instead; this emitter's linear depth counter
                // follows the body edge since loop bodies dominate the
                // instruction stream that runs next, and the exit edge
                // releases the iterator's reference before leaving.
                let (iter, _) = self.peek();
                let v = self.builder.emit_call_helper(HelperId::IterNext, &[iter]);
                let exhausted = self.builder.new_label();
                let exit = self.label_for(u32_operand(instr) as usize);
                self.builder.emit_branch_if_null(v, exhausted);
                self.push(v, false);
                let past_exit = self.builder.new_label();
                self.builder.emit_jump(past_exit);
                self.builder.bind_label(exhausted);
                self.builder.emit_decref(iter);
                self.builder.emit_jump(exit);
                self.builder.bind_label(past_exit);
            }
            MakeFunction | MakeClosure => {
                let code = self.pop_object();
                let v = self.builder.emit_call_helper(HelperId::MakeFunction, &[code]);
                self.builder.emit_branch_if_null(v, self.current_error_label());
                self.push(v, false);
            }
            ExtendedArg => unreachable!("folded away by the decoder"),
            YieldValue | YieldFrom | SetupWith | WithCleanupStart | WithCleanupFinish => {
                return Err(EmitError::NoRepresentativeHelper { opcode: instr.opcode, offset: instr.offset });
            }
            BuildTuple | BuildList | BuildMap | BuildSet => unreachable!("rejected above"),
        }
        Ok(())
    }

    fn emit_binary(&mut self, instr: &DecodedInstr) -> Result<(), EmitError> {
        let (op, is_inplace) = binop_of(instr.opcode).expect("binary opcode");
        let (b, b_float) = self.pop();
        let (a, a_float) = self.pop();
        if a_float && b_float && !self.analysis.should_box(instr.offset) {
            let fop = float_op_of(instr.opcode).expect("float-eligible op has a FloatOp mapping");
            let r = self.builder.emit_float_binop(fop, a, b);
            self.push(r, true);
        } else {
            let helper = if is_inplace { HelperId::InplaceBinaryOp } else { HelperId::BinaryOp };
            let tag = self.builder.emit_const_int(op as i64);
            let r = self.builder.emit_call_helper(helper, &[tag, a, b]);
            self.builder.emit_branch_if_null(r, self.current_error_label());
            self.push(r, false);
        }
        Ok(())
    }

    fn local_type(&self, offset: usize, idx: u32) -> AbstractValue {
        self.analysis.get_local_info(offset, idx as usize).clone()
    }

    /// The label the function routes to on a helper failure: the nearest
    /// enclosing `except` or `finally` handler if one is live, otherwise the
    /// function's single unwind-and-return-null tail bound at the end of the
    /// body.
    fn current_error_label(&self) -> Label {
        self.blocks.nearest_handler().unwrap_or(self.fail_label)
    }
}

/// Compile one function body's instructions into `builder`. Returns an error
/// (never panics) for a malformed block stack or an opcode without a
/// representative helper — both downgrade to "not compilable" at the driver.
pub fn compile_function<B: IlBuilder>(
    builder: &mut B,
    instrs: &[DecodedInstr],
    analysis: &AnalysisResult,
) -> Result<(), EmitError> {
    let mut labels = FxHashMap::default();
    for off in target_offsets(instrs) {
        labels.entry(off).or_insert_with(|| builder.new_label());
    }
    let stack_base = analysis.local_count() as u32;
    let fail_label = builder.new_label();
    let mut emitter = Emitter {
        builder,
        analysis,
        labels,
        depth: 0,
        float_depths: FxHashSet::default(),
        blocks: BlockStack::new(),
        stack_base,
        fail_label,
    };
    emitter.run(instrs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use crate::bytecode::decode_function;
    use crate::il::{IlOp, RecordingIlBuilder};

    fn build(code: Vec<u8>) -> Vec<DecodedInstr> {
        decode_function(&code).unwrap()
    }

    #[test]
    fn straight_line_add_emits_helper_call_when_boxed() {
        // LOAD_FAST 0; LOAD_CONST_INT 1; BINARY_ADD; RETURN_VALUE
        let mut code = vec![0x20];
        code.extend_from_slice(&0u16.to_be_bytes());
        code.push(0x05);
        code.extend_from_slice(&1i32.to_be_bytes());
        code.push(0x40);
        code.push(0x88);
        let instrs = build(code);
        let analysis = analyze(&instrs, 1, 1).unwrap();
        let mut b = RecordingIlBuilder::new();
        compile_function(&mut b, &instrs, &analysis).unwrap();
        assert!(b.helper_calls().contains(&HelperId::BinaryOp));
    }

    #[test]
    fn float_add_uses_native_float_binop_not_a_helper() {
        let mut c1 = vec![0x06];
        c1.extend_from_slice(&1.0f64.to_bits().to_be_bytes());
        let mut c2 = vec![0x06];
        c2.extend_from_slice(&2.0f64.to_bits().to_be_bytes());
        let mut full = c1;
        full.append(&mut c2);
        full.push(0x40);
        full.push(0x88);
        let instrs = build(full);
        let analysis = analyze(&instrs, 0, 0).unwrap();
        let mut b = RecordingIlBuilder::new();
        compile_function(&mut b, &instrs, &analysis).unwrap();
        assert!(b.ops.iter().any(|op| matches!(op, IlOp::FloatBinop(_, FloatOp::Add, _, _))));
        assert!(!b.helper_calls().contains(&HelperId::BinaryOp));
    }

    #[test]
    fn build_tuple_has_no_representative_helper() {
        let code = vec![0xA0, 0x00, 0x00, 0x00, 0x00];
        let instrs = build(code);
        let analysis = analyze(&instrs, 0, 0).unwrap();
        let mut b = RecordingIlBuilder::new();
        let err = compile_function(&mut b, &instrs, &analysis).unwrap_err();
        assert!(matches!(err, EmitError::NoRepresentativeHelper { .. }));
    }

    #[test]
    fn raise_inside_except_jumps_to_the_handler_not_the_function_tail() {
        // SETUP_EXCEPT -> 8; RAISE_VARARGS 0; [handler @ 8] LOAD_CONST_NONE; RETURN_VALUE
        let mut code = vec![0x81];
        code.extend_from_slice(&8u32.to_be_bytes());
        code.push(0x89);
        code.extend_from_slice(&0u16.to_be_bytes());
        code.push(0x08);
        code.push(0x88);
        assert_eq!(code.len(), 10);
        let instrs = build(code);
        let analysis = analyze(&instrs, 0, 0).unwrap();
        let mut b = RecordingIlBuilder::new();
        compile_function(&mut b, &instrs, &analysis).unwrap();

        let handler_label = b
            .ops
            .iter()
            .find_map(|op| match op {
                IlOp::Label(l) => Some(*l),
                _ => None,
            })
            .expect("handler label must be bound");
        let raise_jump_target = b
            .ops
            .iter()
            .find_map(|op| match op {
                IlOp::Jump(l) => Some(*l),
                _ => None,
            })
            .expect("RAISE_VARARGS must emit a jump to the handler");
        assert_eq!(raise_jump_target, handler_label, "raise must jump to the except handler, not fall off the function");
    }
}
