//! IL builder interface (component F) — assumed present per the design's scope.
//!
//! This crate never implements a register allocator or instruction selector;
//! [`IlBuilder`] is the seam the stack-effect compiler drives, with one
//! recording implementation ([`RecordingIlBuilder`]) kept for tests, the same
//! role the teacher's `StubBackend` plays for its own pipeline
//! (`backend/stub.rs`: emit a placeholder and let the tests assert on shape,
//! never on real machine code).

use std::fmt;

use crate::helpers::HelperId;

/// An opaque SSA-ish value handle returned by IL emission. Carries no meaning
/// outside the builder that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueRef(pub u32);

/// An opaque branch target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Labels, locals, branches, calls, and typed stack ops. The stack-effect
/// compiler (component G) is the only caller.
pub trait IlBuilder {
    fn new_label(&mut self) -> Label;
    fn bind_label(&mut self, label: Label);

    fn emit_const_int(&mut self, v: i64) -> ValueRef;
    fn emit_const_float(&mut self, v: f64) -> ValueRef;
    fn emit_const_bool(&mut self, v: bool) -> ValueRef;
    fn emit_const_none(&mut self) -> ValueRef;

    fn emit_load_local(&mut self, idx: u32) -> ValueRef;
    fn emit_store_local(&mut self, idx: u32, value: ValueRef);

    /// Loads entry `idx` of the function's constant pool (interned strings,
    /// name-table entries) — a plain indexed read, same tier as
    /// `emit_load_local`, never a helper call: the pool is resolved once at
    /// compile time, not looked up through the object runtime per access.
    fn emit_load_const_pool(&mut self, idx: u32) -> ValueRef;

    /// Call a runtime helper with `args`, returning its (possibly null/-1) result.
    fn emit_call_helper(&mut self, helper: HelperId, args: &[ValueRef]) -> ValueRef;

    /// Native double arithmetic on a VALUE-slot operand, no helper call.
    fn emit_float_binop(&mut self, op: FloatOp, a: ValueRef, b: ValueRef) -> ValueRef;

    fn emit_jump(&mut self, target: Label);
    /// Tests a pointer-returning helper's result for null (the object-return
    /// error sentinel) and branches to `target` if so.
    fn emit_branch_if_null(&mut self, value: ValueRef, target: Label);
    /// Tests an int-returning helper's result for -1 (the int-return error
    /// sentinel) and branches to `target` if so.
    fn emit_branch_if_neg1(&mut self, value: ValueRef, target: Label);
    /// Unconditional on a boolean VALUE-slot operand (used for the branch-or-error
    /// fusion pattern once the error case has already branched away).
    fn emit_branch_if_true(&mut self, value: ValueRef, target: Label);

    fn emit_return(&mut self, value: ValueRef);
    /// A deliberately unreachable landing point, used for the function-root
    /// "no enclosing handler" failure path.
    fn emit_return_null(&mut self);

    fn emit_decref(&mut self, value: ValueRef);
    fn emit_incref(&mut self, value: ValueRef);
}

#[derive(Debug, Clone, PartialEq)]
pub enum IlOp {
    Label(Label),
    ConstInt(ValueRef, i64),
    ConstFloat(ValueRef, f64),
    ConstBool(ValueRef, bool),
    ConstNone(ValueRef),
    LoadLocal(ValueRef, u32),
    StoreLocal(u32, ValueRef),
    LoadConstPool(ValueRef, u32),
    CallHelper(ValueRef, HelperId, Vec<ValueRef>),
    FloatBinop(ValueRef, FloatOp, ValueRef, ValueRef),
    Jump(Label),
    BranchIfNull(ValueRef, Label),
    BranchIfNeg1(ValueRef, Label),
    BranchIfTrue(ValueRef, Label),
    Return(ValueRef),
    ReturnNull,
    Decref(ValueRef),
    Incref(ValueRef),
}

/// Records every emitted IL operation in order instead of generating machine
/// code — a test double, not a second production backend.
#[derive(Default)]
pub struct RecordingIlBuilder {
    pub ops: Vec<IlOp>,
    next_value: u32,
    next_label: u32,
}

impl RecordingIlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh_value(&mut self) -> ValueRef {
        let v = ValueRef(self.next_value);
        self.next_value += 1;
        v
    }

    pub fn helper_calls(&self) -> Vec<HelperId> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                IlOp::CallHelper(_, h, _) => Some(*h),
                _ => None,
            })
            .collect()
    }
}

impl IlBuilder for RecordingIlBuilder {
    fn new_label(&mut self) -> Label {
        let l = Label(self.next_label);
        self.next_label += 1;
        l
    }

    fn bind_label(&mut self, label: Label) {
        self.ops.push(IlOp::Label(label));
    }

    fn emit_const_int(&mut self, v: i64) -> ValueRef {
        let r = self.fresh_value();
        self.ops.push(IlOp::ConstInt(r, v));
        r
    }

    fn emit_const_float(&mut self, v: f64) -> ValueRef {
        let r = self.fresh_value();
        self.ops.push(IlOp::ConstFloat(r, v));
        r
    }

    fn emit_const_bool(&mut self, v: bool) -> ValueRef {
        let r = self.fresh_value();
        self.ops.push(IlOp::ConstBool(r, v));
        r
    }

    fn emit_const_none(&mut self) -> ValueRef {
        let r = self.fresh_value();
        self.ops.push(IlOp::ConstNone(r));
        r
    }

    fn emit_load_local(&mut self, idx: u32) -> ValueRef {
        let r = self.fresh_value();
        self.ops.push(IlOp::LoadLocal(r, idx));
        r
    }

    fn emit_store_local(&mut self, idx: u32, value: ValueRef) {
        self.ops.push(IlOp::StoreLocal(idx, value));
    }

    fn emit_load_const_pool(&mut self, idx: u32) -> ValueRef {
        let r = self.fresh_value();
        self.ops.push(IlOp::LoadConstPool(r, idx));
        r
    }

    fn emit_call_helper(&mut self, helper: HelperId, args: &[ValueRef]) -> ValueRef {
        let r = self.fresh_value();
        self.ops.push(IlOp::CallHelper(r, helper, args.to_vec()));
        r
    }

    fn emit_float_binop(&mut self, op: FloatOp, a: ValueRef, b: ValueRef) -> ValueRef {
        let r = self.fresh_value();
        self.ops.push(IlOp::FloatBinop(r, op, a, b));
        r
    }

    fn emit_jump(&mut self, target: Label) {
        self.ops.push(IlOp::Jump(target));
    }

    fn emit_branch_if_null(&mut self, value: ValueRef, target: Label) {
        self.ops.push(IlOp::BranchIfNull(value, target));
    }

    fn emit_branch_if_neg1(&mut self, value: ValueRef, target: Label) {
        self.ops.push(IlOp::BranchIfNeg1(value, target));
    }

    fn emit_branch_if_true(&mut self, value: ValueRef, target: Label) {
        self.ops.push(IlOp::BranchIfTrue(value, target));
    }

    fn emit_return(&mut self, value: ValueRef) {
        self.ops.push(IlOp::Return(value));
    }

    fn emit_return_null(&mut self) {
        self.ops.push(IlOp::ReturnNull);
    }

    fn emit_decref(&mut self, value: ValueRef) {
        self.ops.push(IlOp::Decref(value));
    }

    fn emit_incref(&mut self, value: ValueRef) {
        self.ops.push(IlOp::Incref(value));
    }
}

impl fmt::Debug for RecordingIlBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingIlBuilder").field("ops", &self.ops.len()).finish()
    }
}
