//! Rich-compare helper family, including the self-modifying specialization
//! cell described in spec §9 ("Self-modifying helper dispatch"): a per-call-site
//! writable slot that the generic helper rewrites to a specialized entry point
//! once it has observed the operand types, and which subsequent calls
//! dispatch through directly.

use crate::objrt::{ExactType, ObjectRuntime};
use crate::tagged::CompareResult;

/// Which specialized equals helper (if any) a call site has locked onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Specialization {
    Generic,
    ExactStr,
    ExactLong,
}

/// The writable slot emitted per call site (spec §9: "a small per-call-site
/// cell emitted into the function's non-code payload"). Lives alongside the
/// compiled function, not in this crate's own static state — one instance per
/// `COMPARE_OP` call site that participates in specialization.
#[derive(Debug, Clone, Copy)]
pub struct SpecializationCell {
    pub current: Specialization,
}

impl SpecializationCell {
    pub fn new() -> Self {
        SpecializationCell { current: Specialization::Generic }
    }
}

impl Default for SpecializationCell {
    fn default() -> Self {
        Self::new()
    }
}

/// General equals: steals `a` and `b`. On observing two operands of the same
/// exact specializable type, rewrites `cell` so the next call at this site
/// dispatches directly to the specialized helper; on a type mismatch a
/// specialized cell falls back to this generic path instead of erroring.
pub fn equals<R: ObjectRuntime>(rt: &R, cell: &mut SpecializationCell, a: R::ObjHandle, b: R::ObjHandle) -> CompareResult {
    let result = match cell.current {
        Specialization::ExactStr if rt.is_exact_str(a) && rt.is_exact_str(b) => equals_exact_str(rt, a, b),
        Specialization::ExactLong if is_exact_long(rt, a) && is_exact_long(rt, b) => equals_exact_long(rt, a, b),
        _ => {
            let r = equals_generic(rt, a, b);
            if rt.is_exact_str(a) && rt.is_exact_str(b) {
                cell.current = Specialization::ExactStr;
            } else if is_exact_long(rt, a) && is_exact_long(rt, b) {
                cell.current = Specialization::ExactLong;
            }
            r
        }
    };
    rt.decref(a);
    rt.decref(b);
    result
}

fn is_exact_long<R: ObjectRuntime>(rt: &R, obj: R::ObjHandle) -> bool {
    matches!(rt.exact_type(obj), ExactType::Int)
}

fn equals_exact_str<R: ObjectRuntime>(rt: &R, a: R::ObjHandle, b: R::ObjHandle) -> CompareResult {
    equals_generic(rt, a, b)
}

fn equals_exact_long<R: ObjectRuntime>(rt: &R, a: R::ObjHandle, b: R::ObjHandle) -> CompareResult {
    match (rt.as_i64(a), rt.as_i64(b)) {
        (Some(x), Some(y)) => (x == y) as i32,
        _ => equals_generic(rt, a, b),
    }
}

fn equals_generic<R: ObjectRuntime>(rt: &R, a: R::ObjHandle, b: R::ObjHandle) -> CompareResult {
    match (rt.as_i64(a), rt.as_i64(b)) {
        (Some(x), Some(y)) => (x == y) as i32,
        _ => match rt.str_eq(a, b) {
            Some(eq) => eq as i32,
            None => rt.int_compare(crate::tagged::CompareOp::Eq, a, b),
        },
    }
}

/// The general ordered-compare helper, used when no specialization applies.
pub fn rich_compare<R: ObjectRuntime>(
    rt: &R,
    op: crate::tagged::CompareOp,
    a: R::ObjHandle,
    b: R::ObjHandle,
) -> CompareResult {
    let result = rt.int_compare(op, a, b);
    rt.decref(a);
    rt.decref(b);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objrt::{TestObjectRuntime, Value};

    #[test]
    fn first_call_is_generic_then_specializes_to_exact_long() {
        let rt = TestObjectRuntime::new();
        let mut cell = SpecializationCell::new();
        assert_eq!(cell.current, Specialization::Generic);

        let a = rt.alloc(Value::Int(1));
        let b = rt.alloc(Value::Int(1));
        assert_eq!(equals(&rt, &mut cell, a, b), 1);
        assert_eq!(cell.current, Specialization::ExactLong);

        let c = rt.alloc(Value::Int(2));
        let d = rt.alloc(Value::Int(3));
        assert_eq!(equals(&rt, &mut cell, c, d), 0);
    }

    #[test]
    fn specialized_cell_falls_back_on_type_mismatch() {
        let rt = TestObjectRuntime::new();
        let mut cell = SpecializationCell { current: Specialization::ExactLong };
        let a = rt.alloc(Value::Str("x".into()));
        let b = rt.alloc(Value::Str("x".into()));
        // Specialized for ExactLong but called with strings: must still
        // produce the correct generic-path answer rather than misbehaving.
        assert_eq!(equals(&rt, &mut cell, a, b), 1);
    }
}
