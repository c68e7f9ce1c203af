//! Binary / in-place numeric helper family, plus tag-aware `DecRef`.
//!
//! The "add" and "inplace-add" variants both special-case string
//! concatenation when both operands are exact strings, per spec §4.C —
//! matching `PyJit_Add`'s `PyUnicode_CheckExact` check ahead of the numeric
//! fallback regardless of in-place-ness.

use crate::objrt::{ExactType, ObjectRuntime};
use crate::tagged::{untag, BinOp, Tagged, TaggedOutcome};

/// Binary numeric helper: steals `a` and `b`, returns a new owned reference on
/// success or `None` on failure (the object-return sentinel). `is_inplace`
/// only affects dispatch upstream of this helper (which opcode calls it);
/// the string-concatenation special case for `Add` applies either way.
pub fn binary_op<R: ObjectRuntime>(
    rt: &R,
    op: BinOp,
    a: R::ObjHandle,
    b: R::ObjHandle,
    _is_inplace: bool,
) -> Option<R::ObjHandle> {
    if op == BinOp::Add && rt.is_exact_str(a) && rt.is_exact_str(b) {
        let result = rt.str_concat(a, b);
        rt.decref(a);
        rt.decref(b);
        return Some(result);
    }

    if matches!(rt.exact_type(a), ExactType::Int) && matches!(rt.exact_type(b), ExactType::Int) {
        let ai = rt.as_i64(a);
        let bi = rt.as_i64(b);
        if let (Some(ai), Some(bi)) = (ai, bi) {
            let outcome = crate::tagged::binary_op(rt, op, ai, bi);
            rt.decref(a);
            rt.decref(b);
            return Some(match outcome {
                TaggedOutcome::Tagged(t) => rt.big_int_from_transient(crate::tagged::TransientBigInt::new(untag(t) as i128)),
                TaggedOutcome::Heap(h) => h,
            });
        }
    }

    rt.decref(a);
    rt.decref(b);
    None
}

/// Fast path for an already-untagged pair of tagged integers — never touches
/// the object runtime unless the result must promote. Returns the tagged
/// result directly, or delegates for an overflow/zero-division/value-error
/// case.
pub fn tagged_fast_path<R: ObjectRuntime>(rt: &R, op: BinOp, a: Tagged, b: Tagged) -> TaggedOutcome<R::ObjHandle> {
    crate::tagged::binary_op(rt, op, untag(a), untag(b))
}

/// Tag-aware decref: skips tagged words (they carry no refcount) and only
/// decrefs real object pointers. Matches spec §4.C's "`DecRef` that first
/// checks the tag bit".
pub fn decref_tagged<R: ObjectRuntime>(rt: &R, word: u64, handle_if_object: Option<R::ObjHandle>) {
    if crate::tagged::is_tagged(word) {
        return;
    }
    if let Some(h) = handle_if_object {
        rt.decref(h);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objrt::{TestObjectRuntime, Value};

    #[test]
    fn inplace_add_concatenates_exact_strings() {
        let rt = TestObjectRuntime::new();
        let a = rt.alloc(Value::Str("foo".into()));
        let b = rt.alloc(Value::Str("bar".into()));
        let r = binary_op(&rt, BinOp::Add, a, b, true).unwrap();
        assert_eq!(rt.debug_str_value(r), "foobar");
    }

    #[test]
    fn non_inplace_add_also_concatenates_exact_strings() {
        let rt = TestObjectRuntime::new();
        let a = rt.alloc(Value::Str("foo".into()));
        let b = rt.alloc(Value::Str("bar".into()));
        let r = binary_op(&rt, BinOp::Add, a, b, false).unwrap();
        assert_eq!(rt.debug_str_value(r), "foobar");
    }

    #[test]
    fn binary_add_on_ints_goes_through_tagged_path() {
        let rt = TestObjectRuntime::new();
        let a = rt.alloc(Value::Int(1));
        let b = rt.alloc(Value::Int(2));
        let r = binary_op(&rt, BinOp::Add, a, b, false).unwrap();
        assert_eq!(rt.debug_int_value(r), 3);
    }

    #[test]
    fn decref_tagged_skips_tagged_words() {
        let rt = TestObjectRuntime::new();
        let tagged_word = crate::tagged::tag(5).unwrap().0;
        // Must not panic even though no handle is supplied: a tagged word
        // carries no refcount to release.
        decref_tagged(&rt, tagged_word, None);
    }
}
