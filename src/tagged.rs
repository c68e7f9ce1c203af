//! Tagged-integer fast paths (component B).
//!
//! A small integer is represented as `(value << 1) | 1` — a machine word with its
//! low bit set. Any word with the low bit clear is a boxed object pointer
//! (alignment guarantees real heap pointers never have that bit set). The tag
//! bit is checked before dereference, never after.
//!
//! This module owns only the tagging scheme and the per-operator fast paths.
//! The actual heap big-integer type lives behind [`crate::objrt::ObjectRuntime`]
//! — on overflow this module builds a transient, stack-allocated operand (see
//! [`TransientBigInt`]) and delegates to the object runtime, exactly as a real
//! helper would delegate to the host's bignum routines.

use crate::objrt::ObjectRuntime;

/// One bit reserved for the tag; the payload is sign-extended from the remaining bits.
const TAG_BITS: u32 = 1;
const PAYLOAD_BITS: u32 = i64::BITS - TAG_BITS;
const MAX_TAGGED: i64 = (1i64 << (PAYLOAD_BITS - 1)) - 1;
const MIN_TAGGED: i64 = -(1i64 << (PAYLOAD_BITS - 1));

/// A tagged machine word: either a small integer or (conceptually) a pointer.
/// This crate never touches real pointers directly — `Tagged` models only the
/// integer-tagged side, produced and consumed by [`tag`] / [`untag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tagged(pub u64);

/// True when the low bit of a raw word is set, i.e. it is a tagged integer and
/// must not be dereferenced as a pointer.
#[inline]
pub fn is_tagged(word: u64) -> bool {
    word & 1 == 1
}

/// Attempt to represent `v` as a tagged integer. `None` if it doesn't fit in the
/// tagged range, meaning the caller must heap-allocate instead.
#[inline]
pub fn tag(v: i64) -> Option<Tagged> {
    if (MIN_TAGGED..=MAX_TAGGED).contains(&v) {
        Some(Tagged(((v << TAG_BITS) | 1) as u64))
    } else {
        None
    }
}

/// Recover the signed value from a tagged word. Caller must have already
/// checked [`is_tagged`].
#[inline]
pub fn untag(t: Tagged) -> i64 {
    (t.0 as i64) >> TAG_BITS
}

/// Three-state comparison result per spec §4.B: helpers return -1 for error,
/// 0 for false, 1 for true, never a boxed bool.
pub type CompareResult = i32;

/// The outcome of a tagged binary operation: stays in the fast path, promotes to
/// a heap integer by one bit of overflow, or falls all the way back to generic
/// object-runtime arithmetic via a transient big-integer operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaggedOutcome<H> {
    Tagged(Tagged),
    Heap(H),
}

/// A stack-allocated stand-in for a heap big-integer, used only to cross into
/// generic object-runtime arithmetic without allocating. Its refcount is a
/// pinned sentinel (see [`PINNED_REFCOUNT`]) so that a generic `decref` on it
/// is a no-op; it must never escape the call that created it.
#[derive(Debug, Clone, Copy)]
pub struct TransientBigInt {
    pub value: i128,
    pub refcount: u64,
}

/// Larger than any realistic sequence of decrements could reach during the
/// transient's lifetime (a single helper call).
pub const PINNED_REFCOUNT: u64 = u64::MAX;

impl TransientBigInt {
    pub fn new(value: i128) -> Self {
        TransientBigInt { value, refcount: PINNED_REFCOUNT }
    }
}

/// Binary arithmetic/bitwise operators with tagged-path specializations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    FloorDiv,
    Mod,
    And,
    Or,
    Xor,
    Lshift,
    Rshift,
    Pow,
}

/// Ordered comparisons, returning the three-state [`CompareResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Le,
    Eq,
    Ne,
    Gt,
    Ge,
}

/// True division always produces a float and never participates in the tagged
/// integer path (spec §4.B): division by zero is the object runtime's concern.
pub fn true_divide<R: ObjectRuntime>(rt: &R, a: i64, b: i64) -> Result<f64, R::ObjHandle> {
    if b == 0 {
        Err(rt.zero_division_error())
    } else {
        Ok(a as f64 / b as f64)
    }
}

/// Run a tagged-path binary op between two already-untagged integers, promoting
/// to the object runtime's big-integer arithmetic on overflow.
pub fn binary_op<R: ObjectRuntime>(rt: &R, op: BinOp, a: i64, b: i64) -> TaggedOutcome<R::ObjHandle> {
    let wide: Option<i128> = match op {
        BinOp::Add => (a as i128).checked_add(b as i128),
        BinOp::Sub => (a as i128).checked_sub(b as i128),
        BinOp::Mul => (a as i128).checked_mul(b as i128),
        BinOp::FloorDiv => {
            if b == 0 {
                return TaggedOutcome::Heap(rt.zero_division_error());
            }
            let (a, b) = (a as i128, b as i128);
            let q = a / b;
            let r = a % b;
            Some(if r != 0 && (r < 0) != (b < 0) { q - 1 } else { q })
        }
        BinOp::Mod => {
            if b == 0 {
                return TaggedOutcome::Heap(rt.zero_division_error());
            }
            let (a, b) = (a as i128, b as i128);
            let r = a % b;
            Some(if r != 0 && (r < 0) != (b < 0) { r + b } else { r })
        }
        BinOp::And => Some((a & b) as i128),
        BinOp::Or => Some((a | b) as i128),
        BinOp::Xor => Some((a ^ b) as i128),
        BinOp::Lshift => {
            if b < 0 {
                return TaggedOutcome::Heap(rt.value_error());
            }
            // A shift that would clobber the tag bit falls back to big-integer shift.
            if b >= PAYLOAD_BITS as i64 {
                None
            } else {
                (a as i128).checked_shl(b as u32)
            }
        }
        BinOp::Rshift => {
            if b < 0 {
                return TaggedOutcome::Heap(rt.value_error());
            }
            Some((a >> b.min(63)) as i128)
        }
        BinOp::Pow => {
            if b < 0 || b > u32::MAX as i64 {
                None
            } else {
                (a as i128).checked_pow(b as u32)
            }
        }
    };

    match wide {
        Some(w) if (MIN_TAGGED as i128..=MAX_TAGGED as i128).contains(&w) => {
            TaggedOutcome::Tagged(tag(w as i64).expect("checked range above"))
        }
        Some(w) => {
            log::trace!("tagged arithmetic overflow, promoting {:?} to heap integer", op);
            let transient = TransientBigInt::new(w);
            TaggedOutcome::Heap(rt.big_int_from_transient(transient))
        }
        None => {
            log::trace!("tagged arithmetic overflow beyond i128, delegating to object runtime");
            TaggedOutcome::Heap(rt.big_int_binary_op_i64(op, a, b))
        }
    }
}

/// Ordered comparison between two untagged integers; never fails.
pub fn compare(op: CompareOp, a: i64, b: i64) -> CompareResult {
    let r = match op {
        CompareOp::Lt => a < b,
        CompareOp::Le => a <= b,
        CompareOp::Eq => a == b,
        CompareOp::Ne => a != b,
        CompareOp::Gt => a > b,
        CompareOp::Ge => a >= b,
    };
    r as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objrt::TestObjectRuntime;

    #[test]
    fn tag_untag_roundtrip() {
        for v in [0i64, 1, -1, MAX_TAGGED, MIN_TAGGED, 12345, -98765] {
            let t = tag(v).unwrap_or_else(|| panic!("{v} should fit"));
            assert!(is_tagged(t.0));
            assert_eq!(untag(t), v);
        }
    }

    #[test]
    fn out_of_range_does_not_tag() {
        assert!(tag(MAX_TAGGED + 1).is_none());
        assert!(tag(MIN_TAGGED - 1).is_none());
    }

    #[test]
    fn add_stays_tagged_when_no_overflow() {
        let rt = TestObjectRuntime::new();
        match binary_op(&rt, BinOp::Add, 1, 1) {
            TaggedOutcome::Tagged(t) => assert_eq!(untag(t), 2),
            TaggedOutcome::Heap(_) => panic!("should not overflow"),
        }
    }

    #[test]
    fn add_overflow_promotes_to_heap() {
        let rt = TestObjectRuntime::new();
        match binary_op(&rt, BinOp::Add, MAX_TAGGED, 1) {
            TaggedOutcome::Heap(h) => {
                assert_eq!(rt.debug_int_value(h), MAX_TAGGED as i128 + 1);
            }
            TaggedOutcome::Tagged(_) => panic!("should overflow"),
        }
    }

    #[test]
    fn floor_div_by_zero_raises() {
        let rt = TestObjectRuntime::new();
        match binary_op(&rt, BinOp::FloorDiv, 1, 0) {
            TaggedOutcome::Heap(h) => assert!(rt.is_zero_division_error(h)),
            TaggedOutcome::Tagged(_) => panic!("expected error"),
        }
    }

    #[test]
    fn negative_lshift_count_raises() {
        let rt = TestObjectRuntime::new();
        match binary_op(&rt, BinOp::Lshift, 1, -1) {
            TaggedOutcome::Heap(h) => assert!(rt.is_value_error(h)),
            TaggedOutcome::Tagged(_) => panic!("expected error"),
        }
    }

    #[test]
    fn lshift_clobbering_tag_bit_falls_back() {
        let rt = TestObjectRuntime::new();
        match binary_op(&rt, BinOp::Lshift, 1, PAYLOAD_BITS as i64) {
            TaggedOutcome::Heap(_) => {}
            TaggedOutcome::Tagged(_) => panic!("should fall back"),
        }
    }

    #[test]
    fn tagged_soundness_against_generic_path() {
        // For a grid of small (i, j), op(i, j) on the tagged path must equal
        // the i128-precision reference result truncated the same way.
        let rt = TestObjectRuntime::new();
        let values = [-5i64, -1, 0, 1, 2, 5, 17];
        for &i in &values {
            for &j in &values {
                for op in [
                    BinOp::Add,
                    BinOp::Sub,
                    BinOp::Mul,
                    BinOp::And,
                    BinOp::Or,
                    BinOp::Xor,
                    BinOp::FloorDiv,
                    BinOp::Mod,
                ] {
                    if j == 0 && matches!(op, BinOp::FloorDiv | BinOp::Mod) {
                        continue;
                    }
                    let expected = match op {
                        BinOp::Add => i as i128 + j as i128,
                        BinOp::Sub => i as i128 - j as i128,
                        BinOp::Mul => i as i128 * j as i128,
                        BinOp::And => (i & j) as i128,
                        BinOp::Or => (i | j) as i128,
                        BinOp::Xor => (i ^ j) as i128,
                        BinOp::FloorDiv => {
                            let (a, b) = (i as i128, j as i128);
                            let q = a / b;
                            let r = a % b;
                            if r != 0 && (r < 0) != (b < 0) {
                                q - 1
                            } else {
                                q
                            }
                        }
                        BinOp::Mod => {
                            let (a, b) = (i as i128, j as i128);
                            let r = a % b;
                            if r != 0 && (r < 0) != (b < 0) {
                                r + b
                            } else {
                                r
                            }
                        }
                        _ => unreachable!(),
                    };
                    let actual = match binary_op(&rt, op, i, j) {
                        TaggedOutcome::Tagged(t) => untag(t) as i128,
                        TaggedOutcome::Heap(h) => rt.debug_int_value(h),
                    };
                    assert_eq!(actual, expected, "op={op:?} i={i} j={j}");
                }
            }
        }
    }

    #[test]
    fn floor_div_and_mod_follow_python_sign_convention() {
        let rt = TestObjectRuntime::new();
        let cases: &[(i64, i64, i128, i128)] =
            &[(7, -2, -4, -1), (-7, 2, -4, 1), (7, 2, 3, 1), (-7, -2, 3, -1)];
        for &(a, b, expected_q, expected_r) in cases {
            let q = match binary_op(&rt, BinOp::FloorDiv, a, b) {
                TaggedOutcome::Tagged(t) => untag(t) as i128,
                TaggedOutcome::Heap(h) => rt.debug_int_value(h),
            };
            assert_eq!(q, expected_q, "{a} // {b}");
            let r = match binary_op(&rt, BinOp::Mod, a, b) {
                TaggedOutcome::Tagged(t) => untag(t) as i128,
                TaggedOutcome::Heap(h) => rt.debug_int_value(h),
            };
            assert_eq!(r, expected_r, "{a} % {b}");
        }
    }

    #[test]
    fn comparisons_are_three_state() {
        assert_eq!(compare(CompareOp::Lt, 1, 2), 1);
        assert_eq!(compare(CompareOp::Lt, 2, 1), 0);
        assert_eq!(compare(CompareOp::Eq, 3, 3), 1);
    }
}
