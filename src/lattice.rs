//! Abstract value lattice (component D).
//!
//! Bottom is the least element (reached on no incoming edges yet); Any is the
//! greatest (join of incompatible kinds). `MaybeUndefined` wraps a local that
//! may be unassigned on some incoming control-flow edge — reading one must
//! emit a liveness check rather than being folded away.

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AbstractValue {
    Bottom,
    Int,
    Float,
    Bool,
    String,
    Bytes,
    NoneVal,
    Tuple,
    List,
    Dict,
    Set,
    Slice,
    Function,
    Method,
    BuiltinCallable,
    /// A singleton that carries no further refinement; widest non-Bottom value.
    Any,
    /// A local that may be unassigned on some incoming edge.
    MaybeUndefined(Box<AbstractValue>),
    /// Not yet assigned on any edge analyzed so far; distinct from Bottom,
    /// which means "no edge reaches this point at all".
    Undefined,
}

impl AbstractValue {
    /// Only Float participates in compile-time unboxing in the minimum viable
    /// implementation (§4.E); Int unboxing is handled by the tagged-pointer
    /// path at run time instead.
    pub fn supports_unboxed_storage(&self) -> bool {
        matches!(self, AbstractValue::Float)
    }

    /// Least-upper-bound join. Singletons of different kinds widen to `Any`;
    /// equal kinds are idempotent; `Bottom` is the identity; `Undefined`
    /// joined with a defined value yields `MaybeUndefined`.
    pub fn join(&self, other: &AbstractValue) -> AbstractValue {
        use AbstractValue::*;
        match (self, other) {
            (Bottom, x) | (x, Bottom) => x.clone(),
            (Any, _) | (_, Any) => Any,
            (Undefined, Undefined) => Undefined,
            (Undefined, x) | (x, Undefined) => MaybeUndefined(Box::new(x.clone())),
            (MaybeUndefined(a), MaybeUndefined(b)) => {
                MaybeUndefined(Box::new(a.join(b)))
            }
            (MaybeUndefined(a), x) | (x, MaybeUndefined(a)) => {
                MaybeUndefined(Box::new(a.join(x)))
            }
            (a, b) if a == b => a.clone(),
            // Int and Bool join to a numeric supertype with no unboxed storage,
            // per the wider-class carve-out in §4.D.
            (Int, Bool) | (Bool, Int) => Any,
            _ => Any,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AbstractValue::*;

    #[test]
    fn bottom_is_identity() {
        assert_eq!(Bottom.join(&Int), Int);
        assert_eq!(Int.join(&Bottom), Int);
    }

    #[test]
    fn equal_kinds_are_idempotent() {
        assert_eq!(Float.join(&Float), Float);
    }

    #[test]
    fn different_singletons_widen_to_any() {
        assert_eq!(Int.join(&String), Any);
        assert_eq!(Tuple.join(&List), Any);
    }

    #[test]
    fn undefined_join_produces_maybe_undefined() {
        assert_eq!(Undefined.join(&Int), MaybeUndefined(Box::new(Int)));
        assert_eq!(Int.join(&Undefined), MaybeUndefined(Box::new(Int)));
    }

    #[test]
    fn any_absorbs_everything() {
        assert_eq!(Any.join(&Int), Any);
        assert_eq!(Float.join(&Any), Any);
    }

    #[test]
    fn only_float_supports_unboxed_storage() {
        assert!(Float.supports_unboxed_storage());
        assert!(!Int.supports_unboxed_storage());
        assert!(!Bool.supports_unboxed_storage());
    }
}
