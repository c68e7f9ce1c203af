//! Iteration helper family: `GET_ITER`/`FOR_ITER` support and sequence
//! unpacking, including the direct-lift fast path for exact tuples/lists.

use crate::objrt::{ExactType, ObjectRuntime};

/// Outcome of advancing an iterator one step.
#[derive(Debug)]
pub enum IterStep<H> {
    Value(H),
    Exhausted,
    Error,
}

/// `GET_ITER`: steals `obj`, returns a new owned iterator or `None` on error
/// (the object's `__iter__` raised or it isn't iterable).
pub fn get_iter<R: ObjectRuntime>(rt: &R, obj: R::ObjHandle) -> Option<R::ObjHandle> {
    let result = rt.get_iter(obj);
    rt.decref(obj);
    result
}

/// `FOR_ITER`: does not steal `iter` (the loop keeps it live across
/// iterations); distinguishes a clean `StopIteration` from a real exception
/// so the compiler can route the former to the loop-exit label and the
/// latter to the nearest exception handler.
pub fn iter_next<R: ObjectRuntime>(rt: &R, iter: R::ObjHandle) -> IterStep<R::ObjHandle> {
    match rt.iter_next(iter) {
        (Some(v), _) => IterStep::Value(v),
        (None, false) => IterStep::Exhausted,
        (None, true) => IterStep::Error,
    }
}

/// `UNPACK_SEQUENCE`: steals `obj`, returns `count` new owned references in
/// source order, or `None` if the length doesn't match or the object can't be
/// indexed directly. Exact tuples/lists take the direct-index lift; anything
/// else falls back to the general iterator protocol.
pub fn unpack_sequence<R: ObjectRuntime>(rt: &R, obj: R::ObjHandle, count: usize) -> Option<Vec<R::ObjHandle>> {
    let result = if matches!(rt.exact_type(obj), ExactType::Tuple | ExactType::List) {
        unpack_direct(rt, obj, count)
    } else {
        unpack_via_iterator(rt, obj, count)
    };
    rt.decref(obj);
    result
}

fn unpack_direct<R: ObjectRuntime>(rt: &R, obj: R::ObjHandle, count: usize) -> Option<Vec<R::ObjHandle>> {
    if rt.len(obj)? != count {
        return None;
    }
    (0..count).map(|i| rt.get_item_index(obj, i)).collect()
}

fn unpack_via_iterator<R: ObjectRuntime>(rt: &R, obj: R::ObjHandle, count: usize) -> Option<Vec<R::ObjHandle>> {
    let iter = rt.get_iter(obj)?;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        match rt.iter_next(iter) {
            (Some(v), _) => out.push(v),
            (None, _) => {
                rt.decref(iter);
                for v in out {
                    rt.decref(v);
                }
                return None;
            }
        }
    }
    // A well-formed unpack must exhaust the iterator exactly; one extra value
    // means there were too many elements.
    let trailing = rt.iter_next(iter);
    rt.decref(iter);
    if !matches!(trailing, (None, false)) {
        for v in out {
            rt.decref(v);
        }
        return None;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objrt::{TestObjectRuntime, Value};

    #[test]
    fn unpack_direct_lift_on_exact_tuple() {
        let rt = TestObjectRuntime::new();
        let t = rt.alloc(Value::Tuple(vec![Value::Int(1), Value::Int(2), Value::Int(3)]));
        let items = unpack_sequence(&rt, t, 3).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(rt.debug_int_value(items[1]), 2);
    }

    #[test]
    fn unpack_direct_rejects_length_mismatch() {
        let rt = TestObjectRuntime::new();
        let t = rt.alloc(Value::Tuple(vec![Value::Int(1), Value::Int(2)]));
        assert!(unpack_sequence(&rt, t, 3).is_none());
    }

    #[test]
    fn for_iter_reports_clean_exhaustion() {
        let rt = TestObjectRuntime::new();
        let t = rt.alloc(Value::Tuple(vec![]));
        let iter = get_iter(&rt, t).unwrap();
        assert!(matches!(iter_next(&rt, iter), IterStep::Exhausted));
    }
}
