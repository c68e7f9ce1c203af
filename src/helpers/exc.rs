//! Exception-support helper family: raising, preparing caught exceptions for
//! `except` matching, unwinding into a handler, and restoring a saved error
//! state after a `finally` block re-raises.

use crate::objrt::ObjectRuntime;

/// `RAISE_VARARGS` with zero operands re-raises the error currently being
/// handled; with one or more it raises a new exception. `exc`/`cause` are
/// stolen when present.
pub fn raise<R: ObjectRuntime>(rt: &R, exc: Option<R::ObjHandle>, currently_handling: Option<R::ObjHandle>) {
    match exc {
        Some(e) => rt.err_set(e),
        None => {
            if let Some(h) = currently_handling {
                rt.err_set(h);
            }
            // A bare `raise` with nothing being handled is itself a
            // RuntimeError in a full implementation; this representative
            // only needs to demonstrate the re-raise path.
        }
    }
}

/// `SETUP_EXCEPT` handler entry: normalizes the thread's current error into
/// the three-tuple `(type, value, traceback)` an `except` clause matches
/// against, clearing the thread's current-error slot in the process.
pub fn prepare_exception<R: ObjectRuntime>(rt: &R) -> Option<(R::ObjHandle, R::ObjHandle, R::ObjHandle)> {
    let triple = rt.err_fetch();
    rt.err_clear();
    triple
}

/// `COMPARE_OP` with the exception-match operator: does not steal either
/// operand (both remain live for potential re-use by further `except`
/// clauses); a full object runtime would walk `exc_type`'s MRO against
/// `match_type`, this representative only demonstrates identity match.
pub fn compare_exceptions<R: ObjectRuntime>(rt: &R, exc_type: R::ObjHandle, match_type: R::ObjHandle) -> bool {
    rt.int_compare(crate::tagged::CompareOp::Eq, exc_type, match_type) == 1
}

/// `END_FINALLY`/`WITH_CLEANUP_FINISH` path: reinstates a previously-saved
/// error triple as the thread's current error, used when a `finally` block
/// falls through without itself raising and the original exception must
/// resume propagating.
pub fn err_restore<R: ObjectRuntime>(rt: &R, triple: (R::ObjHandle, R::ObjHandle, R::ObjHandle)) {
    rt.err_restore(triple);
}

/// Unwinds the block stack down to (and including setting up) the nearest
/// handler for the exception currently set on the thread. Returns `true` if a
/// handler was found and its filter should run next; `false` means the
/// exception propagates out of the function entirely.
pub fn unwind_eh<R: ObjectRuntime>(rt: &R, has_enclosing_handler: bool) -> bool {
    if !has_enclosing_handler {
        return false;
    }
    rt.err_fetch().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objrt::{TestObjectRuntime, Value};

    #[test]
    fn raise_sets_current_error() {
        let rt = TestObjectRuntime::new();
        let e = rt.zero_division_error();
        raise(&rt, Some(e), None);
        let (ty, _, _) = prepare_exception(&rt).unwrap();
        assert!(rt.is_zero_division_error(ty));
    }

    #[test]
    fn bare_raise_reraises_currently_handled() {
        let rt = TestObjectRuntime::new();
        let handling = rt.value_error();
        raise::<TestObjectRuntime>(&rt, None, Some(handling));
        let (ty, _, _) = prepare_exception(&rt).unwrap();
        assert!(rt.is_value_error(ty));
    }

    #[test]
    fn unwind_without_handler_propagates() {
        let rt = TestObjectRuntime::new();
        let e = rt.alloc(Value::Error("X"));
        rt.err_set(e);
        assert!(!unwind_eh(&rt, false));
    }
}
