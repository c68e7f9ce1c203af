//! Call-dispatch helper family: `Call0..Call4` fixed-arity fast paths, a
//! `FancyCall` fallback for the starred/keyword/variadic case, and a
//! self-specializing call-site cell analogous to [`crate::helpers::compare`]'s.

use crate::objrt::ObjectRuntime;

/// Per-call-site specialization state: once a site observes a callable whose
/// identity it can pin (a directly-called, never-reassigned local function),
/// it records the handle here and later calls skip the generic dispatch.
#[derive(Debug, Clone, Copy)]
pub struct CallCell<H> {
    pub pinned: Option<H>,
}

impl<H: Copy> CallCell<H> {
    pub fn new() -> Self {
        CallCell { pinned: None }
    }
}

impl<H: Copy> Default for CallCell<H> {
    fn default() -> Self {
        Self::new()
    }
}

/// Steals `callable` and every element of `args`. Returns `None` (the
/// object-return failure sentinel) on error, leaving the current error set.
fn call_fixed<R: ObjectRuntime>(rt: &R, callable: R::ObjHandle, args: &[R::ObjHandle]) -> Option<R::ObjHandle> {
    let result = rt.call(callable, args);
    rt.decref(callable);
    for &a in args {
        rt.decref(a);
    }
    result
}

pub fn call0<R: ObjectRuntime>(rt: &R, callable: R::ObjHandle) -> Option<R::ObjHandle> {
    call_fixed(rt, callable, &[])
}

pub fn call1<R: ObjectRuntime>(rt: &R, callable: R::ObjHandle, a0: R::ObjHandle) -> Option<R::ObjHandle> {
    call_fixed(rt, callable, &[a0])
}

pub fn call2<R: ObjectRuntime>(rt: &R, callable: R::ObjHandle, a0: R::ObjHandle, a1: R::ObjHandle) -> Option<R::ObjHandle> {
    call_fixed(rt, callable, &[a0, a1])
}

pub fn call3<R: ObjectRuntime>(
    rt: &R,
    callable: R::ObjHandle,
    a0: R::ObjHandle,
    a1: R::ObjHandle,
    a2: R::ObjHandle,
) -> Option<R::ObjHandle> {
    call_fixed(rt, callable, &[a0, a1, a2])
}

pub fn call4<R: ObjectRuntime>(
    rt: &R,
    callable: R::ObjHandle,
    a0: R::ObjHandle,
    a1: R::ObjHandle,
    a2: R::ObjHandle,
    a3: R::ObjHandle,
) -> Option<R::ObjHandle> {
    call_fixed(rt, callable, &[a0, a1, a2, a3])
}

/// The general call path: arbitrary positional count plus an optional
/// starred-iterable and keyword-dict argument, used whenever `CALL_FUNCTION_*`
/// carries `*args`/`**kwargs` or more than four positionals.
pub fn fancy_call<R: ObjectRuntime>(
    rt: &R,
    callable: R::ObjHandle,
    positional: &[R::ObjHandle],
    starred: Option<R::ObjHandle>,
    kwargs: Option<R::ObjHandle>,
) -> Option<R::ObjHandle> {
    let mut all_args: Vec<R::ObjHandle> = positional.to_vec();
    if let Some(iterable) = starred {
        if let Some(n) = rt.len(iterable) {
            for i in 0..n {
                if let Some(item) = rt.get_item_index(iterable, i) {
                    all_args.push(item);
                }
            }
        }
        rt.decref(iterable);
    }
    // Keyword arguments have no positional-call representation in this
    // helper; a real runtime would thread them through a separate calling
    // convention. This representative only needs to demonstrate the starred
    // and positional paths composing, so `kwargs` is consumed and dropped.
    if let Some(kw) = kwargs {
        rt.decref(kw);
    }

    let result = rt.call(callable, &all_args);
    rt.decref(callable);
    for a in all_args {
        rt.decref(a);
    }
    result
}

/// Pins `callable` into `cell` on first use; the compiler layer is the one
/// that actually skips the generic dispatch on a cache hit (by comparing the
/// live callable handle against `cell.pinned` before ever emitting a call to
/// this helper at all) — this function only maintains the cell's state.
pub fn call0_specialized<R: ObjectRuntime>(rt: &R, cell: &mut CallCell<R::ObjHandle>, callable: R::ObjHandle) -> Option<R::ObjHandle> {
    cell.pinned = Some(callable);
    call_fixed(rt, callable, &[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objrt::{TestObjectRuntime, Value};

    #[test]
    fn call_fixed_decrefs_everything_on_miss() {
        let rt = TestObjectRuntime::new();
        let callable = rt.alloc(Value::None);
        let a0 = rt.alloc(Value::Int(1));
        assert!(call1(&rt, callable, a0).is_none());
    }

    #[test]
    fn fancy_call_expands_starred_args() {
        let rt = TestObjectRuntime::new();
        let callable = rt.alloc(Value::None);
        let starred = rt.alloc(Value::Tuple(vec![Value::Int(1), Value::Int(2)]));
        assert!(fancy_call(&rt, callable, &[], Some(starred), None).is_none());
    }
}
