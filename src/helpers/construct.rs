//! Function-construction helper family: `MAKE_FUNCTION`/`MAKE_CLOSURE` and
//! the attribute setters that attach defaults, keyword-only defaults,
//! annotations, and a closure cell tuple to the freshly built function object.

use crate::objrt::ObjectRuntime;

/// Flags mirroring the `MAKE_FUNCTION` operand bits (spec's opcode table):
/// which of the four optional trailing stack items are present.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeFunctionFlags {
    pub has_defaults: bool,
    pub has_kwdefaults: bool,
    pub has_annotations: bool,
    pub has_closure: bool,
}

/// Steals `code` and every present optional operand (in the order
/// defaults, kwdefaults, annotations, closure, matching the CPython stack
/// order the opcode pops them in). Returns the new owned function object.
pub fn make_function<R: ObjectRuntime>(
    rt: &R,
    code: R::ObjHandle,
    flags: MakeFunctionFlags,
    defaults: Option<R::ObjHandle>,
    kwdefaults: Option<R::ObjHandle>,
    annotations: Option<R::ObjHandle>,
    closure: Option<R::ObjHandle>,
) -> Option<R::ObjHandle> {
    let func = rt.call(code, &[])?;
    if flags.has_defaults {
        if let Some(d) = defaults {
            rt.attr_set(func, "__defaults__", d);
            rt.decref(d);
        }
    }
    if flags.has_kwdefaults {
        if let Some(d) = kwdefaults {
            rt.attr_set(func, "__kwdefaults__", d);
            rt.decref(d);
        }
    }
    if flags.has_annotations {
        if let Some(a) = annotations {
            rt.attr_set(func, "__annotations__", a);
            rt.decref(a);
        }
    }
    if flags.has_closure {
        if let Some(c) = closure {
            rt.attr_set(func, "__closure__", c);
            rt.decref(c);
        }
    }
    rt.decref(code);
    Some(func)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objrt::{TestObjectRuntime, Value};

    #[test]
    fn make_function_without_optional_operands() {
        let rt = TestObjectRuntime::new();
        let code = rt.alloc(Value::None);
        // TestObjectRuntime::call always returns None, so this representative
        // only exercises the flag-skipping control flow, not a real function
        // object; a concrete production object runtime would return Some.
        assert!(make_function(&rt, code, MakeFunctionFlags::default(), None, None, None, None).is_none());
    }
}
