//! Import and class-construction helper family: `IMPORT_NAME`/`IMPORT_FROM`/
//! `IMPORT_STAR` and `BUILD_CLASS`, all of which ultimately call back into the
//! host's module/attribute machinery rather than doing any work themselves.

use crate::objrt::ObjectRuntime;

/// `IMPORT_NAME`: steals `fromlist` and `level`, returns the new owned module
/// object. Delegates entirely to the host's import machinery via `call` on an
/// opaque `__import__`-shaped callable.
pub fn import_name<R: ObjectRuntime>(
    rt: &R,
    import_fn: R::ObjHandle,
    name: R::ObjHandle,
    fromlist: R::ObjHandle,
    level: R::ObjHandle,
) -> Option<R::ObjHandle> {
    let result = rt.call(import_fn, &[name, fromlist, level]);
    rt.decref(fromlist);
    rt.decref(level);
    result
}

/// `IMPORT_FROM`: does not steal `module` (the `from X import a, b` form
/// looks up several names off the same module object in sequence).
pub fn import_from<R: ObjectRuntime>(rt: &R, module: R::ObjHandle, name: &str) -> Option<R::ObjHandle> {
    rt.attr_get(module, name)
}

/// `IMPORT_STAR`: steals `module`, binds every public attribute of `module`
/// onto `target_namespace` (does not steal `target_namespace`) by name.
/// Returns `false` if none of `public_names` resolved, which a real runtime
/// surfaces as a `TypeError`.
pub fn import_star<R: ObjectRuntime>(rt: &R, module: R::ObjHandle, target_namespace: R::ObjHandle, public_names: &[&str]) -> bool {
    let mut bound_any = false;
    for name in public_names {
        if let Some(value) = rt.attr_get(module, name) {
            rt.attr_set(target_namespace, name, value);
            rt.decref(value);
            bound_any = true;
        }
    }
    rt.decref(module);
    bound_any
}

/// `BUILD_CLASS`: steals `bases` and `namespace`, calls the metaclass with
/// `(name, bases, namespace)` and returns the new owned class object.
pub fn build_class<R: ObjectRuntime>(
    rt: &R,
    metaclass: R::ObjHandle,
    name: R::ObjHandle,
    bases: R::ObjHandle,
    namespace: R::ObjHandle,
) -> Option<R::ObjHandle> {
    let result = rt.call(metaclass, &[name, bases, namespace]);
    rt.decref(bases);
    rt.decref(namespace);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objrt::{TestObjectRuntime, Value};

    #[test]
    fn import_from_looks_up_attribute() {
        let rt = TestObjectRuntime::new();
        let module = rt.alloc(Value::None);
        assert!(import_from(&rt, module, "anything").is_none());
    }

    #[test]
    fn build_class_delegates_to_metaclass_call() {
        let rt = TestObjectRuntime::new();
        let metaclass = rt.alloc(Value::None);
        let name = rt.alloc(Value::Str("C".into()));
        let bases = rt.alloc(Value::Tuple(vec![]));
        let namespace = rt.alloc(Value::None);
        assert!(build_class(&rt, metaclass, name, bases, namespace).is_none());
    }
}
