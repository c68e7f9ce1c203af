//! Subscript, attribute, and global-name access helper family:
//! `BINARY_SUBSCR`/`STORE_SUBSCR`, `LOAD_ATTR`/`STORE_ATTR`, and
//! `LOAD_GLOBAL`/`STORE_GLOBAL`/`DELETE_GLOBAL` all funnel through the same
//! get/set/del shape, the global namespace just being a dict.

use crate::objrt::ObjectRuntime;

/// `BINARY_SUBSCR`: steals both operands, returns a new owned reference.
pub fn subscr_get<R: ObjectRuntime>(rt: &R, obj: R::ObjHandle, key: R::ObjHandle) -> Option<R::ObjHandle> {
    let result = rt.item_get(obj, key);
    rt.decref(obj);
    rt.decref(key);
    result
}

/// `STORE_SUBSCR`: steals all three operands.
pub fn subscr_set<R: ObjectRuntime>(rt: &R, obj: R::ObjHandle, key: R::ObjHandle, value: R::ObjHandle) -> bool {
    rt.item_set(obj, key, value);
    rt.decref(obj);
    rt.decref(key);
    rt.decref(value);
    true
}

/// `LOAD_ATTR`: steals `obj`, returns a new owned reference or `None` if the
/// attribute doesn't exist.
pub fn attr_get<R: ObjectRuntime>(rt: &R, obj: R::ObjHandle, name: &str) -> Option<R::ObjHandle> {
    let result = rt.attr_get(obj, name);
    rt.decref(obj);
    result
}

/// `STORE_ATTR`: steals `obj` and `value`.
pub fn attr_set<R: ObjectRuntime>(rt: &R, obj: R::ObjHandle, name: &str, value: R::ObjHandle) {
    rt.attr_set(obj, name, value);
    rt.decref(obj);
    rt.decref(value);
}

/// `LOAD_GLOBAL`: does not steal `globals` (the module dict outlives every
/// lookup against it). Returns a new owned reference.
pub fn global_get<R: ObjectRuntime>(rt: &R, globals: R::ObjHandle, name: R::ObjHandle) -> Option<R::ObjHandle> {
    let result = rt.dict_get(globals, name);
    rt.decref(name);
    result
}

/// `STORE_GLOBAL`: steals `value`, does not steal `globals` or `name`.
pub fn global_set<R: ObjectRuntime>(rt: &R, globals: R::ObjHandle, name: R::ObjHandle, value: R::ObjHandle) {
    rt.dict_set(globals, name, value);
    rt.decref(value);
}

/// `DELETE_GLOBAL`: does not steal `globals` or `name`. Returns `false` (a
/// `NameError` in a full implementation) if the name was not bound.
pub fn global_del<R: ObjectRuntime>(rt: &R, globals: R::ObjHandle, name: R::ObjHandle) -> bool {
    rt.dict_del(globals, name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objrt::{TestObjectRuntime, Value};

    #[test]
    fn subscr_get_indexes_exact_tuple() {
        let rt = TestObjectRuntime::new();
        let t = rt.alloc(Value::Tuple(vec![Value::Int(10), Value::Int(20)]));
        let k = rt.alloc(Value::Int(1));
        let v = subscr_get(&rt, t, k).unwrap();
        assert_eq!(rt.debug_int_value(v), 20);
    }

    #[test]
    fn global_del_reports_missing_name() {
        let rt = TestObjectRuntime::new();
        let globals = rt.alloc(Value::None);
        let name = rt.alloc(Value::Str("missing".into()));
        assert!(!global_del(&rt, globals, name));
    }
}
