//! Structural comparison and duplication of values
//!
//! Field walks visit every own field of an instance or map. Deep walks
//! track visited references, so cyclic graphs terminate and clones keep
//! their shared structure.

use crate::core::Value;
use crate::errors::{ContractError, Result};
use crate::infrastructure::logging;
use crate::registry::{Instance, TypeDescriptor};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

fn reference_addr(value: &Value) -> Option<usize> {
    match value {
        Value::List(l) => Some(Arc::as_ptr(l) as *const () as usize),
        Value::Map(m) => Some(Arc::as_ptr(m) as *const () as usize),
        Value::Object(o) => Some(o.addr()),
        _ => None,
    }
}

/// Type that produced `value`; `None` for anything not allocated by a type
pub fn type_of(value: &Value) -> Option<TypeDescriptor> {
    value.as_instance().and_then(Instance::generating_type)
}

/// Is `instance` conform to `ty`?
pub fn conform(instance: &Instance, ty: &TypeDescriptor) -> bool {
    instance.conform(ty)
}

/// Run no action
pub fn do_nothing() {}

// Comparison

/// Identical, or sharing the same field references one level down
pub fn equal(a: &Value, b: &Value) -> bool {
    if a.identical(b) {
        return true;
    }
    if b.is_null() {
        return false;
    }

    match (a, b) {
        (Value::Object(x), Value::Object(y)) => {
            x.generator() == y.generator() && same_entries(&x.fields(), &y.fields(), |u, v| u.identical(v))
        }
        (Value::List(x), Value::List(y)) => {
            let (x, y) = (x.read().clone(), y.read().clone());
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(u, v)| u.identical(v))
        }
        (Value::Map(x), Value::Map(y)) => {
            let x: Vec<(String, Value)> = x.read().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            let y: Vec<(String, Value)> = y.read().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            same_entries(&x, &y, |u, v| u.identical(v))
        }
        _ => false,
    }
}

/// Structurally equal at every depth
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    deep_equal_tracked(a, b, &mut HashSet::new())
}

fn deep_equal_tracked(a: &Value, b: &Value, visiting: &mut HashSet<(usize, usize)>) -> bool {
    if a.identical(b) {
        return true;
    }
    if b.is_null() {
        return false;
    }

    // A pair already under comparison is assumed equal until proven otherwise.
    if let (Some(x), Some(y)) = (reference_addr(a), reference_addr(b)) {
        if !visiting.insert((x, y)) {
            return true;
        }
    }

    match (a, b) {
        (Value::Object(x), Value::Object(y)) => {
            x.generator() == y.generator()
                && same_entries(&x.fields(), &y.fields(), |u, v| deep_equal_tracked(u, v, visiting))
        }
        (Value::List(x), Value::List(y)) => {
            let (x, y) = (x.read().clone(), y.read().clone());
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(u, v)| deep_equal_tracked(u, v, visiting))
        }
        (Value::Map(x), Value::Map(y)) => {
            let x: Vec<(String, Value)> = x.read().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            let y: Vec<(String, Value)> = y.read().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            same_entries(&x, &y, |u, v| deep_equal_tracked(u, v, visiting))
        }
        _ => false,
    }
}

fn same_entries<F>(x: &[(String, Value)], y: &[(String, Value)], mut same: F) -> bool
where
    F: FnMut(&Value, &Value) -> bool,
{
    if x.len() != y.len() {
        return false;
    }
    let lookup: HashMap<&str, &Value> = y.iter().map(|(k, v)| (k.as_str(), v)).collect();
    x.iter().all(|(key, u)| lookup.get(key.as_str()).map_or(false, |v| same(u, v)))
}

// Duplication

/// Does the instance's type replace the root implementation of `key`?
fn overridden(ty: &TypeDescriptor, key: &str) -> bool {
    match (ty.lookup(key), super::any().lookup(key)) {
        (Some(feature), Some(root)) => !root.identical(&feature),
        (Some(_), None) => true,
        (None, _) => false,
    }
}

fn living_type(instance: &Instance) -> Result<TypeDescriptor> {
    instance.generating_type().ok_or_else(|| {
        ContractError::existence(format!("require: generating type of '{}' alive", instance.generator()))
    })
}

/// New value sharing the field references of `value`.
///
/// Instances are duplicated through their generating type, which must
/// still be alive.
pub fn twin_of(value: &Value) -> Result<Value> {
    match value {
        Value::Object(instance) => {
            let ty = living_type(instance)?;
            let result = ty.allocate()?;
            let custom = overridden(&ty, "copy");
            logging::log_twin(&instance.generator(), false, custom);
            if custom {
                result.call("copy", &[value.clone()])?;
            } else {
                copy(&result, instance);
            }
            Ok(Value::Object(result))
        }
        Value::List(list) => Ok(Value::list(list.read().iter().cloned())),
        Value::Map(map) => Ok(Value::Map(Arc::new(RwLock::new(map.read().clone())))),
        other => Ok(other.clone()),
    }
}

/// Clone of `value` and, recursively, of everything it references
pub fn deep_twin_of(value: &Value) -> Result<Value> {
    deep_twin_tracked(value, &mut HashMap::new())
}

fn deep_twin_tracked(value: &Value, clones: &mut HashMap<usize, Value>) -> Result<Value> {
    if let Some(addr) = reference_addr(value) {
        if let Some(clone) = clones.get(&addr) {
            return Ok(clone.clone());
        }
    }

    match value {
        Value::Object(instance) => {
            let ty = living_type(instance)?;
            let result = ty.allocate()?;
            clones.insert(instance.addr(), Value::Object(result.clone()));
            let custom = overridden(&ty, "deep_copy");
            logging::log_twin(&instance.generator(), true, custom);
            if custom {
                result.call("deep_copy", &[value.clone()])?;
            } else {
                deep_copy_tracked(&result, instance, clones)?;
            }
            Ok(Value::Object(result))
        }
        Value::List(list) => {
            let result: Arc<RwLock<Vec<Value>>> = Arc::new(RwLock::new(Vec::new()));
            clones.insert(Arc::as_ptr(list) as *const () as usize, Value::List(result.clone()));
            let items = list.read().clone();
            let mut cloned = Vec::with_capacity(items.len());
            for item in &items {
                cloned.push(deep_twin_tracked(item, clones)?);
            }
            *result.write() = cloned;
            Ok(Value::List(result))
        }
        Value::Map(map) => {
            let result = Value::Map(Arc::new(RwLock::new(IndexMap::new())));
            clones.insert(Arc::as_ptr(map) as *const () as usize, result.clone());
            let entries: Vec<(String, Value)> = map.read().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            fill_map(&result, entries, clones)?;
            Ok(result)
        }
        other => Ok(other.clone()),
    }
}

fn fill_map(target: &Value, entries: Vec<(String, Value)>, clones: &mut HashMap<usize, Value>) -> Result<()> {
    let mut cloned = IndexMap::with_capacity(entries.len());
    for (key, field) in &entries {
        cloned.insert(key.clone(), deep_twin_tracked(field, clones)?);
    }
    if let Some(map) = target.as_map() {
        *map.write() = cloned;
    }
    Ok(())
}

// Change

/// Update the fields of `this` with the field references of `other`
pub fn copy(this: &Instance, other: &Instance) {
    if this.ptr_eq(other) {
        return;
    }
    for (name, field) in other.fields() {
        this.set(name, field);
    }
}

/// Update the fields of `this` with deep twins of the fields of `other`
pub fn deep_copy(this: &Instance, other: &Instance) -> Result<()> {
    if this.ptr_eq(other) {
        return Ok(());
    }
    let mut clones = HashMap::new();
    clones.insert(other.addr(), Value::Object(this.clone()));
    deep_copy_tracked(this, other, &mut clones)
}

fn deep_copy_tracked(this: &Instance, other: &Instance, clones: &mut HashMap<usize, Value>) -> Result<()> {
    for (name, field) in other.fields() {
        let twin = deep_twin_tracked(&field, clones)?;
        this.set(name, twin);
    }
    Ok(())
}
