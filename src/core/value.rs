//! Dynamic values of the emulated object model
//!
//! Scalars are compared by value. Lists, maps, objects, routines and types
//! are shared references: cloning a [`Value`] clones the handle, never the
//! referenced data.

use crate::core::feature::Routine;
use crate::registry::{Instance, TypeDescriptor};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

pub type ListRef = Arc<RwLock<Vec<Value>>>;
pub type MapRef = Arc<RwLock<IndexMap<String, Value>>>;

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    List(ListRef),
    Map(MapRef),
    Object(Instance),
    Routine(Routine),
    Type(TypeDescriptor),
}

impl Value {
    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Value::List(Arc::new(RwLock::new(items.into_iter().collect())))
    }

    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Map(Arc::new(RwLock::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        )))
    }

    /// Same scalar, or same referenced object
    pub fn identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => Arc::ptr_eq(a, b),
            (Value::Map(a), Value::Map(b)) => Arc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Routine(a), Value::Routine(b)) => a.ptr_eq(b),
            (Value::Type(a), Value::Type(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Does this value refer to shared, mutable data?
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            Value::List(_) | Value::Map(_) | Value::Object(_) | Value::Routine(_) | Value::Type(_)
        )
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListRef> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapRef> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_routine(&self) -> Option<&Routine> {
        match self {
            Value::Routine(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<&TypeDescriptor> {
        match self {
            Value::Type(t) => Some(t),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Object(_) => "object",
            Value::Routine(_) => "routine",
            Value::Type(_) => "type",
        }
    }
}

impl fmt::Debug for Value {
    // Reference variants print a summary only: object graphs may be cyclic.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Int(i) => write!(f, "Int({})", i),
            Value::Float(x) => write!(f, "Float({})", x),
            Value::Str(s) => write!(f, "Str({:?})", s),
            Value::List(l) => write!(f, "List(len={})", l.read().len()),
            Value::Map(m) => {
                let keys: Vec<String> = m.read().keys().cloned().collect();
                write!(f, "Map({:?})", keys)
            }
            Value::Object(o) => write!(f, "Object({})", o.generator()),
            Value::Routine(r) => write!(f, "Routine(arity={})", r.arity()),
            Value::Type(t) => write!(f, "Type({})", t.name()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<Instance> for Value {
    fn from(o: Instance) -> Self {
        Value::Object(o)
    }
}

impl From<Routine> for Value {
    fn from(r: Routine) -> Self {
        Value::Routine(r)
    }
}

impl From<TypeDescriptor> for Value {
    fn from(t: TypeDescriptor) -> Self {
        Value::Type(t)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars_identical_by_value() {
        assert!(Value::from(3).identical(&Value::Int(3)));
        assert!(Value::from("a").identical(&Value::from("a".to_string())));
        assert!(Value::Null.identical(&Value::from(None::<i64>)));
        assert!(!Value::from(3).identical(&Value::from(3.0)));
    }

    #[test]
    fn test_references_identical_by_address() {
        let a = Value::list([Value::from(1)]);
        let b = Value::list([Value::from(1)]);
        assert!(a.identical(&a.clone()));
        assert!(!a.identical(&b));
        assert!(a.is_reference());
        assert!(!Value::from(true).is_reference());
    }

    #[test]
    fn test_map_keeps_insertion_order() {
        let m = Value::map([("z", Value::from(1)), ("a", Value::from(2))]);
        let keys: Vec<String> = m.as_map().unwrap().read().keys().cloned().collect();
        assert_eq!(keys, vec!["z".to_string(), "a".to_string()]);
        assert_eq!(format!("{:?}", m), "Map([\"z\", \"a\"])");
    }
}
