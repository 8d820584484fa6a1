//! Instances of effective types
//!
//! An instance owns its fields and keeps a weak link to the type that
//! produced it. Lookups check the instance's own fields first, then the
//! generating type's feature table.

use crate::config;
use crate::core::{Feature, Routine, Value};
use crate::errors::{require, ContractError, FaultKind, Result};
use crate::registry::descriptor::{TypeData, TypeDescriptor};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::fmt;
use std::sync::{Arc, Weak};

pub(crate) struct InstanceData {
    generator: Arc<str>,
    generating_type: Weak<RwLock<TypeData>>,
    fields: IndexMap<String, Value>,
}

#[derive(Clone)]
pub struct Instance(Arc<RwLock<InstanceData>>);

impl Instance {
    pub(crate) fn new(generator: Arc<str>, generating_type: Weak<RwLock<TypeData>>) -> Self {
        Self(Arc::new(RwLock::new(InstanceData {
            generator,
            generating_type,
            fields: IndexMap::new(),
        })))
    }

    /// Id of the type that allocated this instance
    pub fn generator(&self) -> Arc<str> {
        self.0.read().generator.clone()
    }

    /// Type that allocated this instance, if it is still alive
    pub fn generating_type(&self) -> Option<TypeDescriptor> {
        TypeDescriptor::from_weak(&self.0.read().generating_type)
    }

    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Address of the shared instance data, stable for its lifetime
    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    /// Is an instance of `ty`, directly or through inheritance?
    pub fn conform(&self, ty: &TypeDescriptor) -> bool {
        self.generating_type().map_or(false, |generating| generating.is(ty))
    }

    // Fields

    pub fn has_own(&self, key: &str) -> bool {
        self.0.read().fields.contains_key(key)
    }

    pub fn get_own(&self, key: &str) -> Option<Value> {
        self.0.read().fields.get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.write().fields.insert(key.into(), value.into());
    }

    pub fn remove_own(&self, key: &str) -> Option<Value> {
        self.0.write().fields.shift_remove(key)
    }

    /// Own fields in assignment order
    pub fn fields(&self) -> Vec<(String, Value)> {
        self.0.read().fields.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    pub fn field_count(&self) -> usize {
        self.0.read().fields.len()
    }

    // Features

    /// Value at `key`: own field, else the generating type's feature
    pub fn get(&self, key: &str) -> Result<Value> {
        if let Some(value) = self.get_own(key) {
            return Ok(value);
        }
        self.generating_type()
            .and_then(|ty| ty.lookup(key))
            .map(|feature| feature.to_value())
            .ok_or_else(|| ContractError::existence(format!("require: existing feature at '{}'", key)))
    }

    /// Invoke the routine at `key` on this instance
    pub fn call(&self, key: &str, args: &[Value]) -> Result<Value> {
        let routine = self.resolve_routine(key)?;

        if config::current().check_arity {
            require(args.len() == routine.arity(), FaultKind::Shape, || {
                format!("require: {} argument(s) for '{}', found {}", routine.arity(), key, args.len())
            })?;
        }

        routine.invoke(self, args)
    }

    fn resolve_routine(&self, key: &str) -> Result<Routine> {
        let not_routine = || ContractError::shape(format!("require: feature at '{}' as routine", key));

        match self.get_own(key) {
            Some(Value::Routine(routine)) => Ok(routine),
            Some(_) => Err(not_routine()),
            None => match self.generating_type().and_then(|ty| ty.lookup(key)) {
                Some(Feature::Routine(routine)) => Ok(routine),
                Some(Feature::Data(_)) => Err(not_routine()),
                None => Err(ContractError::existence(format!("require: existing feature at '{}'", key))),
            },
        }
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.0.read();
        f.debug_struct("Instance")
            .field("generator", &data.generator)
            .field("fields", &data.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point_type() -> TypeDescriptor {
        let ty = TypeDescriptor::declared("Point").unwrap();
        ty.define([
            ("origin", Feature::data(0)),
            (
                "norm",
                Feature::routine(0, |this, _| {
                    let x = this.get("x")?.as_int().unwrap_or(0);
                    let y = this.get("y")?.as_int().unwrap_or(0);
                    Ok(Value::Int(x.abs() + y.abs()))
                }),
            ),
            (
                "shift",
                Feature::routine(1, |this, args| {
                    let dx = args[0].as_int().unwrap_or(0);
                    let x = this.get("x")?.as_int().unwrap_or(0);
                    this.set("x", x + dx);
                    Ok(Value::Null)
                }),
            ),
        ])
        .unwrap();
        ty
    }

    #[test]
    fn test_fields_shadow_features() {
        let ty = point_type();
        let p = ty.allocate().unwrap();

        assert_eq!(p.get("origin").unwrap().as_int(), Some(0));
        p.set("origin", 5);
        assert_eq!(p.get("origin").unwrap().as_int(), Some(5));
        assert!(p.has_own("origin"));
        assert_eq!(p.remove_own("origin").unwrap().as_int(), Some(5));
        assert_eq!(p.get("origin").unwrap().as_int(), Some(0));
        assert!(p.get("missing").unwrap_err().is(FaultKind::Existence));
    }

    #[test]
    fn test_call_routines() {
        let ty = point_type();
        let p = ty.allocate().unwrap();
        p.set("x", 3);
        p.set("y", -4);

        assert_eq!(p.call("norm", &[]).unwrap().as_int(), Some(7));
        p.call("shift", &[Value::Int(2)]).unwrap();
        assert_eq!(p.get_own("x").unwrap().as_int(), Some(5));
        assert_eq!(p.fields().len(), 2);
    }

    #[test]
    fn test_call_faults() {
        let ty = point_type();
        let p = ty.allocate().unwrap();

        assert!(p.call("origin", &[]).unwrap_err().is(FaultKind::Shape));
        assert!(p.call("shift", &[]).unwrap_err().is(FaultKind::Shape));
        assert!(p.call("rotate", &[]).unwrap_err().is(FaultKind::Existence));

        p.set("norm", 1);
        assert!(p.call("norm", &[]).unwrap_err().is(FaultKind::Shape));
    }

    #[test]
    fn test_dropped_type_detaches_instances() {
        let p = {
            let ty = TypeDescriptor::declared("Ephemeral").unwrap();
            ty.allocate().unwrap()
        };
        assert!(p.generating_type().is_none());
        assert_eq!(&*p.generator(), "Ephemeral");
        assert!(p.get("anything").is_err());
    }
}
