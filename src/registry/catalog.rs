//! Catalog of declared types by generator id

use crate::core::Value;
use crate::errors::{require, ContractError, FaultKind, Result};
use crate::registry::descriptor::TypeDescriptor;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// Process-wide map from generator id to type
#[derive(Default)]
pub struct TypeRegistry {
    types: DashMap<Arc<str>, TypeDescriptor>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an effective type for `id` and register it
    pub fn declare(&self, id: &str) -> Result<TypeDescriptor> {
        require(!id.is_empty(), FaultKind::Shape, || "require: attached a_id".to_string())?;
        match self.types.entry(Arc::from(id)) {
            Entry::Occupied(_) => Err(ContractError::uniqueness(format!("require: type '{}' not yet declared", id))),
            Entry::Vacant(slot) => {
                let ty = TypeDescriptor::declared(id)?;
                slot.insert(ty.clone());
                Ok(ty)
            }
        }
    }

    /// Register an effective type under its generator id
    pub fn register(&self, ty: &TypeDescriptor) -> Result<()> {
        let id = ty
            .id()
            .ok_or_else(|| ContractError::state(format!("require: '{}' is effective", ty.name())))?;
        let existing = self.lookup(&id);
        match existing {
            Some(existing) if !existing.ptr_eq(ty) => Err(ContractError::uniqueness(format!(
                "require: id '{}' not bound to another type",
                id
            ))),
            Some(_) => Ok(()),
            None => {
                self.types.insert(id, ty.clone());
                Ok(())
            }
        }
    }

    pub fn lookup(&self, id: &str) -> Option<TypeDescriptor> {
        self.types.get(id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.types.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Type of `value`, resolved through its generator id
    pub fn type_of(&self, value: &Value) -> Option<TypeDescriptor> {
        value.as_instance().and_then(|instance| self.lookup(&instance.generator()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare_and_lookup() {
        let registry = TypeRegistry::new();
        let point = registry.declare("Point").unwrap();

        assert!(registry.contains("Point"));
        assert!(registry.lookup("Point").unwrap().ptr_eq(&point));
        assert!(registry.lookup("Line").is_none());
        assert!(registry.declare("Point").unwrap_err().is(FaultKind::Uniqueness));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_existing_types() {
        let registry = TypeRegistry::new();
        let point = TypeDescriptor::declared("Point").unwrap();
        registry.register(&point).unwrap();
        registry.register(&point).unwrap();

        let impostor = TypeDescriptor::declared("Point").unwrap();
        assert!(registry.register(&impostor).unwrap_err().is(FaultKind::Uniqueness));
        assert!(registry.register(&TypeDescriptor::deferred("Shape")).unwrap_err().is(FaultKind::State));
    }

    #[test]
    fn test_type_of() {
        let registry = TypeRegistry::new();
        let point = registry.declare("Point").unwrap();
        let p = Value::Object(point.allocate().unwrap());

        assert!(registry.type_of(&p).unwrap().ptr_eq(&point));
        assert!(registry.type_of(&Value::Int(1)).is_none());
    }
}
