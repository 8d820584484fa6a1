//! Conversions between unrelated types
//!
//! A type may register a zero-argument *query* producing another type, or a
//! one-argument *command* initialising itself from another type. Query
//! tables are shared with heirs by reference until someone writes to them,
//! at which point the writer takes a private copy.

use crate::core::{Feature, OrderedAssociation, Value};
use crate::errors::{require, ContractError, FaultKind, Result};
use crate::infrastructure::logging;
use crate::registry::descriptor::TypeDescriptor;
use crate::registry::instance::Instance;
use parking_lot::{RwLock, RwLockWriteGuard};
use std::sync::Arc;

pub type ConversionEntries = OrderedAssociation<String, TypeDescriptor>;

/// Conversion registry: feature name to the related type
#[derive(Clone)]
pub(crate) struct ConversionTable {
    table: Arc<RwLock<ConversionEntries>>,
    owns_private_copy: bool,
}

impl ConversionTable {
    pub(crate) fn shared_empty() -> Self {
        Self {
            table: Arc::new(RwLock::new(OrderedAssociation::new())),
            owns_private_copy: false,
        }
    }

    /// Share `other`'s entries by reference
    pub(crate) fn adopt(other: &ConversionTable) -> Self {
        Self {
            table: other.table.clone(),
            owns_private_copy: false,
        }
    }

    /// Create-on-write: replace a shared table with a private twin
    pub(crate) fn make_private(&mut self) {
        if !self.owns_private_copy {
            let twin = self.table.read().twin();
            self.table = Arc::new(RwLock::new(twin));
            self.owns_private_copy = true;
        }
    }

    pub(crate) fn owns_private_copy(&self) -> bool {
        self.owns_private_copy
    }

    pub(crate) fn shares_with(&self, other: &ConversionTable) -> bool {
        Arc::ptr_eq(&self.table, &other.table)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.table.read().is_empty()
    }

    pub(crate) fn exists(&self, key: &str) -> bool {
        self.table.read().exists(&key.to_string())
    }

    pub(crate) fn snapshot(&self) -> ConversionEntries {
        self.table.read().clone()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, ConversionEntries> {
        self.table.write()
    }

    pub(crate) fn handle(&self) -> Arc<RwLock<ConversionEntries>> {
        self.table.clone()
    }
}

impl TypeDescriptor {
    /// Conversion queries known to this type (own and inherited)
    pub fn conversion_queries(&self) -> ConversionEntries {
        self.0.read().conversion_queries.snapshot()
    }

    /// Conversion commands registered on this type
    pub fn conversion_commands(&self) -> ConversionEntries {
        self.0.read().conversion_commands.snapshot()
    }

    /// Has this type branched its own query table?
    pub fn owns_conversion_queries(&self) -> bool {
        self.0.read().conversion_queries.owns_private_copy()
    }

    /// Do both types read the same query table?
    pub fn shares_conversion_queries(&self, other: &TypeDescriptor) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        let mine = self.0.read().conversion_queries.clone();
        let theirs = other.0.read().conversion_queries.clone();
        mine.shares_with(&theirs)
    }

    /// Register the routine at `key` as a conversion involving `abstraction`.
    ///
    /// A query (no argument) converts an instance of this type into an
    /// `abstraction`; a command (one argument) initialises a new instance of
    /// this type from an `abstraction`.
    pub fn convert(&self, key: &str, abstraction: &TypeDescriptor) -> Result<()> {
        let feature = self.item(key)?;
        let arity = match &feature {
            Feature::Routine(routine) => routine.arity(),
            Feature::Data(_) => {
                return Err(ContractError::shape(format!("require: 'item ({})' as routine", key)));
            }
        };
        require(arity < 2, FaultKind::Shape, || "require: query or command with one argument".to_string())?;
        require(!self.is(abstraction), FaultKind::State, || {
            format!("require: not conform to '{}'", abstraction.name())
        })?;

        let command = arity == 1;
        {
            let mut data = self.0.write();
            let table = if command {
                &mut data.conversion_commands
            } else {
                &mut data.conversion_queries
            };
            require(!table.exists(key), FaultKind::Uniqueness, || {
                format!("require: no conversion registered at '{}'", key)
            })?;
            table.make_private();
            table.write().extend(key.to_string(), abstraction.clone())?;
        }

        logging::log_conversion_registered(&self.name(), key, &abstraction.name(), command);
        Ok(())
    }

    /// Attempt to convert `candidate` into this type.
    ///
    /// Queries of the candidate's type are tried first, most recent
    /// registration first; then commands of this type. `None` when no
    /// conversion applies.
    pub fn from(&self, candidate: &Instance) -> Result<Option<Value>> {
        require(!candidate.conform(self), FaultKind::State, || {
            format!("require: candidate not conform to '{}'", self.name())
        })?;

        let source = candidate.generating_type().ok_or_else(|| {
            ContractError::existence(format!("require: generating type of '{}' alive", candidate.generator()))
        })?;

        let queries = source.0.read().conversion_queries.handle();
        let query = {
            let mut table = queries.write();
            table.seek(|target, _| target.is(self));
            if table.founded() {
                Some(table.key()?.clone())
            } else {
                None
            }
        };

        if let Some(key) = query {
            logging::log_conversion_resolved(&self.name(), &key, false);
            return candidate.call(&key, &[]).map(Some);
        }

        let commands = self.0.read().conversion_commands.handle();
        let command = {
            let mut table = commands.write();
            table.seek(|origin, _| source.is(origin));
            if table.founded() {
                Some(table.key()?.clone())
            } else {
                None
            }
        };

        match command {
            Some(key) => {
                logging::log_conversion_resolved(&self.name(), &key, true);
                let result = self.allocate()?;
                result.call(&key, &[Value::Object(candidate.clone())])?;
                Ok(Some(Value::Object(result)))
            }
            None => Ok(None),
        }
    }

    /// Remove the conversion query at `key`
    pub fn remove_converter(&self, key: &str) -> Result<()> {
        let mut data = self.0.write();
        require(data.conversion_queries.exists(key), FaultKind::Existence, || {
            format!("require: existing converter at '{}'", key)
        })?;
        data.conversion_queries.make_private();
        let removed = data.conversion_queries.write().remove(&key.to_string());
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn celsius_and_fahrenheit() -> (TypeDescriptor, TypeDescriptor) {
        let celsius = TypeDescriptor::declared("Celsius").unwrap();
        let fahrenheit = TypeDescriptor::declared("Fahrenheit").unwrap();
        (celsius, fahrenheit)
    }

    #[test]
    fn test_query_conversion() {
        let (celsius, fahrenheit) = celsius_and_fahrenheit();
        let target = fahrenheit.clone();
        celsius
            .define([(
                "to_fahrenheit",
                Feature::routine(0, move |this, _| {
                    let degrees = this.get("degrees")?.as_int().unwrap_or(0);
                    let result = target.allocate()?;
                    result.set("degrees", Value::Int(degrees * 9 / 5 + 32));
                    Ok(Value::Object(result))
                }),
            )])
            .unwrap();
        celsius.convert("to_fahrenheit", &fahrenheit).unwrap();
        assert!(celsius.conversion_queries().exists(&"to_fahrenheit".to_string()));

        let boiling = celsius.allocate().unwrap();
        boiling.set("degrees", Value::Int(100));

        let converted = fahrenheit.from(&boiling).unwrap().unwrap();
        let converted = converted.as_instance().unwrap();
        assert!(converted.conform(&fahrenheit));
        assert_eq!(converted.get("degrees").unwrap().as_int(), Some(212));
    }

    #[test]
    fn test_command_conversion() {
        let (celsius, fahrenheit) = celsius_and_fahrenheit();
        fahrenheit
            .define([(
                "from_celsius",
                Feature::routine(1, |this, args| {
                    let source = args[0].as_instance().cloned().unwrap_or_else(|| this.clone());
                    let degrees = source.get("degrees")?.as_int().unwrap_or(0);
                    this.set("degrees", Value::Int(degrees * 9 / 5 + 32));
                    Ok(Value::Null)
                }),
            )])
            .unwrap();
        fahrenheit.convert("from_celsius", &celsius).unwrap();
        assert!(fahrenheit.conversion_commands().exists(&"from_celsius".to_string()));

        let freezing = celsius.allocate().unwrap();
        freezing.set("degrees", Value::Int(0));

        let converted = fahrenheit.from(&freezing).unwrap().unwrap();
        assert_eq!(converted.as_instance().unwrap().get("degrees").unwrap().as_int(), Some(32));
    }

    #[test]
    fn test_no_conversion_gives_none() {
        let (celsius, fahrenheit) = celsius_and_fahrenheit();
        let reading = celsius.allocate().unwrap();
        assert!(fahrenheit.from(&reading).unwrap().is_none());
    }

    #[test]
    fn test_from_rejects_conforming_candidate() {
        let (celsius, _) = celsius_and_fahrenheit();
        let reading = celsius.allocate().unwrap();
        assert!(celsius.from(&reading).unwrap_err().is(FaultKind::State));
    }

    #[test]
    fn test_convert_preconditions() {
        let (celsius, fahrenheit) = celsius_and_fahrenheit();
        celsius
            .define([
                ("scale", Feature::data("C")),
                ("mix", Feature::routine(2, |_, _| Ok(Value::Null))),
                ("to_self", Feature::routine(0, |this, _| Ok(Value::Object(this.clone())))),
            ])
            .unwrap();

        assert!(celsius.convert("missing", &fahrenheit).unwrap_err().is(FaultKind::Existence));
        assert!(celsius.convert("scale", &fahrenheit).unwrap_err().is(FaultKind::Shape));
        assert!(celsius.convert("mix", &fahrenheit).unwrap_err().is(FaultKind::Shape));
        assert!(celsius.convert("to_self", &celsius).unwrap_err().is(FaultKind::State));

        celsius.convert("to_self", &fahrenheit).unwrap();
        assert!(celsius.convert("to_self", &fahrenheit).unwrap_err().is(FaultKind::Uniqueness));
    }

    #[test]
    fn test_query_tables_are_shared_until_written() {
        let (celsius, fahrenheit) = celsius_and_fahrenheit();
        celsius
            .define([
                ("to_fahrenheit", Feature::routine(0, |_, _| Ok(Value::Null))),
                ("to_kelvin", Feature::routine(0, |_, _| Ok(Value::Null))),
            ])
            .unwrap();
        celsius.convert("to_fahrenheit", &fahrenheit).unwrap();
        assert!(celsius.owns_conversion_queries());

        let reading = TypeDescriptor::declared("Reading").unwrap();
        reading.inherit(&celsius).unwrap();
        assert!(reading.shares_conversion_queries(&celsius));
        assert!(!reading.owns_conversion_queries());

        reading.remove_converter("to_fahrenheit").unwrap();
        assert!(!reading.shares_conversion_queries(&celsius));
        assert!(reading.owns_conversion_queries());
        assert!(celsius.conversion_queries().exists(&"to_fahrenheit".to_string()));
        assert!(!reading.conversion_queries().exists(&"to_fahrenheit".to_string()));

        assert!(reading.remove_converter("to_fahrenheit").unwrap_err().is(FaultKind::Existence));
    }

    #[test]
    fn test_inherit_merges_into_private_table() {
        let (celsius, fahrenheit) = celsius_and_fahrenheit();
        let kelvin = TypeDescriptor::declared("Kelvin").unwrap();
        celsius.define([("to_fahrenheit", Feature::routine(0, |_, _| Ok(Value::Null)))]).unwrap();
        celsius.convert("to_fahrenheit", &fahrenheit).unwrap();

        let reading = TypeDescriptor::declared("Reading").unwrap();
        reading.define([("to_kelvin", Feature::routine(0, |_, _| Ok(Value::Null)))]).unwrap();
        reading.convert("to_kelvin", &kelvin).unwrap();

        reading.inherit(&celsius).unwrap();
        let keys: Vec<String> = reading.conversion_queries().iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(keys, vec!["to_kelvin".to_string(), "to_fahrenheit".to_string()]);
        assert_eq!(celsius.conversion_queries().count(), 1);
    }
}
