//! Type descriptors and feature composition
//!
//! A [`TypeDescriptor`] is a cheap handle over the shared description of a
//! declared type: its parents, its feature table and its conversion
//! registries. Types are composed at declaration time through `define`,
//! `redefine`, `expand` and `inherit`, then used read-mostly.
//!
//! Locks are never held across calls into another descriptor or into a
//! routine body: every operation snapshots what it needs first.

use crate::config;
use crate::core::{Feature, Routine, Value};
use crate::errors::{require, ContractError, FaultKind, Result};
use crate::infrastructure::logging;
use crate::registry::conversion::ConversionTable;
use crate::registry::instance::Instance;
use indexmap::{IndexMap, IndexSet};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use smallvec::SmallVec;
use std::fmt;
use std::sync::{Arc, Weak};

pub(crate) struct TypeData {
    /// Generator id; present iff the type is effective
    pub(crate) id: Option<Arc<str>>,
    pub(crate) label: Option<Arc<str>>,
    pub(crate) parents: SmallVec<[TypeDescriptor; 2]>,
    pub(crate) features: IndexMap<String, Feature>,
    pub(crate) conversion_queries: ConversionTable,
    pub(crate) conversion_commands: ConversionTable,
    pub(crate) finalized: IndexSet<String>,
    pub(crate) initializers: IndexSet<String>,
    pub(crate) deferred_features: IndexSet<String>,
    pub(crate) default_value: Arc<OnceCell<Instance>>,
}

impl TypeData {
    fn blank() -> Self {
        Self {
            id: None,
            label: None,
            parents: SmallVec::new(),
            features: IndexMap::new(),
            conversion_queries: ConversionTable::shared_empty(),
            conversion_commands: ConversionTable::shared_empty(),
            finalized: IndexSet::new(),
            initializers: IndexSet::new(),
            deferred_features: IndexSet::new(),
            default_value: Arc::new(OnceCell::new()),
        }
    }

    fn name(&self) -> String {
        self.id
            .as_deref()
            .or(self.label.as_deref())
            .unwrap_or("<deferred>")
            .to_string()
    }
}

#[derive(Clone)]
pub struct TypeDescriptor(pub(crate) Arc<RwLock<TypeData>>);

impl TypeDescriptor {
    /// Blank deferred type with no features
    pub fn new() -> Self {
        Self(Arc::new(RwLock::new(TypeData::blank())))
    }

    /// New instantiable type identified by `id`
    pub fn declared(id: &str) -> Result<Self> {
        let ty = Self::new();
        ty.effect(id)?;
        Ok(ty)
    }

    /// New abstract type; `label` only names it in diagnostics
    pub fn deferred(label: &str) -> Self {
        let ty = Self::new();
        ty.0.write().label = Some(Arc::from(label));
        ty.defer();
        ty
    }

    pub(crate) fn downgrade(&self) -> Weak<RwLock<TypeData>> {
        Arc::downgrade(&self.0)
    }

    pub(crate) fn from_weak(weak: &Weak<RwLock<TypeData>>) -> Option<Self> {
        weak.upgrade().map(Self)
    }

    pub fn ptr_eq(&self, other: &TypeDescriptor) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    // Initialization

    /// Make the type instantiable; instances will carry `id` as generator.
    ///
    /// Parents and features are reset.
    pub fn effect(&self, id: &str) -> Result<()> {
        require(!id.is_empty(), FaultKind::Shape, || "require: attached a_id".to_string())?;

        {
            let mut data = self.0.write();
            data.id = Some(Arc::from(id));
            data.parents.clear();
            data.features = IndexMap::new();
            data.default_value = Arc::new(OnceCell::new());
        }

        logging::log_type_declared(id, true);
        debug_assert!(self.effective(), "ensure: is effective");
        Ok(())
    }

    /// Make the type abstract: it can only be inherited from
    pub fn defer(&self) {
        let name = {
            let mut data = self.0.write();
            data.id = None;
            data.parents.clear();
            data.features = IndexMap::new();
            data.default_value = Arc::new(OnceCell::new());
            data.name()
        };

        logging::log_type_declared(&name, false);
        debug_assert!(!self.effective(), "ensure: deferred");
    }

    // Memory allocation

    /// New instance of this type
    pub fn allocate(&self) -> Result<Instance> {
        let id = self.0.read().id.clone();
        let id = id.ok_or_else(|| ContractError::state(format!("require: '{}' is effective", self.name())))?;

        logging::log_allocation(&id);
        Ok(Instance::new(id, self.downgrade()))
    }

    /// Alias of [`allocate`](Self::allocate)
    pub fn a_new(&self) -> Result<Instance> {
        self.allocate()
    }

    /// Default instance of this type, allocated on first request
    pub fn default_value(&self) -> Result<Instance> {
        let cell = self.0.read().default_value.clone();
        cell.get_or_try_init(|| self.allocate()).cloned()
    }

    // Access

    pub fn id(&self) -> Option<Arc<str>> {
        self.0.read().id.clone()
    }

    /// Generator id, label, or `<deferred>`
    pub fn name(&self) -> String {
        self.0.read().name()
    }

    pub fn parents(&self) -> Vec<TypeDescriptor> {
        self.0.read().parents.to_vec()
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.0.read().features.keys().cloned().collect()
    }

    /// Feature attached to `key`
    pub fn item(&self, key: &str) -> Result<Feature> {
        self.0
            .read()
            .features
            .get(key)
            .cloned()
            .ok_or_else(|| ContractError::existence(format!("require: existing feature at '{}'", key)))
    }

    pub(crate) fn lookup(&self, key: &str) -> Option<Feature> {
        self.0.read().features.get(key).cloned()
    }

    // Status

    pub fn defined(&self, key: &str) -> bool {
        self.0.read().features.contains_key(key)
    }

    /// Can be instantiated?
    pub fn effective(&self) -> bool {
        self.0.read().id.is_some()
    }

    /// Does this type conform to `ty`, directly or through its parents?
    pub fn is(&self, ty: &TypeDescriptor) -> bool {
        if self.ptr_eq(ty) {
            return true;
        }
        let parents = self.0.read().parents.clone();
        parents.iter().any(|parent| parent.is(ty))
    }

    /// Is this type a parent of `ty`?
    pub fn parent(&self, ty: &TypeDescriptor) -> bool {
        ty.is(self)
    }

    pub fn is_final(&self, key: &str) -> bool {
        self.0.read().finalized.contains(key)
    }

    pub fn is_initializer(&self, key: &str) -> bool {
        self.0.read().initializers.contains(key)
    }

    pub fn deferred_features(&self) -> Vec<String> {
        self.0.read().deferred_features.iter().cloned().collect()
    }

    // Extension or replacement

    /// Add `feature` at `key` or replace the feature already there
    pub fn force(&self, key: impl Into<String>, feature: impl Into<Feature>) -> Result<()> {
        let key = key.into();
        require(!key.is_empty(), FaultKind::Shape, || "require: correct_id: key.length > 0".to_string())?;
        self.0.write().features.insert(key, feature.into());
        Ok(())
    }

    /// Alias of [`force`](Self::force)
    pub fn put(&self, key: impl Into<String>, feature: impl Into<Feature>) -> Result<()> {
        self.force(key, feature)
    }

    /// Add a set of new features.
    ///
    /// A key may already be defined only when it maps to the identical value.
    pub fn define<K, I>(&self, features: I) -> Result<()>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Feature)>,
    {
        let batch: Vec<(String, Feature)> = features.into_iter().map(|(k, f)| (k.into(), f)).collect();

        {
            let data = self.0.read();
            let mut pending: IndexMap<&str, &Feature> = IndexMap::new();
            for (key, feature) in &batch {
                require(!key.is_empty(), FaultKind::Shape, || "require: correct_id: key.length > 0".to_string())?;
                let existing = data.features.get(key.as_str()).or_else(|| pending.get(key.as_str()).copied());
                require(
                    existing.map_or(true, |current| current.identical(feature)),
                    FaultKind::Uniqueness,
                    || format!("require: feature at '{}' will be not redefined", key),
                )?;
                pending.insert(key, feature);
            }
        }

        let mut data = self.0.write();
        for (key, feature) in batch {
            data.features.insert(key, feature);
        }
        Ok(())
    }

    /// Replace a set of already defined features
    pub fn redefine<K, I>(&self, features: I) -> Result<()>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Feature)>,
    {
        let batch: Vec<(String, Feature)> = features.into_iter().map(|(k, f)| (k.into(), f)).collect();
        let enforce_final = config::current().enforce_final;
        let name = self.name();

        {
            let data = self.0.read();
            for (key, _) in &batch {
                require(data.features.contains_key(key.as_str()), FaultKind::Existence, || {
                    format!("require: feature at '{}' defined", key)
                })?;
                if data.finalized.contains(key.as_str()) {
                    require(!enforce_final, FaultKind::State, || format!("require: feature at '{}' is not final", key))?;
                    logging::log_final_redefined(&name, key);
                }
            }
        }

        let mut data = self.0.write();
        for (key, feature) in batch {
            data.features.insert(key, feature);
        }
        Ok(())
    }

    /// Declare deferred features, removing the listed ones currently defined
    pub fn undefine<K: AsRef<str>>(&self, keys: &[K]) {
        let mut data = self.0.write();
        for key in keys {
            let key = key.as_ref();
            data.features.shift_remove(key);
            data.deferred_features.insert(key.to_string());
        }
    }

    // Composition

    /// Add all features of `other` without polymorphism.
    ///
    /// Conflicting keys take `other`'s value.
    pub fn expand(&self, other: &TypeDescriptor) {
        if self.ptr_eq(other) {
            return;
        }

        let incoming = other.0.read().features.clone();
        let warn = config::current().warn_on_override;

        let mut data = self.0.write();
        let name = data.name();
        for (key, feature) in incoming {
            if warn {
                if let Some(current) = data.features.get(&key) {
                    if !current.identical(&feature) {
                        logging::log_feature_override(&name, &key);
                    }
                }
            }
            data.features.insert(key, feature);
        }
    }

    /// [`expand`](Self::expand), keeping this type's implementation of `keys`
    pub fn expand_except<K: AsRef<str>>(&self, other: &TypeDescriptor, keys: &[K]) -> Result<()> {
        let selection = self.select_overrides(other, keys)?;
        self.expand(other);
        self.restore_overrides(selection);
        Ok(())
    }

    /// Add all features of `other` and make this type conform to it.
    ///
    /// Conversion queries of `other` become available on this type, and its
    /// final and initializer markers apply here too.
    pub fn inherit(&self, other: &TypeDescriptor) -> Result<()> {
        require(!other.is(self), FaultKind::State, || {
            format!("require: no circular inheritance ('{}' already conforms to '{}')", other.name(), self.name())
        })?;

        self.expand(other);

        let (incoming, finalized, initializers) = {
            let parent = other.0.read();
            (
                parent.conversion_queries.clone(),
                parent.finalized.clone(),
                parent.initializers.clone(),
            )
        };
        {
            let mut data = self.0.write();
            data.parents.push(other.clone());
            // Final and initializer markers travel with the features
            data.finalized.extend(finalized);
            data.initializers.extend(initializers);

            if data.conversion_queries.is_empty() {
                data.conversion_queries = ConversionTable::adopt(&incoming);
            } else {
                let entries = incoming.snapshot();
                data.conversion_queries.make_private();
                data.conversion_queries.write().expand(&entries);
            }
        }

        logging::log_inheritance(&self.name(), &other.name());
        debug_assert!(self.is(other), "ensure: inheritance from 'other' added");
        Ok(())
    }

    /// [`inherit`](Self::inherit), keeping this type's implementation of `keys`
    pub fn inherit_except<K: AsRef<str>>(&self, other: &TypeDescriptor, keys: &[K]) -> Result<()> {
        require(!other.is(self), FaultKind::State, || "require: no circular inheritance".to_string())?;

        let selection = self.select_overrides(other, keys)?;
        let inherited = self.inherit(other);
        self.restore_overrides(selection);
        inherited
    }

    /// Check and detach the features at `keys` ahead of a merge with `other`
    fn select_overrides<K: AsRef<str>>(&self, other: &TypeDescriptor, keys: &[K]) -> Result<Vec<(String, Feature)>> {
        require(!keys.is_empty(), FaultKind::Shape, || "require: at least one item in 'keys'".to_string())?;

        let mut selection = Vec::with_capacity(keys.len());
        for (i, key) in keys.iter().enumerate() {
            let key = key.as_ref();
            require(!key.is_empty(), FaultKind::Shape, || format!("require: {}-th item of 'keys' as name", i))?;
            let feature = self.lookup(key).ok_or_else(|| {
                ContractError::existence(format!("require: {}-th item of 'keys' is defined", i))
            })?;
            require(other.defined(key), FaultKind::Existence, || {
                format!("require: {}-th item of 'keys' is defined in 'other'", i)
            })?;
            selection.push((key.to_string(), feature));
        }

        let mut data = self.0.write();
        for (key, _) in &selection {
            data.features.shift_remove(key.as_str());
        }
        Ok(selection)
    }

    fn restore_overrides(&self, selection: Vec<(String, Feature)>) {
        let mut data = self.0.write();
        for (key, feature) in selection {
            data.features.insert(key, feature);
        }
    }

    // Change

    /// Forbid the redefinition of the feature at `key`
    pub fn finalize(&self, key: &str) -> Result<()> {
        let mut data = self.0.write();
        require(data.features.contains_key(key), FaultKind::Existence, || {
            format!("require: existing feature at '{}'", key)
        })?;
        data.finalized.insert(key.to_string());
        Ok(())
    }

    /// Mark the command at `key` as an official initializer
    pub fn initialize(&self, key: &str) -> Result<()> {
        let mut data = self.0.write();
        require(data.features.contains_key(key), FaultKind::Existence, || {
            format!("require: existing feature at '{}'", key)
        })?;
        data.initializers.insert(key.to_string());
        Ok(())
    }

    /// Run the routine at `key` once per instance.
    ///
    /// The first call stores a constant routine returning its result on the
    /// instance itself, shadowing the shared feature.
    pub fn run_once(&self, key: &str) -> Result<()> {
        let unstable = match self.item(key)? {
            Feature::Routine(routine) => routine,
            Feature::Data(_) => {
                return Err(ContractError::shape(format!("require: feature at '{}' is a routine", key)));
            }
        };

        let arity = unstable.arity();
        let slot = key.to_string();
        let wrapped = Routine::new(arity, move |this, args| {
            require(!this.has_own(&slot), FaultKind::State, || {
                format!("require: constant routine at '{}' not assigned", slot)
            })?;

            let result = unstable.invoke(this, args)?;
            this.set(slot.clone(), Value::Routine(Routine::stable(result.clone()).with_arity(arity)));

            debug_assert!(this.has_own(&slot), "ensure: constant routine assigned");
            Ok(result)
        });

        self.force(key, wrapped)
    }

    // Removal

    /// Delete the feature at `key`
    pub fn remove(&self, key: &str) -> Result<()> {
        let mut data = self.0.write();
        data.features
            .shift_remove(key)
            .map(|_| ())
            .ok_or_else(|| ContractError::existence(format!("require: existing feature at '{}'", key)))
    }
}

impl Default for TypeDescriptor {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.0.read();
        f.debug_struct("TypeDescriptor")
            .field("name", &data.name())
            .field("effective", &data.id.is_some())
            .field("parents", &data.parents.iter().map(TypeDescriptor::name).collect::<Vec<_>>())
            .field("features", &data.features.keys().collect::<Vec<_>>())
            .finish()
    }
}
