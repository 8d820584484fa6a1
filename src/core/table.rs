//! Ordered association of items with unique keys
//!
//! Entries keep their insertion order and are searched linearly. A search
//! walks from the most recent entry towards the oldest one and leaves a
//! cursor on the entry where it stopped, so later registrations win.

use crate::errors::{require, ContractError, FaultKind};

#[derive(Debug, Clone)]
pub struct OrderedAssociation<K, G> {
    keys: Vec<K>,
    items: Vec<G>,
    cursor: Option<usize>,
}

impl<K, G> Default for OrderedAssociation<K, G> {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            items: Vec::new(),
            cursor: None,
        }
    }
}

impl<K: PartialEq + Clone, G: Clone> OrderedAssociation<K, G> {
    pub fn new() -> Self {
        Self::default()
    }

    fn index_of(&self, key: &K) -> Option<usize> {
        self.keys.iter().position(|k| k == key)
    }

    // Access

    /// Item attached to `key`
    pub fn item(&self, key: &K) -> Result<&G, ContractError> {
        self.index_of(key)
            .map(|index| &self.items[index])
            .ok_or_else(|| ContractError::existence("require: exists (key)"))
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    /// Item under the cursor left by the last search
    pub fn active(&self) -> Result<&G, ContractError> {
        self.cursor
            .map(|index| &self.items[index])
            .ok_or_else(|| ContractError::state("require: founded ()"))
    }

    /// Key under the cursor left by the last search
    pub fn key(&self) -> Result<&K, ContractError> {
        self.cursor
            .map(|index| &self.keys[index])
            .ok_or_else(|| ContractError::state("require: founded ()"))
    }

    /// Separate table sharing the same items and keys
    pub fn twin(&self) -> Self {
        let mut result = Self::new();
        result.expand(self);
        result
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &G)> {
        self.keys.iter().zip(self.items.iter())
    }

    // Status

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn exists(&self, key: &K) -> bool {
        self.index_of(key).is_some()
    }

    /// Did the last search stop on an entry?
    pub fn founded(&self) -> bool {
        self.cursor.is_some()
    }

    // Searching

    /// Walk from the last entry down to the first while `predicate` holds.
    ///
    /// The cursor is left on the first entry (from the end) for which the
    /// predicate fails, or cleared when every entry satisfied it.
    pub fn satisfy<P>(&mut self, mut predicate: P)
    where
        P: FnMut(&G, &K) -> bool,
    {
        let mut index = self.count();
        while index > 0 && predicate(&self.items[index - 1], &self.keys[index - 1]) {
            index -= 1;
        }
        self.cursor = index.checked_sub(1);
    }

    /// Place the cursor on the most recent entry matching `predicate`
    pub fn seek<P>(&mut self, mut predicate: P)
    where
        P: FnMut(&G, &K) -> bool,
    {
        self.satisfy(|item, key| !predicate(item, key));
    }

    // Extension

    /// Enter `item` at `key`, which must not be present yet
    pub fn extend(&mut self, key: K, item: G) -> Result<(), ContractError> {
        require(!self.exists(&key), FaultKind::Uniqueness, || {
            "require: not_existing_index: ! exists (key)".to_string()
        })?;
        self.keys.push(key);
        self.items.push(item);
        Ok(())
    }

    /// Append every entry of `other`; duplicate keys are not checked
    pub fn expand(&mut self, other: &Self) {
        self.keys.extend(other.keys.iter().cloned());
        self.items.extend(other.items.iter().cloned());
    }

    // Removal

    pub fn remove_index(&mut self, index: usize) -> Result<(), ContractError> {
        require(index < self.count(), FaultKind::Existence, || {
            format!("require: existing_index: {} < count ()", index)
        })?;
        self.keys.remove(index);
        self.items.remove(index);
        self.cursor = None;
        Ok(())
    }

    pub fn remove(&mut self, key: &K) -> Result<(), ContractError> {
        let index = self
            .index_of(key)
            .ok_or_else(|| ContractError::existence("require: existing_index: exists (key)"))?;
        self.remove_index(index)
    }
}
