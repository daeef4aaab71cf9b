//! Insertion-ordered key/value metadata store

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::value::{FromValue, Value};

/// Ordered mapping from string keys to [`Value`]s
///
/// Iteration follows insertion order, which is also the order entries are
/// written in, so round trips are byte-stable.
#[derive(Debug, Clone, Default)]
pub struct MetadataStore {
    entries: Vec<(String, Value)>,
    index: HashMap<String, usize>,
}

impl MetadataStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value, overwriting any previous value for the key
    ///
    /// An overwritten key keeps its original position.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.find(&key) {
            Some(idx) => self.entries[idx].1 = value,
            None => self.append(key, value),
        }
    }

    /// Get the value for a key
    pub fn get(&self, key: &str) -> Result<&Value> {
        self.find(key)
            .map(|idx| &self.entries[idx].1)
            .ok_or_else(|| Error::KeyNotFound(key.to_string()))
    }

    /// Get the value for a key as exactly type `T`
    pub fn get_typed<'a, T: FromValue<'a>>(&'a self, key: &str) -> Result<T> {
        let value = self.get(key)?;
        T::from_value(value).ok_or_else(|| Error::TypeMismatch {
            key: key.to_string(),
            expected: T::TYPE_NAME,
            found: value.type_name(),
        })
    }

    /// Like [`get_typed`](Self::get_typed), but a missing key yields `default`
    ///
    /// A key stored with a different type is still an error.
    pub fn get_or<'a, T: FromValue<'a>>(&'a self, key: &str, default: T) -> Result<T> {
        match self.get_typed(key) {
            Err(Error::KeyNotFound(_)) => Ok(default),
            other => other,
        }
    }

    /// Position of a key, if present
    #[must_use]
    pub fn find(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }

    /// Whether a key is present
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.find(key).is_some()
    }

    /// Remove a key, keeping the relative order of the others
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let idx = self.index.remove(key)?;
        let (_, value) = self.entries.remove(idx);
        for (k, _) in &self.entries[idx..] {
            if let Some(pos) = self.index.get_mut(k) {
                *pos -= 1;
            }
        }
        Some(value)
    }

    /// Number of entries
    #[must_use]
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Key at position `idx`
    #[must_use]
    pub fn key_at(&self, idx: usize) -> Option<&str> {
        self.entries.get(idx).map(|(k, _)| k.as_str())
    }

    /// Entry at position `idx`
    #[must_use]
    pub fn entry_at(&self, idx: usize) -> Option<(&str, &Value)> {
        self.entries.get(idx).map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Append an entry read from a stream, rejecting repeated keys
    pub(crate) fn push_unique(&mut self, key: String, value: Value) -> Result<()> {
        if self.contains(&key) {
            return Err(Error::CorruptHeader(format!("duplicate metadata key '{key}'")));
        }
        self.append(key, value);
        Ok(())
    }

    fn append(&mut self, key: String, value: Value) {
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, value));
    }
}

impl PartialEq for MetadataStore {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}
