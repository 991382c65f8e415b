//! Result assembly.

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::bridge::FieldWidget;
use crate::field::FieldSpec;

/// The key a field value is reported under.
///
/// Positional keys sort before id keys. An id spelled as a canonical
/// decimal (`"0"`, `"12"`, not `"012"`) is the same key as that position,
/// so the two never serialize as duplicate map keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResultKey {
    /// The field's position.
    Index(usize),
    /// The field's declared id.
    Id(String),
}

impl From<usize> for ResultKey {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for ResultKey {
    fn from(id: &str) -> Self {
        position_of(id).map_or_else(|| Self::Id(id.to_string()), Self::Index)
    }
}

impl From<String> for ResultKey {
    fn from(id: String) -> Self {
        position_of(&id).map_or(Self::Id(id), Self::Index)
    }
}

/// The position an id names, if it is written exactly as `usize` displays.
fn position_of(id: &str) -> Option<usize> {
    id.parse::<usize>()
        .ok()
        .filter(|index| index.to_string() == id)
}

impl fmt::Display for ResultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "{index}"),
            Self::Id(id) => f.write_str(id),
        }
    }
}

/// Final field values of a popup.
///
/// Serializes as a map with string keys, positions first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldValues {
    entries: BTreeMap<ResultKey, String>,
}

impl FieldValues {
    /// Creates an empty set of values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value under a key.
    pub fn insert(&mut self, key: impl Into<ResultKey>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Returns the value stored under a key.
    pub fn get(&self, key: impl Into<ResultKey>) -> Option<&str> {
        self.entries.get(&key.into()).map(String::as_str)
    }

    /// Returns the value stored under a position.
    pub fn index(&self, index: usize) -> Option<&str> {
        self.get(index)
    }

    /// Returns the value stored under an id.
    pub fn id(&self, id: &str) -> Option<&str> {
        self.get(id)
    }

    /// Returns true if a value is stored under the key.
    pub fn contains_key(&self, key: impl Into<ResultKey>) -> bool {
        self.entries.contains_key(&key.into())
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the entries, positions first.
    pub fn iter(&self) -> impl Iterator<Item = (&ResultKey, &str)> {
        self.entries.iter().map(|(key, value)| (key, value.as_str()))
    }
}

impl Serialize for FieldValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(&key.to_string(), value)?;
        }
        map.end()
    }
}

/// Reads the current value of every widget.
///
/// Each value is stored under its position unless `unindexed` is set, and
/// additionally under the field's id when it has one. A numeric id that
/// names a position replaces whatever that position held.
pub fn collect_values<W: FieldWidget>(
    fields: &[FieldSpec],
    widgets: &[W],
    unindexed: bool,
) -> FieldValues {
    let mut values = FieldValues::new();
    for (index, (field, widget)) in fields.iter().zip(widgets).enumerate() {
        let value = widget.value();
        if !unindexed {
            values.insert(index, value.clone());
        }
        if let Some(id) = &field.id {
            values.insert(id.as_str(), value);
        }
    }
    values
}
