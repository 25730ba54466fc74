//! Ordered field-name → value map for one line.
//!
//! A [`Record`] is the hand-off point between the layout engine and entities: the
//! reader decodes a line into a `Record` and serde builds the entity from it, the
//! writer lets serde flatten an entity into a `Record` and encodes it. It keeps
//! insertion order so a record built from a line lists its fields in column order.
//!
//! `Record` itself implements `Serialize` and `Deserialize`, so it can be used as the
//! entity type when the shape of a file is only known at runtime.
//!
//! ## Examples
//!
//! ```rust
//! use serde_flatfile::{Record, Value};
//!
//! let mut record = Record::new();
//! record.insert("id".to_string(), Value::from(7));
//! record.insert("name".to_string(), Value::from("Alice"));
//!
//! assert_eq!(record.len(), 2);
//! assert_eq!(record.get("name").and_then(|v| v.as_str()), Some("Alice"));
//! ```

use crate::Value;
use indexmap::IndexMap;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// An ordered map of field names to decoded values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record(IndexMap<String, Value>);

impl Record {
    #[must_use]
    pub fn new() -> Self {
        Record(IndexMap::new())
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Record(IndexMap::with_capacity(capacity))
    }

    /// Inserts a field value.
    ///
    /// If the record already contained this field, the old value is returned and
    /// the field keeps its original position.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_flatfile::{Record, Value};
    ///
    /// let mut record = Record::new();
    /// assert!(record.insert("id".to_string(), Value::from(1)).is_none());
    /// assert!(record.insert("id".to_string(), Value::from(2)).is_some());
    /// ```
    pub fn insert(&mut self, name: String, value: Value) -> Option<Value> {
        self.0.insert(name, value)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Removes a field, keeping the order of the remaining ones.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.shift_remove(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an iterator over the field names, in insertion order.
    pub fn names(&self) -> indexmap::map::Keys<'_, String, Value> {
        self.0.keys()
    }

    /// Returns an iterator over the values, in insertion order.
    pub fn values(&self) -> indexmap::map::Values<'_, String, Value> {
        self.0.values()
    }

    /// Returns an iterator over the name-value pairs, in insertion order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.0.iter()
    }
}

impl From<HashMap<String, Value>> for Record {
    fn from(map: HashMap<String, Value>) -> Self {
        Record(map.into_iter().collect())
    }
}

impl From<Record> for HashMap<String, Value> {
    fn from(record: Record) -> Self {
        record.0.into_iter().collect()
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Record(IndexMap::from_iter(iter))
    }
}

impl Serialize for Record {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RecordVisitor;

        impl<'de> Visitor<'de> for RecordVisitor {
            type Value = Record;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of field names to values")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Record, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut record = Record::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, value)) = map.next_entry::<String, Value>()? {
                    record.insert(name, value);
                }
                Ok(record)
            }
        }

        deserializer.deserialize_map(RecordVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_is_insertion_order() {
        let record: Record = vec![
            ("b".to_string(), Value::from(2)),
            ("a".to_string(), Value::from(1)),
            ("c".to_string(), Value::from(3)),
        ]
        .into_iter()
        .collect();

        let names: Vec<_> = record.names().cloned().collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut record: Record = vec![
            ("a".to_string(), Value::from(1)),
            ("b".to_string(), Value::from(2)),
            ("c".to_string(), Value::from(3)),
        ]
        .into_iter()
        .collect();

        assert_eq!(record.remove("b"), Some(Value::from(2)));
        let names: Vec<_> = record.names().cloned().collect();
        assert_eq!(names, vec!["a", "c"]);
        assert!(!record.contains("b"));
    }

    #[test]
    fn test_hashmap_conversions() {
        let mut map = HashMap::new();
        map.insert("x".to_string(), Value::from(1));
        let record = Record::from(map);
        assert_eq!(record.len(), 1);

        let back: HashMap<String, Value> = record.into();
        assert_eq!(back.get("x"), Some(&Value::from(1)));
    }
}
