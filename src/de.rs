//! Entity construction.
//!
//! This module provides the serde [`Deserializer`](serde::Deserializer)
//! implementations that build an entity from a decoded [`Record`]. The record is
//! presented as a map of field names to scalars, so any `#[derive(Deserialize)]`
//! struct whose fields match the layout's names can be built from it.
//!
//! ## Value mapping
//!
//! - `Null` is `None` for `Option` fields and `()` for unit fields
//! - Dates, timestamps and decimals are presented as their canonical strings, which
//!   `chrono` and [`Decimal`](crate::Decimal) deserialize natively
//! - Strings name unit enum variants
//! - Struct fields the record does not contain follow serde's usual rules (`Option`
//!   is `None`, `#[serde(default)]` uses the default, anything else is an error)
//!
//! ```rust
//! use serde::Deserialize;
//! use serde_flatfile::{from_record, record};
//!
//! #[derive(Deserialize, Debug, PartialEq)]
//! struct Account { number: String, balance: i64, closed: Option<bool> }
//!
//! let account: Account = from_record(record! {
//!     "number" => "AC-1",
//!     "balance" => 1500,
//! })
//! .unwrap();
//! assert_eq!(account, Account { number: "AC-1".into(), balance: 1500, closed: None });
//! ```

use crate::value::{ISO_DATE, ISO_DATE_TIME};
use crate::{Error, Record, Result, Value};
use serde::de::{self, DeserializeOwned, IntoDeserializer};
use serde::forward_to_deserialize_any;
use std::any::Any;

/// Builds an entity from a decoded [`Record`].
///
/// When `T` is [`Record`] itself the record is returned as is, keeping typed values
/// such as dates and decimals.
///
/// # Errors
///
/// Returns the error of the entity's `Deserialize` impl (missing field, wrong type,
/// unknown variant, ...).
pub fn from_record<T>(record: Record) -> Result<T>
where
    T: DeserializeOwned + 'static,
{
    let mut slot = Some(record);
    if let Some(entity) = (&mut slot as &mut dyn Any)
        .downcast_mut::<Option<T>>()
        .and_then(Option::take)
    {
        return Ok(entity);
    }
    T::deserialize(RecordDeserializer::new(slot.unwrap_or_default()))
}

/// Presents a whole [`Record`] as a serde map.
pub struct RecordDeserializer {
    record: Record,
}

impl RecordDeserializer {
    #[must_use]
    pub fn new(record: Record) -> Self {
        RecordDeserializer { record }
    }
}

impl<'de> de::Deserializer<'de> for RecordDeserializer {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_map(MapDeserializer::new(self.record))
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple
        tuple_struct map struct enum identifier ignored_any
    }
}

struct MapDeserializer {
    iter: indexmap::map::IntoIter<String, Value>,
    value: Option<Value>,
}

impl MapDeserializer {
    fn new(record: Record) -> Self {
        MapDeserializer {
            iter: record.into_iter(),
            value: None,
        }
    }
}

impl<'de> de::MapAccess<'de> for MapDeserializer {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: de::DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some((key, value)) => {
                self.value = Some(value);
                seed.deserialize(ValueDeserializer::new(Value::String(key)))
                    .map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: de::DeserializeSeed<'de>,
    {
        match self.value.take() {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)),
            None => Err(Error::custom("next_value_seed called before next_key_seed")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

/// Presents one [`Value`] to serde.
pub struct ValueDeserializer {
    value: Value,
}

impl ValueDeserializer {
    #[must_use]
    pub fn new(value: Value) -> Self {
        ValueDeserializer { value }
    }
}

impl<'de> de::Deserializer<'de> for ValueDeserializer {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Null => visitor.visit_unit(),
            Value::Bool(b) => visitor.visit_bool(b),
            Value::Integer(i) => visitor.visit_i64(i),
            Value::Float(f) => visitor.visit_f64(f),
            Value::Char(c) => visitor.visit_char(c),
            Value::String(s) => visitor.visit_string(s),
            Value::Decimal(d) => visitor.visit_string(d.to_string()),
            Value::Date(d) => visitor.visit_string(d.format(ISO_DATE).to_string()),
            Value::DateTime(dt) => visitor.visit_string(dt.format(ISO_DATE_TIME).to_string()),
        }
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_f32<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_f64(visitor)
    }

    fn deserialize_f64<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Decimal(d) => visitor.visit_f64(d.to_f64()),
            other => ValueDeserializer::new(other).deserialize_any(visitor),
        }
    }

    fn deserialize_str<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_string(visitor)
    }

    /// Any non-null scalar can fill a `String` field.
    fn deserialize_string<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Null => visitor.visit_unit(),
            Value::String(s) => visitor.visit_string(s),
            other => visitor.visit_string(other.to_string()),
        }
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V>(
        self,
        name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::String(s) => visitor.visit_enum(s.into_deserializer()),
            Value::Char(c) => visitor.visit_enum(c.to_string().into_deserializer()),
            other => Err(Error::custom(format!(
                "expected a variant name of enum {}, found {}",
                name,
                other.kind()
            ))),
        }
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 char
        bytes byte_buf unit unit_struct seq tuple
        tuple_struct map struct identifier ignored_any
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Decimal;
    use chrono::NaiveDate;
    use serde::Deserialize;

    fn record(pairs: Vec<(&str, Value)>) -> Record {
        pairs
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect()
    }

    #[derive(Deserialize, Debug, PartialEq)]
    enum Status {
        Active,
        Closed,
    }

    #[derive(Deserialize, Debug, PartialEq)]
    struct Account {
        id: u32,
        status: Status,
        opened: NaiveDate,
        balance: Decimal,
        rate: f64,
        code: String,
        note: Option<String>,
        #[serde(default)]
        tags: u8,
    }

    #[test]
    fn test_typed_values_reach_their_fields() {
        let rec = record(vec![
            ("id", Value::Integer(12)),
            ("status", Value::from("Closed")),
            ("opened", Value::Date(NaiveDate::from_ymd_opt(2020, 2, 29).unwrap())),
            ("balance", Value::Decimal("-10.50".parse().unwrap())),
            ("rate", Value::Decimal("0.25".parse().unwrap())),
            ("code", Value::Integer(7)),
            ("note", Value::Null),
        ]);
        let account = Account::deserialize(RecordDeserializer::new(rec)).unwrap();
        assert_eq!(
            account,
            Account {
                id: 12,
                status: Status::Closed,
                opened: NaiveDate::from_ymd_opt(2020, 2, 29).unwrap(),
                balance: "-10.5".parse().unwrap(),
                rate: 0.25,
                code: "7".to_string(),
                note: None,
                tags: 0,
            }
        );
    }

    #[test]
    fn test_missing_required_field() {
        let rec = record(vec![("id", Value::Integer(1))]);
        let err = Account::deserialize(RecordDeserializer::new(rec)).unwrap_err();
        assert!(err.to_string().contains("missing field"), "{}", err);
    }

    #[test]
    fn test_out_of_range_integer() {
        #[derive(Deserialize, Debug)]
        struct Small {
            #[allow(dead_code)]
            n: u8,
        }

        let rec = record(vec![("n", Value::Integer(300))]);
        assert!(Small::deserialize(RecordDeserializer::new(rec)).is_err());
    }

    #[test]
    fn test_record_entity_keeps_typed_values() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let rec = record(vec![("on", Value::Date(date))]);
        let back: Record = from_record(rec.clone()).unwrap();
        assert_eq!(back, rec);
    }

    #[test]
    fn test_unknown_variant() {
        assert!(Status::deserialize(ValueDeserializer::new(Value::from("Frozen"))).is_err());
        assert_eq!(
            Status::deserialize(ValueDeserializer::new(Value::from("Active"))).unwrap(),
            Status::Active
        );
    }
}
