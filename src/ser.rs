//! Entity destructuring.
//!
//! This module provides the serde [`Serializer`](serde::Serializer) implementations
//! that flatten an entity into a [`Record`]: one entry per struct field (or map
//! entry), each holding a scalar [`Value`].
//!
//! ## Overview
//!
//! - Structs and maps become records; newtype wrappers are transparent
//! - Scalars map to the matching [`Value`] variant, `None` and `()` to `Null`
//! - Unit enum variants become their name as a string
//! - Nested data (sequences, nested structs, data-carrying variants) has no flat
//!   representation and fails with [`Error::UnsupportedType`]
//!
//! Most users go through [`to_writer`](crate::to_writer) or
//! [`to_record`](crate::to_record):
//!
//! ```rust
//! use serde::Serialize;
//! use serde_flatfile::{to_record, Value};
//!
//! #[derive(Serialize)]
//! struct Trade { id: u32, side: Side, note: Option<String> }
//!
//! #[derive(Serialize)]
//! enum Side { Buy, Sell }
//!
//! let record = to_record(&Trade { id: 7, side: Side::Sell, note: None }).unwrap();
//! assert_eq!(record.get("id"), Some(&Value::Integer(7)));
//! assert_eq!(record.get("side"), Some(&Value::from("Sell")));
//! assert_eq!(record.get("note"), Some(&Value::Null));
//! ```

use crate::{Error, Record, Result, Value};
use serde::ser::{self, Impossible, Serialize};

/// Serializes a whole entity into a [`Record`].
pub struct RecordSerializer;

/// Collects the entries of a struct or map.
pub struct SerializeRecord {
    record: Record,
    current_key: Option<String>,
}

impl SerializeRecord {
    fn new(len: usize) -> Self {
        SerializeRecord {
            record: Record::with_capacity(len),
            current_key: None,
        }
    }
}

fn not_a_record(what: &str) -> Error {
    Error::unsupported_type(&format!("{} cannot be written as a record; expected a struct or map", what))
}

impl ser::Serializer for RecordSerializer {
    type Ok = Record;
    type Error = Error;

    type SerializeSeq = Impossible<Record, Error>;
    type SerializeTuple = Impossible<Record, Error>;
    type SerializeTupleStruct = Impossible<Record, Error>;
    type SerializeTupleVariant = Impossible<Record, Error>;
    type SerializeMap = SerializeRecord;
    type SerializeStruct = SerializeRecord;
    type SerializeStructVariant = Impossible<Record, Error>;

    fn serialize_bool(self, _v: bool) -> Result<Record> {
        Err(not_a_record("a bool"))
    }

    fn serialize_i8(self, _v: i8) -> Result<Record> {
        Err(not_a_record("an integer"))
    }

    fn serialize_i16(self, _v: i16) -> Result<Record> {
        Err(not_a_record("an integer"))
    }

    fn serialize_i32(self, _v: i32) -> Result<Record> {
        Err(not_a_record("an integer"))
    }

    fn serialize_i64(self, _v: i64) -> Result<Record> {
        Err(not_a_record("an integer"))
    }

    fn serialize_u8(self, _v: u8) -> Result<Record> {
        Err(not_a_record("an integer"))
    }

    fn serialize_u16(self, _v: u16) -> Result<Record> {
        Err(not_a_record("an integer"))
    }

    fn serialize_u32(self, _v: u32) -> Result<Record> {
        Err(not_a_record("an integer"))
    }

    fn serialize_u64(self, _v: u64) -> Result<Record> {
        Err(not_a_record("an integer"))
    }

    fn serialize_f32(self, _v: f32) -> Result<Record> {
        Err(not_a_record("a float"))
    }

    fn serialize_f64(self, _v: f64) -> Result<Record> {
        Err(not_a_record("a float"))
    }

    fn serialize_char(self, _v: char) -> Result<Record> {
        Err(not_a_record("a char"))
    }

    fn serialize_str(self, _v: &str) -> Result<Record> {
        Err(not_a_record("a string"))
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<Record> {
        Err(not_a_record("a byte array"))
    }

    fn serialize_none(self) -> Result<Record> {
        Err(not_a_record("None"))
    }

    fn serialize_some<T>(self, value: &T) -> Result<Record>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Record> {
        Err(not_a_record("()"))
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<Record> {
        Err(not_a_record(name))
    }

    fn serialize_unit_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> Result<Record> {
        Err(not_a_record(name))
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<Record>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<Record>
    where
        T: ?Sized + Serialize,
    {
        Err(not_a_record(name))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        Err(not_a_record("a sequence"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        Err(not_a_record("a tuple"))
    }

    fn serialize_tuple_struct(
        self,
        name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Err(not_a_record(name))
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(not_a_record(name))
    }

    fn serialize_map(self, len: Option<usize>) -> Result<SerializeRecord> {
        Ok(SerializeRecord::new(len.unwrap_or(0)))
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<SerializeRecord> {
        Ok(SerializeRecord::new(len))
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(not_a_record(name))
    }
}

impl ser::SerializeMap for SerializeRecord {
    type Ok = Record;
    type Error = Error;

    fn serialize_key<T>(&mut self, key: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        match to_value(key)? {
            Value::String(s) => self.current_key = Some(s),
            Value::Char(c) => self.current_key = Some(c.to_string()),
            other => {
                return Err(Error::unsupported_type(&format!(
                    "record keys must be strings, found {}",
                    other.kind()
                )))
            }
        }
        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        let key = self
            .current_key
            .take()
            .ok_or_else(|| Error::custom("serialize_value called without serialize_key"))?;
        let value = to_value(value).map_err(|e| in_field(&key, e))?;
        self.record.insert(key, value);
        Ok(())
    }

    fn end(self) -> Result<Record> {
        Ok(self.record)
    }
}

impl ser::SerializeStruct for SerializeRecord {
    type Ok = Record;
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        let value = to_value(value).map_err(|e| in_field(key, e))?;
        self.record.insert(key.to_string(), value);
        Ok(())
    }

    fn end(self) -> Result<Record> {
        Ok(self.record)
    }
}

fn in_field(name: &str, err: Error) -> Error {
    match err {
        Error::UnsupportedType(msg) => Error::UnsupportedType(format!("field '{}': {}", name, msg)),
        Error::Custom(msg) => Error::Custom(format!("field '{}': {}", name, msg)),
        other => other,
    }
}

/// Serializes one scalar into a [`Value`].
pub struct ValueSerializer;

fn nested(what: &str) -> Error {
    Error::unsupported_type(&format!("{} has no flat representation", what))
}

impl ser::Serializer for ValueSerializer {
    type Ok = Value;
    type Error = Error;

    type SerializeSeq = Impossible<Value, Error>;
    type SerializeTuple = Impossible<Value, Error>;
    type SerializeTupleStruct = Impossible<Value, Error>;
    type SerializeTupleVariant = Impossible<Value, Error>;
    type SerializeMap = Impossible<Value, Error>;
    type SerializeStruct = Impossible<Value, Error>;
    type SerializeStructVariant = Impossible<Value, Error>;

    fn serialize_bool(self, v: bool) -> Result<Value> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value> {
        Ok(Value::Integer(v as i64))
    }

    fn serialize_i16(self, v: i16) -> Result<Value> {
        Ok(Value::Integer(v as i64))
    }

    fn serialize_i32(self, v: i32) -> Result<Value> {
        Ok(Value::Integer(v as i64))
    }

    fn serialize_i64(self, v: i64) -> Result<Value> {
        Ok(Value::Integer(v))
    }

    fn serialize_u8(self, v: u8) -> Result<Value> {
        Ok(Value::Integer(v as i64))
    }

    fn serialize_u16(self, v: u16) -> Result<Value> {
        Ok(Value::Integer(v as i64))
    }

    fn serialize_u32(self, v: u32) -> Result<Value> {
        Ok(Value::Integer(v as i64))
    }

    fn serialize_u64(self, v: u64) -> Result<Value> {
        i64::try_from(v)
            .map(Value::Integer)
            .map_err(|_| Error::custom(format!("integer {} is out of range", v)))
    }

    fn serialize_f32(self, v: f32) -> Result<Value> {
        Ok(Value::Float(v as f64))
    }

    fn serialize_f64(self, v: f64) -> Result<Value> {
        Ok(Value::Float(v))
    }

    fn serialize_char(self, v: char) -> Result<Value> {
        Ok(Value::Char(v))
    }

    fn serialize_str(self, v: &str) -> Result<Value> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<Value> {
        Err(nested("a byte array"))
    }

    fn serialize_none(self) -> Result<Value> {
        Ok(Value::Null)
    }

    fn serialize_some<T>(self, value: &T) -> Result<Value>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value> {
        Ok(Value::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Value> {
        Ok(Value::String(variant.to_string()))
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<Value>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<Value>
    where
        T: ?Sized + Serialize,
    {
        Err(nested("a newtype variant"))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        Err(nested("a sequence"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        Err(nested("a tuple"))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Err(nested("a tuple struct"))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(nested("a tuple variant"))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Err(nested("a nested map"))
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Err(nested("a nested struct"))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(nested("a struct variant"))
    }
}

/// Flattens an entity into a [`Record`].
///
/// # Errors
///
/// Fails with [`Error::UnsupportedType`] for entities that are not structs or maps, or
/// that hold nested data, and with [`Error::Custom`] when the entity's own
/// `Serialize` impl fails.
pub fn to_record<T: Serialize + ?Sized>(entity: &T) -> Result<Record> {
    entity.serialize(RecordSerializer)
}

/// Converts a single scalar into a [`Value`].
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    value.serialize(ValueSerializer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde::Serialize;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct Wrapper(u16);

    #[derive(Serialize)]
    struct Row {
        id: Wrapper,
        flag: bool,
        ratio: f32,
        initial: char,
        since: NaiveDate,
        unit: (),
    }

    #[test]
    fn test_struct_fields_in_declaration_order() {
        let row = Row {
            id: Wrapper(9),
            flag: true,
            ratio: 0.5,
            initial: 'Q',
            since: NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
            unit: (),
        };
        let record = row.serialize(RecordSerializer).unwrap();
        let names: Vec<_> = record.names().cloned().collect();
        assert_eq!(names, vec!["id", "flag", "ratio", "initial", "since", "unit"]);
        assert_eq!(record.get("id"), Some(&Value::Integer(9)));
        assert_eq!(record.get("ratio"), Some(&Value::Float(0.5)));
        assert_eq!(record.get("initial"), Some(&Value::Char('Q')));
        assert_eq!(record.get("since"), Some(&Value::from("2023-12-31")));
        assert_eq!(record.get("unit"), Some(&Value::Null));
    }

    #[test]
    fn test_maps_become_records() {
        let mut map = BTreeMap::new();
        map.insert("b", 2);
        map.insert("a", 1);
        let record = map.serialize(RecordSerializer).unwrap();
        assert_eq!(record.get("a"), Some(&Value::Integer(1)));
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn test_nested_data_is_rejected() {
        #[derive(Serialize)]
        struct Outer {
            tags: Vec<String>,
        }

        let err = Outer { tags: vec![] }.serialize(RecordSerializer).unwrap_err();
        match err {
            Error::UnsupportedType(msg) => assert!(msg.contains("tags"), "{}", msg),
            other => panic!("unexpected {:?}", other),
        }

        assert!(matches!(
            vec![1, 2].serialize(RecordSerializer),
            Err(Error::UnsupportedType(_))
        ));
        assert!(matches!(42.serialize(RecordSerializer), Err(Error::UnsupportedType(_))));
    }

    #[test]
    fn test_u64_out_of_range() {
        assert!(to_value(&u64::MAX).is_err());
        assert_eq!(to_value(&(i64::MAX as u64)).unwrap(), Value::Integer(i64::MAX));
    }
}
