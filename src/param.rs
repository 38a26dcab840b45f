//! Query parameter values produced by the encoder.
//!
//! A [`Parameter`] tree is flattened into driver [`Value`]s right before a
//! query runs. Every variant except [`Parameter::Map`] has a primitive form;
//! maps are structural and flatten into [`Value::Map`].

use crate::value::{GraphDuration, Node, OffsetTime, Path, Point, Relationship, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use std::collections::HashMap;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Parameter {
    #[default]
    Null,
    Integer(i64),
    UnsignedInteger(u64),
    Float(f64),
    Bool(bool),
    String(String),
    ByteArray(Vec<u8>),
    Date(NaiveDate),
    Time(OffsetTime),
    LocalTime(NaiveTime),
    /// Always UTC.
    DateTime(DateTime<Utc>),
    LocalDateTime(NaiveDateTime),
    Duration(GraphDuration),
    Point(Point),
    Node(Node),
    Relationship(Relationship),
    Path(Path),
    Array(Vec<Parameter>),
    Map(HashMap<String, Parameter>),
}

impl Parameter {
    pub fn integer(value: i64) -> Self {
        Parameter::Integer(value)
    }

    pub fn float(value: f64) -> Self {
        Parameter::Float(value)
    }

    pub fn string(value: impl Into<String>) -> Self {
        Parameter::String(value.into())
    }

    pub fn bytes(value: impl Into<Vec<u8>>) -> Self {
        Parameter::ByteArray(value.into())
    }

    pub fn point(srid: i64, x: f64, y: f64, z: Option<f64>) -> Self {
        Parameter::Point(Point { srid, x, y, z })
    }

    pub fn array<I: IntoIterator<Item = Parameter>>(items: I) -> Self {
        Parameter::Array(items.into_iter().collect())
    }

    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Parameter)>,
    {
        Parameter::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Parameter::Null)
    }

    pub fn variant_name(&self) -> &'static str {
        match self {
            Parameter::Null => "Null",
            Parameter::Integer(_) => "Integer",
            Parameter::UnsignedInteger(_) => "UnsignedInteger",
            Parameter::Float(_) => "Float",
            Parameter::Bool(_) => "Bool",
            Parameter::String(_) => "String",
            Parameter::ByteArray(_) => "ByteArray",
            Parameter::Date(_) => "Date",
            Parameter::Time(_) => "Time",
            Parameter::LocalTime(_) => "LocalTime",
            Parameter::DateTime(_) => "DateTime",
            Parameter::LocalDateTime(_) => "LocalDateTime",
            Parameter::Duration(_) => "Duration",
            Parameter::Point(_) => "Point",
            Parameter::Node(_) => "Node",
            Parameter::Relationship(_) => "Relationship",
            Parameter::Path(_) => "Path",
            Parameter::Array(_) => "Array",
            Parameter::Map(_) => "Map",
        }
    }

    /// The primitive form, `None` for maps.
    pub fn primitive(&self) -> Option<Value> {
        match self {
            Parameter::Map(_) => None,
            other => Some(other.clone().into_value()),
        }
    }

    /// The entries of a map parameter.
    pub fn as_map(&self) -> Option<&HashMap<String, Parameter>> {
        match self {
            Parameter::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Flatten into a driver value, recursing into arrays and maps.
    ///
    /// Unsigned integers above `i64::MAX` have no driver representation and
    /// become `Null`.
    pub fn into_value(self) -> Value {
        match self {
            Parameter::Null => Value::Null,
            Parameter::Integer(i) => Value::Integer(i),
            Parameter::UnsignedInteger(u) => match i64::try_from(u) {
                Ok(i) => Value::Integer(i),
                Err(_) => {
                    warn!("Unsigned integer {u} does not fit a signed 64-bit integer, using null");
                    Value::Null
                }
            },
            Parameter::Float(f) => Value::Float(f),
            Parameter::Bool(b) => Value::Boolean(b),
            Parameter::String(s) => Value::String(s),
            Parameter::ByteArray(b) => Value::Bytes(b),
            Parameter::Date(d) => Value::Date(d),
            Parameter::Time(t) => Value::Time(t),
            Parameter::LocalTime(t) => Value::LocalTime(t),
            Parameter::DateTime(dt) => Value::DateTime(dt.into()),
            Parameter::LocalDateTime(dt) => Value::LocalDateTime(dt),
            Parameter::Duration(d) => Value::Duration(d),
            Parameter::Point(p) => Value::Point(p),
            Parameter::Node(n) => Value::Node(n),
            Parameter::Relationship(r) => Value::Relationship(r),
            Parameter::Path(p) => Value::Path(p),
            Parameter::Array(items) => {
                Value::List(items.into_iter().map(Parameter::into_value).collect())
            }
            Parameter::Map(map) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| (k, v.into_value()))
                    .collect(),
            ),
        }
    }

    /// Wrap a driver value. Instants are normalised to UTC.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Null => Parameter::Null,
            Value::Boolean(b) => Parameter::Bool(b),
            Value::Integer(i) => Parameter::Integer(i),
            Value::Float(f) => Parameter::Float(f),
            Value::String(s) => Parameter::String(s),
            Value::Bytes(b) => Parameter::ByteArray(b),
            Value::List(items) => {
                Parameter::Array(items.into_iter().map(Parameter::from_value).collect())
            }
            Value::Map(map) => Parameter::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Parameter::from_value(v)))
                    .collect(),
            ),
            Value::Node(n) => Parameter::Node(n),
            Value::Relationship(r) => Parameter::Relationship(r),
            Value::Path(p) => Parameter::Path(p),
            Value::Date(d) => Parameter::Date(d),
            Value::Time(t) => Parameter::Time(t),
            Value::LocalTime(t) => Parameter::LocalTime(t),
            Value::DateTime(dt) => Parameter::DateTime(dt.with_timezone(&Utc)),
            Value::LocalDateTime(dt) => Parameter::LocalDateTime(dt),
            Value::Duration(d) => Parameter::Duration(d),
            Value::Point(p) => Parameter::Point(p),
        }
    }
}

/// Flatten named parameters for the driver boundary.
pub fn flatten_params(params: HashMap<String, Parameter>) -> HashMap<String, Value> {
    params
        .into_iter()
        .map(|(name, param)| (name, param.into_value()))
        .collect()
}

/// Flatten a map parameter into named driver values.
///
/// Non-map parameters have no named form and yield `None`.
pub fn convert_to_map(param: Parameter) -> Option<HashMap<String, Value>> {
    match param {
        Parameter::Map(map) => Some(flatten_params(map)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    #[test]
    fn test_only_map_lacks_primitive() {
        assert_eq!(Parameter::Integer(1).primitive(), Some(Value::Integer(1)));
        assert_eq!(
            Parameter::array([Parameter::Bool(true)]).primitive(),
            Some(Value::List(vec![Value::Boolean(true)]))
        );
        let map = Parameter::map([("a", Parameter::Null)]);
        assert!(map.primitive().is_none());
        assert_eq!(map.as_map().map(|m| m.len()), Some(1));
    }

    #[test]
    fn test_unsigned_overflow_becomes_null() {
        assert_eq!(Parameter::UnsignedInteger(7).into_value(), Value::Integer(7));
        assert_eq!(Parameter::UnsignedInteger(u64::MAX).into_value(), Value::Null);
    }

    #[test]
    fn test_nested_flattening() {
        let param = Parameter::map([(
            "user",
            Parameter::map([
                ("tags", Parameter::array([Parameter::string("a"), Parameter::string("b")])),
                ("age", Parameter::UnsignedInteger(30)),
            ]),
        )]);
        let flat = convert_to_map(param).unwrap();
        let Some(Value::Map(user)) = flat.get("user") else {
            panic!("Expected nested map");
        };
        assert_eq!(user.get("age"), Some(&Value::Integer(30)));
        assert_eq!(
            user.get("tags"),
            Some(&Value::List(vec![Value::from("a"), Value::from("b")]))
        );
    }

    #[test]
    fn test_datetime_normalised_to_utc() {
        let offset = FixedOffset::west_opt(5 * 3600).unwrap();
        let local = offset.with_ymd_and_hms(2024, 3, 1, 7, 30, 0).unwrap();
        let param = Parameter::from_value(Value::DateTime(local));
        assert_eq!(
            param,
            Parameter::DateTime(Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap())
        );
        let Value::DateTime(back) = param.into_value() else {
            panic!("Expected DateTime value");
        };
        assert_eq!(back, local);
    }

    #[test]
    fn test_convert_to_map_rejects_scalars() {
        assert!(convert_to_map(Parameter::Integer(1)).is_none());
    }
}
