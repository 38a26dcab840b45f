use super::{Decode, FieldMapper};
use crate::encode::{Encode, Shape};
use crate::error::{Error, Result};
use crate::temporal;
use crate::value::{GraphDuration, Node, OffsetTime, Path, Point, Relationship, Value};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};
use std::collections::{BTreeMap, HashMap};
use std::ops::{Deref, DerefMut};

/// Conversion of a single property value into a field type.
///
/// Numeric kinds coerce into each other when the value fits; floats only
/// convert to integers when they have no fractional part.
pub trait FromValue: Sized {
    fn from_value(value: &Value, mapper: &FieldMapper<'_>) -> Result<Self>;
}

fn mismatch<T>(value: &Value) -> Error {
    let target = std::any::type_name::<T>();
    Error::type_mismatch(
        format!("Could not convert {} into {target}", value.type_name()),
        [target],
        value.type_name(),
    )
}

macro_rules! integer_from_value {
    ($($ty:ty),+) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: &Value, _mapper: &FieldMapper<'_>) -> Result<Self> {
                    let converted = match value {
                        Value::Integer(i) => <$ty>::try_from(*i).ok(),
                        Value::Float(f) if f.is_finite() && f.fract() == 0.0 => {
                            <$ty>::try_from(*f as i128).ok()
                        }
                        _ => None,
                    };
                    converted.ok_or_else(|| mismatch::<$ty>(value))
                }
            }
        )+
    };
}

integer_from_value!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

macro_rules! float_from_value {
    ($($ty:ty),+) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: &Value, _mapper: &FieldMapper<'_>) -> Result<Self> {
                    match value {
                        Value::Float(f) => Ok(*f as $ty),
                        Value::Integer(i) => Ok(*i as $ty),
                        _ => Err(mismatch::<$ty>(value)),
                    }
                }
            }
        )+
    };
}

float_from_value!(f32, f64);

impl FromValue for bool {
    fn from_value(value: &Value, _mapper: &FieldMapper<'_>) -> Result<Self> {
        value.as_bool().ok_or_else(|| mismatch::<bool>(value))
    }
}

impl FromValue for String {
    fn from_value(value: &Value, _mapper: &FieldMapper<'_>) -> Result<Self> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| mismatch::<String>(value))
    }
}

impl FromValue for Value {
    fn from_value(value: &Value, _mapper: &FieldMapper<'_>) -> Result<Self> {
        Ok(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value, mapper: &FieldMapper<'_>) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other, mapper).map(Some),
        }
    }
}

impl<T: FromValue> FromValue for Box<T> {
    fn from_value(value: &Value, mapper: &FieldMapper<'_>) -> Result<Self> {
        T::from_value(value, mapper).map(Box::new)
    }
}

/// Lists convert element-wise; byte strings convert byte by byte.
impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value, mapper: &FieldMapper<'_>) -> Result<Self> {
        match value {
            Value::List(items) => items.iter().map(|item| T::from_value(item, mapper)).collect(),
            Value::Bytes(bytes) => bytes
                .iter()
                .map(|b| T::from_value(&Value::Integer(i64::from(*b)), mapper))
                .collect(),
            _ => Err(mismatch::<Vec<T>>(value)),
        }
    }
}

impl<T: FromValue> FromValue for HashMap<String, T> {
    fn from_value(value: &Value, mapper: &FieldMapper<'_>) -> Result<Self> {
        match value {
            Value::Map(map) => map
                .iter()
                .map(|(k, v)| Ok((k.clone(), T::from_value(v, mapper)?)))
                .collect(),
            _ => Err(mismatch::<HashMap<String, T>>(value)),
        }
    }
}

impl<T: FromValue> FromValue for BTreeMap<String, T> {
    fn from_value(value: &Value, mapper: &FieldMapper<'_>) -> Result<Self> {
        match value {
            Value::Map(map) => map
                .iter()
                .map(|(k, v)| Ok((k.clone(), T::from_value(v, mapper)?)))
                .collect(),
            _ => Err(mismatch::<BTreeMap<String, T>>(value)),
        }
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: &Value, _mapper: &FieldMapper<'_>) -> Result<Self> {
        match value {
            Value::Date(d) => Ok(*d),
            Value::LocalDateTime(dt) => Ok(dt.date()),
            _ => Err(mismatch::<NaiveDate>(value)),
        }
    }
}

impl FromValue for NaiveTime {
    fn from_value(value: &Value, _mapper: &FieldMapper<'_>) -> Result<Self> {
        match value {
            Value::LocalTime(t) => Ok(*t),
            Value::Time(t) => Ok(t.time),
            _ => Err(mismatch::<NaiveTime>(value)),
        }
    }
}

impl FromValue for OffsetTime {
    fn from_value(value: &Value, _mapper: &FieldMapper<'_>) -> Result<Self> {
        match value {
            Value::Time(t) => Ok(*t),
            _ => Err(mismatch::<OffsetTime>(value)),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: &Value, _mapper: &FieldMapper<'_>) -> Result<Self> {
        match value {
            Value::LocalDateTime(dt) => Ok(*dt),
            Value::Date(d) => Ok(d.and_time(NaiveTime::MIN)),
            _ => Err(mismatch::<NaiveDateTime>(value)),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: &Value, mapper: &FieldMapper<'_>) -> Result<Self> {
        temporal::to_instant(value, mapper.timezone())
            .unwrap_or_else(|| Err(mismatch::<DateTime<Utc>>(value)))
    }
}

impl FromValue for DateTime<FixedOffset> {
    fn from_value(value: &Value, mapper: &FieldMapper<'_>) -> Result<Self> {
        match value {
            Value::DateTime(dt) => Ok(*dt),
            other => DateTime::<Utc>::from_value(other, mapper).map(Into::into),
        }
    }
}

impl FromValue for GraphDuration {
    fn from_value(value: &Value, _mapper: &FieldMapper<'_>) -> Result<Self> {
        match value {
            Value::Duration(d) => Ok(*d),
            _ => Err(mismatch::<GraphDuration>(value)),
        }
    }
}

impl FromValue for TimeDelta {
    fn from_value(value: &Value, mapper: &FieldMapper<'_>) -> Result<Self> {
        GraphDuration::from_value(value, mapper).map(|d| d.to_time_delta())
    }
}

impl FromValue for std::time::Duration {
    fn from_value(value: &Value, mapper: &FieldMapper<'_>) -> Result<Self> {
        TimeDelta::from_value(value, mapper)?
            .to_std()
            .map_err(|_| mismatch::<std::time::Duration>(value))
    }
}

macro_rules! variant_from_value {
    ($($ty:ty => $variant:ident),+) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: &Value, _mapper: &FieldMapper<'_>) -> Result<Self> {
                    match value {
                        Value::$variant(inner) => Ok(inner.clone()),
                        _ => Err(mismatch::<$ty>(value)),
                    }
                }
            }
        )+
    };
}

variant_from_value!(
    Point => Point,
    Node => Node,
    Relationship => Relationship,
    Path => Path
);

/// A struct field holding another decodable struct.
///
/// Decodes from a nested map, or from the properties of a node or
/// relationship. Encodes as the wrapped value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Nested<T>(pub T);

impl<T> Nested<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Nested<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Nested<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T: Decode + Default> FromValue for Nested<T> {
    fn from_value(value: &Value, mapper: &FieldMapper<'_>) -> Result<Self> {
        let properties = match value {
            Value::Map(map) => map,
            Value::Node(node) => &node.properties,
            Value::Relationship(rel) => &rel.properties,
            _ => return Err(mismatch::<T>(value)),
        };
        let mut out = T::default();
        out.decode_properties(properties, mapper)?;
        Ok(Nested(out))
    }
}

impl<T: Encode> Encode for Nested<T> {
    fn shape(&self) -> Shape<'_> {
        Shape::Indirect(&self.0)
    }

    fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{Decoder, DecoderOptions};
    use chrono::TimeZone;

    fn decode<T: FromValue>(value: Value) -> Result<T> {
        Decoder::new().decode_value(&value)
    }

    #[test]
    fn test_integer_coercion() {
        assert_eq!(decode::<i32>(Value::Integer(7)).unwrap(), 7);
        assert_eq!(decode::<u8>(Value::Float(3.0)).unwrap(), 3);
        assert!(decode::<u8>(Value::Integer(300)).is_err());
        assert!(decode::<i64>(Value::Float(1.5)).is_err());
        assert!(decode::<i64>(Value::from("1")).is_err());
    }

    #[test]
    fn test_float_coercion() {
        assert_eq!(decode::<f64>(Value::Integer(2)).unwrap(), 2.0);
        assert_eq!(decode::<f32>(Value::Float(0.5)).unwrap(), 0.5);
    }

    #[test]
    fn test_collections() {
        let list = Value::List(vec![Value::Integer(1), Value::Integer(2)]);
        assert_eq!(decode::<Vec<i64>>(list).unwrap(), vec![1, 2]);
        assert_eq!(decode::<Vec<u8>>(Value::Bytes(vec![4, 5])).unwrap(), vec![4, 5]);
        assert_eq!(decode::<Option<String>>(Value::Null).unwrap(), None);
    }

    #[test]
    fn test_datetime_in_configured_zone() {
        let decoder = Decoder::with_options(DecoderOptions {
            timezone: "Asia/Tokyo".to_string(),
            ..Default::default()
        })
        .unwrap();
        let naive = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let instant: DateTime<Utc> = decoder.decode_value(&Value::LocalDateTime(naive)).unwrap();
        assert_eq!(instant, Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_duration_conversions() {
        let value = Value::Duration(GraphDuration::new(0, 1, 3600, 0));
        assert_eq!(decode::<TimeDelta>(value.clone()).unwrap(), TimeDelta::hours(25));
        assert_eq!(
            decode::<std::time::Duration>(value).unwrap(),
            std::time::Duration::from_secs(25 * 3600)
        );
    }
}
