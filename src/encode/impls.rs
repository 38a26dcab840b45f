use super::{Encode, Shape};
use crate::param::Parameter;
use crate::value::{GraphDuration, Node, OffsetTime, Path, Point, Relationship, Value};
use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};
use chrono_tz::Tz;
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::sync::Arc;

/// Stringification of map keys.
///
/// Integers use base-10, floats the shortest decimal that round-trips
/// as an `f64`, pointer keys their address.
pub trait MapKey {
    fn map_key(&self) -> String;
}

macro_rules! display_key {
    ($($ty:ty),+) => {
        $(
            impl MapKey for $ty {
                fn map_key(&self) -> String {
                    self.to_string()
                }
            }
        )+
    };
}

display_key!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f64, bool, char, String);

impl MapKey for f32 {
    fn map_key(&self) -> String {
        f64::from(*self).to_string()
    }
}

impl MapKey for &'static str {
    fn map_key(&self) -> String {
        (*self).to_string()
    }
}

impl<T> MapKey for Arc<T> {
    fn map_key(&self) -> String {
        format!("{:p}", Arc::as_ptr(self))
    }
}

impl<T> MapKey for Rc<T> {
    fn map_key(&self) -> String {
        format!("{:p}", Rc::as_ptr(self))
    }
}

macro_rules! numeric_leaf {
    ($($ty:ty),+) => {
        $(
            impl Encode for $ty {
                fn is_zero(&self) -> bool {
                    *self == (0 as $ty)
                }
            }
        )+
    };
}

numeric_leaf!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl Encode for bool {
    fn is_zero(&self) -> bool {
        !*self
    }
}

impl Encode for char {
    fn is_zero(&self) -> bool {
        *self == '\0'
    }
}

impl Encode for String {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl Encode for &'static str {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

macro_rules! temporal_leaf {
    ($($ty:ty),+) => {
        $(
            impl Encode for $ty {
                fn is_zero(&self) -> bool {
                    *self == <$ty>::default()
                }
            }
        )+
    };
}

temporal_leaf!(
    NaiveDate,
    NaiveTime,
    NaiveDateTime,
    DateTime<Utc>,
    DateTime<FixedOffset>,
    DateTime<Local>,
    GraphDuration,
    std::time::Duration,
    TimeDelta
);

impl Encode for DateTime<Tz> {
    fn is_zero(&self) -> bool {
        self.naive_utc() == NaiveDateTime::default()
    }
}

impl Encode for OffsetTime {
    fn is_zero(&self) -> bool {
        self.time == NaiveTime::default() && self.offset.local_minus_utc() == 0
    }
}

impl Encode for Point {}

impl Encode for Node {}

impl Encode for Relationship {}

impl Encode for Path {}

impl Encode for Value {
    fn is_zero(&self) -> bool {
        self.is_null()
    }
}

impl Encode for Parameter {
    fn is_zero(&self) -> bool {
        matches!(self, Parameter::Null)
    }
}

impl<T: Encode> Encode for Option<T> {
    fn shape(&self) -> Shape<'_> {
        match self {
            Some(inner) => Shape::Indirect(inner),
            None => Shape::Nil,
        }
    }

    fn is_zero(&self) -> bool {
        match self {
            Some(inner) => inner.is_zero(),
            None => true,
        }
    }
}

macro_rules! pointer_layer {
    ($($ptr:ident),+) => {
        $(
            impl<T: Encode> Encode for $ptr<T> {
                fn shape(&self) -> Shape<'_> {
                    Shape::Indirect(&**self)
                }

                fn is_zero(&self) -> bool {
                    (**self).is_zero()
                }
            }
        )+
    };
}

pointer_layer!(Box, Rc, Arc);

impl<T: Encode> Encode for Vec<T> {
    fn shape(&self) -> Shape<'_> {
        if let Some(bytes) = (self as &dyn Any).downcast_ref::<Vec<u8>>() {
            return Shape::Bytes(bytes);
        }
        Shape::Seq(self.iter().map(|item| item as &dyn Encode).collect())
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<T: Encode, const N: usize> Encode for [T; N] {
    fn shape(&self) -> Shape<'_> {
        if let Some(bytes) = (self as &dyn Any).downcast_ref::<[u8; N]>() {
            return Shape::Bytes(bytes);
        }
        Shape::Seq(self.iter().map(|item| item as &dyn Encode).collect())
    }

    fn is_zero(&self) -> bool {
        self.iter().all(|item| item.is_zero())
    }
}

impl<K, V, S> Encode for HashMap<K, V, S>
where
    K: MapKey + 'static,
    V: Encode,
    S: 'static,
{
    fn shape(&self) -> Shape<'_> {
        Shape::Map(
            self.iter()
                .map(|(k, v)| (k.map_key(), v as &dyn Encode))
                .collect(),
        )
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<K, V> Encode for BTreeMap<K, V>
where
    K: MapKey + 'static,
    V: Encode,
{
    fn shape(&self) -> Shape<'_> {
        Shape::Map(
            self.iter()
                .map(|(k, v)| (k.map_key(), v as &dyn Encode))
                .collect(),
        )
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_keys_round_trip() {
        assert_eq!(0.1f64.map_key(), "0.1");
        assert_eq!(1e21f64.map_key(), "1000000000000000000000");
        assert_eq!((-3i64).map_key(), "-3");
        let parsed: f64 = 0.30000000000000004f64.map_key().parse().unwrap();
        assert_eq!(parsed, 0.30000000000000004);
    }

    #[test]
    fn test_f32_keys_widen_to_f64() {
        assert_eq!(0.1f32.map_key(), "0.10000000149011612");
        assert_eq!(0.5f32.map_key(), "0.5");
        assert_eq!(3.0f32.map_key(), 3.0f64.map_key());
    }

    #[test]
    fn test_pointer_keys_use_identity() {
        let a = Arc::new(1);
        let b = Arc::clone(&a);
        let c = Arc::new(1);
        assert_eq!(a.map_key(), b.map_key());
        assert_ne!(a.map_key(), c.map_key());
    }

    #[test]
    fn test_shapes() {
        assert!(matches!(vec![1u8].shape(), Shape::Bytes(_)));
        assert!(matches!(vec![1u32].shape(), Shape::Seq(items) if items.len() == 1));
        assert!(matches!(None::<i64>.shape(), Shape::Nil));
        assert!(matches!(Box::new(1i64).shape(), Shape::Indirect(_)));
        assert!(matches!(5i64.shape(), Shape::Leaf));
    }

    #[test]
    fn test_zero_values() {
        assert!([0u16; 3].is_zero());
        assert!(!Some(3i64).is_zero());
        assert!(NaiveDate::default().is_zero());
        assert!(std::time::Duration::ZERO.is_zero());
    }
}
