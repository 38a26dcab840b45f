//! The default hook chain.
//!
//! Order matters: byte sequences are claimed before the generic sequence hook,
//! and already-built parameters before anything else.

use super::{Encode, EncodeContext, EncodeHook, Shape};
use crate::param::Parameter;
use crate::reflect;
use crate::tag::{self, TagOptions};
use crate::value::{GraphDuration, Node, OffsetTime, Path, Point, Relationship, Value};
use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};
use chrono_tz::Tz;
use std::collections::HashMap;
use std::sync::Arc;

/// Try each downcast in turn and convert the first match.
macro_rules! downcast_first {
    ($any:expr, $($ty:ty => $conv:expr),+ $(,)?) => {{
        let any = $any;
        $(
            if let Some(v) = any.downcast_ref::<$ty>() {
                let conv: fn(&$ty) -> Parameter = $conv;
                return Some(conv(v));
            }
        )+
        None
    }};
}

/// The default chain, in evaluation order.
pub fn default_hooks() -> Vec<Arc<dyn EncodeHook>> {
    vec![
        Arc::new(encode_passthrough),
        Arc::new(encode_indirect),
        Arc::new(encode_signed),
        Arc::new(encode_unsigned),
        Arc::new(encode_float),
        Arc::new(encode_bool),
        Arc::new(encode_string),
        Arc::new(encode_bytes),
        Arc::new(encode_temporal),
        Arc::new(encode_point),
        Arc::new(encode_graph),
        Arc::new(encode_struct),
        Arc::new(encode_seq),
        Arc::new(encode_map),
    ]
}

pub fn encode_nil(value: &dyn Encode, _ctx: &EncodeContext<'_>) -> Option<Parameter> {
    reflect::is_nil(value).then_some(Parameter::Null)
}

pub fn encode_passthrough(value: &dyn Encode, _ctx: &EncodeContext<'_>) -> Option<Parameter> {
    value.as_any().downcast_ref::<Parameter>().cloned()
}

pub fn encode_indirect(value: &dyn Encode, ctx: &EncodeContext<'_>) -> Option<Parameter> {
    match value.shape() {
        Shape::Indirect(inner) => Some(ctx.encode(inner)),
        Shape::Nil => Some(Parameter::Null),
        _ => None,
    }
}

pub fn encode_signed(value: &dyn Encode, _ctx: &EncodeContext<'_>) -> Option<Parameter> {
    downcast_first!(value.as_any(),
        i64 => |v| Parameter::Integer(*v),
        i32 => |v| Parameter::Integer(i64::from(*v)),
        i16 => |v| Parameter::Integer(i64::from(*v)),
        i8 => |v| Parameter::Integer(i64::from(*v)),
        isize => |v| Parameter::Integer(*v as i64),
    )
}

pub fn encode_unsigned(value: &dyn Encode, _ctx: &EncodeContext<'_>) -> Option<Parameter> {
    downcast_first!(value.as_any(),
        u64 => |v| Parameter::UnsignedInteger(*v),
        u32 => |v| Parameter::UnsignedInteger(u64::from(*v)),
        u16 => |v| Parameter::UnsignedInteger(u64::from(*v)),
        u8 => |v| Parameter::UnsignedInteger(u64::from(*v)),
        usize => |v| Parameter::UnsignedInteger(*v as u64),
    )
}

pub fn encode_float(value: &dyn Encode, _ctx: &EncodeContext<'_>) -> Option<Parameter> {
    downcast_first!(value.as_any(),
        f64 => |v| Parameter::Float(*v),
        f32 => |v| Parameter::Float(f64::from(*v)),
    )
}

pub fn encode_bool(value: &dyn Encode, _ctx: &EncodeContext<'_>) -> Option<Parameter> {
    downcast_first!(value.as_any(), bool => |v| Parameter::Bool(*v))
}

pub fn encode_string(value: &dyn Encode, _ctx: &EncodeContext<'_>) -> Option<Parameter> {
    downcast_first!(value.as_any(),
        String => |v| Parameter::String(v.clone()),
        &'static str => |v| Parameter::String((*v).to_string()),
        char => |v| Parameter::String(v.to_string()),
    )
}

pub fn encode_bytes(value: &dyn Encode, _ctx: &EncodeContext<'_>) -> Option<Parameter> {
    match value.shape() {
        Shape::Bytes(bytes) => Some(Parameter::ByteArray(bytes.to_vec())),
        _ => None,
    }
}

/// Instants are normalised to UTC; local types keep their wall-clock value.
pub fn encode_temporal(value: &dyn Encode, _ctx: &EncodeContext<'_>) -> Option<Parameter> {
    downcast_first!(value.as_any(),
        DateTime<Utc> => |v| Parameter::DateTime(*v),
        DateTime<FixedOffset> => |v| Parameter::DateTime(v.with_timezone(&Utc)),
        DateTime<Tz> => |v| Parameter::DateTime(v.with_timezone(&Utc)),
        DateTime<Local> => |v| Parameter::DateTime(v.with_timezone(&Utc)),
        NaiveDate => |v| Parameter::Date(*v),
        OffsetTime => |v| Parameter::Time(*v),
        NaiveTime => |v| Parameter::LocalTime(*v),
        NaiveDateTime => |v| Parameter::LocalDateTime(*v),
        GraphDuration => |v| Parameter::Duration(*v),
        std::time::Duration => |v| Parameter::Duration(GraphDuration::from_std(*v)),
        TimeDelta => |v| Parameter::Duration(GraphDuration::from_time_delta(*v)),
    )
}

pub fn encode_point(value: &dyn Encode, _ctx: &EncodeContext<'_>) -> Option<Parameter> {
    downcast_first!(value.as_any(), Point => |v| Parameter::Point(*v))
}

pub fn encode_graph(value: &dyn Encode, _ctx: &EncodeContext<'_>) -> Option<Parameter> {
    downcast_first!(value.as_any(),
        Node => |v| Parameter::Node(v.clone()),
        Relationship => |v| Parameter::Relationship(v.clone()),
        Path => |v| Parameter::Path(v.clone()),
        Value => |v| Parameter::from_value(v.clone()),
    )
}

/// Tagged fields only. Untagged fields and fields tagged `-` never appear.
pub fn encode_struct(value: &dyn Encode, ctx: &EncodeContext<'_>) -> Option<Parameter> {
    let Shape::Struct(fields) = value.shape() else {
        return None;
    };
    let mut map = HashMap::with_capacity(fields.len());
    for field in fields {
        let Some(options) = tag::lookup(field.tags, ctx.tag_name()).and_then(TagOptions::parse)
        else {
            continue;
        };
        if options.omit_empty && reflect::is_zero(field.value) {
            continue;
        }
        let encoded = match reflect::value_elem(field.value) {
            Some(inner) => ctx.encode(inner),
            None => Parameter::Null,
        };
        map.insert(options.name.to_string(), encoded);
    }
    Some(Parameter::Map(map))
}

pub fn encode_seq(value: &dyn Encode, ctx: &EncodeContext<'_>) -> Option<Parameter> {
    let Shape::Seq(items) = value.shape() else {
        return None;
    };
    Some(Parameter::Array(
        items.into_iter().map(|item| ctx.encode(item)).collect(),
    ))
}

pub fn encode_map(value: &dyn Encode, ctx: &EncodeContext<'_>) -> Option<Parameter> {
    let Shape::Map(entries) = value.shape() else {
        return None;
    };
    Some(Parameter::Map(
        entries
            .into_iter()
            .map(|(key, item)| (key, ctx.encode(item)))
            .collect(),
    ))
}
