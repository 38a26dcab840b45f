//! Conversion between [`Value`] and neo4rs' `BoltType`.

use crate::error::{Error, Result};
use crate::value::{GraphDuration, Node, OffsetTime, Path, Point, Relationship, Value};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use neo4rs::{
    BoltBoolean, BoltBytes, BoltDate, BoltDateTime, BoltDuration, BoltFloat, BoltInteger,
    BoltList, BoltLocalDateTime, BoltLocalTime, BoltMap, BoltNull, BoltPoint2D, BoltPoint3D,
    BoltString, BoltTime, BoltType, Query, Row,
};
use std::collections::HashMap;

fn bolt_map(entries: HashMap<String, Value>) -> BoltMap {
    BoltMap {
        value: entries
            .into_iter()
            .map(|(k, v)| (BoltString::new(&k), to_bolt(v)))
            .collect(),
    }
}

/// Convert a value into a query parameter.
///
/// Nodes and relationships are sent as their property maps and paths as the
/// list of their nodes' property maps.
pub fn to_bolt(value: Value) -> BoltType {
    match value {
        Value::Null => BoltType::Null(BoltNull),
        Value::Boolean(b) => BoltType::Boolean(BoltBoolean::new(b)),
        Value::Integer(i) => BoltType::Integer(BoltInteger::new(i)),
        Value::Float(f) => BoltType::Float(BoltFloat::new(f)),
        Value::String(s) => BoltType::String(BoltString::new(&s)),
        Value::Bytes(b) => BoltType::Bytes(BoltBytes::new(b.into())),
        Value::List(items) => BoltType::List(BoltList {
            value: items.into_iter().map(to_bolt).collect(),
        }),
        Value::Map(map) => BoltType::Map(bolt_map(map)),
        Value::Node(node) => BoltType::Map(bolt_map(node.properties)),
        Value::Relationship(rel) => BoltType::Map(bolt_map(rel.properties)),
        Value::Path(path) => BoltType::List(BoltList {
            value: path
                .nodes
                .into_iter()
                .map(|node| BoltType::Map(bolt_map(node.properties)))
                .collect(),
        }),
        Value::Date(d) => BoltType::Date(BoltDate::from(d)),
        Value::Time(t) => BoltType::Time(BoltTime::from((t.time, t.offset))),
        Value::LocalTime(t) => BoltType::LocalTime(BoltLocalTime::from(t)),
        Value::DateTime(dt) => BoltType::DateTime(BoltDateTime::from(dt)),
        Value::LocalDateTime(dt) => BoltType::LocalDateTime(BoltLocalDateTime::from(dt)),
        Value::Duration(d) => BoltType::Duration(BoltDuration::new(
            BoltInteger::new(d.months),
            BoltInteger::new(d.days),
            BoltInteger::new(d.seconds),
            BoltInteger::new(i64::from(d.nanos)),
        )),
        Value::Point(p) => match p.z {
            Some(z) => BoltType::Point3D(BoltPoint3D {
                sr_id: BoltInteger::new(p.srid),
                x: BoltFloat::new(p.x),
                y: BoltFloat::new(p.y),
                z: BoltFloat::new(z),
            }),
            None => BoltType::Point2D(BoltPoint2D {
                sr_id: BoltInteger::new(p.srid),
                x: BoltFloat::new(p.x),
                y: BoltFloat::new(p.y),
            }),
        },
    }
}

fn properties(map: BoltMap) -> Result<HashMap<String, Value>> {
    map.value
        .into_iter()
        .map(|(k, v)| Ok((k.value, from_bolt(v)?)))
        .collect()
}

fn labels(list: BoltList) -> Vec<String> {
    list.value
        .into_iter()
        .filter_map(|label| match label {
            BoltType::String(s) => Some(s.value),
            _ => None,
        })
        .collect()
}

fn invalid(what: &str) -> Error {
    Error::Decoding(format!("driver returned an invalid {what}"))
}

/// A relationship as it appears inside a path, before its endpoints are known.
#[derive(Debug, Clone, PartialEq)]
pub struct PathSegment {
    pub id: i64,
    pub rel_type: String,
    pub properties: HashMap<String, Value>,
}

/// Rebuild a path from its node list, relationship list and index sequence.
///
/// Indices come in pairs: a 1-based relationship index, negative when the
/// relationship is traversed against its direction, followed by the index of
/// the next node.
pub fn assemble_path(nodes: Vec<Node>, segments: Vec<PathSegment>, indices: &[i64]) -> Result<Path> {
    if indices.len() % 2 != 0 {
        return Err(invalid("path index sequence"));
    }
    let node_at = |i: i64| {
        usize::try_from(i)
            .ok()
            .and_then(|i| nodes.get(i))
            .ok_or_else(|| invalid("path node index"))
    };

    let mut path_nodes = Vec::with_capacity(indices.len() / 2 + 1);
    let mut relationships = Vec::with_capacity(indices.len() / 2);
    let mut previous = match nodes.first() {
        Some(node) => node,
        None => return Ok(Path::default()),
    };
    path_nodes.push(previous.clone());

    for pair in indices.chunks(2) {
        let (rel_index, node_index) = (pair[0], pair[1]);
        let segment = usize::try_from(rel_index.unsigned_abs())
            .ok()
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| segments.get(i))
            .ok_or_else(|| invalid("path relationship index"))?;
        let next = node_at(node_index)?;
        let (start, end) = if rel_index > 0 {
            (previous.id, next.id)
        } else {
            (next.id, previous.id)
        };
        relationships.push(Relationship {
            id: segment.id,
            start_node_id: start,
            end_node_id: end,
            rel_type: segment.rel_type.clone(),
            properties: segment.properties.clone(),
        });
        path_nodes.push(next.clone());
        previous = next;
    }

    Ok(Path {
        nodes: path_nodes,
        relationships,
    })
}

/// Read one integer component out of a duration's `Debug` form.
fn duration_component(repr: &str, name: &str) -> Option<i64> {
    let label = format!(" {name}: ");
    let rest = &repr[repr.find(&label)? + label.len()..];
    let value = &rest[rest.find(|c: char| c == '-' || c.is_ascii_digit())?..];
    let end = value
        .find(|c: char| c != '-' && !c.is_ascii_digit())
        .unwrap_or(value.len());
    value[..end].parse().ok()
}

/// Months, days, seconds and nanoseconds of a driver duration.
///
/// neo4rs keeps the components private and only converts into a
/// `std::time::Duration`, which folds months at 30.4375 days and cannot hold
/// negative spans. The components are read from the derived `Debug` form.
fn duration(bolt: &BoltDuration) -> Result<GraphDuration> {
    let repr = format!("{bolt:?}");
    let component = |name: &str| duration_component(&repr, name).ok_or_else(|| invalid("duration"));
    let nanos = i32::try_from(component("nanoseconds")?).map_err(|_| invalid("duration"))?;
    Ok(GraphDuration::new(
        component("months")?,
        component("days")?,
        component("seconds")?,
        nanos,
    ))
}

fn node(bolt: neo4rs::BoltNode) -> Result<Node> {
    Ok(Node {
        id: bolt.id.value,
        labels: labels(bolt.labels),
        properties: properties(bolt.properties)?,
    })
}

/// Convert a value returned by the driver.
pub fn from_bolt(value: BoltType) -> Result<Value> {
    let converted = match value {
        BoltType::Null(_) => Value::Null,
        BoltType::Boolean(b) => Value::Boolean(b.value),
        BoltType::Integer(i) => Value::Integer(i.value),
        BoltType::Float(f) => Value::Float(f.value),
        BoltType::String(s) => Value::String(s.value),
        BoltType::Bytes(b) => Value::Bytes(b.value.to_vec()),
        BoltType::List(list) => Value::List(
            list.value
                .into_iter()
                .map(from_bolt)
                .collect::<Result<Vec<_>>>()?,
        ),
        BoltType::Map(map) => Value::Map(properties(map)?),
        BoltType::Node(n) => Value::Node(node(n)?),
        BoltType::Relation(r) => Value::Relationship(Relationship {
            id: r.id.value,
            start_node_id: r.start_node_id.value,
            end_node_id: r.end_node_id.value,
            rel_type: r.typ.value,
            properties: properties(r.properties)?,
        }),
        BoltType::UnboundedRelation(r) => Value::Relationship(Relationship {
            id: r.id.value,
            start_node_id: -1,
            end_node_id: -1,
            rel_type: r.typ.value,
            properties: properties(r.properties)?,
        }),
        BoltType::Path(p) => {
            let nodes = p
                .nodes
                .value
                .into_iter()
                .map(|item| match item {
                    BoltType::Node(n) => node(n),
                    _ => Err(invalid("path node")),
                })
                .collect::<Result<Vec<_>>>()?;
            let segments = p
                .rels
                .value
                .into_iter()
                .map(|item| match item {
                    BoltType::UnboundedRelation(r) => Ok(PathSegment {
                        id: r.id.value,
                        rel_type: r.typ.value,
                        properties: properties(r.properties)?,
                    }),
                    _ => Err(invalid("path relationship")),
                })
                .collect::<Result<Vec<_>>>()?;
            let indices = p
                .indices
                .value
                .into_iter()
                .map(|item| match item {
                    BoltType::Integer(i) => Ok(i.value),
                    _ => Err(invalid("path index")),
                })
                .collect::<Result<Vec<_>>>()?;
            Value::Path(assemble_path(nodes, segments, &indices)?)
        }
        BoltType::Point2D(p) => Value::Point(Point::new_2d(p.sr_id.value, p.x.value, p.y.value)),
        BoltType::Point3D(p) => Value::Point(Point::new_3d(
            p.sr_id.value,
            p.x.value,
            p.y.value,
            p.z.value,
        )),
        BoltType::Date(d) => {
            let date: NaiveDate = d.try_into().map_err(|_| invalid("date"))?;
            Value::Date(date)
        }
        BoltType::Time(t) => {
            let (time, offset): (NaiveTime, FixedOffset) = t.into();
            Value::Time(OffsetTime::new(time, offset))
        }
        BoltType::LocalTime(t) => {
            let time: NaiveTime = t.into();
            Value::LocalTime(time)
        }
        BoltType::DateTime(dt) => {
            let datetime: DateTime<FixedOffset> = dt.try_into().map_err(|_| invalid("datetime"))?;
            Value::DateTime(datetime)
        }
        BoltType::LocalDateTime(dt) => {
            let datetime: NaiveDateTime = dt.try_into().map_err(|_| invalid("local datetime"))?;
            Value::LocalDateTime(datetime)
        }
        BoltType::DateTimeZoneId(dt) => {
            let datetime: DateTime<FixedOffset> =
                (&dt).try_into().map_err(|_| invalid("zoned datetime"))?;
            Value::DateTime(datetime)
        }
        BoltType::Duration(d) => Value::Duration(duration(&d)?),
    };
    Ok(converted)
}

/// Read every column of a row.
pub fn row_to_map(row: &Row) -> Result<HashMap<String, Value>> {
    let mut out = HashMap::new();
    for key in row.keys() {
        let name = key.to_string();
        let bolt: BoltType = row
            .get(&name)
            .map_err(|e| Error::Decoding(format!("could not read column '{name}': {e}")))?;
        out.insert(name, from_bolt(bolt)?);
    }
    Ok(out)
}

/// Build a driver query with flattened parameters.
pub fn build_query(text: &str, params: HashMap<String, Value>) -> Query {
    params
        .into_iter()
        .fold(neo4rs::query(text), |q, (name, value)| q.param(&name, to_bolt(value)))
}
