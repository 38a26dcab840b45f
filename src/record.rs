//! Typed result records.
//!
//! Every row returned by a query is classified into a [`RecordMap`]: each
//! returned alias lands in exactly one bucket chosen from the runtime type of
//! its value. The same alias can land in different buckets across rows.

use crate::cursor::RecordArray;
use crate::decode::{DecodeTarget, Decoder};
use crate::error::{Error, Result};
use crate::temporal;
use crate::value::{GraphDuration, Node, Path, Relationship, Value};
use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;

/// How result rows are classified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputOptions {
    /// Keep null values, stored in `others`.
    pub include_nil: bool,
    /// Keep nested maps that end up empty.
    pub keep_empty_maps: bool,
    /// IANA time zone for `Date`, `LocalTime` and `LocalDateTime` values.
    pub timezone: String,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            include_nil: false,
            keep_empty_maps: false,
            timezone: "UTC".to_string(),
        }
    }
}

impl OutputOptions {
    pub(crate) fn rules(&self) -> Result<TypingRules> {
        Ok(TypingRules {
            include_nil: self.include_nil,
            keep_empty_maps: self.keep_empty_maps,
            tz: temporal::parse_timezone(&self.timezone)?,
        })
    }
}

/// [`OutputOptions`] with the time zone resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct TypingRules {
    pub include_nil: bool,
    pub keep_empty_maps: bool,
    pub tz: Tz,
}

impl Default for TypingRules {
    fn default() -> Self {
        Self {
            include_nil: false,
            keep_empty_maps: false,
            tz: Tz::UTC,
        }
    }
}

/// One result row, split into typed buckets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordMap {
    pub arrays: HashMap<String, RecordArray>,
    pub maps: HashMap<String, RecordMap>,
    pub strings: HashMap<String, String>,
    pub ints: HashMap<String, i64>,
    pub floats: HashMap<String, f64>,
    pub bools: HashMap<String, bool>,
    /// Every temporal value except durations, as a UTC instant.
    pub times: HashMap<String, DateTime<Utc>>,
    /// Durations flattened with 30-day months.
    pub durations: HashMap<String, TimeDelta>,
    pub nodes: HashMap<String, Node>,
    pub relations: HashMap<String, Relationship>,
    pub paths: HashMap<String, Path>,
    pub others: HashMap<String, Value>,
}

impl RecordMap {
    /// Classify a raw row.
    pub fn from_values(values: HashMap<String, Value>, options: &OutputOptions) -> Result<Self> {
        Self::classify(values, &options.rules()?)
    }

    pub(crate) fn classify(values: HashMap<String, Value>, rules: &TypingRules) -> Result<Self> {
        let mut record = RecordMap::default();
        for (key, value) in values {
            record.insert(key, value, rules)?;
        }
        Ok(record)
    }

    fn insert(&mut self, key: String, value: Value, rules: &TypingRules) -> Result<()> {
        match value {
            Value::Null => {
                if rules.include_nil {
                    self.others.insert(key, Value::Null);
                }
            }
            Value::List(items) => {
                self.arrays.insert(key, RecordArray::with_rules(items, *rules));
            }
            Value::Map(map) => {
                let nested = Self::classify(map, rules)?;
                if !nested.is_empty() || rules.keep_empty_maps {
                    self.maps.insert(key, nested);
                }
            }
            Value::String(s) => {
                self.strings.insert(key, s);
            }
            Value::Integer(i) => {
                self.ints.insert(key, i);
            }
            Value::Float(f) => {
                self.floats.insert(key, f);
            }
            Value::Boolean(b) => {
                self.bools.insert(key, b);
            }
            Value::Duration(d) => {
                self.durations.insert(key, d.to_time_delta());
            }
            Value::Node(n) => {
                self.nodes.insert(key, n);
            }
            Value::Relationship(r) => {
                self.relations.insert(key, r);
            }
            Value::Path(p) => {
                self.paths.insert(key, p);
            }
            other => match temporal::to_instant(&other, &rules.tz) {
                Some(Ok(instant)) => {
                    self.times.insert(key, instant);
                }
                // Wall-clock times skipped by a DST gap have no instant.
                Some(Err(_)) | None => {
                    self.others.insert(key, other);
                }
            },
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.arrays.len()
            + self.maps.len()
            + self.strings.len()
            + self.ints.len()
            + self.floats.len()
            + self.bools.len()
            + self.times.len()
            + self.durations.len()
            + self.nodes.len()
            + self.relations.len()
            + self.paths.len()
            + self.others.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Back to a plain map.
    ///
    /// Nodes and relationships become their property maps; paths are left out.
    pub fn raw_map(&self) -> HashMap<String, Value> {
        let mut raw = HashMap::with_capacity(self.len());
        for (k, v) in &self.arrays {
            raw.insert(k.clone(), Value::List(v.values().to_vec()));
        }
        for (k, v) in &self.maps {
            raw.insert(k.clone(), Value::Map(v.raw_map()));
        }
        for (k, v) in &self.strings {
            raw.insert(k.clone(), Value::String(v.clone()));
        }
        for (k, v) in &self.ints {
            raw.insert(k.clone(), Value::Integer(*v));
        }
        for (k, v) in &self.floats {
            raw.insert(k.clone(), Value::Float(*v));
        }
        for (k, v) in &self.bools {
            raw.insert(k.clone(), Value::Boolean(*v));
        }
        for (k, v) in &self.times {
            raw.insert(k.clone(), Value::DateTime((*v).into()));
        }
        for (k, v) in &self.durations {
            raw.insert(k.clone(), Value::Duration(GraphDuration::from_time_delta(*v)));
        }
        for (k, v) in &self.nodes {
            raw.insert(k.clone(), Value::Map(v.properties.clone()));
        }
        for (k, v) in &self.relations {
            raw.insert(k.clone(), Value::Map(v.properties.clone()));
        }
        for (k, v) in &self.others {
            raw.insert(k.clone(), v.clone());
        }
        raw
    }

    /// JSON rendering, mainly for logs and debugging.
    pub fn to_json(&self) -> serde_json::Value {
        let mut out = serde_json::Map::new();
        for (k, v) in &self.arrays {
            out.insert(k.clone(), value_to_json(&Value::List(v.values().to_vec())));
        }
        for (k, v) in &self.maps {
            out.insert(k.clone(), v.to_json());
        }
        for (k, v) in &self.strings {
            out.insert(k.clone(), json!(v));
        }
        for (k, v) in &self.ints {
            out.insert(k.clone(), json!(v));
        }
        for (k, v) in &self.floats {
            out.insert(k.clone(), json!(v));
        }
        for (k, v) in &self.bools {
            out.insert(k.clone(), json!(v));
        }
        for (k, v) in &self.times {
            out.insert(k.clone(), json!(v.to_rfc3339()));
        }
        for (k, v) in &self.durations {
            out.insert(k.clone(), json!(v.to_string()));
        }
        for (k, v) in &self.nodes {
            out.insert(k.clone(), value_to_json(&Value::Node(v.clone())));
        }
        for (k, v) in &self.relations {
            out.insert(k.clone(), value_to_json(&Value::Relationship(v.clone())));
        }
        for (k, v) in &self.paths {
            out.insert(k.clone(), value_to_json(&Value::Path(v.clone())));
        }
        for (k, v) in &self.others {
            out.insert(k.clone(), value_to_json(v));
        }
        serde_json::Value::Object(out)
    }

    /// Decode the node returned under `name`.
    pub fn decode_node<O: DecodeTarget + ?Sized>(
        &self,
        decoder: &Decoder,
        name: &str,
        output: &mut O,
    ) -> Result<()> {
        let node = self
            .nodes
            .get(name)
            .ok_or_else(|| Error::Query(format!("Node '{name}' was not found in record")))?;
        decoder.decode_node(node, output)
    }

    /// Decode the relationship returned under `name`.
    pub fn decode_relation<O: DecodeTarget + ?Sized>(
        &self,
        decoder: &Decoder,
        name: &str,
        output: &mut O,
    ) -> Result<()> {
        let rel = self
            .relations
            .get(name)
            .ok_or_else(|| Error::Query(format!("Relation '{name}' was not found in record")))?;
        decoder.decode_relationship(rel, output)
    }

    /// Decode the path returned under `name` into its nodes and relationships.
    pub fn decode_path<N, R>(
        &self,
        decoder: &Decoder,
        name: &str,
        nodes: &mut N,
        relationships: &mut R,
    ) -> Result<()>
    where
        N: DecodeTarget + ?Sized,
        R: DecodeTarget + ?Sized,
    {
        let path = self
            .paths
            .get(name)
            .ok_or_else(|| Error::Query(format!("Path '{name}' was not found in record")))?;
        decoder.decode_path(path, nodes, relationships)
    }
}

fn properties_to_json(properties: &HashMap<String, Value>) -> serde_json::Value {
    serde_json::Value::Object(
        properties
            .iter()
            .map(|(k, v)| (k.clone(), value_to_json(v)))
            .collect(),
    )
}

/// Render a driver value as JSON.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Boolean(b) => json!(b),
        Value::Integer(i) => json!(i),
        Value::Float(f) => json!(f),
        Value::String(s) => json!(s),
        Value::Bytes(b) => json!(b),
        Value::List(items) => serde_json::Value::Array(items.iter().map(value_to_json).collect()),
        Value::Map(map) => properties_to_json(map),
        Value::Node(n) => json!({
            "id": n.id,
            "labels": n.labels,
            "properties": properties_to_json(&n.properties),
        }),
        Value::Relationship(r) => json!({
            "id": r.id,
            "type": r.rel_type,
            "start": r.start_node_id,
            "end": r.end_node_id,
            "properties": properties_to_json(&r.properties),
        }),
        Value::Path(p) => json!({
            "nodes": p.nodes.iter().map(|n| value_to_json(&Value::Node(n.clone()))).collect::<Vec<_>>(),
            "relationships": p
                .relationships
                .iter()
                .map(|r| value_to_json(&Value::Relationship(r.clone())))
                .collect::<Vec<_>>(),
        }),
        Value::Date(d) => json!(d.to_string()),
        Value::Time(t) => json!(format!("{}{}", t.time, t.offset)),
        Value::LocalTime(t) => json!(t.to_string()),
        Value::DateTime(dt) => json!(dt.to_rfc3339()),
        Value::LocalDateTime(dt) => json!(dt.to_string()),
        Value::Duration(d) => json!({
            "months": d.months,
            "days": d.days,
            "seconds": d.seconds,
            "nanoseconds": d.nanos,
        }),
        Value::Point(p) => json!({
            "srid": p.srid,
            "x": p.x,
            "y": p.y,
            "z": p.z,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{Decode, FieldErrors, FieldMapper, TargetShape};
    use crate::value::{OffsetTime, Point};
    use chrono::{FixedOffset, NaiveDate, NaiveTime, TimeZone};

    fn row(entries: Vec<(&str, Value)>) -> HashMap<String, Value> {
        entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn test_classification_buckets() {
        let offset = FixedOffset::east_opt(3600).unwrap();
        let values = row(vec![
            ("name", Value::from("Ada")),
            ("age", Value::Integer(36)),
            ("score", Value::Float(0.5)),
            ("active", Value::Boolean(true)),
            ("tags", Value::List(vec![Value::from("a")])),
            ("born", Value::Date(NaiveDate::from_ymd_opt(1815, 12, 10).unwrap())),
            ("at", Value::DateTime(offset.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap())),
            ("took", Value::Duration(GraphDuration::new(0, 1, 3600, 0))),
            ("n", Value::Node(Node::default())),
            ("r", Value::Relationship(Relationship::default())),
            ("p", Value::Path(Path::default())),
            ("loc", Value::Point(Point::new_2d(7203, 1.0, 2.0))),
            ("missing", Value::Null),
        ]);
        let record = RecordMap::from_values(values, &OutputOptions::default()).unwrap();
        assert_eq!(record.strings["name"], "Ada");
        assert_eq!(record.ints["age"], 36);
        assert_eq!(record.floats["score"], 0.5);
        assert!(record.bools["active"]);
        assert_eq!(record.arrays["tags"].len(), 1);
        assert_eq!(
            record.times["born"],
            Utc.with_ymd_and_hms(1815, 12, 10, 0, 0, 0).unwrap()
        );
        assert_eq!(record.times["at"], Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(record.durations["took"], TimeDelta::hours(25));
        assert!(record.nodes.contains_key("n"));
        assert!(record.relations.contains_key("r"));
        assert!(record.paths.contains_key("p"));
        assert!(record.others.contains_key("loc"));
        assert!(!record.others.contains_key("missing"));
        assert_eq!(record.len(), 12);
    }

    #[test]
    fn test_dst_transitions_do_not_fail_the_row() {
        let options = OutputOptions {
            timezone: "America/New_York".to_string(),
            ..Default::default()
        };
        let fold = NaiveDate::from_ymd_opt(2024, 11, 3)
            .unwrap()
            .and_hms_opt(1, 30, 0)
            .unwrap();
        let gap = NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(2, 30, 0)
            .unwrap();
        let values = row(vec![
            ("fold", Value::LocalDateTime(fold)),
            ("gap", Value::LocalDateTime(gap)),
            ("name", Value::from("Ada")),
        ]);
        let record = RecordMap::from_values(values, &options).unwrap();
        assert_eq!(
            record.times["fold"],
            Utc.with_ymd_and_hms(2024, 11, 3, 5, 30, 0).unwrap()
        );
        assert_eq!(record.others.get("gap"), Some(&Value::LocalDateTime(gap)));
        assert_eq!(record.strings["name"], "Ada");
    }

    #[test]
    fn test_include_nil() {
        let options = OutputOptions {
            include_nil: true,
            ..Default::default()
        };
        let record = RecordMap::from_values(row(vec![("missing", Value::Null)]), &options).unwrap();
        assert_eq!(record.others.get("missing"), Some(&Value::Null));
    }

    #[test]
    fn test_empty_nested_maps() {
        let values = row(vec![(
            "meta",
            Value::Map(row(vec![("gone", Value::Null)])),
        )]);
        let dropped = RecordMap::from_values(values.clone(), &OutputOptions::default()).unwrap();
        assert!(dropped.is_empty());

        let options = OutputOptions {
            keep_empty_maps: true,
            ..Default::default()
        };
        let kept = RecordMap::from_values(values, &options).unwrap();
        assert!(kept.maps["meta"].is_empty());
    }

    #[test]
    fn test_nested_map_classified() {
        let values = row(vec![(
            "meta",
            Value::Map(row(vec![("count", Value::Integer(3))])),
        )]);
        let record = RecordMap::from_values(values, &OutputOptions::default()).unwrap();
        assert_eq!(record.maps["meta"].ints["count"], 3);
    }

    #[test]
    fn test_local_time_anchored_in_zone() {
        let options = OutputOptions {
            timezone: "Europe/Paris".to_string(),
            ..Default::default()
        };
        let time = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
        let record = RecordMap::from_values(
            row(vec![
                ("local", Value::LocalTime(time)),
                (
                    "offset",
                    Value::Time(OffsetTime::new(time, FixedOffset::east_opt(0).unwrap())),
                ),
            ]),
            &options,
        )
        .unwrap();
        assert_eq!(record.times["local"].date_naive(), temporal::time_anchor());
        assert_eq!(record.times["offset"].time(), time);
    }

    #[test]
    fn test_raw_map_and_json() {
        let mut props = HashMap::new();
        props.insert("name".to_string(), Value::from("Ada"));
        let values = row(vec![
            ("n", Value::Node(Node::new(1, vec!["Person".to_string()], props.clone()))),
            ("count", Value::Integer(2)),
        ]);
        let record = RecordMap::from_values(values, &OutputOptions::default()).unwrap();
        let raw = record.raw_map();
        assert_eq!(raw.get("n"), Some(&Value::Map(props)));
        assert_eq!(raw.get("count"), Some(&Value::Integer(2)));

        let rendered = record.to_json();
        assert_eq!(rendered["count"], json!(2));
        assert_eq!(rendered["n"]["labels"], json!(["Person"]));
        assert_eq!(rendered["n"]["properties"]["name"], json!("Ada"));
    }

    #[derive(Default)]
    struct Named {
        name: String,
    }

    impl Decode for Named {
        fn decode_properties(
            &mut self,
            properties: &HashMap<String, Value>,
            mapper: &FieldMapper<'_>,
        ) -> Result<()> {
            let mut errors = FieldErrors::new("Named");
            mapper.decode_field(properties, "name", &[("neo4j", "name")], &mut self.name, &mut errors);
            errors.finish()
        }
    }

    impl DecodeTarget for Named {
        fn target(&mut self) -> TargetShape<'_> {
            TargetShape::Single(self)
        }
    }

    #[test]
    fn test_decode_helpers() {
        let mut props = HashMap::new();
        props.insert("name".to_string(), Value::from("Ada"));
        let record = RecordMap::from_values(
            row(vec![("u", Value::Node(Node::new(1, vec![], props)))]),
            &OutputOptions::default(),
        )
        .unwrap();
        let decoder = Decoder::new();

        let mut out = Named::default();
        record.decode_node(&decoder, "u", &mut out).unwrap();
        assert_eq!(out.name, "Ada");

        let err = record.decode_node(&decoder, "v", &mut out).unwrap_err();
        assert_eq!(err, Error::Query("Node 'v' was not found in record".to_string()));
        assert!(record.decode_relation(&decoder, "u", &mut out).is_err());
    }

    #[test]
    fn test_invalid_timezone() {
        let options = OutputOptions {
            timezone: "Invalid/Zone".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            RecordMap::from_values(HashMap::new(), &options),
            Err(Error::InvalidTimezone(_))
        ));
    }
}
