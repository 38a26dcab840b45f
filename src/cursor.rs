//! Cursor over a list value returned inside a record.

use crate::decode::{DecodeTarget, Decoder};
use crate::error::{Error, Result};
use crate::record::{OutputOptions, RecordMap, TypingRules};
use crate::temporal;
use crate::value::{Node, Path, Relationship, Value};
use chrono::{DateTime, TimeDelta, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorState {
    BeforeFirst,
    Positioned(usize),
    Exhausted,
}

/// A list value with a forward-only cursor.
///
/// The cursor starts before the first element; call [`RecordArray::next`]
/// before reading. `current_as_*` read the element under the cursor and
/// `collect_as_*` drain every remaining element.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordArray {
    items: Vec<Value>,
    state: CursorState,
    rules: TypingRules,
}

impl RecordArray {
    pub fn new(items: Vec<Value>, options: &OutputOptions) -> Result<Self> {
        Ok(Self::with_rules(items, options.rules()?))
    }

    pub(crate) fn with_rules(items: Vec<Value>, rules: TypingRules) -> Self {
        Self {
            items,
            state: CursorState::BeforeFirst,
            rules,
        }
    }

    /// Number of elements in the backing list, regardless of the cursor.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The backing list.
    pub fn values(&self) -> &[Value] {
        &self.items
    }

    /// Advance the cursor. Returns false once past the last element.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> bool {
        self.state = match self.state {
            CursorState::BeforeFirst if !self.items.is_empty() => CursorState::Positioned(0),
            CursorState::Positioned(i) if i + 1 < self.items.len() => CursorState::Positioned(i + 1),
            _ => CursorState::Exhausted,
        };
        matches!(self.state, CursorState::Positioned(_))
    }

    /// Element under the cursor.
    pub fn current(&self) -> Option<&Value> {
        match self.state {
            CursorState::Positioned(i) => self.items.get(i),
            _ => None,
        }
    }

    fn current_or_err(&self, into: &str) -> Result<&Value> {
        self.current().ok_or_else(|| {
            Error::type_mismatch(
                format!("RecordArray has no current item to convert into {into}"),
                [into],
                "nothing",
            )
        })
    }

    fn convert_err(into: &str, got: &Value) -> Error {
        Error::type_mismatch(
            format!("Could not convert current item of RecordArray into {into}"),
            [into],
            got.type_name(),
        )
    }

    pub fn current_as_value(&self) -> Result<Value> {
        self.current_or_err("value").cloned()
    }

    pub fn current_as_array(&self) -> Result<RecordArray> {
        match self.current_or_err("array")? {
            Value::List(items) => Ok(Self::with_rules(items.clone(), self.rules)),
            other => Err(Self::convert_err("array", other)),
        }
    }

    pub fn current_as_map(&self) -> Result<RecordMap> {
        match self.current_or_err("map")? {
            Value::Map(map) => RecordMap::classify(map.clone(), &self.rules),
            other => Err(Self::convert_err("map", other)),
        }
    }

    pub fn current_as_string(&self) -> Result<String> {
        match self.current_or_err("string")? {
            Value::String(s) => Ok(s.clone()),
            other => Err(Self::convert_err("string", other)),
        }
    }

    pub fn current_as_int(&self) -> Result<i64> {
        match self.current_or_err("int")? {
            Value::Integer(i) => Ok(*i),
            other => Err(Self::convert_err("int", other)),
        }
    }

    pub fn current_as_float(&self) -> Result<f64> {
        match self.current_or_err("float")? {
            Value::Float(f) => Ok(*f),
            other => Err(Self::convert_err("float", other)),
        }
    }

    pub fn current_as_bool(&self) -> Result<bool> {
        match self.current_or_err("bool")? {
            Value::Boolean(b) => Ok(*b),
            other => Err(Self::convert_err("bool", other)),
        }
    }

    /// Any temporal element except durations, as a UTC instant.
    pub fn current_as_time(&self) -> Result<DateTime<Utc>> {
        let current = self.current_or_err("time")?;
        temporal::to_instant(current, &self.rules.tz)
            .unwrap_or_else(|| Err(Self::convert_err("time", current)))
    }

    pub fn current_as_duration(&self) -> Result<TimeDelta> {
        match self.current_or_err("duration")? {
            Value::Duration(d) => Ok(d.to_time_delta()),
            other => Err(Self::convert_err("duration", other)),
        }
    }

    pub fn current_as_node(&self) -> Result<Node> {
        match self.current_or_err("node")? {
            Value::Node(n) => Ok(n.clone()),
            other => Err(Self::convert_err("node", other)),
        }
    }

    pub fn current_as_relation(&self) -> Result<Relationship> {
        match self.current_or_err("relation")? {
            Value::Relationship(r) => Ok(r.clone()),
            other => Err(Self::convert_err("relation", other)),
        }
    }

    pub fn current_as_path(&self) -> Result<Path> {
        match self.current_or_err("path")? {
            Value::Path(p) => Ok(p.clone()),
            other => Err(Self::convert_err("path", other)),
        }
    }

    fn collect_with<T>(&mut self, read: impl Fn(&Self) -> Result<T>) -> Result<Vec<T>> {
        let mut out = Vec::with_capacity(self.remaining());
        while self.next() {
            out.push(read(self)?);
        }
        Ok(out)
    }

    fn remaining(&self) -> usize {
        match self.state {
            CursorState::BeforeFirst => self.items.len(),
            CursorState::Positioned(i) => self.items.len().saturating_sub(i + 1),
            CursorState::Exhausted => 0,
        }
    }

    pub fn collect_as_arrays(&mut self) -> Result<Vec<RecordArray>> {
        self.collect_with(Self::current_as_array)
    }

    /// Remaining maps. Maps that end up empty are skipped unless
    /// `keep_empty_maps` is set.
    pub fn collect_as_maps(&mut self) -> Result<Vec<RecordMap>> {
        let keep_empty = self.rules.keep_empty_maps;
        Ok(self
            .collect_with(Self::current_as_map)?
            .into_iter()
            .filter(|map| keep_empty || !map.is_empty())
            .collect())
    }

    pub fn collect_as_strings(&mut self) -> Result<Vec<String>> {
        self.collect_with(Self::current_as_string)
    }

    pub fn collect_as_ints(&mut self) -> Result<Vec<i64>> {
        self.collect_with(Self::current_as_int)
    }

    pub fn collect_as_floats(&mut self) -> Result<Vec<f64>> {
        self.collect_with(Self::current_as_float)
    }

    pub fn collect_as_bools(&mut self) -> Result<Vec<bool>> {
        self.collect_with(Self::current_as_bool)
    }

    pub fn collect_as_times(&mut self) -> Result<Vec<DateTime<Utc>>> {
        self.collect_with(Self::current_as_time)
    }

    pub fn collect_as_durations(&mut self) -> Result<Vec<TimeDelta>> {
        self.collect_with(Self::current_as_duration)
    }

    pub fn collect_as_nodes(&mut self) -> Result<Vec<Node>> {
        self.collect_with(Self::current_as_node)
    }

    pub fn collect_as_relations(&mut self) -> Result<Vec<Relationship>> {
        self.collect_with(Self::current_as_relation)
    }

    pub fn collect_as_paths(&mut self) -> Result<Vec<Path>> {
        self.collect_with(Self::current_as_path)
    }

    /// Every element of the backing list, whatever the cursor position.
    /// The cursor does not move.
    pub fn collect_as_values(&self) -> Vec<Value> {
        self.items.clone()
    }

    /// Drain the remaining nodes and decode them into `output`.
    pub fn collect_and_decode_nodes<O: DecodeTarget + ?Sized>(
        &mut self,
        decoder: &Decoder,
        output: &mut O,
    ) -> Result<()> {
        let nodes = self.collect_as_nodes()?;
        decoder.decode_node(&nodes, output)
    }

    /// Drain the remaining relationships and decode them into `output`.
    pub fn collect_and_decode_relations<O: DecodeTarget + ?Sized>(
        &mut self,
        decoder: &Decoder,
        output: &mut O,
    ) -> Result<()> {
        let relations = self.collect_as_relations()?;
        decoder.decode_relationship(&relations, output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{Decode, FieldErrors, FieldMapper};
    use crate::value::GraphDuration;
    use chrono::{NaiveDate, TimeZone};
    use std::collections::HashMap;

    fn array(items: Vec<Value>) -> RecordArray {
        RecordArray::new(items, &OutputOptions::default()).unwrap()
    }

    #[test]
    fn test_next_walks_every_item_once() {
        let mut arr = array(vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]);
        assert!(arr.current().is_none());
        assert!(arr.next());
        assert!(arr.next());
        assert!(arr.next());
        assert!(!arr.next());
        assert!(!arr.next());
        assert!(arr.current().is_none());
        assert_eq!(arr.len(), 3);
    }

    #[test]
    fn test_empty_array() {
        let mut arr = array(vec![]);
        assert!(arr.is_empty());
        assert!(!arr.next());
        assert!(arr.collect_as_ints().unwrap().is_empty());
    }

    #[test]
    fn test_current_conversions() {
        let mut arr = array(vec![Value::from("a"), Value::Integer(1)]);
        assert!(arr.current_as_string().is_err());
        arr.next();
        assert_eq!(arr.current_as_string().unwrap(), "a");
        let err = arr.current_as_int().unwrap_err();
        let Error::Type { message, got, .. } = err else {
            panic!("Expected type error");
        };
        assert_eq!(message, "Could not convert current item of RecordArray into int");
        assert_eq!(got, "String");
        arr.next();
        assert_eq!(arr.current_as_int().unwrap(), 1);
    }

    #[test]
    fn test_collect_after_partial_read() {
        let mut arr = array(vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]);
        arr.next();
        assert_eq!(arr.collect_as_ints().unwrap(), vec![2, 3]);
        assert_eq!(arr.len(), 3);
    }

    #[test]
    fn test_collect_as_values_ignores_cursor() {
        let mut arr = array(vec![Value::Boolean(true), Value::Boolean(false)]);
        arr.next();
        arr.next();
        assert_eq!(arr.collect_as_values().len(), 2);
        assert!(!arr.next());
    }

    #[test]
    fn test_collect_as_values_on_fresh_cursor() {
        let mut arr = array(vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]);
        assert_eq!(
            arr.collect_as_values(),
            vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]
        );
        assert!(arr.current().is_none());
        assert!(arr.next());
        assert!(arr.next());
        assert!(arr.next());
        assert!(!arr.next());
    }

    #[test]
    fn test_collect_fails_on_foreign_item() {
        let mut arr = array(vec![Value::Float(1.0), Value::from("x")]);
        assert!(arr.collect_as_floats().is_err());
    }

    #[test]
    fn test_durations_and_times() {
        let mut arr = array(vec![Value::Duration(GraphDuration::new(0, 1, 3600, 0))]);
        assert_eq!(arr.collect_as_durations().unwrap(), vec![TimeDelta::hours(25)]);

        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let mut arr = array(vec![Value::Date(date)]);
        assert_eq!(
            arr.collect_as_times().unwrap(),
            vec![Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()]
        );
    }

    #[test]
    fn test_collect_as_maps_skips_empty() {
        let mut full = HashMap::new();
        full.insert("a".to_string(), Value::Integer(1));
        let items = vec![Value::Map(HashMap::new()), Value::Map(full)];

        let mut arr = array(items.clone());
        let maps = arr.collect_as_maps().unwrap();
        assert_eq!(maps.len(), 1);
        assert_eq!(maps[0].ints["a"], 1);

        let options = OutputOptions {
            keep_empty_maps: true,
            ..Default::default()
        };
        let mut arr = RecordArray::new(items, &options).unwrap();
        assert_eq!(arr.collect_as_maps().unwrap().len(), 2);
    }

    #[test]
    fn test_nested_arrays() {
        let mut arr = array(vec![Value::List(vec![Value::Integer(1), Value::Integer(2)])]);
        let mut inner = arr.collect_as_arrays().unwrap().remove(0);
        assert_eq!(inner.collect_as_ints().unwrap(), vec![1, 2]);
    }

    #[derive(Default)]
    struct Tag {
        name: String,
    }

    impl Decode for Tag {
        fn decode_properties(
            &mut self,
            properties: &HashMap<String, Value>,
            mapper: &FieldMapper<'_>,
        ) -> Result<()> {
            let mut errors = FieldErrors::new("Tag");
            mapper.decode_field(properties, "name", &[("neo4j", "name")], &mut self.name, &mut errors);
            errors.finish()
        }
    }

    #[test]
    fn test_collect_and_decode_nodes() {
        let node = |name: &str| {
            let mut props = HashMap::new();
            props.insert("name".to_string(), Value::from(name));
            Value::Node(Node::new(0, vec!["Tag".to_string()], props))
        };
        let mut arr = array(vec![node("rust"), node("graph")]);
        let mut tags: Vec<Tag> = vec![Tag::default(), Tag::default()];
        arr.collect_and_decode_nodes(&Decoder::new(), &mut tags).unwrap();
        assert_eq!(tags[0].name, "rust");
        assert_eq!(tags[1].name, "graph");
    }
}
