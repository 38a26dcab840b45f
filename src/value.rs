//! Driver-native values.
//!
//! [`Value`] is what crosses the driver boundary in both directions: query
//! parameters are flattened into it and result rows are converted from Bolt
//! into it (see [`crate::bolt`]).

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use std::collections::HashMap;

/// Seconds in the fixed 30-day month used when flattening durations.
pub const SECONDS_PER_MONTH: i64 = 30 * SECONDS_PER_DAY;

/// Seconds in a 24 hour day.
pub const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// A graph node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Node {
    pub id: i64,
    pub labels: Vec<String>,
    pub properties: HashMap<String, Value>,
}

impl Node {
    pub fn new(id: i64, labels: Vec<String>, properties: HashMap<String, Value>) -> Self {
        Self {
            id,
            labels,
            properties,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

/// A graph relationship.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Relationship {
    pub id: i64,
    pub start_node_id: i64,
    pub end_node_id: i64,
    pub rel_type: String,
    pub properties: HashMap<String, Value>,
}

impl Relationship {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

/// An ordered walk through the graph.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Path {
    pub nodes: Vec<Node>,
    pub relationships: Vec<Relationship>,
}

impl Path {
    pub fn start(&self) -> Option<&Node> {
        self.nodes.first()
    }

    pub fn end(&self) -> Option<&Node> {
        self.nodes.last()
    }

    pub fn len(&self) -> usize {
        self.relationships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
    }
}

/// A time of day carrying its UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetTime {
    pub time: NaiveTime,
    pub offset: FixedOffset,
}

impl OffsetTime {
    pub fn new(time: NaiveTime, offset: FixedOffset) -> Self {
        Self { time, offset }
    }
}

/// A component-based duration as stored by the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GraphDuration {
    pub months: i64,
    pub days: i64,
    pub seconds: i64,
    pub nanos: i32,
}

impl GraphDuration {
    pub fn new(months: i64, days: i64, seconds: i64, nanos: i32) -> Self {
        Self {
            months,
            days,
            seconds,
            nanos,
        }
    }

    /// Flatten into a single span.
    ///
    /// A month counts as 30 days and a day as 24 hours. This approximation is
    /// kept for compatibility with existing stored data; calendar-accurate
    /// arithmetic needs the components themselves.
    pub fn to_time_delta(&self) -> TimeDelta {
        let seconds = self
            .months
            .saturating_mul(SECONDS_PER_MONTH)
            .saturating_add(self.days.saturating_mul(SECONDS_PER_DAY))
            .saturating_add(self.seconds);
        TimeDelta::try_seconds(seconds)
            .and_then(|d| d.checked_add(&TimeDelta::nanoseconds(i64::from(self.nanos))))
            .unwrap_or(if seconds < 0 { TimeDelta::MIN } else { TimeDelta::MAX })
    }

    pub fn from_std(duration: std::time::Duration) -> Self {
        Self {
            months: 0,
            days: 0,
            seconds: i64::try_from(duration.as_secs()).unwrap_or(i64::MAX),
            nanos: duration.subsec_nanos() as i32,
        }
    }

    pub fn from_time_delta(delta: TimeDelta) -> Self {
        Self {
            months: 0,
            days: 0,
            seconds: delta.num_seconds(),
            nanos: delta.subsec_nanos(),
        }
    }
}

/// A spatial point, 2D when `z` is absent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub srid: i64,
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
}

impl Point {
    pub fn new_2d(srid: i64, x: f64, y: f64) -> Self {
        Self { srid, x, y, z: None }
    }

    pub fn new_3d(srid: i64, x: f64, y: f64, z: f64) -> Self {
        Self {
            srid,
            x,
            y,
            z: Some(z),
        }
    }
}

/// A value as the driver sees it.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
    Node(Node),
    Relationship(Relationship),
    Path(Path),
    Date(NaiveDate),
    Time(OffsetTime),
    LocalTime(NaiveTime),
    DateTime(DateTime<FixedOffset>),
    LocalDateTime(NaiveDateTime),
    Duration(GraphDuration),
    Point(Point),
}

impl Value {
    /// Name of the variant, used in type errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Boolean(_) => "Boolean",
            Value::Integer(_) => "Integer",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::Bytes(_) => "Bytes",
            Value::List(_) => "List",
            Value::Map(_) => "Map",
            Value::Node(_) => "Node",
            Value::Relationship(_) => "Relationship",
            Value::Path(_) => "Path",
            Value::Date(_) => "Date",
            Value::Time(_) => "Time",
            Value::LocalTime(_) => "LocalTime",
            Value::DateTime(_) => "DateTime",
            Value::LocalDateTime(_) => "LocalDateTime",
            Value::Duration(_) => "Duration",
            Value::Point(_) => "Point",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_relationship(&self) -> Option<&Relationship> {
        match self {
            Value::Relationship(r) => Some(r),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        Value::Node(node)
    }
}

impl From<Relationship> for Value {
    fn from(rel: Relationship) -> Self {
        Value::Relationship(rel)
    }
}

impl From<Path> for Value {
    fn from(path: Path) -> Self {
        Value::Path(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_one_day_one_hour_is_25h() {
        let duration = GraphDuration::new(0, 1, 3600, 0);
        assert_eq!(duration.to_time_delta(), TimeDelta::hours(25));
    }

    #[test]
    fn test_duration_month_is_30_days() {
        let duration = GraphDuration::new(1, 0, 0, 500);
        assert_eq!(
            duration.to_time_delta(),
            TimeDelta::days(30) + TimeDelta::nanoseconds(500)
        );
    }

    #[test]
    fn test_duration_from_std() {
        let duration = GraphDuration::from_std(std::time::Duration::new(90, 7));
        assert_eq!(duration, GraphDuration::new(0, 0, 90, 7));
    }

    #[test]
    fn test_value_type_names() {
        assert_eq!(Value::Null.type_name(), "Null");
        assert_eq!(Value::from("x").type_name(), "String");
        assert_eq!(Value::from(vec![1i64, 2]).type_name(), "List");
        assert_eq!(Value::Node(Node::default()).type_name(), "Node");
    }

    #[test]
    fn test_path_endpoints() {
        let a = Node::new(1, vec!["Person".to_string()], HashMap::new());
        let b = Node::new(2, vec!["Person".to_string()], HashMap::new());
        let path = Path {
            nodes: vec![a.clone(), b.clone()],
            relationships: vec![Relationship {
                id: 10,
                start_node_id: 1,
                end_node_id: 2,
                rel_type: "KNOWS".to_string(),
                properties: HashMap::new(),
            }],
        };
        assert_eq!(path.start(), Some(&a));
        assert_eq!(path.end(), Some(&b));
        assert_eq!(path.len(), 1);
        assert!(a.has_label("Person"));
    }
}
