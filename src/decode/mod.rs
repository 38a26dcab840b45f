//! Decoding of graph entities into typed structs.
//!
//! A [`Decoder`] takes nodes or relationships in any of the forms accepted by
//! [`EntitySource`] and fills a [`DecodeTarget`]: one struct, or a list of
//! structs. Field mapping goes through the struct's [`Decode`] impl, normally
//! generated by `#[derive(Decode)]`, using the same `#[neo4j("...")]` tags as
//! the encoder.
//!
//! List targets decode as many items as they hold. Extra source items are
//! dropped; too few source items is an error.

mod from_value;
mod source;

pub use from_value::{FromValue, Nested};
pub use source::{Entity, EntitySource, PathSource};

use crate::error::{Error, Result};
use crate::tag::{self, TagOptions, DEFAULT_TAG_NAME};
use crate::temporal;
use crate::value::{Node, Relationship, Value};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How fields without a tag for the configured key are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UntaggedFields {
    /// Never populated, mirroring the encoder's allow-list.
    #[default]
    Skip,
    /// Populated from the property named like the field.
    FieldName,
}

/// Decoder configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderOptions {
    pub tag_name: String,
    pub untagged: UntaggedFields,
    /// IANA time zone for zone-less temporal values.
    pub timezone: String,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            tag_name: DEFAULT_TAG_NAME.to_string(),
            untagged: UntaggedFields::Skip,
            timezone: "UTC".to_string(),
        }
    }
}

/// Populates a struct from a property map.
pub trait Decode {
    fn decode_properties(
        &mut self,
        properties: &HashMap<String, Value>,
        mapper: &FieldMapper<'_>,
    ) -> Result<()>;
}

/// Where decoded entities go.
pub enum TargetShape<'a> {
    Single(&'a mut dyn Decode),
    List(Vec<&'a mut dyn Decode>),
}

/// An output accepted by [`Decoder::decode_node`] and friends.
pub trait DecodeTarget {
    fn target(&mut self) -> TargetShape<'_>;
}

impl<T: Decode> DecodeTarget for [T] {
    fn target(&mut self) -> TargetShape<'_> {
        TargetShape::List(self.iter_mut().map(|item| item as &mut dyn Decode).collect())
    }
}

impl<T: Decode> DecodeTarget for Vec<T> {
    fn target(&mut self) -> TargetShape<'_> {
        self.as_mut_slice().target()
    }
}

impl<T: Decode, const N: usize> DecodeTarget for [T; N] {
    fn target(&mut self) -> TargetShape<'_> {
        self.as_mut_slice().target()
    }
}

impl<T: Decode + Default> DecodeTarget for Option<T> {
    fn target(&mut self) -> TargetShape<'_> {
        TargetShape::Single(self.get_or_insert_with(T::default))
    }
}

impl<T: DecodeTarget + ?Sized> DecodeTarget for Box<T> {
    fn target(&mut self) -> TargetShape<'_> {
        (**self).target()
    }
}

/// Errors collected while decoding the fields of one struct.
#[derive(Debug)]
pub struct FieldErrors {
    target: &'static str,
    errors: Vec<String>,
}

impl FieldErrors {
    pub fn new(target: &'static str) -> Self {
        Self {
            target,
            errors: Vec::new(),
        }
    }

    pub fn push(&mut self, field: &str, err: Error) {
        self.errors.push(format!("'{field}': {err}"));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Ok` when no field failed, otherwise a decoding error listing them all.
    pub fn finish(self) -> Result<()> {
        if self.errors.is_empty() {
            return Ok(());
        }
        Err(Error::Decoding(format!(
            "{} error(s) decoding {}: {}",
            self.errors.len(),
            self.target,
            self.errors.join("; ")
        )))
    }
}

/// Maps properties onto struct fields during one decode call.
pub struct FieldMapper<'d> {
    decoder: &'d Decoder,
}

impl<'d> FieldMapper<'d> {
    /// Property key for a field, or `None` when the field is not mapped.
    pub fn property_key(
        &self,
        field: &'static str,
        tags: &'static [(&'static str, &'static str)],
    ) -> Option<&'static str> {
        match tag::lookup(tags, &self.decoder.options.tag_name) {
            Some(value) => TagOptions::parse(value).map(|t| t.name),
            None => match self.decoder.options.untagged {
                UntaggedFields::Skip => None,
                UntaggedFields::FieldName => Some(field),
            },
        }
    }

    /// Decode one field in place. Absent properties leave the field untouched.
    pub fn decode_field<T: FromValue>(
        &self,
        properties: &HashMap<String, Value>,
        field: &'static str,
        tags: &'static [(&'static str, &'static str)],
        slot: &mut T,
        errors: &mut FieldErrors,
    ) {
        let Some(key) = self.property_key(field, tags) else {
            return;
        };
        let Some(value) = properties.get(key) else {
            return;
        };
        match T::from_value(value, self) {
            Ok(decoded) => *slot = decoded,
            Err(err) => errors.push(field, err),
        }
    }

    pub fn timezone(&self) -> &Tz {
        &self.decoder.timezone
    }

    pub fn decoder(&self) -> &'d Decoder {
        self.decoder
    }
}

/// Decodes nodes, relationships and paths into typed outputs.
#[derive(Debug, Clone)]
pub struct Decoder {
    options: DecoderOptions,
    timezone: Tz,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    pub fn new() -> Self {
        Self {
            options: DecoderOptions::default(),
            timezone: Tz::UTC,
        }
    }

    pub fn with_options(options: DecoderOptions) -> Result<Self> {
        let timezone = temporal::parse_timezone(&options.timezone)?;
        Ok(Self { options, timezone })
    }

    pub fn options(&self) -> &DecoderOptions {
        &self.options
    }

    pub fn mapper(&self) -> FieldMapper<'_> {
        FieldMapper { decoder: self }
    }

    /// Decode one or more nodes into `output`.
    pub fn decode_node<S, O>(&self, source: &S, output: &mut O) -> Result<()>
    where
        S: EntitySource<Node> + ?Sized,
        O: DecodeTarget + ?Sized,
    {
        self.decode_entities(source.entities()?, output)
    }

    /// Decode one or more relationships into `output`.
    pub fn decode_relationship<S, O>(&self, source: &S, output: &mut O) -> Result<()>
    where
        S: EntitySource<Relationship> + ?Sized,
        O: DecodeTarget + ?Sized,
    {
        self.decode_entities(source.entities()?, output)
    }

    /// Decode a path's nodes and relationships into two outputs.
    pub fn decode_path<S, N, R>(&self, source: &S, nodes: &mut N, relationships: &mut R) -> Result<()>
    where
        S: PathSource + ?Sized,
        N: DecodeTarget + ?Sized,
        R: DecodeTarget + ?Sized,
    {
        let path = source.path()?;
        self.decode_node(&path.nodes, nodes)?;
        self.decode_relationship(&path.relationships, relationships)
    }

    /// Decode every source node into a fresh value.
    pub fn decode_nodes_vec<T, S>(&self, source: &S) -> Result<Vec<T>>
    where
        T: Decode + Default,
        S: EntitySource<Node> + ?Sized,
    {
        self.decode_all(source.entities()?)
    }

    /// Decode every source relationship into a fresh value.
    pub fn decode_relationships_vec<T, S>(&self, source: &S) -> Result<Vec<T>>
    where
        T: Decode + Default,
        S: EntitySource<Relationship> + ?Sized,
    {
        self.decode_all(source.entities()?)
    }

    /// Decode a bare property map.
    pub fn decode_properties<T: Decode + ?Sized>(
        &self,
        properties: &HashMap<String, Value>,
        output: &mut T,
    ) -> Result<()> {
        output.decode_properties(properties, &self.mapper())
    }

    /// Convert a single value.
    pub fn decode_value<T: FromValue>(&self, value: &Value) -> Result<T> {
        T::from_value(value, &self.mapper())
    }

    fn decode_entities<E, O>(&self, items: Vec<&E>, output: &mut O) -> Result<()>
    where
        E: Entity,
        O: DecodeTarget + ?Sized,
    {
        let mapper = self.mapper();
        match output.target() {
            TargetShape::Single(target) => {
                let first = items.first().ok_or_else(|| {
                    Error::Decoding(format!("Could not decode one {} to fit in output", E::KIND))
                })?;
                target.decode_properties(first.properties(), &mapper)
            }
            TargetShape::List(targets) => {
                if targets.len() > items.len() {
                    return Err(Error::Decoding(format!(
                        "Could not decode enough {}s to fit in output",
                        E::KIND
                    )));
                }
                for (target, item) in targets.into_iter().zip(items) {
                    target.decode_properties(item.properties(), &mapper)?;
                }
                Ok(())
            }
        }
    }

    fn decode_all<E: Entity, T: Decode + Default>(&self, items: Vec<&E>) -> Result<Vec<T>> {
        let mapper = self.mapper();
        items
            .into_iter()
            .map(|item| {
                let mut out = T::default();
                out.decode_properties(item.properties(), &mapper)?;
                Ok(out)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Path;

    #[derive(Debug, Default, PartialEq)]
    struct Person {
        name: String,
        age: i64,
        email: Option<String>,
    }

    impl Decode for Person {
        fn decode_properties(
            &mut self,
            properties: &HashMap<String, Value>,
            mapper: &FieldMapper<'_>,
        ) -> Result<()> {
            let mut errors = FieldErrors::new("Person");
            mapper.decode_field(properties, "name", &[("neo4j", "name")], &mut self.name, &mut errors);
            mapper.decode_field(properties, "age", &[("neo4j", "age,omitempty")], &mut self.age, &mut errors);
            mapper.decode_field(properties, "email", &[], &mut self.email, &mut errors);
            errors.finish()
        }
    }

    impl DecodeTarget for Person {
        fn target(&mut self) -> TargetShape<'_> {
            TargetShape::Single(self)
        }
    }

    #[derive(Debug, Default, PartialEq)]
    struct Knows {
        since: i64,
    }

    impl Decode for Knows {
        fn decode_properties(
            &mut self,
            properties: &HashMap<String, Value>,
            mapper: &FieldMapper<'_>,
        ) -> Result<()> {
            let mut errors = FieldErrors::new("Knows");
            mapper.decode_field(properties, "since", &[("neo4j", "since")], &mut self.since, &mut errors);
            errors.finish()
        }
    }

    fn person(id: i64, name: &str, age: i64) -> Node {
        let mut props = HashMap::new();
        props.insert("name".to_string(), Value::from(name));
        props.insert("age".to_string(), Value::Integer(age));
        props.insert("email".to_string(), Value::from("x@example.com"));
        Node::new(id, vec!["Person".to_string()], props)
    }

    fn knows(id: i64, since: i64) -> Relationship {
        let mut props = HashMap::new();
        props.insert("since".to_string(), Value::Integer(since));
        Relationship {
            id,
            start_node_id: 1,
            end_node_id: 2,
            rel_type: "KNOWS".to_string(),
            properties: props,
        }
    }

    #[test]
    fn test_decode_single_node() {
        let decoder = Decoder::new();
        let mut out = Person::default();
        decoder.decode_node(&person(1, "Ada", 36), &mut out).unwrap();
        assert_eq!(out.name, "Ada");
        assert_eq!(out.age, 36);
        assert_eq!(out.email, None);
    }

    #[test]
    fn test_decode_untagged_by_field_name() {
        let decoder = Decoder::with_options(DecoderOptions {
            untagged: UntaggedFields::FieldName,
            ..Default::default()
        })
        .unwrap();
        let mut out = Person::default();
        decoder.decode_node(&person(1, "Ada", 36), &mut out).unwrap();
        assert_eq!(out.email.as_deref(), Some("x@example.com"));
    }

    #[test]
    fn test_decode_list_truncates_extra_sources() {
        let decoder = Decoder::new();
        let nodes = vec![person(1, "a", 1), person(2, "b", 2), person(3, "c", 3)];
        let mut out: [Person; 2] = Default::default();
        decoder.decode_node(&nodes, &mut out).unwrap();
        assert_eq!(out[0].name, "a");
        assert_eq!(out[1].name, "b");
    }

    #[test]
    fn test_decode_list_too_few_sources() {
        let decoder = Decoder::new();
        let nodes = vec![person(1, "a", 1), person(2, "b", 2)];
        let mut out: Vec<Person> = (0..3).map(|_| Person::default()).collect();
        let err = decoder.decode_node(&nodes, &mut out).unwrap_err();
        assert_eq!(
            err,
            Error::Decoding("Could not decode enough nodes to fit in output".to_string())
        );
    }

    #[test]
    fn test_decode_empty_source_into_single() {
        let decoder = Decoder::new();
        let nodes: Vec<Node> = Vec::new();
        let mut out = Person::default();
        let err = decoder.decode_node(&nodes, &mut out).unwrap_err();
        assert_eq!(
            err,
            Error::Decoding("Could not decode one node to fit in output".to_string())
        );
    }

    #[test]
    fn test_decode_skips_missing_optional_entries() {
        let decoder = Decoder::new();
        let nodes = vec![None, Some(person(2, "b", 2))];
        let mut out: Option<Person> = None;
        decoder.decode_node(&nodes, &mut out).unwrap();
        assert_eq!(out.map(|p| p.name), Some("b".to_string()));
    }

    #[test]
    fn test_decode_null_value_is_type_error() {
        let decoder = Decoder::new();
        let mut out = Person::default();
        let err = decoder.decode_node(&Value::Null, &mut out).unwrap_err();
        assert!(matches!(err, Error::Type { ref message, .. } if message == "Decoded node cannot be null"));

        let err = decoder.decode_node(&Value::Integer(3), &mut out).unwrap_err();
        assert!(matches!(err, Error::Type { ref got, .. } if got == "Integer"));
    }

    #[test]
    fn test_decode_field_errors_are_enumerated() {
        let decoder = Decoder::new();
        let mut props = HashMap::new();
        props.insert("name".to_string(), Value::Integer(1));
        props.insert("age".to_string(), Value::from("old"));
        let node = Node::new(1, vec![], props);
        let mut out = Person::default();
        let Err(Error::Decoding(message)) = decoder.decode_node(&node, &mut out) else {
            panic!("Expected decoding error");
        };
        assert!(message.starts_with("2 error(s) decoding Person"));
        assert!(message.contains("'name'"));
        assert!(message.contains("'age'"));
    }

    #[test]
    fn test_decode_relationships_and_path() {
        let decoder = Decoder::new();
        let mut rel = Knows::default();
        decoder.decode_relationship(&knows(10, 2001), &mut rel).unwrap();
        assert_eq!(rel.since, 2001);

        let path = Path {
            nodes: vec![person(1, "a", 1), person(2, "b", 2)],
            relationships: vec![knows(10, 1999)],
        };
        let mut people: Vec<Person> = vec![Person::default(), Person::default()];
        let mut rels = vec![Knows::default()];
        decoder.decode_path(&path, &mut people, &mut rels).unwrap();
        assert_eq!(people[1].name, "b");
        assert_eq!(rels[0].since, 1999);
    }

    #[test]
    fn test_decode_nodes_vec() {
        let decoder = Decoder::new();
        let value = Value::List(vec![
            Value::Node(person(1, "a", 1)),
            Value::Null,
            Value::Node(person(2, "b", 2)),
        ]);
        let people: Vec<Person> = decoder.decode_nodes_vec(&value).unwrap();
        assert_eq!(people.len(), 2);
        assert_eq!(people[1].age, 2);
    }

    #[test]
    fn test_invalid_timezone_rejected() {
        let result = Decoder::with_options(DecoderOptions {
            timezone: "Nowhere/Special".to_string(),
            ..Default::default()
        });
        assert!(matches!(result, Err(Error::InvalidTimezone(_))));
    }
}
