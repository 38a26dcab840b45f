use crate::error::{Error, Result};
use crate::value::{Node, Path, Relationship, Value};
use std::collections::HashMap;

/// A graph entity carrying properties.
pub trait Entity {
    const KIND: &'static str;

    fn properties(&self) -> &HashMap<String, Value>;

    fn from_value(value: &Value) -> Option<&Self>;

    /// Type names accepted as a source of this entity, for type errors.
    fn accepted_types() -> Vec<String> {
        let name = Self::type_label();
        vec![
            name.to_string(),
            format!("Option<{name}>"),
            format!("Vec<{name}>"),
            format!("Vec<Option<{name}>>"),
            format!("[{name}]"),
            format!("Value::{name}"),
            format!("Value::List<{name}>"),
        ]
    }

    fn type_label() -> &'static str;
}

impl Entity for Node {
    const KIND: &'static str = "node";

    fn properties(&self) -> &HashMap<String, Value> {
        &self.properties
    }

    fn from_value(value: &Value) -> Option<&Self> {
        value.as_node()
    }

    fn type_label() -> &'static str {
        "Node"
    }
}

impl Entity for Relationship {
    const KIND: &'static str = "relationship";

    fn properties(&self) -> &HashMap<String, Value> {
        &self.properties
    }

    fn from_value(value: &Value) -> Option<&Self> {
        value.as_relationship()
    }

    fn type_label() -> &'static str {
        "Relationship"
    }
}

/// Something that can be normalised into a flat list of entities.
///
/// Missing entries of optional forms are skipped.
pub trait EntitySource<E: Entity> {
    fn entities(&self) -> Result<Vec<&E>>;
}

impl<E: Entity, S: EntitySource<E> + ?Sized> EntitySource<E> for &S {
    fn entities(&self) -> Result<Vec<&E>> {
        (**self).entities()
    }
}

impl<E: Entity, S: EntitySource<E> + ?Sized> EntitySource<E> for Box<S> {
    fn entities(&self) -> Result<Vec<&E>> {
        (**self).entities()
    }
}

fn not_an_entity<E: Entity>(got: &str) -> Error {
    Error::type_mismatch(
        format!("Input is not a {kind} or {kind} array", kind = E::KIND),
        E::accepted_types(),
        got,
    )
}

fn value_entities<E: Entity>(value: &Value) -> Result<Vec<&E>> {
    match value {
        Value::Null => Err(Error::type_mismatch(
            format!("Decoded {} cannot be null", E::KIND),
            E::accepted_types(),
            value.type_name(),
        )),
        Value::List(items) => items
            .iter()
            .filter(|item| !item.is_null())
            .map(|item| E::from_value(item).ok_or_else(|| not_an_entity::<E>(item.type_name())))
            .collect(),
        other => E::from_value(other)
            .map(|entity| vec![entity])
            .ok_or_else(|| not_an_entity::<E>(other.type_name())),
    }
}

macro_rules! entity_sources {
    ($entity:ty) => {
        impl EntitySource<$entity> for $entity {
            fn entities(&self) -> Result<Vec<&$entity>> {
                Ok(vec![self])
            }
        }

        impl EntitySource<$entity> for Option<$entity> {
            fn entities(&self) -> Result<Vec<&$entity>> {
                Ok(self.iter().collect())
            }
        }

        impl EntitySource<$entity> for [$entity] {
            fn entities(&self) -> Result<Vec<&$entity>> {
                Ok(self.iter().collect())
            }
        }

        impl EntitySource<$entity> for Vec<$entity> {
            fn entities(&self) -> Result<Vec<&$entity>> {
                Ok(self.iter().collect())
            }
        }

        impl<const N: usize> EntitySource<$entity> for [$entity; N] {
            fn entities(&self) -> Result<Vec<&$entity>> {
                Ok(self.iter().collect())
            }
        }

        impl EntitySource<$entity> for [Option<$entity>] {
            fn entities(&self) -> Result<Vec<&$entity>> {
                Ok(self.iter().flatten().collect())
            }
        }

        impl EntitySource<$entity> for Vec<Option<$entity>> {
            fn entities(&self) -> Result<Vec<&$entity>> {
                Ok(self.iter().flatten().collect())
            }
        }

        impl EntitySource<$entity> for Value {
            fn entities(&self) -> Result<Vec<&$entity>> {
                value_entities(self)
            }
        }
    };
}

entity_sources!(Node);
entity_sources!(Relationship);

/// Something that holds a path.
pub trait PathSource {
    fn path(&self) -> Result<&Path>;
}

impl PathSource for Path {
    fn path(&self) -> Result<&Path> {
        Ok(self)
    }
}

impl PathSource for Option<Path> {
    fn path(&self) -> Result<&Path> {
        self.as_ref().ok_or_else(|| {
            Error::type_mismatch("Decoded path cannot be null", ["Path", "Value::Path"], "None")
        })
    }
}

impl PathSource for Value {
    fn path(&self) -> Result<&Path> {
        match self {
            Value::Path(path) => Ok(path),
            Value::Null => Err(Error::type_mismatch(
                "Decoded path cannot be null",
                ["Path", "Value::Path"],
                "Null",
            )),
            other => Err(Error::type_mismatch(
                "Input is not a path",
                ["Path", "Value::Path"],
                other.type_name(),
            )),
        }
    }
}

impl<S: PathSource + ?Sized> PathSource for &S {
    fn path(&self) -> Result<&Path> {
        (**self).path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_list_rejects_foreign_items() {
        let value = Value::List(vec![Value::Node(Node::default()), Value::Integer(1)]);
        let err = EntitySource::<Node>::entities(&value).unwrap_err();
        let Error::Type { message, expected, got } = err else {
            panic!("Expected type error");
        };
        assert_eq!(message, "Input is not a node or node array");
        assert!(expected.contains(&"Vec<Option<Node>>".to_string()));
        assert_eq!(got, "Integer");
    }

    #[test]
    fn test_relationship_value_sources() {
        let value = Value::Relationship(Relationship::default());
        let rels = EntitySource::<Relationship>::entities(&value).unwrap();
        assert_eq!(rels.len(), 1);
        assert!(EntitySource::<Node>::entities(&value).is_err());
    }

    #[test]
    fn test_optional_sources() {
        let none: Option<Node> = None;
        assert!(EntitySource::<Node>::entities(&none).unwrap().is_empty());
        let nodes = [Some(Node::default()), None];
        assert_eq!(EntitySource::<Node>::entities(&nodes[..]).unwrap().len(), 1);
    }

    #[test]
    fn test_path_sources() {
        assert!(Value::Null.path().is_err());
        assert!(Value::Path(Path::default()).path().is_ok());
        assert!(None::<Path>.path().is_err());
    }
}
