//! Struct field tags.
//!
//! A tag value has the form `name[,omitempty]`. Derived impls record tags as
//! `(key, value)` pairs so that encoders and decoders configured with a
//! different tag key can look up their own entry.

/// Tag key consulted by default on both the encoding and decoding side.
pub const DEFAULT_TAG_NAME: &str = "neo4j";

/// Parsed form of a tag value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagOptions<'a> {
    pub name: &'a str,
    pub omit_empty: bool,
}

impl<'a> TagOptions<'a> {
    /// Parse a tag value. Returns `None` when the field must be skipped,
    /// that is when the name is empty or `-`.
    pub fn parse(tag: &'a str) -> Option<Self> {
        let mut parts = tag.split(',');
        let name = parts.next().unwrap_or_default().trim();
        if name.is_empty() || name == "-" {
            return None;
        }
        let omit_empty = parts.any(|opt| opt.trim() == "omitempty");
        Some(Self { name, omit_empty })
    }
}

/// Find the tag value registered under `key`.
pub fn lookup<'a>(tags: &'a [(&'a str, &'a str)], key: &str) -> Option<&'a str> {
    tags.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}
