//! Query and transaction parameters, and read/write classification.

use crate::encode::Encode;
use crate::error::Result;
use crate::result::QueryResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Keywords that make a query a write query.
pub const WRITE_KEYWORDS: [&str; 12] = [
    "create", "merge", "delete", "set", "remove", "foreach", "drop", "alter", "rename", "grant",
    "revoke", "deny",
];

/// Whether `query` mentions any write keyword, case-insensitively.
///
/// This is a plain substring test: `offset` or a property named `created`
/// count as writes too.
pub fn is_write_query(query: &str) -> bool {
    let lowered = query.to_lowercase();
    WRITE_KEYWORDS.iter().any(|keyword| lowered.contains(keyword))
}

/// Access mode a query or transaction runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    #[default]
    Read,
    Write,
}

impl AccessMode {
    pub fn for_query(query: &str) -> Self {
        if is_write_query(query) {
            AccessMode::Write
        } else {
            AccessMode::Read
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessMode::Read => f.write_str("read"),
            AccessMode::Write => f.write_str("write"),
        }
    }
}

/// Query parameters before encoding.
pub type Params = HashMap<String, Box<dyn Encode + Send + Sync>>;

/// A query with its parameters.
#[derive(Default)]
pub struct QueryParams {
    pub query: String,
    pub params: Params,
    pub bookmarks: Vec<String>,
}

impl QueryParams {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Add a parameter. It is encoded when the query runs.
    pub fn param<T: Encode + Send + Sync + 'static>(mut self, name: impl Into<String>, value: T) -> Self {
        self.params.insert(name.into(), Box::new(value));
        self
    }

    pub fn bookmark(mut self, bookmark: impl Into<String>) -> Self {
        self.bookmarks.push(bookmark.into());
        self
    }

    pub fn is_write(&self) -> bool {
        is_write_query(&self.query)
    }
}

impl fmt::Debug for QueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.params.keys().collect();
        names.sort();
        f.debug_struct("QueryParams")
            .field("query", &self.query)
            .field("params", &names)
            .field("bookmarks", &self.bookmarks)
            .finish()
    }
}

/// Produces the next step's parameters from the current step's result.
pub type TransitionFn = Box<dyn FnOnce(&mut QueryResult) -> Result<Params> + Send>;

/// One query of a transaction.
pub struct TransactionStep {
    pub query: QueryParams,
    /// When set, its output replaces the parameters of the following step.
    pub transition: Option<TransitionFn>,
}

impl TransactionStep {
    pub fn new(query: QueryParams) -> Self {
        Self {
            query,
            transition: None,
        }
    }

    pub fn then<F>(mut self, transition: F) -> Self
    where
        F: FnOnce(&mut QueryResult) -> Result<Params> + Send + 'static,
    {
        self.transition = Some(Box::new(transition));
        self
    }
}

impl fmt::Debug for TransactionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionStep")
            .field("query", &self.query)
            .field("transition", &self.transition.is_some())
            .finish()
    }
}

/// Steps run in order inside one transaction.
#[derive(Debug, Default)]
pub struct TransactionParams {
    pub steps: Vec<TransactionStep>,
    pub bookmarks: Vec<String>,
}

impl TransactionParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(mut self, step: TransactionStep) -> Self {
        self.steps.push(step);
        self
    }

    /// A transaction is a write transaction if any of its steps writes.
    pub fn is_write(&self) -> bool {
        self.steps.iter().any(|step| step.query.is_write())
    }

    pub fn mode(&self) -> AccessMode {
        if self.is_write() {
            AccessMode::Write
        } else {
            AccessMode::Read
        }
    }
}
