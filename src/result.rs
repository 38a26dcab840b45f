//! Query results.
//!
//! A [`RawResultStream`] yields untyped rows; [`QueryResult`] classifies each
//! row into a [`RecordMap`] under the configured [`OutputOptions`].

use crate::error::{Error, Result};
use crate::query::AccessMode;
use crate::record::{OutputOptions, RecordMap, TypingRules};
use crate::value::Value;
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// What is known about a finished query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    pub query: String,
    pub mode: AccessMode,
    pub keys: Vec<String>,
    /// Rows handed out so far.
    pub records_consumed: usize,
}

/// An untyped, forward-only row stream.
///
/// `next` moves to the following row and returns false when the stream is
/// exhausted or failed; `err` then tells the two apart.
pub trait RawResultStream {
    fn keys(&self) -> &[String];

    fn next(&mut self) -> bool;

    /// The current row. `None` when there is no current row, or the row
    /// itself is null.
    fn record(&self) -> Option<&HashMap<String, Value>>;

    fn err(&self) -> Option<&Error>;

    fn summary(&self) -> Summary;
}

/// Rows fetched up front and replayed from memory.
#[derive(Debug, Clone, Default)]
pub struct BufferedStream {
    keys: Vec<String>,
    rows: VecDeque<HashMap<String, Value>>,
    current: Option<HashMap<String, Value>>,
    err: Option<Error>,
    summary: Summary,
}

impl BufferedStream {
    pub fn new(keys: Vec<String>, rows: Vec<HashMap<String, Value>>) -> Self {
        Self {
            summary: Summary {
                keys: keys.clone(),
                ..Default::default()
            },
            keys,
            rows: rows.into(),
            current: None,
            err: None,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>, mode: AccessMode) -> Self {
        self.summary.query = query.into();
        self.summary.mode = mode;
        self
    }

    /// Fail the stream once the buffered rows are used up.
    pub fn with_error(mut self, err: Error) -> Self {
        self.err = Some(err);
        self
    }

    /// Rows not yet handed out.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

impl RawResultStream for BufferedStream {
    fn keys(&self) -> &[String] {
        &self.keys
    }

    fn next(&mut self) -> bool {
        self.current = self.rows.pop_front();
        if self.current.is_some() {
            self.summary.records_consumed += 1;
            true
        } else {
            false
        }
    }

    fn record(&self) -> Option<&HashMap<String, Value>> {
        self.current.as_ref()
    }

    fn err(&self) -> Option<&Error> {
        if self.current.is_none() && self.rows.is_empty() {
            self.err.as_ref()
        } else {
            None
        }
    }

    fn summary(&self) -> Summary {
        self.summary.clone()
    }
}

/// A row stream yielding typed records.
#[derive(Debug)]
pub struct QueryResult<S = BufferedStream> {
    stream: S,
    options: OutputOptions,
    rules: TypingRules,
}

impl<S: RawResultStream> QueryResult<S> {
    pub fn new(stream: S, options: &OutputOptions) -> Result<Self> {
        Ok(Self {
            stream,
            options: options.clone(),
            rules: options.rules()?,
        })
    }

    pub fn keys(&self) -> &[String] {
        self.stream.keys()
    }

    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> bool {
        self.stream.next()
    }

    /// The current row, classified. `Ok(None)` for a null row or when no row
    /// is current.
    pub fn record(&self) -> Result<Option<RecordMap>> {
        self.stream
            .record()
            .map(|row| RecordMap::classify(row.clone(), &self.rules))
            .transpose()
    }

    pub fn err(&self) -> Option<&Error> {
        self.stream.err()
    }

    pub fn summary(&self) -> Summary {
        self.stream.summary()
    }

    pub fn options(&self) -> &OutputOptions {
        &self.options
    }

    pub fn raw(&self) -> &S {
        &self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    /// The only row of the result.
    pub fn single(&mut self) -> Result<RecordMap> {
        if !self.next() {
            return Err(self
                .err()
                .cloned()
                .unwrap_or_else(|| Error::Query("result contains no record".to_string())));
        }
        let record = self
            .record()?
            .ok_or_else(|| Error::Query("result contains a null record".to_string()))?;
        if self.next() {
            return Err(Error::Query(
                "result contains more than one record".to_string(),
            ));
        }
        match self.err() {
            Some(err) => Err(err.clone()),
            None => Ok(record),
        }
    }

    /// Every remaining row.
    pub fn collect(&mut self) -> Result<Vec<RecordMap>> {
        let mut records = Vec::new();
        while self.next() {
            match self.record()? {
                Some(record) => records.push(record),
                None => return Err(Error::Query("result contains a null record".to_string())),
            }
        }
        if let Some(err) = self.err() {
            return Err(err.clone());
        }
        debug!(records = records.len(), "Collected query result");
        Ok(records)
    }
}

/// Expect exactly one row. Accepts the outcome of a query run directly.
pub fn single<S: RawResultStream>(result: Result<QueryResult<S>>) -> Result<RecordMap> {
    result?.single()
}

/// Gather every row. Accepts the outcome of a query run directly.
pub fn collect<S: RawResultStream>(result: Result<QueryResult<S>>) -> Result<Vec<RecordMap>> {
    result?.collect()
}
