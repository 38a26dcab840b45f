//! Connection manager running queries and transactions.
//!
//! The [`Manager`] owns an [`Executor`], encodes parameters with its
//! [`Encoder`] and wraps rows in typed [`QueryResult`]s. The default executor
//! talks to Neo4j through neo4rs; tests plug in their own.

use crate::bolt;
use crate::config::ManagerOptions;
use crate::decode::Decoder;
use crate::encode::Encoder;
use crate::error::{Error, Result};
use crate::param::flatten_params;
use crate::query::{AccessMode, Params, QueryParams, TransactionParams, TransactionStep};
use crate::result::{BufferedStream, QueryResult};
use crate::value::Value;
use async_trait::async_trait;
use neo4rs::{ConfigBuilder, Graph, Txn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// A query ready to be sent: text, flattened parameters and access mode.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub text: String,
    pub params: HashMap<String, Value>,
    pub mode: AccessMode,
    pub bookmarks: Vec<String>,
}

impl Statement {
    pub fn new(text: impl Into<String>, params: HashMap<String, Value>) -> Self {
        let text = text.into();
        Self {
            mode: AccessMode::for_query(&text),
            text,
            params,
            bookmarks: Vec::new(),
        }
    }
}

/// Runs statements against a database.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn run(&self, statement: Statement) -> Result<BufferedStream>;

    async fn begin(&self, mode: AccessMode) -> Result<Box<dyn Transaction>>;

    async fn verify_connectivity(&self) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

/// An open transaction.
#[async_trait]
pub trait Transaction: Send {
    async fn run(&mut self, statement: Statement) -> Result<BufferedStream>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// [`Executor`] backed by a neo4rs connection pool.
pub struct Neo4jExecutor {
    graph: Graph,
}

impl Neo4jExecutor {
    pub fn connect(options: &ManagerOptions) -> Result<Self> {
        let config = ConfigBuilder::default()
            .uri(&options.uri)
            .user(options.username.clone())
            .password(options.password.clone())
            .db(options.database.clone())
            .fetch_size(options.fetch_size)
            .max_connections(options.max_connections)
            .build()
            .map_err(|e| options.init_error(&format!("invalid connection configuration: {e}")))?;
        let graph = Graph::connect(config).map_err(|e| {
            warn!("Neo4j connection failed: {e}");
            options.init_error("could not connect to database")
        })?;
        Ok(Self { graph })
    }

    pub fn from_graph(graph: Graph) -> Self {
        Self { graph }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }
}

fn log_statement(statement: &Statement) {
    debug!(
        query = %statement.text,
        mode = %statement.mode,
        params = statement.params.len(),
        "Running statement"
    );
    if !statement.bookmarks.is_empty() {
        debug!(bookmarks = ?statement.bookmarks, "Bookmarks are not forwarded by the neo4rs executor");
    }
}

#[async_trait]
impl Executor for Neo4jExecutor {
    async fn run(&self, statement: Statement) -> Result<BufferedStream> {
        log_statement(&statement);
        let mut stream = self
            .graph
            .execute(bolt::build_query(&statement.text, statement.params))
            .await?;
        let mut keys: Option<Vec<String>> = None;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await? {
            keys.get_or_insert_with(|| row.keys().iter().map(|k| k.to_string()).collect());
            rows.push(bolt::row_to_map(&row)?);
        }
        Ok(BufferedStream::new(keys.unwrap_or_default(), rows).with_query(statement.text, statement.mode))
    }

    async fn begin(&self, mode: AccessMode) -> Result<Box<dyn Transaction>> {
        // neo4rs picks the routing itself; the mode is informational.
        debug!(%mode, "Starting transaction");
        let txn = self.graph.start_txn().await?;
        Ok(Box::new(Neo4jTransaction { txn }))
    }

    async fn verify_connectivity(&self) -> Result<()> {
        self.graph.run(neo4rs::query("RETURN 1")).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        // The pool closes its connections when the graph is dropped.
        Ok(())
    }
}

struct Neo4jTransaction {
    txn: Txn,
}

#[async_trait]
impl Transaction for Neo4jTransaction {
    async fn run(&mut self, statement: Statement) -> Result<BufferedStream> {
        log_statement(&statement);
        let mut stream = self
            .txn
            .execute(bolt::build_query(&statement.text, statement.params))
            .await?;
        let mut keys: Option<Vec<String>> = None;
        let mut rows = Vec::new();
        while let Some(row) = stream.next(self.txn.handle()).await? {
            keys.get_or_insert_with(|| row.keys().iter().map(|k| k.to_string()).collect());
            rows.push(bolt::row_to_map(&row)?);
        }
        Ok(BufferedStream::new(keys.unwrap_or_default(), rows).with_query(statement.text, statement.mode))
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.txn.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.txn.rollback().await?;
        Ok(())
    }
}

/// Runs queries and transactions with typed parameters and results.
pub struct Manager<E: Executor = Neo4jExecutor> {
    executor: E,
    options: ManagerOptions,
    encoder: Encoder,
    decoder: Decoder,
    connected: AtomicBool,
}

impl Manager<Neo4jExecutor> {
    /// Connect to Neo4j and check the connection with `RETURN 1`.
    pub async fn connect(options: ManagerOptions) -> Result<Self> {
        options.validate()?;
        info!(uri = %options.uri, database = %options.database, "Connecting to Neo4j");
        let executor = Neo4jExecutor::connect(&options)?;
        let manager = Self::with_executor(options, executor)?;
        if let Err(err) = manager.executor.verify_connectivity().await {
            warn!("Neo4j connectivity check failed: {err}");
            return Err(manager.options.init_error("could not connect to database"));
        }
        info!("Neo4j connection established");
        Ok(manager)
    }
}

impl<E: Executor> Manager<E> {
    /// Build a manager around an existing executor.
    pub fn with_executor(options: ManagerOptions, executor: E) -> Result<Self> {
        options.validate()?;
        // Fail on a bad output time zone now rather than on the first query.
        options.output.rules()?;
        let encoder = Encoder::with_options(options.encoder.clone());
        let decoder = Decoder::with_options(options.decoder.clone())?;
        Ok(Self {
            executor,
            options,
            encoder,
            decoder,
            connected: AtomicBool::new(true),
        })
    }

    pub fn options(&self) -> &ManagerOptions {
        &self.options
    }

    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    /// Replace the encoder, e.g. one built with custom hooks.
    pub fn set_encoder(&mut self, encoder: Encoder) {
        self.encoder = encoder;
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub async fn close(&self) -> Result<()> {
        if self.connected.swap(false, Ordering::SeqCst) {
            info!(uri = %self.options.uri, "Closing connection manager");
            self.executor.close().await?;
        }
        Ok(())
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(Error::ServiceUnavailable(
                "connection manager is closed".to_string(),
            ))
        }
    }

    /// Encode and flatten query parameters.
    pub fn encode_params(&self, params: &Params) -> Result<HashMap<String, Value>> {
        let mut encoded = HashMap::with_capacity(params.len());
        for (name, value) in params {
            encoded.insert(name.clone(), self.encoder.try_encode(value.as_ref())?);
        }
        Ok(flatten_params(encoded))
    }

    fn statement(&self, query: &QueryParams, params: &Params) -> Result<Statement> {
        let mut statement = Statement::new(query.query.clone(), self.encode_params(params)?);
        statement.bookmarks = query.bookmarks.clone();
        Ok(statement)
    }

    /// Run a single query. Write queries run in write mode.
    pub async fn query(&self, params: QueryParams) -> Result<QueryResult> {
        self.ensure_connected()?;
        let statement = self.statement(&params, &params.params)?;
        let stream = self.executor.run(statement).await?;
        QueryResult::new(stream, &self.options.output)
    }

    /// Run every step inside one transaction.
    ///
    /// A step's transition receives that step's result and returns the
    /// parameters of the next step, replacing the ones it was built with. Any
    /// failure rolls the transaction back. On success the last step's result
    /// is returned, minus rows its transition already consumed.
    pub async fn transaction(&self, params: TransactionParams) -> Result<QueryResult> {
        self.ensure_connected()?;
        if params.steps.is_empty() {
            return Err(Error::Transaction("transaction has no steps".to_string()));
        }
        let mode = params.mode();
        debug!(steps = params.steps.len(), %mode, "Running transaction");

        let mut txn = self.executor.begin(mode).await?;
        match self.run_steps(txn.as_mut(), params.steps, &params.bookmarks).await {
            Ok(result) => {
                txn.commit().await?;
                debug!("Transaction committed");
                Ok(result)
            }
            Err(err) => {
                warn!("Rolling back transaction: {err}");
                if let Err(rollback_err) = txn.rollback().await {
                    warn!("Rollback failed: {rollback_err}");
                }
                Err(err)
            }
        }
    }

    async fn run_steps(
        &self,
        txn: &mut dyn Transaction,
        steps: Vec<TransactionStep>,
        bookmarks: &[String],
    ) -> Result<QueryResult> {
        let mut carried: Option<Params> = None;
        let mut last = None;
        for (index, step) in steps.into_iter().enumerate() {
            let TransactionStep { query, transition } = step;
            let carried_params = carried.take();
            let params = carried_params.as_ref().unwrap_or(&query.params);
            let mut statement = self.statement(&query, params)?;
            statement.bookmarks.extend(bookmarks.iter().cloned());
            debug!(step = index, query = %statement.text, "Running transaction step");
            let stream = txn.run(statement).await?;
            let mut result = QueryResult::new(stream, &self.options.output)?;
            if let Some(transition) = transition {
                carried = Some(transition(&mut result)?);
            }
            last = Some(result);
        }
        last.ok_or_else(|| Error::Transaction("transaction has no steps".to_string()))
    }
}
