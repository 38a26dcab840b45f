use crate::decode::DecoderOptions;
use crate::encode::EncoderOptions;
use crate::error::{Error, Result};
use crate::record::OutputOptions;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Connection and mapping settings for a [`crate::Manager`], usually read
/// from TOML.
///
/// ```toml
/// uri = "bolt://localhost:7687"
/// username = "neo4j"
/// password = "secret"
///
/// [output]
/// timezone = "Europe/Paris"
/// ```
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerOptions {
    pub uri: String,

    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Rows fetched per round trip.
    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,

    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    #[serde(default)]
    pub output: OutputOptions,

    #[serde(default)]
    pub encoder: EncoderOptions,

    #[serde(default)]
    pub decoder: DecoderOptions,
}

fn default_database() -> String {
    "neo4j".to_string()
}

fn default_fetch_size() -> usize {
    200
}

fn default_max_connections() -> usize {
    16
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            uri: String::new(),
            database: default_database(),
            username: String::new(),
            password: String::new(),
            fetch_size: default_fetch_size(),
            max_connections: default_max_connections(),
            output: OutputOptions::default(),
            encoder: EncoderOptions::default(),
            decoder: DecoderOptions::default(),
        }
    }
}

impl fmt::Debug for ManagerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagerOptions")
            .field("uri", &self.uri)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"***")
            .field("fetch_size", &self.fetch_size)
            .field("max_connections", &self.max_connections)
            .field("output", &self.output)
            .field("encoder", &self.encoder)
            .field("decoder", &self.decoder)
            .finish()
    }
}

impl ManagerOptions {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Default::default()
        }
    }

    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Parse options from a TOML string.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load options from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Reject options a manager cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.uri.trim().is_empty() {
            return Err(self.init_error("database URI given in options is empty"));
        }
        if self.database.trim().is_empty() {
            return Err(self.init_error("database name given in options is empty"));
        }
        Ok(())
    }

    pub(crate) fn init_error(&self, reason: &str) -> Error {
        Error::Init {
            reason: reason.to_string(),
            uri: self.uri.clone(),
            database: self.database.clone(),
        }
    }
}
