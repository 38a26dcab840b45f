//! Error types for encoding, decoding, result handling and driver failures.
//!
//! The encoder is the only component that degrades instead of failing (see
//! [`crate::encode::OnUnencodable`]). Everything else returns one of the
//! variants below, and errors coming from the driver are classified into the
//! driver-facing kinds by [`Error::from_driver`].

use std::fmt;
use thiserror::Error;

/// Errors returned by graphbind operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The manager could not be initialised.
    #[error("{reason} (uri: {uri}, database: {database})")]
    Init {
        reason: String,
        uri: String,
        database: String,
    },

    /// A value's shape did not match what the operation required.
    #[error("{message} (expected types: {} / got: {got})", .expected.join(", "))]
    Type {
        message: String,
        expected: Vec<String>,
        got: String,
    },

    /// Structure mapping failed, or source/target cardinality mismatched.
    #[error("{0}")]
    Decoding(String),

    /// Query execution failed or a result cardinality check was violated.
    #[error("{0}")]
    Query(String),

    /// A transaction could not be run, committed or rolled back.
    #[error("{0}")]
    Transaction(String),

    /// Configuration could not be read or parsed.
    #[error("{0}")]
    Config(String),

    /// Invalid IANA timezone string.
    #[error("Invalid timezone: {0}. Use IANA timezone names like 'America/New_York', 'UTC', 'Europe/London'")]
    InvalidTimezone(String),

    /// Ambiguous or invalid local datetime due to a DST transition.
    #[error("Ambiguous or invalid datetime in timezone {timezone}: {datetime}")]
    AmbiguousDateTime { timezone: String, datetime: String },

    #[error("{0}")]
    Security(String),

    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    Client(String),

    #[error("{0}")]
    Transient(String),

    #[error("{0}")]
    Session(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    /// Anything the driver reported that could not be classified.
    #[error("{0}")]
    Unknown(String),
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Init,
    Type,
    Decoding,
    Query,
    Transaction,
    Config,
    Security,
    Auth,
    Client,
    Transient,
    Session,
    ServiceUnavailable,
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Init => "Init",
            ErrorKind::Type => "Type",
            ErrorKind::Decoding => "Decoding",
            ErrorKind::Query => "Query",
            ErrorKind::Transaction => "Transaction",
            ErrorKind::Config => "Config",
            ErrorKind::Security => "Security",
            ErrorKind::Auth => "Auth",
            ErrorKind::Client => "Client",
            ErrorKind::Transient => "Transient",
            ErrorKind::Session => "Session",
            ErrorKind::ServiceUnavailable => "Unavailable Service",
            ErrorKind::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Neo4j status code prefixes, checked in order.
const STATUS_PREFIXES: &[(&str, ErrorKind)] = &[
    ("Neo.ClientError.Security.Unauthorized", ErrorKind::Auth),
    ("Neo.ClientError.Security.AuthenticationRateLimit", ErrorKind::Auth),
    ("Neo.ClientError.Security.", ErrorKind::Security),
    ("Neo.ClientError.", ErrorKind::Client),
    ("Neo.TransientError.", ErrorKind::Transient),
];

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Init { .. } => ErrorKind::Init,
            Error::Type { .. } => ErrorKind::Type,
            Error::Decoding(_) | Error::AmbiguousDateTime { .. } => ErrorKind::Decoding,
            Error::Query(_) => ErrorKind::Query,
            Error::Transaction(_) => ErrorKind::Transaction,
            Error::Config(_) | Error::InvalidTimezone(_) => ErrorKind::Config,
            Error::Security(_) => ErrorKind::Security,
            Error::Auth(_) => ErrorKind::Auth,
            Error::Client(_) => ErrorKind::Client,
            Error::Transient(_) => ErrorKind::Transient,
            Error::Session(_) => ErrorKind::Session,
            Error::ServiceUnavailable(_) => ErrorKind::ServiceUnavailable,
            Error::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// Build a [`Error::Type`] from a message, the accepted type names and the
    /// name of the type actually found.
    pub fn type_mismatch<I, S>(message: impl Into<String>, expected: I, got: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Error::Type {
            message: message.into(),
            expected: expected.into_iter().map(Into::into).collect(),
            got: got.into(),
        }
    }

    /// Render the error as `[Graphbind <Kind> Error]: <message>`.
    pub fn fmt_error(&self) -> String {
        format!("[Graphbind {} Error]: {}", self.kind(), self)
    }

    pub fn is_type(&self) -> bool {
        self.kind() == ErrorKind::Type
    }

    pub fn is_decoding(&self) -> bool {
        self.kind() == ErrorKind::Decoding
    }

    pub fn is_query(&self) -> bool {
        self.kind() == ErrorKind::Query
    }

    /// Whether the error was reported by the driver rather than by graphbind.
    pub fn is_driver(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Security
                | ErrorKind::Auth
                | ErrorKind::Client
                | ErrorKind::Transient
                | ErrorKind::Session
                | ErrorKind::ServiceUnavailable
                | ErrorKind::Unknown
        )
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Transient | ErrorKind::Session | ErrorKind::ServiceUnavailable
        )
    }

    /// Classify an error reported by the driver.
    ///
    /// Errors that already are graphbind errors are returned unchanged. Neo4j
    /// status codes found in the message pick the driver-facing kind, an I/O
    /// error anywhere in the source chain means the service is unavailable,
    /// and anything else is kept as [`Error::Unknown`] with its message.
    pub fn from_driver(err: &(dyn std::error::Error + 'static)) -> Self {
        if let Some(own) = err.downcast_ref::<Error>() {
            return own.clone();
        }

        let message = err.to_string();
        for (prefix, kind) in STATUS_PREFIXES {
            if message.contains(prefix) {
                return Self::with_kind(*kind, message);
            }
        }

        let lowered = message.to_lowercase();
        if lowered.contains("session expired") || lowered.contains("sessionexpired") {
            return Error::Session(message);
        }
        if lowered.contains("authentication") || lowered.contains("unauthorized") {
            return Error::Auth(message);
        }

        let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
        while let Some(current) = source {
            if current.is::<std::io::Error>() {
                return Error::ServiceUnavailable(message);
            }
            source = current.source();
        }
        if lowered.contains("connection") || lowered.contains("unavailable") {
            return Error::ServiceUnavailable(message);
        }

        Error::Unknown(message)
    }

    fn with_kind(kind: ErrorKind, message: String) -> Self {
        match kind {
            ErrorKind::Auth => Error::Auth(message),
            ErrorKind::Security => Error::Security(message),
            ErrorKind::Client => Error::Client(message),
            ErrorKind::Transient => Error::Transient(message),
            ErrorKind::Session => Error::Session(message),
            ErrorKind::ServiceUnavailable => Error::ServiceUnavailable(message),
            _ => Error::Unknown(message),
        }
    }
}

impl From<neo4rs::Error> for Error {
    fn from(err: neo4rs::Error) -> Self {
        Error::from_driver(&err)
    }
}

/// Result type for graphbind operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct DriverError(String, Option<std::io::Error>);

    impl fmt::Display for DriverError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl std::error::Error for DriverError {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            self.1.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
        }
    }

    fn driver(message: &str) -> DriverError {
        DriverError(message.to_string(), None)
    }

    #[test]
    fn test_type_error_display() {
        let err = Error::type_mismatch("could not convert item", ["String", "i64"], "Node");
        assert_eq!(
            err.to_string(),
            "could not convert item (expected types: String, i64 / got: Node)"
        );
        assert_eq!(err.kind(), ErrorKind::Type);
    }

    #[test]
    fn test_fmt_error() {
        let err = Error::Query("result contains no record".to_string());
        assert_eq!(err.fmt_error(), "[Graphbind Query Error]: result contains no record");

        let err = Error::ServiceUnavailable("down".to_string());
        assert_eq!(err.fmt_error(), "[Graphbind Unavailable Service Error]: down");
    }

    #[test]
    fn test_classify_status_codes() {
        let auth = driver("Neo.ClientError.Security.Unauthorized: bad credentials");
        assert_eq!(Error::from_driver(&auth).kind(), ErrorKind::Auth);

        let security = driver("Neo.ClientError.Security.Forbidden: no write access");
        assert_eq!(Error::from_driver(&security).kind(), ErrorKind::Security);

        let client = driver("Neo.ClientError.Statement.SyntaxError: Invalid input");
        assert_eq!(Error::from_driver(&client).kind(), ErrorKind::Client);

        let transient = driver("Neo.TransientError.Transaction.DeadlockDetected");
        let err = Error::from_driver(&transient);
        assert_eq!(err.kind(), ErrorKind::Transient);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_classify_session_and_io() {
        let session = driver("Session expired while waiting for result");
        assert_eq!(Error::from_driver(&session).kind(), ErrorKind::Session);

        let io = DriverError(
            "broken pipe".to_string(),
            Some(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe")),
        );
        assert_eq!(Error::from_driver(&io).kind(), ErrorKind::ServiceUnavailable);
    }

    #[test]
    fn test_classify_unknown_keeps_message() {
        let other = driver("something odd happened");
        assert_eq!(
            Error::from_driver(&other),
            Error::Unknown("something odd happened".to_string())
        );
    }

    #[test]
    fn test_classify_passes_own_errors_through() {
        let own = Error::Decoding("could not decode one node to fit in output".to_string());
        assert_eq!(Error::from_driver(&own), own);
    }
}
