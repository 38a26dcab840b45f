//! graphbind
//!
//! Typed parameters and results for Neo4j, on top of the `neo4rs` driver.
//!
//! # Features
//!
//! - Encoding: structs and std values become query parameters through an
//!   ordered hook chain, driven by `#[neo4j("name,omitempty")]` field tags
//! - Decoding: nodes, relationships and paths fill typed structs using the
//!   same tags
//! - Result typing: every row is split into typed buckets ([`RecordMap`]),
//!   list values get a cursor ([`RecordArray`])
//! - Manager: queries and multi-step transactions with automatic
//!   read/write classification
//!
//! # Example
//!
//! ```ignore
//! use graphbind::{single, Decode, Encode, Manager, ManagerOptions, QueryParams};
//!
//! #[derive(Encode, Decode, Default)]
//! struct Person {
//!     #[neo4j("name")]
//!     name: String,
//!     #[neo4j("age,omitempty")]
//!     age: i64,
//! }
//!
//! let manager = Manager::connect(ManagerOptions::from_file("graphbind.toml")?).await?;
//! let ada = Person { name: "Ada".into(), age: 36 };
//! let record = single(
//!     manager
//!         .query(QueryParams::new("CREATE (p:Person $props) RETURN p").param("props", ada))
//!         .await,
//! )?;
//! let mut person = Person::default();
//! record.decode_node(manager.decoder(), "p", &mut person)?;
//! ```

extern crate self as graphbind;

pub mod bolt;
pub mod config;
pub mod cursor;
pub mod decode;
pub mod encode;
pub mod error;
pub mod manager;
pub mod param;
pub mod query;
pub mod record;
pub mod reflect;
pub mod result;
pub mod tag;
pub mod temporal;
pub mod value;

pub use config::ManagerOptions;
pub use cursor::RecordArray;
pub use decode::{
    Decode, DecodeTarget, Decoder, DecoderOptions, FromValue, Nested, UntaggedFields,
};
pub use encode::{Encode, EncodeContext, Encoder, EncoderBuilder, EncoderOptions, OnUnencodable};
pub use error::{Error, ErrorKind, Result};
pub use manager::{Executor, Manager, Neo4jExecutor, Statement, Transaction};
pub use param::Parameter;
pub use query::{
    is_write_query, AccessMode, Params, QueryParams, TransactionParams, TransactionStep,
};
pub use record::{OutputOptions, RecordMap};
pub use result::{collect, single, BufferedStream, QueryResult, RawResultStream, Summary};
pub use tag::DEFAULT_TAG_NAME;
pub use value::{GraphDuration, Node, OffsetTime, Path, Point, Relationship, Value};

pub use graphbind_derive::{Decode, Encode};
