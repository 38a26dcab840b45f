//! Encoding of host values into [`Parameter`] trees.
//!
//! An [`Encoder`] runs an ordered chain of hooks over a value. The first hook
//! that returns `Some` wins; a hook that returns `None` declines and the next
//! one is tried. The chain is assembled once by [`EncoderBuilder`]:
//!
//! 1. nil detection
//! 2. user hooks, in registration order
//! 3. the default chain (see [`hooks::default_hooks`])
//!
//! Values that no hook accepts are encoded as [`Parameter::Null`]. Whether that
//! also fails [`Encoder::try_encode`] is controlled by [`OnUnencodable`].
//!
//! # Example
//!
//! ```ignore
//! use graphbind::{Encode, Encoder};
//!
//! #[derive(Encode)]
//! struct User {
//!     #[neo4j("name")]
//!     name: String,
//!     #[neo4j("age,omitempty")]
//!     age: i64,
//!     internal_state: u8, // untagged, never encoded
//! }
//!
//! let params = Encoder::new().encode(&user);
//! ```

pub mod hooks;
mod impls;

pub use impls::MapKey;

use crate::error::{Error, Result};
use crate::param::Parameter;
use crate::reflect::AsAny;
use crate::tag::DEFAULT_TAG_NAME;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::sync::Arc;
use tracing::warn;

/// A value the encoder can inspect.
///
/// Leaf types only need an empty impl; the hooks recognise them by their
/// concrete type. Containers describe themselves through [`Encode::shape`].
pub trait Encode: AsAny {
    fn shape(&self) -> Shape<'_> {
        Shape::Leaf
    }

    /// Whether this is the zero value of its type, used by `omitempty`.
    fn is_zero(&self) -> bool {
        false
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Structural view of an encodable value.
pub enum Shape<'a> {
    /// Recognised by its concrete type only.
    Leaf,
    /// An empty optional or pointer layer.
    Nil,
    /// A non-empty optional or pointer layer.
    Indirect(&'a dyn Encode),
    /// A byte sequence, never treated as an array of integers.
    Bytes(&'a [u8]),
    /// A struct with named fields.
    Struct(Vec<Field<'a>>),
    /// A sequence of elements.
    Seq(Vec<&'a dyn Encode>),
    /// Key/value entries with keys already stringified.
    Map(Vec<(String, &'a dyn Encode)>),
}

/// A struct field as seen by the encoder.
pub struct Field<'a> {
    pub name: &'static str,
    /// `(tag key, tag value)` pairs, e.g. `("neo4j", "name,omitempty")`.
    pub tags: &'static [(&'static str, &'static str)],
    pub value: &'a dyn Encode,
}

/// What to do with a value no hook accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnUnencodable {
    /// Encode as `Null` and keep going.
    #[default]
    Null,
    /// Fail [`Encoder::try_encode`].
    Error,
}

/// Encoder configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderOptions {
    /// Tag key consulted on struct fields.
    pub tag_name: String,
    /// Suppress the diagnostic logged for unencodable values.
    pub silent: bool,
    pub on_unencodable: OnUnencodable,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            tag_name: DEFAULT_TAG_NAME.to_string(),
            silent: false,
            on_unencodable: OnUnencodable::Null,
        }
    }
}

/// One step of the hook chain. Returns `None` to decline the value.
pub trait EncodeHook: Send + Sync {
    fn encode(&self, value: &dyn Encode, ctx: &EncodeContext<'_>) -> Option<Parameter>;
}

impl<F> EncodeHook for F
where
    F: Fn(&dyn Encode, &EncodeContext<'_>) -> Option<Parameter> + Send + Sync,
{
    fn encode(&self, value: &dyn Encode, ctx: &EncodeContext<'_>) -> Option<Parameter> {
        self(value, ctx)
    }
}

/// An ordered list of hooks behaving as a single hook.
#[derive(Clone, Default)]
pub struct HookChain {
    hooks: Vec<Arc<dyn EncodeHook>>,
}

impl HookChain {
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl EncodeHook for HookChain {
    fn encode(&self, value: &dyn Encode, ctx: &EncodeContext<'_>) -> Option<Parameter> {
        self.hooks.iter().find_map(|hook| hook.encode(value, ctx))
    }
}

impl std::fmt::Debug for HookChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookChain")
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

/// Compose hooks so that the first one accepting a value wins.
pub fn compose_hooks<I>(hooks: I) -> HookChain
where
    I: IntoIterator<Item = Arc<dyn EncodeHook>>,
{
    HookChain {
        hooks: hooks.into_iter().collect(),
    }
}

/// State of a single encode call, handed to every hook.
pub struct EncodeContext<'e> {
    encoder: &'e Encoder,
    failures: RefCell<Vec<&'static str>>,
}

impl<'e> EncodeContext<'e> {
    fn new(encoder: &'e Encoder) -> Self {
        Self {
            encoder,
            failures: RefCell::new(Vec::new()),
        }
    }

    /// Encode a nested value with the full chain.
    pub fn encode(&self, value: &dyn Encode) -> Parameter {
        match self.encoder.chain.encode(value, self) {
            Some(param) => param,
            None => {
                let type_name = value.type_name();
                if !self.encoder.options.silent {
                    warn!("Could not encode object of type {type_name}, using null");
                }
                self.failures.borrow_mut().push(type_name);
                Parameter::Null
            }
        }
    }

    pub fn tag_name(&self) -> &str {
        &self.encoder.options.tag_name
    }

    pub fn options(&self) -> &EncoderOptions {
        &self.encoder.options
    }

    fn into_failures(self) -> Vec<&'static str> {
        self.failures.into_inner()
    }
}

/// Converts host values into [`Parameter`] trees.
///
/// Immutable once built; share it freely across threads.
#[derive(Debug, Clone)]
pub struct Encoder {
    options: EncoderOptions,
    chain: HookChain,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder {
    /// Encoder with default options and no user hooks.
    pub fn new() -> Self {
        EncoderBuilder::new().build()
    }

    pub fn builder() -> EncoderBuilder {
        EncoderBuilder::new()
    }

    pub fn with_options(options: EncoderOptions) -> Self {
        EncoderBuilder::new().options(options).build()
    }

    pub fn options(&self) -> &EncoderOptions {
        &self.options
    }

    /// Encode a value, degrading unencodable parts to `Null`.
    pub fn encode(&self, value: &dyn Encode) -> Parameter {
        EncodeContext::new(self).encode(value)
    }

    /// Encode a value, honouring [`OnUnencodable`].
    pub fn try_encode(&self, value: &dyn Encode) -> Result<Parameter> {
        let ctx = EncodeContext::new(self);
        let param = ctx.encode(value);
        let failures = ctx.into_failures();
        if failures.is_empty() || self.options.on_unencodable == OnUnencodable::Null {
            return Ok(param);
        }
        Err(Error::type_mismatch(
            format!("Could not encode object of type {}", value.type_name()),
            Vec::<String>::new(),
            failures.join(", "),
        ))
    }
}

/// Assembles the hook chain of an [`Encoder`].
#[derive(Default)]
pub struct EncoderBuilder {
    options: EncoderOptions,
    custom: Vec<Arc<dyn EncodeHook>>,
}

impl EncoderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn options(mut self, options: EncoderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn tag_name(mut self, tag_name: impl Into<String>) -> Self {
        self.options.tag_name = tag_name.into();
        self
    }

    pub fn silent(mut self, silent: bool) -> Self {
        self.options.silent = silent;
        self
    }

    pub fn on_unencodable(mut self, policy: OnUnencodable) -> Self {
        self.options.on_unencodable = policy;
        self
    }

    /// Register a hook that runs after nil detection and before the defaults.
    pub fn hook<H: EncodeHook + 'static>(mut self, hook: H) -> Self {
        self.custom.push(Arc::new(hook));
        self
    }

    /// Register a closure as a hook.
    pub fn hook_fn<F>(self, hook: F) -> Self
    where
        F: Fn(&dyn Encode, &EncodeContext<'_>) -> Option<Parameter> + Send + Sync + 'static,
    {
        self.hook(hook)
    }

    pub fn build(self) -> Encoder {
        let mut hooks: Vec<Arc<dyn EncodeHook>> = Vec::with_capacity(self.custom.len() + 16);
        hooks.push(Arc::new(hooks::encode_nil));
        hooks.extend(self.custom);
        hooks.extend(hooks::default_hooks());
        Encoder {
            options: self.options,
            chain: compose_hooks(hooks),
        }
    }
}
