//! Body decoding and custom converters
//!
//! Bodies are decoded into a [`serde_json::Value`] tree by a [`BodyDecoder`]
//! and then deserialized into the target type. While that happens the
//! client's converters are installed for the current thread, so any type
//! reached through [`converted`] (and the top-level target itself) is first
//! offered to them.
//!
//! ```ignore
//! #[derive(Deserialize)]
//! struct Book {
//!     title: String,
//!     #[serde(deserialize_with = "typed_rest::converted")]
//!     author: Author,
//! }
//! ```

use std::any::{type_name, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Identity of a deserialization target
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// True if this key identifies `T`
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }

    /// Fully-qualified type name, for diagnostics only
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Custom conversion for specific target types
///
/// Converters rewrite the intermediate value before it is deserialized into
/// the type they accept. They are shared across concurrent sends and only
/// get `&self`; keep any state behind atomics or locks.
///
/// Only the top-level target type is offered to converters automatically.
/// A nested field reaches them only when it opts in with
/// `#[serde(deserialize_with = "typed_rest::converted")]` (or
/// [`converted_option`] for `Option` fields); without the annotation the
/// field is deserialized directly and no converter sees it, even one that
/// accepts its type.
///
/// ```ignore
/// #[derive(Deserialize)]
/// struct Book {
///     #[serde(deserialize_with = "typed_rest::converted")]
///     author: Author,
/// }
/// ```
pub trait Converter: Send + Sync {
    /// Whether this converter handles `target`
    fn can_convert(&self, target: TypeKey) -> bool;

    /// Rewrite `raw` into a value that deserializes as `target`
    fn convert(&self, target: TypeKey, raw: Value) -> anyhow::Result<Value>;
}

/// Turns response bytes into the intermediate value tree
pub trait BodyDecoder: Send + Sync {
    fn decode(&self, body: &[u8], content_type: Option<&str>) -> anyhow::Result<Value>;
}

/// JSON body decoder (the default)
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl BodyDecoder for JsonDecoder {
    fn decode(&self, body: &[u8], _content_type: Option<&str>) -> anyhow::Result<Value> {
        Ok(serde_json::from_slice(body)?)
    }
}

type ConverterSet = Arc<[Arc<dyn Converter>]>;

/// Decoder plus the ordered converter list used during materialization
///
/// The first converter whose `can_convert` accepts a type wins.
#[derive(Clone)]
pub struct DeserializerConfig {
    decoder: Arc<dyn BodyDecoder>,
    converters: ConverterSet,
}

impl Default for DeserializerConfig {
    fn default() -> Self {
        Self {
            decoder: Arc::new(JsonDecoder),
            converters: Arc::from(Vec::new()),
        }
    }
}

impl DeserializerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the body decoder
    pub fn decoder(mut self, decoder: impl BodyDecoder + 'static) -> Self {
        self.decoder = Arc::new(decoder);
        self
    }

    /// Register a converter after the ones already present
    pub fn converter(mut self, converter: Arc<dyn Converter>) -> Self {
        let mut converters = self.converters.to_vec();
        converters.push(converter);
        self.converters = converters.into();
        self
    }

    pub fn converter_count(&self) -> usize {
        self.converters.len()
    }

    /// Decode `body` and deserialize it as `T`, routing through the converters
    pub fn deserialize<T>(&self, body: &[u8], content_type: Option<&str>) -> anyhow::Result<T>
    where
        T: DeserializeOwned + 'static,
    {
        let value = self.decode(body, content_type)?;
        self.deserialize_value(value)
    }

    /// Decode `body` into the intermediate value tree
    pub fn decode(&self, body: &[u8], content_type: Option<&str>) -> anyhow::Result<Value> {
        self.decoder.decode(body, content_type)
    }

    /// Deserialize an already-decoded value as `T`
    pub fn deserialize_value<T>(&self, value: Value) -> anyhow::Result<T>
    where
        T: DeserializeOwned + 'static,
    {
        let _scope = ConverterScope::enter(Arc::clone(&self.converters));
        Ok(convert_value::<T>(value)?)
    }
}

impl fmt::Debug for DeserializerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeserializerConfig")
            .field("converters", &self.converters.len())
            .finish_non_exhaustive()
    }
}

thread_local! {
    static ACTIVE_CONVERTERS: RefCell<Option<ConverterSet>> = const { RefCell::new(None) };
}

/// Installs a converter set for the current thread until dropped
struct ConverterScope {
    previous: Option<ConverterSet>,
}

impl ConverterScope {
    fn enter(converters: ConverterSet) -> Self {
        let previous = ACTIVE_CONVERTERS.with(|slot| slot.replace(Some(converters)));
        Self { previous }
    }
}

impl Drop for ConverterScope {
    fn drop(&mut self) {
        let previous = self.previous.take();
        ACTIVE_CONVERTERS.with(|slot| *slot.borrow_mut() = previous);
    }
}

fn active_converters() -> Option<ConverterSet> {
    ACTIVE_CONVERTERS.with(|slot| slot.borrow().clone())
}

fn convert_value<U>(value: Value) -> Result<U, serde_json::Error>
where
    U: DeserializeOwned + 'static,
{
    let target = TypeKey::of::<U>();
    let converter = active_converters()
        .and_then(|set| set.iter().find(|c| c.can_convert(target)).cloned());

    let value = match converter {
        Some(converter) => {
            tracing::trace!(target_type = target.name(), "applying custom converter");
            converter.convert(target, value).map_err(|e| {
                serde_json::Error::custom(format!(
                    "converter for {} failed: {:#}",
                    target.name(),
                    e
                ))
            })?
        }
        None => value,
    };

    serde_json::from_value(value)
}

/// `deserialize_with` hook that routes a field through the active converters
pub fn converted<'de, D, U>(deserializer: D) -> Result<U, D::Error>
where
    D: Deserializer<'de>,
    U: DeserializeOwned + 'static,
{
    let value = Value::deserialize(deserializer)?;
    convert_value::<U>(value).map_err(D::Error::custom)
}

/// Like [`converted`] for optional fields; `null` stays `None`
pub fn converted_option<'de, D, U>(deserializer: D) -> Result<Option<U>, D::Error>
where
    D: Deserializer<'de>,
    U: DeserializeOwned + 'static,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Null) | None => Ok(None),
        Some(value) => convert_value::<U>(value).map(Some).map_err(D::Error::custom),
    }
}
