//! Typed representation of documents stored in (and queried from) the
//! document database.
//!
//! Every value a user can see or type maps onto exactly one [`Value`]
//! variant; the compiler produces them and the formatter consumes them with
//! exhaustive matches.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex_lite::Regex as Pattern;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

fn compile_regex(pattern: &str) -> Pattern {
    Pattern::new(pattern).unwrap_or_else(|err| panic!("invalid regex literal {pattern}: {err}"))
}

static DECIMAL_PATTERN: Lazy<Pattern> = Lazy::new(|| {
    compile_regex(r"^[+-]?((\d+(\.\d*)?)|(\.\d+))([eE][+-]?\d+)?$|^[+-]?(Infinity|Inf|NaN)$")
});

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    Decimal128(Decimal128),
    String(String),
    ObjectId(ObjectId),
    /// Milliseconds since the Unix epoch, UTC.
    DateTime(i64),
    Binary(Binary),
    Regex(Regex),
    MinKey,
    MaxKey,
    Array(Vec<Value>),
    Document(Document),
}

impl Value {
    /// Short human-readable name of the variant, used in messages and column
    /// headers.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int32(_) => "Int32",
            Value::Int64(_) => "Int64",
            Value::Double(_) => "Double",
            Value::Decimal128(_) => "Decimal128",
            Value::String(_) => "String",
            Value::ObjectId(_) => "ObjectId",
            Value::DateTime(_) => "Date",
            Value::Binary(_) => "Binary",
            Value::Regex(_) => "Regex",
            Value::MinKey => "MinKey",
            Value::MaxKey => "MaxKey",
            Value::Array(_) => "Array",
            Value::Document(_) => "Object",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(doc) => Some(doc),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int32(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int64(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<ObjectId> for Value {
    fn from(value: ObjectId) -> Self {
        Value::ObjectId(value)
    }
}

impl From<Document> for Value {
    fn from(value: Document) -> Self {
        Value::Document(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

/// Ordered key/value map. Keys keep insertion order for display; equality
/// ignores order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    entries: IndexMap<String, Value>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `value` under `key`, keeping the original position when the
    /// key already exists.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Removes `key` while keeping the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.shift_remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Document {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObjectIdError {
    #[error("ObjectId must be 24 hex characters, got {len}: {value:?}")]
    InvalidLength { value: String, len: usize },
    #[error("ObjectId contains a non-hex character: {value:?}")]
    InvalidCharacter { value: String },
}

/// 12-byte identifier native to the document database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    pub const fn bytes(&self) -> [u8; 12] {
        self.0
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|byte| format!("{byte:02x}")).collect()
    }
}

impl FromStr for ObjectId {
    type Err = ObjectIdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.len() != 24 {
            return Err(ObjectIdError::InvalidLength {
                value: value.to_string(),
                len: value.chars().count(),
            });
        }
        if !value.bytes().all(|byte| byte.is_ascii_hexdigit()) {
            return Err(ObjectIdError::InvalidCharacter {
                value: value.to_string(),
            });
        }
        let mut bytes = [0u8; 12];
        for (slot, pair) in bytes.iter_mut().zip(value.as_bytes().chunks(2)) {
            *slot = (hex_digit(pair[0]) << 4) | hex_digit(pair[1]);
        }
        Ok(Self(bytes))
    }
}

fn hex_digit(byte: u8) -> u8 {
    match byte {
        b'0'..=b'9' => byte - b'0',
        b'a'..=b'f' => byte - b'a' + 10,
        b'A'..=b'F' => byte - b'A' + 10,
        _ => 0,
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// 128-bit decimal held in its validated textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decimal128(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid decimal literal {0:?}")]
pub struct DecimalError(pub String);

impl Decimal128 {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Decimal128 {
    type Err = DecimalError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if DECIMAL_PATTERN.is_match(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(DecimalError(value.to_string()))
        }
    }
}

impl fmt::Display for Decimal128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Binary {
    pub subtype: u8,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Regex {
    pub pattern: String,
    /// Option letters as typed (`i`, `m`, `s`, `x`, ...); empty when absent.
    pub options: String,
}

impl Regex {
    pub fn new(pattern: impl Into<String>, options: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            options: options.into(),
        }
    }
}
