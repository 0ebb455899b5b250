//! The data-store seam: what the navigator needs from a document database,
//! plus an in-memory implementation that evaluates [`ListQuery`] locally.

use docpeek_query::CompileError;
use docpeek_query::Document;
use docpeek_query::FormatError;
use docpeek_query::ObjectId;
use docpeek_query::Value;
use docpeek_query::extjson::encode_value;
use regex_lite::RegexBuilder;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const ID_FIELD: &str = "_id";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no document with _id {id}")]
    NotFound { id: DocumentId },
    #[error("a document with _id {id} already exists")]
    DuplicateId { id: DocumentId },
    #[error("document has no _id")]
    MissingId,
    #[error("invalid query: {message}")]
    InvalidQuery { message: String },
    #[error("failed to decode stored document at {location}: {source}")]
    Decode {
        location: String,
        #[source]
        source: CompileError,
    },
    #[error(transparent)]
    Encode(#[from] FormatError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Value of a document's `_id` field.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentId(pub Value);

impl DocumentId {
    pub fn of(doc: &Document) -> Option<Self> {
        doc.get(ID_FIELD).cloned().map(Self)
    }

    pub fn value(&self) -> &Value {
        &self.0
    }
}

impl From<ObjectId> for DocumentId {
    fn from(id: ObjectId) -> Self {
        Self(Value::ObjectId(id))
    }
}

/// Command-line form: 24 hex digits are an ObjectId, integers are numbers,
/// anything else is a string id.
impl FromStr for DocumentId {
    type Err = std::convert::Infallible;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        if let Ok(id) = text.parse::<ObjectId>() {
            return Ok(id.into());
        }
        if let Ok(number) = text.parse::<i64>() {
            return Ok(Self(
                i32::try_from(number).map_or(Value::Int64(number), Value::Int32),
            ));
        }
        Ok(Self(Value::String(text.to_string())))
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Value::ObjectId(id) => write!(f, "ObjectId(\"{id}\")"),
            Value::String(text) => write!(f, "{text:?}"),
            other => write!(f, "{}", encode_value(other)),
        }
    }
}

/// Compiled filter, sort and projection plus paging for one listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub filter: Document,
    pub sort: Document,
    pub projection: Document,
    pub skip: usize,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentPage {
    pub documents: Vec<Document>,
    /// Number of documents matching the filter before paging.
    pub total: usize,
}

pub trait DocumentStore {
    fn list_documents(&self, query: &ListQuery) -> Result<DocumentPage, StoreError>;

    fn get_document(&self, id: &DocumentId) -> Result<Document, StoreError>;

    /// Stores `doc` and returns its id. Documents without `_id` get a fresh
    /// ObjectId.
    fn insert_document(&mut self, doc: Document) -> Result<DocumentId, StoreError>;

    fn update_document(&mut self, id: &DocumentId, doc: Document) -> Result<(), StoreError>;

    fn delete_document(&mut self, id: &DocumentId) -> Result<(), StoreError>;
}

/// Documents held in memory, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    documents: Vec<Document>,
    next_id: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_documents(documents: Vec<Document>) -> Self {
        Self {
            documents,
            next_id: 0,
        }
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    fn position(&self, id: &DocumentId) -> Option<usize> {
        self.documents.iter().position(|doc| {
            doc.get(ID_FIELD)
                .is_some_and(|stored| ids_equal(stored, &id.0))
        })
    }

    /// Sequential ids keep the store deterministic; the counter lives in the
    /// low bytes, the high bytes are a fixed marker.
    fn fresh_id(&mut self) -> DocumentId {
        loop {
            self.next_id += 1;
            let mut bytes = [0u8; 12];
            bytes[..4].copy_from_slice(b"dpk\0");
            bytes[4..].copy_from_slice(&self.next_id.to_be_bytes());
            let id = DocumentId::from(ObjectId::from_bytes(bytes));
            if self.position(&id).is_none() {
                return id;
            }
        }
    }
}

impl DocumentStore for MemoryStore {
    fn list_documents(&self, query: &ListQuery) -> Result<DocumentPage, StoreError> {
        run_query(&self.documents, query)
    }

    fn get_document(&self, id: &DocumentId) -> Result<Document, StoreError> {
        self.position(id)
            .map(|index| self.documents[index].clone())
            .ok_or_else(|| StoreError::NotFound { id: id.clone() })
    }

    fn insert_document(&mut self, mut doc: Document) -> Result<DocumentId, StoreError> {
        let id = match DocumentId::of(&doc) {
            Some(id) => {
                if self.position(&id).is_some() {
                    return Err(StoreError::DuplicateId { id });
                }
                id
            }
            None => {
                let id = self.fresh_id();
                doc = std::iter::once((ID_FIELD.to_string(), id.0.clone()))
                    .chain(doc)
                    .collect();
                id
            }
        };
        self.documents.push(doc);
        Ok(id)
    }

    fn update_document(&mut self, id: &DocumentId, doc: Document) -> Result<(), StoreError> {
        let index = self
            .position(id)
            .ok_or_else(|| StoreError::NotFound { id: id.clone() })?;
        self.documents[index] = doc;
        Ok(())
    }

    fn delete_document(&mut self, id: &DocumentId) -> Result<(), StoreError> {
        let index = self
            .position(id)
            .ok_or_else(|| StoreError::NotFound { id: id.clone() })?;
        self.documents.remove(index);
        Ok(())
    }
}

/// Evaluates `query` over `documents`: top-level filter, sort, paging, then
/// projection.
pub fn run_query(documents: &[Document], query: &ListQuery) -> Result<DocumentPage, StoreError> {
    let filter = Filter::new(&query.filter)?;
    let mut matched: Vec<&Document> = documents.iter().filter(|doc| filter.matches(doc)).collect();
    let total = matched.len();

    if !query.sort.is_empty() {
        let keys = sort_keys(&query.sort)?;
        matched.sort_by(|left, right| {
            keys.iter()
                .map(|(key, descending)| {
                    let ordering = compare_values(
                        left.get(key).unwrap_or(&Value::Null),
                        right.get(key).unwrap_or(&Value::Null),
                    );
                    if *descending { ordering.reverse() } else { ordering }
                })
                .find(|ordering| ordering.is_ne())
                .unwrap_or(Ordering::Equal)
        });
    }

    let documents = matched
        .into_iter()
        .skip(query.skip)
        .take(query.limit.unwrap_or(usize::MAX))
        .map(|doc| project(doc, &query.projection))
        .collect();
    Ok(DocumentPage { documents, total })
}

enum Condition<'a> {
    Equals(&'a Value),
    Matches(regex_lite::Regex),
}

struct Filter<'a> {
    conditions: Vec<(&'a str, Condition<'a>)>,
}

impl<'a> Filter<'a> {
    fn new(filter: &'a Document) -> Result<Self, StoreError> {
        let mut conditions = Vec::with_capacity(filter.len());
        for (key, value) in filter.iter() {
            if key.starts_with('$') {
                return Err(StoreError::InvalidQuery {
                    message: format!("operator {key} is not supported by a local store"),
                });
            }
            let condition = match value {
                Value::Regex(regex) => Condition::Matches(build_regex(&regex.pattern, &regex.options)?),
                other => Condition::Equals(other),
            };
            conditions.push((key, condition));
        }
        Ok(Self { conditions })
    }

    fn matches(&self, doc: &Document) -> bool {
        self.conditions.iter().all(|(key, condition)| {
            let field = doc.get(key);
            match condition {
                Condition::Equals(expected) => match field {
                    Some(actual) => values_equal(actual, expected),
                    None => matches!(expected, Value::Null),
                },
                Condition::Matches(regex) => match field {
                    Some(Value::String(text)) => regex.is_match(text),
                    Some(Value::Array(items)) => items
                        .iter()
                        .any(|item| item.as_str().is_some_and(|text| regex.is_match(text))),
                    _ => false,
                },
            }
        })
    }
}

fn build_regex(pattern: &str, options: &str) -> Result<regex_lite::Regex, StoreError> {
    RegexBuilder::new(pattern)
        .case_insensitive(options.contains('i'))
        .multi_line(options.contains('m'))
        .dot_matches_new_line(options.contains('s'))
        .ignore_whitespace(options.contains('x'))
        .build()
        .map_err(|err| StoreError::InvalidQuery {
            message: format!("invalid regex /{pattern}/{options}: {err}"),
        })
}

/// Equality with numeric types compared by value, and arrays matching any
/// element.
fn values_equal(actual: &Value, expected: &Value) -> bool {
    if let (Some(left), Some(right)) = (as_number(actual), as_number(expected)) {
        return left == right;
    }
    if actual == expected {
        return true;
    }
    match actual {
        Value::Array(items) if !matches!(expected, Value::Array(_)) => {
            items.iter().any(|item| values_equal(item, expected))
        }
        _ => false,
    }
}

/// Numeric ids match across Int32, Int64 and Double the way the database's
/// unique `_id` index does. Integers compare exactly.
fn ids_equal(stored: &Value, wanted: &Value) -> bool {
    match (as_integer(stored), as_integer(wanted)) {
        (Some(left), Some(right)) => left == right,
        _ => match (as_number(stored), as_number(wanted)) {
            (Some(left), Some(right)) => left == right,
            _ => stored == wanted,
        },
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Int32(n) => Some(i64::from(*n)),
        Value::Int64(n) => Some(*n),
        _ => None,
    }
}

fn sort_keys(sort: &Document) -> Result<Vec<(String, bool)>, StoreError> {
    sort.iter()
        .map(|(key, direction)| match as_number(direction) {
            Some(n) if n > 0.0 => Ok((key.to_string(), false)),
            Some(n) if n < 0.0 => Ok((key.to_string(), true)),
            _ => Err(StoreError::InvalidQuery {
                message: format!("sort direction for {key} must be 1 or -1"),
            }),
        })
        .collect()
}

fn project(doc: &Document, projection: &Document) -> Document {
    if projection.is_empty() {
        return doc.clone();
    }
    let include_id = projection.get(ID_FIELD).is_none_or(is_truthy);
    let inclusive = projection
        .iter()
        .any(|(key, flag)| key != ID_FIELD && is_truthy(flag));

    doc.iter()
        .filter(|(key, _)| {
            if *key == ID_FIELD {
                return include_id;
            }
            match projection.get(key) {
                Some(flag) => is_truthy(flag) == inclusive,
                None => !inclusive,
            }
        })
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

fn is_truthy(flag: &Value) -> bool {
    match flag {
        Value::Bool(value) => *value,
        Value::Null => false,
        other => as_number(other).is_none_or(|n| n != 0.0),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Int32(n) => Some(f64::from(*n)),
        Value::Int64(n) => Some(*n as f64),
        Value::Double(n) => Some(*n),
        Value::Decimal128(n) => n.as_str().parse().ok(),
        _ => None,
    }
}

/// Cross-type order used by the document database when sorting.
fn type_rank(value: &Value) -> u8 {
    match value {
        Value::MinKey => 0,
        Value::Null => 1,
        Value::Int32(_) | Value::Int64(_) | Value::Double(_) | Value::Decimal128(_) => 2,
        Value::String(_) => 3,
        Value::Document(_) => 4,
        Value::Array(_) => 5,
        Value::Binary(_) => 6,
        Value::ObjectId(_) => 7,
        Value::Bool(_) => 8,
        Value::DateTime(_) => 9,
        Value::Regex(_) => 10,
        Value::MaxKey => 11,
    }
}

pub fn compare_values(left: &Value, right: &Value) -> Ordering {
    let by_rank = type_rank(left).cmp(&type_rank(right));
    if by_rank.is_ne() {
        return by_rank;
    }
    match (left, right) {
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::ObjectId(a), Value::ObjectId(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
        (Value::Binary(a), Value::Binary(b)) => (a.bytes.len(), a.subtype, &a.bytes).cmp(&(
            b.bytes.len(),
            b.subtype,
            &b.bytes,
        )),
        (Value::Regex(a), Value::Regex(b)) => (&a.pattern, &a.options).cmp(&(&b.pattern, &b.options)),
        (Value::Array(a), Value::Array(b)) => compare_sequences(a.iter(), b.iter()),
        (Value::Document(a), Value::Document(b)) => a
            .iter()
            .zip(b.iter())
            .map(|((ka, va), (kb, vb))| ka.cmp(kb).then_with(|| compare_values(va, vb)))
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| a.len().cmp(&b.len())),
        _ => match (as_number(left), as_number(right)) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            _ => Ordering::Equal,
        },
    }
}

fn compare_sequences<'a>(
    left: impl ExactSizeIterator<Item = &'a Value>,
    right: impl ExactSizeIterator<Item = &'a Value>,
) -> Ordering {
    let lengths = left.len().cmp(&right.len());
    left.zip(right)
        .map(|(a, b)| compare_values(a, b))
        .find(|ordering| ordering.is_ne())
        .unwrap_or(lengths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use docpeek_query::Regex;
    use docpeek_query::compile;
    use pretty_assertions::assert_eq;

    fn doc(text: &str) -> Document {
        compile(text).expect("valid document")
    }

    fn people() -> MemoryStore {
        MemoryStore::from_documents(vec![
            doc(r#"{_id: 1, name: "Ann", age: 31, tags: ["a", "b"]}"#),
            doc(r#"{_id: 2, name: "bob", age: 25}"#),
            doc(r#"{_id: 3, name: "Cy", age: NumberLong(40), tags: ["c"]}"#),
        ])
    }

    fn names(page: &DocumentPage) -> Vec<&str> {
        page.documents
            .iter()
            .filter_map(|doc| doc.get("name").and_then(Value::as_str))
            .collect()
    }

    #[test]
    fn empty_query_lists_everything_in_order() {
        let page = people().list_documents(&ListQuery::default()).expect("list");
        assert_eq!(page.total, 3);
        assert_eq!(names(&page), vec!["Ann", "bob", "Cy"]);
    }

    #[test]
    fn filter_by_equality_regex_and_array_membership() {
        let store = people();
        let query = |filter: &str| ListQuery {
            filter: doc(filter),
            ..ListQuery::default()
        };
        assert_eq!(names(&store.list_documents(&query("{age: 40}")).expect("list")), vec!["Cy"]);
        assert_eq!(
            names(&store.list_documents(&query("{name: /^b/i}")).expect("list")),
            vec!["bob"]
        );
        assert_eq!(names(&store.list_documents(&query(r#"{tags: "b"}"#)).expect("list")), vec!["Ann"]);
        assert_eq!(
            store.list_documents(&query("{missing: null}")).expect("list").total,
            3
        );
    }

    #[test]
    fn operators_are_rejected() {
        let query = ListQuery {
            filter: doc("{$or: [{a: 1}]}"),
            ..ListQuery::default()
        };
        assert_matches!(
            people().list_documents(&query),
            Err(StoreError::InvalidQuery { .. })
        );
    }

    #[test]
    fn sort_skip_limit_and_total() {
        let query = ListQuery {
            sort: doc("{age: -1}"),
            skip: 1,
            limit: Some(1),
            ..ListQuery::default()
        };
        let page = people().list_documents(&query).expect("list");
        assert_eq!(page.total, 3);
        assert_eq!(names(&page), vec!["Ann"]);
    }

    #[test]
    fn inclusive_and_exclusive_projection() {
        let store = people();
        let inclusive = ListQuery {
            projection: doc("{name: 1, _id: 0}"),
            limit: Some(1),
            ..ListQuery::default()
        };
        let page = store.list_documents(&inclusive).expect("list");
        assert_eq!(page.documents, vec![doc(r#"{name: "Ann"}"#)]);

        let exclusive = ListQuery {
            projection: doc("{tags: 0, age: false}"),
            limit: Some(1),
            ..ListQuery::default()
        };
        let page = store.list_documents(&exclusive).expect("list");
        assert_eq!(page.documents, vec![doc(r#"{_id: 1, name: "Ann"}"#)]);
    }

    #[test]
    fn crud_round_trip() {
        let mut store = people();
        let id = store.insert_document(doc(r#"{name: "Dee"}"#)).expect("insert");
        assert_matches!(id.value(), Value::ObjectId(_));
        let stored = store.get_document(&id).expect("get");
        assert_eq!(stored.keys().next(), Some(ID_FIELD));

        store
            .update_document(&id, doc(r#"{name: "Dee", age: 5}"#))
            .expect("update");
        assert_eq!(store.get_document(&id).expect("get").get("age"), Some(&Value::Int32(5)));

        store.delete_document(&id).expect("delete");
        assert_matches!(store.get_document(&id), Err(StoreError::NotFound { .. }));
        assert_matches!(store.delete_document(&id), Err(StoreError::NotFound { .. }));
        assert_matches!(
            store.insert_document(doc("{_id: 1}")),
            Err(StoreError::DuplicateId { .. })
        );
    }

    #[test]
    fn numeric_ids_match_across_widths() {
        let mut store = MemoryStore::from_documents(vec![
            doc("{_id: NumberLong(7), name: \"Ann\"}"),
            doc("{_id: 8.0, name: \"Bo\"}"),
            doc("{_id: \"7\", name: \"text\"}"),
        ]);
        let seven: DocumentId = "7".parse().expect("id");
        assert_eq!(seven.value(), &Value::Int32(7));
        assert_eq!(
            store.get_document(&seven).expect("get").get("name"),
            Some(&Value::from("Ann"))
        );
        assert_eq!(
            store
                .get_document(&DocumentId(Value::Int32(8)))
                .expect("get")
                .get("name"),
            Some(&Value::from("Bo"))
        );
        assert_eq!(
            store
                .get_document(&DocumentId(Value::from("7")))
                .expect("get")
                .get("name"),
            Some(&Value::from("text"))
        );
        assert_matches!(
            store.insert_document(doc("{_id: 7}")),
            Err(StoreError::DuplicateId { .. })
        );

        store.delete_document(&seven).expect("delete");
        assert_eq!(store.documents().len(), 2);
    }

    #[test]
    fn ids_parse_from_command_line_text() {
        let oid: DocumentId = "507f1f77bcf86cd799439011".parse().expect("id");
        assert_matches!(oid.value(), Value::ObjectId(_));
        assert_eq!("7".parse::<DocumentId>().expect("id").0, Value::Int32(7));
        assert_eq!(
            "alice".parse::<DocumentId>().expect("id").to_string(),
            "\"alice\""
        );
    }

    #[test]
    fn cross_type_ordering() {
        assert_eq!(compare_values(&Value::Null, &Value::Int32(0)), Ordering::Less);
        assert_eq!(
            compare_values(&Value::Int64(3), &Value::Double(2.5)),
            Ordering::Greater
        );
        assert_eq!(
            compare_values(&Value::from("a"), &Value::Regex(Regex::new("a", ""))),
            Ordering::Less
        );
        assert_eq!(compare_values(&Value::MaxKey, &Value::MinKey), Ordering::Greater);
    }
}
