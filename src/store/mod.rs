//! Record store seam: the storage capability injected into the data-access layer.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{ensure_database_exists, PgStore, DEFAULT_PG_SCHEMA};

use crate::error::StoreError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Store-level record: a JSON object. The store owns `id`, `createdAt` and `updatedAt`.
pub type Document = Map<String, Value>;

pub const ID_FIELD: &str = "id";
pub const CREATED_AT: &str = "createdAt";
pub const UPDATED_AT: &str = "updatedAt";

/// Keys managed by the store; ignored when supplied by callers.
pub const MANAGED_FIELDS: [&str; 3] = [ID_FIELD, CREATED_AT, UPDATED_AT];

#[derive(Clone, Debug, Default, PartialEq)]
pub enum Filter {
    #[default]
    All,
    /// Every pair must match exactly (AND).
    Exact(Vec<(String, Value)>),
    /// At least one field must contain its needle (OR).
    AnyContains(Vec<(String, String)>),
    /// Field value is one of the listed values.
    In(String, Vec<Value>),
}

impl Filter {
    /// Exact filter; an empty list matches everything.
    pub fn exact(pairs: Vec<(String, Value)>) -> Self {
        if pairs.is_empty() {
            Filter::All
        } else {
            Filter::Exact(pairs)
        }
    }

    /// Substring filter built from exact-style pairs; an empty list matches everything.
    pub fn any_contains(pairs: Vec<(String, Value)>) -> Self {
        if pairs.is_empty() {
            Filter::All
        } else {
            Filter::AnyContains(pairs.into_iter().map(|(k, v)| (k, text_of(&v))).collect())
        }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Exact(pairs) => pairs
                .iter()
                .all(|(field, expected)| doc.get(field).map(|v| values_equal(v, expected)).unwrap_or(false)),
            Filter::AnyContains(pairs) => pairs.iter().any(|(field, needle)| {
                doc.get(field)
                    .filter(|v| !v.is_null())
                    .map(|v| text_of(v).contains(needle.as_str()))
                    .unwrap_or(false)
            }),
            Filter::In(field, values) => doc
                .get(field)
                .map(|v| values.iter().any(|candidate| values_equal(v, candidate)))
                .unwrap_or(false),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub order: SortOrder,
}

impl OrderBy {
    /// Parses `field`, `field:asc` or `field:desc`. Returns `None` for an empty field.
    pub fn parse(raw: &str) -> Option<Self> {
        let (field, order) = match raw.split_once(':') {
            Some((f, o)) if o.trim().eq_ignore_ascii_case("desc") => (f, SortOrder::Desc),
            Some((f, _)) => (f, SortOrder::Asc),
            None => (raw, SortOrder::Asc),
        };
        let field = field.trim();
        if field.is_empty() {
            return None;
        }
        Some(OrderBy {
            field: field.to_string(),
            order,
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct FindQuery {
    pub filter: Filter,
    pub take: Option<u64>,
    pub skip: u64,
    pub order_by: Option<OrderBy>,
}

/// Capability-typed storage client. Implementations handle their own consistency.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    async fn insert(&self, collection: &str, doc: Document) -> Result<Document, StoreError>;

    async fn insert_many(&self, collection: &str, docs: Vec<Document>) -> Result<Vec<Document>, StoreError>;

    async fn find_unique(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    async fn find_many(&self, collection: &str, query: &FindQuery) -> Result<Vec<Document>, StoreError>;

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError>;

    /// Shallow-merges `patch` into the record. Missing record is `RecordNotFound`.
    async fn update(&self, collection: &str, id: &str, patch: Document) -> Result<Document, StoreError>;

    async fn update_many(
        &self,
        collection: &str,
        patches: Vec<(String, Document)>,
    ) -> Result<Vec<Document>, StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<Document, StoreError>;
}

/// Text form used for substring matching and tabular exports.
pub fn text_of(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Total order over optional JSON values: absent and null sort first.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(x), Some(y)) => text_of(x).cmp(&text_of(y)),
    }
}

/// Removes store-managed keys from caller input.
pub fn strip_managed(doc: &mut Document) {
    for key in MANAGED_FIELDS {
        doc.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> Document {
        match v {
            Value::Object(m) => m,
            _ => panic!("object expected"),
        }
    }

    #[test]
    fn exact_filter_requires_every_pair() {
        let d = doc(json!({"title": "Blue", "year": 1999}));
        assert!(Filter::exact(vec![("title".into(), json!("Blue")), ("year".into(), json!(1999.0))]).matches(&d));
        assert!(!Filter::exact(vec![("title".into(), json!("Blue")), ("year".into(), json!(2000))]).matches(&d));
        assert!(Filter::exact(vec![]).matches(&d));
    }

    #[test]
    fn contains_filter_is_an_or() {
        let d = doc(json!({"title": "abc", "artist": "zzz"}));
        let f = Filter::any_contains(vec![("title".into(), json!("x")), ("artist".into(), json!("zz"))]);
        assert!(f.matches(&d));
        let f = Filter::any_contains(vec![("title".into(), json!("x"))]);
        assert!(!f.matches(&d));
    }

    #[test]
    fn order_by_parses_direction() {
        assert_eq!(
            OrderBy::parse("title:desc"),
            Some(OrderBy { field: "title".into(), order: SortOrder::Desc })
        );
        assert_eq!(OrderBy::parse("title").map(|o| o.order), Some(SortOrder::Asc));
        assert_eq!(OrderBy::parse(" :desc"), None);
    }

    #[test]
    fn nulls_sort_first() {
        assert_eq!(compare_values(None, Some(&json!(1))), Ordering::Less);
        assert_eq!(compare_values(Some(&json!(2)), Some(&json!(10))), Ordering::Less);
        assert_eq!(compare_values(Some(&json!("b")), Some(&json!("a"))), Ordering::Greater);
    }
}
