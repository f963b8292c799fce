//! In-process record store. Collections keep insertion order.

use super::{compare_values, Document, FindQuery, Filter, RecordStore, SortOrder, CREATED_AT, ID_FIELD, UPDATED_AT};
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

fn now() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Vec<Document>>>, StoreError> {
        self.collections
            .read()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Vec<Document>>>, StoreError> {
        self.collections
            .write()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }

    fn stamp(rows: &[Document], mut doc: Document) -> Result<Document, StoreError> {
        let id = match doc.remove(ID_FIELD) {
            Some(Value::String(s)) if !s.is_empty() => s,
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Null) | None => uuid::Uuid::new_v4().to_string(),
            Some(other) => return Err(StoreError::Invalid(format!("id must be a string, got {}", other))),
        };
        if rows.iter().any(|r| r.get(ID_FIELD).and_then(Value::as_str) == Some(id.as_str())) {
            return Err(StoreError::Conflict(format!("id '{}' already exists", id)));
        }
        let ts = now();
        doc.insert(ID_FIELD.into(), Value::String(id));
        doc.insert(CREATED_AT.into(), ts.clone());
        doc.insert(UPDATED_AT.into(), ts);
        Ok(doc)
    }

    fn position(rows: &[Document], id: &str) -> Option<usize> {
        rows.iter().position(|r| r.get(ID_FIELD).and_then(Value::as_str) == Some(id))
    }

    fn merge(row: &mut Document, patch: Document) {
        for (k, v) in patch {
            if k == ID_FIELD || k == CREATED_AT || k == UPDATED_AT {
                continue;
            }
            row.insert(k, v);
        }
        row.insert(UPDATED_AT.into(), now());
    }

    fn not_found(collection: &str, id: &str) -> StoreError {
        StoreError::RecordNotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.read().map(|_| ())
    }

    async fn insert(&self, collection: &str, doc: Document) -> Result<Document, StoreError> {
        let mut guard = self.write()?;
        let rows = guard.entry(collection.to_string()).or_default();
        let row = Self::stamp(rows, doc)?;
        rows.push(row.clone());
        Ok(row)
    }

    async fn insert_many(&self, collection: &str, docs: Vec<Document>) -> Result<Vec<Document>, StoreError> {
        let mut guard = self.write()?;
        let rows = guard.entry(collection.to_string()).or_default();
        // All-or-nothing: stamp against a scratch copy before committing.
        let mut staged = rows.clone();
        let mut out = Vec::with_capacity(docs.len());
        for doc in docs {
            let row = Self::stamp(&staged, doc)?;
            staged.push(row.clone());
            out.push(row);
        }
        *rows = staged;
        Ok(out)
    }

    async fn find_unique(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let guard = self.read()?;
        Ok(guard
            .get(collection)
            .and_then(|rows| Self::position(rows, id).map(|i| rows[i].clone())))
    }

    async fn find_many(&self, collection: &str, query: &FindQuery) -> Result<Vec<Document>, StoreError> {
        let guard = self.read()?;
        let Some(rows) = guard.get(collection) else {
            return Ok(Vec::new());
        };
        let mut hits: Vec<&Document> = rows.iter().filter(|r| query.filter.matches(r)).collect();
        if let Some(order) = &query.order_by {
            hits.sort_by(|a, b| {
                let ord = compare_values(a.get(&order.field), b.get(&order.field));
                match order.order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                }
            });
        }
        let take = query.take.map(|t| t as usize).unwrap_or(usize::MAX);
        Ok(hits
            .into_iter()
            .skip(query.skip as usize)
            .take(take)
            .cloned()
            .collect())
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let guard = self.read()?;
        Ok(guard
            .get(collection)
            .map(|rows| rows.iter().filter(|r| filter.matches(r)).count() as u64)
            .unwrap_or(0))
    }

    async fn update(&self, collection: &str, id: &str, patch: Document) -> Result<Document, StoreError> {
        let mut guard = self.write()?;
        let rows = guard
            .get_mut(collection)
            .ok_or_else(|| Self::not_found(collection, id))?;
        let idx = Self::position(rows, id).ok_or_else(|| Self::not_found(collection, id))?;
        Self::merge(&mut rows[idx], patch);
        Ok(rows[idx].clone())
    }

    async fn update_many(
        &self,
        collection: &str,
        patches: Vec<(String, Document)>,
    ) -> Result<Vec<Document>, StoreError> {
        let mut guard = self.write()?;
        let rows = guard.entry(collection.to_string()).or_default();
        let mut staged = rows.clone();
        let mut out = Vec::with_capacity(patches.len());
        for (id, patch) in patches {
            let idx = Self::position(&staged, &id).ok_or_else(|| Self::not_found(collection, &id))?;
            Self::merge(&mut staged[idx], patch);
            out.push(staged[idx].clone());
        }
        *rows = staged;
        Ok(out)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<Document, StoreError> {
        let mut guard = self.write()?;
        let rows = guard
            .get_mut(collection)
            .ok_or_else(|| Self::not_found(collection, id))?;
        let idx = Self::position(rows, id).ok_or_else(|| Self::not_found(collection, id))?;
        Ok(rows.remove(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::OrderBy;
    use serde_json::json;

    fn doc(v: Value) -> Document {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn insert_assigns_identity_and_timestamps() {
        let store = MemoryStore::new();
        let row = store.insert("song", doc(json!({"title": "One"}))).await.unwrap();
        assert!(row.get(ID_FIELD).and_then(Value::as_str).is_some());
        assert!(row.contains_key(CREATED_AT));
        assert!(row.contains_key(UPDATED_AT));
    }

    #[tokio::test]
    async fn duplicate_id_is_a_conflict() {
        let store = MemoryStore::new();
        store.insert("song", doc(json!({"id": "a"}))).await.unwrap();
        let err = store.insert("song", doc(json!({"id": "a"}))).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn failed_batch_leaves_collection_untouched() {
        let store = MemoryStore::new();
        let err = store
            .insert_many("song", vec![doc(json!({"id": "x"})), doc(json!({"id": "x"}))])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.count("song", &Filter::All).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn find_many_sorts_then_pages() {
        let store = MemoryStore::new();
        for n in [3, 1, 2] {
            store.insert("song", doc(json!({"rank": n}))).await.unwrap();
        }
        let query = FindQuery {
            order_by: OrderBy::parse("rank:desc"),
            skip: 1,
            take: Some(1),
            ..Default::default()
        };
        let rows = store.find_many("song", &query).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["rank"], json!(2));
    }

    #[tokio::test]
    async fn update_and_delete_missing_record() {
        let store = MemoryStore::new();
        let err = store.update("song", "nope", Document::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::RecordNotFound { .. }));
        let err = store.delete("song", "nope").await.unwrap_err();
        assert!(matches!(err, StoreError::RecordNotFound { .. }));
    }

    #[tokio::test]
    async fn update_keeps_identity() {
        let store = MemoryStore::new();
        let row = store.insert("song", doc(json!({"title": "a"}))).await.unwrap();
        let id = row[ID_FIELD].as_str().unwrap().to_string();
        let updated = store
            .update("song", &id, doc(json!({"id": "other", "title": "b"})))
            .await
            .unwrap();
        assert_eq!(updated[ID_FIELD], json!(id));
        assert_eq!(updated["title"], json!("b"));
    }
}
