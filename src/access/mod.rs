//! Generic data-access layer bound to one collection of the injected record store.

mod entity;

pub use entity::{EntityMeta, RelationMeta};

use crate::error::{AppError, StoreError};
use crate::export::{self, Export, ExportFormat};
use crate::sql::MAX_LIMIT;
use crate::store::{
    strip_managed, values_equal, Document, FindQuery, Filter, OrderBy, RecordStore, CREATED_AT, ID_FIELD,
    MANAGED_FIELDS, UPDATED_AT,
};
use chrono::{SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

/// Maximum items per batch create/update.
pub const BULK_LIMIT: usize = 100;

/// Page size used by paginated search when none is given.
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Stand-in identity for records checked before the store assigns one.
const PENDING_ID: &str = "00000000-0000-0000-0000-000000000000";

/// Anything that round-trips through a store document.
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> Record for T where T: Serialize + DeserializeOwned + Send + Sync + 'static {}

#[derive(Clone, Debug, Default)]
pub struct SearchOptions {
    pub take: Option<u64>,
    pub skip: u64,
    pub order_by: Option<OrderBy>,
    /// Relation names to embed in each record.
    pub include: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct ExportOptions {
    pub take: Option<u64>,
    pub skip: u64,
    pub order_by: Option<OrderBy>,
    /// Keys dropped from every row, on top of `id`, `createdAt` and `updatedAt`.
    pub omit: Vec<String>,
    /// Managed keys to export anyway.
    pub keep: Vec<String>,
}

impl ExportOptions {
    fn omitted(&self) -> Vec<String> {
        let mut keys: Vec<String> = MANAGED_FIELDS
            .iter()
            .filter(|k| !self.keep.iter().any(|kept| kept == *k))
            .map(|k| k.to_string())
            .collect();
        for key in &self.omit {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }
        keys
    }
}

/// Result of a fuzzy paginated search.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub record: Vec<T>,
    /// Records matching the filter.
    pub count: u64,
    /// Size of the whole collection.
    pub items: u64,
    pub pages: u64,
    pub current_page: u64,
}

/// Converts any serializable value into a store document.
pub fn document_of<S: Serialize>(value: &S) -> Result<Document, AppError> {
    match serde_json::to_value(value).map_err(StoreError::from)? {
        Value::Object(map) => Ok(map),
        other => Err(AppError::BadRequest(format!("expected a JSON object, got {}", other))),
    }
}

pub struct DataAccess<T = Value> {
    store: Arc<dyn RecordStore>,
    entity: Arc<EntityMeta>,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for DataAccess<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            entity: Arc::clone(&self.entity),
            _record: PhantomData,
        }
    }
}

impl<T: Record> DataAccess<T> {
    pub fn new(store: Arc<dyn RecordStore>, entity: EntityMeta) -> Self {
        Self {
            store,
            entity: Arc::new(entity),
            _record: PhantomData,
        }
    }

    pub fn entity(&self) -> &EntityMeta {
        &self.entity
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    fn collection(&self) -> &str {
        &self.entity.collection
    }

    fn decode(doc: Document) -> Result<T, AppError> {
        serde_json::from_value(Value::Object(doc)).map_err(|e| StoreError::from(e).into())
    }

    fn decode_all(docs: Vec<Document>) -> Result<Vec<T>, AppError> {
        docs.into_iter().map(Self::decode).collect()
    }

    /// Rejects a document `T` cannot hold, before anything is written.
    /// Managed keys the store has not assigned yet get placeholder values.
    fn admit(&self, candidate: &Document) -> Result<(), AppError> {
        let mut doc = candidate.clone();
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        doc.entry(ID_FIELD).or_insert_with(|| Value::String(PENDING_ID.to_string()));
        doc.entry(CREATED_AT).or_insert_with(|| Value::String(now.clone()));
        doc.entry(UPDATED_AT).or_insert_with(|| Value::String(now));
        serde_json::from_value::<T>(Value::Object(doc))
            .map(|_| ())
            .map_err(|e| AppError::Validation(format!("{}: {}", self.entity.name, e)))
    }

    /// The stored record with `patch` applied, as the store would merge it.
    async fn patched(&self, id: &str, patch: &Document) -> Result<Document, AppError> {
        let mut doc = self
            .store
            .find_unique(self.collection(), id)
            .await?
            .ok_or_else(|| StoreError::RecordNotFound {
                collection: self.collection().to_string(),
                id: id.to_string(),
            })?;
        for (k, v) in patch {
            doc.insert(k.clone(), v.clone());
        }
        Ok(doc)
    }

    fn check_batch(&self, len: usize, op: &str) -> Result<(), AppError> {
        if len > BULK_LIMIT {
            return Err(AppError::BadRequest(format!("{} limited to {} items", op, BULK_LIMIT)));
        }
        Ok(())
    }

    /// Identity and timestamp keys in `data` are ignored.
    pub async fn create(&self, mut data: Document) -> Result<T, AppError> {
        strip_managed(&mut data);
        self.admit(&data)?;
        let doc = self.store.insert(self.collection(), data).await?;
        tracing::debug!(collection = self.collection(), id = ?doc.get(ID_FIELD), "record created");
        Self::decode(doc)
    }

    /// Batch create, all or nothing.
    pub async fn create_many(&self, items: Vec<Document>) -> Result<Vec<T>, AppError> {
        self.check_batch(items.len(), "bulk create")?;
        let docs = items
            .into_iter()
            .map(|mut d| {
                strip_managed(&mut d);
                self.admit(&d).map(|_| d)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let rows = self.store.insert_many(self.collection(), docs).await?;
        Self::decode_all(rows)
    }

    /// Absent record is `Ok(None)`.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<T>, AppError> {
        self.store
            .find_unique(self.collection(), id)
            .await?
            .map(Self::decode)
            .transpose()
    }

    pub async fn get_all(&self) -> Result<Vec<T>, AppError> {
        let rows = self.store.find_many(self.collection(), &FindQuery::default()).await?;
        Self::decode_all(rows)
    }

    pub async fn update(&self, id: &str, mut partial: Document) -> Result<T, AppError> {
        strip_managed(&mut partial);
        self.admit(&self.patched(id, &partial).await?)?;
        let doc = self.store.update(self.collection(), id, partial).await?;
        Self::decode(doc)
    }

    /// Batch update; each item carries its `id`.
    pub async fn update_many(&self, items: Vec<Document>) -> Result<Vec<T>, AppError> {
        self.check_batch(items.len(), "bulk update")?;
        let mut patches = Vec::with_capacity(items.len());
        for mut item in items {
            let id = match item.get(ID_FIELD) {
                Some(Value::String(s)) if !s.is_empty() => s.clone(),
                _ => return Err(AppError::BadRequest("each item requires a string id".into())),
            };
            strip_managed(&mut item);
            self.admit(&self.patched(&id, &item).await?)?;
            patches.push((id, item));
        }
        let rows = self.store.update_many(self.collection(), patches).await?;
        Self::decode_all(rows)
    }

    /// Decodes the record before removing it, so a failure leaves the store untouched.
    pub async fn delete(&self, id: &str) -> Result<T, AppError> {
        let record = match self.store.find_unique(self.collection(), id).await? {
            Some(doc) => Self::decode(doc)?,
            None => {
                return Err(StoreError::RecordNotFound {
                    collection: self.collection().to_string(),
                    id: id.to_string(),
                }
                .into())
            }
        };
        self.store.delete(self.collection(), id).await?;
        Ok(record)
    }

    /// Exact match on every filter (AND).
    pub async fn search(&self, filters: Vec<(String, Value)>, options: &SearchOptions) -> Result<Vec<T>, AppError> {
        let query = FindQuery {
            filter: Filter::exact(filters),
            take: options.take.map(|t| t.min(MAX_LIMIT)),
            skip: options.skip,
            order_by: options.order_by.clone(),
        };
        let mut rows = self.store.find_many(self.collection(), &query).await?;
        self.attach_includes(&mut rows, &options.include).await?;
        Self::decode_all(rows)
    }

    /// Substring match on any filter (OR), with page arithmetic over the whole collection.
    ///
    /// Three sequential store calls; the figures are not a consistent snapshot.
    pub async fn paginated_search(
        &self,
        filters: Vec<(String, Value)>,
        options: &SearchOptions,
    ) -> Result<Page<T>, AppError> {
        let take = options.take.filter(|t| *t > 0).unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_LIMIT);
        let filter = Filter::any_contains(filters);
        let query = FindQuery {
            filter: filter.clone(),
            take: Some(take),
            skip: options.skip,
            order_by: options.order_by.clone(),
        };
        let mut rows = self.store.find_many(self.collection(), &query).await?;
        self.attach_includes(&mut rows, &options.include).await?;
        let count = self.store.count(self.collection(), &filter).await?;
        let items = self.store.count(self.collection(), &Filter::All).await?;
        Ok(Page {
            record: Self::decode_all(rows)?,
            count,
            items,
            pages: items.div_ceil(take),
            current_page: options.skip / take + 1,
        })
    }

    /// Embeds each named relation, batch-loading the related collection once per relation.
    pub async fn attach_includes(&self, rows: &mut [Document], include: &[String]) -> Result<(), AppError> {
        for name in include {
            let relation = self
                .entity
                .relation(name)
                .ok_or_else(|| AppError::BadRequest(format!("unknown include '{}' for {}", name, self.entity.name)))?;
            let mut keys: Vec<Value> = Vec::new();
            for row in rows.iter() {
                if let Some(v) = row.get(&relation.local_key).filter(|v| !v.is_null()) {
                    if !keys.iter().any(|k| values_equal(k, v)) {
                        keys.push(v.clone());
                    }
                }
            }
            let related = if keys.is_empty() {
                Vec::new()
            } else {
                let query = FindQuery {
                    filter: Filter::In(relation.foreign_key.clone(), keys),
                    ..Default::default()
                };
                self.store.find_many(&relation.collection, &query).await?
            };
            for row in rows.iter_mut() {
                let local = row.get(&relation.local_key).cloned().unwrap_or(Value::Null);
                let mut matches = related.iter().filter(|r| {
                    !local.is_null() && r.get(&relation.foreign_key).map(|v| values_equal(v, &local)).unwrap_or(false)
                });
                let embedded = if relation.many {
                    Value::Array(matches.map(|m| Value::Object(m.clone())).collect())
                } else {
                    matches.next().map(|m| Value::Object(m.clone())).unwrap_or(Value::Null)
                };
                row.insert(relation.name.clone(), embedded);
            }
        }
        Ok(())
    }

    pub async fn export_as(&self, format: ExportFormat, options: &ExportOptions) -> Result<Export, AppError> {
        let query = FindQuery {
            filter: Filter::All,
            take: options.take,
            skip: options.skip,
            order_by: options.order_by.clone(),
        };
        let mut rows = self.store.find_many(self.collection(), &query).await?;
        let omit = options.omitted();
        for row in rows.iter_mut() {
            for key in &omit {
                row.remove(key);
            }
        }
        export::encode(format, &self.entity.name, &rows)
    }

    pub async fn export_as_pdf(&self, options: &ExportOptions) -> Result<Export, AppError> {
        self.export_as(ExportFormat::Pdf, options).await
    }

    pub async fn export_as_csv(&self, options: &ExportOptions) -> Result<Export, AppError> {
        self.export_as(ExportFormat::Csv, options).await
    }

    pub async fn export_as_json(&self, options: &ExportOptions) -> Result<Export, AppError> {
        self.export_as(ExportFormat::Json, options).await
    }

    pub async fn export_as_xlsx(&self, options: &ExportOptions) -> Result<Export, AppError> {
        self.export_as(ExportFormat::Xlsx, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn obj(v: Value) -> Document {
        v.as_object().cloned().unwrap()
    }

    fn songs(store: Arc<dyn RecordStore>) -> DataAccess {
        DataAccess::new(store, EntityMeta::for_model("Song"))
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Song {
        id: String,
        title: String,
    }

    #[tokio::test]
    async fn typed_access_decodes_records() {
        let access: DataAccess<Song> = DataAccess::new(Arc::new(MemoryStore::new()), EntityMeta::for_model("Song"));
        let song = access.create(obj(json!({"title": "Blue", "id": "ignored"}))).await.unwrap();
        assert_ne!(song.id, "ignored");
        assert_eq!(song.title, "Blue");
        assert!(access.get_by_id(&song.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn missing_record_is_none_not_an_error() {
        let access = songs(Arc::new(MemoryStore::new()));
        assert!(access.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn pagination_arithmetic() {
        let access = songs(Arc::new(MemoryStore::new()));
        for i in 0..25 {
            access.create(obj(json!({"title": format!("t{}", i)}))).await.unwrap();
        }
        let page = access
            .paginated_search(vec![], &SearchOptions { take: Some(10), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(page.pages, 3);
        assert_eq!(page.current_page, 1);
        assert_eq!(page.record.len(), 10);

        let page = access
            .paginated_search(vec![], &SearchOptions { take: Some(10), skip: 10, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(page.current_page, 2);
    }

    #[tokio::test]
    async fn fuzzy_search_counts_filtered_and_total() {
        let access = songs(Arc::new(MemoryStore::new()));
        for title in ["abc", "xab", "zzz"] {
            access.create(obj(json!({ "title": title }))).await.unwrap();
        }
        let page = access
            .paginated_search(vec![("title".into(), json!("ab"))], &SearchOptions { take: Some(10), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(page.count, 2);
        assert_eq!(page.items, 3);
        assert_eq!(page.record.len(), 2);
    }

    #[tokio::test]
    async fn exact_search_ands_filters() {
        let access = songs(Arc::new(MemoryStore::new()));
        access.create(obj(json!({"title": "a", "year": 1}))).await.unwrap();
        access.create(obj(json!({"title": "a", "year": 2}))).await.unwrap();
        let hits = access
            .search(vec![("title".into(), json!("a")), ("year".into(), json!(2))], &SearchOptions::default())
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn includes_are_batch_loaded() {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        let albums: DataAccess = DataAccess::new(
            store.clone(),
            EntityMeta::for_model("Album").with_relation(RelationMeta::to_many("songs", "song", "id", "albumId")),
        );
        let songs: DataAccess = DataAccess::new(
            store.clone(),
            EntityMeta::for_model("Song").with_relation(RelationMeta::to_one("album", "album", "albumId", "id")),
        );
        let album = albums.create(obj(json!({"name": "Kind of Blue"}))).await.unwrap();
        let album_id = album["id"].clone();
        songs.create(obj(json!({"title": "So What", "albumId": album_id}))).await.unwrap();
        songs.create(obj(json!({"title": "Orphan"}))).await.unwrap();

        let options = SearchOptions { include: vec!["album".into()], ..Default::default() };
        let found = songs.search(vec![], &options).await.unwrap();
        assert_eq!(found[0]["album"]["name"], json!("Kind of Blue"));
        assert_eq!(found[1]["album"], Value::Null);

        let options = SearchOptions { include: vec!["songs".into()], ..Default::default() };
        let found = albums.search(vec![], &options).await.unwrap();
        assert_eq!(found[0]["songs"].as_array().map(Vec::len), Some(1));

        let options = SearchOptions { include: vec!["nope".into()], ..Default::default() };
        assert!(matches!(songs.search(vec![], &options).await, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn batch_limit_is_enforced() {
        let access = songs(Arc::new(MemoryStore::new()));
        let items = (0..=BULK_LIMIT).map(|_| Document::new()).collect();
        assert!(matches!(access.create_many(items).await, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn update_many_requires_ids() {
        let access = songs(Arc::new(MemoryStore::new()));
        let a = access.create(obj(json!({"title": "a"}))).await.unwrap();
        let updated = access
            .update_many(vec![obj(json!({"id": a["id"], "title": "b"}))])
            .await
            .unwrap();
        assert_eq!(updated[0]["title"], json!("b"));
        let err = access.update_many(vec![obj(json!({"title": "c"}))]).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn export_omits_managed_keys_by_default() {
        let access = songs(Arc::new(MemoryStore::new()));
        access.create(obj(json!({"title": "a"}))).await.unwrap();
        let export = access.export_as_json(&ExportOptions::default()).await.unwrap();
        let rows: Value = serde_json::from_slice(&export.body).unwrap();
        assert_eq!(rows, json!([{"title": "a"}]));
        assert_eq!(export.file_name, "Song.json");
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Track {
        id: String,
        n: i64,
    }

    #[tokio::test]
    async fn records_the_type_cannot_hold_are_rejected_before_writing() {
        let access: DataAccess<Track> = DataAccess::new(Arc::new(MemoryStore::new()), EntityMeta::for_model("Track"));
        let err = access.create(obj(json!({"n": 3.5}))).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let err = access.create_many(vec![obj(json!({"n": 1})), obj(json!({"n": "x"}))]).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(access.get_all().await.unwrap().is_empty());

        let track = access.create(obj(json!({"n": 3}))).await.unwrap();
        let err = access.update(&track.id, obj(json!({"n": 1.5}))).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let err = access
            .update_many(vec![obj(json!({"id": track.id.clone(), "n": "x"}))])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let stored = access.get_all().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].n, 3);
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Artwork {
        id: String,
        cover: Option<String>,
    }

    #[tokio::test]
    async fn binary_fields_round_trip_as_base64_text() {
        let access: DataAccess<Artwork> =
            DataAccess::new(Arc::new(MemoryStore::new()), EntityMeta::for_model("Artwork"));
        let art = access.create(obj(json!({"cover": "aGVsbG8="}))).await.unwrap();
        assert_eq!(art.cover.as_deref(), Some("aGVsbG8="));
        let err = access.create(obj(json!({"cover": [104, 105]}))).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(access.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_of_missing_record_is_not_found() {
        let access: DataAccess<Track> = DataAccess::new(Arc::new(MemoryStore::new()), EntityMeta::for_model("Track"));
        let err = access.update("missing", obj(json!({"n": 1}))).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn undecodable_record_is_not_deleted() {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        let raw = store.insert("track", obj(json!({"n": "not a number"}))).await.unwrap();
        let id = raw[ID_FIELD].as_str().unwrap().to_string();
        let access: DataAccess<Track> = DataAccess::new(store.clone(), EntityMeta::for_model("Track"));
        assert!(access.delete(&id).await.is_err());
        assert!(store.find_unique("track", &id).await.unwrap().is_some());
        assert!(matches!(access.delete("missing").await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn take_is_capped_for_every_store() {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        let docs = (0..MAX_LIMIT + 1).map(|i| obj(json!({"title": format!("t{}", i)}))).collect();
        store.insert_many("song", docs).await.unwrap();
        let access = songs(store);
        let page = access
            .paginated_search(vec![], &SearchOptions { take: Some(5000), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(page.record.len() as u64, MAX_LIMIT);
        assert_eq!(page.items, MAX_LIMIT + 1);
        assert_eq!(page.pages, 2);
    }

    #[tokio::test]
    async fn caller_omit_adds_to_managed_defaults() {
        let access = songs(Arc::new(MemoryStore::new()));
        access.create(obj(json!({"title": "a", "secret": "s"}))).await.unwrap();
        let options = ExportOptions { omit: vec!["secret".into()], ..Default::default() };
        let export = access.export_as_json(&options).await.unwrap();
        let rows: Value = serde_json::from_slice(&export.body).unwrap();
        assert_eq!(rows, json!([{"title": "a"}]));

        let options = ExportOptions { keep: vec![ID_FIELD.into()], ..Default::default() };
        let export = access.export_as_json(&options).await.unwrap();
        let rows: Value = serde_json::from_slice(&export.body).unwrap();
        assert!(rows[0].get(ID_FIELD).is_some());
        assert!(rows[0].get(CREATED_AT).is_none());
        assert_eq!(rows[0]["secret"], json!("s"));
    }

    #[tokio::test]
    async fn empty_pdf_export_has_placeholder() {
        let access = songs(Arc::new(MemoryStore::new()));
        let export = access.export_as_pdf(&ExportOptions::default()).await.unwrap();
        let text = String::from_utf8_lossy(&export.body);
        assert!(text.contains("(Empty Database) Tj"));
    }
}
