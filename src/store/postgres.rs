//! PostgreSQL record store: one JSONB document table per collection.

use super::{strip_managed, Document, FindQuery, Filter, RecordStore, CREATED_AT, ID_FIELD, UPDATED_AT};
use crate::error::StoreError;
use crate::sql::{self, QueryBuf};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{ConnectOptions, PgPool, Postgres, Row};
use std::str::FromStr;

/// Default schema for collection tables. Overridden by `SCAFFOLD_PG_SCHEMA`.
pub const DEFAULT_PG_SCHEMA: &str = "public";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    schema: String,
}

fn bind_all<'q>(q: &'q QueryBuf) -> Query<'q, Postgres, PgArguments> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = query.bind(p.as_str());
    }
    query
}

fn row_to_document(row: &PgRow) -> Result<Document, StoreError> {
    let id: String = row.try_get("id")?;
    let payload: Value = row.try_get("payload")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;
    let mut doc = match payload {
        Value::Object(m) => m,
        other => return Err(StoreError::Invalid(format!("payload is not an object: {}", other))),
    };
    doc.insert(ID_FIELD.into(), Value::String(id));
    doc.insert(
        CREATED_AT.into(),
        Value::String(created_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    doc.insert(
        UPDATED_AT.into(),
        Value::String(updated_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    Ok(doc)
}

/// Splits caller input into the record id and the payload stored in JSONB.
fn split_identity(mut doc: Document) -> Result<(String, Value), StoreError> {
    let id = match doc.get(ID_FIELD) {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Null) | None => uuid::Uuid::new_v4().to_string(),
        Some(other) => return Err(StoreError::Invalid(format!("id must be a string, got {}", other))),
    };
    strip_managed(&mut doc);
    Ok((id, Value::Object(doc)))
}

fn patch_value(mut patch: Document) -> Value {
    strip_managed(&mut patch);
    Value::Object(patch)
}

impl PgStore {
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        Self {
            pool,
            schema: schema.into(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Create the schema and one table per collection if missing.
    pub async fn ensure_collections<I, S>(&self, collections: I) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        sqlx::query(&sql::create_schema(&self.schema))
            .execute(&self.pool)
            .await?;
        for collection in collections {
            let ddl = sql::create_table(&self.schema, collection.as_ref());
            sqlx::query(&ddl).execute(&self.pool).await?;
            tracing::debug!(collection = collection.as_ref(), "collection table ensured");
        }
        Ok(())
    }

    fn not_found(collection: &str, id: &str) -> StoreError {
        StoreError::RecordNotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }

    async fn insert(&self, collection: &str, doc: Document) -> Result<Document, StoreError> {
        let (id, payload) = split_identity(doc)?;
        let q = sql::insert(&self.schema, collection, &id, &payload);
        let row = bind_all(&q).fetch_one(&self.pool).await?;
        row_to_document(&row)
    }

    async fn insert_many(&self, collection: &str, docs: Vec<Document>) -> Result<Vec<Document>, StoreError> {
        let mut out = Vec::with_capacity(docs.len());
        let mut tx = self.pool.begin().await?;
        for doc in docs {
            let (id, payload) = split_identity(doc)?;
            let q = sql::insert(&self.schema, collection, &id, &payload);
            let row = bind_all(&q).fetch_one(&mut *tx).await?;
            out.push(row_to_document(&row)?);
        }
        tx.commit().await?;
        Ok(out)
    }

    async fn find_unique(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let q = sql::select_by_id(&self.schema, collection, id);
        let row = bind_all(&q).fetch_optional(&self.pool).await?;
        row.as_ref().map(row_to_document).transpose()
    }

    async fn find_many(&self, collection: &str, query: &FindQuery) -> Result<Vec<Document>, StoreError> {
        let q = sql::select_list(&self.schema, collection, query);
        let rows = bind_all(&q).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_document).collect()
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let q = sql::count(&self.schema, collection, filter);
        let row = bind_all(&q).fetch_one(&self.pool).await?;
        let n: i64 = row.try_get("n")?;
        Ok(n.max(0) as u64)
    }

    async fn update(&self, collection: &str, id: &str, patch: Document) -> Result<Document, StoreError> {
        let q = sql::update(&self.schema, collection, id, &patch_value(patch));
        let row = bind_all(&q)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Self::not_found(collection, id))?;
        row_to_document(&row)
    }

    async fn update_many(
        &self,
        collection: &str,
        patches: Vec<(String, Document)>,
    ) -> Result<Vec<Document>, StoreError> {
        let mut out = Vec::with_capacity(patches.len());
        let mut tx = self.pool.begin().await?;
        for (id, patch) in patches {
            let q = sql::update(&self.schema, collection, &id, &patch_value(patch));
            let row = bind_all(&q)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| Self::not_found(collection, &id))?;
            out.push(row_to_document(&row)?);
        }
        tx.commit().await?;
        Ok(out)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<Document, StoreError> {
        let q = sql::delete(&self.schema, collection, id);
        let row = bind_all(&q)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Self::not_found(collection, id))?;
        row_to_document(&row)
    }
}

/// Connect to the `postgres` maintenance database and create the target database if missing.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), StoreError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| StoreError::Unavailable(format!("invalid DATABASE_URL: {}", e)))?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", sql::quoted(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), StoreError> {
    let path_start = url
        .rfind('/')
        .ok_or_else(|| StoreError::Unavailable("DATABASE_URL: no path".into()))?
        + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let db_name = path_and_query.split('?').next().unwrap_or("").trim();
    let base = url.get(..path_start).unwrap_or(url);
    Ok((format!("{}postgres", base), db_name.to_string()))
}
