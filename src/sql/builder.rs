//! Builds parameterized statements against JSONB document tables.
//!
//! Every collection is a table `(id TEXT, payload JSONB, created_at, updated_at)`.
//! All parameters are bound as text and cast in SQL.

use crate::store::{FindQuery, Filter, SortOrder, CREATED_AT, ID_FIELD, UPDATED_AT};
use serde_json::Value;

/// Upper bound applied to any LIMIT.
pub const MAX_LIMIT: u64 = 1000;

/// Quote identifier for PostgreSQL.
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
pub fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(table))
}

const RETURNING: &str = "id, payload, created_at, updated_at";

#[derive(Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<String>,
}

impl QueryBuf {
    fn new() -> Self {
        Self::default()
    }

    fn push_param(&mut self, v: impl Into<String>) -> usize {
        self.params.push(v.into());
        self.params.len()
    }
}

enum Column {
    Id,
    CreatedAt,
    UpdatedAt,
    Payload(String),
}

impl Column {
    fn for_field(field: &str) -> Self {
        match field {
            ID_FIELD => Column::Id,
            CREATED_AT | "created_at" => Column::CreatedAt,
            UPDATED_AT | "updated_at" => Column::UpdatedAt,
            other => Column::Payload(other.to_string()),
        }
    }

    /// Typed expression: text for id, timestamptz for timestamps, jsonb for payload keys.
    fn typed(&self, q: &mut QueryBuf) -> String {
        match self {
            Column::Id => "id".into(),
            Column::CreatedAt => "created_at".into(),
            Column::UpdatedAt => "updated_at".into(),
            Column::Payload(key) => {
                let n = q.push_param(key.as_str());
                format!("payload -> ${}::text", n)
            }
        }
    }

    fn text(&self, q: &mut QueryBuf) -> String {
        match self {
            Column::Id => "id".into(),
            Column::CreatedAt => "created_at::text".into(),
            Column::UpdatedAt => "updated_at::text".into(),
            Column::Payload(key) => {
                let n = q.push_param(key.as_str());
                format!("payload ->> ${}::text", n)
            }
        }
    }

    fn placeholder(&self, q: &mut QueryBuf, value: &Value) -> String {
        match self {
            Column::Id => {
                let n = q.push_param(crate::store::text_of(value));
                format!("${}", n)
            }
            Column::CreatedAt | Column::UpdatedAt => {
                let n = q.push_param(crate::store::text_of(value));
                format!("${}::timestamptz", n)
            }
            Column::Payload(_) => {
                let n = q.push_param(value.to_string());
                format!("${}::jsonb", n)
            }
        }
    }
}

fn where_clause(q: &mut QueryBuf, filter: &Filter) -> String {
    let expr = match filter {
        Filter::All => return String::new(),
        Filter::Exact(pairs) => pairs
            .iter()
            .map(|(field, value)| {
                let col = Column::for_field(field);
                let lhs = col.typed(q);
                let rhs = col.placeholder(q, value);
                format!("{} = {}", lhs, rhs)
            })
            .collect::<Vec<_>>()
            .join(" AND "),
        Filter::AnyContains(pairs) => {
            let parts: Vec<String> = pairs
                .iter()
                .map(|(field, needle)| {
                    let lhs = Column::for_field(field).text(q);
                    let n = q.push_param(needle.as_str());
                    format!("strpos({}, ${}) > 0", lhs, n)
                })
                .collect();
            format!("({})", parts.join(" OR "))
        }
        Filter::In(field, values) => {
            if values.is_empty() {
                "1 = 0".into()
            } else {
                let col = Column::for_field(field);
                let lhs = col.typed(q);
                let placeholders: Vec<String> = values.iter().map(|v| col.placeholder(q, v)).collect();
                format!("{} IN ({})", lhs, placeholders.join(", "))
            }
        }
    };
    format!(" WHERE {}", expr)
}

pub fn create_schema(schema: &str) -> String {
    format!("CREATE SCHEMA IF NOT EXISTS {}", quoted(schema))
}

pub fn create_table(schema: &str, collection: &str) -> String {
    format!(
        r#"CREATE TABLE IF NOT EXISTS {} (
            id TEXT PRIMARY KEY,
            payload JSONB NOT NULL DEFAULT '{{}}'::jsonb,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"#,
        qualified_table(schema, collection)
    )
}

/// INSERT one document. `payload` must not carry store-managed keys.
pub fn insert(schema: &str, collection: &str, id: &str, payload: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let id_n = q.push_param(id);
    let payload_n = q.push_param(payload.to_string());
    q.sql = format!(
        "INSERT INTO {} (id, payload) VALUES (${}, ${}::jsonb) RETURNING {}",
        qualified_table(schema, collection),
        id_n,
        payload_n,
        RETURNING
    );
    q
}

pub fn select_by_id(schema: &str, collection: &str, id: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(id);
    q.sql = format!(
        "SELECT {} FROM {} WHERE id = ${}",
        RETURNING,
        qualified_table(schema, collection),
        n
    );
    q
}

/// SELECT with filter, ORDER BY (insertion order when absent), LIMIT/OFFSET.
pub fn select_list(schema: &str, collection: &str, query: &FindQuery) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(schema, collection);
    let where_sql = where_clause(&mut q, &query.filter);
    let order_sql = match &query.order_by {
        Some(order) => {
            let expr = Column::for_field(&order.field).typed(&mut q);
            let dir = match order.order {
                SortOrder::Asc => "ASC NULLS FIRST",
                SortOrder::Desc => "DESC NULLS LAST",
            };
            format!(" ORDER BY {} {}, created_at, id", expr, dir)
        }
        None => " ORDER BY created_at, id".to_string(),
    };
    let limit_sql = query
        .take
        .map(|n| format!(" LIMIT {}", n.min(MAX_LIMIT)))
        .unwrap_or_default();
    let offset_sql = if query.skip > 0 {
        format!(" OFFSET {}", query.skip)
    } else {
        String::new()
    };
    q.sql = format!(
        "SELECT {} FROM {}{}{}{}{}",
        RETURNING, table, where_sql, order_sql, limit_sql, offset_sql
    );
    q
}

pub fn count(schema: &str, collection: &str, filter: &Filter) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(schema, collection);
    let where_sql = where_clause(&mut q, filter);
    q.sql = format!("SELECT COUNT(*) AS n FROM {}{}", table, where_sql);
    q
}

/// UPDATE by id: shallow-merge `patch` into the payload and bump `updated_at`.
pub fn update(schema: &str, collection: &str, id: &str, patch: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let patch_n = q.push_param(patch.to_string());
    let id_n = q.push_param(id);
    q.sql = format!(
        "UPDATE {} SET payload = payload || ${}::jsonb, updated_at = NOW() WHERE id = ${} RETURNING {}",
        qualified_table(schema, collection),
        patch_n,
        id_n,
        RETURNING
    );
    q
}

pub fn delete(schema: &str, collection: &str, id: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(id);
    q.sql = format!(
        "DELETE FROM {} WHERE id = ${} RETURNING {}",
        qualified_table(schema, collection),
        n,
        RETURNING
    );
    q
}
