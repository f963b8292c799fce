//! Entity handlers, generic over the record type: list, create, export, search, find, read, update, delete.

use crate::access::{ExportOptions, Record};
use crate::error::AppError;
use crate::response::{message, success_one, success_one_ok};
use crate::service::{RequestValidator, SearchParams};
use crate::state::EntityState;
use crate::store::{Document, OrderBy};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde_json::Value;
use std::collections::HashMap;

fn body_to_document(value: Value) -> Result<Document, AppError> {
    match value {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

fn path_id(params: &HashMap<String, String>) -> Result<String, AppError> {
    params
        .get("id")
        .cloned()
        .ok_or_else(|| AppError::BadRequest("missing id".into()))
}

fn comma_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn as_u64(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

fn as_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.eq_ignore_ascii_case("true") || s == "1",
        _ => false,
    }
}

/// Split a coerced querystring into field filters, paging parameters and the strict flag.
/// Keys handled here match `RESERVED_QUERY_KEYS`.
fn split_search(query: Document) -> (Vec<(String, Value)>, SearchParams, bool) {
    let mut params = SearchParams::default();
    let mut strict = false;
    let mut filters = Vec::new();
    for (key, value) in query {
        match key.as_str() {
            "page" => params.page = as_u64(&value),
            "take" => params.take = as_u64(&value),
            "orderBy" => params.order_by = value.as_str().map(str::to_string),
            "strict" => strict = as_flag(&value),
            "include" => {
                params.include = match &value {
                    Value::String(s) => comma_list(s),
                    Value::Array(items) => items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect(),
                    _ => Vec::new(),
                }
            }
            _ => filters.push((key, value)),
        }
    }
    (filters, params, strict)
}

fn export_options(query: &HashMap<String, String>) -> Result<ExportOptions, AppError> {
    let number = |key: &str| -> Result<Option<u64>, AppError> {
        query
            .get(key)
            .map(|v| {
                v.parse::<u64>()
                    .map_err(|_| AppError::Validation(format!("querystring/{} must be number", key)))
            })
            .transpose()
    };
    Ok(ExportOptions {
        take: number("take")?,
        skip: number("skip")?.unwrap_or(0),
        order_by: query.get("orderBy").and_then(|s| OrderBy::parse(s)),
        omit: query.get("omit").map(|s| comma_list(s)).unwrap_or_default(),
        keep: query.get("keep").map(|s| comma_list(s)).unwrap_or_default(),
    })
}

/// `GET /`: every record, unpaged.
pub async fn list<T: Record>(
    State(state): State<EntityState<T>>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    RequestValidator::coerce_query(&query, state.schemas.search.querystring.as_ref())?;
    let rows = state.service.get_all().await?;
    Ok(success_one_ok(rows))
}

/// `POST /`
pub async fn create<T: Record>(
    State(state): State<EntityState<T>>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    RequestValidator::validate_body(&body, state.schemas.create.body.as_ref())?;
    let data = body_to_document(body)?;
    let row = state.service.create(data).await?;
    Ok(success_one(row))
}

/// `GET /export/:format`
pub async fn export<T: Record>(
    State(state): State<EntityState<T>>,
    Path(format): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let options = export_options(&query)?;
    let export = state.service.export(&format, &options).await?;
    tracing::debug!(entity = %state.service.name(), format = %format, bytes = export.body.len(), "export");
    Ok(export)
}

/// `GET /search`: fuzzy and paginated; `strict=true` switches to exact match.
pub async fn search<T: Record>(
    State(state): State<EntityState<T>>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let coerced = RequestValidator::coerce_query(&query, state.schemas.search.querystring.as_ref())?;
    let (filters, params, strict) = split_search(coerced);
    let outcome = state.service.search(filters, &params, strict).await?;
    Ok(success_one_ok(outcome))
}

/// `GET /find`: first exact match or `null`.
pub async fn find<T: Record>(
    State(state): State<EntityState<T>>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let coerced = RequestValidator::coerce_query(&query, state.schemas.find.querystring.as_ref())?;
    let row = state.service.find(coerced.into_iter().collect()).await?;
    Ok(success_one_ok(row))
}

/// `GET /:id`
pub async fn read<T: Record>(
    State(state): State<EntityState<T>>,
    Path(params): Path<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    RequestValidator::validate_params(&params, state.schemas.get_or_delete.params.as_ref())?;
    let row = state.service.get_by_id(&path_id(&params)?).await?;
    Ok(success_one_ok(row))
}

/// `PUT /:id`
pub async fn update<T: Record>(
    State(state): State<EntityState<T>>,
    Path(params): Path<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    RequestValidator::validate_params(&params, state.schemas.update.params.as_ref())?;
    RequestValidator::validate_body(&body, state.schemas.update.body.as_ref())?;
    let data = body_to_document(body)?;
    let row = state.service.update(&path_id(&params)?, data).await?;
    Ok(success_one_ok(row))
}

/// `DELETE /:id`
pub async fn delete<T: Record>(
    State(state): State<EntityState<T>>,
    Path(params): Path<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    RequestValidator::validate_params(&params, state.schemas.get_or_delete.params.as_ref())?;
    state.service.delete(&path_id(&params)?).await?;
    Ok(message(format!("{} deleted successfully", state.service.name())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn search_query_is_split_into_filters_and_paging() {
        let query: Document = json!({
            "title": "abc",
            "page": 2,
            "take": 5,
            "orderBy": "title:desc",
            "strict": true,
            "include": "album, tags"
        })
        .as_object()
        .unwrap()
        .clone();
        let (filters, params, strict) = split_search(query);
        assert_eq!(filters, vec![("title".to_string(), json!("abc"))]);
        assert_eq!(params.page, Some(2));
        assert_eq!(params.take, Some(5));
        assert_eq!(params.order_by.as_deref(), Some("title:desc"));
        assert_eq!(params.include, vec!["album", "tags"]);
        assert!(strict);
    }

    #[test]
    fn export_options_parse_numbers_omit_and_keep() {
        let query: HashMap<String, String> = [("take", "5"), ("omit", "notes, secret"), ("keep", "id")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let options = export_options(&query).unwrap();
        assert_eq!(options.take, Some(5));
        assert_eq!(options.skip, 0);
        assert_eq!(options.omit, vec!["notes", "secret"]);
        assert_eq!(options.keep, vec!["id"]);

        let defaults = export_options(&HashMap::new()).unwrap();
        assert!(defaults.omit.is_empty() && defaults.keep.is_empty());

        let bad: HashMap<String, String> = [("skip".to_string(), "x".to_string())].into_iter().collect();
        assert!(matches!(export_options(&bad), Err(AppError::Validation(_))));
    }
}
