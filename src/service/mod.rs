//! Generic service layer: paging defaults, not-found policy and export dispatch.

mod validation;

pub use validation::{EntitySchemas, RequestValidator, RouteSchema};

use crate::access::{DataAccess, ExportOptions, Page, Record, SearchOptions};
use crate::error::AppError;
use crate::export::{Export, ExportFormat};
use crate::store::{Document, OrderBy};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_TAKE: u64 = 10;

/// Paging knobs as the HTTP surface receives them.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    /// 1-based; absent or 0 is page 1.
    pub page: Option<u64>,
    /// Absent or 0 falls back to [`DEFAULT_TAKE`].
    pub take: Option<u64>,
    pub order_by: Option<String>,
    #[serde(default)]
    pub include: Vec<String>,
}

impl SearchParams {
    /// `skip` is `page - 1`, not `(page - 1) * take`.
    pub fn options(&self) -> SearchOptions {
        let page = self.page.filter(|p| *p > 0).unwrap_or(1);
        SearchOptions {
            take: Some(self.take.filter(|t| *t > 0).unwrap_or(DEFAULT_TAKE)),
            skip: page - 1,
            order_by: self.order_by.as_deref().and_then(OrderBy::parse),
            include: self.include.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum SearchOutcome<T> {
    Exact(Vec<T>),
    Paged(Page<T>),
}

pub struct Service<T = Value> {
    access: DataAccess<T>,
}

impl<T> Clone for Service<T> {
    fn clone(&self) -> Self {
        Self {
            access: self.access.clone(),
        }
    }
}

impl<T: Record> Service<T> {
    pub fn new(access: DataAccess<T>) -> Self {
        Self { access }
    }

    pub fn access(&self) -> &DataAccess<T> {
        &self.access
    }

    pub fn name(&self) -> &str {
        &self.access.entity().name
    }

    fn not_found(&self) -> AppError {
        AppError::NotFound(format!("{} not found", self.name()))
    }

    /// Rewrites store-level not-found into the entity's message.
    fn entity_not_found(&self, err: AppError) -> AppError {
        match err {
            AppError::NotFound(_) => self.not_found(),
            other => other,
        }
    }

    pub async fn create(&self, data: Document) -> Result<T, AppError> {
        self.access.create(data).await
    }

    pub async fn create_many(&self, items: Vec<Document>) -> Result<Vec<T>, AppError> {
        self.access.create_many(items).await
    }

    pub async fn get_all(&self) -> Result<Vec<T>, AppError> {
        self.access.get_all().await
    }

    pub async fn get_by_id(&self, id: &str) -> Result<T, AppError> {
        self.access.get_by_id(id).await?.ok_or_else(|| self.not_found())
    }

    pub async fn update(&self, id: &str, partial: Document) -> Result<T, AppError> {
        self.access
            .update(id, partial)
            .await
            .map_err(|e| self.entity_not_found(e))
    }

    pub async fn update_many(&self, items: Vec<Document>) -> Result<Vec<T>, AppError> {
        self.access
            .update_many(items)
            .await
            .map_err(|e| self.entity_not_found(e))
    }

    pub async fn delete(&self, id: &str) -> Result<T, AppError> {
        self.access.delete(id).await.map_err(|e| self.entity_not_found(e))
    }

    /// Exact search when `strict`, fuzzy paginated search otherwise.
    pub async fn search(
        &self,
        filters: Vec<(String, Value)>,
        params: &SearchParams,
        strict: bool,
    ) -> Result<SearchOutcome<T>, AppError> {
        let options = params.options();
        if strict {
            Ok(SearchOutcome::Exact(self.access.search(filters, &options).await?))
        } else {
            Ok(SearchOutcome::Paged(self.access.paginated_search(filters, &options).await?))
        }
    }

    /// First exact match.
    pub async fn find(&self, filters: Vec<(String, Value)>) -> Result<Option<T>, AppError> {
        let options = SearchOptions {
            take: Some(1),
            ..Default::default()
        };
        Ok(self.access.search(filters, &options).await?.into_iter().next())
    }

    pub async fn export(&self, format: &str, options: &ExportOptions) -> Result<Export, AppError> {
        let format: ExportFormat = format.parse()?;
        self.access.export_as(format, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::EntityMeta;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::sync::Arc;

    fn service() -> Service {
        Service::new(DataAccess::new(Arc::new(MemoryStore::new()), EntityMeta::for_model("Song")))
    }

    #[test]
    fn page_maps_to_skip_literally() {
        let params = SearchParams { page: Some(3), take: Some(20), ..Default::default() };
        let opts = params.options();
        assert_eq!(opts.skip, 2);
        assert_eq!(opts.take, Some(20));

        let opts = SearchParams { page: Some(0), take: Some(0), ..Default::default() }.options();
        assert_eq!(opts.skip, 0);
        assert_eq!(opts.take, Some(DEFAULT_TAKE));
    }

    #[tokio::test]
    async fn get_by_id_is_not_found_when_absent() {
        let err = service().get_by_id("nope").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref m) if m == "Song not found"));
    }

    #[tokio::test]
    async fn delete_missing_is_entity_not_found() {
        let err = service().delete("nope").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref m) if m == "Song not found"));
    }

    #[tokio::test]
    async fn unknown_export_format_is_rejected() {
        let err = service().export("xml", &ExportOptions::default()).await.unwrap_err();
        assert!(matches!(err, AppError::UnsupportedFormat(_)));
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn strict_flag_selects_exact_search() {
        let svc = service();
        svc.create(json!({"title": "abc"}).as_object().cloned().unwrap()).await.unwrap();
        let filters = vec![("title".to_string(), json!("ab"))];
        match svc.search(filters.clone(), &SearchParams::default(), true).await.unwrap() {
            SearchOutcome::Exact(rows) => assert!(rows.is_empty()),
            other => panic!("expected exact, got {:?}", other),
        }
        match svc.search(filters, &SearchParams::default(), false).await.unwrap() {
            SearchOutcome::Paged(page) => assert_eq!(page.count, 1),
            other => panic!("expected page, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn find_returns_first_exact_match() {
        let svc = service();
        assert!(svc.find(vec![("title".into(), json!("a"))]).await.unwrap().is_none());
        svc.create(json!({"title": "a"}).as_object().cloned().unwrap()).await.unwrap();
        svc.create(json!({"title": "a"}).as_object().cloned().unwrap()).await.unwrap();
        assert!(svc.find(vec![("title".into(), json!("a"))]).await.unwrap().is_some());
    }
}
