//! Export encoders: PDF, CSV, JSON and XLSX renditions of a record list.

mod csv;
mod pdf;
mod xlsx;

use crate::error::AppError;
use crate::store::{text_of, Document};
use axum::{
    http::header,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Pdf,
    Csv,
    Json,
    Xlsx,
}

impl FromStr for ExportFormat {
    type Err = AppError;

    /// Case-insensitive; anything else is `UnsupportedFormat`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(ExportFormat::Pdf),
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "xlsx" => Ok(ExportFormat::Xlsx),
            _ => Err(AppError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl ExportFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Csv => "text/csv",
            ExportFormat::Json => "application/json",
            ExportFormat::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Xlsx => "xlsx",
        }
    }
}

/// Encoded payload plus the headers it is served with.
#[derive(Debug)]
pub struct Export {
    pub format: ExportFormat,
    pub file_name: String,
    pub body: Vec<u8>,
}

impl Export {
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename={}", self.file_name)
    }
}

impl IntoResponse for Export {
    fn into_response(self) -> Response {
        let disposition = self.content_disposition();
        (
            [
                (header::CONTENT_TYPE, self.format.content_type().to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            self.body,
        )
            .into_response()
    }
}

/// Header row and cell values taken from a list of documents.
pub(crate) struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    fn from_documents(docs: &[Document]) -> Self {
        let columns = columns(docs);
        let rows = docs
            .iter()
            .map(|d| {
                columns
                    .iter()
                    .map(|c| d.get(c).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        Table { columns, rows }
    }

    pub fn text_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|r| r.iter().map(text_of).collect())
            .collect()
    }
}

/// Union of keys across documents, in first-seen order.
pub fn columns(docs: &[Document]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for doc in docs {
        for key in doc.keys() {
            if !out.iter().any(|c| c == key) {
                out.push(key.clone());
            }
        }
    }
    out
}

/// Encodes `docs` for `entity_name`; the file is named `<entity_name>.<ext>`.
pub fn encode(format: ExportFormat, entity_name: &str, docs: &[Document]) -> Result<Export, AppError> {
    let body = match format {
        ExportFormat::Json => serde_json::to_vec_pretty(docs).map_err(|e| AppError::Export(e.to_string()))?,
        ExportFormat::Csv => csv::render(&Table::from_documents(docs))?,
        ExportFormat::Xlsx => xlsx::render(entity_name, &Table::from_documents(docs))?,
        ExportFormat::Pdf => pdf::render(entity_name, &Table::from_documents(docs)),
    };
    tracing::debug!(entity = entity_name, format = format.extension(), rows = docs.len(), bytes = body.len(), "export encoded");
    Ok(Export {
        format,
        file_name: format!("{}.{}", entity_name, format.extension()),
        body,
    })
}
