//! Template emitters: one pure function per layer, model in, artifact out.

pub mod access;
pub mod route;
pub mod schema;
pub mod service;

use crate::schema::ModelDescriptor;
use serde_json::Value;

pub(crate) fn header(model: &ModelDescriptor, note: &str) -> String {
    format!("// Generated by scaffold from model `{}`. {}\n", model.name, note)
}

/// Header for files rewritten on every run.
pub(crate) fn regenerated_header(model: &ModelDescriptor) -> String {
    header(model, "Overwritten on every run; do not edit.")
}

/// `json!` literal for `value`, continuation lines indented by `indent` spaces.
pub(crate) fn json_literal(value: &Value, indent: usize) -> String {
    let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    let pad = " ".repeat(indent);
    let body = pretty
        .lines()
        .enumerate()
        .map(|(i, line)| if i == 0 { line.to_string() } else { format!("{}{}", pad, line) })
        .collect::<Vec<_>>()
        .join("\n");
    format!("json!({})", body)
}

/// Rust string literal.
pub(crate) fn string_literal(s: &str) -> String {
    format!("{:?}", s)
}
