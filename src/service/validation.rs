//! Request validation against JSON-schema fragments.
//!
//! Supports `type`, `required`, `properties`, `items` and the `date-time` format.

use crate::error::AppError;
use crate::store::Document;
use serde_json::{Map, Number, Value};
use std::collections::HashMap;

/// Schema fragments for one route. Absent parts are not checked.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RouteSchema {
    pub querystring: Option<Value>,
    pub params: Option<Value>,
    pub body: Option<Value>,
}

impl RouteSchema {
    pub fn querystring(schema: Value) -> Self {
        Self {
            querystring: Some(schema),
            ..Default::default()
        }
    }

    pub fn params(schema: Value) -> Self {
        Self {
            params: Some(schema),
            ..Default::default()
        }
    }

    pub fn body(schema: Value) -> Self {
        Self {
            body: Some(schema),
            ..Default::default()
        }
    }

    pub fn with_body(mut self, schema: Value) -> Self {
        self.body = Some(schema);
        self
    }
}

/// The five fragments every entity route module uses.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntitySchemas {
    pub search: RouteSchema,
    pub find: RouteSchema,
    pub get_or_delete: RouteSchema,
    pub create: RouteSchema,
    pub update: RouteSchema,
}

pub struct RequestValidator;

impl RequestValidator {
    pub fn validate_body(body: &Value, schema: Option<&Value>) -> Result<(), AppError> {
        match schema {
            Some(s) => check(body, s, "body"),
            None => Ok(()),
        }
    }

    pub fn validate_params(params: &HashMap<String, String>, schema: Option<&Value>) -> Result<(), AppError> {
        match schema {
            Some(s) => {
                let coerced = coerce(params, s, "params")?;
                check(&Value::Object(coerced), s, "params")
            }
            None => Ok(()),
        }
    }

    /// Coerces querystring values to their declared types, then validates.
    pub fn coerce_query(query: &HashMap<String, String>, schema: Option<&Value>) -> Result<Document, AppError> {
        match schema {
            Some(s) => {
                let coerced = coerce(query, s, "querystring")?;
                check(&Value::Object(coerced.clone()), s, "querystring")?;
                Ok(coerced)
            }
            None => Ok(query
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect()),
        }
    }
}

fn declared_type(schema: &Value) -> Option<&str> {
    schema.get("type").and_then(Value::as_str)
}

fn coerce(raw: &HashMap<String, String>, schema: &Value, scope: &str) -> Result<Document, AppError> {
    let properties = schema.get("properties").and_then(Value::as_object);
    let mut out = Map::new();
    for (key, text) in raw {
        let prop = properties.and_then(|p| p.get(key));
        let value = match prop {
            Some(p) => coerce_scalar(text, p).ok_or_else(|| {
                AppError::Validation(format!(
                    "{}/{} must be {}",
                    scope,
                    key,
                    declared_type(p).unwrap_or("valid")
                ))
            })?,
            None => Value::String(text.clone()),
        };
        out.insert(key.clone(), value);
    }
    Ok(out)
}

fn coerce_scalar(text: &str, schema: &Value) -> Option<Value> {
    match declared_type(schema) {
        Some("number") | Some("integer") => {
            if let Ok(n) = text.parse::<i64>() {
                return Some(Value::Number(n.into()));
            }
            text.parse::<f64>().ok().and_then(Number::from_f64).map(Value::Number)
        }
        Some("boolean") => match text {
            "true" | "1" => Some(Value::Bool(true)),
            "false" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        Some("array") => {
            let items = schema.get("items").cloned().unwrap_or(Value::Null);
            text.split(',')
                .map(|part| coerce_scalar(part.trim(), &items))
                .collect::<Option<Vec<_>>>()
                .map(Value::Array)
        }
        _ => Some(Value::String(text.to_string())),
    }
}

fn type_matches(value: &Value, ty: &str) -> bool {
    match ty {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn check(value: &Value, schema: &Value, path: &str) -> Result<(), AppError> {
    if let Some(ty) = declared_type(schema) {
        if !type_matches(value, ty) {
            return Err(AppError::Validation(format!("{} must be {}", path, ty)));
        }
    }
    if let (Some("date-time"), Some(s)) = (schema.get("format").and_then(Value::as_str), value.as_str()) {
        if chrono::DateTime::parse_from_rfc3339(s).is_err() {
            return Err(AppError::Validation(format!("{} must match format \"date-time\"", path)));
        }
    }
    if let Value::Object(map) = value {
        let required: Vec<&str> = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|r| r.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        for key in &required {
            if map.get(*key).map(Value::is_null).unwrap_or(true) {
                return Err(AppError::Validation(format!(
                    "{} must have required property '{}'",
                    path, key
                )));
            }
        }
        if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
            for (key, prop) in properties {
                match map.get(key) {
                    Some(Value::Null) | None => continue,
                    Some(v) => check(v, prop, &format!("{}/{}", path, key))?,
                }
            }
        }
    }
    if let (Value::Array(items), Some(item_schema)) = (value, schema.get("items")) {
        for (i, item) in items.iter().enumerate() {
            check(item, item_schema, &format!("{}/{}", path, i))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": {"type": "string"},
                "year": {"type": "number"},
                "releasedAt": {"type": "string", "format": "date-time"},
                "tags": {"type": "array", "items": {"type": "string"}}
            },
            "required": ["title"]
        })
    }

    #[test]
    fn missing_required_field_fails() {
        let err = RequestValidator::validate_body(&json!({"year": 1999}), Some(&create_schema())).unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m.contains("'title'")));
    }

    #[test]
    fn optional_null_is_accepted() {
        RequestValidator::validate_body(&json!({"title": "x", "year": null}), Some(&create_schema())).unwrap();
    }

    #[test]
    fn wrong_types_and_formats_fail() {
        let schema = create_schema();
        assert!(RequestValidator::validate_body(&json!({"title": 5}), Some(&schema)).is_err());
        assert!(RequestValidator::validate_body(&json!({"title": "x", "releasedAt": "yesterday"}), Some(&schema)).is_err());
        assert!(RequestValidator::validate_body(&json!({"title": "x", "tags": [1]}), Some(&schema)).is_err());
        RequestValidator::validate_body(&json!({"title": "x", "releasedAt": "2024-01-02T03:04:05Z"}), Some(&schema)).unwrap();
    }

    #[test]
    fn querystring_values_are_coerced() {
        let schema = json!({
            "type": "object",
            "properties": {"page": {"type": "number"}, "strict": {"type": "boolean"}, "title": {"type": "string"}}
        });
        let mut q = HashMap::new();
        q.insert("page".to_string(), "2".to_string());
        q.insert("strict".to_string(), "true".to_string());
        q.insert("title".to_string(), "12".to_string());
        let out = RequestValidator::coerce_query(&q, Some(&schema)).unwrap();
        assert_eq!(out["page"], json!(2));
        assert_eq!(out["strict"], json!(true));
        assert_eq!(out["title"], json!("12"));

        q.insert("page".to_string(), "two".to_string());
        assert!(RequestValidator::coerce_query(&q, Some(&schema)).is_err());
    }

    #[test]
    fn params_require_id() {
        let schema = json!({"type": "object", "properties": {"id": {"type": "string"}}, "required": ["id"]});
        assert!(RequestValidator::validate_params(&HashMap::new(), Some(&schema)).is_err());
        let mut p = HashMap::new();
        p.insert("id".to_string(), "abc".to_string());
        RequestValidator::validate_params(&p, Some(&schema)).unwrap();
    }
}
