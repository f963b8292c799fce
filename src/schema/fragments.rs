//! Request-validation fragments derived from a model.

use crate::schema::{FieldDescriptor, ModelDescriptor, TargetType};
use crate::service::{EntitySchemas, RouteSchema};
use serde_json::{json, Map, Value};

/// Querystring keys the search route reserves for paging.
pub const RESERVED_QUERY_KEYS: [&str; 5] = ["page", "take", "orderBy", "strict", "include"];

pub fn field_schema(field: &FieldDescriptor) -> Value {
    let scalar = if field.is_identity {
        json!({"type": "string"})
    } else {
        match field.scalar_type.target() {
            TargetType::String => json!({"type": "string"}),
            TargetType::Number => json!({"type": "number"}),
            TargetType::Boolean => json!({"type": "boolean"}),
            TargetType::DateTime => json!({"type": "string", "format": "date-time"}),
            TargetType::Binary => json!({"type": "string", "format": "binary"}),
            TargetType::Untyped => json!({}),
        }
    };
    if field.is_list {
        json!({"type": "array", "items": scalar})
    } else {
        scalar
    }
}

fn object<'a>(fields: impl Iterator<Item = &'a FieldDescriptor>) -> Map<String, Value> {
    fields.map(|f| (f.name.clone(), field_schema(f))).collect()
}

fn id_params() -> Value {
    json!({
        "type": "object",
        "properties": {"id": {"type": "string"}},
        "required": ["id"]
    })
}

fn search(model: &ModelDescriptor) -> Value {
    let mut properties = object(model.fields.iter().filter(|f| !f.is_relation));
    let reserved = [
        ("page", json!({"type": "number"})),
        ("take", json!({"type": "number"})),
        ("orderBy", json!({"type": "string"})),
        ("strict", json!({"type": "boolean"})),
        ("include", json!({"type": "string"})),
    ];
    for (key, schema) in reserved {
        properties.entry(key.to_string()).or_insert(schema);
    }
    json!({"type": "object", "properties": properties})
}

fn find(model: &ModelDescriptor) -> Value {
    let properties = match model.identity_field() {
        Some(f) => object(std::iter::once(f)),
        None => object(std::iter::empty()),
    };
    json!({"type": "object", "properties": properties})
}

fn create(model: &ModelDescriptor) -> Value {
    let writable: Vec<&FieldDescriptor> = model
        .fields
        .iter()
        .filter(|f| !f.is_identity && !f.is_relation && !f.is_timestamp())
        .collect();
    let required: Vec<&str> = writable
        .iter()
        .filter(|f| !f.is_optional)
        .map(|f| f.name.as_str())
        .collect();
    json!({
        "type": "object",
        "properties": object(writable.into_iter()),
        "required": required
    })
}

fn update(model: &ModelDescriptor) -> Value {
    json!({
        "type": "object",
        "properties": object(model.fields.iter().filter(|f| !f.is_relation))
    })
}

pub fn build_schemas(model: &ModelDescriptor) -> EntitySchemas {
    EntitySchemas {
        search: RouteSchema::querystring(search(model)),
        find: RouteSchema::querystring(find(model)),
        get_or_delete: RouteSchema::params(id_params()),
        create: RouteSchema::body(create(model)),
        update: RouteSchema::params(id_params()).with_body(update(model)),
    }
}
