//! Reads a DMMF-style schema document into model descriptors.

use crate::error::GenerateError;
use crate::schema::{
    validate, FieldConfig, FieldDescriptor, ModelConfig, ModelDescriptor, RelationDescriptor, ScalarType,
    SchemaDocument,
};
use std::path::Path;

/// Missing, unreadable, unparseable or structurally invalid input is `SchemaUnavailable`.
pub fn parse_schema(path: &Path) -> Result<Vec<ModelDescriptor>, GenerateError> {
    let text = std::fs::read_to_string(path).map_err(|e| GenerateError::SchemaUnavailable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    parse_schema_str(&text, path)
}

/// Parses schema text; `origin` is only used in error reports.
pub fn parse_schema_str(text: &str, origin: &Path) -> Result<Vec<ModelDescriptor>, GenerateError> {
    let unavailable = |reason: String| GenerateError::SchemaUnavailable {
        path: origin.to_path_buf(),
        reason,
    };
    let doc: SchemaDocument = serde_json::from_str(text).map_err(|e| unavailable(e.to_string()))?;
    let models = doc.into_models();
    validate(&models).map_err(|e| unavailable(e.to_string()))?;
    let descriptors: Vec<ModelDescriptor> = models.iter().map(|m| describe(m, &models)).collect();
    tracing::debug!(path = %origin.display(), models = descriptors.len(), "schema parsed");
    Ok(descriptors)
}

fn describe_field(f: &FieldConfig) -> FieldDescriptor {
    let is_relation = f.relation_name.is_some();
    FieldDescriptor {
        name: f.name.clone(),
        scalar_type: ScalarType::parse(&f.type_name),
        is_optional: !f.is_required,
        is_identity: f.is_id,
        is_relation,
        relation_target: is_relation.then(|| f.type_name.clone()),
        is_list: f.is_list,
    }
}

/// Join keys for a relation field. The side without declared keys borrows the
/// opposite field's keys, reversed.
fn join_fields(model: &ModelConfig, f: &FieldConfig, all: &[ModelConfig]) -> (Vec<String>, Vec<String>) {
    if !f.relation_from_fields.is_empty() && !f.relation_to_fields.is_empty() {
        return (f.relation_from_fields.clone(), f.relation_to_fields.clone());
    }
    let opposite = all
        .iter()
        .filter(|m| m.name == f.type_name)
        .flat_map(|m| m.fields.iter())
        .find(|o| {
            o.relation_name == f.relation_name
                && o.type_name == model.name
                && !(o.name == f.name && model.name == f.type_name)
        });
    match opposite {
        Some(o) if !o.relation_from_fields.is_empty() => (o.relation_to_fields.clone(), o.relation_from_fields.clone()),
        _ => (Vec::new(), Vec::new()),
    }
}

fn describe(model: &ModelConfig, all: &[ModelConfig]) -> ModelDescriptor {
    let fields = model.fields.iter().map(describe_field).collect();
    let relations = model
        .fields
        .iter()
        .filter_map(|f| {
            let relation_name = f.relation_name.clone()?;
            let (from_fields, to_fields) = join_fields(model, f, all);
            Some(RelationDescriptor {
                name: f.name.clone(),
                target: f.type_name.clone(),
                relation_name,
                is_list: f.is_list,
                from_fields,
                to_fields,
            })
        })
        .collect();
    ModelDescriptor {
        name: model.name.clone(),
        fields,
        relations,
    }
}
