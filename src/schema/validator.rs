//! Structural checks on a parsed schema document.

use crate::schema::ModelConfig;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SchemaIssue {
    #[error("schema declares no models")]
    NoModels,
    #[error("duplicate model '{0}'")]
    DuplicateModel(String),
    #[error("duplicate field '{field}' on model '{model}'")]
    DuplicateField { model: String, field: String },
    #[error("relation field '{model}.{field}' targets unknown model '{target}'")]
    MissingRelationTarget {
        model: String,
        field: String,
        target: String,
    },
}

pub fn validate(models: &[ModelConfig]) -> Result<(), SchemaIssue> {
    if models.is_empty() {
        return Err(SchemaIssue::NoModels);
    }
    let mut names: HashSet<&str> = HashSet::new();
    for m in models {
        if !names.insert(m.name.as_str()) {
            return Err(SchemaIssue::DuplicateModel(m.name.clone()));
        }
    }
    for m in models {
        let mut fields: HashSet<&str> = HashSet::new();
        for f in &m.fields {
            if !fields.insert(f.name.as_str()) {
                return Err(SchemaIssue::DuplicateField {
                    model: m.name.clone(),
                    field: f.name.clone(),
                });
            }
            if f.relation_name.is_some() && !names.contains(f.type_name.as_str()) {
                return Err(SchemaIssue::MissingRelationTarget {
                    model: m.name.clone(),
                    field: f.name.clone(),
                    target: f.type_name.clone(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaDocument;
    use serde_json::json;

    fn models(v: serde_json::Value) -> Vec<ModelConfig> {
        serde_json::from_value::<SchemaDocument>(v).unwrap().into_models()
    }

    #[test]
    fn empty_schema_is_rejected() {
        assert_eq!(validate(&[]), Err(SchemaIssue::NoModels));
    }

    #[test]
    fn duplicates_are_rejected() {
        let m = models(json!({"models": [{"name": "Song", "fields": []}, {"name": "Song", "fields": []}]}));
        assert_eq!(validate(&m), Err(SchemaIssue::DuplicateModel("Song".into())));

        let m = models(json!({"models": [{"name": "Song", "fields": [
            {"name": "id", "type": "String"}, {"name": "id", "type": "String"}
        ]}]}));
        assert!(matches!(validate(&m), Err(SchemaIssue::DuplicateField { .. })));
    }

    #[test]
    fn relation_targets_must_exist() {
        let m = models(json!({"models": [{"name": "Song", "fields": [
            {"name": "album", "kind": "object", "type": "Album", "relationName": "AlbumToSong"}
        ]}]}));
        assert!(matches!(validate(&m), Err(SchemaIssue::MissingRelationTarget { ref target, .. }) if target == "Album"));
    }
}
