//! Introspected model descriptors used by the emitters and the runtime.

use crate::access::{EntityMeta, RelationMeta};
use crate::case::{rust_field_ident, rust_ident};

/// Schema scalar type. Unknown names (enums, relation targets) land in `Other`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScalarType {
    String,
    Int,
    Float,
    Boolean,
    DateTime,
    Json,
    BigInt,
    Decimal,
    Bytes,
    Other(String),
}

/// Representation in validation fragments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetType {
    String,
    Number,
    Boolean,
    DateTime,
    Binary,
    Untyped,
}

impl ScalarType {
    pub fn parse(name: &str) -> Self {
        match name {
            "String" => ScalarType::String,
            "Int" => ScalarType::Int,
            "Float" => ScalarType::Float,
            "Boolean" => ScalarType::Boolean,
            "DateTime" => ScalarType::DateTime,
            "Json" => ScalarType::Json,
            "BigInt" => ScalarType::BigInt,
            "Decimal" => ScalarType::Decimal,
            "Bytes" => ScalarType::Bytes,
            other => ScalarType::Other(other.to_string()),
        }
    }

    pub fn target(&self) -> TargetType {
        match self {
            ScalarType::String => TargetType::String,
            ScalarType::Int | ScalarType::Float | ScalarType::BigInt | ScalarType::Decimal => TargetType::Number,
            ScalarType::Boolean => TargetType::Boolean,
            ScalarType::DateTime => TargetType::DateTime,
            ScalarType::Bytes => TargetType::Binary,
            ScalarType::Json | ScalarType::Other(_) => TargetType::Untyped,
        }
    }

    /// Rust type used for a record field of this scalar. Binary payloads travel as base64 text.
    pub fn rust_type(&self) -> &'static str {
        match self {
            ScalarType::String | ScalarType::DateTime => "String",
            ScalarType::Int | ScalarType::BigInt => "i64",
            ScalarType::Float | ScalarType::Decimal => "f64",
            ScalarType::Boolean => "bool",
            ScalarType::Bytes => "String",
            ScalarType::Json | ScalarType::Other(_) => "serde_json::Value",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub scalar_type: ScalarType,
    pub is_optional: bool,
    pub is_identity: bool,
    pub is_relation: bool,
    /// Set exactly when `is_relation`.
    pub relation_target: Option<String>,
    pub is_list: bool,
}

impl FieldDescriptor {
    pub fn is_timestamp(&self) -> bool {
        matches!(self.name.as_str(), "createdAt" | "updatedAt" | "created_at" | "updated_at")
    }

    /// Rust type for this field inside the generated record struct.
    pub fn rust_type(&self) -> String {
        if self.is_relation {
            return "Option<serde_json::Value>".to_string();
        }
        let base = if self.is_identity {
            "String"
        } else {
            self.scalar_type.rust_type()
        };
        if self.is_list {
            format!("Vec<{}>", base)
        } else if self.is_optional {
            format!("Option<{}>", base)
        } else {
            base.to_string()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelationDescriptor {
    /// Field name on the owning model.
    pub name: String,
    pub target: String,
    pub relation_name: String,
    pub is_list: bool,
    pub from_fields: Vec<String>,
    pub to_fields: Vec<String>,
}

impl RelationDescriptor {
    /// `(local_key, foreign_key)` used to join onto the target collection.
    pub fn join_keys(&self) -> Option<(&str, &str)> {
        match (self.from_fields.first(), self.to_fields.first()) {
            (Some(from), Some(to)) => Some((from.as_str(), to.as_str())),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelDescriptor {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
    pub relations: Vec<RelationDescriptor>,
}

impl ModelDescriptor {
    /// Lower-cased model name: module file stem and store collection.
    pub fn module_name(&self) -> String {
        self.name.to_lowercase()
    }

    /// Module name as a Rust identifier (`type` becomes `r#type`).
    pub fn module_ident(&self) -> String {
        rust_ident(&self.module_name())
    }

    pub fn collection(&self) -> String {
        self.module_name()
    }

    pub fn route_prefix(&self) -> String {
        format!("/{}s", self.module_name())
    }

    /// Rust struct field name for a schema field.
    pub fn rust_field_name(field: &FieldDescriptor) -> String {
        rust_field_ident(&field.name)
    }

    pub fn identity_field(&self) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.is_identity)
    }

    /// Runtime metadata: collection plus every relation with resolvable join keys.
    pub fn entity_meta(&self) -> EntityMeta {
        self.relations
            .iter()
            .filter_map(|r| {
                let (local, foreign) = r.join_keys()?;
                let collection = r.target.to_lowercase();
                Some(if r.is_list {
                    RelationMeta::to_many(r.name.clone(), collection, local, foreign)
                } else {
                    RelationMeta::to_one(r.name.clone(), collection, local, foreign)
                })
            })
            .fold(EntityMeta::for_model(&self.name), EntityMeta::with_relation)
    }
}
