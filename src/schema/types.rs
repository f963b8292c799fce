//! Raw schema document types (DMMF-style JSON).

use serde::{Deserialize, Serialize};

/// Accepts `{"datamodel": {"models": [...]}}` or a bare `{"models": [...]}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaDocument {
    Wrapped { datamodel: DataModelConfig },
    Bare(DataModelConfig),
}

impl SchemaDocument {
    pub fn into_models(self) -> Vec<ModelConfig> {
        match self {
            SchemaDocument::Wrapped { datamodel } => datamodel.models,
            SchemaDocument::Bare(dm) => dm.models,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataModelConfig {
    pub models: Vec<ModelConfig>,
    #[serde(default)]
    pub enums: Vec<EnumConfig>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnumConfig {
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
}

fn default_required() -> bool {
    true
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldConfig {
    pub name: String,
    /// `scalar`, `object` or `enum`.
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default = "default_required")]
    pub is_required: bool,
    #[serde(default)]
    pub is_id: bool,
    #[serde(default)]
    pub is_list: bool,
    #[serde(default)]
    pub relation_name: Option<String>,
    #[serde(default)]
    pub relation_from_fields: Vec<String>,
    #[serde(default)]
    pub relation_to_fields: Vec<String>,
}
