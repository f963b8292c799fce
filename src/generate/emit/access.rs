//! Access layer: record struct, entity metadata and the `DataAccess` constructor.

use super::{regenerated_header, string_literal};
use crate::case::rust_ident;
use crate::generate::{ArtifactKind, GeneratedArtifact, Layout};
use crate::schema::{FieldDescriptor, ModelDescriptor};
use crate::store::ID_FIELD;
use std::fmt::Write as _;

/// Record struct name for a model.
pub fn record_type(model: &ModelDescriptor) -> String {
    rust_ident(&model.name)
}

fn serde_attr(field: &FieldDescriptor, rust_name: &str) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();
    // Store identity is always `id`, whatever the schema calls it.
    let wire = if field.is_identity { ID_FIELD } else { field.name.as_str() };
    if rust_name.trim_start_matches("r#") != wire {
        parts.push(format!("rename = {}", string_literal(wire)));
    }
    if field.is_relation || (field.is_optional && !field.is_list) {
        parts.push("default".into());
        parts.push("skip_serializing_if = \"Option::is_none\"".into());
    } else if field.is_list {
        parts.push("default".into());
    }
    if parts.is_empty() {
        None
    } else {
        Some(format!("#[serde({})]", parts.join(", ")))
    }
}

fn record_struct(model: &ModelDescriptor) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "#[derive(Clone, Debug, Serialize, Deserialize)]");
    let _ = writeln!(out, "pub struct {} {{", record_type(model));
    for field in &model.fields {
        let rust_name = ModelDescriptor::rust_field_name(field);
        if let Some(attr) = serde_attr(field, &rust_name) {
            let _ = writeln!(out, "    {}", attr);
        }
        let _ = writeln!(out, "    pub {}: {},", rust_name, field.rust_type());
    }
    out.push_str("}\n");
    out
}

fn entity_fn(model: &ModelDescriptor) -> String {
    let meta = model.entity_meta();
    let mut out = String::new();
    let _ = writeln!(out, "pub fn entity() -> EntityMeta {{");
    let _ = write!(
        out,
        "    EntityMeta::new({}, {})",
        string_literal(&meta.name),
        string_literal(&meta.collection)
    );
    for r in &meta.relations {
        let ctor = if r.many { "to_many" } else { "to_one" };
        let _ = write!(
            out,
            "\n        .with_relation(RelationMeta::{}({}, {}, {}, {}))",
            ctor,
            string_literal(&r.name),
            string_literal(&r.collection),
            string_literal(&r.local_key),
            string_literal(&r.foreign_key)
        );
    }
    out.push_str("\n}\n");
    out
}

pub fn emit(model: &ModelDescriptor, layout: &Layout) -> GeneratedArtifact {
    let krate = layout.crate_ident();
    let has_relations = !model.entity_meta().relations.is_empty();
    let access_imports = if has_relations {
        "DataAccess, EntityMeta, RelationMeta"
    } else {
        "DataAccess, EntityMeta"
    };
    let record = record_type(model);

    let mut contents = regenerated_header(model);
    let _ = write!(
        contents,
        "\nuse std::sync::Arc;\n\nuse {krate}::access::{{{access_imports}}};\nuse {krate}::store::RecordStore;\nuse serde::{{Deserialize, Serialize}};\n\n"
    );
    contents.push_str(&record_struct(model));
    contents.push('\n');
    contents.push_str(&entity_fn(model));
    let _ = write!(
        contents,
        "\npub fn access(store: Arc<dyn RecordStore>) -> DataAccess<{record}> {{\n    DataAccess::new(store, entity())\n}}\n"
    );

    GeneratedArtifact {
        path: layout.file(ArtifactKind::Access, &model.module_name()),
        contents,
    }
}
