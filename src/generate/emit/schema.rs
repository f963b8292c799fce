use super::{json_literal, regenerated_header};
use crate::generate::{ArtifactKind, GeneratedArtifact, Layout};
use crate::schema::{build_schemas, ModelDescriptor};
use serde_json::Value;

fn fragment(ctor: &str, schema: &Value) -> String {
    format!("RouteSchema::{}({})", ctor, json_literal(schema, 8))
}

pub fn emit(model: &ModelDescriptor, layout: &Layout) -> GeneratedArtifact {
    let krate = layout.crate_ident();
    let schemas = build_schemas(model);
    let empty = Value::Object(Default::default());
    let pick = |v: &Option<Value>| v.clone().unwrap_or_else(|| empty.clone());

    let update = format!(
        "{}\n            .with_body({})",
        fragment("params", &pick(&schemas.update.params)),
        json_literal(&pick(&schemas.update.body), 12)
    );
    let contents = format!(
        "{header}
use {krate}::service::{{EntitySchemas, RouteSchema}};
use serde_json::json;

pub fn schemas() -> EntitySchemas {{
    EntitySchemas {{
        search: {search},
        find: {find},
        get_or_delete: {get_or_delete},
        create: {create},
        update: {update},
    }}
}}
",
        header = regenerated_header(model),
        search = fragment("querystring", &pick(&schemas.search.querystring)),
        find = fragment("querystring", &pick(&schemas.find.querystring)),
        get_or_delete = fragment("params", &pick(&schemas.get_or_delete.params)),
        create = fragment("body", &pick(&schemas.create.body)),
    );
    GeneratedArtifact {
        path: layout.file(ArtifactKind::Schema, &model.module_name()),
        contents,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parse_schema_str;
    use serde_json::json;
    use std::path::Path;

    #[test]
    fn fragments_are_embedded_as_json_literals() {
        let text = json!({"models": [{"name": "Song", "fields": [
            {"name": "id", "type": "String", "isId": true},
            {"name": "title", "type": "String"}
        ]}]})
        .to_string();
        let song = parse_schema_str(&text, Path::new("s.json")).unwrap().remove(0);
        let c = emit(&song, &Layout::new("src", "app")).contents;
        assert!(c.contains("use app::service::{EntitySchemas, RouteSchema};"));
        assert!(c.contains("search: RouteSchema::querystring(json!({"));
        assert!(c.contains("create: RouteSchema::body(json!({"));
        assert!(c.contains("\"required\": [\n"));
        assert!(c.contains("update: RouteSchema::params(json!({"));
        assert!(c.contains(".with_body(json!({"));
    }

    #[test]
    fn literal_round_trips_through_json() {
        let value = json!({"type": "object", "properties": {"a": {"type": "number"}}});
        let lit = json_literal(&value, 4);
        let inner = lit.trim_start_matches("json!(").trim_end_matches(')');
        let parsed: Value = serde_json::from_str(inner).unwrap();
        assert_eq!(parsed, value);
    }
}
