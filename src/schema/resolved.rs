//! Resolved entity model: descriptors flattened for runtime routing.

use crate::access::EntityMeta;
use crate::schema::{build_schemas, ModelDescriptor};
use crate::service::EntitySchemas;
use std::collections::HashMap;

#[derive(Clone, Debug)]
pub struct ResolvedEntity {
    pub meta: EntityMeta,
    /// Route segment without the leading slash, e.g. `songs`.
    pub path_segment: String,
    pub schemas: EntitySchemas,
}

#[derive(Clone, Debug, Default)]
pub struct ResolvedModel {
    pub entities: Vec<ResolvedEntity>,
    pub entity_by_path: HashMap<String, ResolvedEntity>,
}

impl ResolvedModel {
    pub fn entity_by_path(&self, path: &str) -> Option<&ResolvedEntity> {
        self.entity_by_path.get(path)
    }
}

pub fn resolve(models: &[ModelDescriptor]) -> ResolvedModel {
    let entities: Vec<ResolvedEntity> = models
        .iter()
        .map(|m| ResolvedEntity {
            meta: m.entity_meta(),
            path_segment: m.route_prefix().trim_start_matches('/').to_string(),
            schemas: build_schemas(m),
        })
        .collect();
    let entity_by_path = entities
        .iter()
        .map(|e| (e.path_segment.clone(), e.clone()))
        .collect();
    ResolvedModel {
        entities,
        entity_by_path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parse_schema_str;
    use serde_json::json;
    use std::path::Path;

    #[test]
    fn entities_are_keyed_by_path_segment() {
        let text = json!({"models": [
            {"name": "Song", "fields": [{"name": "id", "type": "String", "isId": true}]},
            {"name": "Playlist", "fields": [{"name": "id", "type": "String", "isId": true}]}
        ]})
        .to_string();
        let model = resolve(&parse_schema_str(&text, Path::new("s.json")).unwrap());
        assert_eq!(model.entities.len(), 2);
        let song = model.entity_by_path("songs").unwrap();
        assert_eq!(song.meta.name, "Song");
        assert_eq!(song.meta.collection, "song");
        assert!(model.entity_by_path("song").is_none());
    }
}
