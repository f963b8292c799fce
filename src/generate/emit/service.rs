use super::regenerated_header;
use super::access::record_type;
use crate::generate::{ArtifactKind, GeneratedArtifact, Layout};
use crate::schema::ModelDescriptor;

pub fn emit(model: &ModelDescriptor, layout: &Layout) -> GeneratedArtifact {
    let krate = layout.crate_ident();
    let module = model.module_ident();
    let record = record_type(model);
    let alias = format!("{}Service", record.trim_start_matches("r#"));
    let contents = format!(
        "{header}
use std::sync::Arc;

use {krate}::service::Service;
use {krate}::store::RecordStore;

use crate::access::{module}::{{access, {record}}};

pub type {alias} = Service<{record}>;

pub fn service(store: Arc<dyn RecordStore>) -> {alias} {{
    Service::new(access(store))
}}
",
        header = regenerated_header(model),
    );
    GeneratedArtifact {
        path: layout.file(ArtifactKind::Service, &model.module_name()),
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
    fn service_wraps_access() {
        let text = json!({"models": [{"name": "Song", "fields": [{"name": "id", "type": "String", "isId": true}]}]}).to_string();
        let song = parse_schema_str(&text, Path::new("s.json")).unwrap().remove(0);
        let artifact = emit(&song, &Layout::new("out", "app"));
        assert_eq!(artifact.path, Path::new("out/services/song.rs"));
        assert!(artifact.contents.contains("use crate::access::song::{access, Song};"));
        assert!(artifact.contents.contains("pub type SongService = Service<Song>;"));
        assert!(artifact.contents.contains("pub fn service(store: Arc<dyn RecordStore>) -> SongService {\n    Service::new(access(store))\n}"));
    }
}
