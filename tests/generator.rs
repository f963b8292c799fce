//! Generator runs against a temporary output tree.

use scaffold_sdk::generate::{ArtifactKind, IndexContents};
use scaffold_sdk::{GenerateError, Generator, GeneratorSettings};
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_schema(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("schema.json");
    let schema = json!({"datamodel": {"models": [
        {"name": "Song", "fields": [
            {"name": "id", "type": "String", "isId": true},
            {"name": "title", "type": "String"}
        ]},
        {"name": "SongList", "fields": [
            {"name": "id", "type": "String", "isId": true},
            {"name": "name", "type": "String"}
        ]}
    ]}});
    fs::write(&path, schema.to_string()).unwrap();
    path
}

fn generator(tmp: &TempDir) -> Generator {
    Generator::new(GeneratorSettings {
        schema_path: write_schema(tmp.path()),
        out_dir: tmp.path().join("src"),
        crate_name: "my-app".to_string(),
    })
}

fn read(path: impl AsRef<Path>) -> String {
    fs::read_to_string(path).unwrap()
}

#[test]
fn full_run_writes_every_layer_and_index() {
    let tmp = TempDir::new().unwrap();
    let scaffold = generator(&tmp);
    let report = scaffold.run(None).unwrap();
    assert!(report.is_clean());
    assert_eq!(report.generated.len(), 8);

    let layout = scaffold.layout();
    for kind in ArtifactKind::ALL {
        assert!(layout.file(kind, "song").exists());
        assert!(layout.file(kind, "songlist").exists());
        let index = IndexContents::parse(&read(layout.index(kind)));
        assert_eq!(index.imports, vec!["song", "songlist"]);
    }
    let routes = IndexContents::parse(&read(layout.index(ArtifactKind::Route)));
    assert_eq!(routes.registrations.len(), 2);
    assert!(read(layout.file(ArtifactKind::Access, "song")).contains("use my_app::access::"));
}

#[test]
fn targeted_run_skips_existing_route_file_but_merges_index() {
    let tmp = TempDir::new().unwrap();
    let scaffold = generator(&tmp);
    let layout = scaffold.layout().clone();
    layout.ensure_dirs().unwrap();
    let route_file = layout.file(ArtifactKind::Route, "song");
    fs::write(&route_file, "// hand-written\n").unwrap();

    let report = scaffold.run(Some("SONG")).unwrap();
    assert_eq!(report.skipped_routes, vec![route_file.clone()]);
    assert_eq!(read(&route_file), "// hand-written\n");

    let routes = IndexContents::parse(&read(layout.index(ArtifactKind::Route)));
    assert_eq!(routes.imports, vec!["song"]);
    assert_eq!(routes.registrations, vec![("/songs".to_string(), "song".to_string())]);
    assert!(!layout.file(ArtifactKind::Access, "songlist").exists());
}

#[test]
fn rerunning_an_entity_leaves_indexes_unchanged() {
    let tmp = TempDir::new().unwrap();
    let scaffold = generator(&tmp);
    scaffold.run(Some("song")).unwrap();
    scaffold.run(Some("songlist")).unwrap();
    let before: Vec<String> = ArtifactKind::ALL.iter().map(|k| read(scaffold.layout().index(*k))).collect();
    scaffold.run(Some("song")).unwrap();
    scaffold.run(Some("songlist")).unwrap();
    let after: Vec<String> = ArtifactKind::ALL.iter().map(|k| read(scaffold.layout().index(*k))).collect();
    assert_eq!(before, after);
}

#[test]
fn one_failing_model_does_not_stop_the_others() {
    let tmp = TempDir::new().unwrap();
    let scaffold = generator(&tmp);
    let layout = scaffold.layout().clone();
    layout.ensure_dirs().unwrap();
    fs::create_dir_all(layout.file(ArtifactKind::Access, "song")).unwrap();

    let report = scaffold.run(None).unwrap();
    assert!(!report.is_clean());
    let failed: Vec<&str> = report.failed.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(failed, vec!["Song"]);
    for kind in ArtifactKind::ALL {
        assert!(layout.file(kind, "songlist").exists());
        let index = IndexContents::parse(&read(layout.index(kind)));
        assert_eq!(index.imports, vec!["song", "songlist"]);
    }
}

#[test]
fn unknown_entity_is_model_not_found() {
    let tmp = TempDir::new().unwrap();
    let scaffold = generator(&tmp);
    let err = scaffold.run(Some("Playlist")).unwrap_err();
    assert!(matches!(err, GenerateError::ModelNotFound(ref name) if name == "Playlist"));
    assert!(!scaffold.layout().root().exists());
}

#[test]
fn missing_schema_is_schema_unavailable() {
    let tmp = TempDir::new().unwrap();
    let scaffold = Generator::new(GeneratorSettings {
        schema_path: tmp.path().join("absent.json"),
        out_dir: tmp.path().join("src"),
        crate_name: "app".to_string(),
    });
    assert!(matches!(scaffold.run(None), Err(GenerateError::SchemaUnavailable { .. })));
    assert!(!tmp.path().join("src").exists());
}
