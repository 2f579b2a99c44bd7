use std::fs;
use std::path::Path;
use std::sync::Arc;

use otama::{initialize, Database, HostValue, LogLevel, MemoryEngine, OpenConfig, OtamaError};
use tempfile::TempDir;

fn open(engine: &Arc<MemoryEngine>, namespace: &str) -> Database<MemoryEngine> {
    let config = HostValue::mapping([("namespace", HostValue::text(namespace))]);
    let mut db = Database::open(Arc::clone(engine), &config).unwrap();
    db.create_database().unwrap();
    db
}

fn write_file(dir: &TempDir, name: &str, contents: &[u8]) -> HostValue {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    HostValue::text(path.to_string_lossy())
}

#[test]
fn initialize_quiets_engine_log() {
    let engine = MemoryEngine::new();
    let version = initialize(&engine);
    assert!(version.starts_with("otama-memory "));
    assert_eq!(engine.log_level(), LogLevel::Error);
}

#[test]
fn insert_exists_remove() {
    let engine = Arc::new(MemoryEngine::new());
    let mut db = open(&engine, "scenario1");
    let dir = TempDir::new().unwrap();
    let file = write_file(&dir, "photo.jpg", b"not really a jpeg");

    let id = db.insert(&file).unwrap();
    assert_eq!(id.len(), 40);
    assert!(id.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));

    assert!(db.exists(&id).unwrap());
    db.remove(&id).unwrap();
    assert!(!db.exists(&id).unwrap());
}

#[test]
fn missing_search_path_never_reaches_engine() {
    let engine = Arc::new(MemoryEngine::new());
    let mut db = open(&engine, "scenario2");
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("photo.jpg");
    let calls = engine.calls();

    let err = db
        .search(5, &HostValue::text(missing.to_string_lossy()))
        .unwrap_err();
    assert!(matches!(err, OtamaError::IoNotFound(ref path) if path == &missing));
    assert_eq!(engine.calls(), calls);
}

#[test]
fn missing_insert_path_is_io_not_found() {
    let engine = Arc::new(MemoryEngine::new());
    let mut db = open(&engine, "missing-insert");
    let err = db
        .insert(&HostValue::text("/nonexistent/otama/photo.jpg"))
        .unwrap_err();
    assert!(matches!(err, OtamaError::IoNotFound(_)));
}

#[test]
fn search_by_query_is_limited_and_ranked() {
    let engine = Arc::new(MemoryEngine::new());
    let mut db = open(&engine, "scenario3");
    let dir = TempDir::new().unwrap();
    let mut ids = Vec::new();
    for (idx, body) in [&b"aaaaaaaa"[..], b"aaaabbbb", b"abcdefgh", b"zzzzzzzz", b"aaaaaaab"]
        .iter()
        .enumerate()
    {
        ids.push(db.insert(&write_file(&dir, &format!("{idx}.bin"), body)).unwrap());
    }

    let query = HostValue::mapping([("data", HostValue::Bytes(b"aaaaaaaa".to_vec()))]);
    let records = db.search(3, &query).unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].id(), ids[0]);
    assert_eq!(records[1].id(), ids[4]);
    assert_eq!(records[2].id(), ids[1]);

    let mut last = f64::INFINITY;
    for record in &records {
        let keys: Vec<&str> = record.keys().collect();
        assert_eq!(keys, vec!["similarity", "id"]);
        let similarity = record.get("similarity").and_then(HostValue::as_float).unwrap();
        assert!(similarity <= last);
        last = similarity;
    }
}

#[test]
fn search_by_existing_file_path() {
    let engine = Arc::new(MemoryEngine::new());
    let mut db = open(&engine, "by-file");
    let dir = TempDir::new().unwrap();
    let file = write_file(&dir, "a.bin", b"hello world");
    let id = db.insert(&file).unwrap();

    let records = db.search(10, &file).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id(), id);
    let similarity = records[0].get("similarity").and_then(HostValue::as_float).unwrap();
    assert!((similarity - 1.0).abs() < 1e-6);
}

#[test]
fn unopened_handle_fails_with_not_open() {
    let engine = Arc::new(MemoryEngine::new());
    let mut db = Database::new(engine);
    assert!(!db.is_open());
    assert!(matches!(db.pull(), Err(OtamaError::NotOpen)));
    assert!(matches!(
        db.search(1, &HostValue::mapping([("data", HostValue::text("x"))])),
        Err(OtamaError::NotOpen)
    ));
    assert!(matches!(db.exists("zz"), Err(OtamaError::NotOpen)));
}

#[test]
fn reopen_replaces_connection() {
    let engine = Arc::new(MemoryEngine::new());
    let mut db = Database::new(Arc::clone(&engine));
    db.reopen(&HostValue::text("first")).unwrap();
    db.reopen(&HostValue::text("second")).unwrap();
    assert!(db.is_open());
    db.close();
    assert!(!db.is_open());
    db.close();
}

#[test]
fn handle_shares_its_engine() {
    let engine = Arc::new(MemoryEngine::new());
    let db = open(&engine, "shared");
    assert!(Arc::ptr_eq(db.engine(), &engine));
    assert_eq!(db.version(), initialize(engine.as_ref()));
}

#[test]
fn unsupported_config_type_is_argument_error() {
    let engine = Arc::new(MemoryEngine::new());
    let result = Database::open(engine, &HostValue::Float(1.0));
    assert!(matches!(result, Err(OtamaError::Argument(_))));
}

#[test]
fn malformed_identifier_is_rejected() {
    let engine = Arc::new(MemoryEngine::new());
    let mut db = open(&engine, "bad-id");
    assert!(matches!(db.exists("abc"), Err(OtamaError::InvalidIdentifier(_))));
    assert!(matches!(
        db.remove(&"x".repeat(40)),
        Err(OtamaError::InvalidIdentifier(_))
    ));
}

#[test]
fn similarity_requires_mappings() {
    let engine = Arc::new(MemoryEngine::new());
    let mut db = open(&engine, "sim-args");
    let query = HostValue::mapping([("data", HostValue::text("abc"))]);
    let err = db.similarity(&query, &HostValue::text("abc")).unwrap_err();
    assert!(matches!(err, OtamaError::Argument(_)));
}

#[test]
fn feature_handles_flow_back_as_queries() {
    let engine = Arc::new(MemoryEngine::new());
    let mut db = open(&engine, "features");
    let query = HostValue::mapping([("data", HostValue::text("abcabc"))]);

    let feature = db.feature_raw(&query).unwrap();
    assert_eq!(engine.live_features(), 1);

    let raw_query = HostValue::mapping([("raw", HostValue::Feature(feature.clone()))]);
    let similarity = db.similarity(&raw_query, &query).unwrap();
    assert!((similarity - 1.0).abs() < 1e-6);

    assert!(feature.dispose());
    assert!(!feature.dispose());
    assert!(feature.is_disposed());
    assert_eq!(engine.live_features(), 0);
    assert_eq!(engine.released_features(), 1);

    let err = db.similarity(&raw_query, &query).unwrap_err();
    assert!(matches!(err, OtamaError::Argument(_)));
}

#[test]
fn dropped_feature_is_released_once() {
    let engine = Arc::new(MemoryEngine::new());
    let mut db = open(&engine, "feature-drop");
    let query = HostValue::mapping([("data", HostValue::text("xyz"))]);
    let feature = db.feature_raw(&query).unwrap();
    let clone = feature.clone();
    drop(feature);
    assert_eq!(engine.live_features(), 1);
    drop(clone);
    assert_eq!(engine.live_features(), 0);
    assert_eq!(engine.released_features(), 1);
}

#[test]
fn feature_string_is_hex() {
    let engine = Arc::new(MemoryEngine::new());
    let mut db = open(&engine, "feature-string");
    let text = db
        .feature_string(&HostValue::mapping([("data", HostValue::text("a"))]))
        .unwrap();
    assert_eq!(text.len(), 512);
    assert!(matches!(
        db.feature_string(&HostValue::text("a")),
        Err(OtamaError::Argument(_))
    ));
}

#[test]
fn invoke_decodes_driver_output() {
    let engine = Arc::new(MemoryEngine::new());
    let mut db = open(&engine, "invoke");
    let input = HostValue::mapping([
        ("k", HostValue::Int(1)),
        ("list", HostValue::Sequence(vec![HostValue::text("v")])),
    ]);
    assert_eq!(db.invoke("echo", &input).unwrap(), input);
    assert_eq!(db.invoke("count", &HostValue::Null).unwrap(), HostValue::Int(0));

    let dir = TempDir::new().unwrap();
    db.insert(&write_file(&dir, "one.bin", b"1")).unwrap();
    assert_eq!(db.invoke("count", &HostValue::Null).unwrap(), HostValue::Int(1));
}

#[test]
#[allow(deprecated)]
fn table_aliases_forward_to_database_operations() {
    let engine = Arc::new(MemoryEngine::new());
    let mut db = open(&engine, "aliases");
    let dir = TempDir::new().unwrap();
    db.insert(&write_file(&dir, "one.bin", b"1")).unwrap();

    db.drop_table().unwrap();
    assert_eq!(db.invoke("count", &HostValue::Null).unwrap(), HostValue::Int(0));
    db.create_table().unwrap();
}

#[test]
fn maintenance_operations_succeed() {
    let engine = Arc::new(MemoryEngine::new());
    let mut db = open(&engine, "maintenance");
    db.pull().unwrap();
    db.drop_index().unwrap();
    db.vacuum_index().unwrap();
    db.drop_database().unwrap();
}

#[test]
fn opens_from_json_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("otama.json");
    fs::write(&path, r#"{"namespace": "from-json", "driver": {"name": "histogram"}}"#).unwrap();

    let config = OpenConfig::load(&path).unwrap();
    let engine = Arc::new(MemoryEngine::new());
    let mut db = Database::open_config(engine, &config).unwrap();
    db.create_database().unwrap();
    assert!(db.is_open());
}

#[test]
fn missing_config_file_is_io_not_found() {
    let err = OpenConfig::load(Path::new("/nonexistent/otama.json")).unwrap_err();
    assert!(matches!(err, OtamaError::IoNotFound(_)));
}
