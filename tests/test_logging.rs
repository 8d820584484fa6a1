use std::fs;
use typeweave::infrastructure::{init_file_logging, init_logging};
use typeweave::LogConfig;

#[test]
fn test_file_logging_writes_json_events() {
    let dir = tempfile::tempdir().unwrap();

    let guard = init_file_logging(dir.path()).expect("first initialisation installs");
    tracing::info!(target: "typeweave", generator = "Point", "instance allocated");
    assert!(init_logging(LogConfig::default()).is_none());
    drop(guard);

    let files: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(files.len(), 1);
    assert!(files[0]
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("typeweave"));

    let content = fs::read_to_string(&files[0]).unwrap();
    assert!(content.contains("\"generator\":\"Point\""));
    assert!(content.contains("instance allocated"));
}
