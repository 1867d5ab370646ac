//! Stream handler output and its interaction with captures.

mod common;

use std::sync::Arc;

use logcapture::core::{LogFormat, StreamConfig, StreamHandler};
use logcapture::{Hierarchy, Level, LogCapture};

use common::SharedBuffer;

#[test]
fn test_stream_config_writes_json_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("capture.log");
    let config = StreamConfig {
        level: Some(Level::Warn),
        format: LogFormat::Json,
        file: Some(path.clone()),
    };

    let hierarchy = Hierarchy::new();
    hierarchy.root().set_level(Some(Level::Trace));
    hierarchy.root().add_handler(Arc::new(config.build()));

    hierarchy.logger("app").info("filtered by handler level");
    hierarchy.logger("app").warn("written");

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<_> = contents.lines().collect();
    assert_eq!(lines.len(), 1);
    let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(value["name"], "app");
    assert_eq!(value["level"], "WARN");
    assert_eq!(value["message"], "written");
}

#[test]
fn test_file_appends_across_handlers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("append.log");
    let config = StreamConfig {
        format: LogFormat::Compact,
        file: Some(path.clone()),
        ..StreamConfig::default()
    };

    for message in ["first", "second"] {
        let hierarchy = Hierarchy::new();
        hierarchy.root().add_handler(Arc::new(config.build()));
        hierarchy.root().error(message);
    }

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents, "ERROR root: first\nERROR root: second\n");
}

#[test]
fn test_human_format_includes_error_chain() {
    let buffer = SharedBuffer::default();
    let sink = buffer.clone();
    let hierarchy = Hierarchy::new();
    hierarchy
        .root()
        .add_handler(Arc::new(StreamHandler::new(move || sink.clone(), LogFormat::Human)));

    let err = std::io::Error::other("permission denied");
    hierarchy
        .logger("store")
        .log_error(Level::Error, "save failed", &err);

    let contents = buffer.contents();
    assert!(contents.contains("ERROR store: save failed\n  error: permission denied\n"));
}

#[test]
fn test_capture_silences_then_restores_stream() {
    let buffer = SharedBuffer::default();
    let sink = buffer.clone();
    let hierarchy = Hierarchy::new();
    hierarchy
        .root()
        .add_handler(Arc::new(StreamHandler::new(move || sink.clone(), LogFormat::Compact)));

    {
        let capture = LogCapture::builder(&hierarchy).build();
        hierarchy.root().error("captured");
        capture.check([("root", "ERROR", "captured")]);
    }
    hierarchy.root().error("printed");

    assert_eq!(buffer.lines(), vec!["ERROR root: printed"]);
}

#[test]
fn test_stream_handler_level() {
    let buffer = SharedBuffer::default();
    let sink = buffer.clone();
    let handler = StreamHandler::new(move || sink.clone(), LogFormat::Compact).with_level(Level::Error);
    let hierarchy = Hierarchy::new();
    hierarchy.root().add_handler(Arc::new(handler));

    hierarchy.root().warn("dropped");
    hierarchy.root().error("kept");

    assert_eq!(buffer.lines(), vec!["ERROR root: kept"]);
}
