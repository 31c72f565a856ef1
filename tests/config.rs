use std::path::PathBuf;

use crosscount::config::CountedClass;
use crosscount::error::Error;
use crosscount::{CounterConfig, LineCounter};

fn write_config(name: &str, body: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "crosscount-{}-{}.json",
        name,
        std::process::id()
    ));
    std::fs::write(&path, body).unwrap();

    path
}

#[test]
fn loads_json_config() {
    let path = write_config(
        "valid",
        r#"{
            "iou_threshold": 0.4,
            "max_age": 10,
            "min_hits": 2,
            "line": { "start": [0, 300], "end": [1280, 300], "tolerance": 20 },
            "labels": ["car", "truck"],
            "tracked_classes": ["truck"],
            "counted_class": "at_crossing"
        }"#,
    );

    let config = CounterConfig::from_json_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(config.iou_threshold, 0.4);
    assert_eq!(config.max_age, 10);
    assert_eq!(config.min_hits, 2);
    assert_eq!(config.line.end, [1280.0, 300.0]);
    assert_eq!(config.tracked_class_ids().unwrap(), vec![1]);
    assert_eq!(config.counted_class, CountedClass::AtCrossing);
    assert_eq!(config.min_confidence, 0.3);

    assert!(LineCounter::new(&config).is_ok());
}

#[test]
fn invalid_json_config_is_rejected() {
    let path = write_config("invalid", r#"{ "min_hits": 0 }"#);
    let res = CounterConfig::from_json_file(&path);
    std::fs::remove_file(&path).unwrap();

    assert!(matches!(res, Err(Error::InvalidConfig(_))));
}

#[test]
fn malformed_json_is_reported() {
    let path = write_config("malformed", r#"{ "max_age": "#);
    let res = CounterConfig::from_json_file(&path);
    std::fs::remove_file(&path).unwrap();

    assert!(matches!(res, Err(Error::Json(_))));
}

#[test]
fn missing_file_is_io_error() {
    let res = CounterConfig::from_json_file("/nonexistent/crosscount.json");

    assert!(matches!(res, Err(Error::Io(_))));
}

#[test]
fn counter_refuses_invalid_config() {
    let config = CounterConfig {
        iou_threshold: -0.1,
        ..Default::default()
    };

    assert!(matches!(
        LineCounter::new(&config),
        Err(Error::InvalidConfig(_))
    ));

    let config = CounterConfig {
        labels: vec!["car".into(), "car".into()],
        tracked_classes: vec!["car".into()],
        ..Default::default()
    };

    assert!(LineCounter::new(&config).is_err());
}
