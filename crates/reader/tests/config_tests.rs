//! Integration tests for configuration loading
//!
//! Tests reader configuration parsing, including:
//! - Minimal and full configuration files
//! - Defaults for missing sections
//! - Invalid configuration handling
//! - Save/load through the filesystem
//!
//! Run with: `cargo test -p reader --test config_tests`

use common::ControlRead;
use reader::ReaderConfig;
use std::time::Duration;
use tempfile::tempdir;

const FULL_READER_CONFIG: &str = r#"
[reader]
log_level = "debug"

[board]
vendor_id = "0x16c0"
product_id = "0x05df"
timeout_ms = 250

[poll]
interval = "500ms"
request = 3
length = 8
value = 1
index = 2
count = 10
"#;

#[test]
fn test_empty_config_uses_defaults() {
    let config = ReaderConfig::from_toml("").unwrap();

    assert_eq!(config.reader.log_level, "info");
    assert_eq!(config.board.vendor_id, 0x16c0);
    assert_eq!(config.board.product_id, 0x05dc);
    assert_eq!(config.board.timeout(), Duration::from_millis(100));
    assert_eq!(config.poll.interval, Duration::from_secs(1));
    assert_eq!(config.poll.control_read(), ControlRead::default());
    assert_eq!(config.poll.count, None);
}

#[test]
fn test_parse_full_config() {
    let config = ReaderConfig::from_toml(FULL_READER_CONFIG).unwrap();

    assert_eq!(config.reader.log_level, "debug");
    assert_eq!(config.board.product_id, 0x05df);
    assert_eq!(config.board.timeout_ms, 250);
    assert_eq!(config.poll.interval, Duration::from_millis(500));
    assert_eq!(
        config.poll.control_read(),
        ControlRead {
            request: 3,
            value: 1,
            index: 2,
            length: 8,
        }
    );
    assert_eq!(config.poll.count, Some(10));
}

#[test]
fn test_partial_section_keeps_other_defaults() {
    let config = ReaderConfig::from_toml(
        r#"
[poll]
interval = "2s"
"#,
    )
    .unwrap();

    assert_eq!(config.poll.interval, Duration::from_secs(2));
    assert_eq!(config.poll.request, 1);
    assert_eq!(config.poll.length, 5);
    assert_eq!(config.board.vendor_id, 0x16c0);
}

#[test]
fn test_invalid_configs_are_rejected() {
    let invalid = [
        "[reader]\nlog_level = \"loud\"\n",
        "[board]\nvendor_id = \"16c0\"\n",
        "[board]\nvendor_id = 5824\n",
        "[board]\ntimeout_ms = 0\n",
        "[poll]\ninterval = \"0s\"\n",
        "[poll]\ninterval = \"1d\"\n",
        "[poll]\ninterval = \"18446744073709551h\"\n",
        "[poll]\ninterval = \"25h\"\n",
        "[poll]\nlength = 0\n",
        "[poll]\ncount = 0\n",
        "[poll]\nrequest = 300\n",
    ];

    for text in invalid {
        assert!(
            ReaderConfig::from_toml(text).is_err(),
            "config should be rejected: {:?}",
            text
        );
    }
}

#[test]
fn test_save_and_load_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("reader.toml");

    let mut config = ReaderConfig::default();
    config.poll.interval = Duration::from_millis(1500);
    config.poll.count = Some(4);
    config.save(&path).unwrap();

    let loaded = ReaderConfig::load(Some(path)).unwrap();
    assert_eq!(loaded.poll.interval, Duration::from_millis(1500));
    assert_eq!(loaded.poll.count, Some(4));
    assert_eq!(loaded.board.vendor_id, config.board.vendor_id);
}

#[test]
fn test_load_missing_file_fails() {
    let dir = tempdir().unwrap();
    let result = ReaderConfig::load(Some(dir.path().join("missing.toml")));

    let err = result.unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to read config file"));
}

#[test]
fn test_load_invalid_file_reports_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("reader.toml");
    std::fs::write(&path, "[reader]\nlog_level = \"loud\"\n").unwrap();

    let err = ReaderConfig::load(Some(path)).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to parse config file"));
}
