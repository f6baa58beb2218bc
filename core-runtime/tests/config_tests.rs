//! Integration tests for loading runtime configuration from disk

use bridge_traits::time::LogLevel;
use core_runtime::{Error, RuntimeConfig};
use std::io::Write;

#[test]
fn test_load_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{ "log_level": "trace", "playback": {{ "resampler_chunk_frames": 512 }} }}"#
    )
    .unwrap();

    let config = RuntimeConfig::from_json_file(file.path()).unwrap();
    assert_eq!(config.log_level, LogLevel::Trace);
    assert_eq!(config.playback["resampler_chunk_frames"], 512);
}

#[test]
fn test_missing_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = RuntimeConfig::from_json_file(dir.path().join("missing.json")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn test_invalid_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{ "log_level": "loud" }}"#).unwrap();

    let err = RuntimeConfig::from_json_file(file.path()).unwrap_err();
    assert!(matches!(err, Error::Parse(_)));
}
