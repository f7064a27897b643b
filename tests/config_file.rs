use execount::{ConfigError, CounterConfig, CounterError, InstructionCounter};
use std::fs;
use std::path::PathBuf;

fn temp_config(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "execount-{}-{}.json",
        name,
        std::process::id()
    ));
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn session_from_config_file() {
    let path = temp_config("valid", r#"{ "granularity": 32 }"#);
    let config = CounterConfig::from_file(&path).unwrap();
    fs::remove_file(&path).ok();

    let counter = InstructionCounter::with_config(config).unwrap();
    assert_eq!(counter.granularity(), 32);
    assert_eq!(counter.statistics().executed_unit_count(), -32);
}

#[test]
fn invalid_file_granularity_is_rejected() {
    let path = temp_config("zero", r#"{ "granularity": 0 }"#);
    let result = CounterConfig::from_file(&path);
    fs::remove_file(&path).ok();
    assert!(matches!(result, Err(ConfigError::InvalidGranularity(0))));
}

#[test]
fn malformed_file_is_parse_error() {
    let path = temp_config("garbage", "granularity = 3");
    let result = CounterConfig::from_file(&path);
    fs::remove_file(&path).ok();
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn counter_error_wraps_config_error() {
    let err = InstructionCounter::with_granularity(0).unwrap_err();
    assert!(matches!(
        err,
        CounterError::Config(ConfigError::InvalidGranularity(0))
    ));
    assert_eq!(
        err.to_string(),
        format!(
            "invalid counter configuration: invalid granularity 0 (must be in 1..={})",
            i32::MAX
        )
    );
}
