/*!
 * Tests for application configuration
 */

use whispersub::app_config::{Config, ModelSize};

/// Test default configuration values
#[test]
fn test_default_config_shouldHaveSensibleValues() {
    let config = Config::default();
    assert_eq!(config.model_size, ModelSize::Medium);
    assert_eq!(config.language, "auto");
    assert!(config.chunking.enabled);
    assert_eq!(config.chunking.chunk_minutes, 10);
    assert!(!config.chunking.keep_partial_files);
    assert_eq!(config.chunking.poll_interval_secs, 30);
    assert_eq!(config.engine.command, "whisper");
    assert!(config.validate().is_ok());
}

/// Test JSON round-trip of the configuration
#[test]
fn test_config_serde_withDefaultConfig_shouldRoundTrip() {
    let config = Config::default();
    let json = serde_json::to_string_pretty(&config).unwrap();
    let parsed: Config = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.model_size, config.model_size);
    assert_eq!(parsed.language, config.language);
    assert_eq!(parsed.chunking.chunk_minutes, config.chunking.chunk_minutes);
}

/// Test partial JSON uses defaults for missing fields
#[test]
fn test_config_serde_withPartialJson_shouldApplyDefaults() {
    let json = r#"{ "model_size": "large", "language": "ja" }"#;
    let config: Config = serde_json::from_str(json).unwrap();
    assert_eq!(config.model_size, ModelSize::Large);
    assert_eq!(config.language, "ja");
    assert_eq!(config.chunking.chunk_minutes, 10);
    assert_eq!(config.engine.command, "whisper");
}

/// Test model sizes serialize as lowercase names
#[test]
fn test_model_size_serde_shouldUseLowercaseNames() {
    assert_eq!(serde_json::to_string(&ModelSize::Tiny).unwrap(), "\"tiny\"");
    assert_eq!(serde_json::to_string(&ModelSize::Large).unwrap(), "\"large\"");
    let parsed: ModelSize = serde_json::from_str("\"small\"").unwrap();
    assert_eq!(parsed, ModelSize::Small);
}

/// Test validation rejects a zero chunk size
#[test]
fn test_validate_withZeroChunkMinutes_shouldFail() {
    let mut config = Config::default();
    config.chunking.chunk_minutes = 0;
    assert!(config.validate().is_err());
}

/// Test validation rejects an empty engine command
#[test]
fn test_validate_withEmptyEngineCommand_shouldFail() {
    let mut config = Config::default();
    config.engine.command = "  ".to_string();
    assert!(config.validate().is_err());
}

/// Test validation rejects implausible language codes
#[test]
fn test_validate_withBadLanguage_shouldFail() {
    let mut config = Config::default();
    config.language = "english".to_string();
    assert!(config.validate().is_err());

    config.language = "en".to_string();
    assert!(config.validate().is_ok());
}

/// Test language hint maps "auto" to None
#[test]
fn test_language_hint_withAuto_shouldBeNone() {
    let mut config = Config::default();
    assert_eq!(config.language_hint(), None);

    config.language = "ko".to_string();
    assert_eq!(config.language_hint(), Some("ko".to_string()));
}
