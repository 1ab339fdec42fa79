use gryph::config::LoggingLevel;
use gryph::{AppError, GlobalConfig};
use serial_test::serial;

const SAMPLE: &str = r"
logging:
  level: standard
  content_hash: false
storage:
  path: /var/lib/gryph/audit.db
  retention_days: 30
agents:
  claude-code:
    logging_level: full
  cursor:
    enabled: false
";

#[test]
fn empty_document_yields_defaults() {
    let config = GlobalConfig::from_yaml_str("").expect("empty config");
    assert_eq!(config, GlobalConfig::default());
    assert_eq!(config.logging.level, LoggingLevel::Minimal);
    assert!(config.logging.content_hash);
    assert_eq!(config.storage.retention_days, 90);
    assert!(!config.privacy.sensitive_paths.is_empty());
    assert!(!config.privacy.redact_patterns.is_empty());
}

#[test]
fn sample_document_parses() {
    let config = GlobalConfig::from_yaml_str(SAMPLE).expect("valid config");
    assert_eq!(config.logging.level, LoggingLevel::Standard);
    assert!(!config.content_hash());
    assert_eq!(config.storage.retention_days, 30);
    assert_eq!(
        config.db_path(),
        std::path::PathBuf::from("/var/lib/gryph/audit.db")
    );
}

#[test]
fn per_agent_overrides() {
    let config = GlobalConfig::from_yaml_str(SAMPLE).expect("valid config");
    assert_eq!(config.effective_level("claude-code"), LoggingLevel::Full);
    assert_eq!(config.effective_level("gemini"), LoggingLevel::Standard);
    assert!(!config.agent_enabled("cursor"));
    assert!(config.agent_enabled("claude-code"));
    assert!(config.agent_enabled("never-configured"));
}

#[test]
fn invalid_level_is_rejected() {
    let err = GlobalConfig::from_yaml_str("logging:\n  level: verbose\n").unwrap_err();
    assert!(matches!(err, AppError::Config(_)), "got {err}");
}

#[test]
fn invalid_redact_regex_is_rejected() {
    let err = GlobalConfig::from_yaml_str("privacy:\n  redact_patterns: ['(unclosed']\n")
        .unwrap_err();
    let AppError::Config(msg) = err else {
        panic!("expected config error");
    };
    assert!(msg.contains("index 0"), "{msg}");
}

#[test]
fn hash_file_contents_alias_disables_hashing() {
    let config =
        GlobalConfig::from_yaml_str("privacy:\n  hash_file_contents: false\n").expect("valid");
    assert!(config.logging.content_hash);
    assert!(!config.content_hash());
}

#[test]
fn get_and_set_dotted_keys() {
    let config = GlobalConfig::default();
    assert_eq!(config.get_key("logging.level").unwrap(), "minimal");
    assert_eq!(config.get_key("storage.retention_days").unwrap(), "90");
    assert!(matches!(
        config.get_key("logging.nope"),
        Err(AppError::NotFound(_))
    ));

    let updated = config.with_key("logging.level", "full").unwrap();
    assert_eq!(updated.logging.level, LoggingLevel::Full);

    let agent = config.with_key("agents.gemini.enabled", "false").unwrap();
    assert!(!agent.agent_enabled("gemini"));

    assert!(config.with_key("logging.level", "loud").is_err());
}

#[test]
fn save_and_reload_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("config.yaml");
    let config = GlobalConfig::from_yaml_str(SAMPLE).expect("valid config");
    config.save_to_path(&path).expect("save");
    let reloaded = GlobalConfig::load_from_path(&path).expect("reload");
    assert_eq!(reloaded, config);
}

#[test]
#[serial]
fn env_overrides_apply_after_file() {
    std::env::set_var("GRYPH_LOGGING_LEVEL", "full");
    std::env::set_var("GRYPH_STORAGE_RETENTION_DAYS", "7");
    let mut config = GlobalConfig::from_yaml_str(SAMPLE).expect("valid config");
    let result = config.apply_env_overrides();
    std::env::remove_var("GRYPH_LOGGING_LEVEL");
    std::env::remove_var("GRYPH_STORAGE_RETENTION_DAYS");

    result.expect("overrides apply");
    assert_eq!(config.logging.level, LoggingLevel::Full);
    assert_eq!(config.storage.retention_days, 7);
}

#[test]
#[serial]
fn bad_env_override_is_a_config_error() {
    std::env::set_var("GRYPH_STORAGE_RETENTION_DAYS", "forever");
    let mut config = GlobalConfig::default();
    let result = config.apply_env_overrides();
    std::env::remove_var("GRYPH_STORAGE_RETENTION_DAYS");
    assert!(matches!(result, Err(AppError::Config(_))));
}

#[test]
#[serial]
fn load_missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = GlobalConfig::load(Some(&dir.path().join("absent.yaml"))).expect("defaults");
    assert_eq!(config.storage.retention_days, 90);
}
