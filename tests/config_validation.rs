//! Integration tests for configuration loading and validation.

use nicebot::config::{Config, RunMode};

fn from_yaml(yaml: &str) -> Config {
    serde_yaml::from_str(yaml).expect("valid test yaml")
}

#[test]
fn yaml_round_trip_preserves_fields() {
    let config = from_yaml(
        r#"
telegram_bot_token: "123456:abc"
bot_username: "@NiceBot"
admin_user_id: "42"
run_mode: webhook
web_port: 9000
tmdb_api_key: "tmdb-key"
log_to_file: true
"#,
    );
    assert_eq!(config.telegram_bot_token, "123456:abc");
    assert_eq!(config.admin_user_id, "42");
    assert_eq!(config.run_mode, RunMode::Webhook);
    assert_eq!(config.web_port, 9000);
    assert_eq!(config.tmdb_api_key.as_deref(), Some("tmdb-key"));
    assert!(config.log_to_file);
}

#[test]
fn empty_yaml_yields_usable_defaults() {
    let config = from_yaml("{}");
    assert_eq!(config.bot_username, "nicebot");
    assert_eq!(config.run_mode, RunMode::Polling);
    assert_eq!(config.web_host, "127.0.0.1");
    assert_eq!(config.web_port, 8000);
    assert_eq!(config.request_timeout_seconds, 10);
    assert!(config.tmdb_api_key.is_none());
    assert!(!config.log_to_file);
}

#[test]
fn validation_requires_a_token() {
    let mut config = from_yaml("{}");
    assert!(config.post_deserialize().is_err());

    config.telegram_bot_token = "123456:abc".into();
    assert!(config.post_deserialize().is_ok());
}

#[test]
fn username_and_urls_are_normalized() {
    let mut config = from_yaml(
        r#"
telegram_bot_token: "123456:abc"
bot_username: " @NiceBot "
libretranslate_url: "https://translate.example.com///"
"#,
    );
    config.post_deserialize().unwrap();
    assert_eq!(config.bot_username, "NiceBot");
    assert_eq!(config.libretranslate_url, "https://translate.example.com");
}

#[test]
fn zero_timeout_falls_back_to_default() {
    let mut config = from_yaml(
        r#"
telegram_bot_token: "123456:abc"
request_timeout_seconds: 0
"#,
    );
    config.post_deserialize().unwrap();
    assert_eq!(config.request_timeout_seconds, 10);
}

#[test]
fn admin_check_is_exact_string_compare() {
    let mut config = from_yaml(r#"telegram_bot_token: "123456:abc""#);
    config.admin_user_id = "42".into();
    assert!(config.is_admin("42"));
    assert!(!config.is_admin("420"));
    assert!(!config.is_admin(""));
}
