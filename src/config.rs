use crate::error::BotError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_telegram_bot_token() -> String {
    String::new()
}
fn default_bot_username() -> String {
    "nicebot".into()
}
fn default_admin_user_id() -> String {
    String::new()
}
fn default_data_dir() -> String {
    "./nicebot.data".into()
}
fn default_princetech_api_key() -> String {
    "prince".into()
}
fn default_libretranslate_url() -> String {
    "https://libretranslate.com".into()
}
fn default_web_host() -> String {
    "127.0.0.1".into()
}
fn default_web_port() -> u16 {
    8000
}
fn default_request_timeout_seconds() -> u64 {
    10
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Long polling against the Telegram API (default).
    Polling,
    /// Serve the webhook ingress and let Telegram push updates.
    Webhook,
}

fn default_run_mode() -> RunMode {
    RunMode::Polling
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_telegram_bot_token")]
    pub telegram_bot_token: String,
    #[serde(default = "default_bot_username")]
    pub bot_username: String,
    /// Single admin identity, compared as a string against the caller's
    /// Telegram id.
    #[serde(default = "default_admin_user_id")]
    pub admin_user_id: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_princetech_api_key")]
    pub princetech_api_key: String,
    #[serde(default)]
    pub tmdb_api_key: Option<String>,
    #[serde(default = "default_libretranslate_url")]
    pub libretranslate_url: String,
    #[serde(default = "default_run_mode")]
    pub run_mode: RunMode,
    #[serde(default = "default_web_host")]
    pub web_host: String,
    #[serde(default = "default_web_port")]
    pub web_port: u16,
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
    #[serde(default)]
    pub log_to_file: bool,
}

impl Config {
    pub fn load() -> Result<Self, BotError> {
        let yaml_path = Self::resolve_config_path();

        let mut config: Config = if let Some(path) = yaml_path {
            let path_str = path.to_string_lossy().to_string();
            let content = std::fs::read_to_string(&path)
                .map_err(|e| BotError::Config(format!("Failed to read {path_str}: {e}")))?;
            serde_yaml::from_str(&content)
                .map_err(|e| BotError::Config(format!("Failed to parse {path_str}: {e}")))?
        } else {
            // No config file is fine; the bot can run from environment
            // variables alone.
            serde_yaml::from_str("{}")
                .map_err(|e| BotError::Config(format!("Failed to build default config: {e}")))?
        };

        config.apply_env_overrides();
        config.post_deserialize()?;
        Ok(config)
    }

    fn resolve_config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("NICEBOT_CONFIG") {
            let p = PathBuf::from(path);
            if p.is_file() {
                return Some(p);
            }
        }
        let local = PathBuf::from("./nicebot.config.yaml");
        if local.is_file() {
            return Some(local);
        }
        None
    }

    /// Secrets come from the environment when present, overriding any file
    /// values.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("TELEGRAM_BOT_TOKEN") {
            if !v.trim().is_empty() {
                self.telegram_bot_token = v;
            }
        }
        if let Ok(v) = std::env::var("ADMIN_USER_ID") {
            if !v.trim().is_empty() {
                self.admin_user_id = v;
            }
        }
        if let Ok(v) = std::env::var("PRINCETECHN_API_KEY") {
            if !v.trim().is_empty() {
                self.princetech_api_key = v;
            }
        }
        if let Ok(v) = std::env::var("TMDB_API_KEY") {
            if !v.trim().is_empty() {
                self.tmdb_api_key = Some(v);
            }
        }
        if let Ok(v) = std::env::var("LIBRETRANSLATE_URL") {
            if !v.trim().is_empty() {
                self.libretranslate_url = v;
            }
        }
    }

    /// Validation and normalization applied after any deserialization path.
    pub fn post_deserialize(&mut self) -> Result<(), BotError> {
        if self.telegram_bot_token.trim().is_empty() {
            return Err(BotError::Config(
                "telegram_bot_token is required (set TELEGRAM_BOT_TOKEN or add it to nicebot.config.yaml)".into(),
            ));
        }
        self.admin_user_id = self.admin_user_id.trim().to_string();
        self.bot_username = self
            .bot_username
            .trim()
            .trim_start_matches('@')
            .to_string();
        if self.bot_username.is_empty() {
            self.bot_username = default_bot_username();
        }
        if self.web_host.trim().is_empty() {
            self.web_host = default_web_host();
        }
        self.libretranslate_url = self
            .libretranslate_url
            .trim()
            .trim_end_matches('/')
            .to_string();
        if self.libretranslate_url.is_empty() {
            self.libretranslate_url = default_libretranslate_url();
        }
        if self.request_timeout_seconds == 0 {
            self.request_timeout_seconds = default_request_timeout_seconds();
        }
        Ok(())
    }

    pub fn is_admin(&self, telegram_id: &str) -> bool {
        !self.admin_user_id.is_empty() && self.admin_user_id == telegram_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        let mut config: Config = serde_yaml::from_str("{}").unwrap();
        config.telegram_bot_token = "123:abc".into();
        config
    }

    #[test]
    fn test_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.bot_username, "nicebot");
        assert_eq!(config.data_dir, "./nicebot.data");
        assert_eq!(config.princetech_api_key, "prince");
        assert_eq!(config.run_mode, RunMode::Polling);
        assert_eq!(config.web_port, 8000);
        assert_eq!(config.request_timeout_seconds, 10);
        assert!(!config.log_to_file);
    }

    #[test]
    fn test_missing_token_is_fatal() {
        let mut config: Config = serde_yaml::from_str("{}").unwrap();
        let err = config.post_deserialize().unwrap_err();
        assert!(err.to_string().contains("telegram_bot_token"));
    }

    #[test]
    fn test_bot_username_normalized() {
        let mut config = base_config();
        config.bot_username = "@NiceBot ".into();
        config.post_deserialize().unwrap();
        assert_eq!(config.bot_username, "NiceBot");
    }

    #[test]
    fn test_libretranslate_url_trailing_slash_stripped() {
        let mut config = base_config();
        config.libretranslate_url = "https://translate.example.com/".into();
        config.post_deserialize().unwrap();
        assert_eq!(config.libretranslate_url, "https://translate.example.com");
    }

    #[test]
    fn test_is_admin() {
        let mut config = base_config();
        config.admin_user_id = "42".into();
        config.post_deserialize().unwrap();
        assert!(config.is_admin("42"));
        assert!(!config.is_admin("43"));

        config.admin_user_id = String::new();
        assert!(!config.is_admin(""));
    }

    #[test]
    fn test_run_mode_parses_from_yaml() {
        let config: Config = serde_yaml::from_str("run_mode: webhook").unwrap();
        assert_eq!(config.run_mode, RunMode::Webhook);
    }
}
