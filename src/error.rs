use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    /// Malformed or missing command arguments. Recovered with a usage hint,
    /// never logged as a failure.
    #[error("{0}")]
    UserInput(String),

    /// A third-party API returned non-2xx, timed out, or sent a payload we
    /// could not use, after every fallback provider was tried.
    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Telegram API error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// Non-admin caller invoking an admin-gated command.
    #[error("Access denied")]
    Authorization,

    #[error("Config error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let e = BotError::UserInput("Usage: /meteo <ville>".into());
        assert_eq!(e.to_string(), "Usage: /meteo <ville>");

        let e = BotError::Upstream("all providers failed".into());
        assert_eq!(e.to_string(), "Upstream service error: all providers failed");

        let e = BotError::Authorization;
        assert_eq!(e.to_string(), "Access denied");

        let e = BotError::Config("missing bot token".into());
        assert_eq!(e.to_string(), "Config error: missing bot token");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        let e: BotError = io_err.into();
        assert!(e.to_string().contains("not found"));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{{invalid").unwrap_err();
        let e: BotError = json_err.into();
        assert!(e.to_string().contains("JSON error"));
    }
}
