pub mod fun;
pub mod media;
pub mod princetech;
pub mod tmdb;
pub mod translate;
pub mod weather;
pub mod wiki;

use std::time::Duration;

use crate::error::BotError;

pub const PRINCETECH_BASE: &str = "https://api.princetechn.com/api";

/// Shared outbound HTTP client. The per-attempt timeout doubles as the
/// fallback trigger: a timed-out provider is treated like a non-2xx one.
pub fn build_http_client(timeout_secs: u64) -> Result<reqwest::Client, BotError> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("nicebot/", env!("CARGO_PKG_VERSION")))
        .build()?)
}
