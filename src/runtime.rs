use std::sync::Arc;
use std::time::Instant;

use teloxide::prelude::*;
use tracing::info;

use crate::chat_prefs::ChatPrefs;
use crate::clients::fun::FunService;
use crate::clients::media::MemeClient;
use crate::clients::princetech::PrinceTechClient;
use crate::clients::tmdb::TmdbClient;
use crate::clients::translate::Translator;
use crate::clients::weather::WeatherService;
use crate::clients::wiki::WikiClient;
use crate::commands::chatbot::ChatMemory;
use crate::config::{Config, RunMode};
use crate::db::Database;
use crate::error::BotError;
use crate::reminders::{ReminderScheduler, SystemClock};
use crate::telegram::TelegramSink;

/// Everything a handler needs, wired once at startup and shared behind
/// an Arc for the lifetime of the process.
pub struct AppState {
    pub config: Config,
    pub bot: Bot,
    pub db: Database,
    pub prefs: ChatPrefs,
    pub reminders: ReminderScheduler,
    pub translator: Translator,
    pub weather: WeatherService,
    pub fun: FunService,
    pub princetech: PrinceTechClient,
    pub tmdb: TmdbClient,
    pub wiki: WikiClient,
    pub memes: MemeClient,
    pub chat_memory: ChatMemory,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Config) -> Result<Arc<Self>, BotError> {
        let bot = Bot::new(&config.telegram_bot_token);
        Self::with_bot(config, bot)
    }

    pub fn with_bot(config: Config, bot: Bot) -> Result<Arc<Self>, BotError> {
        let http = crate::clients::build_http_client(config.request_timeout_seconds)?;
        let db = Database::new(&config.data_dir)?;
        let prefs = ChatPrefs::new(&config.data_dir)?;
        let reminders = ReminderScheduler::new(
            Arc::new(SystemClock),
            Arc::new(TelegramSink::new(bot.clone())),
        );

        Ok(Arc::new(Self {
            translator: Translator::new(http.clone(), &config.libretranslate_url),
            weather: WeatherService::new(http.clone(), &config.princetech_api_key),
            fun: FunService::new(http.clone()),
            princetech: PrinceTechClient::new(http.clone(), &config.princetech_api_key),
            tmdb: TmdbClient::new(http.clone(), config.tmdb_api_key.clone()),
            wiki: WikiClient::new(http.clone()),
            memes: MemeClient::new(http),
            chat_memory: ChatMemory::new(),
            started_at: Instant::now(),
            config,
            bot,
            db,
            prefs,
            reminders,
        }))
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

pub async fn run(state: Arc<AppState>) -> Result<(), BotError> {
    match state.config.run_mode {
        RunMode::Polling => {
            info!("Starting in polling mode");
            crate::telegram::run_polling(state).await;
            Ok(())
        }
        RunMode::Webhook => {
            info!(
                "Starting in webhook mode on {}:{}",
                state.config.web_host, state.config.web_port
            );
            crate::web::serve(state).await
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use uuid::Uuid;

    /// A state wired to an unreachable Telegram endpoint and a throwaway
    /// data directory. Outbound sends fail fast and are best-effort
    /// everywhere, so handlers still run end to end.
    pub fn test_state() -> (Arc<AppState>, String) {
        let dir = std::env::temp_dir()
            .join(format!("nicebot_state_test_{}", Uuid::new_v4()))
            .to_string_lossy()
            .to_string();

        let mut config: Config = serde_yaml::from_str("{}").unwrap();
        config.telegram_bot_token = "123456:TEST".into();
        config.admin_user_id = "42".into();
        config.data_dir = dir.clone();

        let bot = Bot::new(&config.telegram_bot_token)
            .set_api_url(reqwest::Url::parse("http://127.0.0.1:9").unwrap());
        let state = AppState::with_bot(config, bot).unwrap();
        (state, dir)
    }

    #[test]
    fn test_state_builds_and_tracks_uptime() {
        let (state, dir) = test_state();
        assert!(state.uptime_seconds() < 5);
        assert!(state.config.is_admin("42"));
        assert!(!state.config.is_admin("41"));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
