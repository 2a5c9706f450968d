use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use regex::Regex;
use tracing::{info, warn};

use crate::error::BotError;

/// Reminders never reach beyond 24 hours.
pub const MAX_DURATION_SECS: u64 = 86_400;

/// Clock seam so tests can pin "now" without waiting on wall time.
pub trait Clock: Send + Sync + 'static {
    fn now_unix(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Outbound delivery seam; the Telegram impl lives in `telegram.rs`.
#[async_trait]
pub trait ReminderSink: Send + Sync + 'static {
    async fn deliver(&self, chat_id: i64, text: &str) -> Result<(), BotError>;
}

#[derive(Debug, Clone)]
pub struct Reminder {
    pub user_id: String,
    pub chat_id: i64,
    pub message: String,
    pub fire_at_unix: i64,
}

#[derive(Debug, Clone)]
pub struct ActiveReminder {
    pub id: String,
    pub message: String,
    pub remaining_secs: u64,
}

/// In-memory one-shot reminder service. Entries are lost on restart; that
/// matches the source system and is documented in DESIGN.md. Each scheduled
/// reminder is an independent suspended task with no global cap.
pub struct ReminderScheduler {
    registry: Arc<Mutex<HashMap<String, Reminder>>>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn ReminderSink>,
}

impl ReminderScheduler {
    pub fn new(clock: Arc<dyn Clock>, sink: Arc<dyn ReminderSink>) -> Self {
        Self {
            registry: Arc::new(Mutex::new(HashMap::new())),
            clock,
            sink,
        }
    }

    /// Registers a reminder keyed by `(user, creation time)` and arms a
    /// one-shot timer. Rejects durations of zero or above the 24 h ceiling.
    pub fn schedule(
        &self,
        user_id: &str,
        chat_id: i64,
        duration_secs: u64,
        message: &str,
    ) -> Result<String, BotError> {
        if duration_secs == 0 {
            return Err(BotError::UserInput(
                "❌ Durée invalide. Exemples : 5min, 1h, 30s, 2h30min".into(),
            ));
        }
        if duration_secs > MAX_DURATION_SECS {
            return Err(BotError::UserInput(
                "❌ La durée maximale d'un rappel est de 24 heures.".into(),
            ));
        }

        let now = self.clock.now_unix();
        let mut id = format!("{user_id}_{now}");
        {
            let mut registry = self.registry.lock().unwrap();
            // Two reminders in the same second get a disambiguating suffix.
            let mut n = 1;
            while registry.contains_key(&id) {
                id = format!("{user_id}_{now}_{n}");
                n += 1;
            }
            registry.insert(
                id.clone(),
                Reminder {
                    user_id: user_id.to_string(),
                    chat_id,
                    message: message.to_string(),
                    fire_at_unix: now + duration_secs as i64,
                },
            );
        }
        info!("Reminder {id} armed for {duration_secs}s (chat {chat_id})");

        let registry = self.registry.clone();
        let sink = self.sink.clone();
        let task_id = id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(duration_secs)).await;
            // Absent means it was cancelled in the meantime; fire only if
            // still registered.
            let reminder = registry.lock().unwrap().remove(&task_id);
            if let Some(reminder) = reminder {
                let text = format!("⏰ **Rappel**\n\n{}", reminder.message);
                if let Err(e) = sink.deliver(reminder.chat_id, &text).await {
                    // No retry: the entry is already gone from the registry.
                    warn!("Reminder {task_id} delivery failed: {e}");
                }
            }
        });

        Ok(id)
    }

    /// Pending reminders for one user with remaining time-to-fire. Entries
    /// racing the timer (already elapsed, not yet delivered) show as 0s
    /// rather than being hidden.
    pub fn list_active(&self, user_id: &str) -> Vec<ActiveReminder> {
        let now = self.clock.now_unix();
        let registry = self.registry.lock().unwrap();
        let mut active: Vec<ActiveReminder> = registry
            .iter()
            .filter(|(_, r)| r.user_id == user_id)
            .map(|(id, r)| ActiveReminder {
                id: id.clone(),
                message: r.message.clone(),
                remaining_secs: (r.fire_at_unix - now).max(0) as u64,
            })
            .collect();
        active.sort_by_key(|r| r.remaining_secs);
        active
    }

    /// Removes a pending reminder; the armed timer then no-ops on expiry.
    pub fn cancel(&self, user_id: &str, id: &str) -> bool {
        let mut registry = self.registry.lock().unwrap();
        match registry.get(id) {
            Some(r) if r.user_id == user_id => {
                registry.remove(id);
                true
            }
            _ => false,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.registry.lock().unwrap().len()
    }
}

/// Parses a duration as a sum of `<n>h`, `<n>min` and `<n>s` components;
/// a bare integer defaults to minutes. Returns None when nothing matches
/// or the total is zero.
pub fn parse_duration(input: &str) -> Option<u64> {
    let s = input.trim().to_lowercase();
    if s.is_empty() {
        return None;
    }

    if s.chars().all(|c| c.is_ascii_digit()) {
        let minutes: u64 = s.parse().ok()?;
        let total = minutes.checked_mul(60)?;
        return if total > 0 { Some(total) } else { None };
    }

    let hours_re = Regex::new(r"(\d+)h").ok()?;
    let minutes_re = Regex::new(r"(\d+)min").ok()?;
    let seconds_re = Regex::new(r"(\d+)s").ok()?;

    let mut total: u64 = 0;
    if let Some(c) = hours_re.captures(&s) {
        total += c[1].parse::<u64>().ok()? * 3600;
    }
    if let Some(c) = minutes_re.captures(&s) {
        total += c[1].parse::<u64>().ok()? * 60;
    }
    if let Some(c) = seconds_re.captures(&s) {
        total += c[1].parse::<u64>().ok()?;
    }

    if total > 0 {
        Some(total)
    } else {
        None
    }
}

/// "2h05min", "3min 20s" or "45s", for the pending-reminder listing.
pub fn format_duration(secs: u64) -> String {
    if secs >= 3600 {
        format!("{}h{:02}min", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}min {}s", secs / 60, secs % 60)
    } else {
        format!("{secs}s")
    }
}
