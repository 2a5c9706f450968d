use std::sync::Arc;

use teloxide::prelude::*;
use tracing::{error, info, warn};

use crate::commands;
use crate::error::BotError;
use crate::gamification::{self, XP_COMMAND_USE, XP_SPECIAL_BONUS};
use crate::runtime::AppState;
use crate::telegram::send_response;

/// Commands gated on the single configured admin identity.
pub const ADMIN_COMMANDS: &[&str] = &[
    "/admin",
    "/stats",
    "/users",
    "/broadcast",
    "/ban",
    "/unban",
    "/addxp",
    "/resetxp",
    "/gamestats",
    "/logs",
    "/groupes",
    "/leavegroup",
    "/broadcastgroups",
    "/groupstats",
];

/// AI commands carry an extra XP bonus.
pub const SPECIAL_XP_COMMANDS: &[&str] = &["/ai", "/resume", "/idee"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatScope {
    Private,
    Group,
    Channel,
}

/// Abstract invocation context: who is calling, where the reply goes, and
/// the parsed arguments. Button presses re-invoke handlers by building one
/// of these, so no handler ever depends on a concrete update shape.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub chat_id: ChatId,
    pub scope: ChatScope,
    pub chat_title: Option<String>,
    pub telegram_id: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub args: Vec<String>,
}

impl CommandContext {
    pub fn args_joined(&self) -> String {
        self.args.join(" ")
    }

    pub fn display_name(&self) -> String {
        self.first_name
            .clone()
            .or_else(|| self.username.clone())
            .unwrap_or_else(|| "utilisateur".to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Handled,
    Denied,
    Unknown,
    Failed,
}

/// Splits `/cmd@bot arg1 arg2` into the command token and arguments.
/// Returns None for non-commands and for commands addressed to another bot.
pub fn parse_command(text: &str, bot_username: &str) -> Option<(String, Vec<String>)> {
    let trimmed = text.trim();
    if !trimmed.starts_with('/') {
        return None;
    }
    let mut parts = trimmed.split_whitespace();
    let head = parts.next()?;
    let (command, target) = match head.split_once('@') {
        Some((cmd, target)) => (cmd, Some(target)),
        None => (head, None),
    };
    if command.len() < 2 {
        return None;
    }
    if let Some(target) = target {
        if !target.eq_ignore_ascii_case(bot_username) {
            return None;
        }
    }
    let args = parts.map(str::to_string).collect();
    Some((command.to_lowercase(), args))
}

pub fn is_admin_command(command: &str) -> bool {
    ADMIN_COMMANDS.contains(&command)
}

pub fn unknown_command_response() -> String {
    "❓ Commande inconnue. Tapez /help pour la liste des commandes.".to_string()
}

pub fn access_denied_response(telegram_id: &str) -> String {
    format!(
        "🚫 **Accès refusé**\n\nCette commande est réservée à l'administrateur.\nVotre ID : `{telegram_id}`"
    )
}

/// Full dispatch: upsert the caller, gate admin commands, invoke the
/// handler, convert failures to chat messages, and award XP on success.
/// Exactly one history row is written per invocation, whatever the
/// outcome; a persistence failure is logged and never blocks the reply.
pub async fn dispatch(
    state: &Arc<AppState>,
    ctx: &CommandContext,
    command: &str,
) -> DispatchOutcome {
    let user_id = record_invocation(state, ctx, command);

    if is_admin_command(command) && !state.config.is_admin(&ctx.telegram_id) {
        info!(
            "Denied admin command {command} from {} in chat {}",
            ctx.telegram_id, ctx.chat_id
        );
        send_response(
            &state.bot,
            ctx.chat_id,
            &access_denied_response(&ctx.telegram_id),
        )
        .await;
        return DispatchOutcome::Denied;
    }

    if !commands::is_known(command) {
        send_response(&state.bot, ctx.chat_id, &unknown_command_response()).await;
        return DispatchOutcome::Unknown;
    }

    match commands::run_command(state, ctx, command).await {
        Ok(()) => {
            if !is_admin_command(command) {
                if let Some(user_id) = user_id {
                    award_command_xp(state, ctx, command, user_id).await;
                }
            }
            DispatchOutcome::Handled
        }
        Err(e) => {
            let reply = error_reply(&e);
            match &e {
                BotError::UserInput(_) => {}
                other => warn!("Command {command} failed for chat {}: {other}", ctx.chat_id),
            }
            send_response(&state.bot, ctx.chat_id, &reply).await;
            match e {
                // A usage hint is a handled interaction, not a failure.
                BotError::UserInput(_) => DispatchOutcome::Handled,
                _ => DispatchOutcome::Failed,
            }
        }
    }
}

/// Upserts the caller and appends the history row. Returns the internal
/// user id when persistence cooperated.
fn record_invocation(state: &Arc<AppState>, ctx: &CommandContext, command: &str) -> Option<i64> {
    let user = match state.db.upsert_user(
        &ctx.telegram_id,
        ctx.username.as_deref(),
        ctx.first_name.as_deref(),
    ) {
        Ok(user) => user,
        Err(e) => {
            error!("Failed to upsert user {}: {e}", ctx.telegram_id);
            return None;
        }
    };

    let input = ctx.args_joined();
    let input = if input.is_empty() {
        None
    } else {
        Some(input.as_str().to_string())
    };
    if let Err(e) = state
        .db
        .add_history(user.id, command, input.as_deref(), None)
    {
        error!("Failed to record history for {command}: {e}");
    }
    Some(user.id)
}

async fn award_command_xp(
    state: &Arc<AppState>,
    ctx: &CommandContext,
    command: &str,
    user_id: i64,
) {
    let mut amount = XP_COMMAND_USE;
    if SPECIAL_XP_COMMANDS.contains(&command) {
        amount += XP_SPECIAL_BONUS;
    }
    match gamification::award_xp(&state.db, user_id, amount) {
        Ok(outcome) => {
            if outcome.leveled_up {
                let text = format!(
                    "🎉 **Niveau supérieur !**\n\nFélicitations {}, vous passez au niveau {} !",
                    ctx.display_name(),
                    outcome.new_level
                );
                send_response(&state.bot, ctx.chat_id, &text).await;
            }
            for badge in outcome.new_badges {
                let text = format!("🏆 **Nouveau badge débloqué :** {badge}");
                send_response(&state.bot, ctx.chat_id, &text).await;
            }
        }
        Err(e) => error!("Failed to award XP to user {user_id}: {e}"),
    }
}

/// Handler failure to user-facing reply. Never exposes internals.
pub fn error_reply(e: &BotError) -> String {
    match e {
        BotError::UserInput(msg) => msg.clone(),
        BotError::Upstream(_) | BotError::Http(_) => {
            "❌ Service temporairement indisponible. Réessayez plus tard.".to_string()
        }
        BotError::Authorization => access_denied_response(""),
        _ => "❌ Une erreur s'est produite. Réessayez plus tard.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::tests::test_state;

    fn ctx(telegram_id: &str, args: &[&str]) -> CommandContext {
        CommandContext {
            chat_id: ChatId(1000),
            scope: ChatScope::Private,
            chat_title: None,
            telegram_id: telegram_id.to_string(),
            username: Some("tester".into()),
            first_name: Some("Test".into()),
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_parse_command_basic() {
        assert_eq!(
            parse_command("/meteo Paris", "nicebot"),
            Some(("/meteo".into(), vec!["Paris".into()]))
        );
        assert_eq!(parse_command("bonjour", "nicebot"), None);
        assert_eq!(parse_command("/", "nicebot"), None);
    }

    #[test]
    fn test_parse_command_mention_filtering() {
        assert_eq!(
            parse_command("/ping@NiceBot", "nicebot"),
            Some(("/ping".into(), vec![]))
        );
        assert_eq!(parse_command("/ping@otherbot", "nicebot"), None);
    }

    #[test]
    fn test_parse_command_lowercases_token() {
        assert_eq!(
            parse_command("/METEO Paris Lyon", "nicebot"),
            Some(("/meteo".into(), vec!["Paris".into(), "Lyon".into()]))
        );
    }

    #[test]
    fn test_admin_command_catalogue() {
        assert!(is_admin_command("/broadcast"));
        assert!(is_admin_command("/resetxp"));
        assert!(!is_admin_command("/meteo"));
        assert!(!is_admin_command("/profil"));
    }

    #[tokio::test]
    async fn test_dispatch_records_history_on_success() {
        let (state, dir) = test_state();
        let ctx = ctx("1", &[]);

        // /uptime sends over an unreachable API; the send is best-effort
        // so the dispatch itself still succeeds.
        let outcome = dispatch(&state, &ctx, "/uptime").await;
        assert_eq!(outcome, DispatchOutcome::Handled);

        let user = state.db.get_user("1").unwrap().unwrap();
        assert_eq!(state.db.history_count(user.id).unwrap(), 1);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_dispatch_records_history_on_unknown_and_denied() {
        let (state, dir) = test_state();

        let outcome = dispatch(&state, &ctx("1", &[]), "/nonexistent").await;
        assert_eq!(outcome, DispatchOutcome::Unknown);

        // state is configured with admin id "42"; caller "1" is denied.
        let outcome = dispatch(&state, &ctx("1", &["hello"]), "/broadcast").await;
        assert_eq!(outcome, DispatchOutcome::Denied);

        let user = state.db.get_user("1").unwrap().unwrap();
        assert_eq!(state.db.history_count(user.id).unwrap(), 2);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_failing_handler_reports_failure_with_one_history_row() {
        let (state, dir) = test_state();

        // /ping round-trips through the Telegram API, which is unreachable
        // here, so the handler itself errors out.
        let outcome = dispatch(&state, &ctx("1", &[]), "/ping").await;
        assert_eq!(outcome, DispatchOutcome::Failed);

        let user = state.db.get_user("1").unwrap().unwrap();
        assert_eq!(state.db.history_count(user.id).unwrap(), 1);

        // No XP for a failed invocation.
        let stats = state.db.get_or_create_stats(user.id).unwrap();
        assert_eq!(stats.xp_points, 0);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_denied_admin_command_awards_no_xp() {
        let (state, dir) = test_state();
        dispatch(&state, &ctx("1", &[]), "/resetxp").await;

        let user = state.db.get_user("1").unwrap().unwrap();
        let stats = state.db.get_or_create_stats(user.id).unwrap();
        assert_eq!(stats.xp_points, 0);
        assert_eq!(stats.total_commands, 0);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_successful_dispatch_awards_xp() {
        let (state, dir) = test_state();
        dispatch(&state, &ctx("1", &[]), "/uptime").await;

        let user = state.db.get_user("1").unwrap().unwrap();
        let stats = state.db.get_or_create_stats(user.id).unwrap();
        assert_eq!(stats.xp_points, XP_COMMAND_USE);
        assert_eq!(stats.total_commands, 1);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_usage_hint_still_counts_as_handled() {
        let (state, dir) = test_state();
        // /rappel without arguments yields a usage hint, not a failure.
        let outcome = dispatch(&state, &ctx("1", &[]), "/rappel").await;
        assert_eq!(outcome, DispatchOutcome::Handled);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_error_reply_hides_internals() {
        let reply = error_reply(&BotError::Upstream("provider X exploded".into()));
        assert!(!reply.contains("provider X"));

        let reply = error_reply(&BotError::UserInput("Usage: /qr <texte>".into()));
        assert_eq!(reply, "Usage: /qr <texte>");
    }
}
