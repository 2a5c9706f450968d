//! Conversational mode: per-chat opt-in, rolling per-user memory, and the
//! AI auto-reply for plain text messages.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use teloxide::prelude::*;
use teloxide::types::UserId;
use tracing::warn;

use crate::dispatch::{ChatScope, CommandContext};
use crate::error::BotError;
use crate::runtime::AppState;
use crate::telegram::send_response;

/// Messages kept per user. The prompt only carries the most recent few,
/// the rest is headroom so a burst does not immediately evict context.
const MEMORY_CAP: usize = 20;
const CONTEXT_WINDOW: usize = 5;

const PERSONA_PROMPT: &str = "Tu es NICE-BOT, un assistant IA sympathique et naturel sur Telegram.\n\nRÈGLES IMPORTANTES:\n1. Réponds de manière courte et naturelle (1-2 lignes max)\n2. Sois amical et utilise des emojis avec modération\n3. Réponds dans la langue de l'utilisateur\n4. Ne mentionne jamais que tu es un programme ou une IA sauf si on te le demande";

/// Rolling conversation memory, keyed by telegram user id.
pub struct ChatMemory {
    entries: Mutex<HashMap<String, VecDeque<String>>>,
}

impl ChatMemory {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn remember(&self, user_key: &str, line: String) {
        let mut entries = self.entries.lock().unwrap();
        let queue = entries.entry(user_key.to_string()).or_default();
        queue.push_back(line);
        while queue.len() > MEMORY_CAP {
            queue.pop_front();
        }
    }

    /// The most recent `n` lines, oldest first.
    pub fn recent(&self, user_key: &str, n: usize) -> Vec<String> {
        let entries = self.entries.lock().unwrap();
        entries
            .get(user_key)
            .map(|queue| queue.iter().rev().take(n).rev().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for ChatMemory {
    fn default() -> Self {
        Self::new()
    }
}

/// /chatbot, /chatbot on, /chatbot off. Toggling in a group requires
/// group-admin rights; private chats belong to their user.
pub async fn toggle(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    let action = ctx
        .args
        .first()
        .map(|a| a.to_lowercase())
        .unwrap_or_default();

    match action.as_str() {
        "on" => {
            require_toggle_rights(state, ctx).await?;
            if state.prefs.chatbot_enabled(ctx.chat_id.0) {
                send_response(
                    &state.bot,
                    ctx.chat_id,
                    "ℹ️ Le chatbot est déjà activé dans ce chat.",
                )
                .await;
                return Ok(());
            }
            let chat_name = ctx
                .chat_title
                .clone()
                .unwrap_or_else(|| ctx.display_name());
            state
                .prefs
                .enable_chatbot(ctx.chat_id.0, &ctx.telegram_id, &chat_name)?;
            send_response(
                &state.bot,
                ctx.chat_id,
                "✅ **Chatbot activé !**\n\nJe réponds maintenant aux messages de ce chat.\nEn groupe, mentionnez-moi ou répondez à un de mes messages.\n\nDésactivation : `/chatbot off`",
            )
            .await;
        }
        "off" => {
            require_toggle_rights(state, ctx).await?;
            let removed = state.prefs.disable_chatbot(ctx.chat_id.0)?;
            let text = if removed {
                "❌ **Chatbot désactivé**\n\nJe ne réponds plus qu'aux commandes. Réactivation : `/chatbot on`"
            } else {
                "ℹ️ Le chatbot est déjà désactivé dans ce chat."
            };
            send_response(&state.bot, ctx.chat_id, text).await;
        }
        _ => {
            let enabled = state.prefs.chatbot_enabled(ctx.chat_id.0);
            let status = if enabled {
                "🟢 Activé"
            } else {
                "🔴 Désactivé"
            };
            let text = format!(
                "🤖 **MODE CHATBOT**\n\n**Statut :** {status}\n\n\
                 `/chatbot on` — activer les réponses automatiques\n\
                 `/chatbot off` — les désactiver\n\n\
                 En groupe, je réponds quand on me mentionne ou qu'on répond à mes messages."
            );
            send_response(&state.bot, ctx.chat_id, &text).await;
        }
    }
    Ok(())
}

/// In groups only chat admins flip the switch. The bot owner always can.
async fn require_toggle_rights(
    state: &Arc<AppState>,
    ctx: &CommandContext,
) -> Result<(), BotError> {
    if ctx.scope != ChatScope::Group || state.config.is_admin(&ctx.telegram_id) {
        return Ok(());
    }
    let user_id: u64 = ctx
        .telegram_id
        .parse()
        .map_err(|_| BotError::Authorization)?;
    let member = state
        .bot
        .get_chat_member(ctx.chat_id, UserId(user_id))
        .await?;
    if member.is_administrator() || member.is_owner() {
        Ok(())
    } else {
        Err(BotError::UserInput(
            "🚫 Seuls les administrateurs du groupe peuvent configurer le chatbot.".into(),
        ))
    }
}

/// Entry point for plain text messages. Applies the opt-in and the group
/// mention rules, then answers through the AI provider chain.
pub async fn maybe_auto_reply(
    state: &Arc<AppState>,
    ctx: &CommandContext,
    text: &str,
    replied_to_bot: bool,
) {
    if !state.prefs.chatbot_enabled(ctx.chat_id.0) {
        return;
    }

    let mention = format!("@{}", state.config.bot_username);
    let mentioned = text.to_lowercase().contains(&mention.to_lowercase());
    if ctx.scope != ChatScope::Private && !mentioned && !replied_to_bot {
        return;
    }

    let cleaned = strip_mention(text, &state.config.bot_username);
    if cleaned.is_empty() {
        return;
    }

    crate::telegram::send_typing(&state.bot, ctx.chat_id).await;

    let reply = match generate_reply(state, ctx, &cleaned).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!("Chatbot reply failed for chat {}: {e}", ctx.chat_id);
            "Oups! 😅 Je me suis un peu perdu là. Tu peux réessayer ?".to_string()
        }
    };

    state
        .chat_memory
        .remember(&ctx.telegram_id, format!("User: {cleaned}"));
    state
        .chat_memory
        .remember(&ctx.telegram_id, format!("Bot: {reply}"));

    send_response(&state.bot, ctx.chat_id, &reply).await;
}

async fn generate_reply(
    state: &Arc<AppState>,
    ctx: &CommandContext,
    message: &str,
) -> Result<String, BotError> {
    let history = state.chat_memory.recent(&ctx.telegram_id, CONTEXT_WINDOW);
    let mut prompt = String::from(PERSONA_PROMPT);
    if !history.is_empty() {
        prompt.push_str("\n\nContexte de la conversation:\n");
        prompt.push_str(&history.join("\n"));
    }
    prompt.push_str(&format!("\n\nUser: {message}\n\nRéponds naturellement:"));

    let answer = state.princetech.ask_gpt(&prompt).await?;
    let answer = answer.trim();
    if answer.is_empty() {
        Ok("Hmm, laisse-moi réfléchir... 🤔 Tu peux reformuler ?".to_string())
    } else {
        Ok(answer.to_string())
    }
}

/// Removes the @bot mention wherever it appears in the message.
pub fn strip_mention(text: &str, bot_username: &str) -> String {
    let mention = format!("@{bot_username}");
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let lower_mention = mention.to_lowercase();
    loop {
        let lower = rest.to_lowercase();
        match lower.find(&lower_mention) {
            Some(pos) => {
                out.push_str(&rest[..pos]);
                rest = &rest[pos + mention.len()..];
            }
            None => {
                out.push_str(rest);
                break;
            }
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_caps_at_twenty_lines() {
        let memory = ChatMemory::new();
        for i in 0..30 {
            memory.remember("7", format!("ligne {i}"));
        }
        let all = memory.recent("7", 100);
        assert_eq!(all.len(), MEMORY_CAP);
        assert_eq!(all.first().map(String::as_str), Some("ligne 10"));
        assert_eq!(all.last().map(String::as_str), Some("ligne 29"));
    }

    #[test]
    fn test_recent_returns_latest_in_order() {
        let memory = ChatMemory::new();
        memory.remember("7", "a".into());
        memory.remember("7", "b".into());
        memory.remember("7", "c".into());
        assert_eq!(memory.recent("7", 2), vec!["b".to_string(), "c".to_string()]);
        assert!(memory.recent("8", 2).is_empty());
    }

    #[test]
    fn test_strip_mention_case_insensitive() {
        assert_eq!(strip_mention("@NiceBot salut toi", "nicebot"), "salut toi");
        assert_eq!(strip_mention("salut @nicebot toi", "nicebot"), "salut toi");
        assert_eq!(strip_mention("sans mention", "nicebot"), "sans mention");
    }
}
