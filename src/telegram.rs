use std::sync::Arc;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, ParseMode, UpdateKind};
use tracing::{error, info, warn};

use crate::commands;
use crate::dispatch::{self, ChatScope, CommandContext};
use crate::error::BotError;
use crate::reminders::ReminderSink;
use crate::runtime::AppState;

const MAX_MESSAGE_LEN: usize = 4096;

/// Reminder delivery through the live bot handle.
pub struct TelegramSink {
    bot: Bot,
}

impl TelegramSink {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ReminderSink for TelegramSink {
    async fn deliver(&self, chat_id: i64, text: &str) -> Result<(), BotError> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Markdown)
            .await?;
        Ok(())
    }
}

/// Split long text for Telegram's message limit, preferring newline
/// boundaries. The Telegram limit is 4096 characters; capping each chunk
/// at 4096 bytes stays within it, and the cut is always rounded down to a
/// char boundary so accented text never splits mid-character.
pub fn split_response_text(text: &str) -> Vec<String> {
    if text.len() <= MAX_MESSAGE_LEN {
        return vec![text.to_string()];
    }
    let mut chunks = Vec::new();
    let mut remaining = text;
    while !remaining.is_empty() {
        let chunk_len = if remaining.len() <= MAX_MESSAGE_LEN {
            remaining.len()
        } else {
            let window = floor_char_boundary(remaining, MAX_MESSAGE_LEN);
            match remaining[..window].rfind('\n') {
                Some(i) if i > 0 => i,
                _ => window,
            }
        };
        chunks.push(remaining[..chunk_len].to_string());
        remaining = &remaining[chunk_len..];
        if remaining.starts_with('\n') {
            remaining = &remaining[1..];
        }
    }
    chunks
}

/// Largest char boundary of `s` that is `<= max`.
fn floor_char_boundary(s: &str, max: usize) -> usize {
    let mut end = max.min(s.len());
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    end
}

/// Best-effort send: Markdown first, plain text when the markup does not
/// parse. Failures are logged, never propagated; every reply in the bot
/// goes through here.
pub async fn send_response(bot: &Bot, chat_id: ChatId, text: &str) {
    for chunk in split_response_text(text) {
        let sent = bot
            .send_message(chat_id, &chunk)
            .parse_mode(ParseMode::Markdown)
            .await;
        if sent.is_err() {
            if let Err(e) = bot.send_message(chat_id, &chunk).await {
                warn!("Failed to send message to chat {chat_id}: {e}");
            }
        }
    }
}

pub async fn send_typing(bot: &Bot, chat_id: ChatId) {
    let _ = bot.send_chat_action(chat_id, ChatAction::Typing).await;
}

/// Shared entry for polling and webhook ingress.
pub async fn handle_update(state: Arc<AppState>, update: Update) {
    match update.kind {
        UpdateKind::Message(msg) => on_message(msg, state).await,
        UpdateKind::CallbackQuery(query) => {
            if let Err(e) = commands::interactive::handle_callback(&state, query).await {
                error!("Callback handling failed: {e}");
            }
        }
        UpdateKind::MyChatMember(change) => {
            commands::groups::handle_membership_change(&state, change).await;
        }
        _ => {}
    }
}

pub async fn run_polling(state: Arc<AppState>) {
    let bot = state.bot.clone();

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(message_endpoint))
        .branch(Update::filter_callback_query().endpoint(callback_endpoint))
        .branch(Update::filter_my_chat_member().endpoint(membership_endpoint));

    info!("Bot is live, dispatching updates");
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .default_handler(|_| async {})
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn message_endpoint(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    on_message(msg, state).await;
    Ok(())
}

async fn callback_endpoint(query: CallbackQuery, state: Arc<AppState>) -> ResponseResult<()> {
    if let Err(e) = commands::interactive::handle_callback(&state, query).await {
        error!("Callback handling failed: {e}");
    }
    Ok(())
}

async fn membership_endpoint(
    change: teloxide::types::ChatMemberUpdated,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    commands::groups::handle_membership_change(&state, change).await;
    Ok(())
}

fn scope_of(chat: &teloxide::types::Chat) -> ChatScope {
    if chat.is_private() {
        ChatScope::Private
    } else if chat.is_channel() {
        ChatScope::Channel
    } else {
        ChatScope::Group
    }
}

/// Builds the abstract invocation context from an incoming message.
pub fn context_from_message(msg: &Message) -> Option<CommandContext> {
    let user = msg.from.as_ref()?;
    if user.is_bot {
        return None;
    }
    Some(CommandContext {
        chat_id: msg.chat.id,
        scope: scope_of(&msg.chat),
        chat_title: msg.chat.title().map(str::to_string),
        telegram_id: user.id.0.to_string(),
        username: user.username.clone(),
        first_name: Some(user.first_name.clone()),
        args: Vec::new(),
    })
}

async fn on_message(msg: Message, state: Arc<AppState>) {
    let Some(mut ctx) = context_from_message(&msg) else {
        return;
    };
    let Some(text) = msg.text() else {
        return;
    };

    if let Some((command, args)) = dispatch::parse_command(text, &state.config.bot_username) {
        ctx.args = args;
        send_typing(&state.bot, ctx.chat_id).await;
        dispatch::dispatch(&state, &ctx, &command).await;
        return;
    }

    // Quick-keyboard buttons arrive as plain text.
    if let Some((command, args)) = commands::interactive::match_quick_button(text) {
        ctx.args = args;
        send_typing(&state.bot, ctx.chat_id).await;
        dispatch::dispatch(&state, &ctx, &command).await;
        return;
    }

    // Remaining plain text goes to the chatbot when the chat opted in.
    let replied_to_bot = msg
        .reply_to_message()
        .and_then(|r| r.from.as_ref())
        .map(|u| {
            u.is_bot
                && u.username.as_deref().is_some_and(|name| {
                    name.eq_ignore_ascii_case(&state.config.bot_username)
                })
        })
        .unwrap_or(false);

    commands::chatbot::maybe_auto_reply(&state, &ctx, text, replied_to_bot).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_short_text_untouched() {
        let chunks = split_response_text("bonjour");
        assert_eq!(chunks, vec!["bonjour".to_string()]);
    }

    #[test]
    fn test_split_prefers_newline_boundaries() {
        let mut text = String::new();
        for i in 0..200 {
            text.push_str(&format!("Ligne {i} avec un peu de contenu\n"));
        }
        assert!(text.len() > MAX_MESSAGE_LEN);

        let chunks = split_response_text(&text);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= MAX_MESSAGE_LEN);
            assert!(!chunk.starts_with('\n'));
        }
    }

    #[test]
    fn test_split_without_newlines_cuts_at_limit() {
        let text = "a".repeat(5000);
        let chunks = split_response_text(&text);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), MAX_MESSAGE_LEN);
        assert_eq!(chunks[1].len(), 904);
    }

    #[test]
    fn test_split_never_cuts_inside_a_character() {
        // An odd leading byte puts the 4096-byte mark inside a 2-byte char.
        let text = format!("a{}", "é".repeat(3000));
        let chunks = split_response_text(&text);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= MAX_MESSAGE_LEN);
        }
        assert_eq!(chunks.concat(), text);
    }
}
