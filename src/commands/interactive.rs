//! Inline menu, quick-action reply keyboard, and the callback router.
//!
//! Callback tokens: `cat_*` opens a category submenu, `cmd_*` either
//! re-invokes the command through the dispatcher (when it takes no
//! arguments) or shows a usage notice, `main_menu` and `about_bot` render
//! fixed screens.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup, KeyboardRemove,
    ParseMode,
};
use tracing::warn;

use crate::dispatch::{self, ChatScope, CommandContext};
use crate::error::BotError;
use crate::runtime::AppState;

const WHATSAPP_URL: &str = "http://bit.ly/473vUob";

/// Commands safe to run straight from a button press.
const NO_ARG_COMMANDS: &[&str] = &[
    "/ping",
    "/uptime",
    "/meme",
    "/blague",
    "/citation",
    "/profil",
    "/classement",
    "/logs",
    "/admin",
    "/stats",
    "/users",
    "/mesrappels",
];

const QUICK_BUTTONS: &[(&str, &str, &[&str])] = &[
    ("🏓 Ping", "/ping", &[]),
    ("👤 Profil", "/profil", &[]),
    ("🌤️ Météo Paris", "/meteo", &["Paris"]),
    ("⏰ Rappel 5min Test", "/rappel", &["5min", "Test"]),
    ("🤖 Salut IA", "/ai", &["Salut", "comment", "ça", "va", "?"]),
    ("🤣 Meme", "/meme", &[]),
    ("🏆 Classement", "/classement", &[]),
    ("📋 Menu Interactif", "/imenu", &[]),
];

/// Maps a quick-keyboard button label to the command it stands for.
pub fn match_quick_button(text: &str) -> Option<(String, Vec<String>)> {
    QUICK_BUTTONS
        .iter()
        .find(|(label, _, _)| *label == text.trim())
        .map(|(_, cmd, args)| {
            (
                cmd.to_string(),
                args.iter().map(|s| s.to_string()).collect(),
            )
        })
}

fn main_menu_text() -> String {
    "🎛️ **MENU INTERACTIF NICE-BOT**\n\n\
     Choisissez une catégorie pour découvrir les commandes disponibles :"
        .to_string()
}

fn main_menu_keyboard() -> InlineKeyboardMarkup {
    let mut rows = vec![
        vec![
            InlineKeyboardButton::callback("🧰 Utilitaires", "cat_utils"),
            InlineKeyboardButton::callback("🤖 IA & Assistant", "cat_ai"),
        ],
        vec![
            InlineKeyboardButton::callback("🎮 Fun & Divertissement", "cat_fun"),
            InlineKeyboardButton::callback("📰 Info & Actualités", "cat_info"),
        ],
        vec![
            InlineKeyboardButton::callback("🎯 Gamification", "cat_game"),
            InlineKeyboardButton::callback("⏰ Notifications", "cat_notif"),
        ],
        vec![
            InlineKeyboardButton::callback("🛠️ Développement", "cat_dev"),
            InlineKeyboardButton::callback("🛡️ Admin", "cat_admin"),
        ],
    ];
    let mut last_row = Vec::new();
    if let Ok(url) = reqwest::Url::parse(WHATSAPP_URL) {
        last_row.push(InlineKeyboardButton::url("💬 Groupe WhatsApp", url));
    }
    last_row.push(InlineKeyboardButton::callback("ℹ️ À Propos", "about_bot"));
    rows.push(last_row);
    InlineKeyboardMarkup::new(rows)
}

/// (title, commands) per category token.
fn category(token: &str) -> Option<(&'static str, &'static [&'static str])> {
    match token {
        "cat_utils" => Some((
            "🧰 **UTILITAIRES**",
            &["traduire", "meteo", "devise", "qr", "pdf"],
        )),
        "cat_ai" => Some(("🤖 **IA & ASSISTANT**", &["ai", "resume", "idee"])),
        "cat_fun" => Some((
            "🎮 **FUN & DIVERTISSEMENT**",
            &["blague", "meme", "citation", "film"],
        )),
        "cat_info" => Some(("📰 **INFO & ACTUALITÉS**", &["news", "wiki"])),
        "cat_game" => Some((
            "🎯 **GAMIFICATION**",
            &["profil", "classement", "badges"],
        )),
        "cat_notif" => Some((
            "⏰ **NOTIFICATIONS**",
            &["rappel", "rappels", "alertes"],
        )),
        "cat_dev" => Some(("🛠️ **DÉVELOPPEMENT**", &["ping", "uptime", "logs"])),
        "cat_admin" => Some((
            "🛡️ **ADMINISTRATION**",
            &["admin", "stats", "users", "broadcast"],
        )),
        _ => None,
    }
}

fn category_keyboard(commands: &[&str]) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = commands
        .chunks(2)
        .map(|chunk| {
            chunk
                .iter()
                .map(|cmd| InlineKeyboardButton::callback(format!("/{cmd}"), format!("cmd_{cmd}")))
                .collect()
        })
        .collect();
    rows.push(vec![InlineKeyboardButton::callback(
        "🔙 Retour",
        "main_menu",
    )]);
    InlineKeyboardMarkup::new(rows)
}

fn about_text() -> String {
    format!(
        "ℹ️ **À PROPOS DE NICE-BOT**\n\n\
         **Version :** {}\n\
         **Mission :** rendre Telegram plus utile et plus fun.\n\n\
         **Au programme :** traduction, météo, IA, memes, gamification, \
         rappels et outils d'administration.\n\n\
         Tapez /help pour la liste complète des commandes.",
        env!("CARGO_PKG_VERSION")
    )
}

/// /imenu — the interactive inline menu.
pub async fn imenu(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    state
        .bot
        .send_message(ctx.chat_id, main_menu_text())
        .parse_mode(ParseMode::Markdown)
        .reply_markup(main_menu_keyboard())
        .await?;
    Ok(())
}

/// /quick — persistent reply keyboard with one-tap actions.
pub async fn quick(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    let rows: Vec<Vec<KeyboardButton>> = QUICK_BUTTONS
        .chunks(2)
        .map(|chunk| chunk.iter().map(|(label, _, _)| KeyboardButton::new(*label)).collect())
        .collect();
    let mut markup = KeyboardMarkup::new(rows);
    markup.resize_keyboard = true;

    state
        .bot
        .send_message(
            ctx.chat_id,
            "⚡ **ACTIONS RAPIDES**\n\nUtilisez les boutons ci-dessous pour lancer une action en un seul geste !",
        )
        .parse_mode(ParseMode::Markdown)
        .reply_markup(markup)
        .await?;
    Ok(())
}

/// /hidekeyboard — removes the quick-action keyboard.
pub async fn hidekeyboard(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    state
        .bot
        .send_message(
            ctx.chat_id,
            "✅ **Clavier masqué**\n\nUtilisez /quick pour le réafficher ou /imenu pour le menu interactif.",
        )
        .parse_mode(ParseMode::Markdown)
        .reply_markup(KeyboardRemove::new())
        .await?;
    Ok(())
}

/// Full callback handling: acknowledge, then route the token. Screen
/// updates edit the menu message in place; when the edit fails (old
/// message, media caption) a fresh message is sent instead.
pub async fn handle_callback(state: &Arc<AppState>, query: CallbackQuery) -> Result<(), BotError> {
    // Acknowledge immediately so the client stops its spinner, even for
    // tokens we end up ignoring.
    if let Err(e) = state.bot.answer_callback_query(query.id.clone()).await {
        warn!("Failed to answer callback {}: {e}", query.id);
    }

    let Some(token) = query.data.as_deref() else {
        return Ok(());
    };
    let Some(menu_msg) = query.message.as_ref() else {
        return Ok(());
    };
    let chat = menu_msg.chat();
    let chat_id = chat.id;
    let message_id = menu_msg.id();

    let scope = if chat.is_private() {
        ChatScope::Private
    } else if chat.is_channel() {
        ChatScope::Channel
    } else {
        ChatScope::Group
    };
    let ctx = CommandContext {
        chat_id,
        scope,
        chat_title: chat.title().map(str::to_string),
        telegram_id: query.from.id.0.to_string(),
        username: query.from.username.clone(),
        first_name: Some(query.from.first_name.clone()),
        args: Vec::new(),
    };

    match token {
        "main_menu" => {
            edit_screen(state, chat_id, message_id, &main_menu_text(), Some(main_menu_keyboard()))
                .await;
        }
        "about_bot" => {
            let back = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
                "🔙 Retour",
                "main_menu",
            )]]);
            edit_screen(state, chat_id, message_id, &about_text(), Some(back)).await;
        }
        "cmd_badges" => {
            let text = badge_catalog(state, &ctx)?;
            edit_screen(state, chat_id, message_id, &text, Some(back_keyboard())).await;
        }
        token if token.starts_with("cat_") => {
            if let Some((title, commands)) = category(token) {
                let text = format!("{title}\n\nSélectionnez une commande :");
                edit_screen(state, chat_id, message_id, &text, Some(category_keyboard(commands)))
                    .await;
            }
        }
        token if token.starts_with("cmd_") => {
            let command = match &token[4..] {
                "rappels" => "/mesrappels".to_string(),
                "alertes" => "/alert".to_string(),
                name => format!("/{name}"),
            };
            if NO_ARG_COMMANDS.contains(&command.as_str()) {
                dispatch::dispatch(state, &ctx, &command).await;
            } else {
                let text = format!(
                    "🎯 **Commande sélectionnée :** {command}\n\n\
                     Tapez `{command}` suivi de vos paramètres pour l'utiliser.\n\n\
                     Exemple : `{command} ...`"
                );
                edit_screen(state, chat_id, message_id, &text, Some(back_keyboard())).await;
            }
        }
        other => {
            warn!("Unknown callback token: {other}");
        }
    }
    Ok(())
}

fn back_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "🔙 Retour",
        "main_menu",
    )]])
}

async fn edit_screen(
    state: &Arc<AppState>,
    chat_id: ChatId,
    message_id: teloxide::types::MessageId,
    text: &str,
    keyboard: Option<InlineKeyboardMarkup>,
) {
    let mut edit = state
        .bot
        .edit_message_text(chat_id, message_id, text)
        .parse_mode(ParseMode::Markdown);
    if let Some(kb) = keyboard.clone() {
        edit = edit.reply_markup(kb);
    }
    if edit.await.is_ok() {
        return;
    }
    // The menu message may be a photo caption or too old to edit.
    let mut send = state
        .bot
        .send_message(chat_id, text)
        .parse_mode(ParseMode::Markdown);
    if let Some(kb) = keyboard {
        send = send.reply_markup(kb);
    }
    if let Err(e) = send.await {
        warn!("Failed to render menu screen in chat {chat_id}: {e}");
    }
}

/// Earned and still-locked badges for the calling user.
fn badge_catalog(state: &Arc<AppState>, ctx: &CommandContext) -> Result<String, BotError> {
    let user = state.db.upsert_user(
        &ctx.telegram_id,
        ctx.username.as_deref(),
        ctx.first_name.as_deref(),
    )?;
    let earned = state.db.user_badges(user.id)?;
    let locked = state.db.unearned_badges(user.id)?;

    let mut text = String::from("🏆 **BADGES**\n\n");
    if earned.is_empty() {
        text.push_str("Aucun badge débloqué pour le moment.\n");
    } else {
        text.push_str("**Débloqués :**\n");
        for badge in &earned {
            text.push_str(&format!("{} **{}** — {}\n", badge.icon, badge.name, badge.description));
        }
    }
    if !locked.is_empty() {
        text.push_str("\n**À débloquer :**\n");
        for badge in &locked {
            text.push_str(&format!("🔒 **{}** — {}\n", badge.name, badge.description));
        }
    }
    text.push_str("\nGagnez de l'XP en utilisant les commandes !");
    Ok(text)
}
