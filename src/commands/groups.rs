//! Group lifecycle: welcome on add, registry upkeep, and the in-group
//! configuration commands.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{
    ChatMemberKind, ChatMemberUpdated, InlineKeyboardButton, InlineKeyboardMarkup, ParseMode,
    UserId,
};
use tracing::{error, info, warn};

use crate::dispatch::{ChatScope, CommandContext};
use crate::error::BotError;
use crate::runtime::AppState;
use crate::telegram::send_response;

/// my_chat_member updates: the bot being added to or removed from a chat.
pub async fn handle_membership_change(state: &Arc<AppState>, change: ChatMemberUpdated) {
    let chat = &change.chat;
    if chat.is_private() {
        return;
    }

    let was_in = {
        let old = &change.old_chat_member;
        old.is_member() || old.is_administrator() || old.is_owner()
    };
    let now_in = {
        let new = &change.new_chat_member;
        new.is_member() || new.is_administrator() || new.is_owner()
    };

    if !was_in && now_in {
        let name = chat.title().unwrap_or("groupe sans nom").to_string();
        let kind = if chat.is_channel() { "channel" } else { "group" };
        let member_count = state
            .bot
            .get_chat_member_count(chat.id)
            .await
            .ok()
            .map(|n| n as u32);

        info!("Added to {kind} {} ({})", name, chat.id);
        if let Err(e) = state
            .prefs
            .record_group(chat.id.0, &name, kind, member_count)
        {
            error!("Failed to record group {}: {e}", chat.id);
        }

        let members = member_count
            .map(|n| format!("{n} membres"))
            .unwrap_or_else(|| "effectif inconnu".to_string());
        let text = format!(
            "🎉 **BIENVENUE DANS NICE-BOT !**\n\n\
             Merci de m'avoir ajouté à **{name}** ({members}) !\n\n\
             **Pour démarrer :**\n\
             • /imenu — menu interactif\n\
             • /help — liste des commandes\n\
             • /chatbot on — réponses automatiques (admins)\n\
             • /setupgroup — configuration du groupe\n\n\
             Bonne découverte ! 🚀"
        );
        send_response(&state.bot, chat.id, &text).await;
    } else if was_in && !now_in {
        info!("Removed from chat {}", chat.id);
        match state.prefs.remove_group(chat.id.0) {
            Ok(_) => {}
            Err(e) => error!("Failed to forget group {}: {e}", chat.id),
        }
        if let Err(e) = state.prefs.disable_chatbot(chat.id.0) {
            warn!("Failed to reset chatbot flag for {}: {e}", chat.id);
        }
    }
}

/// True when the caller is owner or admin of the given group chat.
pub async fn is_group_admin(
    state: &Arc<AppState>,
    chat_id: ChatId,
    telegram_id: &str,
) -> Result<bool, BotError> {
    if state.config.is_admin(telegram_id) {
        return Ok(true);
    }
    let user_id: u64 = match telegram_id.parse() {
        Ok(id) => id,
        Err(_) => return Ok(false),
    };
    let member = state.bot.get_chat_member(chat_id, UserId(user_id)).await?;
    Ok(member.is_administrator() || member.is_owner())
}

fn require_group(ctx: &CommandContext) -> Result<(), BotError> {
    if ctx.scope == ChatScope::Group {
        Ok(())
    } else {
        Err(BotError::UserInput(
            "❌ Cette commande ne fonctionne que dans un groupe.".into(),
        ))
    }
}

/// /setupgroup — group configuration overview, admins only.
pub async fn setupgroup(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    require_group(ctx)?;
    if !is_group_admin(state, ctx.chat_id, &ctx.telegram_id).await? {
        return Err(BotError::UserInput(
            "🚫 Seuls les administrateurs du groupe peuvent lancer la configuration.".into(),
        ));
    }

    let name = ctx.chat_title.clone().unwrap_or_else(|| "ce groupe".into());
    let chatbot = if state.prefs.chatbot_enabled(ctx.chat_id.0) {
        "🟢 activé"
    } else {
        "🔴 désactivé"
    };
    let text = format!(
        "⚙️ **CONFIGURATION DE {}**\n\n\
         **Chatbot :** {chatbot}\n\
         **Commandes :** actives pour tous les membres\n\
         **Rappels :** disponibles via /rappel\n\n\
         **Réglages :**\n\
         • `/chatbot on` / `/chatbot off` — réponses automatiques\n\
         • `/botperms` — vérifier mes permissions\n\
         • `/groupinfo` — informations du groupe\n\n\
         💡 Donnez-moi le statut administrateur pour toutes les fonctionnalités.",
        name.to_uppercase()
    );
    send_response(&state.bot, ctx.chat_id, &text).await;
    Ok(())
}

/// /invitelink — deep links for adding the bot elsewhere.
pub async fn invitelink(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    let username = &state.config.bot_username;
    let group_link = format!("https://t.me/{username}?startgroup=true");
    let dm_link = format!("https://t.me/{username}");

    let mut rows = Vec::new();
    if let Ok(url) = reqwest::Url::parse(&group_link) {
        rows.push(vec![InlineKeyboardButton::url("➕ Ajouter à un groupe", url)]);
    }
    if let Ok(url) = reqwest::Url::parse(&dm_link) {
        rows.push(vec![InlineKeyboardButton::url("💬 Discussion privée", url)]);
    }

    let text = format!(
        "🔗 **PARTAGER NICE-BOT**\n\n\
         **Lien groupe :** {group_link}\n\
         **Lien direct :** {dm_link}\n\n\
         Partagez ces liens pour inviter le bot ailleurs !"
    );
    state
        .bot
        .send_message(ctx.chat_id, text)
        .parse_mode(ParseMode::Markdown)
        .reply_markup(InlineKeyboardMarkup::new(rows))
        .await?;
    Ok(())
}

/// /groupinfo — live facts about the current group.
pub async fn groupinfo(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    require_group(ctx)?;

    let name = ctx.chat_title.clone().unwrap_or_else(|| "groupe sans nom".into());
    let members = match state.bot.get_chat_member_count(ctx.chat_id).await {
        Ok(count) => count.to_string(),
        Err(_) => "inconnu".to_string(),
    };
    let admins = match state.bot.get_chat_administrators(ctx.chat_id).await {
        Ok(list) => list.len().to_string(),
        Err(_) => "inconnu".to_string(),
    };
    let added_at = state
        .prefs
        .list_groups()
        .into_iter()
        .find(|(id, _)| *id == ctx.chat_id.0.to_string())
        .map(|(_, entry)| entry.added_at)
        .unwrap_or_else(|| "inconnue".to_string());
    let chatbot = if state.prefs.chatbot_enabled(ctx.chat_id.0) {
        "🟢 activé"
    } else {
        "🔴 désactivé"
    };

    let text = format!(
        "📊 **INFORMATIONS DU GROUPE**\n\n\
         **Nom :** {name}\n\
         **ID :** `{}`\n\
         **Membres :** {members}\n\
         **Administrateurs :** {admins}\n\
         **Bot ajouté le :** {added_at}\n\
         **Chatbot :** {chatbot}",
        ctx.chat_id.0
    );
    send_response(&state.bot, ctx.chat_id, &text).await;
    Ok(())
}

/// /botperms — what the bot is allowed to do here.
pub async fn botperms(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    require_group(ctx)?;

    let me = state.bot.get_me().await?;
    let member = state.bot.get_chat_member(ctx.chat_id, me.id).await?;

    // The per-permission flags only exist on the administrator variant;
    // the owner holds every right implicitly.
    let granted = match &member.kind {
        ChatMemberKind::Owner(_) => Some((true, true, true, true)),
        ChatMemberKind::Administrator(admin) => Some((
            admin.can_delete_messages,
            admin.can_invite_users,
            admin.can_pin_messages,
            admin.can_restrict_members,
        )),
        _ => None,
    };

    let text = if let Some((delete, invite, pin, restrict)) = granted {
        let check = |granted: bool| if granted { "✅" } else { "❌" };
        format!(
            "🛡️ **PERMISSIONS DU BOT**\n\n\
             **Statut :** administrateur\n\n\
             {} Supprimer des messages\n\
             {} Inviter des utilisateurs\n\
             {} Épingler des messages\n\
             {} Restreindre des membres\n\n\
             Toutes les fonctionnalités sont disponibles ! 🚀",
            check(delete),
            check(invite),
            check(pin),
            check(restrict),
        )
    } else {
        "🛡️ **PERMISSIONS DU BOT**\n\n\
         **Statut :** membre simple (mode limité)\n\n\
         Je peux répondre aux commandes, mais pas modérer.\n\
         Passez-moi administrateur pour débloquer toutes les fonctionnalités."
            .to_string()
    };
    send_response(&state.bot, ctx.chat_id, &text).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group_ctx() -> CommandContext {
        CommandContext {
            chat_id: ChatId(-100200),
            scope: ChatScope::Group,
            chat_title: Some("Rustacés".into()),
            telegram_id: "1".into(),
            username: None,
            first_name: Some("Test".into()),
            args: Vec::new(),
        }
    }

    #[test]
    fn test_require_group_rejects_private_chats() {
        let mut ctx = group_ctx();
        assert!(require_group(&ctx).is_ok());
        ctx.scope = ChatScope::Private;
        assert!(matches!(require_group(&ctx), Err(BotError::UserInput(_))));
    }

    #[tokio::test]
    async fn test_bot_owner_counts_as_group_admin() {
        let (state, dir) = crate::runtime::tests::test_state();
        // admin id in the test config is "42"; no network call is needed.
        assert!(is_group_admin(&state, ChatId(-1), "42").await.unwrap());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_non_numeric_caller_is_not_admin() {
        let (state, dir) = crate::runtime::tests::test_state();
        assert!(!is_group_admin(&state, ChatId(-1), "abc").await.unwrap());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
