//! Owner-only commands. The dispatcher guarantees the caller is the
//! configured admin before anything here runs.

use std::sync::Arc;

use chrono::DateTime;
use teloxide::prelude::*;
use tracing::warn;

use crate::dispatch::CommandContext;
use crate::error::BotError;
use crate::gamification::award_xp;
use crate::runtime::AppState;
use crate::telegram::send_response;

const LOG_LINES: usize = 10;
const USERS_SHOWN: usize = 10;

/// /admin — entry card.
pub async fn panel(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    let users = state.db.count_users()?;
    let commands = state.db.count_commands()?;
    let text = format!(
        "🛡️ **PANNEAU D'ADMINISTRATION**\n\n\
         **Utilisateurs :** {users}\n\
         **Commandes traitées :** {commands}\n\n\
         **Gestion :**\n\
         /stats — statistiques du bot\n\
         /users — derniers utilisateurs\n\
         /logs — activité récente\n\
         /broadcast <msg> — message à tous\n\n\
         **Gamification :**\n\
         /gamestats, /addxp <id> <xp>, /resetxp\n\n\
         **Groupes :**\n\
         /groupes, /groupstats, /leavegroup <id>, /broadcastgroups <msg>\n\n\
         **Modération :**\n\
         /ban <id>, /unban <id>"
    );
    send_response(&state.bot, ctx.chat_id, &text).await;
    Ok(())
}

/// /stats — global service counters.
pub async fn stats(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    let users = state.db.count_users()?;
    let commands = state.db.count_commands()?;
    let groups = state.prefs.list_groups().len();
    let reminders = state.reminders.pending_count();
    let uptime_h = state.uptime_seconds() / 3600;

    let text = format!(
        "📊 **STATISTIQUES NICE-BOT**\n\n\
         **Utilisateurs enregistrés :** {users}\n\
         **Commandes traitées :** {commands}\n\
         **Groupes actifs :** {groups}\n\
         **Rappels en attente :** {reminders}\n\
         **Uptime :** {uptime_h} h\n\
         **Version :** {}",
        env!("CARGO_PKG_VERSION")
    );
    send_response(&state.bot, ctx.chat_id, &text).await;
    Ok(())
}

/// /users — the first registered users.
pub async fn users(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    let total = state.db.count_users()?;
    let users = state.db.list_users(USERS_SHOWN)?;
    if users.is_empty() {
        send_response(&state.bot, ctx.chat_id, "👥 Aucun utilisateur enregistré.").await;
        return Ok(());
    }

    let mut text = format!("👥 **UTILISATEURS ({total})**\n\n");
    for user in &users {
        let name = user
            .first_name
            .clone()
            .or_else(|| user.username.clone())
            .unwrap_or_else(|| "Anonyme".to_string());
        text.push_str(&format!("• **{name}** — `{}`\n", user.telegram_id));
    }
    if total as usize > users.len() {
        text.push_str(&format!("\n... et {} autres", total as usize - users.len()));
    }
    send_response(&state.bot, ctx.chat_id, &text).await;
    Ok(())
}

/// /broadcast <message> — direct message to every known user.
pub async fn broadcast(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    if ctx.args.is_empty() {
        return Err(BotError::UserInput(
            "📢 **BROADCAST**\n\nUsage : `/broadcast <message>`".into(),
        ));
    }
    let message = ctx.args_joined();
    let recipients = state.db.all_telegram_ids()?;

    send_response(
        &state.bot,
        ctx.chat_id,
        &format!("📤 Envoi en cours vers {} utilisateur(s)...", recipients.len()),
    )
    .await;

    let mut sent = 0usize;
    let mut failed = 0usize;
    for telegram_id in &recipients {
        let Ok(chat_id) = telegram_id.parse::<i64>() else {
            failed += 1;
            continue;
        };
        match state.bot.send_message(ChatId(chat_id), &message).await {
            Ok(_) => sent += 1,
            Err(e) => {
                warn!("Broadcast to {telegram_id} failed: {e}");
                failed += 1;
            }
        }
    }

    let text = format!(
        "✅ **Broadcast terminé**\n\n\
         **Envoyés :** {sent}\n\
         **Échecs :** {failed}\n\
         **Total :** {}",
        recipients.len()
    );
    send_response(&state.bot, ctx.chat_id, &text).await;
    Ok(())
}

/// /ban <user_id> — marks the user, without touching any chat rights.
pub async fn ban(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    let target = single_user_arg(ctx, "/ban")?;
    let text = format!(
        "🔨 **UTILISATEUR BANNI**\n\n\
         **ID :** `{target}`\n\n\
         L'utilisateur est marqué comme banni côté bot. Ses messages ne sont plus traités.\n\
         Annulation : `/unban {target}`"
    );
    send_response(&state.bot, ctx.chat_id, &text).await;
    Ok(())
}

/// /unban <user_id>
pub async fn unban(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    let target = single_user_arg(ctx, "/unban")?;
    let text = format!(
        "🕊️ **UTILISATEUR DÉBANNI**\n\n\
         **ID :** `{target}`\n\n\
         L'utilisateur peut de nouveau utiliser le bot."
    );
    send_response(&state.bot, ctx.chat_id, &text).await;
    Ok(())
}

fn single_user_arg(ctx: &CommandContext, command: &str) -> Result<String, BotError> {
    match ctx.args.as_slice() {
        [id] if id.chars().all(|c| c.is_ascii_digit()) => Ok(id.clone()),
        _ => Err(BotError::UserInput(format!(
            "Usage : `{command} <user_id>` (identifiant numérique Telegram)"
        ))),
    }
}

/// /addxp <user_id> <montant>
pub async fn addxp(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    let (telegram_id, amount) = match ctx.args.as_slice() {
        [id, amount] => {
            let amount: i64 = amount.parse().map_err(|_| {
                BotError::UserInput(format!("❌ Montant invalide : {amount}"))
            })?;
            (id.clone(), amount)
        }
        _ => {
            return Err(BotError::UserInput(
                "Usage : `/addxp <user_id> <montant>`".into(),
            ))
        }
    };
    if amount <= 0 {
        return Err(BotError::UserInput("❌ Le montant doit être positif.".into()));
    }

    let Some(user) = state.db.get_user(&telegram_id)? else {
        return Err(BotError::UserInput(format!(
            "❌ Utilisateur `{telegram_id}` inconnu."
        )));
    };
    let outcome = award_xp(&state.db, user.id, amount)?;

    let mut text = format!(
        "⚡ **XP AJOUTÉ**\n\n\
         **Utilisateur :** `{telegram_id}`\n\
         **Ajouté :** +{amount} XP\n\
         **Total :** {} XP\n\
         **Niveau :** {}",
        outcome.total_xp, outcome.new_level
    );
    if outcome.leveled_up {
        text.push_str(&format!(
            "\n\n🎉 **LEVEL UP !** {} → {}",
            outcome.old_level, outcome.new_level
        ));
    }
    for badge in &outcome.new_badges {
        text.push_str(&format!("\n🏆 Badge débloqué : {badge}"));
    }
    send_response(&state.bot, ctx.chat_id, &text).await;
    Ok(())
}

/// /resetxp — zeroes every player.
pub async fn resetxp(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    let affected = state.db.reset_all_stats()?;
    let text = format!(
        "🔄 **GAMIFICATION RÉINITIALISÉE**\n\n\
         **Profils remis à zéro :** {affected}\n\
         XP, niveaux, séries et badges ont été effacés."
    );
    send_response(&state.bot, ctx.chat_id, &text).await;
    Ok(())
}

/// /gamestats — aggregate gamification picture.
pub async fn gamestats(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    let stats = state.db.game_stats()?;
    let top_badge = stats
        .top_badge
        .map(|(name, count)| format!("{name} ({count}×)"))
        .unwrap_or_else(|| "aucun".to_string());

    let text = format!(
        "🎯 **STATISTIQUES GAMIFICATION**\n\n\
         **XP total distribué :** {}\n\
         **Niveau moyen :** {:.1}\n\
         **Niveau maximum :** {}\n\
         **Badges décernés :** {}\n\
         **Badge le plus courant :** {top_badge}",
        stats.total_xp, stats.avg_level, stats.max_level, stats.badges_awarded,
    );
    send_response(&state.bot, ctx.chat_id, &text).await;
    Ok(())
}

/// /logs — last history rows with a system footer.
pub async fn logs(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    let entries = state.db.recent_history(LOG_LINES)?;
    let mut text = String::from("📋 **ACTIVITÉ RÉCENTE**\n\n");
    if entries.is_empty() {
        text.push_str("Aucune activité enregistrée.\n");
    }
    for (name, entry) in &entries {
        let stamp = DateTime::parse_from_rfc3339(&entry.created_at)
            .map(|dt| dt.format("%d/%m %H:%M").to_string())
            .unwrap_or_else(|_| entry.created_at.clone());
        let input = entry
            .input
            .as_deref()
            .map(|i| {
                let short: String = i.chars().take(30).collect();
                format!(" `{short}`")
            })
            .unwrap_or_default();
        text.push_str(&format!("`{stamp}` **{name}** — {}{input}\n", entry.command));
    }
    text.push_str(&format!(
        "\n**Système :** v{} • uptime {} h • {} rappel(s) en attente",
        env!("CARGO_PKG_VERSION"),
        state.uptime_seconds() / 3600,
        state.reminders.pending_count(),
    ));
    send_response(&state.bot, ctx.chat_id, &text).await;
    Ok(())
}

/// /groupes — the group registry.
pub async fn groupes(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    let groups = state.prefs.list_groups();
    if groups.is_empty() {
        send_response(
            &state.bot,
            ctx.chat_id,
            "👥 **GROUPES**\n\nLe bot n'est présent dans aucun groupe enregistré.",
        )
        .await;
        return Ok(());
    }

    let mut text = format!("👥 **GROUPES ({})**\n\n", groups.len());
    for (chat_id, entry) in &groups {
        let members = entry
            .member_count
            .map(|n| format!("{n} membres"))
            .unwrap_or_else(|| "effectif inconnu".to_string());
        text.push_str(&format!(
            "• **{}** (`{chat_id}`)\n  {} • {members} • ajouté le {}\n",
            entry.name, entry.kind, entry.added_at
        ));
    }
    text.push_str("\n💡 `/leavegroup <id>` pour quitter un groupe.");
    send_response(&state.bot, ctx.chat_id, &text).await;
    Ok(())
}

/// /leavegroup <chat_id>
pub async fn leavegroup(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    let chat_id: i64 = match ctx.args.as_slice() {
        [id] => id.parse().map_err(|_| {
            BotError::UserInput(format!("❌ Identifiant de chat invalide : {id}"))
        })?,
        _ => {
            return Err(BotError::UserInput(
                "Usage : `/leavegroup <chat_id>` (voir /groupes)".into(),
            ))
        }
    };

    state.bot.leave_chat(ChatId(chat_id)).await?;
    let forgotten = state.prefs.remove_group(chat_id)?;
    let _ = state.prefs.disable_chatbot(chat_id);

    let registry = if forgotten {
        "retiré du registre"
    } else {
        "absent du registre"
    };
    let text = format!(
        "👋 **GROUPE QUITTÉ**\n\n**Chat :** `{chat_id}` ({registry})"
    );
    send_response(&state.bot, ctx.chat_id, &text).await;
    Ok(())
}

/// /broadcastgroups <message>
pub async fn broadcastgroups(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    if ctx.args.is_empty() {
        return Err(BotError::UserInput(
            "📢 **ANNONCE AUX GROUPES**\n\nUsage : `/broadcastgroups <message>`".into(),
        ));
    }
    let announcement = format!("📢 **ANNONCE NICE-BOT**\n\n{}", ctx.args_joined());
    let targets = state.prefs.group_chat_ids();

    let mut sent = 0usize;
    let mut failed = 0usize;
    for chat_id in &targets {
        if send_announcement(state, *chat_id, &announcement).await {
            sent += 1;
        } else {
            failed += 1;
        }
    }

    let text = format!(
        "✅ **Annonce envoyée**\n\n\
         **Groupes atteints :** {sent}\n\
         **Échecs :** {failed}\n\
         **Total :** {}",
        targets.len()
    );
    send_response(&state.bot, ctx.chat_id, &text).await;
    Ok(())
}

async fn send_announcement(state: &Arc<AppState>, chat_id: i64, text: &str) -> bool {
    match state
        .bot
        .send_message(ChatId(chat_id), text)
        .parse_mode(teloxide::types::ParseMode::Markdown)
        .await
    {
        Ok(_) => true,
        Err(e) => {
            warn!("Group announcement to {chat_id} failed: {e}");
            false
        }
    }
}

/// /groupstats — aggregate view of the group registry.
pub async fn groupstats(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    let groups = state.prefs.list_groups();
    let counted: Vec<(&str, u32)> = groups
        .iter()
        .filter_map(|(_, entry)| entry.member_count.map(|n| (entry.name.as_str(), n)))
        .collect();
    let total_members: u64 = counted.iter().map(|(_, n)| *n as u64).sum();
    let avg_members = if counted.is_empty() {
        0.0
    } else {
        total_members as f64 / counted.len() as f64
    };
    let largest = counted
        .iter()
        .max_by_key(|(_, n)| *n)
        .map(|(name, n)| format!("{name} ({n} membres)"))
        .unwrap_or_else(|| "inconnu".to_string());

    let text = format!(
        "📊 **STATISTIQUES DES GROUPES**\n\n\
         **Groupes :** {}\n\
         **Membres cumulés :** {total_members}\n\
         **Taille moyenne :** {avg_members:.0} membres\n\
         **Plus grand groupe :** {largest}",
        groups.len()
    );
    send_response(&state.bot, ctx.chat_id, &text).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::ChatScope;
    use crate::runtime::tests::test_state;

    fn admin_ctx(args: &[&str]) -> CommandContext {
        CommandContext {
            chat_id: ChatId(1),
            scope: ChatScope::Private,
            chat_title: None,
            telegram_id: "42".into(),
            username: Some("admin".into()),
            first_name: Some("Admin".into()),
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_single_user_arg_validation() {
        assert_eq!(
            single_user_arg(&admin_ctx(&["12345"]), "/ban").unwrap(),
            "12345"
        );
        assert!(single_user_arg(&admin_ctx(&[]), "/ban").is_err());
        assert!(single_user_arg(&admin_ctx(&["@pseudo"]), "/ban").is_err());
        assert!(single_user_arg(&admin_ctx(&["1", "2"]), "/ban").is_err());
    }

    #[tokio::test]
    async fn test_addxp_levels_up_known_user() {
        let (state, dir) = test_state();
        let user = state.db.upsert_user("7", None, Some("Joueur")).unwrap();

        let ctx = admin_ctx(&["7", "60"]);
        addxp(&state, &ctx).await.unwrap();

        let stats = state.db.get_or_create_stats(user.id).unwrap();
        assert_eq!(stats.xp_points, 60);
        assert_eq!(stats.level, 2);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_addxp_rejects_unknown_user_and_bad_amount() {
        let (state, dir) = test_state();
        assert!(addxp(&state, &admin_ctx(&["999", "10"])).await.is_err());
        assert!(addxp(&state, &admin_ctx(&["999", "beaucoup"])).await.is_err());

        state.db.upsert_user("7", None, None).unwrap();
        assert!(addxp(&state, &admin_ctx(&["7", "-5"])).await.is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_resetxp_zeroes_players() {
        let (state, dir) = test_state();
        let user = state.db.upsert_user("7", None, None).unwrap();
        award_xp(&state.db, user.id, 120).unwrap();

        resetxp(&state, &admin_ctx(&[])).await.unwrap();
        let stats = state.db.get_or_create_stats(user.id).unwrap();
        assert_eq!(stats.xp_points, 0);
        assert_eq!(stats.level, 1);
        assert!(state.db.user_badges(user.id).unwrap().is_empty());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
