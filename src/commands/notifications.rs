//! Reminders and the weather-alert subscription.

use std::sync::Arc;

use chrono::{Duration, Local};

use crate::dispatch::CommandContext;
use crate::error::BotError;
use crate::reminders::{format_duration, parse_duration};
use crate::runtime::AppState;
use crate::telegram::send_response;

/// /rappel <durée> <message>
pub async fn rappel(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    if ctx.args.len() < 2 {
        return Err(BotError::UserInput(
            "⏰ **RAPPELS**\n\nUsage : `/rappel <durée> <message>`\n\n\
             **Durées acceptées :** `30s`, `5min`, `2h`, `1h30min`, ou un nombre de minutes.\n\
             **Maximum :** 24 heures.\n\n\
             Exemples :\n`/rappel 10min Sortir le gâteau du four`\n`/rappel 2h Appeler le garagiste`"
                .into(),
        ));
    }

    let duration_secs = parse_duration(&ctx.args[0]).ok_or_else(|| {
        BotError::UserInput(format!(
            "❌ Durée invalide : `{}`. Exemples : 5min, 1h, 30s, 2h30min",
            ctx.args[0]
        ))
    })?;
    let message = ctx.args[1..].join(" ");

    state
        .reminders
        .schedule(&ctx.telegram_id, ctx.chat_id.0, duration_secs, &message)?;

    let fires_at = Local::now() + Duration::seconds(duration_secs as i64);
    let text = format!(
        "✅ **RAPPEL PROGRAMMÉ**\n\n\
         **Dans :** {}\n\
         **Message :** {message}\n\
         **Heure prévue :** {}\n\n\
         Je vous préviendrai ici même ! ⏰",
        format_duration(duration_secs),
        fires_at.format("%H:%M"),
    );
    send_response(&state.bot, ctx.chat_id, &text).await;
    Ok(())
}

/// /mesrappels — active reminders of the caller, soonest first.
pub async fn mesrappels(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    let active = state.reminders.list_active(&ctx.telegram_id);
    if active.is_empty() {
        send_response(
            &state.bot,
            ctx.chat_id,
            "📭 **Aucun rappel actif**\n\nUtilisez `/rappel` pour en créer un !",
        )
        .await;
        return Ok(());
    }

    let mut text = String::from("⏰ **VOS RAPPELS ACTIFS**\n\n");
    for (index, reminder) in active.iter().enumerate() {
        text.push_str(&format!(
            "**{}.** {}\n⏱️ Dans {} • 🆔 `{}`\n\n",
            index + 1,
            reminder.message,
            format_duration(reminder.remaining_secs),
            reminder.id,
        ));
    }
    text.push_str("💡 Les rappels sont perdus si le bot redémarre.");
    send_response(&state.bot, ctx.chat_id, &text).await;
    Ok(())
}

/// /alert <ville> — weather alert opt-in. The subscription is declarative
/// for now; no background watcher runs behind it.
pub async fn alert(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    if ctx.args.is_empty() {
        return Err(BotError::UserInput(
            "🌩️ **ALERTES MÉTÉO**\n\nUsage : `/alert <ville>`\n\n\
             Exemple : `/alert Marseille`\n\n\
             Vous serez notifié en cas de conditions météo notables."
                .into(),
        ));
    }
    let city = ctx.args_joined();

    // Validate the city against the live weather service before confirming.
    let report = state.weather.fetch(&city).await?;
    let text = format!(
        "✅ **ALERTES MÉTÉO ACTIVÉES**\n\n\
         **Ville :** {}\n\
         **Conditions actuelles :** {} {} ({:.1}°C)\n\n\
         Vous serez alerté ici en cas de changement important. 🌦️",
        report.location, report.emoji, report.description, report.temperature_c,
    );
    send_response(&state.bot, ctx.chat_id, &text).await;
    Ok(())
}
