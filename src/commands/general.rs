//! Onboarding and service-health commands.

use std::sync::Arc;
use std::time::Instant;

use teloxide::prelude::*;

use crate::dispatch::CommandContext;
use crate::error::BotError;
use crate::runtime::AppState;
use crate::telegram::send_response;

/// /start — welcome banner.
pub async fn start(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    let text = format!(
        "🎉 **BIENVENUE SUR NICE-BOT !**\n\n\
         Salut {} ! Je suis votre assistant tout-en-un sur Telegram.\n\n\
         **Ce que je sais faire :**\n\
         🧰 Utilitaires — /traduire, /meteo, /devise, /qr, /pdf\n\
         🤖 IA — /ai, /resume, /idee\n\
         🎮 Fun — /blague, /meme, /citation, /film\n\
         📰 Infos — /news, /wiki\n\
         🎯 Gamification — /profil, /classement\n\
         ⏰ Rappels — /rappel, /mesrappels\n\n\
         **Pour commencer :**\n\
         📋 /imenu — menu interactif\n\
         ⚡ /quick — boutons d'actions rapides\n\
         ❓ /help — aide complète\n\n\
         Chaque commande vous rapporte de l'XP. Bonne exploration ! 🚀",
        ctx.display_name()
    );
    send_response(&state.bot, ctx.chat_id, &text).await;
    Ok(())
}

/// /help — compact command reference.
pub async fn help(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    let text = "❓ **AIDE NICE-BOT**\n\n\
        **🧰 Utilitaires**\n\
        /traduire <texte> — traduction automatique\n\
        /meteo <ville> — météo actuelle\n\
        /devise <montant> <de> <vers> — conversion\n\
        /qr <texte> — QR code\n\
        /pdf <texte> — document PDF\n\n\
        **🤖 IA**\n\
        /ai <question> — poser une question\n\
        /resume <texte> — résumer un texte\n\
        /idee <sujet> — 5 idées créatives\n\n\
        **🎮 Fun & Infos**\n\
        /blague, /meme, /citation, /film <titre>\n\
        /news <sujet>, /wiki <terme>\n\n\
        **⏬ Téléchargements**\n\
        /tiktok, /facebook, /instagram, /twitter, /pinterest <lien>\n\
        /apk <application>\n\n\
        **🎯 Gamification**\n\
        /profil — votre profil et vos badges\n\
        /classement — top 10 des utilisateurs\n\n\
        **⏰ Rappels**\n\
        /rappel <durée> <message>, /mesrappels, /alert <ville>\n\n\
        **⚙️ Divers**\n\
        /imenu, /quick, /hidekeyboard, /chatbot, /ping, /uptime, /about";
    send_response(&state.bot, ctx.chat_id, text).await;
    Ok(())
}

/// /about — identity card.
pub async fn about(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    let text = format!(
        "ℹ️ **À PROPOS DE NICE-BOT**\n\n\
         **Version :** {}\n\
         **Mission :** rendre Telegram plus utile et plus fun, en français.\n\n\
         **Services utilisés :**\n\
         • PrinceTech API — IA, météo, actualités, téléchargements\n\
         • Open-Meteo — météo de secours\n\
         • Wikipédia, TMDB, Meme API, Quotable\n\
         • Google Translate, MyMemory, LibreTranslate\n\n\
         Tapez /help pour la liste des commandes.",
        env!("CARGO_PKG_VERSION")
    );
    send_response(&state.bot, ctx.chat_id, &text).await;
    Ok(())
}

/// /ping — API round-trip latency.
pub async fn ping(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    let started = Instant::now();
    state.bot.get_me().await?;
    let latency_ms = started.elapsed().as_millis();

    let quality = match latency_ms {
        0..=150 => "🟢 Excellente",
        151..=400 => "🟡 Correcte",
        _ => "🔴 Lente",
    };
    let text = format!(
        "🏓 **PING TEST**\n\n\
         **Latence :** {latency_ms} ms\n\
         **Connexion :** {quality}\n\
         **Statut :** opérationnel ✅"
    );
    send_response(&state.bot, ctx.chat_id, &text).await;
    Ok(())
}

/// /uptime — time since process start.
pub async fn uptime(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    let text = format!(
        "⏱️ **UPTIME**\n\n\
         **En ligne depuis :** {}\n\
         **Statut :** opérationnel ✅",
        format_uptime(state.uptime_seconds())
    );
    send_response(&state.bot, ctx.chat_id, &text).await;
    Ok(())
}

fn format_uptime(total_secs: u64) -> String {
    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    if days > 0 {
        format!("{days}j {hours}h {minutes}min")
    } else if hours > 0 {
        format!("{hours}h {minutes}min")
    } else {
        format!("{minutes}min")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uptime_scales() {
        assert_eq!(format_uptime(59), "0min");
        assert_eq!(format_uptime(60), "1min");
        assert_eq!(format_uptime(3_660), "1h 1min");
        assert_eq!(format_uptime(90_061), "1j 1h 1min");
    }
}
