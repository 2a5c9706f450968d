//! Social-media download commands, all backed by the PrinceTech API.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{InputFile, ParseMode};
use tracing::warn;

use crate::clients::princetech::VideoSource;
use crate::dispatch::CommandContext;
use crate::error::BotError;
use crate::runtime::AppState;
use crate::telegram::send_response;

pub async fn tiktok(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    download(state, ctx, VideoSource::TikTok, "TikTok").await
}

pub async fn facebook(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    download(state, ctx, VideoSource::Facebook, "Facebook").await
}

pub async fn instagram(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    download(state, ctx, VideoSource::Instagram, "Instagram").await
}

pub async fn twitter(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    download(state, ctx, VideoSource::Twitter, "Twitter/X").await
}

pub async fn pinterest(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    download(state, ctx, VideoSource::Pinterest, "Pinterest").await
}

async fn download(
    state: &Arc<AppState>,
    ctx: &CommandContext,
    source: VideoSource,
    label: &str,
) -> Result<(), BotError> {
    let Some(link) = ctx.args.first() else {
        return Err(BotError::UserInput(format!(
            "⬇️ **TÉLÉCHARGEMENT {}**\n\nUsage : `/{} <lien>`\n\n\
             Collez le lien de la publication à télécharger.",
            label.to_uppercase(),
            command_name(source),
        )));
    };
    if !link.starts_with("http://") && !link.starts_with("https://") {
        return Err(BotError::UserInput(format!(
            "❌ Lien invalide : `{link}`. Collez une URL complète."
        )));
    }

    let video = state.princetech.download_video(source, link).await?;

    let mut caption = format!("⬇️ **Téléchargement {label}**");
    if let Some(title) = &video.title {
        caption.push_str(&format!("\n\n**Titre :** {title}"));
    }
    if let Some(author) = &video.author {
        caption.push_str(&format!("\n**Auteur :** {author}"));
    }
    if let Some(duration) = &video.duration {
        caption.push_str(&format!("\n**Durée :** {duration}"));
    }
    if video.is_hd {
        caption.push_str("\n**Qualité :** HD ✨");
    }

    let sent = match reqwest::Url::parse(&video.media_url) {
        Ok(url) => state
            .bot
            .send_video(ctx.chat_id, InputFile::url(url))
            .caption(&caption)
            .parse_mode(ParseMode::Markdown)
            .await
            .is_ok(),
        Err(e) => {
            warn!("{label} media URL rejected: {e}");
            false
        }
    };
    if !sent {
        // Oversized files cannot go through the Bot API; hand out the link.
        let text = format!("{caption}\n\n🔗 [Télécharger la vidéo]({})", video.media_url);
        send_response(&state.bot, ctx.chat_id, &text).await;
    }
    Ok(())
}

fn command_name(source: VideoSource) -> &'static str {
    match source {
        VideoSource::TikTok => "tiktok",
        VideoSource::Facebook => "facebook",
        VideoSource::Instagram => "instagram",
        VideoSource::Twitter => "twitter",
        VideoSource::Pinterest => "pinterest",
    }
}

/// /apk <application>
pub async fn apk(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    if ctx.args.is_empty() {
        return Err(BotError::UserInput(
            "📦 **TÉLÉCHARGEMENT APK**\n\nUsage : `/apk <nom de l'application>`\n\n\
             Exemple : `/apk WhatsApp`"
                .into(),
        ));
    }
    let app_name = ctx.args_joined();
    let apk = state.princetech.download_apk(&app_name).await?;

    let mut text = format!(
        "📦 **APK TROUVÉ**\n\n**Application :** {}",
        apk.name.as_deref().unwrap_or(&app_name)
    );
    if let Some(version) = &apk.version {
        text.push_str(&format!("\n**Version :** {version}"));
    }
    if let Some(size) = &apk.size {
        text.push_str(&format!("\n**Taille :** {size}"));
    }
    text.push_str(&format!(
        "\n\n🔗 [Télécharger l'APK]({})\n\n⚠️ Installez uniquement des applications de confiance.",
        apk.download_url
    ));
    send_response(&state.bot, ctx.chat_id, &text).await;
    Ok(())
}
