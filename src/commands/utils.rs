//! Everyday utilities: translation, weather, currency, QR codes and PDF
//! generation.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{InputFile, ParseMode};

use crate::clients::media::qr_image_url;
use crate::clients::translate::auto_target_lang;
use crate::currency;
use crate::dispatch::CommandContext;
use crate::error::BotError;
use crate::pdf::render_document;
use crate::runtime::AppState;
use crate::telegram::send_response;

/// /traduire <texte> [code langue] — the trailing two-letter code, when
/// present, overrides the automatic direction.
pub async fn traduire(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    if ctx.args.is_empty() {
        return Err(BotError::UserInput(
            "🌍 **TRADUCTION**\n\nUsage : `/traduire <texte>`\n\
             Ajoutez un code langue à la fin pour forcer la cible : `/traduire bonjour en`\n\n\
             Exemples : `/traduire hello world`, `/traduire merci beaucoup es`"
                .into(),
        ));
    }

    let (text, target) = split_explicit_target(&ctx.args);
    let target = target.unwrap_or_else(|| auto_target_lang(&text).to_string());

    let translation = state.translator.translate(&text, &target).await?;
    let reply = format!(
        "🌍 **Traduction ({})**\n\n**Original :** {text}\n**Traduit :** {}\n\n_via {}_",
        target.to_uppercase(),
        translation.text,
        translation.provider
    );
    send_response(&state.bot, ctx.chat_id, &reply).await;
    Ok(())
}

/// A trailing two-letter ASCII token is read as the target language,
/// provided there is still text left to translate.
fn split_explicit_target(args: &[String]) -> (String, Option<String>) {
    if args.len() >= 2 {
        let last = &args[args.len() - 1];
        if last.len() == 2 && last.chars().all(|c| c.is_ascii_alphabetic()) {
            return (
                args[..args.len() - 1].join(" "),
                Some(last.to_lowercase()),
            );
        }
    }
    (args.join(" "), None)
}

/// /meteo <ville>
pub async fn meteo(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    if ctx.args.is_empty() {
        return Err(BotError::UserInput(
            "🌤️ **MÉTÉO**\n\nUsage : `/meteo <ville>`\n\nExemples : `/meteo Paris`, `/meteo Dakar`"
                .into(),
        ));
    }
    let city = ctx.args_joined();
    let report = state.weather.fetch(&city).await?;

    let mut text = format!(
        "{} **MÉTÉO À {}**\n\n\
         **Conditions :** {}\n\
         **Température :** {:.1}°C",
        report.emoji,
        report.location.to_uppercase(),
        report.description,
        report.temperature_c,
    );
    if let Some(feels) = report.feels_like_c {
        text.push_str(&format!("\n**Ressenti :** {feels:.1}°C"));
    }
    if let Some(humidity) = report.humidity_pct {
        text.push_str(&format!("\n**Humidité :** {humidity:.0}%"));
    }
    if let Some(wind) = &report.wind {
        text.push_str(&format!("\n**Vent :** {wind}"));
    }
    if !report.country.is_empty() {
        text.push_str(&format!("\n**Pays :** {}", report.country));
    }
    if report.provider == "Open-Meteo" {
        text.push_str("\n\n🔄 *Service de secours utilisé (Open-Meteo)*");
    }
    send_response(&state.bot, ctx.chat_id, &text).await;
    Ok(())
}

/// /devise <montant> <de> <vers>
pub async fn devise(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    if ctx.args.len() != 3 {
        return Err(BotError::UserInput(
            "💱 **CONVERSION DE DEVISES**\n\n\
             Usage : `/devise <montant> <de> <vers>`\n\n\
             Exemples : `/devise 100 EUR USD`, `/devise 50 USD XOF`\n\n\
             Devises : EUR, USD, GBP, JPY, XOF, MAD, BTC et 24 autres."
                .into(),
        ));
    }

    let amount: f64 = ctx.args[0]
        .replace(',', ".")
        .parse()
        .map_err(|_| BotError::UserInput(format!("❌ Montant invalide : {}", ctx.args[0])))?;
    let from = ctx.args[1].to_uppercase();
    let to = ctx.args[2].to_uppercase();

    let conversion = currency::convert(amount, &from, &to).ok_or_else(|| {
        BotError::UserInput(format!(
            "❌ Devise inconnue ({from} ou {to}). Essayez EUR, USD, GBP, XOF, MAD..."
        ))
    })?;

    let text = format!(
        "💱 **CONVERSION**\n\n\
         **{:.2} {from}** = **{:.2} {to}** {}\n\n\
         **Taux :** 1 {from} = {:.4} {to}",
        conversion.amount,
        conversion.converted,
        currency::symbol_for(&to),
        conversion.rate,
    );
    send_response(&state.bot, ctx.chat_id, &text).await;
    Ok(())
}

/// /qr <texte> — image when possible, bare link otherwise.
pub async fn qr(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    if ctx.args.is_empty() {
        return Err(BotError::UserInput(
            "📱 **QR CODE**\n\nUsage : `/qr <texte ou lien>`\n\nExemple : `/qr https://exemple.fr`"
                .into(),
        ));
    }
    let content = ctx.args_joined();
    let image_url = qr_image_url(&content);

    let caption = format!("📱 **QR Code généré**\n\n**Contenu :** {content}");
    let sent = match reqwest::Url::parse(&image_url) {
        Ok(url) => state
            .bot
            .send_photo(ctx.chat_id, InputFile::url(url))
            .caption(&caption)
            .parse_mode(ParseMode::Markdown)
            .await
            .is_ok(),
        Err(_) => false,
    };
    if !sent {
        let text = format!("{caption}\n\n🔗 [Télécharger le QR code]({image_url})");
        send_response(&state.bot, ctx.chat_id, &text).await;
    }
    Ok(())
}

/// /pdf <texte> — renders the text into a one-page document.
pub async fn pdf(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    if ctx.args.is_empty() {
        return Err(BotError::UserInput(
            "📄 **GÉNÉRATEUR PDF**\n\nUsage : `/pdf <texte>`\n\nExemple : `/pdf Ma liste de courses...`"
                .into(),
        ));
    }
    let body = ctx.args_joined();
    let document = render_document("Document NICE-BOT", &body);

    state
        .bot
        .send_document(
            ctx.chat_id,
            InputFile::memory(document).file_name("document.pdf"),
        )
        .caption("📄 **Votre document PDF est prêt !**")
        .parse_mode(ParseMode::Markdown)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_explicit_target_detected() {
        let (text, target) = split_explicit_target(&args(&["bonjour", "tout", "le", "monde", "en"]));
        assert_eq!(text, "bonjour tout le monde");
        assert_eq!(target.as_deref(), Some("en"));
    }

    #[test]
    fn test_short_words_are_not_language_codes_alone() {
        // A single two-letter word is text, not a target.
        let (text, target) = split_explicit_target(&args(&["ok"]));
        assert_eq!(text, "ok");
        assert_eq!(target, None);
    }

    #[test]
    fn test_numeric_tail_is_not_a_target() {
        let (text, target) = split_explicit_target(&args(&["prix", "42"]));
        assert_eq!(text, "prix 42");
        assert_eq!(target, None);
    }
}
