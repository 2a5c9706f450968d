//! AI assistant commands: free-form questions, summaries and idea
//! generation with an offline fallback.

use std::sync::Arc;

use tracing::warn;

use crate::dispatch::CommandContext;
use crate::error::BotError;
use crate::runtime::AppState;
use crate::telegram::send_response;

const MIN_RESUME_CHARS: usize = 50;
const RESUME_PREVIEW_CHARS: usize = 200;

/// /ai <question>
pub async fn ask(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    if ctx.args.is_empty() {
        return Err(BotError::UserInput(
            "🤖 **ASSISTANT IA**\n\nUsage : `/ai <votre question>`\n\n\
             Exemples : `/ai Explique-moi la photosynthèse`, `/ai Écris un haïku sur la pluie`"
                .into(),
        ));
    }
    let question = ctx.args_joined();
    let answer = state.princetech.ask_gpt(&question).await?;

    let text = format!(
        "🤖 **Réponse IA**\n\n**Question :** {question}\n\n**Réponse :** {answer}\n\n\
         ✨ *Propulsé par NICE-BOT AI*"
    );
    send_response(&state.bot, ctx.chat_id, &text).await;
    Ok(())
}

/// /resume <texte> — refuses inputs too short to be worth summarizing.
pub async fn resume(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    if ctx.args.is_empty() {
        return Err(BotError::UserInput(
            "📝 **RÉSUMÉ DE TEXTE**\n\nUsage : `/resume <texte à résumer>`\n\n\
             Le texte doit contenir au moins 50 caractères."
                .into(),
        ));
    }
    let text = ctx.args_joined();
    if text.chars().count() < MIN_RESUME_CHARS {
        return Err(BotError::UserInput(
            "❌ Le texte est trop court pour être résumé (minimum 50 caractères).".into(),
        ));
    }

    let prompt = format!("Résume ce texte de manière concise et claire: {text}");
    let summary = state.princetech.ask_gpt(&prompt).await?;

    let preview: String = text.chars().take(RESUME_PREVIEW_CHARS).collect();
    let ellipsis = if text.chars().count() > RESUME_PREVIEW_CHARS {
        "..."
    } else {
        ""
    };
    let reply = format!(
        "📝 **RÉSUMÉ**\n\n\
         **Texte original ({} caractères) :**\n_{preview}{ellipsis}_\n\n\
         **Résumé ({} caractères) :**\n{summary}",
        text.chars().count(),
        summary.chars().count(),
    );
    send_response(&state.bot, ctx.chat_id, &reply).await;
    Ok(())
}

/// /idee <sujet> — five ideas from the AI, canned lists when it is down.
pub async fn idee(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    if ctx.args.is_empty() {
        return Err(BotError::UserInput(
            "💡 **GÉNÉRATEUR D'IDÉES**\n\nUsage : `/idee <sujet>`\n\n\
             Exemples : `/idee cadeau d'anniversaire`, `/idee projet d'application`"
                .into(),
        ));
    }
    let topic = ctx.args_joined();
    let prompt = format!("Donne-moi 5 idées créatives et originales pour: {topic}");

    let body = match state.princetech.ask_gpt(&prompt).await {
        Ok(ideas) => ideas,
        Err(e) => {
            warn!("Idea generation fell back to templates: {e}");
            fallback_ideas(&topic)
        }
    };

    let reply = format!("💡 **5 IDÉES POUR : {}**\n\n{body}", topic.to_uppercase());
    send_response(&state.bot, ctx.chat_id, &reply).await;
    Ok(())
}

/// Canned idea lists, keyed on the most common topics.
fn fallback_ideas(topic: &str) -> String {
    let lower = topic.to_lowercase();
    if lower.contains("app") {
        "1. Une application de troc d'objets entre voisins\n\
         2. Un tracker d'habitudes avec défis entre amis\n\
         3. Un carnet de recettes qui ajuste les quantités automatiquement\n\
         4. Une app de covoiturage dédiée aux trajets scolaires\n\
         5. Un guide audio de quartier créé par ses habitants"
            .to_string()
    } else if lower.contains("projet") {
        "1. Un potager partagé connecté avec capteurs d'humidité\n\
         2. Une bibliothèque d'outils de bricolage en libre-service\n\
         3. Un podcast d'interviews des anciens du quartier\n\
         4. Un atelier de réparation de vélos communautaire\n\
         5. Une fresque murale participative"
            .to_string()
    } else if lower.contains("cadeau") {
        "1. Un album photo personnalisé retraçant une année\n\
         2. Un atelier ou cours lié à sa passion\n\
         3. Une box mensuelle adaptée à ses goûts\n\
         4. Un objet artisanal gravé à son nom\n\
         5. Une expérience à vivre ensemble (concert, escapade...)"
            .to_string()
    } else {
        format!(
            "1. Explorer {topic} sous un angle inattendu\n\
             2. Organiser un défi autour de {topic} avec des amis\n\
             3. Documenter {topic} en photos ou en vidéo\n\
             4. Trouver une version locale ou artisanale de {topic}\n\
             5. Partager {topic} avec quelqu'un qui ne connaît pas"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_ideas_keyed_on_topic() {
        assert!(fallback_ideas("une app mobile").contains("application"));
        assert!(fallback_ideas("projet associatif").contains("potager"));
        assert!(fallback_ideas("cadeau de Noël").contains("album photo"));
        let generic = fallback_ideas("jardinage");
        assert!(generic.contains("jardinage"));
        assert_eq!(generic.lines().count(), 5);
    }

    #[tokio::test]
    async fn test_resume_rejects_short_text() {
        let (state, dir) = crate::runtime::tests::test_state();
        let ctx = CommandContext {
            chat_id: teloxide::types::ChatId(1),
            scope: crate::dispatch::ChatScope::Private,
            chat_title: None,
            telegram_id: "1".into(),
            username: None,
            first_name: None,
            args: vec!["trop".into(), "court".into()],
        };
        let err = resume(&state, &ctx).await.unwrap_err();
        assert!(matches!(err, BotError::UserInput(msg) if msg.contains("50 caractères")));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
