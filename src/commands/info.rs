//! Content lookups: movies, news, encyclopedia, memes, quotes and jokes.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{InputFile, ParseMode};
use tracing::warn;

use crate::clients::tmdb::rating_stars;
use crate::dispatch::CommandContext;
use crate::error::BotError;
use crate::runtime::AppState;
use crate::telegram::send_response;

const NEWS_EXTRACT_CHARS: usize = 500;
const OVERVIEW_CHARS: usize = 400;

/// /film <titre>
pub async fn film(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    if ctx.args.is_empty() {
        return Err(BotError::UserInput(
            "🎬 **RECHERCHE DE FILMS**\n\nUsage : `/film <titre>`\n\n\
             Exemples : `/film Inception`, `/film Le Fabuleux Destin d'Amélie Poulain`"
                .into(),
        ));
    }
    if !state.tmdb.is_configured() {
        return Err(BotError::UserInput(
            "❌ La recherche de films n'est pas configurée sur ce bot.".into(),
        ));
    }
    let query = ctx.args_joined();
    let Some(movie) = state.tmdb.search(&query).await? else {
        return Err(BotError::UserInput(format!(
            "❌ Aucun film trouvé pour '{query}'."
        )));
    };

    let year = movie.release_date.split('-').next().unwrap_or("?");
    let overview = truncate(&movie.overview, OVERVIEW_CHARS);
    let mut text = format!("🎬 **{}** ({year})\n", movie.title);
    if let Some(original) = &movie.original_title {
        if original != &movie.title {
            text.push_str(&format!("_Titre original : {original}_\n"));
        }
    }
    text.push_str(&format!(
        "\n**Note :** {} {:.1}/10 ({} votes)\n\n**Synopsis :**\n{overview}",
        rating_stars(movie.vote_average),
        movie.vote_average,
        movie.vote_count,
    ));
    send_response(&state.bot, ctx.chat_id, &text).await;
    Ok(())
}

/// /news <sujet>
pub async fn news(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    if ctx.args.is_empty() {
        return Err(BotError::UserInput(
            "📰 **ACTUALITÉS**\n\nUsage : `/news <sujet>`\n\n\
             Exemples : `/news intelligence artificielle`, `/news coupe du monde`"
                .into(),
        ));
    }
    let topic = ctx.args_joined();
    let article = state.princetech.wikimedia_summary(&topic).await?;
    if article.extract.trim().is_empty() {
        return Err(BotError::UserInput(format!(
            "❌ Aucune actualité trouvée pour '{topic}'."
        )));
    }

    let mut text = format!(
        "📰 **Actualités - {}**\n\n{}",
        article.title,
        truncate(&article.extract, NEWS_EXTRACT_CHARS)
    );
    if let Some(url) = &article.page_url {
        text.push_str(&format!("\n\n🔗 **Plus d'infos :** {url}"));
    }
    send_response(&state.bot, ctx.chat_id, &text).await;
    Ok(())
}

/// /wiki <terme>
pub async fn wiki(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    if ctx.args.is_empty() {
        return Err(BotError::UserInput(
            "📚 **WIKIPÉDIA**\n\nUsage : `/wiki <terme>`\n\nExemple : `/wiki Marie Curie`".into(),
        ));
    }
    let term = ctx.args_joined();
    let Some(article) = state.wiki.summary(&term).await? else {
        return Err(BotError::UserInput(format!(
            "❌ Aucun article trouvé pour '{term}'."
        )));
    };

    let text = format!(
        "📚 **{}**\n\n{}\n\n🔗 [Lire l'article complet]({})",
        article.title,
        truncate(&article.extract, NEWS_EXTRACT_CHARS),
        article.page_url,
    );
    send_response(&state.bot, ctx.chat_id, &text).await;
    Ok(())
}

/// /meme — random meme as photo or animation, text link as last resort.
pub async fn meme(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    let meme = state.memes.random().await?;

    let spoiler_line = if meme.spoiler {
        "\n⚠️ **Spoiler !**"
    } else {
        ""
    };
    let caption = format!(
        "😂 **{}**\n\n📱 **Subreddit :** r/{}\n👤 **Auteur :** u/{}\n⬆️ **Upvotes :** {}{spoiler_line}\n\n🔗 [Voir sur Reddit]({})",
        meme.title, meme.subreddit, meme.author, meme.ups, meme.post_link,
    );

    let sent = match reqwest::Url::parse(&meme.media_url) {
        Ok(url) if meme.animated => state
            .bot
            .send_animation(ctx.chat_id, InputFile::url(url))
            .caption(&caption)
            .parse_mode(ParseMode::Markdown)
            .await
            .is_ok(),
        Ok(url) => state
            .bot
            .send_photo(ctx.chat_id, InputFile::url(url))
            .caption(&caption)
            .parse_mode(ParseMode::Markdown)
            .await
            .is_ok(),
        Err(e) => {
            warn!("Meme media URL rejected: {e}");
            false
        }
    };
    if !sent {
        let text = format!("{caption}\n\n🖼️ [Image]({})", meme.media_url);
        send_response(&state.bot, ctx.chat_id, &text).await;
    }
    Ok(())
}

/// /citation
pub async fn citation(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    let quote = state.fun.random_quote().await;
    let text = format!(
        "✨ **Citation inspirante**\n\n*\"{}\"*\n\n**— {}**",
        quote.text, quote.author
    );
    send_response(&state.bot, ctx.chat_id, &text).await;
    Ok(())
}

/// /blague
pub async fn blague(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    let joke = state.fun.random_joke().await;
    let text = format!("😄 **BLAGUE DU JOUR**\n\n{joke}");
    send_response(&state.bot, ctx.chat_id, &text).await;
    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_keeps_short_text() {
        assert_eq!(truncate("court", 500), "court");
    }

    #[test]
    fn test_truncate_cuts_on_char_boundary() {
        let long = "é".repeat(600);
        let cut = truncate(&long, 500);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), 503);
    }
}
