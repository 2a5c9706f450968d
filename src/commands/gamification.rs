//! Player-facing gamification: profile card and leaderboard.

use std::sync::Arc;

use crate::dispatch::CommandContext;
use crate::error::BotError;
use crate::gamification::{xp_to_next_level, LEVEL_THRESHOLDS};
use crate::runtime::AppState;
use crate::telegram::send_response;

const PROGRESS_WIDTH: usize = 10;
const MAX_BADGES_SHOWN: usize = 6;

/// /profil — level, XP, streak and badges of the caller.
pub async fn profil(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    let user = state.db.upsert_user(
        &ctx.telegram_id,
        ctx.username.as_deref(),
        ctx.first_name.as_deref(),
    )?;
    let stats = state.db.get_or_create_stats(user.id)?;
    let badges = state.db.user_badges(user.id)?;

    let progress = match xp_to_next_level(stats.xp_points) {
        Some(missing) => {
            let current_floor = LEVEL_THRESHOLDS
                .iter()
                .filter(|t| **t <= stats.xp_points)
                .max()
                .copied()
                .unwrap_or(0);
            let next = stats.xp_points + missing;
            let bar = progress_bar(stats.xp_points - current_floor, next - current_floor);
            format!("{bar}\n**Prochain niveau :** encore {missing} XP")
        }
        None => "🏆 Niveau maximum atteint !".to_string(),
    };

    let mut badge_line = if badges.is_empty() {
        "Aucun badge pour le moment — ça se mérite !".to_string()
    } else {
        badges
            .iter()
            .take(MAX_BADGES_SHOWN)
            .map(|b| format!("{} {}", b.icon, b.name))
            .collect::<Vec<_>>()
            .join(" • ")
    };
    if badges.len() > MAX_BADGES_SHOWN {
        badge_line.push_str(&format!(" (+{} autres)", badges.len() - MAX_BADGES_SHOWN));
    }

    let text = format!(
        "👤 **PROFIL DE {}**\n\n\
         **Niveau :** {} \n\
         **XP :** {} points\n\
         {progress}\n\n\
         **📊 Statistiques**\n\
         • Commandes utilisées : {}\n\
         • Série active : {} jour(s)\n\n\
         **🏅 Badges ({})**\n{badge_line}",
        ctx.display_name().to_uppercase(),
        stats.level,
        stats.xp_points,
        stats.total_commands,
        stats.streak_days,
        badges.len(),
    );
    send_response(&state.bot, ctx.chat_id, &text).await;
    Ok(())
}

/// /classement — top 10 by XP.
pub async fn classement(state: &Arc<AppState>, ctx: &CommandContext) -> Result<(), BotError> {
    let rows = state.db.leaderboard(10)?;
    if rows.is_empty() {
        send_response(
            &state.bot,
            ctx.chat_id,
            "🏆 **CLASSEMENT**\n\nPersonne au tableau pour l'instant. Soyez le premier !",
        )
        .await;
        return Ok(());
    }

    let mut text = String::from("🏆 **CLASSEMENT NICE-BOT**\n\n");
    for (rank, row) in rows.iter().enumerate() {
        let medal = match rank {
            0 => "🥇",
            1 => "🥈",
            2 => "🥉",
            _ => "🏅",
        };
        let name = row
            .first_name
            .clone()
            .or_else(|| row.username.clone())
            .unwrap_or_else(|| "Anonyme".to_string());
        text.push_str(&format!(
            "{medal} **{name}** — Niveau {} • {} XP\n",
            row.level, row.xp_points
        ));
    }
    text.push_str("\nGagnez de l'XP avec chaque commande pour grimper !");
    send_response(&state.bot, ctx.chat_id, &text).await;
    Ok(())
}

/// `done` of `total` as a 10-slot bar, e.g. `███░░░░░░░`.
fn progress_bar(done: i64, total: i64) -> String {
    let filled = if total <= 0 {
        PROGRESS_WIDTH
    } else {
        ((done.max(0) as f64 / total as f64) * PROGRESS_WIDTH as f64) as usize
    }
    .min(PROGRESS_WIDTH);
    format!(
        "`{}{}`",
        "█".repeat(filled),
        "░".repeat(PROGRESS_WIDTH - filled)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_bar_bounds() {
        assert_eq!(progress_bar(0, 100), format!("`{}`", "░".repeat(10)));
        assert_eq!(progress_bar(100, 100), format!("`{}`", "█".repeat(10)));
        assert_eq!(progress_bar(150, 100), format!("`{}`", "█".repeat(10)));
    }

    #[test]
    fn test_progress_bar_midway() {
        let bar = progress_bar(50, 100);
        assert!(bar.contains(&"█".repeat(5)));
        assert!(bar.contains(&"░".repeat(5)));
    }
}
