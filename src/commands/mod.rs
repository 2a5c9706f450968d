use std::sync::Arc;

use crate::dispatch::CommandContext;
use crate::error::BotError;
use crate::runtime::AppState;

pub mod admin;
pub mod ai;
pub mod chatbot;
pub mod downloader;
pub mod gamification;
pub mod general;
pub mod groups;
pub mod info;
pub mod interactive;
pub mod notifications;
pub mod utils;

/// Every command the bot answers to. Admin gating is the dispatcher's
/// concern, not the registry's.
pub const ALL_COMMANDS: &[&str] = &[
    // general
    "/start",
    "/help",
    "/menu",
    "/about",
    "/ping",
    "/uptime",
    // gamification
    "/profil",
    "/classement",
    // utils
    "/traduire",
    "/meteo",
    "/devise",
    "/qr",
    "/pdf",
    // ai
    "/ai",
    "/resume",
    "/idee",
    // info
    "/film",
    "/news",
    "/wiki",
    "/meme",
    "/citation",
    "/blague",
    // notifications
    "/rappel",
    "/mesrappels",
    "/alert",
    // downloaders
    "/tiktok",
    "/facebook",
    "/instagram",
    "/twitter",
    "/pinterest",
    "/apk",
    // interactive
    "/imenu",
    "/quick",
    "/hidekeyboard",
    // chatbot
    "/chatbot",
    // groups
    "/setupgroup",
    "/invitelink",
    "/groupinfo",
    "/botperms",
    // admin
    "/admin",
    "/stats",
    "/users",
    "/broadcast",
    "/ban",
    "/unban",
    "/addxp",
    "/resetxp",
    "/gamestats",
    "/logs",
    "/groupes",
    "/leavegroup",
    "/broadcastgroups",
    "/groupstats",
];

pub fn is_known(command: &str) -> bool {
    ALL_COMMANDS.contains(&command)
}

pub async fn run_command(
    state: &Arc<AppState>,
    ctx: &CommandContext,
    command: &str,
) -> Result<(), BotError> {
    match command {
        "/start" => general::start(state, ctx).await,
        "/help" => general::help(state, ctx).await,
        "/menu" | "/imenu" => interactive::imenu(state, ctx).await,
        "/about" => general::about(state, ctx).await,
        "/ping" => general::ping(state, ctx).await,
        "/uptime" => general::uptime(state, ctx).await,

        "/profil" => gamification::profil(state, ctx).await,
        "/classement" => gamification::classement(state, ctx).await,

        "/traduire" => utils::traduire(state, ctx).await,
        "/meteo" => utils::meteo(state, ctx).await,
        "/devise" => utils::devise(state, ctx).await,
        "/qr" => utils::qr(state, ctx).await,
        "/pdf" => utils::pdf(state, ctx).await,

        "/ai" => ai::ask(state, ctx).await,
        "/resume" => ai::resume(state, ctx).await,
        "/idee" => ai::idee(state, ctx).await,

        "/film" => info::film(state, ctx).await,
        "/news" => info::news(state, ctx).await,
        "/wiki" => info::wiki(state, ctx).await,
        "/meme" => info::meme(state, ctx).await,
        "/citation" => info::citation(state, ctx).await,
        "/blague" => info::blague(state, ctx).await,

        "/rappel" => notifications::rappel(state, ctx).await,
        "/mesrappels" => notifications::mesrappels(state, ctx).await,
        "/alert" => notifications::alert(state, ctx).await,

        "/tiktok" => downloader::tiktok(state, ctx).await,
        "/facebook" => downloader::facebook(state, ctx).await,
        "/instagram" => downloader::instagram(state, ctx).await,
        "/twitter" => downloader::twitter(state, ctx).await,
        "/pinterest" => downloader::pinterest(state, ctx).await,
        "/apk" => downloader::apk(state, ctx).await,

        "/quick" => interactive::quick(state, ctx).await,
        "/hidekeyboard" => interactive::hidekeyboard(state, ctx).await,

        "/chatbot" => chatbot::toggle(state, ctx).await,

        "/setupgroup" => groups::setupgroup(state, ctx).await,
        "/invitelink" => groups::invitelink(state, ctx).await,
        "/groupinfo" => groups::groupinfo(state, ctx).await,
        "/botperms" => groups::botperms(state, ctx).await,

        "/admin" => admin::panel(state, ctx).await,
        "/stats" => admin::stats(state, ctx).await,
        "/users" => admin::users(state, ctx).await,
        "/broadcast" => admin::broadcast(state, ctx).await,
        "/ban" => admin::ban(state, ctx).await,
        "/unban" => admin::unban(state, ctx).await,
        "/addxp" => admin::addxp(state, ctx).await,
        "/resetxp" => admin::resetxp(state, ctx).await,
        "/gamestats" => admin::gamestats(state, ctx).await,
        "/logs" => admin::logs(state, ctx).await,
        "/groupes" => admin::groupes(state, ctx).await,
        "/leavegroup" => admin::leavegroup(state, ctx).await,
        "/broadcastgroups" => admin::broadcastgroups(state, ctx).await,
        "/groupstats" => admin::groupstats(state, ctx).await,

        other => Err(BotError::UserInput(format!(
            "❓ Commande inconnue : {other}. Tapez /help pour la liste des commandes."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_is_consistent() {
        assert!(is_known("/start"));
        assert!(is_known("/groupstats"));
        assert!(!is_known("/nonexistent"));
        // Every admin-gated command is a real command.
        for cmd in crate::dispatch::ADMIN_COMMANDS {
            assert!(is_known(cmd), "{cmd} missing from registry");
        }
        for cmd in crate::dispatch::SPECIAL_XP_COMMANDS {
            assert!(is_known(cmd), "{cmd} missing from registry");
        }
    }
}
