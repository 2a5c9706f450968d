use clap::{Parser, Subcommand};
use nicebot::config::Config;
use nicebot::db::Database;
use nicebot::{logging, runtime};
use teloxide::prelude::*;
use tracing::info;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(name = "nicebot", version = VERSION, about = "NICE-BOT, assistant Telegram tout-en-un")]
struct Cli {
    #[command(subcommand)]
    command: Option<MainCommand>,
}

#[derive(Debug, Subcommand)]
enum MainCommand {
    /// Start the bot (polling or webhook mode per configuration)
    Start,
    /// Preflight diagnostics: config, storage and Telegram connectivity
    Doctor,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command.unwrap_or(MainCommand::Start) {
        MainCommand::Start => start().await,
        MainCommand::Doctor => doctor().await,
    }
}

async fn start() -> anyhow::Result<()> {
    let config = Config::load()?;
    if config.log_to_file {
        logging::init_file_logging(&config.data_dir)?;
    } else {
        logging::init_console_logging();
    }
    info!("nicebot v{VERSION} starting");

    let state = runtime::AppState::new(config)?;
    runtime::run(state).await?;
    Ok(())
}

async fn doctor() -> anyhow::Result<()> {
    println!("nicebot v{VERSION} — diagnostics\n");

    let config = match Config::load() {
        Ok(config) => {
            println!("✔ configuration loaded");
            config
        }
        Err(e) => {
            println!("✘ configuration: {e}");
            return Err(e.into());
        }
    };

    if config.admin_user_id.is_empty() {
        println!("⚠ admin_user_id not set: admin commands will be refused for everyone");
    } else {
        println!("✔ admin user configured");
    }
    if config.tmdb_api_key.is_some() {
        println!("✔ TMDB key present (/film enabled)");
    } else {
        println!("⚠ TMDB key missing: /film will be disabled");
    }

    match Database::new(&config.data_dir) {
        Ok(_) => println!("✔ database opens at {}/nicebot.db", config.data_dir),
        Err(e) => println!("✘ database: {e}"),
    }

    let bot = Bot::new(&config.telegram_bot_token);
    match bot.get_me().await {
        Ok(me) => println!("✔ Telegram token valid (@{})", me.username()),
        Err(e) => println!("✘ Telegram API: {e}"),
    }

    println!(
        "\nmode: {:?}, web: {}:{}",
        config.run_mode, config.web_host, config.web_port
    );
    Ok(())
}
