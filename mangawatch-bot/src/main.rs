mod console;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use mangawatch_core::{
    handle_command, spawn_scheduler, BotConfig, Command, CycleSettings, DiscordRest,
    MangaDexClient, UpdateCycle, BOT_VERSION,
};
use reqwest::{redirect, Client, ClientBuilder};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::console::ConsoleReply;

/// Announces new MangaDex chapters to a Discord channel.
#[derive(Parser, Debug)]
#[command(name = "mangawatch", version, about)]
struct Cli {
    /// Path to a JSON config file (defaults to ~/.config/mangawatch/config.json).
    #[arg(long, env = "MANGAWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// `.env` file with tokens and ids (defaults to `.env` in the working directory or a parent).
    #[arg(long, env = "MANGAWATCH_ENV_FILE")]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Mode {
    /// Run the daily schedule and accept commands on stdin (default).
    Run,
    /// Check for updates once and post them, ignoring what was already announced.
    Check,
    /// Print the bot version.
    Version,
    /// Register the slash commands with the configured guild.
    ///
    /// This process does not listen on the Discord gateway or an interactions endpoint,
    /// so the registered commands are only answered by a separate interaction handler.
    RegisterCommands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    BotConfig::load_dotenv(cli.env_file.as_deref()).context("loading .env file")?;
    let mut config = BotConfig::load(cli.config.as_deref()).context("loading configuration")?;
    config.apply_process_env();

    match cli.mode.unwrap_or(Mode::Run) {
        Mode::Run => run(config).await,
        Mode::Check => {
            let cycle = build_cycle(&config, build_client()?)?;
            handle_command(Command::CheckUpdates, &cycle, &mut ConsoleReply).await?;
            Ok(())
        }
        Mode::Version => {
            println!("mangawatch {BOT_VERSION}");
            Ok(())
        }
        Mode::RegisterCommands => {
            let rest = DiscordRest::new(build_client()?, config.discord_token()?)
                .with_api_url(&config.discord.api_url);
            rest.register_guild_commands(config.application_id()?, config.guild_id()?)
                .await
                .context("registering slash commands")?;
            Ok(())
        }
    }
}

async fn run(config: BotConfig) -> anyhow::Result<()> {
    let cycle = Arc::new(build_cycle(&config, build_client()?)?);
    let schedule = config.daily_schedule()?;
    info!(
        version = BOT_VERSION,
        schedule = schedule.expression(),
        tracked = cycle.tracked().len(),
        "mangawatch started"
    );

    let scheduler = spawn_scheduler(schedule, Arc::clone(&cycle));
    let console = console::spawn_console(Arc::clone(&cycle));

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    info!("shutdown requested");

    console.abort();
    scheduler.stop().await?;
    Ok(())
}

fn build_client() -> anyhow::Result<Client> {
    ClientBuilder::new()
        .redirect(redirect::Policy::limited(5))
        .user_agent(concat!("mangawatch/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("building HTTP client")
}

fn build_cycle(config: &BotConfig, client: Client) -> anyhow::Result<UpdateCycle> {
    config.validate()?;
    let source = MangaDexClient::new(client.clone(), config.poll_config());
    let rest =
        DiscordRest::new(client, config.discord_token()?).with_api_url(&config.discord.api_url);
    let settings = CycleSettings {
        tracked: config.tracked_ids(),
        channel_id: config.channel_id()?.to_owned(),
        links: config.site_links(),
    };
    Ok(UpdateCycle::new(Arc::new(source), Arc::new(rest), settings))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
