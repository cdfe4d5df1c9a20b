use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::announcer::{Embed, Message};
use crate::cycle::{Trigger, UpdateCycle};
use crate::error::AnnounceError;

pub const BOT_VERSION: &str = concat!("v", env!("CARGO_PKG_VERSION"));
pub const VERSION_COLOR: u32 = 0x3498db;
pub const CHECKED_ACK: &str = "Checked for updates!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    CheckUpdates,
    Version,
}

impl Command {
    pub const ALL: [Command; 2] = [Command::CheckUpdates, Command::Version];

    pub fn name(self) -> &'static str {
        match self {
            Command::CheckUpdates => "checkupdates",
            Command::Version => "version",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Command::CheckUpdates => {
                "Manually check for manga updates and post them in this channel."
            }
            Command::Version => "Display the current version of the bot.",
        }
    }

    /// Accepts `checkupdates` or `/checkupdates`, case-insensitively.
    pub fn parse(input: &str) -> Option<Self> {
        let name = input.trim().trim_start_matches('/');
        Self::ALL
            .into_iter()
            .find(|command| command.name().eq_ignore_ascii_case(name))
    }
}

/// Where the response to a command goes.
#[async_trait]
pub trait Reply: Send {
    /// Acknowledge a command whose answer will take a while.
    async fn defer(&mut self) -> Result<(), AnnounceError> {
        Ok(())
    }

    async fn send(&mut self, message: Message) -> Result<(), AnnounceError>;
}

pub fn version_embed(now: DateTime<Utc>) -> Embed {
    Embed::new("Bot Version")
        .description(format!(
            "The current version of this bot is **{BOT_VERSION}**."
        ))
        .color(VERSION_COLOR)
        .timestamp(now)
}

/// Runs a command and answers through `reply`.
///
/// A manual check is acknowledged even if some announcements failed.
pub async fn handle_command(
    command: Command,
    cycle: &UpdateCycle,
    reply: &mut dyn Reply,
) -> Result<(), AnnounceError> {
    info!(command = command.name(), "command received");
    match command {
        Command::CheckUpdates => {
            reply.defer().await?;
            let report = cycle.run(Trigger::Manual).await;
            debug!(?report, "manual check finished");
            reply.send(Message::Text(CHECKED_ACK.to_owned())).await
        }
        Command::Version => reply.send(Message::Embed(version_embed(Utc::now()))).await,
    }
}
