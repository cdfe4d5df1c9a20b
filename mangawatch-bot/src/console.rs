use std::sync::Arc;

use async_trait::async_trait;
use mangawatch_core::{handle_command, AnnounceError, Command, Message, Reply, UpdateCycle};
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Prints command replies on stdout.
pub struct ConsoleReply;

#[async_trait]
impl Reply for ConsoleReply {
    async fn send(&mut self, message: Message) -> Result<(), AnnounceError> {
        match message {
            Message::Text(text) => println!("{text}"),
            Message::Embed(embed) => {
                println!("== {} ==", embed.title);
                if let Some(description) = &embed.description {
                    println!("{description}");
                }
                for field in &embed.fields {
                    println!("- {}: {}", field.name, field.value.replace('\n', " | "));
                }
            }
        }
        Ok(())
    }
}

/// Reads `checkupdates` / `version` lines from stdin and runs them as manual triggers.
pub fn spawn_console(cycle: Arc<UpdateCycle>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(io::stdin()).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    info!("stdin closed, console commands disabled");
                    break;
                }
                Err(err) => {
                    warn!(error = %err, "failed to read console command");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match Command::parse(&line) {
                Some(command) => {
                    if let Err(err) = handle_command(command, &cycle, &mut ConsoleReply).await {
                        warn!(command = command.name(), error = %err, "failed to reply");
                    }
                }
                None => {
                    let known: Vec<&str> = Command::ALL.iter().map(|c| c.name()).collect();
                    println!("unknown command `{}` (try: {})", line.trim(), known.join(", "));
                }
            }
        }
    })
}
