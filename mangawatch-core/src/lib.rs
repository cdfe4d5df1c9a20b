pub mod announcer;
pub mod commands;
pub mod config;
pub mod cycle;
pub mod discord;
pub mod error;
pub mod feed;
pub mod poller;
pub mod schedule;
pub mod storage;

pub use announcer::{AnnounceOutcome, Announcer, Channel, ChannelResolver, Embed, Message};
pub use commands::{handle_command, Command, Reply, BOT_VERSION, CHECKED_ACK};
pub use config::BotConfig;
pub use cycle::{CycleReport, CycleSettings, Trigger, UpdateCycle};
pub use discord::DiscordRest;
pub use error::{AnnounceError, ConfigError, PollError, ScheduleError};
pub use feed::{RawItem, SiteLinks, TrackedId, UpdateRecord};
pub use poller::{poll, FeedSource, MangaDexClient, PollConfig};
pub use schedule::{spawn_scheduler, DailySchedule, SchedulerHandle};
pub use storage::SeenState;
