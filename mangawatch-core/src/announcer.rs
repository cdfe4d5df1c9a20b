use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::AnnounceError;
use crate::feed::{SiteLinks, UpdateRecord};
use crate::storage::SeenState;

pub const STATUS_COLOR: u32 = 0x00ff00;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Structured post, serialised in the shape Discord expects for `embeds`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Embed {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub color: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Embed {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            color: 0,
            fields: Vec::new(),
            timestamp: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = color;
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.timestamp = Some(at);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Text(String),
    Embed(Embed),
}

/// A resolved destination that accepts posts.
#[async_trait]
pub trait Channel: Send + Sync {
    fn id(&self) -> &str;

    async fn post(&self, message: &Message) -> Result<(), AnnounceError>;
}

#[async_trait]
pub trait ChannelResolver: Send + Sync {
    async fn resolve(&self, channel_id: &str) -> Result<Box<dyn Channel>, AnnounceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnounceOutcome {
    /// The channel could not be resolved; nothing was sent or recorded.
    ChannelUnavailable,
    /// Nothing new; a single status embed was attempted.
    UpToDate { delivered: bool },
    Announced { posted: usize, failed: usize },
}

/// Records that should be announced individually, in input order.
///
/// Records without a chapter id have nothing to link to and are never selected.
pub fn select_new<'a>(
    records: &'a [UpdateRecord],
    seen: &SeenState,
    manual: bool,
) -> Vec<&'a UpdateRecord> {
    records
        .iter()
        .filter(|record| match &record.item_id {
            Some(item_id) => manual || !seen.contains(item_id),
            None => false,
        })
        .collect()
}

pub fn chapter_message(record: &UpdateRecord) -> Option<String> {
    let link = record.link.as_deref()?;
    Some(format!(
        "**{}** - Chapter {}\nRead here: {}",
        record.title, record.chapter, link
    ))
}

pub fn status_embed(records: &[UpdateRecord], links: &SiteLinks) -> Embed {
    records.iter().fold(
        Embed::new("Manga Update Status")
            .description("All tracked mangas are up to date.")
            .color(STATUS_COLOR),
        |embed, record| {
            embed.field(
                record.title.clone(),
                format!(
                    "Chapter: {}\n[View Manga]({})",
                    record.chapter,
                    links.title(&record.tracked_id)
                ),
                false,
            )
        },
    )
}

/// Classifies poll results against the seen-state and posts them.
#[derive(Clone)]
pub struct Announcer {
    resolver: Arc<dyn ChannelResolver>,
    links: SiteLinks,
}

impl Announcer {
    pub fn new(resolver: Arc<dyn ChannelResolver>, links: SiteLinks) -> Self {
        Self { resolver, links }
    }

    /// Posts one message per new chapter, or a single status embed when none is new.
    ///
    /// With `manual` set every chapter is announced again. A chapter id is recorded
    /// in `seen` only after its message was delivered.
    pub async fn announce(
        &self,
        channel_id: &str,
        records: &[UpdateRecord],
        seen: &mut SeenState,
        manual: bool,
    ) -> AnnounceOutcome {
        let channel = match self.resolver.resolve(channel_id).await {
            Ok(channel) => channel,
            Err(err) => {
                error!(channel_id, error = %err, "channel not found");
                return AnnounceOutcome::ChannelUnavailable;
            }
        };

        let fresh = select_new(records, seen, manual);
        if fresh.is_empty() {
            let embed = status_embed(records, &self.links);
            let delivered = match channel.post(&Message::Embed(embed)).await {
                Ok(()) => true,
                Err(err) => {
                    warn!(channel_id, error = %err, "failed to post status embed");
                    false
                }
            };
            info!(channel_id, tracked = records.len(), "all tracked manga up to date");
            return AnnounceOutcome::UpToDate { delivered };
        }

        let mut posted = 0;
        let mut failed = 0;
        for record in fresh {
            let (Some(item_id), Some(text)) = (record.item_id.as_deref(), chapter_message(record))
            else {
                continue;
            };
            match channel.post(&Message::Text(text)).await {
                Ok(()) => {
                    seen.mark(item_id);
                    posted += 1;
                }
                Err(err) => {
                    warn!(
                        channel_id,
                        manga_id = %record.tracked_id,
                        chapter_id = item_id,
                        error = %err,
                        "failed to announce chapter"
                    );
                    failed += 1;
                }
            }
        }
        info!(channel = channel.id(), posted, failed, manual, "chapter announcements sent");
        AnnounceOutcome::Announced { posted, failed }
    }
}
