#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mangawatch_core::{
    AnnounceError, Channel, ChannelResolver, FeedSource, Message, PollError, RawItem, TrackedId,
};

pub fn chapter(id: &str, title: &str, chapter: &str) -> RawItem {
    RawItem {
        id: id.into(),
        title: Some(title.into()),
        chapter: Some(chapter.into()),
    }
}

/// Feed answering from a fixed table; ids mapped to `None` fail with a 500.
#[derive(Default)]
pub struct StaticSource {
    items: HashMap<TrackedId, Option<Option<RawItem>>>,
    delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(mut self, manga: &str, item: RawItem) -> Self {
        self.items.insert(manga.into(), Some(Some(item)));
        self
    }

    pub fn with_empty(mut self, manga: &str) -> Self {
        self.items.insert(manga.into(), Some(None));
        self
    }

    pub fn with_failure(mut self, manga: &str) -> Self {
        self.items.insert(manga.into(), None);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl FeedSource for StaticSource {
    async fn latest_item(&self, manga: &TrackedId) -> Result<Option<RawItem>, PollError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.items.get(manga) {
            Some(Some(item)) => Ok(item.clone()),
            _ => Err(PollError::Status {
                status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            }),
        }
    }
}

/// Channel resolver that records every post in memory.
#[derive(Clone, Default)]
pub struct RecordingResolver {
    pub posts: Arc<Mutex<Vec<Message>>>,
    missing: bool,
    reject_containing: Option<String>,
}

impl RecordingResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn missing() -> Self {
        Self {
            missing: true,
            ..Self::default()
        }
    }

    /// Text posts containing `needle` fail to deliver.
    pub fn rejecting(needle: &str) -> Self {
        Self {
            reject_containing: Some(needle.to_owned()),
            ..Self::default()
        }
    }

    pub fn posts(&self) -> Vec<Message> {
        self.posts.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.posts()
            .into_iter()
            .filter_map(|message| match message {
                Message::Text(text) => Some(text),
                Message::Embed(_) => None,
            })
            .collect()
    }
}

struct RecordingChannel {
    id: String,
    posts: Arc<Mutex<Vec<Message>>>,
    reject_containing: Option<String>,
}

#[async_trait]
impl ChannelResolver for RecordingResolver {
    async fn resolve(&self, channel_id: &str) -> Result<Box<dyn Channel>, AnnounceError> {
        if self.missing {
            return Err(AnnounceError::ChannelNotFound(channel_id.to_owned()));
        }
        Ok(Box::new(RecordingChannel {
            id: channel_id.to_owned(),
            posts: Arc::clone(&self.posts),
            reject_containing: self.reject_containing.clone(),
        }))
    }
}

#[async_trait]
impl Channel for RecordingChannel {
    fn id(&self) -> &str {
        &self.id
    }

    async fn post(&self, message: &Message) -> Result<(), AnnounceError> {
        if let (Some(needle), Message::Text(text)) = (&self.reject_containing, message) {
            if text.contains(needle.as_str()) {
                return Err(AnnounceError::Api {
                    status: reqwest::StatusCode::BAD_REQUEST,
                    message: format!("rejected: {text}"),
                });
            }
        }
        self.posts.lock().unwrap().push(message.clone());
        Ok(())
    }
}
