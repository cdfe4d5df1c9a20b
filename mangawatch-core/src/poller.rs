use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::PollError;
use crate::feed::{RawItem, SiteLinks, TrackedId, UpdateRecord};

pub const DEFAULT_API_URL: &str = "https://api.mangadex.org";

#[derive(Debug, Clone)]
pub struct PollConfig {
    pub api_url: String,
    pub language: String,
    pub token: Option<String>,
    pub request_timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            language: "en".to_owned(),
            token: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Source of the most recent chapter of a tracked manga.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// `Ok(None)` means the feed answered but has no chapter in the configured language.
    async fn latest_item(&self, manga: &TrackedId) -> Result<Option<RawItem>, PollError>;
}

#[derive(Debug, Deserialize)]
struct FeedResponse {
    data: Vec<ChapterData>,
}

#[derive(Debug, Deserialize)]
struct ChapterData {
    id: String,
    attributes: ChapterAttributes,
}

#[derive(Debug, Deserialize)]
struct ChapterAttributes {
    title: Option<String>,
    chapter: Option<String>,
}

/// MangaDex `/manga/{id}/feed` client.
#[derive(Debug, Clone)]
pub struct MangaDexClient {
    client: Client,
    config: PollConfig,
}

impl MangaDexClient {
    pub fn new(client: Client, config: PollConfig) -> Self {
        Self { client, config }
    }

    fn feed_url(&self, manga: &TrackedId) -> Result<Url, PollError> {
        let base = self.config.api_url.trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/manga/{manga}/feed"))?)
    }
}

#[async_trait]
impl FeedSource for MangaDexClient {
    async fn latest_item(&self, manga: &TrackedId) -> Result<Option<RawItem>, PollError> {
        let url = self.feed_url(manga)?;
        let mut request = self
            .client
            .get(url)
            .query(&[
                ("translatedLanguage[]", self.config.language.as_str()),
                ("limit", "1"),
                ("order[createdAt]", "desc"),
            ])
            .timeout(self.config.request_timeout);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PollError::Status { status });
        }
        let bytes = response.bytes().await?;
        let feed: FeedResponse = serde_json::from_slice(&bytes)?;

        Ok(feed.data.into_iter().next().map(|chapter| RawItem {
            id: chapter.id,
            title: chapter.attributes.title,
            chapter: chapter.attributes.chapter,
        }))
    }
}

/// Fetches the latest chapter of every tracked manga, one request at a time.
///
/// A failing manga is logged and left out of the result; the others are still
/// polled. Output keeps the order of `tracked`.
pub async fn poll<S>(source: &S, tracked: &[TrackedId], links: &SiteLinks) -> Vec<UpdateRecord>
where
    S: FeedSource + ?Sized,
{
    let mut records = Vec::with_capacity(tracked.len());
    for manga in tracked {
        match source.latest_item(manga).await {
            Ok(Some(item)) => {
                debug!(manga_id = %manga, chapter_id = %item.id, "latest chapter fetched");
                records.push(UpdateRecord::from_item(manga.clone(), item, links));
            }
            Ok(None) => {
                debug!(manga_id = %manga, "feed has no chapters");
                records.push(UpdateRecord::empty(manga.clone()));
            }
            Err(err) => {
                warn!(manga_id = %manga, error = %err, "failed to fetch manga updates");
            }
        }
    }
    info!(
        tracked = tracked.len(),
        fetched = records.len(),
        "poll finished"
    );
    records
}
