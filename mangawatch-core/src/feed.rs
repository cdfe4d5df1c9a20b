use std::fmt;

use serde::{Deserialize, Serialize};

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_CHAPTER: &str = "Unknown Chapter";
pub const NO_CHAPTERS_FOUND: &str = "No Chapters Found";

pub const DEFAULT_SITE_URL: &str = "https://mangadex.org";

/// Catalog id of a watched manga.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct TrackedId(String);

impl TrackedId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackedId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TrackedId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Latest chapter as returned by the feed, before normalisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawItem {
    pub id: String,
    pub title: Option<String>,
    pub chapter: Option<String>,
}

/// Builds reader-facing links on the catalog website.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteLinks {
    base: String,
}

impl SiteLinks {
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            base: base.trim_end_matches('/').to_owned(),
        }
    }

    pub fn chapter(&self, item_id: &str) -> String {
        format!("{}/chapter/{}", self.base, item_id)
    }

    pub fn title(&self, tracked_id: &TrackedId) -> String {
        format!("{}/title/{}", self.base, tracked_id)
    }
}

impl Default for SiteLinks {
    fn default() -> Self {
        Self::new(DEFAULT_SITE_URL)
    }
}

/// Normalised "latest known chapter" for one tracked manga, rebuilt every cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRecord {
    pub tracked_id: TrackedId,
    pub title: String,
    pub chapter: String,
    pub item_id: Option<String>,
    pub link: Option<String>,
}

impl UpdateRecord {
    pub fn from_item(tracked_id: TrackedId, item: RawItem, links: &SiteLinks) -> Self {
        let link = links.chapter(&item.id);
        Self {
            tracked_id,
            title: non_empty_or(item.title, UNKNOWN_TITLE),
            chapter: non_empty_or(item.chapter, UNKNOWN_CHAPTER),
            item_id: Some(item.id),
            link: Some(link),
        }
    }

    pub fn empty(tracked_id: TrackedId) -> Self {
        Self {
            tracked_id,
            title: UNKNOWN_TITLE.to_owned(),
            chapter: NO_CHAPTERS_FOUND.to_owned(),
            item_id: None,
            link: None,
        }
    }
}

fn non_empty_or(value: Option<String>, fallback: &str) -> String {
    match value {
        Some(value) if !value.is_empty() => value,
        _ => fallback.to_owned(),
    }
}
