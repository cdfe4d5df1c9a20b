use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, info_span, Instrument};

use crate::announcer::{AnnounceOutcome, Announcer, ChannelResolver};
use crate::feed::{SiteLinks, TrackedId};
use crate::poller::{poll, FeedSource};
use crate::storage::SeenState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Scheduled,
    Manual,
}

impl Trigger {
    pub fn is_manual(self) -> bool {
        matches!(self, Trigger::Manual)
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Scheduled => f.write_str("scheduled"),
            Trigger::Manual => f.write_str("manual"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CycleSettings {
    pub tracked: Vec<TrackedId>,
    pub channel_id: String,
    pub links: SiteLinks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub trigger: Trigger,
    pub records: usize,
    pub outcome: AnnounceOutcome,
}

/// Poll-then-announce pipeline shared by the scheduler and manual commands.
///
/// The seen-state lock is held for the whole cycle, so overlapping triggers run
/// one after the other.
pub struct UpdateCycle {
    source: Arc<dyn FeedSource>,
    announcer: Announcer,
    settings: CycleSettings,
    seen: Mutex<SeenState>,
}

impl UpdateCycle {
    pub fn new(
        source: Arc<dyn FeedSource>,
        resolver: Arc<dyn ChannelResolver>,
        settings: CycleSettings,
    ) -> Self {
        Self::with_seen(source, resolver, settings, SeenState::new())
    }

    pub fn with_seen(
        source: Arc<dyn FeedSource>,
        resolver: Arc<dyn ChannelResolver>,
        settings: CycleSettings,
        seen: SeenState,
    ) -> Self {
        let announcer = Announcer::new(resolver, settings.links.clone());
        Self {
            source,
            announcer,
            settings,
            seen: Mutex::new(seen),
        }
    }

    pub fn tracked(&self) -> &[TrackedId] {
        &self.settings.tracked
    }

    pub async fn run(&self, trigger: Trigger) -> CycleReport {
        let span = info_span!("update_cycle", %trigger);
        async move {
            let mut seen = self.seen.lock().await;
            info!(tracked = self.settings.tracked.len(), "checking for manga updates");
            let records = poll(&*self.source, &self.settings.tracked, &self.settings.links).await;
            let outcome = self
                .announcer
                .announce(
                    &self.settings.channel_id,
                    &records,
                    &mut seen,
                    trigger.is_manual(),
                )
                .await;
            CycleReport {
                trigger,
                records: records.len(),
                outcome,
            }
        }
        .instrument(span)
        .await
    }

    pub async fn seen_snapshot(&self) -> SeenState {
        self.seen.lock().await.clone()
    }
}
