use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{channel::ItemRef, error::Result, schedule::Slot};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Movie,
    Episode,
    #[default]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeInfo {
    pub series_name: String,
    pub season_number: Option<u32>,
    pub episode_number: Option<u32>,
}

/// Descriptive fields the host knows about an item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemMetadata {
    pub overview: Option<String>,
    pub production_year: Option<i32>,
    pub episode: Option<EpisodeInfo>,
    pub image_ref: Option<String>,
    pub kind: ItemKind,
}

#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// `Ok(None)` when the item is unknown to the host.
    async fn describe(&self, item: &ItemRef) -> Result<Option<ItemMetadata>>;
}

/// Decorates bare slots with host metadata.
///
/// Enrichment never fails: a missing item, a lookup error or an expired
/// deadline all leave the affected slots as they were.
#[derive(Clone)]
pub struct SlotEnricher {
    source: Arc<dyn MetadataSource>,
    deadline: Duration,
}

impl SlotEnricher {
    pub fn new(source: Arc<dyn MetadataSource>, deadline: Duration) -> Self {
        Self { source, deadline }
    }

    pub async fn enrich(&self, slot: Slot) -> Slot {
        match self.source.describe(&slot.item_ref).await {
            Ok(Some(metadata)) => apply(slot, metadata),
            Ok(None) => {
                debug!(item = %slot.item_ref, "no metadata for item");
                slot
            }
            Err(err) => {
                warn!(item = %slot.item_ref, %err, "metadata lookup failed");
                slot
            }
        }
    }

    /// Lookups run concurrently, each bounded by the deadline; the result
    /// keeps the input order.
    pub async fn enrich_all(&self, slots: Vec<Slot>) -> Vec<Slot> {
        let lookups = slots
            .into_iter()
            .map(|slot| self.enrich_before_deadline(slot));
        join_all(lookups).await
    }

    async fn enrich_before_deadline(&self, slot: Slot) -> Slot {
        match tokio::time::timeout(self.deadline, self.enrich(slot.clone())).await {
            Ok(enriched) => enriched,
            Err(_) => {
                warn!(
                    item = %slot.item_ref,
                    deadline_ms = self.deadline.as_millis() as u64,
                    "metadata lookup timed out"
                );
                slot
            }
        }
    }
}

fn apply(mut slot: Slot, metadata: ItemMetadata) -> Slot {
    slot.overview = metadata.overview;
    slot.production_year = metadata.production_year;
    slot.image_ref = metadata.image_ref;
    slot.is_movie = metadata.kind == ItemKind::Movie;
    slot.is_series = metadata.kind == ItemKind::Episode;

    if let (ItemKind::Episode, Some(episode)) = (metadata.kind, metadata.episode) {
        // guides list episodes under the series name
        let episode_title = std::mem::replace(&mut slot.title, episode.series_name);
        slot.episode_title = Some(episode_title);
        slot.season_number = episode.season_number;
        slot.episode_number = episode.episode_number;
    }
    slot
}
