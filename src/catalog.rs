use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{
    channel::{Channel, ItemRef, LibraryRef, Program},
    duration::Ticks,
    error::Result,
};

/// An entry of a host library as seen by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryItem {
    pub item_ref: ItemRef,
    pub name: String,
    pub sort_key: String,
    /// `None` when the host does not know the runtime yet.
    pub duration: Option<Ticks>,
}

/// Enumerates the playable items of a library.
///
/// Implementations must return the same order for the same library state;
/// schedules are only reproducible as long as this holds.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn list_items(&self, library: &LibraryRef) -> Result<Vec<LibraryItem>>;
}

/// Resolves the ordered program list a channel plays.
#[derive(Clone)]
pub struct ProgramCatalog {
    source: Arc<dyn ContentSource>,
}

impl ProgramCatalog {
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self { source }
    }

    /// Explicit programs win; otherwise every distinct library is pulled in
    /// declaration order. Items without a positive runtime are dropped.
    pub async fn resolve(&self, channel: &Channel) -> Vec<Program> {
        if !channel.programs.is_empty() {
            return channel
                .programs
                .iter()
                .filter(|program| program.duration.is_positive())
                .cloned()
                .collect();
        }

        let mut programs = Vec::new();
        let mut seen = HashSet::new();
        for library in &channel.libraries {
            if !seen.insert(library) {
                continue;
            }

            let mut items = match self.source.list_items(library).await {
                Ok(items) => items,
                Err(err) => {
                    warn!(channel = %channel.id, %library, %err, "skipping library");
                    continue;
                }
            };
            items.sort_by(|a, b| a.sort_key.cmp(&b.sort_key).then_with(|| a.name.cmp(&b.name)));

            programs.extend(items.into_iter().filter_map(|item| match item.duration {
                Some(duration) if duration.is_positive() => Some(Program {
                    item_ref: item.item_ref,
                    name: item.name,
                    duration,
                }),
                _ => None,
            }));
        }

        if programs.is_empty() {
            debug!(channel = %channel.id, "no programs resolved");
        }
        programs
    }
}
