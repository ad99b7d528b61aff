use std::{collections::BTreeMap, path::PathBuf};

use tokio::sync::RwLock;
use tracing::info;

use crate::{
    channel::{Channel, ItemRef, Program},
    error::{Error, Result},
};

type Channels = BTreeMap<String, Channel>;

/// Channel configuration persisted as a JSON array in a single file.
///
/// Every mutation is written to disk before it becomes visible; a failed
/// write leaves the store unchanged.
pub struct ChannelStore {
    path: PathBuf,
    channels: RwLock<Channels>,
}

impl ChannelStore {
    /// Loads `path`, treating a missing file as an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut channels = Channels::new();
        if path.exists() {
            let stored: Vec<Channel> = serde_json::from_slice(&std::fs::read(&path)?)?;
            for channel in stored {
                channel.validate()?;
                channels.insert(channel.id.clone(), channel);
            }
        }
        info!(path = %path.display(), channels = channels.len(), "opened channel store");
        Ok(Self {
            path,
            channels: RwLock::new(channels),
        })
    }

    pub async fn list(&self) -> Vec<Channel> {
        self.channels.read().await.values().cloned().collect()
    }

    pub async fn get(&self, id: &str) -> Result<Channel> {
        self.channels
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    pub async fn create(&self, channel: Channel) -> Result<Channel> {
        channel.validate()?;
        self.modify(|channels| {
            if channels.contains_key(&channel.id) {
                return Err(Error::ChannelExists {
                    id: channel.id.clone(),
                });
            }
            channels.insert(channel.id.clone(), channel.clone());
            Ok(channel)
        })
        .await
    }

    pub async fn update(&self, id: &str, channel: Channel) -> Result<Channel> {
        channel.validate()?;
        if channel.id != id {
            return Err(Error::InvalidChannel(format!(
                "id {:?} does not match {id:?}",
                channel.id
            )));
        }
        self.modify(|channels| {
            let existing = channels.get_mut(id).ok_or_else(|| not_found(id))?;
            *existing = channel.clone();
            Ok(channel)
        })
        .await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.modify(|channels| channels.remove(id).map(|_| ()).ok_or_else(|| not_found(id)))
            .await
    }

    pub async fn add_program(&self, id: &str, program: Program) -> Result<Channel> {
        if !program.duration.is_positive() {
            return Err(Error::InvalidChannel(format!(
                "program {} has no positive duration",
                program.item_ref
            )));
        }
        self.modify(|channels| {
            let channel = channels.get_mut(id).ok_or_else(|| not_found(id))?;
            channel.programs.push(program);
            Ok(channel.clone())
        })
        .await
    }

    /// Removes every occurrence of `item_ref` from the channel's program list.
    pub async fn remove_program(&self, id: &str, item_ref: &ItemRef) -> Result<Channel> {
        self.modify(|channels| {
            let channel = channels.get_mut(id).ok_or_else(|| not_found(id))?;
            channel.programs.retain(|program| &program.item_ref != item_ref);
            Ok(channel.clone())
        })
        .await
    }

    async fn modify<T>(&self, change: impl FnOnce(&mut Channels) -> Result<T>) -> Result<T> {
        let mut channels = self.channels.write().await;
        let mut next = channels.clone();
        let out = change(&mut next)?;
        self.persist(&next).await?;
        *channels = next;
        Ok(out)
    }

    async fn persist(&self, channels: &Channels) -> Result<()> {
        let list: Vec<&Channel> = channels.values().collect();
        let json = serde_json::to_vec_pretty(&list)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

fn not_found(id: &str) -> Error {
    Error::ChannelNotFound { id: id.to_string() }
}
