use std::fmt;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::{
    duration::Ticks,
    error::{Error, Result},
};

/// Opaque identifier of a playable item in the host library.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemRef(String);

impl ItemRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identifier of a library the host can enumerate.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LibraryRef(String);

impl LibraryRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LibraryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingMode {
    #[default]
    Sequential,
    Shuffle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub item_ref: ItemRef,
    pub name: String,
    pub duration: Ticks,
}

impl Program {
    pub fn new(item_ref: impl Into<String>, name: impl Into<String>, duration: Ticks) -> Self {
        Self {
            item_ref: ItemRef::new(item_ref),
            name: name.into(),
            duration,
        }
    }
}

/// A virtual channel: a finite set of programs looped forever from `anchor`.
///
/// When `programs` is empty the channel pulls its content from `libraries`
/// instead. Channels are treated as immutable values while a schedule is
/// being computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ordering: OrderingMode,
    #[serde(default)]
    pub programs: Vec<Program>,
    #[serde(default)]
    pub libraries: Vec<LibraryRef>,
    #[serde(default = "default_anchor")]
    pub anchor: Timestamp,
}

fn default_anchor() -> Timestamp {
    Timestamp::UNIX_EPOCH
}

impl Channel {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            ordering: OrderingMode::default(),
            programs: Vec::new(),
            libraries: Vec::new(),
            anchor: default_anchor(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::InvalidChannel("id must not be empty".to_string()));
        }
        if self.id.contains('/') {
            return Err(Error::InvalidChannel(format!(
                "id {:?} must not contain '/'",
                self.id
            )));
        }
        Ok(())
    }
}
