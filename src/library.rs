use std::{
    collections::{HashMap, hash_map::Entry as MapEntry},
    ffi::OsStr,
    fs,
    path::Path,
};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    catalog::{ContentSource, LibraryItem},
    channel::{ItemRef, LibraryRef},
    duration::Ticks,
    enrich::{EpisodeInfo, ItemKind, ItemMetadata, MetadataSource},
    error::{Error, Result},
};

/// One entry of a `<library>.json` manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sort_name: Option<String>,
    #[serde(default)]
    pub runtime_ticks: Option<i64>,
    #[serde(default)]
    pub kind: ItemKind,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub production_year: Option<i32>,
    #[serde(default)]
    pub series_name: Option<String>,
    #[serde(default)]
    pub season_number: Option<u32>,
    #[serde(default)]
    pub episode_number: Option<u32>,
    #[serde(default)]
    pub image: Option<String>,
}

impl ManifestEntry {
    fn sort_key(&self) -> String {
        self.sort_name.as_deref().unwrap_or(&self.name).to_lowercase()
    }

    fn metadata(&self) -> ItemMetadata {
        let episode = self.series_name.as_ref().map(|series_name| EpisodeInfo {
            series_name: series_name.clone(),
            season_number: self.season_number,
            episode_number: self.episode_number,
        });
        ItemMetadata {
            overview: self.overview.clone(),
            production_year: self.production_year,
            episode,
            image_ref: self.image.clone(),
            kind: self.kind,
        }
    }
}

/// Host media library backed by a directory of JSON manifests.
///
/// Every `<ref>.json` file in the directory is one library whose ref is the
/// file stem. The manifests are read once; the library is immutable after
/// that.
#[derive(Debug, Default)]
pub struct MediaLibrary {
    libraries: HashMap<String, Vec<ManifestEntry>>,
    items: HashMap<String, ManifestEntry>,
}

impl MediaLibrary {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut library = Self::default();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension() != Some(OsStr::new("json")) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(OsStr::to_str) else {
                warn!(path = %path.display(), "skipping manifest with non-utf8 name");
                continue;
            };
            let entries: Vec<ManifestEntry> = serde_json::from_slice(&fs::read(&path)?)?;
            library.insert(name.to_string(), entries);
        }
        info!(
            dir = %dir.display(),
            libraries = library.libraries.len(),
            items = library.items.len(),
            "loaded media library"
        );
        Ok(library)
    }

    pub fn insert(&mut self, library: String, entries: Vec<ManifestEntry>) {
        for entry in &entries {
            match self.items.entry(entry.id.clone()) {
                MapEntry::Occupied(_) => {
                    warn!(item = %entry.id, %library, "item listed in several libraries");
                }
                MapEntry::Vacant(slot) => {
                    slot.insert(entry.clone());
                }
            }
        }
        self.libraries.insert(library, entries);
    }

    pub fn library_refs(&self) -> Vec<LibraryRef> {
        let mut refs: Vec<LibraryRef> = self.libraries.keys().map(LibraryRef::new).collect();
        refs.sort();
        refs
    }
}

#[async_trait]
impl ContentSource for MediaLibrary {
    async fn list_items(&self, library: &LibraryRef) -> Result<Vec<LibraryItem>> {
        let entries = self
            .libraries
            .get(library.as_str())
            .ok_or_else(|| Error::LibraryNotFound(library.to_string()))?;

        let mut items: Vec<LibraryItem> = entries
            .iter()
            .map(|entry| LibraryItem {
                item_ref: ItemRef::new(entry.id.clone()),
                name: entry.name.clone(),
                sort_key: entry.sort_key(),
                duration: entry.runtime_ticks.map(Ticks::new),
            })
            .collect();
        items.sort_by(|a, b| a.sort_key.cmp(&b.sort_key));
        Ok(items)
    }
}

#[async_trait]
impl MetadataSource for MediaLibrary {
    async fn describe(&self, item: &ItemRef) -> Result<Option<ItemMetadata>> {
        Ok(self.items.get(item.as_str()).map(ManifestEntry::metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHOWS: &str = r#"[
        {"id": "t2", "name": "Taxi 2", "runtime_ticks": 13200000000, "kind": "episode",
         "series_name": "Taxi", "season_number": 1, "episode_number": 2},
        {"id": "t1", "name": "Taxi 1", "runtime_ticks": 13200000000, "kind": "episode",
         "series_name": "Taxi", "season_number": 1, "episode_number": 1},
        {"id": "pilot", "name": "Unaired", "sort_name": "zzz"}
    ]"#;

    const MOVIES: &str = r#"[
        {"id": "heat", "name": "Heat", "runtime_ticks": 102000000000, "kind": "movie",
         "production_year": 1995, "overview": "A heist.", "image": "posters/heat.jpg"}
    ]"#;

    fn open_fixture() -> (tempfile::TempDir, MediaLibrary) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("shows.json"), SHOWS).unwrap();
        fs::write(dir.path().join("movies.json"), MOVIES).unwrap();
        fs::write(dir.path().join("README.txt"), "not a manifest").unwrap();
        let library = MediaLibrary::open(dir.path()).unwrap();
        (dir, library)
    }

    #[tokio::test]
    async fn test_open_reads_json_manifests_only() {
        let (_dir, library) = open_fixture();
        assert_eq!(
            library.library_refs(),
            vec![LibraryRef::new("movies"), LibraryRef::new("shows")]
        );
    }

    #[tokio::test]
    async fn test_list_items_sorted_by_display_order() {
        let (_dir, library) = open_fixture();
        let items = library.list_items(&LibraryRef::new("shows")).await.unwrap();
        let ids: Vec<&str> = items.iter().map(|i| i.item_ref.as_str()).collect();
        assert_eq!(ids, ["t1", "t2", "pilot"]);
        assert_eq!(items[0].duration, Some(Ticks::from_minutes(22)));
        assert_eq!(items[2].duration, None);

        let missing = library.list_items(&LibraryRef::new("music")).await;
        assert!(matches!(missing, Err(Error::LibraryNotFound(_))));
    }

    #[tokio::test]
    async fn test_describe_maps_manifest_fields() {
        let (_dir, library) = open_fixture();

        let taxi = library.describe(&ItemRef::new("t2")).await.unwrap().unwrap();
        assert_eq!(taxi.kind, ItemKind::Episode);
        let episode = taxi.episode.unwrap();
        assert_eq!(episode.series_name, "Taxi");
        assert_eq!(episode.episode_number, Some(2));

        let heat = library.describe(&ItemRef::new("heat")).await.unwrap().unwrap();
        assert_eq!(heat.kind, ItemKind::Movie);
        assert_eq!(heat.production_year, Some(1995));
        assert_eq!(heat.image_ref.as_deref(), Some("posters/heat.jpg"));
        assert!(heat.episode.is_none());

        assert!(library.describe(&ItemRef::new("nope")).await.unwrap().is_none());
    }

    #[test]
    fn test_open_rejects_malformed_manifest() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.json"), "{").unwrap();
        assert!(matches!(MediaLibrary::open(dir.path()), Err(Error::Json(_))));
    }
}
