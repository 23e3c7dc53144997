//! Persisted roster overrides that survive restarts.

use crate::{entity::Enrollable, roster::Participant};
use async_trait::async_trait;
use std::{collections::HashMap, io, path::PathBuf, sync::Mutex as StdMutex};
use thiserror::Error;
use tokio::{fs, sync::Mutex};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache storage: {0}")]
    Io(#[from] io::Error),
    #[error("malformed cache entry: {0}")]
    Format(#[from] serde_json::Error),
}

/// Raw text key-value storage under the cache.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn read(&self, key: &str) -> io::Result<Option<String>>;
    async fn write(&self, key: &str, value: &str) -> io::Result<()>;
}

/// One JSON file per key inside a directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn read(&self, key: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path(key)).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn write(&self, key: &str, value: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).await?;
        fs::rename(tmp, path).await
    }
}

#[derive(Default)]
pub struct MemoryStore {
    entries: StdMutex<HashMap<String, String>>,
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn read(&self, key: &str) -> io::Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "memory store poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    async fn write(&self, key: &str, value: &str) -> io::Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "memory store poisoned"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Roster per entity identifier.
pub type Overrides<R> = HashMap<String, Vec<Participant<R>>>;

/// Sole owner of the persisted roster overrides and of the entities created
/// while offline. Reads and writes are serialised, and each write replaces
/// the whole entry for an entity type.
pub struct OverrideCache {
    store: Mutex<Box<dyn KeyValueStore>>,
}

impl OverrideCache {
    pub fn new(store: impl KeyValueStore + 'static) -> Self {
        Self {
            store: Mutex::new(Box::new(store)),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::default())
    }

    pub async fn try_load<E: Enrollable>(&self) -> Result<Overrides<E::Record>, CacheError> {
        let store = self.store.lock().await;
        match store.read(E::CACHE_KEY).await? {
            Some(text) => Ok(serde_json::from_str(&text)?),
            None => Ok(Overrides::new()),
        }
    }

    /// Unreadable or corrupt entries count as empty.
    pub async fn load<E: Enrollable>(&self) -> Overrides<E::Record> {
        self.try_load::<E>().await.unwrap_or_else(|e| {
            tracing::warn!(key = E::CACHE_KEY, error = %e, "ignoring persisted overrides");
            Overrides::new()
        })
    }

    /// Writes a full snapshot: every entity with a non-empty roster, plus
    /// `touched` even when its roster is now empty.
    pub async fn save<E: Enrollable>(&self, entities: &[E], touched: &str) -> Result<(), CacheError> {
        let snapshot: Overrides<E::Record> = entities
            .iter()
            .filter(|e| !e.roster().is_empty() || e.id() == touched)
            .map(|e| (e.id().to_string(), e.roster().to_vec()))
            .collect();
        let text = serde_json::to_string(&snapshot)?;

        let store = self.store.lock().await;
        store.write(E::CACHE_KEY, &text).await?;
        tracing::debug!(key = E::CACHE_KEY, entries = snapshot.len(), "saved overrides");
        Ok(())
    }

    pub async fn try_load_created<E: Enrollable>(&self) -> Result<Vec<E>, CacheError> {
        let store = self.store.lock().await;
        match store.read(E::CREATED_KEY).await? {
            Some(text) => Ok(serde_json::from_str(&text)?),
            None => Ok(Vec::new()),
        }
    }

    pub async fn load_created<E: Enrollable>(&self) -> Vec<E> {
        self.try_load_created::<E>().await.unwrap_or_else(|e| {
            tracing::warn!(key = E::CREATED_KEY, error = %e, "ignoring persisted entities");
            Vec::new()
        })
    }

    /// Replaces the user-created entry with `created`, newest first.
    pub async fn save_created<E: Enrollable>(&self, created: &[E]) -> Result<(), CacheError> {
        let text = serde_json::to_string(created)?;
        let store = self.store.lock().await;
        store.write(E::CREATED_KEY, &text).await?;
        tracing::debug!(key = E::CREATED_KEY, entries = created.len(), "saved created entities");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        entity::{Club, Event, Member},
        roster::Enrollment,
        sample::Defaults,
    };
    use chrono::Utc;

    #[tokio::test]
    async fn snapshot_keeps_non_empty_rosters_and_the_touched_entity() {
        let cache = OverrideCache::in_memory();
        let mut clubs = Club::defaults();
        clubs[0]
            .members
            .push(Participant::Record(Member::new("u1".into(), "Alice".into(), Utc::now())));

        cache.save(&clubs, "2").await.unwrap();
        let loaded = cache.load::<Club>().await;

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded["1"], clubs[0].members);
        assert!(loaded["2"].is_empty());
    }

    #[tokio::test]
    async fn entity_types_use_separate_entries() {
        let cache = OverrideCache::in_memory();
        let mut clubs = Club::defaults();
        clubs[0].members.push(Participant::Bare("u1".into()));
        cache.save(&clubs, "1").await.unwrap();

        assert!(cache.load::<Event>().await.is_empty());
        assert_eq!(cache.load::<Club>().await.len(), 1);
    }

    #[tokio::test]
    async fn corrupt_entries_load_as_empty() {
        let store = MemoryStore::default();
        store.write(Club::CACHE_KEY, "{not json").await.unwrap();
        let cache = OverrideCache::new(store);

        assert!(matches!(
            cache.try_load::<Club>().await,
            Err(CacheError::Format(_))
        ));
        assert!(cache.load::<Club>().await.is_empty());
    }

    #[tokio::test]
    async fn file_store_survives_a_new_cache_instance() {
        let dir = tempfile::tempdir().unwrap();
        let mut clubs = Club::defaults();
        clubs[2].members.push(Participant::Bare("u7".into()));

        OverrideCache::new(FileStore::new(dir.path()))
            .save(&clubs, "3")
            .await
            .unwrap();

        let reopened = OverrideCache::new(FileStore::new(dir.path()));
        let loaded = reopened.load::<Club>().await;
        assert_eq!(loaded["3"][0].user_key(), "u7");
        assert!(dir.path().join("clubMemberships.json").exists());
    }

    #[tokio::test]
    async fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested"));
        assert_eq!(store.read("eventRSVPs").await.unwrap(), None);
    }

    #[tokio::test]
    async fn file_store_replaces_entries_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested"));
        store.write("clubMemberships", "{}").await.unwrap();
        store.write("clubMemberships", r#"{"1":[]}"#).await.unwrap();

        assert_eq!(store.read("clubMemberships").await.unwrap().as_deref(), Some(r#"{"1":[]}"#));
        assert!(!dir.path().join("nested/clubMemberships.json.tmp").exists());
    }

    #[tokio::test]
    async fn created_entities_have_their_own_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = OverrideCache::new(FileStore::new(dir.path()));
        let club = Club::from_draft(
            "local-1".to_string(),
            &crate::entity::ClubDraft {
                name: "Chess Club".to_string(),
                category: "Games".to_string(),
                description: None,
            },
            Utc::now(),
        );
        cache.save_created(&[club.clone()]).await.unwrap();

        let reopened = OverrideCache::new(FileStore::new(dir.path()));
        assert_eq!(reopened.load_created::<Club>().await, [club]);
        assert!(reopened.load_created::<Event>().await.is_empty());
        assert!(reopened.load::<Club>().await.is_empty());
        assert!(dir.path().join("userCreatedClubs.json").exists());
    }
}
