//! File-backed [`MemoryStore`]: one JSON document per memory, linear scan
//! on retrieve. Grounded on the same atomic-write discipline as
//! conversation and trace persistence.

use async_trait::async_trait;
use ra_domain::{Error, Memory, Result};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::store::MemoryStore;

pub struct FileMemoryStore {
    dir: PathBuf,
}

impl FileMemoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, id: &Uuid) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    fn load_all(&self) -> Result<Vec<Memory>> {
        let mut memories = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.path().extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = std::fs::read(entry.path())?;
            if let Ok(memory) = serde_json::from_slice::<Memory>(&bytes) {
                memories.push(memory);
            }
        }
        Ok(memories)
    }
}

#[async_trait]
impl MemoryStore for FileMemoryStore {
    async fn store(&self, memory: Memory) -> Result<Uuid> {
        let id = memory.id;
        let bytes = serde_json::to_vec_pretty(&memory)?;
        atomic_write(&self.path_for(&id), &bytes)?;
        Ok(id)
    }

    async fn retrieve(&self, _query: Option<&str>, feature_id: Option<&str>, limit: usize) -> Vec<Memory> {
        let mut memories = match self.load_all() {
            Ok(m) => m,
            Err(err) => {
                tracing::warn!(error = %err, "file memory store retrieve failed, continuing without memory");
                return Vec::new();
            }
        };
        if let Some(feature_id) = feature_id {
            memories.retain(|m| m.feature_id == feature_id);
        }
        memories.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        memories.truncate(limit);
        memories
    }

    async fn retrieve_by_id(&self, id: Uuid) -> Option<Memory> {
        let bytes = std::fs::read(self.path_for(&id)).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    async fn clear_all(&self) -> Result<()> {
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.path().extension().and_then(|e| e.to_str()) == Some("json") {
                std::fs::remove_file(entry.path())?;
            }
        }
        Ok(())
    }
}

fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().ok_or_else(|| Error::Other("memory path has no parent".into()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    use std::io::Write;
    tmp.write_all(bytes)?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ra_domain::Decision;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn store_and_retrieve_by_id_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileMemoryStore::new(dir.path()).unwrap();
        let memory = Memory::new("FEAT-1", Decision::Ready, "tests passing", BTreeMap::new());
        let id = store.store(memory.clone()).await.unwrap();

        let loaded = store.retrieve_by_id(id).await.unwrap();
        assert_eq!(loaded.feature_id, "FEAT-1");
    }

    #[tokio::test]
    async fn retrieve_filters_by_feature_id_and_sorts_desc() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileMemoryStore::new(dir.path()).unwrap();

        let mut older = Memory::new("FEAT-1", Decision::Ready, "first", BTreeMap::new());
        older.timestamp = chrono::Utc::now() - chrono::Duration::hours(2);
        let newer = Memory::new("FEAT-1", Decision::Borderline, "second", BTreeMap::new());
        let other_feature = Memory::new("FEAT-2", Decision::NotReady, "unrelated", BTreeMap::new());

        store.store(older.clone()).await.unwrap();
        store.store(newer.clone()).await.unwrap();
        store.store(other_feature).await.unwrap();

        let results = store.retrieve(None, Some("FEAT-1"), 10).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, newer.id);
        assert_eq!(results[1].id, older.id);
    }

    #[tokio::test]
    async fn retrieve_by_id_missing_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileMemoryStore::new(dir.path()).unwrap();
        assert!(store.retrieve_by_id(Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn clear_all_empties_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileMemoryStore::new(dir.path()).unwrap();
        store.store(Memory::new("FEAT-1", Decision::Ready, "x", BTreeMap::new())).await.unwrap();
        store.clear_all().await.unwrap();
        assert!(store.retrieve(None, None, 10).await.is_empty());
    }
}
