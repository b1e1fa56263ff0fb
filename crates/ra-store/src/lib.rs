//! Durable, self-describing persistence of [`Conversation`]s: one JSON
//! document per conversation, written atomically (temp file + rename),
//! loadable by git-style shortest-unambiguous id prefix.

use chrono::{DateTime, Utc};
use ra_domain::{Conversation, Error, Result};
use std::path::{Path, PathBuf};
use uuid::Uuid;

const MIN_PREFIX_LEN: usize = 4;

pub struct ConversationStore {
    dir: PathBuf,
}

impl ConversationStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, id: &Uuid) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Atomic write of the full conversation JSON, keyed by `conversation.id`.
    /// Save order equals message-append order because the Agent serializes
    /// turn handling per conversation; this store does not itself lock.
    pub fn save(&self, conversation: &Conversation) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(conversation)?;
        atomic_write(&self.path_for(&conversation.id), &bytes)
    }

    /// Resolves a full id or shortest-unambiguous prefix (minimum 4 hex
    /// characters, per the conversation file format). Raises on not-found
    /// or ambiguous prefix.
    pub fn load(&self, id_or_prefix: &str) -> Result<Conversation> {
        if let Ok(id) = Uuid::parse_str(id_or_prefix) {
            return self.load_by_id(&id);
        }

        if id_or_prefix.len() < MIN_PREFIX_LEN {
            return Err(Error::Validation(format!(
                "conversation id prefix {id_or_prefix:?} must be at least {MIN_PREFIX_LEN} characters"
            )));
        }

        let prefix = id_or_prefix.to_ascii_lowercase();
        let matches: Vec<Uuid> = self
            .all_ids()?
            .into_iter()
            .filter(|id| id.to_string().starts_with(&prefix))
            .collect();

        match matches.len() {
            0 => Err(Error::NotFound(id_or_prefix.to_string())),
            1 => self.load_by_id(&matches[0]),
            _ => Err(Error::AmbiguousPrefix {
                prefix: id_or_prefix.to_string(),
                matches: matches.iter().map(Uuid::to_string).collect(),
            }),
        }
    }

    fn load_by_id(&self, id: &Uuid) -> Result<Conversation> {
        let path = self.path_for(id);
        let bytes = std::fs::read(&path).map_err(|_| Error::NotFound(id.to_string()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn all_ids(&self) -> Result<Vec<Uuid>> {
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if let Some(stem) = entry.path().file_stem().and_then(|s| s.to_str()) {
                if let Ok(id) = Uuid::parse_str(stem) {
                    ids.push(id);
                }
            }
        }
        Ok(ids)
    }

    /// Returns `(id, updated_at)` pairs sorted by `updated_at` descending.
    pub fn list_all(&self) -> Result<Vec<(Uuid, DateTime<Utc>)>> {
        let mut entries = Vec::new();
        for id in self.all_ids()? {
            let conv = self.load_by_id(&id)?;
            entries.push((id, conv.updated_at));
        }
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(entries)
    }
}

fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().ok_or_else(|| Error::Other("conversation path has no parent".into()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    use std::io::Write;
    tmp.write_all(bytes)?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_save_and_load_by_full_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConversationStore::new(dir.path()).unwrap();
        let conv = Conversation::new("system prompt");
        store.save(&conv).unwrap();

        let loaded = store.load(&conv.id.to_string()).unwrap();
        assert_eq!(loaded.id, conv.id);
        assert_eq!(loaded.system_prompt, conv.system_prompt);
    }

    #[test]
    fn load_by_unambiguous_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConversationStore::new(dir.path()).unwrap();
        let conv = Conversation::new("system");
        store.save(&conv).unwrap();

        let prefix = &conv.id.to_string()[..8];
        let loaded = store.load(prefix).unwrap();
        assert_eq!(loaded.id, conv.id);
    }

    #[test]
    fn load_by_ambiguous_prefix_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConversationStore::new(dir.path()).unwrap();

        // Force a collision by writing two files sharing a prefix directly.
        let shared = "aaaaaaaa-0000-0000-0000-000000000000";
        let shared2 = "aaaaaaaa-0000-0000-0000-000000000001";
        std::fs::write(dir.path().join(format!("{shared}.json")), b"{}").unwrap();
        std::fs::write(dir.path().join(format!("{shared2}.json")), b"{}").unwrap();

        let err = store.load("aaaaaaaa");
        assert!(matches!(err, Err(Error::AmbiguousPrefix { .. })));
    }

    #[test]
    fn load_missing_returns_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConversationStore::new(dir.path()).unwrap();
        let err = store.load("deadbeef");
        assert!(matches!(err, Err(Error::NotFound(_))));
    }

    #[test]
    fn list_all_sorted_by_updated_at_descending() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConversationStore::new(dir.path()).unwrap();

        let mut older = Conversation::new("a");
        older.updated_at = Utc::now() - chrono::Duration::hours(2);
        let mut newer = Conversation::new("b");
        newer.updated_at = Utc::now();

        store.save(&older).unwrap();
        store.save(&newer).unwrap();

        let all = store.list_all().unwrap();
        assert_eq!(all[0].0, newer.id);
        assert_eq!(all[1].0, older.id);
    }
}
