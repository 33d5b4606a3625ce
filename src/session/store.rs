//! Versioned key-value persistence for in-progress sessions.
//!
//! A session is stored as one JSON snapshot under a single key. Snapshots carry
//! a format version; anything that fails to parse or carries a different version
//! is deleted and the session starts from defaults. There is no migration path.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::errors::StoreError;

use super::gauge::MoraleGauge;
use super::model::{Difficulty, Job, Message, Session, Step};
use super::stage::ReviewStage;

pub const STORAGE_KEY: &str = "simulearn_state";
pub const STORAGE_VERSION: u32 = 1;

/// On-disk shape of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSnapshot {
    pub version: u32,
    pub draft_text: String,
    pub phase: Step,
    pub review_stage: ReviewStage,
    pub job: Option<Job>,
    /// Added after the first release of the format; absent in older snapshots.
    #[serde(default)]
    pub difficulty: Difficulty,
    pub gauge: MoraleGauge,
    pub attempts_in_stage: u32,
    pub messages: Vec<Message>,
}

impl PersistedSnapshot {
    pub fn capture(session: &Session) -> Self {
        Self {
            version: STORAGE_VERSION,
            draft_text: session.draft.clone(),
            phase: session.step,
            review_stage: session.review_stage,
            job: session.job,
            difficulty: session.difficulty,
            gauge: session.gauge,
            attempts_in_stage: session.stage_attempts,
            messages: session.messages.clone(),
        }
    }

    pub fn into_session(self) -> Session {
        Session {
            step: self.phase,
            review_stage: self.review_stage,
            stage_attempts: self.attempts_in_stage,
            job: self.job,
            difficulty: self.difficulty,
            gauge: self.gauge,
            draft: self.draft_text,
            messages: self.messages,
            ..Session::default()
        }
    }
}

/// Raw string storage, in the manner of a browser's local storage.
pub trait SnapshotStore: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn write(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Stores each key as `<dir>/<key>.json`.
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn io_error(path: &Path, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io_error(&path, e)),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| Self::io_error(&self.dir, e))?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).map_err(|e| Self::io_error(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| Self::io_error(&path, e))
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_error(&path, e)),
        }
    }
}

/// In-memory store. Writes can be switched off to simulate a full or
/// unavailable backend.
#[derive(Default)]
pub struct MemorySnapshotStore {
    entries: Mutex<HashMap<String, String>>,
    reject_writes: AtomicBool,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected("quota exceeded".to_string()));
        }
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries().remove(key);
        Ok(())
    }
}

/// Session-level view over a [`SnapshotStore`] bound to one key.
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn SnapshotStore>,
    key: String,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn SnapshotStore>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the stored session, discarding anything unreadable.
    ///
    /// Never fails: storage errors, corrupt JSON and version mismatches all
    /// yield `None`.
    pub fn load(&self) -> Option<Session> {
        let raw = match self.backend.read(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "failed to read session snapshot");
                return None;
            }
        };

        let value: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(key = %self.key, error = %e, "discarding corrupt session snapshot");
                self.discard();
                return None;
            }
        };

        let version = value.get("version").and_then(|v| v.as_u64());
        if version != Some(u64::from(STORAGE_VERSION)) {
            tracing::debug!(
                key = %self.key,
                found = ?version,
                expected = STORAGE_VERSION,
                "discarding session snapshot with mismatched version"
            );
            self.discard();
            return None;
        }

        match serde_json::from_value::<PersistedSnapshot>(value) {
            Ok(snapshot) => Some(snapshot.into_session()),
            Err(e) => {
                tracing::debug!(key = %self.key, error = %e, "discarding malformed session snapshot");
                self.discard();
                None
            }
        }
    }

    pub fn save(&self, snapshot: &PersistedSnapshot) -> Result<(), StoreError> {
        let json = serde_json::to_string(snapshot).map_err(StoreError::Serialize)?;
        self.backend.write(&self.key, &json)
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.backend.remove(&self.key)
    }

    fn discard(&self) {
        if let Err(e) = self.backend.remove(&self.key) {
            tracing::warn!(key = %self.key, error = %e, "failed to remove stale session snapshot");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::model::{MessageKind, senders};
    use tempfile::tempdir;

    fn sample_session() -> Session {
        let mut session = Session {
            step: Step::Task,
            review_stage: ReviewStage::Developer,
            stage_attempts: 1,
            job: Some(Job::Planner),
            difficulty: Difficulty::Hard,
            gauge: MoraleGauge::from(70),
            draft: "# 기획안\n\n## 예외 처리\n- 타임아웃 시 재시도".to_string(),
            ..Session::default()
        };
        session.push_message(Message::new("msg", senders::BIZ_LEAD, "brief", MessageKind::Mission));
        session.push_message(Message::new("feedback", senders::DESIGNER, "좋아요", MessageKind::Text));
        session.push_message(Message::new("feedback", senders::DEVELOPER, "예외는요?", MessageKind::Text));
        session
    }

    fn memory_store() -> (SessionStore, Arc<MemorySnapshotStore>) {
        let backend = Arc::new(MemorySnapshotStore::new());
        (SessionStore::new(backend.clone(), STORAGE_KEY), backend)
    }

    #[test]
    fn test_round_trip_preserves_persisted_fields() {
        let (store, _backend) = memory_store();
        let session = sample_session();
        store.save(&PersistedSnapshot::capture(&session)).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.draft, session.draft);
        assert_eq!(loaded.step, Step::Task);
        assert_eq!(loaded.review_stage, ReviewStage::Developer);
        assert_eq!(loaded.gauge.value(), 70);
        assert_eq!(loaded.stage_attempts, 1);
        assert_eq!(loaded.difficulty, Difficulty::Hard);
        assert_eq!(loaded.messages, session.messages);
    }

    #[test]
    fn test_version_mismatch_discards_snapshot() {
        let (store, backend) = memory_store();
        let mut snapshot = PersistedSnapshot::capture(&sample_session());
        snapshot.version = STORAGE_VERSION + 1;
        backend
            .write(STORAGE_KEY, &serde_json::to_string(&snapshot).unwrap())
            .unwrap();

        assert!(store.load().is_none());
        assert!(backend.read(STORAGE_KEY).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_snapshot_is_discarded() {
        let (store, backend) = memory_store();
        backend.write(STORAGE_KEY, "{not json").unwrap();
        assert!(store.load().is_none());
        assert!(backend.read(STORAGE_KEY).unwrap().is_none());
    }

    #[test]
    fn test_wrong_shape_with_matching_version_is_discarded() {
        let (store, backend) = memory_store();
        backend
            .write(STORAGE_KEY, r#"{"version":1,"draftText":42}"#)
            .unwrap();
        assert!(store.load().is_none());
        assert!(backend.read(STORAGE_KEY).unwrap().is_none());
    }

    #[test]
    fn test_snapshot_without_difficulty_still_loads() {
        let (store, backend) = memory_store();
        let raw = r#"{
            "version": 1,
            "draftText": "draft",
            "phase": "level-1-task",
            "reviewStage": "qa",
            "job": "planner",
            "gauge": 40,
            "attemptsInStage": 2,
            "messages": []
        }"#;
        backend.write(STORAGE_KEY, raw).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.review_stage, ReviewStage::Qa);
        assert_eq!(loaded.difficulty, Difficulty::Easy);
    }

    #[test]
    fn test_rejected_write_surfaces_error() {
        let (store, backend) = memory_store();
        backend.set_reject_writes(true);
        let result = store.save(&PersistedSnapshot::capture(&Session::default()));
        assert!(matches!(result, Err(StoreError::Rejected(_))));
    }

    #[test]
    fn test_file_store_survives_restart() {
        let dir = tempdir().unwrap();
        let session = sample_session();
        {
            let store = SessionStore::new(Arc::new(FileSnapshotStore::new(dir.path())), STORAGE_KEY);
            store.save(&PersistedSnapshot::capture(&session)).unwrap();
        }
        {
            let store = SessionStore::new(Arc::new(FileSnapshotStore::new(dir.path())), STORAGE_KEY);
            let loaded = store.load().unwrap();
            assert_eq!(loaded.messages.len(), 3);
            store.clear().unwrap();
            assert!(store.load().is_none());
        }
    }

    #[test]
    fn test_file_store_remove_missing_is_ok() {
        let dir = tempdir().unwrap();
        let backend = FileSnapshotStore::new(dir.path().join("nested"));
        assert!(backend.read("absent").unwrap().is_none());
        backend.remove("absent").unwrap();
    }

    #[test]
    fn test_keys_are_isolated() {
        let backend: Arc<dyn SnapshotStore> = Arc::new(MemorySnapshotStore::new());
        let a = SessionStore::new(backend.clone(), "session-a");
        let b = SessionStore::new(backend, "session-b");
        a.save(&PersistedSnapshot::capture(&sample_session())).unwrap();
        assert!(a.load().is_some());
        assert!(b.load().is_none());
    }
}
