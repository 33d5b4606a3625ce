//! Debounced snapshot writer.
//!
//! Every call to [`DebouncedPersister::schedule`] replaces the pending snapshot
//! and restarts the quiet-period timer, so a burst of edits produces a single
//! write. Pending state is flushed explicitly on shutdown and implicitly on drop.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::errors::StoreError;

use super::store::{PersistedSnapshot, SessionStore};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

pub struct DebouncedPersister {
    store: SessionStore,
    delay: Duration,
    latest: Arc<Mutex<Option<PersistedSnapshot>>>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn write_snapshot(store: &SessionStore, snapshot: &PersistedSnapshot) {
    match store.save(snapshot) {
        Ok(()) => tracing::trace!(key = store.key(), "session snapshot written"),
        Err(e) => tracing::warn!(key = store.key(), error = %e, "failed to persist session"),
    }
}

impl DebouncedPersister {
    pub fn new(store: SessionStore, delay: Duration) -> Self {
        Self {
            store,
            delay,
            latest: Arc::new(Mutex::new(None)),
            timer: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Queue `snapshot`, replacing anything still pending, and restart the timer.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(&self, snapshot: PersistedSnapshot) {
        *lock(&self.latest) = Some(snapshot);

        let mut timer = lock(&self.timer);
        if let Some(handle) = timer.take() {
            handle.abort();
        }

        let latest = Arc::clone(&self.latest);
        let store = self.store.clone();
        let delay = self.delay;
        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Held across the write so `discard` cannot clear underneath it.
            let mut pending = lock(&latest);
            if let Some(snapshot) = pending.take() {
                write_snapshot(&store, &snapshot);
            }
        }));
    }

    /// Write the pending snapshot now. Returns whether anything was written.
    pub fn flush(&self) -> bool {
        if let Some(handle) = lock(&self.timer).take() {
            handle.abort();
        }
        let mut pending = lock(&self.latest);
        match pending.take() {
            Some(snapshot) => {
                write_snapshot(&self.store, &snapshot);
                true
            }
            None => false,
        }
    }

    /// Drop the pending snapshot without writing it.
    pub fn cancel(&self) {
        if let Some(handle) = lock(&self.timer).take() {
            handle.abort();
        }
        lock(&self.latest).take();
    }

    /// Drop the pending snapshot and remove the stored one.
    ///
    /// A timer write already in progress finishes before the store is cleared.
    pub fn discard(&self) -> Result<(), StoreError> {
        if let Some(handle) = lock(&self.timer).take() {
            handle.abort();
        }
        let mut pending = lock(&self.latest);
        pending.take();
        self.store.clear()
    }

    pub fn is_pending(&self) -> bool {
        lock(&self.latest).is_some()
    }
}

impl Drop for DebouncedPersister {
    fn drop(&mut self) {
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use crate::session::store::{MemorySnapshotStore, STORAGE_KEY, SnapshotStore};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingStore {
        inner: MemorySnapshotStore,
        writes: AtomicUsize,
    }

    impl SnapshotStore for CountingStore {
        fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.read(key)
        }

        fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.write(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.inner.remove(key)
        }
    }

    fn setup() -> (DebouncedPersister, Arc<CountingStore>) {
        let backend = Arc::new(CountingStore::default());
        let store = SessionStore::new(backend.clone(), STORAGE_KEY);
        (DebouncedPersister::new(store, DEFAULT_DEBOUNCE), backend)
    }

    fn snapshot_with_draft(draft: &str) -> PersistedSnapshot {
        let session = Session {
            draft: draft.to_string(),
            ..Session::default()
        };
        PersistedSnapshot::capture(&session)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_edits_writes_once_with_latest() {
        let (persister, backend) = setup();
        for i in 0..5 {
            persister.schedule(snapshot_with_draft(&format!("draft {}", i)));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(backend.writes.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(450)).await;
        assert_eq!(backend.writes.load(Ordering::SeqCst), 1);
        let loaded = persister.store().load().unwrap();
        assert_eq!(loaded.draft, "draft 4");
        assert!(!persister.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_writes_immediately_and_only_once() {
        let (persister, backend) = setup();
        persister.schedule(snapshot_with_draft("flushed"));
        assert!(persister.flush());
        assert_eq!(backend.writes.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(backend.writes.load(Ordering::SeqCst), 1);
        assert!(!persister.flush());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_discards_pending_write() {
        let (persister, backend) = setup();
        persister.schedule(snapshot_with_draft("never"));
        persister.cancel();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(backend.writes.load(Ordering::SeqCst), 0);
        assert!(persister.store().load().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_flushes_pending_write() {
        let (persister, backend) = setup();
        let store = persister.store().clone();
        persister.schedule(snapshot_with_draft("on drop"));
        drop(persister);
        assert_eq!(backend.writes.load(Ordering::SeqCst), 1);
        assert_eq!(store.load().unwrap().draft, "on drop");
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_failure_is_swallowed() {
        let backend = Arc::new(MemorySnapshotStore::new());
        backend.set_reject_writes(true);
        let persister =
            DebouncedPersister::new(SessionStore::new(backend, STORAGE_KEY), DEFAULT_DEBOUNCE);
        persister.schedule(snapshot_with_draft("rejected"));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!persister.is_pending());
        assert!(persister.store().load().is_none());
    }

    /// Signals when a write starts, then stalls before committing it.
    struct StallingStore {
        inner: MemorySnapshotStore,
        started: std::sync::mpsc::SyncSender<()>,
    }

    impl SnapshotStore for StallingStore {
        fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.read(key)
        }

        fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
            let _ = self.started.try_send(());
            std::thread::sleep(Duration::from_millis(100));
            self.inner.write(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.inner.remove(key)
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_discard_waits_for_running_write() {
        let (started_tx, started_rx) = std::sync::mpsc::sync_channel(1);
        let backend = Arc::new(StallingStore {
            inner: MemorySnapshotStore::new(),
            started: started_tx,
        });
        let persister = DebouncedPersister::new(
            SessionStore::new(backend.clone(), STORAGE_KEY),
            Duration::from_millis(1),
        );

        persister.schedule(snapshot_with_draft("stale"));
        tokio::task::spawn_blocking(move || started_rx.recv())
            .await
            .unwrap()
            .unwrap();

        persister.discard().unwrap();
        assert!(backend.inner.read(STORAGE_KEY).unwrap().is_none());
        assert!(persister.store().load().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_discard_clears_stored_and_pending() {
        let (persister, backend) = setup();
        persister.schedule(snapshot_with_draft("saved"));
        persister.flush();
        persister.schedule(snapshot_with_draft("pending"));

        persister.discard().unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(persister.store().load().is_none());
        assert_eq!(backend.writes.load(Ordering::SeqCst), 1);
    }
}
