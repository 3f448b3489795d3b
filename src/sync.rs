//! File → index reconciliation.
//!
//! Keeps the index store equal to the chunking of the current file bytes.
//! Change events enqueue paths onto a bounded queue drained by a worker
//! pool; duplicate requests for the same path coalesce, and the reconcile
//! re-reads the file so the latest bytes always win. A periodic sweep
//! retries failures with per-file exponential backoff and picks up files
//! changed behind the service's back.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch, Mutex as AsyncMutex, Notify};
use tracing::{debug, error, info, warn};

use crate::chunker::Chunker;
use crate::config::SyncConfig;
use crate::embedding::Embedder;
use crate::error::{MemoryError, Result};
use crate::fs::{FileStore, JsonIndex};
use crate::index::{ChunkRecord, FileMeta, IndexStore, SyncState};
use crate::locks::PathLocks;
use crate::types::{sha256_hex, title_from_slug, word_count, Category, MAIN_FILE};

/// Base delay for the failure backoff; doubles per consecutive failure.
const BACKOFF_BASE: Duration = Duration::from_secs(30);
const BACKOFF_MAX: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone)]
struct SyncRequest {
    path: String,
    /// Skip the unchanged-hash short circuit (metadata-only updates).
    force: bool,
}

pub struct SyncService {
    inner: Arc<SyncInner>,
    shutdown_tx: watch::Sender<bool>,
}

struct SyncInner {
    files: Arc<FileStore>,
    json_index: Arc<JsonIndex>,
    index: Arc<dyn IndexStore>,
    embedder: Option<Arc<Embedder>>,
    chunker: Chunker,
    tx: mpsc::Sender<SyncRequest>,
    /// Paths currently sitting in the queue, for coalescing.
    queued: Mutex<HashMap<String, bool>>,
    locks: PathLocks,
    inflight: AtomicUsize,
    idle_notify: Notify,
    /// Consecutive failures and earliest retry time, per path.
    backoff: Mutex<HashMap<String, (u32, Instant)>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl SyncService {
    /// Spawn the worker pool and the periodic sweep, returning the handle
    /// used to schedule work.
    pub fn start(
        files: Arc<FileStore>,
        json_index: Arc<JsonIndex>,
        index: Arc<dyn IndexStore>,
        embedder: Option<Arc<Embedder>>,
        chunker: Chunker,
        config: &SyncConfig,
    ) -> Arc<Self> {
        let (tx, rx) = mpsc::channel::<SyncRequest>(config.queue_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let inner = Arc::new(SyncInner {
            files,
            json_index,
            index,
            embedder,
            chunker,
            tx,
            queued: Mutex::new(HashMap::new()),
            locks: PathLocks::new(),
            inflight: AtomicUsize::new(0),
            idle_notify: Notify::new(),
            backoff: Mutex::new(HashMap::new()),
            shutdown_rx,
        });

        let service = Arc::new(Self {
            inner: inner.clone(),
            shutdown_tx,
        });

        let rx = Arc::new(AsyncMutex::new(rx));
        for worker_id in 0..config.workers.max(1) {
            let inner = inner.clone();
            let rx = rx.clone();
            tokio::spawn(async move {
                worker_loop(worker_id, inner, rx).await;
            });
        }

        let sweep_service = Arc::downgrade(&service);
        let interval = Duration::from_secs(config.sweep_interval_seconds.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await; // first tick fires immediately, skip it
            loop {
                ticker.tick().await;
                let Some(service) = sweep_service.upgrade() else {
                    break;
                };
                if *service.inner.shutdown_rx.borrow() {
                    break;
                }
                if let Err(e) = service.sweep().await {
                    warn!(error = %e, "periodic sweep failed");
                }
            }
        });

        info!(workers = config.workers, "sync service started");
        service
    }

    /// Enqueue a reconcile for one path. Duplicate requests coalesce; a
    /// full queue drops the request (the sweep will catch up).
    pub fn schedule(&self, path: &str, force: bool) {
        {
            let mut queued = self.inner.queued.lock().expect("sync queue set poisoned");
            if let Some(existing_force) = queued.get_mut(path) {
                *existing_force |= force;
                return;
            }
            queued.insert(path.to_string(), force);
        }
        let request = SyncRequest {
            path: path.to_string(),
            force,
        };
        if let Err(e) = self.inner.tx.try_send(request) {
            warn!(path, error = %e, "sync queue full, dropping request");
            self.inner
                .queued
                .lock()
                .expect("sync queue set poisoned")
                .remove(path);
        }
    }

    /// Reconcile one path right now, bypassing the queue. Still takes the
    /// per-path lock, so it serializes with queued work.
    pub async fn reconcile_now(&self, path: &str, force: bool) -> Result<()> {
        self.inner.reconcile(path, force).await
    }

    /// Remove a deleted file from the index unconditionally.
    pub async fn remove_file(&self, path: &str) -> Result<bool> {
        let removed = self.inner.index.delete_file(path).await?;
        self.inner
            .backoff
            .lock()
            .expect("backoff map poisoned")
            .remove(path);
        debug!(path, removed, "file removed from index");
        Ok(removed)
    }

    /// Truncate the index store (memory reset).
    pub async fn clear_index(&self) -> Result<()> {
        self.inner.index.clear().await?;
        self.inner
            .backoff
            .lock()
            .expect("backoff map poisoned")
            .clear();
        Ok(())
    }

    /// Scan the whole tree and enqueue every file that is due: changed
    /// files always, failed files once their backoff has elapsed.
    pub async fn sweep(&self) -> Result<usize> {
        let now = Instant::now();
        let mut scheduled = 0;
        for path in self.inner.files.list_markdown()? {
            let due = {
                let backoff = self.inner.backoff.lock().expect("backoff map poisoned");
                backoff.get(&path).map(|(_, next)| *next <= now).unwrap_or(true)
            };
            if due {
                self.schedule(&path, false);
                scheduled += 1;
            }
        }
        debug!(scheduled, "sweep scheduled files");
        Ok(scheduled)
    }

    /// Reconcile every file on disk and wait for completion. Used at
    /// startup and by `memory.initialize`.
    pub async fn sync_all(&self) -> Result<()> {
        for path in self.inner.files.list_markdown()? {
            self.schedule(&path, false);
        }
        self.wait_idle().await;
        Ok(())
    }

    /// Wait until the queue is empty and no reconcile is in flight.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle_notify.notified();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }

    fn is_idle(&self) -> bool {
        self.inner
            .queued
            .lock()
            .expect("sync queue set poisoned")
            .is_empty()
            && self.inner.inflight.load(Ordering::SeqCst) == 0
    }

    /// Signal workers to stop. In-flight reconciles mark themselves failed
    /// with a cancellation message at their next checkpoint.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

async fn worker_loop(
    worker_id: usize,
    inner: Arc<SyncInner>,
    rx: Arc<AsyncMutex<mpsc::Receiver<SyncRequest>>>,
) {
    let mut shutdown = inner.shutdown_rx.clone();
    loop {
        let request = {
            let mut rx = rx.lock().await;
            tokio::select! {
                _ = shutdown.changed() => None,
                request = rx.recv() => request,
            }
        };
        let Some(request) = request else {
            debug!(worker_id, "sync worker stopping");
            break;
        };

        inner.inflight.fetch_add(1, Ordering::SeqCst);
        let force = {
            let mut queued = inner.queued.lock().expect("sync queue set poisoned");
            queued.remove(&request.path).unwrap_or(request.force)
        };

        if let Err(e) = inner.reconcile(&request.path, force).await {
            warn!(path = %request.path, error = %e, "reconcile failed");
        }

        inner.inflight.fetch_sub(1, Ordering::SeqCst);
        inner.idle_notify.notify_waiters();
    }
}

impl SyncInner {
    /// The per-file reconcile procedure. Exactly one runs per path at a
    /// time; later requests see the latest bytes because the file is
    /// re-read under the lock.
    async fn reconcile(&self, path: &str, force: bool) -> Result<()> {
        let lock = self.locks.get(path);
        let _guard = lock.lock().await;

        // Deleted files drop out of the index unconditionally.
        let content = match self.files.read(path) {
            Ok(content) => content,
            Err(MemoryError::NotFound(_)) => {
                self.index.delete_file(path).await?;
                self.clear_backoff(path);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let new_hash = sha256_hex(&content);
        let record = self.index.sync_record(path).await?;
        if !force {
            if let Some(record) = &record {
                if record.status == SyncState::Completed
                    && record.last_synced_hash.as_deref() == Some(new_hash.as_str())
                {
                    debug!(path, "file unchanged, skipping reconcile");
                    return Ok(());
                }
            }
        }

        let meta = self.file_meta(path, &content, &new_hash);
        let file_id = self.index.upsert_file(&meta).await?;
        self.index
            .mark_sync(file_id, SyncState::Syncing, None, None)
            .await?;

        match self.rebuild_chunks(path, file_id, &content).await {
            Ok(count) => {
                self.index
                    .mark_sync(file_id, SyncState::Completed, Some(&new_hash), None)
                    .await?;
                self.clear_backoff(path);
                info!(path, chunks = count, "file synced");
                Ok(())
            }
            Err(e) => {
                let message = match &e {
                    MemoryError::Cancelled => "cancelled".to_string(),
                    other => other.to_string(),
                };
                if let Err(mark_err) = self
                    .index
                    .mark_sync(file_id, SyncState::Failed, None, Some(&message))
                    .await
                {
                    error!(path, error = %mark_err, "failed to record sync failure");
                }
                self.bump_backoff(path);
                Err(e)
            }
        }
    }

    /// Chunk, embed, and replace. Prior chunks stay intact if any step
    /// fails, because the replacement is a single transaction at the store.
    async fn rebuild_chunks(&self, path: &str, file_id: i64, content: &str) -> Result<usize> {
        let chunks = self.chunker.chunk(content);

        if *self.shutdown_rx.borrow() {
            return Err(MemoryError::Cancelled);
        }

        let embeddings: Vec<Option<Vec<f32>>> = match &self.embedder {
            Some(embedder) => {
                let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
                embedder
                    .embed(&texts)
                    .await?
                    .into_iter()
                    .map(Some)
                    .collect()
            }
            None => vec![None; chunks.len()],
        };

        if *self.shutdown_rx.borrow() {
            return Err(MemoryError::Cancelled);
        }

        let records: Vec<ChunkRecord> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| ChunkRecord {
                chunk_index: chunk.chunk_index as i32,
                content: chunk.content,
                content_hash: chunk.content_hash,
                embedding,
                header_path: chunk.header_path,
                section_level: chunk.section_level as i32,
            })
            .collect();

        let count = records.len();
        self.index.replace_chunks(file_id, &records).await?;
        debug!(path, count, "chunks rebuilt");
        Ok(count)
    }

    /// Metadata for the index row. The JSON index is the authority for
    /// title, tags, and metadata; files it has never seen fall back to
    /// path-derived values.
    fn file_meta(&self, path: &str, content: &str, hash: &str) -> FileMeta {
        let category = Category::from_path(path);
        match self.json_index.get(path) {
            Some(entry) => FileMeta {
                file_path: path.to_string(),
                title: entry.title,
                category,
                file_hash: hash.to_string(),
                word_count: word_count(content),
                tags: entry.tags,
                metadata: serde_json::Value::Object(entry.metadata),
            },
            None => {
                let slug = path
                    .rsplit('/')
                    .next()
                    .unwrap_or(path)
                    .trim_end_matches(".md");
                let title = if path == MAIN_FILE {
                    "Agent Memory - Main Notes".to_string()
                } else {
                    title_from_slug(slug)
                };
                FileMeta {
                    file_path: path.to_string(),
                    title,
                    category,
                    file_hash: hash.to_string(),
                    word_count: word_count(content),
                    tags: Vec::new(),
                    metadata: serde_json::json!({}),
                }
            }
        }
    }

    fn bump_backoff(&self, path: &str) {
        let mut backoff = self.backoff.lock().expect("backoff map poisoned");
        let (attempts, _) = backoff.get(path).copied().unwrap_or((0, Instant::now()));
        let attempts = attempts + 1;
        let delay = BACKOFF_BASE
            .checked_mul(2u32.saturating_pow(attempts.saturating_sub(1)))
            .unwrap_or(BACKOFF_MAX)
            .min(BACKOFF_MAX);
        backoff.insert(path.to_string(), (attempts, Instant::now() + delay));
    }

    fn clear_backoff(&self, path: &str) {
        self.backoff
            .lock()
            .expect("backoff map poisoned")
            .remove(path);
    }
}
