//! The cache index and store.

use crate::entry::{meta_from_record, CacheEntry, EntryMeta};
use crate::lease::{EntryLease, HitKind};
use caldera_core::{CacheConfig, ObjectRecord};
use caldera_error::{CacheError, CacheErrorKind, CalderaResult};
use caldera_storage::{BlobStore, MetadataStore};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

/// Aggregate cache counters, kept consistent with every insert and delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of entries in the index
    pub total_items: usize,
    /// Sum of entry sizes in bytes
    pub total_size: u64,
}

/// Usage counters for one entry, as seen under the critical section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryStats {
    /// Live references held by leases
    pub ref_count: u32,
    /// HEAD completions since the last decay tick
    pub head_hits: u64,
    /// GET completions since the last decay tick
    pub get_hits: u64,
}

/// Index state guarded by the single critical section.
///
/// Never held across an await point.
struct IndexState {
    initialized: bool,
    items: HashMap<String, CacheEntry>,
    total_items: usize,
    total_size: u64,
    eviction_running: bool,
    eviction_waiters: Vec<oneshot::Sender<()>>,
}

/// Snapshot of one entry for eviction scoring outside the lock.
struct EvictionCandidate {
    hash: String,
    size: u64,
    score: u128,
    ref_count: u32,
}

/// The hot-object cache: an in-memory index of on-disk entries mirrored by
/// per-entry sidecar files.
///
/// One instance per process, constructed at startup and shared via `Arc`.
/// Lookups resolve a hash to a local file, populating from the blob store on
/// miss; every handed-out [`EntryLease`] holds a reference count that
/// protects the entry from the eviction pass.
pub struct CacheService {
    config: CacheConfig,
    blobs: Arc<dyn BlobStore>,
    metadata: Arc<dyn MetadataStore>,
    state: Mutex<IndexState>,
}

impl std::fmt::Debug for CacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CacheService {
    /// Create a cache service over the given collaborators.
    ///
    /// Call [`CacheService::init`] before first use to scan any entries left
    /// on disk by a previous run.
    pub fn new(
        config: CacheConfig,
        blobs: Arc<dyn BlobStore>,
        metadata: Arc<dyn MetadataStore>,
    ) -> Self {
        tracing::debug!(
            cache_dir = %config.cache_dir().display(),
            max_items = config.max_items(),
            max_bytes = config.max_bytes(),
            "Creating cache service"
        );
        Self {
            config,
            blobs,
            metadata,
            state: Mutex::new(IndexState {
                initialized: false,
                items: HashMap::new(),
                total_items: 0,
                total_size: 0,
                eviction_running: false,
                eviction_waiters: Vec::new(),
            }),
        }
    }

    /// Cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Per-entry usage counters, if the hash is indexed.
    pub fn entry_stats(&self, hash: &str) -> Option<EntryStats> {
        let state = self.state.lock();
        state.items.get(hash).map(|entry| EntryStats {
            ref_count: entry.ref_count,
            head_hits: entry.head_hits,
            get_hits: entry.get_hits,
        })
    }

    /// Current aggregate counters.
    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            total_items: state.total_items,
            total_size: state.total_size,
        }
    }

    /// Canonical blob and sidecar paths for a content hash.
    ///
    /// The first N hex characters shard entries into subdirectories to bound
    /// directory fan-out. The parser accepts arbitrary strings as literal
    /// hashes, so the prefix is taken by character rather than by byte: a
    /// non-hex lookup resolves to a path that simply does not exist.
    fn entry_paths(&self, hash: &str) -> (PathBuf, PathBuf) {
        let prefix: String = hash.chars().take(*self.config.shard_prefix_len()).collect();
        let dir = self.config.cache_dir().join(prefix);
        let file_path = dir.join(hash);
        let meta_path = dir.join(format!("{}.json", hash));
        (file_path, meta_path)
    }

    /// Scan the cache root and index every valid blob/sidecar pair.
    ///
    /// Idempotent. A blob with a missing or invalid sidecar, or whose size
    /// disagrees with its sidecar, is deleted and skipped: a crash between
    /// blob write and sidecar write self-heals here.
    #[tracing::instrument(skip(self))]
    pub async fn init(&self) -> CalderaResult<()> {
        if self.state.lock().initialized {
            return Ok(());
        }

        let root = self.config.cache_dir().clone();
        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            CacheError::new(CacheErrorKind::Io(format!("{}: {}", root.display(), e)))
        })?;

        let mut pending = vec![root];
        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "Skipping unreadable cache directory");
                    continue;
                }
            };

            loop {
                let dirent = match entries.next_entry().await {
                    Ok(Some(dirent)) => dirent,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(dir = %dir.display(), error = %e, "Stopping scan of cache directory");
                        break;
                    }
                };
                let path = dirent.path();
                match dirent.file_type().await {
                    Ok(ft) if ft.is_dir() => pending.push(path),
                    Ok(ft) if ft.is_file() => {
                        if path.extension().is_some_and(|ext| ext == "json") {
                            continue;
                        }
                        let meta_path = sidecar_path(&path);
                        self.load_pair(&path, &meta_path).await;
                    }
                    _ => {}
                }
            }
        }

        let stats = {
            let mut state = self.state.lock();
            state.initialized = true;
            CacheStats {
                total_items: state.total_items,
                total_size: state.total_size,
            }
        };
        tracing::info!(
            total_items = stats.total_items,
            total_size = stats.total_size,
            "Cache scan complete"
        );
        Ok(())
    }

    /// Load one blob/sidecar pair from disk into the index.
    ///
    /// Returns the entry metadata on success. Any inconsistency (missing or
    /// unparseable sidecar, size mismatch) deletes both files and reports a
    /// miss.
    async fn load_pair(&self, file_path: &Path, meta_path: &Path) -> Option<EntryMeta> {
        let blob_stat = tokio::fs::metadata(file_path).await.ok()?;

        let meta: Option<EntryMeta> = match tokio::fs::read(meta_path).await {
            Ok(raw) => serde_json::from_slice(&raw).ok(),
            Err(_) => None,
        };

        let Some(meta) = meta.filter(|m| m.size == blob_stat.len()) else {
            tracing::warn!(
                file = %file_path.display(),
                "Removing cache entry with missing or inconsistent sidecar"
            );
            let _ = tokio::fs::remove_file(file_path).await;
            let _ = tokio::fs::remove_file(meta_path).await;
            return None;
        };

        let hash = file_path.file_name()?.to_string_lossy().to_string();
        self.insert_entry(
            hash,
            CacheEntry::new(file_path.to_path_buf(), meta_path.to_path_buf(), meta.clone()),
        );
        Some(meta)
    }

    /// Insert or refresh an index entry, keeping totals consistent.
    ///
    /// A duplicate insert (concurrent fills of the same hash) refreshes the
    /// metadata in place without disturbing counters or the reference count.
    fn insert_entry(&self, hash: String, entry: CacheEntry) {
        let mut state = self.state.lock();
        if let Some(existing) = state.items.get_mut(&hash) {
            let old_size = existing.meta.size;
            let new_size = entry.meta.size;
            existing.meta = entry.meta;
            existing.file_path = entry.file_path;
            existing.meta_path = entry.meta_path;
            state.total_size = state.total_size - old_size + new_size;
        } else {
            state.total_items += 1;
            state.total_size += entry.meta.size;
            state.items.insert(hash, entry);
        }
    }

    /// Suspend until any in-flight eviction pass finishes.
    ///
    /// Waiters are woken FIFO when the pass completes.
    async fn wait_for_eviction(&self) {
        let rx = {
            let mut state = self.state.lock();
            if state.eviction_running {
                let (tx, rx) = oneshot::channel();
                state.eviction_waiters.push(tx);
                Some(rx)
            } else {
                None
            }
        };
        if let Some(rx) = rx {
            let _ = rx.await;
        }
    }

    /// Look up an entry by hash, acquiring a lease on it.
    ///
    /// An in-memory hit returns immediately. On miss the call waits out any
    /// running eviction pass (so a disk probe never races file deletion) and
    /// then tries the canonical on-disk paths. `None` means neither the
    /// index nor the disk has the entry.
    #[tracing::instrument(skip(self))]
    pub async fn get_by_hash(self: &Arc<Self>, hash: &str) -> Option<EntryLease> {
        if let Some(lease) = self.acquire(hash) {
            return Some(lease);
        }

        self.wait_for_eviction().await;

        let (file_path, meta_path) = self.entry_paths(hash);
        self.load_pair(&file_path, &meta_path).await?;
        self.acquire(hash)
    }

    /// Acquire a lease on an indexed entry, bumping its reference count.
    fn acquire(self: &Arc<Self>, hash: &str) -> Option<EntryLease> {
        let mut state = self.state.lock();
        let entry = state.items.get_mut(hash)?;
        entry.ref_count += 1;
        Some(EntryLease::new(
            self.clone(),
            hash.to_string(),
            entry.meta.clone(),
            entry.file_path.clone(),
        ))
    }

    /// Drop a reference, recording the hit kind if the request completed.
    ///
    /// Get completions run the eviction threshold check: they are the hot
    /// path on which the cache grows.
    pub(crate) fn release(self: &Arc<Self>, hash: &str, hit: Option<HitKind>) {
        {
            let mut state = self.state.lock();
            if let Some(entry) = state.items.get_mut(hash) {
                entry.ref_count = entry.ref_count.saturating_sub(1);
                match hit {
                    Some(HitKind::Head) => entry.head_hits += 1,
                    Some(HitKind::Get) => entry.get_hits += 1,
                    None => {}
                }
            }
        }

        if hit == Some(HitKind::Get) {
            self.spawn_eviction_if_needed();
        }
    }

    /// Populate the cache for a known object record, returning a lease on
    /// the fresh entry.
    ///
    /// Concurrent duplicate fills for one hash are tolerated: content is
    /// immutable, so the second download writes byte-identical data and the
    /// index registers the entry once.
    #[tracing::instrument(skip(self, record), fields(hash = %record.hash, size = record.size))]
    pub async fn fill_from_blob_store(
        self: &Arc<Self>,
        record: &ObjectRecord,
    ) -> CalderaResult<EntryLease> {
        let (file_path, meta_path) = self.entry_paths(&record.hash);

        if let Some(parent) = file_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                CacheError::new(CacheErrorKind::Io(format!("{}: {}", parent.display(), e)))
            })?;
        }

        self.blobs
            .download_to(&record.hash, &file_path)
            .await
            .map_err(|e| CacheError::new(CacheErrorKind::Upstream(e.to_string())))?;

        let meta = self.build_meta(record).await?;
        self.write_sidecar(&meta_path, &meta).await;

        self.insert_entry(
            record.hash.clone(),
            CacheEntry::new(file_path, meta_path, meta),
        );

        tracing::info!(hash = %record.hash, "Filled cache entry from blob store");

        self.acquire(&record.hash).ok_or_else(|| {
            // Evicted between insert and acquire; treat as an upstream race.
            CacheError::new(CacheErrorKind::NotFound(record.hash.clone())).into()
        })
    }

    /// Build sidecar metadata for a record, resolving registered thumbnail
    /// names to child content hashes.
    async fn build_meta(&self, record: &ObjectRecord) -> CalderaResult<EntryMeta> {
        let thumbs = if record.has_thumb_registry() {
            let links = self.metadata.thumb_links(&record.hash).await?;
            Some(
                links
                    .into_iter()
                    .map(|link| (link.name, link.child_hash))
                    .collect(),
            )
        } else {
            None
        };
        Ok(meta_from_record(record, thumbs))
    }

    /// Persist a sidecar. Failures are logged, not fatal: metadata staleness
    /// is tolerable, blob correctness is not.
    async fn write_sidecar(&self, meta_path: &Path, meta: &EntryMeta) {
        let raw = match serde_json::to_vec(meta) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(meta = %meta_path.display(), error = %e, "Failed to serialize sidecar");
                return;
            }
        };
        if let Err(e) = tokio::fs::write(meta_path, raw).await {
            tracing::error!(meta = %meta_path.display(), error = %e, "Failed to write sidecar");
        }
    }

    /// Re-read current metadata for a hash and rewrite only its sidecar,
    /// e.g. after a new thumbnail was linked.
    ///
    /// Returns `false` when the metadata store has no record for the hash.
    #[tracing::instrument(skip(self))]
    pub async fn update_sidecar(&self, hash: &str) -> CalderaResult<bool> {
        let Some(record) = self.metadata.get_by_hash(hash).await? else {
            return Ok(false);
        };

        let meta = self.build_meta(&record).await?;
        let (_, meta_path) = self.entry_paths(hash);
        self.write_sidecar(&meta_path, &meta).await;

        let mut state = self.state.lock();
        if let Some(entry) = state.items.get_mut(hash) {
            let old_size = entry.meta.size;
            entry.meta = meta;
            let new_size = entry.meta.size;
            state.total_size = state.total_size - old_size + new_size;
        }
        Ok(true)
    }

    /// Remove an entry's blob and sidecar and purge it from the index.
    ///
    /// Returns `false` if the hash is not indexed.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, hash: &str) -> CalderaResult<bool> {
        let removed = {
            let mut state = self.state.lock();
            match state.items.remove(hash) {
                Some(entry) => {
                    state.total_items -= 1;
                    state.total_size -= entry.meta.size;
                    Some(entry)
                }
                None => None,
            }
        };

        let Some(entry) = removed else {
            return Ok(false);
        };

        remove_entry_files(&entry).await;
        tracing::info!(hash, "Deleted cache entry");
        Ok(true)
    }

    /// Halve every entry's hit counters.
    ///
    /// Run on a slow periodic tick so stale popularity cannot pin cold
    /// entries forever.
    pub fn decay_counters(&self) {
        let mut state = self.state.lock();
        for entry in state.items.values_mut() {
            entry.head_hits /= 2;
            entry.get_hits /= 2;
        }
        tracing::debug!(items = state.total_items, "Decayed hit counters");
    }

    /// Spawn a background task halving hit counters every `period`.
    ///
    /// The task holds only a weak reference and exits once the service is
    /// dropped.
    pub fn spawn_decay_task(self: &Arc<Self>, period: Duration) -> tokio::task::JoinHandle<()> {
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await; // first tick fires immediately
            loop {
                ticker.tick().await;
                match weak.upgrade() {
                    Some(service) => service.decay_counters(),
                    None => break,
                }
            }
        })
    }

    /// Begin an eviction pass, returning the scoring snapshot, when limits
    /// are exceeded and no pass is already running.
    fn begin_eviction(&self) -> Option<(Vec<EvictionCandidate>, CacheStats)> {
        let mut state = self.state.lock();
        let over = state.total_items > *self.config.max_items()
            || state.total_size > *self.config.max_bytes();
        if state.eviction_running || !over {
            return None;
        }
        state.eviction_running = true;

        let candidates = state
            .items
            .iter()
            .map(|(hash, entry)| EvictionCandidate {
                hash: hash.clone(),
                size: entry.meta.size,
                score: entry.eviction_score(),
                ref_count: entry.ref_count,
            })
            .collect();
        let stats = CacheStats {
            total_items: state.total_items,
            total_size: state.total_size,
        };
        Some((candidates, stats))
    }

    /// Threshold check on the hot path: cheap, synchronous, and the actual
    /// pass runs on its own task so request latency never absorbs the scan.
    pub(crate) fn spawn_eviction_if_needed(self: &Arc<Self>) {
        if let Some((candidates, stats)) = self.begin_eviction() {
            let service = self.clone();
            tokio::spawn(async move {
                service.run_eviction_pass(candidates, stats).await;
            });
        }
    }

    /// Run one eviction pass inline if limits are exceeded.
    ///
    /// Exposed for deterministic tests and external schedulers; the hot path
    /// uses the spawned variant.
    pub async fn evict_now(self: &Arc<Self>) {
        if let Some((candidates, stats)) = self.begin_eviction() {
            self.run_eviction_pass(candidates, stats).await;
        }
    }

    /// Score and delete entries until limits hold or no candidate remains.
    ///
    /// Scoring walks the snapshot so the critical section is only re-entered
    /// per deletion. Entries whose reference count rose since the snapshot
    /// are re-checked and skipped at apply time.
    async fn run_eviction_pass(
        self: &Arc<Self>,
        mut candidates: Vec<EvictionCandidate>,
        before: CacheStats,
    ) {
        let started = Instant::now();

        let mut sim_items = before.total_items;
        let mut sim_size = before.total_size;
        let mut doomed = Vec::new();

        while sim_items > *self.config.max_items() || sim_size > *self.config.max_bytes() {
            let selected = candidates
                .iter()
                .enumerate()
                .filter(|(_, c)| c.ref_count == 0)
                .min_by_key(|(_, c)| c.score)
                .map(|(i, _)| i);

            // In-flight requests hold every remaining entry; limits stay
            // violated until they release.
            let Some(index) = selected else { break };

            let candidate = candidates.swap_remove(index);
            sim_items -= 1;
            sim_size -= candidate.size;
            doomed.push(candidate.hash);
        }

        let mut cleared = 0usize;
        for hash in &doomed {
            match self.evict_one(hash).await {
                Ok(true) => cleared += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(hash, error = %e, "Skipping entry that failed to evict");
                }
            }
        }

        let (after, waiters) = {
            let mut state = self.state.lock();
            state.eviction_running = false;
            let after = CacheStats {
                total_items: state.total_items,
                total_size: state.total_size,
            };
            (after, std::mem::take(&mut state.eviction_waiters))
        };

        for waiter in waiters {
            let _ = waiter.send(());
        }

        tracing::info!(
            cleared,
            duration_ms = started.elapsed().as_millis() as u64,
            before_items = before.total_items,
            before_size = before.total_size,
            after_items = after.total_items,
            after_size = after.total_size,
            "Eviction pass complete"
        );
    }

    /// Delete one entry if it is still idle.
    async fn evict_one(&self, hash: &str) -> CalderaResult<bool> {
        let removed = {
            let mut state = self.state.lock();
            let idle = state.items.get(hash).is_some_and(|e| e.ref_count == 0);
            if !idle {
                return Ok(false);
            }
            match state.items.remove(hash) {
                Some(entry) => {
                    state.total_items -= 1;
                    state.total_size -= entry.meta.size;
                    Some(entry)
                }
                None => None,
            }
        };

        if let Some(entry) = removed {
            remove_entry_files(&entry).await;
            tracing::debug!(hash, "Evicted cache entry");
            return Ok(true);
        }
        Ok(false)
    }
}

/// Sidecar path for a blob path: the same file name with `.json` appended.
fn sidecar_path(file_path: &Path) -> PathBuf {
    let mut name = file_path.file_name().unwrap_or_default().to_os_string();
    name.push(".json");
    file_path.with_file_name(name)
}

/// Remove an entry's files, logging and skipping individual failures.
async fn remove_entry_files(entry: &CacheEntry) {
    for path in [&entry.file_path, &entry.meta_path] {
        if let Err(e) = tokio::fs::remove_file(path).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove cache file");
        }
    }
}
