//! Integration tests for the cache index and store.

mod common;

use caldera_cache::{CacheService, HitKind};
use caldera_core::CacheConfig;
use caldera_storage::{sha256_hex, MetadataStore};
use common::TestWorld;
use std::sync::Arc;

/// Complete `n` HEAD requests against a cached hash to seed its hit counter.
async fn head_hits(world: &TestWorld, hash: &str, n: usize) {
    for _ in 0..n {
        let lease = world.cache.get_by_hash(hash).await.expect("cached entry");
        lease.complete(HitKind::Head);
    }
}

#[tokio::test]
async fn concurrent_fills_register_one_entry() {
    let world = TestWorld::new().await;
    let record = world.seed_image(&vec![7u8; 1024], 800, 600).await;

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let cache = world.cache.clone();
        let record = record.clone();
        tasks.push(tokio::spawn(async move {
            let lease = cache.fill_from_blob_store(&record).await.unwrap();
            assert_eq!(lease.meta().size, 1024);
            assert_eq!(lease.meta().mime, "image/jpeg");
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let stats = world.cache.stats();
    assert_eq!(stats.total_items, 1);
    assert_eq!(stats.total_size, 1024);

    // Exactly one blob and one sidecar on disk, byte-identical to the source.
    let shard = world.root.path().join(&record.hash[..2]);
    let mut names = std::fs::read_dir(&shard)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect::<Vec<_>>();
    names.sort();
    assert_eq!(names, vec![record.hash.clone(), format!("{}.json", record.hash)]);
    assert_eq!(
        std::fs::read(shard.join(&record.hash)).unwrap(),
        vec![7u8; 1024]
    );

    let stats = world.cache.entry_stats(&record.hash).unwrap();
    assert_eq!(stats.ref_count, 0);
}

#[tokio::test]
async fn startup_scan_indexes_existing_entries() {
    let world = TestWorld::new().await;
    let record = world.seed_image(b"persisted", 100, 100).await;
    drop(world.cache.fill_from_blob_store(&record).await.unwrap());

    // A second service over the same root picks the entry up at init.
    let config = CacheConfig::default().with_cache_dir(world.root.path().to_path_buf());
    let restarted = Arc::new(CacheService::new(
        config,
        world.blobs.clone(),
        world.metadata.clone(),
    ));
    restarted.init().await.unwrap();

    let stats = restarted.stats();
    assert_eq!(stats.total_items, 1);
    assert_eq!(stats.total_size, "persisted".len() as u64);

    let lease = restarted.get_by_hash(&record.hash).await.expect("scanned entry");
    assert_eq!(lease.meta().sha256, record.hash);
}

#[tokio::test]
async fn init_is_idempotent() {
    let world = TestWorld::new().await;
    let record = world.seed_image(b"once", 100, 100).await;
    drop(world.cache.fill_from_blob_store(&record).await.unwrap());

    world.cache.init().await.unwrap();
    world.cache.init().await.unwrap();
    assert_eq!(world.cache.stats().total_items, 1);
}

#[tokio::test]
async fn lookup_probes_disk_without_scan() {
    let world = TestWorld::new().await;
    let record = world.seed_image(b"on disk only", 100, 100).await;
    drop(world.cache.fill_from_blob_store(&record).await.unwrap());

    // No init: the canonical-path probe alone must find the pair.
    let config = CacheConfig::default().with_cache_dir(world.root.path().to_path_buf());
    let cold = Arc::new(CacheService::new(
        config,
        world.blobs.clone(),
        world.metadata.clone(),
    ));

    assert!(cold.get_by_hash(&record.hash).await.is_some());
    assert!(cold.get_by_hash(&sha256_hex(b"unknown")).await.is_none());
}

#[tokio::test]
async fn lookup_with_arbitrary_hash_strings_misses_cleanly() {
    // The parser takes any string as a literal hash; lookups for non-hex
    // keys, including ones starting mid-multibyte, must miss rather than
    // panic on path construction.
    let world = TestWorld::new().await;
    assert!(world.cache.get_by_hash("€bogus").await.is_none());
    assert!(world.cache.get_by_hash("日本語").await.is_none());
    assert!(world.cache.get_by_hash("x").await.is_none());
    assert!(world.cache.get_by_hash("").await.is_none());
}

#[tokio::test]
async fn size_mismatch_self_heals_at_init() {
    let world = TestWorld::new().await;

    // Fabricate a blob whose sidecar lies about its size.
    let data = b"0123456789";
    let hash = sha256_hex(data);
    let shard = world.root.path().join(&hash[..2]);
    std::fs::create_dir_all(&shard).unwrap();
    let blob_path = shard.join(&hash);
    let meta_path = shard.join(format!("{}.json", hash));
    std::fs::write(&blob_path, data).unwrap();
    let sidecar = serde_json::json!({
        "type": "image",
        "sha256": hash,
        "mime": "image/jpeg",
        "size": 999,
        "width": 100,
        "height": 100,
        "mtime": "2024-01-01T00:00:00Z",
    });
    std::fs::write(&meta_path, serde_json::to_vec(&sidecar).unwrap()).unwrap();

    let config = CacheConfig::default().with_cache_dir(world.root.path().to_path_buf());
    let service = Arc::new(CacheService::new(
        config,
        world.blobs.clone(),
        world.metadata.clone(),
    ));
    service.init().await.unwrap();

    assert!(!blob_path.exists());
    assert!(!meta_path.exists());
    assert!(service.get_by_hash(&hash).await.is_none());
    assert_eq!(service.stats().total_items, 0);
}

#[tokio::test]
async fn orphan_blob_without_sidecar_is_removed() {
    let world = TestWorld::new().await;

    let data = b"orphan";
    let hash = sha256_hex(data);
    let shard = world.root.path().join(&hash[..2]);
    std::fs::create_dir_all(&shard).unwrap();
    let blob_path = shard.join(&hash);
    std::fs::write(&blob_path, data).unwrap();

    let config = CacheConfig::default().with_cache_dir(world.root.path().to_path_buf());
    let service = Arc::new(CacheService::new(
        config,
        world.blobs.clone(),
        world.metadata.clone(),
    ));
    service.init().await.unwrap();

    assert!(!blob_path.exists());
    assert_eq!(service.stats().total_items, 0);
}

#[tokio::test]
async fn leased_entry_survives_eviction_pressure() {
    let world = TestWorld::with_limits(1, 2048 * 1024 * 1024).await;

    let held_record = world.seed_image(b"held entry", 100, 100).await;
    let held = world
        .cache
        .fill_from_blob_store(&held_record)
        .await
        .unwrap();

    for (i, data) in [b"filler one".as_slice(), b"filler two"]
        .into_iter()
        .enumerate()
    {
        let record = world.seed_image(data, 100, 100 + i as u32).await;
        drop(world.cache.fill_from_blob_store(&record).await.unwrap());
    }
    assert_eq!(world.cache.stats().total_items, 3);

    world.cache.evict_now().await;

    // The held entry is never a candidate; the idle fillers cover the limit.
    assert_eq!(world.cache.stats().total_items, 1);
    assert!(world.cache.entry_stats(&held_record.hash).is_some());
    assert!(held.file_path().exists());

    drop(held);
    assert_eq!(
        world
            .cache
            .entry_stats(&held_record.hash)
            .unwrap()
            .ref_count,
        0
    );
}

#[tokio::test]
async fn eviction_stalls_when_every_entry_is_leased() {
    let world = TestWorld::with_limits(1, 2048 * 1024 * 1024).await;

    let record_a = world.seed_image(b"leased a", 100, 100).await;
    let record_b = world.seed_image(b"leased b", 100, 100).await;
    let _lease_a = world.cache.fill_from_blob_store(&record_a).await.unwrap();
    let _lease_b = world.cache.fill_from_blob_store(&record_b).await.unwrap();

    world.cache.evict_now().await;

    // Limits stay violated until the in-flight requests release their refs.
    assert_eq!(world.cache.stats().total_items, 2);
}

#[tokio::test]
async fn eviction_removes_minimum_score_first() {
    // One eviction suffices: the low-score large entry must be the one to go.
    let world = TestWorld::with_limits(10, 104).await;

    let rare_large = world.seed_image(&vec![1u8; 100], 100, 100).await;
    let hot_small = world.seed_image(&vec![2u8; 5], 100, 100).await;
    drop(world.cache.fill_from_blob_store(&rare_large).await.unwrap());
    drop(world.cache.fill_from_blob_store(&hot_small).await.unwrap());

    head_hits(&world, &rare_large.hash, 1).await; // score 1 * 100 = 100
    head_hits(&world, &hot_small.hash, 100).await; // score 100 * 5 = 500

    world.cache.evict_now().await;

    assert!(world.cache.entry_stats(&rare_large.hash).is_none());
    assert!(world.cache.entry_stats(&hot_small.hash).is_some());
    assert_eq!(world.cache.stats().total_size, 5);
}

#[tokio::test]
async fn eviction_keeps_highest_value_entry_under_pressure() {
    let world = TestWorld::with_limits(10, 50).await;

    let small = world.seed_image(&vec![1u8; 10], 100, 100).await;
    let large = world.seed_image(&vec![2u8; 100], 100, 100).await;
    let hot = world.seed_image(&vec![3u8; 5], 100, 100).await;
    for record in [&small, &large, &hot] {
        drop(world.cache.fill_from_blob_store(record).await.unwrap());
    }

    head_hits(&world, &small.hash, 1).await; // score 10
    head_hits(&world, &large.hash, 1).await; // score 100
    head_hits(&world, &hot.hash, 100).await; // score 500

    world.cache.evict_now().await;

    // 115 bytes over a 50-byte budget: the two low-score entries go, the
    // frequently requested one stays untouched.
    assert!(world.cache.entry_stats(&hot.hash).is_some());
    assert!(world.cache.entry_stats(&large.hash).is_none());
    let stats = world.cache.stats();
    assert!(stats.total_size <= 50);
}

#[tokio::test]
async fn decay_halves_hit_counters() {
    let world = TestWorld::new().await;
    let record = world.seed_image(b"decaying", 100, 100).await;
    drop(world.cache.fill_from_blob_store(&record).await.unwrap());

    for _ in 0..5 {
        let lease = world.cache.get_by_hash(&record.hash).await.unwrap();
        lease.complete(HitKind::Get);
    }
    head_hits(&world, &record.hash, 3).await;

    let stats = world.cache.entry_stats(&record.hash).unwrap();
    assert_eq!((stats.get_hits, stats.head_hits), (5, 3));

    world.cache.decay_counters();
    let stats = world.cache.entry_stats(&record.hash).unwrap();
    assert_eq!((stats.get_hits, stats.head_hits), (2, 1));

    world.cache.decay_counters();
    world.cache.decay_counters();
    let stats = world.cache.entry_stats(&record.hash).unwrap();
    assert_eq!((stats.get_hits, stats.head_hits), (0, 0));
}

#[tokio::test]
async fn delete_removes_files_and_totals() {
    let world = TestWorld::new().await;
    let record = world.seed_image(b"deletable", 100, 100).await;
    let lease = world.cache.fill_from_blob_store(&record).await.unwrap();
    let blob_path = lease.file_path().to_path_buf();
    drop(lease);

    assert!(world.cache.delete(&record.hash).await.unwrap());
    assert!(!blob_path.exists());
    assert_eq!(world.cache.stats().total_items, 0);
    assert_eq!(world.cache.stats().total_size, 0);

    assert!(!world.cache.delete(&record.hash).await.unwrap());
}

#[tokio::test]
async fn update_sidecar_picks_up_new_thumb_links() {
    let world = TestWorld::new().await;
    let record = world.seed_image(b"original with thumbs", 1000, 800).await;
    drop(world.cache.fill_from_blob_store(&record).await.unwrap());

    world
        .metadata
        .register_thumb_link(&record.hash, "c0ffee", "128")
        .await
        .unwrap();
    assert!(world.cache.update_sidecar(&record.hash).await.unwrap());

    let lease = world.cache.get_by_hash(&record.hash).await.unwrap();
    let thumbs = lease.meta().thumbs.clone().unwrap();
    assert_eq!(thumbs.get("128").map(String::as_str), Some("c0ffee"));
    drop(lease);

    // The sidecar on disk carries the link too.
    let shard = world.root.path().join(&record.hash[..2]);
    let raw = std::fs::read_to_string(shard.join(format!("{}.json", record.hash))).unwrap();
    assert!(raw.contains("c0ffee"));
}

#[tokio::test]
async fn update_sidecar_returns_false_for_unknown_hash() {
    let world = TestWorld::new().await;
    assert!(!world.cache.update_sidecar("deadbeef").await.unwrap());
}
