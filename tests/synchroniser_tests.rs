//! Integration Tests for Synchronisers
//!
//! Runs the same contention harness against every synchroniser: many tasks
//! race for the same identifiers and exactly one of them may win each.

use std::sync::Arc;
use std::time::Duration;

use sync_cache::sync::{LeaseBackend, MemoryLeaseBackend};
use sync_cache::{Error, LocalSynchroniser, NetworkedSynchroniser, Synchroniser, WriteLock};
use tokio::task::JoinSet;

const LOCK_IDS: [&str; 3] = ["lock-alpha", "lock-beta", "lock-gamma"];
const TRIES_PER_SYNC: usize = 8;

// == Harness ==

/// Races `TRIES_PER_SYNC` acquisitions per synchroniser for each id, then
/// checks exactly one won and releases it.
async fn run_contention(syncs: Vec<Arc<dyn Synchroniser>>) {
    for lock_id in LOCK_IDS {
        let mut set = JoinSet::new();
        for sync in &syncs {
            for _ in 0..TRIES_PER_SYNC {
                let sync = Arc::clone(sync);
                set.spawn(async move { sync.get_write_lock(lock_id).await });
            }
        }

        let mut held: Vec<Box<dyn WriteLock>> = Vec::new();
        let mut failures = 0;
        while let Some(joined) = set.join_next().await {
            match joined.unwrap() {
                Ok(lock) => held.push(lock),
                Err(Error::LockAlreadyHeld(id)) => {
                    assert_eq!(id, lock_id);
                    failures += 1;
                }
                Err(e) => panic!("unexpected error: {}", e),
            }
        }

        assert_eq!(held.len(), 1, "exactly one winner for {}", lock_id);
        assert_eq!(failures, TRIES_PER_SYNC * syncs.len() - 1);

        let lock = held.pop().unwrap();
        assert_eq!(lock.lock_id(), lock_id);
        assert!(!lock.is_unlocked());

        let waiter = tokio::spawn(lock.wait_unlocked().wait());
        lock.unlock().await.unwrap();
        assert!(lock.is_unlocked());
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter completes after unlock")
            .unwrap();

        // Released ids can be taken again
        let again = syncs[0].get_write_lock(lock_id).await.unwrap();
        again.unlock().await.unwrap();
    }
}

fn networked_syncs(backend: &MemoryLeaseBackend, count: usize) -> Vec<Arc<dyn Synchroniser>> {
    (0..count)
        .map(|_| {
            let backend: Arc<dyn LeaseBackend> = Arc::new(backend.clone());
            Arc::new(NetworkedSynchroniser::with_backend(
                backend,
                Duration::from_secs(6),
            )) as Arc<dyn Synchroniser>
        })
        .collect()
}

// == Contention Tests ==

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_local_contention() {
    let sync = LocalSynchroniser::new();
    let syncs: Vec<Arc<dyn Synchroniser>> = (0..3)
        .map(|_| Arc::new(sync.clone()) as Arc<dyn Synchroniser>)
        .collect();

    run_contention(syncs).await;
    assert_eq!(sync.held_count().await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_networked_contention() {
    let backend = MemoryLeaseBackend::new();
    run_contention(networked_syncs(&backend, 3)).await;

    for lock_id in LOCK_IDS {
        assert_eq!(
            backend.holder(&sync_cache::sync::lease_key(lock_id)).await,
            None
        );
    }
}

// == Release Tests ==

#[tokio::test]
async fn test_unlock_is_idempotent() {
    let local: Arc<dyn Synchroniser> = Arc::new(LocalSynchroniser::new());
    let backend = MemoryLeaseBackend::new();
    let networked = networked_syncs(&backend, 1).remove(0);

    for sync in [local, networked] {
        let lock = sync.get_write_lock("idempotent").await.unwrap();
        lock.unlock().await.unwrap();
        lock.unlock().await.unwrap();
        assert!(lock.is_unlocked());
        lock.wait_unlocked().await;
    }
}

#[tokio::test]
async fn test_release_completes_before_unlock_returns() {
    let backend = MemoryLeaseBackend::new();
    let syncs = networked_syncs(&backend, 2);

    let lock = syncs[0].get_write_lock("handover").await.unwrap();
    assert!(matches!(
        syncs[1].get_write_lock("handover").await,
        Err(Error::LockAlreadyHeld(_))
    ));

    lock.unlock().await.unwrap();

    // No sleep needed: the lease is gone once unlock returns
    let next = syncs[1].get_write_lock("handover").await.unwrap();
    next.unlock().await.unwrap();
}

#[tokio::test]
async fn test_blank_ids_rejected_everywhere() {
    let local: Arc<dyn Synchroniser> = Arc::new(LocalSynchroniser::new());
    let backend = MemoryLeaseBackend::new();
    let networked = networked_syncs(&backend, 1).remove(0);

    for sync in [local, networked] {
        assert!(matches!(
            sync.get_write_lock("").await,
            Err(Error::InvalidLockId)
        ));
        assert!(matches!(
            sync.get_write_lock("   ").await,
            Err(Error::InvalidLockId)
        ));
    }
    assert_eq!(backend.operations(), 0);
}

// == Redis Tests ==
// Require a reachable server: REDIS_DSN=127.0.0.1:6379 cargo test -- --ignored

fn redis_options() -> Vec<sync_cache::sync::SynchroniserOption> {
    let mut config = sync_cache::Config::from_env();
    config.lock_timeout = 2;
    config.synchroniser_options()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn test_redis_contention() {
    let mut syncs: Vec<Arc<dyn Synchroniser>> = Vec::new();
    for _ in 0..3 {
        let sync = NetworkedSynchroniser::connect(redis_options()).await.unwrap();
        syncs.push(Arc::new(sync));
    }
    run_contention(syncs).await;
}

#[tokio::test]
#[ignore]
async fn test_redis_lease_outlives_ttl_while_held() {
    let a = NetworkedSynchroniser::connect(redis_options()).await.unwrap();
    let b = NetworkedSynchroniser::connect(redis_options()).await.unwrap();

    let lock = a.acquire("redis-renewal").await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(matches!(
        b.acquire("redis-renewal").await,
        Err(Error::LockAlreadyHeld(_))
    ));

    lock.unlock().await.unwrap();
    b.acquire("redis-renewal").await.unwrap().unlock().await.unwrap();
}
