use std::sync::Arc;
use std::thread;
use std::time::Duration;

use attempt_store::AttemptStore;

#[tokio::test(start_paused = true)]
async fn entries_expire_after_ttl() {
    let store = AttemptStore::new(16, Duration::from_secs(1)).unwrap();
    store.increment("10.0.0.1");

    tokio::time::advance(Duration::from_millis(999)).await;
    assert_eq!(store.get("10.0.0.1"), 1);

    tokio::time::advance(Duration::from_millis(1)).await;
    assert_eq!(store.get("10.0.0.1"), 0);
    // the read dropped the expired entry
    assert!(store.is_empty());
}

#[tokio::test(start_paused = true)]
async fn write_restarts_expiry_window() {
    let store = AttemptStore::new(16, Duration::from_secs(10)).unwrap();
    store.increment("k");
    tokio::time::advance(Duration::from_secs(8)).await;
    store.increment("k");
    tokio::time::advance(Duration::from_secs(8)).await;

    assert_eq!(store.get("k"), 2);
}

#[tokio::test(start_paused = true)]
async fn increment_after_expiry_starts_over() {
    let store = AttemptStore::new(16, Duration::from_secs(5)).unwrap();
    store.set("k", 4);
    tokio::time::advance(Duration::from_secs(6)).await;

    assert_eq!(store.increment("k"), 1);
}

#[tokio::test(start_paused = true)]
async fn full_store_drops_expired_entries_before_live_ones() {
    let store = AttemptStore::new(2, Duration::from_secs(5)).unwrap();
    store.set("old", 1);
    tokio::time::advance(Duration::from_secs(3)).await;
    store.set("fresh", 1);
    // "old" is the LRU entry; once expired it goes first
    tokio::time::advance(Duration::from_secs(3)).await;
    store.set("new", 1);

    assert_eq!(store.get("fresh"), 1);
    assert_eq!(store.get("new"), 1);
    assert_eq!(store.get("old"), 0);
}

#[tokio::test(start_paused = true)]
async fn full_store_drops_every_expired_tail_entry() {
    let store = AttemptStore::new(3, Duration::from_secs(5)).unwrap();
    store.set("x", 1);
    store.set("y", 1);
    store.set("z", 1);
    tokio::time::advance(Duration::from_secs(6)).await;
    store.set("n", 1);

    assert_eq!(store.len(), 1);
    assert_eq!(store.get("n"), 1);
}

#[tokio::test(start_paused = true)]
async fn full_store_evicts_least_recently_used_live_key() {
    let store = AttemptStore::new(2, Duration::from_secs(5)).unwrap();
    store.set("a", 1);
    tokio::time::advance(Duration::from_secs(3)).await;
    store.set("b", 1);
    tokio::time::advance(Duration::from_secs(1)).await;
    // reading "a" makes "b" the LRU entry while "a" is still live
    assert_eq!(store.get("a"), 1);
    tokio::time::advance(Duration::from_secs(2)).await;

    // "a" has expired but sits above "b", which is live and least recently used
    store.set("c", 1);
    assert_eq!(store.len(), 2);
    assert_eq!(store.get("b"), 0);
    assert_eq!(store.get("c"), 1);
    assert_eq!(store.get("a"), 0);
    assert_eq!(store.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn inserts_into_a_full_store_keep_it_at_capacity() {
    let store = AttemptStore::new(100, Duration::from_secs(60)).unwrap();
    for i in 0..1000 {
        store.increment(&format!("10.0.{}.{}", i / 256, i % 256));
    }
    assert_eq!(store.len(), 100);
    assert_eq!(store.get("10.0.0.0"), 0);
    assert_eq!(store.get("10.0.3.231"), 1);
}

#[tokio::test(start_paused = true)]
async fn purge_reports_removed_entries() {
    let store = AttemptStore::new(16, Duration::from_secs(2)).unwrap();
    store.set("a", 1);
    store.set("b", 1);
    tokio::time::advance(Duration::from_secs(1)).await;
    store.set("c", 1);
    tokio::time::advance(Duration::from_secs(1)).await;

    assert_eq!(store.purge_expired(), 2);
    assert_eq!(store.len(), 1);
    assert_eq!(store.get("c"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_increments_are_not_lost() {
    let store = Arc::new(AttemptStore::new(64, Duration::from_secs(60)).unwrap());
    let mut handles = Vec::with_capacity(1000);
    for _ in 0..1000 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.increment("203.0.113.9");
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(store.get("203.0.113.9"), 1000);
}

#[test]
fn concurrent_threads_on_distinct_keys() {
    let store = Arc::new(AttemptStore::new(1024, Duration::from_secs(60)).unwrap());
    let workers: Vec<_> = (0..16)
        .map(|worker| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..100 {
                    store.increment(&format!("client-{worker}"));
                    store.increment("shared");
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(store.get("shared"), 1600);
    for worker in 0..16 {
        assert_eq!(store.get(&format!("client-{worker}")), 100);
    }
}
