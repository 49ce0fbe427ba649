use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::future::join_all;

use backend::cache::{Recoverable, ViewCache};

#[derive(Debug, PartialEq)]
enum TestError {
    Retryable,
    Fatal,
}

impl Recoverable for TestError {
    fn recoverable(&self) -> bool {
        matches!(self, TestError::Retryable)
    }
}

fn counting_refresh(
    counter: &Arc<AtomicUsize>,
) -> impl Future<Output = Result<u64, TestError>> + use<> {
    let counter = Arc::clone(counter);
    async move {
        // Long enough that concurrent callers overlap the refresh.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(n as u64)
    }
}

#[tokio::test]
async fn cold_cache_with_concurrent_callers_computes_once() {
    let cache = ViewCache::<&str, u64>::new();
    let computations = Arc::new(AtomicUsize::new(0));

    let calls = (0..8).map(|_| {
        cache.get_or_refresh(&"view", Duration::from_secs(60), false, || {
            counting_refresh(&computations)
        })
    });

    let outcomes = join_all(calls).await;

    assert_eq!(computations.load(Ordering::SeqCst), 1);
    for outcome in outcomes {
        let outcome = outcome.expect("refresh succeeded");
        assert_eq!(outcome.value, 1); // every caller got the one result
        assert!(!outcome.stale);
    }
}

#[tokio::test]
async fn fresh_entry_is_served_without_recompute() {
    let cache = ViewCache::<&str, u64>::new();
    let computations = Arc::new(AtomicUsize::new(0));

    for _ in 0..3 {
        cache
            .get_or_refresh(&"view", Duration::from_secs(60), false, || {
                counting_refresh(&computations)
            })
            .await
            .expect("refresh succeeded");
    }

    assert_eq!(computations.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn expired_entry_recomputes() {
    let cache = ViewCache::<&str, u64>::new();
    let computations = Arc::new(AtomicUsize::new(0));

    cache
        .get_or_refresh(&"view", Duration::from_millis(10), false, || {
            counting_refresh(&computations)
        })
        .await
        .expect("refresh succeeded");

    tokio::time::sleep(Duration::from_millis(30)).await;

    let outcome = cache
        .get_or_refresh(&"view", Duration::from_millis(10), false, || {
            counting_refresh(&computations)
        })
        .await
        .expect("refresh succeeded");

    assert_eq!(computations.load(Ordering::SeqCst), 2);
    assert_eq!(outcome.value, 2);
}

#[tokio::test]
async fn force_refresh_bypasses_ttl() {
    let cache = ViewCache::<&str, u64>::new();
    let computations = Arc::new(AtomicUsize::new(0));

    for _ in 0..2 {
        cache
            .get_or_refresh(&"view", Duration::from_secs(60), true, || {
                counting_refresh(&computations)
            })
            .await
            .expect("refresh succeeded");
    }

    assert_eq!(computations.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn invalidate_forces_recompute() {
    let cache = ViewCache::<&str, u64>::new();
    let computations = Arc::new(AtomicUsize::new(0));

    cache
        .get_or_refresh(&"view", Duration::from_secs(60), false, || {
            counting_refresh(&computations)
        })
        .await
        .expect("refresh succeeded");

    cache.invalidate(&"view");

    cache
        .get_or_refresh(&"view", Duration::from_secs(60), false, || {
            counting_refresh(&computations)
        })
        .await
        .expect("refresh succeeded");

    assert_eq!(computations.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn keys_are_cached_independently() {
    let cache = ViewCache::<&str, u64>::new();
    let computations = Arc::new(AtomicUsize::new(0));

    for key in ["a", "b", "a"] {
        cache
            .get_or_refresh(&key, Duration::from_secs(60), false, || {
                counting_refresh(&computations)
            })
            .await
            .expect("refresh succeeded");
    }

    assert_eq!(computations.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn retryable_failure_with_stale_entry_serves_stale() {
    let cache = ViewCache::<&str, u64>::new();

    cache
        .get_or_refresh(&"view", Duration::from_millis(10), false, || async {
            Ok::<_, TestError>(7)
        })
        .await
        .expect("seed succeeded");

    tokio::time::sleep(Duration::from_millis(30)).await;

    let outcome = cache
        .get_or_refresh(&"view", Duration::from_millis(10), false, || async {
            Err::<u64, _>(TestError::Retryable)
        })
        .await
        .expect("stale entry served");

    assert_eq!(outcome.value, 7);
    assert!(outcome.stale);
}

#[tokio::test]
async fn retryable_failure_with_cold_cache_propagates() {
    let cache = ViewCache::<&str, u64>::new();

    let err = cache
        .get_or_refresh(&"view", Duration::from_secs(60), false, || async {
            Err::<u64, _>(TestError::Retryable)
        })
        .await
        .unwrap_err();

    assert_eq!(err, TestError::Retryable);
}

#[tokio::test]
async fn fatal_failure_never_serves_stale() {
    let cache = ViewCache::<&str, u64>::new();

    cache
        .get_or_refresh(&"view", Duration::from_millis(10), false, || async {
            Ok::<_, TestError>(7)
        })
        .await
        .expect("seed succeeded");

    tokio::time::sleep(Duration::from_millis(30)).await;

    let err = cache
        .get_or_refresh(&"view", Duration::from_millis(10), false, || async {
            Err::<u64, _>(TestError::Fatal)
        })
        .await
        .unwrap_err();

    assert_eq!(err, TestError::Fatal);
}

#[tokio::test]
async fn failed_refresh_leaves_entry_usable_for_next_attempt() {
    let cache = ViewCache::<&str, u64>::new();

    cache
        .get_or_refresh(&"view", Duration::from_millis(10), false, || async {
            Ok::<_, TestError>(1)
        })
        .await
        .expect("seed succeeded");

    tokio::time::sleep(Duration::from_millis(30)).await;

    // One failed refresh serves stale...
    let stale = cache
        .get_or_refresh(&"view", Duration::from_millis(10), false, || async {
            Err::<u64, _>(TestError::Retryable)
        })
        .await
        .expect("stale entry served");
    assert!(stale.stale);

    // ...and a later successful refresh replaces it.
    let recovered = cache
        .get_or_refresh(&"view", Duration::from_millis(10), false, || async {
            Ok::<_, TestError>(2)
        })
        .await
        .expect("refresh succeeded");
    assert_eq!(recovered.value, 2);
    assert!(!recovered.stale);
}
