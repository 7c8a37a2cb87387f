//! Stress tests for the pool and the scheduler

use kala_rs::prelude::*;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn worker_count_or(fallback: usize) -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(fallback)
}

#[test]
#[ignore] // Run with --ignored flag
fn stress_test_many_small_tasks() {
    let pool = ThreadPool::new(worker_count_or(4)).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..10_000)
        .map(|_| {
            let counter = counter.clone();
            pool.submit(move || {
                counter.fetch_add(1, Ordering::Relaxed);
            })
        })
        .collect();

    for handle in handles {
        handle.get().unwrap();
    }

    assert_eq!(counter.load(Ordering::Relaxed), 10_000);
}

#[test]
#[ignore]
fn stress_test_nested_submission() {
    let pool = ThreadPool::new(4).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));

    let outer: Vec<_> = (0..100)
        .map(|_| {
            let handle = pool.handle();
            let counter = counter.clone();
            pool.submit(move || {
                (0..10)
                    .map(|_| {
                        let counter = counter.clone();
                        handle.submit(move || {
                            counter.fetch_add(1, Ordering::Relaxed);
                        })
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for inner in outer {
        for handle in inner.get().unwrap() {
            handle.get().unwrap();
        }
    }

    assert_eq!(counter.load(Ordering::Relaxed), 1000);
}

#[test]
#[ignore]
fn stress_test_high_contention() {
    let pool = ThreadPool::new(8).unwrap();
    let data = Arc::new(Mutex::new(vec![0i32; 100]));

    let handles: Vec<_> = (0..1000)
        .map(|_| {
            let data = data.clone();
            pool.submit(move || {
                let mut guard = data.lock();
                for item in guard.iter_mut() {
                    *item += 1;
                }
            })
        })
        .collect();

    for handle in handles {
        handle.get().unwrap();
    }

    assert!(data.lock().iter().all(|&x| x == 1000));
}

#[test]
#[ignore]
fn stress_test_panic_recovery() {
    let pool = ThreadPool::with_config(
        &PoolConfig::builder()
            .num_threads(4)
            .panic_strategy(PanicStrategy::Isolate)
            .build()
            .unwrap(),
    )
    .unwrap();

    let handles: Vec<_> = (0..1000)
        .map(|i| {
            pool.submit(move || {
                if i % 10 == 0 {
                    panic!("Intentional panic");
                }
                i
            })
        })
        .collect();

    let failed = handles
        .into_iter()
        .map(|h| h.get())
        .filter(|outcome| outcome.is_err())
        .count();

    assert_eq!(failed, 100);

    // Pool should still work after panics
    let nums: Vec<i64> = (0..10_000).collect();
    assert_eq!(accumulate(&pool, &nums).unwrap(), 49_995_000);
    assert_eq!(pool.panic_count(), 100);
}

#[test]
#[ignore]
fn stress_test_repeated_create_drop() {
    for i in 0..50 {
        let pool = ThreadPool::new(4).unwrap();
        let timers = TimerScheduler::new().unwrap();

        for _ in 0..100 {
            drop(pool.submit(|| ()));
            timers
                .set_timer_after(|| {}, Duration::from_millis(50))
                .unwrap();
        }

        assert_eq!(pool.submit(move || i).get().unwrap(), i);
    }
}

#[test]
#[ignore]
fn stress_test_timer_storm() {
    let timers = TimerScheduler::new().unwrap();
    let fired = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    for i in 0..50_000u64 {
        let fired = fired.clone();
        timers
            .set_timer(
                move || {
                    fired.fetch_add(1, Ordering::Relaxed);
                },
                start + Duration::from_micros(i % 5_000),
            )
            .unwrap();
    }

    let deadline = Instant::now() + Duration::from_secs(10);
    while fired.load(Ordering::Relaxed) < 50_000 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }

    assert_eq!(fired.load(Ordering::Relaxed), 50_000);
}
