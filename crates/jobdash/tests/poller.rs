use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use jobdash::client::{GatewayClient, Poller};
use jobdash::console::{connectivity, Connectivity};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio_util::sync::CancellationToken;

fn no_jitter(interval_ms: u64, max_ms: u64) -> Poller {
    Poller {
        interval: Duration::from_millis(interval_ms),
        max_backoff: Duration::from_millis(max_ms),
        jitter_pct: 0.0,
    }
}

#[test]
fn delay_doubles_per_failure_and_caps() {
    let p = no_jitter(1_000, 30_000);
    let mut rng = StdRng::seed_from_u64(7);

    assert_eq!(p.next_delay(0, &mut rng), Duration::from_millis(1_000));
    assert_eq!(p.next_delay(1, &mut rng), Duration::from_millis(2_000));
    assert_eq!(p.next_delay(2, &mut rng), Duration::from_millis(4_000));
    assert_eq!(p.next_delay(4, &mut rng), Duration::from_millis(16_000));
    assert_eq!(p.next_delay(5, &mut rng), Duration::from_millis(30_000));
    assert_eq!(p.next_delay(200, &mut rng), Duration::from_millis(30_000));
}

#[test]
fn jitter_stays_within_bounds() {
    let p = Poller {
        interval: Duration::from_millis(1_000),
        max_backoff: Duration::from_millis(60_000),
        jitter_pct: 0.20,
    };
    let mut rng = StdRng::seed_from_u64(42);

    for _ in 0..500 {
        let d = p.next_delay(0, &mut rng).as_millis();
        assert!((800..=1_200).contains(&d), "delay {d}ms out of range");
    }
    for _ in 0..500 {
        let d = p.next_delay(10, &mut rng).as_millis();
        assert!(d <= 60_000, "delay {d}ms above cap");
    }
}

#[test]
fn cap_below_interval_uses_the_interval() {
    let p = no_jitter(5_000, 1_000);
    let mut rng = StdRng::seed_from_u64(1);
    assert_eq!(p.next_delay(3, &mut rng), Duration::from_millis(5_000));
}

#[tokio::test]
async fn run_ticks_immediately_and_stops_on_cancel() {
    let ticks = Arc::new(AtomicU32::new(0));
    let cancel = CancellationToken::new();
    let poller = no_jitter(10, 10);

    let handle = {
        let ticks = ticks.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            poller
                .run(cancel, || {
                    let ticks = ticks.clone();
                    async move {
                        ticks.fetch_add(1, Ordering::SeqCst);
                        true
                    }
                })
                .await;
        })
    };

    tokio::time::sleep(Duration::from_millis(80)).await;
    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("poller did not stop after cancel")
        .unwrap();

    let n = ticks.load(Ordering::SeqCst);
    assert!(n >= 2, "expected repeated ticks, got {n}");

    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(ticks.load(Ordering::SeqCst), n, "ticked after cancel");
}

#[tokio::test]
async fn already_cancelled_poller_never_ticks() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let ticks = AtomicU32::new(0);

    Poller::every(Duration::from_millis(5))
        .run(cancel, || {
            ticks.fetch_add(1, Ordering::SeqCst);
            async { true }
        })
        .await;

    assert_eq!(ticks.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn monitor_marks_unreachable_gateway_offline() {
    // Nothing listens on port 1.
    let client = GatewayClient::new("http://127.0.0.1:1/graphql").unwrap();
    let state = Connectivity::default();
    assert!(state.snapshot().online);

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(connectivity::monitor(
        client,
        state.clone(),
        no_jitter(20, 20),
        cancel.clone(),
    ));

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while state.snapshot().online && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cancel.cancel();
    handle.await.unwrap();

    let snap = state.snapshot();
    assert!(!snap.online);
    assert!(snap.last_error.is_some());
    assert!(snap.checked_at.is_some());

    state.report_ok();
    let snap = state.snapshot();
    assert!(snap.online);
    assert!(snap.last_error.is_none());
}
