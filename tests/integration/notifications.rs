//! Integration tests for the toast notification lifecycle.
//!
//! Verifies countdown expiry, idempotent dismissal, exactly-once undo, and
//! timer cleanup. Durations are shortened from the 4000/6000 ms production
//! defaults to keep the suite fast; the tick interval is 20 ms.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chirp::notify::{EnqueueOptions, NotificationQueue};
use chirp::timer::TimerRegistry;
use chirp_core::notification::{NotificationId, NotificationKind};

fn setup() -> (NotificationQueue, Arc<TimerRegistry>) {
    let registry = TimerRegistry::new();
    let queue = NotificationQueue::new(Arc::clone(&registry), Duration::from_millis(20));
    (queue, registry)
}

#[tokio::test]
async fn saved_scenario_toast_expires_and_disappears() {
    let (queue, _registry) = setup();

    queue.enqueue(
        NotificationKind::Success,
        "Saved!",
        EnqueueOptions::with_duration_ms(150),
    );
    assert_eq!(queue.list().len(), 1);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(queue.list().is_empty());
}

#[tokio::test]
async fn toast_survives_until_its_deadline() {
    let (queue, _registry) = setup();

    queue.enqueue(
        NotificationKind::Info,
        "still here",
        EnqueueOptions::with_duration_ms(400),
    );

    tokio::time::sleep(Duration::from_millis(150)).await;
    let toasts = queue.list();
    assert_eq!(toasts.len(), 1, "toast removed before its duration elapsed");
    assert!(toasts[0].remaining_percent > 0.0);
    assert!(toasts[0].remaining_percent < 100.0);
}

#[tokio::test]
async fn countdown_reaches_zero_only_at_expiry() {
    let (queue, _registry) = setup();

    queue.enqueue(
        NotificationKind::Info,
        "draining",
        EnqueueOptions::with_duration_ms(200),
    );

    let mut observed = Vec::new();
    for _ in 0..10 {
        tokio::time::sleep(Duration::from_millis(40)).await;
        match queue.list().first() {
            Some(toast) => observed.push(toast.remaining_percent),
            None => break,
        }
    }

    // Strictly non-increasing while alive, and it was removed by the end.
    for pair in observed.windows(2) {
        assert!(pair[1] <= pair[0]);
    }
    assert!(queue.list().is_empty());
}

#[tokio::test]
async fn dismiss_is_idempotent() {
    let (queue, registry) = setup();
    let id = queue.enqueue(
        NotificationKind::Warning,
        "going away",
        EnqueueOptions::with_duration_ms(60_000),
    );

    queue.dismiss(&id);
    queue.dismiss(&id);
    queue.dismiss(&NotificationId::new());

    assert!(queue.list().is_empty());
    assert_eq!(registry.active_count(), 0, "countdown timer leaked");
}

#[tokio::test]
async fn undo_fires_exactly_once_under_repeated_calls() {
    let (queue, _registry) = setup();
    let calls = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&calls);

    let id = queue.enqueue(
        NotificationKind::Info,
        "Item deleted",
        EnqueueOptions::with_undo(Box::new(move || {
            sink.fetch_add(1, Ordering::SeqCst);
        })),
    );

    queue.undo(&id);
    queue.undo(&id);
    queue.undo(&id);

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(queue.list().is_empty());
}

#[tokio::test]
async fn undo_after_expiry_is_a_noop() {
    let (queue, _registry) = setup();
    let calls = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&calls);

    let mut options = EnqueueOptions::with_duration_ms(80);
    options.on_undo = Some(Box::new(move || {
        sink.fetch_add(1, Ordering::SeqCst);
    }));
    let id = queue.enqueue(NotificationKind::Info, "ephemeral", options);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(queue.list().is_empty());

    queue.undo(&id);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn persistent_toast_outlives_timed_neighbors() {
    let (queue, _registry) = setup();

    let sticky = queue.enqueue(
        NotificationKind::Error,
        "needs attention",
        EnqueueOptions::with_duration_ms(0),
    );
    queue.enqueue(
        NotificationKind::Info,
        "fleeting",
        EnqueueOptions::with_duration_ms(80),
    );

    tokio::time::sleep(Duration::from_millis(250)).await;
    let toasts = queue.list();
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].id, sticky);
    assert!((toasts[0].remaining_percent - 100.0).abs() < f32::EPSILON);

    queue.dismiss(&sticky);
    assert!(queue.list().is_empty());
}

#[tokio::test]
async fn convenience_constructors_use_kind_defaults() {
    let (queue, _registry) = setup();

    queue.info("i");
    queue.success("s");
    queue.warning("w");
    queue.error("e");

    let toasts = queue.list();
    assert_eq!(toasts.len(), 4);
    assert_eq!(toasts[0].kind, NotificationKind::Info);
    assert_eq!(toasts[0].duration_ms, Some(4000));
    assert_eq!(toasts[3].kind, NotificationKind::Error);
    assert_eq!(toasts[3].duration_ms, Some(6000));
    assert_eq!(toasts[3].title, "Error");
}

#[tokio::test]
async fn queue_preserves_insertion_order_under_churn() {
    let (queue, _registry) = setup();

    let a = queue.enqueue(
        NotificationKind::Info,
        "a",
        EnqueueOptions::with_duration_ms(60_000),
    );
    let b = queue.enqueue(
        NotificationKind::Info,
        "b",
        EnqueueOptions::with_duration_ms(60_000),
    );
    let c = queue.enqueue(
        NotificationKind::Info,
        "c",
        EnqueueOptions::with_duration_ms(60_000),
    );

    queue.dismiss(&b);
    let d = queue.enqueue(
        NotificationKind::Info,
        "d",
        EnqueueOptions::with_duration_ms(60_000),
    );

    let ids: Vec<NotificationId> = queue.list().into_iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![a, c, d]);
}

#[tokio::test]
async fn expired_toasts_release_their_timers() {
    let (queue, registry) = setup();

    for i in 0..3 {
        queue.enqueue(
            NotificationKind::Info,
            format!("toast {i}"),
            EnqueueOptions::with_duration_ms(80),
        );
    }
    assert_eq!(registry.active_count(), 3);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(queue.list().is_empty());
    assert_eq!(registry.active_count(), 0);
}
