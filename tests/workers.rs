//! Periodic workers under paused time.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use common::{session, FakeServer, SettableTimezone};
use mm_client::{Presence, UserId, UserStatus};
use mmterm::events::{event_queue, AppEvent};
use mmterm::queue::request_queue;
use mmterm::timezone::TimezoneSource;
use mmterm::tracked::TrackedUsers;
use mmterm::workers::presence::PresenceRefresher;
use mmterm::workers::timezone::TimezoneMonitor;
use mmterm::workers::typing::TypingRefresher;

#[tokio::test(start_paused = true)]
async fn presence_is_polled_only_for_tracked_users() {
    let server = Arc::new(FakeServer {
        statuses: vec![UserStatus {
            user_id: UserId::from("u2"),
            status: Presence::Away,
        }],
        ..FakeServer::default()
    });
    let tracked = TrackedUsers::new();
    let (events, mut rx) = event_queue();
    tokio::spawn(
        PresenceRefresher::new(
            server.clone(),
            session("t"),
            tracked.clone(),
            events,
            Duration::from_secs(30),
        )
        .run(),
    );

    tokio::time::sleep(Duration::from_secs(65)).await;
    assert_eq!(
        server.status_calls.load(Ordering::SeqCst),
        0,
        "no request while nothing is tracked"
    );
    assert!(rx.try_recv().is_none());

    tracked.insert(UserId::from("u2"));
    match rx.recv().await {
        Some(AppEvent::PresenceUpdated(statuses)) => {
            assert_eq!(statuses.len(), 1);
            assert_eq!(statuses[0].status, Presence::Away);
        }
        other => panic!("expected presence update, got {other:?}"),
    }
    assert_eq!(server.status_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn typing_refresher_queues_expiry_with_cutoff() {
    let (requests, mut jobs) = request_queue();
    tokio::spawn(
        TypingRefresher::new(requests, Duration::from_secs(1), Duration::from_secs(3)).run(),
    );

    let job = jobs.recv().await.expect("expiry job");
    let now = SystemTime::now();
    match job(&FakeServer::default(), &session("t")) {
        Ok(Some(AppEvent::ExpireTypingIndicators { before })) => {
            let age = now.duration_since(before).expect("cut-off is in the past");
            assert!(
                age >= Duration::from_secs(3) && age < Duration::from_secs(4),
                "cut-off should be about 3s ago, was {age:?}"
            );
        }
        other => panic!("expected expiry event, got {other:?}"),
    }
    assert!(jobs.recv().await.is_some(), "refresher keeps running");
}

#[tokio::test(start_paused = true)]
async fn timezone_monitor_posts_only_changes() {
    let source = SettableTimezone::new("Europe/Berlin", 3600);
    let (events, mut rx) = event_queue();
    tokio::spawn(
        TimezoneMonitor::new(
            Arc::new(source.clone()),
            events,
            Duration::from_secs(300),
            source.current(),
        )
        .run(),
    );

    tokio::time::sleep(Duration::from_secs(650)).await;
    assert!(rx.try_recv().is_none(), "unchanged zone posts nothing");

    source.set("America/New_York", -18000);
    match rx.recv().await {
        Some(AppEvent::TimezoneChanged(zone)) => {
            assert_eq!(zone.name, "America/New_York");
            assert_eq!(zone.utc_offset_seconds, -18000);
        }
        other => panic!("expected timezone change, got {other:?}"),
    }
}
