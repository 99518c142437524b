//! Event queue backpressure and request worker behaviour.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::{session, FakeServer};
use mm_client::ApiError;
use mmterm::events::{event_queue, event_queue_with_capacity, AppEvent};
use mmterm::queue::{request_queue, Priority};
use mmterm::workers::async_queue::AsyncQueueWorker;

async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

fn notice_text(event: Option<AppEvent>) -> String {
    match event {
        Some(AppEvent::Notice(text)) => text,
        other => panic!("expected a notice, got {other:?}"),
    }
}

#[tokio::test]
async fn full_event_queue_blocks_producer_until_space_frees() {
    let (tx, mut rx) = event_queue_with_capacity(2);
    let sent = Arc::new(AtomicUsize::new(0));
    let producer = {
        let sent = sent.clone();
        tokio::spawn(async move {
            for i in 0..5 {
                tx.send(AppEvent::Notice(i.to_string()))
                    .await
                    .expect("receiver alive");
                sent.fetch_add(1, Ordering::SeqCst);
            }
        })
    };

    settle().await;
    assert_eq!(sent.load(Ordering::SeqCst), 2, "producer blocks once the queue is full");
    assert!(!producer.is_finished());

    let mut received = vec![notice_text(rx.recv().await)];
    settle().await;
    assert_eq!(sent.load(Ordering::SeqCst), 3, "one free slot lets one more event in");

    while let Some(event) = rx.recv().await {
        received.push(notice_text(Some(event)));
    }
    producer.await.expect("producer panicked");
    assert_eq!(received, vec!["0", "1", "2", "3", "4"], "nothing dropped or reordered");
}

#[tokio::test]
async fn request_worker_posts_results_and_errors_in_order() {
    let (requests, request_rx) = request_queue();
    let (events, mut rx) = event_queue();
    let server = Arc::new(FakeServer::default());
    let worker = tokio::spawn(AsyncQueueWorker::new(server, session("t"), request_rx, events).run());

    requests
        .submit(|server, session| {
            let teams = server.my_teams(session)?;
            Ok(Some(AppEvent::Notice(format!("{} teams", teams.len()))))
        })
        .expect("enqueue");
    requests
        .submit(|server, session| server.my_preferences(session).map(|_| None))
        .expect("enqueue");
    requests.submit(|_, _| Ok(None)).expect("enqueue");
    requests.post(AppEvent::Notice("last".into())).expect("enqueue");

    assert_eq!(notice_text(rx.recv().await), "0 teams");
    match rx.recv().await {
        Some(AppEvent::AsyncError(message)) => {
            assert_eq!(message, ApiError::Server(503).to_string())
        }
        other => panic!("expected an async error, got {other:?}"),
    }
    assert_eq!(notice_text(rx.recv().await), "last", "jobs without results post nothing");

    drop(requests);
    worker.await.expect("worker panicked");
}

#[tokio::test]
async fn request_worker_survives_a_panicking_job() {
    let (requests, request_rx) = request_queue();
    let (events, mut rx) = event_queue();
    let worker = tokio::spawn(
        AsyncQueueWorker::new(Arc::new(FakeServer::default()), session("t"), request_rx, events)
            .run(),
    );

    requests
        .enqueue(Priority::Preempt, |_, _| panic!("bad job"))
        .expect("enqueue");
    requests.post(AppEvent::Notice("after".into())).expect("enqueue");

    assert_eq!(notice_text(rx.recv().await), "after");
    drop(requests);
    worker.await.expect("worker panicked");
}
