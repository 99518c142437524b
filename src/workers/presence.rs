//! Periodic presence polling for tracked users.

use std::time::Duration;

use mm_client::Session;
use tracing::{debug, warn};

use crate::events::{AppEvent, EventSender};
use crate::server::ServerHandle;
use crate::tracked::TrackedUsers;

/// Polls presence for every tracked user once per interval.
pub struct PresenceRefresher {
    server: ServerHandle,
    session: Session,
    tracked: TrackedUsers,
    events: EventSender,
    interval: Duration,
}

impl PresenceRefresher {
    /// Creates the refresher.
    pub fn new(
        server: ServerHandle,
        session: Session,
        tracked: TrackedUsers,
        events: EventSender,
        interval: Duration,
    ) -> Self {
        Self {
            server,
            session,
            tracked,
            events,
            interval,
        }
    }

    /// Polls until the event queue closes. The first poll happens at once.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if !self.refresh_once().await {
                debug!("event queue closed, stopping presence refresher");
                return;
            }
        }
    }

    /// One polling cycle. Returns `false` once the event queue is closed.
    async fn refresh_once(&self) -> bool {
        let ids = self.tracked.snapshot();
        if ids.is_empty() {
            debug!("no tracked users, skipping presence poll");
            return true;
        }

        let server = self.server.clone();
        let session = self.session.clone();
        let count = ids.len();
        let result = tokio::task::spawn_blocking(move || server.statuses(&session, &ids)).await;

        match result {
            Ok(Ok(statuses)) => {
                debug!(requested = count, received = statuses.len(), "presence refreshed");
                self.events
                    .send(AppEvent::PresenceUpdated(statuses))
                    .await
                    .is_ok()
            }
            Ok(Err(e)) => {
                warn!(error = %e, "presence poll failed");
                true
            }
            Err(e) => {
                warn!(error = %e, "presence poll panicked");
                true
            }
        }
    }
}
