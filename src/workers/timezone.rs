//! Detects local timezone changes during a long session.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::events::{AppEvent, EventSender};
use crate::timezone::{TimeZone, TimezoneSource};

/// Re-resolves the timezone every interval and posts changes.
pub struct TimezoneMonitor {
    source: Arc<dyn TimezoneSource>,
    events: EventSender,
    interval: Duration,
    last: TimeZone,
}

impl TimezoneMonitor {
    /// Creates the monitor; `initial` is the zone already in the snapshot.
    pub fn new(
        source: Arc<dyn TimezoneSource>,
        events: EventSender,
        interval: Duration,
        initial: TimeZone,
    ) -> Self {
        Self {
            source,
            events,
            interval,
            last: initial,
        }
    }

    /// Runs until the event queue closes.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let current = self.source.current();
            if current == self.last {
                continue;
            }
            info!(from = %self.last, to = %current, "local timezone changed");
            self.last = current.clone();
            if self.events.send(AppEvent::TimezoneChanged(current)).await.is_err() {
                debug!("event queue closed, stopping timezone monitor");
                return;
            }
        }
    }
}
