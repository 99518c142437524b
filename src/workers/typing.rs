//! Expiry of stale typing indicators.

use std::time::{Duration, SystemTime};

use tracing::debug;

use crate::events::AppEvent;
use crate::queue::RequestSender;

/// Asks the interactive loop, via the request queue, to drop typing
/// indicators older than `expiry`, once per `refresh`.
pub struct TypingRefresher {
    requests: RequestSender,
    refresh: Duration,
    expiry: Duration,
}

impl TypingRefresher {
    /// Creates the refresher.
    pub fn new(requests: RequestSender, refresh: Duration, expiry: Duration) -> Self {
        Self {
            requests,
            refresh,
            expiry,
        }
    }

    /// Runs until the request queue closes.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.refresh);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // Nothing can be stale yet.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let before = SystemTime::now()
                .checked_sub(self.expiry)
                .unwrap_or(SystemTime::UNIX_EPOCH);
            if self
                .requests
                .post(AppEvent::ExpireTypingIndicators { before })
                .is_err()
            {
                debug!("request queue closed, stopping typing refresher");
                return;
            }
        }
    }
}
