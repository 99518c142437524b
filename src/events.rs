//! Events flowing from workers to the interactive loop.
//!
//! The event queue is bounded: producers wait when it is full, so a slow
//! consumer throttles event generation instead of growing memory.

use std::time::SystemTime;

use mm_client::{ApiError, UserStatus};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::timezone::TimeZone;
use crate::workers::spell::Misspelling;

/// Capacity of the event queue.
pub const EVENT_QUEUE_CAPACITY: usize = 2500;

/// Something the interactive loop needs to know about.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// (Re)open the realtime connection to the server.
    RefreshWebsocket,
    /// Fresh presence for tracked users.
    PresenceUpdated(Vec<UserStatus>),
    /// Drop typing indicators last refreshed before this instant.
    ExpireTypingIndicators {
        /// Cut-off time.
        before: SystemTime,
    },
    /// The local timezone changed.
    TimezoneChanged(TimeZone),
    /// An external program exited unsuccessfully.
    SubprocessFailed {
        /// Program name.
        program: String,
        /// Exit code, absent when killed by a signal.
        code: Option<i32>,
        /// Log file with the program's output.
        log_path: String,
    },
    /// Spell check results for the current input.
    SpellCheckResult(Vec<Misspelling>),
    /// A background request failed.
    AsyncError(String),
    /// Informational message for the status line.
    Notice(String),
}

impl AppEvent {
    /// Builds an [`AppEvent::AsyncError`] from a failed request.
    pub fn from_api_error(err: &ApiError) -> Self {
        Self::AsyncError(err.to_string())
    }
}

/// The consumer side has gone away.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("event queue closed")]
pub struct EventQueueClosed;

/// Creates the bounded event queue.
pub fn event_queue() -> (EventSender, EventReceiver) {
    event_queue_with_capacity(EVENT_QUEUE_CAPACITY)
}

/// Creates an event queue of the given capacity.
pub fn event_queue_with_capacity(capacity: usize) -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender { tx }, EventReceiver { rx })
}

/// Producer handle; clone one per worker.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<AppEvent>,
}

impl EventSender {
    /// Sends `event`, waiting while the queue is full.
    pub async fn send(&self, event: AppEvent) -> Result<(), EventQueueClosed> {
        self.tx.send(event).await.map_err(|_| EventQueueClosed)
    }

    /// Sends `event` from synchronous code, blocking while the queue is full.
    ///
    /// Must not be called from inside an async task.
    pub fn blocking_send(&self, event: AppEvent) -> Result<(), EventQueueClosed> {
        self.tx.blocking_send(event).map_err(|_| EventQueueClosed)
    }

    /// Free slots right now.
    pub fn capacity(&self) -> usize {
        self.tx.capacity()
    }
}

/// Consumer handle, owned by the interactive loop.
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::Receiver<AppEvent>,
}

impl EventReceiver {
    /// Waits for the next event; `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<AppEvent> {
        self.rx.recv().await
    }

    /// Returns an event if one is ready.
    pub fn try_recv(&mut self) -> Option<AppEvent> {
        self.rx.try_recv().ok()
    }
}
