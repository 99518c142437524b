//! The request queue: background actions for the async worker.
//!
//! Two unbounded lanes so producers never wait. Jobs on the preempt lane
//! run before anything waiting on the normal lane.

use mm_client::{ApiError, Session};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::events::AppEvent;
use crate::server::ServerApi;

/// A background action. Runs on the blocking pool with the shared
/// connection and session; a returned event is posted to the event queue.
pub type Job =
    Box<dyn FnOnce(&dyn ServerApi, &Session) -> Result<Option<AppEvent>, ApiError> + Send + 'static>;

/// Which lane a job goes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    /// Runs ahead of queued normal jobs.
    Preempt,
    /// Runs in submission order.
    Normal,
}

/// The async worker has stopped.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("request queue closed")]
pub struct RequestQueueClosed;

/// Creates the request queue.
pub fn request_queue() -> (RequestSender, RequestReceiver) {
    let (preempt_tx, preempt_rx) = mpsc::unbounded_channel();
    let (normal_tx, normal_rx) = mpsc::unbounded_channel();
    (
        RequestSender {
            preempt: preempt_tx,
            normal: normal_tx,
        },
        RequestReceiver {
            preempt: preempt_rx,
            normal: normal_rx,
        },
    )
}

/// Producer handle; cheap to clone.
#[derive(Clone)]
pub struct RequestSender {
    preempt: mpsc::UnboundedSender<Job>,
    normal: mpsc::UnboundedSender<Job>,
}

impl std::fmt::Debug for RequestSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSender")
            .field("closed", &self.normal.is_closed())
            .finish()
    }
}

impl RequestSender {
    /// Enqueues `job` on the given lane without waiting.
    pub fn enqueue<F>(&self, priority: Priority, job: F) -> Result<(), RequestQueueClosed>
    where
        F: FnOnce(&dyn ServerApi, &Session) -> Result<Option<AppEvent>, ApiError> + Send + 'static,
    {
        let lane = match priority {
            Priority::Preempt => &self.preempt,
            Priority::Normal => &self.normal,
        };
        lane.send(Box::new(job)).map_err(|_| RequestQueueClosed)
    }

    /// Enqueues `job` on the normal lane.
    pub fn submit<F>(&self, job: F) -> Result<(), RequestQueueClosed>
    where
        F: FnOnce(&dyn ServerApi, &Session) -> Result<Option<AppEvent>, ApiError> + Send + 'static,
    {
        self.enqueue(Priority::Normal, job)
    }

    /// Enqueues a job that only posts `event`.
    pub fn post(&self, event: AppEvent) -> Result<(), RequestQueueClosed> {
        self.submit(move |_, _| Ok(Some(event)))
    }
}

/// Consumer handle, owned by the async worker.
pub struct RequestReceiver {
    preempt: mpsc::UnboundedReceiver<Job>,
    normal: mpsc::UnboundedReceiver<Job>,
}

impl std::fmt::Debug for RequestReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestReceiver").finish_non_exhaustive()
    }
}

impl RequestReceiver {
    /// Waits for the next job, preempt lane first. `None` once every
    /// sender is gone and both lanes are empty.
    pub async fn recv(&mut self) -> Option<Job> {
        tokio::select! {
            biased;
            Some(job) = self.preempt.recv() => Some(job),
            Some(job) = self.normal.recv() => Some(job),
            else => None,
        }
    }
}
