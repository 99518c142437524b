//! The single consumer of the request queue.

use mm_client::Session;
use tracing::{debug, info, warn};

use crate::events::{AppEvent, EventSender};
use crate::queue::RequestReceiver;
use crate::server::ServerHandle;

/// Runs queued jobs one at a time and posts their results.
///
/// Jobs run on the blocking pool because the server client is blocking.
/// A failed job becomes an [`AppEvent::AsyncError`]; a panicking job is
/// logged and skipped.
pub struct AsyncQueueWorker {
    server: ServerHandle,
    session: Session,
    requests: RequestReceiver,
    events: EventSender,
}

impl AsyncQueueWorker {
    /// Creates the worker; it owns the only [`RequestReceiver`].
    pub fn new(
        server: ServerHandle,
        session: Session,
        requests: RequestReceiver,
        events: EventSender,
    ) -> Self {
        Self {
            server,
            session,
            requests,
            events,
        }
    }

    /// Drains the queue until every sender is dropped or the event queue
    /// closes.
    pub async fn run(mut self) {
        while let Some(job) = self.requests.recv().await {
            let server = self.server.clone();
            let session = self.session.clone();
            let outcome =
                tokio::task::spawn_blocking(move || job(server.as_ref(), &session)).await;

            let event = match outcome {
                Ok(Ok(Some(event))) => event,
                Ok(Ok(None)) => continue,
                Ok(Err(e)) => {
                    warn!(error = %e, "background request failed");
                    AppEvent::from_api_error(&e)
                }
                Err(e) => {
                    warn!(error = %e, "background job panicked");
                    continue;
                }
            };
            if self.events.send(event).await.is_err() {
                debug!("event queue closed, stopping request worker");
                return;
            }
        }
        info!("request queue closed, stopping request worker");
    }
}
