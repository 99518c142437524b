//! Background workers and the supervisor that starts them.
//!
//! Workers start in a fixed order ([`WorkerKind::START_ORDER`]) and run until
//! the process exits. Nothing joins them; instead the [`Supervisor`]
//! broadcasts a [`WorkerExit`] whenever one stops, so the interactive layer
//! can surface a dead worker if it wants to.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use mm_client::Session;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::config::schema::Timings;
use crate::events::EventSender;
use crate::queue::{RequestReceiver, RequestSender};
use crate::server::ServerHandle;
use crate::timezone::{TimeZone, TimezoneSource};
use crate::tracked::TrackedUsers;

/// Single consumer of the request queue.
pub mod async_queue;

/// Presence polling.
pub mod presence;

/// External spell checker.
pub mod spell;

/// Output of launched programs.
pub mod subprocess;

/// Local timezone change detection.
pub mod timezone;

/// Typing indicator expiry.
pub mod typing;

use self::async_queue::AsyncQueueWorker;
use self::presence::PresenceRefresher;
use self::spell::SpellChecker;
use self::subprocess::{ProgramLogSender, ProgramOutput, SubprocessLogger};
use self::timezone::TimezoneMonitor;
use self::typing::TypingRefresher;

/// Capacity of the worker exit broadcast.
const EXIT_CHANNEL_CAPACITY: usize = 16;

/// The background workers, in start order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerKind {
    /// Request queue consumer.
    AsyncQueue,
    /// Presence refresher.
    Presence,
    /// Typing indicator refresher (optional).
    Typing,
    /// Timezone monitor.
    Timezone,
    /// Subprocess output logger.
    SubprocessLogger,
    /// Spell checker (optional).
    SpellChecker,
}

impl WorkerKind {
    /// Order in which workers are started.
    pub const START_ORDER: [WorkerKind; 6] = [
        WorkerKind::AsyncQueue,
        WorkerKind::Presence,
        WorkerKind::Typing,
        WorkerKind::Timezone,
        WorkerKind::SubprocessLogger,
        WorkerKind::SpellChecker,
    ];

    /// Short name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::AsyncQueue => "async-queue",
            Self::Presence => "presence",
            Self::Typing => "typing",
            Self::Timezone => "timezone",
            Self::SubprocessLogger => "subprocess-logger",
            Self::SpellChecker => "spell-checker",
        }
    }

    /// Whether the client works without this worker.
    pub fn is_optional(self) -> bool {
        matches!(self, Self::Typing | Self::SpellChecker)
    }

    fn position(self) -> usize {
        Self::START_ORDER
            .iter()
            .position(|k| *k == self)
            .unwrap_or(Self::START_ORDER.len())
    }
}

impl fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a worker stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// Its loop ended, usually because a queue closed.
    Returned,
    /// It panicked with this message.
    Panicked(String),
    /// The runtime cancelled it.
    Cancelled,
}

/// Notification that a worker stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerExit {
    /// Which worker.
    pub kind: WorkerKind,
    /// Why.
    pub reason: ExitReason,
}

/// Errors from starting workers.
#[derive(Error, Debug)]
pub enum SupervisorError {
    /// Workers cannot be restarted.
    #[error("worker '{0}' has already been started")]
    AlreadyStarted(WorkerKind),

    /// A worker was started ahead of one that precedes it.
    #[error("worker '{kind}' cannot start after '{after}'")]
    OutOfOrder {
        /// Worker being started.
        kind: WorkerKind,
        /// Worker already started that comes later in the order.
        after: WorkerKind,
    },

    /// A worker's resources could not be set up.
    #[error("failed to start worker '{kind}': {message}")]
    StartFailed {
        /// Worker that failed.
        kind: WorkerKind,
        /// What went wrong.
        message: String,
    },
}

/// Owns the record of started workers for the life of the process.
#[derive(Debug)]
pub struct Supervisor {
    runtime: Handle,
    started: Vec<WorkerKind>,
    exits: broadcast::Sender<WorkerExit>,
}

impl Supervisor {
    /// Supervisor that spawns onto `runtime`.
    pub fn new(runtime: Handle) -> Self {
        let (exits, _rx) = broadcast::channel(EXIT_CHANNEL_CAPACITY);
        Self {
            runtime,
            started: Vec::new(),
            exits,
        }
    }

    /// Workers started so far, in start order.
    pub fn started(&self) -> &[WorkerKind] {
        &self.started
    }

    /// Whether `kind` has been started.
    pub fn is_started(&self, kind: WorkerKind) -> bool {
        self.started.contains(&kind)
    }

    /// Receives a [`WorkerExit`] for every worker that stops from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkerExit> {
        self.exits.subscribe()
    }

    /// The runtime workers run on.
    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }

    /// Spawns `worker` as `kind`.
    ///
    /// # Errors
    ///
    /// - [`SupervisorError::AlreadyStarted`] if `kind` is running or ran
    /// - [`SupervisorError::OutOfOrder`] if a later worker already started
    pub fn spawn<F>(&mut self, kind: WorkerKind, worker: F) -> Result<(), SupervisorError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.is_started(kind) {
            return Err(SupervisorError::AlreadyStarted(kind));
        }
        if let Some(after) = self
            .started
            .iter()
            .copied()
            .find(|s| s.position() > kind.position())
        {
            return Err(SupervisorError::OutOfOrder { kind, after });
        }

        let task = self.runtime.spawn(worker);
        let exits = self.exits.clone();
        self.runtime.spawn(async move {
            let reason = match task.await {
                Ok(()) => ExitReason::Returned,
                Err(e) if e.is_panic() => ExitReason::Panicked(panic_message(e.into_panic())),
                Err(_) => ExitReason::Cancelled,
            };
            match &reason {
                ExitReason::Panicked(message) => error!(worker = %kind, panic = %message, "worker panicked"),
                _ => warn!(worker = %kind, reason = ?reason, "worker stopped"),
            }
            // No subscribers is fine.
            let _ = exits.send(WorkerExit { kind, reason });
        });

        self.started.push(kind);
        info!(worker = %kind, "worker started");
        Ok(())
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ---------------------------------------------------------------------------
// Starting the fixed worker set
// ---------------------------------------------------------------------------

/// Settings that decide which workers run and how often.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Polling intervals.
    pub timings: Timings,
    /// Start the typing indicator refresher.
    pub show_typing_indicator: bool,
    /// Start the spell checker.
    pub enable_spell_check: bool,
    /// Aspell executable.
    pub aspell_command: String,
    /// Dictionary passed to aspell.
    pub aspell_dictionary: Option<String>,
    /// Where failed program output is appended.
    pub subprocess_log_path: PathBuf,
}

/// Shared resources, handed out to each worker as needed.
pub struct WorkerResources {
    /// Connection to the server.
    pub server: ServerHandle,
    /// Authenticated session.
    pub session: Session,
    /// Request queue producer.
    pub requests: RequestSender,
    /// Request queue consumer, given to the async worker.
    pub request_rx: RequestReceiver,
    /// Event queue producer.
    pub events: EventSender,
    /// Users whose presence is polled.
    pub tracked: TrackedUsers,
    /// Timezone lookup.
    pub timezone_source: Arc<dyn TimezoneSource>,
    /// Timezone already resolved for the snapshot.
    pub timezone: TimeZone,
}

/// Handles to running workers, kept in the application snapshot.
#[derive(Debug)]
pub struct WorkerHandles {
    /// The supervisor, for exit notifications.
    pub supervisor: Supervisor,
    /// Where launched programs report output.
    pub program_log: ProgramLogSender,
    /// Spell checker, when enabled and aspell could be started.
    pub spell_checker: Option<SpellChecker>,
}

/// Starts every configured worker, in order.
///
/// # Errors
///
/// Returns a [`SupervisorError`] when a mandatory worker cannot start.
/// Optional workers that fail to start are logged and left absent.
pub fn start_workers(
    mut supervisor: Supervisor,
    settings: &WorkerSettings,
    resources: WorkerResources,
) -> Result<WorkerHandles, SupervisorError> {
    let WorkerResources {
        server,
        session,
        requests,
        request_rx,
        events,
        tracked,
        timezone_source,
        timezone,
    } = resources;
    let timings = &settings.timings;

    supervisor.spawn(
        WorkerKind::AsyncQueue,
        AsyncQueueWorker::new(server.clone(), session.clone(), request_rx, events.clone()).run(),
    )?;

    supervisor.spawn(
        WorkerKind::Presence,
        PresenceRefresher::new(
            server,
            session,
            tracked,
            events.clone(),
            timings.presence_interval,
        )
        .run(),
    )?;

    if settings.show_typing_indicator {
        supervisor.spawn(
            WorkerKind::Typing,
            TypingRefresher::new(requests.clone(), timings.typing_refresh, timings.typing_expiry)
                .run(),
        )?;
    }

    supervisor.spawn(
        WorkerKind::Timezone,
        TimezoneMonitor::new(
            timezone_source,
            events.clone(),
            timings.timezone_interval,
            timezone,
        )
        .run(),
    )?;

    let (program_log, outputs) = subprocess::program_log_channel();
    start_subprocess_logger(&mut supervisor, settings, outputs, requests)?;

    let spell_checker = if settings.enable_spell_check {
        start_spell_checker(&mut supervisor, settings, events, timings.spell_check_delay)
    } else {
        None
    };

    Ok(WorkerHandles {
        supervisor,
        program_log,
        spell_checker,
    })
}

fn start_subprocess_logger(
    supervisor: &mut Supervisor,
    settings: &WorkerSettings,
    outputs: tokio::sync::mpsc::UnboundedReceiver<ProgramOutput>,
    requests: RequestSender,
) -> Result<(), SupervisorError> {
    if let Some(dir) = settings.subprocess_log_path.parent() {
        crate::config::xdg::ensure_dir(dir).map_err(|e| SupervisorError::StartFailed {
            kind: WorkerKind::SubprocessLogger,
            message: format!("cannot create {}: {e}", dir.display()),
        })?;
    }
    supervisor.spawn(
        WorkerKind::SubprocessLogger,
        SubprocessLogger::new(outputs, requests, settings.subprocess_log_path.clone()).run(),
    )
}

fn start_spell_checker(
    supervisor: &mut Supervisor,
    settings: &WorkerSettings,
    events: EventSender,
    delay: Duration,
) -> Option<SpellChecker> {
    let child = {
        let _runtime = supervisor.runtime().enter();
        spell::spawn_aspell(&settings.aspell_command, settings.aspell_dictionary.as_deref())
    };
    let child = match child {
        Ok(child) => child,
        Err(e) => {
            warn!(error = %e, "could not start aspell, spell checking disabled");
            return None;
        }
    };
    let Some((checker, worker)) = spell::from_child(child, events, delay) else {
        warn!("aspell pipes unavailable, spell checking disabled");
        return None;
    };
    match supervisor.spawn(WorkerKind::SpellChecker, worker.run()) {
        Ok(()) => Some(checker),
        Err(e) => {
            warn!(error = %e, "spell checker not started");
            None
        }
    }
}
