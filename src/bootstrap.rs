//! Startup: from configuration to a running client.
//!
//! [`initialize`] runs on the calling thread and makes every server request
//! in sequence, since each step needs the previous one's result:
//!
//! 1. resolve credentials, prompting if the configuration is incomplete
//! 2. connect and log in, re-prompting on every failure
//! 3. select the team
//! 4. fetch channels and select the initial one
//! 5. load history and theme, resolve the timezone
//! 6. create the queues and start the workers
//! 7. assemble the [`ApplicationSnapshot`] and ask for a realtime connection
//!
//! Must not be called from inside an async task: the server client and the
//! final event post are blocking.

use std::path::PathBuf;
use std::sync::Arc;

use mm_client::ApiError;
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::channel::{select_context, LiveIdentity};
use crate::config::error::ConfigError;
use crate::config::schema::Config;
use crate::config::xdg;
use crate::credentials::{resolve_credentials, CredentialPrompt, PromptAborted};
use crate::events::{event_queue, AppEvent};
use crate::login::establish_session;
use crate::persist::{HistoryStore, InputHistory, LastRunStore, PersistError};
use crate::queue::request_queue;
use crate::server::Connector;
use crate::snapshot::ApplicationSnapshot;
use crate::team::{select_team, TeamChooser};
use crate::theme::{self, Theme, ThemeError, ThemeLoader};
use crate::timezone::TimezoneSource;
use crate::tracked::TrackedUsers;
use crate::workers::spell::DEFAULT_ASPELL_COMMAND;
use crate::workers::subprocess::SUBPROCESS_LOG_FILE;
use crate::workers::{start_workers, Supervisor, SupervisorError, WorkerResources, WorkerSettings};

/// Conditions that stop startup. None of them leaves a partial snapshot.
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// The user quit the credential prompt or team chooser.
    #[error(transparent)]
    Aborted(#[from] PromptAborted),

    /// The account belongs to no team, so there is nothing to show.
    #[error("Error: your account is not a member of any team")]
    NoTeams,

    /// Neither the last viewed channel nor town-square is available.
    #[error("Error: team '{team}' has no town-square channel to open")]
    NoInitialChannel {
        /// Display name of the selected team.
        team: String,
    },

    /// The theme customization file is broken.
    #[error("Error: {0}")]
    Theme(#[from] ThemeError),

    /// The configuration is invalid.
    #[error("Error: {0}")]
    Config(#[from] ConfigError),

    /// A server request failed after login.
    #[error("Error while {context}: {source}")]
    Api {
        /// What was being requested.
        context: &'static str,
        /// Underlying failure.
        #[source]
        source: ApiError,
    },

    /// A mandatory worker could not be started.
    #[error("Error: {0}")]
    Supervisor(#[from] SupervisorError),

    /// The event queue closed before startup finished.
    #[error("Error: event queue closed during startup")]
    EventQueueClosed,
}

impl BootstrapError {
    /// Whether this is the user choosing to quit rather than a failure.
    pub fn is_user_abort(&self) -> bool {
        matches!(self, Self::Aborted(_))
    }
}

/// Everything startup talks to besides the configuration.
pub struct Collaborators<'a> {
    /// Opens server connections.
    pub connector: &'a dyn Connector,
    /// Collects credentials interactively.
    pub credential_prompt: &'a mut dyn CredentialPrompt,
    /// Picks a team interactively.
    pub team_chooser: &'a mut dyn TeamChooser,
    /// Last-run state; `None` to ignore it.
    pub last_run: Option<&'a dyn LastRunStore>,
    /// Input history.
    pub history: &'a dyn HistoryStore,
    /// Applies theme customization files.
    pub theme_loader: &'a dyn ThemeLoader,
    /// Resolves the local timezone.
    pub timezone: Arc<dyn TimezoneSource>,
    /// Directory for the subprocess failure log.
    pub state_dir: PathBuf,
}

/// Runs startup and returns the assembled snapshot.
///
/// Credentials that worked are written back into `config.server`. Workers
/// are spawned onto `runtime`.
///
/// # Errors
///
/// See [`BootstrapError`]. Login failures never surface here; they are
/// resolved by re-prompting.
pub fn initialize(
    config: &mut Config,
    runtime: Handle,
    deps: Collaborators<'_>,
) -> Result<ApplicationSnapshot, BootstrapError> {
    let timings = config.timing.parse()?;

    let credentials = resolve_credentials(&config.server, deps.credential_prompt)?;
    let established = establish_session(
        &config.server,
        credentials,
        deps.connector,
        deps.credential_prompt,
    )?;
    config.server.apply_credentials(&established.credentials);

    let server = established.server;
    let session = established.session;
    let team = select_team(
        server.as_ref(),
        &session,
        config.server.team.as_deref(),
        deps.team_chooser,
    )?;

    let identity = LiveIdentity {
        host: &established.connection.host,
        port: established.connection.port,
        session: &session,
    };
    let selection = select_context(server.as_ref(), identity, &team, deps.last_run)?;

    let preferences = server.my_preferences(&session).unwrap_or_else(|e| {
        warn!(error = %e, "could not load preferences, using defaults");
        Vec::new()
    });
    let history = load_history(deps.history);
    let theme = load_theme(config, deps.theme_loader)?;
    let timezone = deps.timezone.current();
    debug!(timezone = %timezone, "resolved local timezone");

    let (requests, request_rx) = request_queue();
    let (events, event_rx) = event_queue();
    let tracked_users = TrackedUsers::new();

    let settings = WorkerSettings {
        timings,
        show_typing_indicator: config.features.show_typing_indicator,
        enable_spell_check: config.features.enable_spell_check,
        aspell_command: config
            .features
            .aspell_command
            .clone()
            .unwrap_or_else(|| DEFAULT_ASPELL_COMMAND.to_string()),
        aspell_dictionary: config.features.aspell_dictionary.clone(),
        subprocess_log_path: deps.state_dir.join(SUBPROCESS_LOG_FILE),
    };
    let workers = start_workers(
        Supervisor::new(runtime),
        &settings,
        WorkerResources {
            server: server.clone(),
            session: session.clone(),
            requests: requests.clone(),
            request_rx,
            events: events.clone(),
            tracked: tracked_users.clone(),
            timezone_source: deps.timezone,
            timezone: timezone.clone(),
        },
    )?;
    info!(workers = workers.supervisor.started().len(), "workers started");

    events
        .blocking_send(AppEvent::RefreshWebsocket)
        .map_err(|_| BootstrapError::EventQueueClosed)?;

    Ok(ApplicationSnapshot {
        session,
        me: established.me,
        server,
        connection: established.connection,
        team,
        channels: selection.channels,
        current_channel: selection.initial,
        matched_channels: selection.matched,
        preferences,
        history,
        timezone,
        theme,
        workers,
        requests,
        events: event_rx,
        tracked_users,
        url_open_command: config.features.url_open_command.clone(),
        login_attempts: established.attempts,
    })
}

/// Reads saved history; any failure yields an empty history.
pub fn load_history(store: &dyn HistoryStore) -> InputHistory {
    match store.read() {
        Ok(history) => history,
        Err(PersistError::Missing { .. }) => {
            debug!("no saved input history");
            InputHistory::new()
        }
        Err(e) => {
            warn!(error = %e, "could not load input history, starting empty");
            InputHistory::new()
        }
    }
}

/// Resolves the configured theme and applies the customization file.
///
/// # Errors
///
/// A customization file that cannot be loaded is an error.
pub fn load_theme(config: &Config, loader: &dyn ThemeLoader) -> Result<Theme, ThemeError> {
    let base = theme::resolve_base(&config.theme.name);
    match config.theme.customization_file.as_deref() {
        Some(path) => loader.load(&xdg::expand_tilde(path), base),
        None => Ok(base),
    }
}
