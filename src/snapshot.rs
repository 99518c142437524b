//! The application state handed to the interactive loop.

use std::fmt;

use mm_client::{Channel, ConnectionData, Preference, Session, Team, User};

use crate::channel::ClientChannel;
use crate::events::EventReceiver;
use crate::persist::{InputHistory, LastRunState};
use crate::queue::RequestSender;
use crate::server::ServerHandle;
use crate::theme::Theme;
use crate::timezone::TimeZone;
use crate::tracked::TrackedUsers;
use crate::workers::subprocess::spawn_logged_program;
use crate::workers::WorkerHandles;

/// Everything startup produced, built exactly once.
///
/// After construction the interactive loop owns it; startup never touches
/// it again.
pub struct ApplicationSnapshot {
    /// Authenticated session.
    pub session: Session,
    /// The logged-in user.
    pub me: User,
    /// Connection shared with the workers.
    pub server: ServerHandle,
    /// Where the connection points.
    pub connection: ConnectionData,
    /// Selected team.
    pub team: Team,
    /// All of the team's channels the user belongs to.
    pub channels: Vec<Channel>,
    /// Channel shown first.
    pub current_channel: ClientChannel,
    /// Every channel the selection rule matched, `current_channel` first.
    pub matched_channels: Vec<ClientChannel>,
    /// The user's stored preferences.
    pub preferences: Vec<Preference>,
    /// Input history from earlier runs.
    pub history: InputHistory,
    /// Local timezone at startup.
    pub timezone: TimeZone,
    /// Theme with customizations applied.
    pub theme: Theme,
    /// Running workers.
    pub workers: WorkerHandles,
    /// Request queue producer.
    pub requests: RequestSender,
    /// Event queue consumer.
    pub events: EventReceiver,
    /// Users whose presence is polled; shared with the presence refresher.
    pub tracked_users: TrackedUsers,
    /// Program that opens URLs, if configured.
    pub url_open_command: Option<String>,
    /// Login attempts it took to get here.
    pub login_attempts: u32,
}

impl ApplicationSnapshot {
    /// Opens `url` with the configured program; its output goes to the
    /// subprocess logger. Returns `false` when no opener is configured.
    ///
    /// Must be called from within the runtime.
    pub fn open_url(&self, url: &str) -> bool {
        let Some(command) = self.url_open_command.as_deref() else {
            return false;
        };
        spawn_logged_program(&self.workers.program_log, command, &[url.to_string()]);
        true
    }

    /// Record to persist so the next run reopens the current channel.
    pub fn last_run_state(&self) -> LastRunState {
        LastRunState {
            host: self.connection.host.clone(),
            port: self.connection.port,
            user_id: self.session.user_id.clone(),
            team_id: self.team.id.clone(),
            channel_id: self.current_channel.id.clone(),
        }
    }
}

impl fmt::Debug for ApplicationSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationSnapshot")
            .field("session", &self.session)
            .field("me", &self.me.username)
            .field("connection", &self.connection)
            .field("team", &self.team.display_name)
            .field("channels", &self.channels.len())
            .field("current_channel", &self.current_channel.display_name)
            .field("timezone", &self.timezone)
            .field("theme", &self.theme.name)
            .field("workers", &self.workers.supervisor.started())
            .finish_non_exhaustive()
    }
}
