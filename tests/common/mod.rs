//! Scripted fakes of every startup collaborator.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use mm_client::{
    ApiError, Channel, ChannelId, ChannelType, ConnectionData, Login, Preference, Session, Team,
    TeamId, User, UserId, UserStatus,
};
use mmterm::credentials::{CredentialDraft, CredentialPrompt, Credentials, PromptAborted};
use mmterm::login::LoginFailure;
use mmterm::persist::{HistoryStore, InputHistory, LastRunState, LastRunStore, PersistError};
use mmterm::server::{Connector, ServerApi, ServerHandle};
use mmterm::team::TeamChooser;
use mmterm::theme::{Theme, ThemeError, ThemeLoader};
use mmterm::timezone::{TimeZone, TimezoneSource};

pub const HOST: &str = "chat.example.com";
pub const PORT: u16 = 443;

pub fn credentials(password: &str) -> Credentials {
    Credentials {
        hostname: HOST.to_string(),
        port: PORT,
        username: "alice".to_string(),
        password: password.to_string(),
    }
}

pub fn user() -> User {
    User {
        id: UserId::from("u1"),
        username: "alice".to_string(),
        first_name: String::new(),
        last_name: String::new(),
        nickname: String::new(),
    }
}

pub fn session(token: &str) -> Session {
    Session {
        token: token.to_string(),
        user_id: UserId::from("u1"),
    }
}

pub fn team(id: &str, name: &str) -> Team {
    Team {
        id: TeamId::from(id),
        name: name.to_lowercase(),
        display_name: name.to_string(),
    }
}

pub fn channel(id: &str, name: &str) -> Channel {
    Channel {
        id: ChannelId::from(id),
        team_id: Some(TeamId::from("t1")),
        name: name.to_string(),
        display_name: name.to_string(),
        channel_type: ChannelType::Open,
        header: String::new(),
        purpose: String::new(),
        last_post_at: 0,
        total_msg_count: 0,
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// Server with scripted login outcomes and fixed data.
#[derive(Default)]
pub struct FakeServer {
    /// Outcomes of successive logins; `Ok` carries the session token.
    pub logins: Mutex<VecDeque<Result<String, ApiError>>>,
    pub teams: Vec<Team>,
    pub channels: HashMap<TeamId, Vec<Channel>>,
    pub statuses: Vec<UserStatus>,
    pub login_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub last_login: Mutex<Option<(String, String)>>,
}

impl FakeServer {
    pub fn with_teams(teams: Vec<Team>) -> Self {
        Self {
            teams,
            ..Self::default()
        }
    }
}

impl ServerApi for FakeServer {
    fn login(&self, login: &Login) -> Result<(Session, User), ApiError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_login.lock().expect("lock") =
            Some((login.login_id.clone(), login.password.clone()));
        match self.logins.lock().expect("lock").pop_front() {
            Some(Ok(token)) => Ok((session(&token), user())),
            Some(Err(e)) => Err(e),
            None => Ok((session("default-token"), user())),
        }
    }

    fn my_teams(&self, _session: &Session) -> Result<Vec<Team>, ApiError> {
        Ok(self.teams.clone())
    }

    fn my_channels(&self, _session: &Session, team_id: &TeamId) -> Result<Vec<Channel>, ApiError> {
        Ok(self.channels.get(team_id).cloned().unwrap_or_default())
    }

    fn my_preferences(&self, _session: &Session) -> Result<Vec<Preference>, ApiError> {
        Err(ApiError::Server(503))
    }

    fn statuses(&self, _session: &Session, _ids: &[UserId]) -> Result<Vec<UserStatus>, ApiError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.statuses.clone())
    }
}

/// Connector whose open outcomes are scripted; successful opens hand out
/// the shared [`FakeServer`].
pub struct FakeConnector {
    pub server: Arc<FakeServer>,
    pub opens: Mutex<VecDeque<Result<(), ApiError>>>,
    pub opened: Mutex<Vec<ConnectionData>>,
}

impl FakeConnector {
    pub fn new(server: Arc<FakeServer>) -> Self {
        Self {
            server,
            opens: Mutex::new(VecDeque::new()),
            opened: Mutex::new(Vec::new()),
        }
    }

    pub fn open_count(&self) -> usize {
        self.opened.lock().expect("lock").len()
    }
}

impl Connector for FakeConnector {
    fn open(&self, data: &ConnectionData) -> Result<ServerHandle, ApiError> {
        self.opened.lock().expect("lock").push(data.clone());
        match self.opens.lock().expect("lock").pop_front() {
            Some(Err(e)) => Err(e),
            _ => Ok(self.server.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Interactive collaborators
// ---------------------------------------------------------------------------

/// Answers prompts from a script and records what it was shown.
#[derive(Default)]
pub struct ScriptedPrompt {
    pub answers: VecDeque<Credentials>,
    pub calls: Vec<(CredentialDraft, Option<LoginFailure>)>,
}

impl ScriptedPrompt {
    pub fn answering(answers: Vec<Credentials>) -> Self {
        Self {
            answers: answers.into(),
            calls: Vec::new(),
        }
    }

    pub fn tags(&self) -> Vec<Option<&'static str>> {
        self.calls
            .iter()
            .map(|(_, failure)| failure.as_ref().map(LoginFailure::tag))
            .collect()
    }
}

impl CredentialPrompt for ScriptedPrompt {
    fn prompt(
        &mut self,
        draft: CredentialDraft,
        failure: Option<&LoginFailure>,
    ) -> Result<Credentials, PromptAborted> {
        self.calls.push((draft, failure.cloned()));
        self.answers.pop_front().ok_or(PromptAborted)
    }
}

/// Picks a team by index and records the candidates it saw.
pub struct ScriptedChooser {
    pub pick: Option<usize>,
    pub seen: Vec<Vec<Team>>,
}

impl ScriptedChooser {
    pub fn picking(index: usize) -> Self {
        Self {
            pick: Some(index),
            seen: Vec::new(),
        }
    }

    pub fn never() -> Self {
        Self {
            pick: None,
            seen: Vec::new(),
        }
    }
}

impl TeamChooser for ScriptedChooser {
    fn choose(&mut self, candidates: &[Team]) -> Result<Team, PromptAborted> {
        self.seen.push(candidates.to_vec());
        let index = self.pick.ok_or(PromptAborted)?;
        candidates.get(index).cloned().ok_or(PromptAborted)
    }
}

// ---------------------------------------------------------------------------
// Persistence, theme, timezone
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemLastRunStore {
    pub state: Mutex<Option<LastRunState>>,
    pub fail_reads: bool,
}

impl MemLastRunStore {
    pub fn holding(state: LastRunState) -> Self {
        Self {
            state: Mutex::new(Some(state)),
            fail_reads: false,
        }
    }
}

impl LastRunStore for MemLastRunStore {
    fn read(&self, team_id: &TeamId) -> Result<LastRunState, PersistError> {
        if self.fail_reads {
            return Err(PersistError::Read {
                path: "mem".into(),
                source: std::io::Error::other("disk on fire"),
            });
        }
        self.state
            .lock()
            .expect("lock")
            .clone()
            .filter(|s| &s.team_id == team_id)
            .ok_or_else(|| PersistError::Missing { path: "mem".into() })
    }

    fn save(&self, state: &LastRunState) -> Result<(), PersistError> {
        *self.state.lock().expect("lock") = Some(state.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemHistoryStore {
    pub history: Option<InputHistory>,
}

impl HistoryStore for MemHistoryStore {
    fn read(&self) -> Result<InputHistory, PersistError> {
        self.history
            .clone()
            .ok_or_else(|| PersistError::Missing { path: "mem".into() })
    }

    fn save(&self, _history: &InputHistory) -> Result<(), PersistError> {
        Ok(())
    }
}

/// Theme loader that always fails or always returns the base.
pub struct FakeThemeLoader {
    pub fail: bool,
}

impl ThemeLoader for FakeThemeLoader {
    fn load(&self, path: &Path, base: Theme) -> Result<Theme, ThemeError> {
        if self.fail {
            Err(ThemeError::Parse {
                path: path.to_path_buf(),
                message: "expected a table".to_string(),
            })
        } else {
            Ok(base)
        }
    }
}

/// Timezone source that returns whatever was last set.
#[derive(Clone)]
pub struct SettableTimezone {
    pub zone: Arc<Mutex<TimeZone>>,
}

impl SettableTimezone {
    pub fn new(name: &str, offset: i32) -> Self {
        Self {
            zone: Arc::new(Mutex::new(TimeZone {
                name: name.to_string(),
                utc_offset_seconds: offset,
            })),
        }
    }

    pub fn set(&self, name: &str, offset: i32) {
        *self.zone.lock().expect("lock") = TimeZone {
            name: name.to_string(),
            utc_offset_seconds: offset,
        };
    }
}

impl TimezoneSource for SettableTimezone {
    fn current(&self) -> TimeZone {
        self.zone.lock().expect("lock").clone()
    }
}
