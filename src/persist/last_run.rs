use std::path::PathBuf;

use mm_client::{Channel, ChannelId, Session, TeamId, UserId};
use serde::{Deserialize, Serialize};

use super::{read_json, write_json, PersistError};

/// Where the user was when the client last exited.
///
/// Advisory only: [`LastRunState::is_valid_for`] must hold before the
/// channel id is trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastRunState {
    /// Server hostname of the session that saved this.
    pub host: String,
    /// Server port of the session that saved this.
    pub port: u16,
    /// Account that saved this.
    pub user_id: UserId,
    /// Team that was open.
    pub team_id: TeamId,
    /// Channel that was open.
    pub channel_id: ChannelId,
}

impl LastRunState {
    /// Whether this record belongs to the live session and still points at
    /// one of `channels`.
    pub fn is_valid_for(
        &self,
        host: &str,
        port: u16,
        session: &Session,
        team_id: &TeamId,
        channels: &[Channel],
    ) -> bool {
        self.host == host
            && self.port == port
            && self.user_id == session.user_id
            && &self.team_id == team_id
            && channels.iter().any(|c| c.id == self.channel_id)
    }
}

/// Storage for [`LastRunState`], one record per team.
pub trait LastRunStore: Send + Sync {
    /// Reads the record saved for `team_id`.
    fn read(&self, team_id: &TeamId) -> Result<LastRunState, PersistError>;

    /// Saves `state`, replacing any record for the same team.
    fn save(&self, state: &LastRunState) -> Result<(), PersistError>;
}

/// JSON files named `last_run_state_<team_id>.json` in one directory.
#[derive(Debug, Clone)]
pub struct FileLastRunStore {
    dir: PathBuf,
}

impl FileLastRunStore {
    /// Store rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// File that holds the record for `team_id`.
    pub fn path_for(&self, team_id: &TeamId) -> PathBuf {
        self.dir.join(format!("last_run_state_{team_id}.json"))
    }
}

impl LastRunStore for FileLastRunStore {
    fn read(&self, team_id: &TeamId) -> Result<LastRunState, PersistError> {
        read_json(&self.path_for(team_id))
    }

    fn save(&self, state: &LastRunState) -> Result<(), PersistError> {
        write_json(&self.path_for(&state.team_id), state)
    }
}
