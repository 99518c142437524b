//! The remote server as seen by the rest of the client.
//!
//! [`ServerApi`] is the seam between startup/workers and the HTTP client so
//! that tests can script server behaviour. [`Connector`] opens a pooled
//! connection for a login attempt.

use std::sync::Arc;

use mm_client::{
    ApiError, Channel, Connection, ConnectionData, Login, Preference, Session, Team, TeamId, User,
    UserId, UserStatus,
};

/// Synchronous request/response operations used by this client.
pub trait ServerApi: Send + Sync {
    /// Authenticates and returns the session plus the logged-in user.
    fn login(&self, login: &Login) -> Result<(Session, User), ApiError>;

    /// Teams the session's user belongs to.
    fn my_teams(&self, session: &Session) -> Result<Vec<Team>, ApiError>;

    /// Channels the session's user belongs to within `team_id`.
    fn my_channels(&self, session: &Session, team_id: &TeamId) -> Result<Vec<Channel>, ApiError>;

    /// Stored preferences of the session's user.
    fn my_preferences(&self, session: &Session) -> Result<Vec<Preference>, ApiError>;

    /// Presence of the given users.
    fn statuses(&self, session: &Session, user_ids: &[UserId]) -> Result<Vec<UserStatus>, ApiError>;
}

/// Shared handle to a connected server.
pub type ServerHandle = Arc<dyn ServerApi>;

/// Opens pooled connections.
pub trait Connector {
    /// Opens a connection described by `data`.
    fn open(&self, data: &ConnectionData) -> Result<ServerHandle, ApiError>;
}

/// Connector backed by the real HTTP client.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpConnector;

impl Connector for HttpConnector {
    fn open(&self, data: &ConnectionData) -> Result<ServerHandle, ApiError> {
        let connection = Connection::open(data)?;
        Ok(Arc::new(connection))
    }
}

impl ServerApi for Connection {
    fn login(&self, login: &Login) -> Result<(Session, User), ApiError> {
        Connection::login(self, login)
    }

    fn my_teams(&self, session: &Session) -> Result<Vec<Team>, ApiError> {
        Connection::my_teams(self, session)
    }

    fn my_channels(&self, session: &Session, team_id: &TeamId) -> Result<Vec<Channel>, ApiError> {
        Connection::my_channels(self, session, team_id)
    }

    fn my_preferences(&self, session: &Session) -> Result<Vec<Preference>, ApiError> {
        Connection::my_preferences(self, session)
    }

    fn statuses(&self, session: &Session, user_ids: &[UserId]) -> Result<Vec<UserStatus>, ApiError> {
        Connection::statuses_by_ids(self, session, user_ids)
    }
}
