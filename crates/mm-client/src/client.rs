//! Mattermost REST endpoints used during startup and by background workers.
//!
//! All calls are blocking request/response. Callers running on an async
//! runtime should move them onto the blocking pool.

use reqwest::blocking::{RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::connection::Connection;
use crate::error::ApiError;
use crate::types::{Channel, Login, Preference, Session, Team, TeamId, User, UserId, UserStatus};

/// Header carrying the session token in login responses.
const TOKEN_HEADER: &str = "Token";

impl Connection {
    /// `POST /api/v4/users/login`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::LoginRejected`] with the server's message when the
    /// credentials are refused, or a transport error variant otherwise.
    pub fn login(&self, login: &Login) -> Result<(Session, User), ApiError> {
        let response = self
            .http
            .post(self.url("/api/v4/users/login"))
            .json(login)
            .send()
            .map_err(|e| ApiError::from_transport(&e))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.text().unwrap_or_default();
            return Err(match status {
                400 | 401 | 403 => ApiError::LoginRejected {
                    status,
                    message: rejection_message(&body),
                },
                _ => status_error(status),
            });
        }

        let token = response
            .headers()
            .get(TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .ok_or(ApiError::MissingToken)?;
        let user: User = response.json().map_err(|e| ApiError::from_transport(&e))?;
        let session = Session {
            token,
            user_id: user.id.clone(),
        };
        Ok((session, user))
    }

    /// `GET /api/v4/users/me/teams`
    pub fn my_teams(&self, session: &Session) -> Result<Vec<Team>, ApiError> {
        let request = self.http.get(self.url("/api/v4/users/me/teams"));
        self.send_json(request, session)
    }

    /// `GET /api/v4/users/me/teams/{team_id}/channels`
    pub fn my_channels(&self, session: &Session, team_id: &TeamId) -> Result<Vec<Channel>, ApiError> {
        let path = format!("/api/v4/users/me/teams/{team_id}/channels");
        let request = self.http.get(self.url(&path));
        self.send_json(request, session)
    }

    /// `GET /api/v4/users/me/preferences`
    pub fn my_preferences(&self, session: &Session) -> Result<Vec<Preference>, ApiError> {
        let request = self.http.get(self.url("/api/v4/users/me/preferences"));
        self.send_json(request, session)
    }

    /// `POST /api/v4/users/status/ids`
    pub fn statuses_by_ids(
        &self,
        session: &Session,
        user_ids: &[UserId],
    ) -> Result<Vec<UserStatus>, ApiError> {
        let request = self
            .http
            .post(self.url("/api/v4/users/status/ids"))
            .json(user_ids);
        self.send_json(request, session)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        session: &Session,
    ) -> Result<T, ApiError> {
        let response = request
            .bearer_auth(&session.token)
            .send()
            .map_err(|e| ApiError::from_transport(&e))?;
        read_json(response)
    }
}

/// Map a response to its decoded body, handling error status codes.
fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status().as_u16();
    match status {
        200..=299 => response.json().map_err(|e| ApiError::from_transport(&e)),
        _ => Err(status_error(status)),
    }
}

fn status_error(status: u16) -> ApiError {
    match status {
        401 => ApiError::Unauthorized,
        500..=599 => ApiError::Server(status),
        _ => ApiError::Unexpected(status),
    }
}

/// Extracts the `message` field of a Mattermost error body.
fn rejection_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "login failed".to_string()
            } else {
                trimmed.to_string()
            }
        })
}
