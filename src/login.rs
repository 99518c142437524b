//! Session establishment: the connect/login/re-prompt loop.
//!
//! The loop is an explicit state machine:
//!
//! ```text
//! Connecting --ok--> Authenticating --ok--> Succeeded
//!     |                   |
//!     +-------err---------+--> RetryPrompt --new credentials--> Connecting
//! ```
//!
//! There is no automatic retry and no attempt limit. Every failure goes back
//! to the user with a [`LoginFailure`] tag; the loop ends on success or when
//! the prompt reports [`PromptAborted`].

use mm_client::{ApiError, ConnectionData, Login, Session, User};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::schema::ServerConfig;
use crate::credentials::{CredentialDraft, CredentialPrompt, Credentials, PromptAborted};
use crate::server::{Connector, ServerHandle};

/// Why a login attempt failed, as shown to the user on re-prompt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoginFailure {
    /// The server hostname did not resolve.
    #[error("Could not resolve server hostname: {0}")]
    ResolveError(String),
    /// The server could not be reached.
    #[error("Could not connect to server: {0}")]
    ConnectError(String),
    /// Something failed on the local side of the connection.
    #[error("Local I/O error: {0}")]
    LocalIoError(String),
    /// Any other failure while authenticating.
    #[error("Authentication error: {0}")]
    OtherAuthError(String),
    /// The server refused the credentials; carries the server's message.
    #[error("Login failed: {0}")]
    LoginError(String),
}

impl LoginFailure {
    /// Short stable tag for logs.
    pub fn tag(&self) -> &'static str {
        match self {
            LoginFailure::ResolveError(_) => "resolve",
            LoginFailure::ConnectError(_) => "connect",
            LoginFailure::LocalIoError(_) => "local-io",
            LoginFailure::OtherAuthError(_) => "other-auth",
            LoginFailure::LoginError(_) => "login",
        }
    }
}

impl From<ApiError> for LoginFailure {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Resolve { .. } => LoginFailure::ResolveError(err.to_string()),
            ApiError::Connect(message) => LoginFailure::ConnectError(message),
            ApiError::Io(message) => LoginFailure::LocalIoError(message),
            ApiError::LoginRejected { message, .. } => LoginFailure::LoginError(message),
            ApiError::Http(_)
            | ApiError::Unauthorized
            | ApiError::MissingToken
            | ApiError::Server(_)
            | ApiError::Unexpected(_)
            | ApiError::Decode(_) => LoginFailure::OtherAuthError(err.to_string()),
        }
    }
}

/// The result of a successful login.
pub struct Established {
    /// Authenticated session.
    pub session: Session,
    /// The logged-in user.
    pub me: User,
    /// Pooled connection the session is bound to.
    pub server: ServerHandle,
    /// Where the connection points.
    pub connection: ConnectionData,
    /// Credentials that actually worked.
    pub credentials: Credentials,
    /// Number of connection attempts made, including the successful one.
    pub attempts: u32,
}

enum LoginState {
    Connecting(Credentials),
    Authenticating {
        credentials: Credentials,
        server: ServerHandle,
        connection: ConnectionData,
    },
    RetryPrompt {
        credentials: Credentials,
        failure: LoginFailure,
    },
    Succeeded(Established),
}

/// Runs the login loop until it succeeds or the user quits.
pub fn establish_session(
    server_config: &ServerConfig,
    initial: Credentials,
    connector: &dyn Connector,
    prompt: &mut dyn CredentialPrompt,
) -> Result<Established, PromptAborted> {
    let mut attempts = 0u32;
    let mut state = LoginState::Connecting(initial);

    loop {
        state = match state {
            LoginState::Succeeded(established) => return Ok(established),

            LoginState::Connecting(credentials) => {
                attempts += 1;
                let connection = server_config.connection_data(&credentials);
                debug!(
                    attempt = attempts,
                    host = %connection.host,
                    port = connection.port,
                    transport = connection.transport.scheme(),
                    "opening connection"
                );
                match connector.open(&connection) {
                    Ok(server) => LoginState::Authenticating {
                        credentials,
                        server,
                        connection,
                    },
                    Err(err) => LoginState::RetryPrompt {
                        credentials,
                        failure: err.into(),
                    },
                }
            }

            LoginState::Authenticating {
                credentials,
                server,
                connection,
            } => {
                let login = Login::new(credentials.username.clone(), credentials.password.clone());
                match server.login(&login) {
                    Ok((session, me)) => {
                        info!(user = %me.username, attempts, "logged in");
                        LoginState::Succeeded(Established {
                            session,
                            me,
                            server,
                            connection,
                            credentials,
                            attempts,
                        })
                    }
                    Err(err) => LoginState::RetryPrompt {
                        credentials,
                        failure: err.into(),
                    },
                }
            }

            LoginState::RetryPrompt {
                credentials,
                failure,
            } => {
                warn!(tag = failure.tag(), error = %failure, "login attempt failed");
                let revised = prompt.prompt(CredentialDraft::from(&credentials), Some(&failure))?;
                LoginState::Connecting(revised)
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_map_to_one_tag_each() {
        let cases = [
            (
                ApiError::Resolve {
                    host: "h".to_string(),
                    message: "nx".to_string(),
                },
                "resolve",
            ),
            (ApiError::Connect("refused".to_string()), "connect"),
            (ApiError::Io("broken pipe".to_string()), "local-io"),
            (ApiError::Http("bad request".to_string()), "other-auth"),
            (ApiError::MissingToken, "other-auth"),
            (ApiError::Server(502), "other-auth"),
            (
                ApiError::LoginRejected {
                    status: 401,
                    message: "nope".to_string(),
                },
                "login",
            ),
        ];
        for (err, tag) in cases {
            let failure = LoginFailure::from(err);
            assert_eq!(failure.tag(), tag, "wrong tag for {failure:?}");
        }
    }

    #[test]
    fn login_rejection_keeps_server_message_verbatim() {
        let failure = LoginFailure::from(ApiError::LoginRejected {
            status: 403,
            message: "Your account is locked".to_string(),
        });
        assert_eq!(
            failure,
            LoginFailure::LoginError("Your account is locked".to_string())
        );
    }
}
