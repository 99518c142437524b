//! Credential resolution.
//!
//! Turns the possibly incomplete `[server]` section of the configuration
//! into a complete [`Credentials`] value. When every field is already
//! present no interaction happens; otherwise the interactive prompt is
//! seeded with whatever the configuration does provide. Nothing here checks
//! whether a hostname is well formed or a password is right: that is left to
//! the connection attempt.

use std::fmt;

use thiserror::Error;

use crate::config::schema::ServerConfig;
use crate::login::LoginFailure;

/// A complete credential set, ready for a login attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Server hostname.
    pub hostname: String,
    /// Server port.
    pub port: u16,
    /// Login name or email.
    pub username: String,
    /// Account password.
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Returns the credentials only if every field is present and non-empty.
    pub fn from_config(server: &ServerConfig) -> Option<Self> {
        Some(Self {
            hostname: non_empty(server.host.as_deref())?.to_string(),
            port: server.port?,
            username: non_empty(server.user.as_deref())?.to_string(),
            password: non_empty(server.pass.as_deref())?.to_string(),
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Form contents used to seed the interactive prompt.
///
/// Missing values are empty strings, never absent, so the prompt always
/// has something to display.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialDraft {
    /// Hostname text.
    pub hostname: String,
    /// Port text.
    pub port: String,
    /// Username text.
    pub username: String,
    /// Password text.
    pub password: String,
}

impl fmt::Debug for CredentialDraft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialDraft")
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &if self.password.is_empty() { "" } else { "<redacted>" })
            .finish()
    }
}

impl CredentialDraft {
    /// Seeds a draft from whatever the configuration provides.
    pub fn from_config(server: &ServerConfig) -> Self {
        Self {
            hostname: server.host.clone().unwrap_or_default(),
            port: server.port.map(|p| p.to_string()).unwrap_or_default(),
            username: server.user.clone().unwrap_or_default(),
            password: server.pass.clone().unwrap_or_default(),
        }
    }
}

impl From<&Credentials> for CredentialDraft {
    fn from(credentials: &Credentials) -> Self {
        Self {
            hostname: credentials.hostname.clone(),
            port: credentials.port.to_string(),
            username: credentials.username.clone(),
            password: credentials.password.clone(),
        }
    }
}

/// The user quit the interactive prompt instead of submitting credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Login cancelled")]
pub struct PromptAborted;

/// Interactive credential collection.
///
/// Called once when the configuration is incomplete and again after every
/// failed login, in which case `failure` says what went wrong so the prompt
/// can show a targeted message.
pub trait CredentialPrompt {
    /// Shows the form seeded with `draft` and blocks until the user submits
    /// a complete credential set or quits.
    fn prompt(
        &mut self,
        draft: CredentialDraft,
        failure: Option<&LoginFailure>,
    ) -> Result<Credentials, PromptAborted>;
}

/// Produces a complete credential set, prompting only when needed.
pub fn resolve_credentials(
    server: &ServerConfig,
    prompt: &mut dyn CredentialPrompt,
) -> Result<Credentials, PromptAborted> {
    if let Some(credentials) = Credentials::from_config(server) {
        tracing::debug!(host = %credentials.hostname, "configuration has complete credentials");
        return Ok(credentials);
    }
    tracing::debug!("configuration credentials incomplete, prompting");
    prompt.prompt(CredentialDraft::from_config(server), None)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every draft it is shown and answers with a fixed value.
    struct RecordingPrompt {
        answer: Result<Credentials, PromptAborted>,
        seen: Vec<CredentialDraft>,
    }

    impl CredentialPrompt for RecordingPrompt {
        fn prompt(
            &mut self,
            draft: CredentialDraft,
            failure: Option<&LoginFailure>,
        ) -> Result<Credentials, PromptAborted> {
            assert!(failure.is_none(), "initial prompt should carry no failure");
            self.seen.push(draft);
            self.answer.clone()
        }
    }

    fn complete_server() -> ServerConfig {
        ServerConfig {
            host: Some("chat.example.com".to_string()),
            port: Some(443),
            user: Some("alice".to_string()),
            pass: Some("hunter2".to_string()),
            ..ServerConfig::default()
        }
    }

    fn typed_credentials() -> Credentials {
        Credentials {
            hostname: "typed.example.com".to_string(),
            port: 8065,
            username: "typed".to_string(),
            password: "typed-pw".to_string(),
        }
    }

    #[test]
    fn complete_config_skips_prompt() {
        let mut prompt = RecordingPrompt {
            answer: Err(PromptAborted),
            seen: Vec::new(),
        };
        let credentials =
            resolve_credentials(&complete_server(), &mut prompt).expect("fast path");
        assert!(prompt.seen.is_empty(), "prompt must not be invoked");
        assert_eq!(credentials.hostname, "chat.example.com");
        assert_eq!(credentials.port, 443);
        assert_eq!(credentials.username, "alice");
        assert_eq!(credentials.password, "hunter2");
    }

    #[test]
    fn missing_password_prompts_with_partial_values() {
        let server = ServerConfig {
            pass: None,
            ..complete_server()
        };
        let mut prompt = RecordingPrompt {
            answer: Ok(typed_credentials()),
            seen: Vec::new(),
        };
        let credentials = resolve_credentials(&server, &mut prompt).expect("prompted");
        assert_eq!(credentials, typed_credentials());
        assert_eq!(prompt.seen.len(), 1);
        let draft = &prompt.seen[0];
        assert_eq!(draft.hostname, "chat.example.com");
        assert_eq!(draft.port, "443");
        assert_eq!(draft.username, "alice");
        assert_eq!(draft.password, "", "absent fields are shown as empty");
    }

    #[test]
    fn empty_string_counts_as_missing() {
        let server = ServerConfig {
            user: Some(String::new()),
            ..complete_server()
        };
        assert!(Credentials::from_config(&server).is_none());
    }

    #[test]
    fn empty_config_prompts_with_empty_draft() {
        let mut prompt = RecordingPrompt {
            answer: Ok(typed_credentials()),
            seen: Vec::new(),
        };
        resolve_credentials(&ServerConfig::default(), &mut prompt).expect("prompted");
        assert_eq!(prompt.seen, vec![CredentialDraft::default()]);
    }

    #[test]
    fn aborted_prompt_propagates() {
        let mut prompt = RecordingPrompt {
            answer: Err(PromptAborted),
            seen: Vec::new(),
        };
        let result = resolve_credentials(&ServerConfig::default(), &mut prompt);
        assert_eq!(result, Err(PromptAborted));
    }

    #[test]
    fn debug_output_redacts_password() {
        let debug = format!("{:?}", typed_credentials());
        assert!(!debug.contains("typed-pw"));
        let draft = CredentialDraft::from(&typed_credentials());
        assert!(!format!("{draft:?}").contains("typed-pw"));
    }
}
