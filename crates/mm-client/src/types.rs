//! Type definitions for Mattermost API requests and responses.
//!
//! Only the fields the client reads are modelled; everything else in the
//! server's JSON is ignored by serde.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Well-known `name` of every team's default channel.
///
/// Display names are user-editable; this designator is not.
pub const TOWN_SQUARE: &str = "town-square";

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Returns the raw identifier string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

id_type!(
    /// Server-assigned team identifier.
    TeamId
);
id_type!(
    /// Server-assigned channel identifier.
    ChannelId
);
id_type!(
    /// Server-assigned user identifier.
    UserId
);

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

/// Login request body.
#[derive(Clone, Serialize)]
pub struct Login {
    /// Username or email address.
    pub login_id: String,
    /// Account password.
    pub password: String,
}

impl Login {
    /// Creates a login request for the given username and password.
    pub fn new(login_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login_id: login_id.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Login {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Login")
            .field("login_id", &self.login_id)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// An authenticated session: the token the server issued plus its owner.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    /// Bearer token returned in the `Token` header on login.
    pub token: String,
    /// Identity the token is bound to.
    pub user_id: UserId,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User identifier.
    pub id: UserId,
    /// Login name.
    pub username: String,
    /// Given name, possibly empty.
    #[serde(default)]
    pub first_name: String,
    /// Family name, possibly empty.
    #[serde(default)]
    pub last_name: String,
    /// Nickname, possibly empty.
    #[serde(default)]
    pub nickname: String,
}

// ---------------------------------------------------------------------------
// Teams and channels
// ---------------------------------------------------------------------------

/// A team the user is a member of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    /// Team identifier.
    pub id: TeamId,
    /// URL-safe team name, unique per server.
    pub name: String,
    /// Human-readable name.
    pub display_name: String,
}

/// Channel visibility / membership kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelType {
    /// Public channel (`O`).
    #[serde(rename = "O")]
    Open,
    /// Private channel (`P`).
    #[serde(rename = "P")]
    Private,
    /// Direct message between two users (`D`).
    #[serde(rename = "D")]
    Direct,
    /// Group message (`G`).
    #[serde(rename = "G")]
    Group,
}

/// A channel the user is a member of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Channel identifier.
    pub id: ChannelId,
    /// Owning team; empty for direct and group channels.
    #[serde(default)]
    pub team_id: Option<TeamId>,
    /// Stable designator (e.g. [`TOWN_SQUARE`]).
    pub name: String,
    /// Human-readable name.
    #[serde(default)]
    pub display_name: String,
    /// Channel kind.
    #[serde(rename = "type")]
    pub channel_type: ChannelType,
    /// Channel header text.
    #[serde(default)]
    pub header: String,
    /// Channel purpose text.
    #[serde(default)]
    pub purpose: String,
    /// Milliseconds since the epoch of the most recent post.
    #[serde(default)]
    pub last_post_at: i64,
    /// Total number of posts.
    #[serde(default)]
    pub total_msg_count: i64,
}

impl Channel {
    /// Returns `true` for the team's default channel.
    pub fn is_town_square(&self) -> bool {
        self.name == TOWN_SQUARE
    }
}

/// A stored user preference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preference {
    /// Owner of the preference.
    pub user_id: UserId,
    /// Preference category, e.g. `display_settings`.
    pub category: String,
    /// Preference name within the category.
    pub name: String,
    /// Stored value.
    pub value: String,
}

// ---------------------------------------------------------------------------
// Presence
// ---------------------------------------------------------------------------

/// Presence of a user as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    /// Actively connected.
    Online,
    /// Connected but idle.
    Away,
    /// Do not disturb.
    Dnd,
    /// Not connected.
    Offline,
    /// Any value this client does not know about.
    #[serde(other)]
    Unknown,
}

/// Presence entry for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStatus {
    /// User the status belongs to.
    pub user_id: UserId,
    /// Current presence.
    pub status: Presence,
}
