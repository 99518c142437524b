//! # mm-client
//!
//! A small blocking client for the parts of the Mattermost REST API a
//! terminal client needs while starting up: login, team and channel
//! membership, preferences, and user presence.
//!
//! ## Features
//!
//! - Pooled HTTP transport with fixed pool parameters ([`PoolConfig`])
//! - Failure classification that separates name resolution, connect, local
//!   I/O and server-side rejections ([`ApiError`])
//! - Typed response structures for every endpoint used
//!
//! ## Example
//!
//! ```rust,ignore
//! use mm_client::{Connection, ConnectionData, Login, TransportKind};
//!
//! let data = ConnectionData::new("chat.example.com", 443, TransportKind::Secure);
//! let conn = Connection::open(&data)?;
//! let (session, me) = conn.login(&Login::new("alice", "hunter2"))?;
//! for team in conn.my_teams(&session)? {
//!     println!("{}", team.display_name);
//! }
//! ```

pub mod connection;
pub mod error;
pub mod types;

mod client;

pub use connection::{Connection, ConnectionData, PoolConfig, TransportKind};
pub use error::ApiError;
pub use types::{
    Channel, ChannelId, ChannelType, Login, Preference, Presence, Session, Team, TeamId, User,
    UserId, UserStatus, TOWN_SQUARE,
};
