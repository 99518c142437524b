//! mmterm library
//!
//! Startup and background work for a terminal Mattermost client: credential
//! resolution, the login loop, team and channel selection, the request and
//! event queues, and the supervised background workers. The result of
//! startup is an [`snapshot::ApplicationSnapshot`] for the interactive loop.
//!
//! # Platform Support
//!
//! Unix-like systems (Linux, macOS). The timezone monitor and masked
//! password entry assume a Unix terminal.

/// Startup sequence and its fatal errors.
pub mod bootstrap;

/// Initial channel selection.
pub mod channel;

/// Configuration file loading and schema.
pub mod config;

/// Credential resolution and the prompt interface.
pub mod credentials;

/// Events sent to the interactive loop.
pub mod events;

/// Log subscriber setup.
pub mod logging;

/// The login state machine.
pub mod login;

/// Saved last-run state and input history.
pub mod persist;

/// Terminal prompts.
pub mod prompt;

/// Background request queue.
pub mod queue;

/// Server interface used by startup and workers.
pub mod server;

/// The assembled application state.
pub mod snapshot;

/// Team selection.
pub mod team;

/// Colour themes.
pub mod theme;

/// Local timezone lookup.
pub mod timezone;

/// Users whose presence is tracked.
pub mod tracked;

/// Background workers and their supervisor.
pub mod workers;

pub use bootstrap::{initialize, BootstrapError, Collaborators};
pub use snapshot::ApplicationSnapshot;
