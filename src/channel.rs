//! Context (channel) selection for the chosen team.
//!
//! The initial channel is picked with an ordered fallback chain:
//!
//! 1. the channel recorded in a valid [`LastRunState`] for this team
//! 2. the team's `town-square` channel, matched by its stable name
//!
//! If the active rule matches nothing the town-square rule is applied
//! instead. If that matches nothing too, the server returned a team with no
//! default channel and selection fails with
//! [`BootstrapError::NoInitialChannel`] rather than guessing.

use std::collections::HashSet;

use mm_client::{Channel, ChannelId, ChannelType, Session, Team, TeamId};
use tracing::{debug, info, warn};

use crate::bootstrap::BootstrapError;
use crate::persist::{LastRunState, LastRunStore, PersistError};
use crate::server::ServerApi;

/// Client-side view of a channel's metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientChannel {
    /// Channel identifier.
    pub id: ChannelId,
    /// Owning team, absent for direct and group messages.
    pub team_id: Option<TeamId>,
    /// Stable designator.
    pub name: String,
    /// Name shown to the user.
    pub display_name: String,
    /// Channel kind.
    pub channel_type: ChannelType,
    /// Header text.
    pub header: String,
    /// Purpose text.
    pub purpose: String,
    /// Milliseconds since the epoch of the latest post.
    pub last_post_at: i64,
    /// Total posts in the channel.
    pub total_msg_count: i64,
}

impl From<&Channel> for ClientChannel {
    fn from(channel: &Channel) -> Self {
        Self {
            id: channel.id.clone(),
            team_id: channel.team_id.clone(),
            name: channel.name.clone(),
            display_name: if channel.display_name.is_empty() {
                channel.name.clone()
            } else {
                channel.display_name.clone()
            },
            channel_type: channel.channel_type,
            header: channel.header.clone(),
            purpose: channel.purpose.clone(),
            last_post_at: channel.last_post_at,
            total_msg_count: channel.total_msg_count,
        }
    }
}

/// Rule used to pick the initial channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelPredicate {
    /// The channel with this id.
    LastViewed(ChannelId),
    /// The team's default channel.
    TownSquare,
}

impl ChannelPredicate {
    /// Whether `channel` satisfies this rule.
    pub fn matches(&self, channel: &Channel) -> bool {
        match self {
            Self::LastViewed(id) => &channel.id == id,
            Self::TownSquare => channel.is_town_square(),
        }
    }
}

/// Live identity a persisted record is checked against.
#[derive(Debug, Clone, Copy)]
pub struct LiveIdentity<'a> {
    /// Hostname the session is connected to.
    pub host: &'a str,
    /// Port the session is connected to.
    pub port: u16,
    /// The authenticated session.
    pub session: &'a Session,
}

/// Outcome of context selection.
#[derive(Debug, Clone)]
pub struct ContextSelection {
    /// The channel the client opens first.
    pub initial: ClientChannel,
    /// Every channel the winning rule matched, deduplicated by id.
    pub matched: Vec<ClientChannel>,
    /// All channels fetched for the team, in deterministic order.
    pub channels: Vec<Channel>,
    /// Rule that produced `initial`.
    pub predicate: ChannelPredicate,
}

/// Chooses the rule to start with from the persisted record, if any.
///
/// Read errors and stale records fall back to [`ChannelPredicate::TownSquare`].
pub fn initial_predicate(
    store: Option<&dyn LastRunStore>,
    identity: LiveIdentity<'_>,
    team_id: &TeamId,
    channels: &[Channel],
) -> ChannelPredicate {
    let Some(store) = store else {
        debug!("last-run state ignored");
        return ChannelPredicate::TownSquare;
    };
    match store.read(team_id) {
        Ok(state) => predicate_for(&state, identity, team_id, channels),
        Err(PersistError::Missing { .. }) => {
            debug!(team_id = %team_id, "no last-run state");
            ChannelPredicate::TownSquare
        }
        Err(e) => {
            warn!(error = %e, "could not load last-run state");
            ChannelPredicate::TownSquare
        }
    }
}

fn predicate_for(
    state: &LastRunState,
    identity: LiveIdentity<'_>,
    team_id: &TeamId,
    channels: &[Channel],
) -> ChannelPredicate {
    if state.is_valid_for(identity.host, identity.port, identity.session, team_id, channels) {
        debug!(channel_id = %state.channel_id, "restoring last viewed channel");
        ChannelPredicate::LastViewed(state.channel_id.clone())
    } else {
        info!("last-run state does not match this session, ignoring it");
        ChannelPredicate::TownSquare
    }
}

/// Applies `predicate` to `channels`, falling back to town-square.
///
/// `channels` must already be in deterministic order; the first match is
/// the initial channel.
///
/// # Errors
///
/// Returns [`BootstrapError::NoInitialChannel`] when neither rule matches.
pub fn apply_predicate(
    team: &Team,
    channels: &[Channel],
    predicate: ChannelPredicate,
) -> Result<(ChannelPredicate, Vec<ClientChannel>), BootstrapError> {
    let mut predicate = predicate;
    let mut matched = collect_matches(channels, &predicate);
    if matched.is_empty() && predicate != ChannelPredicate::TownSquare {
        info!("last viewed channel not found, falling back to town-square");
        predicate = ChannelPredicate::TownSquare;
        matched = collect_matches(channels, &predicate);
    }
    if matched.is_empty() {
        return Err(BootstrapError::NoInitialChannel {
            team: team.display_name.clone(),
        });
    }
    if matched.len() > 1 {
        warn!(
            count = matched.len(),
            "several channels match the initial channel rule, using the first"
        );
    }
    Ok((predicate, matched))
}

fn collect_matches(channels: &[Channel], predicate: &ChannelPredicate) -> Vec<ClientChannel> {
    let mut seen = HashSet::new();
    channels
        .iter()
        .filter(|c| predicate.matches(c))
        .filter(|c| seen.insert(c.id.clone()))
        .map(ClientChannel::from)
        .collect()
}

/// Fetches the team's channels and picks the initial one.
///
/// # Errors
///
/// - [`BootstrapError::Api`] when the channel request fails
/// - [`BootstrapError::NoInitialChannel`] when no rule yields a channel
pub fn select_context(
    server: &dyn ServerApi,
    identity: LiveIdentity<'_>,
    team: &Team,
    last_run: Option<&dyn LastRunStore>,
) -> Result<ContextSelection, BootstrapError> {
    let mut channels = server
        .my_channels(identity.session, &team.id)
        .map_err(|source| BootstrapError::Api {
            context: "fetching channels",
            source,
        })?;
    channels.sort_by(|a, b| a.id.cmp(&b.id));
    debug!(team_id = %team.id, count = channels.len(), "fetched channels");

    let predicate = initial_predicate(last_run, identity, &team.id, &channels);
    let (predicate, matched) = apply_predicate(team, &channels, predicate)?;
    let initial = matched[0].clone();
    info!(channel = %initial.display_name, "selected initial channel");

    Ok(ContextSelection {
        initial,
        matched,
        channels,
        predicate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mm_client::TOWN_SQUARE;

    fn team() -> Team {
        Team {
            id: TeamId::from("t1"),
            name: "core".to_string(),
            display_name: "Core".to_string(),
        }
    }

    fn channel(id: &str, name: &str) -> Channel {
        Channel {
            id: ChannelId::from(id),
            team_id: Some(TeamId::from("t1")),
            name: name.to_string(),
            display_name: String::new(),
            channel_type: ChannelType::Open,
            header: String::new(),
            purpose: String::new(),
            last_post_at: 0,
            total_msg_count: 0,
        }
    }

    #[test]
    fn town_square_matches_by_name_not_display_name() {
        let mut renamed = channel("c1", TOWN_SQUARE);
        renamed.display_name = "Lobby".to_string();
        let mut impostor = channel("c2", "lobby");
        impostor.display_name = "Town Square".to_string();

        assert!(ChannelPredicate::TownSquare.matches(&renamed));
        assert!(!ChannelPredicate::TownSquare.matches(&impostor));
    }

    #[test]
    fn missing_last_viewed_falls_back_to_town_square() {
        let channels = vec![channel("c1", TOWN_SQUARE), channel("c2", "dev")];
        let (predicate, matched) = apply_predicate(
            &team(),
            &channels,
            ChannelPredicate::LastViewed(ChannelId::from("gone")),
        )
        .expect("town-square should be found");
        assert_eq!(predicate, ChannelPredicate::TownSquare);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id.as_str(), "c1");
    }

    #[test]
    fn duplicate_channels_are_deduplicated_by_id() {
        let channels = vec![channel("c1", TOWN_SQUARE), channel("c1", TOWN_SQUARE)];
        let (_, matched) = apply_predicate(&team(), &channels, ChannelPredicate::TownSquare)
            .expect("town-square should be found");
        assert_eq!(matched.len(), 1);
    }

    #[test]
    fn no_match_at_all_is_an_error() {
        let channels = vec![channel("c2", "dev"), channel("c3", "random")];
        let result = apply_predicate(
            &team(),
            &channels,
            ChannelPredicate::LastViewed(ChannelId::from("c9")),
        );
        assert!(
            matches!(result, Err(BootstrapError::NoInitialChannel { ref team }) if team == "Core"),
            "expected NoInitialChannel, got {result:?}"
        );
    }

    #[test]
    fn display_name_falls_back_to_name() {
        let client = ClientChannel::from(&channel("c1", "dev"));
        assert_eq!(client.display_name, "dev");
    }
}
