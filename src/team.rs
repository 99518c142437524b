//! Workspace (team) selection.

use mm_client::{Session, Team};
use tracing::{debug, info};

use crate::bootstrap::BootstrapError;
use crate::credentials::PromptAborted;
use crate::server::ServerApi;

/// Interactive choice among team memberships.
pub trait TeamChooser {
    /// Blocks until the user picks one of `candidates` or quits.
    ///
    /// `candidates` is never empty and is in display order.
    fn choose(&mut self, candidates: &[Team]) -> Result<Team, PromptAborted>;
}

/// Orders teams for display: by display name, case-insensitively, then id.
pub fn sort_teams(teams: &mut [Team]) {
    teams.sort_by(|a, b| {
        a.display_name
            .to_lowercase()
            .cmp(&b.display_name.to_lowercase())
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Picks the team to open.
///
/// With a configured name, the first membership (in display order) whose
/// `name` or `display_name` equals it exactly wins. Otherwise, or when
/// nothing matches, the user chooses among all memberships.
///
/// # Errors
///
/// - [`BootstrapError::NoTeams`] when the account has no memberships
/// - [`BootstrapError::Api`] when the membership request fails
/// - [`BootstrapError::Aborted`] when the user quits the chooser
pub fn select_team(
    server: &dyn ServerApi,
    session: &Session,
    configured: Option<&str>,
    chooser: &mut dyn TeamChooser,
) -> Result<Team, BootstrapError> {
    let mut teams = server
        .my_teams(session)
        .map_err(|source| BootstrapError::Api {
            context: "fetching team memberships",
            source,
        })?;
    if teams.is_empty() {
        return Err(BootstrapError::NoTeams);
    }
    sort_teams(&mut teams);

    if let Some(wanted) = configured {
        if let Some(team) = teams
            .iter()
            .find(|t| t.name == wanted || t.display_name == wanted)
        {
            info!(team = %team.display_name, "selected configured team");
            return Ok(team.clone());
        }
        info!(team = wanted, "configured team not found among memberships");
    }

    debug!(candidates = teams.len(), "asking user to choose a team");
    let team = chooser.choose(&teams)?;
    info!(team = %team.display_name, "selected team");
    Ok(team)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mm_client::TeamId;

    fn team(id: &str, display_name: &str) -> Team {
        Team {
            id: TeamId::from(id),
            name: display_name.to_lowercase(),
            display_name: display_name.to_string(),
        }
    }

    #[test]
    fn sort_is_case_insensitive_then_by_id() {
        let mut teams = vec![
            team("3", "beta"),
            team("2", "Alpha"),
            team("1", "alpha"),
        ];
        sort_teams(&mut teams);
        let ids: Vec<&str> = teams.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }
}
