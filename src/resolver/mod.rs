//! Free-text team and player matching against provider entities.
//!
//! Matching is containment based: a query matches a candidate name when, after
//! [`normalize`], either string equals or contains the other. Ambiguous inputs that match
//! both teams resolve to whichever side is checked first (home), which callers must not
//! rely on.

use crate::domain::{Event, PropSelection, Team, TeamSide};

/// Lowercase, drop everything but letters, digits, whitespace and `+`, collapse whitespace.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '+')
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Containment test on already-normalized strings. Empty input never matches.
fn contains_either_way(query: &str, candidate: &str) -> bool {
    if query.is_empty() || candidate.is_empty() {
        return false;
    }
    query == candidate || candidate.contains(query) || query.contains(candidate)
}

/// Entity matching used by the gateway, validator and grader.
pub trait NameResolver: Send + Sync {
    /// Whether `text` names this team.
    fn team_matches(&self, team: &Team, text: &str) -> bool;

    /// Provider id of the player named `name`, if any.
    fn find_player_key(&self, event: &Event, name: &str) -> Option<String>;

    /// Which side of the event `selection` refers to. Home is checked first.
    fn resolve_side(&self, event: &Event, selection: &str) -> Option<TeamSide> {
        [TeamSide::Home, TeamSide::Away]
            .into_iter()
            .find(|side| self.team_matches(event.team(*side), selection))
    }
}

/// Default resolver: normalized containment over long/medium/short team names and over
/// display name, "first last" and alias for players.
#[derive(Clone, Copy, Debug, Default)]
pub struct ContainmentResolver;

impl NameResolver for ContainmentResolver {
    fn team_matches(&self, team: &Team, text: &str) -> bool {
        let query = normalize(text);
        team.names
            .variants()
            .any(|name| contains_either_way(&query, &normalize(name)))
    }

    fn find_player_key(&self, event: &Event, name: &str) -> Option<String> {
        let query = normalize(name);
        if query.is_empty() {
            return None;
        }
        event
            .players
            .values()
            .find(|player| {
                player
                    .name_variants()
                    .iter()
                    .any(|variant| contains_either_way(&query, &normalize(variant)))
            })
            .map(|player| player.id.clone())
    }
}

/// Provider key for a prop's player: the stored key, then the legacy id, then a name
/// lookup. Stored ids only count when the event actually knows them.
pub fn player_key_for(resolver: &dyn NameResolver, event: &Event, prop: &PropSelection) -> Option<String> {
    [prop.player_key.as_deref(), prop.legacy_player_id.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|key| !key.is_empty() && event.knows_player(key))
        .map(str::to_string)
        .or_else(|| resolver.find_player_key(event, &prop.player_name))
}
