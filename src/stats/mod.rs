//! Player stat vocabulary: user-facing stat names, their canonical provider ids, and how a
//! stat value is computed from a player's stat line.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::domain::{PropDirection, StatRecord};
use crate::resolver::normalize;

/// How a prop on this stat is offered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatKind {
    /// Numeric line with over/under sides.
    OverUnder,
    /// Something either happens or not (anytime scorer, double-double).
    YesNo,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CanonicalStat {
    pub id: String,
    pub kind: StatKind,
    /// Whether the name came from the alias table rather than the underscore fallback.
    pub known: bool,
}

const TOUCHDOWNS: &str = "touchdowns";
const DOUBLE_DOUBLE: &str = "double_double";
const TRIPLE_DOUBLE: &str = "triple_double";

/// Scoring categories that make up an anytime touchdown. Passing TDs are credited to the
/// receiver, not the passer.
const TOUCHDOWN_CATEGORIES: &[&str] = &[
    "rushing_touchdowns",
    "receiving_touchdowns",
    "kick_return_touchdowns",
    "punt_return_touchdowns",
    "fumble_return_touchdowns",
    "interception_return_touchdowns",
    "defensive_touchdowns",
];

/// Counting stats that contribute to double/triple-doubles.
const DOUBLE_CATEGORIES: &[&str] = &["points", "rebounds", "assists", "steals", "blocks"];

static ALIASES: Lazy<HashMap<&'static str, (&'static str, StatKind)>> = Lazy::new(|| {
    use StatKind::*;
    let entries: &[(&[&str], &str, StatKind)] = &[
        (&["points", "pts", "total points"], "points", OverUnder),
        (&["rebounds", "reb", "rebs", "total rebounds"], "rebounds", OverUnder),
        (&["assists", "ast", "asts"], "assists", OverUnder),
        (&["steals", "stl"], "steals", OverUnder),
        (&["blocks", "blk", "blocked shots"], "blocks", OverUnder),
        (&["turnovers", "tov"], "turnovers", OverUnder),
        (
            &["three pointers made", "3 pointers made", "threes", "threes made", "3pm", "made threes"],
            "three_pointers_made",
            OverUnder,
        ),
        (
            &["pra", "pts+reb+ast", "points+rebounds+assists", "points + rebounds + assists", "points rebounds assists"],
            "points+rebounds+assists",
            OverUnder,
        ),
        (&["pr", "pts+reb", "points+rebounds", "points + rebounds", "points rebounds"], "points+rebounds", OverUnder),
        (&["pa", "pts+ast", "points+assists", "points + assists", "points assists"], "points+assists", OverUnder),
        (&["ra", "reb+ast", "rebounds+assists", "rebounds + assists", "rebounds assists"], "rebounds+assists", OverUnder),
        (&["steals+blocks", "steals + blocks", "stocks"], "steals+blocks", OverUnder),
        (&["double double", "doubledouble"], DOUBLE_DOUBLE, YesNo),
        (&["triple double", "tripledouble"], TRIPLE_DOUBLE, YesNo),
        (&["passing yards", "pass yds", "pass yards"], "passing_yards", OverUnder),
        (&["passing touchdowns", "passing tds", "pass tds"], "passing_touchdowns", OverUnder),
        (&["passing attempts", "pass attempts"], "passing_attempts", OverUnder),
        (&["completions", "passing completions", "pass completions"], "passing_completions", OverUnder),
        (&["interceptions", "interceptions thrown", "passing interceptions"], "passing_interceptions", OverUnder),
        (&["rushing yards", "rush yds", "rush yards"], "rushing_yards", OverUnder),
        (&["rushing attempts", "rush attempts", "carries"], "rushing_attempts", OverUnder),
        (&["receiving yards", "rec yds", "rec yards"], "receiving_yards", OverUnder),
        (&["receptions", "catches"], "receptions", OverUnder),
        (
            &["rushing + receiving yards", "rushing+receiving yards", "rush+rec yds", "rush + rec yards"],
            "rushing_yards+receiving_yards",
            OverUnder,
        ),
        (
            &["anytime td", "anytime touchdown", "anytime td scorer", "anytime touchdown scorer", "touchdowns", "td scorer"],
            TOUCHDOWNS,
            YesNo,
        ),
        (&["goals", "goals scored"], "goals", OverUnder),
        (&["anytime goal scorer", "anytime goal", "to score a goal"], "goals", YesNo),
        (&["shots on goal", "sog"], "shots_on_goal", OverUnder),
        (&["saves", "goalie saves"], "saves", OverUnder),
        (&["hits"], "hits", OverUnder),
        (&["total bases", "bases"], "total_bases", OverUnder),
        (&["home runs", "hr", "to hit a home run"], "home_runs", OverUnder),
        (&["rbis", "rbi", "runs batted in"], "rbi", OverUnder),
        (&["strikeouts", "pitcher strikeouts", "ks"], "strikeouts", OverUnder),
    ];

    let mut map = HashMap::new();
    for (aliases, id, kind) in entries {
        for alias in *aliases {
            map.insert(*alias, (*id, *kind));
        }
    }
    map
});

/// Map free-text stat names ("Passing Yards", "PRA") to canonical stat ids.
///
/// Unmapped names fall back to the normalized text with spaces as underscores and are
/// treated as over/under stats.
pub fn canonical_stat(text: &str) -> CanonicalStat {
    let normalized = normalize(text);
    if let Some((id, kind)) = ALIASES.get(normalized.as_str()) {
        return CanonicalStat {
            id: (*id).to_string(),
            kind: *kind,
            known: true,
        };
    }

    let id = normalized
        .replace(" + ", "+")
        .replace("+ ", "+")
        .replace(" +", "+")
        .replace(' ', "_");
    CanonicalStat {
        known: is_known_stat_id(&id),
        id,
        kind: StatKind::OverUnder,
    }
}

/// Whether `id` is one of the canonical ids the alias table produces.
pub fn is_known_stat_id(id: &str) -> bool {
    ALIASES.values().any(|(known, _)| *known == id)
}

/// Align a submitted direction with the stat's market: over/under on a yes/no stat reads
/// as yes/no, and the reverse.
pub fn coerce_direction(direction: PropDirection, kind: StatKind) -> PropDirection {
    match (kind, direction) {
        (StatKind::YesNo, PropDirection::Over) => PropDirection::Yes,
        (StatKind::YesNo, PropDirection::Under) => PropDirection::No,
        (StatKind::OverUnder, PropDirection::Yes) => PropDirection::Over,
        (StatKind::OverUnder, PropDirection::No) => PropDirection::Under,
        (_, same) => same,
    }
}

/// Value of `stat_id` for one player's stat line, or `None` when it cannot be computed yet.
///
/// A value published under the exact id always wins. Otherwise composite ids
/// (`points+rebounds+assists`) are summed from their parts, anytime touchdowns from the
/// scoring categories, and double/triple-doubles derived from the counting stats.
pub fn compute_player_stat_value(stat_id: &str, record: &StatRecord) -> Option<f64> {
    if let Some(value) = record.get(stat_id) {
        return Some(*value);
    }

    if stat_id.contains('+') {
        return stat_id
            .split('+')
            .map(|part| compute_player_stat_value(part.trim(), record))
            .sum::<Option<f64>>();
    }

    match stat_id {
        TOUCHDOWNS => touchdowns(record),
        DOUBLE_DOUBLE => doubles_count(record).map(|n| if n >= 2 { 1.0 } else { 0.0 }),
        TRIPLE_DOUBLE => doubles_count(record).map(|n| if n >= 3 { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn touchdowns(record: &StatRecord) -> Option<f64> {
    let mut found = false;
    let mut total = 0.0;
    for category in TOUCHDOWN_CATEGORIES {
        if let Some(value) = record.get(*category) {
            found = true;
            total += value;
        }
    }
    found.then_some(total)
}

/// Number of counting categories in double digits. Needs points, rebounds and assists.
fn doubles_count(record: &StatRecord) -> Option<usize> {
    if !["points", "rebounds", "assists"]
        .iter()
        .all(|k| record.contains_key(*k))
    {
        return None;
    }
    Some(
        DOUBLE_CATEGORIES
            .iter()
            .filter_map(|k| record.get(*k))
            .filter(|v| **v >= 10.0)
            .count(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, f64)]) -> StatRecord {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn aliases_map_to_canonical_ids() {
        let pra = canonical_stat("PRA");
        assert_eq!(pra.id, "points+rebounds+assists");
        assert_eq!(pra.kind, StatKind::OverUnder);

        assert_eq!(canonical_stat("Passing Yards").id, "passing_yards");
        assert_eq!(canonical_stat("Anytime TD Scorer").kind, StatKind::YesNo);
        assert_eq!(canonical_stat("Double-Double").id, DOUBLE_DOUBLE);
        assert!(canonical_stat("rebs").known);
    }

    #[test]
    fn unknown_names_fall_back_to_underscores() {
        let stat = canonical_stat("Fantasy Score");
        assert_eq!(stat.id, "fantasy_score");
        assert_eq!(stat.kind, StatKind::OverUnder);
        assert!(!stat.known);

        assert_eq!(canonical_stat("Blocks + Turnovers").id, "blocks+turnovers");
    }

    #[test]
    fn composite_sum() {
        let stats = record(&[("points", 20.0), ("rebounds", 5.0), ("assists", 7.0)]);
        assert_eq!(compute_player_stat_value("points+rebounds+assists", &stats), Some(32.0));
        assert_eq!(compute_player_stat_value("points+steals", &stats), None);
    }

    #[test]
    fn touchdowns_sum_scoring_categories() {
        let stats = record(&[("rushing_touchdowns", 1.0), ("receiving_touchdowns", 1.0), ("passing_touchdowns", 3.0)]);
        assert_eq!(compute_player_stat_value(TOUCHDOWNS, &stats), Some(2.0));
        assert_eq!(compute_player_stat_value(TOUCHDOWNS, &record(&[("passing_yards", 250.0)])), None);
    }

    #[test]
    fn derived_doubles() {
        let stats = record(&[("points", 24.0), ("rebounds", 11.0), ("assists", 9.0)]);
        assert_eq!(compute_player_stat_value(DOUBLE_DOUBLE, &stats), Some(1.0));
        assert_eq!(compute_player_stat_value(TRIPLE_DOUBLE, &stats), Some(0.0));
        assert_eq!(compute_player_stat_value(DOUBLE_DOUBLE, &record(&[("points", 30.0)])), None);
    }

    #[test]
    fn directions_follow_stat_kind() {
        assert_eq!(coerce_direction(PropDirection::Over, StatKind::YesNo), PropDirection::Yes);
        assert_eq!(coerce_direction(PropDirection::No, StatKind::OverUnder), PropDirection::Under);
        assert_eq!(coerce_direction(PropDirection::Under, StatKind::OverUnder), PropDirection::Under);
    }

    #[test]
    fn published_value_wins() {
        let stats = record(&[("double_double", 0.0), ("points", 24.0), ("rebounds", 11.0), ("assists", 1.0)]);
        assert_eq!(compute_player_stat_value(DOUBLE_DOUBLE, &stats), Some(0.0));
    }
}
