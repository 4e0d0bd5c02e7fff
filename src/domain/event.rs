use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stat id the provider uses for team-level markets (moneyline/spread/total).
pub const TEAM_POINTS_STAT: &str = "points";

/// Period id of full-game markets; the only period this engine grades.
pub const FULL_GAME_PERIOD: &str = "game";

/// Stat entity of game-wide quotes such as the full-game total.
pub const GAME_ENTITY: &str = "all";

/// Per-player stat line, stat id -> value.
pub type StatRecord = HashMap<String, f64>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventStatus {
    pub started: bool,
    pub live: bool,
    pub finalized: bool,
    pub cancelled: bool,
}

impl EventStatus {
    /// Any sign that play has begun, as far as bet creation is concerned.
    pub fn in_play_or_done(&self) -> bool {
        self.started || self.live || self.finalized
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamNames {
    pub long: Option<String>,
    pub medium: Option<String>,
    pub short: Option<String>,
}

impl TeamNames {
    pub fn variants(&self) -> impl Iterator<Item = &str> {
        [&self.long, &self.medium, &self.short]
            .into_iter()
            .filter_map(|n| n.as_deref())
    }

    /// Best name for logs and error messages.
    pub fn display(&self) -> &str {
        self.variants().next().unwrap_or("unknown team")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: Option<String>,
    pub names: TeamNames,
    pub score: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamSide {
    Home,
    Away,
}

impl TeamSide {
    pub fn other(self) -> Self {
        match self {
            TeamSide::Home => TeamSide::Away,
            TeamSide::Away => TeamSide::Home,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TeamSide::Home => "home",
            TeamSide::Away => "away",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub display_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub alias: Option<String>,
}

impl Player {
    /// Display name, "first last", and alias, whichever are present.
    pub fn name_variants(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(3);
        if let Some(name) = &self.display_name {
            out.push(name.clone());
        }
        if let (Some(first), Some(last)) = (&self.first_name, &self.last_name) {
            out.push(format!("{first} {last}"));
        }
        if let Some(alias) = &self.alias {
            out.push(alias.clone());
        }
        out
    }
}

/// Market family of a quote, mirroring the provider's bet type ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetType {
    /// `ml`
    Moneyline,
    /// `sp`
    Spread,
    /// `ou`
    OverUnder,
    /// `yn`
    YesNo,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OddSide {
    Home,
    Away,
    Over,
    Under,
    Yes,
    No,
}

impl From<TeamSide> for OddSide {
    fn from(side: TeamSide) -> Self {
        match side {
            TeamSide::Home => OddSide::Home,
            TeamSide::Away => OddSide::Away,
        }
    }
}

/// One alternate line offered by a bookmaker.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AltLine {
    pub line: Option<f64>,
    pub price: Option<f64>,
}

/// A single bookmaker's view of a market. Prices are American.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BookmakerQuote {
    pub price: Option<f64>,
    pub line: Option<f64>,
    pub available: bool,
    pub alt_lines: Vec<AltLine>,
}

/// A provider quote. `book_*` / `fair_*` are the canonical consensus values; `line` is the
/// spread for spread markets and the total for over/under markets.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Odd {
    pub id: String,
    pub bet_type: BetType,
    pub period: String,
    pub side: OddSide,
    pub player_id: Option<String>,
    pub stat_id: String,
    /// Whose stat is quoted: [`GAME_ENTITY`], `home` / `away`, or a player id.
    pub stat_entity: Option<String>,
    pub market_name: Option<String>,
    pub book_price: Option<f64>,
    pub fair_price: Option<f64>,
    pub book_line: Option<f64>,
    pub fair_line: Option<f64>,
    pub bookmakers: BTreeMap<String, BookmakerQuote>,
}

impl Odd {
    pub fn is_full_game(&self) -> bool {
        self.period == FULL_GAME_PERIOD
    }

    /// Whether the quote is on `entity`'s stat. A quote without an entity matches any.
    pub fn is_on_entity(&self, entity: &str) -> bool {
        self.stat_entity
            .as_deref()
            .map_or(true, |e| e.eq_ignore_ascii_case(entity))
    }
}

/// Read-only snapshot of a sporting event as published by the provider.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub league: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub status: EventStatus,
    pub home: Team,
    pub away: Team,
    pub players: BTreeMap<String, Player>,
    pub player_stats: HashMap<String, StatRecord>,
    pub odds: Vec<Odd>,
}

impl Event {
    pub fn team(&self, side: TeamSide) -> &Team {
        match side {
            TeamSide::Home => &self.home,
            TeamSide::Away => &self.away,
        }
    }

    pub fn score(&self, side: TeamSide) -> Option<f64> {
        self.team(side).score
    }

    /// Both final scores, home first.
    pub fn scores(&self) -> Option<(f64, f64)> {
        Some((self.home.score?, self.away.score?))
    }

    pub fn stats_for(&self, player_id: &str) -> Option<&StatRecord> {
        self.player_stats.get(player_id)
    }

    /// Whether the provider knows this player id, either as a roster entry or a stat line.
    pub fn knows_player(&self, player_id: &str) -> bool {
        self.players.contains_key(player_id) || self.player_stats.contains_key(player_id)
    }

    pub fn matchup(&self) -> String {
        format!("{} @ {}", self.away.names.display(), self.home.names.display())
    }
}
