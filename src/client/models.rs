//! Provider wire payloads and their conversion into [`crate::domain::Event`].
//!
//! Every field is optional. Numbers arrive either as JSON numbers or numeric strings
//! (`"-110"`, `"+150"`, `"3.5"`); anything that does not parse is read as absent rather
//! than failing the whole event. Entries of the `players`, `odds` and `results.game` maps
//! are decoded one by one, so a malformed entry drops only itself.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use serde_with::{serde_as, DefaultOnError, DisplayFromStr, PickFirst};
use tracing::debug;

use crate::domain::{
    AltLine, BetType, BookmakerQuote, Event, EventStatus, Odd, OddSide, Player, StatRecord, Team,
    TeamNames, FULL_GAME_PERIOD, TEAM_POINTS_STAT,
};

/// Odd ids are shaped `stat-entity-period-betType-side`.
const ODD_ID_PARTS: usize = 5;

/// `{ success, data: [...] }` response wrapper. Events stay as raw JSON so one malformed
/// event cannot poison the rest of the page.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EventsEnvelope {
    pub success: Option<bool>,
    pub data: Vec<Value>,
    pub error: Option<String>,
}

#[serde_as]
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WireStatus {
    #[serde_as(as = "DefaultOnError")]
    pub started: Option<bool>,
    #[serde_as(as = "DefaultOnError")]
    pub live: Option<bool>,
    #[serde_as(as = "DefaultOnError")]
    pub finalized: Option<bool>,
    #[serde_as(as = "DefaultOnError")]
    pub cancelled: Option<bool>,
    #[serde_as(as = "DefaultOnError")]
    pub starts_at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WireTeamNames {
    pub long: Option<String>,
    pub medium: Option<String>,
    pub short: Option<String>,
}

#[serde_as]
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WireTeam {
    #[serde(rename = "teamID")]
    pub team_id: Option<String>,
    pub names: WireTeamNames,
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    pub score: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WireTeams {
    pub home: Option<WireTeam>,
    pub away: Option<WireTeam>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WirePlayer {
    #[serde(rename = "playerID")]
    pub player_id: Option<String>,
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub alias: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WireResults {
    /// Full-game results keyed by player id, plus `home` / `away` team lines.
    pub game: HashMap<String, Value>,
}

#[serde_as]
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WireAltLine {
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    pub odds: Option<f64>,
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    pub spread: Option<f64>,
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    pub over_under: Option<f64>,
}

#[serde_as]
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WireBookmaker {
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    pub odds: Option<f64>,
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    pub spread: Option<f64>,
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    pub over_under: Option<f64>,
    #[serde_as(as = "DefaultOnError")]
    pub available: Option<bool>,
    #[serde_as(as = "DefaultOnError")]
    pub alt_lines: Vec<WireAltLine>,
}

#[serde_as]
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WireOdd {
    #[serde(rename = "oddID")]
    pub odd_id: Option<String>,
    #[serde(rename = "betTypeID")]
    pub bet_type_id: Option<String>,
    #[serde(rename = "periodID")]
    pub period_id: Option<String>,
    #[serde(rename = "sideID")]
    pub side_id: Option<String>,
    #[serde(rename = "playerID")]
    pub player_id: Option<String>,
    #[serde(rename = "statID")]
    pub stat_id: Option<String>,
    /// `all` for game-wide stats, `home` / `away` for team stats, else a player id.
    #[serde(rename = "statEntityID")]
    pub stat_entity_id: Option<String>,
    pub market_name: Option<String>,
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    pub book_odds: Option<f64>,
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    pub fair_odds: Option<f64>,
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    pub book_spread: Option<f64>,
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    pub fair_spread: Option<f64>,
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    pub book_over_under: Option<f64>,
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    pub fair_over_under: Option<f64>,
    #[serde_as(as = "DefaultOnError")]
    pub by_bookmaker: HashMap<String, WireBookmaker>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WireEvent {
    #[serde(rename = "eventID")]
    pub event_id: Option<String>,
    #[serde(rename = "leagueID")]
    pub league_id: Option<String>,
    pub status: WireStatus,
    pub teams: WireTeams,
    pub players: HashMap<String, Value>,
    pub results: WireResults,
    pub odds: HashMap<String, Value>,
}

/// Read a number that may be encoded as a JSON number, numeric string or boolean.
pub fn loose_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// `passingYards` -> `passing_yards`, `points+rebounds` unchanged.
pub fn to_snake_case(id: &str) -> String {
    let mut out = String::with_capacity(id.len() + 4);
    let mut prev_lower_or_digit = false;
    for ch in id.trim().chars() {
        if ch.is_ascii_uppercase() {
            if prev_lower_or_digit {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
            prev_lower_or_digit = false;
        } else if ch == '-' || ch == ' ' {
            out.push('_');
            prev_lower_or_digit = false;
        } else {
            out.push(ch);
            prev_lower_or_digit = ch.is_ascii_lowercase() || ch.is_ascii_digit();
        }
    }
    out
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_bet_type(id: &str) -> Option<BetType> {
    match id.trim().to_ascii_lowercase().as_str() {
        "ml" => Some(BetType::Moneyline),
        "sp" => Some(BetType::Spread),
        "ou" => Some(BetType::OverUnder),
        "yn" => Some(BetType::YesNo),
        _ => None,
    }
}

fn parse_side(id: &str) -> Option<OddSide> {
    match id.trim().to_ascii_lowercase().as_str() {
        "home" => Some(OddSide::Home),
        "away" => Some(OddSide::Away),
        "over" => Some(OddSide::Over),
        "under" => Some(OddSide::Under),
        "yes" => Some(OddSide::Yes),
        "no" => Some(OddSide::No),
        _ => None,
    }
}

/// Decode one entry of a provider map, dropping it alone when it is malformed.
fn decode_entry<T: DeserializeOwned>(kind: &str, key: &str, raw: Value) -> Option<T> {
    match serde_json::from_value(raw) {
        Ok(entry) => Some(entry),
        Err(err) => {
            debug!(target: "gateway", kind = %kind, key = %key, error = %err, "skipping malformed provider entry");
            None
        }
    }
}

fn stat_record(raw: Value) -> Option<StatRecord> {
    let Value::Object(stats) = raw else {
        return None;
    };
    Some(
        stats
            .into_iter()
            .filter_map(|(k, v)| loose_number(&v).map(|n| (to_snake_case(&k), n)))
            .collect(),
    )
}

/// `points-home-game-ou-over` -> `home`.
fn entity_from_odd_id(id: &str) -> Option<String> {
    let parts: Vec<&str> = id.split('-').collect();
    if parts.len() != ODD_ID_PARTS {
        return None;
    }
    non_empty(Some(parts[1].to_string()))
}

impl WireTeam {
    fn into_team(self, fallback_score: Option<f64>) -> Team {
        Team {
            id: non_empty(self.team_id),
            names: TeamNames {
                long: non_empty(self.names.long),
                medium: non_empty(self.names.medium),
                short: non_empty(self.names.short),
            },
            score: self.score.or(fallback_score),
        }
    }
}

impl WireOdd {
    /// Convert one quote. Quotes with unknown bet types or sides are dropped.
    pub fn into_odd(self, key: &str) -> Option<Odd> {
        let bet_type = parse_bet_type(self.bet_type_id.as_deref()?)?;
        let side = parse_side(self.side_id.as_deref()?)?;
        let player_id = non_empty(self.player_id);
        let stat_id = match non_empty(self.stat_id) {
            Some(stat) => to_snake_case(&stat),
            None if player_id.is_none() => TEAM_POINTS_STAT.to_string(),
            None => return None,
        };

        let pick_line = |spread: Option<f64>, over_under: Option<f64>| match bet_type {
            BetType::Spread => spread,
            BetType::OverUnder => over_under,
            BetType::Moneyline | BetType::YesNo => None,
        };

        let bookmakers: BTreeMap<String, BookmakerQuote> = self
            .by_bookmaker
            .into_iter()
            .map(|(book, q)| {
                let alt_lines = q
                    .alt_lines
                    .into_iter()
                    .map(|alt| AltLine {
                        line: pick_line(alt.spread, alt.over_under),
                        price: alt.odds,
                    })
                    .collect();
                let quote = BookmakerQuote {
                    price: q.odds,
                    line: pick_line(q.spread, q.over_under),
                    available: q.available.unwrap_or(true),
                    alt_lines,
                };
                (book, quote)
            })
            .collect();

        let id = non_empty(self.odd_id).unwrap_or_else(|| key.to_string());
        let stat_entity = non_empty(self.stat_entity_id).or_else(|| entity_from_odd_id(&id));

        Some(Odd {
            id,
            bet_type,
            period: non_empty(self.period_id)
                .map(|p| p.to_ascii_lowercase())
                .unwrap_or_else(|| FULL_GAME_PERIOD.to_string()),
            side,
            player_id,
            stat_id,
            stat_entity,
            market_name: non_empty(self.market_name),
            book_price: self.book_odds,
            fair_price: self.fair_odds,
            book_line: pick_line(self.book_spread, self.book_over_under),
            fair_line: pick_line(self.fair_spread, self.fair_over_under),
            bookmakers,
        })
    }
}

impl WireEvent {
    /// Convert into the domain event. Events without an id are unusable and yield `None`.
    pub fn into_event(self) -> Option<Event> {
        let id = non_empty(self.event_id)?;
        let starts_at = self
            .status
            .starts_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        let mut game = self.results.game;
        let home_result = game.remove("home").and_then(stat_record);
        let away_result = game.remove("away").and_then(stat_record);
        let result_points = |r: &Option<StatRecord>| r.as_ref().and_then(|s| s.get(TEAM_POINTS_STAT).copied());

        let home = self
            .teams
            .home
            .unwrap_or_default()
            .into_team(result_points(&home_result));
        let away = self
            .teams
            .away
            .unwrap_or_default()
            .into_team(result_points(&away_result));

        let players = self
            .players
            .into_iter()
            .filter_map(|(key, raw)| {
                let p: WirePlayer = decode_entry("player", &key, raw)?;
                let id = non_empty(p.player_id).unwrap_or(key);
                let player = Player {
                    id: id.clone(),
                    display_name: non_empty(p.name),
                    first_name: non_empty(p.first_name),
                    last_name: non_empty(p.last_name),
                    alias: non_empty(p.alias),
                };
                Some((id, player))
            })
            .collect();

        let player_stats = game
            .into_iter()
            .filter_map(|(player_id, raw)| stat_record(raw).map(|stats| (player_id, stats)))
            .collect();

        let mut odds: Vec<Odd> = self
            .odds
            .into_iter()
            .filter_map(|(key, raw)| decode_entry::<WireOdd>("odd", &key, raw)?.into_odd(&key))
            .collect();
        // Provider maps are unordered; extraction must not depend on hash order.
        odds.sort_by(|a, b| a.id.cmp(&b.id));

        Some(Event {
            id,
            league: non_empty(self.league_id),
            starts_at,
            status: EventStatus {
                started: self.status.started.unwrap_or(false),
                live: self.status.live.unwrap_or(false),
                finalized: self.status.finalized.unwrap_or(false),
                cancelled: self.status.cancelled.unwrap_or(false),
            },
            home,
            away,
            players,
            player_stats,
            odds,
        })
    }
}
