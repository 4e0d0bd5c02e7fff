use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::event::OddSide;
use crate::utils::math::{american_to_decimal, fractional_to_decimal, MIN_DECIMAL_ODDS};
use crate::utils::time::has_started;

/// Outcome of a bet. Moves from `Pending` to one terminal value exactly once.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetResult {
    Pending,
    Win,
    Loss,
    Push,
    Void,
}

impl BetResult {
    pub fn is_terminal(self) -> bool {
        !matches!(self, BetResult::Pending)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BetResult::Pending => "pending",
            BetResult::Win => "win",
            BetResult::Loss => "loss",
            BetResult::Push => "push",
            BetResult::Void => "void",
        }
    }
}

impl fmt::Display for BetResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BetResult {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(BetResult::Pending),
            "win" | "won" => Ok(BetResult::Win),
            "loss" | "lost" => Ok(BetResult::Loss),
            "push" | "pushed" => Ok(BetResult::Push),
            "void" | "voided" => Ok(BetResult::Void),
            other => Err(format!("unknown bet result '{other}'")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverUnder {
    Over,
    Under,
}

impl OverUnder {
    pub fn side(self) -> OddSide {
        match self {
            OverUnder::Over => OddSide::Over,
            OverUnder::Under => OddSide::Under,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OverUnder::Over => "over",
            OverUnder::Under => "under",
        }
    }
}

/// Direction picked on a player prop. Over/under props use `Over`/`Under`, yes/no props
/// (anytime scorer, double-double) use `Yes`/`No`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropDirection {
    Over,
    Under,
    Yes,
    No,
}

impl PropDirection {
    /// Whether this direction backs the stat happening / going over.
    pub fn is_affirmative(self) -> bool {
        matches!(self, PropDirection::Over | PropDirection::Yes)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PropDirection::Over => "over",
            PropDirection::Under => "under",
            PropDirection::Yes => "yes",
            PropDirection::No => "no",
        }
    }
}

impl From<PropDirection> for OddSide {
    fn from(direction: PropDirection) -> Self {
        match direction {
            PropDirection::Over => OddSide::Over,
            PropDirection::Under => OddSide::Under,
            PropDirection::Yes => OddSide::Yes,
            PropDirection::No => OddSide::No,
        }
    }
}

impl FromStr for PropDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "over" | "o" => Ok(PropDirection::Over),
            "under" | "u" => Ok(PropDirection::Under),
            "yes" | "y" => Ok(PropDirection::Yes),
            "no" | "n" => Ok(PropDirection::No),
            other => Err(format!("unknown prop direction '{other}'")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropSelection {
    pub player_name: String,
    /// Provider player id, when it was resolved at creation time.
    #[serde(default)]
    pub player_key: Option<String>,
    /// Numeric id written by older clients before provider keys were stored.
    #[serde(default)]
    pub legacy_player_id: Option<String>,
    pub stat_type: String,
    pub direction: PropDirection,
    #[serde(default)]
    pub line: Option<f64>,
}

/// Market-specific part of a bet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BetMarket {
    Moneyline { selection: String },
    Spread { selection: String, line: f64 },
    Total { direction: OverUnder, line: f64 },
    PlayerProp(PropSelection),
    Parlay,
}

impl BetMarket {
    pub fn label(&self) -> &'static str {
        match self {
            BetMarket::Moneyline { .. } => "moneyline",
            BetMarket::Spread { .. } => "spread",
            BetMarket::Total { .. } => "total",
            BetMarket::PlayerProp(_) => "player_prop",
            BetMarket::Parlay => "parlay",
        }
    }

    pub fn is_parlay(&self) -> bool {
        matches!(self, BetMarket::Parlay)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OddsFormat {
    Decimal,
    American,
    Fractional,
}

impl OddsFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OddsFormat::Decimal => "decimal",
            OddsFormat::American => "american",
            OddsFormat::Fractional => "fractional",
        }
    }
}

impl FromStr for OddsFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "decimal" => Ok(OddsFormat::Decimal),
            "american" => Ok(OddsFormat::American),
            "fractional" => Ok(OddsFormat::Fractional),
            other => Err(format!("unknown odds format '{other}'")),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum OddsError {
    #[error("cannot read '{text}' as {format} odds")]
    Unparseable { format: &'static str, text: String },

    #[error("decimal odds {0:.2} are below the minimum of 1.01")]
    BelowMinimum(f64),
}

/// Wire form of [`Odds`]: the format and the text the user typed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OddsInput {
    pub format: OddsFormat,
    pub value: String,
}

/// Canonical decimal odds plus what the user originally entered, for display.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "OddsInput", into = "OddsInput")]
pub struct Odds {
    decimal: f64,
    format: OddsFormat,
    entered: String,
}

impl Odds {
    pub fn parse(format: OddsFormat, entered: &str) -> Result<Self, OddsError> {
        let text = entered.trim();
        let decimal = match format {
            OddsFormat::Decimal => text.parse::<f64>().ok(),
            OddsFormat::American => text.parse::<f64>().ok().and_then(american_to_decimal),
            OddsFormat::Fractional => fractional_to_decimal(text),
        }
        .filter(|d| d.is_finite())
        .ok_or_else(|| OddsError::Unparseable {
            format: format.as_str(),
            text: text.to_string(),
        })?;

        // Rounding guard so "1.01" typed by a user is never rejected on float noise.
        if decimal + 1e-9 < MIN_DECIMAL_ODDS {
            return Err(OddsError::BelowMinimum(decimal));
        }

        Ok(Self {
            decimal,
            format,
            entered: text.to_string(),
        })
    }

    pub fn from_decimal(decimal: f64) -> Result<Self, OddsError> {
        Self::parse(OddsFormat::Decimal, &decimal.to_string())
    }

    pub fn decimal(&self) -> f64 {
        self.decimal
    }

    pub fn format(&self) -> OddsFormat {
        self.format
    }

    pub fn entered(&self) -> &str {
        &self.entered
    }
}

impl TryFrom<OddsInput> for Odds {
    type Error = OddsError;

    fn try_from(input: OddsInput) -> Result<Self, Self::Error> {
        Odds::parse(input.format, &input.value)
    }
}

impl From<Odds> for OddsInput {
    fn from(odds: Odds) -> Self {
        OddsInput {
            format: odds.format,
            value: odds.entered,
        }
    }
}

/// How a bet points at its sporting event: provider id when known, plus enough team/date
/// context to find the event when the id is missing or stale.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventRef {
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub league: Option<String>,
    #[serde(default)]
    pub home_team: Option<String>,
    #[serde(default)]
    pub away_team: Option<String>,
    pub starts_at: DateTime<Utc>,
}

/// A proposed bet as submitted for validation. Parlays carry their legs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BetRequest {
    pub event: EventRef,
    pub market: BetMarket,
    pub odds: Odds,
    #[serde(default)]
    pub legs: Vec<BetRequest>,
}

#[derive(Debug, Error, PartialEq)]
pub enum BetStateError {
    #[error("bet {id} is already settled as {result}")]
    AlreadySettled { id: Uuid, result: BetResult },

    #[error("bet {id} cannot be settled to pending")]
    NotTerminal { id: Uuid },
}

/// A persisted bet. The result is only reachable through [`Bet::settle`].
#[derive(Clone, Debug, PartialEq)]
pub struct Bet {
    pub id: Uuid,
    pub event: EventRef,
    pub market: BetMarket,
    pub odds: Odds,
    pub locked: bool,
    pub parent_id: Option<Uuid>,
    result: BetResult,
    void_reason: Option<String>,
}

impl Bet {
    pub fn new(id: Uuid, event: EventRef, market: BetMarket, odds: Odds) -> Self {
        Self {
            id,
            event,
            market,
            odds,
            locked: false,
            parent_id: None,
            result: BetResult::Pending,
            void_reason: None,
        }
    }

    pub fn from_request(request: &BetRequest) -> Self {
        Self::new(
            Uuid::new_v4(),
            request.event.clone(),
            request.market.clone(),
            request.odds.clone(),
        )
    }

    pub fn with_parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn result(&self) -> BetResult {
        self.result
    }

    pub fn void_reason(&self) -> Option<&str> {
        self.void_reason.as_deref()
    }

    pub fn is_pending(&self) -> bool {
        self.result == BetResult::Pending
    }

    pub fn starts_at(&self) -> DateTime<Utc> {
        self.event.starts_at
    }

    /// Move a pending bet to a terminal result. Re-settling is rejected.
    pub fn settle(&mut self, result: BetResult, reason: Option<String>) -> Result<(), BetStateError> {
        if self.result.is_terminal() {
            return Err(BetStateError::AlreadySettled {
                id: self.id,
                result: self.result,
            });
        }
        if !result.is_terminal() {
            return Err(BetStateError::NotTerminal { id: self.id });
        }
        self.result = result;
        self.void_reason = reason;
        Ok(())
    }

    /// Lock the bet once its event has started. Returns true when the flag flipped.
    pub fn lock_if_started(&mut self, now: DateTime<Utc>) -> bool {
        if !self.locked && has_started(now, self.event.starts_at) {
            self.locked = true;
            return true;
        }
        false
    }
}
