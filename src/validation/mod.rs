//! Bet Validator: checks a proposed bet against the provider's live quote before it is created.
//!
//! Every public entry point returns a [`ValidationResult`]. Internally checks chain through
//! `Result<_, ValidationError>` and are folded into the result at the boundary, so expected
//! rejections never surface as errors.

pub mod params;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::{
    BetMarket, BetRequest, BetType, Event, EventRef, Odd, OddSide, Odds, OverUnder, PropSelection,
    TeamSide,
};
use crate::gateway::EventGateway;
use crate::monitoring::metrics::METRICS;
use crate::odds::{find_closest_line, find_team_odd, pick_price, select_prop_odd, PropQuery};
use crate::resolver::player_key_for;
use crate::stats::{canonical_stat, coerce_direction, StatKind};
use crate::utils::math::{american_to_decimal, line_within_tolerance, parlay_decimal, relative_error};
use crate::utils::time::{has_started, Clock};

pub use params::ValidationParams;

/// User-facing reasons a bet cannot be created.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("cannot create bet after game has started")]
    GameStarted,

    #[error("event data is not available right now, try again shortly")]
    EventUnavailable,

    #[error("'{0}' does not match either team in this event")]
    SelectionUnmatched(String),

    #[error("{0} odds are not available for this event")]
    MarketUnavailable(&'static str),

    #[error("odds {submitted:.2} are more than {tolerance_pct:.0}% away from the current price {provider:.2}")]
    OddsOutOfTolerance {
        submitted: f64,
        provider: f64,
        tolerance_pct: f64,
    },

    #[error("line {submitted} is too far from the available line {provider}")]
    LineOutOfTolerance { submitted: f64, provider: f64 },

    #[error("a line is required for {0} bets")]
    MissingLine(&'static str),

    #[error("player name and stat type are required for player props")]
    MissingPlayerInfo,

    #[error("player '{0}' was not found in this event")]
    PlayerNotFound(String),

    #[error("parlay odds {submitted:.2} are more than {tolerance_pct:.0}% away from the combined leg odds {expected:.2}")]
    ParlayOddsOutOfTolerance {
        submitted: f64,
        expected: f64,
        tolerance_pct: f64,
    },

    #[error("invalid parlay: {0}")]
    InvalidParlay(&'static str),

    #[error("leg {index}: {reason}")]
    Leg {
        index: usize,
        reason: Box<ValidationError>,
    },
}

/// Outcome handed back to the caller. Not persisted.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    pub fn rejected(err: &ValidationError) -> Self {
        Self {
            valid: false,
            error: Some(err.to_string()),
        }
    }
}

impl From<Result<(), ValidationError>> for ValidationResult {
    fn from(res: Result<(), ValidationError>) -> Self {
        match res {
            Ok(()) => Self::ok(),
            Err(err) => Self::rejected(&err),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GameStartCheck {
    pub started: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Whether submitted odds are checked, or only the line (parlay legs).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValidationMode {
    Full,
    LineOnly,
}

/// Parlay odds check: submitted decimal odds against the product of the legs' decimal odds.
pub fn parlay_odds_within_tolerance(submitted: f64, leg_decimals: &[f64], tolerance: f64) -> bool {
    if leg_decimals.is_empty() {
        return false;
    }
    relative_error(submitted, parlay_decimal(leg_decimals)) <= tolerance
}

pub struct Validator {
    gateway: Arc<EventGateway>,
    clock: Arc<dyn Clock>,
    params: ValidationParams,
}

impl Validator {
    pub fn new(gateway: Arc<EventGateway>, clock: Arc<dyn Clock>, params: ValidationParams) -> Self {
        Self {
            gateway,
            clock,
            params,
        }
    }

    /// Started if the scheduled time has passed or the provider flags the event as under
    /// way. An unavailable provider leaves the answer to the clock alone.
    pub async fn check_game_started(
        &self,
        league: &str,
        event_id: &str,
        starts_at: DateTime<Utc>,
    ) -> GameStartCheck {
        let started = if has_started(self.clock.now(), starts_at) {
            true
        } else {
            let lookup = EventRef {
                event_id: Some(event_id.to_string()),
                league: Some(league.to_string()),
                home_team: None,
                away_team: None,
                starts_at,
            };
            self.gateway
                .event_for(&lookup)
                .await
                .map_or(false, |event| event.status.in_play_or_done())
        };

        GameStartCheck {
            started,
            error: started.then(|| ValidationError::GameStarted.to_string()),
        }
    }

    pub async fn validate_moneyline_bet(&self, event: &EventRef, selection: &str, odds: &Odds) -> ValidationResult {
        let res = self.moneyline(event, selection, Some(odds)).await;
        self.finish("moneyline", res)
    }

    pub async fn validate_spread_bet(
        &self,
        event: &EventRef,
        selection: &str,
        line: f64,
        odds: &Odds,
    ) -> ValidationResult {
        let res = self.spread(event, selection, line, Some(odds)).await;
        self.finish("spread", res)
    }

    pub async fn validate_total_bet(
        &self,
        event: &EventRef,
        direction: OverUnder,
        line: f64,
        odds: &Odds,
    ) -> ValidationResult {
        let res = self.total(event, direction, line, Some(odds)).await;
        self.finish("total", res)
    }

    pub async fn validate_player_prop_bet(&self, event: &EventRef, prop: &PropSelection, odds: &Odds) -> ValidationResult {
        let res = self.player_prop(event, prop, Some(odds)).await;
        self.finish("player_prop", res)
    }

    pub async fn validate_spread_line_only(&self, event: &EventRef, selection: &str, line: f64) -> ValidationResult {
        let res = self.spread(event, selection, line, None).await;
        self.finish("spread", res)
    }

    pub async fn validate_total_line_only(&self, event: &EventRef, direction: OverUnder, line: f64) -> ValidationResult {
        let res = self.total(event, direction, line, None).await;
        self.finish("total", res)
    }

    pub async fn validate_player_prop_line_only(&self, event: &EventRef, prop: &PropSelection) -> ValidationResult {
        let res = self.player_prop(event, prop, None).await;
        self.finish("player_prop", res)
    }

    /// Route a request to its market's checks. Parlays validate each leg line-only, then
    /// (in `Full` mode) the parlay's own odds against the product of the leg odds.
    pub async fn validate_bet(&self, request: &BetRequest, mode: ValidationMode) -> ValidationResult {
        let res = match &request.market {
            BetMarket::Parlay => self.parlay(request, mode).await,
            _ => self.single(request, mode).await,
        };
        self.finish(request.market.label(), res)
    }

    fn finish(&self, market: &str, res: Result<(), ValidationError>) -> ValidationResult {
        METRICS.record_validation(market, res.is_ok());
        match &res {
            Ok(()) => debug!(target: "validation", market = %market, "bet accepted"),
            Err(err) => info!(target: "validation", market = %market, reason = %err, "bet rejected"),
        }
        res.into()
    }

    async fn single(&self, request: &BetRequest, mode: ValidationMode) -> Result<(), ValidationError> {
        let odds = match mode {
            ValidationMode::Full => Some(&request.odds),
            ValidationMode::LineOnly => None,
        };
        match &request.market {
            BetMarket::Moneyline { selection } => self.moneyline(&request.event, selection, odds).await,
            BetMarket::Spread { selection, line } => self.spread(&request.event, selection, *line, odds).await,
            BetMarket::Total { direction, line } => self.total(&request.event, *direction, *line, odds).await,
            BetMarket::PlayerProp(prop) => self.player_prop(&request.event, prop, odds).await,
            BetMarket::Parlay => Err(ValidationError::InvalidParlay("nested parlays are not supported")),
        }
    }

    async fn parlay(&self, request: &BetRequest, mode: ValidationMode) -> Result<(), ValidationError> {
        if request.legs.len() < 2 {
            return Err(ValidationError::InvalidParlay("a parlay needs at least two legs"));
        }

        for (i, leg) in request.legs.iter().enumerate() {
            self.single(leg, ValidationMode::LineOnly)
                .await
                .map_err(|err| ValidationError::Leg {
                    index: i + 1,
                    reason: Box::new(err),
                })?;
        }

        if mode == ValidationMode::Full {
            let legs: Vec<f64> = request.legs.iter().map(|leg| leg.odds.decimal()).collect();
            let submitted = request.odds.decimal();
            if !parlay_odds_within_tolerance(submitted, &legs, self.params.odds_tolerance) {
                return Err(ValidationError::ParlayOddsOutOfTolerance {
                    submitted,
                    expected: parlay_decimal(&legs),
                    tolerance_pct: self.params.odds_tolerance * 100.0,
                });
            }
        }
        Ok(())
    }

    /// Event for a bet that is about to be created. Rejects once the game is under way.
    async fn open_event(&self, event_ref: &EventRef) -> Result<Event, ValidationError> {
        if has_started(self.clock.now(), event_ref.starts_at) {
            return Err(ValidationError::GameStarted);
        }
        let event = self
            .gateway
            .event_for(event_ref)
            .await
            .ok_or(ValidationError::EventUnavailable)?;
        if event.status.in_play_or_done() {
            return Err(ValidationError::GameStarted);
        }
        Ok(event)
    }

    fn side(&self, event: &Event, selection: &str) -> Result<TeamSide, ValidationError> {
        self.gateway
            .resolver()
            .resolve_side(event, selection)
            .ok_or_else(|| ValidationError::SelectionUnmatched(selection.to_string()))
    }

    async fn moneyline(&self, event_ref: &EventRef, selection: &str, odds: Option<&Odds>) -> Result<(), ValidationError> {
        const MARKET: &str = "moneyline";
        let event = self.open_event(event_ref).await?;
        let side = self.side(&event, selection)?;
        let odd = find_team_odd(&event, BetType::Moneyline, side.into())
            .ok_or(ValidationError::MarketUnavailable(MARKET))?;
        if let Some(odds) = odds {
            let price = pick_price(odd).ok_or(ValidationError::MarketUnavailable(MARKET))?;
            self.check_odds(odds, price, MARKET)?;
        }
        Ok(())
    }

    async fn spread(
        &self,
        event_ref: &EventRef,
        selection: &str,
        line: f64,
        odds: Option<&Odds>,
    ) -> Result<(), ValidationError> {
        const MARKET: &str = "spread";
        let event = self.open_event(event_ref).await?;
        let side = self.side(&event, selection)?;
        let odd = find_team_odd(&event, BetType::Spread, side.into())
            .ok_or(ValidationError::MarketUnavailable(MARKET))?;
        self.check_line(odd, line, odds, MARKET)
    }

    async fn total(
        &self,
        event_ref: &EventRef,
        direction: OverUnder,
        line: f64,
        odds: Option<&Odds>,
    ) -> Result<(), ValidationError> {
        const MARKET: &str = "total";
        let event = self.open_event(event_ref).await?;
        let odd = find_team_odd(&event, BetType::OverUnder, direction.side())
            .ok_or(ValidationError::MarketUnavailable(MARKET))?;
        self.check_line(odd, line, odds, MARKET)
    }

    async fn player_prop(
        &self,
        event_ref: &EventRef,
        prop: &PropSelection,
        odds: Option<&Odds>,
    ) -> Result<(), ValidationError> {
        const MARKET: &str = "player prop";
        if prop.player_name.trim().is_empty() || prop.stat_type.trim().is_empty() {
            return Err(ValidationError::MissingPlayerInfo);
        }

        let event = self.open_event(event_ref).await?;
        let player_id = player_key_for(self.gateway.resolver(), &event, prop)
            .ok_or_else(|| ValidationError::PlayerNotFound(prop.player_name.clone()))?;

        let stat = canonical_stat(&prop.stat_type);
        let side = OddSide::from(coerce_direction(prop.direction, stat.kind));
        let line = match stat.kind {
            StatKind::OverUnder => Some(prop.line.ok_or(ValidationError::MissingLine(MARKET))?),
            // Yes/no props only need the market to exist.
            StatKind::YesNo => None,
        };

        let query = PropQuery {
            player_id: &player_id,
            stat_id: &stat.id,
            stat_text: &prop.stat_type,
            side,
            line,
        };
        let odd = select_prop_odd(&event, &query).ok_or(ValidationError::MarketUnavailable(MARKET))?;

        match line {
            Some(line) => self.check_line(odd, line, odds, MARKET),
            None => {
                if let Some(odds) = odds {
                    let price = pick_price(odd).ok_or(ValidationError::MarketUnavailable(MARKET))?;
                    self.check_odds(odds, price, MARKET)?;
                }
                Ok(())
            }
        }
    }

    /// Compare against the closest quoted line, then (if given) the odds quoted at that line.
    fn check_line(&self, odd: &Odd, line: f64, odds: Option<&Odds>, market: &'static str) -> Result<(), ValidationError> {
        let closest = find_closest_line(odd, line).ok_or(ValidationError::MarketUnavailable(market))?;
        if !line_within_tolerance(
            line,
            closest.line,
            self.params.line_tolerance,
            self.params.zero_line_epsilon,
        ) {
            return Err(ValidationError::LineOutOfTolerance {
                submitted: line,
                provider: closest.line,
            });
        }

        if let Some(odds) = odds {
            let price = closest
                .price
                .or_else(|| pick_price(odd))
                .ok_or(ValidationError::MarketUnavailable(market))?;
            self.check_odds(odds, price, market)?;
        }
        Ok(())
    }

    fn check_odds(&self, odds: &Odds, american: f64, market: &'static str) -> Result<(), ValidationError> {
        let provider = american_to_decimal(american).ok_or(ValidationError::MarketUnavailable(market))?;
        let submitted = odds.decimal();
        if relative_error(submitted, provider) > self.params.odds_tolerance {
            return Err(ValidationError::OddsOutOfTolerance {
                submitted,
                provider,
                tolerance_pct: self.params.odds_tolerance * 100.0,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::client::MockEventProvider;
    use crate::domain::{BetType, OddsFormat, Player, PropDirection, Team, TeamNames};
    use crate::gateway::MemoryEventCache;
    use crate::resolver::ContainmentResolver;
    use crate::utils::time::FixedClock;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn team(long: &str, short: &str) -> Team {
        Team {
            id: None,
            names: TeamNames {
                long: Some(long.to_string()),
                medium: None,
                short: Some(short.to_string()),
            },
            score: None,
        }
    }

    fn odd(id: &str, bet_type: BetType, side: OddSide, price: f64, line: Option<f64>) -> Odd {
        Odd {
            id: id.to_string(),
            bet_type,
            period: "game".to_string(),
            side,
            player_id: None,
            stat_id: "points".to_string(),
            stat_entity: None,
            market_name: None,
            book_price: Some(price),
            fair_price: None,
            book_line: line,
            fair_line: None,
            bookmakers: BTreeMap::new(),
        }
    }

    fn player_odd(id: &str, bet_type: BetType, stat: &str, side: OddSide, price: f64, line: Option<f64>) -> Odd {
        let mut o = odd(id, bet_type, side, price, line);
        o.player_id = Some("JAYSON_TATUM_1_NBA".to_string());
        o.stat_id = stat.to_string();
        o
    }

    fn event() -> Event {
        let mut ev = Event {
            id: "EVT1".to_string(),
            league: Some("NBA".to_string()),
            starts_at: Some(ts("2024-01-01T19:00:00Z")),
            home: team("Boston Celtics", "BOS"),
            away: team("New York Knicks", "NYK"),
            odds: vec![
                odd("ml-away", BetType::Moneyline, OddSide::Away, 130.0, None),
                odd("ml-home", BetType::Moneyline, OddSide::Home, -150.0, None),
                odd("ou-over", BetType::OverUnder, OddSide::Over, -110.0, Some(210.5)),
                odd("ou-under", BetType::OverUnder, OddSide::Under, -110.0, Some(210.5)),
                odd("sp-away", BetType::Spread, OddSide::Away, -110.0, Some(3.5)),
                odd("sp-home", BetType::Spread, OddSide::Home, -110.0, Some(-3.5)),
                player_odd("tatum-dd-yes", BetType::YesNo, "double_double", OddSide::Yes, 150.0, None),
                player_odd("tatum-pts-over", BetType::OverUnder, "points", OddSide::Over, -115.0, Some(26.5)),
            ],
            ..Default::default()
        };
        ev.players.insert(
            "JAYSON_TATUM_1_NBA".to_string(),
            Player {
                id: "JAYSON_TATUM_1_NBA".to_string(),
                display_name: Some("Jayson Tatum".to_string()),
                ..Default::default()
            },
        );
        ev
    }

    fn event_ref() -> EventRef {
        EventRef {
            event_id: Some("EVT1".to_string()),
            league: Some("NBA".to_string()),
            home_team: Some("Celtics".to_string()),
            away_team: Some("Knicks".to_string()),
            starts_at: ts("2024-01-01T19:00:00Z"),
        }
    }

    fn validator_with(ev: Event, now: &str) -> Validator {
        let clock = Arc::new(FixedClock::new(ts(now)));
        let mut provider = MockEventProvider::new();
        provider
            .expect_event_by_id()
            .returning(move |_| Ok(Some(ev.clone())));
        let gateway = EventGateway::new(
            Arc::new(provider),
            Arc::new(MemoryEventCache::new(clock.clone())),
            Arc::new(ContainmentResolver),
        );
        Validator::new(Arc::new(gateway), clock, ValidationParams::default())
    }

    fn validator() -> Validator {
        validator_with(event(), "2024-01-01T12:00:00Z")
    }

    fn american(text: &str) -> Odds {
        Odds::parse(OddsFormat::American, text).unwrap()
    }

    fn prop(name: &str, stat: &str, direction: PropDirection, line: Option<f64>) -> PropSelection {
        PropSelection {
            player_name: name.to_string(),
            player_key: None,
            legacy_player_id: None,
            stat_type: stat.to_string(),
            direction,
            line,
        }
    }

    #[tokio::test]
    async fn moneyline_odds_within_tolerance() {
        let v = validator();
        assert!(v.validate_moneyline_bet(&event_ref(), "Celtics", &american("-150")).await.valid);
        assert!(v.validate_moneyline_bet(&event_ref(), "knicks", &american("+125")).await.valid);

        let res = v.validate_moneyline_bet(&event_ref(), "Celtics", &american("+100")).await;
        assert!(!res.valid);
        let msg = res.error.unwrap();
        assert!(msg.contains("2.00") && msg.contains("1.67"), "{msg}");
    }

    #[tokio::test]
    async fn rejects_after_start_by_clock_or_status() {
        let late = validator_with(event(), "2024-01-01T19:00:00Z");
        let res = late.validate_moneyline_bet(&event_ref(), "Celtics", &american("-150")).await;
        assert_eq!(res.error.as_deref(), Some("cannot create bet after game has started"));

        let mut live = event();
        live.status.live = true;
        let v = validator_with(live, "2024-01-01T12:00:00Z");
        let res = v.validate_moneyline_bet(&event_ref(), "Celtics", &american("-150")).await;
        assert_eq!(res.error.as_deref(), Some("cannot create bet after game has started"));
    }

    #[tokio::test]
    async fn spread_line_tolerance_boundary() {
        let v = validator();
        let odds = american("-110");
        let inside = -3.5 * (1.0 + 0.05 - 1e-9);
        assert!(v.validate_spread_bet(&event_ref(), "Celtics", inside, &odds).await.valid);

        let outside = -3.5 * 1.06;
        let res = v.validate_spread_bet(&event_ref(), "Celtics", outside, &odds).await;
        assert!(!res.valid);
        assert!(res.error.unwrap().contains("-3.5"));
    }

    #[tokio::test]
    async fn unmatched_selection_is_rejected() {
        let v = validator();
        let res = v.validate_spread_bet(&event_ref(), "Lakers", 3.5, &american("-110")).await;
        assert_eq!(
            res.error.as_deref(),
            Some("'Lakers' does not match either team in this event")
        );
    }

    #[tokio::test]
    async fn line_only_skips_odds() {
        let v = validator();
        assert!(v.validate_total_line_only(&event_ref(), OverUnder::Under, 210.5).await.valid);
        assert!(!v.validate_total_bet(&event_ref(), OverUnder::Under, 210.5, &american("+300")).await.valid);
    }

    #[tokio::test]
    async fn player_props() {
        let v = validator();
        let over = prop("Jayson Tatum", "Points", PropDirection::Over, Some(26.5));
        assert!(v.validate_player_prop_bet(&event_ref(), &over, &american("-115")).await.valid);

        let missing = prop("LeBron James", "Points", PropDirection::Over, Some(26.5));
        let res = v.validate_player_prop_bet(&event_ref(), &missing, &american("-115")).await;
        assert_eq!(res.error.as_deref(), Some("player 'LeBron James' was not found in this event"));

        let blank = prop("Jayson Tatum", " ", PropDirection::Over, Some(26.5));
        assert!(!v.validate_player_prop_line_only(&event_ref(), &blank).await.valid);

        // Over on a yes/no stat reads as Yes; no line comparison applies.
        let dd = prop("tatum", "Double Double", PropDirection::Over, None);
        assert!(v.validate_player_prop_bet(&event_ref(), &dd, &american("+150")).await.valid);
    }

    #[tokio::test]
    async fn parlay_checks_legs_and_product() {
        let v = validator();
        let leg = |market: BetMarket, odds: &str| BetRequest {
            event: event_ref(),
            market,
            odds: american(odds),
            legs: Vec::new(),
        };
        let legs = vec![
            leg(BetMarket::Moneyline { selection: "Celtics".to_string() }, "-150"),
            leg(
                BetMarket::Total {
                    direction: OverUnder::Over,
                    line: 210.5,
                },
                "-110",
            ),
        ];
        let product = parlay_decimal(&legs.iter().map(|l| l.odds.decimal()).collect::<Vec<_>>());
        let mut parlay = BetRequest {
            event: event_ref(),
            market: BetMarket::Parlay,
            odds: Odds::from_decimal(product).unwrap(),
            legs,
        };
        assert!(v.validate_bet(&parlay, ValidationMode::Full).await.valid);

        parlay.odds = Odds::from_decimal(product * 1.2).unwrap();
        assert!(!v.validate_bet(&parlay, ValidationMode::Full).await.valid);
        assert!(v.validate_bet(&parlay, ValidationMode::LineOnly).await.valid);

        parlay.legs[1].market = BetMarket::Total {
            direction: OverUnder::Over,
            line: 250.0,
        };
        let res = v.validate_bet(&parlay, ValidationMode::LineOnly).await;
        assert!(res.error.unwrap().starts_with("leg 2:"));

        parlay.legs.truncate(1);
        assert!(!v.validate_bet(&parlay, ValidationMode::LineOnly).await.valid);
    }

    #[tokio::test]
    async fn game_start_check() {
        let v = validator();
        let check = v.check_game_started("NBA", "EVT1", ts("2024-01-01T19:00:00Z")).await;
        assert!(!check.started);
        assert!(check.error.is_none());

        let mut finished = event();
        finished.status.finalized = true;
        let v = validator_with(finished, "2024-01-01T12:00:00Z");
        let check = v.check_game_started("NBA", "EVT1", ts("2024-01-01T19:00:00Z")).await;
        assert!(check.started);
        assert!(check.error.is_some());
    }

    #[test]
    fn parlay_tolerance() {
        assert!(parlay_odds_within_tolerance(3.0, &[2.0, 1.5], 0.05));
        assert!(parlay_odds_within_tolerance(3.1, &[2.0, 1.5], 0.05));
        assert!(!parlay_odds_within_tolerance(3.3, &[2.0, 1.5], 0.05));
        assert!(!parlay_odds_within_tolerance(3.0, &[], 0.05));
    }
}
