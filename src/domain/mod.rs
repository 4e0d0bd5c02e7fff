//! Event and bet model shared by validation and settlement.

pub mod bet;
pub mod event;

pub use bet::{
    Bet, BetMarket, BetRequest, BetResult, BetStateError, EventRef, Odds, OddsError, OddsFormat,
    OddsInput, OverUnder, PropDirection, PropSelection,
};
pub use event::{
    AltLine, BetType, BookmakerQuote, Event, EventStatus, Odd, OddSide, Player, StatRecord, Team,
    TeamNames, TeamSide, FULL_GAME_PERIOD, GAME_ENTITY, TEAM_POINTS_STAT,
};
