//! Single-bet grading against a finished event.

use chrono::{DateTime, Utc};

use crate::domain::{Bet, BetMarket, BetResult, Event, OverUnder, PropSelection, TeamSide};
use crate::resolver::{player_key_for, NameResolver};
use crate::stats::{canonical_stat, coerce_direction, compute_player_stat_value, StatKind};

use super::Settlement;

/// Scores closer than this are a push.
const PUSH_EPSILON: f64 = 1e-9;

/// Gradeable: start time reached, finalized, not cancelled, both scores in.
pub fn is_game_ended(event: &Event, starts_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now >= starts_at && event.status.finalized && !event.status.cancelled && event.scores().is_some()
}

/// Grade one non-parlay bet. `Pending` means the data needed is not there (yet); parlays are
/// always `Pending` here.
pub fn grade_bet(bet: &Bet, event: &Event, resolver: &dyn NameResolver) -> Settlement {
    match &bet.market {
        BetMarket::Moneyline { selection } => match resolver.resolve_side(event, selection) {
            Some(side) => Settlement::from(grade_moneyline(event, side)),
            None => unmatched(selection),
        },
        BetMarket::Spread { selection, line } => match resolver.resolve_side(event, selection) {
            Some(side) => Settlement::from(grade_spread(event, side, *line)),
            None => unmatched(selection),
        },
        BetMarket::Total { direction, line } => Settlement::from(grade_total(event, *direction, *line)),
        BetMarket::PlayerProp(prop) => grade_player_prop(event, prop, resolver),
        BetMarket::Parlay => Settlement::pending(),
    }
}

fn unmatched(selection: &str) -> Settlement {
    Settlement::void(format!("selection '{selection}' does not match either team"))
}

fn grade_moneyline(event: &Event, side: TeamSide) -> BetResult {
    let (Some(mine), Some(theirs)) = (event.score(side), event.score(side.other())) else {
        return BetResult::Pending;
    };
    if (mine - theirs).abs() < PUSH_EPSILON {
        BetResult::Push
    } else if mine > theirs {
        BetResult::Win
    } else {
        BetResult::Loss
    }
}

fn grade_spread(event: &Event, side: TeamSide, line: f64) -> BetResult {
    let (Some(mine), Some(theirs)) = (event.score(side), event.score(side.other())) else {
        return BetResult::Pending;
    };
    let adjusted = mine + line - theirs;
    if adjusted.abs() < PUSH_EPSILON {
        BetResult::Push
    } else if adjusted > 0.0 {
        BetResult::Win
    } else {
        BetResult::Loss
    }
}

fn grade_total(event: &Event, direction: OverUnder, line: f64) -> BetResult {
    match event.scores() {
        Some((home, away)) => against_line(home + away, line, direction == OverUnder::Over),
        None => BetResult::Pending,
    }
}

/// Push within epsilon, otherwise the over side wins above the line.
fn against_line(value: f64, line: f64, over: bool) -> BetResult {
    if (value - line).abs() < PUSH_EPSILON {
        BetResult::Push
    } else if (value > line) == over {
        BetResult::Win
    } else {
        BetResult::Loss
    }
}

fn grade_player_prop(event: &Event, prop: &PropSelection, resolver: &dyn NameResolver) -> Settlement {
    let Some(player_id) = player_key_for(resolver, event, prop) else {
        return Settlement::pending();
    };
    let Some(record) = event.stats_for(&player_id) else {
        return Settlement::pending();
    };
    let stat = canonical_stat(&prop.stat_type);
    let Some(value) = compute_player_stat_value(&stat.id, record) else {
        return Settlement::pending();
    };

    let affirmative = coerce_direction(prop.direction, stat.kind).is_affirmative();
    match stat.kind {
        StatKind::OverUnder => match prop.line {
            Some(line) => Settlement::from(against_line(value, line, affirmative)),
            None => Settlement::void("over/under prop has no line".to_string()),
        },
        StatKind::YesNo => {
            let threshold = prop.line.filter(|l| *l > 0.0).unwrap_or(1.0);
            let occurred = value >= threshold;
            Settlement::from(if occurred == affirmative {
                BetResult::Win
            } else {
                BetResult::Loss
            })
        }
    }
}
