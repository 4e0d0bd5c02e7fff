//! Market Odds Extractor: picks the quote a bet is checked against out of an event's odds.
//!
//! Everything here is deterministic for a given event. Odds are kept sorted by id and
//! bookmakers are walked in lexical order, so ties always resolve the same way.

use crate::domain::{BetType, Event, Odd, OddSide, GAME_ENTITY, TEAM_POINTS_STAT};
use crate::resolver::normalize;

/// Penalty added to props whose stat id only loosely matches the requested one, so an
/// exact id always outranks it whatever the line distance.
const INEXACT_STAT_PENALTY: f64 = 1000.0;

const SEGMENT_WORDS: &[&str] = &[
    "quarter", "half", "period", "inning", "innings", "1q", "2q", "3q", "4q", "1h", "2h", "1p", "2p",
    "3p", "first", "second", "third", "fourth",
];

const COMPOSITE_WORDS: &[&str] = &["and", "plus"];

/// A line found by [`find_closest_line`]. `bookmaker` is `None` for the canonical line.
#[derive(Clone, Debug, PartialEq)]
pub struct ClosestLine {
    pub line: f64,
    pub bookmaker: Option<String>,
    /// American price quoted alongside this line, when there is one.
    pub price: Option<f64>,
}

/// First full-game odd matching `predicate`.
pub fn find_odd<P>(event: &Event, mut predicate: P) -> Option<&Odd>
where
    P: FnMut(&Odd) -> bool,
{
    event
        .odds
        .iter()
        .filter(|odd| odd.is_full_game())
        .find(|odd| predicate(odd))
}

/// Team-level quote (no player) on the points stat for one side of a market.
///
/// Totals must be on the whole game, so a team total never stands in for the game total.
/// Moneyline and spread quotes must be on the selected team.
pub fn find_team_odd(event: &Event, bet_type: BetType, side: OddSide) -> Option<&Odd> {
    let entity = match side {
        OddSide::Home => "home",
        OddSide::Away => "away",
        OddSide::Over | OddSide::Under | OddSide::Yes | OddSide::No => GAME_ENTITY,
    };
    find_odd(event, |odd| {
        odd.bet_type == bet_type
            && odd.side == side
            && odd.player_id.is_none()
            && odd.stat_id == TEAM_POINTS_STAT
            && odd.is_on_entity(entity)
    })
}

/// American price: canonical book, canonical fair, then the first bookmaker quoting one.
pub fn pick_price(odd: &Odd) -> Option<f64> {
    odd.book_price
        .or(odd.fair_price)
        .or_else(|| odd.bookmakers.values().find_map(|q| q.price))
}

/// Spread or total line, in the same order as [`pick_price`].
pub fn pick_line(odd: &Odd) -> Option<f64> {
    odd.book_line
        .or(odd.fair_line)
        .or_else(|| odd.bookmakers.values().find_map(|q| q.line))
}

/// Every distinct line quoted for this odd, canonical lines first, with the price quoted
/// next to it.
fn candidate_lines(odd: &Odd) -> Vec<ClosestLine> {
    let mut out: Vec<ClosestLine> = Vec::new();
    let mut push = |line: Option<f64>, bookmaker: Option<&str>, price: Option<f64>| {
        let Some(line) = line.filter(|l| l.is_finite()) else {
            return;
        };
        if out.iter().any(|c| c.line == line) {
            return;
        }
        out.push(ClosestLine {
            line,
            bookmaker: bookmaker.map(str::to_string),
            price,
        });
    };

    push(odd.book_line, None, odd.book_price.or(odd.fair_price));
    push(odd.fair_line, None, odd.fair_price.or(odd.book_price));
    for (book, quote) in &odd.bookmakers {
        push(quote.line, Some(book), quote.price);
        for alt in &quote.alt_lines {
            push(alt.line, Some(book), alt.price.or(quote.price));
        }
    }
    out
}

/// Quoted line nearest to `requested`, across the canonical line and every bookmaker's
/// main and alternate lines. Ties keep the earlier candidate.
pub fn find_closest_line(odd: &Odd, requested: f64) -> Option<ClosestLine> {
    let mut best: Option<ClosestLine> = None;
    for candidate in candidate_lines(odd) {
        let closer = match &best {
            Some(current) => (candidate.line - requested).abs() < (current.line - requested).abs(),
            None => true,
        };
        if closer {
            best = Some(candidate);
        }
    }
    best
}

fn words(text: &str) -> Vec<String> {
    normalize(text).split(' ').map(str::to_string).collect()
}

fn mentions_segment(text: &str) -> bool {
    words(text).iter().any(|w| SEGMENT_WORDS.contains(&w.as_str()))
}

fn mentions_composite(text: &str) -> bool {
    text.contains('+') || words(text).iter().any(|w| COMPOSITE_WORDS.contains(&w.as_str()))
}

/// Stat ids compared without separators, so `threePointersMade` style ids still line up.
fn squash(id: &str) -> String {
    id.chars().filter(|c| c.is_ascii_alphanumeric() || *c == '+').collect::<String>().to_ascii_lowercase()
}

/// What a player prop is looking for.
#[derive(Clone, Debug)]
pub struct PropQuery<'a> {
    pub player_id: &'a str,
    /// Canonical stat id.
    pub stat_id: &'a str,
    /// The stat text as the user typed it.
    pub stat_text: &'a str,
    pub side: OddSide,
    pub line: Option<f64>,
}

/// Pick the prop quote for a player/stat/side among overlapping markets.
///
/// Segment markets (quarters, halves, periods) are skipped unless the stat text asks for
/// one, composite markets unless the stat is itself composite. Survivors are ranked by the
/// distance from the requested line to their closest quoted line, with loosely matching
/// stat ids pushed behind every exact match.
pub fn select_prop_odd<'a>(event: &'a Event, query: &PropQuery<'_>) -> Option<&'a Odd> {
    let wants_segment = mentions_segment(query.stat_text);
    let wants_composite = query.stat_text.contains('+') || query.stat_id.contains('+');
    let target = squash(query.stat_id);

    let mut best: Option<(f64, &Odd)> = None;
    for odd in &event.odds {
        if odd.player_id.as_deref() != Some(query.player_id) || odd.side != query.side {
            continue;
        }

        let market = odd.market_name.as_deref().unwrap_or("");
        let segment = !odd.is_full_game() || mentions_segment(market);
        if segment && !wants_segment {
            continue;
        }
        if mentions_composite(market) && !wants_composite {
            continue;
        }

        let candidate = squash(&odd.stat_id);
        let exact = odd.stat_id == query.stat_id || candidate == target;
        let loose = !exact && (candidate.contains(&target) || target.contains(&candidate));
        if !exact && !loose {
            continue;
        }

        let distance = match query.line {
            Some(requested) => find_closest_line(odd, requested)
                .map(|c| (c.line - requested).abs())
                .unwrap_or(0.0),
            None => 0.0,
        };
        let score = if exact { distance } else { INEXACT_STAT_PENALTY + distance };

        if best.map_or(true, |(current, _)| score < current) {
            best = Some((score, odd));
        }
    }
    best.map(|(_, odd)| odd)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::domain::{AltLine, BookmakerQuote};

    fn odd(id: &str, bet_type: BetType, side: OddSide) -> Odd {
        Odd {
            id: id.to_string(),
            bet_type,
            period: "game".to_string(),
            side,
            player_id: None,
            stat_id: TEAM_POINTS_STAT.to_string(),
            stat_entity: None,
            market_name: None,
            book_price: None,
            fair_price: None,
            book_line: None,
            fair_line: None,
            bookmakers: BTreeMap::new(),
        }
    }

    fn quote(price: Option<f64>, line: Option<f64>, alts: &[f64]) -> BookmakerQuote {
        BookmakerQuote {
            price,
            line,
            available: true,
            alt_lines: alts
                .iter()
                .map(|l| AltLine {
                    line: Some(*l),
                    price: Some(-110.0),
                })
                .collect(),
        }
    }

    fn prop(id: &str, stat: &str, market: &str, line: f64) -> Odd {
        let mut o = odd(id, BetType::OverUnder, OddSide::Over);
        o.player_id = Some("P1".to_string());
        o.stat_id = stat.to_string();
        o.market_name = Some(market.to_string());
        o.book_line = Some(line);
        o.book_price = Some(-115.0);
        o
    }

    #[test]
    fn closest_line_prefers_exact_then_nearest() {
        let mut o = odd("sp", BetType::Spread, OddSide::Home);
        o.book_line = Some(-3.0);
        o.bookmakers.insert("fanduel".to_string(), quote(Some(-110.0), Some(-3.5), &[-4.0, -3.0]));

        let exact = find_closest_line(&o, -3.5).unwrap();
        assert_eq!(exact.line, -3.5);
        assert_eq!(exact.bookmaker.as_deref(), Some("fanduel"));

        assert_eq!(find_closest_line(&o, -3.7).unwrap().line, -3.5);
        assert_eq!(find_closest_line(&o, -10.0).unwrap().line, -4.0);
    }

    #[test]
    fn closest_line_ties_keep_canonical() {
        let mut o = odd("ou", BetType::OverUnder, OddSide::Over);
        o.book_line = Some(210.0);
        o.bookmakers.insert("a".to_string(), quote(None, Some(211.0), &[]));
        let found = find_closest_line(&o, 210.5).unwrap();
        assert_eq!(found.line, 210.0);
        assert_eq!(found.bookmaker, None);
    }

    #[test]
    fn price_falls_back_to_bookmakers() {
        let mut o = odd("ml", BetType::Moneyline, OddSide::Away);
        assert_eq!(pick_price(&o), None);
        o.bookmakers.insert("b".to_string(), quote(Some(120.0), None, &[]));
        o.bookmakers.insert("a".to_string(), quote(None, None, &[]));
        assert_eq!(pick_price(&o), Some(120.0));
        o.fair_price = Some(115.0);
        assert_eq!(pick_price(&o), Some(115.0));
        o.book_price = Some(110.0);
        assert_eq!(pick_price(&o), Some(110.0));
    }

    #[test]
    fn game_total_is_not_confused_with_team_total() {
        let mut team_total = odd("ou-home-total", BetType::OverUnder, OddSide::Over);
        team_total.stat_entity = Some("home".to_string());
        team_total.book_line = Some(112.5);
        let mut game_total = odd("ou-total", BetType::OverUnder, OddSide::Over);
        game_total.stat_entity = Some(GAME_ENTITY.to_string());
        game_total.book_line = Some(220.5);
        let mut home_ml = odd("ml-home", BetType::Moneyline, OddSide::Home);
        home_ml.stat_entity = Some("HOME".to_string());
        let event = Event {
            odds: vec![team_total, game_total, home_ml],
            ..Default::default()
        };

        assert_eq!(find_team_odd(&event, BetType::OverUnder, OddSide::Over).unwrap().id, "ou-total");
        assert_eq!(find_team_odd(&event, BetType::Moneyline, OddSide::Home).unwrap().id, "ml-home");
    }

    #[test]
    fn line_follows_price_order() {
        let mut o = odd("sp", BetType::Spread, OddSide::Away);
        assert_eq!(pick_line(&o), None);
        o.bookmakers.insert("b".to_string(), quote(None, Some(2.5), &[]));
        o.bookmakers.insert("a".to_string(), quote(None, Some(3.0), &[]));
        assert_eq!(pick_line(&o), Some(3.0));
        o.fair_line = Some(3.5);
        assert_eq!(pick_line(&o), Some(3.5));
    }

    #[test]
    fn team_odd_skips_other_periods() {
        let mut first_half = odd("a", BetType::Moneyline, OddSide::Home);
        first_half.period = "1h".to_string();
        let full = odd("b", BetType::Moneyline, OddSide::Home);
        let event = Event {
            odds: vec![first_half, full],
            ..Default::default()
        };
        assert_eq!(find_team_odd(&event, BetType::Moneyline, OddSide::Home).unwrap().id, "b");
    }

    #[test]
    fn prop_selection_skips_segments_and_composites() {
        let event = Event {
            odds: vec![
                prop("a", "points", "1st Quarter Points", 7.5),
                prop("b", "points+rebounds", "Points + Rebounds", 30.5),
                prop("c", "points", "Points", 26.5),
            ],
            ..Default::default()
        };
        let query = PropQuery {
            player_id: "P1",
            stat_id: "points",
            stat_text: "Points",
            side: OddSide::Over,
            line: Some(7.5),
        };
        assert_eq!(select_prop_odd(&event, &query).unwrap().id, "c");

        let quarter = PropQuery {
            stat_text: "1st Quarter Points",
            ..query.clone()
        };
        assert_eq!(select_prop_odd(&event, &quarter).unwrap().id, "a");
    }

    #[test]
    fn exact_stat_outranks_closer_inexact_line() {
        let event = Event {
            odds: vec![
                prop("a", "rebounds_offensive", "Offensive Rebounds", 9.5),
                prop("b", "rebounds", "Rebounds", 12.5),
            ],
            ..Default::default()
        };
        let query = PropQuery {
            player_id: "P1",
            stat_id: "rebounds",
            stat_text: "Rebounds",
            side: OddSide::Over,
            line: Some(9.5),
        };
        assert_eq!(select_prop_odd(&event, &query).unwrap().id, "b");
    }
}
