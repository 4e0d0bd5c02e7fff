use crate::domain::BetResult;

/// Parent result from its legs' results.
///
/// No legs is a void. A pending leg holds the whole parlay. Any loss loses it, and a
/// void or pushed leg voids it rather than re-pricing the remaining legs.
pub fn aggregate_legs(legs: &[BetResult]) -> BetResult {
    if legs.is_empty() {
        return BetResult::Void;
    }
    if legs.contains(&BetResult::Pending) {
        return BetResult::Pending;
    }
    if legs.contains(&BetResult::Loss) {
        return BetResult::Loss;
    }
    if legs.iter().any(|r| matches!(r, BetResult::Void | BetResult::Push)) {
        return BetResult::Void;
    }
    if legs.iter().all(|r| *r == BetResult::Win) {
        return BetResult::Win;
    }
    BetResult::Void
}
