/// Smallest decimal price accepted for a bet.
pub const MIN_DECIMAL_ODDS: f64 = 1.01;

/// Convert an American price (e.g. `+150`, `-110`) to decimal odds.
///
/// Returns `None` for prices inside the (-100, 100) dead zone, which no book quotes.
pub fn american_to_decimal(american: f64) -> Option<f64> {
    if !american.is_finite() {
        return None;
    }
    if american >= 100.0 {
        Some(1.0 + american / 100.0)
    } else if american <= -100.0 {
        Some(1.0 + 100.0 / american.abs())
    } else {
        None
    }
}

/// Convert decimal odds back to an American price.
pub fn decimal_to_american(decimal: f64) -> Option<f64> {
    if !decimal.is_finite() || decimal <= 1.0 {
        return None;
    }
    if decimal >= 2.0 {
        Some((decimal - 1.0) * 100.0)
    } else {
        Some(-100.0 / (decimal - 1.0))
    }
}

/// Parse fractional odds such as `5/2` or `1/3` into decimal odds.
pub fn fractional_to_decimal(text: &str) -> Option<f64> {
    let (num, den) = text.trim().split_once('/')?;
    let num: f64 = num.trim().parse().ok()?;
    let den: f64 = den.trim().parse().ok()?;
    if den <= 0.0 || num < 0.0 {
        return None;
    }
    Some(1.0 + num / den)
}

/// Relative error of `submitted` against `reference`, `|s - r| / |r|`.
pub fn relative_error(submitted: f64, reference: f64) -> f64 {
    (submitted - reference).abs() / reference.abs()
}

/// Line comparison shared by validation: a zero reference line must match within
/// `zero_epsilon` in absolute terms, any other line within `tolerance` relative error.
pub fn line_within_tolerance(submitted: f64, reference: f64, tolerance: f64, zero_epsilon: f64) -> bool {
    if reference == 0.0 {
        return submitted.abs() <= zero_epsilon;
    }
    relative_error(submitted, reference) <= tolerance
}

/// Product of leg decimal odds, i.e. the fair parlay price.
pub fn parlay_decimal(legs: &[f64]) -> f64 {
    legs.iter().product()
}
