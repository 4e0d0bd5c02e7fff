use crate::types::ValidationConfig;

/// Tolerances applied when checking a submitted bet against the provider's quote.
#[derive(Clone, Debug)]
pub struct ValidationParams {
    /// Maximum relative error between submitted and provider decimal odds (0.05 = 5%).
    pub odds_tolerance: f64,
    /// Maximum relative error between submitted and provider lines.
    pub line_tolerance: f64,
    /// Absolute tolerance used instead when the provider line is exactly zero.
    pub zero_line_epsilon: f64,
}

impl Default for ValidationParams {
    fn default() -> Self {
        Self::from(&ValidationConfig::default())
    }
}

impl From<&ValidationConfig> for ValidationParams {
    fn from(cfg: &ValidationConfig) -> Self {
        Self {
            odds_tolerance: cfg.odds_tolerance,
            line_tolerance: cfg.line_tolerance,
            zero_line_epsilon: cfg.zero_line_epsilon,
        }
    }
}
