//! Metrics engine — the four report-variant computations.
//!
//! Pure, synchronous, stateless: each function takes caller-supplied plan
//! parameters and (where applicable) a weighted allocation joined with the
//! latest rate snapshots, and returns a new metrics value or a
//! [`MetricsError`]. Nothing here performs I/O or holds state between calls.

pub mod btc_loan;
pub mod fiat;
pub mod stablecoin;
pub mod stablecoin_risk;

use chrono::{DateTime, Utc};

use crate::policy::WEIGHT_SUM_TOLERANCE;
use crate::types::MetricsError;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Verify that allocation weights sum to 100 within tolerance.
pub(crate) fn validate_weight_sum(
    weights: impl IntoIterator<Item = f64>,
) -> Result<(), MetricsError> {
    let sum: f64 = weights.into_iter().sum();
    if (sum - 100.0).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(MetricsError::WeightSumMismatch {
            sum,
            tolerance: WEIGHT_SUM_TOLERANCE,
        });
    }
    Ok(())
}

/// Reject non-positive required parameters.
pub(crate) fn require_positive(name: &'static str, value: f64) -> Result<(), MetricsError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(MetricsError::non_positive(name, value))
    }
}

/// Linear weighted APY blend: Σ weight/100 × apy, in percent.
pub(crate) fn blend_apy(pairs: impl IntoIterator<Item = (f64, f64)>) -> f64 {
    pairs
        .into_iter()
        .map(|(weight, apy)| weight / 100.0 * apy)
        .sum()
}

/// Rate timestamp for a result: the first entry's snapshot date when one is
/// present, otherwise the current time. Tests inject explicit dates to keep
/// outputs deterministic.
pub(crate) fn resolve_rate_as_of(first: Option<DateTime<Utc>>) -> DateTime<Utc> {
    first.unwrap_or_else(Utc::now)
}
