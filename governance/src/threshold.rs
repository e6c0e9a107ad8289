//! Threshold math
//!
//! Thresholds are configured in basis points and turned into absolute
//! voting-power amounts against the larger of the current total and the
//! historical maximum of voting power, so a mass unstake cannot make
//! thresholds cheap. Results are rounded up.

use crate::error::{GovernanceError, Result};

/// Basis-point denominator (100% = 10000).
pub const THRESHOLD_PRECISION: u64 = 10_000;

/// Baseline thresholds are computed against.
pub fn reference_power(total: u128, historical_max: u128) -> u128 {
    total.max(historical_max)
}

/// `ceil(numerator_bps * reference / 10000)` without overflowing.
pub fn absolute_threshold(numerator_bps: u64, reference: u128) -> u128 {
    let precision = THRESHOLD_PRECISION as u128;
    let numerator = numerator_bps as u128;
    let whole = (reference / precision) * numerator;
    let rest = (reference % precision) * numerator;
    whole + rest.div_ceil(precision)
}

pub fn is_threshold_reached(votes: u128, numerator_bps: u64, reference: u128) -> bool {
    votes >= absolute_threshold(numerator_bps, reference)
}

pub fn validate_numerator(numerator_bps: u64) -> Result<()> {
    if numerator_bps > THRESHOLD_PRECISION {
        return Err(GovernanceError::InvalidThreshold(numerator_bps));
    }
    Ok(())
}
