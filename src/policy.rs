//! Warning-rule policy.
//!
//! All severity thresholds are fixed business rules, not user tunables.
//! They live here in named tables so the four report variants share one
//! source of truth, and the rules that the stablecoin income and stablecoin
//! risk variants apply identically are implemented here exactly once.

use tracing::debug;

use crate::types::{RateType, Severity, VenueType, Warning, WarningKind};

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Allocation weights must sum to 100 within this tolerance.
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.01;

/// Floor applied to divisors that could reach zero.
pub const DIVISOR_EPSILON: f64 = 1e-6;

/// Amber/red cutoffs for a summed weight, in percent. A weight strictly
/// above `red` is red, strictly above `amber` is amber, otherwise clean.
#[derive(Debug, Clone, Copy)]
pub struct ConcentrationThresholds {
    pub amber: f64,
    pub red: f64,
}

impl ConcentrationThresholds {
    pub fn severity_for(&self, weight_pct: f64) -> Option<Severity> {
        if weight_pct > self.red {
            Some(Severity::Red)
        } else if weight_pct > self.amber {
            Some(Severity::Amber)
        } else {
            None
        }
    }
}

/// Per-issuer concentration, shared by the fiat issuer rule and the
/// stablecoin CeFi counterparty rule.
pub const ISSUER_CONCENTRATION: ConcentrationThresholds =
    ConcentrationThresholds { amber: 50.0, red: 70.0 };

/// Aggregate DeFi (smart-contract) exposure.
pub const SMART_CONTRACT_EXPOSURE: ConcentrationThresholds =
    ConcentrationThresholds { amber: 70.0, red: 85.0 };

/// Promotional-rate exposure (stablecoin variants).
pub const PROMO_RATE_EXPOSURE: ConcentrationThresholds =
    ConcentrationThresholds { amber: 30.0, red: 50.0 };

/// Discretionary-rate exposure (fiat variant). Same cutoffs as promo.
pub const DISCRETIONARY_RATE_EXPOSURE: ConcentrationThresholds =
    ConcentrationThresholds { amber: 30.0, red: 50.0 };

// ---------------------------------------------------------------------------
// Shared exposure view
// ---------------------------------------------------------------------------

/// The slice of an allocation entry the shared rules need. Both stablecoin
/// variants project their entries into this view before running the rules.
#[derive(Debug, Clone)]
pub struct ExposureEntry<'a> {
    pub issuer: &'a str,
    pub venue: VenueType,
    pub rate_type: RateType,
    /// Weight in percent (0–100).
    pub weight: f64,
}

/// Sum weights per issuer, preserving first-seen order so warning output is
/// stable across runs.
pub(crate) fn weight_by_issuer<'a>(entries: &[ExposureEntry<'a>]) -> Vec<(&'a str, f64)> {
    let mut totals: Vec<(&str, f64)> = Vec::new();
    for entry in entries {
        match totals.iter_mut().find(|(issuer, _)| *issuer == entry.issuer) {
            Some((_, w)) => *w += entry.weight,
            None => totals.push((entry.issuer, entry.weight)),
        }
    }
    totals
}

// ---------------------------------------------------------------------------
// Shared rules (stablecoin income + stablecoin risk)
// ---------------------------------------------------------------------------

/// Per-issuer CeFi counterparty concentration: > 70% red, > 50% amber.
pub fn counterparty_warnings(entries: &[ExposureEntry<'_>]) -> Vec<Warning> {
    let cefi: Vec<ExposureEntry<'_>> = entries
        .iter()
        .filter(|e| e.venue == VenueType::CeFi)
        .cloned()
        .collect();

    let mut warnings = Vec::new();
    for (issuer, weight) in weight_by_issuer(&cefi) {
        if let Some(severity) = ISSUER_CONCENTRATION.severity_for(weight) {
            debug!(issuer, weight, %severity, "Counterparty concentration");
            warnings.push(Warning::new(
                WarningKind::Counterparty,
                severity,
                format!("CeFi counterparty {issuer} carries {weight:.1}% of the allocation"),
            ));
        }
    }
    warnings
}

/// Aggregate DeFi smart-contract exposure: > 85% red, > 70% amber.
pub fn smart_contract_warning(entries: &[ExposureEntry<'_>]) -> Option<Warning> {
    let defi_weight: f64 = entries
        .iter()
        .filter(|e| e.venue == VenueType::DeFi)
        .map(|e| e.weight)
        .sum();

    SMART_CONTRACT_EXPOSURE.severity_for(defi_weight).map(|severity| {
        debug!(defi_weight, %severity, "Smart-contract exposure");
        Warning::new(
            WarningKind::SmartContract,
            severity,
            format!("DeFi venues carry {defi_weight:.1}% of the allocation (smart-contract risk)"),
        )
    })
}

/// Promotional-rate exposure: > 50% red, > 30% amber.
pub fn promo_rate_warning(entries: &[ExposureEntry<'_>]) -> Option<Warning> {
    let promo_weight: f64 = entries
        .iter()
        .filter(|e| e.rate_type == RateType::Promo)
        .map(|e| e.weight)
        .sum();

    PROMO_RATE_EXPOSURE.severity_for(promo_weight).map(|severity| {
        debug!(promo_weight, %severity, "Promo-rate exposure");
        Warning::new(
            WarningKind::Promo,
            severity,
            format!("Promotional rates back {promo_weight:.1}% of the allocation"),
        )
    })
}

/// Single 100%-weight allocation: amber peg-concentration nudge.
pub fn peg_warning(entries: &[ExposureEntry<'_>]) -> Option<Warning> {
    if entries.len() == 1 && (entries[0].weight - 100.0).abs() <= WEIGHT_SUM_TOLERANCE {
        debug!(issuer = entries[0].issuer, "Single-allocation peg concentration");
        Some(Warning::new(
            WarningKind::Peg,
            Severity::Amber,
            "Entire allocation sits on a single product; consider peg risk",
        ))
    } else {
        None
    }
}

/// All four shared stablecoin rules in one pass, in a stable order.
pub fn shared_stablecoin_warnings(entries: &[ExposureEntry<'_>]) -> Vec<Warning> {
    let mut warnings = counterparty_warnings(entries);
    warnings.extend(smart_contract_warning(entries));
    warnings.extend(promo_rate_warning(entries));
    warnings.extend(peg_warning(entries));
    warnings
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(issuer: &str, venue: VenueType, rate: RateType, weight: f64) -> ExposureEntry<'_> {
        ExposureEntry {
            issuer,
            venue,
            rate_type: rate,
            weight,
        }
    }

    #[test]
    fn test_severity_for_boundaries() {
        let t = ISSUER_CONCENTRATION;
        assert_eq!(t.severity_for(50.0), None); // strictly-above rule
        assert_eq!(t.severity_for(50.1), Some(Severity::Amber));
        assert_eq!(t.severity_for(70.0), Some(Severity::Amber));
        assert_eq!(t.severity_for(70.1), Some(Severity::Red));
        assert_eq!(t.severity_for(100.0), Some(Severity::Red));
    }

    #[test]
    fn test_counterparty_same_issuer_summed() {
        // 60 + 20 on the same CeFi issuer = 80% → one red warning naming it.
        let entries = vec![
            entry("Acme Lend", VenueType::CeFi, RateType::Variable, 60.0),
            entry("Acme Lend", VenueType::CeFi, RateType::Fixed, 20.0),
            entry("Other", VenueType::CeFi, RateType::Fixed, 20.0),
        ];
        let warnings = counterparty_warnings(&entries);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].severity, Severity::Red);
        assert_eq!(warnings[0].kind, WarningKind::Counterparty);
        assert!(warnings[0].message.contains("Acme Lend"));
    }

    #[test]
    fn test_counterparty_ignores_defi_and_rwa() {
        let entries = vec![
            entry("Acme", VenueType::DeFi, RateType::Variable, 90.0),
            entry("Acme", VenueType::Rwa, RateType::Fixed, 10.0),
        ];
        assert!(counterparty_warnings(&entries).is_empty());
    }

    #[test]
    fn test_counterparty_amber_band() {
        let entries = vec![
            entry("Acme", VenueType::CeFi, RateType::Fixed, 60.0),
            entry("Beta", VenueType::CeFi, RateType::Fixed, 40.0),
        ];
        let warnings = counterparty_warnings(&entries);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].severity, Severity::Amber);
        assert!(warnings[0].message.contains("Acme"));
    }

    #[test]
    fn test_smart_contract_thresholds() {
        let mk = |w: f64| {
            vec![
                entry("A", VenueType::DeFi, RateType::Variable, w),
                entry("B", VenueType::CeFi, RateType::Fixed, 100.0 - w),
            ]
        };
        assert!(smart_contract_warning(&mk(70.0)).is_none());
        assert_eq!(
            smart_contract_warning(&mk(75.0)).unwrap().severity,
            Severity::Amber
        );
        assert_eq!(
            smart_contract_warning(&mk(90.0)).unwrap().severity,
            Severity::Red
        );
    }

    #[test]
    fn test_promo_rate_thresholds() {
        let mk = |w: f64| {
            vec![
                entry("A", VenueType::CeFi, RateType::Promo, w),
                entry("B", VenueType::CeFi, RateType::Fixed, 100.0 - w),
            ]
        };
        assert!(promo_rate_warning(&mk(30.0)).is_none());
        assert_eq!(promo_rate_warning(&mk(35.0)).unwrap().severity, Severity::Amber);
        assert_eq!(promo_rate_warning(&mk(55.0)).unwrap().severity, Severity::Red);
    }

    #[test]
    fn test_peg_warning_single_full_weight() {
        let entries = vec![entry("A", VenueType::CeFi, RateType::Fixed, 100.0)];
        let w = peg_warning(&entries).unwrap();
        assert_eq!(w.severity, Severity::Amber);
        assert_eq!(w.kind, WarningKind::Peg);
        assert!(w.message.contains("peg"));
    }

    #[test]
    fn test_peg_warning_absent_for_split_allocation() {
        let entries = vec![
            entry("A", VenueType::CeFi, RateType::Fixed, 50.0),
            entry("B", VenueType::CeFi, RateType::Fixed, 50.0),
        ];
        assert!(peg_warning(&entries).is_none());
    }

    #[test]
    fn test_shared_warnings_order_is_stable() {
        // One entry trips counterparty (100% CeFi issuer), promo, and peg.
        let entries = vec![entry("Solo", VenueType::CeFi, RateType::Promo, 100.0)];
        let warnings = shared_stablecoin_warnings(&entries);
        let kinds: Vec<WarningKind> = warnings.iter().map(|w| w.kind).collect();
        assert_eq!(
            kinds,
            vec![WarningKind::Counterparty, WarningKind::Promo, WarningKind::Peg]
        );
    }

    #[test]
    fn test_weight_by_issuer_preserves_first_seen_order() {
        let entries = vec![
            entry("B", VenueType::CeFi, RateType::Fixed, 10.0),
            entry("A", VenueType::CeFi, RateType::Fixed, 20.0),
            entry("B", VenueType::CeFi, RateType::Fixed, 30.0),
        ];
        let totals = weight_by_issuer(&entries);
        assert_eq!(totals[0], ("B", 40.0));
        assert_eq!(totals[1], ("A", 20.0));
    }
}
