//! Fiat income metrics (module 1B).
//!
//! Back-solves the capital required to hit a target annual income from a
//! weighted allocation of fiat income products, and flags concentration,
//! liquidity, rate-type, and eligibility risks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{blend_apy, require_positive, resolve_rate_as_of, validate_weight_sum};
use crate::eligibility::resolve_eligibility;
use crate::policy::{
    self, DIVISOR_EPSILON, DISCRETIONARY_RATE_EXPOSURE, ISSUER_CONCENTRATION,
};
use crate::types::{
    latest_snapshot, EligibilityStatus, Instrument, LiquidityPreference, LiquidityTier,
    MetricsError, ModuleTag, RateSnapshot, RateType, Severity, Warning, WarningKind,
};

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Scenario parameters for a fiat income plan. Either target field may be
/// set; an explicit annual target wins over monthly × 12.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FiatPlan {
    pub target_monthly_income: Option<f64>,
    pub target_annual_income: Option<f64>,
    pub horizon_months: Option<u32>,
    pub region: Option<String>,
    pub liquidity_preference: Option<LiquidityPreference>,
    pub exclude_discretionary: bool,
    pub available_capital: Option<f64>,
}

/// One weighted fiat product, already joined with its latest rate snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiatAllocationEntry {
    pub issuer: String,
    pub name: String,
    /// Weight in percent (0–100).
    pub weight: f64,
    /// Advertised APY bounds in percent. None = unpublished, blended as 0.
    pub apy_min: Option<f64>,
    pub apy_max: Option<f64>,
    pub rate_type: RateType,
    pub liquidity: LiquidityTier,
    /// Region eligibility tags. Empty means globally available.
    #[serde(default)]
    pub regions: Vec<String>,
    /// Snapshot date of the joined rate observation.
    #[serde(default)]
    pub rate_as_of: Option<DateTime<Utc>>,
}

impl FiatAllocationEntry {
    /// Join a catalog instrument with its latest rate snapshot. Rejects
    /// instruments routed in from another planner; weight and liquidity come
    /// from the plan itself.
    pub fn from_instrument(
        instrument: &Instrument,
        snapshots: &[RateSnapshot],
        weight: f64,
        liquidity: LiquidityTier,
    ) -> Result<Self, MetricsError> {
        if instrument.module != ModuleTag::FiatIncome {
            return Err(MetricsError::ModuleMismatch {
                instrument: instrument.name.clone(),
                expected: ModuleTag::FiatIncome,
                found: instrument.module,
            });
        }
        let latest = latest_snapshot(snapshots);
        Ok(Self {
            issuer: instrument.issuer.clone(),
            name: instrument.name.clone(),
            weight,
            apy_min: latest.and_then(|s| s.apy_min),
            apy_max: latest.and_then(|s| s.apy_max),
            rate_type: latest.map_or(instrument.rate_type, |s| s.rate_type),
            liquidity,
            regions: instrument.regions.clone(),
            rate_as_of: latest.map(|s| s.as_of),
        })
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Fiat income projections. `required_capital_min` pairs with the
/// conservative `portfolio_apy_min` (and is therefore the larger figure).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiatMetrics {
    pub target_annual_income: f64,
    pub target_monthly_income: f64,
    pub portfolio_apy_min: f64,
    pub portfolio_apy_max: f64,
    pub required_capital_min: f64,
    pub required_capital_max: f64,
    pub expected_income_min: Option<f64>,
    pub expected_income_max: Option<f64>,
    pub warnings: Vec<Warning>,
    pub rate_as_of: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Computation
// ---------------------------------------------------------------------------

/// Compute fiat income metrics for a plan and allocation.
pub fn compute_fiat_metrics(
    plan: &FiatPlan,
    allocation: &[FiatAllocationEntry],
) -> Result<FiatMetrics, MetricsError> {
    let target_annual_income = match plan.target_annual_income {
        Some(annual) if annual > 0.0 => annual,
        _ => plan.target_monthly_income.unwrap_or(0.0) * 12.0,
    };
    require_positive("targetAnnualIncome", target_annual_income)?;

    if allocation.is_empty() {
        return Err(MetricsError::EmptyAllocation);
    }
    validate_weight_sum(allocation.iter().map(|e| e.weight))?;

    let portfolio_apy_min = blend_apy(
        allocation
            .iter()
            .map(|e| (e.weight, e.apy_min.unwrap_or(0.0))),
    );
    let portfolio_apy_max = blend_apy(
        allocation
            .iter()
            .map(|e| (e.weight, e.apy_max.unwrap_or(0.0))),
    );

    // Epsilon floor keeps a zero-APY allocation from dividing by zero.
    let required_capital_min = target_annual_income / (portfolio_apy_min / 100.0).max(DIVISOR_EPSILON);
    let required_capital_max = target_annual_income / (portfolio_apy_max / 100.0).max(DIVISOR_EPSILON);

    let (expected_income_min, expected_income_max) = match plan.available_capital {
        Some(capital) if capital > 0.0 => (
            Some(capital * portfolio_apy_min / 100.0),
            Some(capital * portfolio_apy_max / 100.0),
        ),
        _ => (None, None),
    };

    let warnings = fiat_warnings(plan, allocation);
    let rate_as_of = resolve_rate_as_of(allocation.first().and_then(|e| e.rate_as_of));

    debug!(
        target_annual_income,
        portfolio_apy_min,
        portfolio_apy_max,
        required_capital_min = format!("{required_capital_min:.0}"),
        warnings = warnings.len(),
        "Fiat metrics computed"
    );

    Ok(FiatMetrics {
        target_annual_income,
        target_monthly_income: target_annual_income / 12.0,
        portfolio_apy_min,
        portfolio_apy_max,
        required_capital_min,
        required_capital_max,
        expected_income_min,
        expected_income_max,
        warnings,
        rate_as_of,
    })
}

fn fiat_warnings(plan: &FiatPlan, allocation: &[FiatAllocationEntry]) -> Vec<Warning> {
    let mut warnings = Vec::new();

    // Issuer concentration: > 70% red, > 50% amber.
    let exposures: Vec<policy::ExposureEntry<'_>> = allocation
        .iter()
        .map(|e| policy::ExposureEntry {
            issuer: &e.issuer,
            venue: crate::types::VenueType::CeFi,
            rate_type: e.rate_type,
            weight: e.weight,
        })
        .collect();
    for (issuer, weight) in policy::weight_by_issuer(&exposures) {
        if let Some(severity) = ISSUER_CONCENTRATION.severity_for(weight) {
            warnings.push(Warning::new(
                WarningKind::Concentration,
                severity,
                format!("Issuer {issuer} carries {weight:.1}% of the allocation"),
            ));
        }
    }

    // Liquidity mismatch against an on-demand preference.
    if plan.liquidity_preference == Some(LiquidityPreference::OnDemand) {
        for entry in allocation {
            if entry.liquidity != LiquidityTier::OnDemand {
                warnings.push(Warning::new(
                    WarningKind::Liquidity,
                    Severity::Amber,
                    format!(
                        "{} settles {} but the plan asks for on-demand liquidity",
                        entry.name, entry.liquidity
                    ),
                ));
            }
        }
    }

    // Discretionary-rate concentration: > 50% red, > 30% amber.
    let discretionary_weight: f64 = allocation
        .iter()
        .filter(|e| e.rate_type == RateType::Discretionary)
        .map(|e| e.weight)
        .sum();
    if let Some(severity) = DISCRETIONARY_RATE_EXPOSURE.severity_for(discretionary_weight) {
        warnings.push(Warning::new(
            WarningKind::RateType,
            severity,
            format!("Discretionary rates back {discretionary_weight:.1}% of the allocation"),
        ));
    }

    // The planner asked to exclude discretionary rates but some remain.
    if plan.exclude_discretionary {
        for entry in allocation {
            if entry.rate_type == RateType::Discretionary {
                warnings.push(Warning::new(
                    WarningKind::RateType,
                    Severity::Amber,
                    format!(
                        "{} is discretionary-rate despite the exclusion preference",
                        entry.name
                    ),
                ));
            }
        }
    }

    // Region eligibility: restricted list that excludes the plan region.
    for entry in allocation {
        let status = resolve_eligibility(&entry.regions, plan.region.as_deref());
        if status == EligibilityStatus::NotEligible {
            let region = plan.region.as_deref().unwrap_or("the plan region");
            warnings.push(Warning::new(
                WarningKind::Eligibility,
                Severity::Red,
                format!("{} is not available in {region}", entry.name),
            ));
        }
    }

    warnings
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(issuer: &str, weight: f64, apy_min: f64, apy_max: f64) -> FiatAllocationEntry {
        FiatAllocationEntry {
            issuer: issuer.to_string(),
            name: format!("{issuer} Income"),
            weight,
            apy_min: Some(apy_min),
            apy_max: Some(apy_max),
            rate_type: RateType::Fixed,
            liquidity: LiquidityTier::OnDemand,
            regions: vec!["Global".to_string()],
            rate_as_of: None,
        }
    }

    fn plan_with_annual_target(target: f64) -> FiatPlan {
        FiatPlan {
            target_annual_income: Some(target),
            ..Default::default()
        }
    }

    fn catalog_instrument(module: ModuleTag) -> Instrument {
        Instrument {
            id: "inst-1".to_string(),
            issuer: "Acme".to_string(),
            name: "Acme Income".to_string(),
            module,
            collateral: String::new(),
            jurisdiction: String::new(),
            lockup: String::new(),
            seniority: String::new(),
            venue_type: None,
            rate_type: RateType::Fixed,
            regions: vec!["Global".to_string()],
        }
    }

    #[test]
    fn test_entry_from_instrument_joins_latest_snapshot() {
        let inst = catalog_instrument(ModuleTag::FiatIncome);
        let snapshots = vec![
            RateSnapshot {
                instrument_id: "inst-1".to_string(),
                apy_min: Some(3.0),
                apy_max: Some(4.0),
                rate_type: RateType::Fixed,
                as_of: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            },
            RateSnapshot {
                instrument_id: "inst-1".to_string(),
                apy_min: Some(5.0),
                apy_max: Some(7.0),
                rate_type: RateType::Variable,
                as_of: Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap(),
            },
        ];

        let e =
            FiatAllocationEntry::from_instrument(&inst, &snapshots, 100.0, LiquidityTier::OnDemand)
                .unwrap();
        assert_eq!(e.issuer, "Acme");
        assert_eq!(e.apy_min, Some(5.0));
        assert_eq!(e.apy_max, Some(7.0));
        assert_eq!(e.rate_type, RateType::Variable);
        assert_eq!(e.rate_as_of, Some(Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_entry_from_wrong_module_rejected() {
        let inst = catalog_instrument(ModuleTag::Stablecoin);
        let err =
            FiatAllocationEntry::from_instrument(&inst, &[], 100.0, LiquidityTier::OnDemand)
                .unwrap_err();
        assert!(matches!(
            err,
            MetricsError::ModuleMismatch {
                expected: ModuleTag::FiatIncome,
                found: ModuleTag::Stablecoin,
                ..
            }
        ));
    }

    #[test]
    fn test_entry_without_snapshots_keeps_catalog_rate_type() {
        let inst = catalog_instrument(ModuleTag::FiatIncome);
        let e = FiatAllocationEntry::from_instrument(&inst, &[], 100.0, LiquidityTier::OnDemand)
            .unwrap();
        assert!(e.apy_min.is_none());
        assert_eq!(e.rate_type, RateType::Fixed);
        assert!(e.rate_as_of.is_none());
    }

    #[test]
    fn test_single_entry_scenario() {
        // 100% at 5–7% APY against a 12 000 annual target.
        let plan = plan_with_annual_target(12_000.0);
        let allocation = vec![entry("Acme", 100.0, 5.0, 7.0)];
        let m = compute_fiat_metrics(&plan, &allocation).unwrap();

        assert!((m.portfolio_apy_min - 5.0).abs() < 1e-10);
        assert!((m.portfolio_apy_max - 7.0).abs() < 1e-10);
        assert!((m.required_capital_min - 240_000.0).abs() < 1e-6);
        assert!((m.required_capital_max - 171_428.571_428).abs() < 1e-3);
        assert!((m.target_monthly_income - 1_000.0).abs() < 1e-10);
        assert!(m.expected_income_min.is_none());
    }

    #[test]
    fn test_monthly_target_resolves_to_annual() {
        let plan = FiatPlan {
            target_monthly_income: Some(500.0),
            ..Default::default()
        };
        let m = compute_fiat_metrics(&plan, &[entry("Acme", 100.0, 5.0, 7.0)]).unwrap();
        assert!((m.target_annual_income - 6_000.0).abs() < 1e-10);
    }

    #[test]
    fn test_explicit_annual_target_wins() {
        let plan = FiatPlan {
            target_monthly_income: Some(500.0),
            target_annual_income: Some(24_000.0),
            ..Default::default()
        };
        let m = compute_fiat_metrics(&plan, &[entry("Acme", 100.0, 5.0, 7.0)]).unwrap();
        assert!((m.target_annual_income - 24_000.0).abs() < 1e-10);
    }

    #[test]
    fn test_zero_target_rejected() {
        let plan = FiatPlan::default();
        let err = compute_fiat_metrics(&plan, &[entry("Acme", 100.0, 5.0, 7.0)]).unwrap_err();
        assert!(matches!(err, MetricsError::NonPositiveParam { .. }));
    }

    #[test]
    fn test_empty_allocation_rejected() {
        let plan = plan_with_annual_target(12_000.0);
        let err = compute_fiat_metrics(&plan, &[]).unwrap_err();
        assert!(matches!(err, MetricsError::EmptyAllocation));
    }

    #[test]
    fn test_weight_sum_mismatch_rejected() {
        let plan = plan_with_annual_target(12_000.0);
        let allocation = vec![entry("A", 60.0, 4.0, 5.0), entry("B", 39.5, 4.0, 5.0)];
        let err = compute_fiat_metrics(&plan, &allocation).unwrap_err();
        assert!(matches!(err, MetricsError::WeightSumMismatch { .. }));
    }

    #[test]
    fn test_blend_is_linear_and_order_independent() {
        let plan = plan_with_annual_target(12_000.0);
        let a = vec![entry("A", 60.0, 4.0, 5.0), entry("B", 40.0, 6.0, 8.0)];
        let b = vec![entry("B", 40.0, 6.0, 8.0), entry("A", 60.0, 4.0, 5.0)];

        let ma = compute_fiat_metrics(&plan, &a).unwrap();
        let mb = compute_fiat_metrics(&plan, &b).unwrap();
        // 0.6*4 + 0.4*6 = 4.8
        assert!((ma.portfolio_apy_min - 4.8).abs() < 1e-10);
        assert!((ma.portfolio_apy_min - mb.portfolio_apy_min).abs() < 1e-12);
        assert!((ma.portfolio_apy_max - mb.portfolio_apy_max).abs() < 1e-12);
    }

    #[test]
    fn test_required_capital_decreases_as_apy_rises() {
        let plan = plan_with_annual_target(12_000.0);
        let low = compute_fiat_metrics(&plan, &[entry("A", 100.0, 3.0, 4.0)]).unwrap();
        let high = compute_fiat_metrics(&plan, &[entry("A", 100.0, 6.0, 8.0)]).unwrap();
        assert!(high.required_capital_min < low.required_capital_min);
    }

    #[test]
    fn test_zero_apy_floored_by_epsilon() {
        let plan = plan_with_annual_target(12_000.0);
        let m = compute_fiat_metrics(&plan, &[entry("A", 100.0, 0.0, 0.0)]).unwrap();
        // Finite (huge) rather than infinite.
        assert!(m.required_capital_min.is_finite());
        assert!((m.required_capital_min - 12_000.0 / DIVISOR_EPSILON).abs() < 1.0);
    }

    #[test]
    fn test_unpublished_apy_blended_as_zero() {
        let plan = plan_with_annual_target(12_000.0);
        let mut e = entry("A", 100.0, 5.0, 7.0);
        e.apy_min = None;
        let m = compute_fiat_metrics(&plan, &[e]).unwrap();
        assert!((m.portfolio_apy_min - 0.0).abs() < 1e-10);
        assert!((m.portfolio_apy_max - 7.0).abs() < 1e-10);
    }

    #[test]
    fn test_expected_income_from_available_capital() {
        let plan = FiatPlan {
            target_annual_income: Some(12_000.0),
            available_capital: Some(100_000.0),
            ..Default::default()
        };
        let m = compute_fiat_metrics(&plan, &[entry("A", 100.0, 5.0, 7.0)]).unwrap();
        assert!((m.expected_income_min.unwrap() - 5_000.0).abs() < 1e-10);
        assert!((m.expected_income_max.unwrap() - 7_000.0).abs() < 1e-10);
    }

    #[test]
    fn test_issuer_concentration_warning() {
        let plan = plan_with_annual_target(12_000.0);
        // Same issuer split 40/35 = 75% → red.
        let allocation = vec![
            entry("Acme", 40.0, 4.0, 5.0),
            entry("Acme", 35.0, 4.0, 5.0),
            entry("Other", 25.0, 4.0, 5.0),
        ];
        let m = compute_fiat_metrics(&plan, &allocation).unwrap();
        let concentration: Vec<&Warning> = m
            .warnings
            .iter()
            .filter(|w| w.kind == WarningKind::Concentration)
            .collect();
        assert_eq!(concentration.len(), 1);
        assert_eq!(concentration[0].severity, Severity::Red);
        assert!(concentration[0].message.contains("Acme"));
    }

    #[test]
    fn test_issuer_concentration_amber_band() {
        let plan = plan_with_annual_target(12_000.0);
        let allocation = vec![entry("Acme", 60.0, 4.0, 5.0), entry("Other", 40.0, 4.0, 5.0)];
        let m = compute_fiat_metrics(&plan, &allocation).unwrap();
        let w = m
            .warnings
            .iter()
            .find(|w| w.kind == WarningKind::Concentration)
            .unwrap();
        assert_eq!(w.severity, Severity::Amber);
    }

    #[test]
    fn test_liquidity_mismatch_warning() {
        let plan = FiatPlan {
            target_annual_income: Some(12_000.0),
            liquidity_preference: Some(LiquidityPreference::OnDemand),
            ..Default::default()
        };
        let mut slow = entry("A", 50.0, 4.0, 5.0);
        slow.liquidity = LiquidityTier::Monthly;
        let allocation = vec![slow, entry("B", 50.0, 4.0, 5.0)];
        let m = compute_fiat_metrics(&plan, &allocation).unwrap();
        let liq: Vec<&Warning> = m
            .warnings
            .iter()
            .filter(|w| w.kind == WarningKind::Liquidity)
            .collect();
        assert_eq!(liq.len(), 1);
        assert_eq!(liq[0].severity, Severity::Amber);
    }

    #[test]
    fn test_no_liquidity_warning_without_preference() {
        let plan = plan_with_annual_target(12_000.0);
        let mut slow = entry("A", 100.0, 4.0, 5.0);
        slow.liquidity = LiquidityTier::Locked;
        let m = compute_fiat_metrics(&plan, &[slow]).unwrap();
        assert!(!m.warnings.iter().any(|w| w.kind == WarningKind::Liquidity));
    }

    #[test]
    fn test_discretionary_concentration_thresholds() {
        let plan = plan_with_annual_target(12_000.0);
        let mut disc = entry("A", 40.0, 4.0, 5.0);
        disc.rate_type = RateType::Discretionary;
        let allocation = vec![disc.clone(), entry("B", 60.0, 4.0, 5.0)];
        let m = compute_fiat_metrics(&plan, &allocation).unwrap();
        let w = m
            .warnings
            .iter()
            .find(|w| w.kind == WarningKind::RateType)
            .unwrap();
        assert_eq!(w.severity, Severity::Amber);

        disc.weight = 60.0;
        let allocation = vec![disc, entry("B", 40.0, 4.0, 5.0)];
        let m = compute_fiat_metrics(&plan, &allocation).unwrap();
        let w = m
            .warnings
            .iter()
            .find(|w| w.kind == WarningKind::RateType)
            .unwrap();
        assert_eq!(w.severity, Severity::Red);
    }

    #[test]
    fn test_exclude_discretionary_flags_remaining_entries() {
        let plan = FiatPlan {
            target_annual_income: Some(12_000.0),
            exclude_discretionary: true,
            ..Default::default()
        };
        let mut disc = entry("A", 20.0, 4.0, 5.0);
        disc.rate_type = RateType::Discretionary;
        let allocation = vec![disc, entry("B", 80.0, 4.0, 5.0)];
        let m = compute_fiat_metrics(&plan, &allocation).unwrap();
        // 20% is below the concentration bands, so the only rate-type
        // warning comes from the exclusion preference.
        let rate_warnings: Vec<&Warning> = m
            .warnings
            .iter()
            .filter(|w| w.kind == WarningKind::RateType)
            .collect();
        assert_eq!(rate_warnings.len(), 1);
        assert!(rate_warnings[0].message.contains("exclusion preference"));
    }

    #[test]
    fn test_region_eligibility_warning() {
        let plan = FiatPlan {
            target_annual_income: Some(12_000.0),
            region: Some("EU".to_string()),
            ..Default::default()
        };
        let mut restricted = entry("A", 100.0, 4.0, 5.0);
        restricted.regions = vec!["US".to_string()];
        let m = compute_fiat_metrics(&plan, &[restricted]).unwrap();
        let w = m
            .warnings
            .iter()
            .find(|w| w.kind == WarningKind::Eligibility)
            .unwrap();
        assert_eq!(w.severity, Severity::Red);
        assert!(w.message.contains("EU"));
    }

    #[test]
    fn test_global_entry_emits_no_eligibility_warning() {
        let plan = FiatPlan {
            target_annual_income: Some(12_000.0),
            region: Some("EU".to_string()),
            ..Default::default()
        };
        let m = compute_fiat_metrics(&plan, &[entry("A", 100.0, 4.0, 5.0)]).unwrap();
        assert!(!m.warnings.iter().any(|w| w.kind == WarningKind::Eligibility));
    }

    #[test]
    fn test_rate_as_of_uses_first_snapshot_date() {
        let plan = plan_with_annual_target(12_000.0);
        let stamp = Utc.with_ymd_and_hms(2026, 2, 1, 8, 0, 0).unwrap();
        let mut first = entry("A", 60.0, 4.0, 5.0);
        first.rate_as_of = Some(stamp);
        let allocation = vec![first, entry("B", 40.0, 4.0, 5.0)];
        let m = compute_fiat_metrics(&plan, &allocation).unwrap();
        assert_eq!(m.rate_as_of, stamp);
    }

    #[test]
    fn test_idempotent_with_injected_date() {
        let plan = plan_with_annual_target(12_000.0);
        let stamp = Utc.with_ymd_and_hms(2026, 2, 1, 8, 0, 0).unwrap();
        let mut e = entry("A", 100.0, 5.0, 7.0);
        e.rate_as_of = Some(stamp);
        let allocation = vec![e];

        let a = compute_fiat_metrics(&plan, &allocation).unwrap();
        let b = compute_fiat_metrics(&plan, &allocation).unwrap();
        assert_eq!(
            serde_json::to_value(&a).unwrap(),
            serde_json::to_value(&b).unwrap()
        );
    }

    #[test]
    fn test_metrics_serialization_shape() {
        let plan = plan_with_annual_target(12_000.0);
        let m = compute_fiat_metrics(&plan, &[entry("A", 100.0, 5.0, 7.0)]).unwrap();
        let json = serde_json::to_value(&m).unwrap();
        assert!(json.get("portfolioApyMin").is_some());
        assert!(json.get("requiredCapitalMax").is_some());
        assert!(json.get("rateAsOf").is_some());
        assert!(json["warnings"].is_array());
    }
}
