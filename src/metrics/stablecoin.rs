//! Stablecoin income metrics (module 1C).
//!
//! Projects monthly and horizon income from a principal spread across
//! stablecoin products, counting only entries the plan holder is actually
//! eligible for, and applies the stablecoin warning rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{blend_apy, require_positive, resolve_rate_as_of, validate_weight_sum};
use crate::eligibility::resolve_eligibility;
use crate::policy::{self, ExposureEntry};
use crate::types::{
    latest_snapshot, EligibilityStatus, Instrument, LiquidityPreference, LiquidityTier,
    MetricsError, ModuleTag, RateSnapshot, RateType, Severity, VenueType, Warning, WarningKind,
};

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Scenario parameters for a stablecoin income plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StablecoinPlan {
    /// Deployed principal in the stablecoin's unit.
    pub principal: f64,
    pub horizon_months: u32,
    pub target_monthly_income: Option<f64>,
    pub region: Option<String>,
    pub liquidity_preference: Option<LiquidityPreference>,
    pub stablecoin_asset: Option<String>,
}

impl Default for StablecoinPlan {
    fn default() -> Self {
        Self {
            principal: 0.0,
            horizon_months: 12,
            target_monthly_income: None,
            region: None,
            liquidity_preference: None,
            stablecoin_asset: None,
        }
    }
}

/// One weighted stablecoin product, joined with its latest snapshot and a
/// pre-resolved eligibility status (see [`crate::eligibility`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StablecoinAllocationEntry {
    pub product_name: String,
    pub issuer: String,
    pub venue_type: VenueType,
    /// Weight in percent (0–100).
    pub weight: f64,
    pub apy_min: Option<f64>,
    pub apy_max: Option<f64>,
    pub rate_type: RateType,
    #[serde(rename = "eligibilityStatus")]
    pub eligibility: EligibilityStatus,
    pub liquidity: LiquidityTier,
    #[serde(default)]
    pub regions: Vec<String>,
    #[serde(default)]
    pub rate_as_of: Option<DateTime<Utc>>,
}

impl StablecoinAllocationEntry {
    /// Join a catalog instrument with its latest rate snapshot, resolving
    /// eligibility against the plan region up front. Rejects instruments
    /// routed in from another planner.
    pub fn from_instrument(
        instrument: &Instrument,
        snapshots: &[RateSnapshot],
        weight: f64,
        liquidity: LiquidityTier,
        plan_region: Option<&str>,
    ) -> Result<Self, MetricsError> {
        if instrument.module != ModuleTag::Stablecoin {
            return Err(MetricsError::ModuleMismatch {
                instrument: instrument.name.clone(),
                expected: ModuleTag::Stablecoin,
                found: instrument.module,
            });
        }
        let latest = latest_snapshot(snapshots);
        Ok(Self {
            product_name: instrument.name.clone(),
            issuer: instrument.issuer.clone(),
            venue_type: instrument.venue_type.unwrap_or(VenueType::CeFi),
            weight,
            apy_min: latest.and_then(|s| s.apy_min),
            apy_max: latest.and_then(|s| s.apy_max),
            rate_type: latest.map_or(instrument.rate_type, |s| s.rate_type),
            eligibility: resolve_eligibility(&instrument.regions, plan_region),
            liquidity,
            regions: instrument.regions.clone(),
            rate_as_of: latest.map(|s| s.as_of),
        })
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Stablecoin income projections. Ineligible entries contribute nothing to
/// the income and APY figures but still count toward the warning rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StablecoinMetrics {
    pub principal: f64,
    pub monthly_income_min: f64,
    pub monthly_income_max: f64,
    pub total_income_min: f64,
    pub total_income_max: f64,
    /// Target monthly income minus the conservative projection, when a
    /// target was given. Positive = shortfall.
    pub gap_vs_target: Option<f64>,
    pub portfolio_apy_min: f64,
    pub portfolio_apy_max: f64,
    pub warnings: Vec<Warning>,
    pub rate_as_of: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Computation
// ---------------------------------------------------------------------------

/// Compute stablecoin income metrics for a plan and allocation.
pub fn compute_stablecoin_metrics(
    plan: &StablecoinPlan,
    allocation: &[StablecoinAllocationEntry],
) -> Result<StablecoinMetrics, MetricsError> {
    require_positive("principal", plan.principal)?;
    if allocation.is_empty() {
        return Err(MetricsError::EmptyAllocation);
    }
    validate_weight_sum(allocation.iter().map(|e| e.weight))?;

    let eligible: Vec<&StablecoinAllocationEntry> = allocation
        .iter()
        .filter(|e| e.eligibility == EligibilityStatus::Eligible)
        .collect();

    let portfolio_apy_min = blend_apy(
        eligible
            .iter()
            .map(|e| (e.weight, e.apy_min.unwrap_or(0.0))),
    );
    let portfolio_apy_max = blend_apy(
        eligible
            .iter()
            .map(|e| (e.weight, e.apy_max.unwrap_or(0.0))),
    );

    let monthly_income_min = plan.principal * portfolio_apy_min / 100.0 / 12.0;
    let monthly_income_max = plan.principal * portfolio_apy_max / 100.0 / 12.0;
    let horizon = plan.horizon_months as f64;
    let total_income_min = monthly_income_min * horizon;
    let total_income_max = monthly_income_max * horizon;

    let gap_vs_target = plan
        .target_monthly_income
        .map(|target| target - monthly_income_min);

    let warnings = stablecoin_warnings(plan, allocation);
    let rate_as_of = resolve_rate_as_of(allocation.first().and_then(|e| e.rate_as_of));

    debug!(
        principal = plan.principal,
        eligible = eligible.len(),
        of = allocation.len(),
        monthly_income_min = format!("{monthly_income_min:.2}"),
        warnings = warnings.len(),
        "Stablecoin metrics computed"
    );

    Ok(StablecoinMetrics {
        principal: plan.principal,
        monthly_income_min,
        monthly_income_max,
        total_income_min,
        total_income_max,
        gap_vs_target,
        portfolio_apy_min,
        portfolio_apy_max,
        warnings,
        rate_as_of,
    })
}

fn stablecoin_warnings(
    plan: &StablecoinPlan,
    allocation: &[StablecoinAllocationEntry],
) -> Vec<Warning> {
    let mut warnings = Vec::new();

    // Per-entry eligibility.
    for entry in allocation {
        match entry.eligibility {
            EligibilityStatus::NotEligible => warnings.push(Warning::new(
                WarningKind::Eligibility,
                Severity::Red,
                format!("{} is not eligible for this plan", entry.product_name),
            )),
            EligibilityStatus::CheckEligibility => warnings.push(Warning::new(
                WarningKind::Eligibility,
                Severity::Amber,
                format!("Check eligibility for {}", entry.product_name),
            )),
            EligibilityStatus::Eligible => {}
        }
    }

    // Liquidity against the stated preference.
    match plan.liquidity_preference {
        Some(LiquidityPreference::OnDemand) => {
            for entry in allocation {
                let acceptable = matches!(
                    entry.liquidity,
                    LiquidityTier::OnDemand | LiquidityTier::Flexible
                );
                if !acceptable {
                    warnings.push(Warning::new(
                        WarningKind::Liquidity,
                        Severity::Amber,
                        format!(
                            "{} settles {} but the plan asks for on-demand liquidity",
                            entry.product_name, entry.liquidity
                        ),
                    ));
                }
            }
        }
        Some(LiquidityPreference::Within24h) => {
            for entry in allocation {
                if entry.liquidity.is_slow() {
                    warnings.push(Warning::new(
                        WarningKind::Liquidity,
                        Severity::Red,
                        format!(
                            "{} settles {} and cannot meet a 24h exit",
                            entry.product_name, entry.liquidity
                        ),
                    ));
                }
            }
        }
        None => {}
    }

    // Counterparty / smart-contract / promo / peg rules shared with the
    // stablecoin risk variant.
    let exposures: Vec<ExposureEntry<'_>> = allocation
        .iter()
        .map(|e| ExposureEntry {
            issuer: &e.issuer,
            venue: e.venue_type,
            rate_type: e.rate_type,
            weight: e.weight,
        })
        .collect();
    warnings.extend(policy::shared_stablecoin_warnings(&exposures));

    warnings
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
