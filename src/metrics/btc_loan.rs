//! BTC loan risk metrics (module 1A).
//!
//! Param-only variant: given a 12-month borrowing need and loan-to-value
//! settings, derives the BTC collateral required, the margin-call and
//! liquidation prices, a quadratic Scenario Risk Index, and a sensitivity
//! table across a fixed LTV grid.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use super::require_positive;
use crate::policy::DIVISOR_EPSILON;
use crate::types::MetricsError;

/// Fixed LTV grid for the sensitivity table, in percent.
const LTV_GRID: [f64; 5] = [10.0, 25.0, 50.0, 75.0, 85.0];

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Scenario parameters for a BTC-backed loan. Defaults reflect a mid-range
/// retail loan: 40 000 spot, 50% LTV, margin call at 75%, liquidation at 85%.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BtcLoanPlan {
    /// Total cash need over the next 12 months.
    #[serde(rename = "totalNeed12m")]
    pub total_need_12m: f64,
    /// Loan APR in percent, echoed for the report.
    pub apr: Option<f64>,
    pub btc_price: f64,
    #[serde(rename = "ltv")]
    pub ltv_pct: f64,
    #[serde(rename = "marginCallLtv")]
    pub margin_call_ltv_pct: f64,
    #[serde(rename = "liquidationLtv")]
    pub liquidation_ltv_pct: f64,
}

impl Default for BtcLoanPlan {
    fn default() -> Self {
        Self {
            total_need_12m: 0.0,
            apr: None,
            btc_price: 40_000.0,
            ltv_pct: 50.0,
            margin_call_ltv_pct: 75.0,
            liquidation_ltv_pct: 85.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Traffic-light risk classification of the chosen LTV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskIndicator {
    Green,
    Amber,
    Red,
}

impl fmt::Display for RiskIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskIndicator::Green => write!(f, "green"),
            RiskIndicator::Amber => write!(f, "amber"),
            RiskIndicator::Red => write!(f, "red"),
        }
    }
}

/// Banded Scenario Risk Index level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SriLevel {
    Lower,
    Moderate,
    High,
}

impl fmt::Display for SriLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SriLevel::Lower => write!(f, "lower"),
            SriLevel::Moderate => write!(f, "moderate"),
            SriLevel::High => write!(f, "high"),
        }
    }
}

/// One row of the LTV sensitivity table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LtvScenario {
    pub ltv: f64,
    pub btc_required: f64,
    pub margin_call_price: f64,
    pub liquidation_price: f64,
    pub risk: RiskIndicator,
}

/// BTC loan risk metrics plus echoed inputs. Risk is communicated through
/// the indicator and SRI level; this variant emits no warning list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BtcLoanRisk {
    #[serde(rename = "totalNeed12m")]
    pub total_need_12m: f64,
    pub apr: Option<f64>,
    pub btc_price: f64,
    pub ltv: f64,
    pub margin_call_ltv: f64,
    pub liquidation_ltv: f64,
    pub btc_required: f64,
    pub margin_call_price: f64,
    pub liquidation_price: f64,
    pub risk_indicator: RiskIndicator,
    pub sri: f64,
    pub sri_level: SriLevel,
    pub ltv_comparison: Vec<LtvScenario>,
}

// ---------------------------------------------------------------------------
// Computation
// ---------------------------------------------------------------------------

/// Compute BTC loan risk metrics from plan parameters alone.
pub fn compute_btc_loan_risk(plan: &BtcLoanPlan) -> Result<BtcLoanRisk, MetricsError> {
    require_positive("totalNeed12m", plan.total_need_12m)?;
    require_positive("btcPrice", plan.btc_price)?;

    let (btc_required, margin_call_price, liquidation_price) = collateral_at_ltv(
        plan.total_need_12m,
        plan.btc_price,
        plan.ltv_pct,
        plan.margin_call_ltv_pct,
        plan.liquidation_ltv_pct,
    );

    let risk_indicator = risk_for_ltv(plan.ltv_pct);
    let sri = scenario_risk_index(plan.ltv_pct, plan.liquidation_ltv_pct);
    let sri_level = sri_level_for(sri);

    let ltv_comparison = LTV_GRID
        .iter()
        .map(|&ltv| {
            let (btc_required, margin_call_price, liquidation_price) = collateral_at_ltv(
                plan.total_need_12m,
                plan.btc_price,
                ltv,
                plan.margin_call_ltv_pct,
                plan.liquidation_ltv_pct,
            );
            LtvScenario {
                ltv,
                btc_required,
                margin_call_price,
                liquidation_price,
                risk: risk_for_ltv(ltv),
            }
        })
        .collect();

    debug!(
        total_need = plan.total_need_12m,
        btc_required = format!("{btc_required:.4}"),
        %risk_indicator,
        sri = format!("{sri:.1}"),
        "BTC loan risk computed"
    );

    Ok(BtcLoanRisk {
        total_need_12m: plan.total_need_12m,
        apr: plan.apr,
        btc_price: plan.btc_price,
        ltv: plan.ltv_pct,
        margin_call_ltv: plan.margin_call_ltv_pct,
        liquidation_ltv: plan.liquidation_ltv_pct,
        btc_required,
        margin_call_price,
        liquidation_price,
        risk_indicator,
        sri,
        sri_level,
        ltv_comparison,
    })
}

/// Collateral back-solve at a given LTV: how much BTC secures the need, and
/// at what spot prices the margin-call and liquidation LTVs are hit.
fn collateral_at_ltv(
    total_need: f64,
    btc_price: f64,
    ltv_pct: f64,
    margin_call_ltv_pct: f64,
    liquidation_ltv_pct: f64,
) -> (f64, f64, f64) {
    let btc_required = total_need / (btc_price * ltv_pct / 100.0).max(DIVISOR_EPSILON);
    let margin_call_price =
        total_need / (btc_required * margin_call_ltv_pct / 100.0).max(DIVISOR_EPSILON);
    let liquidation_price =
        total_need / (btc_required * liquidation_ltv_pct / 100.0).max(DIVISOR_EPSILON);
    (btc_required, margin_call_price, liquidation_price)
}

fn risk_for_ltv(ltv_pct: f64) -> RiskIndicator {
    if ltv_pct <= 50.0 {
        RiskIndicator::Green
    } else if ltv_pct <= 75.0 {
        RiskIndicator::Amber
    } else {
        RiskIndicator::Red
    }
}

/// Quadratic sensitivity score: min(100 × (ltv / liquidationLtv)², 100).
/// Saturates at 100 once the chosen LTV reaches the liquidation LTV.
fn scenario_risk_index(ltv_pct: f64, liquidation_ltv_pct: f64) -> f64 {
    let ratio = ltv_pct / liquidation_ltv_pct.max(DIVISOR_EPSILON);
    (100.0 * ratio * ratio).min(100.0)
}

fn sri_level_for(sri: f64) -> SriLevel {
    if sri <= 40.0 {
        SriLevel::Lower
    } else if sri <= 70.0 {
        SriLevel::Moderate
    } else {
        SriLevel::High
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
