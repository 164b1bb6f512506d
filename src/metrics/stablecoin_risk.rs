//! Stablecoin risk metrics (module 1C, risk view).
//!
//! No income math here: this variant breaks the allocation down by venue,
//! passes each instrument's risk tags through for display, and applies the
//! same counterparty / smart-contract / promo / peg rules as the stablecoin
//! income variant. The plan region is informational only.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::validate_weight_sum;
use crate::policy::{self, ExposureEntry};
use crate::types::{MetricsError, RateType, VenueType, Warning};

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Scenario parameters for the stablecoin risk view.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StablecoinRiskPlan {
    pub region: Option<String>,
    pub stablecoin_asset: Option<String>,
}

/// One weighted stablecoin product with its stored risk tags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StablecoinRiskEntry {
    pub id: String,
    pub issuer: String,
    pub product_name: String,
    /// Missing or unrecognized venues bucket to CeFi.
    #[serde(default)]
    pub venue_type: Option<VenueType>,
    #[serde(default)]
    pub risk_tags: Vec<String>,
    /// Weight in percent (0–100).
    pub weight: f64,
    pub rate_type: RateType,
}

impl StablecoinRiskEntry {
    fn venue(&self) -> VenueType {
        self.venue_type.unwrap_or(VenueType::CeFi)
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Summed allocation weight per venue class, in percent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VenueBreakdown {
    #[serde(rename = "DeFi")]
    pub defi: f64,
    #[serde(rename = "CeFi")]
    pub cefi: f64,
    #[serde(rename = "RWA")]
    pub rwa: f64,
}

impl VenueBreakdown {
    pub fn total(&self) -> f64 {
        self.defi + self.cefi + self.rwa
    }
}

/// Per-instrument passthrough row: a structured tag listing, not a score.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentRiskTags {
    pub id: String,
    pub issuer: String,
    pub product_name: String,
    pub venue_type: VenueType,
    pub risk_tags: Vec<String>,
    pub weight: f64,
}

/// Stablecoin risk view: venue mix, tag listing, and warnings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StablecoinRiskMetrics {
    pub region: Option<String>,
    pub stablecoin_asset: Option<String>,
    pub venue_breakdown: VenueBreakdown,
    pub risk_tags_by_instrument: Vec<InstrumentRiskTags>,
    pub warnings: Vec<Warning>,
}

// ---------------------------------------------------------------------------
// Computation
// ---------------------------------------------------------------------------

/// Compute the stablecoin risk view for a plan and allocation.
pub fn compute_stablecoin_risk(
    plan: &StablecoinRiskPlan,
    allocation: &[StablecoinRiskEntry],
) -> Result<StablecoinRiskMetrics, MetricsError> {
    validate_weight_sum(allocation.iter().map(|e| e.weight))?;

    let mut venue_breakdown = VenueBreakdown::default();
    for entry in allocation {
        match entry.venue() {
            VenueType::DeFi => venue_breakdown.defi += entry.weight,
            VenueType::CeFi => venue_breakdown.cefi += entry.weight,
            VenueType::Rwa => venue_breakdown.rwa += entry.weight,
        }
    }

    let risk_tags_by_instrument = allocation
        .iter()
        .map(|e| InstrumentRiskTags {
            id: e.id.clone(),
            issuer: e.issuer.clone(),
            product_name: e.product_name.clone(),
            venue_type: e.venue(),
            risk_tags: e.risk_tags.clone(),
            weight: e.weight,
        })
        .collect();

    let exposures: Vec<ExposureEntry<'_>> = allocation
        .iter()
        .map(|e| ExposureEntry {
            issuer: &e.issuer,
            venue: e.venue(),
            rate_type: e.rate_type,
            weight: e.weight,
        })
        .collect();
    let warnings = policy::shared_stablecoin_warnings(&exposures);

    debug!(
        defi = venue_breakdown.defi,
        cefi = venue_breakdown.cefi,
        rwa = venue_breakdown.rwa,
        warnings = warnings.len(),
        "Stablecoin risk view computed"
    );

    Ok(StablecoinRiskMetrics {
        region: plan.region.clone(),
        stablecoin_asset: plan.stablecoin_asset.clone(),
        venue_breakdown,
        risk_tags_by_instrument,
        warnings,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
