//! Shared types for the Digital Credit Compass metrics engine.
//!
//! These types form the data contract between the engine and its callers.
//! Instruments and snapshots are owned by the external persistence layer;
//! the engine treats them as immutable input values and never mutates them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Classification enums
// ---------------------------------------------------------------------------

/// Product module an instrument belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModuleTag {
    /// 1A — Bitcoin-backed loans.
    BtcLoan,
    /// 1B — fiat income products.
    FiatIncome,
    /// 1C — stablecoin products.
    Stablecoin,
}

impl ModuleTag {
    /// All known modules (useful for iteration).
    pub const ALL: &'static [ModuleTag] = &[
        ModuleTag::BtcLoan,
        ModuleTag::FiatIncome,
        ModuleTag::Stablecoin,
    ];

    /// The short code used in stored instrument rows.
    pub fn code(&self) -> &'static str {
        match self {
            ModuleTag::BtcLoan => "1A",
            ModuleTag::FiatIncome => "1B",
            ModuleTag::Stablecoin => "1C",
        }
    }
}

impl fmt::Display for ModuleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl std::str::FromStr for ModuleTag {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "1A" => Ok(ModuleTag::BtcLoan),
            "1B" => Ok(ModuleTag::FiatIncome),
            "1C" => Ok(ModuleTag::Stablecoin),
            _ => Err(anyhow::anyhow!("Unknown module tag: {s}")),
        }
    }
}

/// Venue classification for stablecoin (1C) instruments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VenueType {
    DeFi,
    CeFi,
    #[serde(rename = "RWA")]
    Rwa,
}

impl fmt::Display for VenueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VenueType::DeFi => write!(f, "DeFi"),
            VenueType::CeFi => write!(f, "CeFi"),
            VenueType::Rwa => write!(f, "RWA"),
        }
    }
}

impl std::str::FromStr for VenueType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "defi" => Ok(VenueType::DeFi),
            "cefi" => Ok(VenueType::CeFi),
            "rwa" => Ok(VenueType::Rwa),
            _ => Err(anyhow::anyhow!("Unknown venue type: {s}")),
        }
    }
}

/// Rate classification attached to an instrument / snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RateType {
    Fixed,
    Variable,
    QuoteBased,
    Promo,
    /// Issuer sets the rate at its own discretion (fiat products).
    Discretionary,
    Unknown,
}

impl fmt::Display for RateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateType::Fixed => write!(f, "Fixed"),
            RateType::Variable => write!(f, "Variable"),
            RateType::QuoteBased => write!(f, "Quote-based"),
            RateType::Promo => write!(f, "Promo"),
            RateType::Discretionary => write!(f, "Discretionary"),
            RateType::Unknown => write!(f, "Unknown"),
        }
    }
}

impl std::str::FromStr for RateType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fixed" => Ok(RateType::Fixed),
            "variable" => Ok(RateType::Variable),
            "quotebased" | "quote-based" | "quote based" => Ok(RateType::QuoteBased),
            "promo" | "promotional" => Ok(RateType::Promo),
            "discretionary" => Ok(RateType::Discretionary),
            "unknown" => Ok(RateType::Unknown),
            _ => Err(anyhow::anyhow!("Unknown rate type: {s}")),
        }
    }
}

/// Redemption liquidity of an allocation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LiquidityTier {
    #[serde(rename = "On-demand")]
    OnDemand,
    Flexible,
    Weekly,
    Monthly,
    Locked,
}

impl fmt::Display for LiquidityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiquidityTier::OnDemand => write!(f, "On-demand"),
            LiquidityTier::Flexible => write!(f, "Flexible"),
            LiquidityTier::Weekly => write!(f, "Weekly"),
            LiquidityTier::Monthly => write!(f, "Monthly"),
            LiquidityTier::Locked => write!(f, "Locked"),
        }
    }
}

impl LiquidityTier {
    /// True for tiers that cannot settle within a day.
    pub fn is_slow(&self) -> bool {
        matches!(
            self,
            LiquidityTier::Weekly | LiquidityTier::Monthly | LiquidityTier::Locked
        )
    }
}

/// How quickly the plan holder wants to be able to exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiquidityPreference {
    #[serde(rename = "On-demand")]
    OnDemand,
    #[serde(rename = "24h")]
    Within24h,
}

impl fmt::Display for LiquidityPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiquidityPreference::OnDemand => write!(f, "On-demand"),
            LiquidityPreference::Within24h => write!(f, "24h"),
        }
    }
}

/// Resolved eligibility of an entry for the plan holder's region.
///
/// Resolution happens once, in [`crate::eligibility::resolve_eligibility`],
/// before the engine runs — the engine only reads the resolved status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EligibilityStatus {
    Eligible,
    #[serde(rename = "Check eligibility")]
    CheckEligibility,
    #[serde(rename = "Not eligible")]
    NotEligible,
}

impl fmt::Display for EligibilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EligibilityStatus::Eligible => write!(f, "Eligible"),
            EligibilityStatus::CheckEligibility => write!(f, "Check eligibility"),
            EligibilityStatus::NotEligible => write!(f, "Not eligible"),
        }
    }
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Warning severity. Amber asks the user to double-check; red flags a
/// breached policy rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Amber,
    Red,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Amber => write!(f, "amber"),
            Severity::Red => write!(f, "red"),
        }
    }
}

/// Category of a risk warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Too much weight on one issuer (fiat variant).
    Concentration,
    /// Entry liquidity slower than the stated preference.
    Liquidity,
    /// Discretionary-rate weight above policy thresholds.
    RateType,
    /// Entry not (or not verifiably) available in the plan region.
    Eligibility,
    /// Too much CeFi weight on one counterparty.
    Counterparty,
    /// Too much aggregate DeFi smart-contract exposure.
    SmartContract,
    /// Promotional-rate weight above policy thresholds.
    Promo,
    /// Whole allocation rides a single peg.
    Peg,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningKind::Concentration => write!(f, "concentration"),
            WarningKind::Liquidity => write!(f, "liquidity"),
            WarningKind::RateType => write!(f, "rate_type"),
            WarningKind::Eligibility => write!(f, "eligibility"),
            WarningKind::Counterparty => write!(f, "counterparty"),
            WarningKind::SmartContract => write!(f, "smart_contract"),
            WarningKind::Promo => write!(f, "promo"),
            WarningKind::Peg => write!(f, "peg"),
        }
    }
}

/// A single risk warning emitted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    #[serde(rename = "type")]
    pub kind: WarningKind,
    pub severity: Severity,
    pub message: String,
}

impl Warning {
    pub fn new(kind: WarningKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.kind, self.message)
    }
}

// ---------------------------------------------------------------------------
// Instrument & snapshot
// ---------------------------------------------------------------------------

/// A yield-bearing financial product, as stored by the persistence layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument {
    pub id: String,
    pub issuer: String,
    pub name: String,
    pub module: ModuleTag,
    /// Free-text descriptors from the admin screens.
    #[serde(default)]
    pub collateral: String,
    #[serde(default)]
    pub jurisdiction: String,
    #[serde(default)]
    pub lockup: String,
    #[serde(default)]
    pub seniority: String,
    /// Venue classification — only meaningful for 1C instruments.
    #[serde(default)]
    pub venue_type: Option<VenueType>,
    pub rate_type: RateType,
    /// Region eligibility tags. Empty means globally available.
    #[serde(default)]
    pub regions: Vec<String>,
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} — {} ({})",
            self.module, self.issuer, self.name, self.rate_type,
        )
    }
}

/// A point-in-time rate observation for an instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateSnapshot {
    pub instrument_id: String,
    /// Lower bound of the advertised APY, in percent. None = unpublished.
    pub apy_min: Option<f64>,
    /// Upper bound of the advertised APY, in percent.
    pub apy_max: Option<f64>,
    pub rate_type: RateType,
    pub as_of: DateTime<Utc>,
}

impl fmt::Display for RateSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lo = self.apy_min.map_or("?".to_string(), |v| format!("{v:.2}"));
        let hi = self.apy_max.map_or("?".to_string(), |v| format!("{v:.2}"));
        write!(f, "{}: {lo}–{hi}% as of {}", self.instrument_id, self.as_of)
    }
}

/// Pick the most recent snapshot from a set. The engine always computes
/// against the latest observation only; older rows are history.
pub fn latest_snapshot(snapshots: &[RateSnapshot]) -> Option<&RateSnapshot> {
    snapshots.iter().max_by_key(|s| s.as_of)
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Precondition failures for the metrics engine.
///
/// One variant per rejected input shape, so callers can surface per-field
/// validation messages instead of a generic "check your inputs".
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("allocation is empty")]
    EmptyAllocation,

    #[error("allocation weights sum to {sum:.4}, expected 100 ± {tolerance}")]
    WeightSumMismatch { sum: f64, tolerance: f64 },

    #[error("{name} must be positive (got {value})")]
    NonPositiveParam { name: &'static str, value: f64 },

    #[error("instrument {instrument} belongs to module {found}, expected {expected}")]
    ModuleMismatch {
        instrument: String,
        expected: ModuleTag,
        found: ModuleTag,
    },
}

impl MetricsError {
    /// Shorthand for the non-positive-parameter variant.
    pub fn non_positive(name: &'static str, value: f64) -> Self {
        MetricsError::NonPositiveParam { name, value }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
