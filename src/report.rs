//! Frozen report documents.
//!
//! The HTTP layer persists each generated report as an immutable JSON
//! document: the inputs that produced it, the computed metrics, and the
//! timestamps. This module only shapes that document; storing it belongs
//! to the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::metrics::btc_loan::BtcLoanRisk;
use crate::metrics::fiat::FiatMetrics;
use crate::metrics::stablecoin::StablecoinMetrics;
use crate::metrics::stablecoin_risk::StablecoinRiskMetrics;
use crate::types::Warning;

/// The immutable `frozenData` payload attached to a stored report row.
/// Inputs and metrics are kept as raw JSON so the document survives future
/// schema changes to the live types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrozenReport {
    /// Which report variant produced this document.
    pub source: String,
    pub plan_params: Value,
    pub allocation: Value,
    pub metrics: Value,
    /// Warnings lifted to the top level for listing screens.
    pub warnings: Vec<Warning>,
    pub rate_as_of: Option<DateTime<Utc>>,
    pub generated_at: DateTime<Utc>,
}

impl FrozenReport {
    /// Freeze a report at an explicit generation time. The general entry
    /// point; the per-variant constructors below delegate here.
    pub fn freeze_at<P, A, M>(
        source: &str,
        plan: &P,
        allocation: &A,
        metrics: &M,
        warnings: Vec<Warning>,
        rate_as_of: Option<DateTime<Utc>>,
        generated_at: DateTime<Utc>,
    ) -> Result<Self, serde_json::Error>
    where
        P: Serialize,
        A: Serialize,
        M: Serialize,
    {
        Ok(FrozenReport {
            source: source.to_string(),
            plan_params: serde_json::to_value(plan)?,
            allocation: serde_json::to_value(allocation)?,
            metrics: serde_json::to_value(metrics)?,
            warnings,
            rate_as_of,
            generated_at,
        })
    }

    /// Freeze a fiat income report.
    pub fn from_fiat<P, A>(
        plan: &P,
        allocation: &A,
        metrics: &FiatMetrics,
    ) -> Result<Self, serde_json::Error>
    where
        P: Serialize,
        A: Serialize,
    {
        Self::freeze_at(
            "fiat-income",
            plan,
            allocation,
            metrics,
            metrics.warnings.clone(),
            Some(metrics.rate_as_of),
            Utc::now(),
        )
    }

    /// Freeze a stablecoin income report.
    pub fn from_stablecoin<P, A>(
        plan: &P,
        allocation: &A,
        metrics: &StablecoinMetrics,
    ) -> Result<Self, serde_json::Error>
    where
        P: Serialize,
        A: Serialize,
    {
        Self::freeze_at(
            "stablecoin-income",
            plan,
            allocation,
            metrics,
            metrics.warnings.clone(),
            Some(metrics.rate_as_of),
            Utc::now(),
        )
    }

    /// Freeze a BTC loan risk report. This variant carries no warning list
    /// and no snapshot date; risk lives in its indicator fields.
    pub fn from_btc_loan<P>(plan: &P, metrics: &BtcLoanRisk) -> Result<Self, serde_json::Error>
    where
        P: Serialize,
    {
        Self::freeze_at(
            "btc-loan-risk",
            plan,
            &Value::Null,
            metrics,
            Vec::new(),
            None,
            Utc::now(),
        )
    }

    /// Freeze a stablecoin risk report.
    pub fn from_stablecoin_risk<P, A>(
        plan: &P,
        allocation: &A,
        metrics: &StablecoinRiskMetrics,
    ) -> Result<Self, serde_json::Error>
    where
        P: Serialize,
        A: Serialize,
    {
        Self::freeze_at(
            "stablecoin-risk",
            plan,
            allocation,
            metrics,
            metrics.warnings.clone(),
            None,
            Utc::now(),
        )
    }
}
