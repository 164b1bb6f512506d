//! Digital Credit Compass — portfolio metrics & risk-warning engine.
//!
//! Pure computation over weighted instrument allocations: expected income,
//! required capital, portfolio APY bounds, loan collateral sensitivity, and
//! risk warnings. Four report variants, one per planner screen. All state
//! (instruments, snapshots, reports) lives with the caller.

pub mod eligibility;
pub mod metrics;
pub mod policy;
pub mod report;
pub mod types;

pub use metrics::btc_loan::compute_btc_loan_risk;
pub use metrics::fiat::compute_fiat_metrics;
pub use metrics::stablecoin::compute_stablecoin_metrics;
pub use metrics::stablecoin_risk::compute_stablecoin_risk;
pub use types::MetricsError;
