//! Region-eligibility resolution.
//!
//! Eligibility is resolved exactly once, here, as a pre-processing step
//! before the engine runs. The stablecoin income engine consumes the
//! resolved [`EligibilityStatus`] on each entry and never re-derives it
//! from region lists.

use crate::types::EligibilityStatus;

/// Region tags that make a product available everywhere. Matched
/// case-insensitively so stored data with inconsistent casing still resolves.
pub const UNIVERSAL_REGIONS: &[&str] = &["Global", "On-chain"];

/// Whether a single region tag marks universal availability.
pub fn is_universal_region(tag: &str) -> bool {
    UNIVERSAL_REGIONS
        .iter()
        .any(|u| u.eq_ignore_ascii_case(tag.trim()))
}

/// Resolve the eligibility of an entry for a plan holder's region.
///
/// - Empty region list or any universal tag: eligible (global product).
/// - Plan region listed: eligible.
/// - Plan region given but absent from a restricted list: not eligible.
/// - No plan region against a restricted list: cannot tell, check.
pub fn resolve_eligibility(regions: &[String], plan_region: Option<&str>) -> EligibilityStatus {
    if regions.is_empty() || regions.iter().any(|r| is_universal_region(r)) {
        return EligibilityStatus::Eligible;
    }

    match plan_region {
        Some(region) => {
            let listed = regions
                .iter()
                .any(|r| r.trim().eq_ignore_ascii_case(region.trim()));
            if listed {
                EligibilityStatus::Eligible
            } else {
                EligibilityStatus::NotEligible
            }
        }
        None => EligibilityStatus::CheckEligibility,
    }
}
