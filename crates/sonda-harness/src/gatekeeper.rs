//! Resource gatekeeper
//!
//! Pre-flight capacity estimate: skip a case when the model, with runtime
//! overhead factored in, will not fit the declared budget. The estimate is
//! advisory only: the service can still fail a request for resource reasons,
//! which the validators treat as an ordinary failure.

use humansize::{format_size, BINARY};
use tracing::warn;

/// Runtime overhead multiplier beyond raw model weights
pub const SAFETY_FACTOR: f64 = 1.2;

/// Decide whether a case should be skipped for capacity reasons
///
/// An unset budget means capacity is unknown; unknown capacity never skips,
/// it only warns. With a budget set, skip when `model_size * SAFETY_FACTOR`
/// strictly exceeds it; a model landing exactly on the budget runs.
#[must_use]
pub fn should_skip(model_size: u64, capacity_budget: Option<u64>) -> bool {
    let Some(budget) = capacity_budget else {
        warn!("no capacity budget configured, exercising all models; large ones may time out");
        return false;
    };
    (model_size as f64) * SAFETY_FACTOR > budget as f64
}

/// Human-readable reason for a resource skip
#[must_use]
pub fn skip_reason(model: &str, model_size: u64, capacity_budget: u64) -> String {
    format!(
        "model {model} too large for capacity budget: {} > {}",
        format_size(model_size, BINARY),
        format_size(capacity_budget, BINARY)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const GIB: u64 = 1 << 30;

    #[test]
    fn test_unknown_budget_never_skips() {
        assert!(!should_skip(500 * GIB, None));
        assert!(!should_skip(0, None));
    }

    #[test]
    fn test_oversized_model_skips() {
        // 10 GiB * 1.2 = 12 GiB > 8 GiB
        assert!(should_skip(10 * GIB, Some(8 * GIB)));
    }

    #[test]
    fn test_fitting_model_runs() {
        // 5 GiB * 1.2 = 6 GiB <= 8 GiB
        assert!(!should_skip(5 * GIB, Some(8 * GIB)));
    }

    #[test]
    fn test_exact_boundary_runs() {
        // 10 * 1.2 == 12 exactly: equality must not skip
        assert!(!should_skip(10, Some(12)));
        // One byte less of budget tips it over
        assert!(should_skip(10, Some(11)));
    }

    #[test]
    fn test_skip_reason_formats_sizes() {
        let reason = skip_reason("gemma3", 10 * GIB, 8 * GIB);
        assert!(reason.contains("gemma3"));
        assert!(reason.contains("10 GiB"));
        assert!(reason.contains("8 GiB"));
    }

    proptest! {
        #[test]
        fn prop_unknown_budget_never_skips(size in 0u64..u64::MAX / 2) {
            prop_assert!(!should_skip(size, None));
        }

        #[test]
        fn prop_boundary_is_strict(size in 1u64..(1u64 << 40)) {
            let scaled = (size as f64) * SAFETY_FACTOR;
            // A budget at or above the scaled size runs; below it skips.
            let generous = scaled.ceil() as u64 + 1;
            prop_assert!(!should_skip(size, Some(generous)));
            let stingy = (scaled / 2.0) as u64;
            prop_assert!(should_skip(size, Some(stingy)));
        }
    }
}
