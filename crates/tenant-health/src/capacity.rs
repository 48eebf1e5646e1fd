//! Capacity classification for tenant resource dimensions.
//!
//! Classifies a `(count, limit)` pair into a [`UtilizationStatus`]. The
//! warn threshold is a named, single-sourced value: historical copies of
//! this check drifted between 0.8 and 0.9, so the ratio is configurable
//! per dimension instead of hard-coded in two places.

use serde::{Deserialize, Serialize};

use crate::types::{Tenant, UsageSnapshot, UtilizationStatus, UNLIMITED};

/// Default fraction of a limit at which a dimension turns HIGH.
pub const DEFAULT_WARN_RATIO: f64 = 0.8;

/// Warn thresholds per resource dimension.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityThresholds {
    /// Warn ratio for the active-user dimension.
    #[serde(default = "default_warn_ratio")]
    pub users_warn_ratio: f64,
    /// Warn ratio for the API-call dimension.
    #[serde(default = "default_warn_ratio")]
    pub api_calls_warn_ratio: f64,
}

fn default_warn_ratio() -> f64 {
    DEFAULT_WARN_RATIO
}

impl Default for CapacityThresholds {
    fn default() -> Self {
        Self {
            users_warn_ratio: DEFAULT_WARN_RATIO,
            api_calls_warn_ratio: DEFAULT_WARN_RATIO,
        }
    }
}

/// Classify one resource dimension.
///
/// `limit == -1` is always `Unlimited`, independent of count.
#[must_use]
pub fn classify(count: i64, limit: i64, warn_ratio: f64) -> UtilizationStatus {
    if limit == UNLIMITED {
        return UtilizationStatus::Unlimited;
    }
    if count >= limit {
        return UtilizationStatus::Exceeded;
    }
    if count as f64 > limit as f64 * warn_ratio {
        return UtilizationStatus::High;
    }
    UtilizationStatus::Ok
}

/// Utilization percentage, rounded. `None` when the limit is not positive
/// (unlimited, or a degenerate zero limit with no meaningful ratio).
#[must_use]
pub fn utilization_pct(count: i64, limit: i64) -> Option<u32> {
    if limit <= 0 {
        return None;
    }
    Some((count as f64 / limit as f64 * 100.0).round() as u32)
}

/// Fold per-dimension statuses into one tenant-level status.
///
/// Exceeded on any dimension dominates, then High; a tenant is Unlimited
/// only when every dimension is.
#[must_use]
pub fn overall_status(dimensions: &[UtilizationStatus]) -> UtilizationStatus {
    if dimensions
        .iter()
        .any(|s| *s == UtilizationStatus::Exceeded)
    {
        return UtilizationStatus::Exceeded;
    }
    if dimensions.iter().any(|s| *s == UtilizationStatus::High) {
        return UtilizationStatus::High;
    }
    if !dimensions.is_empty()
        && dimensions
            .iter()
            .all(|s| *s == UtilizationStatus::Unlimited)
    {
        return UtilizationStatus::Unlimited;
    }
    UtilizationStatus::Ok
}

/// Per-dimension classification of one tenant's usage.
#[derive(Debug, Clone, Copy)]
pub struct TenantCapacity {
    pub user_status: UtilizationStatus,
    pub api_status: UtilizationStatus,
    pub user_utilization_pct: Option<u32>,
    pub api_utilization_pct: Option<u32>,
}

impl TenantCapacity {
    /// Classify both dimensions of a tenant against its usage snapshot.
    #[must_use]
    pub fn evaluate(
        tenant: &Tenant,
        usage: &UsageSnapshot,
        thresholds: &CapacityThresholds,
    ) -> Self {
        Self {
            user_status: classify(
                usage.active_users,
                tenant.limits.users,
                thresholds.users_warn_ratio,
            ),
            api_status: classify(
                usage.api_calls,
                tenant.limits.api_calls,
                thresholds.api_calls_warn_ratio,
            ),
            user_utilization_pct: utilization_pct(usage.active_users, tenant.limits.users),
            api_utilization_pct: utilization_pct(usage.api_calls, tenant.limits.api_calls),
        }
    }

    /// Tenant-level status across both dimensions.
    #[must_use]
    pub fn overall(&self) -> UtilizationStatus {
        overall_status(&[self.user_status, self.api_status])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TenantLimits, TenantState};

    fn tenant(users: i64, api_calls: i64) -> Tenant {
        Tenant {
            id: 1,
            name: "acme".into(),
            plan: "pro".into(),
            state: TenantState::Active,
            limits: TenantLimits { users, api_calls },
        }
    }

    fn usage(active_users: i64, api_calls: i64) -> UsageSnapshot {
        UsageSnapshot {
            tenant_id: 1,
            active_users,
            api_calls,
            window_days: 30,
        }
    }

    #[test]
    fn test_unlimited_ignores_count() {
        for count in [0, 1, 500, 1_000_000] {
            assert_eq!(
                classify(count, UNLIMITED, DEFAULT_WARN_RATIO),
                UtilizationStatus::Unlimited
            );
        }
    }

    #[test]
    fn test_exceeded_at_limit() {
        assert_eq!(
            classify(10, 10, DEFAULT_WARN_RATIO),
            UtilizationStatus::Exceeded
        );
        assert_eq!(
            classify(11, 10, DEFAULT_WARN_RATIO),
            UtilizationStatus::Exceeded
        );
    }

    #[test]
    fn test_high_above_warn_bound() {
        // 9 > 10 * 0.8, still under the limit
        assert_eq!(classify(9, 10, DEFAULT_WARN_RATIO), UtilizationStatus::High);
    }

    #[test]
    fn test_ok_at_or_below_warn_bound() {
        // exactly at the bound is OK, not HIGH
        assert_eq!(classify(8, 10, DEFAULT_WARN_RATIO), UtilizationStatus::Ok);
        assert_eq!(classify(0, 10, DEFAULT_WARN_RATIO), UtilizationStatus::Ok);
    }

    #[test]
    fn test_monotonic_in_count() {
        let order = |s: UtilizationStatus| match s {
            UtilizationStatus::Unlimited | UtilizationStatus::Ok => 0,
            UtilizationStatus::High => 1,
            UtilizationStatus::Exceeded => 2,
        };
        let mut prev = 0;
        for count in 0..=120 {
            let rank = order(classify(count, 100, DEFAULT_WARN_RATIO));
            assert!(rank >= prev, "status regressed at count {count}");
            prev = rank;
        }
    }

    #[test]
    fn test_alternate_warn_ratio() {
        // the 0.9 variant: 85/100 is OK there but HIGH at 0.8
        assert_eq!(classify(85, 100, 0.9), UtilizationStatus::Ok);
        assert_eq!(classify(85, 100, 0.8), UtilizationStatus::High);
        assert_eq!(classify(91, 100, 0.9), UtilizationStatus::High);
    }

    #[test]
    fn test_zero_limit_is_exceeded() {
        assert_eq!(classify(0, 0, DEFAULT_WARN_RATIO), UtilizationStatus::Exceeded);
        assert_eq!(utilization_pct(0, 0), None);
    }

    #[test]
    fn test_utilization_pct() {
        assert_eq!(utilization_pct(50, 100), Some(50));
        assert_eq!(utilization_pct(110, 100), Some(110));
        assert_eq!(utilization_pct(1, 3), Some(33));
        assert_eq!(utilization_pct(2, 3), Some(67));
        assert_eq!(utilization_pct(500, UNLIMITED), None);
    }

    #[test]
    fn test_overall_status_precedence() {
        use UtilizationStatus::{Exceeded, High, Ok, Unlimited};
        assert_eq!(overall_status(&[Ok, Exceeded]), Exceeded);
        assert_eq!(overall_status(&[High, Ok]), High);
        assert_eq!(overall_status(&[Unlimited, Unlimited]), Unlimited);
        assert_eq!(overall_status(&[Unlimited, Ok]), Ok);
        assert_eq!(overall_status(&[Ok, Ok]), Ok);
        assert_eq!(overall_status(&[Unlimited, Exceeded]), Exceeded);
    }

    #[test]
    fn test_tenant_over_user_limit() {
        // tenant with users limit 10 and 11 active users
        let capacity = TenantCapacity::evaluate(
            &tenant(10, UNLIMITED),
            &usage(11, 42),
            &CapacityThresholds::default(),
        );
        assert_eq!(capacity.user_status, UtilizationStatus::Exceeded);
        assert_eq!(capacity.api_status, UtilizationStatus::Unlimited);
        assert_eq!(capacity.overall(), UtilizationStatus::Exceeded);
        assert_eq!(capacity.user_utilization_pct, Some(110));
        assert_eq!(capacity.api_utilization_pct, None);
    }

    #[test]
    fn test_unlimited_tenant_is_healthy() {
        let capacity = TenantCapacity::evaluate(
            &tenant(UNLIMITED, UNLIMITED),
            &usage(500, 1_000_000),
            &CapacityThresholds::default(),
        );
        assert_eq!(capacity.overall(), UtilizationStatus::Unlimited);
        assert!(!capacity.overall().is_blocking());
    }
}
