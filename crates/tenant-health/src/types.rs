//! Core types for tenant health evaluation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel limit value meaning "no limit configured".
pub const UNLIMITED: i64 = -1;

/// Lifecycle state of a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantState {
    Active,
    Suspended,
    Cancelled,
}

impl TenantState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Per-dimension resource limits. `-1` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantLimits {
    pub users: i64,
    pub api_calls: i64,
}

impl TenantLimits {
    /// Limits with both dimensions unconstrained.
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            users: UNLIMITED,
            api_calls: UNLIMITED,
        }
    }
}

/// A tenant record as supplied by the row source.
///
/// Immutable for the duration of one evaluation pass; the evaluator never
/// writes tenants back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: i64,
    pub name: String,
    pub plan: String,
    pub state: TenantState,
    pub limits: TenantLimits,
}

/// Aggregated usage for one tenant over a trailing window.
///
/// Computed fresh each run, never persisted by this crate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSnapshot {
    pub tenant_id: i64,
    pub active_users: i64,
    pub api_calls: i64,
    pub window_days: u32,
}

/// Kind of tenant-isolation violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// A membership row whose `tenant_id` disagrees with its join path.
    MismatchedUser,
    /// A usage row whose `tenant_id` disagrees with its join path.
    MismatchedUsage,
    /// A child row referencing a tenant that does not exist.
    OrphanedRecord,
}

impl ViolationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MismatchedUser => "mismatched_user",
            Self::MismatchedUsage => "mismatched_usage",
            Self::OrphanedRecord => "orphaned_record",
        }
    }
}

/// A detected cross-tenant data violation.
///
/// Violations are evaluation *output*, never errors: the checker detects
/// and reports, it does not correct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IsolationViolation {
    pub tenant_id: i64,
    pub kind: ViolationKind,
    pub count: i64,
}

impl IsolationViolation {
    pub fn new(tenant_id: i64, kind: ViolationKind, count: i64) -> Self {
        Self {
            tenant_id,
            kind,
            count,
        }
    }
}

/// Utilization classification for one resource dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UtilizationStatus {
    /// No limit configured for this dimension.
    Unlimited,
    Ok,
    /// Above the warn threshold but still under the limit.
    High,
    /// At or over the limit.
    Exceeded,
}

impl UtilizationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unlimited => "UNLIMITED",
            Self::Ok => "OK",
            Self::High => "HIGH",
            Self::Exceeded => "EXCEEDED",
        }
    }

    /// Whether this status blocks production readiness.
    #[must_use]
    pub fn is_blocking(self) -> bool {
        matches!(self, Self::Exceeded)
    }

    /// Whether this status counts toward the warning bucket.
    #[must_use]
    pub fn is_warning(self) -> bool {
        matches!(self, Self::High)
    }
}

impl std::fmt::Display for UtilizationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evaluated capacity state for one tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantEvaluation {
    pub id: i64,
    pub name: String,
    /// Overall status folded across both dimensions.
    pub status: UtilizationStatus,
    pub user_status: UtilizationStatus,
    pub api_status: UtilizationStatus,
    /// `None` when the dimension is unlimited.
    pub user_utilization_pct: Option<u32>,
    pub api_utilization_pct: Option<u32>,
}

/// Which check a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckName {
    Isolation,
    Capacity,
}

impl CheckName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Isolation => "isolation",
            Self::Capacity => "capacity",
        }
    }
}

/// A check that could not run to completion.
///
/// Check-level failures are infrastructure problems (unreachable source,
/// broken query, schema drift) and are kept distinct from data
/// violations: a failed check blocks readiness but reports no tenants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckFailure {
    pub check: CheckName,
    pub detail: String,
}

/// Bucket counts across all evaluated tenants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub healthy: usize,
    pub warning: usize,
    pub critical: usize,
}

/// The full result of one evaluation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationReport {
    pub tenants: Vec<TenantEvaluation>,
    pub violations: Vec<IsolationViolation>,
    /// Checks that aborted with an infrastructure failure.
    pub check_failures: Vec<CheckFailure>,
    pub summary: EvaluationSummary,
    pub production_ready: bool,
    pub generated_at: DateTime<Utc>,
}

impl EvaluationReport {
    /// Whether any isolation violation was detected.
    #[must_use]
    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    /// Tenants currently over a hard limit.
    #[must_use]
    pub fn exceeded_tenants(&self) -> Vec<&TenantEvaluation> {
        self.tenants
            .iter()
            .filter(|t| t.status.is_blocking())
            .collect()
    }
}
