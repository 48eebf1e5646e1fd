//! The row-source seam.
//!
//! The evaluator never talks to a database directly; it consumes the
//! query contract below. [`crate::postgres::PgRowSource`] implements it
//! against Postgres, and [`StaticRowSource`] implements it over fixed
//! in-memory rows for tests and dry runs.

use async_trait::async_trait;
use thiserror::Error;

use crate::isolation::{self, ChildRow};
use crate::types::{CheckName, IsolationViolation, Tenant, TenantState, UsageSnapshot};

/// Infrastructure failures from a row source.
///
/// Data violations are never errors; they come back as values. These
/// variants cover the source itself misbehaving.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source is unreachable. Aborts the whole evaluation pass.
    #[error("row source unreachable: {0}")]
    Connection(String),

    /// A query failed. Localized to the check that issued it; other
    /// checks in the same pass still run.
    #[error("{} query failed: {detail}", .check.as_str())]
    Query { check: CheckName, detail: String },

    /// A result set does not match the documented column contract.
    /// Surfaced for the schema owner to resolve, never patched over.
    #[error("schema contract mismatch in {query}: missing column '{column}'")]
    SchemaMismatch { query: String, column: String },
}

impl SourceError {
    /// Whether this error must abort the whole pass.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// The check this error should be attributed to.
    #[must_use]
    pub fn check(&self) -> CheckName {
        match self {
            Self::Query { check, .. } => *check,
            // schema drift so far only exists in the violation queries
            Self::SchemaMismatch { .. } | Self::Connection(_) => CheckName::Isolation,
        }
    }
}

/// Read-only query contract supplying tenant and usage rows.
#[async_trait]
pub trait RowSource: Send + Sync {
    /// All tenants currently in the active state.
    async fn list_active_tenants(&self) -> Result<Vec<Tenant>, SourceError>;

    /// Aggregated usage for one tenant over a trailing window.
    async fn usage_snapshot(
        &self,
        tenant_id: i64,
        window_days: u32,
    ) -> Result<UsageSnapshot, SourceError>;

    /// Cross-tenant violations detected at the source.
    async fn find_isolation_violations(&self) -> Result<Vec<IsolationViolation>, SourceError>;
}

/// In-memory row source over fixed data.
///
/// Violations are derived from the child rows with [`isolation::scan`],
/// so the static source exercises the same detection contract as the
/// SQL-backed one.
#[derive(Debug, Default)]
pub struct StaticRowSource {
    tenants: Vec<Tenant>,
    usage: Vec<UsageSnapshot>,
    child_rows: Vec<ChildRow>,
}

impl StaticRowSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_tenant(mut self, tenant: Tenant) -> Self {
        self.tenants.push(tenant);
        self
    }

    #[must_use]
    pub fn with_usage(mut self, usage: UsageSnapshot) -> Self {
        self.usage.push(usage);
        self
    }

    #[must_use]
    pub fn with_child_row(mut self, row: ChildRow) -> Self {
        self.child_rows.push(row);
        self
    }
}

#[async_trait]
impl RowSource for StaticRowSource {
    async fn list_active_tenants(&self) -> Result<Vec<Tenant>, SourceError> {
        Ok(self
            .tenants
            .iter()
            .filter(|t| t.state == TenantState::Active)
            .cloned()
            .collect())
    }

    async fn usage_snapshot(
        &self,
        tenant_id: i64,
        window_days: u32,
    ) -> Result<UsageSnapshot, SourceError> {
        // aggregation over zero rows is a zero snapshot, not an error
        Ok(self
            .usage
            .iter()
            .find(|u| u.tenant_id == tenant_id)
            .copied()
            .unwrap_or(UsageSnapshot {
                tenant_id,
                active_users: 0,
                api_calls: 0,
                window_days,
            }))
    }

    async fn find_isolation_violations(&self) -> Result<Vec<IsolationViolation>, SourceError> {
        Ok(isolation::scan(&self.tenants, &self.child_rows))
    }
}
