//! Postgres-backed row source.
//!
//! Queries are read-only and aggregate at the database: the violation
//! queries return per-tenant counts, not raw rows. Each violation query
//! carries an explicit column contract that is verified before decoding,
//! so schema drift between the query and its consumer surfaces as
//! [`SourceError::SchemaMismatch`] instead of a silently-missing count.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Column, Row};
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::source::{RowSource, SourceError};
use crate::types::{
    CheckName, IsolationViolation, Tenant, TenantLimits, TenantState, UsageSnapshot, ViolationKind,
};

const ACTIVE_TENANTS_SQL: &str = "\
SELECT id, name, plan, status, max_users, max_api_calls
FROM tenants
WHERE status = 'active'
ORDER BY id";

const USAGE_SNAPSHOT_SQL: &str = "\
SELECT
    (SELECT COUNT(DISTINCT tu.user_id)
       FROM tenant_users tu
       JOIN users u ON u.id = tu.user_id
      WHERE tu.tenant_id = $1
        AND u.last_seen_at >= now() - make_interval(days => $2)) AS active_users,
    (SELECT COUNT(*)
       FROM api_usage au
      WHERE au.tenant_id = $1
        AND au.called_at >= now() - make_interval(days => $2)) AS api_calls";

/// One violation query plus the column contract its consumer reads.
struct ViolationQuery {
    name: &'static str,
    kind: ViolationKind,
    count_column: &'static str,
    sql: &'static str,
}

/// Membership rows whose tenant_id disagrees with the user they join to.
const MISMATCHED_USERS: ViolationQuery = ViolationQuery {
    name: "mismatched_users",
    kind: ViolationKind::MismatchedUser,
    count_column: "mismatched_users",
    sql: "\
SELECT tu.tenant_id AS tenant_id, COUNT(*) AS mismatched_users
FROM tenant_users tu
JOIN users u ON u.id = tu.user_id
WHERE u.tenant_id <> tu.tenant_id
GROUP BY tu.tenant_id",
};

/// Usage rows whose tenant_id disagrees with the user that produced them.
///
/// The canonical count column is `mismatched_usage`; an older copy of
/// this query emitted `mismatched_subscriptions`, and a source still
/// doing so fails the contract check rather than reading as zero.
const MISMATCHED_USAGE: ViolationQuery = ViolationQuery {
    name: "mismatched_usage",
    kind: ViolationKind::MismatchedUsage,
    count_column: "mismatched_usage",
    sql: "\
SELECT au.tenant_id AS tenant_id, COUNT(*) AS mismatched_usage
FROM api_usage au
JOIN users u ON u.id = au.user_id
WHERE u.tenant_id <> au.tenant_id
GROUP BY au.tenant_id",
};

/// Child rows referencing tenants that do not exist.
const ORPHANED_RECORDS: ViolationQuery = ViolationQuery {
    name: "orphaned_records",
    kind: ViolationKind::OrphanedRecord,
    count_column: "orphaned_records",
    sql: "\
SELECT c.tenant_id AS tenant_id, COUNT(*) AS orphaned_records
FROM (
    SELECT tu.tenant_id
      FROM tenant_users tu
      LEFT JOIN tenants t ON t.id = tu.tenant_id
     WHERE t.id IS NULL
    UNION ALL
    SELECT au.tenant_id
      FROM api_usage au
      LEFT JOIN tenants t ON t.id = au.tenant_id
     WHERE t.id IS NULL
) c
GROUP BY c.tenant_id",
};

const VIOLATION_QUERIES: [&ViolationQuery; 3] =
    [&MISMATCHED_USERS, &MISMATCHED_USAGE, &ORPHANED_RECORDS];

/// Row source backed by a Postgres connection pool.
pub struct PgRowSource {
    pool: PgPool,
}

impl PgRowSource {
    /// Connect to the database described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Connection`] when the pool cannot be
    /// established within the configured timeout.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, SourceError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| SourceError::Connection(e.to_string()))?;
        info!("connected to row source");
        Ok(Self { pool })
    }

    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RowSource for PgRowSource {
    async fn list_active_tenants(&self) -> Result<Vec<Tenant>, SourceError> {
        let rows = sqlx::query(ACTIVE_TENANTS_SQL)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| query_err(CheckName::Capacity, &e))?;

        rows.iter().map(decode_tenant).collect()
    }

    async fn usage_snapshot(
        &self,
        tenant_id: i64,
        window_days: u32,
    ) -> Result<UsageSnapshot, SourceError> {
        let row = sqlx::query(USAGE_SNAPSHOT_SQL)
            .bind(tenant_id)
            .bind(window_days as i32)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| query_err(CheckName::Capacity, &e))?;

        Ok(UsageSnapshot {
            tenant_id,
            active_users: get_i64(&row, "active_users", CheckName::Capacity)?,
            api_calls: get_i64(&row, "api_calls", CheckName::Capacity)?,
            window_days,
        })
    }

    async fn find_isolation_violations(&self) -> Result<Vec<IsolationViolation>, SourceError> {
        let mut violations = Vec::new();

        for query in VIOLATION_QUERIES {
            let rows = sqlx::query(query.sql)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| query_err(CheckName::Isolation, &e))?;

            debug!(query = query.name, rows = rows.len(), "violation query done");

            if let Some(first) = rows.first() {
                verify_contract(first, query.name, &["tenant_id", query.count_column])?;
            }

            for row in &rows {
                violations.push(IsolationViolation::new(
                    get_i64(row, "tenant_id", CheckName::Isolation)?,
                    query.kind,
                    get_i64(row, query.count_column, CheckName::Isolation)?,
                ));
            }
        }

        Ok(violations)
    }
}

/// Reject a result set that is missing a contract column.
fn verify_contract(row: &PgRow, query: &str, contract: &[&str]) -> Result<(), SourceError> {
    for column in contract {
        if !row.columns().iter().any(|c| c.name() == *column) {
            return Err(SourceError::SchemaMismatch {
                query: query.to_string(),
                column: (*column).to_string(),
            });
        }
    }
    Ok(())
}

fn decode_tenant(row: &PgRow) -> Result<Tenant, SourceError> {
    let status: String = row
        .try_get("status")
        .map_err(|e| query_err(CheckName::Capacity, &e))?;
    let state = parse_state(&status).ok_or_else(|| SourceError::Query {
        check: CheckName::Capacity,
        detail: format!("unknown tenant status '{status}'"),
    })?;

    Ok(Tenant {
        id: get_i64(row, "id", CheckName::Capacity)?,
        name: get_string(row, "name")?,
        plan: get_string(row, "plan")?,
        state,
        limits: TenantLimits {
            users: get_i64(row, "max_users", CheckName::Capacity)?,
            api_calls: get_i64(row, "max_api_calls", CheckName::Capacity)?,
        },
    })
}

fn parse_state(status: &str) -> Option<TenantState> {
    match status {
        "active" => Some(TenantState::Active),
        "suspended" => Some(TenantState::Suspended),
        "cancelled" | "canceled" => Some(TenantState::Cancelled),
        _ => None,
    }
}

fn get_i64(row: &PgRow, column: &str, check: CheckName) -> Result<i64, SourceError> {
    row.try_get::<i64, _>(column)
        .map_err(|e| query_err(check, &e))
}

fn get_string(row: &PgRow, column: &str) -> Result<String, SourceError> {
    row.try_get::<String, _>(column)
        .map_err(|e| query_err(CheckName::Capacity, &e))
}

fn query_err(check: CheckName, e: &dyn std::fmt::Display) -> SourceError {
    SourceError::Query {
        check,
        detail: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_state() {
        assert_eq!(parse_state("active"), Some(TenantState::Active));
        assert_eq!(parse_state("suspended"), Some(TenantState::Suspended));
        assert_eq!(parse_state("cancelled"), Some(TenantState::Cancelled));
        assert_eq!(parse_state("canceled"), Some(TenantState::Cancelled));
        assert_eq!(parse_state("trialing"), None);
    }

    #[test]
    fn test_violation_queries_select_their_contract_columns() {
        for query in VIOLATION_QUERIES {
            assert!(query.sql.contains("tenant_id"));
            assert!(
                query.sql.contains(query.count_column),
                "{} does not produce its contract column",
                query.name
            );
        }
    }
}
