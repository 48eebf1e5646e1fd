//! The evaluation pipeline.
//!
//! One pass over the row source: the isolation check first, then
//! capacity classification for every active tenant. Results accumulate
//! into healthy/warning/critical buckets and fold into a single
//! production-readiness verdict.
//!
//! Error policy: a connection failure aborts the pass; a query failure
//! degrades only the check that issued it and is recorded as a
//! check-level failure while the remaining checks still run. The
//! evaluator holds no state between passes and never retries.

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::capacity::{CapacityThresholds, TenantCapacity};
use crate::isolation;
use crate::source::{RowSource, SourceError};
use crate::types::{
    CheckFailure, EvaluationReport, EvaluationSummary, TenantEvaluation, UtilizationStatus,
};

/// The capacity half of a pass: every active tenant classified.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityPass {
    pub tenants: Vec<TenantEvaluation>,
    pub summary: EvaluationSummary,
    pub check_failures: Vec<CheckFailure>,
}

impl CapacityPass {
    /// Whether any tenant is over a hard limit.
    #[must_use]
    pub fn any_exceeded(&self) -> bool {
        self.tenants.iter().any(|t| t.status.is_blocking())
    }
}

/// Runs evaluation passes with a fixed configuration.
pub struct Evaluator {
    thresholds: CapacityThresholds,
    window_days: u32,
}

impl Evaluator {
    #[must_use]
    pub fn new(thresholds: CapacityThresholds, window_days: u32) -> Self {
        Self {
            thresholds,
            window_days,
        }
    }

    /// Run one full pass: isolation, then capacity.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Connection`] when the source is
    /// unreachable; every other source error is absorbed into the
    /// report as a check-level failure.
    pub async fn run(&self, source: &dyn RowSource) -> Result<EvaluationReport, SourceError> {
        let mut check_failures: Vec<CheckFailure> = Vec::new();

        let violations = match source.find_isolation_violations().await {
            Ok(raw) => isolation::normalize(raw),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(check = e.check().as_str(), error = %e, "check aborted");
                check_failures.push(CheckFailure {
                    check: e.check(),
                    detail: e.to_string(),
                });
                Vec::new()
            }
        };

        let capacity = self.capacity_pass(source).await?;
        let any_exceeded = capacity.any_exceeded();
        check_failures.extend(capacity.check_failures);

        let production_ready =
            violations.is_empty() && !any_exceeded && check_failures.is_empty();

        info!(
            healthy = capacity.summary.healthy,
            warning = capacity.summary.warning,
            critical = capacity.summary.critical,
            violations = violations.len(),
            production_ready,
            "evaluation complete"
        );

        Ok(EvaluationReport {
            tenants: capacity.tenants,
            violations,
            check_failures,
            summary: capacity.summary,
            production_ready,
            generated_at: Utc::now(),
        })
    }

    /// Classify capacity for every active tenant.
    ///
    /// Query failures are localized: a failed usage snapshot skips that
    /// tenant and is recorded, the rest of the pass continues.
    pub async fn capacity_pass(&self, source: &dyn RowSource) -> Result<CapacityPass, SourceError> {
        let mut pass = CapacityPass::default();

        let active = match source.list_active_tenants().await {
            Ok(active) => active,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(error = %e, "tenant listing failed, capacity check skipped");
                pass.check_failures.push(CheckFailure {
                    check: e.check(),
                    detail: e.to_string(),
                });
                return Ok(pass);
            }
        };

        info!(tenant_count = active.len(), "evaluating capacity");
        for tenant in &active {
            let usage = match source.usage_snapshot(tenant.id, self.window_days).await {
                Ok(usage) => usage,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(tenant_id = tenant.id, error = %e, "usage query failed");
                    pass.check_failures.push(CheckFailure {
                        check: e.check(),
                        detail: format!("tenant {}: {e}", tenant.id),
                    });
                    continue;
                }
            };

            let capacity = TenantCapacity::evaluate(tenant, &usage, &self.thresholds);
            let status = capacity.overall();
            match status {
                UtilizationStatus::Exceeded => pass.summary.critical += 1,
                UtilizationStatus::High => pass.summary.warning += 1,
                UtilizationStatus::Ok | UtilizationStatus::Unlimited => {
                    pass.summary.healthy += 1;
                }
            }

            pass.tenants.push(TenantEvaluation {
                id: tenant.id,
                name: tenant.name.clone(),
                status,
                user_status: capacity.user_status,
                api_status: capacity.api_status,
                user_utilization_pct: capacity.user_utilization_pct,
                api_utilization_pct: capacity.api_utilization_pct,
            });
        }

        Ok(pass)
    }
}
