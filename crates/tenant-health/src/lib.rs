//! Tenant isolation and capacity health evaluation.
//!
//! Each run is a single read-and-classify pass over externally supplied
//! tenant and usage rows: detect cross-tenant data leakage, classify
//! per-tenant utilization against configured limits, and fold everything
//! into one production-readiness verdict. The evaluator owns no state
//! across invocations and never mutates the data it reads.
//!
//! # Usage
//!
//! ```no_run
//! use tenant_health::config::HealthConfig;
//! use tenant_health::evaluator::Evaluator;
//! use tenant_health::postgres::PgRowSource;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = HealthConfig::load("tenant-health.json")?;
//! let source = PgRowSource::connect(&config.database).await?;
//! let evaluator = Evaluator::new(
//!     config.evaluation.thresholds,
//!     config.evaluation.usage_window_days,
//! );
//!
//! let report = evaluator.run(&source).await?;
//! println!("ready: {}", report.production_ready);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`source::RowSource`] is the query seam; [`postgres::PgRowSource`]
//!   implements it against Postgres and [`source::StaticRowSource`]
//!   over in-memory rows.
//! - [`isolation`] detects orphaned and tenant-mismatched child rows.
//! - [`capacity`] classifies `(count, limit)` pairs per dimension.
//! - [`evaluator::Evaluator`] sequences both checks into an
//!   [`types::EvaluationReport`].
//! - [`services`] probes deployed HTTP endpoints concurrently.

pub mod capacity;
pub mod config;
pub mod evaluator;
pub mod isolation;
pub mod postgres;
pub mod report;
pub mod retry;
pub mod services;
pub mod source;
pub mod types;

pub use capacity::{CapacityThresholds, DEFAULT_WARN_RATIO};
pub use evaluator::Evaluator;
pub use source::{RowSource, SourceError, StaticRowSource};
pub use types::{
    EvaluationReport, IsolationViolation, Tenant, TenantLimits, TenantState, UsageSnapshot,
    UtilizationStatus, ViolationKind,
};
