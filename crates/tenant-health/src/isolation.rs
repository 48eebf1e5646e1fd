//! Tenant-isolation checking.
//!
//! Detects cross-tenant data relationships: child rows whose `tenant_id`
//! disagrees with the join path that fetched them, and child rows whose
//! `tenant_id` references no tenant at all. The checker is read-only and
//! zero-tolerance: any non-zero violation count fails the check, and
//! nothing is ever corrected here.

use std::collections::{BTreeMap, HashSet};

use crate::types::{IsolationViolation, Tenant, ViolationKind};

/// Which child table a row came from. Determines the mismatch kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildTable {
    /// Tenant membership rows (`tenant_users`).
    Memberships,
    /// API usage rows (`api_usage`).
    UsageRecords,
}

impl ChildTable {
    fn mismatch_kind(self) -> ViolationKind {
        match self {
            Self::Memberships => ViolationKind::MismatchedUser,
            Self::UsageRecords => ViolationKind::MismatchedUsage,
        }
    }
}

/// A child record as fetched through its parent join path.
#[derive(Debug, Clone, Copy)]
pub struct ChildRow {
    pub table: ChildTable,
    /// The row's own `tenant_id` column.
    pub tenant_id: i64,
    /// Tenant affinity of the join path used to fetch the row, when the
    /// join resolved. A row is a mismatch when this differs from
    /// `tenant_id`.
    pub joined_tenant_id: Option<i64>,
}

/// Scan tenants and child rows for isolation violations.
///
/// Orphan and mismatch detection are independent: a row can contribute to
/// both counts, exactly as the per-kind queries it models would each flag
/// it. Output is normalized (merged, sorted) and therefore deterministic.
#[must_use]
pub fn scan(tenants: &[Tenant], rows: &[ChildRow]) -> Vec<IsolationViolation> {
    let known: HashSet<i64> = tenants.iter().map(|t| t.id).collect();

    let mut counts: BTreeMap<(i64, ViolationKind), i64> = BTreeMap::new();
    for row in rows {
        if !known.contains(&row.tenant_id) {
            *counts
                .entry((row.tenant_id, ViolationKind::OrphanedRecord))
                .or_insert(0) += 1;
        }
        if let Some(joined) = row.joined_tenant_id {
            if joined != row.tenant_id {
                *counts
                    .entry((row.tenant_id, row.table.mismatch_kind()))
                    .or_insert(0) += 1;
            }
        }
    }

    counts
        .into_iter()
        .map(|((tenant_id, kind), count)| IsolationViolation::new(tenant_id, kind, count))
        .collect()
}

/// Normalize raw violation rows from a source.
///
/// Drops zero counts, merges duplicate `(tenant, kind)` entries, and
/// sorts so that repeated passes over an unchanged source produce
/// identical output.
#[must_use]
pub fn normalize(raw: Vec<IsolationViolation>) -> Vec<IsolationViolation> {
    let mut counts: BTreeMap<(i64, ViolationKind), i64> = BTreeMap::new();
    for violation in raw {
        if violation.count <= 0 {
            continue;
        }
        *counts
            .entry((violation.tenant_id, violation.kind))
            .or_insert(0) += violation.count;
    }
    counts
        .into_iter()
        .map(|((tenant_id, kind), count)| IsolationViolation::new(tenant_id, kind, count))
        .collect()
}
