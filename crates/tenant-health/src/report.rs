//! Console rendering of evaluation results.

use std::fmt::Write as _;

use colored::{ColoredString, Colorize};

use crate::evaluator::CapacityPass;
use crate::services::ServiceReport;
use crate::types::{EvaluationReport, TenantEvaluation, UtilizationStatus};

fn colorize(status: UtilizationStatus) -> ColoredString {
    match status {
        UtilizationStatus::Exceeded => status.as_str().red().bold(),
        UtilizationStatus::High => status.as_str().yellow(),
        UtilizationStatus::Ok => status.as_str().green(),
        UtilizationStatus::Unlimited => status.as_str().cyan(),
    }
}

fn pct(value: Option<u32>) -> String {
    match value {
        Some(v) => format!("{v}%"),
        None => "∞".to_string(),
    }
}

fn write_tenant_lines(out: &mut String, tenants: &[TenantEvaluation]) {
    if tenants.is_empty() {
        let _ = writeln!(out, "  {}", "no active tenants".dimmed());
    }
    for tenant in tenants {
        let _ = writeln!(
            out,
            "  {:<9} {:<24} users {:>5} {:<9} api {:>5} {:<9}",
            colorize(tenant.status),
            tenant.name,
            pct(tenant.user_utilization_pct),
            colorize(tenant.user_status),
            pct(tenant.api_utilization_pct),
            colorize(tenant.api_status),
        );
    }
}

/// Render the full evaluation report for text output.
#[must_use]
pub fn render_evaluation_text(report: &EvaluationReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", "Tenant Capacity".cyan().bold());
    write_tenant_lines(&mut out, &report.tenants);

    let _ = writeln!(out);
    let _ = writeln!(out, "{}", "Isolation".cyan().bold());
    if report.violations.is_empty() {
        let _ = writeln!(out, "  {}", "no violations".green());
    }
    for violation in &report.violations {
        let _ = writeln!(
            out,
            "  {} tenant {} {} x{}",
            "CRITICAL".red().bold(),
            violation.tenant_id,
            violation.kind.as_str(),
            violation.count,
        );
    }

    for failure in &report.check_failures {
        let _ = writeln!(
            out,
            "  {} {} check failed: {}",
            "ERROR".red().bold(),
            failure.check.as_str(),
            failure.detail,
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Summary: {} healthy, {} warning, {} critical, {} violations",
        report.summary.healthy,
        report.summary.warning,
        report.summary.critical,
        report.violations.len(),
    );
    let verdict = if report.production_ready {
        "PRODUCTION READY".green().bold()
    } else {
        "NOT PRODUCTION READY".red().bold()
    };
    let _ = writeln!(out, "{verdict}");

    out
}

/// Render a capacity-only pass for text output.
#[must_use]
pub fn render_capacity_text(pass: &CapacityPass) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", "Tenant Capacity".cyan().bold());
    write_tenant_lines(&mut out, &pass.tenants);

    for failure in &pass.check_failures {
        let _ = writeln!(
            out,
            "  {} {} check failed: {}",
            "ERROR".red().bold(),
            failure.check.as_str(),
            failure.detail,
        );
    }

    let _ = writeln!(
        out,
        "\nSummary: {} healthy, {} warning, {} critical",
        pass.summary.healthy, pass.summary.warning, pass.summary.critical,
    );

    out
}

/// Render a service probe report for text output.
#[must_use]
pub fn render_services_text(report: &ServiceReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", "Service Health".cyan().bold());
    for probe in &report.probes {
        let (label, detail) = if probe.healthy {
            (
                "UP".green().bold(),
                format!("{} ({}ms)", probe.status_code.unwrap_or_default(), probe.latency_ms),
            )
        } else {
            (
                "DOWN".red().bold(),
                probe
                    .error
                    .clone()
                    .or_else(|| probe.status_code.map(|c| format!("HTTP {c}")))
                    .unwrap_or_else(|| "unknown".to_string()),
            )
        };
        let _ = writeln!(out, "  {:<4} {:<24} {}", label, probe.name, detail);
    }

    let _ = writeln!(
        out,
        "\n{} up, {} down",
        report.healthy, report.unhealthy
    );

    out
}

/// Process exit convention: 0 = production ready, 1 = not ready or
/// check failure.
#[must_use]
pub fn evaluation_exit_code(report: &EvaluationReport) -> i32 {
    i32::from(!report.production_ready)
}

#[must_use]
pub fn services_exit_code(report: &ServiceReport) -> i32 {
    i32::from(!report.all_healthy())
}
