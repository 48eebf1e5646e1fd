//! Concurrent HTTP health probes for deployed services.
//!
//! Every probe is independent: they run concurrently, share no mutable
//! state, and a timeout or error on one degrades that probe to an
//! unhealthy result without blocking or aborting the rest of the batch.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A service endpoint to probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceTarget {
    pub name: String,
    pub url: String,
}

/// Outcome of probing one service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResult {
    pub name: String,
    pub url: String,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary of one probe batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceReport {
    pub probes: Vec<ProbeResult>,
    pub healthy: usize,
    pub unhealthy: usize,
    pub generated_at: DateTime<Utc>,
}

impl ServiceReport {
    /// Build a summary from completed probes.
    #[must_use]
    pub fn from_probes(probes: Vec<ProbeResult>) -> Self {
        let healthy = probes.iter().filter(|p| p.healthy).count();
        let unhealthy = probes.len() - healthy;
        Self {
            probes,
            healthy,
            unhealthy,
            generated_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn all_healthy(&self) -> bool {
        self.unhealthy == 0
    }

    /// Only the probes that failed.
    #[must_use]
    pub fn failed_probes(&self) -> Vec<&ProbeResult> {
        self.probes.iter().filter(|p| !p.healthy).collect()
    }
}

/// Issues concurrent probes with a per-probe timeout.
#[derive(Debug, Clone)]
pub struct ServiceProber {
    client: reqwest::Client,
    timeout: Duration,
}

impl ServiceProber {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }

    /// Probe all targets concurrently.
    pub async fn probe_all(&self, targets: &[ServiceTarget]) -> ServiceReport {
        let probes = join_all(targets.iter().map(|t| self.probe(t))).await;
        ServiceReport::from_probes(probes)
    }

    /// Probe a single target. Never fails; errors become an unhealthy
    /// result for this probe only.
    pub async fn probe(&self, target: &ServiceTarget) -> ProbeResult {
        let started = Instant::now();
        let response = self
            .client
            .get(&target.url)
            .timeout(self.timeout)
            .send()
            .await;
        let latency_ms = started.elapsed().as_millis() as u64;

        match response {
            Ok(resp) => {
                let status = resp.status();
                let healthy = status.is_success();
                if healthy {
                    debug!(service = %target.name, status = status.as_u16(), latency_ms, "probe ok");
                } else {
                    warn!(service = %target.name, status = status.as_u16(), "probe returned non-success");
                }
                ProbeResult {
                    name: target.name.clone(),
                    url: target.url.clone(),
                    healthy,
                    status_code: Some(status.as_u16()),
                    latency_ms,
                    error: None,
                }
            }
            Err(e) => {
                warn!(service = %target.name, error = %e, "probe failed");
                ProbeResult {
                    name: target.name.clone(),
                    url: target.url.clone(),
                    healthy: false,
                    status_code: None,
                    latency_ms,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe(name: &str, healthy: bool) -> ProbeResult {
        ProbeResult {
            name: name.to_string(),
            url: format!("https://{name}.internal/health"),
            healthy,
            status_code: if healthy { Some(200) } else { None },
            latency_ms: 12,
            error: if healthy {
                None
            } else {
                Some("operation timed out".to_string())
            },
        }
    }

    #[test]
    fn test_all_healthy() {
        let report = ServiceReport::from_probes(vec![probe("api", true), probe("auth", true)]);
        assert!(report.all_healthy());
        assert_eq!(report.healthy, 2);
        assert_eq!(report.unhealthy, 0);
        assert!(report.failed_probes().is_empty());
    }

    #[test]
    fn test_one_failure_does_not_hide_others() {
        let report = ServiceReport::from_probes(vec![
            probe("api", true),
            probe("auth", false),
            probe("billing", true),
        ]);
        assert!(!report.all_healthy());
        assert_eq!(report.healthy, 2);
        assert_eq!(report.unhealthy, 1);
        assert_eq!(report.failed_probes()[0].name, "auth");
    }

    #[test]
    fn test_empty_batch_is_healthy() {
        let report = ServiceReport::from_probes(vec![]);
        assert!(report.all_healthy());
    }

    #[tokio::test]
    async fn test_unreachable_target_degrades_to_unhealthy() {
        // no listener on this port; the probe must fail, not panic
        let prober = ServiceProber::new(Duration::from_millis(200));
        let result = prober
            .probe(&ServiceTarget {
                name: "ghost".into(),
                url: "http://127.0.0.1:1/health".into(),
            })
            .await;
        assert!(!result.healthy);
        assert!(result.error.is_some());
        assert_eq!(result.status_code, None);
    }
}
