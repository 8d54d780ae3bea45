//! Probe results, batches and summaries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named HTTP endpoint to monitor
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EndpointSpec {
    pub name: String,
    pub url: String,
}

impl EndpointSpec {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Up,
    Down,
}

impl std::fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeStatus::Up => write!(f, "UP"),
            ProbeStatus::Down => write!(f, "DOWN"),
        }
    }
}

/// Outcome of checking one endpoint once
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProbeResult {
    pub service: String,
    pub url: String,
    pub timestamp: DateTime<Utc>,
    pub status: ProbeStatus,
    pub status_code: Option<u16>,
    pub response_time_ms: f64,
    pub error: Option<String>,
}

impl ProbeResult {
    pub fn is_up(&self) -> bool {
        self.status == ProbeStatus::Up
    }
}

/// Round a duration to milliseconds with two decimal places
pub fn round_millis(elapsed: std::time::Duration) -> f64 {
    (elapsed.as_secs_f64() * 1000.0 * 100.0).round() / 100.0
}

/// All results of one run, aligned with the roster order
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ResultBatch {
    pub batch_id: String,
    pub results: Vec<ProbeResult>,
}

impl ResultBatch {
    pub fn new(results: Vec<ProbeResult>) -> Self {
        Self {
            batch_id: Uuid::new_v4().to_string(),
            results,
        }
    }

    /// The batch held before any run has completed
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ProbeResult> {
        self.results.iter()
    }

    pub fn up_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_up()).count()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Summary {
    pub total_services: usize,
    pub up: usize,
    pub down: usize,
    pub last_check: Option<DateTime<Utc>>,
}

impl Summary {
    /// Derive counts for a roster of `total_services` entries.
    ///
    /// Before the first run every service counts as down.
    pub fn from_batch(total_services: usize, batch: &ResultBatch) -> Self {
        let up = batch.up_count().min(total_services);

        Self {
            total_services,
            up,
            down: total_services - up,
            last_check: batch.results.first().map(|r| r.timestamp),
        }
    }
}

/// Summary plus per-service results, as printed by the CLI
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckReport {
    pub summary: Summary,
    pub services: Vec<ProbeResult>,
    pub timestamp: DateTime<Utc>,
}

impl CheckReport {
    pub fn new(summary: Summary, batch: &ResultBatch) -> Self {
        Self {
            summary,
            services: batch.results.clone(),
            timestamp: Utc::now(),
        }
    }
}
