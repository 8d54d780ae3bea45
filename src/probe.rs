//! Single bounded health check against one endpoint

use crate::models::{EndpointSpec, ProbeResult, ProbeStatus, round_millis};
use chrono::Utc;
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{error, info, warn};

/// Error text recorded when no response arrives in time
pub const TIMEOUT_MESSAGE: &str = "Request timeout";

/// How a single probe attempt ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// A response arrived with this status code
    Response(u16),

    /// No response within the probe timeout
    Timeout,

    /// Connection, DNS or TLS failure
    Transport(String),

    /// Anything else that went wrong during the attempt
    Unexpected(String),
}

impl ProbeOutcome {
    /// Classify a client error
    pub fn from_error(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            ProbeOutcome::Timeout
        } else if err.is_builder() {
            ProbeOutcome::Unexpected(describe_error(err))
        } else {
            ProbeOutcome::Transport(describe_error(err))
        }
    }

    pub fn status(&self) -> ProbeStatus {
        match self {
            ProbeOutcome::Response(200) => ProbeStatus::Up,
            _ => ProbeStatus::Down,
        }
    }

    /// Build the result record for `spec`, stamped with the current time
    pub fn into_result(self, spec: &EndpointSpec, elapsed: Duration) -> ProbeResult {
        let status = self.status();
        let (status_code, error) = match self {
            ProbeOutcome::Response(code) => (Some(code), None),
            ProbeOutcome::Timeout => (None, Some(TIMEOUT_MESSAGE.to_string())),
            ProbeOutcome::Transport(msg) | ProbeOutcome::Unexpected(msg) => (None, Some(msg)),
        };

        ProbeResult {
            service: spec.name.clone(),
            url: spec.url.clone(),
            timestamp: Utc::now(),
            status,
            status_code,
            response_time_ms: round_millis(elapsed),
            error,
        }
    }
}

/// Render an error together with its source chain.
///
/// reqwest's top-level message only names the URL; the cause
/// ("Connection refused", "dns error", ...) lives in the sources.
fn describe_error(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();

    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.contains(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }

    message
}

/// Issue one GET against `spec.url` and classify the outcome.
///
/// Never fails: every failure mode is folded into the returned result.
/// Returns within `limit` plus scheduling overhead.
pub async fn probe(client: &Client, spec: &EndpointSpec, limit: Duration) -> ProbeResult {
    run_bounded(client, spec, limit, None).await
}

/// Like [`probe`], but first waits for a connection permit from `limiter`.
///
/// The deadline covers the wait for the permit as well as the request, so a
/// probe queued behind the connection ceiling still ends within `limit`.
pub async fn probe_with_limiter(
    client: &Client,
    spec: &EndpointSpec,
    limit: Duration,
    limiter: &Semaphore,
) -> ProbeResult {
    run_bounded(client, spec, limit, Some(limiter)).await
}

async fn run_bounded(
    client: &Client,
    spec: &EndpointSpec,
    limit: Duration,
    limiter: Option<&Semaphore>,
) -> ProbeResult {
    let start = Instant::now();

    let outcome = timeout(limit, attempt(client, spec, limiter))
        .await
        .unwrap_or(ProbeOutcome::Timeout);

    let elapsed = start.elapsed();
    log_outcome(spec, &outcome, elapsed);
    outcome.into_result(spec, elapsed)
}

async fn attempt(client: &Client, spec: &EndpointSpec, limiter: Option<&Semaphore>) -> ProbeOutcome {
    // The semaphore is never closed, so acquiring only waits.
    let _permit = match limiter {
        Some(limiter) => limiter.acquire().await.ok(),
        None => None,
    };

    match client.get(&spec.url).send().await {
        Ok(response) => ProbeOutcome::Response(response.status().as_u16()),
        Err(e) => ProbeOutcome::from_error(&e),
    }
}

fn log_outcome(spec: &EndpointSpec, outcome: &ProbeOutcome, elapsed: Duration) {
    let response_time_ms = round_millis(elapsed);

    match outcome {
        ProbeOutcome::Response(200) => info!(
            "{} is UP - Status: 200, Response time: {}ms",
            spec.name, response_time_ms
        ),
        ProbeOutcome::Response(code) => warn!(
            "{} is DOWN - Status: {}, Response time: {}ms",
            spec.name, code, response_time_ms
        ),
        ProbeOutcome::Timeout => error!(
            "{} TIMEOUT - {} after {}ms",
            spec.name, spec.url, response_time_ms
        ),
        ProbeOutcome::Transport(msg) => error!(
            "{} ERROR - {} ({}ms)",
            spec.name, msg, response_time_ms
        ),
        ProbeOutcome::Unexpected(msg) => error!(
            "{} UNEXPECTED ERROR - {} ({}ms)",
            spec.name, msg, response_time_ms
        ),
    }
}
