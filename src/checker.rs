//! Concurrent availability checks across the whole roster

use crate::config::Config;
use crate::errors::{CheckerError, Result};
use crate::models::{CheckReport, EndpointSpec, ResultBatch, Summary};
use crate::probe::{ProbeOutcome, probe_with_limiter};

use futures::future::join_all;
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{RwLock, Semaphore};
use tracing::{debug, error, info, instrument};

/// Owns the roster and the most recent batch of results
#[derive(Debug)]
pub struct ServiceChecker {
    services: Arc<[EndpointSpec]>,
    client: Client,
    limiter: Arc<Semaphore>,
    timeout: Duration,
    max_connections: usize,
    last_results: RwLock<Arc<ResultBatch>>,
}

impl ServiceChecker {
    /// Create a checker for `services`.
    ///
    /// At most `max_connections` probes are in flight at once, whatever
    /// the roster size. Time spent queued for a connection counts against
    /// each probe's `timeout`.
    pub fn new(
        services: Vec<EndpointSpec>,
        timeout: Duration,
        max_connections: usize,
    ) -> Result<Self> {
        if timeout.is_zero() {
            return Err(CheckerError::Config("timeout must be greater than 0".to_string()));
        }

        if max_connections == 0 {
            return Err(CheckerError::Config(
                "max_connections must be greater than 0".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(max_connections)
            .user_agent(format!("availability_checker/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(CheckerError::Http)?;

        Ok(Self {
            services: services.into(),
            client,
            limiter: Arc::new(Semaphore::new(max_connections)),
            timeout,
            max_connections,
            last_results: RwLock::new(Arc::new(ResultBatch::empty())),
        })
    }

    /// Validate `config` and build a checker from it
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate().map_err(CheckerError::Config)?;
        Self::new(config.services.clone(), config.timeout, config.max_connections)
    }

    pub fn services(&self) -> &[EndpointSpec] {
        &self.services
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    /// Probe every service concurrently and store the batch as the latest.
    ///
    /// Results follow roster order, not completion order. Overlapping calls
    /// each get their own batch back; the stored batch is whichever finished
    /// last.
    #[instrument(skip(self), fields(services = self.services.len()))]
    pub async fn run_all(&self) -> Arc<ResultBatch> {
        let started = Instant::now();

        let handles: Vec<_> = self
            .services
            .iter()
            .cloned()
            .map(|spec| {
                let client = self.client.clone();
                let limiter = Arc::clone(&self.limiter);
                let limit = self.timeout;

                tokio::spawn(async move {
                    probe_with_limiter(&client, &spec, limit, &limiter).await
                })
            })
            .collect();

        let results = join_all(handles)
            .await
            .into_iter()
            .zip(self.services.iter())
            .map(|(joined, spec)| match joined {
                Ok(result) => result,
                Err(e) => {
                    error!("Probe task for {} failed: {}", spec.name, e);
                    ProbeOutcome::Unexpected(e.to_string()).into_result(spec, started.elapsed())
                }
            })
            .collect();

        let batch = Arc::new(ResultBatch::new(results));

        {
            let mut last_results = self.last_results.write().await;
            *last_results = Arc::clone(&batch);
        }

        info!(
            "Check {} completed - {}/{} services up in {}ms",
            batch.batch_id,
            batch.up_count(),
            self.services.len(),
            started.elapsed().as_millis()
        );

        batch
    }

    /// The latest stored batch, without probing
    pub async fn last_results(&self) -> Arc<ResultBatch> {
        Arc::clone(&*self.last_results.read().await)
    }

    /// Counts derived from the latest stored batch
    pub async fn summary(&self) -> Summary {
        let batch = self.last_results().await;
        Summary::from_batch(self.services.len(), &batch)
    }

    /// Run a fresh check and pair it with its own summary
    pub async fn report(&self) -> CheckReport {
        let batch = self.run_all().await;
        let summary = Summary::from_batch(self.services.len(), &batch);
        debug!("Built report for batch {}", batch.batch_id);
        CheckReport::new(summary, &batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProbeStatus;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount(server: &MockServer, route: &str, template: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(template)
            .mount(server)
            .await;
    }

    #[test]
    fn test_checker_creation() {
        let checker = ServiceChecker::new(
            vec![EndpointSpec::new("frontend", "http://localhost:8080/health")],
            Duration::from_secs(10),
            10,
        );

        assert!(checker.is_ok());
        let checker = checker.unwrap();
        assert_eq!(checker.services().len(), 1);
        assert_eq!(checker.timeout(), Duration::from_secs(10));
        assert_eq!(checker.max_connections(), 10);
    }

    #[test]
    fn test_rejects_zero_limits() {
        let err = ServiceChecker::new(vec![], Duration::ZERO, 10).unwrap_err();
        assert!(matches!(err, CheckerError::Config(_)));

        let err = ServiceChecker::new(vec![], Duration::from_secs(1), 0).unwrap_err();
        assert!(matches!(err, CheckerError::Config(_)));
    }

    #[tokio::test]
    async fn test_state_before_first_run() {
        let checker = ServiceChecker::new(
            vec![
                EndpointSpec::new("frontend", "http://localhost:1/health"),
                EndpointSpec::new("backend", "http://localhost:2/health"),
                EndpointSpec::new("ai-engine", "http://localhost:3/health"),
            ],
            Duration::from_secs(5),
            10,
        )
        .unwrap();

        assert!(checker.last_results().await.is_empty());

        let summary = checker.summary().await;
        assert_eq!(summary.total_services, 3);
        assert_eq!(summary.up, 0);
        assert_eq!(summary.down, 3);
        assert!(summary.last_check.is_none());
    }

    #[tokio::test]
    async fn test_empty_roster() {
        let checker = ServiceChecker::new(vec![], Duration::from_secs(1), 4).unwrap();

        let batch = checker.run_all().await;
        assert!(batch.is_empty());

        let summary = checker.summary().await;
        assert_eq!((summary.total_services, summary.up, summary.down), (0, 0, 0));
        assert!(summary.last_check.is_none());
    }

    #[tokio::test]
    async fn test_results_follow_roster_order() {
        let server = MockServer::start().await;
        mount(&server, "/slow", ResponseTemplate::new(200).set_delay(Duration::from_millis(300))).await;
        mount(&server, "/medium", ResponseTemplate::new(503).set_delay(Duration::from_millis(100))).await;
        mount(&server, "/fast", ResponseTemplate::new(200)).await;

        let checker = ServiceChecker::new(
            vec![
                EndpointSpec::new("slow", format!("{}/slow", server.uri())),
                EndpointSpec::new("medium", format!("{}/medium", server.uri())),
                EndpointSpec::new("fast", format!("{}/fast", server.uri())),
            ],
            Duration::from_secs(5),
            10,
        )
        .unwrap();

        let batch = checker.run_all().await;

        let names: Vec<&str> = batch.iter().map(|r| r.service.as_str()).collect();
        assert_eq!(names, vec!["slow", "medium", "fast"]);
        assert_eq!(batch.results[1].status, ProbeStatus::Down);
        assert_eq!(batch.results[1].status_code, Some(503));
        assert_eq!(checker.last_results().await, batch);
    }

    #[tokio::test]
    async fn test_connection_ceiling_queues_probes() {
        let server = MockServer::start().await;
        mount(&server, "/health", ResponseTemplate::new(200).set_delay(Duration::from_millis(150))).await;

        let services = (0..3)
            .map(|i| EndpointSpec::new(format!("svc-{}", i), format!("{}/health", server.uri())))
            .collect();
        let checker = ServiceChecker::new(services, Duration::from_secs(5), 1).unwrap();

        let started = Instant::now();
        let batch = checker.run_all().await;

        assert!(started.elapsed() >= Duration::from_millis(450));
        assert_eq!(batch.up_count(), 3);
    }

    #[tokio::test]
    async fn test_reads_are_idempotent() {
        let server = MockServer::start().await;
        mount(&server, "/health", ResponseTemplate::new(200)).await;

        let checker = ServiceChecker::new(
            vec![EndpointSpec::new("frontend", format!("{}/health", server.uri()))],
            Duration::from_secs(5),
            10,
        )
        .unwrap();
        checker.run_all().await;

        assert_eq!(checker.last_results().await, checker.last_results().await);
        assert_eq!(checker.summary().await, checker.summary().await);
    }
}
